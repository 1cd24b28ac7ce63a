//! CSV export of recorded sessions for spreadsheets and reports.

use crate::{Result, WorkoutSessionRecord};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    date: String,
    environment: Option<String>,
    goal: Option<String>,
    muscle_group: Option<String>,
    exercises: String,
    total_calories: u32,
    total_duration: u32,
    total_rest_time: u32,
    total_sets: u32,
    total_reps: u32,
    saved: bool,
}

impl From<&WorkoutSessionRecord> for CsvRow {
    fn from(session: &WorkoutSessionRecord) -> Self {
        CsvRow {
            id: session.id.to_string(),
            date: session.date.to_rfc3339(),
            environment: session.environment.map(|e| e.label().to_string()),
            goal: session.goal.map(|g| g.label().to_string()),
            muscle_group: session.muscle_group.map(|g| g.label().to_string()),
            exercises: session
                .exercises
                .iter()
                .map(|p| format!("{} {}x{}", p.exercise.name, p.sets, p.reps))
                .collect::<Vec<_>>()
                .join("; "),
            total_calories: session.total_calories,
            total_duration: session.total_duration,
            total_rest_time: session.total_rest_time,
            total_sets: session.total_sets,
            total_reps: session.total_reps,
            saved: session.saved,
        }
    }
}

/// Append sessions to a CSV file, writing headers only when the file is new
///
/// Returns the number of rows written. The file is synced before returning.
pub fn export_sessions_csv(sessions: &[WorkoutSessionRecord], csv_path: &Path) -> Result<usize> {
    if sessions.is_empty() {
        tracing::info!("No sessions to export");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for session in sessions {
        writer.serialize(CsvRow::from(session))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} sessions to {:?}", sessions.len(), csv_path);
    Ok(sessions.len())
}
