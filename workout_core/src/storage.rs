//! Storage collaborator for finished sessions and saved workouts.
//!
//! Sessions are appended to a JSONL (JSON Lines) file with file locking.
//! Saved workouts are a small JSON document rewritten atomically.

use crate::{DateRange, Error, Result, SavedWorkoutRecord, WorkoutSessionRecord, WorkoutStats};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Persistence interface the session engine writes to
pub trait SessionStore {
    fn record_session(&mut self, session: &WorkoutSessionRecord) -> Result<Uuid>;

    fn record_saved_workout(&mut self, workout: &SavedWorkoutRecord) -> Result<Uuid>;

    /// Returns whether a workout with that id existed
    fn delete_saved_workout(&mut self, id: Uuid) -> Result<bool>;

    fn list_saved_workouts(&self) -> Result<Vec<SavedWorkoutRecord>>;

    /// Sessions in the range, newest first
    fn list_sessions(&self, range: Option<&DateRange>) -> Result<Vec<WorkoutSessionRecord>>;

    fn get_stats(&self, range: Option<&DateRange>) -> Result<WorkoutStats> {
        Ok(compute_stats(&self.list_sessions(range)?))
    }
}

/// Totals and per-session averages; averages are zero when there are no sessions
pub fn compute_stats(sessions: &[WorkoutSessionRecord]) -> WorkoutStats {
    let total_sessions = sessions.len();
    let total_calories: u64 = sessions.iter().map(|s| u64::from(s.total_calories)).sum();
    let total_duration: u64 = sessions.iter().map(|s| u64::from(s.total_duration)).sum();

    let (avg_calories, avg_duration) = if total_sessions == 0 {
        (0.0, 0.0)
    } else {
        (
            total_calories as f64 / total_sessions as f64,
            total_duration as f64 / total_sessions as f64,
        )
    };

    WorkoutStats {
        total_sessions,
        total_calories,
        total_duration,
        avg_calories,
        avg_duration,
    }
}

/// File-backed store rooted at a data directory
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    pub const SESSIONS_FILE: &'static str = "sessions.jsonl";
    pub const SAVED_FILE: &'static str = "saved_workouts.json";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn sessions_path(&self) -> PathBuf {
        self.dir.join(Self::SESSIONS_FILE)
    }

    pub fn saved_path(&self) -> PathBuf {
        self.dir.join(Self::SAVED_FILE)
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn load_saved(&self) -> Result<Vec<SavedWorkoutRecord>> {
        let path = self.saved_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)?;
        file.lock_shared()?;
        let mut contents = String::new();
        let read = BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        serde_json::from_str(&contents).map_err(|e| {
            Error::Storage(format!("Failed to parse saved workouts {:?}: {}", path, e))
        })
    }

    /// Atomically replace the saved-workouts file
    fn write_saved(&self, workouts: &[SavedWorkoutRecord]) -> Result<()> {
        self.ensure_dir()?;

        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, workouts)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(self.saved_path())
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl SessionStore for JsonlStore {
    fn record_session(&mut self, session: &WorkoutSessionRecord) -> Result<Uuid> {
        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(self.sessions_path())?;
        file.lock_exclusive()?;

        let needs_newline = ends_without_newline(&file)?;
        let mut writer = std::io::BufWriter::new(&file);
        if needs_newline {
            // Terminate a line left half-written by an earlier crash
            tracing::warn!("Sessions log has an unterminated last line");
            writer.write_all(b"\n")?;
        }
        let line = serde_json::to_string(session)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;
        tracing::debug!("Recorded session {}", session.id);
        Ok(session.id)
    }

    fn record_saved_workout(&mut self, workout: &SavedWorkoutRecord) -> Result<Uuid> {
        let mut workouts = self.load_saved()?;
        if workouts.iter().any(|w| w.id == workout.id) {
            return Err(Error::Storage(format!(
                "Saved workout {} already exists",
                workout.id
            )));
        }
        workouts.push(workout.clone());
        self.write_saved(&workouts)?;
        tracing::debug!("Saved workout '{}' ({})", workout.name, workout.id);
        Ok(workout.id)
    }

    fn delete_saved_workout(&mut self, id: Uuid) -> Result<bool> {
        let mut workouts = self.load_saved()?;
        let before = workouts.len();
        workouts.retain(|w| w.id != id);
        if workouts.len() == before {
            return Ok(false);
        }
        self.write_saved(&workouts)?;
        tracing::debug!("Deleted saved workout {}", id);
        Ok(true)
    }

    fn list_saved_workouts(&self) -> Result<Vec<SavedWorkoutRecord>> {
        // Unreadable file lists as empty; writes refuse to touch it
        let mut workouts = match self.load_saved() {
            Ok(workouts) => workouts,
            Err(Error::Storage(msg)) => {
                tracing::warn!("{}. Treating as empty.", msg);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        workouts.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(workouts)
    }

    fn list_sessions(&self, range: Option<&DateRange>) -> Result<Vec<WorkoutSessionRecord>> {
        let mut sessions = read_sessions(&self.sessions_path())?;
        if let Some(range) = range {
            sessions.retain(|s| range.contains(s.date));
        }
        sessions.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(sessions)
    }
}

fn ends_without_newline(mut file: &File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Read all sessions from a JSONL file, skipping lines that fail to parse
pub fn read_sessions(path: &Path) -> Result<Vec<WorkoutSessionRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut sessions = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<WorkoutSessionRecord>(&line) {
            Ok(session) => sessions.push(session),
            Err(e) => {
                tracing::warn!("Failed to parse session at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} sessions from {:?}", sessions.len(), path);
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Environment, Goal, MuscleGroup};
    use chrono::{Duration, Utc};

    fn create_test_session(days_ago: i64, calories: u32, duration: u32) -> WorkoutSessionRecord {
        let date = Utc::now() - Duration::days(days_ago);
        WorkoutSessionRecord {
            id: Uuid::new_v4(),
            date,
            started_at: Some(date),
            ended_at: Some(date),
            environment: Some(Environment::Home),
            goal: Some(Goal::MuscleGain),
            muscle_group: Some(MuscleGroup::Legs),
            exercises: vec![],
            total_calories: calories,
            total_duration: duration,
            total_rest_time: 0,
            total_sets: 0,
            total_reps: 0,
            saved: false,
        }
    }

    fn create_saved(name: &str, session_id: Uuid) -> SavedWorkoutRecord {
        SavedWorkoutRecord {
            id: Uuid::new_v4(),
            name: name.into(),
            date: Utc::now(),
            muscle_group: Some(MuscleGroup::Legs),
            total_calories: 120,
            total_duration: 24,
            session_id: Some(session_id),
        }
    }

    #[test]
    fn test_record_and_list_sessions() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(temp_dir.path());

        let old = create_test_session(3, 100, 20);
        let new = create_test_session(1, 200, 30);
        store.record_session(&old).unwrap();
        let id = store.record_session(&new).unwrap();
        assert_eq!(id, new.id);

        let sessions = store.list_sessions(None).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, new.id, "newest first");
    }

    #[test]
    fn test_list_sessions_in_range() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(temp_dir.path());

        store.record_session(&create_test_session(10, 100, 20)).unwrap();
        store.record_session(&create_test_session(2, 100, 20)).unwrap();

        let range = DateRange {
            start: Some(Utc::now() - Duration::days(7)),
            end: None,
        };
        assert_eq!(store.list_sessions(Some(&range)).unwrap().len(), 1);
    }

    #[test]
    fn test_stats() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(temp_dir.path());

        let empty = store.get_stats(None).unwrap();
        assert_eq!(empty, WorkoutStats::default());

        store.record_session(&create_test_session(1, 100, 20)).unwrap();
        store.record_session(&create_test_session(1, 200, 41)).unwrap();

        let stats = store.get_stats(None).unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_calories, 300);
        assert_eq!(stats.total_duration, 61);
        assert!((stats.avg_calories - 150.0).abs() < f64::EPSILON);
        assert!((stats.avg_duration - 30.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(temp_dir.path());
        store.record_session(&create_test_session(1, 100, 20)).unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(store.sessions_path())
            .unwrap();
        writeln!(file, "{{ not json").unwrap();

        store.record_session(&create_test_session(1, 100, 20)).unwrap();
        assert_eq!(store.list_sessions(None).unwrap().len(), 2);
    }

    #[test]
    fn test_record_after_partial_line() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(temp_dir.path());
        store.record_session(&create_test_session(1, 100, 20)).unwrap();

        // Crash mid-write: no trailing newline
        let mut file = OpenOptions::new()
            .append(true)
            .open(store.sessions_path())
            .unwrap();
        write!(file, r#"{{"id":"partial"#).unwrap();
        drop(file);

        let next = create_test_session(0, 150, 25);
        store.record_session(&next).unwrap();

        let sessions = store.list_sessions(None).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, next.id);
    }

    #[test]
    fn test_corrupt_saved_file_is_not_overwritten() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(temp_dir.path());

        let truncated = format!(r#"[{{"id":"{}","name":"Old","#, Uuid::new_v4());
        std::fs::write(store.saved_path(), &truncated).unwrap();

        assert!(store.list_saved_workouts().unwrap().is_empty());
        assert!(matches!(
            store.record_saved_workout(&create_saved("New", Uuid::new_v4())),
            Err(Error::Storage(_))
        ));
        assert!(matches!(
            store.delete_saved_workout(Uuid::new_v4()),
            Err(Error::Storage(_))
        ));
        assert_eq!(std::fs::read_to_string(store.saved_path()).unwrap(), truncated);
    }

    #[test]
    fn test_saved_workouts_roundtrip_and_delete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(temp_dir.path());

        let a = create_saved("Leg day", Uuid::new_v4());
        let b = create_saved("Leg day II", Uuid::new_v4());
        store.record_saved_workout(&a).unwrap();
        store.record_saved_workout(&b).unwrap();
        assert_eq!(store.list_saved_workouts().unwrap().len(), 2);

        assert!(store.delete_saved_workout(a.id).unwrap());
        assert!(!store.delete_saved_workout(a.id).unwrap());

        let remaining = store.list_saved_workouts().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "Leg day II");
    }

    #[test]
    fn test_duplicate_saved_workout_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(temp_dir.path());

        let a = create_saved("Push", Uuid::new_v4());
        store.record_saved_workout(&a).unwrap();
        assert!(matches!(
            store.record_saved_workout(&a),
            Err(Error::Storage(_))
        ));
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(temp_dir.path());
        store
            .record_saved_workout(&create_saved("Core", Uuid::new_v4()))
            .unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != JsonlStore::SAVED_FILE)
            .collect();
        assert!(extras.is_empty(), "unexpected files: {:?}", extras);
    }

    #[test]
    fn test_empty_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(temp_dir.path().join("missing"));
        assert!(store.list_sessions(None).unwrap().is_empty());
        assert!(store.list_saved_workouts().unwrap().is_empty());
    }
}
