use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use uuid::Uuid;
use workout_core::*;

type Input = Lines<BufReader<Stdin>>;

#[derive(Parser)]
#[command(name = "gymflow")]
#[command(about = "Guided workout sessions with rest timing and nutrition advice", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan and run a workout session
    Start {
        /// Where you are training (home, gym, both)
        #[arg(long)]
        environment: Environment,

        /// Muscle group to train (arms, chest, shoulders, legs, abs, back)
        #[arg(long)]
        muscle_group: MuscleGroup,

        /// Training goal (muscle-gain, weight-loss, endurance)
        #[arg(long)]
        goal: Option<Goal>,

        /// Seed for the plan suggestion
        #[arg(long)]
        seed: Option<u64>,

        /// Complete every set and skip every rest without prompting (for testing)
        #[arg(long)]
        auto: bool,

        /// Keep the session and save it under this name
        #[arg(long, conflicts_with = "discard")]
        save: Option<String>,

        /// Record the session without keeping it
        #[arg(long)]
        discard: bool,
    },

    /// List exercises in the catalog
    Exercises {
        #[arg(long)]
        muscle_group: Option<MuscleGroup>,

        #[arg(long)]
        environment: Option<Environment>,
    },

    /// Manage saved workouts
    Saved {
        #[command(subcommand)]
        action: SavedCommand,
    },

    /// Show totals and averages over recorded sessions
    Stats {
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Export recorded sessions to CSV
    Export {
        #[arg(long)]
        output: PathBuf,

        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum SavedCommand {
    /// List saved workouts
    List,
    /// Delete a saved workout by id
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    workout_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    match cli.command {
        Some(Commands::Start {
            environment,
            muscle_group,
            goal,
            seed,
            auto,
            save,
            discard,
        }) => {
            let decision = if discard {
                Some(SaveDecision::Discard)
            } else if save.is_some() {
                Some(SaveDecision::Save { name: save })
            } else {
                None
            };
            cmd_start(
                &data_dir,
                &config,
                environment,
                muscle_group,
                goal.unwrap_or_default(),
                seed,
                auto,
                decision,
            )
            .await
        }
        Some(Commands::Exercises {
            muscle_group,
            environment,
        }) => cmd_exercises(&config, muscle_group, environment),
        Some(Commands::Saved { action }) => cmd_saved(&data_dir, action),
        Some(Commands::Stats { from, to }) => cmd_stats(&data_dir, date_range(from, to)),
        Some(Commands::Export { output, from, to }) => {
            cmd_export(&data_dir, &output, date_range(from, to))
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

fn load_catalog(config: &Config) -> Result<Catalog> {
    let catalog = build_default_catalog().with_custom(config.catalog.custom.clone());
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }
    Ok(catalog)
}

#[allow(clippy::too_many_arguments)]
async fn cmd_start(
    data_dir: &Path,
    config: &Config,
    environment: Environment,
    muscle_group: MuscleGroup,
    goal: Goal,
    seed: Option<u64>,
    auto: bool,
    decision: Option<SaveDecision>,
) -> Result<()> {
    let catalog = load_catalog(config)?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let mut engine = SessionEngine::new(Arc::new(SystemClock), config.session_settings());
    engine.select_environment(environment)?;
    engine.continue_to_select()?;
    engine.select_goal(goal)?;
    engine.select_muscle_group(muscle_group)?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    engine.suggest_plan(&catalog, &mut rng)?;

    if engine.state().plan.is_empty() {
        return Err(Error::Other(format!(
            "No {} exercises available at {}",
            muscle_group, environment
        )));
    }

    display_plan(&engine);

    if !auto {
        let answer = prompt(&mut input, "Press Enter to start, 'q' + Enter to quit").await?;
        if answer == "q" {
            engine.abandon();
            println!("Session cancelled.");
            return Ok(());
        }
    }

    engine.start()?;

    loop {
        match engine.step() {
            Step::Active => {
                display_current_set(&engine);
                if !auto {
                    let answer =
                        prompt(&mut input, "Press Enter when the set is done, 'q' + Enter to quit")
                            .await?;
                    if answer == "q" {
                        engine.abandon();
                        println!("Session abandoned.");
                        return Ok(());
                    }
                }
                engine.complete_set()?;
            }
            Step::Rest => {
                if auto {
                    engine.skip_rest()?;
                } else {
                    run_rest(&mut engine, &mut input).await?;
                }
            }
            _ => break,
        }
    }

    display_summary(&engine);

    if engine.is_recommendation_loading() {
        println!("  Preparing nutrition advice...");
    }
    if let Some(recommendation) = engine.wait_for_recommendation().await {
        display_recommendation(recommendation);
    }

    let decision = match decision {
        Some(decision) => decision,
        None if auto => SaveDecision::Save { name: None },
        None => prompt_save_decision(&mut input).await?,
    };

    std::fs::create_dir_all(data_dir)?;
    let mut store = JsonlStore::new(data_dir);
    let outcome = engine.finish(decision, &mut store)?;

    if outcome.session.saved {
        println!("\n✓ Session logged!");
    } else {
        println!("\n✓ Session logged (not kept)");
    }
    if let Some(saved) = outcome.saved_workout {
        println!("✓ Saved as '{}' ({})", saved.name, saved.id);
    }

    Ok(())
}

async fn prompt(input: &mut Input, message: &str) -> Result<String> {
    println!("─────────────────────────────────────────");
    println!("{}", message);
    print!("> ");
    io::stdout().flush()?;

    let line = input.next_line().await?.unwrap_or_default();
    Ok(line.trim().to_lowercase())
}

async fn prompt_save_decision(input: &mut Input) -> Result<SaveDecision> {
    println!("─────────────────────────────────────────");
    println!("Enter a name to save this workout");
    println!("  Enter alone to keep it in history");
    println!("  'n' + Enter to discard");
    print!("> ");
    io::stdout().flush()?;

    let line = input.next_line().await?.unwrap_or_default();
    let answer = line.trim();

    let decision = match answer {
        "n" | "N" => SaveDecision::Discard,
        "" => SaveDecision::Save { name: None },
        name => SaveDecision::Save {
            name: Some(name.to_string()),
        },
    };
    Ok(decision)
}

/// Count down the rest, ending early when the user presses Enter
async fn run_rest(engine: &mut SessionEngine, input: &mut Input) -> Result<()> {
    println!("\n  Rest - press Enter to skip");
    let mut interval = tokio::time::interval(Duration::from_millis(250));

    while engine.step() == Step::Rest {
        tokio::select! {
            _ = interval.tick() => {
                if let RestEvent::Tick { .. } = engine.sync() {
                    print!("\r  ⏱ {}   ", engine.rest_display());
                    io::stdout().flush()?;
                }
            }
            line = input.next_line() => {
                line?;
                engine.skip_rest()?;
            }
        }
    }

    println!("\r  Rest over    ");
    Ok(())
}

fn display_plan(engine: &SessionEngine) {
    let state = engine.state();
    println!("\n╭─────────────────────────────────────────╮");
    if let (Some(group), Some(env)) = (state.muscle_group, state.environment) {
        println!("│  {} · {} · {}", group, env, state.goal);
    }
    println!("╰─────────────────────────────────────────╯");
    println!();

    for (i, planned) in state.plan.iter().enumerate() {
        println!(
            "  {}. {} - {} x {} reps, rest {}s",
            i + 1,
            planned.exercise.name,
            planned.sets,
            planned.reps,
            planned.rest_seconds
        );
    }

    let metrics = engine.plan_metrics();
    println!();
    println!(
        "  ~{} min · {} kcal · {} sets",
        metrics.estimated_time, metrics.total_calories, metrics.total_sets
    );
    println!();
}

fn display_current_set(engine: &SessionEngine) {
    let state = engine.state();
    if let Some(planned) = state.current_exercise() {
        println!(
            "\n  {} ({}/{}) - set {}/{}, {} reps",
            planned.exercise.name,
            state.current_exercise_index + 1,
            state.plan.len(),
            state.current_set,
            planned.sets,
            planned.reps
        );
        println!("  ℹ {}", planned.exercise.instructions);
    }
}

fn display_summary(engine: &SessionEngine) {
    let Some(metrics) = engine.state().metrics else {
        return;
    };

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  WORKOUT COMPLETE");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Calories:   {} kcal", metrics.total_calories);
    println!("  Work time:  {} min", metrics.total_duration);
    println!("  Rest time:  {} s", metrics.total_rest_time);
    println!("  Volume:     {} sets, {} reps", metrics.total_sets, metrics.total_reps);
    println!();
}

fn display_recommendation(recommendation: &FoodRecommendation) {
    println!("  {}", recommendation.summary);
    println!();
    println!("  Protein: {}", recommendation.protein_amount);
    println!("  Carbs:   {}", recommendation.carb_amount);
    println!("  Fat:     {}", recommendation.fat_amount);
    println!();
    for meal in &recommendation.meal_suggestions {
        println!("  → {}", meal);
    }
    println!();
    println!("  {}", recommendation.timing);
    for tip in &recommendation.recovery_tips {
        println!("  {}", tip);
    }
    println!();
}

fn cmd_exercises(
    config: &Config,
    muscle_group: Option<MuscleGroup>,
    environment: Option<Environment>,
) -> Result<()> {
    let catalog = load_catalog(config)?;

    let exercises = match muscle_group {
        Some(group) => catalog.list_exercises_by_muscle_group(group, environment),
        None => catalog
            .list_exercises()
            .into_iter()
            .filter(|e| environment.map_or(true, |env| e.environment.fits(env)))
            .collect(),
    };

    if exercises.is_empty() {
        println!("No exercises match.");
        return Ok(());
    }

    for exercise in exercises {
        println!(
            "{:>3}  {:<20} {:<6} {:<10} {:>3} reps {:>3} kcal {:>2} min",
            exercise.id,
            exercise.name,
            exercise.muscle_group.label(),
            exercise.environment.label(),
            exercise.reps,
            exercise.calories,
            exercise.duration
        );
    }

    Ok(())
}

fn cmd_saved(data_dir: &Path, action: SavedCommand) -> Result<()> {
    let mut store = JsonlStore::new(data_dir);

    match action {
        SavedCommand::List => {
            let workouts = store.list_saved_workouts()?;
            if workouts.is_empty() {
                println!("No saved workouts.");
                return Ok(());
            }
            for workout in workouts {
                println!(
                    "{}  {:<24} {}  {} kcal  {} min",
                    workout.id,
                    workout.name,
                    workout.date.format("%Y-%m-%d"),
                    workout.total_calories,
                    workout.total_duration
                );
            }
        }
        SavedCommand::Delete { id } => {
            if !store.delete_saved_workout(id)? {
                return Err(Error::Other(format!("No saved workout with id {}", id)));
            }
            println!("✓ Deleted saved workout {}", id);
        }
    }

    Ok(())
}

fn cmd_stats(data_dir: &Path, range: Option<DateRange>) -> Result<()> {
    let store = JsonlStore::new(data_dir);
    let stats = store.get_stats(range.as_ref())?;

    println!("Sessions:          {}", stats.total_sessions);
    println!("Total calories:    {} kcal", stats.total_calories);
    println!("Total work time:   {} min", stats.total_duration);
    println!("Average calories:  {:.1} kcal", stats.avg_calories);
    println!("Average work time: {:.1} min", stats.avg_duration);

    Ok(())
}

fn cmd_export(data_dir: &Path, output: &Path, range: Option<DateRange>) -> Result<()> {
    let store = JsonlStore::new(data_dir);
    let mut sessions = store.list_sessions(range.as_ref())?;

    if sessions.is_empty() {
        println!("No sessions to export.");
        return Ok(());
    }

    // Oldest first in the file
    sessions.reverse();
    let count = export_sessions_csv(&sessions, output)?;

    println!("✓ Exported {} sessions to CSV", count);
    println!("  CSV: {}", output.display());

    Ok(())
}

/// Whole-day window from optional start and end dates
fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<DateRange> {
    if from.is_none() && to.is_none() {
        return None;
    }

    Some(DateRange {
        start: from.map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN))),
        end: to
            .and_then(|d| d.and_hms_nano_opt(23, 59, 59, 999_999_999))
            .map(|dt| Utc.from_utc_datetime(&dt)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_date_range_covers_whole_days() {
        let range = date_range(Some(day("2025-03-01")), Some(day("2025-03-02"))).unwrap();

        let at = |s: &str| {
            chrono::DateTime::parse_from_rfc3339(s)
                .unwrap()
                .with_timezone(&Utc)
        };
        assert!(range.contains(at("2025-03-01T00:00:00Z")));
        assert!(range.contains(at("2025-03-02T23:59:59.400Z")));
        assert!(!range.contains(at("2025-03-03T00:00:00Z")));
        assert!(!range.contains(at("2025-02-28T23:59:59.999Z")));
    }

    #[test]
    fn test_no_dates_means_no_range() {
        assert!(date_range(None, None).is_none());
    }
}
