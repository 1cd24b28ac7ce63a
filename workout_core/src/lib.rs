#![forbid(unsafe_code)]

//! Core domain model and business logic for the GymFlow workout system.
//!
//! This crate provides:
//! - Domain types (exercises, plans, sessions, metrics)
//! - Catalog management
//! - Plan suggestion and post-workout nutrition advice
//! - Rest countdown and the session state machine
//! - Persistence (JSONL sessions, saved workouts, CSV export)

pub mod types;
pub mod error;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod suggest;
pub mod recommend;
pub mod rest;
pub mod session;
pub mod storage;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, Catalog, ExerciseCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use metrics::{calculate_metrics, muscle_groups_worked};
pub use suggest::suggest_workout;
pub use recommend::generate_food_recommendation;
pub use rest::{format_countdown, RestEvent, RestScheduler};
pub use session::{SaveDecision, SessionEngine, SessionOutcome, SessionSettings, SetOutcome};
pub use storage::{JsonlStore, SessionStore};
pub use export::export_sessions_csv;
