//! Core domain types for the workout session engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise reference data (muscle groups, environments, difficulty)
//! - Goals and planned exercises
//! - Aggregate metrics and nutrition recommendations
//! - Session and saved-workout records handed to storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Reference Enumerations
// ============================================================================

/// Muscle group an exercise targets
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Arms,
    Chest,
    Shoulders,
    Legs,
    Abs,
    Back,
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 6] = [
        MuscleGroup::Arms,
        MuscleGroup::Chest,
        MuscleGroup::Shoulders,
        MuscleGroup::Legs,
        MuscleGroup::Abs,
        MuscleGroup::Back,
    ];

    /// Display label used by the catalog and in recommendation text
    pub fn label(&self) -> &'static str {
        match self {
            MuscleGroup::Arms => "Tay",
            MuscleGroup::Chest => "Ngực",
            MuscleGroup::Shoulders => "Vai",
            MuscleGroup::Legs => "Chân",
            MuscleGroup::Abs => "Bụng",
            MuscleGroup::Back => "Lưng",
        }
    }

    fn english(&self) -> &'static str {
        match self {
            MuscleGroup::Arms => "arms",
            MuscleGroup::Chest => "chest",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Legs => "legs",
            MuscleGroup::Abs => "abs",
            MuscleGroup::Back => "back",
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MuscleGroup {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        MuscleGroup::ALL
            .iter()
            .copied()
            .find(|g| g.label() == needle || g.english().eq_ignore_ascii_case(needle))
            .ok_or_else(|| crate::Error::Other(format!("Unknown muscle group: {}", s)))
    }
}

/// Where an exercise can be performed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Home,
    Gym,
    Both,
}

impl Environment {
    pub const ALL: [Environment; 3] = [Environment::Home, Environment::Gym, Environment::Both];

    pub fn label(&self) -> &'static str {
        match self {
            Environment::Home => "Ở nhà",
            Environment::Gym => "Phòng gym",
            Environment::Both => "Cả hai",
        }
    }

    /// Whether an exercise tagged `self` can be done in the chosen environment.
    ///
    /// Exercises tagged `Both` fit anywhere, and choosing `Both` accepts every
    /// exercise.
    pub fn fits(&self, chosen: Environment) -> bool {
        *self == Environment::Both || chosen == Environment::Both || *self == chosen
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Environment {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        match needle.to_lowercase().as_str() {
            "home" => return Ok(Environment::Home),
            "gym" => return Ok(Environment::Gym),
            "both" => return Ok(Environment::Both),
            _ => {}
        }
        Environment::ALL
            .iter()
            .copied()
            .find(|e| e.label() == needle)
            .ok_or_else(|| crate::Error::Other(format!("Unknown environment: {}", s)))
    }
}

/// Difficulty tier of an exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Training goal; selects the sets/reps/rest policy
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    #[default]
    MuscleGain,
    WeightLoss,
    Endurance,
}

impl Goal {
    pub fn label(&self) -> &'static str {
        match self {
            Goal::MuscleGain => "Tăng cơ",
            Goal::WeightLoss => "Giảm cân",
            Goal::Endurance => "Tăng sức bền",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Goal {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        match needle.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "musclegain" => return Ok(Goal::MuscleGain),
            "weightloss" => return Ok(Goal::WeightLoss),
            "endurance" => return Ok(Goal::Endurance),
            _ => {}
        }
        [Goal::MuscleGain, Goal::WeightLoss, Goal::Endurance]
            .into_iter()
            .find(|g| g.label() == needle)
            .ok_or_else(|| crate::Error::Other(format!("Unknown goal: {}", s)))
    }
}

// ============================================================================
// Exercise and Plan Types
// ============================================================================

/// An exercise from the catalog (immutable reference data)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub muscle_group: MuscleGroup,
    pub environment: Environment,
    pub instructions: String,
    /// Native repetitions per set
    pub reps: u32,
    /// Calories burned per set
    pub calories: u32,
    /// Minutes per set
    pub duration: u32,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// An exercise bound into a session plan with engine-assigned volume
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlannedExercise {
    pub exercise: Exercise,
    pub sets: u32,
    pub reps: u32,
    pub rest_seconds: u32,
    #[serde(default)]
    pub completed: bool,
}

// ============================================================================
// Derived Values
// ============================================================================

/// Aggregate totals over a plan
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorkoutMetrics {
    pub total_calories: u32,
    /// Minutes of work
    pub total_duration: u32,
    /// Seconds of rest between sets
    pub total_rest_time: u32,
    pub total_sets: u32,
    pub total_reps: u32,
    /// Minutes, work plus whole minutes of rest
    pub estimated_time: u32,
}

/// Post-workout nutrition and recovery guidance
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FoodRecommendation {
    pub summary: String,
    pub protein_amount: String,
    pub carb_amount: String,
    pub fat_amount: String,
    pub meal_suggestions: Vec<String>,
    pub timing: String,
    pub recovery_tips: Vec<String>,
}

// ============================================================================
// Session State Types
// ============================================================================

/// Coarse phase of a session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Environment,
    Select,
    Active,
    Rest,
    Complete,
    Results,
}

/// Live state of one session, owned by its engine
#[derive(Clone, Debug)]
pub struct SessionState {
    pub step: Step,
    pub environment: Option<Environment>,
    pub goal: Goal,
    pub muscle_group: Option<MuscleGroup>,
    pub plan: Vec<PlannedExercise>,
    pub current_exercise_index: usize,
    pub current_set: u32,
    pub is_resting: bool,
    pub rest_seconds_remaining: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub metrics: Option<WorkoutMetrics>,
    pub recommendation: Option<FoodRecommendation>,
    pub recommendation_loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            step: Step::Environment,
            environment: None,
            goal: Goal::default(),
            muscle_group: None,
            plan: Vec::new(),
            current_exercise_index: 0,
            current_set: 1,
            is_resting: false,
            rest_seconds_remaining: 0,
            started_at: None,
            ended_at: None,
            metrics: None,
            recommendation: None,
            recommendation_loading: false,
        }
    }
}

impl SessionState {
    /// The exercise currently being performed, if a session is underway
    pub fn current_exercise(&self) -> Option<&PlannedExercise> {
        match self.step {
            Step::Active | Step::Rest => self.plan.get(self.current_exercise_index),
            _ => None,
        }
    }
}

// ============================================================================
// Records handed to storage
// ============================================================================

/// Finalized snapshot of a completed session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutSessionRecord {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub environment: Option<Environment>,
    pub goal: Option<Goal>,
    pub muscle_group: Option<MuscleGroup>,
    pub exercises: Vec<PlannedExercise>,
    pub total_calories: u32,
    pub total_duration: u32,
    pub total_rest_time: u32,
    pub total_sets: u32,
    pub total_reps: u32,
    pub saved: bool,
}

/// Named alias of a session kept for reuse
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedWorkoutRecord {
    pub id: Uuid,
    pub name: String,
    pub date: DateTime<Utc>,
    pub muscle_group: Option<MuscleGroup>,
    pub total_calories: u32,
    pub total_duration: u32,
    pub session_id: Option<Uuid>,
}

/// Aggregate statistics over recorded sessions
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct WorkoutStats {
    pub total_sessions: usize,
    pub total_calories: u64,
    pub total_duration: u64,
    pub avg_calories: f64,
    pub avg_duration: f64,
}

/// Inclusive date window; either bound may be open
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }
}
