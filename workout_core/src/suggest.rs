//! Exercise suggestion heuristic.
//!
//! Picks three to five exercises at random from a pre-filtered candidate
//! list and configures sets, reps, and rest according to the training goal.
//! The random source is always passed in so runs can be reproduced.

use crate::{Exercise, Goal, PlannedExercise};
use rand::seq::SliceRandom;
use rand::Rng;

const MIN_SUGGESTED: usize = 3;
const MAX_SUGGESTED: usize = 5;

/// Volume applied to exercises a user picks by hand
pub const MANUAL_SETS: u32 = 3;
pub const MANUAL_REST_SECONDS: u32 = 60;

/// Suggest a plan from `candidates` for the given goal
///
/// Returns an empty plan when there are no candidates; the caller must not
/// start a session with it.
pub fn suggest_workout<R: Rng + ?Sized>(
    candidates: &[Exercise],
    goal: Goal,
    rng: &mut R,
) -> Vec<PlannedExercise> {
    if candidates.is_empty() {
        tracing::debug!("No candidates to suggest from");
        return Vec::new();
    }

    let mut shuffled: Vec<&Exercise> = candidates.iter().collect();
    shuffled.shuffle(rng);

    let count = rng
        .gen_range(MIN_SUGGESTED..=MAX_SUGGESTED)
        .min(shuffled.len());

    tracing::info!(
        "Suggesting {} of {} exercises for {:?}",
        count,
        candidates.len(),
        goal
    );

    shuffled
        .into_iter()
        .take(count)
        .map(|exercise| configure_for_goal(exercise, goal))
        .collect()
}

/// Apply the goal's sets/reps/rest policy to one exercise
pub fn configure_for_goal(exercise: &Exercise, goal: Goal) -> PlannedExercise {
    let (sets, reps, rest_seconds) = match goal {
        Goal::MuscleGain => (4, exercise.reps.clamp(8, 12), 90),
        Goal::WeightLoss => (3, exercise.reps.max(15), 45),
        Goal::Endurance => (5, exercise.reps.max(20), 30),
    };

    PlannedExercise {
        exercise: exercise.clone(),
        sets,
        reps,
        rest_seconds,
        completed: false,
    }
}

/// Configuration for an exercise added by hand: native reps, fixed volume
pub fn manual_entry(exercise: &Exercise) -> PlannedExercise {
    PlannedExercise {
        exercise: exercise.clone(),
        sets: MANUAL_SETS,
        reps: exercise.reps,
        rest_seconds: MANUAL_REST_SECONDS,
        completed: false,
    }
}

/// Fallback plan used when suggestions are switched off: the first three
/// candidates with manual-entry volume
pub fn default_workout(candidates: &[Exercise]) -> Vec<PlannedExercise> {
    candidates
        .iter()
        .take(MIN_SUGGESTED)
        .map(manual_entry)
        .collect()
}
