//! Aggregate totals over a session plan.

use crate::{MuscleGroup, PlannedExercise, WorkoutMetrics};

/// Compute calories, work time, rest time, and volume for a plan
///
/// Rest is only counted between sets of the same exercise, so a single-set
/// exercise contributes no rest time.
pub fn calculate_metrics(plan: &[PlannedExercise]) -> WorkoutMetrics {
    let mut metrics = WorkoutMetrics::default();

    // Custom exercises come from user config, so totals saturate instead of overflowing
    for planned in plan {
        let sets = planned.sets;
        metrics.total_calories = metrics
            .total_calories
            .saturating_add(planned.exercise.calories.saturating_mul(sets));
        metrics.total_duration = metrics
            .total_duration
            .saturating_add(planned.exercise.duration.saturating_mul(sets));
        metrics.total_rest_time = metrics
            .total_rest_time
            .saturating_add(planned.rest_seconds.saturating_mul(sets.saturating_sub(1)));
        metrics.total_sets = metrics.total_sets.saturating_add(sets);
        metrics.total_reps = metrics
            .total_reps
            .saturating_add(planned.reps.saturating_mul(sets));
    }

    metrics.estimated_time = metrics
        .total_duration
        .saturating_add(metrics.total_rest_time / 60);
    metrics
}

/// Distinct muscle groups in a plan, in the order they first appear
pub fn muscle_groups_worked(plan: &[PlannedExercise]) -> Vec<MuscleGroup> {
    let mut groups = Vec::new();
    for planned in plan {
        if !groups.contains(&planned.exercise.muscle_group) {
            groups.push(planned.exercise.muscle_group);
        }
    }
    groups
}
