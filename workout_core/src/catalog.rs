//! Exercise catalog: the built-in seed and the read interface the engine uses.
//!
//! The engine never mutates exercises. It only asks the catalog for the
//! candidates matching a muscle group and environment.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Read-only view of the exercise catalog
pub trait ExerciseCatalog {
    /// Every exercise, in catalog order
    fn list_exercises(&self) -> Vec<Exercise>;

    /// Exercises for `group`, optionally restricted to those that can be done
    /// in `environment`
    fn list_exercises_by_muscle_group(
        &self,
        group: MuscleGroup,
        environment: Option<Environment>,
    ) -> Vec<Exercise> {
        self.list_exercises()
            .into_iter()
            .filter(|e| e.muscle_group == group)
            .filter(|e| environment.map_or(true, |env| e.environment.fits(env)))
            .collect()
    }
}

/// An ordered collection of exercises
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub exercises: Vec<Exercise>,
}

impl ExerciseCatalog for Catalog {
    fn list_exercises(&self) -> Vec<Exercise> {
        self.exercises.clone()
    }
}

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

#[allow(clippy::too_many_arguments)]
fn exercise(
    id: &str,
    name: &str,
    muscle_group: MuscleGroup,
    environment: Environment,
    instructions: &str,
    reps: u32,
    calories: u32,
    duration: u32,
    difficulty: Difficulty,
    image_url: &str,
) -> Exercise {
    Exercise {
        id: id.into(),
        name: name.into(),
        muscle_group,
        environment,
        instructions: instructions.into(),
        reps,
        calories,
        duration,
        difficulty: Some(difficulty),
        image_url: Some(image_url.into()),
    }
}

const IMG_CHEST: &str = "https://images.unsplash.com/photo-1571019614242-c5c5dee9f50b?w=400";
const IMG_LEGS: &str = "https://images.unsplash.com/photo-1574680096145-d05b474e2155?w=400";
const IMG_ABS: &str = "https://images.unsplash.com/photo-1571019613454-1cb2f99b2d8b?w=400";
const IMG_ARMS: &str = "https://images.unsplash.com/photo-1581009146145-b5ef050c2e1e?w=400";
const IMG_SHOULDERS: &str = "https://images.unsplash.com/photo-1583454110551-21f2fa2afe61?w=400";
const IMG_BACK: &str = "https://images.unsplash.com/photo-1605296867304-46d5465a13f1?w=400";

/// Builds the seed catalog of 17 exercises across all six muscle groups
pub fn build_default_catalog() -> Catalog {
    use Difficulty::*;
    use Environment::*;
    use MuscleGroup::*;

    let exercises = vec![
        // Chest
        exercise("1", "Push-up", Chest, Home,
            "Lie face down, hands shoulder-width apart, push the body up and down",
            15, 7, 2, Medium, IMG_CHEST),
        exercise("2", "Diamond Push-up", Chest, Home,
            "Push-up with the hands together forming a diamond",
            12, 8, 2, Hard, IMG_CHEST),
        exercise("3", "Bench Press", Chest, Gym,
            "Lie on the bench and press the bar from the chest upward",
            10, 10, 3, Medium, IMG_CHEST),
        // Legs
        exercise("4", "Squat", Legs, Both,
            "Stand with feet shoulder-width apart and sit back as if onto a chair",
            20, 10, 3, Easy, IMG_LEGS),
        exercise("5", "Lunge", Legs, Both,
            "Step forward and lower the hips until both knees are bent",
            15, 8, 3, Medium, IMG_LEGS),
        exercise("6", "Leg Press", Legs, Gym,
            "Push the platform away with the feet on the leg press machine",
            12, 12, 3, Medium, IMG_LEGS),
        // Abs
        exercise("7", "Plank", Abs, Both,
            "Hold a straight body on hands or forearms",
            1, 5, 1, Medium, IMG_ABS),
        exercise("8", "Crunch", Abs, Both,
            "Lie on the back and curl the torso up",
            20, 5, 2, Easy, IMG_ABS),
        exercise("9", "Mountain Climbers", Abs, Home,
            "From a plank, drive the knees toward the chest alternately",
            30, 8, 2, Medium, IMG_ABS),
        // Arms
        exercise("10", "Dips", Arms, Home,
            "Using a chair, support the body on the hands and lower down",
            15, 6, 2, Medium, IMG_ARMS),
        exercise("11", "Bicep Curl", Arms, Gym,
            "Hold the dumbbells and curl them toward the shoulders",
            12, 6, 2, Easy, IMG_ARMS),
        exercise("12", "Tricep Extension", Arms, Gym,
            "Raise the weight overhead and extend the arms",
            12, 6, 2, Medium, IMG_ARMS),
        // Shoulders
        exercise("13", "Shoulder Press", Shoulders, Gym,
            "Press the weights from the shoulders to overhead",
            10, 8, 2, Medium, IMG_SHOULDERS),
        exercise("14", "Lateral Raise", Shoulders, Both,
            "Raise the weights out to the sides up to shoulder height",
            12, 6, 2, Easy, IMG_SHOULDERS),
        // Back
        exercise("15", "Pull-up", Back, Both,
            "Hang from the bar and pull until the chin clears it",
            8, 9, 2, Hard, IMG_BACK),
        exercise("16", "Bent Over Row", Back, Gym,
            "Hinge forward and row the weight toward the chest",
            12, 8, 2, Medium, IMG_BACK),
        exercise("17", "Superman", Back, Home,
            "Lie face down and lift the arms and legs together",
            15, 5, 2, Easy, IMG_BACK),
    ];

    Catalog { exercises }
}

impl Catalog {
    /// Append extra exercises (e.g. user-defined ones from config)
    pub fn with_custom(mut self, custom: impl IntoIterator<Item = Exercise>) -> Self {
        let before = self.exercises.len();
        self.exercises.extend(custom);
        tracing::debug!(
            "Added {} custom exercises to catalog",
            self.exercises.len() - before
        );
        self
    }

    /// Look up a single exercise by id
    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for exercise in &self.exercises {
            if exercise.id.is_empty() {
                errors.push(format!("Exercise '{}' has empty ID", exercise.name));
            } else if !seen.insert(exercise.id.as_str()) {
                errors.push(format!("Duplicate exercise ID '{}'", exercise.id));
            }
            if exercise.name.is_empty() {
                errors.push(format!("Exercise '{}' has empty name", exercise.id));
            }
            if exercise.reps == 0 {
                errors.push(format!("Exercise '{}' has zero reps", exercise.id));
            }
            if exercise.duration == 0 {
                errors.push(format!("Exercise '{}' has zero duration", exercise.id));
            }
        }

        for group in MuscleGroup::ALL {
            if !self.exercises.iter().any(|e| e.muscle_group == group) {
                errors.push(format!("Catalog has no exercises for {}", group));
            }
        }

        errors
    }
}
