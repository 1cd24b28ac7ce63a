//! Post-workout nutrition and recovery recommendations.
//!
//! The values are a deterministic function of the muscle groups trained and
//! the session totals. Presentation is asynchronous: [`RecommendationTask`]
//! delivers the result after a simulated latency so a front-end can show a
//! loading state without blocking the session engine.

use crate::{FoodRecommendation, MuscleGroup};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};

/// Intensity above which the high-intensity meal set is suggested
const HIGH_INTENSITY: f64 = 5.0;

const HIGH_INTENSITY_MEALS: [&str; 3] = [
    "🍗 150g grilled chicken breast + 100g brown rice + greens",
    "🥩 150g stir-fried beef + boiled sweet potato + broccoli",
    "🐟 150g baked salmon + quinoa + salad",
];

const LOW_INTENSITY_MEALS: [&str; 3] = [
    "🥚 3 boiled eggs + oatmeal + banana",
    "🥛 Whey protein shake + banana + peanut butter",
    "🍚 Chicken rice + steamed vegetables",
];

const GENERAL_MEALS: [&str; 2] = [
    "🥤 Protein smoothie: milk + banana + oats + whey",
    "🥗 Chicken salad: chicken breast + lettuce + tomato + olives",
];

const OPENING_TIPS: [&str; 3] = [
    "💧 Drink 2-3 litres of water a day",
    "😴 Sleep 7-9 hours so muscles can fully recover",
    "🧘 Do some gentle stretching",
];

const LEG_TIPS: [&str; 2] = [
    "🚶 Take a light 10-15 minute walk to ease soreness",
    "🛁 Soak your feet in warm water or massage your calves",
];

const CHEST_BACK_TIP: &str = "🧘 Stretch your shoulders and back";
const ARMS_SHOULDERS_TIP: &str = "💪 Gently massage your arm muscles after training";

const CLOSING_TIPS: [&str; 2] = [
    "🍎 Get vitamin C from fruit to reduce inflammation",
    "⏰ Wait 48-72 hours before training the same muscle group again",
];

const TIMING: &str = "Take protein within 30-60 minutes after training. Main meal 1-2 hours later.";

/// Inputs to the recommendation generator
#[derive(Clone, Debug, PartialEq)]
pub struct RecommendationInput {
    pub muscle_groups: Vec<MuscleGroup>,
    pub calories_burned: u32,
    pub total_sets: u32,
    pub total_reps: u32,
}

/// Derived scalar used to scale the recommendation
pub fn intensity(total_sets: u32, total_reps: u32) -> f64 {
    (f64::from(total_sets) * f64::from(total_reps)) / 100.0
}

/// Macro-nutrient targets in grams: (protein, carbohydrate, fat)
pub fn macro_grams(calories_burned: u32, total_sets: u32, total_reps: u32) -> (u32, u32, u32) {
    let i = intensity(total_sets, total_reps);
    let protein = (25.0 + i * 5.0).round() as u32;
    let carbs = (30.0 + f64::from(calories_burned) / 4.0).round() as u32;
    let fat = (10.0 + i * 2.0).round() as u32;
    (protein, carbs, fat)
}

/// Build the recommendation for a finished session
pub fn generate_food_recommendation(
    muscle_groups: &[MuscleGroup],
    calories_burned: u32,
    total_sets: u32,
    total_reps: u32,
) -> FoodRecommendation {
    let i = intensity(total_sets, total_reps);
    let (protein, carbs, fat) = macro_grams(calories_burned, total_sets, total_reps);

    let groups = muscle_groups
        .iter()
        .map(|g| g.label())
        .collect::<Vec<_>>()
        .join(", ");

    FoodRecommendation {
        summary: format!(
            "After your {} session burning {} calories, your body needs nutrients to recover and build muscle.",
            groups, calories_burned
        ),
        protein_amount: format!(
            "{}g protein (about {} eggs or {}g chicken breast)",
            protein,
            (f64::from(protein) / 7.0).round() as u32,
            protein.saturating_mul(4)
        ),
        carb_amount: format!(
            "{}g carbohydrate (about {} bowls of rice or 2 sweet potatoes)",
            carbs,
            (f64::from(carbs) / 30.0).round() as u32
        ),
        fat_amount: format!("{}g healthy fats (avocado, nuts, olive oil)", fat),
        meal_suggestions: meal_suggestions(i),
        timing: TIMING.to_string(),
        recovery_tips: recovery_tips(muscle_groups),
    }
}

fn meal_suggestions(intensity: f64) -> Vec<String> {
    let specific = if intensity > HIGH_INTENSITY {
        HIGH_INTENSITY_MEALS
    } else {
        LOW_INTENSITY_MEALS
    };

    specific
        .iter()
        .chain(GENERAL_MEALS.iter())
        .map(|s| s.to_string())
        .collect()
}

fn recovery_tips(muscle_groups: &[MuscleGroup]) -> Vec<String> {
    let trained = |g: MuscleGroup| muscle_groups.contains(&g);
    let mut tips: Vec<&str> = OPENING_TIPS.to_vec();

    if trained(MuscleGroup::Legs) {
        tips.extend(LEG_TIPS);
    }
    if trained(MuscleGroup::Chest) || trained(MuscleGroup::Back) {
        tips.push(CHEST_BACK_TIP);
    }
    if trained(MuscleGroup::Arms) || trained(MuscleGroup::Shoulders) {
        tips.push(ARMS_SHOULDERS_TIP);
    }

    tips.extend(CLOSING_TIPS);
    tips.into_iter().map(String::from).collect()
}

/// Fixed payload used when the generator is disabled or fails
pub fn default_recommendation() -> FoodRecommendation {
    FoodRecommendation {
        summary: "Refuel after training to help your muscles recover.".into(),
        protein_amount: "30g protein".into(),
        carb_amount: "50g carbohydrate".into(),
        fat_amount: "15g fat".into(),
        meal_suggestions: vec![
            "🍗 Chicken breast + rice + vegetables".into(),
            "🥚 Eggs + bread".into(),
            "🥤 Whey protein shake".into(),
        ],
        timing: "Take protein within 30-60 minutes after training.".into(),
        recovery_tips: vec![
            "💧 Stay hydrated".into(),
            "😴 Get enough sleep".into(),
            "🧘 Stretch".into(),
        ],
    }
}

/// Outcome of polling a [`RecommendationTask`]
#[derive(Debug)]
pub enum TaskPoll {
    Pending,
    Ready(FoodRecommendation),
    /// The task ended without producing a value
    Failed,
}

/// A recommendation being produced in the background
///
/// Dropping the task aborts it, so an abandoned session never leaves a
/// stray task behind.
pub struct RecommendationTask {
    receiver: oneshot::Receiver<FoodRecommendation>,
    handle: JoinHandle<()>,
}

impl RecommendationTask {
    /// Spawn the generator on the current tokio runtime
    ///
    /// Returns `None` when called outside a runtime.
    pub fn spawn(input: RecommendationInput, latency: Duration) -> Option<Self> {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let (sender, receiver) = oneshot::channel();

        let handle = runtime.spawn(async move {
            tokio::time::sleep(latency).await;
            let recommendation = generate_food_recommendation(
                &input.muscle_groups,
                input.calories_burned,
                input.total_sets,
                input.total_reps,
            );
            // Receiver gone means the session moved on; nothing to deliver.
            let _ = sender.send(recommendation);
        });

        tracing::debug!("Spawned recommendation task ({:?} latency)", latency);
        Some(Self { receiver, handle })
    }

    /// Non-blocking check for the result
    pub fn poll(&mut self) -> TaskPoll {
        match self.receiver.try_recv() {
            Ok(recommendation) => TaskPoll::Ready(recommendation),
            Err(oneshot::error::TryRecvError::Empty) => TaskPoll::Pending,
            Err(oneshot::error::TryRecvError::Closed) => TaskPoll::Failed,
        }
    }

    /// Handle for checking on or cancelling the background task
    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }

    /// Wait for the result
    pub async fn wait(mut self) -> Option<FoodRecommendation> {
        (&mut self.receiver).await.ok()
    }
}

impl Drop for RecommendationTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leg_day_scenario() {
        let rec = generate_food_recommendation(&[MuscleGroup::Legs], 100, 12, 10);

        assert!((intensity(12, 10) - 1.2).abs() < f64::EPSILON);
        assert_eq!(macro_grams(100, 12, 10), (31, 55, 12));
        assert!(rec.protein_amount.starts_with("31g protein"));
        assert!(rec.carb_amount.starts_with("55g carbohydrate"));
        assert!(rec.fat_amount.starts_with("12g"));

        for tip in LEG_TIPS {
            assert!(rec.recovery_tips.iter().any(|t| t == tip));
        }
        assert!(!rec.recovery_tips.iter().any(|t| t == CHEST_BACK_TIP));
        assert!(!rec.recovery_tips.iter().any(|t| t == ARMS_SHOULDERS_TIP));
        assert_eq!(rec.recovery_tips.len(), 7);
    }

    #[test]
    fn test_egg_and_rice_equivalents() {
        let rec = generate_food_recommendation(&[MuscleGroup::Legs], 100, 12, 10);
        // 31 / 7 rounds to 4, 55 / 30 rounds to 2
        assert!(rec.protein_amount.contains("about 4 eggs"));
        assert!(rec.protein_amount.contains("124g chicken"));
        assert!(rec.carb_amount.contains("about 2 bowls"));
    }

    #[test]
    fn test_meal_sets_follow_intensity() {
        let low = generate_food_recommendation(&[MuscleGroup::Abs], 50, 10, 50); // 5.0
        assert_eq!(low.meal_suggestions[0], LOW_INTENSITY_MEALS[0]);

        let high = generate_food_recommendation(&[MuscleGroup::Abs], 50, 12, 50); // 6.0
        assert_eq!(high.meal_suggestions[0], HIGH_INTENSITY_MEALS[0]);

        for rec in [&low, &high] {
            assert_eq!(rec.meal_suggestions.len(), 5);
            assert_eq!(rec.meal_suggestions[3..], GENERAL_MEALS.map(String::from));
        }
    }

    #[test]
    fn test_upper_body_tips() {
        let rec = generate_food_recommendation(
            &[MuscleGroup::Back, MuscleGroup::Shoulders],
            200,
            16,
            40,
        );
        assert_eq!(rec.recovery_tips.len(), 7);
        assert_eq!(rec.recovery_tips[3], CHEST_BACK_TIP);
        assert_eq!(rec.recovery_tips[4], ARMS_SHOULDERS_TIP);
        assert_eq!(rec.recovery_tips[5], CLOSING_TIPS[0]);
    }

    #[test]
    fn test_generator_is_deterministic() {
        let groups = [MuscleGroup::Chest, MuscleGroup::Arms];
        let a = generate_food_recommendation(&groups, 321, 20, 14);
        let b = generate_food_recommendation(&groups, 321, 20, 14);
        assert_eq!(a, b);
    }

    #[test]
    fn test_spawn_outside_runtime_returns_none() {
        let input = RecommendationInput {
            muscle_groups: vec![MuscleGroup::Legs],
            calories_burned: 100,
            total_sets: 12,
            total_reps: 10,
        };
        assert!(RecommendationTask::spawn(input, Duration::from_millis(1)).is_none());
    }

    #[tokio::test]
    async fn test_task_delivers_after_latency() {
        let input = RecommendationInput {
            muscle_groups: vec![MuscleGroup::Legs],
            calories_burned: 100,
            total_sets: 12,
            total_reps: 10,
        };
        let mut task = RecommendationTask::spawn(input, Duration::from_millis(200)).unwrap();
        assert!(matches!(task.poll(), TaskPoll::Pending));

        let rec = task.wait().await.unwrap();
        assert_eq!(rec, generate_food_recommendation(&[MuscleGroup::Legs], 100, 12, 10));
    }
}
