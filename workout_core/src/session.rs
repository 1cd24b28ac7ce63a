//! Session state machine.
//!
//! Drives one workout from environment choice through plan selection,
//! set-by-set execution with rests, to the completion summary and the hand-off
//! to storage:
//!
//! ```text
//! Environment -> Select -> Active <-> Rest
//!                            |
//!                            v
//!                        Complete -> Results
//! ```
//!
//! Every operation either succeeds or returns [`Error::InvalidTransition`]
//! without touching state. Side effects (rest countdowns, recommendation
//! tasks, storage writes) only happen on transitions.

use crate::clock::Clock;
use crate::metrics::{calculate_metrics, muscle_groups_worked};
use crate::recommend::{
    default_recommendation, generate_food_recommendation, RecommendationInput,
    RecommendationTask, TaskPoll,
};
use crate::rest::{format_countdown, RestEvent, RestScheduler};
use crate::storage::SessionStore;
use crate::suggest::{default_workout, manual_entry, suggest_workout};
use crate::{
    Environment, Error, Exercise, ExerciseCatalog, FoodRecommendation, Goal, MuscleGroup,
    PlannedExercise, Result, SavedWorkoutRecord, SessionState, Step, WorkoutMetrics,
    WorkoutSessionRecord,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Tunables for a session
#[derive(Clone, Debug)]
pub struct SessionSettings {
    /// Rest between the last set of one exercise and the first set of the next
    pub inter_exercise_rest_seconds: u32,
    /// When off, `suggest_plan` falls back to the first three candidates
    pub suggestions_enabled: bool,
    /// When off, the default recommendation is used
    pub recommendations_enabled: bool,
    /// Simulated generator latency; zero computes inline
    pub recommendation_latency: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            inter_exercise_rest_seconds: 60,
            suggestions_enabled: true,
            recommendations_enabled: true,
            recommendation_latency: Duration::from_millis(1500),
        }
    }
}

/// What completing a set led to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOutcome {
    /// Resting before the next set of the same exercise
    NextSet { rest_seconds: u32 },
    /// Resting before the first set of the next exercise
    NextExercise { rest_seconds: u32 },
    /// That was the last set; the session is complete
    Finished,
}

/// The user's choice at the end of a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveDecision {
    Discard,
    /// Keep the session; a non-empty name also creates a saved workout
    Save { name: Option<String> },
}

/// Records handed to storage when a session is finished
#[derive(Clone, Debug)]
pub struct SessionOutcome {
    pub session: WorkoutSessionRecord,
    pub saved_workout: Option<SavedWorkoutRecord>,
}

/// Orchestrates a single workout session
pub struct SessionEngine {
    state: SessionState,
    settings: SessionSettings,
    clock: Arc<dyn Clock>,
    rest: RestScheduler,
    pending: Option<RecommendationTask>,
    /// Session record already accepted by the store on an earlier `finish`
    stored_session: Option<WorkoutSessionRecord>,
}

impl SessionEngine {
    pub fn new(clock: Arc<dyn Clock>, settings: SessionSettings) -> Self {
        Self {
            state: SessionState::default(),
            settings,
            clock,
            rest: RestScheduler::new(),
            pending: None,
            stored_session: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn step(&self) -> Step {
        self.state.step
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Remaining rest rendered as `m:ss`
    pub fn rest_display(&self) -> String {
        format_countdown(self.state.rest_seconds_remaining)
    }

    fn require(&self, step: Step, action: &str) -> Result<()> {
        if self.state.step == step {
            Ok(())
        } else {
            Err(Error::transition(
                self.state.step,
                format!("{} is only allowed in {:?}", action, step),
            ))
        }
    }

    // ------------------------------------------------------------------
    // Environment step
    // ------------------------------------------------------------------

    pub fn select_environment(&mut self, environment: Environment) -> Result<()> {
        self.require(Step::Environment, "choosing an environment")?;
        self.state.environment = Some(environment);
        tracing::debug!("Environment selected: {:?}", environment);
        Ok(())
    }

    /// Environment -> Select
    pub fn continue_to_select(&mut self) -> Result<()> {
        self.require(Step::Environment, "continuing to selection")?;
        if self.state.environment.is_none() {
            return Err(Error::transition(
                Step::Environment,
                "an environment must be chosen first",
            ));
        }
        self.state.step = Step::Select;
        tracing::info!("Session step: Select");
        Ok(())
    }

    /// Select -> Environment, dropping the muscle group and plan
    pub fn back_to_environment(&mut self) -> Result<()> {
        self.require(Step::Select, "going back")?;
        self.state.muscle_group = None;
        self.state.plan.clear();
        self.state.step = Step::Environment;
        tracing::info!("Session step: Environment");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Select step
    // ------------------------------------------------------------------

    pub fn select_goal(&mut self, goal: Goal) -> Result<()> {
        match self.state.step {
            Step::Environment | Step::Select => {
                self.state.goal = goal;
                Ok(())
            }
            step => Err(Error::transition(step, "goal can only change before starting")),
        }
    }

    /// Choose the muscle group; a plan built for another group is discarded
    pub fn select_muscle_group(&mut self, group: MuscleGroup) -> Result<()> {
        self.require(Step::Select, "choosing a muscle group")?;
        if self.state.muscle_group != Some(group) && !self.state.plan.is_empty() {
            tracing::debug!("Muscle group changed, clearing plan");
            self.state.plan.clear();
        }
        self.state.muscle_group = Some(group);
        Ok(())
    }

    /// Candidates matching the session's muscle group and environment
    pub fn available_exercises<C: ExerciseCatalog + ?Sized>(
        &self,
        catalog: &C,
    ) -> Result<Vec<Exercise>> {
        self.require(Step::Select, "listing exercises")?;
        let group = self.state.muscle_group.ok_or_else(|| {
            Error::transition(Step::Select, "a muscle group must be chosen first")
        })?;
        Ok(catalog.list_exercises_by_muscle_group(group, self.state.environment))
    }

    fn check_fits(&self, exercise: &Exercise) -> Result<()> {
        if self.state.muscle_group != Some(exercise.muscle_group) {
            return Err(Error::PlanFilter(format!(
                "'{}' trains {}, not the selected muscle group",
                exercise.name, exercise.muscle_group
            )));
        }
        if let Some(env) = self.state.environment {
            if !exercise.environment.fits(env) {
                return Err(Error::PlanFilter(format!(
                    "'{}' cannot be done at {}",
                    exercise.name, env
                )));
            }
        }
        Ok(())
    }

    /// Add an exercise with manual-entry volume, or remove it if already planned
    ///
    /// Returns `true` when the exercise was added.
    pub fn toggle_exercise(&mut self, exercise: &Exercise) -> Result<bool> {
        self.require(Step::Select, "editing the plan")?;

        if let Some(pos) = self
            .state
            .plan
            .iter()
            .position(|p| p.exercise.id == exercise.id)
        {
            self.state.plan.remove(pos);
            return Ok(false);
        }

        self.check_fits(exercise)?;
        self.state.plan.push(manual_entry(exercise));
        Ok(true)
    }

    /// Replace the plan with a suggestion for the current goal
    pub fn suggest_plan<C, R>(&mut self, catalog: &C, rng: &mut R) -> Result<&[PlannedExercise]>
    where
        C: ExerciseCatalog + ?Sized,
        R: Rng + ?Sized,
    {
        let candidates = self.available_exercises(catalog)?;
        self.state.plan = if self.settings.suggestions_enabled {
            suggest_workout(&candidates, self.state.goal, rng)
        } else {
            tracing::info!("Suggestions disabled, using default workout");
            default_workout(&candidates)
        };
        Ok(&self.state.plan)
    }

    /// Replace the plan wholesale after checking every entry
    pub fn set_plan(&mut self, plan: Vec<PlannedExercise>) -> Result<()> {
        self.require(Step::Select, "editing the plan")?;
        for planned in &plan {
            self.check_fits(&planned.exercise)?;
            if planned.sets == 0 {
                return Err(Error::PlanFilter(format!(
                    "'{}' must have at least one set",
                    planned.exercise.name
                )));
            }
        }
        self.state.plan = plan;
        Ok(())
    }

    /// Live totals for the current plan
    pub fn plan_metrics(&self) -> WorkoutMetrics {
        calculate_metrics(&self.state.plan)
    }

    /// Select -> Active
    pub fn start(&mut self) -> Result<()> {
        self.require(Step::Select, "starting")?;
        if self.state.plan.is_empty() {
            return Err(Error::transition(Step::Select, "the plan is empty"));
        }

        self.state.started_at = Some(self.clock.now());
        self.state.current_exercise_index = 0;
        self.state.current_set = 1;
        self.state.step = Step::Active;
        tracing::info!("Session started with {} exercises", self.state.plan.len());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Active / Rest
    // ------------------------------------------------------------------

    /// Record the current set as done and move on
    pub fn complete_set(&mut self) -> Result<SetOutcome> {
        self.require(Step::Active, "completing a set")?;

        let idx = self.state.current_exercise_index;
        let planned = &self.state.plan[idx];

        if self.state.current_set < planned.sets {
            let rest_seconds = planned.rest_seconds;
            self.state.current_set += 1;
            tracing::info!(
                "Set done, next: {} set {}",
                planned.exercise.name,
                self.state.current_set
            );
            self.begin_rest(rest_seconds);
            return Ok(SetOutcome::NextSet { rest_seconds });
        }

        self.state.plan[idx].completed = true;

        if idx + 1 < self.state.plan.len() {
            let rest_seconds = self.settings.inter_exercise_rest_seconds;
            self.state.current_exercise_index += 1;
            self.state.current_set = 1;
            tracing::info!(
                "Exercise done, next: {}",
                self.state.plan[idx + 1].exercise.name
            );
            self.begin_rest(rest_seconds);
            Ok(SetOutcome::NextExercise { rest_seconds })
        } else {
            self.enter_complete();
            Ok(SetOutcome::Finished)
        }
    }

    fn begin_rest(&mut self, seconds: u32) {
        match self.rest.start(seconds, self.clock.now()) {
            RestEvent::Tick { remaining } => {
                self.state.step = Step::Rest;
                self.state.is_resting = true;
                self.state.rest_seconds_remaining = remaining;
            }
            // Zero-length rest: stay active
            RestEvent::Completed | RestEvent::Idle => self.end_rest(),
        }
    }

    fn end_rest(&mut self) {
        self.state.step = Step::Active;
        self.state.is_resting = false;
        self.state.rest_seconds_remaining = 0;
    }

    fn apply_rest_event(&mut self, event: RestEvent) -> RestEvent {
        match event {
            RestEvent::Tick { remaining } => self.state.rest_seconds_remaining = remaining,
            RestEvent::Completed => {
                tracing::info!("Rest over");
                self.end_rest();
            }
            RestEvent::Idle => {}
        }
        event
    }

    /// One-second tick from a driver; a no-op outside Rest
    pub fn tick(&mut self) -> RestEvent {
        if self.state.step != Step::Rest {
            return RestEvent::Idle;
        }
        let event = self.rest.tick();
        self.apply_rest_event(event)
    }

    /// Bring the rest countdown up to date with the clock
    pub fn sync(&mut self) -> RestEvent {
        if self.state.step != Step::Rest {
            return RestEvent::Idle;
        }
        let event = self.rest.sync(self.clock.now());
        self.apply_rest_event(event)
    }

    /// Rest -> Active immediately
    pub fn skip_rest(&mut self) -> Result<()> {
        self.require(Step::Rest, "skipping rest")?;
        let event = self.rest.skip();
        self.apply_rest_event(event);
        // A countdown that already ran out still lands in Active
        if self.state.step == Step::Rest {
            self.end_rest();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Complete / Results
    // ------------------------------------------------------------------

    fn enter_complete(&mut self) {
        self.rest.stop();
        let metrics = calculate_metrics(&self.state.plan);

        self.state.ended_at = Some(self.clock.now());
        self.state.metrics = Some(metrics);
        self.state.is_resting = false;
        self.state.rest_seconds_remaining = 0;
        self.state.step = Step::Complete;
        tracing::info!(
            "Session complete: {} sets, {} calories",
            metrics.total_sets,
            metrics.total_calories
        );

        if !self.settings.recommendations_enabled {
            self.state.recommendation = Some(default_recommendation());
            self.state.recommendation_loading = false;
            return;
        }

        let input = RecommendationInput {
            muscle_groups: muscle_groups_worked(&self.state.plan),
            calories_burned: metrics.total_calories,
            total_sets: metrics.total_sets,
            total_reps: metrics.total_reps,
        };

        if !self.settings.recommendation_latency.is_zero() {
            if let Some(task) =
                RecommendationTask::spawn(input.clone(), self.settings.recommendation_latency)
            {
                self.pending = Some(task);
                self.state.recommendation_loading = true;
                return;
            }
            tracing::debug!("No async runtime, generating recommendation inline");
        }

        self.state.recommendation = Some(generate_food_recommendation(
            &input.muscle_groups,
            input.calories_burned,
            input.total_sets,
            input.total_reps,
        ));
        self.state.recommendation_loading = false;
    }

    pub fn is_recommendation_loading(&self) -> bool {
        self.state.recommendation_loading
    }

    /// Collect a finished background recommendation, if any
    ///
    /// Returns whether a recommendation is now available.
    pub fn poll_recommendation(&mut self) -> bool {
        if let Some(task) = self.pending.as_mut() {
            match task.poll() {
                TaskPoll::Pending => {}
                TaskPoll::Ready(recommendation) => {
                    self.pending = None;
                    self.settle_recommendation(Some(recommendation));
                }
                TaskPoll::Failed => {
                    self.pending = None;
                    self.settle_recommendation(None);
                }
            }
        }
        self.state.recommendation.is_some()
    }

    /// Wait until the background recommendation is available
    pub async fn wait_for_recommendation(&mut self) -> Option<&FoodRecommendation> {
        if let Some(task) = self.pending.take() {
            let result = task.wait().await;
            self.settle_recommendation(result);
        }
        self.state.recommendation.as_ref()
    }

    fn settle_recommendation(&mut self, result: Option<FoodRecommendation>) {
        let recommendation = result.unwrap_or_else(|| {
            tracing::warn!("Recommendation unavailable, using default");
            default_recommendation()
        });
        self.state.recommendation = Some(recommendation);
        self.state.recommendation_loading = false;
    }

    /// Complete -> Results: hand the finished session to storage
    ///
    /// If storage fails the session stays in Complete so the caller can retry.
    /// A session record the store already accepted is not written twice.
    pub fn finish<S: SessionStore + ?Sized>(
        &mut self,
        decision: SaveDecision,
        store: &mut S,
    ) -> Result<SessionOutcome> {
        self.require(Step::Complete, "finishing")?;

        let metrics = self
            .state
            .metrics
            .unwrap_or_else(|| calculate_metrics(&self.state.plan));
        let now = self.clock.now();

        let (saved, name) = match decision {
            SaveDecision::Discard => (false, None),
            SaveDecision::Save { name } => (
                true,
                name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            ),
        };

        // A retry after a failed saved-workout write reuses the stored record
        let session = match self.stored_session.take() {
            Some(session) => session,
            None => {
                let session = WorkoutSessionRecord {
                    id: Uuid::new_v4(),
                    date: self.state.ended_at.unwrap_or(now),
                    started_at: self.state.started_at,
                    ended_at: self.state.ended_at,
                    environment: self.state.environment,
                    goal: Some(self.state.goal),
                    muscle_group: self.state.muscle_group,
                    exercises: self.state.plan.clone(),
                    total_calories: metrics.total_calories,
                    total_duration: metrics.total_duration,
                    total_rest_time: metrics.total_rest_time,
                    total_sets: metrics.total_sets,
                    total_reps: metrics.total_reps,
                    saved,
                };
                store.record_session(&session)?;
                session
            }
        };

        let saved_workout = match name {
            Some(name) => {
                let workout = SavedWorkoutRecord {
                    id: Uuid::new_v4(),
                    name,
                    date: now,
                    muscle_group: self.state.muscle_group,
                    total_calories: metrics.total_calories,
                    total_duration: metrics.total_duration,
                    session_id: Some(session.id),
                };
                if let Err(e) = store.record_saved_workout(&workout) {
                    tracing::error!("Session {} stored but saving failed: {}", session.id, e);
                    self.stored_session = Some(session);
                    return Err(e);
                }
                Some(workout)
            }
            None => None,
        };

        self.rest.stop();
        if self.pending.take().is_some() {
            tracing::debug!("Discarding in-flight recommendation");
        }
        self.state.recommendation_loading = false;
        self.state.step = Step::Results;
        tracing::info!("Session {} recorded (saved: {})", session.id, session.saved);

        Ok(SessionOutcome {
            session,
            saved_workout,
        })
    }

    /// Leave the session from any step, cancelling timers and background work
    pub fn abandon(mut self) {
        self.rest.stop();
        self.pending = None;
        tracing::info!("Session abandoned at {:?}", self.state.step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::JsonlStore;
    use crate::{build_default_catalog, DateRange, WorkoutStats};
    use chrono::{DateTime, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn inline_settings() -> SessionSettings {
        SessionSettings {
            recommendation_latency: Duration::ZERO,
            ..SessionSettings::default()
        }
    }

    fn engine_with(settings: SessionSettings) -> (SessionEngine, ManualClock) {
        let clock = ManualClock::new(t0());
        let engine = SessionEngine::new(Arc::new(clock.clone()), settings);
        (engine, clock)
    }

    fn exercise(id: &str) -> Exercise {
        build_default_catalog().get(id).unwrap().clone()
    }

    fn planned(id: &str, sets: u32, rest_seconds: u32) -> PlannedExercise {
        let exercise = exercise(id);
        PlannedExercise {
            reps: exercise.reps,
            exercise,
            sets,
            rest_seconds,
            completed: false,
        }
    }

    /// Engine in Select for home legs
    fn selecting(settings: SessionSettings) -> (SessionEngine, ManualClock) {
        let (mut engine, clock) = engine_with(settings);
        engine.select_environment(Environment::Home).unwrap();
        engine.continue_to_select().unwrap();
        engine.select_muscle_group(MuscleGroup::Legs).unwrap();
        (engine, clock)
    }

    fn assert_invariants(engine: &SessionEngine) {
        let s = engine.state();
        assert_eq!(
            s.is_resting,
            s.rest_seconds_remaining > 0 && s.step == Step::Rest
        );
        if matches!(s.step, Step::Active | Step::Rest) {
            assert!(s.current_exercise_index < s.plan.len());
            let sets = s.plan[s.current_exercise_index].sets;
            assert!((1..=sets).contains(&s.current_set));
        }
    }

    fn position(engine: &SessionEngine) -> (Step, usize, u32) {
        let s = engine.state();
        (s.step, s.current_exercise_index, s.current_set)
    }

    struct FailingStore;

    impl SessionStore for FailingStore {
        fn record_session(&mut self, _: &WorkoutSessionRecord) -> Result<Uuid> {
            Err(Error::Storage("disk full".into()))
        }
        fn record_saved_workout(&mut self, _: &SavedWorkoutRecord) -> Result<Uuid> {
            Err(Error::Storage("disk full".into()))
        }
        fn delete_saved_workout(&mut self, _: Uuid) -> Result<bool> {
            Ok(false)
        }
        fn list_saved_workouts(&self) -> Result<Vec<SavedWorkoutRecord>> {
            Ok(vec![])
        }
        fn list_sessions(&self, _: Option<&DateRange>) -> Result<Vec<WorkoutSessionRecord>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_continue_requires_environment() {
        let (mut engine, _) = engine_with(inline_settings());
        let err = engine.continue_to_select().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                step: Step::Environment,
                ..
            }
        ));
        assert_eq!(engine.step(), Step::Environment);
    }

    #[test]
    fn test_start_rejects_empty_plan() {
        let (mut engine, _) = selecting(inline_settings());
        assert!(engine.start().is_err());
        assert_eq!(engine.step(), Step::Select);
        assert!(engine.state().started_at.is_none());
    }

    #[test]
    fn test_actions_rejected_in_wrong_step() {
        let (mut engine, _) = engine_with(inline_settings());
        assert!(engine.complete_set().is_err());
        assert!(engine.skip_rest().is_err());
        assert!(engine.start().is_err());
        assert!(engine
            .finish(SaveDecision::Discard, &mut FailingStore)
            .is_err());
        assert_eq!(engine.tick(), RestEvent::Idle);
        assert_eq!(engine.step(), Step::Environment);
    }

    #[test]
    fn test_back_to_environment_clears_selection() {
        let (mut engine, _) = selecting(inline_settings());
        engine.toggle_exercise(&exercise("4")).unwrap();

        engine.back_to_environment().unwrap();
        assert_eq!(engine.step(), Step::Environment);
        assert!(engine.state().plan.is_empty());
        assert!(engine.state().muscle_group.is_none());
        assert_eq!(engine.state().environment, Some(Environment::Home));
    }

    #[test]
    fn test_toggle_enforces_filters() {
        let (mut engine, _) = selecting(inline_settings());

        // Leg Press is gym-only
        assert!(matches!(
            engine.toggle_exercise(&exercise("6")),
            Err(Error::PlanFilter(_))
        ));
        // Push-up is chest
        assert!(matches!(
            engine.toggle_exercise(&exercise("1")),
            Err(Error::PlanFilter(_))
        ));
        assert!(engine.state().plan.is_empty());

        assert!(engine.toggle_exercise(&exercise("4")).unwrap());
        assert_eq!(engine.state().plan[0].sets, 3);
        assert_eq!(engine.state().plan[0].rest_seconds, 60);
        assert!(!engine.toggle_exercise(&exercise("4")).unwrap());
        assert!(engine.state().plan.is_empty());
    }

    #[test]
    fn test_set_plan_rejects_mismatch_without_change() {
        let (mut engine, _) = selecting(inline_settings());
        engine.set_plan(vec![planned("4", 2, 30)]).unwrap();

        let err = engine.set_plan(vec![planned("5", 2, 30), planned("3", 2, 30)]);
        assert!(err.is_err());
        assert_eq!(engine.state().plan.len(), 1);
        assert_eq!(engine.state().plan[0].exercise.id, "4");

        assert!(engine.set_plan(vec![planned("5", 0, 30)]).is_err());
    }

    #[test]
    fn test_changing_muscle_group_clears_plan() {
        let (mut engine, _) = selecting(inline_settings());
        engine.toggle_exercise(&exercise("4")).unwrap();

        engine.select_muscle_group(MuscleGroup::Legs).unwrap();
        assert_eq!(engine.state().plan.len(), 1);

        engine.select_muscle_group(MuscleGroup::Back).unwrap();
        assert!(engine.state().plan.is_empty());
    }

    #[test]
    fn test_suggest_plan_respects_filters() {
        let catalog = build_default_catalog();
        let (mut engine, _) = engine_with(inline_settings());
        engine.select_environment(Environment::Gym).unwrap();
        engine.continue_to_select().unwrap();
        engine.select_goal(Goal::Endurance).unwrap();
        engine.select_muscle_group(MuscleGroup::Arms).unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let plan = engine.suggest_plan(&catalog, &mut rng).unwrap().to_vec();

        // Gym arms: Dips is home-only, leaving Bicep Curl and Tricep Extension
        assert_eq!(plan.len(), 2);
        for p in &plan {
            assert_eq!(p.exercise.muscle_group, MuscleGroup::Arms);
            assert_ne!(p.exercise.environment, Environment::Home);
            assert_eq!((p.sets, p.rest_seconds), (5, 30));
            assert!(p.reps >= 20);
        }
    }

    #[test]
    fn test_suggest_plan_without_muscle_group_rejected() {
        let catalog = build_default_catalog();
        let (mut engine, _) = engine_with(inline_settings());
        engine.select_environment(Environment::Home).unwrap();
        engine.continue_to_select().unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        assert!(engine.suggest_plan(&catalog, &mut rng).is_err());
    }

    #[test]
    fn test_suggestions_disabled_uses_default_workout() {
        let catalog = build_default_catalog();
        let (mut engine, _) = engine_with(SessionSettings {
            suggestions_enabled: false,
            ..inline_settings()
        });
        engine.select_environment(Environment::Both).unwrap();
        engine.continue_to_select().unwrap();
        engine.select_muscle_group(MuscleGroup::Abs).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let plan = engine.suggest_plan(&catalog, &mut rng).unwrap();
        let ids: Vec<_> = plan.iter().map(|p| p.exercise.id.as_str()).collect();
        assert_eq!(ids, vec!["7", "8", "9"]);
    }

    #[test]
    fn test_plan_progression_sequence() {
        let (mut engine, clock) = selecting(inline_settings());
        engine
            .set_plan(vec![planned("4", 2, 45), planned("5", 1, 45)])
            .unwrap();

        engine.start().unwrap();
        assert_eq!(engine.state().started_at, Some(t0()));
        assert_eq!(position(&engine), (Step::Active, 0, 1));
        assert_invariants(&engine);

        assert_eq!(
            engine.complete_set().unwrap(),
            SetOutcome::NextSet { rest_seconds: 45 }
        );
        assert_eq!(position(&engine), (Step::Rest, 0, 2));
        assert_eq!(engine.state().rest_seconds_remaining, 45);
        assert_invariants(&engine);

        engine.skip_rest().unwrap();
        assert_eq!(position(&engine), (Step::Active, 0, 2));
        assert_invariants(&engine);

        assert_eq!(
            engine.complete_set().unwrap(),
            SetOutcome::NextExercise { rest_seconds: 60 }
        );
        assert_eq!(position(&engine), (Step::Rest, 1, 1));
        assert!(engine.state().plan[0].completed);
        assert_eq!(engine.rest_display(), "1:00");
        assert_invariants(&engine);

        for _ in 0..59 {
            assert!(matches!(engine.tick(), RestEvent::Tick { .. }));
            assert_invariants(&engine);
        }
        assert_eq!(engine.tick(), RestEvent::Completed);
        assert_eq!(position(&engine), (Step::Active, 1, 1));

        clock.advance(chrono::Duration::minutes(5));
        assert_eq!(engine.complete_set().unwrap(), SetOutcome::Finished);
        assert_eq!(engine.step(), Step::Complete);
        assert_eq!(
            engine.state().ended_at,
            Some(t0() + chrono::Duration::minutes(5))
        );
        assert!(engine.state().plan.iter().all(|p| p.completed));
        assert!(!engine.state().is_resting);
    }

    #[test]
    fn test_sync_ends_rest_from_clock() {
        let (mut engine, clock) = selecting(inline_settings());
        engine.set_plan(vec![planned("4", 2, 30)]).unwrap();
        engine.start().unwrap();
        engine.complete_set().unwrap();

        clock.advance(chrono::Duration::milliseconds(10_500));
        assert_eq!(engine.sync(), RestEvent::Tick { remaining: 20 });
        assert_eq!(engine.rest_display(), "0:20");

        clock.advance(chrono::Duration::seconds(25));
        assert_eq!(engine.sync(), RestEvent::Completed);
        assert_eq!(position(&engine), (Step::Active, 0, 2));
        assert_eq!(engine.sync(), RestEvent::Idle);
    }

    #[test]
    fn test_zero_rest_stays_active() {
        let (mut engine, _) = selecting(inline_settings());
        engine.set_plan(vec![planned("4", 2, 0)]).unwrap();
        engine.start().unwrap();

        engine.complete_set().unwrap();
        assert_eq!(position(&engine), (Step::Active, 0, 2));
        assert_invariants(&engine);
    }

    #[test]
    fn test_completion_metrics_and_inline_recommendation() {
        let (mut engine, _) = selecting(inline_settings());
        // Squat: 10 cal/set, 20 reps
        engine.set_plan(vec![planned("4", 1, 45)]).unwrap();
        engine.start().unwrap();
        engine.complete_set().unwrap();

        let metrics = engine.state().metrics.unwrap();
        assert_eq!(metrics.total_calories, 10);
        assert_eq!(metrics.total_rest_time, 0);

        assert!(!engine.is_recommendation_loading());
        assert!(engine.poll_recommendation());
        assert_eq!(
            engine.state().recommendation.as_ref().unwrap(),
            &generate_food_recommendation(&[MuscleGroup::Legs], 10, 1, 20)
        );
    }

    #[test]
    fn test_disabled_recommendation_uses_default() {
        let (mut engine, _) = selecting(SessionSettings {
            recommendations_enabled: false,
            ..SessionSettings::default()
        });
        engine.set_plan(vec![planned("4", 1, 45)]).unwrap();
        engine.start().unwrap();
        engine.complete_set().unwrap();

        assert!(!engine.is_recommendation_loading());
        assert_eq!(
            engine.state().recommendation.as_ref().unwrap(),
            &default_recommendation()
        );
    }

    #[test]
    fn test_latency_without_runtime_computes_inline() {
        let (mut engine, _) = selecting(SessionSettings::default());
        engine.set_plan(vec![planned("4", 1, 45)]).unwrap();
        engine.start().unwrap();
        engine.complete_set().unwrap();

        assert!(!engine.is_recommendation_loading());
        assert!(engine.state().recommendation.is_some());
    }

    #[test]
    fn test_finish_records_session_and_saved_workout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(temp_dir.path());

        let (mut engine, _) = selecting(inline_settings());
        engine.set_plan(vec![planned("4", 1, 45)]).unwrap();
        engine.start().unwrap();
        engine.complete_set().unwrap();

        let outcome = engine
            .finish(
                SaveDecision::Save {
                    name: Some("  Leg day  ".into()),
                },
                &mut store,
            )
            .unwrap();
        assert_eq!(engine.step(), Step::Results);
        assert!(outcome.session.saved);
        assert_eq!(outcome.session.goal, Some(Goal::MuscleGain));
        assert_eq!(outcome.session.environment, Some(Environment::Home));

        let saved = outcome.saved_workout.unwrap();
        assert_eq!(saved.name, "Leg day");
        assert_eq!(saved.session_id, Some(outcome.session.id));

        assert_eq!(store.list_sessions(None).unwrap().len(), 1);
        assert_eq!(store.list_saved_workouts().unwrap().len(), 1);
        assert_eq!(
            store.get_stats(None).unwrap(),
            WorkoutStats {
                total_sessions: 1,
                total_calories: 10,
                total_duration: 3,
                avg_calories: 10.0,
                avg_duration: 3.0,
            }
        );

        // Results is terminal
        assert!(engine.finish(SaveDecision::Discard, &mut store).is_err());
    }

    #[test]
    fn test_finish_discard_and_unnamed_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(temp_dir.path());

        for (decision, saved) in [
            (SaveDecision::Discard, false),
            (SaveDecision::Save { name: Some("   ".into()) }, true),
            (SaveDecision::Save { name: None }, true),
        ] {
            let (mut engine, _) = selecting(inline_settings());
            engine.set_plan(vec![planned("5", 1, 45)]).unwrap();
            engine.start().unwrap();
            engine.complete_set().unwrap();

            let outcome = engine.finish(decision, &mut store).unwrap();
            assert_eq!(outcome.session.saved, saved);
            assert!(outcome.saved_workout.is_none());
        }

        assert_eq!(store.list_sessions(None).unwrap().len(), 3);
        assert!(store.list_saved_workouts().unwrap().is_empty());
    }

    #[test]
    fn test_store_failure_leaves_session_complete() {
        let (mut engine, _) = selecting(inline_settings());
        engine.set_plan(vec![planned("4", 1, 45)]).unwrap();
        engine.start().unwrap();
        engine.complete_set().unwrap();

        let result = engine.finish(SaveDecision::Discard, &mut FailingStore);
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(engine.step(), Step::Complete);
    }

    /// Records sessions on disk but refuses saved workouts until `fail_saves` runs out
    struct FlakySavedStore {
        inner: JsonlStore,
        fail_saves: u32,
    }

    impl SessionStore for FlakySavedStore {
        fn record_session(&mut self, session: &WorkoutSessionRecord) -> Result<Uuid> {
            self.inner.record_session(session)
        }
        fn record_saved_workout(&mut self, workout: &SavedWorkoutRecord) -> Result<Uuid> {
            if self.fail_saves > 0 {
                self.fail_saves -= 1;
                return Err(Error::Storage("saved workouts unavailable".into()));
            }
            self.inner.record_saved_workout(workout)
        }
        fn delete_saved_workout(&mut self, id: Uuid) -> Result<bool> {
            self.inner.delete_saved_workout(id)
        }
        fn list_saved_workouts(&self) -> Result<Vec<SavedWorkoutRecord>> {
            self.inner.list_saved_workouts()
        }
        fn list_sessions(&self, range: Option<&DateRange>) -> Result<Vec<WorkoutSessionRecord>> {
            self.inner.list_sessions(range)
        }
    }

    #[test]
    fn test_retry_after_saved_workout_failure_records_session_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FlakySavedStore {
            inner: JsonlStore::new(temp_dir.path()),
            fail_saves: 2,
        };

        let (mut engine, _) = selecting(inline_settings());
        engine.set_plan(vec![planned("4", 1, 45)]).unwrap();
        engine.start().unwrap();
        engine.complete_set().unwrap();

        let decision = SaveDecision::Save {
            name: Some("Legs".into()),
        };
        for _ in 0..2 {
            assert!(matches!(
                engine.finish(decision.clone(), &mut store),
                Err(Error::Storage(_))
            ));
            assert_eq!(engine.step(), Step::Complete);
        }
        assert_eq!(store.list_sessions(None).unwrap().len(), 1);

        let outcome = engine.finish(decision, &mut store).unwrap();
        assert_eq!(engine.step(), Step::Results);

        let sessions = store.list_sessions(None).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, outcome.session.id);

        let saved = store.list_saved_workouts().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].session_id, Some(outcome.session.id));
    }

    #[tokio::test]
    async fn test_abandon_aborts_recommendation_task() {
        let (mut engine, _) = selecting(SessionSettings {
            recommendation_latency: Duration::from_secs(30),
            ..SessionSettings::default()
        });
        engine.set_plan(vec![planned("4", 1, 45)]).unwrap();
        engine.start().unwrap();
        engine.complete_set().unwrap();
        assert!(engine.is_recommendation_loading());

        let task = engine
            .pending
            .as_ref()
            .map(RecommendationTask::abort_handle)
            .unwrap();
        assert!(!task.is_finished());

        engine.abandon();

        let finished = tokio::time::timeout(Duration::from_secs(1), async {
            while !task.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(finished.is_ok(), "recommendation task still running");
    }

    #[tokio::test]
    async fn test_async_recommendation_loading_flag() {
        crate::logging::init_test();
        let (mut engine, _) = selecting(SessionSettings {
            recommendation_latency: Duration::from_millis(50),
            ..SessionSettings::default()
        });
        engine.set_plan(vec![planned("4", 1, 45)]).unwrap();
        engine.start().unwrap();
        engine.complete_set().unwrap();

        assert_eq!(engine.step(), Step::Complete);
        assert!(engine.is_recommendation_loading());
        assert!(!engine.poll_recommendation());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(engine.poll_recommendation());
        assert!(!engine.is_recommendation_loading());
    }

    #[tokio::test]
    async fn test_wait_for_recommendation() {
        let (mut engine, _) = selecting(SessionSettings {
            recommendation_latency: Duration::from_millis(20),
            ..SessionSettings::default()
        });
        engine.set_plan(vec![planned("4", 2, 45)]).unwrap();
        engine.start().unwrap();
        engine.complete_set().unwrap();
        engine.skip_rest().unwrap();
        engine.complete_set().unwrap();

        let rec = engine.wait_for_recommendation().await.cloned().unwrap();
        assert_eq!(rec, generate_food_recommendation(&[MuscleGroup::Legs], 20, 2, 40));
        assert!(!engine.is_recommendation_loading());
    }

    #[tokio::test]
    async fn test_finish_discards_in_flight_recommendation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonlStore::new(temp_dir.path());

        let (mut engine, _) = selecting(SessionSettings {
            recommendation_latency: Duration::from_secs(30),
            ..SessionSettings::default()
        });
        engine.set_plan(vec![planned("4", 1, 45)]).unwrap();
        engine.start().unwrap();
        engine.complete_set().unwrap();
        assert!(engine.is_recommendation_loading());

        engine.finish(SaveDecision::Discard, &mut store).unwrap();
        assert!(!engine.is_recommendation_loading());
        assert!(!engine.poll_recommendation());
        assert!(engine.state().recommendation.is_none());
    }
}
