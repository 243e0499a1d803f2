use std::{collections::BTreeSet, str::FromStr};

use anyhow::Result;
use tracing::{debug, info};

use crate::{
    live::{
        LiveError,
        summary::compute_summary,
        timer::{Clock, RestState, RestTimer, SystemClock},
    },
    models::{ExercisePerformance, ExerciseSpec, ExerciseSummary, PerformanceRecord, SetResult},
    storage::{SessionSnapshot, SessionStore},
};

/// Inputs that can be staged before a set is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfField {
    Reps,
    Load,
    Rpe,
}

impl FromStr for PerfField {
    type Err = LiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reps" | "r" => Ok(Self::Reps),
            "load" | "weight" | "kg" | "l" => Ok(Self::Load),
            "rpe" | "rir" => Ok(Self::Rpe),
            other => Err(LiveError::UnknownField(other.to_string())),
        }
    }
}

/// Where the cursor ended up after moving forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved(usize),
    Summary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// More sets to go; a rest of `secs` seconds has started.
    Rest { done: usize, target: usize, secs: u64 },
    /// The exercise reached its target.
    ExerciseDone { name: String, advance: Advance },
}

/// Controller for one workout being performed.
///
/// `original` is the program as written; `exercises` is what is still left to
/// do. Every mutation rewrites the full draft through the injected store.
pub struct LiveSession<S: SessionStore, C: Clock = SystemClock> {
    workout_id: String,
    original: Vec<ExerciseSpec>,
    exercises: Vec<ExerciseSpec>,
    index: usize,
    performance: PerformanceRecord,
    completed: BTreeSet<String>,
    timer: RestTimer,
    show_summary: bool,
    store: S,
    clock: C,
}

fn sets_done_in(performance: &PerformanceRecord, name: &str) -> usize {
    performance.get(name).map_or(0, |p| p.sets.len())
}

/// Exercises that have not reached their target set count yet.
pub fn remaining_exercises(
    original: &[ExerciseSpec],
    performance: &PerformanceRecord,
) -> Vec<ExerciseSpec> {
    original
        .iter()
        .filter(|ex| sets_done_in(performance, &ex.name) < ex.target_sets())
        .cloned()
        .collect()
}

impl<S: SessionStore, C: Clock> LiveSession<S, C> {
    /// Starts a session for `workout_id`, resuming its draft when one exists.
    pub fn open(
        workout_id: impl Into<String>,
        original: Vec<ExerciseSpec>,
        store: S,
        clock: C,
    ) -> Result<Self> {
        let workout_id = workout_id.into();
        let now = clock.now_ms();

        let mut session = match store.load(&workout_id) {
            Some(saved) => {
                let exercises = remaining_exercises(&original, &saved.performance);
                let index = resolve_index(&saved, &exercises);
                info!(
                    workout_id = %workout_id,
                    remaining = exercises.len(),
                    index,
                    "resuming live session from draft"
                );
                Self {
                    timer: RestTimer::restore(
                        saved.resting,
                        saved.rest_duration,
                        saved.rest_start_ts,
                        now,
                    ),
                    workout_id,
                    original,
                    exercises,
                    index,
                    performance: saved.performance,
                    completed: saved.completed_exercises,
                    show_summary: false,
                    store,
                    clock,
                }
            }
            None => {
                info!(workout_id = %workout_id, "starting fresh live session");
                let rest = original
                    .first()
                    .map(ExerciseSpec::rest_seconds)
                    .unwrap_or(crate::models::DEFAULT_REST_SECS);
                Self {
                    exercises: original.clone(),
                    timer: RestTimer::restore(false, rest, None, now),
                    workout_id,
                    original,
                    index: 0,
                    performance: PerformanceRecord::new(),
                    completed: BTreeSet::new(),
                    show_summary: false,
                    store,
                    clock,
                }
            }
        };

        if session.exercises.is_empty() {
            session.show_summary = true;
        }
        session.persist()?;
        Ok(session)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            performance: self.performance.clone(),
            completed_exercises: self.completed.clone(),
            current_exercise_index: self.index,
            exercises: self.exercises.clone(),
            resting: self.timer.is_resting(),
            rest_duration: self.timer.duration(),
            rest_start_ts: self.timer.started_at(),
        }
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&self.workout_id, &self.snapshot())?;
        debug!(workout_id = %self.workout_id, index = self.index, "draft written");
        Ok(())
    }

    /// Stages a value for the current exercise without completing a set.
    /// Returns `false` when there is no current exercise.
    pub fn record_field_input(&mut self, field: PerfField, value: impl Into<String>) -> Result<bool> {
        let Some(name) = self.current().map(|ex| ex.name.clone()) else {
            return Ok(false);
        };
        let perf = self.performance.entry(name).or_default();
        let value = Some(value.into());
        match field {
            PerfField::Reps => perf.reps = value,
            PerfField::Load => perf.load = value,
            PerfField::Rpe => perf.rpe = value,
        }
        self.persist()?;
        Ok(true)
    }

    /// Records a set for the current exercise. `None` when there is nothing
    /// left to record against.
    pub fn complete_set(&mut self) -> Result<Option<SetOutcome>> {
        let Some(ex) = self.current().cloned() else {
            return Ok(None);
        };
        // moving on to the next set ends any rest still running
        self.timer.skip();

        let perf = self.performance.entry(ex.name.clone()).or_default();
        let reps = perf.reps.clone().or_else(|| ex.reps.clone()).unwrap_or_default();
        let load = perf.load.clone().or_else(|| ex.load.clone()).unwrap_or_default();
        let rpe = perf.rpe.clone().filter(|r| !r.trim().is_empty());

        perf.reps = Some(reps.clone());
        perf.load = Some(load.clone());
        perf.sets.push(SetResult { reps, load, rpe });

        let done = perf.sets.len();
        let target = ex.target_sets();
        debug!(exercise = %ex.name, done, target, "set completed");

        let outcome = if done < target {
            let secs = ex.rest_seconds();
            self.timer.begin(secs, self.clock.now_ms());
            SetOutcome::Rest { done, target, secs }
        } else {
            self.completed.insert(ex.name.clone());
            let advance = self.step_forward();
            SetOutcome::ExerciseDone {
                name: ex.name,
                advance,
            }
        };

        self.persist()?;
        Ok(Some(outcome))
    }

    fn step_forward(&mut self) -> Advance {
        let next = self.index + 1;
        if next < self.exercises.len() {
            self.index = next;
            Advance::Moved(next)
        } else {
            self.show_summary = true;
            Advance::Summary
        }
    }

    /// Moves to the next exercise, or to the summary after the last one.
    pub fn advance(&mut self) -> Result<Advance> {
        let advance = self.step_forward();
        self.persist()?;
        Ok(advance)
    }

    /// Moves back one exercise. No-op at the first one.
    pub fn retreat(&mut self) -> Result<bool> {
        if self.index == 0 {
            return Ok(false);
        }
        self.index -= 1;
        self.persist()?;
        Ok(true)
    }

    /// Leaves the summary and returns to the current exercise.
    pub fn resume_workout(&mut self) {
        if !self.exercises.is_empty() {
            self.show_summary = false;
        }
    }

    pub fn skip_rest(&mut self) -> Result<bool> {
        if !self.timer.skip() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Recomputes the rest timer against the clock. Returns `true` when the
    /// rest ran out during this call.
    pub fn tick(&mut self) -> Result<bool> {
        if !self.timer.tick(self.clock.now_ms()) {
            return Ok(false);
        }
        info!(workout_id = %self.workout_id, "rest finished");
        self.persist()?;
        Ok(true)
    }

    /// Drops the draft for this workout.
    pub fn discard(&self) -> Result<()> {
        self.store.clear(&self.workout_id)
    }

    pub fn summary(&self) -> Vec<ExerciseSummary> {
        compute_summary(&self.original, &self.performance)
    }

    pub fn workout_id(&self) -> &str {
        &self.workout_id
    }

    pub fn current(&self) -> Option<&ExerciseSpec> {
        self.exercises.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn exercises(&self) -> &[ExerciseSpec] {
        &self.exercises
    }

    pub fn original(&self) -> &[ExerciseSpec] {
        &self.original
    }

    pub fn performance(&self, name: &str) -> Option<&ExercisePerformance> {
        self.performance.get(name)
    }

    pub fn sets_done(&self, name: &str) -> usize {
        sets_done_in(&self.performance, name)
    }

    pub fn is_completed(&self, name: &str) -> bool {
        self.completed.contains(name)
    }

    /// 1-based number of the set about to be performed.
    pub fn current_set_number(&self) -> usize {
        match self.current() {
            Some(ex) => (self.sets_done(&ex.name) + 1).min(ex.target_sets()),
            None => 1,
        }
    }

    pub fn is_resting(&self) -> bool {
        self.timer.is_resting()
    }

    pub fn rest_remaining(&self) -> u64 {
        self.timer.remaining(self.clock.now_ms())
    }

    pub fn timer_state(&self) -> RestState {
        self.timer.state()
    }

    pub fn rest_duration(&self) -> u64 {
        self.timer.duration()
    }

    pub fn show_summary(&self) -> bool {
        self.show_summary
    }

    /// Whether any exercise in the program is still short of its target.
    pub fn has_unfinished(&self) -> bool {
        self.original
            .iter()
            .any(|ex| self.sets_done(&ex.name) < ex.target_sets())
    }
}

/// The saved index, clamped into the (possibly shorter) remaining list.
fn resolve_index(saved: &SessionSnapshot, remaining: &[ExerciseSpec]) -> usize {
    saved
        .current_exercise_index
        .min(remaining.len().saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::timer::ManualClock;
    use crate::models::ExerciseStatus;
    use crate::storage::MemorySessionStore;

    const T0: i64 = 1_700_000_000_000;

    fn ex(name: &str, sets: u32) -> ExerciseSpec {
        ExerciseSpec {
            name: name.into(),
            sets: Some(sets),
            reps: Some("8".into()),
            load: Some("40".into()),
            ..Default::default()
        }
    }

    fn program() -> Vec<ExerciseSpec> {
        vec![ex("Squat", 3), ex("Row", 2)]
    }

    #[test]
    fn fresh_session_writes_a_draft() {
        let store = MemorySessionStore::new();
        let session = LiveSession::open("w1", program(), &store, ManualClock::at(T0)).unwrap();
        assert!(store.contains("w1"));
        assert_eq!(session.current().unwrap().name, "Squat");
        assert_eq!(session.current_set_number(), 1);
        assert!(!session.is_resting());
    }

    #[test]
    fn status_tracks_set_count() {
        for n in 0..=3 {
            let store = MemorySessionStore::new();
            let mut session =
                LiveSession::open("w1", vec![ex("Squat", 3)], &store, ManualClock::at(T0)).unwrap();
            for _ in 0..n {
                session.complete_set().unwrap();
            }
            let expected = match n {
                0 => ExerciseStatus::NotStarted,
                3 => ExerciseStatus::Completed,
                _ => ExerciseStatus::Partial,
            };
            assert_eq!(session.summary()[0].status, expected, "after {n} sets");
        }
    }

    #[test]
    fn overrides_fall_back_to_targets() {
        let store = MemorySessionStore::new();
        let mut session = LiveSession::open("w1", program(), &store, ManualClock::at(T0)).unwrap();

        session.complete_set().unwrap();
        session.record_field_input(PerfField::Load, "45").unwrap();
        session.record_field_input(PerfField::Rpe, "9").unwrap();
        session.complete_set().unwrap();

        let sets = &session.performance("Squat").unwrap().sets;
        assert_eq!(
            sets[0],
            SetResult { reps: "8".into(), load: "40".into(), rpe: None }
        );
        assert_eq!(
            sets[1],
            SetResult { reps: "8".into(), load: "45".into(), rpe: Some("9".into()) }
        );
    }

    #[test]
    fn input_is_not_validated() {
        let store = MemorySessionStore::new();
        let mut session = LiveSession::open("w1", program(), &store, ManualClock::at(T0)).unwrap();
        session.record_field_input(PerfField::Reps, "lots").unwrap();
        session.complete_set().unwrap();
        assert_eq!(session.performance("Squat").unwrap().sets[0].reps, "lots");
    }

    #[test]
    fn unparsable_rest_defaults_to_sixty_seconds() {
        let store = MemorySessionStore::new();
        let mut squat = ex("Squat", 2);
        squat.rest = Some("soon".into());
        let mut session = LiveSession::open("w1", vec![squat], &store, ManualClock::at(T0)).unwrap();
        let outcome = session.complete_set().unwrap().unwrap();
        assert_eq!(outcome, SetOutcome::Rest { done: 1, target: 2, secs: 60 });
        assert_eq!(session.rest_remaining(), 60);
    }

    #[test]
    fn rest_expires_on_tick_and_is_persisted() {
        let store = MemorySessionStore::new();
        let clock = ManualClock::at(T0);
        let mut squat = ex("Squat", 3);
        squat.rest = Some("1".into());
        let mut session = LiveSession::open("w1", vec![squat], &store, clock.clone()).unwrap();

        session.complete_set().unwrap();
        assert!(store.load("w1").unwrap().resting);

        clock.advance_secs(59);
        assert!(!session.tick().unwrap());
        assert_eq!(session.rest_remaining(), 1);

        clock.advance_secs(1);
        assert!(session.tick().unwrap());
        let saved = store.load("w1").unwrap();
        assert!(!saved.resting);
        assert_eq!(saved.rest_start_ts, None);
    }

    #[test]
    fn skip_rest_goes_idle() {
        let store = MemorySessionStore::new();
        let mut session = LiveSession::open("w1", program(), &store, ManualClock::at(T0)).unwrap();
        assert!(!session.skip_rest().unwrap());
        session.complete_set().unwrap();
        assert!(session.skip_rest().unwrap());
        assert!(!store.load("w1").unwrap().resting);
    }

    #[test]
    fn retreat_and_advance_are_bounded() {
        let store = MemorySessionStore::new();
        let mut session = LiveSession::open("w1", program(), &store, ManualClock::at(T0)).unwrap();

        assert!(!session.retreat().unwrap());
        assert_eq!(session.advance().unwrap(), Advance::Moved(1));
        assert_eq!(store.load("w1").unwrap().current_exercise_index, 1);
        assert_eq!(session.advance().unwrap(), Advance::Summary);
        assert_eq!(session.index(), 1);
        assert!(session.show_summary());

        session.resume_workout();
        assert!(!session.show_summary());
        assert!(session.retreat().unwrap());
        assert_eq!(session.index(), 0);
    }

    #[test]
    fn zero_target_sets_need_one_set() {
        let store = MemorySessionStore::new();
        let mut session =
            LiveSession::open("w1", vec![ex("Plank", 0), ex("Row", 2)], &store, ManualClock::at(T0))
                .unwrap();
        let outcome = session.complete_set().unwrap().unwrap();
        assert_eq!(
            outcome,
            SetOutcome::ExerciseDone { name: "Plank".into(), advance: Advance::Moved(1) }
        );
        assert!(session.is_completed("Plank"));
    }

    #[test]
    fn reload_drops_finished_exercises() {
        let store = MemorySessionStore::new();
        let clock = ManualClock::at(T0);
        {
            let mut session = LiveSession::open("w1", program(), &store, clock.clone()).unwrap();
            for _ in 0..3 {
                session.complete_set().unwrap();
            }
            assert_eq!(session.current().unwrap().name, "Row");
        }

        let first = LiveSession::open("w1", program(), &store, clock.clone()).unwrap();
        let names: Vec<_> = first.exercises().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["Row"]);
        assert_eq!(first.index(), 0);
        assert!(first.is_completed("Squat"));
        drop(first);

        // same performance, same list
        let second = LiveSession::open("w1", program(), &store, clock).unwrap();
        assert_eq!(second.exercises(), &[ex("Row", 2)]);
    }

    #[test]
    fn reload_clamps_stale_index() {
        let store = MemorySessionStore::new();
        let mut performance = PerformanceRecord::new();
        performance.insert(
            "Squat".into(),
            ExercisePerformance {
                sets: vec![SetResult { reps: "5".into(), load: "1".into(), rpe: None }; 3],
                ..Default::default()
            },
        );
        let snapshot = SessionSnapshot {
            performance,
            current_exercise_index: 5,
            ..Default::default()
        };
        store.save("w1", &snapshot).unwrap();

        let session = LiveSession::open("w1", program(), &store, ManualClock::at(T0)).unwrap();
        assert_eq!(session.exercises().len(), 1);
        assert_eq!(session.index(), 0);
    }

    #[test]
    fn reload_clamps_saved_index_into_remaining() {
        let store = MemorySessionStore::new();
        let clock = ManualClock::at(T0);
        let three = vec![ex("Bench", 1), ex("Squat", 2), ex("Row", 2)];
        {
            let mut session = LiveSession::open("w1", three.clone(), &store, clock.clone()).unwrap();
            session.complete_set().unwrap();
            assert_eq!(session.index(), 1);
            assert_eq!(session.current().unwrap().name, "Squat");
        }
        // Bench drops out of the list; index 1 now points at Row
        let session = LiveSession::open("w1", three, &store, clock).unwrap();
        assert_eq!(session.exercises().len(), 2);
        assert_eq!(session.index(), 1);
        assert_eq!(session.current().unwrap().name, "Row");
    }

    #[test]
    fn reload_restores_running_rest() {
        let store = MemorySessionStore::new();
        let clock = ManualClock::at(T0);
        {
            let mut session = LiveSession::open("w1", program(), &store, clock.clone()).unwrap();
            session.complete_set().unwrap();
        }
        clock.advance_secs(20);
        let session = LiveSession::open("w1", program(), &store, clock.clone()).unwrap();
        assert!(session.is_resting());
        assert_eq!(session.rest_remaining(), 40);
        drop(session);

        clock.advance_secs(120);
        let session = LiveSession::open("w1", program(), &store, clock).unwrap();
        assert!(!session.is_resting());
        assert_eq!(session.timer_state(), RestState::Idle);
    }

    #[test]
    fn fully_done_draft_opens_on_summary() {
        let store = MemorySessionStore::new();
        let clock = ManualClock::at(T0);
        {
            let mut session =
                LiveSession::open("w1", vec![ex("Row", 1)], &store, clock.clone()).unwrap();
            session.complete_set().unwrap();
        }
        let mut session = LiveSession::open("w1", vec![ex("Row", 1)], &store, clock).unwrap();
        assert!(session.current().is_none());
        assert!(session.show_summary());
        assert_eq!(session.complete_set().unwrap(), None);
        session.resume_workout();
        assert!(session.show_summary());
    }

    #[test]
    fn field_names_parse() {
        assert_eq!("REPS".parse::<PerfField>().unwrap(), PerfField::Reps);
        assert_eq!("kg".parse::<PerfField>().unwrap(), PerfField::Load);
        assert!("tempo".parse::<PerfField>().is_err());
    }
}
