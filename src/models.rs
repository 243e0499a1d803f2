use std::{collections::HashMap, fmt::Display};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Rest used between sets when an exercise has no usable `rest` value.
pub const DEFAULT_REST_SECS: u64 = 60;

/// Title recorded in history when the workout can no longer be read.
pub const UNTITLED: &str = "Untitled";

/// A program a trainer writes for one trainee.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutProgram {
    pub id: String,
    pub trainee_id: String,
    pub trainer_id: Option<String>,
    pub title: String,
    pub goal: Option<String>,
    pub start_date: NaiveDate,
    pub is_active: bool,
    pub exercises: Vec<ExerciseSpec>,
}

/// One prescribed exercise. `name` is the key performance is tracked under,
/// so it must be unique within a program.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSpec {
    pub name: String,
    pub sets: Option<u32>,
    pub reps: Option<String>,
    pub load: Option<String>,
    /// Rest between sets, in minutes.
    pub rest: Option<String>,
    pub video: Option<String>,
    pub notes: Option<String>,
}

impl ExerciseSpec {
    /// Zero or missing set counts require exactly one set.
    pub fn target_sets(&self) -> usize {
        self.sets.filter(|s| *s > 0).unwrap_or(1) as usize
    }

    pub fn rest_seconds(&self) -> u64 {
        self.rest
            .as_deref()
            .and_then(|r| r.trim().parse::<f64>().ok())
            .filter(|m| m.is_finite() && *m > 0.0)
            .map(|m| (m * 60.0).round() as u64)
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_REST_SECS)
    }
}

/// A completed set. Values are kept exactly as they were typed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetResult {
    pub reps: String,
    pub load: String,
    #[serde(default)]
    pub rpe: Option<String>,
}

/// Staged inputs and completed sets for one exercise in a live session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExercisePerformance {
    #[serde(default)]
    pub reps: Option<String>,
    #[serde(default)]
    pub load: Option<String>,
    #[serde(default)]
    pub rpe: Option<String>,
    #[serde(default)]
    pub sets: Vec<SetResult>,
}

/// Performance keyed by exercise name.
pub type PerformanceRecord = HashMap<String, ExercisePerformance>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExerciseStatus {
    #[serde(rename = "Not started")]
    NotStarted,
    Partial,
    Completed,
}

impl ExerciseStatus {
    pub fn from_counts(done: usize, target: usize) -> Self {
        if done == 0 {
            Self::NotStarted
        } else if done < target {
            Self::Partial
        } else {
            Self::Completed
        }
    }

    /// Rolls per-exercise statuses up into one status for a whole workout.
    pub fn overall<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a ExerciseStatus>,
    {
        let statuses: Vec<_> = statuses.into_iter().collect();
        if statuses.is_empty() {
            return Self::NotStarted;
        }
        if statuses.iter().all(|s| **s == Self::Completed) {
            Self::Completed
        } else if statuses.iter().all(|s| **s == Self::NotStarted) {
            Self::NotStarted
        } else {
            Self::Partial
        }
    }
}

impl Display for ExerciseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "Not started",
            Self::Partial => "Partial",
            Self::Completed => "Completed",
        };

        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSummary {
    pub name: String,
    pub sets: usize,
    pub reps: String,
    pub load: String,
    pub rpe: String,
    pub status: ExerciseStatus,
}

/// A finished session as written to history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub trainee_id: String,
    pub workout_id: String,
    pub title: String,
    pub completed_at: DateTime<Utc>,
    pub summary: Vec<ExerciseSummary>,
}

impl HistoryEntry {
    pub fn status(&self) -> ExerciseStatus {
        ExerciseStatus::overall(self.summary.iter().map(|s| &s.status))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub id: String,
    pub trainee_id: String,
    pub weight: f64,
    pub body_fat: f64,
    pub waist: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: crate::types::Role,
    pub trainer_id: Option<String>,
    pub age: Option<u32>,
    pub height: Option<f64>,
    pub goal: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
