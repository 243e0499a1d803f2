use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
#[cfg(test)]
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::models::{DEFAULT_REST_SECS, ExerciseSpec, PerformanceRecord};

const DRAFT_PREFIX: &str = "live-";

/// Storage key for a workout's in-progress draft.
pub fn draft_key(workout_id: &str) -> String {
    format!("{DRAFT_PREFIX}{workout_id}")
}

fn default_rest() -> u64 {
    DEFAULT_REST_SECS
}

/// Everything needed to pick a live session back up after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub performance: PerformanceRecord,
    #[serde(default)]
    pub completed_exercises: BTreeSet<String>,
    #[serde(default)]
    pub current_exercise_index: usize,
    /// Exercises still on screen when the snapshot was taken.
    #[serde(default)]
    pub exercises: Vec<ExerciseSpec>,
    #[serde(default)]
    pub resting: bool,
    #[serde(default = "default_rest")]
    pub rest_duration: u64,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub rest_start_ts: Option<i64>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            performance: PerformanceRecord::new(),
            completed_exercises: BTreeSet::new(),
            current_exercise_index: 0,
            exercises: Vec::new(),
            resting: false,
            rest_duration: DEFAULT_REST_SECS,
            rest_start_ts: None,
        }
    }
}

/// Keyed persistence for live-session drafts. One writer per key.
pub trait SessionStore {
    /// Overwrites any draft already stored for `workout_id`.
    fn save(&self, workout_id: &str, snapshot: &SessionSnapshot) -> Result<()>;

    /// Missing or unreadable drafts are reported as `None`.
    fn load(&self, workout_id: &str) -> Option<SessionSnapshot>;

    fn clear(&self, workout_id: &str) -> Result<()>;
}

/// Drafts as pretty JSON files, one per workout, under a single directory.
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, workout_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", draft_key(workout_id)))
    }

    /// Workout ids that currently have a draft, newest first.
    pub fn pending(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read draft directory: {}", self.dir.display())
                });
            }
        };

        let mut drafts = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                let id = stem.strip_prefix(DRAFT_PREFIX)?.to_string();
                let modified = path
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                Some((modified, id))
            })
            .collect::<Vec<_>>();

        drafts.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(drafts.into_iter().map(|(_, id)| id).collect())
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, workout_id: &str, snapshot: &SessionSnapshot) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;
        let path = self.path(workout_id);
        let content = serde_json::to_string_pretty(snapshot)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to save draft to {}", path.display()))?;
        debug!(workout_id, path = %path.display(), "draft saved");
        Ok(())
    }

    fn load(&self, workout_id: &str) -> Option<SessionSnapshot> {
        let path = self.path(workout_id);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(workout_id, error = %e, "could not read draft, starting fresh");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(workout_id, error = %e, "malformed draft, starting fresh");
                None
            }
        }
    }

    fn clear(&self, workout_id: &str) -> Result<()> {
        let path = self.path(workout_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove draft {}", path.display()))
            }
        }
    }
}

/// In-process store. Holds serialized JSON so it behaves like the file store.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

#[cfg(test)]
impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw text under a workout's key, bypassing serialization.
    pub fn put_raw(&self, workout_id: &str, raw: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(draft_key(workout_id), raw.to_string());
        }
    }

    pub fn contains(&self, workout_id: &str) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(&draft_key(workout_id)))
            .unwrap_or(false)
    }
}

#[cfg(test)]
impl SessionStore for MemorySessionStore {
    fn save(&self, workout_id: &str, snapshot: &SessionSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("draft store lock poisoned"))?
            .insert(draft_key(workout_id), json);
        Ok(())
    }

    fn load(&self, workout_id: &str) -> Option<SessionSnapshot> {
        let entries = self.entries.lock().ok()?;
        let raw = entries.get(&draft_key(workout_id))?;
        match serde_json::from_str(raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(workout_id, error = %e, "malformed draft, starting fresh");
                None
            }
        }
    }

    fn clear(&self, workout_id: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("draft store lock poisoned"))?
            .remove(&draft_key(workout_id));
        Ok(())
    }
}

impl<S: SessionStore + ?Sized> SessionStore for &S {
    fn save(&self, workout_id: &str, snapshot: &SessionSnapshot) -> Result<()> {
        (**self).save(workout_id, snapshot)
    }

    fn load(&self, workout_id: &str) -> Option<SessionSnapshot> {
        (**self).load(workout_id)
    }

    fn clear(&self, workout_id: &str) -> Result<()> {
        (**self).clear(workout_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExercisePerformance, SetResult};

    fn sample() -> SessionSnapshot {
        let mut performance = PerformanceRecord::new();
        performance.insert(
            "Squat".into(),
            ExercisePerformance {
                reps: Some("5".into()),
                load: Some("100".into()),
                rpe: Some("8".into()),
                sets: vec![SetResult {
                    reps: "5".into(),
                    load: "100".into(),
                    rpe: Some("8".into()),
                }],
            },
        );
        SessionSnapshot {
            performance,
            completed_exercises: BTreeSet::from(["Bench".to_string()]),
            current_exercise_index: 1,
            exercises: vec![ExerciseSpec {
                name: "Squat".into(),
                sets: Some(3),
                ..Default::default()
            }],
            resting: true,
            rest_duration: 90,
            rest_start_ts: Some(1_700_000_000_000),
        }
    }

    fn temp_store() -> (FileSessionStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("spotter-drafts-{}", uuid::Uuid::new_v4()));
        (FileSessionStore::new(&dir), dir)
    }

    #[test]
    fn file_store_round_trip_and_clear() {
        let (store, dir) = temp_store();
        let snap = sample();

        assert_eq!(store.load("w1"), None);
        store.save("w1", &snap).unwrap();
        assert!(dir.join("live-w1.json").exists());
        assert_eq!(store.load("w1"), Some(snap));
        assert_eq!(store.pending().unwrap(), vec!["w1".to_string()]);

        store.clear("w1").unwrap();
        assert_eq!(store.load("w1"), None);
        // clearing twice is fine
        store.clear("w1").unwrap();
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn save_overwrites() {
        let store = MemorySessionStore::new();
        let mut snap = sample();
        store.save("w1", &snap).unwrap();
        snap.current_exercise_index = 0;
        snap.resting = false;
        store.save("w1", &snap).unwrap();
        assert_eq!(store.load("w1"), Some(snap));
    }

    #[test]
    fn malformed_draft_is_absent() {
        let (store, dir) = temp_store();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("live-w2.json"), "{ not json").unwrap();
        assert_eq!(store.load("w2"), None);
        fs::remove_dir_all(dir).ok();

        let mem = MemorySessionStore::new();
        mem.put_raw("w2", "[1, 2");
        assert_eq!(mem.load("w2"), None);
    }

    #[test]
    fn partial_draft_fills_defaults() {
        let mem = MemorySessionStore::new();
        mem.put_raw("w3", r#"{"currentExerciseIndex": 2}"#);
        let snap = mem.load("w3").unwrap();
        assert_eq!(snap.current_exercise_index, 2);
        assert_eq!(snap.rest_duration, 60);
        assert!(snap.performance.is_empty());
    }

    #[test]
    fn snapshot_uses_camel_case_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("completedExercises").is_some());
        assert!(json.get("restStartTs").is_some());
        assert!(json.get("currentExerciseIndex").is_some());
    }
}
