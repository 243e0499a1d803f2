use anyhow::Result;
use chrono::Utc;
use itertools::Itertools;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    catalog, history,
    live::{session::LiveSession, timer::Clock},
    models::{
        ExerciseSpec, ExerciseStatus, ExerciseSummary, HistoryEntry, PerformanceRecord, UNTITLED,
    },
    storage::SessionStore,
};

fn joined_or_dash<I>(mut values: I) -> String
where
    I: Iterator<Item = String>,
{
    let s = values.join(", ");
    if s.is_empty() { "-".to_string() } else { s }
}

/// Per-exercise results over the program as written, including exercises
/// that were never touched.
pub fn compute_summary(
    original: &[ExerciseSpec],
    performance: &PerformanceRecord,
) -> Vec<ExerciseSummary> {
    original
        .iter()
        .map(|ex| {
            let sets = performance
                .get(&ex.name)
                .map(|p| p.sets.as_slice())
                .unwrap_or_default();
            ExerciseSummary {
                name: ex.name.clone(),
                sets: sets.len(),
                reps: joined_or_dash(sets.iter().map(|s| s.reps.clone())),
                load: joined_or_dash(sets.iter().map(|s| s.load.clone())),
                rpe: joined_or_dash(
                    sets.iter()
                        .filter_map(|s| s.rpe.clone())
                        .filter(|r| !r.is_empty()),
                ),
                status: ExerciseStatus::from_counts(sets.len(), ex.target_sets()),
            }
        })
        .collect()
}

/// Writes the session to the trainee's history and drops its draft.
///
/// The title is looked up again at this point; if the workout is gone or the
/// read fails the entry is still written, titled "Untitled".
pub async fn finish<S, C>(
    pool: &SqlitePool,
    session: &LiveSession<S, C>,
    trainee_id: &str,
) -> Result<HistoryEntry>
where
    S: SessionStore,
    C: Clock,
{
    let workout_id = session.workout_id();
    let title = match catalog::workout_title(pool, workout_id).await {
        Ok(Some(title)) if !title.trim().is_empty() => title,
        Ok(_) => UNTITLED.to_string(),
        Err(e) => {
            warn!(workout_id, error = %e, "could not re-read workout title");
            UNTITLED.to_string()
        }
    };

    let entry = HistoryEntry {
        id: Uuid::new_v4().to_string(),
        trainee_id: trainee_id.to_string(),
        workout_id: workout_id.to_string(),
        title,
        completed_at: Utc::now(),
        summary: session.summary(),
    };

    history::append(pool, &entry).await?;
    // the entry is already written; a stale draft must not make the caller
    // finish again and append a duplicate
    if let Err(e) = session.discard() {
        warn!(workout_id, error = %e, "could not clear draft after finishing");
    }
    info!(workout_id, history_id = %entry.id, "workout finished");
    Ok(entry)
}
