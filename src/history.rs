use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::warn;

use crate::models::HistoryEntry;

#[derive(FromRow)]
struct HistoryRow {
    id: String,
    trainee_id: String,
    workout_id: String,
    title: String,
    completed_at: DateTime<Utc>,
    summary: String,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        let summary = serde_json::from_str(&row.summary).unwrap_or_else(|e| {
            warn!(history_id = %row.id, error = %e, "unreadable history summary");
            Vec::new()
        });
        Self {
            id: row.id,
            trainee_id: row.trainee_id,
            workout_id: row.workout_id,
            title: row.title,
            completed_at: row.completed_at,
            summary,
        }
    }
}

pub async fn append(pool: &SqlitePool, entry: &HistoryEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO history (id, trainee_id, workout_id, title, completed_at, summary)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.trainee_id)
    .bind(&entry.workout_id)
    .bind(&entry.title)
    .bind(entry.completed_at)
    .bind(serde_json::to_string(&entry.summary)?)
    .execute(pool)
    .await?;
    Ok(())
}

/// The trainee's finished workouts, newest first.
pub async fn list(pool: &SqlitePool, trainee_id: &str) -> Result<Vec<HistoryEntry>> {
    let rows: Vec<HistoryRow> = sqlx::query_as(
        r#"
        SELECT id, trainee_id, workout_id, title, completed_at, summary
        FROM   history
        WHERE  trainee_id = ?
        ORDER  BY completed_at DESC
        "#,
    )
    .bind(trainee_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{ExerciseStatus, ExerciseSummary};
    use chrono::Duration;

    fn entry(id: &str, completed_at: DateTime<Utc>, status: ExerciseStatus) -> HistoryEntry {
        HistoryEntry {
            id: id.into(),
            trainee_id: "t1".into(),
            workout_id: "w1".into(),
            title: "Push".into(),
            completed_at,
            summary: vec![ExerciseSummary {
                name: "Bench".into(),
                sets: 3,
                reps: "5, 5, 5".into(),
                load: "80, 80, 80".into(),
                rpe: "-".into(),
                status,
            }],
        }
    }

    #[tokio::test]
    async fn newest_first_per_trainee() {
        let pool = db::open_in_memory().await.unwrap();
        let now = Utc::now();
        append(&pool, &entry("old", now - Duration::days(2), ExerciseStatus::Partial))
            .await
            .unwrap();
        append(&pool, &entry("new", now, ExerciseStatus::Completed))
            .await
            .unwrap();

        let listed = list(&pool, "t1").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(listed[0].status(), ExerciseStatus::Completed);
        assert_eq!(listed[1].summary[0].reps, "5, 5, 5");

        assert!(list(&pool, "t2").await.unwrap().is_empty());
    }
}
