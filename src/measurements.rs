use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::models::Measurement;

#[derive(FromRow)]
struct MeasurementRow {
    id: String,
    trainee_id: String,
    weight: f64,
    body_fat: f64,
    waist: f64,
    timestamp: DateTime<Utc>,
}

impl From<MeasurementRow> for Measurement {
    fn from(row: MeasurementRow) -> Self {
        Self {
            id: row.id,
            trainee_id: row.trainee_id,
            weight: row.weight,
            body_fat: row.body_fat,
            waist: row.waist,
            timestamp: row.timestamp,
        }
    }
}

/// Which measurement series to chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Metric {
    Weight,
    BodyFat,
    Waist,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Self::Weight => "Weight (kg)",
            Self::BodyFat => "Body Fat %",
            Self::Waist => "Waist (cm)",
        }
    }

    pub fn value(self, m: &Measurement) -> f64 {
        match self {
            Self::Weight => m.weight,
            Self::BodyFat => m.body_fat,
            Self::Waist => m.waist,
        }
    }
}

pub async fn add(
    pool: &SqlitePool,
    trainee_id: &str,
    weight: f64,
    body_fat: f64,
    waist: f64,
) -> Result<Measurement> {
    let m = Measurement {
        id: Uuid::new_v4().to_string(),
        trainee_id: trainee_id.to_string(),
        weight,
        body_fat,
        waist,
        timestamp: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO measurements (id, trainee_id, weight, body_fat, waist, timestamp)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&m.id)
    .bind(&m.trainee_id)
    .bind(m.weight)
    .bind(m.body_fat)
    .bind(m.waist)
    .bind(m.timestamp)
    .execute(pool)
    .await?;
    Ok(m)
}

/// Newest first.
pub async fn list(pool: &SqlitePool, trainee_id: &str) -> Result<Vec<Measurement>> {
    let rows: Vec<MeasurementRow> = sqlx::query_as(
        r#"
        SELECT id, trainee_id, weight, body_fat, waist, timestamp
        FROM   measurements
        WHERE  trainee_id = ?
        ORDER  BY timestamp DESC
        "#,
    )
    .bind(trainee_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
