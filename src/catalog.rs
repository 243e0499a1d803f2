//! Workout programs: authoring on the trainer side, loading on the trainee side.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::ProgramError,
    models::{ExerciseSpec, UNTITLED, WorkoutProgram},
};

#[derive(Debug, Clone)]
pub struct NewProgram {
    pub trainee_id: String,
    pub trainer_id: Option<String>,
    pub title: Option<String>,
    pub goal: Option<String>,
    pub exercises: Vec<ExerciseSpec>,
}

#[derive(FromRow)]
struct WorkoutRow {
    id: String,
    trainee_id: String,
    trainer_id: Option<String>,
    title: String,
    goal: Option<String>,
    start_date: NaiveDate,
    is_active: bool,
    exercises: String,
}

impl From<WorkoutRow> for WorkoutProgram {
    fn from(row: WorkoutRow) -> Self {
        let exercises = serde_json::from_str(&row.exercises).unwrap_or_else(|e| {
            warn!(workout_id = %row.id, error = %e, "unreadable exercise list");
            Vec::new()
        });
        Self {
            id: row.id,
            trainee_id: row.trainee_id,
            trainer_id: row.trainer_id,
            title: row.title,
            goal: row.goal,
            start_date: row.start_date,
            is_active: row.is_active,
            exercises,
        }
    }
}

const WORKOUT_COLUMNS: &str =
    "id, trainee_id, trainer_id, title, goal, start_date, is_active, exercises";

/// Exercise names key the performance record, so they must be present and
/// unique within a program.
pub fn validate_exercises(exercises: &[ExerciseSpec]) -> Result<(), ProgramError> {
    let mut seen = HashSet::new();
    for (i, ex) in exercises.iter().enumerate() {
        let name = ex.name.trim();
        if name.is_empty() {
            return Err(ProgramError::UnnamedExercise(i + 1));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ProgramError::DuplicateExercise(name.to_string()));
        }
    }
    Ok(())
}

fn normalise(exercises: Vec<ExerciseSpec>) -> Vec<ExerciseSpec> {
    exercises
        .into_iter()
        .map(|mut ex| {
            ex.name = ex.name.trim().to_string();
            ex
        })
        .collect()
}

fn title_or_untitled(title: Option<String>) -> String {
    title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

pub async fn create_program(pool: &SqlitePool, new: NewProgram) -> Result<WorkoutProgram> {
    validate_exercises(&new.exercises)?;

    let program = WorkoutProgram {
        id: Uuid::new_v4().to_string(),
        trainee_id: new.trainee_id,
        trainer_id: new.trainer_id,
        title: title_or_untitled(new.title),
        goal: new.goal.filter(|g| !g.trim().is_empty()),
        start_date: Local::now().date_naive(),
        is_active: true,
        exercises: normalise(new.exercises),
    };

    sqlx::query(
        r#"
        INSERT INTO workouts (id, trainee_id, trainer_id, title, goal, start_date, is_active, exercises)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&program.id)
    .bind(&program.trainee_id)
    .bind(&program.trainer_id)
    .bind(&program.title)
    .bind(&program.goal)
    .bind(program.start_date)
    .bind(program.is_active)
    .bind(serde_json::to_string(&program.exercises)?)
    .execute(pool)
    .await?;

    debug!(workout_id = %program.id, trainee_id = %program.trainee_id, "program created");
    Ok(program)
}

/// Replaces title, goal and exercises. Returns `false` if the program is gone.
pub async fn update_program(
    pool: &SqlitePool,
    id: &str,
    title: Option<String>,
    goal: Option<String>,
    exercises: Vec<ExerciseSpec>,
) -> Result<bool> {
    validate_exercises(&exercises)?;

    let res = sqlx::query("UPDATE workouts SET title = ?, goal = ?, exercises = ? WHERE id = ?")
        .bind(title_or_untitled(title))
        .bind(goal.filter(|g| !g.trim().is_empty()))
        .bind(serde_json::to_string(&normalise(exercises))?)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() == 1)
}

/// Flips the active flag. Returns the new value, or `None` if the program is gone.
pub async fn toggle_active(pool: &SqlitePool, id: &str) -> Result<Option<bool>> {
    let active: Option<bool> =
        sqlx::query_scalar("UPDATE workouts SET is_active = NOT is_active WHERE id = ? RETURNING is_active")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(active)
}

pub async fn delete_program(pool: &SqlitePool, id: &str) -> Result<bool> {
    let res = sqlx::query("DELETE FROM workouts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() == 1)
}

#[cfg(test)]
pub async fn get_program(pool: &SqlitePool, id: &str) -> Result<Option<WorkoutProgram>> {
    let row: Option<WorkoutRow> =
        sqlx::query_as(&format!("SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(Into::into))
}

pub async fn workout_title(pool: &SqlitePool, id: &str) -> Result<Option<String>> {
    Ok(sqlx::query_scalar("SELECT title FROM workouts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

/// Every program written for the trainee, oldest first.
pub async fn programs_for_trainee(
    pool: &SqlitePool,
    trainee_id: &str,
) -> Result<Vec<WorkoutProgram>> {
    let rows: Vec<WorkoutRow> = sqlx::query_as(&format!(
        "SELECT {WORKOUT_COLUMNS} FROM workouts WHERE trainee_id = ? ORDER BY start_date, created_at, title"
    ))
    .bind(trainee_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// The programs a trainee can start right now.
pub async fn active_workouts(pool: &SqlitePool, trainee_id: &str) -> Result<Vec<WorkoutProgram>> {
    Ok(programs_for_trainee(pool, trainee_id)
        .await?
        .into_iter()
        .filter(|w| w.is_active)
        .collect())
}

/// Picks a program by 1-based list position, id, or case-insensitive title.
pub fn resolve<'a>(
    programs: &'a [WorkoutProgram],
    query: &str,
) -> Result<&'a WorkoutProgram, ProgramError> {
    let query = query.trim();
    if let Ok(idx) = query.parse::<usize>() {
        if let Some(p) = idx.checked_sub(1).and_then(|i| programs.get(i)) {
            return Ok(p);
        }
    }
    programs
        .iter()
        .find(|p| p.id == query)
        .or_else(|| programs.iter().find(|p| p.title.eq_ignore_ascii_case(query)))
        .ok_or_else(|| ProgramError::NotFound(query.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn ex(name: &str) -> ExerciseSpec {
        ExerciseSpec {
            name: name.into(),
            sets: Some(3),
            ..Default::default()
        }
    }

    fn new_program(trainee: &str, title: &str, exercises: Vec<ExerciseSpec>) -> NewProgram {
        NewProgram {
            trainee_id: trainee.into(),
            trainer_id: Some("coach".into()),
            title: Some(title.into()),
            goal: Some("strength".into()),
            exercises,
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        assert_eq!(
            validate_exercises(&[ex("Squat"), ex(" squat ")]),
            Err(ProgramError::DuplicateExercise("squat".into()))
        );
        assert_eq!(
            validate_exercises(&[ex("Squat"), ex("  ")]),
            Err(ProgramError::UnnamedExercise(2))
        );
        assert!(validate_exercises(&[ex("Squat"), ex("Row")]).is_ok());
    }

    #[tokio::test]
    async fn create_and_read_back() {
        let pool = db::open_in_memory().await.unwrap();
        let created = create_program(&pool, new_program("t1", "Push", vec![ex(" Bench ")]))
            .await
            .unwrap();

        assert_eq!(created.exercises[0].name, "Bench");
        let loaded = get_program(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(
            workout_title(&pool, &created.id).await.unwrap().as_deref(),
            Some("Push")
        );
    }

    #[tokio::test]
    async fn blank_title_is_untitled() {
        let pool = db::open_in_memory().await.unwrap();
        let created = create_program(&pool, new_program("t1", "   ", vec![]))
            .await
            .unwrap();
        assert_eq!(created.title, UNTITLED);
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let pool = db::open_in_memory().await.unwrap();
        let err = create_program(&pool, new_program("t1", "Push", vec![ex("Dip"), ex("Dip")]))
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ProgramError>(),
            Some(&ProgramError::DuplicateExercise("Dip".into()))
        );
        assert!(programs_for_trainee(&pool, "t1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn catalog_only_lists_active_programs_of_the_trainee() {
        let pool = db::open_in_memory().await.unwrap();
        let push = create_program(&pool, new_program("t1", "Push", vec![ex("Bench")]))
            .await
            .unwrap();
        let pull = create_program(&pool, new_program("t1", "Pull", vec![ex("Row")]))
            .await
            .unwrap();
        create_program(&pool, new_program("t2", "Legs", vec![ex("Squat")]))
            .await
            .unwrap();

        assert_eq!(toggle_active(&pool, &pull.id).await.unwrap(), Some(false));

        let active = active_workouts(&pool, "t1").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, push.id);

        assert_eq!(toggle_active(&pool, &pull.id).await.unwrap(), Some(true));
        assert_eq!(active_workouts(&pool, "t1").await.unwrap().len(), 2);
        assert_eq!(toggle_active(&pool, "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let pool = db::open_in_memory().await.unwrap();
        let p = create_program(&pool, new_program("t1", "Push", vec![ex("Bench")]))
            .await
            .unwrap();

        assert!(
            update_program(&pool, &p.id, Some("Push v2".into()), None, vec![ex("Dip")])
                .await
                .unwrap()
        );
        let loaded = get_program(&pool, &p.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Push v2");
        assert_eq!(loaded.goal, None);
        assert_eq!(loaded.exercises, vec![ex("Dip")]);

        assert!(delete_program(&pool, &p.id).await.unwrap());
        assert!(!delete_program(&pool, &p.id).await.unwrap());
        assert_eq!(get_program(&pool, &p.id).await.unwrap(), None);
    }

    #[test]
    fn resolve_by_index_id_or_title() {
        let programs = vec![
            WorkoutProgram {
                id: "a".into(),
                trainee_id: "t".into(),
                trainer_id: None,
                title: "Push".into(),
                goal: None,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                is_active: true,
                exercises: vec![],
            },
            WorkoutProgram {
                id: "b".into(),
                trainee_id: "t".into(),
                trainer_id: None,
                title: "Pull".into(),
                goal: None,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                is_active: true,
                exercises: vec![],
            },
        ];
        assert_eq!(resolve(&programs, "2").unwrap().id, "b");
        assert_eq!(resolve(&programs, "a").unwrap().id, "a");
        assert_eq!(resolve(&programs, "pull").unwrap().id, "b");
        assert_eq!(
            resolve(&programs, "legs").unwrap_err(),
            ProgramError::NotFound("legs".into())
        );
        assert!(resolve(&programs, "0").is_err());
    }
}
