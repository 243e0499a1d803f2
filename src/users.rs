//! Trainer and trainee profiles.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::{error::UserError, models::UserProfile, types::Role};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub trainer_id: Option<String>,
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    role: Role,
    trainer_id: Option<String>,
    age: Option<i64>,
    height: Option<f64>,
    goal: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
            trainer_id: row.trainer_id,
            age: row.age.and_then(|a| u32::try_from(a).ok()),
            height: row.height,
            goal: row.goal,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, name, email, role, trainer_id, age, height, goal, is_active, created_at";

pub async fn create_user(pool: &SqlitePool, new: NewUser) -> Result<UserProfile> {
    let user = UserProfile {
        id: Uuid::new_v4().to_string(),
        name: new.name.trim().to_string(),
        email: new.email.trim().to_lowercase(),
        role: new.role,
        trainer_id: new.trainer_id,
        age: None,
        height: None,
        goal: None,
        is_active: true,
        created_at: Utc::now(),
    };

    let res = sqlx::query(
        r#"
        INSERT INTO users (id, name, email, role, trainer_id, is_active, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.role)
    .bind(&user.trainer_id)
    .bind(user.is_active)
    .bind(user.created_at)
    .execute(pool)
    .await;

    match res {
        Ok(_) => {
            debug!(user_id = %user.id, role = %user.role, "user registered");
            Ok(user)
        }
        // 2067 = SQLITE_CONSTRAINT_UNIQUE
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("2067") => {
            Err(UserError::EmailTaken(user.email).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Looks a user up by id or email.
pub async fn find_user(pool: &SqlitePool, key: &str) -> Result<Option<UserProfile>> {
    let key = key.trim();
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ? OR email = lower(?) LIMIT 1"
    ))
    .bind(key)
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn list_users(
    pool: &SqlitePool,
    role: Option<Role>,
    trainer_id: Option<&str>,
) -> Result<Vec<UserProfile>> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM   users
        WHERE  (?1 IS NULL OR role = ?1)
          AND  (?2 IS NULL OR trainer_id = ?2)
        ORDER  BY name
        "#
    ))
    .bind(role)
    .bind(trainer_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Updates only the profile details that were given.
pub async fn update_details(
    pool: &SqlitePool,
    id: &str,
    age: Option<u32>,
    height: Option<f64>,
    goal: Option<String>,
) -> Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE users
        SET    age    = COALESCE(?, age),
               height = COALESCE(?, height),
               goal   = COALESCE(?, goal)
        WHERE  id = ?
        "#,
    )
    .bind(age.map(i64::from))
    .bind(height)
    .bind(goal)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn toggle_active(pool: &SqlitePool, id: &str) -> Result<Option<bool>> {
    let active: Option<bool> =
        sqlx::query_scalar("UPDATE users SET is_active = NOT is_active WHERE id = ? RETURNING is_active")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(active)
}

/// Resolves the acting user from `--as` or the configured default.
pub async fn acting_user(pool: &SqlitePool, key: Option<&str>) -> Result<UserProfile> {
    let key = key.ok_or(UserError::NoActingUser)?;
    find_user(pool, key)
        .await?
        .ok_or_else(|| UserError::NotFound(key.to_string()).into())
}

pub fn require_role(user: &UserProfile, expected: Role) -> Result<(), UserError> {
    if user.role == expected {
        Ok(())
    } else {
        Err(UserError::WrongRole {
            name: user.name.clone(),
            expected,
            actual: user.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn trainer() -> NewUser {
        NewUser {
            name: "Dana".into(),
            email: "Dana@Gym.io".into(),
            role: Role::Trainer,
            trainer_id: None,
        }
    }

    #[tokio::test]
    async fn register_and_find_by_email_or_id() {
        let pool = db::open_in_memory().await.unwrap();
        let coach = create_user(&pool, trainer()).await.unwrap();
        assert_eq!(coach.email, "dana@gym.io");

        let by_email = find_user(&pool, "DANA@gym.io").await.unwrap().unwrap();
        assert_eq!(by_email.id, coach.id);
        let by_id = find_user(&pool, &coach.id).await.unwrap().unwrap();
        assert_eq!(by_id.role, Role::Trainer);
        assert!(find_user(&pool, "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn email_is_unique() {
        let pool = db::open_in_memory().await.unwrap();
        create_user(&pool, trainer()).await.unwrap();
        let err = create_user(&pool, trainer()).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<UserError>(),
            Some(&UserError::EmailTaken("dana@gym.io".into()))
        );
    }

    #[tokio::test]
    async fn list_filters_by_role_and_trainer() {
        let pool = db::open_in_memory().await.unwrap();
        let coach = create_user(&pool, trainer()).await.unwrap();
        for (name, trainer_id) in [("Avi", Some(coach.id.clone())), ("Noa", None)] {
            create_user(
                &pool,
                NewUser {
                    name: name.into(),
                    email: format!("{name}@x.io"),
                    role: Role::Trainee,
                    trainer_id,
                },
            )
            .await
            .unwrap();
        }

        assert_eq!(list_users(&pool, None, None).await.unwrap().len(), 3);
        assert_eq!(list_users(&pool, Some(Role::Trainee), None).await.unwrap().len(), 2);
        let mine = list_users(&pool, Some(Role::Trainee), Some(&coach.id)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Avi");
    }

    #[tokio::test]
    async fn details_and_active_flag() {
        let pool = db::open_in_memory().await.unwrap();
        let coach = create_user(&pool, trainer()).await.unwrap();

        assert!(update_details(&pool, &coach.id, Some(34), None, Some("hypertrophy".into()))
            .await
            .unwrap());
        assert!(update_details(&pool, &coach.id, None, Some(172.5), None).await.unwrap());
        let loaded = find_user(&pool, &coach.id).await.unwrap().unwrap();
        assert_eq!(loaded.age, Some(34));
        assert_eq!(loaded.height, Some(172.5));
        assert_eq!(loaded.goal.as_deref(), Some("hypertrophy"));

        assert_eq!(toggle_active(&pool, &coach.id).await.unwrap(), Some(false));
    }

    #[tokio::test]
    async fn acting_user_errors() {
        let pool = db::open_in_memory().await.unwrap();
        let err = acting_user(&pool, None).await.unwrap_err();
        assert_eq!(err.downcast_ref::<UserError>(), Some(&UserError::NoActingUser));

        let coach = create_user(&pool, trainer()).await.unwrap();
        let user = acting_user(&pool, Some("dana@gym.io")).await.unwrap();
        assert!(require_role(&user, Role::Trainer).is_ok());
        assert!(matches!(
            require_role(&user, Role::Trainee),
            Err(UserError::WrongRole { .. })
        ));
        assert_eq!(user.id, coach.id);
    }
}
