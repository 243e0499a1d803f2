use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use sqlx::SqlitePool;

use crate::{
    error::{LiveError, ProgramError, UserError},
    models::UserProfile,
    types::{OutputFmt, Role},
    users,
};

pub mod config;
pub mod history;
pub mod live;
pub mod measure;
pub mod program;
pub mod user;

/// What every command handler gets from `main`.
pub struct Ctx<'a> {
    pub pool: &'a SqlitePool,
    pub fmt: OutputFmt,
    pub acting: Option<&'a str>,
    pub drafts: PathBuf,
}

impl Ctx<'_> {
    pub async fn actor(&self) -> Result<UserProfile> {
        users::acting_user(self.pool, self.acting).await
    }

    /// The trainee a command applies to. Trainees always act on themselves;
    /// trainers must name one of their own trainees.
    pub async fn trainee_scope(
        &self,
        actor: &UserProfile,
        trainee: Option<&str>,
    ) -> Result<UserProfile> {
        match actor.role {
            Role::Trainee => match trainee {
                Some(key) if key != actor.id && !key.eq_ignore_ascii_case(&actor.email) => {
                    Err(UserError::NotYourTrainee(key.to_string()).into())
                }
                _ => Ok(actor.clone()),
            },
            Role::Trainer => {
                let key = trainee.ok_or(UserError::TraineeRequired)?;
                let user = users::find_user(self.pool, key)
                    .await?
                    .ok_or_else(|| UserError::NotFound(key.to_string()))?;
                users::require_role(&user, Role::Trainee)?;
                if user.trainer_id.as_deref() != Some(actor.id.as_str()) {
                    return Err(UserError::NotYourTrainee(user.name).into());
                }
                Ok(user)
            }
        }
    }
}

/// Domain errors are the user's to fix: print them and exit cleanly.
/// Anything else is a real failure and keeps propagating.
pub fn report(err: anyhow::Error) -> Result<()> {
    let msg = if let Some(e) = err.downcast_ref::<UserError>() {
        e.to_string()
    } else if let Some(e) = err.downcast_ref::<ProgramError>() {
        e.to_string()
    } else if let Some(e) = err.downcast_ref::<LiveError>() {
        e.to_string()
    } else {
        return Err(err);
    };
    println!("{} {}", "error:".red().bold(), msg);
    Ok(())
}
