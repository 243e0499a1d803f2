use anyhow::Result;
use colored::{ColoredString, Colorize};

use crate::{
    cli::UserCmd,
    commands::Ctx,
    error::UserError,
    models::UserProfile,
    types::{Role, emit},
    users::{self, NewUser},
};

fn print_users(list: &[UserProfile]) {
    if list.is_empty() {
        println!("{}", "  (no users found)".dimmed());
        return;
    }
    println!("{}", "Users:".cyan().bold());
    let idx_w = list.len().to_string().len();
    let name_w = list.iter().map(|u| u.name.chars().count()).max().unwrap_or(0);
    for (i, u) in list.iter().enumerate() {
        let active = if u.is_active {
            String::new()
        } else {
            format!(" {}", "(inactive)".red())
        };
        println!(
            " {} • {} {} {}{}",
            format!("{:>idx_w$}", i + 1).yellow(),
            format!("{:<name_w$}", u.name).bold(),
            "|".blue(),
            format!("{} · {}", u.role, u.email).dimmed(),
            active,
        );
    }
}

fn label(name: &str) -> ColoredString {
    format!("{name:<8}").dimmed()
}

fn print_profile(u: &UserProfile) {
    println!("{} {}", u.name.cyan().bold(), format!("({})", u.role).dimmed());
    println!("  {} {}", label("id"), u.id);
    println!("  {} {}", label("email"), u.email);
    if let Some(age) = u.age {
        println!("  {} {}", label("age"), age);
    }
    if let Some(height) = u.height {
        println!("  {} {} cm", label("height"), height);
    }
    if let Some(goal) = &u.goal {
        println!("  {} {}", label("goal"), goal);
    }
    let status = if u.is_active {
        "active".green()
    } else {
        "inactive".red()
    };
    println!("  {} {}", label("status"), status);
    println!("  {} {}", label("joined"), u.created_at.format("%Y-%m-%d"));
}

/// The user named on the command line, or the actor. Trainers may reach
/// their trainees; everyone else only themselves.
async fn target(ctx: &Ctx<'_>, actor: &UserProfile, key: Option<&str>) -> Result<UserProfile> {
    match key {
        None => Ok(actor.clone()),
        Some(key) => {
            let user = users::find_user(ctx.pool, key)
                .await?
                .ok_or_else(|| UserError::NotFound(key.to_string()))?;
            if user.id != actor.id && user.trainer_id.as_deref() != Some(actor.id.as_str()) {
                return Err(UserError::NotYourTrainee(user.name).into());
            }
            Ok(user)
        }
    }
}

pub async fn handle(cmd: UserCmd, ctx: &Ctx<'_>) -> Result<()> {
    match cmd {
        UserCmd::Add {
            name,
            email,
            role,
            trainer,
        } => {
            let trainer_id = match (role, trainer) {
                (Role::Trainer, Some(_)) => {
                    println!(
                        "{} trainers have no trainer; ignoring --trainer",
                        "warning:".yellow().bold()
                    );
                    None
                }
                (Role::Trainer, None) => None,
                (Role::Trainee, Some(key)) => {
                    let coach = users::find_user(ctx.pool, &key)
                        .await?
                        .ok_or(UserError::NotFound(key))?;
                    users::require_role(&coach, Role::Trainer)?;
                    Some(coach.id)
                }
                (Role::Trainee, None) => match ctx.actor().await {
                    Ok(actor) if actor.role == Role::Trainer => Some(actor.id),
                    _ => {
                        println!(
                            "{} trainee `{}` has no trainer yet",
                            "warning:".yellow().bold(),
                            name
                        );
                        None
                    }
                },
            };

            let user = users::create_user(
                ctx.pool,
                NewUser {
                    name,
                    email,
                    role,
                    trainer_id,
                },
            )
            .await?;
            emit(ctx.fmt, &user, || {
                println!(
                    "{} registered {} `{}` ({})",
                    "ok:".green().bold(),
                    user.role,
                    user.name,
                    user.id.dimmed()
                )
            })?;
        }

        UserCmd::List { role, mine } => {
            let trainer_id = if mine {
                let actor = ctx.actor().await?;
                users::require_role(&actor, Role::Trainer)?;
                Some(actor.id)
            } else {
                None
            };
            let list = users::list_users(ctx.pool, role, trainer_id.as_deref()).await?;
            emit(ctx.fmt, &list, || print_users(&list))?;
        }

        UserCmd::Show { user } => {
            let actor = ctx.actor().await?;
            let u = target(ctx, &actor, user.as_deref()).await?;
            emit(ctx.fmt, &u, || print_profile(&u))?;
        }

        UserCmd::Edit {
            user,
            age,
            height,
            goal,
        } => {
            if age.is_none() && height.is_none() && goal.is_none() {
                println!(
                    "{} nothing to change; pass --age, --height or --goal",
                    "warning:".yellow().bold()
                );
                return Ok(());
            }
            let actor = ctx.actor().await?;
            let u = target(ctx, &actor, user.as_deref()).await?;
            users::update_details(ctx.pool, &u.id, age, height, goal).await?;
            println!("{} updated `{}`", "ok:".green().bold(), u.name);
        }

        UserCmd::Toggle { user } => {
            let actor = ctx.actor().await?;
            users::require_role(&actor, Role::Trainer)?;
            let u = ctx.trainee_scope(&actor, Some(&user)).await?;
            match users::toggle_active(ctx.pool, &u.id).await? {
                Some(true) => println!("{} `{}` is active", "ok:".green().bold(), u.name),
                Some(false) => println!("{} `{}` is inactive", "ok:".green().bold(), u.name),
                None => println!("{} user `{}` disappeared", "error:".red().bold(), u.name),
            }
        }
    }
    Ok(())
}
