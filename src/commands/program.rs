use std::fs::read_to_string;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::{
    catalog::{self, NewProgram},
    cli::ProgramCmd,
    commands::Ctx,
    models::{ExerciseSpec, WorkoutProgram},
    types::{ProgramImport, Role, best_suggestion, emit},
    users,
    utils::plain_len,
};

fn read_program_file(file: &str) -> Result<Option<ProgramImport>> {
    let toml_str = match read_to_string(file) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!(
                "{} cannot open file `{}` – file not found",
                "error:".red().bold(),
                file
            );
            return Ok(None);
        }
        Err(e) => return Err(e).with_context(|| format!("reading `{file}`")),
    };
    let prog = toml::from_str(&toml_str).with_context(|| format!("parsing `{file}`"))?;
    Ok(Some(prog))
}

pub fn print_programs(progs: &[WorkoutProgram], pending: &[String]) {
    if progs.is_empty() {
        println!("{}", "  (no programs found)".dimmed());
        return;
    }

    println!("{}", "Programs:".cyan().bold());

    let idx_w = progs.len().to_string().len();
    let mut left = Vec::<String>::new();
    let mut right = Vec::<String>::new();

    for (i, p) in progs.iter().enumerate() {
        let idx = format!("{:>width$}", i + 1, width = idx_w).yellow();
        let goal = match &p.goal {
            Some(g) => format!("– {}", g).dimmed().to_string(),
            None => String::new(),
        };
        let mut title = p.title.bold().to_string();
        if !p.is_active {
            title = format!("{} {}", title, "(inactive)".red());
        }
        if pending.contains(&p.id) {
            title = format!("{} {}", title, "(in progress)".magenta());
        }
        left.push(format!(" {} • {} {}", idx, title, goal));
        right.push(
            format!(
                "{} exercises, from {}",
                p.exercises.len(),
                p.start_date.format("%Y-%m-%d")
            )
            .dimmed()
            .to_string(),
        );
    }

    let pad_plain = left.iter().map(|s| plain_len(s)).max().unwrap_or(0);
    for (l, r) in left.into_iter().zip(right) {
        let pad = pad_plain + (l.chars().count() - plain_len(&l));
        println!("{:<pad$} {} {}", l, "|".blue(), r, pad = pad);
    }
}

fn describe(ex: &ExerciseSpec) -> String {
    let mut parts = vec![format!("{} sets", ex.target_sets())];
    if let Some(reps) = &ex.reps {
        parts.push(format!("{reps} reps"));
    }
    if let Some(load) = &ex.load {
        parts.push(format!("@ {load}"));
    }
    parts.push(format!("rest {}s", ex.rest_seconds()));
    parts.join(", ")
}

fn print_program(p: &WorkoutProgram) {
    println!("{}", p.title.cyan().bold());
    if let Some(goal) = &p.goal {
        println!("  {}", goal.dimmed());
    }
    println!(
        "  {} {}{}",
        "from".dimmed(),
        p.start_date.format("%Y-%m-%d"),
        if p.is_active {
            String::new()
        } else {
            format!(" {}", "(inactive)".red())
        }
    );

    if p.exercises.is_empty() {
        println!("{}", "  (no exercises)".dimmed());
        return;
    }
    for (i, ex) in p.exercises.iter().enumerate() {
        let connector = if i + 1 == p.exercises.len() {
            "└─"
        } else {
            "├─"
        };
        println!(
            "  {} {} • {} {}",
            connector,
            (i + 1).to_string().yellow(),
            ex.name.bold(),
            describe(ex).dimmed()
        );
        if let Some(notes) = &ex.notes {
            println!("       {}", notes.italic());
        }
        if let Some(video) = &ex.video {
            println!("       {}", video.underline().blue());
        }
    }
}

/// Finds a program among the trainee's, with a "did you mean" on a miss.
pub fn pick<'a>(progs: &'a [WorkoutProgram], query: &str) -> Result<&'a WorkoutProgram> {
    match catalog::resolve(progs, query) {
        Ok(p) => Ok(p),
        Err(e) => {
            let titles: Vec<String> = progs.iter().map(|p| p.title.clone()).collect();
            if let Some(s) = best_suggestion(query, &titles) {
                println!("{} did you mean `{}`?", "info:".blue().bold(), s);
            }
            Err(e.into())
        }
    }
}

pub async fn handle(cmd: ProgramCmd, ctx: &Ctx<'_>) -> Result<()> {
    let actor = ctx.actor().await?;

    match cmd {
        ProgramCmd::Create { trainee, file } => {
            users::require_role(&actor, Role::Trainer)?;
            let trainee = ctx.trainee_scope(&actor, Some(&trainee)).await?;
            let Some(import) = read_program_file(&file)? else {
                return Ok(());
            };

            let prog = catalog::create_program(
                ctx.pool,
                NewProgram {
                    trainee_id: trainee.id,
                    trainer_id: Some(actor.id),
                    title: import.title,
                    goal: import.goal,
                    exercises: import.exercise,
                },
            )
            .await?;
            emit(ctx.fmt, &prog, || {
                println!(
                    "{} `{}` for {} ({} exercises)",
                    "ok:".green().bold(),
                    prog.title,
                    trainee.name,
                    prog.exercises.len()
                )
            })?;
        }

        ProgramCmd::Edit {
            program,
            file,
            trainee,
        } => {
            users::require_role(&actor, Role::Trainer)?;
            let trainee = ctx.trainee_scope(&actor, trainee.as_deref()).await?;
            let progs = catalog::programs_for_trainee(ctx.pool, &trainee.id).await?;
            let prog = pick(&progs, &program)?;
            let Some(import) = read_program_file(&file)? else {
                return Ok(());
            };

            if catalog::update_program(ctx.pool, &prog.id, import.title, import.goal, import.exercise)
                .await?
            {
                println!("{} updated `{}`", "ok:".green().bold(), prog.title);
            } else {
                println!("{} program `{}` disappeared", "error:".red().bold(), prog.title);
            }
        }

        ProgramCmd::List { trainee } => {
            let trainee = ctx.trainee_scope(&actor, trainee.as_deref()).await?;
            let progs = catalog::programs_for_trainee(ctx.pool, &trainee.id).await?;
            emit(ctx.fmt, &progs, || print_programs(&progs, &[]))?;
        }

        ProgramCmd::Show { program, trainee } => {
            let trainee = ctx.trainee_scope(&actor, trainee.as_deref()).await?;
            let progs = catalog::programs_for_trainee(ctx.pool, &trainee.id).await?;
            let prog = pick(&progs, &program)?;
            emit(ctx.fmt, prog, || print_program(prog))?;
        }

        ProgramCmd::Toggle { program, trainee } => {
            users::require_role(&actor, Role::Trainer)?;
            let trainee = ctx.trainee_scope(&actor, trainee.as_deref()).await?;
            let progs = catalog::programs_for_trainee(ctx.pool, &trainee.id).await?;
            let prog = pick(&progs, &program)?;
            match catalog::toggle_active(ctx.pool, &prog.id).await? {
                Some(true) => println!("{} `{}` is active", "ok:".green().bold(), prog.title),
                Some(false) => println!("{} `{}` is inactive", "ok:".green().bold(), prog.title),
                None => println!("{} program `{}` disappeared", "error:".red().bold(), prog.title),
            }
        }

        ProgramCmd::Delete { program, trainee } => {
            users::require_role(&actor, Role::Trainer)?;
            let trainee = ctx.trainee_scope(&actor, trainee.as_deref()).await?;
            let progs = catalog::programs_for_trainee(ctx.pool, &trainee.id).await?;
            let prog = pick(&progs, &program)?;
            if catalog::delete_program(ctx.pool, &prog.id).await? {
                println!("{} deleted `{}`", "ok:".green().bold(), prog.title);
            } else {
                println!("{} program `{}` not found", "warning:".yellow().bold(), prog.title);
            }
        }
    }
    Ok(())
}
