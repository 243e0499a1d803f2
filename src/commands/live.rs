use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use sqlx::SqlitePool;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, warn};

use crate::{
    catalog,
    cli::LiveCmd,
    commands::{
        Ctx,
        history::print_summary,
        program::{pick, print_programs},
    },
    live::{
        self, Advance, Clock, Command, LiveSession, PerfField, SetOutcome, SystemClock,
        input::HELP,
    },
    models::{UserProfile, WorkoutProgram},
    storage::{FileSessionStore, SessionStore},
    types::{Role, emit},
    users,
    utils::format_countdown,
};

const TICK: Duration = Duration::from_millis(500);

enum Flow {
    Continue,
    Exit,
}

fn field_name(field: PerfField) -> &'static str {
    match field {
        PerfField::Reps => "reps",
        PerfField::Load => "load",
        PerfField::Rpe => "rpe",
    }
}

fn render<S: SessionStore, C: Clock>(session: &LiveSession<S, C>) {
    if session.show_summary() {
        println!("{}", "Summary".cyan().bold());
        print_summary(&session.summary());
        if session.has_unfinished() {
            println!(
                "{}",
                "  type `resume` to keep going or `finish` to save".dimmed()
            );
        } else {
            println!("{}", "  all done; type `finish` to save".dimmed());
        }
        return;
    }

    let Some(ex) = session.current() else {
        println!("{}", "  (nothing left to do)".dimmed());
        return;
    };

    println!(
        "{} {} {}",
        format!(
            "[{}/{}]",
            session.index() + 1,
            session.exercises().len()
        )
        .yellow(),
        ex.name.bold(),
        format!(
            "set {} of {}",
            session.current_set_number(),
            ex.target_sets()
        )
        .dimmed()
    );

    let staged = session.performance(&ex.name);
    let show = |label: &str, staged: Option<&String>, planned: Option<&String>| {
        let value = staged.or(planned).map(String::as_str).unwrap_or("-");
        let planned = planned
            .filter(|p| Some(*p) != staged)
            .map(|p| format!(" (plan {p})").dimmed().to_string())
            .unwrap_or_default();
        println!("  {:<5} {}{}", label, value, planned);
    };
    show("reps", staged.and_then(|p| p.reps.as_ref()), ex.reps.as_ref());
    show("load", staged.and_then(|p| p.load.as_ref()), ex.load.as_ref());
    show("rpe", staged.and_then(|p| p.rpe.as_ref()), None);

    if let Some(notes) = &ex.notes {
        println!("  {}", notes.italic());
    }
    if let Some(video) = &ex.video {
        println!("  {}", video.underline().blue());
    }
    if session.is_resting() {
        println!(
            "  {} {} left",
            "resting:".blue().bold(),
            format_countdown(session.rest_remaining())
        );
    }
}

async fn apply<S: SessionStore, C: Clock>(
    pool: &SqlitePool,
    trainee: &UserProfile,
    session: &mut LiveSession<S, C>,
    cmd: Command,
) -> Result<Flow> {
    if session.show_summary()
        && matches!(
            cmd,
            Command::Stage(..) | Command::Done | Command::Next | Command::Back | Command::Skip
        )
    {
        println!(
            "{} on the summary; type `resume` or `finish`",
            "warning:".yellow().bold()
        );
        return Ok(Flow::Continue);
    }

    match cmd {
        Command::Empty => {}
        Command::Help => println!("{}", HELP),
        Command::Show => render(session),

        Command::Stage(field, value) => {
            if session.record_field_input(field, value.clone())? {
                println!("{} {} = {}", "info:".blue().bold(), field_name(field), value);
            } else {
                println!("{} no exercise to record against", "warning:".yellow().bold());
            }
        }

        Command::Done => match session.complete_set()? {
            None => println!(
                "{} no exercise left; type `finish`",
                "warning:".yellow().bold()
            ),
            Some(SetOutcome::Rest { done, target, secs }) => {
                println!("{} set {}/{} logged", "ok:".green().bold(), done, target);
                println!(
                    "{} rest {} (`skip` to end early)",
                    "info:".blue().bold(),
                    format_countdown(secs)
                );
            }
            Some(SetOutcome::ExerciseDone { name, advance }) => {
                println!("{} `{}` done", "ok:".green().bold(), name);
                if advance == Advance::Summary {
                    println!("{} that was the last exercise", "info:".blue().bold());
                }
                render(session);
            }
        },

        Command::Next => {
            session.advance()?;
            render(session);
        }

        Command::Back => {
            if session.retreat()? {
                render(session);
            } else {
                println!("{} already at the first exercise", "warning:".yellow().bold());
            }
        }

        Command::Skip => {
            if session.skip_rest()? {
                println!("{} rest skipped", "info:".blue().bold());
                render(session);
            } else {
                println!("{} not resting", "warning:".yellow().bold());
            }
        }

        Command::Summary => {
            println!("{}", "Summary so far".cyan().bold());
            print_summary(&session.summary());
        }

        Command::Resume => {
            session.resume_workout();
            render(session);
        }

        Command::Finish => {
            let entry = live::finish(pool, session, &trainee.id).await?;
            println!(
                "{} saved `{}` to history ({})",
                "ok:".green().bold(),
                entry.title,
                entry.status()
            );
            print_summary(&entry.summary);
            return Ok(Flow::Exit);
        }

        Command::Quit => {
            println!(
                "{} progress saved; `live start` picks up where you left off",
                "info:".blue().bold()
            );
            return Ok(Flow::Exit);
        }
    }
    Ok(Flow::Continue)
}

/// Runs one workout interactively: stdin lines drive the session while a
/// half-second tick watches the rest timer.
async fn run(
    pool: &SqlitePool,
    trainee: &UserProfile,
    workout: &WorkoutProgram,
    store: FileSessionStore,
) -> Result<()> {
    let mut session =
        LiveSession::open(&workout.id, workout.exercises.clone(), store, SystemClock)?;

    println!("{} {}", "Live:".cyan().bold(), workout.title.bold());
    println!("{}", "type `help` for commands".dimmed());
    render(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if session.tick()? {
                    println!("{} rest over, next set!", "info:".blue().bold());
                    render(&session);
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!(workout_id = %workout.id, "stdin closed, leaving session");
                    break;
                };
                // the timer may have expired between ticks
                if session.tick()? {
                    println!("{} rest over", "info:".blue().bold());
                }
                let flow = match line.parse::<Command>() {
                    Ok(cmd) => apply(pool, trainee, &mut session, cmd).await?,
                    Err(e) => {
                        println!("{} {}", "error:".red().bold(), e);
                        Flow::Continue
                    }
                };
                if let Flow::Exit = flow {
                    break;
                }
            }
        }
    }
    Ok(())
}

pub async fn handle(cmd: LiveCmd, ctx: &Ctx<'_>) -> Result<()> {
    let actor = ctx.actor().await?;
    users::require_role(&actor, Role::Trainee)?;
    let store = FileSessionStore::new(&ctx.drafts);

    // Reloaded on every command; a failed read just shows nothing.
    let workouts = match catalog::active_workouts(ctx.pool, &actor.id).await {
        Ok(w) => w,
        Err(e) => {
            warn!(trainee_id = %actor.id, error = %e, "could not load workouts");
            Vec::new()
        }
    };

    match cmd {
        LiveCmd::List => {
            let pending = store.pending()?;
            emit(ctx.fmt, &workouts, || print_programs(&workouts, &pending))?;
        }

        LiveCmd::Start { workout } => {
            let workout = pick(&workouts, &workout)?;
            if workout.exercises.is_empty() {
                println!(
                    "{} `{}` has no exercises",
                    "warning:".yellow().bold(),
                    workout.title
                );
                return Ok(());
            }
            run(ctx.pool, &actor, workout, store).await?;
        }

        LiveCmd::Status { workout } => {
            let workout = pick(&workouts, &workout)?;
            match store.load(&workout.id) {
                None => println!(
                    "{} no saved progress for `{}`",
                    "info:".blue().bold(),
                    workout.title
                ),
                Some(snapshot) => {
                    let summary = live::compute_summary(&workout.exercises, &snapshot.performance);
                    emit(ctx.fmt, &snapshot, || {
                        let left =
                            live::remaining_exercises(&workout.exercises, &snapshot.performance);
                        println!(
                            "{} {} ({} of {} exercises left)",
                            "In progress:".cyan().bold(),
                            workout.title.bold(),
                            left.len(),
                            workout.exercises.len()
                        );
                        print_summary(&summary);
                    })?;
                }
            }
        }

        LiveCmd::Abandon { workout } => {
            let workout = pick(&workouts, &workout)?;
            if store.load(&workout.id).is_some() {
                store.clear(&workout.id)?;
                println!(
                    "{} dropped saved progress for `{}`",
                    "ok:".green().bold(),
                    workout.title
                );
            } else {
                println!(
                    "{} no saved progress for `{}`",
                    "warning:".yellow().bold(),
                    workout.title
                );
            }
        }
    }
    Ok(())
}
