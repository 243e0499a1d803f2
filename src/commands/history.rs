use anyhow::Result;
use colored::{ColoredString, Colorize};

use crate::{
    cli::HistoryCmd,
    commands::Ctx,
    history,
    models::{ExerciseStatus, ExerciseSummary, HistoryEntry},
    types::emit,
};

pub fn status_label(status: ExerciseStatus) -> ColoredString {
    let s = status.to_string();
    match status {
        ExerciseStatus::Completed => s.green(),
        ExerciseStatus::Partial => s.yellow(),
        ExerciseStatus::NotStarted => s.dimmed(),
    }
}

/// One row per exercise, columns padded on the plain text.
pub fn print_summary(rows: &[ExerciseSummary]) {
    let headers = ["Exercise", "Sets", "Reps", "Load", "RPE"];
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|r| {
            [
                r.name.clone(),
                r.sets.to_string(),
                r.reps.clone(),
                r.load.clone(),
                r.rpe.clone(),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &cells {
        for (w, c) in widths.iter_mut().zip(row) {
            *w = (*w).max(c.chars().count());
        }
    }

    let header = headers
        .iter()
        .zip(widths)
        .map(|(h, w)| format!("{h:<w$}"))
        .collect::<Vec<_>>()
        .join("  ");
    println!("  {}  {}", header.bold(), "Status".bold());

    for (row, summary) in cells.iter().zip(rows) {
        let line = row
            .iter()
            .zip(widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ");
        println!("  {}  {}", line, status_label(summary.status));
    }
}

fn print_entries(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("{}", "  (no finished workouts)".dimmed());
        return;
    }
    println!("{}", "History:".cyan().bold());
    let idx_w = entries.len().to_string().len();
    for (i, e) in entries.iter().enumerate() {
        println!(
            " {} • {} {} {} {}",
            format!("{:>idx_w$}", i + 1).yellow(),
            e.completed_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            e.title.bold(),
            "|".blue(),
            status_label(e.status()),
        );
    }
}

fn print_entry(e: &HistoryEntry) {
    println!(
        "{} {} {}",
        e.title.cyan().bold(),
        e.completed_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
        status_label(e.status())
    );
    print_summary(&e.summary);
}

pub async fn handle(cmd: HistoryCmd, ctx: &Ctx<'_>) -> Result<()> {
    let actor = ctx.actor().await?;

    match cmd {
        HistoryCmd::List { trainee } => {
            let trainee = ctx.trainee_scope(&actor, trainee.as_deref()).await?;
            let entries = history::list(ctx.pool, &trainee.id).await?;
            emit(ctx.fmt, &entries, || print_entries(&entries))?;
        }

        HistoryCmd::Show { entry, trainee } => {
            let trainee = ctx.trainee_scope(&actor, trainee.as_deref()).await?;
            let entries = history::list(ctx.pool, &trainee.id).await?;
            let found = entry
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| entries.get(i))
                .or_else(|| entries.iter().find(|e| e.id == entry.trim()));

            match found {
                Some(e) => emit(ctx.fmt, e, || print_entry(e))?,
                None => println!(
                    "{} no history entry `{}` (see `history list`)",
                    "error:".red().bold(),
                    entry
                ),
            }
        }
    }
    Ok(())
}
