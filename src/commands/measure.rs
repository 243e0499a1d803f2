use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::{
    cli::MeasureCmd,
    commands::Ctx,
    measurements,
    models::Measurement,
    types::{Role, emit},
    users,
};

const LABEL_W: usize = 7;

/// Plots `data` (oldest first) as a dot-and-line chart, `width` x `height`
/// cells, with value labels on the left and the date range underneath.
pub fn ascii_graph(
    data: &[(DateTime<Utc>, f64)],
    width: usize,
    height: usize,
    title: &str,
) -> Vec<String> {
    if data.is_empty() {
        return vec!["No data available".to_string()];
    }

    let min_value = data.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max_value = data.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    let range = max_value - min_value;

    if data.len() < 2 || range == 0.0 {
        return vec!["No variation in data".to_string()];
    }

    let width = width.max(2);
    let height = height.max(2);
    let mut grid = vec![vec![' '; width]; height];

    let point = |i: usize| -> (usize, usize) {
        let x = (i as f64 / (data.len() - 1) as f64 * (width - 1) as f64) as usize;
        let y = ((data[i].1 - min_value) / range * (height - 1) as f64) as usize;
        (x, height - 1 - y)
    };

    for i in 0..data.len() {
        let (x, y) = point(i);
        grid[y][x] = '●';

        if i > 0 {
            let (prev_x, prev_y) = point(i - 1);
            let dx = x as isize - prev_x as isize;
            let dy = y as isize - prev_y as isize;
            let steps = dx.abs().max(dy.abs());

            for step in 1..steps {
                let px = (prev_x as isize + dx * step / steps) as usize;
                let py = (prev_y as isize + dy * step / steps) as usize;
                if grid[py][px] == ' ' {
                    grid[py][px] = '·';
                }
            }
        }
    }

    let step = range / (height - 1) as f64;
    let mut result = Vec::with_capacity(height + 4);
    result.push(format!("\n{} {}", title.bold(), "Progression"));
    result.push("─".repeat(width + LABEL_W + 1));

    for (i, row) in grid.iter().enumerate() {
        let value = min_value + step * (height - 1 - i) as f64;
        result.push(format!(
            "{:>LABEL_W$.1} │{}",
            value,
            row.iter().collect::<String>()
        ));
    }

    result.push(format!("{} └{}", " ".repeat(LABEL_W), "─".repeat(width)));

    if let (Some(first), Some(last)) = (data.first(), data.last()) {
        result.push(format!(
            "{}  {}  {}",
            " ".repeat(LABEL_W),
            first.0.format("%Y-%m-%d"),
            last.0.format("%Y-%m-%d")
        ));
    }

    result
}

fn print_measurements(list: &[Measurement]) {
    if list.is_empty() {
        println!("{}", "  (no measurements yet)".dimmed());
        return;
    }
    println!("{}", "Measurements:".cyan().bold());
    println!(
        "  {}",
        format!("{:<16}  {:>8}  {:>8}  {:>8}", "Date", "Weight", "Body Fat", "Waist").bold()
    );
    for m in list {
        println!(
            "  {}  {:>8.1}  {:>7.1}%  {:>8.1}",
            format!("{:<16}", m.timestamp.format("%Y-%m-%d %H:%M")).dimmed(),
            m.weight,
            m.body_fat,
            m.waist
        );
    }
}

pub async fn handle(cmd: MeasureCmd, ctx: &Ctx<'_>) -> Result<()> {
    let actor = ctx.actor().await?;

    match cmd {
        MeasureCmd::Add {
            weight,
            body_fat,
            waist,
        } => {
            users::require_role(&actor, Role::Trainee)?;
            let bad: Vec<&str> = [("weight", weight), ("body fat", body_fat), ("waist", waist)]
                .into_iter()
                .filter(|(_, v)| !v.is_finite() || *v <= 0.0)
                .map(|(name, _)| name)
                .collect();
            if !bad.is_empty() {
                println!(
                    "{} {} must be positive numbers",
                    "error:".red().bold(),
                    bad.join(", ")
                );
                return Ok(());
            }

            let m = measurements::add(ctx.pool, &actor.id, weight, body_fat, waist).await?;
            emit(ctx.fmt, &m, || {
                println!(
                    "{} recorded {} kg, {}% body fat, {} cm waist",
                    "ok:".green().bold(),
                    m.weight,
                    m.body_fat,
                    m.waist
                )
            })?;
        }

        MeasureCmd::List { trainee } => {
            let trainee = ctx.trainee_scope(&actor, trainee.as_deref()).await?;
            let list = measurements::list(ctx.pool, &trainee.id).await?;
            emit(ctx.fmt, &list, || print_measurements(&list))?;
        }

        MeasureCmd::Graph { field, trainee } => {
            let trainee = ctx.trainee_scope(&actor, trainee.as_deref()).await?;
            let list = measurements::list(ctx.pool, &trainee.id).await?;
            let data: Vec<(DateTime<Utc>, f64)> = list
                .iter()
                .rev()
                .map(|m| (m.timestamp, field.value(m)))
                .collect();

            emit(ctx.fmt, &data, || {
                let (term_width, term_height) = term_size::dimensions().unwrap_or((80, 24));
                let width = (term_width / 2).min(60);
                let height = (term_height / 2).min(15);
                for line in ascii_graph(&data, width, height, field.label()) {
                    println!("{}", line);
                }
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(values: &[f64]) -> Vec<(DateTime<Utc>, f64)> {
        let start = Utc::now();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::days(i as i64), *v))
            .collect()
    }

    #[test]
    fn flat_or_empty_series() {
        assert_eq!(ascii_graph(&[], 20, 5, "Weight"), vec!["No data available"]);
        assert_eq!(
            ascii_graph(&series(&[80.0, 80.0]), 20, 5, "Weight"),
            vec!["No variation in data"]
        );
    }

    #[test]
    fn endpoints_land_in_corners() {
        let lines = ascii_graph(&series(&[80.0, 82.0, 78.0]), 10, 5, "Weight");
        // title, rule, 5 rows, axis, dates
        assert_eq!(lines.len(), 9);
        let rows = &lines[2..7];
        // 80 is the first point: x = 0, halfway up
        assert_eq!(rows[2].split('│').nth(1).and_then(|r| r.chars().next()), Some('●'));
        // 78 is the minimum and the last point: bottom right
        assert_eq!(rows[4].split('│').nth(1).and_then(|r| r.chars().last()), Some('●'));
        assert!(rows[0].contains("82.0"));
    }
}
