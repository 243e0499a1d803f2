use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::Ctx;
use types::{Config, OutputFmt};

mod catalog;
mod cli;
mod commands;
mod db;
mod error;
mod history;
mod live;
mod logging;
mod measurements;
mod models;
mod storage;
mod types;
mod users;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    // Config commands must work even when the configured database is broken.
    if let Commands::Config(cmd) = cli.cmd {
        return commands::config::handle(cmd).await;
    }

    let cfg = Config::load(&Config::default_path()?)?;
    let pool = db::open(cfg.db_path()).await?;

    let acting = cli.acting.as_deref().or(cfg.user());
    let ctx = Ctx {
        pool: &pool,
        fmt: OutputFmt::from_flag(cli.json),
        acting,
        drafts: cfg.drafts_dir(),
    };

    let res = match cli.cmd {
        Commands::User(cmd) => commands::user::handle(cmd, &ctx).await,
        Commands::Program(cmd) => commands::program::handle(cmd, &ctx).await,
        Commands::Live(cmd) => commands::live::handle(cmd, &ctx).await,
        Commands::History(cmd) => commands::history::handle(cmd, &ctx).await,
        Commands::Measure(cmd) => commands::measure::handle(cmd, &ctx).await,
        Commands::Config(_) => Ok(()),
    };

    if let Err(e) = res {
        commands::report(e)?;
    }
    Ok(())
}
