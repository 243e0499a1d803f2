use clap::{Parser, Subcommand};

use crate::{measurements::Metric, types::Role};

#[derive(Parser)]
#[command(name = "spotter", version, about = "Trainer/trainee coaching CLI")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Emit machine-readable JSON instead of colorful text.
    #[arg(global = true, long)]
    pub json: bool,

    /// Act as this user (id or email). Defaults to the `user` config key.
    #[arg(global = true, long = "as", value_name = "USER")]
    pub acting: Option<String>,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Trainer and trainee profiles
    #[command(subcommand, visible_alias = "u")]
    User(UserCmd),

    /// Workout program authoring
    #[command(subcommand, visible_alias = "p")]
    Program(ProgramCmd),

    /// Perform a workout
    #[command(subcommand, visible_alias = "l")]
    Live(LiveCmd),

    /// Finished workouts
    #[command(subcommand, visible_alias = "h")]
    History(HistoryCmd),

    /// Body measurements
    #[command(subcommand, visible_alias = "m")]
    Measure(MeasureCmd),

    /// View or edit spotter config
    #[command(subcommand)]
    Config(ConfigCmd),
}

#[derive(Subcommand)]
pub enum UserCmd {
    /// Register a trainer or trainee
    #[command(visible_alias = "a")]
    Add {
        name: String,
        email: String,

        #[arg(value_enum)]
        role: Role,

        /// Trainer (id or email) a trainee belongs to
        #[arg(short, long)]
        trainer: Option<String>,
    },

    /// List users
    #[command(visible_alias = "ls")]
    List {
        #[arg(short, long, value_enum)]
        role: Option<Role>,

        /// Only trainees of the acting trainer
        #[arg(short, long)]
        mine: bool,
    },

    /// Show a profile (defaults to the acting user)
    #[command(visible_alias = "s")]
    Show { user: Option<String> },

    /// Update profile details
    #[command(visible_alias = "e")]
    Edit {
        /// Defaults to the acting user
        user: Option<String>,

        #[arg(long)]
        age: Option<u32>,

        /// Height in cm
        #[arg(long)]
        height: Option<f64>,

        #[arg(long)]
        goal: Option<String>,
    },

    /// Flip a user's active flag
    Toggle { user: String },
}

#[derive(Subcommand)]
pub enum ProgramCmd {
    /// Create a program for a trainee from a TOML file
    #[command(visible_alias = "c")]
    Create {
        /// Trainee id or email
        trainee: String,
        file: String,
    },

    /// Replace a program's title, goal and exercises from a TOML file
    #[command(visible_alias = "e")]
    Edit {
        /// Program index (from `p list`), id or title
        program: String,
        file: String,

        /// Trainee owning the program (trainers only)
        #[arg(short, long)]
        trainee: Option<String>,
    },

    /// List programs
    #[command(visible_alias = "ls")]
    List {
        /// Trainee id or email (trainers only; trainees see their own)
        #[arg(short, long)]
        trainee: Option<String>,
    },

    /// Show a single program in detail
    #[command(visible_alias = "s")]
    Show {
        program: String,

        #[arg(short, long)]
        trainee: Option<String>,
    },

    /// Flip a program's active flag
    Toggle {
        program: String,

        #[arg(short, long)]
        trainee: Option<String>,
    },

    /// Delete a program
    #[command(visible_alias = "d")]
    Delete {
        program: String,

        #[arg(short, long)]
        trainee: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum LiveCmd {
    /// List active workouts that can be started
    #[command(visible_alias = "ls")]
    List,

    /// Start or resume a workout
    #[command(visible_alias = "s")]
    Start {
        /// Workout index (from `live list`), id or title
        workout: String,
    },

    /// Show the saved progress of a workout without starting it
    #[command(visible_alias = "i")]
    Status { workout: String },

    /// Throw away a workout's saved progress
    Abandon { workout: String },
}

#[derive(Subcommand)]
pub enum HistoryCmd {
    /// List finished workouts
    #[command(visible_alias = "ls")]
    List {
        /// Trainee id or email (trainers only)
        #[arg(short, long)]
        trainee: Option<String>,
    },

    /// Show one finished workout
    #[command(visible_alias = "s")]
    Show {
        /// Entry index (from `history list`) or id
        entry: String,

        #[arg(short, long)]
        trainee: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum MeasureCmd {
    /// Record a measurement
    #[command(visible_alias = "a")]
    Add {
        /// Body weight in kg
        #[arg(long)]
        weight: f64,

        /// Body fat percentage
        #[arg(long)]
        body_fat: f64,

        /// Waist in cm
        #[arg(long)]
        waist: f64,
    },

    /// List measurements
    #[command(visible_alias = "ls")]
    List {
        #[arg(short, long)]
        trainee: Option<String>,
    },

    /// Plot one measurement over time
    #[command(visible_alias = "g")]
    Graph {
        #[arg(short, long, value_enum, default_value = "weight")]
        field: Metric,

        #[arg(short, long)]
        trainee: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Show all config keys
    List,

    /// Get the value of a key
    Get { key: String },

    /// Set or override a key
    Set { key: String, val: String },

    /// Remove a key
    Unset { key: String },
}
