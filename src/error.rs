use thiserror::Error;

/// Problems with authoring or finding workout programs.
#[derive(Error, Debug, PartialEq)]
pub enum ProgramError {
    #[error("exercise `{0}` appears more than once; names must be unique within a program")]
    DuplicateExercise(String),

    #[error("exercise #{0} has no name")]
    UnnamedExercise(usize),

    #[error("no workout matches `{0}`")]
    NotFound(String),
}

/// Problems resolving who is acting.
#[derive(Error, Debug, PartialEq)]
pub enum UserError {
    #[error("no acting user; pass --as <user> or run `config set user <id|email>`")]
    NoActingUser,

    #[error("no user matches `{0}`")]
    NotFound(String),

    #[error("`{name}` is a {actual}, this needs a {expected}")]
    WrongRole {
        name: String,
        expected: crate::types::Role,
        actual: crate::types::Role,
    },

    #[error("a user with email `{0}` already exists")]
    EmailTaken(String),

    #[error("`{0}` is not one of your trainees")]
    NotYourTrainee(String),

    #[error("name the trainee with --trainee <id|email>")]
    TraineeRequired,
}

/// Problems inside an interactive live session.
#[derive(Error, Debug, PartialEq)]
pub enum LiveError {
    #[error("unknown field `{0}` (expected reps, load or rpe)")]
    UnknownField(String),

    #[error("unknown command `{0}`; type `help`")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}
