use std::str::FromStr;

use crate::live::{LiveError, PerfField};

/// One line typed during a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stage(PerfField, String),
    Done,
    Next,
    Back,
    Skip,
    Show,
    Summary,
    Resume,
    Finish,
    Quit,
    Help,
    Empty,
}

pub const HELP: &str = "\
  reps <n>     stage reps for the next set
  load <kg>    stage load for the next set
  rpe <n>      stage RPE for the next set
  done (d)     complete a set
  next (n)     go to the next exercise
  back (b)     go to the previous exercise
  skip         end the current rest
  show         reprint the current exercise
  summary (s)  show the workout summary
  resume       back to the workout from the summary
  finish       save the workout to history
  quit (q)     leave; progress is kept for later";

impl FromStr for Command {
    type Err = LiveError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(Self::Empty);
        };

        let cmd = match head.to_ascii_lowercase().as_str() {
            "done" | "d" => Self::Done,
            "next" | "n" => Self::Next,
            "back" | "b" | "prev" => Self::Back,
            "skip" => Self::Skip,
            "show" | "." => Self::Show,
            "summary" | "s" => Self::Summary,
            "resume" => Self::Resume,
            "finish" => Self::Finish,
            "quit" | "q" | "exit" => Self::Quit,
            "help" | "h" | "?" => Self::Help,
            other => {
                let field = other
                    .parse::<PerfField>()
                    .map_err(|_| LiveError::UnknownCommand(other.to_string()))?;
                let value = words.collect::<Vec<_>>().join(" ");
                if value.is_empty() {
                    return Err(LiveError::Usage("reps|load|rpe <value>"));
                }
                return Ok(Self::Stage(field, value));
            }
        };
        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_keeps_the_raw_value() {
        assert_eq!(
            "reps 8".parse::<Command>(),
            Ok(Command::Stage(PerfField::Reps, "8".into()))
        );
        assert_eq!(
            "kg 102.5".parse::<Command>(),
            Ok(Command::Stage(PerfField::Load, "102.5".into()))
        );
        assert_eq!(
            "RPE 8 - 9".parse::<Command>(),
            Ok(Command::Stage(PerfField::Rpe, "8 - 9".into()))
        );
    }

    #[test]
    fn staging_without_value() {
        assert_eq!(
            "load".parse::<Command>(),
            Err(LiveError::Usage("reps|load|rpe <value>"))
        );
    }

    #[test]
    fn words_and_aliases() {
        assert_eq!("  ".parse::<Command>(), Ok(Command::Empty));
        assert_eq!("d".parse::<Command>(), Ok(Command::Done));
        assert_eq!("Next".parse::<Command>(), Ok(Command::Next));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
        assert_eq!(
            "jump".parse::<Command>(),
            Err(LiveError::UnknownCommand("jump".into()))
        );
    }
}
