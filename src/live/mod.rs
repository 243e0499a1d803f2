//! The live workout: draft-backed progression through a program's exercises
//! with a wall-clock rest timer between sets.

pub mod input;
pub mod session;
pub mod summary;
pub mod timer;

pub use crate::error::LiveError;
pub use input::Command;
pub use session::{Advance, LiveSession, PerfField, SetOutcome, remaining_exercises};
pub use summary::{compute_summary, finish};
pub use timer::{Clock, SystemClock};
