//! Match progression.
//!
//! Results enter the competition here and nowhere else:
//! - `start_match` moves a ready match from Scheduled to InProgress
//! - `enter_result` records a score or a forfeit, updates both teams'
//!   counters and writes the winner (and, in double elimination, the loser)
//!   into the downstream slots named by the match's forward pointers
//! - `correct_result` replaces a recorded result, undoing its counter effects
//!   and re-running propagation, as long as no downstream match has finished
//!
//! When the losers' bracket champion wins the first grand final and the
//! tournament offers a reset, the deciding second grand final is created here.

pub mod engine;

pub use engine::{MAX_SCORE, ProgressionEngine, ResultChange, ResultInput};
