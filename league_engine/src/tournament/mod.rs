//! Tournament configuration and lifecycle.
//!
//! This module provides:
//! - Tournament configuration and validation
//! - The lifecycle state machine (Draft, Open, Closed, InProgress, Completed,
//!   plus Cancelled and Postponed side states)
//!
//! ## Example
//!
//! ```
//! use league_engine::tournament::{Transition, TournamentConfig, TournamentStatus, check_transition};
//!
//! let config = TournamentConfig::single_elimination("Spring Cup".to_string(), 16);
//! assert!(config.validate().is_ok());
//!
//! assert!(check_transition(TournamentStatus::Draft, Transition::Publish).is_ok());
//! assert!(check_transition(TournamentStatus::Draft, Transition::Start).is_err());
//! ```

pub mod lifecycle;
pub mod models;

pub use lifecycle::{Transition, check_transition};
pub use models::{
    EntryFee, FormationMode, RoundRobinOptions, ScoringRule, TieBreaker, Tournament,
    TournamentConfig, TournamentFormat, TournamentId, TournamentStatus, UserId,
};
