//! Standings and tie-break resolution.
//!
//! Round robin standings group teams into points tiers and order each tier
//! with the tournament's tie-break criteria, one criterion at a time. Every
//! split restarts the criteria list inside the smaller subgroup, so
//! head-to-head is always measured among exactly the teams still level.
//! Groups that no criterion separates (a head-to-head cycle, for instance)
//! come back as [`TiedGroup`]s for an organizer to order, never guessed.
//!
//! Elimination standings place teams by the stage at which they were knocked
//! out; teams knocked out at the same stage share a placement.
//!
//! Standings only read team counters; they never change them.

pub mod models;
pub mod resolver;

pub use models::{ManualPlacement, StandingRow, Standings, TiedGroup};
pub use resolver::{compute, validate_resolution};
