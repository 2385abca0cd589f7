//! Team and roster formation.
//!
//! Registrations become teams in one of two ways:
//! - **OrganizerAssigned**: organizers create teams and distribute confirmed
//!   registrations, optionally balancing by skill tier
//! - **PreFormed**: captains create teams and participants join them; a team
//!   is eligible once it meets the minimum roster size
//!
//! Registrations beyond `max_participants` and teams beyond `max_teams` wait
//! in dense, gapless waitlists (see [`waitlist`]).

pub mod formation;
pub mod models;
pub mod waitlist;

pub use formation::{AssignmentReport, auto_assign, member_count, meets_minimum};
pub use models::{
    MatchOutcome, PaymentState, Registration, RegistrationId, RegistrationStatus, Team, TeamId,
    TeamRecord, TeamStatus,
};
pub use waitlist::WaitlistEntry;
