//! # League Engine
//!
//! Competition engine for amateur leagues: turns a tournament configuration
//! and a pool of registrations into a bracket or round-robin schedule,
//! advances it match by match, and keeps standings consistent throughout.
//!
//! ## Architecture
//!
//! Five components, built bottom-up over one aggregate ([`Competition`]):
//!
//! - [`tournament`]: lifecycle state machine gating every other call
//! - [`roster`]: team formation, capacity and waitlists
//! - [`bracket`]: single elimination, double elimination and round robin
//!   generators behind one [`bracket::GenerateMatches`] interface
//! - [`progression`]: result entry, correction and downstream propagation
//! - [`standings`]: ranking, tie-breaks and unresolved tied groups
//!
//! [`CompetitionManager`] is the service facade: it loads an aggregate,
//! checks the caller's role, runs one operation and commits with optimistic
//! concurrency through a [`db::CompetitionRepository`]. Audit entries
//! ([`audit`]) and notifications ([`notify`]) go out after the commit.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use league_engine::{
//!     CompetitionManager, EngineConfig,
//!     audit::MemoryAuditSink, authz::StaticAuthorizer, db::MemoryRepository,
//!     notify::NoopNotifier, tournament::TournamentConfig,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let manager = CompetitionManager::new(
//!     Arc::new(MemoryRepository::new()),
//!     Arc::new(StaticAuthorizer::new()),
//!     Arc::new(MemoryAuditSink::new()),
//!     Arc::new(NoopNotifier),
//!     EngineConfig::default(),
//! );
//!
//! let config = TournamentConfig::single_elimination("Spring Cup".to_string(), 8);
//! let tournament = manager.create_tournament(1, config).await.unwrap();
//! manager.publish_tournament(1, tournament.id).await.unwrap();
//! # }
//! ```

pub mod audit;
pub mod authz;
pub mod bracket;
pub mod competition;
pub mod config;
pub mod db;
pub mod errors;
pub mod manager;
pub mod notify;
pub mod progression;
pub mod roster;
pub mod standings;
pub mod tournament;

pub use competition::{Competition, Journal};
pub use config::EngineConfig;
pub use errors::{CompetitionError, CompetitionResult, ErrorClass, ErrorReport};
pub use manager::CompetitionManager;
