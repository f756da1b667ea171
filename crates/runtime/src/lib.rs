//! Quarry runtime: the subset lifecycle manager.
//!
//! ```text
//! ┌───────────────┐   validate / synthesize   ┌───────────┐
//! │ SubsetManager │ ────────────────────────► │ quarry-sql│
//! └──────┬────────┘                           └───────────┘
//!        │ dry-run, materialize, fetch, drop
//!   ┌────┴─────────┐        put / get / list / delete   ┌──────────────┐
//!   │ QueryEngine  │   SubsetManager ─────────────────► │ SubsetRegistry│
//!   └──────────────┘                                    └──────────────┘
//! ```
//!
//! Cost estimates come from [`cost::CostEstimator`]; physical table names
//! from [`naming::SubsetNaming`].

pub mod clock;
pub mod cost;
mod errors;
pub mod lifecycle;
pub mod naming;

pub use clock::{Clock, SystemClock};
pub use cost::CostEstimator;
pub use lifecycle::SubsetManager;
pub use naming::SubsetNaming;
