//! Election lifecycle
//!
//! The phase state machine and the administrative operations whose
//! legality depends on it.

mod admin;
mod errors;
mod phase;

pub use admin::{ElectionAdmin, ElectionUpdate, NewCandidate, NewElection, NewPosition, PhaseChange};
pub use errors::{LifecycleError, LifecycleResult};
pub use phase::{is_legal_transition, transition};
