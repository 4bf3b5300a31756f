//! Engine facade and configuration

mod audited;
mod config;
mod errors;
mod voting;

pub use audited::Audited;
pub use config::{EngineConfig, MAX_CONFLICT_RETRIES_LIMIT};
pub use errors::{EngineError, EngineResult};
pub use voting::{VotingEngine, VotingEngineBuilder};
