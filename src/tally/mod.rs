//! Tally aggregation over committed ballots

mod aggregator;
mod errors;
mod results;

pub use aggregator::tally;
pub use errors::{TallyError, TallyResult};
pub use results::{CandidateTally, ElectionTally, PositionTally};
