//! ballotdb - ballot admission and tallying engine
//!
//! Admits ballots during an election's voting window, records each voter's
//! participation apart from what they chose, enforces one ballot per voter
//! per election at the storage layer, and tallies committed votes from
//! consistent snapshots.

pub mod ballot;
pub mod cli;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod mvcc;
pub mod observability;
pub mod recovery;
pub mod schema;
pub mod storage;
pub mod tally;
pub mod wal;
