//! Ballot admission
//!
//! The hasher, verification codes, ballot selections and the ledger that
//! records a ballot as one atomic transaction.

mod errors;
mod hasher;
mod ledger;
mod selections;
mod verification;

pub use errors::{LedgerError, LedgerResult};
pub use hasher::{BallotHasher, DOMAIN_TAG, SALT_LEN};
pub use ledger::{coarsen_origin, BallotLedger, BallotReceipt, ParticipationProof};
pub use selections::BallotSelections;
pub use verification::{generate_code, CodeSource, OsCodeSource};
