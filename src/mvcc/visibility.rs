//! Visibility - Deterministic snapshot isolation
//!
//! Given a read view `R` and a version chain `V0 … Vn` ascending by commit
//! identity, the visible version `V*` is defined as:
//! 1. Consider only versions where `V.commit_id ≤ R.read_upper_bound`
//! 2. From those, select the version with the largest commit_id
//! 3. If that version is a tombstone, the row is invisible
//!
//! Guarantees: readers observe a stable snapshot, no dirty reads, no
//! partial visibility of a transaction, no non-repeatable reads.

use super::{ReadView, Version, VersionChain};

/// Stateless visibility resolver.
pub struct Visibility;

impl Visibility {
    /// The version selected by the visibility rule, tombstone or not.
    pub fn visible_version<T>(chain: &VersionChain<T>, view: ReadView) -> Option<&Version<T>> {
        chain
            .versions()
            .iter()
            .rev()
            .find(|v| view.includes(v.commit_id()))
    }

    /// The row visible under `view`, or `None` if it is absent or deleted.
    pub fn visible_row<T>(chain: &VersionChain<T>, view: ReadView) -> Option<&T> {
        Self::visible_version(chain, view).and_then(|v| v.payload().row())
    }
}
