//! MVCC Domain Types
//!
//! The store keeps every row as a version chain tagged with commit
//! identities. Readers capture a `ReadView` and see exactly the commits at
//! or below it, so a tally never observes half of a ballot.
//!
//! This module provides:
//! - `CommitId` - Totally ordered commit identity
//! - `CommitAuthority` - Commit identity assignment
//! - `ReadView` - Stable snapshot boundary
//! - `Version` / `VersionChain` - Immutable row history
//! - `Visibility` - Deterministic snapshot isolation

mod commit_authority;
mod commit_id;
mod read_view;
mod version;
mod version_chain;
mod visibility;

pub use commit_authority::{CommitAuthority, CommitAuthorityError};
pub use commit_id::CommitId;
pub use read_view::ReadView;
pub use version::{Version, VersionPayload};
pub use version_chain::VersionChain;
pub use visibility::Visibility;
