//! Identity boundary
//!
//! Contracts for the two external collaborators the engine consumes: an
//! identity provider that knows voters, and a clock.

mod clock;
mod provider;
mod voter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use provider::{
    IdentityError, IdentityProvider, IdentityResult, InMemoryIdentityProvider,
    RosterIdentityProvider,
};
pub use voter::{VoterProfile, VoterRole};
