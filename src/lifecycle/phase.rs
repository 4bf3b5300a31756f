//! Election phase state machine
//!
//! ```text
//! draft ──> scheduled ──> active ──> closed
//!   └────────────────────────^
//! ```
//!
//! `closed` is terminal. Entering `active` with a start in the future
//! pulls the start back to the moment of activation, and the window must
//! still be well formed and not yet over afterwards.

use chrono::{DateTime, Utc};

use crate::schema::{Election, ElectionPhase};

use super::errors::{LifecycleError, LifecycleResult};

/// Returns true if `from -> to` is an edge of the state machine.
pub fn is_legal_transition(from: ElectionPhase, to: ElectionPhase) -> bool {
    use ElectionPhase::*;
    matches!(
        (from, to),
        (Draft, Scheduled) | (Draft, Active) | (Scheduled, Active) | (Active, Closed)
    )
}

/// Produces the next version of `election` in phase `to`.
pub fn transition(
    election: &Election,
    to: ElectionPhase,
    now: DateTime<Utc>,
) -> LifecycleResult<Election> {
    if !is_legal_transition(election.phase, to) {
        return Err(LifecycleError::InvalidTransition {
            from: election.phase,
            to,
        });
    }

    let mut next = election.clone();
    next.phase = to;
    next.updated_at = now;
    if to == ElectionPhase::Active {
        clamp_start(&mut next, now)?;
    }
    Ok(next)
}

/// Pulls a future start back to `now` and re-checks the window. A window
/// that has already ended cannot be activated.
pub(crate) fn clamp_start(election: &mut Election, now: DateTime<Utc>) -> LifecycleResult<()> {
    if election.start > now {
        election.start = now;
    }
    if !election.has_valid_window() || election.end <= now {
        return Err(LifecycleError::InvalidWindow {
            start: election.start,
            end: election.end,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ElectionId;
    use chrono::{Duration, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn election(phase: ElectionPhase, start: DateTime<Utc>, end: DateTime<Utc>) -> Election {
        Election {
            id: ElectionId::new(),
            title: "Council".to_string(),
            description: String::new(),
            start,
            end,
            phase,
            created_at: noon(),
            updated_at: noon(),
        }
    }

    #[test]
    fn test_edges() {
        use ElectionPhase::*;
        assert!(is_legal_transition(Draft, Scheduled));
        assert!(is_legal_transition(Draft, Active));
        assert!(is_legal_transition(Scheduled, Active));
        assert!(is_legal_transition(Active, Closed));

        assert!(!is_legal_transition(Scheduled, Draft));
        assert!(!is_legal_transition(Active, Scheduled));
        assert!(!is_legal_transition(Draft, Closed));
        for to in [Draft, Scheduled, Active, Closed] {
            assert!(!is_legal_transition(Closed, to));
        }
    }

    #[test]
    fn test_activation_clamps_future_start() {
        let e = election(
            ElectionPhase::Scheduled,
            noon() + Duration::hours(1),
            noon() + Duration::hours(3),
        );
        let next = transition(&e, ElectionPhase::Active, noon()).unwrap();
        assert_eq!(next.start, noon());
        assert_eq!(next.end, e.end);
        assert_eq!(next.phase, ElectionPhase::Active);
    }

    #[test]
    fn test_activation_keeps_past_start() {
        let start = noon() - Duration::hours(1);
        let e = election(ElectionPhase::Draft, start, noon() + Duration::hours(1));
        let next = transition(&e, ElectionPhase::Active, noon()).unwrap();
        assert_eq!(next.start, start);
    }

    #[test]
    fn test_activation_rejects_elapsed_window() {
        let e = election(
            ElectionPhase::Scheduled,
            noon() + Duration::hours(2),
            noon() - Duration::minutes(1),
        );
        let err = transition(&e, ElectionPhase::Active, noon()).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidWindow { .. }));
    }

    #[test]
    fn test_activation_at_end_is_rejected() {
        let e = election(ElectionPhase::Scheduled, noon() + Duration::hours(1), noon());
        assert!(transition(&e, ElectionPhase::Active, noon()).is_err());
    }

    #[test]
    fn test_closed_is_terminal() {
        let e = election(ElectionPhase::Closed, noon(), noon() + Duration::hours(1));
        let err = transition(&e, ElectionPhase::Active, noon()).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: ElectionPhase::Closed,
                to: ElectionPhase::Active
            }
        );
    }
}
