//! Tally aggregator
//!
//! A tally is computed from one snapshot. Every count in it reflects the
//! same commit, so a tally never shows half of a ballot even while
//! ballots are being cast.

use std::cmp::Ordering;

use crate::schema::{Candidate, ElectionId, Position};
use crate::storage::Snapshot;

use super::errors::{TallyError, TallyResult};
use super::results::{CandidateTally, ElectionTally, PositionTally};

/// Computes the tally of `election_id` as of `snapshot`.
pub fn tally(snapshot: &Snapshot<'_>, election_id: &ElectionId) -> TallyResult<ElectionTally> {
    let election = snapshot
        .election(election_id)
        .ok_or(TallyError::ElectionNotFound(*election_id))?;

    let mut positions = snapshot.positions_of(election_id);
    positions.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.title.cmp(&b.title))
    });

    let positions: Vec<PositionTally> = positions
        .into_iter()
        .map(|position| tally_position(snapshot, position))
        .collect();
    let total_votes = positions.iter().map(|p| p.total_votes).sum();

    Ok(ElectionTally {
        election_id: election.id,
        title: election.title,
        phase: election.phase,
        as_of: snapshot.commit_id(),
        total_votes,
        ballots_cast: snapshot.participation_count(election_id),
        positions,
    })
}

fn tally_position(snapshot: &Snapshot<'_>, position: Position) -> PositionTally {
    let counted: Vec<(Candidate, u64)> = snapshot
        .candidates_of(&position.id)
        .into_iter()
        .map(|candidate| {
            let count = snapshot.vote_count(&candidate.id);
            (candidate, count)
        })
        .collect();

    let total: u64 = counted.iter().map(|(_, count)| count).sum();

    let mut candidates: Vec<CandidateTally> = counted
        .into_iter()
        .map(|(candidate, count)| CandidateTally {
            candidate_id: candidate.id,
            full_name: candidate.full_name,
            count,
            percentage: percentage(count, total),
        })
        .collect();
    candidates.sort_by(rank);

    PositionTally {
        position_id: position.id,
        title: position.title,
        max_selections: position.max_selections,
        total_votes: total,
        candidates,
    }
}

/// Count descending, then name, then id.
fn rank(a: &CandidateTally, b: &CandidateTally) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| a.full_name.cmp(&b.full_name))
        .then_with(|| a.candidate_id.cmp(&b.candidate_id))
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CandidateId;

    fn entry(name: &str, count: u64) -> CandidateTally {
        CandidateTally {
            candidate_id: CandidateId::new(),
            full_name: name.to_string(),
            count,
            percentage: 0.0,
        }
    }

    #[test]
    fn test_rank_by_count_then_name() {
        let mut rows = vec![entry("Cora", 2), entry("Abe", 5), entry("Bea", 2)];
        rows.sort_by(rank);
        let names: Vec<_> = rows.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, ["Abe", "Bea", "Cora"]);
    }

    #[test]
    fn test_rank_falls_back_to_id() {
        let mut x = entry("Same", 1);
        let mut y = entry("Same", 1);
        if x.candidate_id > y.candidate_id {
            std::mem::swap(&mut x, &mut y);
        }
        let mut rows = vec![y.clone(), x.clone()];
        rows.sort_by(rank);
        assert_eq!(rows[0].candidate_id, x.candidate_id);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(3, 3), 100.0);
    }
}
