//! The voting engine facade
//!
//! Wires the store, identity provider, clock and audit log together and
//! exposes the ballot, tally and administration operations. Every
//! operation here logs one event, updates metrics and, for ballots and
//! administrative mutations, appends one audit entry.

use std::net::IpAddr;
use std::sync::Arc;

use crate::ballot::{
    BallotLedger, BallotReceipt, BallotSelections, CodeSource, LedgerError, LedgerResult,
    ParticipationProof,
};
use crate::eligibility::{self, EligibilityStatus};
use crate::error::{ClassifiedError, ErrorCategory};
use crate::identity::{
    Clock, IdentityProvider, InMemoryIdentityProvider, RosterIdentityProvider, SystemClock,
};
use crate::lifecycle::{
    ElectionAdmin, ElectionUpdate, LifecycleResult, NewCandidate, NewElection, NewPosition,
    PhaseChange,
};
use crate::mvcc::CommitId;
use crate::observability::{
    log_event_with_fields, AuditAction, AuditEntry, AuditFault, AuditLog, AuditOutcome, Event,
    FileAuditLog, Logger, MemoryAuditLog, MetricsSnapshot,
};
use crate::schema::{
    Candidate, CandidateId, Election, ElectionId, ElectionPhase, Position, PositionId,
    VerificationCode, VoterId,
};
use crate::storage::{Store, StoreStats};
use crate::tally::{self, ElectionTally, TallyResult};

use super::audited::Audited;
use super::config::EngineConfig;
use super::errors::{EngineError, EngineResult};

/// Audit attribution for a row touched by an administrative operation.
trait AuditSubject {
    fn election_id(&self) -> Option<ElectionId>;

    fn target(&self) -> Option<String> {
        None
    }

    fn detail(&self) -> Option<String> {
        None
    }
}

impl AuditSubject for Election {
    fn election_id(&self) -> Option<ElectionId> {
        Some(self.id)
    }
}

impl AuditSubject for Position {
    fn election_id(&self) -> Option<ElectionId> {
        Some(self.election_id)
    }

    fn target(&self) -> Option<String> {
        Some(format!("position:{}", self.id))
    }
}

impl AuditSubject for Candidate {
    fn election_id(&self) -> Option<ElectionId> {
        None
    }

    fn target(&self) -> Option<String> {
        Some(format!("candidate:{}", self.id))
    }
}

impl AuditSubject for PhaseChange {
    fn election_id(&self) -> Option<ElectionId> {
        Some(self.election.id)
    }

    fn detail(&self) -> Option<String> {
        Some(format!("{} -> {}", self.from, self.election.phase))
    }
}

impl AuditSubject for usize {
    fn election_id(&self) -> Option<ElectionId> {
        None
    }

    fn detail(&self) -> Option<String> {
        Some(format!("records_removed={}", self))
    }
}

/// What an administrative request names before it runs.
#[derive(Default)]
struct Scope {
    election_id: Option<ElectionId>,
    target: Option<String>,
}

impl Scope {
    fn election(id: ElectionId) -> Self {
        Self {
            election_id: Some(id),
            target: None,
        }
    }

    fn target(target: String) -> Self {
        Self {
            election_id: None,
            target: Some(target),
        }
    }
}

/// Builder for [`VotingEngine`].
pub struct VotingEngineBuilder {
    store: Arc<Store>,
    identity: Option<Arc<dyn IdentityProvider>>,
    clock: Option<Arc<dyn Clock>>,
    audit: Option<Arc<dyn AuditLog>>,
    codes: Option<Arc<dyn CodeSource>>,
    operator: String,
    max_conflict_retries: u32,
}

impl VotingEngineBuilder {
    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn code_source(mut self, codes: Arc<dyn CodeSource>) -> Self {
        self.codes = Some(codes);
        self
    }

    /// Name recorded as the actor of administrative audit entries.
    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    pub fn max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn build(self) -> VotingEngine {
        let identity: Arc<dyn IdentityProvider> = match self.identity {
            Some(identity) => identity,
            None => Arc::new(InMemoryIdentityProvider::new()),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let audit: Arc<dyn AuditLog> = match self.audit {
            Some(audit) => audit,
            None => Arc::new(MemoryAuditLog::new()),
        };

        let mut ledger = BallotLedger::new(self.store.clone(), clock.clone());
        if let Some(codes) = self.codes {
            ledger = ledger.with_codes(codes);
        }

        VotingEngine {
            ledger,
            admin: ElectionAdmin::new(self.store.clone(), clock.clone()),
            store: self.store,
            identity,
            clock,
            audit,
            operator: self.operator,
            max_conflict_retries: self.max_conflict_retries,
        }
    }
}

/// Ballot admission and tallying engine.
///
/// `VotingEngine` is `Sync`; share it across threads behind an `Arc`.
pub struct VotingEngine {
    store: Arc<Store>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditLog>,
    ledger: BallotLedger,
    admin: ElectionAdmin,
    operator: String,
    max_conflict_retries: u32,
}

impl VotingEngine {
    pub fn builder(store: Arc<Store>) -> VotingEngineBuilder {
        VotingEngineBuilder {
            store,
            identity: None,
            clock: None,
            audit: None,
            codes: None,
            operator: "system".to_string(),
            max_conflict_retries: 3,
        }
    }

    /// Opens the engine described by `config`: replays the WAL, opens the
    /// audit log and loads the voter roster.
    pub fn open(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Logger::set_min_severity(config.min_severity()?);

        let store = Arc::new(Store::open(&config.data_dir)?);

        let audit_path = config.audit_path();
        let audit = FileAuditLog::open(&audit_path).map_err(|source| EngineError::Audit {
            path: audit_path.clone(),
            source,
        })?;

        let identity: Arc<dyn IdentityProvider> = match &config.roster_path {
            Some(path) => Arc::new(RosterIdentityProvider::load(path)?),
            None => Arc::new(InMemoryIdentityProvider::new()),
        };

        Ok(Self::builder(store)
            .identity(identity)
            .audit(Arc::new(audit))
            .max_conflict_retries(config.max_conflict_retries)
            .build())
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn last_commit(&self) -> CommitId {
        self.store.last_commit()
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.store.metrics().snapshot()
    }

    // ==================
    // Ballots
    // ==================

    /// Advisory eligibility check against the latest committed state.
    pub fn can_vote(&self, voter_id: &VoterId, election_id: &ElectionId) -> EligibilityStatus {
        let snapshot = self.store.snapshot();
        let status = eligibility::can_vote(
            &snapshot,
            self.identity.as_ref(),
            voter_id,
            election_id,
            self.clock.now(),
        );
        log_event_with_fields(
            Event::EligibilityChecked,
            &[
                ("election_id", &election_id.to_string()),
                ("status", status.as_str()),
            ],
        );
        status
    }

    /// Casts one ballot. A transient conflict is returned to the caller.
    pub fn cast_ballots(
        &self,
        voter_id: &VoterId,
        election_id: &ElectionId,
        selections: &BallotSelections,
        origin: Option<IpAddr>,
    ) -> LedgerResult<Audited<BallotReceipt>> {
        let result = self.admit(voter_id, election_id, selections, origin);
        self.conclude_ballot(voter_id, election_id, result)
    }

    /// Casts one ballot, repeating the whole attempt with fresh salts and
    /// a fresh verification code after a transient conflict.
    pub fn cast_ballots_with_retry(
        &self,
        voter_id: &VoterId,
        election_id: &ElectionId,
        selections: &BallotSelections,
        origin: Option<IpAddr>,
    ) -> LedgerResult<Audited<BallotReceipt>> {
        let mut retries = 0;
        let result = loop {
            match self.admit(voter_id, election_id, selections, origin) {
                Err(LedgerError::StorageConflict { constraint })
                    if retries < self.max_conflict_retries =>
                {
                    retries += 1;
                    self.store.metrics().increment_conflict_retries();
                    log_event_with_fields(
                        Event::BallotRetry,
                        &[
                            ("attempt", &retries.to_string()),
                            ("constraint", constraint),
                            ("election_id", &election_id.to_string()),
                        ],
                    );
                }
                other => break other,
            }
        };
        self.conclude_ballot(voter_id, election_id, result)
    }

    /// Looks up a participation record by verification code. Malformed
    /// codes are simply not found.
    pub fn verify_participation(&self, code: &str) -> Option<ParticipationProof> {
        let proof = VerificationCode::parse(code)
            .and_then(|code| self.ledger.verify_participation(&code));
        log_event_with_fields(
            Event::ParticipationVerified,
            &[("found", if proof.is_some() { "true" } else { "false" })],
        );
        proof
    }

    fn admit(
        &self,
        voter_id: &VoterId,
        election_id: &ElectionId,
        selections: &BallotSelections,
        origin: Option<IpAddr>,
    ) -> LedgerResult<BallotReceipt> {
        let snapshot = self.store.snapshot();
        let status = eligibility::can_vote(
            &snapshot,
            self.identity.as_ref(),
            voter_id,
            election_id,
            self.clock.now(),
        );
        match status {
            EligibilityStatus::Allowed => {
                self.ledger
                    .cast_ballots(voter_id, election_id, selections, origin)
            }
            EligibilityStatus::ElectionNotFound => Err(LedgerError::ElectionNotFound(*election_id)),
            EligibilityStatus::VoterIneligible => Err(LedgerError::VoterIneligible(*voter_id)),
            EligibilityStatus::AlreadyVoted => Err(LedgerError::DuplicateParticipation),
            EligibilityStatus::ElectionNotActive => Err(LedgerError::ElectionClosed {
                election_id: *election_id,
                phase: snapshot
                    .election(election_id)
                    .map_or(ElectionPhase::Closed, |e| e.phase),
            }),
        }
    }

    fn conclude_ballot(
        &self,
        voter_id: &VoterId,
        election_id: &ElectionId,
        result: LedgerResult<BallotReceipt>,
    ) -> LedgerResult<Audited<BallotReceipt>> {
        let metrics = self.store.metrics();
        let election = election_id.to_string();
        let entry = AuditEntry::new(AuditAction::BallotCast, AuditOutcome::Success, self.clock.now())
            .with_actor(voter_id.to_string())
            .with_election(*election_id);

        match result {
            Ok(receipt) => {
                metrics.increment_ballots_cast();
                log_event_with_fields(
                    Event::BallotCast,
                    &[
                        ("election_id", &election),
                        ("votes", &receipt.votes_recorded.to_string()),
                    ],
                );
                let fault = self.record(entry.with_detail(format!(
                    "votes_recorded={}",
                    receipt.votes_recorded
                )));
                Ok(Audited::new(receipt, fault))
            }
            Err(err) => {
                metrics.increment_ballots_rejected();
                if err == LedgerError::DuplicateParticipation {
                    metrics.increment_duplicate_attempts();
                }
                log_event_with_fields(
                    Event::BallotRejected,
                    &[("code", err.code()), ("election_id", &election)],
                );
                let mut entry = entry.with_error_code(err.code());
                entry.outcome = rejection_outcome(&err);
                self.record(entry);
                Err(err)
            }
        }
    }

    // ==================
    // Tally
    // ==================

    /// Tally as of the latest commit.
    pub fn tally(&self, election_id: &ElectionId) -> TallyResult<ElectionTally> {
        self.tally_at(election_id, self.store.last_commit())
    }

    /// Tally as of `commit_id`. Later commits are not visible in it.
    pub fn tally_at(
        &self,
        election_id: &ElectionId,
        commit_id: CommitId,
    ) -> TallyResult<ElectionTally> {
        let result = tally::tally(&self.store.snapshot_at(commit_id), election_id);
        if let Ok(t) = &result {
            self.store.metrics().increment_tallies();
            log_event_with_fields(
                Event::TallyComputed,
                &[
                    ("as_of", &t.as_of.to_string()),
                    ("election_id", &election_id.to_string()),
                    ("total_votes", &t.total_votes.to_string()),
                ],
            );
        }
        result
    }

    // ==================
    // Lifecycle
    // ==================

    pub fn transition_election(
        &self,
        election_id: &ElectionId,
        target: ElectionPhase,
    ) -> LifecycleResult<Audited<PhaseChange>> {
        let result = self.admin.transition(election_id, target);
        if result.is_ok() {
            self.store.metrics().increment_transitions();
        }
        self.conclude_admin(
            AuditAction::ElectionTransitioned,
            Event::ElectionTransitioned,
            Scope::election(*election_id),
            result,
        )
    }

    pub fn create_election(&self, request: NewElection) -> LifecycleResult<Audited<Election>> {
        let result = self.admin.create_election(request);
        self.conclude_admin(
            AuditAction::ElectionCreated,
            Event::ElectionCreated,
            Scope::default(),
            result,
        )
    }

    pub fn update_election(
        &self,
        election_id: &ElectionId,
        update: ElectionUpdate,
    ) -> LifecycleResult<Audited<Election>> {
        let result = self.admin.update_election(election_id, update);
        self.conclude_admin(
            AuditAction::ElectionUpdated,
            Event::ElectionUpdated,
            Scope::election(*election_id),
            result,
        )
    }

    pub fn delete_election(&self, election_id: &ElectionId) -> LifecycleResult<Audited<Election>> {
        let result = self.admin.delete_election(election_id);
        self.conclude_admin(
            AuditAction::ElectionDeleted,
            Event::ElectionDeleted,
            Scope::election(*election_id),
            result,
        )
    }

    pub fn add_position(&self, request: NewPosition) -> LifecycleResult<Audited<Position>> {
        let scope = Scope::election(request.election_id);
        let result = self.admin.add_position(request);
        self.conclude_admin(
            AuditAction::PositionAdded,
            Event::BallotStructureChanged,
            scope,
            result,
        )
    }

    pub fn remove_position(&self, position_id: &PositionId) -> LifecycleResult<Audited<Position>> {
        let result = self.admin.remove_position(position_id);
        self.conclude_admin(
            AuditAction::PositionRemoved,
            Event::BallotStructureChanged,
            Scope::target(format!("position:{}", position_id)),
            result,
        )
    }

    pub fn add_candidate(&self, request: NewCandidate) -> LifecycleResult<Audited<Candidate>> {
        let scope = Scope::target(format!("position:{}", request.position_id));
        let result = self.admin.add_candidate(request);
        self.conclude_admin(
            AuditAction::CandidateAdded,
            Event::BallotStructureChanged,
            scope,
            result,
        )
    }

    pub fn remove_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> LifecycleResult<Audited<Candidate>> {
        let result = self.admin.remove_candidate(candidate_id);
        self.conclude_admin(
            AuditAction::CandidateRemoved,
            Event::BallotStructureChanged,
            Scope::target(format!("candidate:{}", candidate_id)),
            result,
        )
    }

    /// Removes a departing voter's participation records.
    pub fn purge_voter(&self, voter_id: &VoterId) -> LifecycleResult<Audited<usize>> {
        let result = self.admin.purge_voter(voter_id);
        self.conclude_admin(
            AuditAction::VoterPurged,
            Event::VoterPurged,
            Scope::target(format!("voter:{}", voter_id)),
            result,
        )
    }

    /// Elections, newest first.
    pub fn list_elections(&self) -> Vec<Election> {
        self.admin.list_elections()
    }

    pub fn election(&self, election_id: &ElectionId) -> Option<Election> {
        self.store.snapshot().election(election_id)
    }

    pub fn positions_of(&self, election_id: &ElectionId) -> Vec<Position> {
        self.store.snapshot().positions_of(election_id)
    }

    pub fn candidates_of(&self, position_id: &PositionId) -> Vec<Candidate> {
        self.store.snapshot().candidates_of(position_id)
    }

    fn conclude_admin<T: AuditSubject>(
        &self,
        action: AuditAction,
        event: Event,
        scope: Scope,
        result: LifecycleResult<T>,
    ) -> LifecycleResult<Audited<T>> {
        let mut entry = AuditEntry::new(action, AuditOutcome::Success, self.clock.now())
            .with_actor(self.operator.clone());

        match result {
            Ok(value) => {
                self.store.metrics().increment_admin_mutations();
                entry.election_id = scope.election_id.or_else(|| value.election_id());
                entry.target = scope.target.or_else(|| value.target());
                entry.detail = value.detail();

                let election = entry
                    .election_id
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                let target = entry.target.clone().unwrap_or_default();
                log_event_with_fields(
                    event,
                    &[
                        ("action", action.as_str()),
                        ("election_id", &election),
                        ("target", &target),
                    ],
                );

                let fault = self.record(entry);
                Ok(Audited::new(value, fault))
            }
            Err(err) => {
                entry.outcome = rejection_outcome(&err);
                entry.election_id = scope.election_id;
                entry.target = scope.target;
                entry.error_code = Some(err.code().to_string());

                log_event_with_fields(
                    Event::AdminRejected,
                    &[("action", action.as_str()), ("code", err.code())],
                );
                self.record(entry);
                Err(err)
            }
        }
    }

    /// Appends an audit entry. A failure never undoes the operation; it
    /// is logged, counted and handed back.
    fn record(&self, entry: AuditEntry) -> Option<AuditFault> {
        match self.audit.append(&entry) {
            Ok(()) => None,
            Err(e) => {
                let fault = AuditFault {
                    action: entry.action,
                    reason: e.to_string(),
                };
                self.store.metrics().increment_audit_failures();
                log_event_with_fields(
                    Event::AuditEmitFailed,
                    &[("action", entry.action.as_str()), ("reason", &fault.reason)],
                );
                Some(fault)
            }
        }
    }
}

fn rejection_outcome(err: &dyn ClassifiedError) -> AuditOutcome {
    if err.category() == ErrorCategory::Storage {
        AuditOutcome::Failed
    } else {
        AuditOutcome::Rejected
    }
}
