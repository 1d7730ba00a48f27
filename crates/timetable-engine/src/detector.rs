//! Decide whether a candidate may join a timetable.
//!
//! The local timetable is always consulted first and synchronously; a local
//! overlap short-circuits and the remote probe is never called. Otherwise the
//! injected [`AsyncConflictProbe`] is asked, bounded by a timeout. A probe
//! that errors or times out is resolved by the configured
//! [`ProbeFailurePolicy`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::collection::TimetableCollection;
use crate::config::{EngineConfig, ProbeFailurePolicy};
use crate::conflict::{check_local, ConflictResult};
use crate::draft::{Candidate, DraftEntry};
use crate::error::TimetableError;
use crate::interval::{OwnerRef, WeeklyInterval};
use crate::probe::AsyncConflictProbe;

/// Outcome of checking a draft.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictCheck {
    /// Missing or unreadable fields: neither clear nor conflicting.
    InsufficientData(TimetableError),
    /// End not after start; shown to the user as a validation message.
    Invalid(TimetableError),
    Checked(ConflictResult),
}

impl ConflictCheck {
    /// `None` when the answer is unknown.
    pub fn has_conflict(&self) -> Option<bool> {
        match self {
            ConflictCheck::Checked(result) => Some(result.has_conflict),
            ConflictCheck::Invalid(_) | ConflictCheck::InsufficientData(_) => None,
        }
    }
}

pub struct ConflictDetector {
    probe: Arc<dyn AsyncConflictProbe>,
    probe_timeout: Duration,
    failure_policy: ProbeFailurePolicy,
}

impl ConflictDetector {
    pub fn new(probe: Arc<dyn AsyncConflictProbe>, config: &EngineConfig) -> Self {
        Self {
            probe,
            probe_timeout: config.probe_timeout(),
            failure_policy: config.failure_policy,
        }
    }

    pub fn failure_policy(&self) -> ProbeFailurePolicy {
        self.failure_policy
    }

    pub fn check_local(
        &self,
        candidate: &WeeklyInterval,
        local: &TimetableCollection,
    ) -> Option<ConflictResult> {
        check_local(candidate, local)
    }

    /// Ask the remote probe only. Never fails: probe errors go through the
    /// failure policy.
    pub async fn check_remote(&self, owner: &OwnerRef, candidate: &WeeklyInterval) -> ConflictResult {
        debug!(owner = %owner, candidate = %candidate.slot_key(), "probing remote conflicts");

        let error = match tokio::time::timeout(self.probe_timeout, self.probe.probe(owner, candidate)).await {
            Ok(Ok(verdict)) => {
                debug!(owner = %owner, conflict = verdict.has_conflict(), "probe answered");
                return verdict.into_result();
            }
            Ok(Err(err)) => err,
            Err(_) => TimetableError::ProbeTimeout(self.probe_timeout),
        };

        warn!(
            owner = %owner,
            candidate = %candidate.slot_key(),
            error = %error,
            policy = ?self.failure_policy,
            "conflict probe failed"
        );
        self.failure_policy.resolve(&error)
    }

    /// Local check, then remote probe for the local timetable's owner.
    pub async fn check_conflict(
        &self,
        candidate: &WeeklyInterval,
        local: &TimetableCollection,
    ) -> ConflictResult {
        if let Some(result) = self.check_local(candidate, local) {
            debug!(owner = %local.owner, candidate = %candidate.slot_key(), "local conflict");
            return result;
        }
        self.check_remote(&local.owner, candidate).await
    }

    /// Validate a draft, then run [`ConflictDetector::check_conflict`] on it.
    pub async fn check_draft(&self, draft: &DraftEntry, local: &TimetableCollection) -> ConflictCheck {
        let candidate = match draft.candidate() {
            Candidate::Ready(candidate) => candidate,
            Candidate::Invalid(err) => return ConflictCheck::Invalid(err),
            Candidate::Malformed(err) => return ConflictCheck::InsufficientData(err),
            Candidate::Incomplete(field) => {
                return ConflictCheck::InsufficientData(TimetableError::Incomplete(field.name()))
            }
        };
        ConflictCheck::Checked(self.check_conflict(&candidate, local).await)
    }
}
