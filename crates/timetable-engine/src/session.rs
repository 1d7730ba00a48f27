//! A live editing session for one timetable.
//!
//! The session owns the draft entry and the timetable it will be added to.
//! Every edit is checked against the timetable immediately. When the local
//! check passes, a remote probe is scheduled for after the debounce window;
//! further edits inside the window restart it.
//!
//! Visible conflict state follows last-write-wins. Each edit bumps a
//! generation counter and a probe result is only published if its generation
//! is still current when it resolves. Superseded results are dropped and
//! counted; the underlying request is left to finish on its own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::collection::TimetableCollection;
use crate::config::EngineConfig;
use crate::conflict::{AlternativeSlot, ConflictResult};
use crate::detector::ConflictDetector;
use crate::draft::{Candidate, DraftEntry, DraftField};
use crate::error::{Result, TimetableError};
use crate::interval::{EntryLabel, WeeklyInterval};

/// Conflict state as the UI should show it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConflictStatus {
    /// Nothing to check yet: a field is empty or unreadable.
    #[default]
    Idle,
    /// The draft's end is not after its start.
    Invalid(String),
    /// Local check passed; waiting for the remote probe.
    Checking,
    Resolved(ConflictResult),
}

impl ConflictStatus {
    /// `None` while the answer is unknown.
    pub fn has_conflict(&self) -> Option<bool> {
        match self {
            ConflictStatus::Resolved(result) => Some(result.has_conflict),
            _ => None,
        }
    }

    pub fn alternatives(&self) -> &[AlternativeSlot] {
        match self {
            ConflictStatus::Resolved(result) => &result.alternatives,
            _ => &[],
        }
    }
}

struct Shared {
    generation: Mutex<u64>,
    status: watch::Sender<ConflictStatus>,
    probes_issued: AtomicU64,
    stale_discards: AtomicU64,
}

impl Shared {
    /// Invalidate everything in flight and show `status`. Returns the new
    /// generation.
    fn advance(&self, status: ConflictStatus) -> u64 {
        let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        *generation += 1;
        self.status.send_replace(status);
        *generation
    }

    fn is_current(&self, ticket: u64) -> bool {
        *self.generation.lock().unwrap_or_else(PoisonError::into_inner) == ticket
    }

    fn publish(&self, ticket: u64, status: ConflictStatus) -> bool {
        let generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        if *generation != ticket {
            self.stale_discards.fetch_add(1, Ordering::Relaxed);
            debug!(ticket, current = *generation, "discarding stale probe result");
            return false;
        }
        self.status.send_replace(status);
        true
    }
}

pub struct DraftSession {
    detector: Arc<ConflictDetector>,
    collection: TimetableCollection,
    draft: DraftEntry,
    debounce: Duration,
    runtime: Handle,
    shared: Arc<Shared>,
}

impl DraftSession {
    /// # Errors
    /// Returns `TimetableError::Config` when called outside a tokio runtime.
    pub fn new(
        detector: Arc<ConflictDetector>,
        collection: TimetableCollection,
        config: &EngineConfig,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| {
            TimetableError::Config("draft sessions need a running tokio runtime".to_string())
        })?;
        let (status, _) = watch::channel(ConflictStatus::Idle);
        Ok(Self {
            detector,
            collection,
            draft: DraftEntry::default(),
            debounce: config.debounce(),
            runtime,
            shared: Arc::new(Shared {
                generation: Mutex::new(0),
                status,
                probes_issued: AtomicU64::new(0),
                stale_discards: AtomicU64::new(0),
            }),
        })
    }

    pub fn draft(&self) -> &DraftEntry {
        &self.draft
    }

    pub fn collection(&self) -> &TimetableCollection {
        &self.collection
    }

    /// End the session and hand back the timetable; pending checks are
    /// invalidated on drop.
    pub fn into_collection(mut self) -> TimetableCollection {
        let owner = self.collection.owner.clone();
        std::mem::replace(&mut self.collection, TimetableCollection::new(owner))
    }

    pub fn status(&self) -> ConflictStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConflictStatus> {
        self.shared.status.subscribe()
    }

    /// Remote probes actually started (debounce windows that expired).
    pub fn probes_issued(&self) -> u64 {
        self.shared.probes_issued.load(Ordering::Relaxed)
    }

    /// Probe results dropped because a newer edit superseded them.
    pub fn stale_discards(&self) -> u64 {
        self.shared.stale_discards.load(Ordering::Relaxed)
    }

    pub fn edit(&mut self, field: DraftField, value: impl Into<String>) {
        self.draft.set(field, value);
        self.reevaluate();
    }

    pub fn replace_draft(&mut self, draft: DraftEntry) {
        self.draft = draft;
        self.reevaluate();
    }

    /// Metadata only; does not trigger a new check.
    pub fn set_label(&mut self, label: EntryLabel) {
        self.draft.label = label;
    }

    /// Move the draft to a suggested slot. Clears the conflict state and its
    /// alternatives without probing again.
    pub fn apply_alternative(&mut self, slot: &AlternativeSlot) {
        debug!(owner = %self.collection.owner, slot = %slot, "applying alternative");
        self.draft.apply_alternative(slot);
        self.shared.advance(ConflictStatus::Idle);
    }

    pub fn can_commit(&self) -> bool {
        matches!(self.draft.candidate(), Candidate::Ready(_))
            && match self.status() {
                ConflictStatus::Idle => true,
                ConflictStatus::Resolved(result) => !result.has_conflict,
                ConflictStatus::Invalid(_) | ConflictStatus::Checking => false,
            }
    }

    /// Add the draft to the timetable and start a fresh draft. Returns the
    /// index of the new entry.
    ///
    /// # Errors
    /// - `TimetableError::Conflict` while a conflict is shown, or when the
    ///   timetable itself refuses the entry
    /// - `TimetableError::CheckPending` while the remote probe is outstanding
    /// - the draft's own validation error when it is incomplete or invalid
    pub fn commit(&mut self) -> Result<usize> {
        let candidate = self.draft.candidate().into_interval()?;

        match self.status() {
            ConflictStatus::Checking => return Err(TimetableError::CheckPending),
            ConflictStatus::Resolved(result) if result.has_conflict => {
                return Err(TimetableError::Conflict(result.message))
            }
            _ => {}
        }

        self.collection.add(candidate)?;
        debug!(owner = %self.collection.owner, entries = self.collection.len(), "entry committed");
        self.draft = DraftEntry::default();
        self.shared.advance(ConflictStatus::Idle);
        Ok(self.collection.len() - 1)
    }

    /// Drop an entry from the timetable. The draft is re-checked since the
    /// removed entry may have been what it collided with.
    pub fn remove(&mut self, index: usize) -> Option<WeeklyInterval> {
        let removed = self.collection.remove(index)?;
        self.reevaluate();
        Some(removed)
    }

    fn reevaluate(&mut self) {
        let candidate = match self.draft.candidate() {
            Candidate::Ready(candidate) => candidate,
            Candidate::Invalid(err) => {
                self.shared.advance(ConflictStatus::Invalid(err.to_string()));
                return;
            }
            Candidate::Incomplete(_) | Candidate::Malformed(_) => {
                self.shared.advance(ConflictStatus::Idle);
                return;
            }
        };

        if let Some(local) = self.detector.check_local(&candidate, &self.collection) {
            self.shared.advance(ConflictStatus::Resolved(local));
            return;
        }

        let ticket = self.shared.advance(ConflictStatus::Checking);
        let shared = Arc::clone(&self.shared);
        let detector = Arc::clone(&self.detector);
        let owner = self.collection.owner.clone();
        let debounce = self.debounce;

        self.runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            if !shared.is_current(ticket) {
                trace!(ticket, "debounce window superseded");
                return;
            }
            shared.probes_issued.fetch_add(1, Ordering::Relaxed);
            let result = detector.check_remote(&owner, &candidate).await;
            shared.publish(ticket, ConflictStatus::Resolved(result));
        });
    }
}

impl Drop for DraftSession {
    fn drop(&mut self) {
        // Anything still in flight resolves into a dead generation.
        self.shared.advance(ConflictStatus::Idle);
    }
}
