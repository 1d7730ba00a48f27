//! Detect overlapping entries and describe the outcome of a conflict check.
//!
//! Pairwise comparison is done with the half-open rule from [`crate::interval`]:
//! adjacent entries (one ends exactly when another starts) are NOT conflicts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::collection::{TimetableCollection, LOCAL_CONFLICT_MESSAGE};
use crate::error::Result;
use crate::interval::{Day, Minutes, OwnerRef, WeeklyInterval};

/// A detected overlap between two entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub entry_a: WeeklyInterval,
    pub entry_b: WeeklyInterval,
    pub overlap_minutes: u16,
}

/// Find all pairwise conflicts between two entry lists.
///
/// The overlap duration is `min(a.end, b.end) - max(a.start, b.start)`.
pub fn find_conflicts(entries_a: &[WeeklyInterval], entries_b: &[WeeklyInterval]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for a in entries_a {
        for b in entries_b {
            if a.overlaps(b) {
                conflicts.push(Conflict {
                    entry_a: a.clone(),
                    entry_b: b.clone(),
                    overlap_minutes: a.overlap_minutes(b),
                });
            }
        }
    }

    conflicts
}

/// Where a [`ConflictResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictSource {
    /// The owner's own timetable.
    Local,
    /// The cross-entity probe.
    Remote,
    /// The probe failed and the failure policy decided the outcome.
    ProbeFailure,
}

/// Role of a person affected by a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Professor,
    Student,
    #[serde(other)]
    Other,
}

/// A person whose existing schedule collides with a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedUser {
    #[serde(deserialize_with = "crate::interval::deserialize_id")]
    pub id: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
}

impl AffectedUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A suggested replacement slot with the same duration as the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeSlot {
    pub day: Day,
    pub start_time: Minutes,
    pub end_time: Minutes,
    #[serde(default)]
    pub label: String,
}

impl AlternativeSlot {
    /// Label in the `"<Day> at <HH:MM>"` form.
    pub fn new(day: Day, start_time: Minutes, end_time: Minutes) -> Self {
        Self {
            day,
            start_time,
            end_time,
            label: format!("{} at {}", day, start_time),
        }
    }

    /// Move `template` into this slot, keeping its label and owner.
    pub fn apply_to(&self, template: &WeeklyInterval) -> Result<WeeklyInterval> {
        template.rescheduled(self.day, self.start_time, self.end_time)
    }
}

impl fmt::Display for AlternativeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Outcome of checking one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResult {
    pub has_conflict: bool,
    pub conflicting_intervals: Vec<WeeklyInterval>,
    pub message: String,
    pub affected_owners: Vec<OwnerRef>,
    pub affected_users: Vec<AffectedUser>,
    pub alternatives: Vec<AlternativeSlot>,
    pub source: ConflictSource,
}

impl ConflictResult {
    pub fn clear(message: impl Into<String>, source: ConflictSource) -> Self {
        Self {
            has_conflict: false,
            conflicting_intervals: Vec::new(),
            message: message.into(),
            affected_owners: Vec::new(),
            affected_users: Vec::new(),
            alternatives: Vec::new(),
            source,
        }
    }

    /// A conflict against the owner's own timetable. No alternatives are
    /// offered for these.
    pub fn local(owner: &OwnerRef, conflicting: Vec<WeeklyInterval>) -> Self {
        Self {
            has_conflict: true,
            conflicting_intervals: conflicting,
            message: LOCAL_CONFLICT_MESSAGE.to_string(),
            affected_owners: vec![owner.clone()],
            affected_users: Vec::new(),
            alternatives: Vec::new(),
            source: ConflictSource::Local,
        }
    }
}

/// Synchronous check of `candidate` against the owner's own entries.
///
/// Returns `None` when nothing overlaps.
pub fn check_local(
    candidate: &WeeklyInterval,
    collection: &TimetableCollection,
) -> Option<ConflictResult> {
    let conflicting: Vec<WeeklyInterval> = collection.overlapping(candidate).cloned().collect();
    if conflicting.is_empty() {
        return None;
    }
    Some(ConflictResult::local(&collection.owner, conflicting))
}
