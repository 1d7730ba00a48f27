//! A single owner's timetable.
//!
//! The collection is only changed through [`TimetableCollection::add`] and the
//! `remove*` methods. `add` runs the local overlap check itself, so an
//! overlapping entry can never be inserted.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TimetableError};
use crate::interval::{Day, OwnerRef, WeeklyInterval};

/// Message used whenever a candidate overlaps an entry of the same timetable.
pub const LOCAL_CONFLICT_MESSAGE: &str =
    "This time slot conflicts with another entry in the current timetable.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableCollection {
    pub owner: OwnerRef,
    #[serde(default)]
    entries: Vec<WeeklyInterval>,
}

impl TimetableCollection {
    pub fn new(owner: OwnerRef) -> Self {
        Self {
            owner,
            entries: Vec::new(),
        }
    }

    /// Build from already-stored entries. Overlaps between them are kept as-is;
    /// stored data is not re-validated here.
    pub fn from_entries(owner: OwnerRef, entries: Vec<WeeklyInterval>) -> Self {
        Self { owner, entries }
    }

    pub fn entries(&self) -> &[WeeklyInterval] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeeklyInterval> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn on_day(&self, day: Day) -> impl Iterator<Item = &WeeklyInterval> {
        self.entries.iter().filter(move |e| e.day == day)
    }

    /// Entries that overlap `candidate`, in collection order.
    pub fn overlapping<'a>(
        &'a self,
        candidate: &'a WeeklyInterval,
    ) -> impl Iterator<Item = &'a WeeklyInterval> + 'a {
        self.entries.iter().filter(move |e| e.overlaps(candidate))
    }

    pub fn has_overlap(&self, candidate: &WeeklyInterval) -> bool {
        self.overlapping(candidate).next().is_some()
    }

    /// Insert `entry`, stamping this collection's owner on it.
    ///
    /// # Errors
    /// Returns `TimetableError::Conflict` when the entry overlaps an existing one.
    pub fn add(&mut self, mut entry: WeeklyInterval) -> Result<&WeeklyInterval> {
        if let Some(existing) = self.overlapping(&entry).next() {
            debug!(
                owner = %self.owner,
                candidate = %entry.slot_key(),
                existing = %existing.slot_key(),
                "refusing overlapping entry"
            );
            return Err(TimetableError::Conflict(LOCAL_CONFLICT_MESSAGE.to_string()));
        }
        entry.owner = Some(self.owner.clone());
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn remove(&mut self, index: usize) -> Option<WeeklyInterval> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub fn remove_by_id(&mut self, id: &str) -> Option<WeeklyInterval> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id.as_deref() == Some(id))?;
        Some(self.entries.remove(index))
    }
}
