//! The entry a user is still composing.
//!
//! Form fields arrive as raw text, one keystroke at a time. A draft only turns
//! into a [`WeeklyInterval`] once every scheduling field is filled in and
//! parses.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conflict::AlternativeSlot;
use crate::error::{Result, TimetableError};
use crate::interval::{parse_time, Day, EntryLabel, WeeklyInterval};

/// The scheduling fields of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    Day,
    StartTime,
    EndTime,
}

impl DraftField {
    pub fn name(self) -> &'static str {
        match self {
            DraftField::Day => "day",
            DraftField::StartTime => "start time",
            DraftField::EndTime => "end time",
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DraftEntry {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(flatten)]
    pub label: EntryLabel,
}

/// What a draft currently amounts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// A scheduling field is still empty.
    Incomplete(DraftField),
    /// A field is filled in but cannot be read (bad time, weekend day).
    Malformed(TimetableError),
    /// Readable, but the end is not after the start.
    Invalid(TimetableError),
    Ready(WeeklyInterval),
}

impl Candidate {
    /// The interval, or the error explaining why there is none yet.
    pub fn into_interval(self) -> Result<WeeklyInterval> {
        match self {
            Candidate::Ready(interval) => Ok(interval),
            Candidate::Incomplete(field) => Err(TimetableError::Incomplete(field.name())),
            Candidate::Malformed(err) | Candidate::Invalid(err) => Err(err),
        }
    }
}

impl DraftEntry {
    pub fn new(day: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            day: day.into(),
            start_time: start.into(),
            end_time: end.into(),
            label: EntryLabel::default(),
        }
    }

    pub fn field(&self, field: DraftField) -> &str {
        match field {
            DraftField::Day => &self.day,
            DraftField::StartTime => &self.start_time,
            DraftField::EndTime => &self.end_time,
        }
    }

    pub fn set(&mut self, field: DraftField, value: impl Into<String>) {
        let value = value.into();
        match field {
            DraftField::Day => self.day = value,
            DraftField::StartTime => self.start_time = value,
            DraftField::EndTime => self.end_time = value,
        }
    }

    /// Replace day, start and end with the suggested slot. The label stays.
    pub fn apply_alternative(&mut self, slot: &AlternativeSlot) {
        self.day = slot.day.to_string();
        self.start_time = slot.start_time.to_string();
        self.end_time = slot.end_time.to_string();
    }

    pub fn candidate(&self) -> Candidate {
        for field in [DraftField::Day, DraftField::StartTime, DraftField::EndTime] {
            if self.field(field).trim().is_empty() {
                return Candidate::Incomplete(field);
            }
        }

        let parsed = self.day.parse::<Day>().and_then(|day| {
            let start = parse_time(&self.start_time)?;
            let end = parse_time(&self.end_time)?;
            Ok((day, start, end))
        });
        let (day, start, end) = match parsed {
            Ok(parts) => parts,
            Err(err) => return Candidate::Malformed(err),
        };

        match WeeklyInterval::new(day, start, end) {
            Ok(interval) => Candidate::Ready(interval.with_label(self.label.clone())),
            Err(err) => Candidate::Invalid(err),
        }
    }
}
