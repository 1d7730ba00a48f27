//! Compute free time slots within one day from a list of entries.
//!
//! Sorts entries by start time, merges overlapping busy periods, then computes
//! the gaps between merged periods within a given window of the day.

use serde::{Deserialize, Serialize};

use crate::interval::{Day, Minutes, WeeklyInterval};

/// A free span on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeSlot {
    pub day: Day,
    pub start_time: Minutes,
    pub end_time: Minutes,
    pub duration_minutes: u16,
}

/// Merge overlapping or adjacent busy periods on `day`, clipped to the window.
///
/// Returns a sorted, non-overlapping list of (start, end) minute pairs.
pub fn merge_busy_periods(
    entries: &[WeeklyInterval],
    day: Day,
    window_start: Minutes,
    window_end: Minutes,
) -> Vec<(Minutes, Minutes)> {
    let mut intervals: Vec<(Minutes, Minutes)> = entries
        .iter()
        .filter(|e| e.day == day && e.start() < window_end && e.end() > window_start)
        .map(|e| (e.start().max(window_start), e.end().min(window_end)))
        .collect();

    if intervals.is_empty() {
        return Vec::new();
    }

    intervals.sort();

    let mut merged: Vec<(Minutes, Minutes)> = Vec::new();
    for (start, end) in intervals {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }

    merged
}

fn slot(day: Day, start: Minutes, end: Minutes) -> FreeSlot {
    FreeSlot {
        day,
        start_time: start,
        end_time: end,
        duration_minutes: end.get() - start.get(),
    }
}

/// Free slots on `day` between `window_start` and `window_end`, sorted by start.
///
/// Entries may overlap; overlapping busy periods are merged before computing gaps.
pub fn find_free_slots(
    entries: &[WeeklyInterval],
    day: Day,
    window_start: Minutes,
    window_end: Minutes,
) -> Vec<FreeSlot> {
    if window_start >= window_end {
        return Vec::new();
    }

    let merged = merge_busy_periods(entries, day, window_start, window_end);

    let mut free_slots = Vec::new();
    let mut cursor = window_start;

    for (busy_start, busy_end) in merged {
        if cursor < busy_start {
            free_slots.push(slot(day, cursor, busy_start));
        }
        cursor = cursor.max(busy_end);
    }

    if cursor < window_end {
        free_slots.push(slot(day, cursor, window_end));
    }

    free_slots
}

/// First free slot on `day` at least `min_duration_minutes` long.
pub fn find_first_free_slot(
    entries: &[WeeklyInterval],
    day: Day,
    window_start: Minutes,
    window_end: Minutes,
    min_duration_minutes: u16,
) -> Option<FreeSlot> {
    find_free_slots(entries, day, window_start, window_end)
        .into_iter()
        .find(|slot| slot.duration_minutes >= min_duration_minutes)
}
