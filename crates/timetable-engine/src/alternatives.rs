//! Alternative slots for a conflicting candidate.
//!
//! This is what a conflict probe offers back; the detector itself never calls
//! it. Suggestions keep the candidate's duration and are tried in order:
//! 30 minutes later, 60 minutes later, the same time on the next weekday.
//! Suggestions that would run past the end of the day or that still collide
//! with `busy` are skipped. When none survive, the first gap of the right
//! length inside the grid window is offered, starting from the candidate's day.

use crate::conflict::AlternativeSlot;
use crate::freebusy::find_first_free_slot;
use crate::grid::GridConfig;
use crate::interval::{Day, Minutes, WeeklyInterval};

/// Minutes to push the candidate back by, in order of preference.
pub const SHIFT_OFFSETS: [u16; 2] = [30, 60];

pub fn suggest_alternatives(
    candidate: &WeeklyInterval,
    busy: &[WeeklyInterval],
    grid: &GridConfig,
) -> Vec<AlternativeSlot> {
    let duration = candidate.duration_minutes();

    let mut suggestions: Vec<AlternativeSlot> = SHIFT_OFFSETS
        .iter()
        .filter_map(|&offset| shifted(candidate.day, candidate.start(), offset, duration))
        .collect();
    suggestions.push(AlternativeSlot::new(
        candidate.day.next(),
        candidate.start(),
        candidate.end(),
    ));

    suggestions.retain(|slot| is_free(slot, busy));
    if suggestions.is_empty() {
        suggestions.extend(first_gap(candidate, busy, grid));
    }
    suggestions
}

fn shifted(day: Day, start: Minutes, offset: u16, duration: u16) -> Option<AlternativeSlot> {
    let new_start = start.checked_add(offset)?;
    let new_end = new_start.checked_add(duration)?;
    Some(AlternativeSlot::new(day, new_start, new_end))
}

fn is_free(slot: &AlternativeSlot, busy: &[WeeklyInterval]) -> bool {
    match WeeklyInterval::new(slot.day, slot.start_time, slot.end_time) {
        Ok(probe) => !busy.iter().any(|b| b.overlaps(&probe)),
        Err(_) => false,
    }
}

fn first_gap(
    candidate: &WeeklyInterval,
    busy: &[WeeklyInterval],
    grid: &GridConfig,
) -> Option<AlternativeSlot> {
    let duration = candidate.duration_minutes();
    let (window_start, window_end) = grid.window();

    std::iter::successors(Some(candidate.day), |day| Some(day.next()))
        .take(Day::ALL.len())
        .filter(|day| grid.column_of(*day).is_some())
        .find_map(|day| {
            let gap = find_first_free_slot(busy, day, window_start, window_end, duration)?;
            let end = gap.start_time.checked_add(duration)?;
            Some(AlternativeSlot::new(day, gap.start_time, end))
        })
}
