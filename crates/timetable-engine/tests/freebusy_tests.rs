//! Tests for free slot computation within one day.

use timetable_engine::freebusy::{find_first_free_slot, find_free_slots, merge_busy_periods};
use timetable_engine::{Day, Minutes, WeeklyInterval};

fn entry(day: Day, start: &str, end: &str) -> WeeklyInterval {
    WeeklyInterval::parse(day.name(), start, end).unwrap()
}

fn at(hour: u16, minute: u16) -> Minutes {
    Minutes::new(hour, minute).unwrap()
}

#[test]
fn single_entry_produces_two_free_slots() {
    // Window: 08:00-17:00, entry 10:00-11:00
    // Free: 08:00-10:00 (120 min), 11:00-17:00 (360 min)
    let entries = vec![entry(Day::Monday, "10:00", "11:00")];

    let slots = find_free_slots(&entries, Day::Monday, at(8, 0), at(17, 0));

    assert_eq!(slots.len(), 2, "single entry should produce 2 free slots");
    assert_eq!(slots[0].start_time, at(8, 0));
    assert_eq!(slots[0].duration_minutes, 120);
    assert_eq!(slots[1].start_time, at(11, 0));
    assert_eq!(slots[1].duration_minutes, 360);
}

#[test]
fn overlapping_entries_merged_correctly() {
    // 10:00-11:30 and 11:00-12:00 → busy 10:00-12:00
    let entries = vec![
        entry(Day::Tuesday, "10:00", "11:30"),
        entry(Day::Tuesday, "11:00", "12:00"),
    ];

    let merged = merge_busy_periods(&entries, Day::Tuesday, at(8, 0), at(17, 0));
    assert_eq!(merged, vec![(at(10, 0), at(12, 0))]);

    let slots = find_free_slots(&entries, Day::Tuesday, at(8, 0), at(17, 0));
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].duration_minutes, 120);
    assert_eq!(slots[1].duration_minutes, 300);
}

#[test]
fn entries_on_other_days_are_ignored() {
    let entries = vec![entry(Day::Wednesday, "09:00", "17:00")];

    let slots = find_free_slots(&entries, Day::Thursday, at(8, 0), at(17, 0));

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].duration_minutes, 540); // 9 hours
}

#[test]
fn entries_are_clipped_to_window() {
    // 07:00-09:00 starts before the window; only 08:00-09:00 is busy.
    let entries = vec![entry(Day::Monday, "07:00", "09:00")];

    let slots = find_free_slots(&entries, Day::Monday, at(8, 0), at(12, 0));

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start_time, at(9, 0));
    assert_eq!(slots[0].end_time, at(12, 0));
}

#[test]
fn entries_filling_entire_window_no_free_slots() {
    let entries = vec![entry(Day::Friday, "09:00", "12:00")];
    assert!(find_free_slots(&entries, Day::Friday, at(9, 0), at(12, 0)).is_empty());
}

#[test]
fn first_free_slot_with_minimum_duration() {
    // Entries 08:00-08:30 and 09:00-12:00 leave a 30-min gap first.
    // First gap >= 60 min is 12:00-17:00.
    let entries = vec![
        entry(Day::Monday, "08:00", "08:30"),
        entry(Day::Monday, "09:00", "12:00"),
    ];

    let slot = find_first_free_slot(&entries, Day::Monday, at(8, 0), at(17, 0), 60)
        .expect("a long enough gap exists");

    assert_eq!(slot.start_time, at(12, 0));
    assert_eq!(slot.duration_minutes, 300);
}

#[test]
fn first_free_slot_no_gap_large_enough() {
    // Only gap is 10:00-10:15.
    let entries = vec![
        entry(Day::Monday, "09:00", "10:00"),
        entry(Day::Monday, "10:15", "12:00"),
    ];

    assert!(find_first_free_slot(&entries, Day::Monday, at(9, 0), at(12, 0), 60).is_none());
}

#[test]
fn empty_window_has_no_slots() {
    assert!(find_free_slots(&[], Day::Monday, at(12, 0), at(12, 0)).is_empty());
}
