//! Place timetable entries on a days x hours grid.
//!
//! The grid is a pure function of the entries and a [`GridConfig`]. Offsets are
//! fractions of the column height so the caller can map them onto any pixel
//! size. Entries outside the configured hours are still placed and simply fall
//! outside `0.0..=1.0`; nothing is clamped.

use serde::{Deserialize, Serialize};

use crate::collection::TimetableCollection;
use crate::error::{Result, TimetableError};
use crate::interval::{Day, Minutes, WeeklyInterval};

/// How entries that share a column and overlap in time are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlapMode {
    /// Everything sits in one lane; overlapping entries are drawn on top of
    /// each other.
    #[default]
    Stack,
    /// Overlapping entries are split into lanes so they can be drawn side by side.
    SideBySide,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    /// Day columns, left to right.
    pub days: Vec<Day>,
    /// First hour shown (inclusive).
    pub start_hour: u8,
    /// Last hour shown (exclusive), at most 24.
    pub end_hour: u8,
    pub overlap_mode: OverlapMode,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            days: Day::ALL.to_vec(),
            start_hour: 8,
            end_hour: 18,
            overlap_mode: OverlapMode::Stack,
        }
    }
}

/// One hourly row of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    pub index: usize,
    pub start_hour: u8,
    /// e.g. `8:00 - 9:00`
    pub label: String,
}

impl GridConfig {
    pub fn with_hours(start_hour: u8, end_hour: u8) -> Result<Self> {
        let config = Self {
            start_hour,
            end_hour,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns `TimetableError::Config` for an empty or inverted hour range, an
    /// end hour past 24, or an empty/duplicated day list.
    pub fn validate(&self) -> Result<()> {
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(TimetableError::Config(format!(
                "grid hours {}..{} must satisfy start < end <= 24",
                self.start_hour, self.end_hour
            )));
        }
        if self.days.is_empty() {
            return Err(TimetableError::Config("grid needs at least one day".to_string()));
        }
        for (i, day) in self.days.iter().enumerate() {
            if self.days[..i].contains(day) {
                return Err(TimetableError::Config(format!("duplicate grid day {}", day)));
            }
        }
        Ok(())
    }

    pub fn grid_start_minutes(&self) -> u16 {
        u16::from(self.start_hour) * 60
    }

    pub fn grid_end_minutes(&self) -> u16 {
        u16::from(self.end_hour) * 60
    }

    /// Zero for an inverted range; see [`GridConfig::validate`].
    pub fn total_minutes(&self) -> u16 {
        self.grid_end_minutes().saturating_sub(self.grid_start_minutes())
    }

    /// Grid window as minute values; the end is clamped to 23:59 for a grid
    /// running to midnight.
    pub fn window(&self) -> (Minutes, Minutes) {
        let start = Minutes::from_minute_of_day(self.grid_start_minutes()).unwrap_or_default();
        let end = Minutes::from_minute_of_day(self.grid_end_minutes())
            .or_else(|| Minutes::new(23, 59).ok())
            .unwrap_or_default();
        (start, end)
    }

    pub fn column_of(&self, day: Day) -> Option<usize> {
        self.days.iter().position(|d| *d == day)
    }

    pub fn rows(&self) -> Vec<GridRow> {
        (self.start_hour..self.end_hour)
            .enumerate()
            .map(|(index, hour)| GridRow {
                index,
                start_hour: hour,
                label: format!("{}:00 - {}:00", hour, hour + 1),
            })
            .collect()
    }
}

/// Placement of one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedEntry<'a> {
    pub entry: &'a WeeklyInterval,
    pub day_column: usize,
    /// Start position as a fraction of the column height.
    pub top_offset: f64,
    /// Duration as a fraction of the column height.
    pub height_fraction: f64,
    /// Hour row the entry starts in, relative to the first row. Negative for
    /// entries starting before the grid.
    pub start_row: i32,
    /// Fraction of the starting row that elapses before the entry begins.
    pub row_offset: f64,
    /// Duration measured in rows (hours).
    pub row_span: f64,
    /// True when the entry overlaps the candidate currently being edited.
    pub is_conflicting: bool,
    pub lane: usize,
    pub lane_count: usize,
}

/// Lay out a collection. See [`layout_entries`].
pub fn layout<'a>(
    collection: &'a TimetableCollection,
    config: &GridConfig,
    live_candidate: Option<&WeeklyInterval>,
) -> Vec<PlacedEntry<'a>> {
    layout_entries(collection.entries(), config, live_candidate)
}

/// Compute the placement of every entry whose day is a configured column.
///
/// Output keeps the input order; entries on unconfigured days are dropped.
/// `live_candidate` only drives `is_conflicting` and is not placed itself.
pub fn layout_entries<'a>(
    entries: &'a [WeeklyInterval],
    config: &GridConfig,
    live_candidate: Option<&WeeklyInterval>,
) -> Vec<PlacedEntry<'a>> {
    let grid_start = f64::from(config.grid_start_minutes());
    let total = f64::from(config.total_minutes().max(1));

    let mut placed: Vec<PlacedEntry<'a>> = entries
        .iter()
        .filter_map(|entry| {
            let day_column = config.column_of(entry.day)?;
            let start = f64::from(entry.start().get());
            let duration = f64::from(entry.duration_minutes());
            Some(PlacedEntry {
                entry,
                day_column,
                top_offset: (start - grid_start) / total,
                height_fraction: duration / total,
                start_row: i32::from(entry.start().hour()) - i32::from(config.start_hour),
                row_offset: f64::from(entry.start().minute()) / 60.0,
                row_span: duration / 60.0,
                is_conflicting: live_candidate.is_some_and(|c| entry.overlaps(c)),
                lane: 0,
                lane_count: 1,
            })
        })
        .collect();

    if config.overlap_mode == OverlapMode::SideBySide {
        assign_lanes(&mut placed);
    }

    placed
}

/// Greedy lane assignment per cluster of transitively overlapping entries in a
/// column. Every member of a cluster gets the cluster's lane count.
fn assign_lanes(placed: &mut [PlacedEntry<'_>]) {
    let mut order: Vec<usize> = (0..placed.len()).collect();
    order.sort_by_key(|&i| (placed[i].day_column, placed[i].entry.start(), placed[i].entry.end()));

    let mut cluster: Vec<usize> = Vec::new();
    let mut lane_ends: Vec<Minutes> = Vec::new();
    let mut cluster_end: Option<(usize, Minutes)> = None;

    for i in order {
        let column = placed[i].day_column;
        let start = placed[i].entry.start();
        let end = placed[i].entry.end();

        let continues = matches!(cluster_end, Some((c, e)) if c == column && start < e);
        if !continues {
            close_cluster(placed, &cluster, lane_ends.len());
            cluster.clear();
            lane_ends.clear();
        }

        let lane = match lane_ends.iter().position(|&lane_end| lane_end <= start) {
            Some(free) => {
                lane_ends[free] = end;
                free
            }
            None => {
                lane_ends.push(end);
                lane_ends.len() - 1
            }
        };
        placed[i].lane = lane;
        cluster.push(i);

        let max_end = match cluster_end {
            Some((_, e)) if continues => e.max(end),
            _ => end,
        };
        cluster_end = Some((column, max_end));
    }

    close_cluster(placed, &cluster, lane_ends.len());
}

fn close_cluster(placed: &mut [PlacedEntry<'_>], cluster: &[usize], lanes: usize) {
    for &i in cluster {
        placed[i].lane_count = lanes.max(1);
    }
}
