//! Weekly recurring intervals and the time arithmetic over them.
//!
//! Everything that turns text into a day or a minute-of-day lives here, so the
//! detector and the grid engine only ever see validated values.
//!
//! Intervals are half-open: `[start, end)`. Two intervals conflict only when
//! they share a day and `a.start < b.end && b.start < a.end`, so an entry
//! ending at 10:00 and another starting at 10:00 do not conflict.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TimetableError};

/// Minutes in a day. Valid minute-of-day values are `0..MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

// ---------------------------------------------------------------------------
// Day
// ---------------------------------------------------------------------------

/// A day of the academic week. Weekends are not schedulable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    /// All schedulable days in week order.
    pub const ALL: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    /// Zero-based position in the week (Monday = 0).
    pub fn index(self) -> usize {
        self as usize
    }

    /// The following weekday; Friday wraps to Monday.
    pub fn next(self) -> Day {
        Day::ALL[(self.index() + 1) % Day::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Day {
    type Err = TimetableError;

    /// Accepts full names and three-letter abbreviations, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let day = match lower.as_str() {
            "monday" | "mon" => Day::Monday,
            "tuesday" | "tue" => Day::Tuesday,
            "wednesday" | "wed" => Day::Wednesday,
            "thursday" | "thu" => Day::Thursday,
            "friday" | "fri" => Day::Friday,
            _ => return Err(TimetableError::UnknownDay(s.to_string())),
        };
        Ok(day)
    }
}

impl TryFrom<String> for Day {
    type Error = TimetableError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Minutes
// ---------------------------------------------------------------------------

/// A wall-clock time of day with minute precision, stored as minutes since
/// midnight. Serialized as zero-padded `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Minutes(u16);

impl Minutes {
    pub const MIDNIGHT: Minutes = Minutes(0);

    /// Build from an hour (0-23) and minute (0-59).
    pub fn new(hour: u16, minute: u16) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(TimetableError::MalformedTime(format!(
                "{}:{:02}",
                hour, minute
            )));
        }
        Ok(Minutes(hour * 60 + minute))
    }

    /// Build from a raw minute-of-day, `None` when it does not fit in a day.
    pub fn from_minute_of_day(value: u16) -> Option<Self> {
        (value < MINUTES_PER_DAY).then_some(Minutes(value))
    }

    pub fn get(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Shift later by `delta` minutes, `None` past the end of the day.
    pub fn checked_add(self, delta: u16) -> Option<Self> {
        self.0.checked_add(delta).and_then(Minutes::from_minute_of_day)
    }
}

impl fmt::Display for Minutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for Minutes {
    type Err = TimetableError;

    fn from_str(s: &str) -> Result<Self> {
        parse_time(s)
    }
}

impl Serialize for Minutes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Minutes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_time(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parse a textual time into a minute-of-day.
///
/// Accepted forms:
/// - `H:MM`, `HH:MM`, `HH:MM:SS` (seconds are dropped)
/// - full timestamps: RFC 3339, `YYYY-MM-DDTHH:MM[:SS[.fff]]` or the same with
///   a space separator. Only the wall-clock hour and minute are kept.
///
/// # Errors
/// Returns `TimetableError::MalformedTime` for anything else, including empty
/// input. There is no fallback to midnight.
pub fn parse_time(raw: &str) -> Result<Minutes> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TimetableError::MalformedTime(raw.to_string()));
    }

    parse_clock(trimmed)
        .or_else(|| parse_timestamp(trimmed))
        .ok_or_else(|| TimetableError::MalformedTime(raw.to_string()))
}

fn parse_clock(s: &str) -> Option<Minutes> {
    let mut parts = s.split(':');
    let hour = parts.next()?;
    let minute = parts.next()?;
    let second = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let digits = |part: &str, min_len: usize, max_len: usize| {
        (min_len..=max_len).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
    };
    if !digits(hour, 1, 2) || !digits(minute, 2, 2) {
        return None;
    }
    if let Some(second) = second {
        if !digits(second, 2, 2) || second.parse::<u16>().ok()? > 59 {
            return None;
        }
    }

    Minutes::new(hour.parse().ok()?, minute.parse().ok()?).ok()
}

const NAIVE_TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

fn parse_timestamp(s: &str) -> Option<Minutes> {
    // Offset-aware timestamps keep the wall clock of their own offset.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return from_naive_time(dt.time());
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .and_then(|ndt| from_naive_time(ndt.time()))
}

fn from_naive_time(time: NaiveTime) -> Option<Minutes> {
    Minutes::new(time.hour() as u16, time.minute() as u16).ok()
}

// ---------------------------------------------------------------------------
// Labels and owners
// ---------------------------------------------------------------------------

/// Category of a timetable entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntryKind {
    #[default]
    Lecture,
    Lab,
    Tutorial,
    Seminar,
    Workshop,
    #[serde(rename = "Office Hours")]
    OfficeHours,
    Meeting,
    #[serde(rename = "Study Group")]
    StudyGroup,
    #[serde(other)]
    Other,
}

/// Descriptive metadata carried by an interval. None of it affects scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntryLabel {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EntryLabel {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Opaque reference to whoever owns a timetable (a class group, a person).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerRef(pub String);

impl OwnerRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Wire ids
// ---------------------------------------------------------------------------

/// Backend ids are numeric; ids minted on the client are strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(text) => text,
            WireId::Signed(n) => n.to_string(),
            WireId::Unsigned(n) => n.to_string(),
        }
    }
}

/// Read an id given either as a JSON string or a JSON number.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    WireId::deserialize(deserializer).map(String::from)
}

pub(crate) fn deserialize_opt_id<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WireId>::deserialize(deserializer)?.map(String::from))
}

// ---------------------------------------------------------------------------
// WeeklyInterval
// ---------------------------------------------------------------------------

/// A time span recurring every week on one day.
///
/// `start < end` always holds; the only way in is [`WeeklyInterval::new`] or
/// deserialization, both of which validate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval", rename_all = "camelCase")]
pub struct WeeklyInterval {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub day: Day,
    start_time: Minutes,
    end_time: Minutes,
    #[serde(flatten)]
    pub label: EntryLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInterval {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    id: Option<String>,
    day: Day,
    start_time: Minutes,
    end_time: Minutes,
    #[serde(flatten)]
    label: EntryLabel,
    #[serde(default)]
    owner: Option<OwnerRef>,
}

impl TryFrom<RawInterval> for WeeklyInterval {
    type Error = TimetableError;

    fn try_from(raw: RawInterval) -> Result<Self> {
        let mut interval = WeeklyInterval::new(raw.day, raw.start_time, raw.end_time)?;
        interval.id = raw.id;
        interval.label = raw.label;
        interval.owner = raw.owner;
        Ok(interval)
    }
}

impl WeeklyInterval {
    /// # Errors
    /// Returns `TimetableError::InvalidInterval` when `end <= start`.
    pub fn new(day: Day, start: Minutes, end: Minutes) -> Result<Self> {
        if end <= start {
            return Err(TimetableError::InvalidInterval { start, end });
        }
        Ok(Self {
            id: None,
            day,
            start_time: start,
            end_time: end,
            label: EntryLabel::default(),
            owner: None,
        })
    }

    /// Parse day and times from text, e.g. `("Monday", "9:00", "10:30")`.
    pub fn parse(day: &str, start: &str, end: &str) -> Result<Self> {
        WeeklyInterval::new(day.parse()?, parse_time(start)?, parse_time(end)?)
    }

    pub fn with_label(mut self, label: EntryLabel) -> Self {
        self.label = label;
        self
    }

    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn start(&self) -> Minutes {
        self.start_time
    }

    pub fn end(&self) -> Minutes {
        self.end_time
    }

    /// Same entry moved to another slot; label, owner and id are kept.
    pub fn rescheduled(&self, day: Day, start: Minutes, end: Minutes) -> Result<Self> {
        let mut moved = WeeklyInterval::new(day, start, end)?;
        moved.id = self.id.clone();
        moved.label = self.label.clone();
        moved.owner = self.owner.clone();
        Ok(moved)
    }

    pub fn to_minutes_range(&self) -> (u16, u16) {
        (self.start_time.get(), self.end_time.get())
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end_time.get() - self.start_time.get()
    }

    pub fn overlaps(&self, other: &WeeklyInterval) -> bool {
        self.day == other.day
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }

    /// Length of the shared span in minutes; 0 when they do not overlap.
    pub fn overlap_minutes(&self, other: &WeeklyInterval) -> u16 {
        if !self.overlaps(other) {
            return 0;
        }
        let start = self.start_time.max(other.start_time);
        let end = self.end_time.min(other.end_time);
        end.get() - start.get()
    }

    /// Human-readable slot, e.g. `Monday (09:00 - 10:00)`.
    pub fn slot_key(&self) -> String {
        format!("{} ({} - {})", self.day, self.start_time, self.end_time)
    }
}

/// Same-day half-open overlap test.
pub fn overlaps(a: &WeeklyInterval, b: &WeeklyInterval) -> bool {
    a.overlaps(b)
}

pub fn to_minutes_range(interval: &WeeklyInterval) -> (u16, u16) {
    interval.to_minutes_range()
}

pub fn duration_minutes(interval: &WeeklyInterval) -> u16 {
    interval.duration_minutes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_forms_parse_to_minutes() {
        assert_eq!(parse_time("9:00").unwrap().get(), 540);
        assert_eq!(parse_time("09:30").unwrap().get(), 570);
        assert_eq!(parse_time("13:45:59").unwrap().get(), 825);
        assert_eq!(parse_time(" 23:59 ").unwrap().get(), 1439);
    }

    #[test]
    fn timestamps_keep_wall_clock() {
        assert_eq!(parse_time("2025-04-01T14:05:00").unwrap().get(), 845);
        assert_eq!(parse_time("2025-04-01 08:15").unwrap().get(), 495);
        assert_eq!(parse_time("2025-04-01T09:00:00+02:00").unwrap().get(), 540);
        assert_eq!(parse_time("2025-04-01T09:00:00.250Z").unwrap().get(), 540);
    }

    #[test]
    fn malformed_times_are_rejected() {
        for raw in ["", "   ", "9", "9:5", "24:00", "12:60", "ab:cd", "1:00:00:00", "12:00:75"] {
            assert!(
                matches!(parse_time(raw), Err(TimetableError::MalformedTime(_))),
                "{raw:?} should not parse"
            );
        }
    }

    #[test]
    fn day_parsing_is_lenient_about_case() {
        assert_eq!("monday".parse::<Day>().unwrap(), Day::Monday);
        assert_eq!("FRI".parse::<Day>().unwrap(), Day::Friday);
        assert!(matches!(
            "Saturday".parse::<Day>(),
            Err(TimetableError::UnknownDay(_))
        ));
        assert_eq!(Day::Friday.next(), Day::Monday);
    }

    #[test]
    fn interval_serializes_with_wire_names() {
        let interval = WeeklyInterval::parse("Monday", "9:00", "10:30")
            .unwrap()
            .with_label(EntryLabel {
                name: "CS 101".to_string(),
                kind: EntryKind::OfficeHours,
                ..EntryLabel::default()
            });
        let json = serde_json::to_value(&interval).unwrap();
        assert_eq!(json["day"], "Monday");
        assert_eq!(json["startTime"], "09:00");
        assert_eq!(json["endTime"], "10:30");
        assert_eq!(json["type"], "Office Hours");
        assert_eq!(json["name"], "CS 101");
    }

    #[test]
    fn deserialization_enforces_ordering() {
        let bad = r#"{"day":"Monday","startTime":"10:00","endTime":"09:00","name":"x"}"#;
        assert!(serde_json::from_str::<WeeklyInterval>(bad).is_err());

        let good = r#"{"id":"7","day":"tue","startTime":"9:00:00","endTime":"10:00","name":"Lab","type":"Lab"}"#;
        let parsed: WeeklyInterval = serde_json::from_str(good).unwrap();
        assert_eq!(parsed.day, Day::Tuesday);
        assert_eq!(parsed.label.kind, EntryKind::Lab);
        assert_eq!(parsed.id.as_deref(), Some("7"));
    }

    #[test]
    fn backend_entry_with_numeric_id_deserializes() {
        let stored = r##"{
            "id": 7,
            "day": "Monday",
            "name": "Physics",
            "description": null,
            "subjectId": 12,
            "subjectName": "Physics I",
            "instructor": "Dr. Curie",
            "location": null,
            "startTime": "09:00",
            "endTime": "10:00",
            "color": "#4f46e5",
            "type": "Lecture"
        }"##;
        let parsed: WeeklyInterval = serde_json::from_str(stored).unwrap();
        assert_eq!(parsed.id.as_deref(), Some("7"));
        assert_eq!(parsed.day, Day::Monday);
        assert_eq!(parsed.label.name, "Physics");
        assert_eq!(parsed.label.location, None);
        assert_eq!(parsed.duration_minutes(), 60);

        let unsaved = r#"{"id":null,"day":"Monday","startTime":"09:00","endTime":"10:00"}"#;
        let parsed: WeeklyInterval = serde_json::from_str(unsaved).unwrap();
        assert_eq!(parsed.id, None);
    }
}
