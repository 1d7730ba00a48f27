//! WASM bindings for timetable-engine.
//!
//! Exposes time parsing, local conflict checks, grid layout, free slots and
//! alternative suggestions to the browser UI via `wasm-bindgen`. All complex
//! types cross the boundary as JSON strings using the backend's camelCase
//! field names (`startTime`, `hasConflict`, ...).
//!
//! Only the pure half of the engine is bound here. Debounced sessions and the
//! remote probe need a tokio runtime and stay on the JS side.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p timetable-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir packages/timetable-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/timetable_engine_wasm.wasm
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use timetable_engine::conflict::{check_local, ConflictResult, ConflictSource};
use timetable_engine::draft::{Candidate, DraftEntry};
use timetable_engine::grid::{layout_entries, GridConfig};
use timetable_engine::interval::{parse_time, Day, WeeklyInterval};
use timetable_engine::probe::NO_CONFLICTS_MESSAGE;
use timetable_engine::{find_free_slots, suggest_alternatives, TimetableCollection};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

fn from_json<T: for<'de> Deserialize<'de>>(what: &str, json: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid {} JSON: {}", what, e)))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Grid config from optional JSON; absent means the 08:00-18:00 weekday grid.
fn grid_config(json: Option<String>) -> Result<GridConfig, JsValue> {
    let config = match json.as_deref() {
        Some(json) => from_json::<GridConfig>("grid config", json)?,
        None => GridConfig::default(),
    };
    config
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(config)
}

/// Parse a JSON array of entries, dropping any whose day is not a weekday.
///
/// Stored timetables may still carry weekend entries from older clients; those
/// have no column to go in. Any other malformed entry is an error.
fn weekday_entries(json: &str) -> Result<Vec<WeeklyInterval>, JsValue> {
    let raw: Vec<Value> = from_json("entries", json)?;
    let mut entries = Vec::with_capacity(raw.len());
    for value in raw {
        let schedulable = value
            .get("day")
            .and_then(Value::as_str)
            .is_some_and(|day| day.parse::<Day>().is_ok());
        if !schedulable {
            continue;
        }
        let entry: WeeklyInterval = serde_json::from_value(value)
            .map_err(|e| JsValue::from_str(&format!("Invalid entry: {}", e)))?;
        entries.push(entry);
    }
    Ok(entries)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DraftStateDto {
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<WeeklyInterval>,
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Normalize a time string (`"9:05"`, `"09:05:00"`, RFC 3339...) to `"HH:MM"`.
#[wasm_bindgen(js_name = "parseTime")]
pub fn parse_time_js(raw: &str) -> Result<String, JsValue> {
    parse_time(raw)
        .map(|minutes| minutes.to_string())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Half-open overlap test between two `{day, startTime, endTime}` objects.
#[wasm_bindgen(js_name = "overlaps")]
pub fn overlaps_js(a_json: &str, b_json: &str) -> Result<bool, JsValue> {
    let a: WeeklyInterval = from_json("interval", a_json)?;
    let b: WeeklyInterval = from_json("interval", b_json)?;
    Ok(a.overlaps(&b))
}

/// Classify a raw form draft: `incomplete`, `malformed`, `invalid` or `ready`.
///
/// `ready` carries the parsed entry; the others carry a message for the form.
#[wasm_bindgen(js_name = "validateDraft")]
pub fn validate_draft(draft_json: &str) -> Result<String, JsValue> {
    let draft: DraftEntry = from_json("draft", draft_json)?;
    let dto = match draft.candidate() {
        Candidate::Ready(entry) => DraftStateDto {
            state: "ready",
            message: None,
            entry: Some(entry),
        },
        Candidate::Incomplete(field) => DraftStateDto {
            state: "incomplete",
            message: Some(format!("Missing {}", field)),
            entry: None,
        },
        Candidate::Malformed(err) => DraftStateDto {
            state: "malformed",
            message: Some(err.to_string()),
            entry: None,
        },
        Candidate::Invalid(err) => DraftStateDto {
            state: "invalid",
            message: Some(err.to_string()),
            entry: None,
        },
    };
    to_json(&dto)
}

/// Check a candidate against a timetable (`{owner, entries}`) without
/// contacting the backend.
///
/// Returns a `ConflictResult` JSON object. A clear result has source `local`
/// and only means the owner's own timetable is free.
#[wasm_bindgen(js_name = "checkLocalConflict")]
pub fn check_local_conflict(candidate_json: &str, timetable_json: &str) -> Result<String, JsValue> {
    let candidate: WeeklyInterval = from_json("candidate", candidate_json)?;
    let timetable: TimetableCollection = from_json("timetable", timetable_json)?;
    let result = check_local(&candidate, &timetable)
        .unwrap_or_else(|| ConflictResult::clear(NO_CONFLICTS_MESSAGE, ConflictSource::Local));
    to_json(&result)
}

/// Grid placement for a list of entries.
///
/// `config_json` is an optional `GridConfig`; `live_candidate_json` is the
/// entry being edited, used only to flag conflicting cells. Entries on days
/// that are not weekdays are dropped.
#[wasm_bindgen(js_name = "layoutGrid")]
pub fn layout_grid(
    entries_json: &str,
    config_json: Option<String>,
    live_candidate_json: Option<String>,
) -> Result<String, JsValue> {
    let entries = weekday_entries(entries_json)?;
    let config = grid_config(config_json)?;
    let live = live_candidate_json
        .as_deref()
        .map(|json| from_json::<WeeklyInterval>("candidate", json))
        .transpose()?;

    to_json(&layout_entries(&entries, &config, live.as_ref()))
}

/// Hour rows of the grid, each `{index, startHour, label}`.
#[wasm_bindgen(js_name = "gridRows")]
pub fn grid_rows(config_json: Option<String>) -> Result<String, JsValue> {
    to_json(&grid_config(config_json)?.rows())
}

/// Free gaps on `day` between `window_start` and `window_end` (`"HH:MM"`).
#[wasm_bindgen(js_name = "findFreeSlots")]
pub fn find_free_slots_js(
    entries_json: &str,
    day: &str,
    window_start: &str,
    window_end: &str,
) -> Result<String, JsValue> {
    let entries = weekday_entries(entries_json)?;
    let day: Day = day.parse().map_err(|e: timetable_engine::TimetableError| {
        JsValue::from_str(&e.to_string())
    })?;
    let ws = parse_time(window_start).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let we = parse_time(window_end).map_err(|e| JsValue::from_str(&e.to_string()))?;

    to_json(&find_free_slots(&entries, day, ws, we))
}

/// Replacement slots for a conflicting candidate, avoiding `busy_json`.
#[wasm_bindgen(js_name = "suggestAlternatives")]
pub fn suggest_alternatives_js(
    candidate_json: &str,
    busy_json: &str,
    config_json: Option<String>,
) -> Result<String, JsValue> {
    let candidate: WeeklyInterval = from_json("candidate", candidate_json)?;
    let busy = weekday_entries(busy_json)?;
    let config = grid_config(config_json)?;

    to_json(&suggest_alternatives(&candidate, &busy, &config))
}
