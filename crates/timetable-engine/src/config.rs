//! Engine configuration.
//!
//! Defaults match the admin UI: a 500 ms debounce, a 5 s probe timeout,
//! fail-open on probe errors and an 08:00-18:00 grid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::conflict::{ConflictResult, ConflictSource};
use crate::error::{Result, TimetableError};
use crate::grid::GridConfig;

pub const ENV_DEBOUNCE_MS: &str = "TIMETABLE_DEBOUNCE_MS";
pub const ENV_PROBE_TIMEOUT_MS: &str = "TIMETABLE_PROBE_TIMEOUT_MS";
pub const ENV_FAILURE_POLICY: &str = "TIMETABLE_PROBE_FAILURE_POLICY";
pub const ENV_GRID_START_HOUR: &str = "TIMETABLE_GRID_START_HOUR";
pub const ENV_GRID_END_HOUR: &str = "TIMETABLE_GRID_END_HOUR";

/// What a failed or timed-out probe means for the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeFailurePolicy {
    /// Treat as "no known conflict"; the user is not blocked.
    #[default]
    FailOpen,
    /// Treat as a conflict; the user is blocked until a probe succeeds.
    FailClosed,
}

impl ProbeFailurePolicy {
    pub fn resolve(self, error: &TimetableError) -> ConflictResult {
        match self {
            ProbeFailurePolicy::FailOpen => ConflictResult::clear(
                "Conflicts could not be verified; no known conflicts.",
                ConflictSource::ProbeFailure,
            ),
            ProbeFailurePolicy::FailClosed => ConflictResult {
                has_conflict: true,
                message: format!("Unable to verify this time slot: {}", error),
                ..ConflictResult::clear(String::new(), ConflictSource::ProbeFailure)
            },
        }
    }
}

impl std::str::FromStr for ProbeFailurePolicy {
    type Err = TimetableError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "fail-open" | "failopen" => Ok(ProbeFailurePolicy::FailOpen),
            "closed" | "fail-closed" | "failclosed" => Ok(ProbeFailurePolicy::FailClosed),
            other => Err(TimetableError::Config(format!(
                "unknown probe failure policy {:?} (expected open or closed)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Quiet period after the last edit before the remote probe fires.
    pub debounce_ms: u64,
    pub probe_timeout_ms: u64,
    pub failure_policy: ProbeFailurePolicy,
    pub grid: GridConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            probe_timeout_ms: 5_000,
            failure_policy: ProbeFailurePolicy::FailOpen,
            grid: GridConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// # Errors
    /// Returns `TimetableError::Config` for a zero probe timeout or an invalid grid.
    pub fn validate(&self) -> Result<()> {
        if self.probe_timeout_ms == 0 {
            return Err(TimetableError::Config(
                "probe timeout must be greater than zero".to_string(),
            ));
        }
        self.grid.validate()
    }

    /// Defaults overridden by the `TIMETABLE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`EngineConfig::from_env`] but reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_DEBOUNCE_MS) {
            config.debounce_ms = parse_number(ENV_DEBOUNCE_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PROBE_TIMEOUT_MS) {
            config.probe_timeout_ms = parse_number(ENV_PROBE_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FAILURE_POLICY) {
            config.failure_policy = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_GRID_START_HOUR) {
            config.grid.start_hour = parse_number(ENV_GRID_START_HOUR, &raw)?;
        }
        if let Some(raw) = lookup(ENV_GRID_END_HOUR) {
            config.grid.end_hour = parse_number(ENV_GRID_END_HOUR, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| TimetableError::Config(format!("invalid engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| TimetableError::Config(format!("{} must be a number, got {:?}", key, raw)))
}
