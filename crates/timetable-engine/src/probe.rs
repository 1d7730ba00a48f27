//! The remote conflict probe port.
//!
//! The backend answers a conflict check with a loosely shaped JSON object whose
//! optional fields depend on the caller. [`ProbeResponse`] mirrors that wire
//! shape exactly; it is converted into the tagged [`ProbeVerdict`] as soon as
//! it enters the engine, and nothing past this module sees optional fields.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::conflict::{AffectedUser, AlternativeSlot, ConflictResult, ConflictSource};
use crate::error::{Result, TimetableError};
use crate::interval::{OwnerRef, WeeklyInterval};

/// Message attached to a clear verdict when the probe did not send one.
pub const NO_CONFLICTS_MESSAGE: &str = "No conflicts found.";

/// Cross-entity conflict check, usually an HTTP call to the backend.
#[async_trait]
pub trait AsyncConflictProbe: Send + Sync {
    /// Does `candidate`, scheduled for `owner`, collide with anyone else's
    /// commitments?
    async fn probe(&self, owner: &OwnerRef, candidate: &WeeklyInterval) -> Result<ProbeVerdict>;
}

/// Details of a remote conflict.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeConflict {
    pub message: String,
    pub affected_users: Vec<AffectedUser>,
    pub affected_owners: Vec<OwnerRef>,
    pub conflicting_intervals: Vec<WeeklyInterval>,
    pub alternatives: Vec<AlternativeSlot>,
}

/// Typed answer of a probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ProbeVerdict {
    Clear { message: String },
    Conflict(ProbeConflict),
}

impl ProbeVerdict {
    pub fn clear() -> Self {
        ProbeVerdict::Clear {
            message: NO_CONFLICTS_MESSAGE.to_string(),
        }
    }

    pub fn has_conflict(&self) -> bool {
        matches!(self, ProbeVerdict::Conflict(_))
    }

    /// Alternatives are passed through untouched.
    pub fn into_result(self) -> ConflictResult {
        match self {
            ProbeVerdict::Clear { message } => ConflictResult::clear(message, ConflictSource::Remote),
            ProbeVerdict::Conflict(conflict) => ConflictResult {
                has_conflict: true,
                conflicting_intervals: conflict.conflicting_intervals,
                message: conflict.message,
                affected_owners: conflict.affected_owners,
                affected_users: conflict.affected_users,
                alternatives: conflict.alternatives,
                source: ConflictSource::Remote,
            },
        }
    }
}

/// Wire shape of the backend's `check-conflicts` answer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResponse {
    pub has_conflict: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_users: Option<Vec<AffectedUser>>,
    #[serde(
        default,
        deserialize_with = "lenient_alternatives",
        skip_serializing_if = "Option::is_none"
    )]
    pub alternatives: Option<Vec<AlternativeSlot>>,
}

/// Keep the alternatives that fit a weekday and a day's clock; the backend
/// shifts times without wrapping past midnight (`"24:30"`) or Friday.
fn lenient_alternatives<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<AlternativeSlot>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<Vec<serde_json::Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let offered = raw.len();
    let kept: Vec<AlternativeSlot> = raw
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    if kept.len() < offered {
        debug!(
            dropped = offered - kept.len(),
            "skipping unrepresentable alternatives"
        );
    }
    Ok(Some(kept))
}

impl ProbeResponse {
    /// Parse a raw response body straight into a verdict.
    ///
    /// # Errors
    /// Returns `TimetableError::Probe` when the body is not a valid response.
    pub fn parse_verdict(body: &str) -> Result<ProbeVerdict> {
        let response: ProbeResponse = serde_json::from_str(body)
            .map_err(|e| TimetableError::Probe(format!("malformed probe response: {}", e)))?;
        Ok(response.into())
    }
}

impl From<ProbeResponse> for ProbeVerdict {
    fn from(response: ProbeResponse) -> Self {
        if !response.has_conflict {
            return ProbeVerdict::Clear {
                message: response
                    .message
                    .unwrap_or_else(|| NO_CONFLICTS_MESSAGE.to_string()),
            };
        }
        ProbeVerdict::Conflict(ProbeConflict {
            message: response.message.unwrap_or_default(),
            affected_users: response.affected_users.unwrap_or_default(),
            affected_owners: Vec::new(),
            conflicting_intervals: Vec::new(),
            alternatives: response.alternatives.unwrap_or_default(),
        })
    }
}

impl From<ProbeVerdict> for ProbeResponse {
    fn from(verdict: ProbeVerdict) -> Self {
        match verdict {
            ProbeVerdict::Clear { message } => ProbeResponse {
                has_conflict: false,
                message: Some(message),
                affected_users: Some(Vec::new()),
                alternatives: None,
            },
            ProbeVerdict::Conflict(conflict) => ProbeResponse {
                has_conflict: true,
                message: Some(conflict.message),
                affected_users: Some(conflict.affected_users),
                alternatives: Some(conflict.alternatives),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Day;

    #[test]
    fn sparse_clear_response_gets_default_message() {
        let verdict = ProbeResponse::parse_verdict(r#"{"hasConflict":false}"#).unwrap();
        assert_eq!(verdict, ProbeVerdict::clear());
    }

    #[test]
    fn conflict_response_keeps_alternatives_in_order() {
        let body = r#"{
            "hasConflict": true,
            "message": "This time slot conflicts with existing schedules for 1 professor(s).",
            "affectedUsers": [{"id":"9","role":"PROFESSOR","firstName":"Ada","lastName":"King"}],
            "alternatives": [
                {"day":"Wednesday","startTime":"15:00","endTime":"16:00","label":"Wednesday at 15:00"},
                {"day":"Thursday","startTime":"14:00","endTime":"15:00","label":"Thursday at 14:00"}
            ]
        }"#;
        let result = ProbeResponse::parse_verdict(body).unwrap().into_result();
        assert!(result.has_conflict);
        assert_eq!(result.source, ConflictSource::Remote);
        assert_eq!(result.affected_users[0].full_name(), "Ada King");
        assert_eq!(result.alternatives.len(), 2);
        assert_eq!(result.alternatives[0].day, Day::Wednesday);
        assert_eq!(result.alternatives[0].start_time.to_string(), "15:00");
    }

    #[test]
    fn backend_conflict_body_with_numeric_user_ids() {
        let body = r#"{
            "hasConflict": true,
            "message": "This time slot conflicts with existing schedules for 1 professor(s) and 1 student(s).",
            "affectedUsers": [
                {"id":9,"firstName":"Ada","lastName":"King","email":"ada@campus.edu","role":"PROFESSOR","status":"ACTIVE"},
                {"id":14,"firstName":"Grace","lastName":"Hopper","email":"grace@campus.edu","role":"STUDENT","status":"ACTIVE"}
            ],
            "alternatives": [
                {"day":"Monday","startTime":"10:00","endTime":"11:00","label":"Monday at 10:00"},
                {"day":"Monday","startTime":"10:30","endTime":"11:30","label":"Monday at 10:30"},
                {"day":"Tuesday","startTime":"09:30","endTime":"10:30","label":"Tuesday at 09:30"}
            ]
        }"#;
        let result = ProbeResponse::parse_verdict(body).unwrap().into_result();

        assert!(result.has_conflict);
        let ids: Vec<&str> = result.affected_users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["9", "14"]);
        assert_eq!(result.affected_users[0].role, crate::conflict::Role::Professor);
        assert_eq!(result.alternatives.len(), 3);
    }

    #[test]
    fn alternatives_past_midnight_are_dropped_and_conflict_kept() {
        let body = r#"{
            "hasConflict": true,
            "message": "This time slot conflicts with existing schedules for 1 student(s).",
            "affectedUsers": [{"id":3,"firstName":"Alan","lastName":"Turing","role":"STUDENT"}],
            "alternatives": [
                {"day":"Friday","startTime":"23:30","endTime":"24:30","label":"Friday at 23:30"},
                {"day":"Friday","startTime":"24:00","endTime":"25:00","label":"Friday at 24:00"},
                {"day":"Saturday","startTime":"23:00","endTime":"24:00","label":"Saturday at 23:00"},
                {"day":"Thursday","startTime":"23:00","endTime":"23:59","label":"Thursday at 23:00"}
            ]
        }"#;
        let verdict = ProbeResponse::parse_verdict(body).unwrap();
        assert!(verdict.has_conflict());

        let result = verdict.into_result();
        assert_eq!(result.alternatives.len(), 1);
        assert_eq!(result.alternatives[0].day, Day::Thursday);
        assert_eq!(result.alternatives[0].label, "Thursday at 23:00");
    }

    #[test]
    fn garbage_body_is_a_probe_error() {
        assert!(matches!(
            ProbeResponse::parse_verdict("<html>502</html>"),
            Err(TimetableError::Probe(_))
        ));
    }
}
