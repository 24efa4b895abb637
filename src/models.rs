//! Document and wire types. Field names stay camelCase on the wire to match
//! the original JSON contract of the frontend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competition {
    pub id: String,
    pub name: String,
    pub passphrase: String,
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    pub total_penalty: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PenaltyStatus {
    Pending,
    Confirmed,
}

impl PenaltyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PenaltyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Penalty {
    pub id: String,
    pub competition_id: String,
    pub penalizing_user: String,
    pub reason: String,
    pub amount: u64,
    pub status: PenaltyStatus,
    pub timestamp: DateTime<Utc>,
}

/// Maps a passphrase to its competition; one entry per passphrase enforces
/// uniqueness at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassphraseIndex {
    pub competition_id: String,
}

/// Competition plus its participant documents. `users` here carries the
/// participants, shadowing the name-list field of [`Competition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionDetails {
    pub id: String,
    pub name: String,
    pub passphrase: String,
    pub users: Vec<Participant>,
}

// Request payloads keep every field optional so missing fields surface as a
// 400 from our own validation instead of an extractor rejection.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompetitionPayload {
    pub name: Option<String>,
    pub passphrase: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCompetitionPayload {
    pub passphrase: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPenaltyPayload {
    pub competition_id: Option<String>,
    pub penalized_user: Option<String>,
    pub penalizing_user: Option<String>,
    pub reason: Option<String>,
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPenaltyPayload {
    pub competition_id: Option<String>,
    pub penalized_user: Option<String>,
    pub penalty_id: Option<String>,
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionQuery {
    pub competition_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltiesQuery {
    pub competition_id: Option<String>,
    pub user_name: Option<String>,
    pub status: Option<String>,
}

/// Requires a present, non-empty field.
pub(crate) fn require_field(value: Option<String>, msg: &'static str) -> Result<String, AppError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Validation(msg)),
    }
}

/// Like [`require_field`], for values that become path segments in the store.
pub(crate) fn require_segment(
    value: Option<String>,
    msg: &'static str,
) -> Result<String, AppError> {
    let value = require_field(value, msg)?;
    if value.contains('/') {
        return Err(AppError::Validation(
            "names and passphrases must not contain '/'",
        ));
    }
    Ok(value)
}
