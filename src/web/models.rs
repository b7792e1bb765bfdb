use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::CandidateResult;

/// Job posting; the description doubles as the job-description context fed
/// into scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

/// Registered applicant account. Passwords are stored as argon2 hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::Accepted => "accepted",
            CandidateStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(CandidateStatus::Pending),
            "accepted" => Ok(CandidateStatus::Accepted),
            "rejected" => Ok(CandidateStatus::Rejected),
            _ => Err(()),
        }
    }
}

/// Scored result plus storage metadata, as persisted in the flat store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: CandidateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub raw_resume_text: String,
    /// Original filename as submitted, if the resume came in as a file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Name the upload was stored under, used for best-effort file cleanup
    /// on deletion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_file: Option<String>,
    #[serde(flatten)]
    pub result: CandidateResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_serde() {
        let json = serde_json::to_string(&CandidateStatus::Accepted).unwrap();
        assert_eq!(json, "\"accepted\"");
        let back: CandidateStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CandidateStatus::Accepted);
    }

    #[test]
    fn status_parses_form_values() {
        assert_eq!("pending".parse(), Ok(CandidateStatus::Pending));
        assert_eq!("rejected".parse(), Ok(CandidateStatus::Rejected));
        assert!("archived".parse::<CandidateStatus>().is_err());
    }
}
