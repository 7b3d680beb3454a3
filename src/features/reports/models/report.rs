use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::classification::models::WasteLabel;

/// Report status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "report_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Investigating,
    Resolved,
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a report status (expected pending, investigating, resolved or verified)")]
pub struct UnknownStatus(pub String);

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Investigating => "investigating",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Verified => "verified",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Resolved | ReportStatus::Verified)
    }

    /// pending -> investigating -> {resolved, verified}; pending may skip ahead
    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        use ReportStatus::*;
        if self.is_terminal() || *self == next {
            return false;
        }
        matches!(
            (self, next),
            (Pending, _) | (Investigating, Resolved) | (Investigating, Verified)
        )
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "investigating" => Ok(ReportStatus::Investigating),
            "resolved" => Ok(ReportStatus::Resolved),
            "verified" => Ok(ReportStatus::Verified),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database model for report
#[derive(Debug, Clone, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub user_id: String,
    pub username: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub image_key: String,
    pub image_url: String,
    pub image_sha256: String,
    pub waste_label: WasteLabel,
    pub annotation: Option<String>,
    pub classifier_raw: String,
    pub points_awarded: i32,
    pub points_applied: bool,
    pub status: ReportStatus,
    pub votes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persist-ready report produced by the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub id: Uuid,
    pub user_id: String,
    pub username: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub image_key: String,
    pub image_url: String,
    pub image_sha256: String,
    pub waste_label: WasteLabel,
    pub annotation: Option<String>,
    pub classifier_raw: String,
    pub points_awarded: i32,
    pub status: ReportStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use ReportStatus::*;
        assert!(Pending.can_transition_to(Investigating));
        assert!(Pending.can_transition_to(Resolved));
        assert!(Pending.can_transition_to(Verified));
        assert!(Investigating.can_transition_to(Resolved));
        assert!(Investigating.can_transition_to(Verified));

        assert!(!Investigating.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Resolved.can_transition_to(Verified));
        assert!(!Verified.can_transition_to(Investigating));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("Investigating".parse(), Ok(ReportStatus::Investigating));
        assert!("closed".parse::<ReportStatus>().is_err());
    }

    #[test]
    fn test_unknown_status_rejected_by_serde() {
        assert!(serde_json::from_str::<ReportStatus>("\"archived\"").is_err());
        assert_eq!(
            serde_json::from_str::<ReportStatus>("\"verified\"").unwrap(),
            ReportStatus::Verified
        );
    }
}
