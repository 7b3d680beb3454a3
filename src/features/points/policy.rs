use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::core::error::AppError;
use crate::features::classification::models::{UnknownLabel, WasteLabel};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error(transparent)]
    UnknownLabel(#[from] UnknownLabel),
}

impl From<PolicyError> for AppError {
    fn from(err: PolicyError) -> Self {
        AppError::Internal(format!("Points policy: {}", err))
    }
}

/// Points earned by one report. Derived once when the report is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PointAward(u32);

impl PointAward {
    /// Score a label given as text, rejecting labels outside the closed set
    pub fn from_label_text(label: &str) -> Result<Self, PolicyError> {
        points_for(label).map(Self)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Award as stored in the `INTEGER` column
    pub fn as_i32(self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}

/// Points for a label given as text.
///
/// Case-insensitive; labels outside the closed set are rejected rather than
/// scored as zero.
pub fn points_for(label: &str) -> Result<u32, PolicyError> {
    let label: WasteLabel = label.parse()?;
    Ok(label.points())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_for_each_label() {
        assert_eq!(points_for("plastic"), Ok(10));
        assert_eq!(points_for("biodegradable"), Ok(5));
        assert_eq!(points_for("other"), Ok(0));
        assert_eq!(points_for("unknown"), Ok(0));
    }

    #[test]
    fn test_points_for_ignores_case() {
        assert_eq!(points_for("PLASTIC"), Ok(10));
        assert_eq!(points_for("  Biodegradable "), Ok(5));
    }

    #[test]
    fn test_points_for_rejects_unlisted_label() {
        let err = points_for("glass").unwrap_err();
        assert!(err.to_string().contains("glass"));
        assert!(points_for("").is_err());
    }

    #[test]
    fn test_award_from_text_rejects_unlisted_label() {
        assert_eq!(PointAward::from_label_text("Plastic").unwrap().value(), 10);
        assert!(matches!(
            PointAward::from_label_text("metal"),
            Err(PolicyError::UnknownLabel(_))
        ));
    }

    #[test]
    fn test_award_matches_text_policy() {
        for label in WasteLabel::ALL {
            assert_eq!(
                PointAward::from_label_text(label.as_str()).unwrap().value(),
                label.points()
            );
        }
    }
}
