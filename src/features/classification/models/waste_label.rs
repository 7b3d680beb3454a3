use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;
use utoipa::ToSchema;

/// Closed set of labels the classifier can produce
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema, JsonSchema,
)]
#[sqlx(type_name = "waste_label", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WasteLabel {
    Plastic,
    Biodegradable,
    Other,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a waste label (expected plastic, biodegradable, other or unknown)")]
pub struct UnknownLabel(pub String);

impl WasteLabel {
    pub const ALL: [WasteLabel; 4] = [
        WasteLabel::Plastic,
        WasteLabel::Biodegradable,
        WasteLabel::Other,
        WasteLabel::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WasteLabel::Plastic => "plastic",
            WasteLabel::Biodegradable => "biodegradable",
            WasteLabel::Other => "other",
            WasteLabel::Unknown => "unknown",
        }
    }

    /// Display annotation shown next to the report
    pub fn annotation(&self) -> Option<&'static str> {
        match self {
            WasteLabel::Plastic => Some("♻️"),
            WasteLabel::Biodegradable => Some("🌿"),
            WasteLabel::Other | WasteLabel::Unknown => None,
        }
    }

    /// Points awarded for a report carrying this label
    pub fn points(&self) -> u32 {
        match self {
            WasteLabel::Plastic => 10,
            WasteLabel::Biodegradable => 5,
            WasteLabel::Other | WasteLabel::Unknown => 0,
        }
    }

    /// Lenient mapping used for classifier output: anything outside the set is `Unknown`
    pub fn normalize(raw: &str) -> WasteLabel {
        raw.parse().unwrap_or(WasteLabel::Unknown)
    }
}

impl std::str::FromStr for WasteLabel {
    type Err = UnknownLabel;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        WasteLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == normalized)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

impl std::fmt::Display for WasteLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
