use super::WasteLabel;

/// Outcome of one classification, immutable once produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub label: WasteLabel,
    pub annotation: Option<String>,
    /// Raw reply text from the classifier, kept for audit
    pub raw_text: String,
    /// Why the result degraded to `unknown`; logged, never shown to callers
    pub failure_reason: Option<String>,
    pub attempts: u32,
}

impl ClassificationResult {
    pub fn from_label(label: WasteLabel, raw_text: String, attempts: u32) -> Self {
        Self {
            label,
            annotation: label.annotation().map(str::to_string),
            raw_text,
            failure_reason: None,
            attempts,
        }
    }

    /// Sentinel result used when the classifier could not be used
    pub fn degraded(reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            label: WasteLabel::Unknown,
            annotation: None,
            raw_text: String::new(),
            failure_reason: Some(reason.into()),
            attempts,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.failure_reason.is_some()
    }
}
