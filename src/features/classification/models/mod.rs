mod classification_result;
mod waste_label;

pub use classification_result::ClassificationResult;
pub use waste_label::{UnknownLabel, WasteLabel};
