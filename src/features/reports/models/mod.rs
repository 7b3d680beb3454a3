mod report;
mod submission;

pub use report::{NewReport, Report, ReportStatus};
pub use submission::{ImageUpload, SubmissionRequest};
