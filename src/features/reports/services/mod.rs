mod report_assembler;
mod report_store;
mod submission_service;

pub use report_assembler::ReportAssembler;
pub use report_store::{PgReportStore, ReportStore};
pub use submission_service::{SubmissionOutcome, SubmissionService};
