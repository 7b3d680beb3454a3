//! Waste report submission, queries and moderation.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::{PgReportStore, ReportStore, SubmissionService};
