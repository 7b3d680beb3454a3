//! Points policy, ledger and reconciliation.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod routes;
pub mod services;
pub mod workers;

pub use policy::{points_for, PointAward, PolicyError};
pub use services::{LedgerError, PgPointsLedger, PointsLedger};
pub use workers::PointsReconciler;
