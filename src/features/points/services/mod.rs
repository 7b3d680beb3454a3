mod points_ledger;

pub use points_ledger::{LedgerError, PgPointsLedger, PointsLedger};
