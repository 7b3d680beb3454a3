mod points_reconciler;

pub use points_reconciler::{PointsReconciler, ReconcileSummary};
