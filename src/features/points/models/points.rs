use sqlx::FromRow;
use uuid::Uuid;

/// Report whose award has not yet reached the owner's total
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PendingAward {
    pub report_id: Uuid,
    pub user_id: String,
    pub points_awarded: i32,
}

/// Result of applying one report's award
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    Applied { new_total: i64 },
    /// Award was already reflected; nothing was added
    AlreadyApplied { total: i64 },
}

impl LedgerOutcome {
    pub fn total(&self) -> i64 {
        match self {
            LedgerOutcome::Applied { new_total } => *new_total,
            LedgerOutcome::AlreadyApplied { total } => *total,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, LedgerOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub username: String,
    pub points_total: i64,
}
