mod points;

pub use points::{LeaderboardEntry, LedgerOutcome, PendingAward};
