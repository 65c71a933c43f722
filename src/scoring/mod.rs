//! Scoring & Ranking Engine
//!
//! Derives badge tiers from points, applies the points policy when reports
//! are reviewed, and ranks contributors over a leaderboard period.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │ ViolationReport │────►│ ScoreLedger      │◄────│ PointsPolicy    │
//! │ (lifecycle)     │     │ (orchestrator)   │     │ (+10 / +5 bonus)│
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//!                                  │
//!                                  ▼
//!                          ┌──────────────────┐
//!                          │ rank(period)     │──► TierThresholds
//!                          │ (leaderboard)    │    (badge fallback)
//!                          └──────────────────┘
//! ```
//!
//! ## Score Model
//!
//! - Points only grow through verified reports (+10, +5 with evidence)
//! - Administrative corrections may subtract, never below zero
//! - Reports count toward `total_reports` at submission, never retroactively
//! - Tier comes from the server when present, from thresholds otherwise

pub mod leaderboard;
mod ledger;
mod profile;
mod report;
mod tier;

pub use leaderboard::{
    Contributor, LeaderboardEntry, LeaderboardPeriod, PointEvent, RankMarker, Standing, rank,
    rank_by_contributions, rank_standings,
};
pub use ledger::{ReviewOutcome, ScoreLedger};
pub use profile::{UserProfile, accuracy_rate};
pub use report::{PointsPolicy, ReportStatus, ReviewDecision, ViolationReport};
pub use tier::{BadgeTier, DEFAULT_BADGE_COLOR, TierLabel, TierThresholds, badge_color};
