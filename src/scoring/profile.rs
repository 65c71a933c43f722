//! Contributor Profile Counters
//!
//! Points and report counters as stored upstream. Accuracy and, when the
//! server does not send one, the badge tier are derived on demand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tier::{BadgeTier, TierLabel, TierThresholds};

/// Gamification counters for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub points: u64,

    /// Reports counted at submission time
    #[serde(
        default,
        alias = "totalReports",
        alias = "reports_count",
        alias = "reports_submitted"
    )]
    pub total_reports: u64,

    #[serde(default, alias = "verifiedReports")]
    pub verified_reports: u64,

    /// Server-authoritative tier label, if the server sent one
    #[serde(
        default,
        alias = "badgeTier",
        alias = "current_badge",
        alias = "badge_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub badge_tier: Option<String>,

    /// Numeric backend badge level (Bronze=1 .. Platinum=4)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_level: Option<u8>,

    #[serde(
        default,
        alias = "createdAt",
        alias = "date_joined",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at: Some(created_at),
            ..Self::default()
        }
    }

    /// Percentage of submitted reports that were verified
    pub fn accuracy_rate(&self) -> f64 {
        accuracy_rate(self.verified_reports, self.total_reports)
    }

    /// Tier for display: the server's label wins, the local formula is the fallback
    pub fn badge(&self, thresholds: &TierThresholds) -> TierLabel {
        if let Some(label) = self.badge_tier.as_deref()
            && !label.trim().is_empty()
        {
            return TierLabel::parse(label);
        }

        if let Some(level) = self.badge_level {
            return match BadgeTier::ALL.into_iter().find(|t| t.level() == level) {
                Some(tier) => TierLabel::Known(tier),
                None => TierLabel::Unrecognized(level.to_string()),
            };
        }

        TierLabel::Known(thresholds.tier_for(self.points))
    }

    /// Count a new submission (never undone by a later rejection)
    pub fn record_submission(&mut self) {
        self.total_reports += 1;
    }

    /// Credit a verified report
    pub fn record_verified(&mut self, points: u64) {
        self.verified_reports = (self.verified_reports + 1).min(self.total_reports);
        self.points = self.points.saturating_add(points);
    }

    /// Administrative correction; points never drop below zero
    pub fn adjust_points(&mut self, delta: i64) {
        self.points = if delta.is_negative() {
            self.points.saturating_sub(delta.unsigned_abs())
        } else {
            self.points.saturating_add(delta as u64)
        };
    }
}

/// `verified / total * 100`, defined as 0 when nothing was submitted
pub fn accuracy_rate(verified: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (verified as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}
