//! Badge Tiers and Display Colors
//!
//! Tier thresholds are configuration, not constants. The color mapping is
//! exhaustive over known tiers with a single fallback for labels this client
//! does not recognise yet.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ClientError, Result};

/// Display color for labels that do not name a known tier
pub const DEFAULT_BADGE_COLOR: &str = "#888888";

/// Reputation level derived from accumulated points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BadgeTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl BadgeTier {
    pub const ALL: [BadgeTier; 4] = [
        BadgeTier::Bronze,
        BadgeTier::Silver,
        BadgeTier::Gold,
        BadgeTier::Platinum,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BadgeTier::Bronze => "Bronze",
            BadgeTier::Silver => "Silver",
            BadgeTier::Gold => "Gold",
            BadgeTier::Platinum => "Platinum",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            BadgeTier::Bronze => "#CD7F32",
            BadgeTier::Silver => "#C0C0C0",
            BadgeTier::Gold => "#FFD700",
            BadgeTier::Platinum => "#E5E4E2",
        }
    }

    /// Backend badge level (Bronze=1 .. Platinum=4)
    pub fn level(&self) -> u8 {
        match self {
            BadgeTier::Bronze => 1,
            BadgeTier::Silver => 2,
            BadgeTier::Gold => 3,
            BadgeTier::Platinum => 4,
        }
    }

    /// Parse a tier name (case-insensitive) or a numeric badge level
    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        if let Ok(level) = trimmed.parse::<u8>() {
            return BadgeTier::ALL.into_iter().find(|t| t.level() == level);
        }
        BadgeTier::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for BadgeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A tier label as received from the server or computed locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TierLabel {
    Known(BadgeTier),
    Unrecognized(String),
}

impl TierLabel {
    pub fn parse(label: &str) -> Self {
        match BadgeTier::from_label(label) {
            Some(tier) => TierLabel::Known(tier),
            None => TierLabel::Unrecognized(label.to_string()),
        }
    }

    pub fn tier(&self) -> Option<BadgeTier> {
        match self {
            TierLabel::Known(tier) => Some(*tier),
            TierLabel::Unrecognized(_) => None,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            TierLabel::Known(tier) => tier.color(),
            TierLabel::Unrecognized(_) => DEFAULT_BADGE_COLOR,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TierLabel::Known(tier) => tier.label(),
            TierLabel::Unrecognized(label) => label,
        }
    }
}

impl From<BadgeTier> for TierLabel {
    fn from(tier: BadgeTier) -> Self {
        TierLabel::Known(tier)
    }
}

impl From<String> for TierLabel {
    fn from(label: String) -> Self {
        TierLabel::parse(&label)
    }
}

impl From<TierLabel> for String {
    fn from(label: TierLabel) -> Self {
        label.as_str().to_string()
    }
}

impl fmt::Display for TierLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Color lookup keyed by a tier label
pub fn badge_color(label: &str) -> &'static str {
    TierLabel::parse(label).color()
}

/// Minimum points for each tier above Bronze
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub silver: u64,
    pub gold: u64,
    pub platinum: u64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            silver: 50,
            gold: 150,
            platinum: 500,
        }
    }
}

impl TierThresholds {
    /// Thresholds must be positive and strictly increasing so ranges stay disjoint
    pub fn validate(&self) -> Result<()> {
        if self.silver == 0 {
            return Err(ClientError::Config(
                "silver threshold must be greater than zero".to_string(),
            ));
        }
        if !(self.silver < self.gold && self.gold < self.platinum) {
            return Err(ClientError::Config(format!(
                "thresholds must increase strictly: silver={} gold={} platinum={}",
                self.silver, self.gold, self.platinum
            )));
        }
        Ok(())
    }

    pub fn tier_for(&self, points: u64) -> BadgeTier {
        if points >= self.platinum {
            BadgeTier::Platinum
        } else if points >= self.gold {
            BadgeTier::Gold
        } else if points >= self.silver {
            BadgeTier::Silver
        } else {
            BadgeTier::Bronze
        }
    }

    /// Points still needed to reach the next tier, `None` at the top
    pub fn points_to_next(&self, points: u64) -> Option<u64> {
        let next = match self.tier_for(points) {
            BadgeTier::Bronze => self.silver,
            BadgeTier::Silver => self.gold,
            BadgeTier::Gold => self.platinum,
            BadgeTier::Platinum => return None,
        };
        Some(next - points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tier_boundaries() {
        let thresholds = TierThresholds::default();
        let cases = [
            (0, BadgeTier::Bronze),
            (49, BadgeTier::Bronze),
            (50, BadgeTier::Silver),
            (149, BadgeTier::Silver),
            (150, BadgeTier::Gold),
            (499, BadgeTier::Gold),
            (500, BadgeTier::Platinum),
            (u64::MAX, BadgeTier::Platinum),
        ];
        for (points, expected) in cases {
            assert_eq!(thresholds.tier_for(points), expected, "points={}", points);
        }
    }

    #[test]
    fn test_tier_monotonic() {
        let thresholds = TierThresholds::default();
        let mut previous = BadgeTier::Bronze;
        for points in 0..1_000 {
            let tier = thresholds.tier_for(points);
            assert!(tier >= previous);
            previous = tier;
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = TierThresholds {
            silver: 1000,
            gold: 3000,
            platinum: 5000,
        };
        assert!(thresholds.validate().is_ok());
        assert_eq!(thresholds.tier_for(999), BadgeTier::Bronze);
        assert_eq!(thresholds.tier_for(3000), BadgeTier::Gold);
        assert_eq!(thresholds.points_to_next(2500), Some(500));
        assert_eq!(thresholds.points_to_next(5000), None);
    }

    #[test]
    fn test_invalid_thresholds() {
        let overlapping = TierThresholds {
            silver: 50,
            gold: 50,
            platinum: 500,
        };
        assert!(overlapping.validate().is_err());

        let zero = TierThresholds {
            silver: 0,
            gold: 10,
            platinum: 20,
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_label_colors() {
        assert_eq!(badge_color("Gold"), "#FFD700");
        assert_eq!(badge_color("silver"), "#C0C0C0");
        assert_eq!(badge_color("4"), "#E5E4E2");
        assert_eq!(badge_color("Diamond"), DEFAULT_BADGE_COLOR);
        assert_eq!(badge_color(""), DEFAULT_BADGE_COLOR);
    }

    #[test]
    fn test_label_serde_keeps_unknown_values() {
        let label: TierLabel = serde_json::from_str("\"Diamond\"").unwrap();
        assert_eq!(label, TierLabel::Unrecognized("Diamond".to_string()));
        assert_eq!(serde_json::to_string(&label).unwrap(), "\"Diamond\"");

        let known: TierLabel = serde_json::from_str("\"bronze\"").unwrap();
        assert_eq!(known.tier(), Some(BadgeTier::Bronze));
        assert_eq!(serde_json::to_string(&known).unwrap(), "\"Bronze\"");
    }
}
