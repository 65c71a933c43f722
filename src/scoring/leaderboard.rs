//! Leaderboard Ranking
//!
//! Ranks are 1-based and contiguous. Ordering is total: points descending,
//! then total reports descending, then account creation ascending. Rows that
//! still tie (no creation time, same id) keep their input order.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::profile::UserProfile;
use super::tier::{TierLabel, TierThresholds};
use crate::error::ClientError;

/// Aggregation window for a leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardPeriod {
    Week,
    Month,
    #[default]
    All,
}

impl LeaderboardPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardPeriod::Week => "week",
            LeaderboardPeriod::Month => "month",
            LeaderboardPeriod::All => "all",
        }
    }

    /// Earliest instant counted by this period, `None` for all-time
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            LeaderboardPeriod::Week => Some(now - Duration::days(7)),
            LeaderboardPeriod::Month => Some(now - Duration::days(30)),
            LeaderboardPeriod::All => None,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.window_start(now).is_none_or(|start| at >= start)
    }
}

impl fmt::Display for LeaderboardPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaderboardPeriod {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(LeaderboardPeriod::Week),
            "month" => Ok(LeaderboardPeriod::Month),
            "all" => Ok(LeaderboardPeriod::All),
            other => Err(ClientError::Validation(format!(
                "unknown leaderboard period '{}' (expected week, month or all)",
                other
            ))),
        }
    }
}

/// Points credited (or corrected) at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointEvent {
    pub user_id: u64,
    /// Negative only for administrative corrections
    pub points: i64,
    pub occurred_at: DateTime<Utc>,
    /// Report or action that produced the points
    pub source: Option<String>,
}

/// A known participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub user_id: u64,
    pub username: String,
    pub profile: UserProfile,
}

/// Symbolic marker for the podium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankMarker {
    Gold,
    Silver,
    Bronze,
}

impl RankMarker {
    pub fn for_rank(rank: u32) -> Option<Self> {
        match rank {
            1 => Some(RankMarker::Gold),
            2 => Some(RankMarker::Silver),
            3 => Some(RankMarker::Bronze),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            RankMarker::Gold => "🥇",
            RankMarker::Silver => "🥈",
            RankMarker::Bronze => "🥉",
        }
    }
}

/// One row to be ranked: already aggregated for the period
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub user_id: Option<u64>,
    pub username: String,
    pub points: u64,
    pub total_reports: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub badge: TierLabel,
}

/// A ranked leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: Option<u64>,
    pub username: String,
    pub points: u64,
    pub total_reports: u64,
    pub badge: TierLabel,
    pub marker: Option<RankMarker>,
}

impl LeaderboardEntry {
    pub fn badge_color(&self) -> &'static str {
        self.badge.color()
    }

    /// Podium symbol for the top three, the number otherwise
    pub fn display_rank(&self) -> String {
        match self.marker {
            Some(marker) => marker.symbol().to_string(),
            None => self.rank.to_string(),
        }
    }

    /// Entry for a standing whose rank is already known
    pub fn ranked(rank: u32, standing: Standing) -> Self {
        Self {
            rank,
            user_id: standing.user_id,
            username: standing.username,
            points: standing.points,
            total_reports: standing.total_reports,
            badge: standing.badge,
            marker: RankMarker::for_rank(rank),
        }
    }
}

fn compare_seniority(a: &Standing, b: &Standing) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| match (a.user_id, b.user_id) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => Ordering::Equal,
    })
}

fn compare_standings(a: &Standing, b: &Standing) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.total_reports.cmp(&a.total_reports))
        .then_with(|| compare_seniority(a, b))
}

fn compare_contributions(a: &Standing, b: &Standing) -> Ordering {
    b.total_reports
        .cmp(&a.total_reports)
        .then_with(|| b.points.cmp(&a.points))
        .then_with(|| compare_seniority(a, b))
}

fn assign_ranks(standings: Vec<Standing>) -> Vec<LeaderboardEntry> {
    standings
        .into_iter()
        .zip(1u32..)
        .map(|(standing, rank)| LeaderboardEntry::ranked(rank, standing))
        .collect()
}

/// Order standings and assign contiguous ranks with podium markers
pub fn rank_standings(mut standings: Vec<Standing>) -> Vec<LeaderboardEntry> {
    // Stable: rows that compare equal keep their input order
    standings.sort_by(compare_standings);
    assign_ranks(standings)
}

/// Rank by number of reports submitted, points breaking ties
pub fn rank_by_contributions(mut standings: Vec<Standing>) -> Vec<LeaderboardEntry> {
    standings.sort_by(compare_contributions);
    assign_ranks(standings)
}

/// Aggregate point events over `period` and rank every contributor
pub fn rank(
    contributors: &[Contributor],
    events: &[PointEvent],
    period: LeaderboardPeriod,
    now: DateTime<Utc>,
    thresholds: &TierThresholds,
) -> Vec<LeaderboardEntry> {
    let mut totals: HashMap<u64, i64> = HashMap::with_capacity(contributors.len());
    for event in events.iter().filter(|e| period.contains(e.occurred_at, now)) {
        *totals.entry(event.user_id).or_insert(0) += event.points;
    }

    let known: std::collections::HashSet<u64> = contributors.iter().map(|c| c.user_id).collect();
    let orphaned = totals.keys().filter(|id| !known.contains(id)).count();
    if orphaned > 0 {
        debug!(
            period = %period,
            orphaned = orphaned,
            "Ignoring point events for unknown contributors"
        );
    }

    let standings = contributors
        .iter()
        .map(|c| Standing {
            user_id: Some(c.user_id),
            username: c.username.clone(),
            points: totals.get(&c.user_id).copied().unwrap_or(0).max(0) as u64,
            total_reports: c.profile.total_reports,
            created_at: c.profile.created_at,
            badge: c.profile.badge(thresholds),
        })
        .collect();

    rank_standings(standings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::tier::BadgeTier;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()
    }

    fn contributor(id: u64, name: &str, reports: u64, created: DateTime<Utc>) -> Contributor {
        let mut profile = UserProfile::new(created);
        profile.total_reports = reports;
        Contributor {
            user_id: id,
            username: name.to_string(),
            profile,
        }
    }

    fn event(user_id: u64, points: i64, occurred_at: DateTime<Utc>) -> PointEvent {
        PointEvent {
            user_id,
            points,
            occurred_at,
            source: None,
        }
    }

    #[test]
    fn test_creation_time_breaks_ties() {
        let now = at(30);
        let contributors = vec![
            contributor(3, "carol", 5, at(3)),
            contributor(2, "bob", 5, at(2)),
            contributor(1, "alice", 5, at(1)),
        ];
        let events = vec![event(1, 100, at(20)), event(2, 100, at(20)), event(3, 50, at(20))];

        let board = rank(
            &contributors,
            &events,
            LeaderboardPeriod::All,
            now,
            &TierThresholds::default(),
        );

        let order: Vec<_> = board.iter().map(|e| (e.rank, e.username.as_str())).collect();
        assert_eq!(order, vec![(1, "alice"), (2, "bob"), (3, "carol")]);
    }

    #[test]
    fn test_reports_break_point_ties() {
        let contributors = vec![
            contributor(1, "alice", 2, at(1)),
            contributor(2, "bob", 9, at(2)),
        ];
        let events = vec![event(1, 40, at(10)), event(2, 40, at(10))];
        let board = rank(
            &contributors,
            &events,
            LeaderboardPeriod::All,
            at(30),
            &TierThresholds::default(),
        );
        assert_eq!(board[0].username, "bob");
    }

    #[test]
    fn test_full_tie_still_strictly_ranked() {
        let created = at(1);
        let contributors: Vec<_> = (1..=6)
            .map(|id| contributor(id, &format!("user{}", id), 0, created))
            .collect();
        let board = rank(
            &contributors,
            &[],
            LeaderboardPeriod::Week,
            at(30),
            &TierThresholds::default(),
        );
        let ranks: Vec<u32> = board.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6]);
        let ids: Vec<u64> = board.iter().filter_map(|e| e.user_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_period_filters_events() {
        let now = at(30);
        let contributors = vec![contributor(1, "alice", 1, at(1)), contributor(2, "bob", 1, at(2))];
        let events = vec![
            // alice earned a lot, but long ago
            event(1, 500, at(1)),
            event(2, 30, at(27)),
        ];
        let thresholds = TierThresholds::default();

        let weekly = rank(&contributors, &events, LeaderboardPeriod::Week, now, &thresholds);
        assert_eq!(weekly[0].username, "bob");
        assert_eq!(weekly[0].points, 30);
        assert_eq!(weekly[1].points, 0);

        let all_time = rank(&contributors, &events, LeaderboardPeriod::All, now, &thresholds);
        assert_eq!(all_time[0].username, "alice");
        assert_eq!(all_time[0].points, 500);
    }

    #[test]
    fn test_month_window_boundary() {
        let now = at(31);
        assert!(LeaderboardPeriod::Month.contains(at(1), now));
        assert!(!LeaderboardPeriod::Week.contains(at(23), now));
        assert!(LeaderboardPeriod::Week.contains(at(24), now));
        assert!(LeaderboardPeriod::All.contains(at(1) - Duration::days(3650), now));
    }

    #[test]
    fn test_corrections_never_go_negative() {
        let contributors = vec![contributor(1, "alice", 1, at(1))];
        let events = vec![event(1, 10, at(10)), event(1, -25, at(11))];
        let board = rank(
            &contributors,
            &events,
            LeaderboardPeriod::All,
            at(30),
            &TierThresholds::default(),
        );
        assert_eq!(board[0].points, 0);
    }

    #[test]
    fn test_podium_markers() {
        let contributors: Vec<_> = (1..=5)
            .map(|id| contributor(id, &format!("user{}", id), 0, at(id as u32)))
            .collect();
        let board = rank(
            &contributors,
            &[],
            LeaderboardPeriod::All,
            at(30),
            &TierThresholds::default(),
        );
        assert_eq!(board[0].marker, Some(RankMarker::Gold));
        assert_eq!(board[1].display_rank(), "🥈");
        assert_eq!(board[2].marker, Some(RankMarker::Bronze));
        assert_eq!(board[3].marker, None);
        assert_eq!(board[4].display_rank(), "5");
    }

    #[test]
    fn test_server_rows_keep_order_on_full_tie() {
        let rows = vec![
            Standing {
                user_id: None,
                username: "first".to_string(),
                points: 10,
                total_reports: 1,
                created_at: None,
                badge: TierLabel::Known(BadgeTier::Bronze),
            },
            Standing {
                user_id: None,
                username: "second".to_string(),
                points: 10,
                total_reports: 1,
                created_at: None,
                badge: TierLabel::Unrecognized("Diamond".to_string()),
            },
        ];
        let board = rank_standings(rows);
        assert_eq!(board[0].username, "first");
        assert_eq!(board[1].badge_color(), crate::scoring::DEFAULT_BADGE_COLOR);
    }

    #[test]
    fn test_parse_period() {
        assert_eq!("Week".parse::<LeaderboardPeriod>().unwrap(), LeaderboardPeriod::Week);
        assert!("year".parse::<LeaderboardPeriod>().is_err());
    }

    #[test]
    fn test_contribution_ranking_prefers_report_count() {
        let standing = |id: u64, points: u64, reports: u64| Standing {
            user_id: Some(id),
            username: format!("user{}", id),
            points,
            total_reports: reports,
            created_at: None,
            badge: TierLabel::Known(BadgeTier::Bronze),
        };
        let board = rank_by_contributions(vec![
            standing(1, 500, 3),
            standing(2, 40, 12),
            standing(3, 90, 12),
        ]);
        let ids: Vec<_> = board.iter().map(|e| e.user_id).collect();
        assert_eq!(ids, vec![Some(3), Some(2), Some(1)]);
        assert_eq!(board[0].marker, Some(RankMarker::Gold));
    }
}
