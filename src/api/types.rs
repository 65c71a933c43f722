//! Wire types for the reporting API

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};
use crate::scoring::{LeaderboardEntry, ReportStatus, Standing, TierThresholds, UserProfile};

/// The authenticated user's profile snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Token and identity returned by login and registration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(alias = "access", alias = "access_token")]
    pub token: String,
    #[serde(default)]
    pub refresh: Option<String>,
    pub user: UserIdentity,
}

/// A paginated list as produced by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// Either a paginated envelope or a bare array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Paged(Page<T>),
    Plain(Vec<T>),
}

impl<T> ListPayload<T> {
    pub fn into_page(self) -> Page<T> {
        match self {
            ListPayload::Paged(page) => page,
            ListPayload::Plain(results) => Page {
                count: results.len() as u64,
                next: None,
                previous: None,
                results,
            },
        }
    }
}

/// A traffic violation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub id: u64,
    #[serde(default)]
    pub violation_id: Option<String>,
    #[serde(default)]
    pub violator_name: Option<String>,
    pub vehicle_number: String,
    pub violation_type: String,
    #[serde(default = "default_severity")]
    pub severity: u8,
    pub location: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub violation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reported_by_username: Option<String>,
    #[serde(default)]
    pub reported_at: Option<DateTime<Utc>>,
    /// Opaque evidence reference
    #[serde(default, alias = "evidence_photo")]
    pub evidence_image: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
}

fn default_severity() -> u8 {
    1
}

/// Fields for submitting a new violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewViolation {
    pub vehicle_number: String,
    pub violation_type: String,
    pub severity: u8,
    pub location: String,
    pub description: String,
    pub violation_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violator_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Reference to an already-uploaded photo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_image: Option<String>,
}

pub const VIOLATION_TYPES: [&str; 7] = [
    "SPEEDING",
    "SIGNAL_JUMP",
    "PARKING",
    "LANE_CHANGE",
    "NO_HELMET",
    "RASH_DRIVING",
    "OTHER",
];

impl NewViolation {
    pub fn validate(&self) -> Result<()> {
        if self.vehicle_number.trim().is_empty() {
            return Err(ClientError::Validation("vehicle number is required".to_string()));
        }
        if self.location.trim().is_empty() {
            return Err(ClientError::Validation("location is required".to_string()));
        }
        if !VIOLATION_TYPES.contains(&self.violation_type.as_str()) {
            return Err(ClientError::Validation(format!(
                "unknown violation type '{}'",
                self.violation_type
            )));
        }
        if !(1..=4).contains(&self.severity) {
            return Err(ClientError::Validation(format!(
                "severity must be between 1 and 4, got {}",
                self.severity
            )));
        }
        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude)
            && (!(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon))
        {
            return Err(ClientError::Validation(format!(
                "coordinates out of range: {}, {}",
                lat, lon
            )));
        }
        Ok(())
    }
}

/// Filters for listing violations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViolationFilter {
    pub violation_type: Option<String>,
    pub severity: Option<u8>,
    pub is_verified: Option<bool>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCount {
    pub violation_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityCount {
    pub severity: u8,
    pub count: u64,
}

/// Aggregate violation counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationStatistics {
    pub total: u64,
    pub verified: u64,
    pub pending: u64,
    #[serde(default)]
    pub by_type: Vec<TypeCount>,
    #[serde(default)]
    pub by_severity: Vec<SeverityCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
    pub username: String,
}

/// One leaderboard row as sent by the server
///
/// Covers profile rows (`users/leaderboard/`, `users/top_contributors/`) and
/// daily snapshot rows (`leaderboards/`), which carry their own `rank` and `date`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeaderboardRow {
    /// Row id: profile id or snapshot id
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub username: Option<String>,
    /// Nested user object (profile-style rows)
    #[serde(default)]
    pub user: Option<UserRef>,
    /// Rank assigned by the server for a snapshot
    #[serde(default)]
    pub rank: Option<u32>,
    /// Snapshot day
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub profile: UserProfile,
}

impl LeaderboardRow {
    pub fn username(&self) -> &str {
        self.username
            .as_deref()
            .or(self.user.as_ref().map(|u| u.username.as_str()))
            .unwrap_or("")
    }

    /// The user this row belongs to. Bare `id` is only trusted when nothing
    /// more specific is present.
    pub fn owner_id(&self) -> Option<u64> {
        self.user
            .as_ref()
            .map(|u| u.id)
            .or(self.user_id)
            .or(self.id)
    }

    pub fn into_standing(self, thresholds: &TierThresholds) -> Standing {
        let badge = self.profile.badge(thresholds);
        Standing {
            user_id: self.owner_id(),
            username: self.username().to_string(),
            points: self.profile.points,
            total_reports: self.profile.total_reports,
            created_at: self.profile.created_at,
            badge,
        }
    }
}

/// A row of a daily leaderboard snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyLeaderboardEntry {
    pub date: Option<NaiveDate>,
    pub verified_reports: u64,
    pub entry: LeaderboardEntry,
}

/// Which daily snapshots to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotRange {
    #[default]
    Today,
    All,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddPointsRequest {
    pub points: i64,
}

/// Profile counters after a points change
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointsUpdate {
    pub points: u64,
    #[serde(default)]
    pub badge_level: Option<u8>,
    #[serde(default, alias = "badge_name", alias = "badgeTier")]
    pub badge_tier: Option<String>,
}

/// A peer report awaiting or past review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficReport {
    pub id: u64,
    #[serde(default)]
    pub report_id: Option<String>,
    #[serde(default)]
    pub reporter: Option<u64>,
    #[serde(default)]
    pub reporter_username: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub evidence_urls: Vec<String>,
    pub status: ReportStatus,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_comments: String,
    #[serde(default)]
    pub reward_points: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApproveReportRequest {
    pub reward: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectReportRequest<'a> {
    pub reason: &'a str,
}

/// Acknowledgement returned by action endpoints
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionStatus {
    pub status: String,
    #[serde(default)]
    pub reward_points: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{BadgeTier, TierLabel};
    use serde_json::json;

    #[test]
    fn test_auth_response_accepts_access_alias() {
        let body = json!({
            "access": "tok",
            "refresh": "ref",
            "user": {"id": 3, "username": "dana", "email": "dana@example.org", "points": 75}
        });
        let auth: AuthResponse = serde_json::from_value(body).unwrap();
        assert_eq!(auth.token, "tok");
        assert_eq!(auth.user.profile.points, 75);
    }

    #[test]
    fn test_list_payload_shapes() {
        let paged: ListPayload<u32> =
            serde_json::from_value(json!({"count": 2, "next": null, "previous": null, "results": [1, 2]}))
                .unwrap();
        assert_eq!(paged.into_page().results, vec![1, 2]);

        let plain: ListPayload<u32> = serde_json::from_value(json!([5, 6, 7])).unwrap();
        let page = plain.into_page();
        assert_eq!(page.count, 3);
        assert!(!page.has_more());
    }

    #[test]
    fn test_leaderboard_row_shapes() {
        let thresholds = TierThresholds::default();

        let flat: LeaderboardRow = serde_json::from_value(json!({
            "username": "erin", "points": 160, "totalReports": 12, "badgeTier": "Gold"
        }))
        .unwrap();
        let standing = flat.into_standing(&thresholds);
        assert_eq!(standing.username, "erin");
        assert_eq!(standing.total_reports, 12);
        assert_eq!(standing.badge, TierLabel::Known(BadgeTier::Gold));

        let nested: LeaderboardRow = serde_json::from_value(json!({
            "id": 40,
            "user": {"id": 9, "username": "frank"},
            "points": 20,
            "reports_count": 3,
            "badge_level": 1,
            "created_at": "2024-01-02T03:04:05Z"
        }))
        .unwrap();
        let standing = nested.into_standing(&thresholds);
        assert_eq!(standing.user_id, Some(9));
        assert_eq!(standing.username, "frank");
        assert!(standing.created_at.is_some());
    }

    #[test]
    fn test_snapshot_row_carries_both_ids() {
        let row: LeaderboardRow = serde_json::from_value(json!({
            "id": 501,
            "user_id": 12,
            "username": "hana",
            "rank": 2,
            "points": 180,
            "reports_submitted": 14,
            "verified_reports": 11,
            "badge_level": 3,
            "badge_name": "Gold",
            "date": "2024-06-01"
        }))
        .unwrap();

        assert_eq!(row.id, Some(501));
        assert_eq!(row.owner_id(), Some(12));
        assert_eq!(row.rank, Some(2));
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(row.profile.total_reports, 14);
        assert_eq!(row.profile.verified_reports, 11);

        let standing = row.into_standing(&TierThresholds::default());
        assert_eq!(standing.user_id, Some(12));
        assert_eq!(standing.badge, TierLabel::Known(BadgeTier::Gold));
    }

    #[test]
    fn test_new_violation_validation() {
        let mut violation = NewViolation {
            vehicle_number: "KA-01-AB-1234".to_string(),
            violation_type: "SPEEDING".to_string(),
            severity: 2,
            location: "Ring Road".to_string(),
            description: String::new(),
            violation_time: Utc::now(),
            violator_name: None,
            latitude: Some(12.97),
            longitude: Some(77.59),
            evidence_image: None,
        };
        assert!(violation.validate().is_ok());

        violation.severity = 5;
        assert!(violation.validate().is_err());

        violation.severity = 2;
        violation.violation_type = "JAYWALKING".to_string();
        assert!(violation.validate().is_err());
    }
}
