//! REST endpoint paths, relative to the configured base URL

pub const LOGIN: &str = "auth/login/";
pub const REGISTER: &str = "auth/register/";
pub const ME: &str = "auth/me/";

pub const VIOLATIONS: &str = "violations/";
pub const VIOLATION_STATISTICS: &str = "violations/statistics/";
pub const LEADERBOARD: &str = "users/leaderboard/";
pub const TOP_CONTRIBUTORS: &str = "users/top_contributors/";
pub const DAILY_LEADERBOARDS: &str = "leaderboards/";
pub const DAILY_LEADERBOARD_TODAY: &str = "leaderboards/today/";
pub const PENDING_REVIEWS: &str = "reports/pending_reviews/";

pub fn verify_violation(id: u64) -> String {
    format!("violations/{}/verify_violation/", id)
}

pub fn add_points(user_id: u64) -> String {
    format!("users/{}/add_points/", user_id)
}

pub fn approve_report(id: u64) -> String {
    format!("reports/{}/approve_report/", id)
}

pub fn reject_report(id: u64) -> String {
    format!("reports/{}/reject_report/", id)
}
