//! Typed client for the reporting API
//!
//! Every call goes through the session manager so it carries the current
//! credential and feeds authorization failures back into the session.

use std::sync::Arc;
use tracing::{debug, info};

use super::endpoints;
use super::request::ApiRequest;
use super::types::{
    ActionStatus, AddPointsRequest, ApproveReportRequest, DailyLeaderboardEntry, LeaderboardRow,
    ListPayload, NewViolation, Page, PointsUpdate, RejectReportRequest, SnapshotRange,
    TrafficReport, UserIdentity, Violation, ViolationFilter, ViolationStatistics,
};
use crate::error::{ClientError, Result};
use crate::scoring::{
    LeaderboardEntry, LeaderboardPeriod, TierThresholds, rank_by_contributions, rank_standings,
};
use crate::session::SessionManager;

pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct TrafficApi {
    session: Arc<SessionManager>,
    thresholds: TierThresholds,
}

impl TrafficApi {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self {
            session,
            thresholds: TierThresholds::default(),
        }
    }

    /// Thresholds used to derive tiers the server does not label
    pub fn with_thresholds(mut self, thresholds: TierThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// The signed-in user's profile
    pub async fn me(&self) -> Result<UserIdentity> {
        self.session.refresh_identity().await
    }

    pub async fn list_violations(&self, filter: &ViolationFilter) -> Result<Page<Violation>> {
        let request = ApiRequest::get(endpoints::VIOLATIONS)
            .query_opt("violation_type", filter.violation_type.as_ref())
            .query_opt("severity", filter.severity)
            .query_opt("is_verified", filter.is_verified)
            .query_opt("search", filter.search.as_ref())
            .query_opt("page", filter.page)
            .query_opt("page_size", filter.page_size);

        let payload: ListPayload<Violation> = self.session.execute(request).await?;
        let page = payload.into_page();
        debug!(count = page.count, returned = page.results.len(), "Listed violations");
        Ok(page)
    }

    pub async fn create_violation(&self, violation: &NewViolation) -> Result<Violation> {
        violation.validate()?;

        let request = ApiRequest::post(endpoints::VIOLATIONS).json(violation)?;
        let created: Violation = self.session.execute(request).await?;

        info!(
            violation_id = created.id,
            violation_type = %created.violation_type,
            "Violation reported"
        );
        Ok(created)
    }

    pub async fn verify_violation(&self, id: u64) -> Result<Violation> {
        let request = ApiRequest::post(endpoints::verify_violation(id));
        let verified: Violation = self.session.execute(request).await?;
        info!(violation_id = id, "Violation verified");
        Ok(verified)
    }

    pub async fn statistics(&self) -> Result<ViolationStatistics> {
        self.session
            .execute(ApiRequest::get(endpoints::VIOLATION_STATISTICS))
            .await
    }

    /// Server standings for the period, ranked locally
    pub async fn leaderboard(
        &self,
        period: LeaderboardPeriod,
        limit: Option<u32>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
        let request = ApiRequest::get(endpoints::LEADERBOARD)
            .query("period", period)
            .query("limit", limit);

        let payload: ListPayload<LeaderboardRow> = self.session.execute(request).await?;
        let standings = payload
            .into_page()
            .results
            .into_iter()
            .map(|row| row.into_standing(&self.thresholds))
            .collect();

        let mut entries = rank_standings(standings);
        entries.truncate(limit as usize);
        debug!(period = %period, entries = entries.len(), "Leaderboard loaded");
        Ok(entries)
    }

    /// Most active reporters, ranked by reports submitted
    pub async fn top_contributors(&self) -> Result<Vec<LeaderboardEntry>> {
        let payload: ListPayload<LeaderboardRow> = self
            .session
            .execute(ApiRequest::get(endpoints::TOP_CONTRIBUTORS))
            .await?;
        let standings = payload
            .into_page()
            .results
            .into_iter()
            .map(|row| row.into_standing(&self.thresholds))
            .collect();
        Ok(rank_by_contributions(standings))
    }

    /// Daily leaderboard snapshots. Ranks are the ones the server assigned
    /// when the snapshot was taken.
    pub async fn daily_leaderboard(&self, range: SnapshotRange) -> Result<Vec<DailyLeaderboardEntry>> {
        let path = match range {
            SnapshotRange::Today => endpoints::DAILY_LEADERBOARD_TODAY,
            SnapshotRange::All => endpoints::DAILY_LEADERBOARDS,
        };
        let payload: ListPayload<LeaderboardRow> =
            self.session.execute(ApiRequest::get(path)).await?;

        let entries: Vec<_> = payload
            .into_page()
            .results
            .into_iter()
            .zip(1u32..)
            .map(|(row, position)| {
                let rank = row.rank.unwrap_or(position);
                let date = row.date;
                let verified_reports = row.profile.verified_reports;
                DailyLeaderboardEntry {
                    date,
                    verified_reports,
                    entry: LeaderboardEntry::ranked(rank, row.into_standing(&self.thresholds)),
                }
            })
            .collect();

        debug!(range = ?range, entries = entries.len(), "Daily leaderboard loaded");
        Ok(entries)
    }

    /// Administrative points correction; `delta` may be negative
    pub async fn add_points(&self, user_id: u64, delta: i64) -> Result<PointsUpdate> {
        if delta == 0 {
            return Err(ClientError::Validation("points delta must be non-zero".to_string()));
        }

        let request =
            ApiRequest::post(endpoints::add_points(user_id)).json(&AddPointsRequest { points: delta })?;
        let update: PointsUpdate = self.session.execute(request).await?;

        info!(user_id = user_id, delta = delta, points = update.points, "Points adjusted");
        Ok(update)
    }

    pub async fn pending_reports(&self) -> Result<Vec<TrafficReport>> {
        let payload: ListPayload<TrafficReport> = self
            .session
            .execute(ApiRequest::get(endpoints::PENDING_REVIEWS))
            .await?;
        Ok(payload.into_page().results)
    }

    pub async fn approve_report(&self, id: u64, reward: u64) -> Result<ActionStatus> {
        let request =
            ApiRequest::post(endpoints::approve_report(id)).json(&ApproveReportRequest { reward })?;
        let status: ActionStatus = self.session.execute(request).await?;
        info!(report_id = id, reward = reward, "Report approved");
        Ok(status)
    }

    pub async fn reject_report(&self, id: u64, reason: &str) -> Result<ActionStatus> {
        if reason.trim().is_empty() {
            return Err(ClientError::Validation("a rejection reason is required".to_string()));
        }

        let request =
            ApiRequest::post(endpoints::reject_report(id)).json(&RejectReportRequest { reason })?;
        let status: ActionStatus = self.session.execute(request).await?;
        info!(report_id = id, "Report rejected");
        Ok(status)
    }
}
