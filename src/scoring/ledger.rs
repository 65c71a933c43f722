//! Score Ledger - Scoring Orchestrator
//!
//! Keeps contributor counters, violation reports and the point-event log in
//! memory, and applies the points policy when a report is reviewed.

use crate::error::{ClientError, Result};
use crate::scoring::{
    Contributor, LeaderboardEntry, LeaderboardPeriod, PointEvent, PointsPolicy, ReviewDecision,
    TierLabel, TierThresholds, UserProfile, ViolationReport, leaderboard,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Result of a reviewer decision
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub report: ViolationReport,
    pub points_awarded: u64,
    pub profile: UserProfile,
    pub badge: TierLabel,
}

/// In-memory scoring engine
pub struct ScoreLedger {
    thresholds: TierThresholds,
    policy: PointsPolicy,

    /// Contributors by user id
    contributors: Arc<RwLock<HashMap<u64, Contributor>>>,

    /// Reports by id
    reports: Arc<RwLock<HashMap<String, ViolationReport>>>,

    /// Append-only point log (drives period aggregation)
    events: Arc<RwLock<Vec<PointEvent>>>,
}

impl ScoreLedger {
    pub fn new(thresholds: TierThresholds, policy: PointsPolicy) -> Self {
        Self {
            thresholds,
            policy,
            contributors: Arc::new(RwLock::new(HashMap::new())),
            reports: Arc::new(RwLock::new(HashMap::new())),
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a contributor; an existing registration is left untouched
    pub async fn register_contributor(
        &self,
        user_id: u64,
        username: &str,
        created_at: DateTime<Utc>,
    ) -> Contributor {
        let mut contributors = self.contributors.write().await;
        contributors
            .entry(user_id)
            .or_insert_with(|| {
                debug!(user_id = user_id, username = %username, "Registered contributor");
                Contributor {
                    user_id,
                    username: username.to_string(),
                    profile: UserProfile::new(created_at),
                }
            })
            .clone()
    }

    /// Record a new pending report and count it against the reporter
    pub async fn submit_report(&self, report: ViolationReport) -> Result<()> {
        if report.status.is_resolved() {
            return Err(ClientError::InvalidTransition(format!(
                "report {} must be submitted as pending",
                report.id
            )));
        }

        let mut reports = self.reports.write().await;
        if reports.contains_key(&report.id) {
            return Err(ClientError::Conflict(format!(
                "report {} already submitted",
                report.id
            )));
        }

        {
            let mut contributors = self.contributors.write().await;
            let contributor = contributors.get_mut(&report.reporter_id).ok_or_else(|| {
                ClientError::NotFound(format!("contributor {}", report.reporter_id))
            })?;
            contributor.profile.record_submission();
        }

        debug!(
            report_id = %report.id,
            reporter = report.reporter_id,
            evidence = report.has_evidence(),
            "Report submitted"
        );
        reports.insert(report.id.clone(), report);
        Ok(())
    }

    /// Apply a reviewer decision. Points are credited exactly once because a
    /// resolved report refuses further transitions.
    pub async fn review_report(
        &self,
        report_id: &str,
        decision: ReviewDecision,
        reviewer_id: u64,
        at: DateTime<Utc>,
    ) -> Result<ReviewOutcome> {
        let mut reports = self.reports.write().await;
        let report = reports
            .get_mut(report_id)
            .ok_or_else(|| ClientError::NotFound(format!("report {}", report_id)))?;

        let points = report.resolve(&decision, reviewer_id, &self.policy, at)?;
        let report = report.clone();

        let profile = {
            let mut contributors = self.contributors.write().await;
            let contributor = contributors.get_mut(&report.reporter_id).ok_or_else(|| {
                ClientError::NotFound(format!("contributor {}", report.reporter_id))
            })?;
            if matches!(decision, ReviewDecision::Verify) {
                contributor.profile.record_verified(points);
            }
            contributor.profile.clone()
        };

        if points > 0 {
            self.events.write().await.push(PointEvent {
                user_id: report.reporter_id,
                points: points as i64,
                occurred_at: at,
                source: Some(report.id.clone()),
            });
        }

        info!(
            report_id = %report.id,
            reporter = report.reporter_id,
            status = ?report.status,
            points = points,
            "Report reviewed"
        );

        let badge = profile.badge(&self.thresholds);
        Ok(ReviewOutcome {
            report,
            points_awarded: points,
            profile,
            badge,
        })
    }

    /// Administrative points correction
    pub async fn adjust_points(
        &self,
        user_id: u64,
        delta: i64,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<UserProfile> {
        let (profile, applied) = {
            let mut contributors = self.contributors.write().await;
            let contributor = contributors
                .get_mut(&user_id)
                .ok_or_else(|| ClientError::NotFound(format!("contributor {}", user_id)))?;
            let before = contributor.profile.points;
            contributor.profile.adjust_points(delta);
            // The event log must sum to the saturated profile total
            let applied = contributor.profile.points as i64 - before as i64;
            (contributor.profile.clone(), applied)
        };

        if delta < 0 {
            warn!(
                user_id = user_id,
                delta = delta,
                applied = applied,
                reason = %reason,
                "Points corrected downwards"
            );
        } else {
            info!(user_id = user_id, delta = delta, reason = %reason, "Points adjusted");
        }

        self.events.write().await.push(PointEvent {
            user_id,
            points: applied,
            occurred_at: at,
            source: Some(reason.to_string()),
        });

        Ok(profile)
    }

    pub async fn profile(&self, user_id: u64) -> Option<UserProfile> {
        let contributors = self.contributors.read().await;
        contributors.get(&user_id).map(|c| c.profile.clone())
    }

    pub async fn badge(&self, user_id: u64) -> Option<TierLabel> {
        self.profile(user_id)
            .await
            .map(|p| p.badge(&self.thresholds))
    }

    pub async fn report(&self, report_id: &str) -> Option<ViolationReport> {
        self.reports.read().await.get(report_id).cloned()
    }

    pub async fn pending_reports(&self) -> Vec<ViolationReport> {
        let reports = self.reports.read().await;
        let mut pending: Vec<_> = reports
            .values()
            .filter(|r| !r.status.is_resolved())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        pending
    }

    /// Rank all contributors over `period`
    pub async fn leaderboard(
        &self,
        period: LeaderboardPeriod,
        now: DateTime<Utc>,
    ) -> Vec<LeaderboardEntry> {
        let contributors: Vec<Contributor> =
            self.contributors.read().await.values().cloned().collect();
        let events = self.events.read().await;
        leaderboard::rank(&contributors, &events, period, now, &self.thresholds)
    }

    pub fn get_thresholds(&self) -> &TierThresholds {
        &self.thresholds
    }

    pub fn get_policy(&self) -> &PointsPolicy {
        &self.policy
    }

    /// Update thresholds (configuration reload)
    pub fn update_thresholds(&mut self, thresholds: TierThresholds) -> Result<()> {
        thresholds.validate()?;
        self.thresholds = thresholds;
        Ok(())
    }
}

impl Default for ScoreLedger {
    fn default() -> Self {
        Self::new(TierThresholds::default(), PointsPolicy::default())
    }
}
