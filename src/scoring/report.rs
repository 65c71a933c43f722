//! Violation Report Lifecycle and Points Policy
//!
//! A report is created `Pending` and resolved exactly once by a reviewer.
//! Points are awarded only on verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ClientError, Result};

/// Review status of a violation report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportStatus {
    #[serde(alias = "PENDING", alias = "pending", alias = "SUBMITTED", alias = "UNDER_REVIEW")]
    Pending,
    #[serde(alias = "VERIFIED", alias = "verified", alias = "APPROVED")]
    Verified,
    #[serde(alias = "REJECTED", alias = "rejected")]
    Rejected,
}

impl ReportStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, ReportStatus::Pending)
    }
}

/// Reviewer decision on a pending report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ReviewDecision {
    Verify,
    Reject { reason: String },
}

/// A citizen's violation report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationReport {
    pub id: String,
    pub reporter_id: u64,
    pub violation_type: String,
    pub description: String,
    pub location: String,
    /// Opaque reference to an uploaded photo
    pub evidence_photo: Option<String>,
    pub status: ReportStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<u64>,
    pub review_comments: Option<String>,
    pub points_awarded: u64,
}

impl ViolationReport {
    pub fn new(
        id: impl Into<String>,
        reporter_id: u64,
        violation_type: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
        evidence_photo: Option<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            reporter_id,
            violation_type: violation_type.into(),
            description: description.into(),
            location: location.into(),
            evidence_photo: evidence_photo.filter(|p| !p.trim().is_empty()),
            status: ReportStatus::Pending,
            submitted_at,
            reviewed_at: None,
            reviewed_by: None,
            review_comments: None,
            points_awarded: 0,
        }
    }

    /// Fresh report identifier in the backend's `RPT-XXXXXXXXXXXX` shape
    pub fn generate_id() -> String {
        let hex = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("RPT-{}", &hex[..12])
    }

    pub fn has_evidence(&self) -> bool {
        self.evidence_photo.is_some()
    }

    /// Resolve the report. Fails if it was already resolved.
    pub fn resolve(
        &mut self,
        decision: &ReviewDecision,
        reviewer_id: u64,
        policy: &PointsPolicy,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        if self.status.is_resolved() {
            return Err(ClientError::InvalidTransition(format!(
                "report {} is already {:?}",
                self.id, self.status
            )));
        }

        let points = match decision {
            ReviewDecision::Verify => {
                self.status = ReportStatus::Verified;
                policy.award(self.has_evidence())
            }
            ReviewDecision::Reject { reason } => {
                self.status = ReportStatus::Rejected;
                self.review_comments = Some(reason.clone()).filter(|r| !r.is_empty());
                0
            }
        };

        self.reviewed_at = Some(at);
        self.reviewed_by = Some(reviewer_id);
        self.points_awarded = points;
        Ok(points)
    }
}

/// Points awarded when a report is verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsPolicy {
    /// Base award for any verified report
    pub verified_points: u64,
    /// Added when the report carried an evidence photo
    pub evidence_bonus: u64,
}

impl Default for PointsPolicy {
    fn default() -> Self {
        Self {
            verified_points: 10,
            evidence_bonus: 5,
        }
    }
}

impl PointsPolicy {
    pub fn award(&self, has_evidence: bool) -> u64 {
        if has_evidence {
            self.verified_points + self.evidence_bonus
        } else {
            self.verified_points
        }
    }
}
