//! Reporting API boundary
//!
//! Provides:
//! - The request/response contract and the `ApiTransport` seam
//! - A reqwest-backed transport with HTTPS enforcement and size limits
//! - Wire types for the REST endpoints
//! - `TrafficApi`, a typed facade that routes every call through the session

pub mod client;
pub mod endpoints;
pub mod http;
pub mod request;
pub mod types;

pub use client::TrafficApi;
pub use http::{HttpTransport, HttpTransportConfig};
pub use request::{ApiRequest, ApiTransport, Method, RequestOutcome, classify_response};
pub use types::{
    ActionStatus, AuthResponse, DailyLeaderboardEntry, LeaderboardRow, NewViolation, Page,
    PointsUpdate, SnapshotRange, TrafficReport, UserIdentity, Violation, ViolationFilter,
    ViolationStatistics,
};
