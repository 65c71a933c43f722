//! Traffic Watch
//!
//! Client core for a community traffic-violation reporting service: session
//! and authorization lifecycle plus the points, badge and leaderboard model
//! that rewards contributors.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Command-line driver
//! ├── config.rs      - Configuration management
//! ├── error.rs       - Error taxonomy
//! ├── session/       - Authentication lifecycle
//! │   ├── manager.rs - Session orchestrator (login, restore, forced logout)
//! │   ├── state.rs   - States, snapshots and events
//! │   └── store.rs   - Durable credential slot
//! ├── scoring/       - Gamification engine
//! │   ├── tier.rs        - Badge tiers, thresholds & colors
//! │   ├── profile.rs     - Contributor counters & accuracy
//! │   ├── report.rs      - Report lifecycle & points policy
//! │   ├── leaderboard.rs - Period windows & ranking
//! │   └── ledger.rs      - In-memory scoring orchestrator
//! └── api/           - Reporting API boundary
//!     ├── request.rs   - Request/outcome contract & transport seam
//!     ├── http.rs      - reqwest transport
//!     ├── types.rs     - Wire types
//!     ├── endpoints.rs - REST paths
//!     └── client.rs    - Typed API facade
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod scoring;
pub mod session;

// Re-export main types for convenience
pub use config::ClientConfig;
pub use error::{ClientError, Result};

// Re-export API types
pub use api::{
    ApiRequest, ApiTransport, HttpTransport, HttpTransportConfig, RequestOutcome, TrafficApi,
    UserIdentity,
};

// Re-export session types
pub use session::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, RegistrationForm,
    RestoreOutcome, SessionEvent, SessionManager, SessionSnapshot, SessionState,
};

// Re-export scoring types
pub use scoring::{
    BadgeTier, LeaderboardEntry, LeaderboardPeriod, PointsPolicy, ScoreLedger, TierLabel,
    TierThresholds, UserProfile, ViolationReport,
};
