use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::fmt::format::FmtSpan;

use traffic_watch::{
    ClientConfig, FileCredentialStore, HttpTransport, HttpTransportConfig, LeaderboardPeriod,
    RegistrationForm, RestoreOutcome, SessionManager, TrafficApi, UserIdentity,
    api::ViolationFilter,
    config::sanitize_for_logging,
};

#[derive(Debug, Parser)]
#[command(name = "traffic-watch", version, about = "Traffic violation reporting client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and persist the session
    Login {
        username: String,
        #[arg(long, env = "TRAFFIC_WATCH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        username: String,
        email: String,
        #[arg(long, env = "TRAFFIC_WATCH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the persisted session
    Logout,
    /// Show the signed-in profile
    Whoami,
    /// Show the contributor leaderboard
    Leaderboard {
        #[arg(long, default_value = "all")]
        period: LeaderboardPeriod,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show aggregate violation counts
    Stats,
    /// List reported violations
    Violations {
        #[arg(long = "type")]
        violation_type: Option<String>,
        #[arg(long)]
        severity: Option<u8>,
        #[arg(long)]
        verified: Option<bool>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ClientConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        eprintln!("Please check TRAFFIC_WATCH_* environment variables.");
        e
    })?;

    init_secure_logging(&config)?;

    info!(
        "API: {}, HTTPS required: {}",
        config.api.base_url, config.api.require_https
    );

    let transport = HttpTransport::new(HttpTransportConfig::from(&config.api))
        .context("Failed to create API transport")?;
    let store = FileCredentialStore::new(&config.storage.session_path);
    let session = Arc::new(
        SessionManager::new(Arc::new(transport), Arc::new(store))
            .with_restore_timeout(Duration::from_secs(config.api.restore_timeout_secs)),
    );
    let api = TrafficApi::new(session.clone()).with_thresholds(config.scoring.to_thresholds());

    match cli.command {
        Command::Login { username, password } => {
            let (token, identity) = session.login(&username, &password).await?;
            if config.logging.sanitize_logs {
                info!("Session token: {}", sanitize_for_logging(&format!("token {}", token)));
            }
            println!("Signed in as {} (#{})", identity.username, identity.id);
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let form = RegistrationForm {
                username,
                email,
                password,
                password_confirmation: None,
            };
            let (_, identity) = session.register(&form).await?;
            println!("Registered and signed in as {}", identity.username);
        }
        Command::Logout => {
            session.logout().await;
            println!("Signed out");
        }
        Command::Whoami => {
            let identity = require_session(&session).await?;
            let badge = identity.profile.badge(&config.scoring.to_thresholds());
            println!("{} <{}>", identity.username, identity.email);
            println!(
                "  points: {}  badge: {} ({})",
                identity.profile.points,
                badge.as_str(),
                badge.color()
            );
            println!(
                "  reports: {} total, {} verified, {:.1}% accuracy",
                identity.profile.total_reports,
                identity.profile.verified_reports,
                identity.profile.accuracy_rate()
            );
        }
        Command::Leaderboard { period, limit } => {
            restore_quietly(&session).await;
            let limit = limit.unwrap_or(config.scoring.leaderboard_limit);
            let entries = api.leaderboard(period, Some(limit)).await?;
            println!("Leaderboard ({})", period);
            for entry in entries {
                println!(
                    "{:>4}  {:<20} {:>6} pts  {:>4} reports  {}",
                    entry.display_rank(),
                    entry.username,
                    entry.points,
                    entry.total_reports,
                    entry.badge.as_str()
                );
            }
        }
        Command::Stats => {
            restore_quietly(&session).await;
            let stats = api.statistics().await?;
            println!(
                "{} violations ({} verified, {} pending)",
                stats.total, stats.verified, stats.pending
            );
            for row in &stats.by_type {
                println!("  {:<14} {}", row.violation_type, row.count);
            }
            for row in &stats.by_severity {
                println!("  severity {}     {}", row.severity, row.count);
            }
        }
        Command::Violations {
            violation_type,
            severity,
            verified,
            search,
            page,
        } => {
            restore_quietly(&session).await;
            let filter = ViolationFilter {
                violation_type,
                severity,
                is_verified: verified,
                search,
                page,
                page_size: None,
            };
            let listing = api.list_violations(&filter).await?;
            println!("{} violations", listing.count);
            for violation in &listing.results {
                println!(
                    "#{:<6} {:<14} sev {} {:<12} {}{}",
                    violation.id,
                    violation.violation_type,
                    violation.severity,
                    violation.vehicle_number,
                    violation.location,
                    if violation.is_verified { " [verified]" } else { "" }
                );
            }
            if listing.has_more() {
                println!("(more results available)");
            }
        }
    }

    Ok(())
}

/// Restore the persisted session or fail with a hint to log in
async fn require_session(session: &SessionManager) -> Result<UserIdentity> {
    match session.restore_session().await? {
        RestoreOutcome::Restored(identity) => Ok(identity),
        RestoreOutcome::Anonymous => Err(anyhow::anyhow!(
            "Not signed in. Run `traffic-watch login <username>` first."
        )),
    }
}

/// Restore the persisted session if possible; public endpoints work without one
async fn restore_quietly(session: &SessionManager) {
    if let Err(e) = session.restore_session().await {
        warn!("Continuing without a session: {}", e);
    }
}

/// Initialize secure logging with sanitization
fn init_secure_logging(config: &ClientConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::WARN,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    if !config.logging.sanitize_logs {
        warn!("Log sanitization disabled - sensitive data may be logged");
    }

    Ok(())
}
