//! Server configuration loaded from the environment

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1800;
pub const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Upper bound on any single document store call
    pub store_timeout: Duration,
    /// Sessions idle longer than this are evicted
    pub session_ttl: Duration,
    /// Snapshot file; persistence is disabled when unset
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_interval: Duration,
    /// Account hidden from leaderboards and user lists
    pub admin_email: Option<String>,
    pub static_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            snapshot_path: None,
            snapshot_interval: Duration::from_secs(DEFAULT_SNAPSHOT_INTERVAL_SECS),
            admin_email: None,
            static_dir: "static".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from environment variables. Invalid values fall back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: parse_var("PORT", DEFAULT_PORT),
            store_timeout: Duration::from_millis(parse_var(
                "STORE_TIMEOUT_MS",
                DEFAULT_STORE_TIMEOUT_MS,
            )),
            session_ttl: Duration::from_secs(parse_var(
                "SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            )),
            snapshot_path: non_empty_var("SNAPSHOT_PATH").map(PathBuf::from),
            snapshot_interval: Duration::from_secs(
                parse_var("SNAPSHOT_INTERVAL_SECS", DEFAULT_SNAPSHOT_INTERVAL_SECS).max(1),
            ),
            admin_email: non_empty_var("ADMIN_EMAIL").map(|e| e.to_lowercase()),
            static_dir: non_empty_var("STATIC_DIR").unwrap_or(defaults.static_dir),
        }
    }

    /// Whether `email` belongs to the admin account
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(email.trim()))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match non_empty_var(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {key} value {raw:?}, using default {default}");
            default
        }),
    }
}
