use std::collections::HashMap;
use std::env;
use std::time::Duration;

use tracing::info;

/// Stock route table, matching the intake folders the bucket ships with.
const DEFAULT_INPUT_PREFIXES: &str = "documents,samples";
const DEFAULT_OUTPUT_PREFIX_MAP: &str = "documents=documents-output,samples=samples-output";

/// Application configuration loaded from environment variables.
/// Resolved once at startup, never re-read per event.
#[derive(Debug, Clone)]
pub struct Config {
    /// Only accept notifications for this bucket. Unset accepts any bucket.
    pub target_bucket: Option<String>,

    /// Leading key segments that route into the dispatcher.
    pub input_prefixes: Vec<String>,
    /// Input prefix -> output prefix substitution used when deriving locations.
    pub output_prefix_map: HashMap<String, String>,
    /// Per-prefix processing profile names.
    pub route_profiles: HashMap<String, String>,
    /// Profile for routes without an entry in `route_profiles`.
    pub default_profile_name: Option<String>,

    // Automation service
    pub automation_endpoint: String,
    pub automation_api_key: String,
    pub profile_lookup_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub dispatch_max_attempts: u32,
    pub profile_cache_ttl: Duration,

    // Idempotency guard
    pub idempotency_retention: Duration,
    pub pending_lease: Duration,
    /// When set, dispatch records live in Postgres instead of process memory.
    pub database_url: Option<String>,

    // Ingress
    pub ingest_host: String,
    pub ingest_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing or malformed.
    pub fn from_env() -> Self {
        Self {
            target_bucket: non_empty(env::var("TARGET_BUCKET_NAME").ok()),
            input_prefixes: parse_list(&env_or("INPUT_PREFIXES", DEFAULT_INPUT_PREFIXES)),
            output_prefix_map: parse_map(
                "OUTPUT_PREFIX_MAP",
                &env_or("OUTPUT_PREFIX_MAP", DEFAULT_OUTPUT_PREFIX_MAP),
            ),
            route_profiles: parse_map("ROUTE_PROFILES", &env_or("ROUTE_PROFILES", "")),
            default_profile_name: non_empty(env::var("DEFAULT_PROFILE_NAME").ok()),
            automation_endpoint: required_env("AUTOMATION_ENDPOINT"),
            automation_api_key: required_env("AUTOMATION_API_KEY"),
            profile_lookup_timeout: millis_env("PROFILE_LOOKUP_TIMEOUT_MS", 5_000),
            dispatch_timeout: millis_env("DISPATCH_TIMEOUT_MS", 10_000),
            dispatch_max_attempts: number_env("DISPATCH_MAX_ATTEMPTS", 3),
            profile_cache_ttl: secs_env("PROFILE_CACHE_TTL_SECS", 600),
            idempotency_retention: hours_env("IDEMPOTENCY_RETENTION_HOURS", 24),
            pending_lease: secs_env("PENDING_LEASE_SECS", 120),
            database_url: non_empty(env::var("DATABASE_URL").ok()),
            ingest_host: env_or("INGEST_HOST", "0.0.0.0"),
            ingest_port: number_env("INGEST_PORT", 3000),
        }
    }

    /// Log a startup summary without leaking the API key.
    pub fn log_redacted(&self) {
        info!(
            target_bucket = ?self.target_bucket,
            input_prefixes = ?self.input_prefixes,
            default_profile = ?self.default_profile_name,
            automation_endpoint = %self.automation_endpoint,
            record_store = if self.database_url.is_some() { "postgres" } else { "memory" },
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn number_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number")),
        Err(_) => default,
    }
}

fn millis_env(key: &str, default_ms: u64) -> Duration {
    Duration::from_millis(number_env(key, default_ms))
}

fn secs_env(key: &str, default_secs: u64) -> Duration {
    Duration::from_secs(number_env(key, default_secs))
}

fn hours_env(key: &str, default_hours: u64) -> Duration {
    Duration::from_secs(number_env(key, default_hours) * 3600)
}

/// Parse a comma-separated list, trimming whitespace and any trailing slash.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a comma-separated `key=value` mapping. Panics on malformed entries
/// so a config typo fails at startup, not on the first matching event.
fn parse_map(var: &str, raw: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (key, value) = entry
            .split_once('=')
            .unwrap_or_else(|| panic!("{var} entry '{entry}' must be key=value"));
        map.insert(
            key.trim().trim_end_matches('/').to_string(),
            value.trim().trim_end_matches('/').to_string(),
        );
    }
    map
}
