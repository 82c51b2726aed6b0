use std::collections::HashSet;
use std::{env, fs, path::PathBuf, time::Duration};

use anyhow::Result;
use directories::ProjectDirs;
use serde::Deserialize;

use crate::types::LogRecord;

/// The five service/tooling agents the original deployment generated itself.
const DEFAULT_INTERNAL_AGENTS: [&str; 5] = [
    "aws-internal/3",
    "Boto/2.9.9 (win32)",
    "S3Console/0.4",
    "Boto/2.38.0 Python/3.4.3 Windows/8",
    "Go-http-client/1.1",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub log_prefix: String,
    pub db_path: PathBuf,
    /// Reporting runs only when a path is configured.
    pub report_path: Option<PathBuf>,
    pub add_geolocation: bool,
    pub delete_source_objects: bool,
    pub exclude_internal: bool,
    pub fetch_concurrency: usize,
    pub geo_endpoint: String,
    pub geo_window_days: u32,
    pub geo_delay_ms: u64,
    pub report_window_days: u32,
    pub http_timeout_secs: u64,
    pub internal_agents: InternalAgents,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    bucket: String,
    region: String,
    #[serde(default)]
    access_key_id: String,
    #[serde(default)]
    secret_access_key: String,
    #[serde(default = "default_log_prefix")]
    log_prefix: String,
    db_path: PathBuf,
    #[serde(default)]
    report_path: Option<PathBuf>,
    #[serde(default)]
    add_geolocation: bool,
    #[serde(default)]
    delete_source_objects: bool,
    #[serde(default)]
    exclude_internal: bool,
    #[serde(default = "default_fetch_concurrency")]
    fetch_concurrency: usize,
    #[serde(default = "default_geo_endpoint")]
    geo_endpoint: String,
    #[serde(default = "default_geo_window_days")]
    geo_window_days: u32,
    #[serde(default = "default_geo_delay_ms")]
    geo_delay_ms: u64,
    #[serde(default = "default_report_window_days")]
    report_window_days: u32,
    #[serde(default = "default_http_timeout_secs")]
    http_timeout_secs: u64,
    #[serde(default)]
    internal_agents: Option<Vec<String>>,
}

fn default_log_prefix() -> String {
    "logs/access_log".into()
}

fn default_fetch_concurrency() -> usize {
    8
}

fn default_geo_endpoint() -> String {
    "http://ip-api.com/json".into()
}

fn default_geo_window_days() -> u32 {
    20
}

fn default_geo_delay_ms() -> u64 {
    500
}

fn default_report_window_days() -> u32 {
    10
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        let internal_agents = match raw.internal_agents {
            Some(list) => InternalAgents::new(list),
            None => InternalAgents::default(),
        };
        Self {
            bucket: raw.bucket,
            region: raw.region,
            access_key_id: raw.access_key_id,
            secret_access_key: raw.secret_access_key,
            log_prefix: raw.log_prefix,
            db_path: raw.db_path,
            report_path: raw.report_path,
            add_geolocation: raw.add_geolocation,
            delete_source_objects: raw.delete_source_objects,
            exclude_internal: raw.exclude_internal,
            fetch_concurrency: raw.fetch_concurrency,
            geo_endpoint: raw.geo_endpoint,
            geo_window_days: raw.geo_window_days,
            geo_delay_ms: raw.geo_delay_ms,
            report_window_days: raw.report_window_days,
            http_timeout_secs: raw.http_timeout_secs,
            internal_agents,
        }
    }
}

impl Config {
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.or_else(|| {
            let default_path = default_config_path();
            default_path.exists().then_some(default_path)
        });
        let mut cfg = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)?;
                Config::from(toml::from_str::<RawConfig>(&raw)?)
            }
            None => Self::default_from_env()?,
        };

        if let Ok(v) = env::var("AWS_BUCKET_NAME") {
            cfg.bucket = v;
        }
        if let Ok(v) = env::var("AWS_REGION") {
            cfg.region = v;
        }
        if let Ok(v) = env::var("AWS_ACCESS_KEY_ID") {
            cfg.access_key_id = v;
        }
        if let Ok(v) = env::var("AWS_SECRET_ACCESS_KEY") {
            cfg.secret_access_key = v;
        }
        if let Ok(v) = env::var("LOG_PREFIX") {
            cfg.log_prefix = v;
        }
        if let Ok(v) = env::var("DB_PATH") {
            cfg.db_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("REPORT_PATH") {
            cfg.report_path = (!v.trim().is_empty()).then(|| PathBuf::from(v));
        }
        if let Ok(v) = env::var("GEO_ENDPOINT") {
            cfg.geo_endpoint = v;
        }
        maybe_env_bool(&mut cfg.add_geolocation, "ADD_GEOLOCATION");
        maybe_env_bool(&mut cfg.delete_source_objects, "DELETE_SOURCE_OBJECTS");
        maybe_env_bool(&mut cfg.exclude_internal, "EXCLUDE_INTERNAL");
        maybe_env_usize(&mut cfg.fetch_concurrency, "FETCH_CONCURRENCY");
        maybe_env_u32(&mut cfg.geo_window_days, "GEO_WINDOW_DAYS");
        maybe_env_u64(&mut cfg.geo_delay_ms, "GEO_DELAY_MS");
        maybe_env_u32(&mut cfg.report_window_days, "REPORT_WINDOW_DAYS");
        maybe_env_u64(&mut cfg.http_timeout_secs, "HTTP_TIMEOUT_SECS");

        validate_required(&cfg)?;
        Ok(cfg)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn geo_delay(&self) -> Duration {
        Duration::from_millis(self.geo_delay_ms)
    }
}

impl Config {
    fn default_from_env() -> Result<Self> {
        let db_path = default_state_dir().join("access_logs.db");
        Ok(Self {
            bucket: env_required("AWS_BUCKET_NAME")?,
            region: env_required("AWS_REGION")?,
            access_key_id: env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
            log_prefix: default_log_prefix(),
            db_path,
            report_path: None,
            add_geolocation: false,
            delete_source_objects: false,
            exclude_internal: false,
            fetch_concurrency: default_fetch_concurrency(),
            geo_endpoint: default_geo_endpoint(),
            geo_window_days: default_geo_window_days(),
            geo_delay_ms: default_geo_delay_ms(),
            report_window_days: default_report_window_days(),
            http_timeout_secs: default_http_timeout_secs(),
            internal_agents: InternalAgents::default(),
        })
    }
}

/// Exact-match allow-list of agent strings considered internal/synthetic
/// traffic. Injected from configuration rather than baked into the code so
/// new service agents can be excluded without a rebuild.
#[derive(Debug, Clone)]
pub struct InternalAgents(HashSet<String>);

impl Default for InternalAgents {
    fn default() -> Self {
        Self(DEFAULT_INTERNAL_AGENTS.iter().map(|s| s.to_string()).collect())
    }
}

impl InternalAgents {
    pub fn new<I, S>(agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(agents.into_iter().map(Into::into).collect())
    }

    pub fn is_internal(&self, record: &LogRecord) -> bool {
        self.0.contains(&record.user_agent)
    }

    pub fn contains(&self, user_agent: &str) -> bool {
        self.0.contains(user_agent)
    }
}

fn default_config_path() -> PathBuf {
    default_state_dir().join("config.toml")
}

fn default_state_dir() -> PathBuf {
    ProjectDirs::from("com", "buckettail", "buckettail")
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".buckettail"))
}

fn validate_required(cfg: &Config) -> Result<()> {
    if cfg.bucket.trim().is_empty() {
        anyhow::bail!("bucket is required (set via config or AWS_BUCKET_NAME)");
    }
    if cfg.region.trim().is_empty() {
        anyhow::bail!("region is required (set via config or AWS_REGION)");
    }
    if cfg.db_path.as_os_str().is_empty() {
        anyhow::bail!("db_path is required (set via config or DB_PATH)");
    }
    if cfg.fetch_concurrency == 0 {
        anyhow::bail!("fetch_concurrency must be at least 1");
    }
    Ok(())
}

fn maybe_env_bool(val: &mut bool, key: &str) {
    if let Ok(v) = env::var(key) {
        *val = v == "1" || v.eq_ignore_ascii_case("true");
    }
}

fn maybe_env_usize(val: &mut usize, key: &str) {
    if let Ok(v) = env::var(key) {
        if let Ok(n) = v.parse::<usize>() {
            *val = n;
        }
    }
}

fn maybe_env_u32(val: &mut u32, key: &str) {
    if let Ok(v) = env::var(key) {
        if let Ok(n) = v.parse::<u32>() {
            *val = n;
        }
    }
}

fn maybe_env_u64(val: &mut u64, key: &str) {
    if let Ok(v) = env::var(key) {
        if let Ok(n) = v.parse::<u64>() {
            *val = n;
        }
    }
}

fn env_required(key: &str) -> Result<String> {
    let val = env::var(key).unwrap_or_default();
    if val.trim().is_empty() {
        anyhow::bail!("{key} is required");
    }
    Ok(val)
}
