use serde::{Deserialize, Serialize};

/// One parsed access-log line. Constructed once by the parser from
/// fully-resolved inputs; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub bucket_owner: String,
    pub bucket: String,
    /// `%Y-%m-%d %H:%M:%S%.6f`, sortable as a plain string.
    pub time: String,
    pub remote_ip: String,
    /// Empty until geolocation enrichment fills it in.
    pub remote_city: String,
    pub remote_country: String,
    pub remote_lat: f64,
    pub remote_lng: f64,
    pub requester: String,
    pub request_id: String,
    pub operation: String,
    pub key: String,
    pub request_uri: String,
    pub http_status: String,
    pub error_code: String,
    pub bytes_sent: i64,
    pub object_size: i64,
    pub total_time: i64,
    pub turnaround_time: i64,
    pub referrer: String,
    pub user_agent: String,
    pub ua_browser: String,
    pub ua_browser_version: String,
    pub ua_platform: String,
    pub ua_mobile: bool,
    pub ua_bot: bool,
    pub ua_os: String,
    pub ua_engine: String,
    pub ua_engine_version: String,
    pub version_id: String,
}

/// Aggregate counters for one ingestion run. Summed across fetch workers;
/// completion order never changes the totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rows_written: usize,
    pub rows_failed: usize,
}

impl RunSummary {
    pub fn merge(mut self, other: RunSummary) -> RunSummary {
        self.rows_written += other.rows_written;
        self.rows_failed += other.rows_failed;
        self
    }
}

/// Resolved location for one client IP. An empty `city` means the provider
/// could not resolve the address and the result must not be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoLocation {
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl GeoLocation {
    pub fn is_resolved(&self) -> bool {
        !self.city.is_empty()
    }
}
