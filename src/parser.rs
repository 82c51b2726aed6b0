//! The S3 server-access-log line grammar.
//!
//! One line carries 18 positional fields; the request URI, referrer and
//! user-agent are quoted free text that may contain spaces and are extracted
//! as whole quoted units. Parsing is pure: no state, no I/O.

use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::agent;
use crate::types::LogRecord;

/// Formatted form of the zero instant, used when the timestamp field does
/// not parse. Sorts below every real timestamp.
pub const ZERO_TIME: &str = "0001-01-01 00:00:00.000000";

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(\S+) (\S+) \[(.*?)\] (\S+) (\S+) (\S+) (\S+) (\S+) "([^"]+)" (\S+) (\S+) (\S+) (\S+) (\S+) (\S+) "([^"]+)" "([^"]+)" (\S+)"#,
    )
    .unwrap()
});

/// Parse one raw log line. Returns `None` when the line does not match the
/// grammar; a malformed numeric subfield never fails the line, it becomes
/// zero instead.
pub fn parse_line(line: &str) -> Option<LogRecord> {
    let caps = LINE_RE.captures(line)?;
    let user_agent = caps[17].to_string();
    let ua = agent::classify(&user_agent);

    Some(LogRecord {
        bucket_owner: caps[1].to_string(),
        bucket: caps[2].to_string(),
        time: format_timestamp(&caps[3]),
        remote_ip: caps[4].to_string(),
        remote_city: String::new(),
        remote_country: String::new(),
        remote_lat: 0.0,
        remote_lng: 0.0,
        requester: caps[5].to_string(),
        request_id: caps[6].to_string(),
        operation: caps[7].to_string(),
        key: caps[8].to_string(),
        request_uri: caps[9].to_string(),
        http_status: caps[10].to_string(),
        error_code: caps[11].to_string(),
        bytes_sent: parse_count(&caps[12]),
        object_size: parse_count(&caps[13]),
        total_time: parse_count(&caps[14]),
        turnaround_time: parse_count(&caps[15]),
        referrer: caps[16].to_string(),
        user_agent,
        ua_browser: ua.browser,
        ua_browser_version: ua.browser_version,
        ua_platform: ua.platform,
        ua_mobile: ua.mobile,
        ua_bot: ua.bot,
        ua_os: ua.os,
        ua_engine: ua.engine,
        ua_engine_version: ua.engine_version,
        version_id: caps[18].to_string(),
    })
}

/// `02/Jan/2006:15:04:05 -0700` -> `2006-01-02 15:04:05.000000`.
/// Lossless to the microsecond and monotonically sortable as a string.
fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_str(raw, "%d/%b/%Y:%H:%M:%S %z")
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string())
        .unwrap_or_else(|_| ZERO_TIME.to_string())
}

// Unmetered fields are logged as "-"; anything non-numeric counts as zero.
fn parse_count(raw: &str) -> i64 {
    raw.parse().unwrap_or(0)
}
