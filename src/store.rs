//! SQLite persistence behind an r2d2 connection pool.
//!
//! Concurrent fetch workers each insert on their own pooled connection in
//! auto-commit mode; there is no batch-level transaction, so one failed row
//! never blocks the rest of its object.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::types::{GeoLocation, LogRecord};

const SCHEMA: &str = include_str!("schema.sql");

const INSERT_SQL: &str = "\
    INSERT OR IGNORE INTO access_logs (
        bucket_owner, bucket, time, remote_ip, remote_city, remote_country,
        remote_lat, remote_lng, requester, request_id, operation, key,
        request_uri, http_status, error_code, bytes_sent, object_size,
        total_time, turnaround_time, referrer, user_agent, ua_browser,
        ua_browser_version, ua_platform, ua_mobile, ua_bot, ua_os, ua_engine,
        ua_engine_version, version_id, fingerprint
    ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23,?24,?25,?26,?27,?28,?29,?30,?31)";

/// One row of the traffic report, already projected down to the displayed
/// columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub date: String,
    pub time: String,
    pub remote_ip: String,
    pub remote_city: String,
    pub remote_country: String,
    pub key: String,
    pub user_agent: String,
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
}

impl Store {
    /// Open (creating if needed) the store at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))
        });
        let pool = Pool::new(manager).context("open sqlite pool")?;
        let conn = pool.get()?;
        conn.execute_batch(SCHEMA).context("apply schema")?;
        Ok(Self { pool })
    }

    /// Insert one record as an independent unit of work. `source` is the log
    /// object the record came from; together with the request id it forms
    /// the dedup fingerprint. Returns `false` when an identical fingerprint
    /// already exists and the row was skipped.
    pub fn insert_record(&self, source: &str, record: &LogRecord) -> Result<bool> {
        let conn = self.pool.get()?;
        let fingerprint = format!("{source}:{}", record.request_id);
        let changed = conn
            .execute(
                INSERT_SQL,
                params![
                    record.bucket_owner,
                    record.bucket,
                    record.time,
                    record.remote_ip,
                    record.remote_city,
                    record.remote_country,
                    record.remote_lat,
                    record.remote_lng,
                    record.requester,
                    record.request_id,
                    record.operation,
                    record.key,
                    record.request_uri,
                    record.http_status,
                    record.error_code,
                    record.bytes_sent,
                    record.object_size,
                    record.total_time,
                    record.turnaround_time,
                    record.referrer,
                    record.user_agent,
                    record.ua_browser,
                    record.ua_browser_version,
                    record.ua_platform,
                    record.ua_mobile,
                    record.ua_bot,
                    record.ua_os,
                    record.ua_engine,
                    record.ua_engine_version,
                    record.version_id,
                    fingerprint,
                ],
            )
            .context("insert access log record")?;
        Ok(changed > 0)
    }

    /// Distinct client IPs still lacking a country, first seen within the
    /// trailing window. Bounds enrichment so historic data is never rescanned
    /// forever.
    pub fn pending_geo_ips(&self, window_days: u32) -> Result<Vec<String>> {
        let cutoff = window_cutoff(window_days);
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT remote_ip FROM access_logs
             WHERE remote_country = '' AND time >= ?1",
        )?;
        let ips = stmt
            .query_map([cutoff], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ips)
    }

    /// Apply a resolved location to every row sharing `ip`. Re-applying the
    /// same result is idempotent. Returns the number of rows touched.
    pub fn apply_geolocation(&self, ip: &str, geo: &GeoLocation) -> Result<usize> {
        let conn = self.pool.get()?;
        let changed = conn
            .execute(
                "UPDATE access_logs
                 SET remote_city = ?1, remote_country = ?2, remote_lat = ?3, remote_lng = ?4
                 WHERE remote_ip = ?5",
                params![geo.city, geo.country, geo.lat, geo.lon, ip],
            )
            .context("apply geolocation")?;
        Ok(changed)
    }

    /// Successful, non-bot traffic from the trailing window, most recent
    /// first, projected to the report columns.
    pub fn recent_visits(&self, window_days: u32) -> Result<Vec<ReportRow>> {
        let cutoff = window_cutoff(window_days);
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare_cached(
            "SELECT substr(time, 6, 5) AS date, substr(time, 12, 8) AS tod,
                    remote_ip, remote_city, remote_country, key, user_agent
             FROM access_logs
             WHERE ua_bot = 0 AND ua_browser <> 'Bot'
               AND http_status = '200' AND time >= ?1
             ORDER BY date DESC, tod DESC",
        )?;
        let rows = stmt
            .query_map([cutoff], |row| {
                Ok(ReportRow {
                    date: row.get(0)?,
                    time: row.get(1)?,
                    remote_ip: row.get(2)?,
                    remote_city: row.get(3)?,
                    remote_country: row.get(4)?,
                    key: row.get(5)?,
                    user_agent: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn record_count(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT count(*) FROM access_logs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// City/country currently stored for `ip`, if any row carries it.
    pub fn location_for(&self, ip: &str) -> Result<Option<(String, String)>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare_cached(
            "SELECT remote_city, remote_country FROM access_logs WHERE remote_ip = ?1 LIMIT 1",
        )?;
        let mut rows = stmt.query([ip])?;
        match rows.next()? {
            Some(row) => Ok(Some((row.get(0)?, row.get(1)?))),
            None => Ok(None),
        }
    }
}

// Midnight at the start of the cutoff day, formatted like record timestamps.
fn window_cutoff(window_days: u32) -> String {
    let cutoff = Utc::now() - chrono::Duration::days(window_days as i64);
    cutoff.format("%Y-%m-%d 00:00:00.000000").to_string()
}
