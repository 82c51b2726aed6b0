//! Geolocation enrichment.
//!
//! Resolves client IPs against an ip-api.com style provider. The provider
//! throttles bursts, so resolution is strictly sequential with a mandatory
//! minimum delay after every response regardless of outcome.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::store::Store;
use crate::types::GeoLocation;

/// Wire shape of one provider response. Every field is optional on the
/// wire; an error status arrives as `{"status":"fail", ...}` with empty
/// location fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GeoResponse {
    pub status: String,
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub query: String,
}

pub struct GeoClient {
    client: reqwest::Client,
    base_url: String,
    delay: Duration,
}

impl GeoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, delay: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            delay,
        })
    }

    /// Resolve one IP. City and country come back title-cased; an empty
    /// city means "unresolved" and the caller must not apply the result.
    pub async fn resolve(&self, ip: &str) -> Result<GeoLocation> {
        let url = format!("{}/{}", self.base_url, ip);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("geolocation request")?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("geolocation request for {ip} returned status {status}");
        }
        let body: GeoResponse = resp.json().await.context("geolocation response body")?;
        Ok(GeoLocation {
            city: title_case(&body.city),
            country: title_case(&body.country),
            lat: body.lat,
            lon: body.lon,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub resolved: usize,
    pub unresolved: usize,
    pub failed: usize,
}

/// Backfill location fields for every distinct IP lacking a country within
/// the trailing window. One request at a time; a failed or unresolved IP is
/// left alone and picked up again by a future run, since the empty-country
/// predicate still matches it.
pub async fn enrich(store: &Store, client: &GeoClient, window_days: u32) -> Result<EnrichStats> {
    let ips = store.pending_geo_ips(window_days)?;
    info!("geolocating {} distinct addresses", ips.len());

    let mut stats = EnrichStats::default();
    for ip in ips {
        match client.resolve(&ip).await {
            Ok(geo) if geo.is_resolved() => match store.apply_geolocation(&ip, &geo) {
                Ok(rows) => {
                    debug!("{ip} -> {}, {} ({} rows)", geo.city, geo.country, rows);
                    stats.resolved += 1;
                }
                Err(err) => {
                    warn!("storing location for {ip} failed: {err:?}");
                    stats.failed += 1;
                }
            },
            Ok(_) => {
                debug!("{ip} unresolved, leaving for a future run");
                stats.unresolved += 1;
            }
            Err(err) => {
                warn!("geolocation for {ip} failed: {err:?}");
                stats.failed += 1;
            }
        }
        sleep(client.delay).await;
    }
    Ok(stats)
}

/// Lowercase the input, then uppercase every letter that follows a
/// non-letter. Matches how the provider's mixed-case names are normalized
/// before they are stored.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut boundary = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if boundary {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            boundary = false;
        } else {
            out.push(ch);
            boundary = true;
        }
    }
    out
}
