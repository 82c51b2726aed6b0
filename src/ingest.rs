//! Fetch workers and the ingestion coordinator.
//!
//! One worker per discovered log object, fanned out under a configurable
//! concurrency ceiling. Workers share nothing but the persistence sink;
//! per-object outcomes are summed into the run summary, so completion order
//! is irrelevant.

use anyhow::{Context, Result};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::config::InternalAgents;
use crate::object_store::ObjectStore;
use crate::parser;
use crate::store::Store;
use crate::types::RunSummary;

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub delete_source_objects: bool,
    pub exclude_internal: bool,
    pub fetch_concurrency: usize,
}

/// Discover pending log objects under `prefix` and ingest them all,
/// returning the aggregated run summary. Nothing in here is fatal to the
/// run except the initial listing: a failed fetch or insert is counted and
/// logged, and sibling workers keep going.
pub async fn run<S: ObjectStore>(
    objects: &S,
    store: &Store,
    agents: &InternalAgents,
    opts: &IngestOptions,
    prefix: &str,
) -> Result<RunSummary> {
    let keys = objects.list(prefix).await.context("list log objects")?;
    info!("found {} pending log objects under {prefix}", keys.len());

    let summary = futures::stream::iter(keys)
        .map(|key| async move { fetch_object(objects, store, agents, opts, &key).await })
        .buffer_unordered(opts.fetch_concurrency.max(1))
        .fold(RunSummary::default(), |acc, outcome| async move {
            acc.merge(outcome)
        })
        .await;

    Ok(summary)
}

/// Retrieve one log object, persist its qualifying records, and (when
/// enabled) delete the source object afterwards. Deletion is strictly a
/// best-effort follow-up: rows are persisted before the source is touched.
pub async fn fetch_object<S: ObjectStore>(
    objects: &S,
    store: &Store,
    agents: &InternalAgents,
    opts: &IngestOptions,
    key: &str,
) -> RunSummary {
    let bytes = match objects.get(key).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("fetch of {key} failed: {err:?}");
            return RunSummary::default();
        }
    };

    let content = String::from_utf8_lossy(&bytes);
    let summary = persist_lines(store, agents, opts.exclude_internal, key, &content);

    if opts.delete_source_objects {
        if let Err(err) = objects.delete(key).await {
            warn!("delete of {key} failed: {err:?}");
        }
    }

    debug!(
        "{key}: {} rows written, {} failed",
        summary.rows_written, summary.rows_failed
    );
    summary
}

/// Parse every line of one object's content and persist the records that
/// survive classification. Each insert is an independent unit of work; a
/// malformed line is silently skipped, a failed insert is counted and does
/// not block the rest of the batch.
pub fn persist_lines(
    store: &Store,
    agents: &InternalAgents,
    exclude_internal: bool,
    source: &str,
    content: &str,
) -> RunSummary {
    let mut summary = RunSummary::default();
    for line in content.lines() {
        let Some(record) = parser::parse_line(line) else {
            continue;
        };
        if exclude_internal {
            if agents.is_internal(&record) {
                continue;
            }
        } else {
            debug!("{} {} {} {}", record.time, record.remote_ip, record.key, record.user_agent);
        }
        match store.insert_record(source, &record) {
            // A fingerprint-duplicate skip still counts as written: the row
            // is present, re-ingesting an object is idempotent.
            Ok(_) => summary.rows_written += 1,
            Err(err) => {
                warn!("insert from {source} failed: {err:?}");
                summary.rows_failed += 1;
            }
        }
    }
    summary
}
