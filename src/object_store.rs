//! Object storage capability: listing, fetching and deleting raw log
//! objects. Consumed through a trait so the ingestion pipeline can run
//! against an in-memory store in tests.

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client;

use crate::config::Config;

#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Keys of all pending log objects under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
    /// Full raw content of one log object.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    /// Remove a consumed log object from the source store.
    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from the configured region and credentials. Falls back
    /// to the default provider chain when no static keys are configured.
    pub async fn connect(cfg: &Config) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()));
        if !cfg.access_key_id.is_empty() {
            let creds = Credentials::new(
                cfg.access_key_id.clone(),
                cfg.secret_access_key.clone(),
                None,
                None,
                "buckettail-config",
            );
            loader = loader.credentials_provider(creds);
        }
        let sdk_cfg = loader.load().await;
        Ok(Self {
            client: Client::new(&sdk_cfg),
            bucket: cfg.bucket.clone(),
        })
    }
}

impl ObjectStore for S3ObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .max_keys(1000);
            if let Some(token) = &continuation {
                req = req.continuation_token(token);
            }
            let resp = req.send().await.context("list_objects_v2")?;
            if let Some(objects) = resp.contents {
                keys.extend(objects.into_iter().filter_map(|o| o.key));
            }
            continuation = resp.next_continuation_token;
            if continuation.is_none() {
                break;
            }
        }
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("get_object")?;
        let body = resp.body.collect().await.context("read object body")?;
        Ok(body.into_bytes().to_vec())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("delete_object")?;
        Ok(())
    }
}
