//! Realtime Database REST backend.
//!
//! Speaks the hosted store's REST surface directly:
//! - `GET {base}/{path}.json`: point read, `null` body when absent
//! - `PUT {base}/{path}.json`: full overwrite
//! - `DELETE {base}/{path}.json`: idempotent removal
//! - `POST {base}/{path}.json`: append; response carries the generated key
//! - `?orderBy="$key"&limitToLast=N`: capped collection reads
//!
//! Legacy database secrets or ID tokens ride along as the `auth` query
//! parameter. Subscriptions poll [`snapshot`](RecordStore::snapshot) on a
//! fixed interval and publish through a `watch` channel; the poll task
//! exits once every receiver is dropped.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::store::{RecordStore, Snapshot};

/// HTTP timeout for every store request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the hosted record store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FirebaseStore {
    base_url: String,
    auth_token: Option<String>,
    poll_interval: Duration,
    http: reqwest::Client,
}

impl FirebaseStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::unavailable(e.to_string()))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            http,
        })
    }

    /// Build the REST URL for a node, appending auth and any extra query
    /// parameters.
    fn node_url(&self, path: &str, extra: &[(&str, String)]) -> String {
        let mut url = format!("{}/{}.json", self.base_url, path);
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(token) = &self.auth_token {
            params.push(("auth", token.clone()));
        }
        params.extend(extra.iter().cloned());
        for (i, (key, value)) in params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            url.push(sep);
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    async fn read_body(resp: reqwest::Response) -> Result<Value, StoreError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::unavailable(format!("{status}: {body}")));
        }
        resp.json()
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))
    }

    /// Flatten a collection response into key-ordered rows. The store
    /// answers with an object keyed by child name, `null` for an empty
    /// collection, or an array when keys happen to be small integers.
    fn rows_from(path: &str, body: Value) -> Result<Snapshot, StoreError> {
        match body {
            Value::Null => Ok(Vec::new()),
            Value::Object(map) => {
                let mut rows: Snapshot = map.into_iter().collect();
                rows.sort_by(|(a, _), (b, _)| a.cmp(b));
                Ok(rows)
            }
            Value::Array(items) => Ok(items
                .into_iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), v))
                .collect()),
            other => Err(StoreError::malformed(
                path,
                format!("expected a collection, got {other}"),
            )),
        }
    }
}

#[async_trait]
impl RecordStore for FirebaseStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let resp = self
            .http
            .get(self.node_url(path, &[]))
            .send()
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        let body = Self::read_body(resp).await?;
        Ok(match body {
            Value::Null => None,
            value => Some(value),
        })
    }

    async fn put(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        let resp = self
            .http
            .put(self.node_url(path, &[]))
            .json(value)
            .send()
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        Self::read_body(resp).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let resp = self
            .http
            .delete(self.node_url(path, &[]))
            .send()
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        Self::read_body(resp).await?;
        Ok(())
    }

    async fn push(&self, path: &str, value: &Value) -> Result<String, StoreError> {
        let resp = self
            .http
            .post(self.node_url(path, &[]))
            .json(value)
            .send()
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        let body = Self::read_body(resp).await?;
        body.get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::malformed(path, "append response missing `name`"))
    }

    async fn snapshot(
        &self,
        path: &str,
        limit_to_last: Option<usize>,
    ) -> Result<Snapshot, StoreError> {
        let extra: Vec<(&str, String)> = match limit_to_last {
            // orderBy value must be a quoted JSON string on the wire.
            Some(n) => vec![
                ("orderBy", "\"$key\"".to_string()),
                ("limitToLast", n.to_string()),
            ],
            None => Vec::new(),
        };
        let resp = self
            .http
            .get(self.node_url(path, &extra))
            .send()
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        let body = Self::read_body(resp).await?;
        Self::rows_from(path, body)
    }

    async fn subscribe(
        &self,
        path: &str,
        limit_to_last: Option<usize>,
    ) -> Result<watch::Receiver<Snapshot>, StoreError> {
        let initial = self.snapshot(path, limit_to_last).await?;
        let (tx, rx) = watch::channel(initial.clone());

        let store = self.clone();
        let path = path.to_string();
        let mut last = initial;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                match store.snapshot(&path, limit_to_last).await {
                    Ok(snapshot) => {
                        if snapshot != last {
                            last = snapshot.clone();
                            if tx.send(snapshot).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!("subscription poll for '{path}' failed: {e}");
                    }
                }
            }
        });

        Ok(rx)
    }
}
