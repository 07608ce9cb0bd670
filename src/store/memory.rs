//! In-process record store for unit tests and offline demo mode.
//!
//! Backed by a flat `BTreeMap` of full paths. Push keys are zero-padded
//! sequence numbers, so key order is insertion order, the same property
//! the hosted store's push keys provide. Subscribers are notified
//! synchronously on every mutation of their collection.
//!
//! Failure injection (tests only): `set_offline` makes every operation
//! report `Unavailable`; `fail_pushes` fails only appends, which is what
//! the fire-and-forget audit path needs to exercise.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::StoreError;
use crate::store::{RecordStore, Snapshot};

#[derive(Default)]
struct Inner {
    nodes: BTreeMap<String, Value>,
    push_seq: u64,
    watchers: Vec<Watcher>,
}

struct Watcher {
    collection: String,
    limit_to_last: Option<usize>,
    tx: watch::Sender<Snapshot>,
}

/// In-memory [`RecordStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    offline: AtomicBool,
    fail_pushes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with `Unavailable` until cleared.
    #[cfg(test)]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make only `push` fail with `Unavailable` until cleared.
    #[cfg(test)]
    pub fn fail_pushes(&self, fail: bool) {
        self.fail_pushes.store(fail, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::unavailable("memory store is offline"))
        } else {
            Ok(())
        }
    }

    fn collection_snapshot(inner: &Inner, collection: &str, limit: Option<usize>) -> Snapshot {
        let prefix = format!("{collection}/");
        let rows: Vec<(String, Value)> = inner
            .nodes
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .map(|(path, value)| (path[prefix.len()..].to_string(), value.clone()))
            .collect();
        match limit {
            Some(n) if rows.len() > n => rows[rows.len() - n..].to_vec(),
            _ => rows,
        }
    }

    /// Notify every watcher whose collection contains the mutated path.
    fn notify(inner: &mut Inner, path: &str) {
        inner.watchers.retain(|w| !w.tx.is_closed());
        for watcher in &inner.watchers {
            if path == watcher.collection
                || path.starts_with(&format!("{}/", watcher.collection))
            {
                let snapshot =
                    Self::collection_snapshot(inner, &watcher.collection, watcher.limit_to_last);
                let _ = watcher.tx.send(snapshot);
            }
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.check_online()?;
        Ok(self.inner.lock().nodes.get(path).cloned())
    }

    async fn put(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        self.check_online()?;
        let mut inner = self.inner.lock();
        inner.nodes.insert(path.to_string(), value.clone());
        Self::notify(&mut inner, path);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.check_online()?;
        let mut inner = self.inner.lock();
        inner.nodes.remove(path);
        Self::notify(&mut inner, path);
        Ok(())
    }

    async fn push(&self, path: &str, value: &Value) -> Result<String, StoreError> {
        self.check_online()?;
        if self.fail_pushes.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store rejecting appends"));
        }
        let mut inner = self.inner.lock();
        inner.push_seq += 1;
        let key = format!("k{:016}", inner.push_seq);
        let full = format!("{path}/{key}");
        inner.nodes.insert(full.clone(), value.clone());
        Self::notify(&mut inner, &full);
        Ok(key)
    }

    async fn snapshot(
        &self,
        path: &str,
        limit_to_last: Option<usize>,
    ) -> Result<Snapshot, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock();
        Ok(Self::collection_snapshot(&inner, path, limit_to_last))
    }

    async fn subscribe(
        &self,
        path: &str,
        limit_to_last: Option<usize>,
    ) -> Result<watch::Receiver<Snapshot>, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.lock();
        let initial = Self::collection_snapshot(&inner, path, limit_to_last);
        let (tx, rx) = watch::channel(initial);
        inner.watchers.push(Watcher {
            collection: path.to_string(),
            limit_to_last,
            tx,
        });
        Ok(rx)
    }
}
