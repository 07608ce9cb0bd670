//! Entry state machine.
//!
//! Governs the terminal's Locked → Unlocked → Locked cycle and is the sole
//! writer of the door-state value. On a grant, in order: door state goes
//! `ABIERTO`, the audit append is issued, the success signal is emitted,
//! and a relock fires after the configured dwell time. The relock timer has
//! no cancellation path; if the process is torn down mid-dwell the pending
//! write may still land, an accepted at-most-once-with-late-effect.
//!
//! Attempts submitted while the door is already unlocked are ignored: the
//! relock timer is not re-armed and no second audit entry is written.
//!
//! Failure policy: a door-state write failure on unlock aborts the cycle
//! before the audit append (the door never unlocks on ambiguous store
//! state); an audit append failure is warn-logged and does not undo the
//! unlock already performed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use parking_lot::Mutex;
use serde_json::json;

use crate::audit::AuditLogger;
use crate::auth::{normalize_id, AuthEngine, Decision};
use crate::error::StoreError;
use crate::signal::{SignalSender, TerminalSignal};
use crate::store::{CredentialRecord, RecordStore, DOOR_STATE_PATH};

/// Door-state wire values.
pub const DOOR_OPEN: &str = "ABIERTO";
pub const DOOR_CLOSED: &str = "CERRADO";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Locked,
    Unlocked,
}

/// The access terminal: one unlock cycle at a time, cyclic, never terminal.
pub struct EntryTerminal {
    store: Arc<dyn RecordStore>,
    auth: AuthEngine,
    audit: AuditLogger,
    dwell: Duration,
    state: Arc<Mutex<DoorState>>,
    signals: SignalSender,
}

impl EntryTerminal {
    pub fn new(store: Arc<dyn RecordStore>, dwell: Duration, signals: SignalSender) -> Self {
        Self {
            auth: AuthEngine::new(store.clone()),
            audit: AuditLogger::new(store.clone()),
            store,
            dwell,
            state: Arc::new(Mutex::new(DoorState::Locked)),
            signals,
        }
    }

    pub fn state(&self) -> DoorState {
        *self.state.lock()
    }

    /// Drive one entry attempt from raw kiosk input through the full
    /// cycle. A store failure during authorization or unlock returns the
    /// error with the door still locked; the caller surfaces it as a
    /// generic denial.
    pub async fn submit_entry(
        &self,
        raw_name: &str,
        raw_id: &str,
        raw_pin: &str,
    ) -> Result<(), StoreError> {
        if self.state() == DoorState::Unlocked {
            tracing::debug!("entry attempt ignored while door is unlocked");
            self.emit(TerminalSignal::EntryIgnored);
            return Ok(());
        }

        let decision = self.auth.authorize_entry(raw_name, raw_id, raw_pin).await?;
        match decision {
            Decision::Denied(reason) => {
                self.emit(TerminalSignal::EntryDenied { reason });
                Ok(())
            }
            Decision::Granted(record) => {
                self.unlock_cycle(record, normalize_id(raw_id)).await
            }
        }
    }

    async fn unlock_cycle(
        &self,
        record: CredentialRecord,
        identifier: String,
    ) -> Result<(), StoreError> {
        self.store.put(DOOR_STATE_PATH, &json!(DOOR_OPEN)).await?;
        *self.state.lock() = DoorState::Unlocked;
        tracing::info!(identifier = %identifier, "door unlocked for {}", record.display_name);

        // Best-effort relative to the unlock: the door is already open.
        if let Err(e) = self.audit.record(&record, &identifier, Local::now()).await {
            tracing::warn!("audit append failed after unlock: {e}");
        }

        self.emit(TerminalSignal::EntryGranted {
            display_name: record.display_name,
        });

        let store = self.store.clone();
        let state = self.state.clone();
        let signals = self.signals.clone();
        let dwell = self.dwell;
        tokio::spawn(async move {
            tokio::time::sleep(dwell).await;
            if let Err(e) = store.put(DOOR_STATE_PATH, &json!(DOOR_CLOSED)).await {
                tracing::warn!("relock write failed: {e}");
            }
            *state.lock() = DoorState::Locked;
            let _ = signals.send(TerminalSignal::DoorRelocked);
        });

        Ok(())
    }

    /// Drive one admin escalation attempt. Returns the matched record on
    /// grant so the front-end can route to the dashboard.
    pub async fn submit_admin(
        &self,
        raw_id: &str,
        raw_pin: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        match self.auth.authorize_admin(raw_id, raw_pin).await? {
            Decision::Granted(record) => {
                tracing::info!("admin access granted to {}", record.display_name);
                self.emit(TerminalSignal::AdminGranted {
                    display_name: record.display_name.clone(),
                });
                Ok(Some(record))
            }
            Decision::Denied(_) => {
                self.emit(TerminalSignal::AdminDenied);
                Ok(None)
            }
        }
    }

    fn emit(&self, signal: TerminalSignal) {
        tracing::debug!(key = signal.message_key(), "signal emitted");
        // The receiver only disappears when the front-end is shutting down.
        let _ = self.signals.send(signal);
    }
}
