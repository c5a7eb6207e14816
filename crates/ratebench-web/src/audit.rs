//! Decoupled audit-log appends.
//!
//! Resolution hands its log entries to a dedicated writer thread over a
//! channel, so a slow audit sink never adds latency to a lookup response.
//! Entries from one request travel as a single batch and the channel is
//! FIFO, so append order stays debuggable.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use ratebench_core::LookupLogEntry;
use ratebench_store::Store;

#[derive(Clone)]
pub struct AuditWriter {
    sender: mpsc::Sender<Vec<LookupLogEntry>>,
}

impl AuditWriter {
    /// Start the writer thread against `store` and return a cloneable handle.
    pub fn spawn(store: Arc<Store>) -> Self {
        let (sender, receiver) = mpsc::channel::<Vec<LookupLogEntry>>();

        thread::Builder::new()
            .name(String::from("audit-writer"))
            .spawn(move || {
                for batch in receiver {
                    if let Err(error) = store.append_log(&batch) {
                        tracing::warn!(%error, entries = batch.len(), "audit append failed");
                    }
                }
            })
            .expect("failed to spawn audit writer thread");

        Self { sender }
    }

    /// Queue a request's audit entries. A lookup never fails because the
    /// audit sink is gone; the loss is logged instead.
    pub fn submit(&self, entries: Vec<LookupLogEntry>) {
        if entries.is_empty() {
            return;
        }
        let count = entries.len();
        if self.sender.send(entries).is_err() {
            tracing::warn!(entries = count, "audit writer stopped; dropping log entries");
        }
    }
}
