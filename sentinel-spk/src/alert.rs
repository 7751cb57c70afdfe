//! Alert formatting and deduplication
//!
//! The detection loop calls [`AlertDeduplicator::evaluate`] once per frame.
//! A message is queued only when it differs from the last one queued, so a
//! worker standing in front of the camera hears a warning once rather than
//! thirty times a second. Only the most recent message is remembered.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Build the spoken warning for a list of missing items. `None` when
/// nothing is missing.
pub fn format_alert(missing_items: &[String]) -> Option<String> {
    if missing_items.is_empty() {
        return None;
    }
    Some(format!(
        "Warning! {} are missing. Please wear them immediately!",
        missing_items.join(" and ")
    ))
}

#[derive(Debug)]
struct QueuedAlert {
    generation: u64,
    message: String,
}

/// Create a connected deduplicator and receiver pair.
pub fn alert_channel() -> (AlertDeduplicator, AlertReceiver) {
    let (tx, rx) = unbounded_channel();
    let generation = Arc::new(AtomicU64::new(0));
    (
        AlertDeduplicator {
            last_message: Mutex::new(None),
            sender: Mutex::new(Some(tx)),
            generation: generation.clone(),
        },
        AlertReceiver { rx, generation },
    )
}

/// Producer side of the alert queue.
pub struct AlertDeduplicator {
    last_message: Mutex<Option<String>>,
    sender: Mutex<Option<UnboundedSender<QueuedAlert>>>,
    generation: Arc<AtomicU64>,
}

impl AlertDeduplicator {
    /// Queue an alert for `missing_items` unless it repeats the last one.
    /// Never blocks. Returns whether a message was queued.
    pub fn evaluate(&self, missing_items: &[String]) -> bool {
        let Some(message) = format_alert(missing_items) else {
            return false;
        };

        let mut last = self.last_message.lock();
        if last.as_deref() == Some(message.as_str()) {
            return false;
        }

        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            debug!("Alert queue closed, dropping: {}", message);
            return false;
        };

        let queued = QueuedAlert {
            generation: self.generation.load(Ordering::SeqCst),
            message: message.clone(),
        };
        if tx.send(queued).is_err() {
            debug!("Alert worker gone, dropping: {}", message);
            return false;
        }

        *last = Some(message);
        true
    }

    /// Forget the last message and discard everything still queued.
    pub fn clear(&self) {
        let mut last = self.last_message.lock();
        *last = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// The most recently queued message, if any.
    pub fn last_message(&self) -> Option<String> {
        self.last_message.lock().clone()
    }

    /// Stop accepting alerts. The worker exits once the queue is drained.
    pub fn close(&self) {
        self.sender.lock().take();
    }
}

/// Consumer side of the alert queue.
pub struct AlertReceiver {
    rx: UnboundedReceiver<QueuedAlert>,
    generation: Arc<AtomicU64>,
}

impl AlertReceiver {
    /// Next message to speak. Messages queued before the latest
    /// [`AlertDeduplicator::clear`] are skipped. `None` once the queue is
    /// closed and empty.
    pub async fn recv(&mut self) -> Option<String> {
        while let Some(alert) = self.rx.recv().await {
            if alert.generation == self.generation.load(Ordering::SeqCst) {
                return Some(alert.message);
            }
            debug!("Discarding stale alert: {}", alert.message);
        }
        None
    }
}
