//! Background alert speaker

use crate::alert::AlertReceiver;
use crate::engines::Speaker;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawn the single task that speaks queued alerts, one at a time and in
/// queue order. A failed utterance is logged and skipped. The task ends
/// when the queue is closed and drained.
pub fn spawn_alert_worker(mut receiver: AlertReceiver, speaker: Arc<dyn Speaker>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Alert worker started ({} engine)", speaker.name());
        while let Some(message) = receiver.recv().await {
            debug!("Speaking alert: {}", message);
            if let Err(e) = speaker.speak(&message).await {
                warn!("Failed to speak alert: {}", e);
            }
        }
        info!("Alert worker stopped");
    })
}
