//! Background long-poller feeding a bounded channel.
//!
//! The dispatch loop pulls from the receiver one update at a time, so the
//! channel capacity is the only buffering between Telegram and handling.

use std::time::Duration;

use teloxide::{prelude::*, types::AllowedUpdate};
use tokio::{sync::mpsc, task::JoinHandle};

use h2j_core::domain::IncomingUpdate;

use crate::updates::map_update;

/// Pause after a failed `getUpdates` before polling again.
pub const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(3);
const POLL_LIMIT: u8 = 100;

#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    pub timeout: Duration,
    pub buffer: usize,
    pub error_backoff: Duration,
}

/// Start polling. The task ends when the receiver is dropped.
pub fn spawn(bot: Bot, cfg: PollConfig) -> (mpsc::Receiver<IncomingUpdate>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(cfg.buffer.max(1));
    let handle = tokio::spawn(poll_loop(bot, cfg, tx));
    (rx, handle)
}

async fn poll_loop(bot: Bot, cfg: PollConfig, tx: mpsc::Sender<IncomingUpdate>) {
    let timeout_secs = u32::try_from(cfg.timeout.as_secs()).unwrap_or(u32::MAX);
    let mut offset: i32 = 0;

    loop {
        let batch = bot
            .get_updates()
            .offset(offset)
            .timeout(timeout_secs)
            .limit(POLL_LIMIT)
            .allowed_updates(vec![AllowedUpdate::Message])
            .await;

        let updates = match batch {
            Ok(updates) => updates,
            Err(e) => {
                tracing::error!(error = %e, "getUpdates failed; retrying");
                tokio::time::sleep(cfg.error_backoff).await;
                continue;
            }
        };

        for update in updates {
            // Acknowledge before handling: a failed update is never redelivered.
            offset = next_offset(offset, update.id);
            if tx.send(map_update(&update)).await.is_err() {
                tracing::debug!("update receiver dropped; poller exiting");
                return;
            }
        }
    }
}

fn next_offset(current: i32, update_id: i32) -> i32 {
    current.max(update_id.saturating_add(1))
}
