//! Minute timer: turns minute ticks into signed end-of-minute messages and
//! closes the height on its last minute.

use std::time::Duration;

use dirchain_messages::MessageBody;
use dirchain_store::ContentStore;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::state::State;
use crate::NodeError;

#[derive(Clone, Copy, Debug)]
pub struct Timer {
    last_minute: u8,
}

impl Timer {
    pub fn new(last_minute: u8) -> Self {
        Self { last_minute }
    }

    pub fn last_minute(&self) -> u8 {
        self.last_minute
    }

    /// Handle minute tick `minute`.
    ///
    /// Queues a local signed end-of-minute for the current height. On the
    /// last minute the height is also marked for sealing; the seal runs once
    /// that end-of-minute has been appended.
    pub fn on_tick<S: ContentStore>(
        &self,
        minute: u8,
        state: &mut State<S>,
    ) -> Result<(), NodeError> {
        if minute == 0 || minute > self.last_minute {
            return Err(NodeError::Config(format!(
                "minute tick {minute} outside 1..={}",
                self.last_minute
            )));
        }
        let height = state.current_height();
        let eom = state.sign_local(MessageBody::EndOfMinute {
            minute,
            db_height: height,
        })?;
        tracing::debug!(height, minute, "end of minute");
        state.push_timer_message(eom);
        if minute == self.last_minute {
            state.request_seal(height);
        }
        Ok(())
    }
}

/// Send minute ticks `1..=last_minute`, one per `minute_duration`, wrapping
/// back to 1 after the last minute, until shutdown.
pub fn spawn_minute_ticker(
    ticks: mpsc::UnboundedSender<u8>,
    last_minute: u8,
    minute_duration: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(minute_duration);
        // The first tick of a tokio interval completes immediately.
        interval.tick().await;
        let mut minute = 1u8;
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    tracing::debug!("minute ticker shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if ticks.send(minute).is_err() {
                        break;
                    }
                    minute = if minute >= last_minute { 1 } else { minute + 1 };
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ticker_wraps_after_last_minute() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = spawn_minute_ticker(tx, 3, Duration::from_millis(5), shutdown_rx);

        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(rx.recv().await.unwrap());
        }
        assert_eq!(seen, vec![1, 2, 3, 1, 2]);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
