//! Cross-boundary handoff into the validator loop.
//!
//! Producers (network layer, minute ticker, test harnesses) hold
//! [`QueueHandles`]; the loop owns the receiving ends and only ever polls them
//! with `try_recv`.

use dirchain_messages::Message;
use tokio::sync::mpsc;

/// Producer side. Cheap to clone.
#[derive(Clone)]
pub struct QueueHandles {
    inbound: mpsc::Sender<Message>,
    ticks: mpsc::UnboundedSender<u8>,
}

impl QueueHandles {
    /// Enqueue a network message. Fails when the queue is full or the loop has
    /// terminated; backpressure is the caller's concern.
    pub fn try_deliver(&self, message: Message) -> Result<(), Box<Message>> {
        self.inbound.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(m) | mpsc::error::TrySendError::Closed(m) => {
                Box::new(m)
            }
        })
    }

    /// Enqueue a network message, waiting for capacity.
    pub async fn deliver(&self, message: Message) -> bool {
        self.inbound.send(message).await.is_ok()
    }

    /// Inject a minute tick directly.
    pub fn tick(&self, minute: u8) -> bool {
        self.ticks.send(minute).is_ok()
    }

    pub fn tick_sender(&self) -> mpsc::UnboundedSender<u8> {
        self.ticks.clone()
    }
}

/// Consumer side, owned by the validator loop.
pub struct LoopQueues {
    pub(crate) inbound: mpsc::Receiver<Message>,
    pub(crate) ticks: mpsc::UnboundedReceiver<u8>,
}

impl LoopQueues {
    pub(crate) fn try_tick(&mut self) -> Option<u8> {
        self.ticks.try_recv().ok()
    }

    pub(crate) fn try_inbound(&mut self) -> Option<Message> {
        self.inbound.try_recv().ok()
    }
}

pub fn channels(inbound_capacity: usize) -> (QueueHandles, LoopQueues) {
    let (inbound_tx, inbound_rx) = mpsc::channel(inbound_capacity);
    let (tick_tx, tick_rx) = mpsc::unbounded_channel();
    (
        QueueHandles {
            inbound: inbound_tx,
            ticks: tick_tx,
        },
        LoopQueues {
            inbound: inbound_rx,
            ticks: tick_rx,
        },
    )
}
