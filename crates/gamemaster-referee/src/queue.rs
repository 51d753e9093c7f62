//! The message queue shared by every stream reader and drained by the router.
//!
//! Unbounded multi-producer / single-consumer FIFO. Pushing never blocks a
//! reader, so a player that floods stdout grows the queue instead of stalling.

use gamemaster_core::Message;
use tokio::sync::mpsc;

/// Create a connected queue pair.
pub fn message_queue() -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueueSender { tx }, QueueReceiver { rx })
}

/// Producer half, cloned into every stream reader.
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<Message>,
}

impl QueueSender {
    /// Enqueue a message. Returns `false` once the router has gone away.
    pub fn push(&self, message: Message) -> bool {
        self.tx.send(message).is_ok()
    }
}

/// Consumer half, owned by the router loop.
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl QueueReceiver {
    /// Take the next message without waiting.
    pub fn poll(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next message. `None` once every producer is gone and the
    /// queue is empty.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Take everything queued right now, in FIFO order.
    pub fn drain(&mut self) -> Vec<Message> {
        std::iter::from_fn(|| self.poll()).collect()
    }
}
