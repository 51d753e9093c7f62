//! Line readers for player output streams.

use gamemaster_core::{Message, StreamKind};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::queue::QueueSender;

/// Spawn a task that turns every line of `stream` into a [`Message`] on the
/// queue.
///
/// The task ends at end-of-stream, on the first read error, or once the queue
/// has no consumer. A read error is not reported: a dead player is noticed by
/// the supervisor through its exit status, not here.
pub fn spawn_stream_reader<R>(
    stream: R,
    id: usize,
    kind: StreamKind,
    broadcast: bool,
    queue: QueueSender,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    trace!(id, stream = %kind, "{}", line);
                    if !queue.push(Message::new(id, kind, broadcast, line)) {
                        debug!(id, stream = %kind, "Message queue closed");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(id, stream = %kind, error = %e, "Stream read failed");
                    break;
                }
            }
        }
        debug!(id, stream = %kind, "Stream reader finished");
    })
}
