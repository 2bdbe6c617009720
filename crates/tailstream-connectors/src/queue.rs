//! Work queue over a bounded tokio channel.

use async_trait::async_trait;
use tailstream_core::{ConnectorError, CursorRange, Delivery, WorkQueue};
use tokio::sync::mpsc;

/// [`WorkQueue`] feeding the export pipeline's dispatcher through a bounded
/// `mpsc` channel. Backpressure from slow processing propagates to the
/// slicer through the channel capacity.
#[derive(Clone)]
pub struct ChannelWorkQueue {
    tx: mpsc::Sender<Delivery>,
}

impl ChannelWorkQueue {
    /// Create a queue and the receiver that the dispatcher drains.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Delivery>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl WorkQueue for ChannelWorkQueue {
    async fn enqueue(&self, range: &CursorRange) -> Result<(), ConnectorError> {
        self.tx
            .send(Delivery::first(range.clone()))
            .await
            .map_err(|_| ConnectorError::Queue("delivery channel closed".into()))
    }
}
