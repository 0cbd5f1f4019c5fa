//! Event sink abstraction between a session loop and its consumer.

use async_trait::async_trait;
use crate::error::EnvError;
use tokio::sync::mpsc;

/// Destination for the items a session produces.
///
/// # Implementations
///
/// - **Production**: `mpsc::UnboundedSender<T>` feeding a stream handle
/// - **Simulation**: recording sinks that keep every item for inspection
///
/// # Flow
///
/// ```text
/// Session loop                 Sink                     Consumer
///   |                            |                          |
///   |-- deliver(batch) --------->|                          |
///   |                            |------------------------->|-- next() -> batch
///   |<-- closed() resolves ------|<---------- drop ---------|
/// ```
///
/// There is no backpressure: `deliver` never waits on a slow consumer.
#[async_trait]
pub trait EventSink<T: Send + 'static>: Send + Sync {
    /// Hands one item to the consumer.
    ///
    /// # Returns
    /// * `Ok(())` - Item queued
    /// * `Err(EnvError::ChannelClosed)` - The consumer is gone
    async fn deliver(&self, item: T) -> Result<(), EnvError>;

    /// Resolves once the consumer has disconnected.
    ///
    /// Sinks without a consumer lifetime never resolve.
    async fn closed(&self);
}

#[async_trait]
impl<T: Send + 'static> EventSink<T> for mpsc::UnboundedSender<T> {
    async fn deliver(&self, item: T) -> Result<(), EnvError> {
        self.send(item).map_err(|_| EnvError::closed("receiver dropped"))
    }

    async fn closed(&self) {
        mpsc::UnboundedSender::closed(self).await;
    }
}
