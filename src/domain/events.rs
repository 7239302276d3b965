// Notifications published by the core to renderers
use super::connection::ConnectionState;
use super::telemetry::{SampleBatch, SampleKey, SeriesInfo, StatusMessage};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    ConnectionStateChanged(ConnectionState),
    /// Raw batch as parsed off the wire, before windowing
    SampleBatchReceived(SampleBatch),
    SeriesCreated(SeriesInfo),
    SeriesChanged { key: SampleKey, values: Vec<f64> },
    StatusReceived(StatusMessage),
}

/// Fan-out of [`TelemetryEvent`]s. Subscribers unsubscribe by dropping their receiver.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TelemetryEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: TelemetryEvent) {
        // No subscribers is not an error for a fire-and-forget notification
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
