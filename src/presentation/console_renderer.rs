// Console renderer - headless collaborator that logs every notification
use crate::domain::events::TelemetryEvent;
use crate::domain::telemetry::{SampleKey, SeriesInfo};
use futures::stream::Stream;
use futures::StreamExt;
use std::collections::HashMap;
use tokio::sync::broadcast::{self, error::RecvError};

/// Adapt a bus subscription into a stream, skipping over lag gaps
pub fn event_stream(
    mut rx: broadcast::Receiver<TelemetryEvent>,
) -> impl Stream<Item = TelemetryEvent> {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => yield event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Renderer fell behind, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    series: HashMap<SampleKey, SeriesInfo>,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<S>(mut self, events: S)
    where
        S: Stream<Item = TelemetryEvent>,
    {
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            self.render(&event);
        }
    }

    /// Render one event, returning the line written (if any)
    pub fn render(&mut self, event: &TelemetryEvent) -> Option<String> {
        match event {
            TelemetryEvent::ConnectionStateChanged(state) => {
                if !state.is_connected() {
                    self.series.clear();
                }
                let line = format!("connection: {}", state);
                tracing::info!("{}", line);
                Some(line)
            }
            TelemetryEvent::SeriesCreated(info) => {
                let line = format!("series {} added (color {})", info.label, info.color);
                tracing::info!("{}", line);
                self.series.insert(info.key, info.clone());
                Some(line)
            }
            TelemetryEvent::SeriesChanged { key, values } => {
                let label = self
                    .series
                    .get(key)
                    .map(|info| info.label.clone())
                    .unwrap_or_else(|| format!("Key {}", key));
                let latest = values
                    .last()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let line = format!("{}: {} samples, latest {}", label, values.len(), latest);
                tracing::debug!("{}", line);
                Some(line)
            }
            TelemetryEvent::StatusReceived(status) => {
                let line = format!("firmware status: {}", status.status);
                tracing::info!("{}", line);
                Some(line)
            }
            TelemetryEvent::SampleBatchReceived(batch) => {
                tracing::trace!(
                    "batch at {} with {} readings",
                    batch.timestamp,
                    batch.readings.len()
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connection::ConnectionState;
    use crate::domain::events::EventBus;
    use crate::domain::telemetry::StatusMessage;

    #[test]
    fn test_render_lines() {
        let mut renderer = ConsoleRenderer::new();
        let info = SeriesInfo::new(SampleKey(3), 0);

        assert_eq!(
            renderer.render(&TelemetryEvent::SeriesCreated(info)).as_deref(),
            Some("series Key 3 added (color #0000FF)")
        );
        assert_eq!(
            renderer
                .render(&TelemetryEvent::SeriesChanged {
                    key: SampleKey(3),
                    values: vec![1.0, 512.0],
                })
                .as_deref(),
            Some("Key 3: 2 samples, latest 512")
        );
        assert_eq!(
            renderer
                .render(&TelemetryEvent::StatusReceived(StatusMessage::new("stopped")))
                .as_deref(),
            Some("firmware status: stopped")
        );
        assert_eq!(
            renderer
                .render(&TelemetryEvent::ConnectionStateChanged(ConnectionState::Disconnected))
                .as_deref(),
            Some("connection: disconnected")
        );
    }

    #[tokio::test]
    async fn test_event_stream_ends_when_bus_dropped() {
        let bus = EventBus::new();
        let stream = event_stream(bus.subscribe());

        bus.publish(TelemetryEvent::ConnectionStateChanged(ConnectionState::Stopped));
        bus.publish(TelemetryEvent::StatusReceived(StatusMessage::new("started")));
        drop(bus);

        let events: Vec<TelemetryEvent> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            TelemetryEvent::ConnectionStateChanged(ConnectionState::Stopped)
        );
    }
}
