// Inbound pipeline - framing, classification and routing of received bytes
use crate::domain::events::{EventBus, TelemetryEvent};
use crate::domain::telemetry::SampleBatch;
use crate::infrastructure::line_framer::LineFramer;
use crate::infrastructure::message_parser::{parse_line, InboundMessage};
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Turns raw chunks into lines and routes each decoded message to its consumer
pub struct InboundRouter {
    framer: LineFramer,
    batches: mpsc::UnboundedSender<SampleBatch>,
    events: EventBus,
}

impl InboundRouter {
    pub fn new(batches: mpsc::UnboundedSender<SampleBatch>, events: EventBus) -> Self {
        Self {
            framer: LineFramer::new(),
            batches,
            events,
        }
    }

    pub fn handle_chunk(&mut self, chunk: &[u8]) {
        for line in self.framer.push(chunk) {
            self.route(&line);
        }
    }

    fn route(&self, line: &str) {
        match parse_line(line) {
            Ok(InboundMessage::Samples(batch)) => {
                if batch.is_empty() {
                    return;
                }
                self.events
                    .publish(TelemetryEvent::SampleBatchReceived(batch.clone()));
                if self.batches.send(batch).is_err() {
                    tracing::debug!("Aggregator gone, dropping batch");
                }
            }
            Ok(InboundMessage::Status(status)) => {
                if status.is_heartbeat_timeout() {
                    tracing::warn!("Firmware reports heartbeat timeout; it has stopped streaming");
                } else {
                    tracing::info!("Firmware status: {}", status.status);
                }
                self.events.publish(TelemetryEvent::StatusReceived(status));
            }
            Ok(InboundMessage::Unrecognized) => {
                tracing::debug!("Unknown JSON message: {}", line);
            }
            Ok(InboundMessage::Noise) => {
                tracing::debug!("Non-JSON message: {}", line);
            }
            Err(e) => {
                tracing::warn!("{} (line: {})", e, line);
            }
        }
    }
}

/// Spawn the task draining the transport's inbound channel for one connection
pub fn spawn_inbound_pump(
    mut router: InboundRouter,
    mut inbound: mpsc::UnboundedReceiver<Bytes>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                chunk = inbound.recv() => match chunk {
                    Some(chunk) => router.handle_chunk(&chunk),
                    None => {
                        tracing::debug!("Transport closed its inbound stream");
                        break;
                    }
                },
            }
        }
    })
}
