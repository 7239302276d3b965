// Controller service - connection state machine for the serial controller
use crate::application::aggregation_service::{spawn_aggregator, SeriesRegistry, AGGREGATION_WINDOW};
use crate::application::command_channel::CommandChannel;
use crate::application::heartbeat::{Heartbeat, HEARTBEAT_PERIOD};
use crate::application::inbound_pipeline::{spawn_inbound_pump, InboundRouter};
use crate::application::serial_transport::{SerialLink, SerialTransport};
use crate::domain::connection::{Command, ConnectionState, LinkSettings};
use crate::domain::events::{EventBus, TelemetryEvent};
use crate::domain::telemetry::SeriesSnapshot;
use crate::error::{Result, TelemetryError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const OPEN_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything that only exists while a port is open
struct Session {
    port: String,
    link: Arc<dyn SerialLink>,
    commands: CommandChannel,
    heartbeat: Heartbeat,
    pipeline_cancel: CancellationToken,
    pump: JoinHandle<()>,
    aggregator: JoinHandle<()>,
}

pub struct ControllerService {
    transport: Arc<dyn SerialTransport>,
    settings: LinkSettings,
    events: EventBus,
    state: watch::Sender<ConnectionState>,
    // Held across every transition so no two run concurrently
    session: tokio::sync::Mutex<Option<Session>>,
    registry: Arc<Mutex<SeriesRegistry>>,
}

impl ControllerService {
    pub fn new(transport: Arc<dyn SerialTransport>, history_capacity: usize) -> Self {
        let events = EventBus::new();
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            settings: LinkSettings::default(),
            registry: Arc::new(Mutex::new(SeriesRegistry::new(
                history_capacity,
                events.clone(),
            ))),
            events,
            state,
            session: tokio::sync::Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.events.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Best effort: an enumeration failure yields an empty list
    pub fn available_ports(&self) -> Vec<String> {
        match self.transport.available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                tracing::warn!("Port enumeration failed: {:#}", e);
                Vec::new()
            }
        }
    }

    pub fn series_snapshot(&self) -> Vec<SeriesSnapshot> {
        self.registry.lock().snapshot()
    }

    pub async fn connect(&self, port: &str) -> Result<()> {
        let mut session = self.session.lock().await;
        if let Some(active) = session.take() {
            tracing::info!("Already connected to {}, disconnecting first", active.port);
            self.teardown(active).await;
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let opened = tokio::time::timeout(
            OPEN_TIMEOUT,
            self.transport.open(port, self.settings, inbound_tx),
        )
        .await;

        let link = match opened {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                return Err(TelemetryError::TransportUnavailable {
                    port: port.to_string(),
                    reason: format!("{:#}", e),
                });
            }
            Err(_) => {
                return Err(TelemetryError::TransportUnavailable {
                    port: port.to_string(),
                    reason: format!("open timed out after {:?}", OPEN_TIMEOUT),
                });
            }
        };

        let commands = CommandChannel::new(link.clone(), self.settings.write_timeout);
        let pipeline_cancel = CancellationToken::new();
        let (batch_tx, batch_rx) = mpsc::unbounded_channel();
        let aggregator = spawn_aggregator(
            self.registry.clone(),
            batch_rx,
            AGGREGATION_WINDOW,
            pipeline_cancel.clone(),
        );
        let pump = spawn_inbound_pump(
            InboundRouter::new(batch_tx, self.events.clone()),
            inbound_rx,
            pipeline_cancel.clone(),
        );
        let heartbeat = Heartbeat::start(commands.clone(), HEARTBEAT_PERIOD);

        *session = Some(Session {
            port: port.to_string(),
            link,
            commands,
            heartbeat,
            pipeline_cancel,
            pump,
            aggregator,
        });
        tracing::info!("Connected to {}", port);
        self.set_state(ConnectionState::Stopped);

        Ok(())
    }

    /// Always ends Disconnected; failures along the way are logged only.
    /// While streaming, a successful STOP is reported as Stopped before Disconnected.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        match session.take() {
            Some(active) => self.teardown(active).await,
            None => tracing::debug!("Disconnect requested while already disconnected"),
        }
    }

    pub async fn start_streaming(&self) -> Result<()> {
        let session = self.session.lock().await;
        let state = self.current_state();
        let active = match session.as_ref() {
            Some(active) if state == ConnectionState::Stopped => active,
            _ => {
                return Err(TelemetryError::InvalidStateTransition {
                    operation: "start streaming",
                    state,
                });
            }
        };

        active.commands.send(Command::StartAnalog).await?;
        self.set_state(ConnectionState::Streaming);
        Ok(())
    }

    pub async fn stop_streaming(&self) -> Result<()> {
        let session = self.session.lock().await;
        let state = self.current_state();
        let active = match session.as_ref() {
            Some(active) if state == ConnectionState::Streaming => active,
            _ => {
                return Err(TelemetryError::InvalidStateTransition {
                    operation: "stop streaming",
                    state,
                });
            }
        };

        active.commands.send(Command::StopAnalog).await?;
        self.set_state(ConnectionState::Stopped);
        Ok(())
    }

    async fn teardown(&self, session: Session) {
        if self.current_state().is_streaming() {
            match session.commands.send(Command::StopAnalog).await {
                Ok(()) => self.set_state(ConnectionState::Stopped),
                Err(e) => tracing::warn!("Stop before disconnect failed: {}", e),
            }
        }

        session.heartbeat.stop().await;
        session.commands.close();

        session.pipeline_cancel.cancel();
        for (name, task) in [("inbound pump", session.pump), ("aggregator", session.aggregator)] {
            if let Err(e) = task.await {
                tracing::error!("{} task ended abnormally: {}", name, e);
            }
        }

        if let Err(e) = session.link.close().await {
            tracing::warn!("Error closing {}: {:#}", session.port, e);
        }

        self.registry.lock().clear();
        tracing::info!("Disconnected from {}", session.port);
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        debug_assert!(
            previous.can_transition_to(next),
            "illegal transition {} -> {}",
            previous,
            next
        );
        tracing::debug!("Connection state {} -> {}", previous, next);
        self.events
            .publish(TelemetryEvent::ConnectionStateChanged(next));
    }
}

impl Drop for ControllerService {
    fn drop(&mut self) {
        // Without an async drop the best we can do is stop the background tasks
        if let Some(active) = self.session.get_mut().take() {
            tracing::warn!("Controller dropped while connected to {}", active.port);
            active.heartbeat.cancel();
            active.pipeline_cancel.cancel();
        }
    }
}
