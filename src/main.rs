// Main entry point - Dependency wiring and headless viewer loop
use std::sync::Arc;

use controller_telemetry::application::controller_service::ControllerService;
use controller_telemetry::infrastructure::config::load_viewer_config;
use controller_telemetry::infrastructure::serialport_transport::SerialPortTransport;
use controller_telemetry::presentation::console_renderer::{event_stream, ConsoleRenderer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_viewer_config()?;

    // Initialize tracing; RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Create transport (infrastructure layer) and controller (application layer)
    let transport = Arc::new(SerialPortTransport::new());
    let controller = ControllerService::new(transport, config.history.capacity);

    let ports = controller.available_ports();
    if ports.is_empty() {
        tracing::info!("No serial ports found");
    }
    for port in &ports {
        tracing::info!("Available port: {}", port);
    }

    let Some(port) = config.serial.port.clone() else {
        tracing::info!("No serial.port configured; set VIEWER__SERIAL__PORT to connect");
        return Ok(());
    };

    // Subscribe before connecting so no notification is missed
    let renderer = tokio::spawn(ConsoleRenderer::new().run(event_stream(controller.subscribe())));

    controller.connect(&port).await?;
    if config.serial.auto_start {
        if let Err(e) = controller.start_streaming().await {
            tracing::error!("Could not start streaming: {}", e);
        }
    }

    tracing::info!("Viewing {}; press Ctrl-C to stop", port);
    tokio::signal::ctrl_c().await?;

    controller.disconnect().await;
    drop(controller);
    renderer.await?;

    Ok(())
}
