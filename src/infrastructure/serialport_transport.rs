// Serial port transport backed by the serialport crate
use crate::application::serial_transport::{InboundSink, SerialLink, SerialTransport};
use crate::domain::connection::LinkSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

const READ_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Default, Clone)]
pub struct SerialPortTransport;

impl SerialPortTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SerialTransport for SerialPortTransport {
    fn available_ports(&self) -> Result<Vec<String>> {
        let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    async fn open(
        &self,
        port: &str,
        settings: LinkSettings,
        inbound: InboundSink,
    ) -> Result<Arc<dyn SerialLink>> {
        let path = port.to_string();
        let link = tokio::task::spawn_blocking(move || SerialPortLink::open(&path, settings, inbound))
            .await
            .context("Serial open task failed")??;
        Ok(Arc::new(link))
    }
}

/// Open port: a writer handle guarded for exclusive use plus a reader thread
pub struct SerialPortLink {
    name: String,
    writer: Arc<Mutex<Option<Box<dyn SerialPort>>>>,
    shutdown: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SerialPortLink {
    fn open(path: &str, settings: LinkSettings, inbound: InboundSink) -> Result<Self> {
        let port = serialport::new(path, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.read_timeout)
            .open()
            .with_context(|| format!("Failed to open serial port {}", path))?;

        let reader_port = port
            .try_clone()
            .with_context(|| format!("Failed to clone handle for {}", path))?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let reader = {
            let shutdown = shutdown.clone();
            let name = path.to_string();
            thread::Builder::new()
                .name(format!("serial-reader {}", path))
                .spawn(move || read_loop(name, reader_port, inbound, shutdown))
                .context("Failed to spawn serial reader thread")?
        };

        tracing::info!("Opened serial port: {} at {} baud", path, settings.baud_rate);

        Ok(Self {
            name: path.to_string(),
            writer: Arc::new(Mutex::new(Some(port))),
            shutdown,
            reader: Mutex::new(Some(reader)),
        })
    }
}

#[async_trait]
impl SerialLink for SerialPortLink {
    async fn write_all(&self, bytes: &[u8]) -> Result<()> {
        let writer = self.writer.clone();
        let data = bytes.to_vec();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut guard = writer.lock();
            let port = guard.as_mut().context("Serial port is closed")?;
            port.write_all(&data).context("Serial write failed")?;
            port.flush().context("Serial flush failed")?;
            Ok(())
        })
        .await
        .context("Serial write task failed")?
    }

    async fn close(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        let writer = self.writer.clone();
        let reader = self.reader.lock().take();
        let name = self.name.clone();

        tokio::task::spawn_blocking(move || {
            // Waits for any write still holding the port
            writer.lock().take();
            if let Some(handle) = reader {
                if handle.join().is_err() {
                    tracing::error!("Serial reader for {} panicked", name);
                }
            }
        })
        .await
        .context("Serial close task failed")?;

        tracing::info!("Closed serial port: {}", self.name);
        Ok(())
    }
}

impl Drop for SerialPortLink {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn read_loop(
    name: String,
    mut port: Box<dyn SerialPort>,
    inbound: InboundSink,
    shutdown: Arc<AtomicBool>,
) {
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    while !shutdown.load(Ordering::Relaxed) {
        match port.read(&mut buffer) {
            Ok(0) => {}
            Ok(n) => {
                if inbound.send(Bytes::copy_from_slice(&buffer[..n])).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                tracing::error!("Serial read on {} failed: {}", name, e);
                break;
            }
        }
    }

    tracing::debug!("Serial reader for {} exiting", name);
}
