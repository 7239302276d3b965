// Transport traits for the serial link
use crate::domain::connection::LinkSettings;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Receives every chunk of bytes read from the port. Sending never blocks the reader.
pub type InboundSink = mpsc::UnboundedSender<Bytes>;

#[async_trait]
pub trait SerialTransport: Send + Sync {
    /// Names of ports that can currently be opened
    fn available_ports(&self) -> anyhow::Result<Vec<String>>;

    /// Open `port` and start delivering inbound bytes to `inbound`
    async fn open(
        &self,
        port: &str,
        settings: LinkSettings,
        inbound: InboundSink,
    ) -> anyhow::Result<Arc<dyn SerialLink>>;
}

#[async_trait]
pub trait SerialLink: Send + Sync {
    /// Write the whole buffer and flush it to the wire
    async fn write_all(&self, bytes: &[u8]) -> anyhow::Result<()>;

    /// Stop reading and release the port
    async fn close(&self) -> anyhow::Result<()>;
}
