// Serialized command writer shared by user commands and the heartbeat
use crate::application::serial_transport::SerialLink;
use crate::domain::connection::Command;
use crate::error::{Result, TelemetryError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Writes command lines one at a time. A single permit guarantees two
/// commands are never interleaved on the wire.
#[derive(Clone)]
pub struct CommandChannel {
    link: Arc<dyn SerialLink>,
    permit: Arc<Semaphore>,
    write_timeout: Duration,
}

impl CommandChannel {
    pub fn new(link: Arc<dyn SerialLink>, write_timeout: Duration) -> Self {
        Self {
            link,
            permit: Arc::new(Semaphore::new(1)),
            write_timeout,
        }
    }

    pub async fn send(&self, command: Command) -> Result<()> {
        let _permit = self
            .permit
            .acquire()
            .await
            .map_err(|_| TelemetryError::CommandSendFailed {
                command,
                reason: "command channel closed".to_string(),
            })?;

        let line = command.to_line();
        match tokio::time::timeout(self.write_timeout, self.link.write_all(&line)).await {
            Ok(Ok(())) => {
                tracing::debug!("Sent {}", command);
                Ok(())
            }
            Ok(Err(e)) => Err(TelemetryError::send_failed(command, &e)),
            Err(_) => Err(TelemetryError::CommandSendFailed {
                command,
                reason: format!("write timed out after {:?}", self.write_timeout),
            }),
        }
    }

    /// Refuse further sends; callers already holding the permit finish their write
    pub fn close(&self) {
        self.permit.close();
    }
}
