// Error taxonomy surfaced by the telemetry core
use crate::domain::connection::{Command, ConnectionState};

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Port missing, busy, refused by permissions, or open timed out
    #[error("Serial port {port} unavailable: {reason}")]
    TransportUnavailable { port: String, reason: String },

    /// Operation is not legal in the current connection state
    #[error("Cannot {operation} while {state}")]
    InvalidStateTransition {
        operation: &'static str,
        state: ConnectionState,
    },

    /// Write timed out or the transport failed mid-write
    #[error("Failed to send {command}: {reason}")]
    CommandSendFailed { command: Command, reason: String },

    /// Malformed inbound line; only ever logged
    #[error("Malformed message: {0}")]
    ParseFailure(String),
}

impl TelemetryError {
    pub fn send_failed(command: Command, err: &anyhow::Error) -> Self {
        TelemetryError::CommandSendFailed {
            command,
            reason: format!("{:#}", err),
        }
    }
}
