// Connection domain models - link state, commands and fixed link settings
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No open transport
    #[default]
    Disconnected,
    /// Transport open, firmware not emitting samples
    Stopped,
    /// Transport open and firmware instructed to emit samples
    Streaming,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }

    pub fn is_streaming(self) -> bool {
        matches!(self, ConnectionState::Streaming)
    }

    /// Whether moving from `self` to `next` is one of the five legal edges
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Stopped)
                | (Stopped, Streaming)
                | (Streaming, Stopped)
                | (Stopped, Disconnected)
                | (Streaming, Disconnected)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Stopped => "stopped",
            ConnectionState::Streaming => "streaming",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    StartAnalog,
    StopAnalog,
    Heartbeat,
}

impl Command {
    pub fn token(self) -> &'static str {
        match self {
            Command::StartAnalog => "START_ANALOG",
            Command::StopAnalog => "STOP_ANALOG",
            Command::Heartbeat => "HEARTBEAT",
        }
    }

    /// Wire form: the bare token followed by a line terminator
    pub fn to_line(self) -> Vec<u8> {
        let mut line = Vec::with_capacity(self.token().len() + 1);
        line.extend_from_slice(self.token().as_bytes());
        line.push(b'\n');
        line
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Serial line settings. The firmware only speaks 115200 8-N-1, so these are
/// fixed rather than configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(500),
            write_timeout: Duration::from_millis(500),
        }
    }
}
