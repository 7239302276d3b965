// Domain layer - protocol, telemetry and history models
pub mod connection;
pub mod events;
pub mod history;
pub mod telemetry;
