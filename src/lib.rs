// Serial telemetry core for the analog keyboard controller
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

pub use application::controller_service::ControllerService;
pub use domain::connection::ConnectionState;
pub use domain::events::TelemetryEvent;
pub use error::{Result, TelemetryError};
