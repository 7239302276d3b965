// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod line_framer;
pub mod message_parser;
pub mod serialport_transport;
