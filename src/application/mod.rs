// Application layer - connection lifecycle, command plumbing and aggregation
pub mod aggregation_service;
pub mod command_channel;
pub mod controller_service;
pub mod heartbeat;
pub mod inbound_pipeline;
pub mod serial_transport;

#[cfg(test)]
pub(crate) mod test_support;
