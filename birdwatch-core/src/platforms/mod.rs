// src/platforms/mod.rs

pub mod firehose;

/// Connection status of the one upstream stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Streaming,
    Backoff,
}
