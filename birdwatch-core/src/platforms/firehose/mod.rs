// src/platforms/firehose/mod.rs

pub mod backoff;
pub mod events;
pub mod runtime;

pub use runtime::FirehoseSession;
