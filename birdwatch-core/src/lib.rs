// src/lib.rs

pub mod config;
pub mod error;
pub mod eventbus;
pub mod models;
pub mod notifier;
pub mod platforms;
pub mod services;

pub use error::Error;
