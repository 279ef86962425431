//! src/notifier/mod.rs
//!
//! Outbound alert dispatch. One HTTP POST per matched post, outcome logged
//! before returning; retry policy (there is none by default) belongs to the
//! caller, not this component.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::Error;
use crate::config::PushoverConfig;
use crate::models::NotificationRequest;

/// Outcome of a single dispatch attempt. A non-2xx response is still
/// `Delivered`: the service answered, and the status is recorded verbatim.
/// Only a request that never got an HTTP response is a `TransportFailure`.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    Delivered(u16),
    TransportFailure(String),
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchResult::Delivered(code) if (200..300).contains(code))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, request: &NotificationRequest) -> DispatchResult;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PushoverClient {
    http: reqwest::Client,
    config: PushoverConfig,
}

impl PushoverClient {
    pub fn new(config: PushoverConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl Notifier for PushoverClient {
    async fn send(&self, request: &NotificationRequest) -> DispatchResult {
        let form = [
            ("token", self.config.app_key.as_str()),
            ("user", self.config.user_key.as_str()),
            ("message", request.message.as_str()),
            ("title", request.title.as_str()),
            ("url", request.url.as_str()),
            ("device", self.config.device.as_str()),
        ];

        match self.http.post(&self.config.endpoint).form(&form).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                info!("[Notifier] POST result: {}", status);
                DispatchResult::Delivered(status)
            }
            Err(e) => {
                warn!("[Notifier] POST failed => {}", e);
                DispatchResult::TransportFailure(e.to_string())
            }
        }
    }
}
