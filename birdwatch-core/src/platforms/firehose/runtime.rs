//! src/platforms/firehose/runtime.rs
//!
//! The one long-lived stream session. Explicit state machine:
//! Disconnected -> Connecting -> Streaming, with transient failures cycling
//! through Backoff and fatal conditions (auth rejection, rate limiting,
//! failure cap) ending the run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use super::backoff::Backoff;
use super::events::{ClientFrame, ServerFrame};
use crate::Error;
use crate::config::WatcherConfig;
use crate::eventbus::EventBus;
use crate::platforms::ConnectionStatus;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How one connected period ended, as seen by the outer session loop.
/// Fatal conditions travel as `Err` instead.
enum StreamEnd {
    /// Shutdown was signaled; the socket is already closed.
    Shutdown,
    /// The connection died in a way worth retrying.
    Transient(String),
}

pub struct FirehoseSession {
    stream_url: String,
    token: String,
    follow: Arc<HashSet<String>>,
    idle_timeout: Duration,
    max_consecutive_failures: u32,
    backoff: Backoff,
    event_bus: Arc<EventBus>,
    pub connection_status: ConnectionStatus,
}

impl FirehoseSession {
    pub fn new(config: &WatcherConfig, event_bus: Arc<EventBus>) -> Self {
        Self {
            stream_url: config.stream_url.clone(),
            token: config.token.clone(),
            follow: config.follow.clone(),
            idle_timeout: config.idle_timeout,
            max_consecutive_failures: config.max_consecutive_failures,
            backoff: Backoff::new(config.backoff_base, config.backoff_max),
            event_bus,
            connection_status: ConnectionStatus::Disconnected,
        }
    }

    /// Entrypoint — owns the connect/stream/backoff cycle until shutdown or
    /// a fatal condition. Rate limiting and auth rejection are terminal: the
    /// session surfaces the error instead of retrying.
    pub async fn run(&mut self) -> Result<(), Error> {
        let mut shutdown_rx = self.event_bus.shutdown_rx.clone();

        loop {
            if self.event_bus.is_shutdown() {
                self.connection_status = ConnectionStatus::Disconnected;
                return Ok(());
            }

            self.connection_status = ConnectionStatus::Connecting;
            info!("[Firehose] connecting => {}", self.stream_url);

            match self.connect_and_stream(&mut shutdown_rx).await {
                Ok(StreamEnd::Shutdown) => {
                    info!("[Firehose] shutdown signaled; stream closed.");
                    self.connection_status = ConnectionStatus::Disconnected;
                    return Ok(());
                }
                Ok(StreamEnd::Transient(reason)) => {
                    warn!("[Firehose] stream ended => {}", reason);
                }
                Err(e) if e.is_fatal() => {
                    self.connection_status = ConnectionStatus::Disconnected;
                    error!("[Firehose] fatal stream failure => {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("[Firehose] transient stream failure => {}", e);
                }
            }

            self.connection_status = ConnectionStatus::Backoff;
            let delay = self.backoff.next_delay();
            let failures = self.backoff.consecutive_failures();
            if failures >= self.max_consecutive_failures {
                self.connection_status = ConnectionStatus::Disconnected;
                error!(
                    "[Firehose] {} consecutive failures reached the cap; giving up",
                    failures
                );
                return Err(Error::DegradedExit(failures));
            }
            warn!("[Firehose] backing off {:?} (failure #{})", delay, failures);
            self.event_bus
                .publish_system(format!("backoff {:?} after failure #{}", delay, failures));

            tokio::select! {
                _ = sleep(delay) => {}
                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        self.connection_status = ConnectionStatus::Disconnected;
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn connect_and_stream(
        &mut self,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<StreamEnd, Error> {
        let sep = if self.stream_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}token={}", self.stream_url, sep, self.token);

        let (mut ws, _) = connect_async(&url).await.map_err(classify_connect_error)?;
        debug!("[Firehose] websocket open; waiting for frames");

        let end = self.read_loop(&mut ws, shutdown_rx).await;
        if !matches!(&end, Ok(StreamEnd::Shutdown)) {
            // Best effort; the peer may already be gone.
            let _ = ws.close(None).await;
        }
        end
    }

    /// Reads frames until shutdown, a dead connection, or a fatal signal.
    async fn read_loop(
        &mut self,
        ws: &mut WsStream,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<StreamEnd, Error> {
        loop {
            let msg = tokio::select! {
                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        let _ = ws.close(None).await;
                        return Ok(StreamEnd::Shutdown);
                    }
                    continue;
                }
                next = timeout(self.idle_timeout, ws.next()) => match next {
                    Err(_) => {
                        return Ok(StreamEnd::Transient(format!(
                            "no frame within {:?} idle window",
                            self.idle_timeout
                        )));
                    }
                    Ok(None) => return Ok(StreamEnd::Transient("socket closed by upstream".into())),
                    Ok(Some(Err(e))) => return Ok(StreamEnd::Transient(format!("ws error: {e}"))),
                    Ok(Some(Ok(m))) => m,
                },
            };

            if msg.is_close() {
                return Ok(StreamEnd::Transient("close frame received".into()));
            }
            if msg.is_ping() || msg.is_pong() {
                continue;
            }
            let Message::Text(txt) = msg else { continue };

            match serde_json::from_str::<ServerFrame>(&txt) {
                Ok(ServerFrame::Welcome) => {
                    debug!(
                        "[Firehose] welcome received; subscribing to {} account(s)",
                        self.follow.len()
                    );
                    let sub = ClientFrame::Subscribe {
                        follow: self.follow.iter().cloned().collect(),
                    };
                    ws.send(Message::Text(serde_json::to_string(&sub)?.into()))
                        .await
                        .map_err(|e| Error::Platform(format!("subscribe send failed: {e}")))?;
                    self.mark_streaming();
                }
                Ok(ServerFrame::Keepalive) => trace!("[Firehose] keepalive"),
                Ok(ServerFrame::Post { data }) => {
                    // First event also counts as open acknowledgment.
                    self.mark_streaming();
                    debug!(
                        "[Firehose] post {} from @{}",
                        data.post_id, data.author_name
                    );
                    self.event_bus.publish_post(data);
                }
                Ok(ServerFrame::RateLimited) => {
                    let _ = ws.close(None).await;
                    return Err(Error::RateLimited);
                }
                Ok(ServerFrame::AuthError { reason }) => {
                    let _ = ws.close(None).await;
                    return Err(Error::Auth(
                        reason.unwrap_or_else(|| "stream auth rejected".into()),
                    ));
                }
                Err(e) => warn!("[Firehose] malformed frame skipped => {}", e),
            }
        }
    }

    fn mark_streaming(&mut self) {
        if self.connection_status != ConnectionStatus::Streaming {
            info!(
                "[Firehose] streaming ({} tracked account(s))",
                self.follow.len()
            );
            self.connection_status = ConnectionStatus::Streaming;
            self.backoff.reset();
            self.event_bus.publish_system("streaming");
        }
    }
}

/// Handshake rejections carry intent: 401/403 mean bad credentials, 420/429
/// mean we are being rate limited. Anything else is worth a retry.
fn classify_connect_error(e: WsError) -> Error {
    match &e {
        WsError::Http(resp) => match resp.status().as_u16() {
            401 | 403 => Error::Auth(format!("stream handshake rejected: HTTP {}", resp.status())),
            420 | 429 => Error::RateLimited,
            code => Error::Platform(format!("stream handshake failed: HTTP {code}")),
        },
        _ => Error::Platform(format!("stream connect failed: {e}")),
    }
}
