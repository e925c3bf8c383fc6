//! Per-connection relay between one browser client and one model-service
//! session.
//!
//! The relay pumps messages in both directions concurrently and intercepts a
//! small set of event kinds: outbound session configuration gets the tool
//! schemas and fixed instructions injected; inbound function-call events are
//! dispatched to the tool invoker without blocking pass-through traffic, and
//! their results are written back upstream as `function_call_output` items.
//! Everything else - audio deltas in particular - crosses as raw text.
//!
//! Each spawned tool invocation owns its own completion: it writes its result
//! through the upstream writer channel when it finishes, so slow tools delay
//! only their own result, never the audio stream or other sessions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as ClientMessage, WebSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tracing::{debug, error, info, warn};

use crate::core::tools::{ToolDirection, ToolInvoker, ToolRegistry};

use super::config::RelaySettings;
use super::messages::{
    EventItem, FunctionCallArgumentsDone, FunctionOutputEvent, RelayErrorEvent, ToolResponseEvent,
    event_type, response_create,
};
use super::upstream::{self, UpstreamSocket};
use super::rewrite;

/// Buffer size for the per-direction writer channels.
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Consecutive malformed messages from one peer before the session closes.
const MALFORMED_CLOSE_THRESHOLD: u32 = 8;

/// How long teardown waits for queued client-bound messages to flush.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle of one relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    /// Opening the paired upstream connection
    #[default]
    Connecting,
    /// Upstream open, waiting for the first session configuration
    Negotiating,
    /// Both pumps running
    Active,
    /// Tearing down, flushing client-bound messages
    Closing,
    /// Both ends closed
    Closed,
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::Connecting => write!(f, "Connecting"),
            RelayState::Negotiating => write!(f, "Negotiating"),
            RelayState::Active => write!(f, "Active"),
            RelayState::Closing => write!(f, "Closing"),
            RelayState::Closed => write!(f, "Closed"),
        }
    }
}

/// One in-flight tool call, keyed by the model service's call id.
#[derive(Debug, Clone)]
struct PendingCall {
    call_id: String,
    name: String,
}

/// Client-bound writer routes.
enum ClientBound {
    Text(String),
    Binary(Bytes),
    Close,
}

/// Upstream-bound writer routes.
enum UpstreamBound {
    Text(String),
    Binary(Bytes),
    Pong(Bytes),
}

/// Relay for a single conversation.
pub struct SessionRelay {
    session_id: String,
    settings: Arc<RelaySettings>,
    schemas: Arc<Vec<Value>>,
    invoker: ToolInvoker,
    state: RelayState,
    pending: HashMap<String, PendingCall>,
    negotiated: bool,
    malformed_client: u32,
    malformed_upstream: u32,
}

impl SessionRelay {
    pub fn new(registry: Arc<ToolRegistry>, settings: Arc<RelaySettings>) -> Self {
        let schemas = Arc::new(registry.schemas());
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            settings,
            schemas,
            invoker: ToolInvoker::new(registry),
            state: RelayState::default(),
            pending: HashMap::new(),
            negotiated: false,
            malformed_client: 0,
            malformed_upstream: 0,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Run the session to completion. Consumes the relay; returns when both
    /// ends are closed.
    pub async fn run(mut self, client: WebSocket) {
        info!(session = %self.session_id, "relay session starting");

        let upstream = match upstream::connect(&self.settings).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(session = %self.session_id, error = %e, "failed to open upstream connection");
                self.refuse_client(client).await;
                return;
            }
        };
        self.state = RelayState::Negotiating;

        let (client_sink, client_stream) = client.split();
        let (upstream_sink, upstream_stream) = upstream.split();

        let (client_tx, client_rx) = mpsc::channel::<ClientBound>(CHANNEL_BUFFER_SIZE);
        let (upstream_tx, upstream_rx) = mpsc::channel::<UpstreamBound>(CHANNEL_BUFFER_SIZE);

        let client_writer = tokio::spawn(write_client(client_rx, client_sink));
        let upstream_writer = tokio::spawn(write_upstream(upstream_rx, upstream_sink));

        self.pump(client_stream, upstream_stream, &client_tx, &upstream_tx)
            .await;

        // Teardown: flush already-queued client-bound messages, then close.
        // In-flight tool invocations are abandoned; their sends fail once the
        // writers are gone.
        self.state = RelayState::Closing;
        if !self.pending.is_empty() {
            debug!(
                session = %self.session_id,
                abandoned = self.pending.len(),
                "abandoning in-flight tool calls"
            );
        }
        let _ = client_tx.send(ClientBound::Close).await;
        drop(client_tx);
        drop(upstream_tx);
        let _ = tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, client_writer).await;
        upstream_writer.abort();

        self.state = RelayState::Closed;
        info!(session = %self.session_id, "relay session terminated");
    }

    /// Upstream could not be opened: tell the client, then close.
    async fn refuse_client(&mut self, client: WebSocket) {
        self.state = RelayState::Closing;
        let (mut sink, _stream) = client.split();
        let event = RelayErrorEvent::new(
            "upstream_unavailable",
            "The assistant service is unavailable right now. Please try again later.",
        );
        if let Ok(json) = serde_json::to_string(&event) {
            let _ = sink.send(ClientMessage::Text(json.into())).await;
        }
        let _ = sink.send(ClientMessage::Close(None)).await;
        self.state = RelayState::Closed;
    }

    /// Run both pumps until either peer goes away.
    async fn pump(
        &mut self,
        mut client_stream: SplitStream<WebSocket>,
        mut upstream_stream: SplitStream<UpstreamSocket>,
        client_tx: &mpsc::Sender<ClientBound>,
        upstream_tx: &mpsc::Sender<UpstreamBound>,
    ) {
        loop {
            tokio::select! {
                msg = client_stream.next() => match msg {
                    Some(Ok(msg)) => {
                        if !self.on_client_message(msg, upstream_tx).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(session = %self.session_id, error = %e, "client socket error");
                        break;
                    }
                    None => {
                        info!(session = %self.session_id, "client closed the connection");
                        break;
                    }
                },
                msg = upstream_stream.next() => match msg {
                    Some(Ok(msg)) => {
                        if !self.on_upstream_message(msg, client_tx, upstream_tx).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(session = %self.session_id, error = %e, "upstream socket error");
                        break;
                    }
                    None => {
                        info!(session = %self.session_id, "model service closed the connection");
                        break;
                    }
                },
            }
        }
    }

    /// Handle one client frame. Returns false when the session should end.
    async fn on_client_message(
        &mut self,
        msg: ClientMessage,
        upstream_tx: &mpsc::Sender<UpstreamBound>,
    ) -> bool {
        match msg {
            ClientMessage::Text(text) => {
                let parsed: Value = match serde_json::from_str(&text) {
                    Ok(v) => v,
                    Err(e) => return self.client_protocol_error(&e.to_string()),
                };
                self.malformed_client = 0;

                let outbound = if event_type(&parsed) == Some("session.update") {
                    let rewritten =
                        rewrite::configure_session(parsed, &self.schemas, &self.settings);
                    if !self.negotiated {
                        self.negotiated = true;
                        self.state = RelayState::Active;
                        debug!(
                            session = %self.session_id,
                            tools = self.schemas.len(),
                            "session configuration negotiated"
                        );
                    }
                    match serde_json::to_string(&rewritten) {
                        Ok(json) => json,
                        Err(e) => {
                            error!(session = %self.session_id, error = %e, "failed to serialize session config");
                            return true;
                        }
                    }
                } else {
                    text.to_string()
                };

                upstream_tx.send(UpstreamBound::Text(outbound)).await.is_ok()
            }
            ClientMessage::Binary(data) => upstream_tx
                .send(UpstreamBound::Binary(data))
                .await
                .is_ok(),
            ClientMessage::Ping(_) | ClientMessage::Pong(_) => true,
            ClientMessage::Close(_) => {
                info!(session = %self.session_id, "client sent close frame");
                false
            }
        }
    }

    /// Handle one upstream frame. Returns false when the session should end.
    async fn on_upstream_message(
        &mut self,
        msg: UpstreamMessage,
        client_tx: &mpsc::Sender<ClientBound>,
        upstream_tx: &mpsc::Sender<UpstreamBound>,
    ) -> bool {
        match msg {
            UpstreamMessage::Text(text) => {
                let parsed: Value = match serde_json::from_str(&text) {
                    Ok(v) => v,
                    Err(e) => return self.upstream_protocol_error(&e.to_string()),
                };
                self.malformed_upstream = 0;

                match self.route_upstream_event(parsed, &text, client_tx, upstream_tx) {
                    Some(outbound) => client_tx.send(ClientBound::Text(outbound)).await.is_ok(),
                    None => true,
                }
            }
            UpstreamMessage::Binary(data) => {
                client_tx.send(ClientBound::Binary(data)).await.is_ok()
            }
            UpstreamMessage::Ping(data) => {
                upstream_tx.send(UpstreamBound::Pong(data)).await.is_ok()
            }
            UpstreamMessage::Pong(_) | UpstreamMessage::Frame(_) => true,
            UpstreamMessage::Close(_) => {
                info!(session = %self.session_id, "model service sent close frame");
                false
            }
        }
    }

    /// Classify one upstream event. Returns the text to forward to the
    /// client, or None when the event is swallowed.
    fn route_upstream_event(
        &mut self,
        parsed: Value,
        raw: &str,
        client_tx: &mpsc::Sender<ClientBound>,
        upstream_tx: &mpsc::Sender<UpstreamBound>,
    ) -> Option<String> {
        match event_type(&parsed) {
            Some("session.created") => {
                let scrubbed = rewrite::scrub_session_created(parsed);
                serde_json::to_string(&scrubbed).ok()
            }
            Some("conversation.item.created") | Some("response.output_item.added") => {
                match EventItem::from_message(&parsed) {
                    Some(item) if item.is_function_call() => {
                        self.record_pending(item);
                        None
                    }
                    Some(item) if item.is_function_call_output() => None,
                    _ => Some(raw.to_string()),
                }
            }
            Some("response.function_call_arguments.delta") => None,
            Some("response.function_call_arguments.done") => {
                match serde_json::from_value::<FunctionCallArgumentsDone>(parsed) {
                    Ok(done) => self.dispatch_call(done, client_tx, upstream_tx),
                    Err(e) => {
                        warn!(session = %self.session_id, error = %e, "malformed function call completion");
                    }
                }
                None
            }
            Some("response.output_item.done") => match EventItem::from_message(&parsed) {
                Some(item) if item.is_function_call() => None,
                _ => Some(raw.to_string()),
            },
            Some("response.done") => {
                let (stripped, changed) = rewrite::strip_tool_output(parsed);
                if changed {
                    serde_json::to_string(&stripped).ok()
                } else {
                    Some(raw.to_string())
                }
            }
            // Unknown and pass-through kinds cross verbatim
            _ => Some(raw.to_string()),
        }
    }

    /// Track a function call announced by the model service. A duplicate
    /// call id is a protocol violation; the original call wins.
    fn record_pending(&mut self, item: EventItem) {
        let (Some(call_id), Some(name)) = (item.call_id, item.name) else {
            warn!(session = %self.session_id, "function call item without call_id or name");
            return;
        };
        if self.pending.contains_key(&call_id) {
            warn!(session = %self.session_id, call_id = %call_id, "duplicate call id from model service");
            return;
        }
        debug!(session = %self.session_id, call_id = %call_id, tool = %name, "tracking function call");
        self.pending.insert(
            call_id.clone(),
            PendingCall { call_id, name },
        );
    }

    /// Resolve a pending call: run its tool off the pump loop and write the
    /// result upstream when it completes. Exactly one outcome per call id.
    fn dispatch_call(
        &mut self,
        done: FunctionCallArgumentsDone,
        client_tx: &mpsc::Sender<ClientBound>,
        upstream_tx: &mpsc::Sender<UpstreamBound>,
    ) {
        let Some(call) = self.pending.remove(&done.call_id) else {
            warn!(
                session = %self.session_id,
                call_id = %done.call_id,
                "arguments completed for unknown call id"
            );
            return;
        };

        let invoker = self.invoker.clone();
        let upstream_tx = upstream_tx.clone();
        let client_tx = client_tx.clone();
        let session_id = self.session_id.clone();

        tokio::spawn(async move {
            let outcome = invoker.invoke(&call.name, &done.arguments).await;

            // TO_CLIENT results are not placed in the model's context; the
            // model only needs to know the call completed.
            let output = match outcome.direction {
                ToolDirection::ToServer => outcome.payload.clone(),
                ToolDirection::ToClient => String::new(),
            };

            let event = FunctionOutputEvent::new(call.call_id.clone(), output);
            let Ok(json) = serde_json::to_string(&event) else {
                return;
            };
            if upstream_tx.send(UpstreamBound::Text(json)).await.is_err() {
                debug!(
                    session = %session_id,
                    call_id = %call.call_id,
                    "session closed before tool result could be written"
                );
                return;
            }
            if let Ok(json) = serde_json::to_string(&response_create()) {
                let _ = upstream_tx.send(UpstreamBound::Text(json)).await;
            }

            if outcome.direction == ToolDirection::ToClient {
                let payload = rewrite::redact_source_keys(&outcome.payload);
                let event = ToolResponseEvent::new(call.name.clone(), payload);
                if let Ok(json) = serde_json::to_string(&event) {
                    let _ = client_tx.send(ClientBound::Text(json)).await;
                }
            }
        });
    }

    fn client_protocol_error(&mut self, detail: &str) -> bool {
        self.malformed_client += 1;
        warn!(
            session = %self.session_id,
            count = self.malformed_client,
            error = %detail,
            "malformed message from client dropped"
        );
        if self.malformed_client >= MALFORMED_CLOSE_THRESHOLD {
            error!(session = %self.session_id, "too many malformed client messages, closing");
            return false;
        }
        true
    }

    fn upstream_protocol_error(&mut self, detail: &str) -> bool {
        self.malformed_upstream += 1;
        warn!(
            session = %self.session_id,
            count = self.malformed_upstream,
            error = %detail,
            "malformed message from model service dropped"
        );
        if self.malformed_upstream >= MALFORMED_CLOSE_THRESHOLD {
            error!(session = %self.session_id, "too many malformed upstream messages, closing");
            return false;
        }
        true
    }
}

/// Drain the client-bound channel into the client socket.
async fn write_client(
    mut rx: mpsc::Receiver<ClientBound>,
    mut sink: SplitSink<WebSocket, ClientMessage>,
) {
    while let Some(route) = rx.recv().await {
        let result = match route {
            ClientBound::Text(text) => sink.send(ClientMessage::Text(text.into())).await,
            ClientBound::Binary(data) => sink.send(ClientMessage::Binary(data)).await,
            ClientBound::Close => {
                let _ = sink.send(ClientMessage::Close(None)).await;
                break;
            }
        };
        if let Err(e) = result {
            debug!(error = %e, "client writer stopping");
            break;
        }
    }
}

/// Drain the upstream-bound channel into the model-service socket.
async fn write_upstream(
    mut rx: mpsc::Receiver<UpstreamBound>,
    mut sink: SplitSink<UpstreamSocket, UpstreamMessage>,
) {
    while let Some(route) = rx.recv().await {
        let result = match route {
            UpstreamBound::Text(text) => sink.send(UpstreamMessage::Text(text.into())).await,
            UpstreamBound::Binary(data) => sink.send(UpstreamMessage::Binary(data)).await,
            UpstreamBound::Pong(data) => sink.send(UpstreamMessage::Pong(data)).await,
        };
        if let Err(e) = result {
            debug!(error = %e, "upstream writer stopping");
            break;
        }
    }
}
