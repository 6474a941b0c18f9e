//! Relay orchestration.
//!
//! # Responsibilities
//! - Validate connection options before anything is opened
//! - Drive one channel per `create()` through the session handshake
//! - Keep the session table in step with channel lifecycle events
//! - Relay every request event on its own task and emit exactly one envelope
//!
//! # Data Flow
//! ```text
//! create(options)
//!     → validate → Transport::open → ConnectionDriver task
//! ChannelEvent::Message("<prefix>_create")  → SessionRegistry::insert → settle Ok(Connection)
//! ChannelEvent::ConnectError                → SessionRegistry::remove → settle Err (once)
//! ChannelEvent::Disconnected                → SessionRegistry::remove
//! ChannelEvent::Message("<prefix>_request") → spawn: body → call → dispatch → decode
//!                                             → emit "<prefix>_response" {beacon, ...}
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

use crate::channel::{ChannelEvent, Emitter, EventNames, Transport, WebSocketTransport};
use crate::config::validation::{validate_connection, ValidationError};
use crate::config::{ConfigError, ConnectionOptions, RelayConfig};
use crate::observability::metrics;
use crate::relay::call::{build_call_options, target_url};
use crate::relay::connection::{Connection, ConnectionId, ConnectionState};
use crate::relay::decoder::{decode, DecodedResponse};
use crate::relay::descriptor::{Beacon, RequestDescriptor, ResponseEnvelope};
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::outbound::{Dispatch, HttpDispatcher};
use crate::relay::session::{Session, SessionRegistry};

/// Creates relay connections and answers session lookups.
pub struct RelayClient<T, D> {
    transport: T,
    dispatcher: Arc<D>,
    registry: SessionRegistry,
    events: EventNames,
}

impl RelayClient<WebSocketTransport, HttpDispatcher> {
    /// WebSocket transport and `reqwest` dispatcher configured from `config`.
    pub fn from_config(config: &RelayConfig) -> RelayResult<Self> {
        let transport = WebSocketTransport::new(&config.channel);
        let dispatcher = HttpDispatcher::new(&config.outbound)?;
        Ok(Self::new(transport, dispatcher).with_events(EventNames::new(&config.channel.event_prefix)))
    }
}

impl<T: Transport, D: Dispatch> RelayClient<T, D> {
    pub fn new(transport: T, dispatcher: D) -> Self {
        Self {
            transport,
            dispatcher: Arc::new(dispatcher),
            registry: SessionRegistry::new(),
            events: EventNames::default(),
        }
    }

    pub fn with_events(mut self, events: EventNames) -> Self {
        self.events = events;
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Open a new connection to `options.server`.
    ///
    /// Invalid options fail here, before any connection attempt. The returned
    /// future settles with the connection once the server sends session-create,
    /// or with an error on the first connect error. Must be called from within
    /// a tokio runtime.
    pub fn create(&self, options: &ConnectionOptions) -> RelayResult<PendingConnection> {
        validate_connection(options).map_err(ConfigError::Validation)?;

        let (server, base) = match (options.server(), options.target_base()) {
            (Some(server), Some(base)) => (server, base),
            (None, _) => return Err(config_error(ValidationError::MissingServer)),
            (_, None) => return Err(config_error(ValidationError::MissingTarget)),
        };
        let server = Url::parse(server)
            .map_err(|_| config_error(ValidationError::InvalidServer(server.to_string())))?;

        let id = ConnectionId::new();
        let (state, _) = watch::channel(ConnectionState::Idle);
        let channel = self.transport.open(&server);
        state.send_replace(ConnectionState::Connecting);

        tracing::info!(connection = %id, server = %server, target = %base, "Connection created");

        let (settle, settled) = oneshot::channel();
        let driver = ConnectionDriver {
            id,
            context: Arc::new(RequestContext {
                connection: id,
                base,
                dispatcher: self.dispatcher.clone(),
                emitter: channel.emitter.clone(),
                response_event: self.events.response.clone(),
            }),
            events: self.events.clone(),
            registry: self.registry.clone(),
            state,
            settle: Some(settle),
        };
        tokio::spawn(driver.run(channel.events));

        Ok(PendingConnection { id, settled })
    }

    /// Session for a connection, if one is currently established.
    pub fn session(&self, connection: &Connection) -> Option<Session> {
        self.registry.get(connection.id())
    }
}

fn config_error(error: ValidationError) -> RelayError {
    ConfigError::Validation(vec![error]).into()
}

/// Future returned by [`RelayClient::create`].
#[derive(Debug)]
pub struct PendingConnection {
    id: ConnectionId,
    settled: oneshot::Receiver<RelayResult<Connection>>,
}

impl PendingConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Future for PendingConnection {
    type Output = RelayResult<Connection>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.settled)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(RelayError::ChannelClosed)))
    }
}

/// Owns one channel's event stream for the lifetime of the connection.
struct ConnectionDriver<D> {
    id: ConnectionId,
    context: Arc<RequestContext<D>>,
    events: EventNames,
    registry: SessionRegistry,
    state: watch::Sender<ConnectionState>,
    settle: Option<oneshot::Sender<RelayResult<Connection>>>,
}

impl<D: Dispatch> ConnectionDriver<D> {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<ChannelEvent>) {
        loop {
            let settled = self.settle.is_none();
            let event = tokio::select! {
                event = events.recv() => event,
                _ = self.state.closed(), if settled => {
                    tracing::debug!(connection = %self.id, "All connection handles dropped");
                    None
                }
            };
            let Some(event) = event else { break };
            self.handle(event);
        }

        self.registry.remove(self.id);
        self.state.send_replace(ConnectionState::Closed);
        if let Some(settle) = self.settle.take() {
            let _ = settle.send(Err(RelayError::ChannelClosed));
        }
        tracing::info!(connection = %self.id, "Connection closed");
    }

    fn handle(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                metrics::record_channel_event("connect");
                tracing::debug!(connection = %self.id, "Awaiting session");
                self.state.send_replace(ConnectionState::AwaitingSession);
            }
            ChannelEvent::Disconnected { reason } => {
                metrics::record_channel_event("disconnect");
                tracing::warn!(connection = %self.id, reason = %reason, "Channel disconnected");
                self.registry.remove(self.id);
                self.state.send_replace(ConnectionState::Connecting);
            }
            ChannelEvent::ConnectError(error) => {
                metrics::record_channel_event("connect_error");
                tracing::warn!(connection = %self.id, error = %error, "Channel connect error");
                self.registry.remove(self.id);
                if let Some(settle) = self.settle.take() {
                    let _ = settle.send(Err(RelayError::Connect(error)));
                }
            }
            ChannelEvent::Message(frame) if frame.event == self.events.create => {
                metrics::record_channel_event("create");
                self.on_session(Session(frame.data));
            }
            ChannelEvent::Message(frame) if frame.event == self.events.request => {
                metrics::record_channel_event("request");
                let context = self.context.clone();
                tokio::spawn(async move { context.handle(frame.data).await });
            }
            ChannelEvent::Message(frame) => {
                tracing::debug!(connection = %self.id, event = %frame.event, "Ignoring event");
            }
        }
    }

    fn on_session(&mut self, session: Session) {
        tracing::info!(
            connection = %self.id,
            hostname = session.hostname().unwrap_or("-"),
            "Session established"
        );
        self.registry.insert(self.id, session);
        self.state.send_replace(ConnectionState::Ready);

        if let Some(settle) = self.settle.take() {
            let connection = Connection::new(
                self.id,
                self.context.emitter.clone(),
                self.state.subscribe(),
            );
            if settle.send(Ok(connection)).is_err() {
                tracing::debug!(connection = %self.id, "Create handle dropped before settling");
            }
        }
    }
}

/// Everything a request task needs; shared read-only across tasks.
struct RequestContext<D> {
    connection: ConnectionId,
    base: String,
    dispatcher: Arc<D>,
    emitter: Emitter,
    response_event: String,
}

impl<D: Dispatch> RequestContext<D> {
    async fn handle(&self, payload: Value) {
        let start = Instant::now();

        let envelope = match RequestDescriptor::deserialize(&payload) {
            Ok(descriptor) => {
                let beacon = descriptor.beacon.clone();
                match relay(self.dispatcher.as_ref(), &self.base, &descriptor).await {
                    Ok(decoded) => {
                        tracing::debug!(connection = %self.connection, beacon = %beacon, "Relayed request");
                        metrics::record_request("success", start);
                        ResponseEnvelope::success(beacon, decoded.headers, decoded.response)
                    }
                    Err(e) => self.failure(beacon, e, start),
                }
            }
            Err(e) => match Beacon::recover(&payload) {
                Some(beacon) => self.failure(beacon, RelayError::Descriptor(e), start),
                None => {
                    tracing::warn!(connection = %self.connection, error = %e, "Dropping request without beacon");
                    metrics::record_request("descriptor", start);
                    return;
                }
            },
        };

        if let Err(e) = self.emitter.emit(&self.response_event, &envelope) {
            tracing::warn!(
                connection = %self.connection,
                beacon = %envelope.beacon,
                error = %e,
                "Failed to emit response"
            );
        }
    }

    fn failure(&self, beacon: Beacon, error: RelayError, start: Instant) -> ResponseEnvelope {
        tracing::error!(
            connection = %self.connection,
            beacon = %beacon,
            kind = error.kind(),
            error = %error,
            "Relay request failed"
        );
        metrics::record_request(error.kind(), start);
        ResponseEnvelope::failure(beacon, error.describe())
    }
}

/// Perform one descriptor against `base` and decode the result.
pub async fn relay<D: Dispatch>(
    dispatcher: &D,
    base: &str,
    descriptor: &RequestDescriptor,
) -> RelayResult<DecodedResponse> {
    let url = target_url(base, descriptor);
    let call = build_call_options(descriptor);
    tracing::debug!(url = %url, method = call.method.as_deref().unwrap_or("GET"), "Dispatching");
    let response = dispatcher.dispatch(url, call).await?;
    decode(response).await
}
