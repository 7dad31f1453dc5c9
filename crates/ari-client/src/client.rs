//! The client facade: connection lifecycle, operation dispatch, and the
//! shared state every resource instance calls back into.
//!
//! Grounded on `alloy-core::bot::BotManager` for the identity-keyed routing
//! tables (`instance_listeners`, `managed_instances` are both keyed by
//! identity, never by Rust object identity) and on `alloy-runtime::runtime`
//! for the `connect`/`start`/`stop` lifecycle shape.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use ari_core::resource::{build_instance, ClientHandle, Instance, InstanceArgs, OperationOutcome, OperationTables, ResourceKind};
use ari_core::schema::{OperationSpec, Schema};
use ari_core::{ArcListener, ClientError, ClientResult, Connection, Emitter, ListenerId, Promoted, RawEvent, Scheme};
use ari_transport::{ClientConfig, WsFrame, WsHandle, WsLifecycleEvent};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::dispatch;

/// Global listener signature: raw frame plus whatever instances were
/// promoted from it.
pub type GlobalListener = ArcListener<(RawEvent, Promoted)>;

pub(crate) struct ScopedListener {
    pub id: ListenerId,
    pub identity: String,
    pub once: bool,
    pub listener: Arc<dyn Fn(Value) + Send + Sync>,
}

/// Namespace-level operation tables for `asterisk`, `applications`, and
/// `events` — not instantiable, but still callable (§3).
pub(crate) struct NamespaceTables(pub HashMap<String, HashMap<String, OperationSpec>>);

pub(crate) struct ClientInner {
    pub connection: Connection,
    pub schema: Schema,
    pub http: reqwest::Client,
    pub config: ClientConfig,
    pub operations: OperationTables,
    pub namespaces: NamespaceTables,
    pub global_emitter: Emitter<GlobalListener>,
    pub instance_listeners: Mutex<HashMap<(String, ResourceKind), Vec<ScopedListener>>>,
    pub managed_instances: Mutex<HashSet<(ResourceKind, String)>>,
    pub ws_handle: Mutex<Option<WsHandle>>,
    pub closed_on_purpose: AtomicBool,
}

/// A connected ARI client. Cheap to clone — all state lives behind the
/// inner `Arc`.
#[derive(Clone)]
pub struct Client(pub(crate) Arc<ClientInner>);

/// Parses a `{scheme}://{host}` URL into a [`Connection`]. Accepts
/// `http`/`https` (and, leniently, `ws`/`wss`, normalized to their HTTP
/// companions since the schema and WS endpoints share one connection).
fn parse_connection(url: &str, user: &str, secret: &str) -> ClientResult<Connection> {
    let parsed = Url::parse(url).map_err(|e| ClientError::Protocol {
        reason: format!("`{url}` is not a valid ARI server URL: {e}"),
    })?;
    let scheme = match parsed.scheme() {
        "http" | "ws" => Scheme::Http,
        "https" | "wss" => Scheme::Https,
        other => {
            return Err(ClientError::Protocol {
                reason: format!("unsupported scheme `{other}`"),
            })
        }
    };
    let host = parsed.host_str().ok_or_else(|| ClientError::Protocol {
        reason: format!("`{url}` has no host"),
    })?;
    let host = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Ok(Connection::new(scheme, host, user, secret))
}

/// Connects to an ARI server: loads the schema and builds the per-kind
/// operation tables, but does not open the WebSocket (§4.6).
pub async fn connect(url: &str, user: &str, secret: &str) -> ClientResult<Client> {
    connect_with_config(url, user, secret, ClientConfig::default()).await
}

/// As [`connect`], with an explicit [`ClientConfig`] (request timeout and
/// WebSocket reconnection policy).
pub async fn connect_with_config(url: &str, user: &str, secret: &str, config: ClientConfig) -> ClientResult<Client> {
    let connection = parse_connection(url, user, secret)?;

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| ClientError::ApiLoad { reason: e.to_string() })?;

    info!(host = %connection.host, "loading ARI schema");
    let schema = ari_transport::load_schema(&http, &connection).await?;

    let operations = build_operation_tables(&schema);
    let namespaces = build_namespace_tables(&schema);

    let inner = ClientInner {
        connection,
        schema,
        http,
        config,
        operations,
        namespaces,
        global_emitter: Emitter::new(),
        instance_listeners: Mutex::new(HashMap::new()),
        managed_instances: Mutex::new(HashSet::new()),
        ws_handle: Mutex::new(None),
        closed_on_purpose: AtomicBool::new(false),
    };

    Ok(Client(Arc::new(inner)))
}

fn build_operation_tables(schema: &Schema) -> OperationTables {
    let mut map = HashMap::new();
    for kind in ResourceKind::ALL {
        let ops = schema.resources.get(kind.resource_group()).cloned().unwrap_or_default();
        map.insert(kind, ops);
    }
    OperationTables(map)
}

fn build_namespace_tables(schema: &Schema) -> NamespaceTables {
    let mut map = HashMap::new();
    for name in ["asterisk", "applications", "events"] {
        if let Some(ops) = schema.resources.get(name) {
            map.insert(name.to_string(), ops.clone());
        }
    }
    NamespaceTables(map)
}

impl Client {
    pub(crate) fn weak_handle(&self) -> Weak<dyn ClientHandle> {
        Arc::downgrade(&self.0) as Weak<dyn ClientHandle>
    }

    /// Opens the event WebSocket with the given application names
    /// (comma-joined on the wire) and starts the dispatch loop that feeds
    /// the event demultiplexer (§4.4/§4.5).
    pub async fn start(&self, apps: impl IntoIterator<Item = impl Into<String>>) -> ClientResult<()> {
        self.0.closed_on_purpose.store(false, Ordering::SeqCst);
        let apps: Vec<String> = apps.into_iter().map(Into::into).collect();

        let (handle, mut lifecycle_rx, mut frame_rx) =
            ari_transport::ws::connect(&self.0.connection, &apps, self.0.config.ws.clone()).await?;

        *self.0.ws_handle.lock() = Some(handle);

        let client = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = frame_rx.recv() => {
                        match frame {
                            Some(frame) => client.handle_frame(frame),
                            None => break,
                        }
                    }
                    event = lifecycle_rx.recv() => {
                        match event {
                            Some(event) => client.handle_lifecycle(event),
                            None => break,
                        }
                    }
                }
            }
        });

        Ok(())
    }

    fn handle_frame(&self, frame: WsFrame) {
        if let Err(err) = dispatch::dispatch_frame(self, &frame.0) {
            warn!(error = %err, "dropping malformed event frame");
        }
    }

    fn handle_lifecycle(&self, event: WsLifecycleEvent) {
        let (event_type, raw) = match event {
            WsLifecycleEvent::Connected => ("WebSocketConnected", serde_json::json!({})),
            WsLifecycleEvent::Reconnecting => ("WebSocketReconnecting", serde_json::json!({})),
            WsLifecycleEvent::MaxRetries { last_error } => (
                "WebSocketMaxRetries",
                serde_json::json!({ "error": last_error }),
            ),
        };
        self.0
            .global_emitter
            .emit_and_sweep((RawEvent::new(event_type, raw), Promoted::None));
    }

    /// Closes the event WebSocket and inhibits reconnection until `start`
    /// is called again (I6).
    pub fn stop(&self) {
        self.0.closed_on_purpose.store(true, Ordering::SeqCst);
        if let Some(handle) = self.0.ws_handle.lock().take() {
            handle.stop();
        }
    }

    /// Registers a global listener, fired for every event with its
    /// promoted instances.
    pub fn on(&self, listener: GlobalListener) -> ListenerId {
        self.0.global_emitter.on(listener)
    }

    /// As [`Client::on`], firing at most once (I5).
    pub fn once(&self, listener: GlobalListener) -> ListenerId {
        self.0.global_emitter.once(listener)
    }

    /// Removes a previously registered global listener. Idempotent.
    pub fn off(&self, id: ListenerId) {
        self.0.global_emitter.off(id);
    }

    /// Invokes a namespace-only operation (`asterisk`, `applications`,
    /// `events` — none of which are instantiable, §3).
    pub async fn call_namespace(&self, namespace: &str, op: &str, options: Value) -> ClientResult<OperationOutcome> {
        let spec = self
            .0
            .namespaces
            .0
            .get(namespace)
            .and_then(|ops| ops.get(op))
            .ok_or_else(|| ClientError::Operation(format!("unknown operation `{namespace}.{op}`")))?;
        let options = as_object(options);
        ari_transport::http::invoke(&self.0.http, &self.0.connection, spec, &options).await
    }

    /// Builds a fresh instance of `kind` from `args`, bound to this client.
    pub fn instance(&self, kind: ResourceKind, args: InstanceArgs) -> ClientResult<Instance> {
        build_instance(kind, args, self.weak_handle())
    }
}

fn as_object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

#[async_trait]
impl ClientHandle for ClientInner {
    async fn call_operation(
        &self,
        kind: ResourceKind,
        op: &str,
        identity: Option<&str>,
        options: Value,
    ) -> ClientResult<OperationOutcome> {
        let spec = self
            .operations
            .get(kind, op)
            .ok_or_else(|| ClientError::Operation(format!("unknown operation `{}.{op}`", kind.resource_group())))?;

        let mut options = as_object(options);
        if let Some(identity) = identity {
            inject_identity(kind, identity, spec, &mut options);
        }

        ari_transport::http::invoke(&self.http, &self.connection, spec, &options).await
    }

    fn on_scoped(
        &self,
        event_name: &str,
        kind: ResourceKind,
        identity: &str,
        once: bool,
        listener: Arc<dyn Fn(Value) + Send + Sync>,
    ) -> ListenerId {
        let id = ListenerId::fresh();
        self.instance_listeners
            .lock()
            .entry((event_name.to_string(), kind))
            .or_default()
            .push(ScopedListener {
                id,
                identity: identity.to_string(),
                once,
                listener,
            });
        id
    }

    fn off_scoped(&self, event_name: &str, kind: ResourceKind, id: ListenerId) {
        if let Some(list) = self.instance_listeners.lock().get_mut(&(event_name.to_string(), kind)) {
            list.retain(|l| l.id != id);
        }
    }

    fn manage(&self, kind: ResourceKind, identity: &str) {
        self.managed_instances.lock().insert((kind, identity.to_string()));
    }

    fn is_managed(&self, kind: ResourceKind, identity: &str) -> bool {
        self.managed_instances.lock().contains(&(kind, identity.to_string()))
    }
}

/// Auto-injects `identity` into whichever declared parameter matches
/// `kind`'s identity attribute (I2), handling the `Endpoint` composite
/// `technology/resource` special case (DESIGN.md Open Question 2).
///
/// Matches against every parameter the operation declares, not just path
/// placeholders: a `create` operation binds its identity as a *query*
/// parameter (`POST /bridges?bridgeId=...`), while `get`/`delete` bind it in
/// the path — both must be auto-injectable the same way (S3).
fn inject_identity(kind: ResourceKind, identity: &str, spec: &OperationSpec, options: &mut serde_json::Map<String, Value>) {
    let param_names: Vec<&str> = spec.params.iter().map(|p| p.name.as_str()).collect();

    if kind == ResourceKind::Endpoint {
        if let Some((tech, resource)) = identity.split_once('/') {
            if param_names.contains(&"tech") {
                options.insert("tech".to_string(), Value::String(tech.to_string()));
            }
            if param_names.contains(&"resource") {
                options.insert("resource".to_string(), Value::String(resource.to_string()));
            }
        }
        if param_names.contains(&"endpointId") {
            options.insert("endpointId".to_string(), Value::String(identity.to_string()));
        }
        return;
    }

    let attr = kind.identity_attr();
    let param_name = param_names
        .iter()
        .find(|p| p.eq_ignore_ascii_case(&format!("{}{}", kind_param_prefix(kind), capitalize(attr))))
        .or_else(|| param_names.iter().find(|p| p.eq_ignore_ascii_case(attr)))
        .copied();

    if let Some(param_name) = param_name {
        options.insert(param_name.to_string(), Value::String(identity.to_string()));
    }
}

fn kind_param_prefix(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Channel => "channel",
        ResourceKind::Bridge => "bridge",
        ResourceKind::Playback => "playback",
        ResourceKind::LiveRecording => "recording",
        ResourceKind::Mailbox => "mailbox",
        ResourceKind::Endpoint => "endpoint",
        ResourceKind::DeviceState => "device",
        ResourceKind::Sound => "sound",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
