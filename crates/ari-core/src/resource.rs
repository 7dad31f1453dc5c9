//! Resource kinds and instances — the types returned from operations and
//! promoted from events.
//!
//! `Instance` deliberately holds no operation table and no listener list of
//! its own. Two `Instance` values can share an identity (I4) because all
//! durable state — the managed flag, the scoped listeners — lives on the
//! [`ClientHandle`] behind the instance, keyed by `(kind, identity)` rather
//! than by object identity. This is the indirection `spec.md` §9 calls for
//! under "cyclic reference client↔instance", adapted from the identity-keyed
//! routing in `alloy-core`'s `BotManager` (`bots: RwLock<HashMap<String, BotEntry>>`).

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::emitter::ListenerId;
use crate::error::ClientResult;

/// The eight resource types ARI clients can construct instances of.
/// Closed over by the protocol itself, not schema-derived (§3 of
/// `SPEC_FULL.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Channel,
    Bridge,
    Playback,
    LiveRecording,
    Mailbox,
    Endpoint,
    DeviceState,
    Sound,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        Self::Channel,
        Self::Bridge,
        Self::Playback,
        Self::LiveRecording,
        Self::Mailbox,
        Self::Endpoint,
        Self::DeviceState,
        Self::Sound,
    ];

    /// The field name that carries this kind's stable identity, both in
    /// server payloads and in path-parameter binding.
    pub fn identity_attr(self) -> &'static str {
        match self {
            Self::Channel | Self::Bridge | Self::Playback => "id",
            Self::LiveRecording
            | Self::Mailbox
            | Self::Endpoint
            | Self::DeviceState
            | Self::Sound => "name",
        }
    }

    /// The schema resource-group name (matches a per-resource Swagger doc).
    pub fn resource_group(self) -> &'static str {
        match self {
            Self::Channel => "channels",
            Self::Bridge => "bridges",
            Self::Playback => "playbacks",
            Self::LiveRecording => "recordings",
            Self::Mailbox => "mailboxes",
            Self::Endpoint => "endpoints",
            Self::DeviceState => "deviceStates",
            Self::Sound => "sounds",
        }
    }

    /// The model name this kind's instances are promoted from in schema
    /// response/event datatypes.
    pub fn model_name(self) -> &'static str {
        match self {
            Self::Channel => "Channel",
            Self::Bridge => "Bridge",
            Self::Playback => "Playback",
            Self::LiveRecording => "LiveRecording",
            Self::Mailbox => "Mailbox",
            Self::Endpoint => "Endpoint",
            Self::DeviceState => "DeviceState",
            Self::Sound => "Sound",
        }
    }

    /// Event names that conclude this instance's lifetime for listener
    /// cleanup purposes (§4.5(7)). Empty for kinds that aren't managed.
    pub fn terminal_events(self) -> &'static [&'static str] {
        match self {
            Self::Channel => &["StasisEnd"],
            Self::Bridge => &["BridgeDestroyed"],
            Self::Playback => &["PlaybackFinished"],
            Self::LiveRecording => &["RecordingFinished", "RecordingFailed"],
            Self::Mailbox | Self::Endpoint | Self::DeviceState | Self::Sound => &[],
        }
    }

    /// Looks up a kind by its schema model name.
    pub fn from_model_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.model_name() == name)
    }

    /// Whether a fresh identity may be auto-generated for this kind when the
    /// caller doesn't supply one. Only `id`-keyed kinds get this (Open
    /// Question decision #3 in DESIGN.md).
    pub fn supports_generated_identity(self) -> bool {
        self.identity_attr() == "id"
    }
}

/// Outcome of invoking an operation, before the facade turns a
/// resource-bearing outcome into a real [`Instance`].
#[derive(Debug, Clone)]
pub enum OperationOutcome {
    None,
    Value(Value),
    Instance(ResourceKind, Value),
    List(ResourceKind, Vec<Value>),
}

/// The operations an [`Instance`] needs from its owning client: invoking a
/// bound operation, and reading/mutating the identity-keyed scoped-listener
/// and managed-instance tables. Implemented by `ari-client::Client`.
#[async_trait]
pub trait ClientHandle: Send + Sync {
    /// Invokes `op` on `kind`'s operation table. If `identity` is `Some`,
    /// it is auto-injected into whichever declared parameter matches the
    /// kind's identity attribute (path or query), and may not be overridden by `options`
    /// (I2) — this is what makes `Instance::call` and a namespace call with
    /// the id supplied manually produce identical requests (P5).
    async fn call_operation(
        &self,
        kind: ResourceKind,
        op: &str,
        identity: Option<&str>,
        options: Value,
    ) -> ClientResult<OperationOutcome>;

    /// Registers a scoped listener on `(kind, identity)` for `event_name`.
    fn on_scoped(
        &self,
        event_name: &str,
        kind: ResourceKind,
        identity: &str,
        once: bool,
        listener: Arc<dyn Fn(Value) + Send + Sync>,
    ) -> ListenerId;

    /// Removes a previously registered scoped listener. Idempotent (P8).
    fn off_scoped(&self, event_name: &str, kind: ResourceKind, id: ListenerId);

    /// Marks `(kind, identity)` as managed (§4.3's `manageInstance`).
    fn manage(&self, kind: ResourceKind, identity: &str);

    /// Whether `(kind, identity)` is currently in the managed set.
    fn is_managed(&self, kind: ResourceKind, identity: &str) -> bool;
}

/// A handle to a resource instance: identity plus a field map, bound to a
/// client for operation dispatch and scoped events.
#[derive(Clone)]
pub struct Instance {
    kind: ResourceKind,
    identity: String,
    fields: Arc<Mutex<Map<String, Value>>>,
    client: Weak<dyn ClientHandle>,
}

impl Instance {
    /// Constructs an instance directly. Used by the resource factory
    /// (fresh construction) and by the event demultiplexer (promotion).
    pub fn new(
        kind: ResourceKind,
        identity: impl Into<String>,
        values: Map<String, Value>,
        client: Weak<dyn ClientHandle>,
    ) -> Self {
        Self {
            kind,
            identity: identity.into(),
            fields: Arc::new(Mutex::new(values)),
            client,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The instance's stable identity (`id` or `name`, depending on kind).
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// A snapshot of the last-known field map.
    pub fn fields(&self) -> Map<String, Value> {
        self.fields.lock().clone()
    }

    /// Merges new field values into the instance's advisory state (does not
    /// touch the immutable identity).
    pub fn merge_fields(&self, values: &Map<String, Value>) {
        let mut guard = self.fields.lock();
        for (k, v) in values {
            guard.insert(k.clone(), v.clone());
        }
    }

    /// Whether this identity is currently managed (I4 — read through the
    /// client's shared set, never cached on the instance).
    pub fn is_managed(&self) -> bool {
        self.client
            .upgrade()
            .is_some_and(|c| c.is_managed(self.kind, &self.identity))
    }

    /// Marks this identity as managed.
    pub fn manage(&self) {
        if let Some(client) = self.client.upgrade() {
            client.manage(self.kind, &self.identity);
        }
    }

    /// Invokes a bound operation, with this instance's identity
    /// auto-injected (I2, P5).
    pub async fn call(&self, op: &str, options: Value) -> ClientResult<OperationOutcome> {
        let client = self.client.upgrade().ok_or_else(|| {
            tracing::warn!(kind = ?self.kind, identity = %self.identity, op, "cannot call operation: client dropped");
            crate::error::ClientError::Protocol {
                reason: "client dropped".to_string(),
            }
        })?;
        client
            .call_operation(self.kind, op, Some(&self.identity), options)
            .await
    }

    /// Registers a scoped listener: fires only for events whose promoted
    /// instance carries this identity (§4.5(5)).
    pub fn on(&self, event_name: &str, listener: Arc<dyn Fn(Value) + Send + Sync>) -> Option<ListenerId> {
        self.client
            .upgrade()
            .map(|c| c.on_scoped(event_name, self.kind, &self.identity, false, listener))
    }

    /// Registers a scoped listener that fires at most once (P6).
    pub fn once(&self, event_name: &str, listener: Arc<dyn Fn(Value) + Send + Sync>) -> Option<ListenerId> {
        self.client
            .upgrade()
            .map(|c| c.on_scoped(event_name, self.kind, &self.identity, true, listener))
    }

    /// Removes a previously registered scoped listener (idempotent, P8).
    pub fn off(&self, event_name: &str, id: ListenerId) {
        if let Some(client) = self.client.upgrade() {
            client.off_scoped(event_name, self.kind, id);
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("kind", &self.kind)
            .field("identity", &self.identity)
            .finish()
    }
}

/// Builder standing in for the source's four constructor call shapes
/// (`()`, `(id)`, `(values)`, `(id, values)`) — Rust has no overloading, so
/// this mirrors the `ClientConfig`/`WsClientConfig` builder idiom the
/// teacher already uses for constructor-site configuration.
#[derive(Debug, Clone, Default)]
pub struct InstanceArgs {
    id: Option<String>,
    values: Map<String, Value>,
}

impl InstanceArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn values(mut self, values: Map<String, Value>) -> Self {
        self.values = values;
        self
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Map<String, Value>) {
        (self.id, self.values)
    }
}

/// Generates a fresh UUID v4 identity matching `^[a-z0-9]{8}(-[a-z0-9]{4}){3}-[a-z0-9]{12}$` (P3).
pub fn generate_identity() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Builds a fresh, client-bound instance from [`InstanceArgs`], generating
/// an identity when the kind supports it and none was supplied.
pub fn build_instance(
    kind: ResourceKind,
    args: InstanceArgs,
    client: Weak<dyn ClientHandle>,
) -> ClientResult<Instance> {
    let (id, values) = args.into_parts();
    let identity = match id {
        Some(id) => id,
        None if kind.supports_generated_identity() => generate_identity(),
        None => {
            return Err(crate::error::ClientError::Protocol {
                reason: format!(
                    "{:?} instances are identified by `{}` and require an explicit identity",
                    kind,
                    kind.identity_attr()
                ),
            });
        }
    };
    Ok(Instance::new(kind, identity, values, client))
}

/// Per-kind operation tables, built once at connect time.
#[derive(Debug, Clone, Default)]
pub struct OperationTables(pub HashMap<ResourceKind, HashMap<String, crate::schema::OperationSpec>>);

impl OperationTables {
    pub fn get(&self, kind: ResourceKind, op: &str) -> Option<&crate::schema::OperationSpec> {
        self.0.get(&kind)?.get(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identity_matches_uuid_v4_shape() {
        let re_parts = |s: &str| -> bool {
            let groups: Vec<&str> = s.split('-').collect();
            groups.len() == 5
                && groups[0].len() == 8
                && groups[1].len() == 4
                && groups[2].len() == 4
                && groups[3].len() == 4
                && groups[4].len() == 12
                && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
        };

        let a = generate_identity();
        let b = generate_identity();
        assert!(re_parts(&a), "identity {a} does not match uuid v4 shape");
        assert!(re_parts(&b), "identity {b} does not match uuid v4 shape");
        assert_ne!(a, b, "two successive calls must produce distinct identities");
    }

    #[test]
    fn name_keyed_kind_requires_explicit_identity() {
        let err = build_instance(ResourceKind::Mailbox, InstanceArgs::new(), Weak::<NoopHandle>::new())
            .unwrap_err();
        assert!(matches!(err, crate::error::ClientError::Protocol { .. }));
    }

    #[test]
    fn id_keyed_kind_generates_identity_when_absent() {
        let inst = build_instance(ResourceKind::Channel, InstanceArgs::new(), Weak::<NoopHandle>::new())
            .unwrap();
        assert!(!inst.identity().is_empty());
    }

    struct NoopHandle;
    #[async_trait]
    impl ClientHandle for NoopHandle {
        async fn call_operation(
            &self,
            _kind: ResourceKind,
            _op: &str,
            _identity: Option<&str>,
            _options: Value,
        ) -> ClientResult<OperationOutcome> {
            Ok(OperationOutcome::None)
        }
        fn on_scoped(
            &self,
            _event_name: &str,
            _kind: ResourceKind,
            _identity: &str,
            _once: bool,
            _listener: Arc<dyn Fn(Value) + Send + Sync>,
        ) -> ListenerId {
            unimplemented!()
        }
        fn off_scoped(&self, _event_name: &str, _kind: ResourceKind, _id: ListenerId) {}
        fn manage(&self, _kind: ResourceKind, _identity: &str) {}
        fn is_managed(&self, _kind: ResourceKind, _identity: &str) -> bool {
            false
        }
    }
}
