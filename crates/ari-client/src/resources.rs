//! Resource namespaces and instance constructors on [`Client`] (§4.3).
//!
//! A namespace (`client.channels()`, `client.bridges()`, …) is a thin
//! wrapper exposing `.call(op, options)` against one kind's operation
//! table — the same table `Instance::call` binds against, so a namespace
//! call with the identity supplied manually and an instance call produce
//! byte-identical requests (P5).

use ari_core::resource::{Instance, InstanceArgs, OperationOutcome, ResourceKind};
use ari_core::ClientResult;
use serde_json::Value;

use crate::client::Client;

/// A callable handle onto one resource kind's operation table, unbound to
/// any particular instance.
pub struct ResourceNamespace {
    client: Client,
    kind: ResourceKind,
}

impl ResourceNamespace {
    pub async fn call(&self, op: &str, options: Value) -> ClientResult<OperationOutcome> {
        self.client.call_kind(self.kind, op, options).await
    }
}

macro_rules! namespace_and_constructor {
    ($namespace:ident, $constructor:ident, $kind:expr) => {
        /// Unbound operation table for this kind.
        pub fn $namespace(&self) -> ResourceNamespace {
            ResourceNamespace {
                client: self.clone(),
                kind: $kind,
            }
        }

        /// Builds a fresh instance of this kind, bound to this client.
        pub fn $constructor(&self, args: InstanceArgs) -> ClientResult<Instance> {
            self.instance($kind, args)
        }
    };
}

impl Client {
    namespace_and_constructor!(channels, channel, ResourceKind::Channel);
    namespace_and_constructor!(bridges, bridge, ResourceKind::Bridge);
    namespace_and_constructor!(playbacks, playback, ResourceKind::Playback);
    namespace_and_constructor!(recordings, recording, ResourceKind::LiveRecording);
    namespace_and_constructor!(mailboxes, mailbox, ResourceKind::Mailbox);
    namespace_and_constructor!(endpoints, endpoint, ResourceKind::Endpoint);
    namespace_and_constructor!(device_states, device_state, ResourceKind::DeviceState);
    namespace_and_constructor!(sounds, sound, ResourceKind::Sound);

    /// The `asterisk` namespace — system info and module/config operations.
    /// Not instantiable (§3).
    pub fn asterisk(&self) -> NamespaceOnly {
        NamespaceOnly {
            client: self.clone(),
            name: "asterisk",
        }
    }

    /// The `applications` namespace. Not instantiable.
    pub fn applications(&self) -> NamespaceOnly {
        NamespaceOnly {
            client: self.clone(),
            name: "applications",
        }
    }

    /// The `events` namespace (user-generated events). Not instantiable.
    pub fn events(&self) -> NamespaceOnly {
        NamespaceOnly {
            client: self.clone(),
            name: "events",
        }
    }

    pub(crate) async fn call_kind(&self, kind: ResourceKind, op: &str, options: Value) -> ClientResult<OperationOutcome> {
        use ari_core::resource::ClientHandle;
        self.0.call_operation(kind, op, None, options).await
    }
}

/// A namespace with no instantiable resource behind it (`asterisk`,
/// `applications`, `events`).
pub struct NamespaceOnly {
    client: Client,
    name: &'static str,
}

impl NamespaceOnly {
    pub async fn call(&self, op: &str, options: Value) -> ClientResult<OperationOutcome> {
        self.client.call_namespace(self.name, op, options).await
    }
}
