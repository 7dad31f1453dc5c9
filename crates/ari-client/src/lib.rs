//! # ARI Client
//!
//! The public facade: [`connect`], the [`Client`] type, resource
//! namespaces and instance constructors, and the event demultiplexer.
//! Combines what the teacher splits across `alloy-runtime` (connection
//! lifecycle) and the top-level `alloy` crate (facade re-exports), since
//! ARI has one protocol and one transport pair rather than a multi-bot
//! registry to orchestrate.

mod client;
mod dispatch;
mod resources;

pub mod logging;

pub use ari_core::resource::{InstanceArgs, OperationOutcome, ResourceKind};
pub use ari_core::{ClientError, ClientResult, Instance, Promoted, RawEvent};
pub use ari_transport::{ClientConfig, WsReconnectConfig};

pub use client::{connect, connect_with_config, Client, GlobalListener};
pub use resources::{NamespaceOnly, ResourceNamespace};

/// Common imports for applications embedding this client.
pub mod prelude {
    pub use crate::{
        connect, connect_with_config, Client, ClientConfig, ClientError, ClientResult,
        GlobalListener, Instance, InstanceArgs, OperationOutcome, Promoted, RawEvent,
        ResourceKind, WsReconnectConfig,
    };
}
