//! # ARI Core
//!
//! Transport-agnostic data model for the ARI client: error types, the
//! resource/instance model, the event-listener registry, and connection
//! parameters. `ari-transport` and `ari-client` build on top of this crate;
//! it depends on neither of them.
//!
//! ## Layout
//!
//! - [`error`] — [`ClientError`] and [`ClientResult`], shared by every layer.
//! - [`schema`] — plain data describing a loaded ARI API description.
//! - [`resource`] — [`ResourceKind`], [`Instance`], and the [`ClientHandle`]
//!   trait that lets an instance call back into its owning client without a
//!   circular crate dependency.
//! - [`event`] — [`RawEvent`] and [`Promoted`], handed to global listeners.
//! - [`emitter`] — a small generic listener registry used for both the
//!   global event bus and every instance's scoped listeners.
//! - [`connection`] — immutable REST/WebSocket connection parameters.

pub mod connection;
pub mod emitter;
pub mod error;
pub mod event;
pub mod resource;
pub mod schema;

pub use connection::{Connection, Scheme};
pub use emitter::{ArcListener, Emitter, ListenerId};
pub use error::{ClientError, ClientResult};
pub use event::{Promoted, RawEvent};
pub use resource::{
    build_instance, generate_identity, ClientHandle, Instance, InstanceArgs, OperationOutcome,
    OperationTables, ResourceKind,
};
pub use schema::{
    DataType, EventModel, EventProperty, HttpMethod, OperationSpec, ParamLocation, ParamSpec,
    ResponseKind, Schema,
};
