//! Event-frame types handed to global and scoped listeners.
//!
//! An incoming WebSocket frame is always kept in raw form ([`RawEvent`])
//! alongside whatever instances the demultiplexer could promote out of its
//! properties ([`Promoted`]) — unrecognized `dataType`s are left as raw
//! JSON rather than rejected, per the promotion rule in `resource.rs`.

use std::collections::HashMap;

use serde_json::Value;

use crate::resource::Instance;

/// One event frame as received on the wire, kept verbatim.
#[derive(Debug, Clone)]
pub struct RawEvent {
    /// The schema event name, from the frame's `type` field.
    pub event_type: String,
    /// The full frame, including `type`, `application`, `timestamp`, and
    /// every schema-declared property.
    pub raw: Value,
}

impl RawEvent {
    pub fn new(event_type: impl Into<String>, raw: Value) -> Self {
        Self {
            event_type: event_type.into(),
            raw,
        }
    }

    /// The `application` field, if present (every real ARI event carries
    /// one; absent only for malformed test fixtures).
    pub fn application(&self) -> Option<&str> {
        self.raw.get("application").and_then(Value::as_str)
    }
}

/// The resource instances promoted from one event's model-typed properties,
/// handed alongside the [`RawEvent`] to every global listener.
#[derive(Debug, Clone)]
pub enum Promoted {
    /// No model-typed property was present on this event.
    None,
    /// Exactly one model-typed property was present.
    One(Instance),
    /// More than one model-typed property was present, keyed by property
    /// name (e.g. `ChannelStateChange`'s `channel`, or the two channels on
    /// a `BridgeMerged`-style event with multiple instance properties).
    Many(HashMap<String, Instance>),
}

impl Promoted {
    /// Builds a `Promoted` from however many instances were extracted from
    /// an event's properties (§4.5 step 3's 0/1/many rule).
    pub fn from_instances(mut instances: HashMap<String, Instance>) -> Self {
        match instances.len() {
            0 => Self::None,
            1 => Self::One(instances.drain().next().expect("len checked above").1),
            _ => Self::Many(instances),
        }
    }

    /// The single promoted instance, if there was exactly one.
    pub fn single(&self) -> Option<&Instance> {
        match self {
            Self::One(inst) => Some(inst),
            _ => None,
        }
    }

    /// All promoted instances, regardless of arity.
    pub fn all(&self) -> Vec<&Instance> {
        match self {
            Self::None => Vec::new(),
            Self::One(inst) => vec![inst],
            Self::Many(map) => map.values().collect(),
        }
    }
}
