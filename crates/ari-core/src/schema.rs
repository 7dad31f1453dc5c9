//! Schema types describing a loaded ARI API description (Swagger 1.2-style).
//!
//! Everything here is plain data — built once by `ari-transport`'s schema
//! loader and read by the HTTP operation engine and the facade's resource
//! namespaces. No behavior lives on these types beyond small lookups.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// HTTP method named by an operation spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Parses a Swagger 1.2 `httpMethod` string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Where a parameter is bound when building a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamLocation {
    Path,
    Query,
    Body,
    Header,
}

impl ParamLocation {
    /// Parses a Swagger 1.2 `paramType` string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "body" => Some(Self::Body),
            "header" => Some(Self::Header),
            _ => None,
        }
    }
}

/// The datatype declared for a parameter, event property, or response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// A primitive JSON-ish scalar (string, int, boolean, ...).
    Primitive(String),
    /// A named model, e.g. `"Channel"` or `"Variables"`.
    Model(String),
    /// `List[X]` — a sequence of the named model.
    ListOfModel(String),
    /// Any other declared datatype string the loader didn't recognize.
    /// Kept rather than rejected so an unrecognized datatype never fails
    /// schema loading (invariant I1: the operation set is exactly what the
    /// schema advertises, nothing hand-curated filters it down).
    Other(String),
}

impl DataType {
    /// Parses a Swagger 1.2 `dataType` string, recognizing `List[X]`.
    pub fn parse(raw: &str, known_models: &std::collections::HashSet<String>) -> Self {
        if let Some(inner) = raw.strip_prefix("List[").and_then(|s| s.strip_suffix(']')) {
            return Self::ListOfModel(inner.to_string());
        }
        if known_models.contains(raw) {
            return Self::Model(raw.to_string());
        }
        match raw {
            "string" | "int" | "number" | "boolean" | "object" | "byte" => {
                Self::Primitive(raw.to_string())
            }
            _ => Self::Other(raw.to_string()),
        }
    }

    /// The model name, if this datatype names a model (bare or in a list).
    pub fn model_name(&self) -> Option<&str> {
        match self {
            Self::Model(m) | Self::ListOfModel(m) => Some(m.as_str()),
            _ => None,
        }
    }
}

/// One parameter on an [`OperationSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub datatype: DataType,
    pub description: String,
}

/// The declared shape of an operation's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    None,
    Primitive(String),
    Model(String),
    ListOfModel(String),
}

impl ResponseKind {
    pub fn from_datatype(dt: DataType) -> Self {
        match dt {
            DataType::Primitive(p) => Self::Primitive(p),
            DataType::Model(m) => Self::Model(m),
            DataType::ListOfModel(m) => Self::ListOfModel(m),
            DataType::Other(_) => Self::None,
        }
    }
}

/// One callable operation on a resource, exactly as advertised by the
/// schema (invariant I1 — no hand-written entries).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSpec {
    pub name: String,
    pub method: HttpMethod,
    /// URL path template, e.g. `/bridges/{bridgeId}`.
    pub path: String,
    pub params: Vec<ParamSpec>,
    pub response: ResponseKind,
}

impl OperationSpec {
    /// Path placeholder names referenced by `path`, in order of first
    /// appearance, e.g. `["bridgeId"]` for `/bridges/{bridgeId}`.
    pub fn path_placeholders(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut rest = self.path.as_str();
        while let Some(start) = rest.find('{') {
            let Some(end) = rest[start..].find('}') else {
                break;
            };
            out.push(rest[start + 1..start + end].to_string());
            rest = &rest[start + end + 1..];
        }
        out
    }
}

/// One property on an [`EventModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventProperty {
    pub name: String,
    pub datatype: DataType,
}

/// The schema-declared shape of one event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventModel {
    pub name: String,
    pub properties: Vec<EventProperty>,
}

/// A fully loaded schema: operations grouped by resource name, plus event
/// models keyed by event name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Resource name (e.g. `"bridges"`) → operation name → spec.
    pub resources: HashMap<String, HashMap<String, OperationSpec>>,
    /// Event name → event model.
    pub events: HashMap<String, EventModel>,
}

impl Schema {
    /// Looks up an operation by resource and operation name.
    pub fn operation(&self, resource: &str, op: &str) -> Option<&OperationSpec> {
        self.resources.get(resource)?.get(op)
    }

    /// All resource names the schema knows about, sorted for stable
    /// iteration (used by tests and by anything enumerating namespaces).
    pub fn resource_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
