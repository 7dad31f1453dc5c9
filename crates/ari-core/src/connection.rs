//! Connection parameters shared by the HTTP operation engine and the
//! WebSocket transport. Immutable once built, cheap to clone and hand to
//! both transports without a shared-mutable-state dependency between them.

/// The scheme an ARI server is reachable over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// The matching WebSocket scheme (`ws`/`wss`).
    pub fn ws_scheme(self) -> &'static str {
        match self {
            Self::Http => "ws",
            Self::Https => "wss",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Connection parameters for an ARI server: scheme, host (with port), and
/// Basic-auth credentials. Built once at `connect` time and shared by every
/// request the HTTP engine issues and by the WebSocket URL builder.
#[derive(Debug, Clone)]
pub struct Connection {
    pub scheme: Scheme,
    pub host: String,
    pub user: String,
    pub secret: String,
}

impl Connection {
    pub fn new(scheme: Scheme, host: impl Into<String>, user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into(),
            user: user.into(),
            secret: secret.into(),
        }
    }

    /// The base URL for REST requests, e.g. `http://localhost:8088/ari`.
    pub fn rest_base_url(&self) -> String {
        format!("{}://{}/ari", self.scheme.as_str(), self.host)
    }

    /// The base URL for the WebSocket events endpoint, e.g.
    /// `ws://localhost:8088/ari/events`.
    pub fn events_base_url(&self) -> String {
        format!("{}://{}/ari/events", self.scheme.ws_scheme(), self.host)
    }
}
