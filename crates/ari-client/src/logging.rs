//! Logging setup for applications embedding this client.
//!
//! Mirrors `alloy-runtime::logging::LoggingBuilder`: a small builder over
//! `tracing-subscriber`'s env filter and fmt layer. Not used by the client
//! itself (which only emits `tracing` events/spans) — this is for the
//! embedding binary to opt into at startup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes logging with default settings: `RUST_LOG`-driven filtering,
/// falling back to this client's tuned per-crate defaults ([`default_filter`]).
///
/// # Panics
/// Panics if a global subscriber has already been set.
pub fn init() {
    tracing_subscriber::registry().with(fmt::layer()).with(default_filter()).init();
}

/// Initializes logging with a custom default filter string, overridden by
/// `RUST_LOG` when set.
pub fn init_with_filter(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::registry().with(fmt::layer()).with(env_filter).init();
}

/// Default filter tuned for this client's crates.
pub fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info")
            .add_directive("ari_client=info".parse().unwrap())
            .add_directive("ari_transport=info".parse().unwrap())
            .add_directive("ari_core=debug".parse().unwrap())
    })
}

/// As [`init`], returning an error instead of panicking if a global
/// subscriber was already set.
pub fn try_init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(default_filter())
        .try_init()
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
}

/// A builder for configuring logging, for embedders who want more than
/// [`init`] offers.
#[derive(Default)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: Option<tracing::Level>,
    with_target: bool,
    with_thread_ids: bool,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let base = match self.level {
            Some(tracing::Level::TRACE) => "trace",
            Some(tracing::Level::DEBUG) => "debug",
            Some(tracing::Level::WARN) => "warn",
            Some(tracing::Level::ERROR) => "error",
            Some(tracing::Level::INFO) | None => "info",
        };
        let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base));
        for directive in &self.directives {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }
        filter
    }

    pub fn init(self) {
        let filter = self.build_filter();
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(self.with_target).with_thread_ids(self.with_thread_ids))
            .with(filter)
            .init();
    }
}
