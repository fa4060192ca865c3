#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Structured Tracing for Oracle Sessions
//!
//! Tracing infrastructure for the oracle:
//! - One span per session, carrying its id, target and generation
//! - One span per exchange, carrying the input symbol
//! - Per control connection exchange statistics

use std::time::Instant;

use tracing::{Level, Span, debug, info, span, trace};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uuid::Uuid;

use crate::encoder::{CONNECTION_CLOSED, NOTHING_RECEIVED, SEPARATOR};

/// Oracle tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default log level, overridable through `RUST_LOG`
    pub log_level: Level,
    /// Include the emitting module in each line
    pub with_target: bool,
    /// Include thread ids in each line
    pub with_thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self { log_level: Level::INFO, with_target: true, with_thread_ids: false }
    }
}

impl TracingConfig {
    /// Enable debug logging
    #[must_use]
    pub fn debug() -> Self {
        Self { log_level: Level::DEBUG, ..Default::default() }
    }
}

/// Initialize oracle tracing
///
/// Calling this more than once is harmless; later calls leave the first
/// subscriber in place.
///
/// # Example
/// ```no_run
/// use oracle_tls::tracing::init_tracing;
///
/// init_tracing(&Default::default());
/// ```
pub fn init_tracing(config: &TracingConfig) {
    let filter =
        EnvFilter::builder().with_default_directive(config.log_level.into()).from_env_lossy();

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids),
        )
        .with(filter)
        .try_init();

    if installed.is_err() {
        debug!("global tracing subscriber already installed");
    }
}

/// Span builder for sessions and exchanges
#[derive(Debug)]
pub struct OracleSpan {
    span: Span,
    start_time: Instant,
}

impl OracleSpan {
    /// Span covering the lifetime of one session generation
    pub fn session(id: Uuid, target: &str, generation: u64) -> Self {
        let span = span!(
            Level::INFO,
            "oracle_session",
            session_id = %id,
            target = %target,
            generation = generation,
        );

        span.in_scope(|| {
            debug!("Opening session to {}", target);
        });

        Self { span, start_time: Instant::now() }
    }

    /// Span covering one input symbol, from dispatch to reply
    pub fn exchange(input: &str) -> Self {
        let span = span!(Level::INFO, "oracle_exchange", input = %input);

        span.in_scope(|| {
            trace!("Dispatching {:?}", input);
        });

        Self { span, start_time: Instant::now() }
    }

    /// Underlying span, for instrumenting futures
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Log the completed exchange as `input / output`
    pub fn complete(self, input: &str, output: &str) {
        let duration = self.start_time.elapsed();
        self.span.in_scope(|| {
            info!(
                "{} / {} ({}.{:03}s)",
                input,
                output,
                duration.as_secs(),
                duration.subsec_millis()
            );
        });
    }

    /// Enter span scope
    pub fn in_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.span.in_scope(f)
    }
}

/// Exchange statistics for one control connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeStats {
    /// Input symbols processed, including resets
    pub exchanges: u64,
    /// `RESET` commands
    pub resets: u64,
    /// Outputs where nothing arrived before the timeout
    pub timeouts: u64,
    /// Outputs that observed the connection closed
    pub connection_closed: u64,
    /// Alert descriptors across all outputs
    pub alerts: u64,
    /// Symbols rejected as unknown
    pub rejected: u64,
}

impl ExchangeStats {
    /// Create new statistics tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a `RESET`
    pub fn record_reset(&mut self) {
        self.exchanges = self.exchanges.saturating_add(1);
        self.resets = self.resets.saturating_add(1);
    }

    /// Record a completed send exchange by its encoded output
    pub fn record_output(&mut self, output: &str) {
        self.exchanges = self.exchanges.saturating_add(1);
        if output == NOTHING_RECEIVED {
            self.timeouts = self.timeouts.saturating_add(1);
            return;
        }
        let mut closed = false;
        for descriptor in output.split(SEPARATOR) {
            if descriptor.starts_with("ALERT_") {
                self.alerts = self.alerts.saturating_add(1);
            } else if descriptor == CONNECTION_CLOSED {
                closed = true;
            }
        }
        if closed {
            self.connection_closed = self.connection_closed.saturating_add(1);
        }
    }

    /// Record an unknown symbol
    pub fn record_rejected(&mut self) {
        self.exchanges = self.exchanges.saturating_add(1);
        self.rejected = self.rejected.saturating_add(1);
    }

    /// Log statistics
    pub fn log(&self) {
        info!(
            "Exchange stats: exchanges={} resets={} timeouts={} closed={} alerts={} rejected={}",
            self.exchanges,
            self.resets,
            self.timeouts,
            self.connection_closed,
            self.alerts,
            self.rejected
        );
    }
}
