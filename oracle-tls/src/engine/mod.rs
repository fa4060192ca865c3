//! # TLS Engine Capability
//!
//! The session driver talks to the target only through [`TlsEngine`].
//! An [`EngineFactory`] turns an [`OracleConfig`] into a configured, not yet
//! connected engine; every session generation gets its own engine.
//!
//! Two implementations ship with the crate:
//! - [`WireEngine`](crate::wire::WireEngine) speaks TLS records over TCP
//! - [`ScriptedEngine`] answers from an in-memory responder, for tests

pub mod scripted;

use std::time::Duration;

use crate::cipher_suite::CipherSuite;
use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::message::{OutgoingMessage, ReceivedMessage};

pub use scripted::{ScriptLog, ScriptedEngine, ScriptedFactory, ScriptedReply};

/// One client connection to the target
pub trait TlsEngine: Send {
    /// Open the transport connection
    ///
    /// # Errors
    ///
    /// Returns a transport error when the target cannot be reached.
    fn connect(&mut self) -> impl Future<Output = Result<(), OracleError>> + Send;

    /// True once the connection is gone, or before it was ever opened
    fn is_closed(&self) -> bool;

    /// Construct and send one message
    ///
    /// # Errors
    ///
    /// Returns a transport error when the write fails; the engine is closed
    /// afterwards.
    fn send(
        &mut self,
        message: &OutgoingMessage,
    ) -> impl Future<Output = Result<(), OracleError>> + Send;

    /// Collect every message that arrives before the peer goes quiet for
    /// `timeout`
    ///
    /// Peer closure is not an error: it is reported through
    /// [`is_closed`](TlsEngine::is_closed) after the call.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that are not a peer closure.
    fn receive_available(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<ReceivedMessage>, OracleError>> + Send;

    /// Best-effort close that returns promptly; idempotent
    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Suite the peer selected in its ServerHello, if one arrived
    fn negotiated_cipher_suite(&self) -> Option<CipherSuite>;
}

/// Builds configured engines
pub trait EngineFactory: Send + Sync {
    /// Engine type produced
    type Engine: TlsEngine;

    /// Apply every configuration field to a fresh, unconnected engine
    fn configure(&self, config: &OracleConfig) -> Self::Engine;
}
