#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Session Lifecycle
//!
//! A [`Session`] owns exactly one engine connection to the target.
//!
//! - [`Session::initialize`] configures and connects a fresh engine
//! - [`Session::reset`] drops the current connection, whatever its state,
//!   and connects a new one with the same configuration
//! - [`Session::close`] releases the connection; repeated calls are no-ops
//!
//! Connection setup is retried according to the configuration's
//! [`RetryPolicy`](crate::recovery::RetryPolicy); nothing after setup is.

use std::sync::Arc;

use tracing::{Span, info, warn};
use uuid::Uuid;

use crate::cipher_suite::CipherSuite;
use crate::config::{ConnectorSettings, OracleConfig};
use crate::engine::{EngineFactory, TlsEngine};
use crate::error::{OperationPhase, OracleError};
use crate::recovery::retry_with_policy;
use crate::tracing::OracleSpan;

/// One live or closed client session against the target
pub struct Session<F: EngineFactory> {
    id: Uuid,
    generation: u64,
    config: Arc<OracleConfig>,
    next_config: Option<Arc<OracleConfig>>,
    factory: Arc<F>,
    engine: F::Engine,
    terminated: bool,
    span: OracleSpan,
}

impl<F: EngineFactory> std::fmt::Debug for Session<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("target", &self.config.target_addr())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

async fn open_engine<F: EngineFactory>(
    config: &OracleConfig,
    factory: &F,
) -> Result<F::Engine, OracleError> {
    retry_with_policy(
        config.connect_retry(),
        || {
            let mut engine = factory.configure(config);
            async move {
                engine.connect().await?;
                Ok::<_, OracleError>(engine)
            }
        },
        "connect",
    )
    .await
    .map_err(|err| err.in_phase(OperationPhase::ConnectionSetup))
}

impl<F: EngineFactory> Session<F> {
    /// Resolve `settings`, then initialize
    ///
    /// Settings are validated before any connection is attempted.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for settings that do not resolve, or a
    /// `Transport` error when the target cannot be reached.
    pub async fn from_settings(settings: &ConnectorSettings, factory: F) -> Result<Self, OracleError> {
        let config = settings.resolve()?;
        Self::initialize(Arc::new(config), Arc::new(factory)).await
    }

    /// Configure and connect a fresh engine
    ///
    /// # Errors
    ///
    /// Returns a `Transport` error when the target cannot be reached after
    /// the configured retries.
    pub async fn initialize(config: Arc<OracleConfig>, factory: Arc<F>) -> Result<Self, OracleError> {
        let id = Uuid::new_v4();
        let span = OracleSpan::session(id, &config.target_addr(), 0);
        let engine = open_engine(&config, &*factory).await?;
        span.in_scope(|| info!("session ready, offering {}", config.selected_cipher_suite()));

        Ok(Self {
            id,
            generation: 0,
            config,
            next_config: None,
            factory,
            engine,
            terminated: false,
            span,
        })
    }

    /// Close the current connection and connect a new one
    ///
    /// Errors from the old connection are ignored. A configuration queued
    /// with [`reconfigure`](Self::reconfigure) takes effect here.
    ///
    /// # Errors
    ///
    /// Returns a `Transport` error when the new connection cannot be opened;
    /// the session is then closed.
    pub async fn reset(&mut self) -> Result<(), OracleError> {
        self.engine.close().await;
        self.terminated = true;

        if let Some(config) = self.next_config.take() {
            self.config = config;
        }
        self.generation = self.generation.saturating_add(1);
        self.span = OracleSpan::session(self.id, &self.config.target_addr(), self.generation);

        match open_engine(&self.config, &*self.factory).await {
            Ok(engine) => {
                self.engine = engine;
                self.terminated = false;
                Ok(())
            }
            Err(err) => {
                self.span.in_scope(|| warn!("reset could not reconnect: {}", err));
                Err(err)
            }
        }
    }

    /// Release the connection; idempotent
    pub async fn close(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.engine.close().await;
        self.span.in_scope(|| info!("session closed"));
    }

    /// True after [`close`](Self::close) or once the peer dropped the
    /// connection
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.terminated || self.engine.is_closed()
    }

    /// Queue a configuration for the next [`reset`](Self::reset)
    pub fn reconfigure(&mut self, config: OracleConfig) {
        self.next_config = Some(Arc::new(config));
    }

    /// Configuration of the current connection
    #[must_use]
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Engine of the current connection
    pub fn engine_mut(&mut self) -> &mut F::Engine {
        &mut self.engine
    }

    /// Suite the peer selected on the current connection
    #[must_use]
    pub fn negotiated_cipher_suite(&self) -> Option<CipherSuite> {
        self.engine.negotiated_cipher_suite()
    }

    /// Session id, stable across resets
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of resets so far
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Tracing span of the current generation
    #[must_use]
    pub fn span(&self) -> &Span {
        self.span.span()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests use unwrap for simplicity
mod tests {
    use super::*;
    use crate::engine::ScriptedFactory;
    use crate::error::ErrorCode;
    use crate::recovery::RetryPolicy;
    use std::time::Duration;

    fn settings() -> ConnectorSettings {
        ConnectorSettings::default().with_connect_retry(RetryPolicy::new(
            2,
            Duration::from_millis(1),
            Duration::from_millis(1),
        ))
    }

    #[tokio::test]
    async fn test_initialize_connects() {
        let factory = ScriptedFactory::silent();
        let session = Session::from_settings(&settings(), factory.clone()).await.unwrap();
        assert!(!session.is_closed());
        assert_eq!(session.generation(), 0);
        assert_eq!(factory.log().connects, 1);
    }

    #[tokio::test]
    async fn test_bad_settings_fail_before_connecting() {
        let factory = ScriptedFactory::silent();
        let err = Session::from_settings(&settings().with_protocol_version("TLS9"), factory.clone())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidProtocolVersion);
        assert_eq!(factory.log().connects, 0);
        assert!(factory.log().configured_suites.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_retries_refused_connects() {
        let factory = ScriptedFactory::silent();
        factory.refuse_next_connects(1);
        let session = Session::from_settings(&settings(), factory.clone()).await.unwrap();
        assert!(!session.is_closed());
        assert_eq!(factory.log().refused_connects, 1);
        assert_eq!(factory.log().connects, 1);
    }

    #[tokio::test]
    async fn test_reset_replaces_connection() {
        let factory = ScriptedFactory::silent();
        let mut session = Session::from_settings(&settings(), factory.clone()).await.unwrap();
        let id = session.id();

        session.reset().await.unwrap();
        assert!(!session.is_closed());
        assert_eq!(session.generation(), 1);
        assert_eq!(session.id(), id);
        let log = factory.log();
        assert_eq!(log.connects, 2);
        assert_eq!(log.closes, 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let factory = ScriptedFactory::silent();
        let mut session = Session::from_settings(&settings(), factory.clone()).await.unwrap();
        session.close().await;
        let after_first = factory.log();
        session.close().await;
        assert_eq!(factory.log(), after_first);
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_reset_after_close_reopens() {
        let factory = ScriptedFactory::silent();
        let mut session = Session::from_settings(&settings(), factory.clone()).await.unwrap();
        session.close().await;
        session.reset().await.unwrap();
        assert!(!session.is_closed());
    }

    #[tokio::test]
    async fn test_failed_reset_leaves_session_closed() {
        let factory = ScriptedFactory::silent();
        let mut session = Session::from_settings(&settings(), factory.clone()).await.unwrap();
        factory.refuse_next_connects(5);
        let err = session.reset().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConnectionRefused);
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_reconfigure_applies_on_reset() {
        let factory = ScriptedFactory::silent();
        let mut session = Session::from_settings(&settings(), factory.clone()).await.unwrap();
        let derived = session
            .config()
            .with_cipher_suites(vec![CipherSuite::TLS_DHE_RSA_WITH_AES_128_CBC_SHA]);
        session.reconfigure(derived);
        assert_eq!(
            session.config().selected_cipher_suite(),
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA256
        );

        session.reset().await.unwrap();
        assert_eq!(
            session.config().selected_cipher_suite(),
            CipherSuite::TLS_DHE_RSA_WITH_AES_128_CBC_SHA
        );
        assert_eq!(
            factory.log().configured_suites.last().copied(),
            Some(CipherSuite::TLS_DHE_RSA_WITH_AES_128_CBC_SHA)
        );
    }
}
