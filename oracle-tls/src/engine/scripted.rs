//! Deterministic in-memory engine.
//!
//! The peer is a responder function from each sent message to a
//! [`ScriptedReply`]. Nothing touches the network and nothing waits, so
//! dispatcher and session behavior can be checked exactly.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::alert::Alert;
use crate::cipher_suite::{CipherSuite, KeyExchange};
use crate::config::OracleConfig;
use crate::engine::{EngineFactory, TlsEngine};
use crate::error::{ErrorCode, OperationPhase, OracleError};
use crate::message::{HandshakeKind, OutgoingMessage, ReceivedMessage};

/// What the scripted peer does in answer to one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedReply {
    /// Messages delivered by the next receive
    pub messages: Vec<ReceivedMessage>,
    /// Close the connection after delivering `messages`
    pub close: bool,
    /// Fail the send itself with a broken pipe
    pub fail_send: bool,
}

impl ScriptedReply {
    /// Nothing arrives
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    /// Deliver `messages`
    #[must_use]
    pub fn messages(messages: Vec<ReceivedMessage>) -> Self {
        Self { messages, ..Self::default() }
    }

    /// Close the connection after delivering
    #[must_use]
    pub fn then_close(mut self) -> Self {
        self.close = true;
        self
    }

    /// The send fails below the protocol layer
    #[must_use]
    pub fn send_failure() -> Self {
        Self { fail_send: true, ..Self::default() }
    }
}

/// Everything the scripted engines of one factory did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptLog {
    /// Successful connects
    pub connects: u32,
    /// Refused connects
    pub refused_connects: u32,
    /// Close calls, including repeated ones
    pub closes: u32,
    /// Names of messages handed to the peer, in order
    pub sent: Vec<&'static str>,
    /// Receive calls
    pub receives: u32,
    /// Selected suite of every engine configured
    pub configured_suites: Vec<CipherSuite>,
}

type Responder = dyn Fn(&OutgoingMessage) -> ScriptedReply + Send + Sync;

/// Builds [`ScriptedEngine`]s sharing one responder and one log
#[derive(Clone)]
pub struct ScriptedFactory {
    responder: Arc<Responder>,
    log: Arc<Mutex<ScriptLog>>,
    refuse_connects: Arc<Mutex<u32>>,
}

impl std::fmt::Debug for ScriptedFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedFactory").field("log", &self.log()).finish_non_exhaustive()
    }
}

impl ScriptedFactory {
    /// Factory whose peer answers with `responder`
    pub fn new<R>(responder: R) -> Self
    where
        R: Fn(&OutgoingMessage) -> ScriptedReply + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            log: Arc::new(Mutex::new(ScriptLog::default())),
            refuse_connects: Arc::new(Mutex::new(0)),
        }
    }

    /// A peer that never answers
    #[must_use]
    pub fn silent() -> Self {
        Self::new(|_| ScriptedReply::silent())
    }

    /// A TLS 1.2 RSA server: answers ClientHello with its first flight and
    /// rejects application data before a handshake with a fatal alert
    #[must_use]
    pub fn rsa_server() -> Self {
        Self::new(|message| match message {
            OutgoingMessage::ClientHello { .. } => ScriptedReply::messages(vec![
                ReceivedMessage::handshake(HandshakeKind::ServerHello, KeyExchange::Rsa),
                ReceivedMessage::handshake(HandshakeKind::Certificate, KeyExchange::Rsa),
                ReceivedMessage::handshake(HandshakeKind::ServerHelloDone, KeyExchange::Rsa),
            ]),
            OutgoingMessage::ApplicationData { .. } => {
                ScriptedReply::messages(vec![ReceivedMessage::Alert(Alert::from_bytes(2, 10))])
                    .then_close()
            }
            _ => ScriptedReply::silent(),
        })
    }

    /// Refuse the next `count` connection attempts
    pub fn refuse_next_connects(&self, count: u32) {
        *self.refuse_connects.lock().unwrap_or_else(PoisonError::into_inner) = count;
    }

    /// Snapshot of the shared log
    #[must_use]
    pub fn log(&self) -> ScriptLog {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl EngineFactory for ScriptedFactory {
    type Engine = ScriptedEngine;

    fn configure(&self, config: &OracleConfig) -> ScriptedEngine {
        let selected = config.selected_cipher_suite();
        record(&self.log, |log| log.configured_suites.push(selected));
        ScriptedEngine {
            responder: Arc::clone(&self.responder),
            log: Arc::clone(&self.log),
            refuse_connects: Arc::clone(&self.refuse_connects),
            selected,
            connected: false,
            closed: true,
            pending: Vec::new(),
            close_pending: false,
            negotiated: None,
        }
    }
}

fn record<R>(log: &Mutex<ScriptLog>, f: impl FnOnce(&mut ScriptLog) -> R) -> R {
    f(&mut log.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Engine driven by a [`ScriptedFactory`]'s responder
pub struct ScriptedEngine {
    responder: Arc<Responder>,
    log: Arc<Mutex<ScriptLog>>,
    refuse_connects: Arc<Mutex<u32>>,
    selected: CipherSuite,
    connected: bool,
    closed: bool,
    pending: Vec<ReceivedMessage>,
    close_pending: bool,
    negotiated: Option<CipherSuite>,
}

impl std::fmt::Debug for ScriptedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedEngine")
            .field("selected", &self.selected)
            .field("connected", &self.connected)
            .field("closed", &self.closed)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl ScriptedEngine {
    fn take_refusal(&self) -> bool {
        let mut remaining = self.refuse_connects.lock().unwrap_or_else(PoisonError::into_inner);
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

impl TlsEngine for ScriptedEngine {
    async fn connect(&mut self) -> Result<(), OracleError> {
        if self.take_refusal() {
            record(&self.log, |log| log.refused_connects += 1);
            return Err(OracleError::transport(
                "scripted peer refused connection",
                ErrorCode::ConnectionRefused,
                OperationPhase::ConnectionSetup,
            ));
        }
        record(&self.log, |log| log.connects += 1);
        self.connected = true;
        self.closed = false;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn send(&mut self, message: &OutgoingMessage) -> Result<(), OracleError> {
        if self.closed {
            return Err(OracleError::transport(
                "send on closed scripted engine",
                ErrorCode::WriteError,
                OperationPhase::Send,
            ));
        }

        let reply = (self.responder)(message);
        if reply.fail_send {
            self.closed = true;
            return Err(OracleError::transport(
                "scripted peer broke the pipe",
                ErrorCode::WriteError,
                OperationPhase::Send,
            ));
        }

        record(&self.log, |log| log.sent.push(message.name()));
        if reply.messages.iter().any(|m| {
            matches!(m, ReceivedMessage::Handshake { kind: HandshakeKind::ServerHello, .. })
        }) {
            self.negotiated = Some(self.selected);
        }
        self.pending.extend(reply.messages);
        self.close_pending |= reply.close;
        Ok(())
    }

    async fn receive_available(
        &mut self,
        _timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>, OracleError> {
        record(&self.log, |log| log.receives += 1);
        if self.close_pending {
            self.closed = true;
            self.close_pending = false;
        }
        Ok(std::mem::take(&mut self.pending))
    }

    async fn close(&mut self) {
        record(&self.log, |log| log.closes += 1);
        self.closed = true;
        self.pending.clear();
        self.close_pending = false;
    }

    fn negotiated_cipher_suite(&self) -> Option<CipherSuite> {
        self.negotiated
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests use unwrap for simplicity
mod tests {
    use super::*;
    use crate::config::ConnectorSettings;

    #[tokio::test]
    async fn test_scripted_engine_delivers_reply_on_receive() {
        let factory = ScriptedFactory::rsa_server();
        let config = ConnectorSettings::default().resolve().unwrap();
        let mut engine = factory.configure(&config);
        assert!(engine.is_closed());

        engine.connect().await.unwrap();
        assert!(!engine.is_closed());
        engine.send(&OutgoingMessage::ClientHello { renegotiation_info: true }).await.unwrap();
        let received = engine.receive_available(Duration::from_millis(10)).await.unwrap();
        assert_eq!(received.len(), 3);
        assert_eq!(engine.negotiated_cipher_suite(), Some(config.selected_cipher_suite()));
        assert!(engine.receive_available(Duration::from_millis(10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scripted_engine_closes_after_delivery() {
        let factory = ScriptedFactory::rsa_server();
        let config = ConnectorSettings::default().resolve().unwrap();
        let mut engine = factory.configure(&config);
        engine.connect().await.unwrap();

        let probe = OutgoingMessage::ApplicationData { payload: b"x".to_vec() };
        engine.send(&probe).await.unwrap();
        assert!(!engine.is_closed());
        let received = engine.receive_available(Duration::from_millis(10)).await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(engine.is_closed());
        assert!(engine.send(&probe).await.is_err());
    }

    #[tokio::test]
    async fn test_refused_connects_are_counted() {
        let factory = ScriptedFactory::silent();
        factory.refuse_next_connects(1);
        let config = ConnectorSettings::default().resolve().unwrap();

        let mut engine = factory.configure(&config);
        let err = engine.connect().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConnectionRefused);
        engine.connect().await.unwrap();

        let log = factory.log();
        assert_eq!(log.refused_connects, 1);
        assert_eq!(log.connects, 1);
    }
}
