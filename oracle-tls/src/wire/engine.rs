//! TCP engine speaking plaintext TLS records.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};
use tracing::{debug, trace, warn};

use crate::alert::Alert;
use crate::cipher_suite::{CipherSuite, KeyExchange};
use crate::config::OracleConfig;
use crate::engine::{EngineFactory, TlsEngine};
use crate::error::{ErrorCode, OperationPhase, OracleError};
use crate::message::{HandshakeKind, OutgoingMessage, ReceivedMessage};
use crate::wire::handshake::{HandshakeReassembler, encode_message, parse_server_hello_suite};
use crate::wire::record::{ContentType, Record, RecordBuffer, encode_records};

/// Upper bound on one receive phase, as a multiple of the idle timeout.
/// A peer that keeps trickling bytes cannot hold the oracle longer.
const RECEIVE_CEILING_FACTOR: u32 = 20;

/// Wait granted to the socket shutdown on close.
const CLOSE_GRACE: Duration = Duration::from_millis(50);

const READ_CHUNK: usize = 4096;

/// Builds [`WireEngine`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct WireEngineFactory;

impl WireEngineFactory {
    /// New factory
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl EngineFactory for WireEngineFactory {
    type Engine = WireEngine;

    fn configure(&self, config: &OracleConfig) -> WireEngine {
        WireEngine::new(config.clone())
    }
}

/// Client engine over one TCP connection
///
/// Records are written unprotected. After the peer's ChangeCipherSpec,
/// handshake and alert records are reported as encrypted without being
/// decoded.
#[derive(Debug)]
pub struct WireEngine {
    config: OracleConfig,
    stream: Option<TcpStream>,
    closed: bool,
    records: RecordBuffer,
    handshake: HandshakeReassembler,
    peer_cipher_active: bool,
    negotiated: Option<CipherSuite>,
}

impl WireEngine {
    /// Unconnected engine for `config`
    #[must_use]
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            stream: None,
            closed: true,
            records: RecordBuffer::new(),
            handshake: HandshakeReassembler::new(),
            peer_cipher_active: false,
            negotiated: None,
        }
    }

    fn key_exchange(&self) -> KeyExchange {
        self.negotiated.unwrap_or_else(|| self.config.selected_cipher_suite()).key_exchange()
    }

    fn mark_closed(&mut self) {
        self.closed = true;
    }

    fn decode_record(&mut self, record: Record, out: &mut Vec<ReceivedMessage>) {
        trace!(
            "record type={:?} version=0x{:04x} len={}",
            record.content_type,
            record.version,
            record.payload.len()
        );
        match record.content_type {
            ContentType::ChangeCipherSpec => {
                self.peer_cipher_active = true;
                out.push(ReceivedMessage::ChangeCipherSpec);
            }
            ContentType::Alert if self.peer_cipher_active => out.push(ReceivedMessage::EncryptedAlert),
            ContentType::Alert => {
                let mut alerts = record.payload.chunks_exact(2).peekable();
                if alerts.peek().is_none() {
                    out.push(ReceivedMessage::UnknownRecord(ContentType::Alert.to_byte()));
                }
                for pair in alerts {
                    out.push(ReceivedMessage::Alert(Alert::from_bytes(pair[0], pair[1])));
                }
            }
            ContentType::Handshake if self.peer_cipher_active => {
                out.push(ReceivedMessage::EncryptedHandshake);
            }
            ContentType::Handshake => {
                self.handshake.extend(&record.payload);
                while let Some((kind, body)) = self.handshake.next_message() {
                    if kind == HandshakeKind::ServerHello {
                        self.negotiated = parse_server_hello_suite(&body);
                        debug!("peer selected {:?}", self.negotiated);
                    }
                    out.push(ReceivedMessage::handshake(kind, self.key_exchange()));
                }
            }
            ContentType::ApplicationData => out.push(ReceivedMessage::ApplicationData),
            ContentType::Unknown(b) => out.push(ReceivedMessage::UnknownRecord(b)),
        }
    }

    fn drain_records(&mut self, out: &mut Vec<ReceivedMessage>) -> Result<(), OracleError> {
        while let Some(record) = self.records.next_record()? {
            self.decode_record(record, out);
        }
        Ok(())
    }
}

impl TlsEngine for WireEngine {
    async fn connect(&mut self) -> Result<(), OracleError> {
        let addr = self.config.target_addr();
        let connect = TcpStream::connect((self.config.target_host(), self.config.target_port()));
        let stream = match timeout(self.config.connect_timeout(), connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => return Err(OracleError::from(err)),
            Err(_) => {
                return Err(OracleError::transport(
                    format!("connect to {addr} timed out"),
                    ErrorCode::ConnectionTimeout,
                    OperationPhase::ConnectionSetup,
                ));
            }
        };
        stream.set_nodelay(true)?;
        debug!("connected to {}", addr);

        self.stream = Some(stream);
        self.closed = false;
        self.records.clear();
        self.handshake.clear();
        self.peer_cipher_active = false;
        self.negotiated = None;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn send(&mut self, message: &OutgoingMessage) -> Result<(), OracleError> {
        let (content_type, payload) = encode_message(message, &self.config);
        let bytes = encode_records(content_type, self.config.protocol_version().wire(), &payload);

        let written = match self.stream.as_mut() {
            Some(stream) if !self.closed => {
                match stream.write_all(&bytes).await {
                    Ok(()) => stream.flush().await,
                    Err(err) => Err(err),
                }
            }
            _ => {
                return Err(OracleError::transport(
                    "send on closed connection",
                    ErrorCode::WriteError,
                    OperationPhase::Send,
                ));
            }
        };

        match written {
            Ok(()) => {
                trace!("sent {} ({} bytes)", message.name(), bytes.len());
                Ok(())
            }
            Err(err) => {
                self.mark_closed();
                Err(OracleError::from(err).in_phase(OperationPhase::Send))
            }
        }
    }

    async fn receive_available(
        &mut self,
        idle: Duration,
    ) -> Result<Vec<ReceivedMessage>, OracleError> {
        let mut received = Vec::new();
        let Some(mut stream) = self.stream.take() else {
            self.mark_closed();
            return Ok(received);
        };

        let deadline = Instant::now() + idle.saturating_mul(RECEIVE_CEILING_FACTOR);
        let mut chunk = [0u8; READ_CHUNK];
        while !self.closed {
            let wait = idle.min(deadline.saturating_duration_since(Instant::now()));
            if wait.is_zero() {
                break;
            }
            match timeout(wait, stream.read(&mut chunk)).await {
                Err(_) => break,
                Ok(Ok(0)) => {
                    debug!("peer closed the connection");
                    self.mark_closed();
                }
                Ok(Ok(n)) => {
                    self.records.extend(&chunk[..n]);
                    if let Err(err) = self.drain_records(&mut received) {
                        warn!("dropping connection: {}", err);
                        self.mark_closed();
                    }
                }
                Ok(Err(err)) => {
                    debug!("read failed, treating connection as closed: {}", err);
                    self.mark_closed();
                }
            }
        }

        self.stream = Some(stream);
        Ok(received)
    }

    async fn close(&mut self) {
        self.closed = true;
        if let Some(mut stream) = self.stream.take() {
            if timeout(CLOSE_GRACE, stream.shutdown()).await.is_err() {
                debug!("shutdown did not finish within {:?}", CLOSE_GRACE);
            }
        }
    }

    fn negotiated_cipher_suite(&self) -> Option<CipherSuite> {
        self.negotiated
    }
}
