//! Protocol messages exchanged with a [`TlsEngine`](crate::engine::TlsEngine).
//!
//! [`OutgoingMessage`] is what an input symbol builds; [`ReceivedMessage`] is
//! what the engine hands back and what the response encoder names.

use std::borrow::Cow;

use crate::alert::Alert;
use crate::cipher_suite::KeyExchange;

/// Payload of the `ApplicationData` probe
pub const APPLICATION_DATA_PROBE: &[u8] = b"GET / HTTP/1.0\n";

/// A message the oracle sends on behalf of the learner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingMessage {
    /// ClientHello, optionally with the renegotiation_info extension
    ClientHello {
        /// Include an empty renegotiation_info extension
        renegotiation_info: bool,
    },
    /// ServerHello echoing the selected suite
    ServerHello,
    /// Certificate with an empty chain
    Certificate,
    /// CertificateRequest
    CertificateRequest,
    /// ServerKeyExchange carrying DH parameters
    DheServerKeyExchange,
    /// ServerHelloDone
    ServerHelloDone,
    /// ClientKeyExchange with an RSA encrypted premaster secret
    RsaClientKeyExchange,
    /// ClientKeyExchange with the client DH public value
    DhClientKeyExchange,
    /// ClientKeyExchange with the client EC point
    EcdhClientKeyExchange,
    /// ChangeCipherSpec
    ChangeCipherSpec,
    /// Finished
    Finished,
    /// Application data record
    ApplicationData {
        /// Record payload
        payload: Vec<u8>,
    },
}

impl OutgoingMessage {
    /// Structural name, identical to the input symbol that builds it
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            OutgoingMessage::ClientHello { .. } => "ClientHello",
            OutgoingMessage::ServerHello => "ServerHello",
            OutgoingMessage::Certificate => "Certificate",
            OutgoingMessage::CertificateRequest => "CertificateRequest",
            OutgoingMessage::DheServerKeyExchange => "DHEServerKeyExchange",
            OutgoingMessage::ServerHelloDone => "ServerHelloDone",
            OutgoingMessage::RsaClientKeyExchange => "RSAClientKeyExchange",
            OutgoingMessage::DhClientKeyExchange => "DHClientKeyExchange",
            OutgoingMessage::EcdhClientKeyExchange => "ECDHClientKeyExchange",
            OutgoingMessage::ChangeCipherSpec => "ChangeCipherSpec",
            OutgoingMessage::Finished => "Finished",
            OutgoingMessage::ApplicationData { .. } => "ApplicationData",
        }
    }
}

/// Handshake message type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeKind {
    /// 0
    HelloRequest,
    /// 1
    ClientHello,
    /// 2
    ServerHello,
    /// 4
    NewSessionTicket,
    /// 11
    Certificate,
    /// 12
    ServerKeyExchange,
    /// 13
    CertificateRequest,
    /// 14
    ServerHelloDone,
    /// 15
    CertificateVerify,
    /// 16
    ClientKeyExchange,
    /// 20
    Finished,
    /// 22
    CertificateStatus,
    /// Anything else
    Unknown(u8),
}

impl HandshakeKind {
    /// Decode a handshake type byte
    #[must_use]
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::HelloRequest,
            1 => Self::ClientHello,
            2 => Self::ServerHello,
            4 => Self::NewSessionTicket,
            11 => Self::Certificate,
            12 => Self::ServerKeyExchange,
            13 => Self::CertificateRequest,
            14 => Self::ServerHelloDone,
            15 => Self::CertificateVerify,
            16 => Self::ClientKeyExchange,
            20 => Self::Finished,
            22 => Self::CertificateStatus,
            other => Self::Unknown(other),
        }
    }

    /// Handshake type byte
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::HelloRequest => 0,
            Self::ClientHello => 1,
            Self::ServerHello => 2,
            Self::NewSessionTicket => 4,
            Self::Certificate => 11,
            Self::ServerKeyExchange => 12,
            Self::CertificateRequest => 13,
            Self::ServerHelloDone => 14,
            Self::CertificateVerify => 15,
            Self::ClientKeyExchange => 16,
            Self::Finished => 20,
            Self::CertificateStatus => 22,
            Self::Unknown(v) => v,
        }
    }
}

/// A message observed from the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedMessage {
    /// Plaintext handshake message
    Handshake {
        /// Handshake type
        kind: HandshakeKind,
        /// Key-exchange family in effect when the message arrived
        key_exchange: KeyExchange,
    },
    /// ChangeCipherSpec
    ChangeCipherSpec,
    /// Plaintext alert
    Alert(Alert),
    /// Application data record
    ApplicationData,
    /// Handshake record sent under the peer's new cipher state
    EncryptedHandshake,
    /// Alert record sent under the peer's new cipher state
    EncryptedAlert,
    /// Record with an unassigned content type
    UnknownRecord(u8),
}

impl ReceivedMessage {
    /// Handshake message of the given kind
    #[must_use]
    pub fn handshake(kind: HandshakeKind, key_exchange: KeyExchange) -> Self {
        ReceivedMessage::Handshake { kind, key_exchange }
    }

    /// Compact structural name: the descriptor the learner sees
    #[must_use]
    pub fn descriptor(&self) -> Cow<'static, str> {
        match self {
            ReceivedMessage::Handshake { kind, key_exchange } => match kind {
                HandshakeKind::HelloRequest => "HelloRequest".into(),
                HandshakeKind::ClientHello => "ClientHello".into(),
                HandshakeKind::ServerHello => "ServerHello".into(),
                HandshakeKind::NewSessionTicket => "NewSessionTicket".into(),
                HandshakeKind::Certificate => "Certificate".into(),
                HandshakeKind::ServerKeyExchange => key_exchange.server_key_exchange_name().into(),
                HandshakeKind::CertificateRequest => "CertificateRequest".into(),
                HandshakeKind::ServerHelloDone => "ServerHelloDone".into(),
                HandshakeKind::CertificateVerify => "CertificateVerify".into(),
                HandshakeKind::ClientKeyExchange => key_exchange.client_key_exchange_name().into(),
                HandshakeKind::Finished => "Finished".into(),
                HandshakeKind::CertificateStatus => "CertificateStatus".into(),
                HandshakeKind::Unknown(_) => "UnknownHandshake".into(),
            },
            ReceivedMessage::ChangeCipherSpec => "ChangeCipherSpec".into(),
            ReceivedMessage::Alert(alert) => alert.descriptor().into(),
            ReceivedMessage::ApplicationData => "ApplicationData".into(),
            ReceivedMessage::EncryptedHandshake => "EncryptedHandshake".into(),
            ReceivedMessage::EncryptedAlert => "EncryptedAlert".into(),
            ReceivedMessage::UnknownRecord(_) => "UnknownRecord".into(),
        }
    }
}
