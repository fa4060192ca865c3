//! Handshake message encoding and reassembly.
//!
//! Every [`OutgoingMessage`] recipe is encoded here. Key material is fixed
//! placeholder data; nothing is signed, encrypted or MACed.

use chrono::Utc;

use crate::cipher_suite::{CipherSuite, KeyExchange};
use crate::config::OracleConfig;
use crate::message::{HandshakeKind, OutgoingMessage};
use crate::protocol::ProtocolVersion;
use crate::wire::record::ContentType;

/// Handshake header size: type(1) + length(3).
pub const HANDSHAKE_HEADER_LEN: usize = 4;

const EXT_SUPPORTED_GROUPS: u16 = 0x000a;
const EXT_EC_POINT_FORMATS: u16 = 0x000b;
const EXT_SIGNATURE_ALGORITHMS: u16 = 0x000d;
const EXT_RENEGOTIATION_INFO: u16 = 0xff01;

const GROUP_SECP256R1: u16 = 23;
const SIG_RSA_PKCS1_SHA256: u16 = 0x0401;
const SIG_ECDSA_SHA256: u16 = 0x0403;
const SIG_RSA_PKCS1_SHA1: u16 = 0x0201;
const CERT_TYPE_RSA_SIGN: u8 = 1;

/// Encode one outgoing message into the record content type and payload
/// it travels in.
#[must_use]
pub fn encode_message(message: &OutgoingMessage, config: &OracleConfig) -> (ContentType, Vec<u8>) {
    let version = config.protocol_version();
    match message {
        OutgoingMessage::ClientHello { renegotiation_info } => (
            ContentType::Handshake,
            handshake(HandshakeKind::ClientHello, &client_hello_body(config, *renegotiation_info)),
        ),
        OutgoingMessage::ServerHello => {
            (ContentType::Handshake, handshake(HandshakeKind::ServerHello, &server_hello_body(config)))
        }
        OutgoingMessage::Certificate => {
            // Empty certificate_list
            (ContentType::Handshake, handshake(HandshakeKind::Certificate, &[0, 0, 0]))
        }
        OutgoingMessage::CertificateRequest => (
            ContentType::Handshake,
            handshake(HandshakeKind::CertificateRequest, &certificate_request_body(version)),
        ),
        OutgoingMessage::DheServerKeyExchange => (
            ContentType::Handshake,
            handshake(HandshakeKind::ServerKeyExchange, &dhe_server_key_exchange_body(config)),
        ),
        OutgoingMessage::ServerHelloDone => {
            (ContentType::Handshake, handshake(HandshakeKind::ServerHelloDone, &[]))
        }
        OutgoingMessage::RsaClientKeyExchange => (
            ContentType::Handshake,
            handshake(HandshakeKind::ClientKeyExchange, &rsa_client_key_exchange_body(version)),
        ),
        OutgoingMessage::DhClientKeyExchange => {
            let public = config.dh().client_public_key().to_bytes_be();
            let mut body = Vec::with_capacity(public.len() + 2);
            put_vec16(&mut body, &public);
            (ContentType::Handshake, handshake(HandshakeKind::ClientKeyExchange, &body))
        }
        OutgoingMessage::EcdhClientKeyExchange => {
            let point = config.ec_public_point();
            let mut body = Vec::with_capacity(point.len() + 1);
            put_vec8(&mut body, point);
            (ContentType::Handshake, handshake(HandshakeKind::ClientKeyExchange, &body))
        }
        OutgoingMessage::ChangeCipherSpec => (ContentType::ChangeCipherSpec, vec![1]),
        OutgoingMessage::Finished => {
            let verify_len = if version == ProtocolVersion::Ssl3 { 36 } else { 12 };
            (ContentType::Handshake, handshake(HandshakeKind::Finished, &vec![0u8; verify_len]))
        }
        OutgoingMessage::ApplicationData { payload } => {
            (ContentType::ApplicationData, payload.clone())
        }
    }
}

/// Prefix `body` with a handshake header.
#[must_use]
pub fn handshake(kind: HandshakeKind, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HANDSHAKE_HEADER_LEN + body.len());
    out.push(kind.to_u8());
    put_u24(&mut out, body.len());
    out.extend_from_slice(body);
    out
}

fn client_hello_body(config: &OracleConfig, renegotiation_info: bool) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&config.protocol_version().wire().to_be_bytes());
    body.extend_from_slice(&hello_random());
    body.push(0); // empty session_id

    let suites: Vec<u8> =
        config.cipher_suites().iter().flat_map(|suite| suite.code().to_be_bytes()).collect();
    put_vec16(&mut body, &suites);
    put_vec8(&mut body, &[config.compression_method().wire()]);

    let mut extensions = Vec::new();
    if renegotiation_info {
        // Empty renegotiated_connection
        put_extension(&mut extensions, EXT_RENEGOTIATION_INFO, &[0]);
    }
    if config.cipher_suites().iter().any(|suite| suite.key_exchange() == KeyExchange::Ecdh) {
        let mut groups = Vec::new();
        put_vec16(&mut groups, &GROUP_SECP256R1.to_be_bytes());
        put_extension(&mut extensions, EXT_SUPPORTED_GROUPS, &groups);
        // uncompressed only
        put_extension(&mut extensions, EXT_EC_POINT_FORMATS, &[1, 0]);
    }
    if config.protocol_version().has_signature_algorithms() {
        let algorithms: Vec<u8> = [SIG_RSA_PKCS1_SHA256, SIG_ECDSA_SHA256, SIG_RSA_PKCS1_SHA1]
            .iter()
            .flat_map(|alg| alg.to_be_bytes())
            .collect();
        let mut list = Vec::new();
        put_vec16(&mut list, &algorithms);
        put_extension(&mut extensions, EXT_SIGNATURE_ALGORITHMS, &list);
    }
    if !extensions.is_empty() {
        put_vec16(&mut body, &extensions);
    }
    body
}

fn server_hello_body(config: &OracleConfig) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&config.protocol_version().wire().to_be_bytes());
    body.extend_from_slice(&hello_random());
    body.push(0);
    body.extend_from_slice(&config.selected_cipher_suite().code().to_be_bytes());
    body.push(config.compression_method().wire());
    body
}

fn certificate_request_body(version: ProtocolVersion) -> Vec<u8> {
    let mut body = Vec::new();
    put_vec8(&mut body, &[CERT_TYPE_RSA_SIGN]);
    if version.has_signature_algorithms() {
        put_vec16(&mut body, &SIG_RSA_PKCS1_SHA256.to_be_bytes());
    }
    // No certificate_authorities
    put_vec16(&mut body, &[]);
    body
}

fn dhe_server_key_exchange_body(config: &OracleConfig) -> Vec<u8> {
    let dh = config.dh();
    let mut body = Vec::new();
    put_vec16(&mut body, &dh.modulus().to_bytes_be());
    put_vec16(&mut body, &dh.generator().to_bytes_be());
    put_vec16(&mut body, &dh.server_public_key().to_bytes_be());
    if config.protocol_version().has_signature_algorithms() {
        body.extend_from_slice(&SIG_RSA_PKCS1_SHA256.to_be_bytes());
    }
    // Unsigned
    put_vec16(&mut body, &[]);
    body
}

fn rsa_client_key_exchange_body(version: ProtocolVersion) -> Vec<u8> {
    // Placeholder premaster: client_version followed by 46 fixed bytes
    let mut premaster = Vec::with_capacity(48);
    premaster.extend_from_slice(&version.wire().to_be_bytes());
    premaster.extend_from_slice(&[0x42; 46]);

    if version == ProtocolVersion::Ssl3 {
        premaster
    } else {
        let mut body = Vec::with_capacity(50);
        put_vec16(&mut body, &premaster);
        body
    }
}

fn hello_random() -> [u8; 32] {
    let mut random = [0u8; 32];
    let gmt_unix_time = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
    random[..4].copy_from_slice(&gmt_unix_time.to_be_bytes());
    let tail: [u8; 28] = rand::random();
    random[4..].copy_from_slice(&tail);
    random
}

fn put_u24(out: &mut Vec<u8>, value: usize) {
    let value = u32::try_from(value).unwrap_or(u32::MAX);
    out.extend_from_slice(&value.to_be_bytes()[1..]);
}

fn put_vec8(out: &mut Vec<u8>, data: &[u8]) {
    out.push(u8::try_from(data.len()).unwrap_or(u8::MAX));
    out.extend_from_slice(data);
}

fn put_vec16(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&u16::try_from(data.len()).unwrap_or(u16::MAX).to_be_bytes());
    out.extend_from_slice(data);
}

fn put_extension(out: &mut Vec<u8>, extension_type: u16, data: &[u8]) {
    out.extend_from_slice(&extension_type.to_be_bytes());
    put_vec16(out, data);
}

/// Cipher suite a ServerHello body selects, if the body is long enough
/// and the code point is in the catalog.
#[must_use]
pub fn parse_server_hello_suite(body: &[u8]) -> Option<CipherSuite> {
    // version(2) + random(32)
    let session_id_len = usize::from(*body.get(34)?);
    let offset = 35 + session_id_len;
    let code = u16::from_be_bytes([*body.get(offset)?, *body.get(offset + 1)?]);
    CipherSuite::from_code(code)
}

/// Reassembles handshake messages that span or share records.
#[derive(Debug, Default)]
pub struct HandshakeReassembler {
    buf: Vec<u8>,
}

impl HandshakeReassembler {
    /// Empty reassembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handshake record fragment.
    pub fn extend(&mut self, fragment: &[u8]) {
        self.buf.extend_from_slice(fragment);
    }

    /// Drop any partial message.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Bytes of an incomplete message.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete handshake message.
    pub fn next_message(&mut self) -> Option<(HandshakeKind, Vec<u8>)> {
        if self.buf.len() < HANDSHAKE_HEADER_LEN {
            return None;
        }
        let length = (usize::from(self.buf[1]) << 16)
            | (usize::from(self.buf[2]) << 8)
            | usize::from(self.buf[3]);
        if self.buf.len() < HANDSHAKE_HEADER_LEN + length {
            return None;
        }
        let kind = HandshakeKind::from_u8(self.buf[0]);
        let body = self.buf[HANDSHAKE_HEADER_LEN..HANDSHAKE_HEADER_LEN + length].to_vec();
        self.buf.drain(..HANDSHAKE_HEADER_LEN + length);
        Some((kind, body))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests use unwrap for simplicity
mod tests {
    use super::*;
    use crate::config::ConnectorSettings;

    fn config(version: &str, suites: &[&str]) -> OracleConfig {
        ConnectorSettings::new()
            .with_protocol_version(version)
            .with_cipher_suites(suites.iter().copied())
            .resolve()
            .unwrap()
    }

    fn body_of(message: &OutgoingMessage, config: &OracleConfig) -> (HandshakeKind, Vec<u8>) {
        let (content_type, payload) = encode_message(message, config);
        assert_eq!(content_type, ContentType::Handshake);
        let mut reassembler = HandshakeReassembler::new();
        reassembler.extend(&payload);
        let decoded = reassembler.next_message().unwrap();
        assert_eq!(reassembler.pending(), 0);
        decoded
    }

    #[test]
    fn test_client_hello_offers_configured_suites() {
        let config = config("TLS12", &["TLS_RSA_WITH_AES_128_CBC_SHA256", "TLS_RSA_WITH_AES_128_CBC_SHA"]);
        let (kind, body) =
            body_of(&OutgoingMessage::ClientHello { renegotiation_info: true }, &config);
        assert_eq!(kind, HandshakeKind::ClientHello);
        assert_eq!(&body[..2], &[0x03, 0x03]);
        assert_eq!(body[34], 0); // session_id
        assert_eq!(&body[35..41], &[0x00, 0x04, 0x00, 0x3C, 0x00, 0x2F]);
        assert_eq!(&body[41..43], &[1, 0]); // NULL compression
        let extensions = &body[45..];
        assert_eq!(&extensions[..5], &[0xff, 0x01, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_client_hello_without_extensions_on_ssl3() {
        let config = config("SSL3", &["TLS_RSA_WITH_AES_128_CBC_SHA"]);
        let (_, body) =
            body_of(&OutgoingMessage::ClientHello { renegotiation_info: false }, &config);
        // version + random + sid + suites(2+2) + compression(1+1)
        assert_eq!(body.len(), 2 + 32 + 1 + 4 + 2);
    }

    #[test]
    fn test_server_hello_round_trips_selected_suite() {
        let config = config("TLS12", &["TLS_DHE_RSA_WITH_AES_128_CBC_SHA"]);
        let (kind, body) = body_of(&OutgoingMessage::ServerHello, &config);
        assert_eq!(kind, HandshakeKind::ServerHello);
        assert_eq!(
            parse_server_hello_suite(&body),
            Some(CipherSuite::TLS_DHE_RSA_WITH_AES_128_CBC_SHA)
        );
        assert_eq!(parse_server_hello_suite(&body[..20]), None);
    }

    #[test]
    fn test_key_exchange_payload_shapes() {
        let tls12 = config("TLS12", &[]);
        let (_, rsa) = body_of(&OutgoingMessage::RsaClientKeyExchange, &tls12);
        assert_eq!(rsa.len(), 50);
        let (_, ecdh) = body_of(&OutgoingMessage::EcdhClientKeyExchange, &tls12);
        assert_eq!(ecdh[0], 65);
        assert_eq!(ecdh[1], 0x04);
        let (_, dh) = body_of(&OutgoingMessage::DhClientKeyExchange, &tls12);
        let announced = usize::from(u16::from_be_bytes([dh[0], dh[1]]));
        assert_eq!(announced, dh.len() - 2);

        let ssl3 = config("SSL3", &[]);
        let (_, rsa) = body_of(&OutgoingMessage::RsaClientKeyExchange, &ssl3);
        assert_eq!(rsa.len(), 48);
        let (_, finished) = body_of(&OutgoingMessage::Finished, &ssl3);
        assert_eq!(finished.len(), 36);
    }

    #[test]
    fn test_non_handshake_messages() {
        let config = config("TLS12", &[]);
        assert_eq!(
            encode_message(&OutgoingMessage::ChangeCipherSpec, &config),
            (ContentType::ChangeCipherSpec, vec![1])
        );
        let app = OutgoingMessage::ApplicationData { payload: b"GET / HTTP/1.0\n".to_vec() };
        assert_eq!(
            encode_message(&app, &config),
            (ContentType::ApplicationData, b"GET / HTTP/1.0\n".to_vec())
        );
    }

    #[test]
    fn test_reassembly_across_fragments() {
        let message = handshake(HandshakeKind::ServerHelloDone, &[]);
        let certificate = handshake(HandshakeKind::Certificate, &[0, 0, 0]);
        let mut stream = certificate.clone();
        stream.extend_from_slice(&message);

        let mut reassembler = HandshakeReassembler::new();
        reassembler.extend(&stream[..3]);
        assert!(reassembler.next_message().is_none());
        reassembler.extend(&stream[3..]);
        assert_eq!(reassembler.next_message().unwrap().0, HandshakeKind::Certificate);
        assert_eq!(reassembler.next_message().unwrap(), (HandshakeKind::ServerHelloDone, vec![]));
        assert!(reassembler.next_message().is_none());
    }
}
