//! TLS record layer framing (RFC 5246 section 6.2).
//!
//! Plaintext only: the wire engine writes every record unprotected and hands
//! records arriving under the peer's cipher state to the caller undecoded.

use crate::error::{ErrorCode, OperationPhase, OracleError};

/// TLS record content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// 20
    ChangeCipherSpec,
    /// 21
    Alert,
    /// 22
    Handshake,
    /// 23
    ApplicationData,
    /// Any other byte
    Unknown(u8),
}

impl ContentType {
    /// Decode a content type byte.
    #[must_use]
    pub fn from_byte(b: u8) -> Self {
        match b {
            20 => Self::ChangeCipherSpec,
            21 => Self::Alert,
            22 => Self::Handshake,
            23 => Self::ApplicationData,
            other => Self::Unknown(other),
        }
    }

    /// Content type byte.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            Self::ChangeCipherSpec => 20,
            Self::Alert => 21,
            Self::Handshake => 22,
            Self::ApplicationData => 23,
            Self::Unknown(b) => b,
        }
    }
}

/// Record header size.
pub const RECORD_HEADER_LEN: usize = 5;

/// Largest plaintext fragment a record may carry.
pub const MAX_FRAGMENT_LEN: usize = 1 << 14;

/// Largest fragment accepted from the peer: ciphertext expansion included.
pub const MAX_INBOUND_FRAGMENT_LEN: usize = MAX_FRAGMENT_LEN + 2048;

/// One decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Content type
    pub content_type: ContentType,
    /// Record layer version field
    pub version: u16,
    /// Fragment
    pub payload: Vec<u8>,
}

/// Frame `payload` into records of at most [`MAX_FRAGMENT_LEN`] bytes.
///
/// An empty payload still produces one (empty) record.
#[must_use]
pub fn encode_records(content_type: ContentType, version: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + RECORD_HEADER_LEN);
    let mut chunks = payload.chunks(MAX_FRAGMENT_LEN).peekable();
    if chunks.peek().is_none() {
        push_record(&mut out, content_type, version, &[]);
    }
    for chunk in chunks {
        push_record(&mut out, content_type, version, chunk);
    }
    out
}

fn push_record(out: &mut Vec<u8>, content_type: ContentType, version: u16, fragment: &[u8]) {
    out.push(content_type.to_byte());
    out.extend_from_slice(&version.to_be_bytes());
    // fragment.len() <= MAX_FRAGMENT_LEN, fits in u16
    out.extend_from_slice(&(fragment.len() as u16).to_be_bytes());
    out.extend_from_slice(fragment);
}

/// Accumulates inbound bytes and yields complete records.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    buf: Vec<u8>,
}

impl RecordBuffer {
    /// Empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the socket.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes not yet consumed as a record.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Pop the next complete record, if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns a `MalformedRecord` transport error when the header announces
    /// a fragment longer than any peer may send.
    pub fn next_record(&mut self) -> Result<Option<Record>, OracleError> {
        if self.buf.len() < RECORD_HEADER_LEN {
            return Ok(None);
        }
        let length = usize::from(u16::from_be_bytes([self.buf[3], self.buf[4]]));
        if length > MAX_INBOUND_FRAGMENT_LEN {
            return Err(OracleError::transport(
                format!("record fragment of {length} bytes exceeds limit"),
                ErrorCode::MalformedRecord,
                OperationPhase::Receive,
            ));
        }
        if self.buf.len() < RECORD_HEADER_LEN + length {
            return Ok(None);
        }

        let content_type = ContentType::from_byte(self.buf[0]);
        let version = u16::from_be_bytes([self.buf[1], self.buf[2]]);
        let payload = self.buf[RECORD_HEADER_LEN..RECORD_HEADER_LEN + length].to_vec();
        self.buf.drain(..RECORD_HEADER_LEN + length);

        Ok(Some(Record { content_type, version, payload }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_encode_single_record() {
        let bytes = encode_records(ContentType::ChangeCipherSpec, 0x0303, &[1]);
        assert_eq!(bytes, vec![20, 0x03, 0x03, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn test_encode_fragments_large_payload() {
        let payload = vec![0xAB; MAX_FRAGMENT_LEN + 10];
        let bytes = encode_records(ContentType::ApplicationData, 0x0303, &payload);
        assert_eq!(bytes.len(), payload.len() + 2 * RECORD_HEADER_LEN);

        let mut buffer = RecordBuffer::new();
        buffer.extend(&bytes);
        let first = buffer.next_record().unwrap().unwrap();
        let second = buffer.next_record().unwrap().unwrap();
        assert_eq!(first.payload.len(), MAX_FRAGMENT_LEN);
        assert_eq!(second.payload.len(), 10);
        assert!(buffer.next_record().unwrap().is_none());
    }

    #[test]
    fn test_buffer_waits_for_complete_record() {
        let bytes = encode_records(ContentType::Alert, 0x0303, &[2, 40]);
        let mut buffer = RecordBuffer::new();
        buffer.extend(&bytes[..4]);
        assert!(buffer.next_record().unwrap().is_none());
        buffer.extend(&bytes[4..]);
        let record = buffer.next_record().unwrap().unwrap();
        assert_eq!(record.content_type, ContentType::Alert);
        assert_eq!(record.payload, vec![2, 40]);
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn test_oversized_record_rejected() {
        let mut buffer = RecordBuffer::new();
        buffer.extend(&[22, 0x03, 0x03, 0xFF, 0xFF]);
        let err = buffer.next_record().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedRecord);
    }

    #[test]
    fn test_unknown_content_type_preserved() {
        let bytes = encode_records(ContentType::Unknown(99), 0x0301, b"x");
        let mut buffer = RecordBuffer::new();
        buffer.extend(&bytes);
        let record = buffer.next_record().unwrap().unwrap();
        assert_eq!(record.content_type, ContentType::Unknown(99));
        assert_eq!(record.version, 0x0301);
    }
}
