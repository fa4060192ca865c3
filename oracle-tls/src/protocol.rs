//! Protocol version and compression method catalogs.

use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorCode, OracleError};

/// Protocol versions the oracle can speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// SSL 3.0
    Ssl3,
    /// TLS 1.0
    Tls10,
    /// TLS 1.1
    Tls11,
    /// TLS 1.2
    Tls12,
}

impl ProtocolVersion {
    /// Every supported version, oldest first
    pub const ALL: [ProtocolVersion; 4] =
        [ProtocolVersion::Ssl3, ProtocolVersion::Tls10, ProtocolVersion::Tls11, ProtocolVersion::Tls12];

    /// Two-byte wire value
    #[must_use]
    pub const fn wire(self) -> u16 {
        match self {
            ProtocolVersion::Ssl3 => 0x0300,
            ProtocolVersion::Tls10 => 0x0301,
            ProtocolVersion::Tls11 => 0x0302,
            ProtocolVersion::Tls12 => 0x0303,
        }
    }

    /// Operator facing name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ProtocolVersion::Ssl3 => "SSL3",
            ProtocolVersion::Tls10 => "TLS10",
            ProtocolVersion::Tls11 => "TLS11",
            ProtocolVersion::Tls12 => "TLS12",
        }
    }

    /// Signature algorithms are negotiated explicitly from TLS 1.2 on
    #[must_use]
    pub fn has_signature_algorithms(self) -> bool {
        self == ProtocolVersion::Tls12
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProtocolVersion {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProtocolVersion::ALL.into_iter().find(|v| v.name().eq_ignore_ascii_case(s)).ok_or_else(|| {
            OracleError::config(
                "protocol_version",
                format!("Unknown ProtocolVersion {s}"),
                ErrorCode::InvalidProtocolVersion,
            )
        })
    }
}

/// Record compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    /// No compression
    Null,
    /// DEFLATE (RFC 3749)
    Deflate,
    /// LZS (RFC 3943)
    Lzs,
}

impl CompressionMethod {
    /// Every known method
    pub const ALL: [CompressionMethod; 3] =
        [CompressionMethod::Null, CompressionMethod::Deflate, CompressionMethod::Lzs];

    /// One-byte wire value
    #[must_use]
    pub const fn wire(self) -> u8 {
        match self {
            CompressionMethod::Null => 0,
            CompressionMethod::Deflate => 1,
            CompressionMethod::Lzs => 64,
        }
    }

    /// Operator facing name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            CompressionMethod::Null => "NULL",
            CompressionMethod::Deflate => "DEFLATE",
            CompressionMethod::Lzs => "LZS",
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionMethod {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompressionMethod::ALL.into_iter().find(|m| m.name() == s).ok_or_else(|| {
            OracleError::config(
                "compression_method",
                format!("Unknown CompressionMethod {s}"),
                ErrorCode::InvalidCompressionMethod,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_version_parse() {
        assert_eq!("TLS12".parse::<ProtocolVersion>().ok(), Some(ProtocolVersion::Tls12));
        assert_eq!("ssl3".parse::<ProtocolVersion>().ok(), Some(ProtocolVersion::Ssl3));
        assert_eq!(ProtocolVersion::Tls11.wire(), 0x0302);
    }

    #[test]
    fn test_protocol_version_unknown() {
        let err = "TLS99".parse::<ProtocolVersion>().err();
        assert_eq!(err.map(|e| e.code()), Some(ErrorCode::InvalidProtocolVersion));
    }

    #[test]
    fn test_compression_method_parse() {
        assert_eq!("NULL".parse::<CompressionMethod>().ok(), Some(CompressionMethod::Null));
        assert_eq!(CompressionMethod::Lzs.wire(), 64);
        let err = "ZSTD".parse::<CompressionMethod>().err();
        assert_eq!(err.map(|e| e.code()), Some(ErrorCode::InvalidCompressionMethod));
    }
}
