//! TLS alert levels and descriptions (RFC 5246 section 7.2).
//!
//! Names are the ones the learner sees inside `ALERT_<LEVEL>_<DESCRIPTION>`
//! descriptors, so they must stay stable.

use std::fmt;

/// Alert level byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertLevel {
    /// 1
    Warning,
    /// 2
    Fatal,
    /// Any other value the peer put on the wire
    Undefined(u8),
}

impl AlertLevel {
    /// Decode a raw level byte.
    #[must_use]
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Warning,
            2 => Self::Fatal,
            other => Self::Undefined(other),
        }
    }

    /// Raw level byte.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Warning => 1,
            Self::Fatal => 2,
            Self::Undefined(v) => v,
        }
    }

    /// Upper-case name used in descriptors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            Self::Fatal => "FATAL",
            Self::Undefined(_) => "UNDEFINED",
        }
    }
}

macro_rules! alert_descriptions {
    ($( $variant:ident = $code:literal => $name:literal, )*) => {
        /// Alert description byte.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum AlertDescription {
            $(
                #[doc = $name]
                $variant,
            )*
            /// Code outside the registry
            Unknown(u8),
        }

        impl AlertDescription {
            /// Decode a raw description byte.
            #[must_use]
            pub fn from_u8(v: u8) -> Self {
                match v {
                    $( $code => Self::$variant, )*
                    other => Self::Unknown(other),
                }
            }

            /// Raw description byte.
            #[must_use]
            pub fn to_u8(self) -> u8 {
                match self {
                    $( Self::$variant => $code, )*
                    Self::Unknown(v) => v,
                }
            }

            /// Lower-case registry name, `unknown_<code>` for unregistered codes.
            #[must_use]
            pub fn name(self) -> std::borrow::Cow<'static, str> {
                match self {
                    $( Self::$variant => std::borrow::Cow::Borrowed($name), )*
                    Self::Unknown(v) => std::borrow::Cow::Owned(format!("unknown_{v}")),
                }
            }
        }
    };
}

alert_descriptions! {
    CloseNotify = 0 => "close_notify",
    UnexpectedMessage = 10 => "unexpected_message",
    BadRecordMac = 20 => "bad_record_mac",
    DecryptionFailed = 21 => "decryption_failed",
    RecordOverflow = 22 => "record_overflow",
    DecompressionFailure = 30 => "decompression_failure",
    HandshakeFailure = 40 => "handshake_failure",
    NoCertificate = 41 => "no_certificate",
    BadCertificate = 42 => "bad_certificate",
    UnsupportedCertificate = 43 => "unsupported_certificate",
    CertificateRevoked = 44 => "certificate_revoked",
    CertificateExpired = 45 => "certificate_expired",
    CertificateUnknown = 46 => "certificate_unknown",
    IllegalParameter = 47 => "illegal_parameter",
    UnknownCa = 48 => "unknown_ca",
    AccessDenied = 49 => "access_denied",
    DecodeError = 50 => "decode_error",
    DecryptError = 51 => "decrypt_error",
    ExportRestriction = 60 => "export_restriction",
    ProtocolVersion = 70 => "protocol_version",
    InsufficientSecurity = 71 => "insufficient_security",
    InternalError = 80 => "internal_error",
    InappropriateFallback = 86 => "inappropriate_fallback",
    UserCanceled = 90 => "user_canceled",
    NoRenegotiation = 100 => "no_renegotiation",
    UnsupportedExtension = 110 => "unsupported_extension",
    CertificateUnobtainable = 111 => "certificate_unobtainable",
    UnrecognizedName = 112 => "unrecognized_name",
    BadCertificateStatusResponse = 113 => "bad_certificate_status_response",
    BadCertificateHashValue = 114 => "bad_certificate_hash_value",
    UnknownPskIdentity = 115 => "unknown_psk_identity",
}

/// A decoded alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Alert {
    /// Level byte
    pub level: AlertLevel,
    /// Description byte
    pub description: AlertDescription,
}

impl Alert {
    /// Build from the two raw bytes of an alert record.
    #[must_use]
    pub fn from_bytes(level: u8, description: u8) -> Self {
        Self { level: AlertLevel::from_u8(level), description: AlertDescription::from_u8(description) }
    }

    /// `ALERT_<LEVEL>_<description>`
    #[must_use]
    pub fn descriptor(&self) -> String {
        format!("ALERT_{}_{}", self.level.name(), self.description.name())
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor())
    }
}
