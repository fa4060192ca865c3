//! Input vocabulary.
//!
//! The vocabulary is closed: a line is either [`RESET`] or one of the
//! [`InputSymbol`] names, and each symbol owns the recipe for the message
//! it sends.

use std::fmt;
use std::str::FromStr;

use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::message::{APPLICATION_DATA_PROBE, OutgoingMessage};

/// Control token that resets the session
pub const RESET: &str = "RESET";

/// A symbol that sends one protocol message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSymbol {
    /// `ClientHello`
    ClientHello,
    /// `ServerHello`
    ServerHello,
    /// `Certificate`
    Certificate,
    /// `CertificateRequest`
    CertificateRequest,
    /// `DHEServerKeyExchange`
    DheServerKeyExchange,
    /// `ServerHelloDone`
    ServerHelloDone,
    /// `RSAClientKeyExchange`
    RsaClientKeyExchange,
    /// `DHClientKeyExchange`
    DhClientKeyExchange,
    /// `ECDHClientKeyExchange`
    EcdhClientKeyExchange,
    /// `ChangeCipherSpec`
    ChangeCipherSpec,
    /// `Finished`
    Finished,
    /// `ApplicationData`
    ApplicationData,
}

impl InputSymbol {
    /// The whole vocabulary, in table order
    pub const ALL: [InputSymbol; 12] = [
        InputSymbol::ClientHello,
        InputSymbol::ServerHello,
        InputSymbol::Certificate,
        InputSymbol::CertificateRequest,
        InputSymbol::DheServerKeyExchange,
        InputSymbol::ServerHelloDone,
        InputSymbol::RsaClientKeyExchange,
        InputSymbol::DhClientKeyExchange,
        InputSymbol::EcdhClientKeyExchange,
        InputSymbol::ChangeCipherSpec,
        InputSymbol::Finished,
        InputSymbol::ApplicationData,
    ];

    /// Name on the control channel
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            InputSymbol::ClientHello => "ClientHello",
            InputSymbol::ServerHello => "ServerHello",
            InputSymbol::Certificate => "Certificate",
            InputSymbol::CertificateRequest => "CertificateRequest",
            InputSymbol::DheServerKeyExchange => "DHEServerKeyExchange",
            InputSymbol::ServerHelloDone => "ServerHelloDone",
            InputSymbol::RsaClientKeyExchange => "RSAClientKeyExchange",
            InputSymbol::DhClientKeyExchange => "DHClientKeyExchange",
            InputSymbol::EcdhClientKeyExchange => "ECDHClientKeyExchange",
            InputSymbol::ChangeCipherSpec => "ChangeCipherSpec",
            InputSymbol::Finished => "Finished",
            InputSymbol::ApplicationData => "ApplicationData",
        }
    }

    /// Build the message this symbol sends
    #[must_use]
    pub fn build(self, config: &OracleConfig) -> OutgoingMessage {
        match self {
            InputSymbol::ClientHello => {
                OutgoingMessage::ClientHello { renegotiation_info: config.renegotiation_info() }
            }
            InputSymbol::ServerHello => OutgoingMessage::ServerHello,
            InputSymbol::Certificate => OutgoingMessage::Certificate,
            InputSymbol::CertificateRequest => OutgoingMessage::CertificateRequest,
            InputSymbol::DheServerKeyExchange => OutgoingMessage::DheServerKeyExchange,
            InputSymbol::ServerHelloDone => OutgoingMessage::ServerHelloDone,
            InputSymbol::RsaClientKeyExchange => OutgoingMessage::RsaClientKeyExchange,
            InputSymbol::DhClientKeyExchange => OutgoingMessage::DhClientKeyExchange,
            InputSymbol::EcdhClientKeyExchange => OutgoingMessage::EcdhClientKeyExchange,
            InputSymbol::ChangeCipherSpec => OutgoingMessage::ChangeCipherSpec,
            InputSymbol::Finished => OutgoingMessage::Finished,
            InputSymbol::ApplicationData => {
                OutgoingMessage::ApplicationData { payload: APPLICATION_DATA_PROBE.to_vec() }
            }
        }
    }
}

impl fmt::Display for InputSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InputSymbol {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InputSymbol::ALL
            .into_iter()
            .find(|symbol| symbol.name() == s)
            .ok_or_else(|| OracleError::unknown_symbol(s))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests use unwrap for simplicity
mod tests {
    use super::*;
    use crate::config::ConnectorSettings;
    use crate::error::ErrorCode;

    #[test]
    fn test_every_symbol_parses_back() {
        for symbol in InputSymbol::ALL {
            assert_eq!(symbol.name().parse::<InputSymbol>().unwrap(), symbol);
        }
    }

    #[test]
    fn test_symbol_names_match_messages() {
        let config = ConnectorSettings::default().resolve().unwrap();
        for symbol in InputSymbol::ALL {
            assert_eq!(symbol.build(&config).name(), symbol.name());
        }
    }

    #[test]
    fn test_unknown_names_rejected() {
        let err = "NotARealSymbol".parse::<InputSymbol>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownSymbol);
        // Matching is exact, and RESET is not a message symbol
        assert!(RESET.parse::<InputSymbol>().is_err());
        assert!("clienthello".parse::<InputSymbol>().is_err());
        assert!("ClientHello ".parse::<InputSymbol>().is_err());
    }

    #[test]
    fn test_client_hello_follows_renegotiation_flag() {
        let config = ConnectorSettings::default().with_renegotiation_info(false).resolve().unwrap();
        assert_eq!(
            InputSymbol::ClientHello.build(&config),
            OutgoingMessage::ClientHello { renegotiation_info: false }
        );
    }
}
