#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Oracle Configuration
//!
//! Two layers:
//! - [`ConnectorSettings`]: the string-typed operator surface, straight from
//!   the command line
//! - [`OracleConfig`]: the resolved, immutable configuration every session
//!   is built from
//!
//! [`ConnectorSettings::resolve`] is the only way to get an [`OracleConfig`]
//! from operator input, and it rejects anything that does not resolve before
//! any socket is opened.
//!
//! ```
//! use oracle_tls::config::ConnectorSettings;
//!
//! let config = ConnectorSettings::new()
//!     .with_target("localhost", 4433)
//!     .with_cipher_suites(["TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256"])
//!     .resolve()
//!     .unwrap();
//! assert_eq!(config.selected_cipher_suite().name(), "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256");
//! ```

use std::fmt;
use std::time::Duration;

use num_bigint::BigUint;
use zeroize::Zeroizing;

use crate::cipher_suite::CipherSuite;
use crate::error::{ErrorCode, OracleError};
use crate::protocol::{CompressionMethod, ProtocolVersion};
use crate::recovery::RetryPolicy;

/// Default control-channel listen port
pub const DEFAULT_LISTEN_PORT: u16 = 6666;
/// Default target host
pub const DEFAULT_TARGET_HOST: &str = "localhost";
/// Default target port
pub const DEFAULT_TARGET_PORT: u16 = 4433;
/// Default receive timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 100;
/// Default connect timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
/// Suite offered when none is configured
pub const DEFAULT_CIPHER_SUITE: CipherSuite = CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA256;

const DH_GENERATOR: &str = "2";
const DH_MODULUS: &str = "6668014432879854274002278852208614463049243575172486268847999412414761893973482255240669516874141524239224030057949495697186951824868185545819975637245503840103415249493026666167468715286478870340074507098367006866803177055300900777576918011";
const DH_PRIVATE_KEY: &str =
    "30757838539894352412510553993926388250692636687493810307136098911018166940950";

/// Uncompressed secp256r1 base point, sent as the client ECDH public value
pub const P256_GENERATOR_POINT: [u8; 65] = [
    0x04, 0x6b, 0x17, 0xd1, 0xf2, 0xe1, 0x2c, 0x42, 0x47, 0xf8, 0xbc, 0xe6, 0xe5, 0x63, 0xa4,
    0x40, 0xf2, 0x77, 0x03, 0x7d, 0x81, 0x2d, 0xeb, 0x33, 0xa0, 0xf4, 0xa1, 0x39, 0x45, 0xd8,
    0x98, 0xc2, 0x96, 0x4f, 0xe3, 0x42, 0xe2, 0xfe, 0x1a, 0x7f, 0x9b, 0x8e, 0xe7, 0xeb, 0x4a,
    0x7c, 0x0f, 0x9e, 0x16, 0x2b, 0xce, 0x33, 0x57, 0x6b, 0x31, 0x5e, 0xce, 0xcb, 0xb6, 0x40,
    0x68, 0x37, 0xbf, 0x51, 0xf5,
];

/// Fixed Diffie-Hellman parameters
///
/// Private keys are held as zeroized big-endian bytes and never appear in
/// `Debug` output.
#[derive(Clone)]
pub struct DhParameters {
    generator: BigUint,
    modulus: BigUint,
    client_private_key: Zeroizing<Vec<u8>>,
    client_public_key: BigUint,
    server_private_key: Zeroizing<Vec<u8>>,
    server_public_key: BigUint,
}

impl DhParameters {
    /// Build from explicit values
    #[must_use]
    pub fn new(
        generator: BigUint,
        modulus: BigUint,
        client_private_key: &BigUint,
        client_public_key: BigUint,
        server_private_key: &BigUint,
        server_public_key: BigUint,
    ) -> Self {
        Self {
            generator,
            modulus,
            client_private_key: Zeroizing::new(client_private_key.to_bytes_be()),
            client_public_key,
            server_private_key: Zeroizing::new(server_private_key.to_bytes_be()),
            server_public_key,
        }
    }

    /// The fixed parameter set: generator 2, an 800-bit modulus, identical
    /// client and server key pairs whose public value is the modulus itself
    ///
    /// # Errors
    ///
    /// Returns an internal error if the built-in constants fail to parse.
    pub fn fixed() -> Result<Self, OracleError> {
        let generator = parse_decimal(DH_GENERATOR)?;
        let modulus = parse_decimal(DH_MODULUS)?;
        let private_key = parse_decimal(DH_PRIVATE_KEY)?;
        Ok(Self::new(generator, modulus.clone(), &private_key, modulus.clone(), &private_key, modulus))
    }

    /// Group generator
    #[must_use]
    pub fn generator(&self) -> &BigUint {
        &self.generator
    }

    /// Group modulus
    #[must_use]
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Client public value
    #[must_use]
    pub fn client_public_key(&self) -> &BigUint {
        &self.client_public_key
    }

    /// Server public value
    #[must_use]
    pub fn server_public_key(&self) -> &BigUint {
        &self.server_public_key
    }

    /// Client private exponent
    #[must_use]
    pub fn client_private_key(&self) -> BigUint {
        BigUint::from_bytes_be(&self.client_private_key)
    }

    /// Server private exponent
    #[must_use]
    pub fn server_private_key(&self) -> BigUint {
        BigUint::from_bytes_be(&self.server_private_key)
    }
}

impl fmt::Debug for DhParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DhParameters")
            .field("generator", &self.generator)
            .field("modulus_bits", &self.modulus.bits())
            .field("client_private_key", &"[REDACTED]")
            .field("server_private_key", &"[REDACTED]")
            .finish()
    }
}

fn parse_decimal(digits: &str) -> Result<BigUint, OracleError> {
    BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| OracleError::internal(format!("invalid decimal constant {digits:.16}...")))
}

/// Operator supplied settings, as strings and raw numbers
#[derive(Debug, Clone)]
pub struct ConnectorSettings {
    /// Control-channel listen port
    pub listen_port: u16,
    /// Target host
    pub target_host: String,
    /// Target port
    pub target_port: u16,
    /// Receive timeout in milliseconds
    pub timeout_ms: u64,
    /// Offered cipher suites by IANA name, first is selected
    pub cipher_suites: Vec<String>,
    /// Protocol version name
    pub protocol_version: String,
    /// Compression method name
    pub compression_method: String,
    /// Add the renegotiation_info extension to ClientHello
    pub renegotiation_info: bool,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Retry policy for opening the target connection
    pub connect_retry: RetryPolicy,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            target_host: DEFAULT_TARGET_HOST.to_string(),
            target_port: DEFAULT_TARGET_PORT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cipher_suites: Vec::new(),
            protocol_version: ProtocolVersion::Tls12.name().to_string(),
            compression_method: CompressionMethod::Null.name().to_string(),
            renegotiation_info: true,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            connect_retry: RetryPolicy::default(),
        }
    }
}

impl ConnectorSettings {
    /// Settings with every default applied
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the control-channel listen port
    #[must_use]
    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Set the target host and port
    #[must_use]
    pub fn with_target(mut self, host: impl Into<String>, port: u16) -> Self {
        self.target_host = host.into();
        self.target_port = port;
        self
    }

    /// Set the receive timeout
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the offered cipher suites
    #[must_use]
    pub fn with_cipher_suites<I, S>(mut self, suites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cipher_suites = suites.into_iter().map(Into::into).collect();
        self
    }

    /// Set the protocol version name
    #[must_use]
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Set the compression method name
    #[must_use]
    pub fn with_compression_method(mut self, method: impl Into<String>) -> Self {
        self.compression_method = method.into();
        self
    }

    /// Enable or disable the renegotiation_info extension
    #[must_use]
    pub fn with_renegotiation_info(mut self, enable: bool) -> Self {
        self.renegotiation_info = enable;
        self
    }

    /// Set the connect timeout
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    /// Set the connect retry policy
    #[must_use]
    pub fn with_connect_retry(mut self, policy: RetryPolicy) -> Self {
        self.connect_retry = policy;
        self
    }

    /// Resolve every name and validate every number
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Config`] naming the first field that does not
    /// resolve.
    pub fn resolve(&self) -> Result<OracleConfig, OracleError> {
        if self.target_host.trim().is_empty() {
            return Err(OracleError::config(
                "target_host",
                "Target host must not be empty",
                ErrorCode::InvalidConfig,
            ));
        }
        if self.target_port == 0 {
            return Err(OracleError::config(
                "target_port",
                "Target port must not be 0",
                ErrorCode::InvalidConfig,
            ));
        }
        if self.timeout_ms == 0 {
            return Err(OracleError::config(
                "timeout",
                "Receive timeout must be at least 1 ms",
                ErrorCode::InvalidConfig,
            ));
        }

        let cipher_suites = if self.cipher_suites.is_empty() {
            vec![DEFAULT_CIPHER_SUITE]
        } else {
            self.cipher_suites
                .iter()
                .map(|name| {
                    CipherSuite::from_name(name.trim()).ok_or_else(|| {
                        OracleError::config(
                            "cipher_suites",
                            format!("Unknown CipherSuite {name}"),
                            ErrorCode::InvalidCipherSuite,
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let protocol_version: ProtocolVersion = self.protocol_version.parse()?;
        let compression_method: CompressionMethod = self.compression_method.parse()?;

        Ok(OracleConfig {
            protocol_version,
            cipher_suites,
            compression_method,
            dh: DhParameters::fixed()?,
            ec_public_point: P256_GENERATOR_POINT.to_vec(),
            renegotiation_info: self.renegotiation_info,
            timeout: Duration::from_millis(self.timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms.max(1)),
            connect_retry: self.connect_retry.clone(),
            target_host: self.target_host.trim().to_string(),
            target_port: self.target_port,
        })
    }
}

/// Resolved, immutable session configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    protocol_version: ProtocolVersion,
    cipher_suites: Vec<CipherSuite>,
    compression_method: CompressionMethod,
    dh: DhParameters,
    ec_public_point: Vec<u8>,
    renegotiation_info: bool,
    timeout: Duration,
    connect_timeout: Duration,
    connect_retry: RetryPolicy,
    target_host: String,
    target_port: u16,
}

impl OracleConfig {
    /// Protocol version offered and used on records
    #[must_use]
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    /// Offered cipher suites, never empty
    #[must_use]
    pub fn cipher_suites(&self) -> &[CipherSuite] {
        &self.cipher_suites
    }

    /// The selected suite: the first offered one
    #[must_use]
    pub fn selected_cipher_suite(&self) -> CipherSuite {
        self.cipher_suites.first().copied().unwrap_or(DEFAULT_CIPHER_SUITE)
    }

    /// Compression method offered
    #[must_use]
    pub fn compression_method(&self) -> CompressionMethod {
        self.compression_method
    }

    /// DH parameters
    #[must_use]
    pub fn dh(&self) -> &DhParameters {
        &self.dh
    }

    /// Client EC public point
    #[must_use]
    pub fn ec_public_point(&self) -> &[u8] {
        &self.ec_public_point
    }

    /// Whether ClientHello carries renegotiation_info
    #[must_use]
    pub fn renegotiation_info(&self) -> bool {
        self.renegotiation_info
    }

    /// Bound on each receive phase
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Bound on opening the target connection
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Retry policy for opening the target connection
    #[must_use]
    pub fn connect_retry(&self) -> &RetryPolicy {
        &self.connect_retry
    }

    /// Target host
    #[must_use]
    pub fn target_host(&self) -> &str {
        &self.target_host
    }

    /// Target port
    #[must_use]
    pub fn target_port(&self) -> u16 {
        self.target_port
    }

    /// `host:port`
    #[must_use]
    pub fn target_addr(&self) -> String {
        format!("{}:{}", self.target_host, self.target_port)
    }

    /// Derive a configuration offering `suites`; the first becomes selected
    ///
    /// An empty list falls back to the default suite.
    #[must_use]
    pub fn with_cipher_suites(&self, suites: Vec<CipherSuite>) -> Self {
        let cipher_suites = if suites.is_empty() { vec![DEFAULT_CIPHER_SUITE] } else { suites };
        Self { cipher_suites, ..self.clone() }
    }

    /// Derive a configuration with a different receive timeout
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self { timeout, ..self.clone() }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve() {
        let config = ConnectorSettings::default().resolve().unwrap();
        assert_eq!(config.cipher_suites(), &[DEFAULT_CIPHER_SUITE]);
        assert_eq!(config.selected_cipher_suite(), CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA256);
        assert_eq!(config.protocol_version(), ProtocolVersion::Tls12);
        assert_eq!(config.compression_method(), CompressionMethod::Null);
        assert_eq!(config.timeout(), Duration::from_millis(100));
        assert_eq!(config.target_addr(), "localhost:4433");
        assert!(config.renegotiation_info());
    }

    #[test]
    fn test_first_offered_suite_is_selected() {
        let config = ConnectorSettings::new()
            .with_cipher_suites([
                "TLS_DHE_RSA_WITH_AES_128_CBC_SHA",
                "TLS_RSA_WITH_AES_128_CBC_SHA",
            ])
            .resolve()
            .unwrap();
        assert_eq!(config.selected_cipher_suite(), CipherSuite::TLS_DHE_RSA_WITH_AES_128_CBC_SHA);
        assert_eq!(config.cipher_suites().len(), 2);
    }

    #[test]
    fn test_unknown_names_rejected() {
        let err = ConnectorSettings::new().with_cipher_suites(["TLS_BOGUS"]).resolve().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCipherSuite);

        let err = ConnectorSettings::new().with_protocol_version("TLS13").resolve().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidProtocolVersion);

        let err = ConnectorSettings::new().with_compression_method("GZIP").resolve().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCompressionMethod);
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(ConnectorSettings::new().with_timeout_ms(0).resolve().is_err());
        assert!(ConnectorSettings::new().with_target("localhost", 0).resolve().is_err());
        assert!(ConnectorSettings::new().with_target("  ", 4433).resolve().is_err());
    }

    #[test]
    fn test_with_cipher_suites_replaces_selection() {
        let config = ConnectorSettings::default().resolve().unwrap();
        let derived = config.with_cipher_suites(vec![CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA]);
        assert_eq!(derived.selected_cipher_suite(), CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA);
        assert_eq!(config.selected_cipher_suite(), DEFAULT_CIPHER_SUITE);
        assert_eq!(config.with_cipher_suites(Vec::new()).cipher_suites(), &[DEFAULT_CIPHER_SUITE]);
    }

    #[test]
    fn test_dh_parameters_fixed_values() {
        let dh = DhParameters::fixed().unwrap();
        assert_eq!(dh.generator(), &BigUint::from(2u32));
        assert_eq!(dh.client_public_key(), dh.modulus());
        assert_eq!(dh.client_private_key(), dh.server_private_key());
        assert_eq!(dh.modulus().bits(), 800);
    }

    #[test]
    fn test_dh_debug_redacts_private_keys() {
        let dh = DhParameters::fixed().unwrap();
        let rendered = format!("{dh:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains(DH_PRIVATE_KEY));
    }
}
