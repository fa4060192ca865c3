//! Cipher-suite catalog.
//!
//! Names follow the IANA registry spelling, which is also what the
//! `--cipherSuite` option accepts. The catalog is the iteration order of the
//! cipher-suite sweep.

use std::fmt;

/// Key-exchange family of a cipher suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyExchange {
    /// RSA encrypted premaster secret
    Rsa,
    /// Finite field Diffie-Hellman (static, ephemeral or anonymous)
    Dh,
    /// Elliptic curve Diffie-Hellman (static, ephemeral or anonymous)
    Ecdh,
    /// Plain pre-shared key
    Psk,
    /// Signalling values and suites without a key exchange
    Other,
}

impl KeyExchange {
    /// Classify a suite by its name
    ///
    /// `ECDH` is checked before `DH` so `ECDHE_*` is not mistaken for
    /// finite field DH.
    #[must_use]
    pub fn from_suite_name(name: &str) -> Self {
        if name.contains("ECDH") {
            KeyExchange::Ecdh
        } else if name.contains("_DH") {
            KeyExchange::Dh
        } else if name.contains("RSA") {
            KeyExchange::Rsa
        } else if name.contains("PSK") {
            KeyExchange::Psk
        } else {
            KeyExchange::Other
        }
    }

    /// Structural name of a ServerKeyExchange under this family
    #[must_use]
    pub fn server_key_exchange_name(self) -> &'static str {
        match self {
            KeyExchange::Dh => "DHEServerKeyExchange",
            KeyExchange::Ecdh => "ECDHEServerKeyExchange",
            KeyExchange::Psk => "PSKServerKeyExchange",
            KeyExchange::Rsa | KeyExchange::Other => "ServerKeyExchange",
        }
    }

    /// Structural name of a ClientKeyExchange under this family
    #[must_use]
    pub fn client_key_exchange_name(self) -> &'static str {
        match self {
            KeyExchange::Rsa => "RSAClientKeyExchange",
            KeyExchange::Dh => "DHClientKeyExchange",
            KeyExchange::Ecdh => "ECDHClientKeyExchange",
            KeyExchange::Psk => "PSKClientKeyExchange",
            KeyExchange::Other => "ClientKeyExchange",
        }
    }
}

/// A TLS cipher suite: IANA name and two-byte code point
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherSuite {
    name: &'static str,
    code: u16,
}

impl CipherSuite {
    /// IANA name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Wire code point
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Key-exchange family
    #[must_use]
    pub fn key_exchange(&self) -> KeyExchange {
        KeyExchange::from_suite_name(self.name)
    }

    /// Look up a suite by exact name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|suite| suite.name == name)
    }

    /// Look up a suite by code point
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|suite| suite.code == code)
    }
}

impl fmt::Debug for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04X})", self.name, self.code)
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

macro_rules! cipher_suites {
    ($($name:ident = $code:expr),+ $(,)?) => {
        #[allow(non_upper_case_globals, missing_docs)]
        impl CipherSuite {
            $(
                pub const $name: CipherSuite = CipherSuite { name: stringify!($name), code: $code };
            )+

            /// Every suite in the catalog, in sweep order
            pub const ALL: &'static [CipherSuite] = &[$(CipherSuite::$name),+];
        }
    };
}

cipher_suites! {
    TLS_NULL_WITH_NULL_NULL = 0x0000,
    TLS_RSA_WITH_NULL_MD5 = 0x0001,
    TLS_RSA_WITH_NULL_SHA = 0x0002,
    TLS_RSA_WITH_RC4_128_MD5 = 0x0004,
    TLS_RSA_WITH_RC4_128_SHA = 0x0005,
    TLS_RSA_WITH_3DES_EDE_CBC_SHA = 0x000A,
    TLS_DHE_DSS_WITH_3DES_EDE_CBC_SHA = 0x0013,
    TLS_DHE_RSA_WITH_3DES_EDE_CBC_SHA = 0x0016,
    TLS_DH_anon_WITH_RC4_128_MD5 = 0x0018,
    TLS_DH_anon_WITH_3DES_EDE_CBC_SHA = 0x001B,
    TLS_RSA_WITH_AES_128_CBC_SHA = 0x002F,
    TLS_DH_DSS_WITH_AES_128_CBC_SHA = 0x0030,
    TLS_DH_RSA_WITH_AES_128_CBC_SHA = 0x0031,
    TLS_DHE_DSS_WITH_AES_128_CBC_SHA = 0x0032,
    TLS_DHE_RSA_WITH_AES_128_CBC_SHA = 0x0033,
    TLS_DH_anon_WITH_AES_128_CBC_SHA = 0x0034,
    TLS_RSA_WITH_AES_256_CBC_SHA = 0x0035,
    TLS_DHE_DSS_WITH_AES_256_CBC_SHA = 0x0038,
    TLS_DHE_RSA_WITH_AES_256_CBC_SHA = 0x0039,
    TLS_DH_anon_WITH_AES_256_CBC_SHA = 0x003A,
    TLS_RSA_WITH_NULL_SHA256 = 0x003B,
    TLS_RSA_WITH_AES_128_CBC_SHA256 = 0x003C,
    TLS_RSA_WITH_AES_256_CBC_SHA256 = 0x003D,
    TLS_DHE_DSS_WITH_AES_128_CBC_SHA256 = 0x0040,
    TLS_RSA_WITH_CAMELLIA_128_CBC_SHA = 0x0041,
    TLS_DHE_RSA_WITH_AES_128_CBC_SHA256 = 0x0067,
    TLS_DHE_DSS_WITH_AES_256_CBC_SHA256 = 0x006A,
    TLS_DHE_RSA_WITH_AES_256_CBC_SHA256 = 0x006B,
    TLS_DH_anon_WITH_AES_128_CBC_SHA256 = 0x006C,
    TLS_DH_anon_WITH_AES_256_CBC_SHA256 = 0x006D,
    TLS_RSA_WITH_CAMELLIA_256_CBC_SHA = 0x0084,
    TLS_PSK_WITH_AES_128_CBC_SHA = 0x008C,
    TLS_PSK_WITH_AES_256_CBC_SHA = 0x008D,
    TLS_RSA_WITH_SEED_CBC_SHA = 0x0096,
    TLS_RSA_WITH_AES_128_GCM_SHA256 = 0x009C,
    TLS_RSA_WITH_AES_256_GCM_SHA384 = 0x009D,
    TLS_DHE_RSA_WITH_AES_128_GCM_SHA256 = 0x009E,
    TLS_DHE_RSA_WITH_AES_256_GCM_SHA384 = 0x009F,
    TLS_DHE_DSS_WITH_AES_128_GCM_SHA256 = 0x00A2,
    TLS_DHE_DSS_WITH_AES_256_GCM_SHA384 = 0x00A3,
    TLS_DH_anon_WITH_AES_128_GCM_SHA256 = 0x00A6,
    TLS_PSK_WITH_AES_128_GCM_SHA256 = 0x00A8,
    TLS_EMPTY_RENEGOTIATION_INFO_SCSV = 0x00FF,
    TLS_ECDH_ECDSA_WITH_AES_128_CBC_SHA = 0xC004,
    TLS_ECDH_ECDSA_WITH_AES_256_CBC_SHA = 0xC005,
    TLS_ECDHE_ECDSA_WITH_RC4_128_SHA = 0xC007,
    TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA = 0xC009,
    TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA = 0xC00A,
    TLS_ECDH_RSA_WITH_AES_128_CBC_SHA = 0xC00E,
    TLS_ECDH_RSA_WITH_AES_256_CBC_SHA = 0xC00F,
    TLS_ECDHE_RSA_WITH_RC4_128_SHA = 0xC011,
    TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA = 0xC012,
    TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA = 0xC013,
    TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA = 0xC014,
    TLS_ECDH_anon_WITH_AES_128_CBC_SHA = 0xC018,
    TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256 = 0xC023,
    TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384 = 0xC024,
    TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256 = 0xC027,
    TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384 = 0xC028,
    TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 = 0xC02B,
    TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 = 0xC02C,
    TLS_ECDH_ECDSA_WITH_AES_128_GCM_SHA256 = 0xC02D,
    TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 = 0xC02F,
    TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 = 0xC030,
    TLS_ECDH_RSA_WITH_AES_128_GCM_SHA256 = 0xC031,
    TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA = 0xC035,
    TLS_RSA_WITH_AES_128_CCM = 0xC09C,
    TLS_ECDHE_ECDSA_WITH_AES_128_CCM = 0xC0AC,
    TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256 = 0xCCA8,
    TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256 = 0xCCA9,
    TLS_DHE_RSA_WITH_CHACHA20_POLY1305_SHA256 = 0xCCAA,
    TLS_FALLBACK_SCSV = 0x5600,
}
