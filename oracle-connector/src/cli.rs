//! Command-line parsing.

use oracle_tls::config::ConnectorSettings;
use oracle_tls::error::{ErrorCode, OracleError};

pub const USAGE: &str = "\
Usage: tls-oracle [options]

Options:
  -l,  --listen <port>              control-channel listen port (default 6666)
  -tH, --targetHost <host>          target host (default localhost)
  -tP, --targetPort <port>          target port (default 4433)
  -t,  --timeout <ms>               receive timeout (default 100)
  -cS, --cipherSuite <a,b,..>       offered cipher suites, first is selected
  -pV, --protocolVersion <v>        SSL3, TLS10, TLS11 or TLS12 (default TLS12)
  -cM, --compressionMethod <m>      NULL, DEFLATE or LZS (default NULL)
       --connectTimeout <ms>        target connect timeout (default 5000)
  -v,  --verbose                    debug-level logging
       --test                       run a test handshake and exit
       --testCipherSuites           offer each known cipher suite and exit
  -h,  --help                       print this message";

/// What the process does after parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Serve,
    TestHandshake,
    TestCipherSuites,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub settings: ConnectorSettings,
    pub mode: Mode,
    pub verbose: bool,
}

#[derive(Debug)]
pub enum Parsed {
    Run(Options),
    Help,
}

pub fn parse_args<I>(args: I) -> Result<Parsed, OracleError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut settings = ConnectorSettings::default();
    let mut mode = Mode::Serve;
    let mut verbose = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-l" | "--listen" => {
                settings.listen_port = number(&arg, args.next())?;
            }
            "-tH" | "--targetHost" => {
                settings.target_host = value(&arg, args.next())?;
            }
            "-tP" | "--targetPort" => {
                settings.target_port = number(&arg, args.next())?;
            }
            "-t" | "--timeout" => {
                settings.timeout_ms = number(&arg, args.next())?;
            }
            "-cS" | "--cipherSuite" => {
                settings.cipher_suites = value(&arg, args.next())?
                    .split(',')
                    .map(str::trim)
                    .filter(|suite| !suite.is_empty())
                    .map(String::from)
                    .collect();
            }
            "-pV" | "--protocolVersion" => {
                settings.protocol_version = value(&arg, args.next())?;
            }
            "-cM" | "--compressionMethod" => {
                settings.compression_method = value(&arg, args.next())?;
            }
            "--connectTimeout" => {
                settings.connect_timeout_ms = number(&arg, args.next())?;
            }
            "-v" | "--verbose" => verbose = true,
            "--test" => mode = Mode::TestHandshake,
            "--testCipherSuites" => mode = Mode::TestCipherSuites,
            "-h" | "--help" => return Ok(Parsed::Help),
            other => {
                return Err(OracleError::config(
                    other,
                    format!("unknown option {other}"),
                    ErrorCode::InvalidConfig,
                ));
            }
        }
    }

    Ok(Parsed::Run(Options { settings, mode, verbose }))
}

fn value(option: &str, next: Option<String>) -> Result<String, OracleError> {
    next.ok_or_else(|| {
        OracleError::config(option, format!("{option} requires a value"), ErrorCode::InvalidConfig)
    })
}

fn number<T: std::str::FromStr>(option: &str, next: Option<String>) -> Result<T, OracleError> {
    let raw = value(option, next)?;
    raw.parse().map_err(|_| {
        OracleError::config(option, format!("invalid value {raw:?} for {option}"), ErrorCode::InvalidConfig)
    })
}
