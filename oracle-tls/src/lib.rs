#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # TLS Oracle
//!
//! Exposes a TLS client as a symbol-level oracle for active automata
//! learning. A learner sends one input symbol per line over a control
//! connection; the oracle performs the matching protocol action against the
//! target and answers with one line describing what the target sent back.
//!
//! ## Features
//!
//! - **Closed Vocabulary**: `RESET` plus twelve handshake message symbols
//! - **Deterministic Output**: `|`-joined descriptors, `-` for silence,
//!   `ConnectionClosed` once the target hangs up
//! - **Pluggable Engine**: the session drives any [`TlsEngine`]; a plaintext
//!   record-level engine over TCP ships in [`wire`]
//! - **Comprehensive Error Handling**: error codes, phases, recovery hints,
//!   retry of connection setup and structured tracing
//!
//! ## Quick Start
//!
//! ```no_run
//! use oracle_tls::*;
//!
//! # async fn example() -> Result<(), OracleError> {
//! let settings = ConnectorSettings::default().with_target("localhost", 4433);
//! let mut session = Session::from_settings(&settings, WireEngineFactory::new()).await?;
//!
//! let output = dispatch(&mut session, "ClientHello").await?;
//! println!("ClientHello / {output}");
//!
//! let ack = dispatch(&mut session, "RESET").await?;
//! assert_eq!(ack.as_str(), "");
//! # Ok(())
//! # }
//! ```
//!
//! ## Serving a Learner
//!
//! ```no_run
//! use oracle_tls::*;
//!
//! # async fn example() -> Result<(), OracleError> {
//! init_tracing(&TracingConfig::default());
//! let settings = ConnectorSettings::default();
//! let session = Session::from_settings(&settings, WireEngineFactory::new()).await?;
//! let mut server = OracleServer::bind(("0.0.0.0", settings.listen_port)).await?;
//! server.serve(session).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Output Format
//!
//! | Observation                      | Output                               |
//! |----------------------------------|--------------------------------------|
//! | `RESET`                          | empty line                           |
//! | nothing before the timeout       | `-`                                  |
//! | handshake flight                 | `ServerHello\|Certificate\|ServerHelloDone` |
//! | fatal alert, then hang-up        | `ALERT_FATAL_handshake_failure\|ConnectionClosed` |
//! | any input on a closed connection | `ConnectionClosed`                   |

pub mod alert;
pub mod cipher_suite;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod message;
pub mod protocol;
pub mod recovery;
pub mod server;
pub mod session;
pub mod symbol;
pub mod tracing;
pub mod wire;

pub use alert::{Alert, AlertDescription, AlertLevel};
pub use cipher_suite::{CipherSuite, KeyExchange};
pub use config::{ConnectorSettings, DhParameters, OracleConfig};
pub use diagnostics::{run_test_handshake, sweep_cipher_suites};
pub use dispatcher::dispatch;
pub use encoder::{CONNECTION_CLOSED, NOTHING_RECEIVED, OutputSymbol, encode};
pub use engine::{EngineFactory, ScriptedFactory, ScriptedReply, TlsEngine};
pub use error::{ErrorCode, ErrorContext, ErrorSeverity, OperationPhase, OracleError, RecoveryHint};
pub use message::{HandshakeKind, OutgoingMessage, ReceivedMessage};
pub use protocol::{CompressionMethod, ProtocolVersion};
pub use recovery::{RetryPolicy, retry_with_policy};
pub use server::{OracleServer, ServerState};
pub use session::Session;
pub use symbol::{InputSymbol, RESET};
pub use self::tracing::{ExchangeStats, OracleSpan, TracingConfig, init_tracing};
pub use wire::{WireEngine, WireEngineFactory};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
