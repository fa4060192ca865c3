#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Oracle Error Handling
//!
//! Error taxonomy for the session driver:
//! - `Config`: operator supplied values that do not resolve (fatal at startup)
//! - `UnknownSymbol`: the learner sent a symbol outside the input vocabulary
//! - `Transport`: socket level failures below the TLS layer
//! - `Internal`: everything else
//!
//! Every variant carries an [`ErrorCode`] and a boxed [`ErrorContext`] so
//! failures can be correlated in logs.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Warning - the learner observes the failure as a normal output
    Warning,
    /// Error - operation failed but may be recoverable
    Error,
    /// Critical - operation failed and requires intervention
    Critical,
}

/// Phase of the oracle where an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationPhase {
    /// Resolving settings into a configuration
    Configuration,
    /// Opening the connection to the target
    ConnectionSetup,
    /// Mapping an input symbol to an action
    Dispatch,
    /// Sending a protocol message
    Send,
    /// Receiving protocol messages
    Receive,
    /// Closing a connection
    Teardown,
    /// Reading or writing the control channel
    ControlChannel,
}

/// Numeric error codes for easy identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    /// Connection was actively refused by the remote host.
    ConnectionRefused = 1001,
    /// Connection attempt timed out.
    ConnectionTimeout = 1002,
    /// Connection was reset by the remote host.
    ConnectionReset = 1003,

    // Protocol errors (2000-2099)
    /// Input symbol is not part of the vocabulary.
    UnknownSymbol = 2001,
    /// Record could not be framed.
    MalformedRecord = 2002,

    // IO errors (6000-6099)
    /// General I/O error.
    IoError = 6001,
    /// Write operation failed.
    WriteError = 6003,
    /// Unexpected end of file.
    UnexpectedEof = 6004,

    // Configuration errors (7000-7099)
    /// Invalid configuration.
    InvalidConfig = 7001,
    /// Invalid cipher suite specified.
    InvalidCipherSuite = 7004,
    /// Invalid protocol version specified.
    InvalidProtocolVersion = 7005,
    /// Invalid compression method specified.
    InvalidCompressionMethod = 7006,

    // Internal errors (9000-9099)
    /// Internal error occurred.
    InternalError = 9001,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::ConnectionRefused => "CONNECTION_REFUSED",
            ErrorCode::ConnectionTimeout => "CONNECTION_TIMEOUT",
            ErrorCode::ConnectionReset => "CONNECTION_RESET",
            ErrorCode::UnknownSymbol => "UNKNOWN_SYMBOL",
            ErrorCode::MalformedRecord => "MALFORMED_RECORD",
            ErrorCode::IoError => "IO_ERROR",
            ErrorCode::WriteError => "WRITE_ERROR",
            ErrorCode::UnexpectedEof => "UNEXPECTED_EOF",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::InvalidCipherSuite => "INVALID_CIPHER_SUITE",
            ErrorCode::InvalidProtocolVersion => "INVALID_PROTOCOL_VERSION",
            ErrorCode::InvalidCompressionMethod => "INVALID_COMPRESSION_METHOD",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        f.write_str(name)
    }
}

/// Recovery hints for error handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryHint {
    /// No recovery possible
    NoRecovery,
    /// Retry the operation
    Retry {
        /// Maximum number of retry attempts.
        max_attempts: u32,
        /// Backoff delay in milliseconds between attempts.
        backoff_ms: u64,
    },
    /// Reconfigure and restart
    Reconfigure {
        /// Configuration field to modify.
        field: String,
        /// Suggested new value or approach.
        suggestion: String,
    },
    /// Issue `RESET` to obtain a fresh session
    ResetSession,
    /// Check network connectivity to the target
    CheckNetworkConnectivity,
}

/// Detailed error context
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error code
    pub code: ErrorCode,
    /// Error severity
    pub severity: ErrorSeverity,
    /// Phase where error occurred
    pub phase: OperationPhase,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Additional context fields
    pub extra: std::collections::HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            error_id: generate_error_id(),
            code: ErrorCode::InternalError,
            severity: ErrorSeverity::Error,
            phase: OperationPhase::Dispatch,
            timestamp: Utc::now(),
            extra: std::collections::HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Context for a given code, severity and phase
    #[must_use]
    pub fn new(code: ErrorCode, severity: ErrorSeverity, phase: OperationPhase) -> Self {
        Self { code, severity, phase, ..Default::default() }
    }

    /// Attach an extra key/value pair
    #[must_use]
    pub fn with_extra(mut self, key: &str, value: impl Into<String>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

static RESET_SESSION: RecoveryHint = RecoveryHint::ResetSession;
static NO_RECOVERY: RecoveryHint = RecoveryHint::NoRecovery;

fn generate_error_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static ERROR_COUNTER: AtomicU64 = AtomicU64::new(1);
    let counter = ERROR_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("ORACLEERR_{:016x}", counter)
}

/// Oracle error type
#[derive(Error, Debug)]
pub enum OracleError {
    /// Configuration value does not resolve
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
        /// Configuration field that caused the error.
        field: Option<String>,
        /// Error code for classification.
        code: ErrorCode,
        /// Detailed error context (boxed to reduce enum size).
        context: Box<ErrorContext>,
        /// Recovery hint for handling.
        recovery: Box<RecoveryHint>,
    },

    /// Input symbol outside the vocabulary
    #[error("Unknown input symbol: {symbol}")]
    UnknownSymbol {
        /// The offending symbol, verbatim.
        symbol: String,
        /// Error code for classification.
        code: ErrorCode,
        /// Detailed error context (boxed to reduce enum size).
        context: Box<ErrorContext>,
    },

    /// Socket level failure
    #[error("Transport error: {message}")]
    Transport {
        /// Human-readable error message.
        message: String,
        /// Underlying source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        /// Error code for classification.
        code: ErrorCode,
        /// Detailed error context (boxed to reduce enum size).
        context: Box<ErrorContext>,
        /// Recovery hint for handling.
        recovery: Box<RecoveryHint>,
    },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// Error code for classification.
        code: ErrorCode,
        /// Detailed error context (boxed to reduce enum size).
        context: Box<ErrorContext>,
    },
}

impl OracleError {
    /// Configuration error for a named field
    #[must_use]
    pub fn config(field: &str, message: impl Into<String>, code: ErrorCode) -> Self {
        let message = message.into();
        let context = ErrorContext::new(code, ErrorSeverity::Critical, OperationPhase::Configuration)
            .with_extra("field", field);
        OracleError::Config {
            message,
            field: Some(field.to_string()),
            code,
            context: Box::new(context),
            recovery: Box::new(RecoveryHint::Reconfigure {
                field: field.to_string(),
                suggestion: "Use one of the names listed by --help".to_string(),
            }),
        }
    }

    /// Rejection of a symbol outside the vocabulary
    #[must_use]
    pub fn unknown_symbol(symbol: &str) -> Self {
        let context =
            ErrorContext::new(ErrorCode::UnknownSymbol, ErrorSeverity::Warning, OperationPhase::Dispatch)
                .with_extra("symbol", symbol);
        OracleError::UnknownSymbol {
            symbol: symbol.to_string(),
            code: ErrorCode::UnknownSymbol,
            context: Box::new(context),
        }
    }

    /// Transport error without an underlying I/O error
    #[must_use]
    pub fn transport(message: impl Into<String>, code: ErrorCode, phase: OperationPhase) -> Self {
        OracleError::Transport {
            message: message.into(),
            source: None,
            code,
            context: Box::new(ErrorContext::new(code, ErrorSeverity::Warning, phase)),
            recovery: Box::new(RecoveryHint::ResetSession),
        }
    }

    /// Internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        OracleError::Internal {
            message: message.into(),
            code: ErrorCode::InternalError,
            context: Box::new(ErrorContext::new(
                ErrorCode::InternalError,
                ErrorSeverity::Critical,
                OperationPhase::Dispatch,
            )),
        }
    }

    /// Get error code
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            OracleError::Config { code, .. }
            | OracleError::UnknownSymbol { code, .. }
            | OracleError::Transport { code, .. }
            | OracleError::Internal { code, .. } => *code,
        }
    }

    /// Get error severity
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }

    /// Get error context
    #[must_use]
    pub fn context(&self) -> &ErrorContext {
        match self {
            OracleError::Config { context, .. }
            | OracleError::UnknownSymbol { context, .. }
            | OracleError::Transport { context, .. }
            | OracleError::Internal { context, .. } => context,
        }
    }

    /// Get recovery hint
    #[must_use]
    pub fn recovery_hint(&self) -> &RecoveryHint {
        match self {
            OracleError::Config { recovery, .. } | OracleError::Transport { recovery, .. } => {
                recovery
            }
            OracleError::UnknownSymbol { .. } => &RESET_SESSION,
            OracleError::Internal { .. } => &NO_RECOVERY,
        }
    }

    /// Check if error is recoverable
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.recovery_hint(), RecoveryHint::NoRecovery)
    }

    /// True for socket level failures, which the learner observes as
    /// `ConnectionClosed`
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, OracleError::Transport { .. })
    }

    /// Record the phase in which a transport error surfaced
    #[must_use]
    pub fn in_phase(mut self, phase: OperationPhase) -> Self {
        match &mut self {
            OracleError::Config { context, .. }
            | OracleError::UnknownSymbol { context, .. }
            | OracleError::Transport { context, .. }
            | OracleError::Internal { context, .. } => context.phase = phase,
        }
        self
    }
}

impl From<std::io::Error> for OracleError {
    fn from(err: std::io::Error) -> Self {
        let (code, severity, recovery) = match err.kind() {
            std::io::ErrorKind::ConnectionRefused => (
                ErrorCode::ConnectionRefused,
                ErrorSeverity::Error,
                RecoveryHint::CheckNetworkConnectivity,
            ),
            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted => (
                ErrorCode::ConnectionReset,
                ErrorSeverity::Warning,
                RecoveryHint::ResetSession,
            ),
            std::io::ErrorKind::BrokenPipe => {
                (ErrorCode::WriteError, ErrorSeverity::Warning, RecoveryHint::ResetSession)
            }
            std::io::ErrorKind::TimedOut => (
                ErrorCode::ConnectionTimeout,
                ErrorSeverity::Error,
                RecoveryHint::Retry { max_attempts: 2, backoff_ms: 500 },
            ),
            std::io::ErrorKind::UnexpectedEof => {
                (ErrorCode::UnexpectedEof, ErrorSeverity::Warning, RecoveryHint::ResetSession)
            }
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                (ErrorCode::IoError, ErrorSeverity::Critical, RecoveryHint::NoRecovery)
            }
            _ => (ErrorCode::IoError, ErrorSeverity::Error, RecoveryHint::NoRecovery),
        };

        let context = ErrorContext::new(code, severity, OperationPhase::ConnectionSetup)
            .with_extra("io_kind", format!("{:?}", err.kind()));

        OracleError::Transport {
            message: err.to_string(),
            source: Some(Box::new(err)),
            code,
            context: Box::new(context),
            recovery: Box::new(recovery),
        }
    }
}
