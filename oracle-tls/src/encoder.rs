//! Response encoder: turns what arrived after an action into one output
//! symbol.
//!
//! Four outcomes stay distinguishable on the control channel:
//! - `""` acknowledges `RESET`
//! - `-` means nothing arrived before the timeout
//! - `ConnectionClosed` on its own means the connection is gone
//! - anything else is a `|`-joined list of descriptors, possibly ending in
//!   `ConnectionClosed`

use std::fmt;

use tracing::debug;

use crate::engine::{EngineFactory, TlsEngine};
use crate::error::OracleError;
use crate::message::ReceivedMessage;
use crate::session::Session;

/// Sentinel for a connection observed closed
pub const CONNECTION_CLOSED: &str = "ConnectionClosed";
/// Sentinel for an empty receive phase
pub const NOTHING_RECEIVED: &str = "-";
/// Separator between descriptors
pub const SEPARATOR: char = '|';

/// One line written back to the learner
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputSymbol(String);

impl OutputSymbol {
    /// Acknowledgment of `RESET`
    #[must_use]
    pub fn reset_ack() -> Self {
        Self(String::new())
    }

    /// Nothing arrived
    #[must_use]
    pub fn nothing_received() -> Self {
        Self(NOTHING_RECEIVED.to_string())
    }

    /// The connection is gone
    #[must_use]
    pub fn connection_closed() -> Self {
        Self(CONNECTION_CLOSED.to_string())
    }

    /// Join descriptors; an empty list becomes `-`
    #[must_use]
    pub fn from_descriptors<I, S>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut joined = String::new();
        for (i, descriptor) in descriptors.into_iter().enumerate() {
            if i > 0 {
                joined.push(SEPARATOR);
            }
            joined.push_str(descriptor.as_ref());
        }
        if joined.is_empty() { Self::nothing_received() } else { Self(joined) }
    }

    /// The line, without terminator
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Individual descriptors; empty for the `RESET` acknowledgment
    pub fn descriptors(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|d| !d.is_empty())
    }

    /// True when the last descriptor is `ConnectionClosed`
    #[must_use]
    pub fn ends_closed(&self) -> bool {
        self.descriptors().last() == Some(CONNECTION_CLOSED)
    }
}

impl fmt::Display for OutputSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<OutputSymbol> for String {
    fn from(symbol: OutputSymbol) -> Self {
        symbol.0
    }
}

/// Encode received messages in arrival order, with the closed sentinel
/// appended when the connection was observed closed afterwards
#[must_use]
pub fn encode(messages: &[ReceivedMessage], closed: bool) -> OutputSymbol {
    let descriptors = messages
        .iter()
        .map(ReceivedMessage::descriptor)
        .chain(closed.then(|| CONNECTION_CLOSED.into()));
    OutputSymbol::from_descriptors(descriptors)
}

/// Receive phase: wait for the peer, then encode
///
/// A transport failure while receiving is reported as the connection being
/// closed, never as an error.
///
/// # Errors
///
/// Returns non-transport errors from the engine.
pub async fn receive_and_encode<F: EngineFactory>(
    session: &mut Session<F>,
) -> Result<OutputSymbol, OracleError> {
    if session.is_closed() {
        return Ok(OutputSymbol::connection_closed());
    }

    let timeout = session.config().timeout();
    let messages = match session.engine_mut().receive_available(timeout).await {
        Ok(messages) => messages,
        Err(err) if err.is_transport() => {
            debug!("receive failed: {}", err);
            session.engine_mut().close().await;
            return Ok(OutputSymbol::connection_closed());
        }
        Err(err) => return Err(err),
    };

    Ok(encode(&messages, session.is_closed()))
}
