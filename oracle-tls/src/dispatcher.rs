//! Symbol dispatcher: one input line in, one output symbol out.

use tracing::debug;

use crate::encoder::{OutputSymbol, receive_and_encode};
use crate::engine::{EngineFactory, TlsEngine};
use crate::error::OracleError;
use crate::session::Session;
use crate::symbol::{InputSymbol, RESET};

/// Process one input symbol against `session`
///
/// 1. `RESET` resets the session and answers `""` without a receive phase.
/// 2. On a closed session every other input answers `ConnectionClosed`
///    without sending.
/// 3. Symbols outside the vocabulary fail with `UnknownSymbol`, leaving the
///    session untouched.
/// 4. Otherwise the symbol's message is sent and the receive phase encodes
///    whatever arrives. A transport failure on send is observed as
///    `ConnectionClosed`.
///
/// # Errors
///
/// Returns `UnknownSymbol` for inputs outside the vocabulary, the
/// transport error of a reset that could not reconnect, and any
/// non-transport engine error.
pub async fn dispatch<F: EngineFactory>(
    session: &mut Session<F>,
    input: &str,
) -> Result<OutputSymbol, OracleError> {
    if input == RESET {
        session.reset().await?;
        return Ok(OutputSymbol::reset_ack());
    }

    if session.is_closed() {
        return Ok(OutputSymbol::connection_closed());
    }

    let symbol: InputSymbol = input.parse()?;
    send_and_receive(session, symbol).await
}

async fn send_and_receive<F: EngineFactory>(
    session: &mut Session<F>,
    symbol: InputSymbol,
) -> Result<OutputSymbol, OracleError> {
    let message = symbol.build(session.config());
    match session.engine_mut().send(&message).await {
        Ok(()) => receive_and_encode(session).await,
        Err(err) if err.is_transport() => {
            debug!("send of {} failed: {}", symbol, err);
            session.engine_mut().close().await;
            Ok(OutputSymbol::connection_closed())
        }
        Err(err) => Err(err),
    }
}
