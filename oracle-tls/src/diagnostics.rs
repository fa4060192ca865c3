//! Diagnostic scripts built on the public session and dispatcher API.
//!
//! Neither script is part of the learning loop; they exist to check a
//! target by hand before pointing a learner at it.

use tracing::debug;

use crate::cipher_suite::{CipherSuite, KeyExchange};
use crate::dispatcher::dispatch;
use crate::encoder::OutputSymbol;
use crate::engine::EngineFactory;
use crate::error::OracleError;
use crate::session::Session;
use crate::symbol::{InputSymbol, RESET};

/// Client key exchange matching the suite the peer selected
///
/// Without a ServerHello, and for any family other than (EC)DH, the RSA
/// variant is used.
#[must_use]
pub fn client_key_exchange_for(negotiated: Option<CipherSuite>) -> InputSymbol {
    match negotiated.map(|suite| suite.key_exchange()) {
        Some(KeyExchange::Ecdh) => InputSymbol::EcdhClientKeyExchange,
        Some(KeyExchange::Dh) => InputSymbol::DhClientKeyExchange,
        _ => InputSymbol::RsaClientKeyExchange,
    }
}

/// Walk a full client handshake and return each `(input, output)` pair
///
/// `ClientHello`, the client key exchange for the negotiated suite,
/// `ChangeCipherSpec`, `Finished`, `ApplicationData`.
///
/// # Errors
///
/// Propagates dispatch errors.
pub async fn run_test_handshake<F: EngineFactory>(
    session: &mut Session<F>,
) -> Result<Vec<(InputSymbol, OutputSymbol)>, OracleError> {
    let mut transcript = Vec::new();

    let output = dispatch(session, InputSymbol::ClientHello.name()).await?;
    transcript.push((InputSymbol::ClientHello, output));

    let key_exchange = client_key_exchange_for(session.negotiated_cipher_suite());
    let rest = [
        key_exchange,
        InputSymbol::ChangeCipherSpec,
        InputSymbol::Finished,
        InputSymbol::ApplicationData,
    ];
    for symbol in rest {
        let output = dispatch(session, symbol.name()).await?;
        transcript.push((symbol, output));
    }

    for (input, output) in &transcript {
        debug!("{}: {}", input, output);
    }
    Ok(transcript)
}

/// Offer each catalog suite alone and record the answer to `ClientHello`
///
/// # Errors
///
/// Propagates dispatch errors, including a reset that cannot reconnect.
pub async fn sweep_cipher_suites<F: EngineFactory>(
    session: &mut Session<F>,
) -> Result<Vec<(CipherSuite, OutputSymbol)>, OracleError> {
    sweep(session, CipherSuite::ALL).await
}

/// Sweep over an explicit list of suites
///
/// # Errors
///
/// Same as [`sweep_cipher_suites`].
pub async fn sweep<F: EngineFactory>(
    session: &mut Session<F>,
    suites: &[CipherSuite],
) -> Result<Vec<(CipherSuite, OutputSymbol)>, OracleError> {
    let mut results = Vec::with_capacity(suites.len());
    for &suite in suites {
        let config = session.config().with_cipher_suites(vec![suite]);
        session.reconfigure(config);
        dispatch(session, RESET).await?;
        let output = dispatch(session, InputSymbol::ClientHello.name()).await?;
        debug!("{} {}", suite, output);
        results.push((suite, output));
    }
    Ok(results)
}
