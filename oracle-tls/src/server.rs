#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Oracle Server
//!
//! Serves exactly one control connection: one input symbol per line in, one
//! output symbol per line out, each reply flushed before the next line is
//! read.
//!
//! State machine: `AwaitingConnection -> Serving -> Terminated`. The
//! session is owned by the serving loop and closed when the control
//! connection ends.
//!
//! ```no_run
//! use oracle_tls::config::ConnectorSettings;
//! use oracle_tls::server::OracleServer;
//! use oracle_tls::session::Session;
//! use oracle_tls::wire::WireEngineFactory;
//!
//! # async fn example() -> Result<(), oracle_tls::error::OracleError> {
//! let settings = ConnectorSettings::default();
//! let session = Session::from_settings(&settings, WireEngineFactory::new()).await?;
//! let mut server = OracleServer::bind(("127.0.0.1", settings.listen_port)).await?;
//! let stats = server.serve(session).await?;
//! stats.log();
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{Instrument, error, info, warn};

use crate::dispatcher::dispatch;
use crate::engine::EngineFactory;
use crate::error::{OperationPhase, OracleError};
use crate::session::Session;
use crate::symbol::RESET;
use crate::tracing::{ExchangeStats, OracleSpan};

/// Prefix of the reply to an input outside the vocabulary
pub const UNKNOWN_SYMBOL_REPLY: &str = "ERROR unknown input symbol: ";

/// Longest control line kept, in bytes, excluding the line terminator
///
/// Longer lines are cut here and the rest is discarded, so they can never
/// name a symbol.
pub const MAX_CONTROL_LINE: usize = 1024;

/// Server lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Listening, no control connection yet
    AwaitingConnection,
    /// Handling the control connection
    Serving,
    /// The control connection ended
    Terminated,
}

/// Single-connection control server
#[derive(Debug)]
pub struct OracleServer {
    listener: TcpListener,
    state: ServerState,
}

impl OracleServer {
    /// Bind the control listener
    ///
    /// # Errors
    ///
    /// Returns a transport error if the address cannot be bound.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, OracleError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| OracleError::from(err).in_phase(OperationPhase::ControlChannel))?;
        Ok(Self { listener, state: ServerState::AwaitingConnection })
    }

    /// Address the listener is bound to
    ///
    /// # Errors
    ///
    /// Returns a transport error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, OracleError> {
        self.listener.local_addr().map_err(OracleError::from)
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Accept one control connection and serve it until end of stream
    ///
    /// # Errors
    ///
    /// Returns the first dispatch error other than an unknown symbol, any
    /// control-channel I/O error, and an internal error when called again
    /// after termination.
    pub async fn serve<F: EngineFactory>(
        &mut self,
        session: Session<F>,
    ) -> Result<ExchangeStats, OracleError> {
        if self.state != ServerState::AwaitingConnection {
            return Err(OracleError::internal("control connection already served"));
        }

        info!("Listening on {}", self.local_addr()?);
        let accepted = self.listener.accept().await;
        let (stream, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(err) => {
                self.state = ServerState::Terminated;
                let mut session = session;
                session.close().await;
                return Err(OracleError::from(err).in_phase(OperationPhase::ControlChannel));
            }
        };
        if let Err(err) = stream.set_nodelay(true) {
            warn!("could not set TCP_NODELAY on control connection: {}", err);
        }
        info!("Control connection from {}", peer);

        self.state = ServerState::Serving;
        let (reader, writer) = stream.into_split();
        let result = serve_connection(BufReader::new(reader), writer, session).await;
        self.state = ServerState::Terminated;
        result
    }
}

/// Serve one control stream until end of stream
///
/// The session is closed on every exit path.
///
/// # Errors
///
/// Same as [`OracleServer::serve`].
pub async fn serve_connection<R, W, F>(
    mut reader: R,
    mut writer: W,
    mut session: Session<F>,
) -> Result<ExchangeStats, OracleError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: EngineFactory,
{
    let mut stats = ExchangeStats::new();
    let result = exchange_loop(&mut reader, &mut writer, &mut session, &mut stats).await;

    session.close().await;
    stats.log();
    if let Err(err) = &result {
        error!("Control connection dropped: {}", err);
    }
    result.map(|()| stats)
}

async fn exchange_loop<R, W, F>(
    reader: &mut R,
    writer: &mut W,
    session: &mut Session<F>,
    stats: &mut ExchangeStats,
) -> Result<(), OracleError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: EngineFactory,
{
    let mut buf = Vec::with_capacity(64);
    loop {
        let Some(line) = read_control_line(reader, &mut buf).await? else {
            return Ok(());
        };
        let input = line.trim_end_matches(['\n', '\r']);

        let exchange = OracleSpan::exchange(input);
        let span = session.span().clone();
        let reply = match dispatch(session, input).instrument(span).await {
            Ok(output) => {
                if input == RESET {
                    stats.record_reset();
                } else {
                    stats.record_output(output.as_str());
                }
                exchange.complete(input, output.as_str());
                String::from(output)
            }
            Err(OracleError::UnknownSymbol { symbol, .. }) => {
                stats.record_rejected();
                exchange.in_scope(|| warn!("rejected unknown input symbol {:?}", symbol));
                format!("{UNKNOWN_SYMBOL_REPLY}{symbol}")
            }
            Err(err) => return Err(err),
        };

        writer.write_all(reply.as_bytes()).await.map_err(control_channel)?;
        writer.write_all(b"\n").await.map_err(control_channel)?;
        writer.flush().await.map_err(control_channel)?;
    }
}

/// Next control line, lossily decoded; `None` at end of stream
async fn read_control_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> Result<Option<String>, OracleError>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = u64::try_from(MAX_CONTROL_LINE + 1).unwrap_or(u64::MAX);
    let read = (&mut *reader).take(limit).read_until(b'\n', buf).await.map_err(control_channel)?;
    if read == 0 {
        return Ok(None);
    }

    if buf.last() != Some(&b'\n') && buf.len() > MAX_CONTROL_LINE {
        buf.truncate(MAX_CONTROL_LINE);
        let skipped = skip_rest_of_line(reader).await?;
        warn!("control line over {} bytes, {} more discarded", MAX_CONTROL_LINE, skipped);
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

async fn skip_rest_of_line<R>(reader: &mut R) -> Result<usize, OracleError>
where
    R: AsyncBufRead + Unpin,
{
    let mut skipped = 0;
    loop {
        let (consumed, done) = {
            let available = reader.fill_buf().await.map_err(control_channel)?;
            match available.iter().position(|&b| b == b'\n') {
                Some(end) => (end + 1, true),
                None => (available.len(), available.is_empty()),
            }
        };
        reader.consume(consumed);
        skipped += consumed;
        if done {
            return Ok(skipped);
        }
    }
}

fn control_channel(err: std::io::Error) -> OracleError {
    OracleError::from(err).in_phase(OperationPhase::ControlChannel)
}
