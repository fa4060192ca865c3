#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # tls-oracle
//!
//! Listens for one learner on the control port and answers each input
//! symbol with the target's observable response. `--test` and
//! `--testCipherSuites` run a diagnostic script against the target instead.

mod cli;

use std::process::ExitCode;

use oracle_tls::diagnostics::{run_test_handshake, sweep_cipher_suites};
use oracle_tls::error::OracleError;
use oracle_tls::server::OracleServer;
use oracle_tls::session::Session;
use oracle_tls::tracing::{TracingConfig, init_tracing};
use oracle_tls::wire::WireEngineFactory;
use tracing::{error, info};

use crate::cli::{Mode, Options, Parsed, USAGE};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let options = match cli::parse_args(std::env::args().skip(1)) {
        Ok(Parsed::Run(options)) => options,
        Ok(Parsed::Help) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let tracing_config = if options.verbose { TracingConfig::debug() } else { TracingConfig::default() };
    init_tracing(&tracing_config);

    match run(options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(code = ?err.code(), recovery = ?err.recovery_hint(), "{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(options: Options) -> Result<(), OracleError> {
    let settings = options.settings;
    info!(
        "tls-oracle {} targeting {}:{}",
        oracle_tls::VERSION,
        settings.target_host,
        settings.target_port
    );
    let mut session = Session::from_settings(&settings, WireEngineFactory::new()).await?;

    match options.mode {
        Mode::TestHandshake => {
            for (input, output) in run_test_handshake(&mut session).await? {
                println!("{input}: {output}");
            }
            session.close().await;
        }
        Mode::TestCipherSuites => {
            for (suite, output) in sweep_cipher_suites(&mut session).await? {
                println!("{suite} {output}");
            }
            session.close().await;
        }
        Mode::Serve => {
            let mut server = OracleServer::bind(("0.0.0.0", settings.listen_port)).await?;
            let stats = server.serve(session).await?;
            info!("Control connection finished after {} exchanges", stats.exchanges);
        }
    }
    Ok(())
}
