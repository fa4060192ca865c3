#![deny(unsafe_code)]
#![allow(clippy::unwrap_used)]

//! Dispatcher behavior against a scripted target
//!
//! Covers the closed-session, reset, determinism and rejection properties
//! of the oracle without a network.

use oracle_tls::alert::Alert;
use oracle_tls::cipher_suite::KeyExchange;
use oracle_tls::config::ConnectorSettings;
use oracle_tls::dispatcher::dispatch;
use oracle_tls::engine::{ScriptedFactory, ScriptedReply};
use oracle_tls::error::ErrorCode;
use oracle_tls::message::{HandshakeKind, OutgoingMessage, ReceivedMessage};
use oracle_tls::session::Session;
use oracle_tls::symbol::InputSymbol;

async fn session(factory: &ScriptedFactory) -> Session<ScriptedFactory> {
    Session::from_settings(&ConnectorSettings::default(), factory.clone()).await.unwrap()
}

async fn run(session: &mut Session<ScriptedFactory>, inputs: &[&str]) -> Vec<String> {
    let mut outputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        outputs.push(String::from(dispatch(session, input).await.unwrap()));
    }
    outputs
}

/// A DHE server that alerts on anything but the expected client flight
fn dhe_server() -> ScriptedFactory {
    ScriptedFactory::new(|message| match message {
        OutgoingMessage::ClientHello { .. } => ScriptedReply::messages(vec![
            ReceivedMessage::handshake(HandshakeKind::ServerHello, KeyExchange::Dh),
            ReceivedMessage::handshake(HandshakeKind::Certificate, KeyExchange::Dh),
            ReceivedMessage::handshake(HandshakeKind::ServerKeyExchange, KeyExchange::Dh),
            ReceivedMessage::handshake(HandshakeKind::ServerHelloDone, KeyExchange::Dh),
        ]),
        OutgoingMessage::DhClientKeyExchange | OutgoingMessage::ChangeCipherSpec => {
            ScriptedReply::silent()
        }
        OutgoingMessage::Finished => ScriptedReply::messages(vec![
            ReceivedMessage::ChangeCipherSpec,
            ReceivedMessage::EncryptedHandshake,
        ]),
        _ => ScriptedReply::messages(vec![ReceivedMessage::Alert(Alert::from_bytes(2, 40))])
            .then_close(),
    })
}

#[tokio::test]
async fn test_closed_session_answers_without_sending() {
    let factory = ScriptedFactory::rsa_server();
    let mut session = session(&factory).await;
    session.close().await;

    for symbol in InputSymbol::ALL {
        let output = dispatch(&mut session, symbol.name()).await.unwrap();
        assert_eq!(output.as_str(), "ConnectionClosed", "{symbol}");
    }
    assert!(factory.log().sent.is_empty());
}

#[tokio::test]
async fn test_reset_reopens_from_any_state() {
    let factory = ScriptedFactory::rsa_server();
    let mut session = session(&factory).await;

    // Fresh
    assert_eq!(run(&mut session, &["RESET"]).await, vec![""]);
    assert!(!session.is_closed());

    // After the peer hung up
    let outputs = run(&mut session, &["ApplicationData", "ClientHello"]).await;
    assert_eq!(outputs[1], "ConnectionClosed");
    assert_eq!(run(&mut session, &["RESET"]).await, vec![""]);
    assert!(!session.is_closed());

    // After an explicit close
    session.close().await;
    assert_eq!(run(&mut session, &["RESET"]).await, vec![""]);
    assert!(!session.is_closed());
    assert_eq!(session.generation(), 3);
}

#[tokio::test]
async fn test_close_twice_is_close_once() {
    let once = ScriptedFactory::silent();
    let twice = ScriptedFactory::silent();
    let mut a = session(&once).await;
    let mut b = session(&twice).await;

    a.close().await;
    b.close().await;
    b.close().await;

    assert_eq!(a.is_closed(), b.is_closed());
    assert_eq!(once.log().closes, twice.log().closes);
    assert_eq!(
        dispatch(&mut a, "Finished").await.unwrap(),
        dispatch(&mut b, "Finished").await.unwrap()
    );
}

#[tokio::test]
async fn test_same_inputs_same_outputs() {
    let inputs = [
        "RESET",
        "ClientHello",
        "DHClientKeyExchange",
        "ChangeCipherSpec",
        "Finished",
        "RESET",
        "ServerHello",
        "ClientHello",
    ];
    let factory = dhe_server();
    let mut first = session(&factory).await;
    let mut second = session(&factory).await;

    let a = run(&mut first, &inputs).await;
    let b = run(&mut second, &inputs).await;
    let c = run(&mut first, &inputs).await;
    assert_eq!(a, b);
    assert_eq!(a, c);
    assert_eq!(
        a,
        vec![
            "",
            "ServerHello|Certificate|DHEServerKeyExchange|ServerHelloDone",
            "-",
            "-",
            "ChangeCipherSpec|EncryptedHandshake",
            "",
            "ALERT_FATAL_handshake_failure|ConnectionClosed",
            "ConnectionClosed",
        ]
    );
}

#[tokio::test]
async fn test_unknown_symbol_leaves_session_untouched() {
    let factory = ScriptedFactory::rsa_server();
    let mut session = session(&factory).await;
    let generation = session.generation();
    let before = factory.log();

    let err = dispatch(&mut session, "NotARealSymbol").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownSymbol);
    assert_eq!(factory.log(), before);
    assert_eq!(session.generation(), generation);
    assert!(!session.is_closed());

    // The session still answers normally afterwards
    assert_eq!(
        dispatch(&mut session, "ClientHello").await.unwrap().as_str(),
        "ServerHello|Certificate|ServerHelloDone"
    );
}

#[tokio::test]
async fn test_client_hello_lists_server_hello() {
    let factory = ScriptedFactory::rsa_server();
    let settings =
        ConnectorSettings::default().with_cipher_suites(["TLS_RSA_WITH_AES_128_CBC_SHA256"]);
    let mut session = Session::from_settings(&settings, factory.clone()).await.unwrap();

    let output = dispatch(&mut session, "ClientHello").await.unwrap();
    assert!(output.descriptors().any(|d| d == "ServerHello"));
    assert_ne!(output.as_str(), "-");
    assert_ne!(output.as_str(), "ConnectionClosed");
}

#[tokio::test]
async fn test_application_data_before_handshake_is_never_silent() {
    let factory = ScriptedFactory::rsa_server();
    let mut session = session(&factory).await;

    let outputs = run(&mut session, &["RESET", "ApplicationData"]).await;
    assert_eq!(outputs[0], "");
    assert_eq!(outputs[1], "ALERT_FATAL_unexpected_message|ConnectionClosed");
}

#[tokio::test]
async fn test_fatal_handshake_failure_alert_encoding() {
    let factory = ScriptedFactory::new(|_| {
        ScriptedReply::messages(vec![ReceivedMessage::Alert(Alert::from_bytes(2, 40))])
    });
    let mut session = session(&factory).await;
    let output = dispatch(&mut session, "ClientHello").await.unwrap();
    assert_eq!(output.as_str(), "ALERT_FATAL_handshake_failure");
}

#[tokio::test]
async fn test_warning_and_unassigned_alerts() {
    let factory = ScriptedFactory::new(|_| {
        ScriptedReply::messages(vec![
            ReceivedMessage::Alert(Alert::from_bytes(1, 0)),
            ReceivedMessage::Alert(Alert::from_bytes(2, 201)),
            ReceivedMessage::Alert(Alert::from_bytes(7, 40)),
        ])
    });
    let mut session = session(&factory).await;
    let output = dispatch(&mut session, "Certificate").await.unwrap();
    assert_eq!(
        output.as_str(),
        "ALERT_WARNING_close_notify|ALERT_FATAL_unknown_201|ALERT_UNDEFINED_handshake_failure"
    );
}
