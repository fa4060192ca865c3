#![deny(unsafe_code)]
#![allow(clippy::unwrap_used)]

//! Control-channel tests over a real loopback socket

use std::net::SocketAddr;

use oracle_tls::config::ConnectorSettings;
use oracle_tls::engine::ScriptedFactory;
use oracle_tls::server::{OracleServer, ServerState};
use oracle_tls::session::Session;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

async fn start(factory: &ScriptedFactory) -> (SocketAddr, JoinHandle<OracleServer>) {
    let session =
        Session::from_settings(&ConnectorSettings::default(), factory.clone()).await.unwrap();
    let mut server = OracleServer::bind("127.0.0.1:0").await.unwrap();
    assert_eq!(server.state(), ServerState::AwaitingConnection);
    let addr = server.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        server.serve(session).await.unwrap();
        server
    });
    (addr, handle)
}

#[tokio::test]
async fn test_learner_round_trip() {
    let factory = ScriptedFactory::rsa_server();
    let (addr, handle) = start(&factory).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let exchanges = [
        ("ClientHello", "ServerHello|Certificate|ServerHelloDone"),
        ("RSAClientKeyExchange", "-"),
        ("RESET", ""),
        ("ApplicationData", "ALERT_FATAL_unexpected_message|ConnectionClosed"),
        ("Finished", "ConnectionClosed"),
        // closed connection is checked before the vocabulary
        ("NotARealSymbol", "ConnectionClosed"),
        ("RESET", ""),
        ("NotARealSymbol", "ERROR unknown input symbol: NotARealSymbol"),
        ("ClientHello", "ServerHello|Certificate|ServerHelloDone"),
    ];
    for (input, expected) in exchanges {
        writer.write_all(format!("{input}\n").as_bytes()).await.unwrap();
        let reply = lines.next_line().await.unwrap().unwrap();
        assert_eq!(reply, expected, "reply to {input}");
    }

    drop(writer);
    assert!(lines.next_line().await.unwrap().is_none());

    let server = handle.await.unwrap();
    assert_eq!(server.state(), ServerState::Terminated);
    assert_eq!(factory.log().connects, 3);
}

#[tokio::test]
async fn test_serves_only_one_connection() {
    let factory = ScriptedFactory::silent();
    let (addr, handle) = start(&factory).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    drop(stream);
    let mut server = handle.await.unwrap();

    let session =
        Session::from_settings(&ConnectorSettings::default(), factory.clone()).await.unwrap();
    assert!(server.serve(session).await.is_err());
    assert_eq!(server.state(), ServerState::Terminated);
}

#[tokio::test]
async fn test_session_closed_when_learner_leaves() {
    let factory = ScriptedFactory::silent();
    let (addr, handle) = start(&factory).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"Finished\n").await.unwrap();
    let mut reply = String::new();
    let mut reader = BufReader::new(&mut stream);
    reader.read_line(&mut reply).await.unwrap();
    assert_eq!(reply, "-\n");
    drop(reader);
    drop(stream);

    handle.await.unwrap();
    assert_eq!(factory.log().closes, 1);
}
