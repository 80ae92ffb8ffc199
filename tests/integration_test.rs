//! Integration tests for the full communication flow.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use iems_link::events::EventProcessor;
use iems_link::link::{
    decode, encode, Command, ConnectError, Connector, InboundEvent, LinkSession, OutputId, Peer,
    SessionError, SessionOptions, SourceChoice, Transport,
};
use iems_link::state::{AppState, ConnectionStatus};

/// Pretends to be the ESP32 firmware: every command is applied and echoed.
async fn run_device(mut stream: DuplexStream) {
    let mut buf = [0u8; 64];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        if stream.write_all(&buf[..n]).await.is_err() {
            break;
        }
    }
}

struct EchoDevice {
    known_address: String,
}

impl Connector for EchoDevice {
    fn connect<'a>(&'a self, peer: &'a Peer) -> BoxFuture<'a, Result<Transport, ConnectError>> {
        Box::pin(async move {
            if peer.id != self.known_address {
                return Err(ConnectError::NotFound(peer.id.clone()));
            }
            let (local, remote) = tokio::io::duplex(256);
            tokio::spawn(run_device(remote));
            Ok(Transport::from_stream(local))
        })
    }
}

async fn wait_for<F>(state: &AppState, condition: F)
where
    F: Fn(&AppState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition(state) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached");
}

#[test]
fn test_wire_format() {
    let cases = [
        (OutputId::A, SourceChoice::Solar, "outA--src--solar"),
        (OutputId::A, SourceChoice::Grid, "outA--src--grid"),
        (OutputId::B, SourceChoice::Solar, "outB--src--solar"),
        (OutputId::B, SourceChoice::Grid, "outB--src--grid"),
    ];

    for (output, source, wire) in cases {
        assert_eq!(encode(&Command::new(output, source)), wire);
        assert_eq!(decode(wire), InboundEvent::Switched { output, source });
    }
}

#[test]
fn test_decode_is_total() {
    let inputs = [
        "",
        "--src--",
        "outA--src--",
        "outA",
        "outA--src--solar--src--grid",
        "\u{fffd}--src--\u{fffd}",
        "outB--src--GRID",
    ];
    for input in inputs {
        // Every input maps to exactly one variant without panicking.
        let _ = decode(input);
    }

    assert_eq!(
        decode("outA--src--"),
        InboundEvent::UnknownSource {
            output: OutputId::A,
            raw: String::new()
        }
    );
}

#[tokio::test]
async fn test_switch_round_trip_through_device() {
    let state = AppState::new();
    let processor = Arc::new(EventProcessor::new(state.clone()));
    let connector = EchoDevice {
        known_address: "24:0A:C4:00:00:01".to_string(),
    };
    let mut session = LinkSession::new(connector, processor, SessionOptions::default());

    // Unknown device: connect fails and nothing changes.
    let stranger = Peer::new("AA:BB:CC:DD:EE:FF", "IEMS-LomTechnology");
    let result = session.connect(stranger).await;
    assert!(matches!(
        result,
        Err(SessionError::Connect(ConnectError::NotFound(_)))
    ));
    assert_eq!(state.get_status(), ConnectionStatus::NotPaired);
    assert_eq!(state.last_notification().as_deref(), Some("Failed to connect"));

    let device = Peer::new("24:0A:C4:00:00:01", "IEMS-LomTechnology");
    session.connect(device).await.unwrap();
    assert_eq!(state.get_status(), ConnectionStatus::Connected);

    session
        .send(Command::new(OutputId::A, SourceChoice::Solar))
        .await
        .unwrap();
    wait_for(&state, |s| s.get_source(OutputId::A) == Some(SourceChoice::Solar)).await;

    session
        .send(Command::new(OutputId::B, SourceChoice::Grid))
        .await
        .unwrap();
    wait_for(&state, |s| s.get_source(OutputId::B) == Some(SourceChoice::Grid)).await;
    assert_eq!(
        state.last_notification().as_deref(),
        Some("Output B switched to Grid")
    );

    session.disconnect().await;
    assert_eq!(state.get_status(), ConnectionStatus::Offline);
    assert_eq!(
        session.send(Command::new(OutputId::A, SourceChoice::Grid)).await,
        Err(SessionError::NotConnected)
    );

    // Offline is re-enterable.
    let device = session.peer().cloned().unwrap();
    session.connect(device).await.unwrap();
    assert_eq!(state.get_status(), ConnectionStatus::Connected);
    session.disconnect().await;
}
