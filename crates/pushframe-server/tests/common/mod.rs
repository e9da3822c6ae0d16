//! Shared helpers for the server integration tests: a registry-backed
//! test fixture plus a minimal client speaking the wire protocol.

// Not every test file uses every helper.
#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use pushframe_crypto::sign;
use pushframe_directory::{Application, SharedDirectory};
use pushframe_proto::{RegistrationRecord, decode_message_frame, encode_inbound_frame};
use pushframe_server::Relay;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

/// A running relay with one registered application, on ephemeral ports.
pub struct Fixture {
    pub relay: Arc<Relay>,
    pub directory: SharedDirectory,
    pub app: Application,
    _dir: tempfile::TempDir,
}

pub async fn start_relay() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let directory = SharedDirectory::open(dir.path().join("keys")).unwrap();
    let app = directory.create_app("Test App").unwrap();

    let relay = Relay::bind("127.0.0.1:0".parse().unwrap(), Arc::new(directory.clone()))
        .await
        .unwrap();

    Fixture { relay: Arc::new(relay), directory, app, _dir: dir }
}

/// Encode a complete handshake frame for this application.
pub fn handshake(app: &Application, ib: &str, user: &str, group: &str) -> Vec<u8> {
    let record = RegistrationRecord {
        app_id: app.id.clone(),
        infobase_id: ib.to_owned(),
        user_id: user.to_owned(),
        user_group: group.to_owned(),
    };
    let tag = sign(&app.keys.key, &record.signed_bytes());
    encode_inbound_frame(&record.encode(&tag).unwrap()).unwrap()
}

/// Connect and register a client, waiting until the relay has seen it.
pub async fn register_client(
    fixture: &Fixture,
    addr: SocketAddr,
    ib: &str,
    user: &str,
    group: &str,
) -> TcpStream {
    let before = fixture.relay.registered_count();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&handshake(&fixture.app, ib, user, group)).await.unwrap();

    wait_until(|| fixture.relay.registered_count() > before).await;
    stream
}

/// Read one outbound message frame and return (plaintext length,
/// ciphertext).
pub async fn read_frame(stream: &mut TcpStream) -> (usize, Vec<u8>) {
    let mut total = [0u8; 4];
    stream.read_exact(&mut total).await.unwrap();

    let mut rest = vec![0u8; u32::from_le_bytes(total) as usize];
    stream.read_exact(&mut rest).await.unwrap();

    let mut wire = total.to_vec();
    wire.extend_from_slice(&rest);
    let (frame, consumed) = decode_message_frame(&wire).unwrap().unwrap();
    assert_eq!(consumed, wire.len());
    (frame.plaintext_len, frame.ciphertext.to_vec())
}

/// Poll until the condition holds, failing after a few seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(condition(), "condition not reached in time");
}

/// Whether the peer has closed the connection (read returns EOF or
/// error within the timeout).
pub async fn is_closed(stream: &mut TcpStream) -> bool {
    let mut buf = [0u8; 1];
    match tokio::time::timeout(Duration::from_secs(3), stream.read(&mut buf)).await {
        Ok(Ok(0)) | Ok(Err(_)) => true,
        Ok(Ok(_)) => false,
        Err(_) => false,
    }
}
