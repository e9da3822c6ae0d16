//! Handshake integration tests over real sockets.
//!
//! A client is "in" once its registration frame verifies; everything
//! else (bad tags, unknown applications, oversized or malformed frames)
//! ends with the server silently dropping the connection.

mod common;

use common::{handshake, is_closed, register_client, start_relay, wait_until};
use pushframe_crypto::sign;
use pushframe_proto::{RegistrationRecord, encode_inbound_frame};
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    time::{Duration, sleep},
};

#[tokio::test(flavor = "multi_thread")]
async fn verified_handshake_registers() {
    let fixture = start_relay().await;
    let addr = fixture.relay.local_addr();

    let _client = register_client(&fixture, addr, "ib1", "alice", "ops").await;

    assert_eq!(fixture.relay.connection_count(), 1);
    assert_eq!(fixture.relay.registered_count(), 1);

    fixture.relay.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn handshake_split_into_single_bytes_registers() {
    let fixture = start_relay().await;
    let addr = fixture.relay.local_addr();

    let wire = handshake(&fixture.app, "ib1", "alice", "ops");
    let mut client = TcpStream::connect(addr).await.unwrap();
    for byte in wire {
        client.write_all(&[byte]).await.unwrap();
        sleep(Duration::from_millis(1)).await;
    }

    wait_until(|| fixture.relay.registered_count() == 1).await;
    fixture.relay.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn tampered_tag_gets_the_connection_dropped() {
    let fixture = start_relay().await;
    let addr = fixture.relay.local_addr();

    let record = RegistrationRecord {
        app_id: fixture.app.id.clone(),
        infobase_id: "ib1".to_owned(),
        user_id: "alice".to_owned(),
        user_group: String::new(),
    };
    let mut tag = sign(&fixture.app.keys.key, &record.signed_bytes());
    tag[3] ^= 0x10;
    let wire = encode_inbound_frame(&record.encode(&tag).unwrap()).unwrap();

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(&wire).await.unwrap();

    assert!(is_closed(&mut client).await);
    wait_until(|| fixture.relay.connection_count() == 0).await;
    assert_eq!(fixture.relay.registered_count(), 0);

    fixture.relay.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_application_gets_the_connection_dropped() {
    let fixture = start_relay().await;
    let addr = fixture.relay.local_addr();

    let record = RegistrationRecord {
        app_id: "no-such-app".to_owned(),
        infobase_id: "ib1".to_owned(),
        user_id: "alice".to_owned(),
        user_group: String::new(),
    };
    let tag = sign(&fixture.app.keys.key, &record.signed_bytes());
    let wire = encode_inbound_frame(&record.encode(&tag).unwrap()).unwrap();

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(&wire).await.unwrap();

    assert!(is_closed(&mut client).await);
    fixture.relay.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_frame_gets_the_connection_dropped() {
    let fixture = start_relay().await;
    let addr = fixture.relay.local_addr();

    let mut client = TcpStream::connect(addr).await.unwrap();
    // Declares a payload far beyond the receive buffer.
    client.write_all(&4096u16.to_le_bytes()).await.unwrap();

    assert!(is_closed(&mut client).await);
    wait_until(|| fixture.relay.connection_count() == 0).await;

    fixture.relay.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn peer_disconnect_removes_the_connection() {
    let fixture = start_relay().await;
    let addr = fixture.relay.local_addr();

    let client = register_client(&fixture, addr, "ib1", "alice", "").await;
    drop(client);

    wait_until(|| fixture.relay.connection_count() == 0).await;
    fixture.relay.shutdown().await;
}
