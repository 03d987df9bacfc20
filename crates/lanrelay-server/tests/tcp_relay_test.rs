//! End-to-end tests for the stream transport.
//!
//! Real sockets against a real server on a loopback port: registration,
//! relay fan-out, termination, and the protocol-violation paths.

use std::{net::SocketAddr, time::Duration};

use lanrelay_server::{Server, ServerConfig, TransportKind};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    time::{sleep, timeout},
};

const READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Bind an ephemeral port, spawn the run loop, return the address.
async fn start_server() -> SocketAddr {
    let config = ServerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        transport: TransportKind::Tcp,
    };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    local_addr: SocketAddr,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let local_addr = stream.local_addr().unwrap();
        let (read, write) = stream.into_split();
        Self { reader: BufReader::new(read), writer: write, local_addr }
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(format!("{line}\n").as_bytes()).await.unwrap();
    }

    async fn expect_line(&mut self, context: &str) -> String {
        let mut line = String::new();
        let n = timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .unwrap_or_else(|_| panic!("timed out: {context}"))
            .unwrap();
        assert!(n > 0, "unexpected EOF: {context}");
        line.trim_end().to_string()
    }

    async fn expect_eof(&mut self, context: &str) {
        let mut line = String::new();
        let n = timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .unwrap_or_else(|_| panic!("timed out: {context}"))
            .unwrap();
        assert_eq!(n, 0, "expected EOF ({context}), got {line:?}");
    }
}

#[tokio::test]
async fn stream_relay_end_to_end() {
    let addr = start_server().await;

    let mut alice = TestClient::connect(addr).await;
    alice.send("__USERNAME__:Alice").await;
    assert_eq!(alice.expect_line("alice welcome").await, "Welcome, Alice!");

    let mut bob = TestClient::connect(addr).await;
    bob.send("__USERNAME__:Bob").await;
    assert_eq!(bob.expect_line("bob welcome").await, "Welcome, Bob!");
    assert_eq!(alice.expect_line("alice sees bob join").await, "*** Bob joined the chat. ***");

    bob.send("hello").await;
    assert_eq!(
        alice.expect_line("alice hears bob").await,
        format!("[Bob {}] hello", bob.local_addr),
    );

    bob.send("QUIT").await;
    assert_eq!(alice.expect_line("alice sees bob leave").await, "*** Bob left the chat. ***");

    // Bob was excluded from his own relay, so after the welcome his
    // connection saw nothing before the server closed it on QUIT.
    bob.expect_eof("bob connection closed after quit").await;
}

#[tokio::test]
async fn payload_split_across_chunks_is_reassembled() {
    let addr = start_server().await;

    let mut alice = TestClient::connect(addr).await;
    alice.send("__USERNAME__:Alice").await;
    alice.expect_line("alice welcome").await;

    let mut bob = TestClient::connect(addr).await;
    bob.send("__USERNAME__:Bob").await;
    bob.expect_line("bob welcome").await;
    alice.expect_line("alice sees bob join").await;

    bob.writer.write_all(b"HEL").await.unwrap();
    bob.writer.flush().await.unwrap();
    sleep(Duration::from_millis(50)).await;
    bob.writer.write_all(b"LO\n").await.unwrap();

    assert_eq!(
        alice.expect_line("alice hears reassembled frame").await,
        format!("[Bob {}] HELLO", bob.local_addr),
    );
}

#[tokio::test]
async fn payload_before_registration_is_dropped() {
    let addr = start_server().await;

    let mut alice = TestClient::connect(addr).await;
    alice.send("__USERNAME__:Alice").await;
    alice.expect_line("alice welcome").await;

    let mut eve = TestClient::connect(addr).await;
    eve.send("sneaky message").await;
    // Protocol violation: the server drops eve without a word.
    eve.expect_eof("eve dropped for speaking before registering").await;

    // Eve's teardown is complete, so alice's next line proves the sneaky
    // payload was never broadcast.
    let mut bob = TestClient::connect(addr).await;
    bob.send("__USERNAME__:Bob").await;
    assert_eq!(alice.expect_line("alice's next line is bob joining").await, "*** Bob joined the chat. ***");
}

#[tokio::test]
async fn invalid_name_is_dropped_silently() {
    let addr = start_server().await;

    let mut alice = TestClient::connect(addr).await;
    alice.send("__USERNAME__:Alice").await;
    alice.expect_line("alice welcome").await;

    let mut eve = TestClient::connect(addr).await;
    eve.send("__USERNAME__:far_too_long_a_name_to_accept").await;
    eve.expect_eof("eve dropped for invalid name").await;

    let mut bob = TestClient::connect(addr).await;
    bob.send("__USERNAME__:Bob").await;
    assert_eq!(alice.expect_line("no join notice for eve").await, "*** Bob joined the chat. ***");
}

#[tokio::test]
async fn double_quit_emits_one_left_notice() {
    let addr = start_server().await;

    let mut alice = TestClient::connect(addr).await;
    alice.send("__USERNAME__:Alice").await;
    alice.expect_line("alice welcome").await;

    let mut bob = TestClient::connect(addr).await;
    bob.send("__USERNAME__:Bob").await;
    bob.expect_line("bob welcome").await;
    alice.expect_line("alice sees bob join").await;

    // Both termination frames arrive in one chunk; teardown is idempotent.
    bob.writer.write_all(b"QUIT\nQUIT\n").await.unwrap();
    assert_eq!(alice.expect_line("one left notice").await, "*** Bob left the chat. ***");

    // A third registration is the very next thing alice hears - no
    // duplicate departure in between.
    let mut carol = TestClient::connect(addr).await;
    carol.send("__USERNAME__:Carol").await;
    assert_eq!(alice.expect_line("carol joins next").await, "*** Carol joined the chat. ***");
}

#[tokio::test]
async fn abrupt_disconnect_broadcasts_left() {
    let addr = start_server().await;

    let mut alice = TestClient::connect(addr).await;
    alice.send("__USERNAME__:Alice").await;
    alice.expect_line("alice welcome").await;

    let mut bob = TestClient::connect(addr).await;
    bob.send("__USERNAME__:Bob").await;
    bob.expect_line("bob welcome").await;
    alice.expect_line("alice sees bob join").await;

    // Transport loss, not a QUIT frame.
    drop(bob);
    assert_eq!(alice.expect_line("alice sees bob leave").await, "*** Bob left the chat. ***");
}
