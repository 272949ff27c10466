use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use relay_server::{serve, AddressingMode, RelayConfig};

const READ_TIMEOUT: Duration = Duration::from_secs(3);
const PROMPT: &str = "Enter a message (format: clientNumber/message";

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    local_addr: SocketAddr,
    seen: Vec<String>,
}

impl TestClient {
    /// Connect and wait until the server has registered us
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let local_addr = stream.local_addr().unwrap();
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            lines: BufReader::new(reader).lines(),
            writer,
            local_addr,
            seen: Vec::new(),
        };
        client.expect(PROMPT).await;
        client
    }

    async fn send(&mut self, line: &str) {
        self.send_raw(line.as_bytes()).await;
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Read until a line containing `needle` arrives; returns everything read
    async fn expect(&mut self, needle: &str) -> Vec<String> {
        let mut read = Vec::new();
        loop {
            let line = timeout(READ_TIMEOUT, self.lines.next_line())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}, got {read:?}"))
                .unwrap()
                .unwrap_or_else(|| panic!("stream closed waiting for {needle:?}, got {read:?}"));
            self.seen.push(line.clone());
            read.push(line.clone());
            if line.contains(needle) {
                return read;
            }
        }
    }

    /// Read until the server closes the connection
    async fn expect_eof(&mut self) {
        loop {
            let next = timeout(READ_TIMEOUT, self.lines.next_line())
                .await
                .expect("timed out waiting for close");
            match next {
                Ok(Some(line)) => self.seen.push(line),
                Ok(None) | Err(_) => return,
            }
        }
    }

    fn saw(&self, needle: &str) -> bool {
        self.seen.iter().any(|line| line.contains(needle))
    }
}

async fn start(addressing: AddressingMode) -> SocketAddr {
    start_with(RelayConfig {
        addressing,
        ..RelayConfig::default()
    })
    .await
}

async fn start_with(config: RelayConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = RelayConfig {
        addr: addr.to_string(),
        color: false,
        ..config
    };
    tokio::spawn(serve(listener, config));
    addr
}

#[tokio::test]
async fn three_client_conversation() {
    let addr = start(AddressingMode::Positional).await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;
    let mut c = TestClient::connect(addr).await;

    // A → B
    a.send("2/hello").await;
    b.expect("Message from client 1: hello").await;
    b.expect("You may reply or enter a message:").await;
    a.expect("Message sent to 1 client(s).").await;

    // B → everyone else
    b.send("0/hi all").await;
    a.expect("Broadcast from client 2: hi all").await;
    c.expect("Broadcast from client 2: hi all").await;
    b.expect("Message sent to 2 client(s).").await;
    assert!(!b.saw("hi all"));

    // C → A, then C leaves
    c.send("1/x").await;
    a.expect("Message from client 3: x").await;
    c.expect("Message sent to 1 client(s).").await;
    c.send("EXIT").await;
    c.expect_eof().await;
    assert!(!c.saw("hello"));

    // B is still number 2
    a.send("2/still there?").await;
    b.expect("Message from client 1: still there?").await;
    a.expect("Message sent to 1 client(s).").await;
}

#[tokio::test]
async fn unknown_destination_is_reported_to_sender_only() {
    let addr = start(AddressingMode::Positional).await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;

    a.send("99/ignored").await;
    a.expect("Error: client with ID 99 does not exist.").await;
    a.expect(PROMPT).await;

    a.send("-1/ignored").await;
    a.expect("Error: client with ID -1 does not exist.").await;

    // Marker proves B has read past anything the bad sends could have produced
    a.send("2/marker").await;
    b.expect("Message from client 1: marker").await;
    assert!(!b.saw("ignored"));
}

#[tokio::test]
async fn line_without_separator_only_reprompts() {
    let addr = start(AddressingMode::Positional).await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;

    a.send("no separator here").await;
    let reply = a.expect(PROMPT).await;
    assert!(reply.iter().all(|line| !line.starts_with("Error")));

    a.send("2/marker").await;
    b.expect("Message from client 1: marker").await;
    assert!(!b.saw("no separator here"));
}

#[tokio::test]
async fn invalid_client_id_keeps_connection_open() {
    let addr = start(AddressingMode::Positional).await;
    let mut a = TestClient::connect(addr).await;

    a.send("abc/hi").await;
    a.expect("Error: client ID 'abc' is invalid.").await;
    a.expect(PROMPT).await;

    a.send("0/anyone").await;
    a.expect("Message sent to 0 client(s).").await;
}

#[tokio::test]
async fn departure_shifts_ordinals() {
    let addr = start(AddressingMode::Positional).await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;
    let mut c = TestClient::connect(addr).await;

    b.send("EXIT").await;
    b.expect_eof().await;

    // C moved from 3 to 2
    a.send("2/moved").await;
    c.expect("Message from client 1: moved").await;

    a.send("3/gone").await;
    a.expect("Error: client with ID 3 does not exist.").await;
}

#[tokio::test]
async fn dropped_connection_leaves_roster() {
    let addr = start(AddressingMode::Positional).await;
    let a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;
    let b_addr = b.local_addr;
    assert!(b.saw(&format!("Client 2 ({b_addr})")));

    // No EXIT, just end of stream
    drop(a);

    b.expect(&format!("Client 1 ({b_addr})")).await;
    b.send("2/nobody").await;
    b.expect("Error: client with ID 2 does not exist.").await;
}

#[tokio::test]
async fn roster_announcement_reaches_everyone() {
    let addr = start(AddressingMode::Positional).await;
    let mut a = TestClient::connect(addr).await;
    let b = TestClient::connect(addr).await;

    let block = a.expect(&format!("Client 2 ({})", b.local_addr)).await;
    assert!(block.iter().any(|line| line == "===== Connected clients ====="));
    assert!(block
        .iter()
        .any(|line| line == &format!("Client 1 ({})", a.local_addr)));
    assert!(b.saw(&format!("Client 2 ({})", b.local_addr)));
}

#[tokio::test]
async fn stable_addressing_keeps_numbers() {
    let addr = start(AddressingMode::Stable).await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;
    let mut c = TestClient::connect(addr).await;

    a.send("EXIT").await;
    a.expect_eof().await;

    b.send("3/hi").await;
    c.expect("Message from client 2: hi").await;

    b.send("1/hi").await;
    b.expect("Error: client with ID 1 does not exist.").await;
}

#[tokio::test]
async fn invalid_utf8_keeps_connection_open() {
    let addr = start(AddressingMode::Positional).await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;

    a.send_raw(b"0/caf\xe9").await;
    b.expect("Broadcast from client 1: caf\u{fffd}").await;
    a.expect("Message sent to 1 client(s).").await;

    a.send("0/after").await;
    b.expect("Broadcast from client 1: after").await;
}

#[tokio::test]
async fn overlong_line_is_rejected_and_session_continues() {
    let addr = start_with(RelayConfig {
        max_line_length: 64,
        ..RelayConfig::default()
    })
    .await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;

    a.send(&format!("0/{}", "x".repeat(500))).await;
    a.expect("Error: line exceeds 64 bytes.").await;
    a.expect(PROMPT).await;

    a.send("0/short").await;
    b.expect("Broadcast from client 1: short").await;
    assert!(!b.saw("xxxx"));
}

#[tokio::test]
async fn stalled_reader_is_dropped_without_affecting_others() {
    let addr = start_with(RelayConfig {
        write_timeout: Duration::from_millis(200),
        max_line_length: 128 * 1024,
        ..RelayConfig::default()
    })
    .await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;
    // Connected but never reads again, so its socket buffers fill up
    let stalled = TestClient::connect(addr).await;

    let payload = format!("3/{}", "x".repeat(64 * 1024));
    let mut dropped = false;
    for _ in 0..2000 {
        a.send(&payload).await;
        let reply = a.expect(PROMPT).await;
        if reply
            .iter()
            .any(|line| line.contains("client with ID 3 does not exist"))
        {
            dropped = true;
            break;
        }
    }
    assert!(dropped, "stalled client was never removed from the roster");

    // Everyone else still gets through
    a.send("2/still here").await;
    b.expect("Message from client 1: still here").await;
    a.expect("Message sent to 1 client(s).").await;

    drop(stalled);
}
