//! Shared helpers for the socket-level tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use hijack_relay::config::TimeoutConfig;
use hijack_relay::proxy::Forwarder;
use hijack_relay::server::{Origin, Server, ServerHandle, ServerOptions};
use hijack_relay::tracker::SocketTracker;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const GET_CLOSE: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";

/// Timeouts short enough that a stuck test fails quickly.
pub fn fast_timeouts() -> TimeoutConfig {
    TimeoutConfig {
        dial_ms: 1_000,
        idle_ms: 2_000,
        total_ms: 5_000,
        read_request_ms: 2_000,
        drain_ms: 500,
    }
}

pub async fn spawn_origin() -> ServerHandle {
    Server::bind("127.0.0.1:0", Origin, ServerOptions::from(&fast_timeouts()))
        .await
        .unwrap()
        .start()
        .unwrap()
}

/// Starts a relay to `target`, returning its handle and a forwarder clone
/// sharing the same socket tracker.
pub async fn spawn_proxy(target: &str, timeouts: TimeoutConfig) -> (ServerHandle, Forwarder) {
    let forwarder = Forwarder::new(target, timeouts);
    let handle = Server::bind("127.0.0.1:0", forwarder.clone(), ServerOptions::from(&timeouts))
        .await
        .unwrap()
        .start()
        .unwrap();
    (handle, forwarder)
}

/// An address nothing listens on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Sends `request` and reads until the peer closes.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("peer did not close the connection")
        .unwrap();
    response
}

pub fn status_of(response: &[u8]) -> u16 {
    let line_end = response
        .windows(2)
        .position(|w| w == b"\r\n")
        .expect("no status line");
    let line = std::str::from_utf8(&response[..line_end]).unwrap();
    line.split(' ').nth(1).unwrap().parse().unwrap()
}

pub fn body_of(response: &[u8]) -> &[u8] {
    let head_end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator");
    &response[head_end + 4..]
}

/// Reads from `stream` until a full message head (and Content-Length body)
/// has arrived. Returns the raw bytes.
pub async fn read_message(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        if let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse::<usize>().unwrap())
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + body_len {
                return buf;
            }
        }

        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return buf;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Waits up to two seconds for `tracker` to report no open sockets.
pub async fn wait_until_closed(tracker: &SocketTracker) -> usize {
    for _ in 0..200 {
        if tracker.open() == 0 {
            return 0;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tracker.open()
}
