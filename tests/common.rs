//! Shared plumbing for the integration tests: spawns one `Server` per test
//! process on a unique loopback port and exposes raw read/write helpers
//! over the resulting `TcpStream`, following the teacher crate's
//! `tests/common.rs` (no FTP client crate — hand-rolled control-channel
//! byte exchange).

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};

use miniftpd::config::Config;
use miniftpd::storage::StdFilesystem;
use miniftpd::Server;
use tokio::net::TcpStream;

static NEXT_PORT: AtomicU16 = AtomicU16::new(12100);

/// Spawns a fresh server bound to a unique `127.0.0.1` port and returns the
/// address to connect to. Every test gets its own server instance rather
/// than sharing one, so tests can run concurrently without interfering
/// with each other's sessions or passive port pools.
pub async fn spawn_server(config: Config) -> SocketAddr {
    let port = NEXT_PORT.fetch_add(1, Ordering::SeqCst);
    let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
    let server = Server::new(StdFilesystem::new(), config);
    tokio::spawn(async move {
        let _ = server.listen(addr).await;
    });
    // Give the listener a moment to bind before the test dials in.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    addr
}

pub async fn connect(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.unwrap()
}

/// Reads one reply (single or multi-line) off `stream` into `buffer`,
/// returning it as `&str`. Assumes the reply fits in one `read`.
pub async fn read_reply<'a>(buffer: &'a mut [u8], stream: &TcpStream) -> &'a str {
    loop {
        stream.readable().await.unwrap();
        match stream.try_read(buffer) {
            Ok(n) => return std::str::from_utf8(&buffer[..n]).unwrap(),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => panic!("{e}"),
        }
    }
}

pub async fn send_line(stream: &TcpStream, line: &str) {
    loop {
        stream.writable().await.unwrap();
        match stream.try_write(format!("{line}\r\n").as_bytes()) {
            Ok(_) => return,
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => panic!("{e}"),
        }
    }
}

/// Parses the `(h1,h2,h3,h4,p1,p2)` tuple out of a `227` reply.
pub fn parse_pasv(reply: &str) -> SocketAddr {
    let body = reply.split_once('(').and_then(|(_, rest)| rest.split_once(')')).unwrap().0;
    let nums: Vec<u16> = body.split(',').map(|s| s.trim().parse().unwrap()).collect();
    let port = nums[4] * 256 + nums[5];
    format!("{}.{}.{}.{}:{}", nums[0], nums[1], nums[2], nums[3], port).parse().unwrap()
}

pub async fn read_all(stream: &TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        stream.readable().await.unwrap();
        match stream.try_read(&mut buf) {
            Ok(0) => return data,
            Ok(n) => data.extend_from_slice(&buf[..n]),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => panic!("{e}"),
        }
    }
}
