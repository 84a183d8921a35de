//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use vr_stream_relay::config::RelayConfig;
use vr_stream_relay::http::link::stream_path;
use vr_stream_relay::http::HttpServer;
use vr_stream_relay::lifecycle::Shutdown;
use vr_stream_relay::security::{Clock, ResourceIdFormat, TokenCodec};

pub const SECRET: &str = "integration-test-secret-0123456789";
pub const T0: i64 = 1_700_000_000;

/// Clock under test control.
#[derive(Debug)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now)))
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a mock origin sends back.
#[derive(Clone)]
pub struct OriginReply {
    pub status_line: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
    /// Use chunked transfer coding instead of Content-Length.
    pub chunked: bool,
}

impl OriginReply {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status_line: "200 OK",
            headers: vec![("Content-Type", "video/mp4".to_string())],
            body,
            chunked: false,
        }
    }
}

/// Requests seen by a mock origin.
#[derive(Default)]
pub struct OriginLog {
    pub hits: AtomicUsize,
    pub heads: Mutex<Vec<String>>,
}

impl OriginLog {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_head(&self) -> String {
        self.heads.lock().unwrap().last().cloned().unwrap_or_default()
    }

    /// Value of `name` in the last request, matched case-insensitively.
    pub fn last_header(&self, name: &str) -> Option<String> {
        self.last_header_values(name).into_iter().next()
    }

    /// Every value of `name` in the last request, in order.
    pub fn last_header_values(&self, name: &str) -> Vec<String> {
        header_values(&self.last_head(), name)
    }
}

pub fn header_values(head: &str, name: &str) -> Vec<String> {
    head.lines()
        .skip(1)
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
        .collect()
}

async fn read_head(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        match socket.read(&mut byte).await {
            Ok(1) => buf.push(byte[0]),
            _ => return None,
        }
    }
    Some(String::from_utf8_lossy(&buf).into_owned())
}

async fn write_reply(socket: &mut TcpStream, reply: &OriginReply) -> std::io::Result<()> {
    let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", reply.status_line);
    for (name, value) in &reply.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    if reply.chunked {
        head.push_str("Transfer-Encoding: chunked\r\n\r\n");
    } else {
        head.push_str(&format!("Content-Length: {}\r\n\r\n", reply.body.len()));
    }
    socket.write_all(head.as_bytes()).await?;

    if reply.chunked {
        for piece in reply.body.chunks(1024 * 1024) {
            socket.write_all(format!("{:x}\r\n", piece.len()).as_bytes()).await?;
            socket.write_all(piece).await?;
            socket.write_all(b"\r\n").await?;
        }
        socket.write_all(b"0\r\n\r\n").await?;
    } else {
        socket.write_all(&reply.body).await?;
    }
    socket.shutdown().await
}

/// Start a mock origin answering every request with `reply`.
pub async fn start_origin(reply: OriginReply) -> (SocketAddr, Arc<OriginLog>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(OriginLog::default());
    let log_task = log.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let reply = reply.clone();
            let log = log_task.clone();
            tokio::spawn(async move {
                if let Some(head) = read_head(&mut socket).await {
                    log.hits.fetch_add(1, Ordering::SeqCst);
                    log.heads.lock().unwrap().push(head);
                    let _ = write_reply(&mut socket, &reply).await;
                }
            });
        }
    });

    (addr, log)
}

/// Start an origin that streams forever until its peer goes away.
///
/// The flag flips once a write fails, i.e. the relay dropped the connection.
pub async fn start_endless_origin() -> (SocketAddr, Arc<AtomicBool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let closed = Arc::new(AtomicBool::new(false));
    let closed_task = closed.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let closed = closed_task.clone();
            tokio::spawn(async move {
                if read_head(&mut socket).await.is_none() {
                    return;
                }
                let head = "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: 1073741824\r\n\r\n";
                if socket.write_all(head.as_bytes()).await.is_err() {
                    closed.store(true, Ordering::SeqCst);
                    return;
                }
                let piece = vec![7u8; 64 * 1024];
                loop {
                    if socket.write_all(&piece).await.is_err() {
                        closed.store(true, Ordering::SeqCst);
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            });
        }
    });

    (addr, closed)
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Relay configuration pointing at `origin`.
pub fn relay_config(origin: SocketAddr) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.origin.host = origin.ip().to_string();
    config.origin.port = origin.port();
    config.origin.path_template = "/Videos/{id}/stream.mp4?Static=true".into();
    config.signing.secret = SECRET.into();
    config.relay.resource_id_format = ResourceIdFormat::Opaque;
    config
}

/// A running relay.
pub struct Relay {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<RelayConfig>,
    pub server: JoinHandle<()>,
}

impl Relay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the relay with `config` and `clock`.
pub async fn start_relay(config: RelayConfig, clock: Arc<dyn Clock>) -> Relay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::with_clock(config, clock);
    let server_shutdown = shutdown.subscribe();

    let server = tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    Relay {
        addr,
        shutdown,
        config_updates,
        server,
    }
}

/// Stream path for `resource_id`, signed at `now`.
pub fn signed_path(resource_id: &str, ttl: i64, now: i64) -> String {
    stream_path(&TokenCodec::new(SECRET).mint(resource_id, ttl, now))
}

/// Deterministic test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
