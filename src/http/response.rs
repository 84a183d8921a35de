//! Response handling and transformation.
//!
//! # Responsibilities
//! - Copy origin response headers minus a fixed deny-list
//! - Stream the origin body to the client in bounded chunks
//! - Stop reading from the origin as soon as the client goes away
//! - End open streams when the server's drain period runs out
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - At most one chunk waits in the channel and one is being read
//! - Each chunk is its own body frame, so hyper writes it out before the next
//!   read completes (no batching across chunks)

use std::io;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName};
use bytes::Bytes;
use futures_util::TryStreamExt;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;

/// Origin response headers never passed to the client.
///
/// The relayed body is re-framed by this server, so the origin's transfer
/// coding does not describe it.
pub const STRIPPED_RESPONSE_HEADERS: [HeaderName; 1] = [header::TRANSFER_ENCODING];

/// Copy every header not in [`STRIPPED_RESPONSE_HEADERS`], keeping repeats.
pub fn copy_response_headers(origin: &HeaderMap, out: &mut HeaderMap) {
    for (name, value) in origin {
        if STRIPPED_RESPONSE_HEADERS.contains(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
}

/// How a relay session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Origin body fully forwarded.
    Completed { bytes: u64 },
    /// Client went away mid-stream. Not an error.
    ClientDisconnected { bytes: u64 },
    /// Origin failed after headers were sent.
    OriginError { bytes: u64, error: String },
    /// Cut off by server shutdown.
    Interrupted { bytes: u64 },
}

impl RelayOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RelayOutcome::Completed { .. } => "completed",
            RelayOutcome::ClientDisconnected { .. } => "client_disconnected",
            RelayOutcome::OriginError { .. } => "origin_error",
            RelayOutcome::Interrupted { .. } => "interrupted",
        }
    }

    pub fn bytes(&self) -> u64 {
        match self {
            RelayOutcome::Completed { bytes }
            | RelayOutcome::ClientDisconnected { bytes }
            | RelayOutcome::OriginError { bytes, .. }
            | RelayOutcome::Interrupted { bytes } => *bytes,
        }
    }

    fn log(&self, request_id: &str, resource_id: &str) {
        match self {
            RelayOutcome::Completed { bytes } => {
                tracing::info!(request_id = %request_id, resource_id = %resource_id, bytes, "Relay completed");
            }
            RelayOutcome::ClientDisconnected { bytes } => {
                tracing::debug!(request_id = %request_id, resource_id = %resource_id, bytes, "Client disconnected mid-stream");
            }
            RelayOutcome::OriginError { bytes, error } => {
                tracing::error!(request_id = %request_id, resource_id = %resource_id, bytes, error = %error, "Origin stream failed");
            }
            RelayOutcome::Interrupted { bytes } => {
                tracing::info!(request_id = %request_id, resource_id = %resource_id, bytes, "Relay ended by shutdown");
            }
        }
    }
}

type Chunk = Result<Bytes, io::Error>;

/// Turn an origin body into a client body relayed by a background task.
///
/// The task ends when the origin body is drained, the origin fails, the
/// client body is dropped (disconnect) or `shutdown` is cancelled. Dropping the
/// origin body on exit releases the origin connection. The handle yields the
/// session outcome once it has been logged and counted.
pub fn relay_body(
    origin: Body,
    chunk_size: usize,
    shutdown: CancellationToken,
    request_id: String,
    resource_id: String,
) -> (Body, JoinHandle<RelayOutcome>) {
    let (tx, rx) = mpsc::channel::<Chunk>(1);

    let session = tokio::spawn(async move {
        let outcome = pump(origin, chunk_size, &tx, &shutdown).await;
        outcome.log(&request_id, &resource_id);
        metrics::record_session(outcome.label(), outcome.bytes());
        outcome
    });

    (Body::from_stream(ReceiverStream::new(rx)), session)
}

/// Copy `origin` into `tx` one chunk at a time.
pub async fn pump(
    origin: Body,
    chunk_size: usize,
    tx: &mpsc::Sender<Chunk>,
    shutdown: &CancellationToken,
) -> RelayOutcome {
    let stream = origin.into_data_stream().map_err(io::Error::other);
    let mut reader = StreamReader::new(stream);
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut relayed: u64 = 0;

    loop {
        let read = tokio::select! {
            biased;
            _ = tx.closed() => return RelayOutcome::ClientDisconnected { bytes: relayed },
            _ = shutdown.cancelled() => return RelayOutcome::Interrupted { bytes: relayed },
            read = reader.read(&mut buffer) => read,
        };

        match read {
            Ok(0) => return RelayOutcome::Completed { bytes: relayed },
            Ok(n) => {
                let chunk = Bytes::copy_from_slice(&buffer[..n]);
                let sent = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => return RelayOutcome::Interrupted { bytes: relayed },
                    sent = tx.send(Ok(chunk)) => sent,
                };
                if sent.is_err() {
                    return RelayOutcome::ClientDisconnected { bytes: relayed };
                }
                relayed += n as u64;
            }
            Err(e) => {
                // Aborts the client body instead of ending it cleanly.
                let _ = tx
                    .send(Err(io::Error::new(e.kind(), "origin stream failed")))
                    .await;
                return RelayOutcome::OriginError {
                    bytes: relayed,
                    error: e.to_string(),
                };
            }
        }
    }
}
