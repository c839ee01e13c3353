//! The TCP accept loop and per-connection reader/writer tasks.
//!
//! Client text is newline-delimited UTF-8 (§6); server frames are
//! length-prefixed bincode envelopes (§4.12). Connection tasks run on the
//! ambient multi-threaded `tokio` runtime and never touch the entity store
//! directly — they only move bytes across the channels in [`InboundEvent`]
//! and [`OutboundHandle`], matching the tick-to-I/O boundary described in
//! the concurrency model.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Opaque per-socket id, the handle stored on `Connection` once a socket
/// is bound to an entity.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ConnId(pub u64);

/// One event the tick loop drains from the network layer at phase start.
#[derive(Debug)]
pub enum InboundEvent {
    Accepted(ConnId),
    Line(ConnId, String),
    Disconnected(ConnId),
}

type WriterTable = Arc<Mutex<FxHashMap<ConnId, mpsc::UnboundedSender<Vec<u8>>>>>;

/// Cheap, cloneable handle the tick thread uses to push outbound frames —
/// the fire-and-forget send the concurrency model requires never blocks
/// the tick: a full or closed channel just drops the frame.
#[derive(Clone)]
pub struct OutboundHandle {
    writers: WriterTable,
}

impl OutboundHandle {
    pub fn send(&self, conn: ConnId, frame: Vec<u8>) {
        let writers = self.writers.lock().unwrap();
        if let Some(tx) = writers.get(&conn) {
            let _ = tx.send(frame);
        }
    }

    /// Drop the writer's sender half, letting its task drain and exit —
    /// used to reject a connection that failed the admission handshake
    /// (§6: "first command before auth fails the upgrade").
    pub fn close(&self, conn: ConnId) {
        self.writers.lock().unwrap().remove(&conn);
    }
}

/// Bind `addr` and spawn the accept loop as a background task. Returns the
/// event channel the tick loop drains and the handle used to reply.
pub async fn serve(addr: SocketAddr) -> std::io::Result<(mpsc::UnboundedReceiver<InboundEvent>, OutboundHandle)> {
    let listener = TcpListener::bind(addr).await?;
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let outbound = OutboundHandle { writers: Arc::new(Mutex::new(FxHashMap::default())) };
    let next_id = Arc::new(AtomicU64::new(1));

    tokio::spawn(accept_loop(listener, events_tx, outbound.clone(), next_id));

    Ok((events_rx, outbound))
}

async fn accept_loop(
    listener: TcpListener,
    events_tx: mpsc::UnboundedSender<InboundEvent>,
    outbound: OutboundHandle,
    next_id: Arc<AtomicU64>,
) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!("accept failed: {e}");
                continue;
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("failed to set TCP_NODELAY: {e}");
        }

        let conn = ConnId(next_id.fetch_add(1, Ordering::Relaxed));
        let (read_half, write_half) = stream.into_split();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        outbound.writers.lock().unwrap().insert(conn, frame_tx);

        tokio::spawn(writer_task(write_half, frame_rx));
        tokio::spawn(reader_task(read_half, conn, events_tx.clone(), outbound.writers.clone()));

        if events_tx.send(InboundEvent::Accepted(conn)).is_err() {
            return;
        }
        info!(%addr, conn = conn.0, "accepted connection");
    }
}

async fn writer_task(mut stream: OwnedWriteHalf, mut frames: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(frame) = frames.recv().await {
        let len = (frame.len() as u32).to_be_bytes();
        if stream.write_all(&len).await.is_err() {
            break;
        }
        if stream.write_all(&frame).await.is_err() {
            break;
        }
    }
}

async fn reader_task(
    stream: OwnedReadHalf,
    conn: ConnId,
    events_tx: mpsc::UnboundedSender<InboundEvent>,
    writers: WriterTable,
) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if events_tx.send(InboundEvent::Line(conn, line)).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(conn = conn.0, "read error: {e}");
                break;
            }
        }
    }
    writers.lock().unwrap().remove(&conn);
    let _ = events_tx.send(InboundEvent::Disconnected(conn));
}
