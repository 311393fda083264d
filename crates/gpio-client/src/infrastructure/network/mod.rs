//! Network infrastructure for the client application.
//!
//! Owns the single TCP connection to the GPIO simulator and implements the
//! two protocol exchanges:
//!
//! - **Pin sync**: write `RequestSync`, wait for the reply, then drain every
//!   byte currently queued on the socket and decode it into a [`PinSnapshot`].
//! - **Pin update**: write one 3-byte `PinUpdate` and flush.
//!
//! # Connection lifecycle
//!
//! ```text
//! connect() ──> Connecting ──ok──> Connected ──EOF / I/O error / timeout / cancel / close()──> Closed
//!                    └──error──> ConnectFailed (no connector is returned)
//! ```
//!
//! A connector never reconnects.  Once `Closed`, sync returns an empty
//! snapshot and pin updates are dropped.  Both are `Ok`, not errors.  The
//! caller builds a new connector to try again.
//!
//! # Reply framing
//!
//! The protocol has no length prefix or terminator.  The reply to a sync is
//! considered complete the moment the socket reports no more buffered bytes.
//! A reply that arrives in several TCP segments with a gap in between is
//! therefore truncated at the gap; that is how every client of this protocol
//! behaves.
//!
//! Replies carry no request id either.  Once a sync request is on the wire,
//! giving up on its reply (timeout or cancellation) leaves the stream out of
//! step: a late reply would be read by the next sync.  The connector is
//! closed instead.
//!
//! # Exclusive access
//!
//! The protocol has no request ids, so two interleaved exchanges would
//! corrupt each other.  The socket lives inside a `tokio::sync::Mutex` that is
//! held for the whole exchange, which makes concurrent callers take turns.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use gpio_core::{decode_sync_burst, encode_command, Command, PinSnapshot};
use thiserror::Error;
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    sync::Mutex,
    time,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::pin_panel::{LinkError, SimulatorLink};

/// Default TCP port of the GPIO simulator.
pub const DEFAULT_SIMULATOR_PORT: u16 = 9596;

/// Size of each non-blocking read while draining a reply.
const READ_CHUNK: usize = 256;

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The TCP connection to the simulator could not be established.
    #[error("failed to connect to simulator at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// A read or write failed on the established connection.  The connector
    /// is closed afterwards.
    #[error("connection I/O error: {0}")]
    Io(#[from] io::Error),
    /// The simulator did not start replying to a sync within the bound.  The
    /// connector is closed afterwards.
    #[error("simulator did not reply within {0:?}")]
    Timeout(Duration),
    /// The caller cancelled the sync while it was waiting for a reply.  The
    /// connector is closed afterwards.
    #[error("pin sync cancelled")]
    Cancelled,
}

/// Configuration for the simulator connection.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Address of the simulator's TCP port.
    pub simulator_addr: SocketAddr,
    /// Upper bound on the initial TCP connect.
    pub connect_timeout: Duration,
    /// Upper bound on waiting for the first byte of a sync reply.
    pub sync_timeout: Duration,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            simulator_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_SIMULATOR_PORT)),
            connect_timeout: Duration::from_secs(5),
            sync_timeout: Duration::from_secs(2),
        }
    }
}

/// Lifecycle state of a [`PinConnector`].
///
/// `Connecting` only exists inside [`PinConnector::connect`]; a connector
/// value is always `Connected` or `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Closed,
}

/// The socket, or the fact that it is gone.
enum Connection {
    Open(TcpStream),
    Closed,
}

/// How a non-blocking drain of the socket ended.
enum Drain {
    /// The socket reported no more buffered bytes.
    Quiet,
    /// The simulator closed its end of the stream.
    PeerClosed,
}

/// Bytes collected for one sync reply.
struct SyncReply {
    bytes: Vec<u8>,
    peer_closed: bool,
}

/// Exclusive owner of the TCP connection to the simulator.
pub struct PinConnector {
    config: ConnectorConfig,
    peer_addr: SocketAddr,
    conn: Mutex<Connection>,
}

impl PinConnector {
    /// Connects to the simulator.
    ///
    /// Performs a single connect attempt bounded by
    /// [`ConnectorConfig::connect_timeout`].  There is no retry.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ConnectFailed`] if the simulator cannot be
    /// reached.  No connector exists in that case.
    pub async fn connect(config: ConnectorConfig) -> Result<Self, ConnectorError> {
        let addr = config.simulator_addr;
        debug!(state = ?ConnectionState::Connecting, "connecting to simulator at {addr}");

        let stream = match time::timeout(config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                warn!("could not connect to simulator at {addr}: {source}");
                return Err(ConnectorError::ConnectFailed { addr, source });
            }
            Err(_) => {
                warn!("connect to simulator at {addr} timed out after {:?}", config.connect_timeout);
                return Err(ConnectorError::ConnectFailed {
                    addr,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                });
            }
        };

        // Pin updates are 3 bytes each; do not let Nagle hold them back.
        stream
            .set_nodelay(true)
            .map_err(|source| ConnectorError::ConnectFailed { addr, source })?;

        info!("connected to simulator at {addr}");
        Ok(Self {
            config,
            peer_addr: addr,
            conn: Mutex::new(Connection::Open(stream)),
        })
    }

    /// Address of the simulator this connector was opened against.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Current lifecycle state.  Waits for any in-flight operation to finish.
    pub async fn state(&self) -> ConnectionState {
        match *self.conn.lock().await {
            Connection::Open(_) => ConnectionState::Connected,
            Connection::Closed => ConnectionState::Closed,
        }
    }

    /// Sends the state of one pin to the simulator.
    ///
    /// Writes `[0x35, pin, state]` and flushes.  `pin` goes on the wire
    /// unchanged and is not range-checked.
    ///
    /// On a closed connector this is a no-op that returns `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Io`] if the write fails; the connector is
    /// closed afterwards.
    pub async fn send_pin_state_change(&self, pin: u8, asserted: bool) -> Result<(), ConnectorError> {
        let mut conn = self.conn.lock().await;
        let Connection::Open(stream) = &mut *conn else {
            debug!(pin, asserted, "connection is closed; dropping pin update");
            return Ok(());
        };

        if let Err(e) = write_command(stream, &Command::pin_update(pin, asserted)).await {
            warn!("failed to send pin update: {e}");
            *conn = Connection::Closed;
            return Err(e.into());
        }

        debug!(pin, asserted, "sent pin update");
        Ok(())
    }

    /// Requests the current state of every pin the simulator knows about.
    ///
    /// Equivalent to [`Self::request_pin_sync_with_cancel`] with a token that
    /// is never cancelled.
    ///
    /// # Errors
    ///
    /// See [`Self::request_pin_sync_with_cancel`].
    pub async fn request_pin_sync(&self) -> Result<PinSnapshot, ConnectorError> {
        self.request_pin_sync_with_cancel(&CancellationToken::new()).await
    }

    /// Requests the current state of every pin, abandoning the wait if
    /// `cancel` fires.
    ///
    /// Returns an empty snapshot without writing anything if the connector is
    /// closed.  Otherwise writes `RequestSync`, waits (bounded by
    /// [`ConnectorConfig::sync_timeout`]) until the reply starts, then drains
    /// everything the socket has buffered and decodes it.  The snapshot may
    /// cover fewer than 26 pins, or none.
    ///
    /// If the simulator closes the stream after sending part of the reply,
    /// the received part is returned and the connector is closed.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::Io`] on a read or write failure, or if the simulator
    ///   closes the stream before replying.  The connector is closed.
    /// - [`ConnectorError::Timeout`] if no reply starts within the bound.
    /// - [`ConnectorError::Cancelled`] if `cancel` fires during the wait.
    ///
    /// Every error closes the connector.
    pub async fn request_pin_sync_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PinSnapshot, ConnectorError> {
        let mut conn = self.conn.lock().await;
        let Connection::Open(stream) = &mut *conn else {
            debug!("connection is closed; returning empty snapshot");
            return Ok(PinSnapshot::new());
        };

        if let Err(e) = write_command(stream, &Command::RequestSync).await {
            warn!("failed to send sync request: {e}");
            *conn = Connection::Closed;
            return Err(e.into());
        }

        let timeout = self.config.sync_timeout;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = time::timeout(timeout, read_sync_reply(stream)) => Some(outcome),
        };

        // An abandoned reply would otherwise be read by the next sync.
        let Some(outcome) = outcome else {
            debug!("pin sync cancelled while waiting for reply; closing connection");
            *conn = Connection::Closed;
            return Err(ConnectorError::Cancelled);
        };

        let reply = match outcome {
            Err(_) => {
                warn!("simulator did not reply to sync within {timeout:?}; closing connection");
                *conn = Connection::Closed;
                return Err(ConnectorError::Timeout(timeout));
            }
            Ok(Err(e)) => {
                warn!("failed to read sync reply: {e}");
                *conn = Connection::Closed;
                return Err(e.into());
            }
            Ok(Ok(reply)) => reply,
        };

        if reply.peer_closed {
            info!("simulator closed the connection during pin sync");
            *conn = Connection::Closed;
        }

        let snapshot = decode_sync_burst(&reply.bytes);
        debug!(bytes = reply.bytes.len(), pins = snapshot.len(), "pin sync complete");
        Ok(snapshot)
    }

    /// Shuts the connection down.  Later operations become no-ops.
    pub async fn close(&self) {
        let mut conn = self.conn.lock().await;
        if let Connection::Open(stream) = &mut *conn {
            if let Err(e) = stream.shutdown().await {
                debug!("error while shutting down simulator connection: {e}");
            }
            info!("closed connection to simulator at {}", self.peer_addr);
        }
        *conn = Connection::Closed;
    }
}

#[async_trait]
impl SimulatorLink for PinConnector {
    async fn request_pin_sync(&self) -> Result<PinSnapshot, LinkError> {
        PinConnector::request_pin_sync(self).await.map_err(LinkError::from)
    }

    async fn send_pin_state_change(&self, pin: u8, asserted: bool) -> Result<(), LinkError> {
        PinConnector::send_pin_state_change(self, pin, asserted)
            .await
            .map_err(LinkError::from)
    }
}

impl From<ConnectorError> for LinkError {
    fn from(e: ConnectorError) -> Self {
        LinkError::new(e)
    }
}

// ── Socket helpers ────────────────────────────────────────────────────────────

/// Encodes `command`, writes it in full and flushes.
async fn write_command(stream: &mut TcpStream, command: &Command) -> io::Result<()> {
    stream.write_all(&encode_command(command)).await?;
    stream.flush().await
}

/// Waits for the reply to start, then drains it.
///
/// Readiness can be reported without any bytes to read; in that case the
/// wait simply resumes.
async fn read_sync_reply(stream: &TcpStream) -> io::Result<SyncReply> {
    let mut bytes = Vec::new();
    loop {
        stream.readable().await?;
        match drain_available(stream, &mut bytes)? {
            Drain::Quiet if bytes.is_empty() => continue,
            Drain::Quiet => return Ok(SyncReply { bytes, peer_closed: false }),
            Drain::PeerClosed if bytes.is_empty() => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "simulator closed the connection before replying",
                ));
            }
            Drain::PeerClosed => return Ok(SyncReply { bytes, peer_closed: true }),
        }
    }
}

/// Appends every byte currently buffered on the socket to `buf`, without
/// waiting for more.
fn drain_available(stream: &TcpStream, buf: &mut Vec<u8>) -> io::Result<Drain> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match stream.try_read(&mut chunk) {
            Ok(0) => return Ok(Drain::PeerClosed),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Drain::Quiet),
            Err(e) => return Err(e),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
