//! Newline-framed packet transport over TCP.
//!
//! Grounded on `examples/original_source/package/pocketcoin/netpack/netpack.go`:
//! every message is one canonically-serialized [`NetworkPacket`] terminated
//! by `\n`. [`Connection`] wraps one TCP socket split into independent read
//! and write halves so a multi-message exchange (the sync handshake) can
//! keep reading lines without losing whatever the read buffer looked ahead
//! and captured. [`send_one_shot`] and [`send_request`] cover the simpler
//! fire-and-forget and request/response shapes; connections are never reused.

use std::fmt;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::canonical::canonical_json;
use crate::types::NetworkPacket;

#[derive(Debug)]
pub enum WireError {
    Connect(String),
    Io(String),
    /// The peer closed the connection before sending a line.
    Disconnected,
    Parse(String),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Connect(msg) => write!(f, "connect failed: {msg}"),
            WireError::Io(msg) => write!(f, "I/O error: {msg}"),
            WireError::Disconnected => write!(f, "peer closed the connection"),
            WireError::Parse(msg) => write!(f, "could not parse packet: {msg}"),
        }
    }
}

impl std::error::Error for WireError {}

/// One TCP connection carrying newline-framed packets, read and write
/// halves kept independently so reads don't race writes and a buffered
/// look-ahead read is never thrown away between calls.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    /// Opens a fresh connection to `addr`.
    pub async fn connect(addr: &str) -> Result<Self, WireError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| WireError::Connect(e.to_string()))?;
        Ok(Self::from_stream(stream))
    }

    /// Wraps an already-accepted connection.
    pub fn from_stream(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Writes one framed packet.
    pub async fn write_packet(&mut self, packet: &NetworkPacket) -> Result<(), WireError> {
        self.write_line(&canonical_json(packet)).await
    }

    /// Reads one line and parses it as a packet.
    pub async fn read_packet(&mut self) -> Result<NetworkPacket, WireError> {
        let line = self.read_line().await?;
        serde_json::from_str(&line).map_err(|e| WireError::Parse(e.to_string()))
    }

    /// Writes a raw line (a newline is appended). Used for the sync
    /// handshake's literal `"Okay"` acks, which are not packets.
    pub async fn write_line(&mut self, line: &str) -> Result<(), WireError> {
        let mut framed = line.to_string();
        framed.push('\n');
        self.writer
            .write_all(framed.as_bytes())
            .await
            .map_err(|e| WireError::Io(e.to_string()))
    }

    /// Reads one line, with the trailing newline stripped.
    pub async fn read_line(&mut self) -> Result<String, WireError> {
        let mut line = String::new();
        let bytes_read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| WireError::Io(e.to_string()))?;
        if bytes_read == 0 {
            return Err(WireError::Disconnected);
        }
        Ok(line.trim_end_matches('\n').to_string())
    }
}

/// Opens a connection to `addr`, writes `packet`, and closes — no response
/// is read. Used for `Transaction` and `MinedBlock` gossip.
pub async fn send_one_shot(addr: &str, packet: &NetworkPacket) -> Result<(), WireError> {
    let mut conn = Connection::connect(addr).await?;
    conn.write_packet(packet).await
}

/// Opens a connection to `addr`, writes `packet`, reads back one framed
/// response packet, and closes. Used for `Balance`, `BlockHeight`, and
/// `PublicKeyInCache` queries.
pub async fn send_request(addr: &str, packet: &NetworkPacket) -> Result<NetworkPacket, WireError> {
    let mut conn = Connection::connect(addr).await?;
    conn.write_packet(packet).await?;
    conn.read_packet().await
}
