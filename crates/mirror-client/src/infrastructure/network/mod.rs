//! Network infrastructure for the mirroring session.
//!
//! Handles the two TCP connections to the server on the device and the
//! read loops that pump their byte streams through the protocol layer.
//!
//! Architecture:
//! - `video` owns the video-channel read loop: handshake, then a
//!   header+payload frame loop feeding the demuxer. Packets are
//!   forwarded on an `mpsc` channel.
//! - `control` owns the outbound command path ([`Controller`]) and the
//!   inbound device-event read loop.
//! - Both loops are generic over `AsyncRead` so tests can drive them
//!   with scripted byte streams instead of sockets.
//!
//! [`Controller`]: control::Controller

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use mirror_core::ProtocolError;

pub mod control;
pub mod video;

/// Errors that can occur in the session network layer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// TCP connection to the mirroring server failed.
    #[error("failed to connect to server at {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on an established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream violated the wire protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The stream ended in the middle of a wire unit. A clean close is
    /// only valid on a unit boundary.
    #[error("stream closed mid-{context}")]
    IncompleteRead { context: &'static str },

    /// The session was stopped; the channel is no longer writable.
    #[error("session stopped")]
    Stopped,
}

/// Reads exactly `buf.len()` bytes, distinguishing a clean close from a
/// truncation.
///
/// The first byte is read with a plain `read`: zero bytes there means
/// the peer closed on a unit boundary and `Ok(false)` is returned with
/// `buf` untouched beyond that point. EOF anywhere later is a
/// mid-unit truncation and maps to [`SessionError::IncompleteRead`].
pub(crate) async fn read_exact_or_close<R>(
    reader: &mut R,
    buf: &mut [u8],
    context: &'static str,
) -> Result<bool, SessionError>
where
    R: AsyncRead + Unpin,
{
    let n = reader.read(buf).await?;
    if n == 0 {
        return Ok(false);
    }
    read_remaining(reader, &mut buf[n..], context).await?;
    Ok(true)
}

/// Reads exactly `buf.len()` bytes; EOF at any point is a truncation.
pub(crate) async fn read_remaining<R>(
    reader: &mut R,
    buf: &mut [u8],
    context: &'static str,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
{
    reader.read_exact(buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            SessionError::IncompleteRead { context }
        } else {
            SessionError::Io(e)
        }
    })?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
