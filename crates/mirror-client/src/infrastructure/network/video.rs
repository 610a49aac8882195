//! Video-channel read path: handshake, then the frame loop.

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tracing::{debug, info};

use mirror_core::{parse_handshake, Demuxer, DeviceInfo, FrameHeader, VideoPacket, FRAME_HEADER_SIZE, HANDSHAKE_SIZE};

use super::{read_exact_or_close, read_remaining, SessionError};

/// Reads and parses the one-shot handshake that opens the video channel.
///
/// The handshake is mandatory, so EOF anywhere inside it (including
/// before the first byte) is an [`SessionError::IncompleteRead`].
pub(crate) async fn read_handshake<R>(reader: &mut R) -> Result<DeviceInfo, SessionError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; HANDSHAKE_SIZE];
    read_remaining(reader, &mut buf, "handshake").await?;
    let info = parse_handshake(&buf)?;
    info!(
        device = %info.device_name,
        codec = info.codec.name(),
        width = info.resolution.width,
        height = info.resolution.height,
        "video handshake complete"
    );
    Ok(info)
}

/// Pumps the video channel until the server closes it or the consumer
/// goes away.
///
/// Each iteration reads one `12-byte header + payload` frame and feeds
/// it through the demuxer; emitted packets are delivered in order on
/// `tx`. A send on a full channel blocks, so a slow consumer
/// backpressures the socket instead of growing a queue.
///
/// Returns `Ok(())` on a clean close (EOF on a frame boundary) or when
/// the receiver is dropped; any mid-frame EOF or parse failure is fatal.
pub(crate) async fn run_video_loop<R>(
    mut reader: R,
    tx: mpsc::Sender<VideoPacket>,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
{
    let mut demux = Demuxer::new();

    loop {
        let mut header_buf = [0u8; FRAME_HEADER_SIZE];
        if !read_exact_or_close(&mut reader, &mut header_buf, "frame header").await? {
            info!("video channel closed by server");
            return Ok(());
        }
        let header = FrameHeader::parse(&header_buf)?;

        let mut payload = vec![0u8; header.payload_len as usize];
        read_remaining(&mut reader, &mut payload, "frame payload").await?;

        if let Some(packet) = demux.push(&header, payload) {
            if tx.send(packet).await.is_err() {
                debug!("video consumer dropped; stopping video loop");
                return Ok(());
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
