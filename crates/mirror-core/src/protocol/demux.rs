//! Video-stream demultiplexer.
//!
//! The server sends codec configuration (SPS/PPS for H.264, the
//! equivalent for HEVC/AV1) as dedicated CONFIG frames carrying no
//! presentation timestamp. Decoders expect that data prepended to the
//! next coded frame, so the demuxer buffers the most recent CONFIG
//! payload and splices it in front of the next real frame it sees.

use tracing::trace;

use crate::protocol::codec::FrameHeader;
use crate::protocol::messages::VideoPacket;

/// Stateful splicer turning raw `(header, payload)` frames into
/// decodable [`VideoPacket`]s.
///
/// Feed every frame read from the video channel through [`push`] in
/// arrival order. CONFIG frames produce no packet; they are held until
/// a real frame arrives, then emitted as a single combined payload.
///
/// [`push`]: Demuxer::push
#[derive(Debug, Default)]
pub struct Demuxer {
    pending_config: Option<Vec<u8>>,
}

impl Demuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one frame from the stream.
    ///
    /// Returns `None` for CONFIG frames (the payload is stored; a
    /// second CONFIG before any real frame replaces the first). For a
    /// real frame, returns a packet whose payload is the pending
    /// configuration (if any) followed by the frame payload, with the
    /// pts and keyframe flag taken from this frame's header.
    pub fn push(&mut self, header: &FrameHeader, payload: Vec<u8>) -> Option<VideoPacket> {
        if header.is_config {
            if self.pending_config.is_some() {
                trace!(len = payload.len(), "replacing pending config frame");
            } else {
                trace!(len = payload.len(), "storing config frame");
            }
            self.pending_config = Some(payload);
            return None;
        }

        let payload = match self.pending_config.take() {
            Some(mut config) => {
                trace!(
                    config_len = config.len(),
                    frame_len = payload.len(),
                    "splicing config into frame"
                );
                config.extend_from_slice(&payload);
                config
            }
            None => payload,
        };

        Some(VideoPacket {
            payload,
            pts: header.pts,
            is_keyframe: header.is_keyframe,
        })
    }

    /// True if a CONFIG payload is buffered awaiting the next frame.
    pub fn has_pending_config(&self) -> bool {
        self.pending_config.is_some()
    }
}
