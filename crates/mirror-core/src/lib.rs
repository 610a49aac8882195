//! # mirror-core
//!
//! Shared protocol library for the device-mirroring session: the binary
//! wire format spoken with the remote mirroring server over its two TCP
//! channels.
//!
//! This crate is pure: it has zero dependencies on sockets, OS APIs, or
//! UI frameworks. The session layer in `mirror-client` drives the actual
//! I/O and feeds bytes through the parsers defined here.
//!
//! # Architecture overview
//!
//! A mirroring session uses two independent byte streams to the server
//! process running on the device:
//!
//! - **Video channel** – starts with a one-shot handshake (device name,
//!   codec FourCC, screen resolution), then carries an endless sequence
//!   of `12-byte header + payload` frames of the coded elementary
//!   stream. Codec configuration data arrives as dedicated CONFIG
//!   frames that must be spliced in front of the next real frame.
//!
//! - **Control channel** – carries outbound input-injection commands
//!   (text, keycodes, touch, scroll, panel actions) encoded as compact
//!   big-endian messages, and inbound device events (clipboard changes,
//!   UHID output).
//!
//! This crate defines:
//!
//! - **`protocol::messages`** – the typed message and data structures.
//! - **`protocol::codec`** – handshake/header parsing, command
//!   encoding/decoding, and the fixed-point conversions the wire uses.
//! - **`protocol::demux`** – the configuration-splicing state machine
//!   that turns raw video frames into decodable packets.

pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `mirror_core::ControlCommand` instead of the full module path.
pub use protocol::codec::{
    decode_command, encode_command, parse_handshake, FrameHeader, ProtocolError,
};
pub use protocol::demux::Demuxer;
pub use protocol::messages::{
    ControlCommand, DeviceEvent, DeviceEventType, DeviceInfo, KeyEventAction, MotionEventAction,
    Resolution, VideoCodec, VideoPacket, FRAME_HEADER_SIZE, HANDSHAKE_SIZE, POINTER_ID_MOUSE,
};
