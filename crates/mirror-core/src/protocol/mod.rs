//! Protocol module containing message types, the binary codec, and the
//! video demultiplexer.

pub mod codec;
pub mod demux;
pub mod messages;

pub use codec::{decode_command, encode_command, parse_handshake, FrameHeader, ProtocolError};
pub use demux::Demuxer;
pub use messages::*;
