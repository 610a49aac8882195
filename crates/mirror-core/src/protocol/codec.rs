//! Binary codec for the device-mirroring wire protocol.
//!
//! Three independent layouts share this module:
//!
//! ```text
//! handshake: [reserved:1][device_name:64][codec_fourcc:4][width:4][height:4]
//! video:     [pts_flags:8][payload_len:4][payload:N]
//! control:   [tag:1][per-command fields…]
//! ```
//!
//! All multi-byte integers are big-endian. The 8-byte `pts_flags` word
//! packs a CONFIG flag in bit 63, a KEY_FRAME flag in bit 62, and a
//! 62-bit presentation timestamp in the low bits.

use thiserror::Error;

use crate::protocol::messages::{
    ControlCommand, ControlMessageType, DeviceEvent, DeviceEventType, DeviceInfo, KeyEventAction,
    MotionEventAction, Resolution, VideoCodec, DEVICE_NAME_FIELD_SIZE, FRAME_HEADER_SIZE,
    HANDSHAKE_SIZE, POINTER_ID_MOUSE,
};

/// Errors that can occur while parsing or encoding protocol data.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the layout requires.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The handshake FourCC is not in the supported codec table.
    #[error("unsupported codec id: {0:#010x}")]
    UnsupportedCodec(u32),

    /// The device-name field is not valid UTF-8.
    #[error("invalid UTF-8 in device name: {0}")]
    InvalidDeviceName(#[from] std::str::Utf8Error),

    /// The command tag byte is not a recognized value.
    #[error("unknown control message type: {0:#04x}")]
    UnknownCommandType(u8),

    /// The inbound event tag byte is not a recognized value. The wire
    /// carries no generic length field, so this is an unrecoverable
    /// desynchronization.
    #[error("unknown device event type: {0:#04x}")]
    UnknownEventType(u8),

    /// A field value is out of range or otherwise unparsable.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

// ── Video frame header ────────────────────────────────────────────────────────

/// CONFIG flag: the payload is codec configuration data, not a frame.
pub const FLAG_CONFIG: u64 = 1 << 63;

/// KEY_FRAME flag: the frame is decodable without prior references.
pub const FLAG_KEY_FRAME: u64 = 1 << 62;

/// Mask selecting the 62-bit presentation timestamp.
pub const PTS_MASK: u64 = FLAG_KEY_FRAME - 1;

/// Decoded form of the 12-byte per-frame video header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// 62-bit presentation timestamp.
    pub pts: u64,
    /// The payload is out-of-band configuration data.
    pub is_config: bool,
    /// The payload is a keyframe.
    pub is_keyframe: bool,
    /// Exact number of payload bytes that follow the header.
    pub payload_len: u32,
}

impl FrameHeader {
    /// Parses the 12-byte header from the beginning of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InsufficientData`] if fewer than
    /// [`FRAME_HEADER_SIZE`] bytes are available.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        require_len(bytes, FRAME_HEADER_SIZE)?;
        let pts_flags = read_u64(bytes, 0);
        let payload_len = read_u32(bytes, 8);
        Ok(Self {
            pts: pts_flags & PTS_MASK,
            is_config: pts_flags & FLAG_CONFIG != 0,
            is_keyframe: pts_flags & FLAG_KEY_FRAME != 0,
            payload_len,
        })
    }
}

// ── Handshake ─────────────────────────────────────────────────────────────────

/// Parses the video-channel handshake from the beginning of `bytes`.
///
/// Layout: 1 reserved byte, a 64-byte device-name field truncated at the
/// first NUL, a 4-byte codec FourCC, then width and height as two
/// 4-byte fields.
///
/// # Errors
///
/// - [`ProtocolError::InsufficientData`] if fewer than
///   [`HANDSHAKE_SIZE`] bytes are available.
/// - [`ProtocolError::InvalidDeviceName`] if the name field is not UTF-8.
/// - [`ProtocolError::UnsupportedCodec`] if the FourCC is unknown.
pub fn parse_handshake(bytes: &[u8]) -> Result<DeviceInfo, ProtocolError> {
    require_len(bytes, HANDSHAKE_SIZE)?;

    // bytes[0] is reserved — ignored.
    let name_field = &bytes[1..1 + DEVICE_NAME_FIELD_SIZE];
    let name_end = name_field
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(DEVICE_NAME_FIELD_SIZE);
    let device_name = std::str::from_utf8(&name_field[..name_end])?.to_string();

    let fourcc = read_u32(bytes, 65);
    let codec = VideoCodec::try_from(fourcc).map_err(|_| ProtocolError::UnsupportedCodec(fourcc))?;

    let resolution = Resolution {
        width: read_u32(bytes, 69),
        height: read_u32(bytes, 73),
    };

    Ok(DeviceInfo {
        device_name,
        codec,
        resolution,
    })
}

// ── Fixed-point conversions ───────────────────────────────────────────────────

/// Converts a pressure value to the wire's unsigned 16-bit fixed point.
///
/// Clamps to `[0.0, 1.0]`, scales by 0x10000, then clamps the result to
/// 0xFFFF. The asymmetric scale-then-clamp (multiplier 65536, ceiling
/// 65535) is what the server expects and must not be "fixed".
pub fn float_to_u16fp(value: f32) -> u16 {
    let scaled = (value.clamp(0.0, 1.0) * 65536.0) as u32;
    scaled.min(0xFFFF) as u16
}

/// Inverse of [`float_to_u16fp`]; the saturated value maps back to 1.0.
pub fn u16fp_to_float(value: u16) -> f32 {
    if value == u16::MAX {
        1.0
    } else {
        f32::from(value) / 65536.0
    }
}

/// Converts a scroll value to the wire's signed 16-bit fixed point.
///
/// Clamps to `[-1.0, 1.0]`, scales by 0x8000, then clamps the result to
/// 0x7FFF — the signed counterpart of [`float_to_u16fp`].
pub fn float_to_i16fp(value: f32) -> i16 {
    let scaled = (value.clamp(-1.0, 1.0) * 32768.0) as i32;
    scaled.min(i16::MAX as i32) as i16
}

/// Inverse of [`float_to_i16fp`]; the saturated value maps back to 1.0.
pub fn i16fp_to_float(value: i16) -> f32 {
    if value == i16::MAX {
        1.0
    } else {
        f32::from(value) / 32768.0
    }
}

/// Narrows a screen dimension to its 16-bit wire field, saturating
/// rather than truncating values above 65535.
fn dim_to_u16(dim: u32) -> u16 {
    u16::try_from(dim).unwrap_or(u16::MAX)
}

// ── Outbound command encoding ─────────────────────────────────────────────────

/// Encodes a [`ControlCommand`] into its wire bytes.
///
/// Touch and scroll layouts embed the device screen size, which only
/// becomes known once the handshake has published a [`Resolution`];
/// until then those commands return `None` and the caller must treat
/// the injection as a no-op (zero bytes written, no error). Every other
/// command ignores `screen`.
pub fn encode_command(cmd: &ControlCommand, screen: Option<Resolution>) -> Option<Vec<u8>> {
    let tag = cmd.message_type() as u8;
    match cmd {
        ControlCommand::InjectText { text } => {
            let utf8 = text.as_bytes();
            let mut buf = Vec::with_capacity(5 + utf8.len());
            buf.push(tag);
            buf.extend_from_slice(&(utf8.len() as u32).to_be_bytes());
            buf.extend_from_slice(utf8);
            Some(buf)
        }
        ControlCommand::InjectKeycode {
            keycode,
            action,
            repeat,
            meta,
        } => {
            let mut buf = Vec::with_capacity(14);
            buf.push(tag);
            buf.push(*action as u8);
            buf.extend_from_slice(&keycode.to_be_bytes());
            buf.extend_from_slice(&repeat.to_be_bytes());
            buf.extend_from_slice(&meta.to_be_bytes());
            Some(buf)
        }
        ControlCommand::InjectTouch {
            action,
            x,
            y,
            pressure,
            action_button,
            buttons,
        } => {
            let screen = screen?;
            let mut buf = Vec::with_capacity(32);
            buf.push(tag);
            buf.push(*action as u8);
            buf.extend_from_slice(&POINTER_ID_MOUSE.to_be_bytes());
            buf.extend_from_slice(&x.to_be_bytes());
            buf.extend_from_slice(&y.to_be_bytes());
            buf.extend_from_slice(&dim_to_u16(screen.width).to_be_bytes());
            buf.extend_from_slice(&dim_to_u16(screen.height).to_be_bytes());
            buf.extend_from_slice(&float_to_u16fp(*pressure).to_be_bytes());
            buf.extend_from_slice(&action_button.to_be_bytes());
            buf.extend_from_slice(&buttons.to_be_bytes());
            Some(buf)
        }
        ControlCommand::InjectScroll {
            x,
            y,
            hscroll,
            vscroll,
            buttons,
        } => {
            let screen = screen?;
            let mut buf = Vec::with_capacity(21);
            buf.push(tag);
            buf.extend_from_slice(&x.to_be_bytes());
            buf.extend_from_slice(&y.to_be_bytes());
            buf.extend_from_slice(&dim_to_u16(screen.width).to_be_bytes());
            buf.extend_from_slice(&dim_to_u16(screen.height).to_be_bytes());
            buf.extend_from_slice(&float_to_i16fp(*hscroll).to_be_bytes());
            buf.extend_from_slice(&float_to_i16fp(*vscroll).to_be_bytes());
            buf.extend_from_slice(&buttons.to_be_bytes());
            Some(buf)
        }
        ControlCommand::BackOrScreenOn { action } => Some(vec![tag, *action as u8]),
        ControlCommand::ExpandNotificationPanel
        | ControlCommand::ExpandSettingsPanel
        | ControlCommand::CollapsePanels => Some(vec![tag]),
    }
}

// ── Command decoding ──────────────────────────────────────────────────────────

/// Decodes one [`ControlCommand`] from the beginning of `bytes`.
///
/// This is the server-side view of the control channel; the client uses
/// it for wire-compatibility tests and mock servers. Returns the command
/// and the number of bytes consumed. The screen size embedded in touch
/// and scroll messages is session state, not a command field, and is
/// discarded.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are malformed.
pub fn decode_command(bytes: &[u8]) -> Result<(ControlCommand, usize), ProtocolError> {
    require_len(bytes, 1)?;
    let tag = bytes[0];
    let msg_type =
        ControlMessageType::try_from(tag).map_err(|_| ProtocolError::UnknownCommandType(tag))?;
    let p = &bytes[1..];

    match msg_type {
        ControlMessageType::InjectText => {
            require_len(p, 4)?;
            let len = read_u32(p, 0) as usize;
            require_len(p, 4 + len)?;
            let text = std::str::from_utf8(&p[4..4 + len])
                .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8 text: {e}")))?
                .to_string();
            Ok((ControlCommand::InjectText { text }, 5 + len))
        }
        ControlMessageType::InjectKeycode => {
            require_len(p, 13)?;
            let action = key_action(p[0])?;
            Ok((
                ControlCommand::InjectKeycode {
                    keycode: read_u32(p, 1),
                    action,
                    repeat: read_u32(p, 5),
                    meta: read_u32(p, 9),
                },
                14,
            ))
        }
        ControlMessageType::InjectTouch => {
            require_len(p, 31)?;
            let action = motion_action(p[0])?;
            // pointer id (8), then position; screen width/height at
            // offsets 17 and 19 are discarded.
            Ok((
                ControlCommand::InjectTouch {
                    action,
                    x: read_i32(p, 9),
                    y: read_i32(p, 13),
                    pressure: u16fp_to_float(read_u16(p, 21)),
                    action_button: read_u32(p, 23),
                    buttons: read_u32(p, 27),
                },
                32,
            ))
        }
        ControlMessageType::InjectScroll => {
            require_len(p, 20)?;
            Ok((
                ControlCommand::InjectScroll {
                    x: read_i32(p, 0),
                    y: read_i32(p, 4),
                    hscroll: i16fp_to_float(read_u16(p, 12) as i16),
                    vscroll: i16fp_to_float(read_u16(p, 14) as i16),
                    buttons: read_u32(p, 16),
                },
                21,
            ))
        }
        ControlMessageType::BackOrScreenOn => {
            require_len(p, 1)?;
            let action = key_action(p[0])?;
            Ok((ControlCommand::BackOrScreenOn { action }, 2))
        }
        ControlMessageType::ExpandNotificationPanel => {
            Ok((ControlCommand::ExpandNotificationPanel, 1))
        }
        ControlMessageType::ExpandSettingsPanel => Ok((ControlCommand::ExpandSettingsPanel, 1)),
        ControlMessageType::CollapsePanels => Ok((ControlCommand::CollapsePanels, 1)),
    }
}

// ── Inbound event encoding (mock-server / test aid) ───────────────────────────

/// Encodes a [`DeviceEvent`] the way the device would emit it.
///
/// The session layer never encodes events; this exists so tests and
/// mock device servers can produce byte-exact inbound traffic.
pub fn encode_event(event: &DeviceEvent) -> Vec<u8> {
    match event {
        DeviceEvent::ClipboardChanged { text } => {
            let utf8 = text.as_bytes();
            let mut buf = Vec::with_capacity(5 + utf8.len());
            buf.push(DeviceEventType::Clipboard as u8);
            buf.extend_from_slice(&(utf8.len() as u32).to_be_bytes());
            buf.extend_from_slice(utf8);
            buf
        }
        DeviceEvent::UhidOutput { id, payload } => {
            let mut buf = Vec::with_capacity(5 + payload.len());
            buf.push(DeviceEventType::UhidOutput as u8);
            buf.extend_from_slice(&id.to_be_bytes());
            buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
            buf.extend_from_slice(payload);
            buf
        }
    }
}

/// Encodes an AckClipboard event (tag + fixed 8-byte sequence).
pub fn encode_ack_clipboard(sequence: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    buf.push(DeviceEventType::AckClipboard as u8);
    buf.extend_from_slice(&sequence.to_be_bytes());
    buf
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn require_len(buf: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::InsufficientData {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn key_action(byte: u8) -> Result<KeyEventAction, ProtocolError> {
    KeyEventAction::try_from(byte)
        .map_err(|_| ProtocolError::MalformedPayload(format!("unknown key action: {byte}")))
}

fn motion_action(byte: u8) -> Result<MotionEventAction, ProtocolError> {
    MotionEventAction::try_from(byte)
        .map_err(|_| ProtocolError::MalformedPayload(format!("unknown motion action: {byte}")))
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    read_u32(buf, offset) as i32
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    u64::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
        buf[offset + 4],
        buf[offset + 5],
        buf[offset + 6],
        buf[offset + 7],
    ])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
