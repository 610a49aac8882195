//! All device-mirroring protocol message types.
//!
//! The wire format is a fixed big-endian binary layout inherited from the
//! remote server process; there is no version byte and no generic framing
//! header, so every message's length is implied by its leading tag byte.

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Total size of the video-channel handshake in bytes:
/// 1 reserved byte + 64-byte device name + 4-byte codec FourCC +
/// 4-byte width + 4-byte height.
pub const HANDSHAKE_SIZE: usize = 77;

/// Size of the fixed NUL-padded device-name field inside the handshake.
pub const DEVICE_NAME_FIELD_SIZE: usize = 64;

/// Size of the per-frame video header: an 8-byte PTS/flags word followed
/// by a 4-byte payload length.
pub const FRAME_HEADER_SIZE: usize = 12;

/// Pointer identifier used for every synthetic mouse-origin touch event:
/// the server's `-1` sentinel reinterpreted as unsigned (all bits set).
pub const POINTER_ID_MOUSE: u64 = u64::MAX;

// ── Handshake types ───────────────────────────────────────────────────────────

/// Screen resolution reported by the device during the handshake.
///
/// Published exactly once per session, then immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Video codec advertised by the device in the handshake FourCC field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum VideoCodec {
    H264 = 0x6832_3634,
    Hevc = 0x6832_3635,
    Av1 = 0x0061_7631,
}

impl TryFrom<u32> for VideoCodec {
    type Error = ();

    fn try_from(fourcc: u32) -> Result<Self, Self::Error> {
        match fourcc {
            0x6832_3634 => Ok(VideoCodec::H264),
            0x6832_3635 => Ok(VideoCodec::Hevc),
            0x0061_7631 => Ok(VideoCodec::Av1),
            _ => Err(()),
        }
    }
}

impl VideoCodec {
    /// The 4-byte code this codec is identified by on the wire.
    pub fn fourcc(&self) -> u32 {
        *self as u32
    }

    /// Canonical lowercase codec name, suitable for decoder lookup.
    pub fn name(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::Hevc => "hevc",
            VideoCodec::Av1 => "av1",
        }
    }
}

/// Device metadata parsed from the video-channel handshake.
///
/// Created once per session at connection start; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Human-readable device name (NUL padding stripped).
    pub device_name: String,
    /// Codec of the elementary stream that follows the handshake.
    pub codec: VideoCodec,
    /// Screen resolution at session start.
    pub resolution: Resolution,
}

// ── Video types ───────────────────────────────────────────────────────────────

/// One demultiplexed, decodable unit of the video elementary stream.
///
/// Handed to the decoder fire-and-forget: the consumer takes sole
/// ownership of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPacket {
    /// Coded bytes, with any pending configuration data already spliced
    /// in front.
    pub payload: Vec<u8>,
    /// 62-bit presentation timestamp from the frame header.
    pub pts: u64,
    /// Whether the frame is decodable without prior reference frames.
    pub is_keyframe: bool,
}

// ── Control message type codes ────────────────────────────────────────────────

/// Tag bytes for outbound control messages, matching the server's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlMessageType {
    InjectKeycode = 0,
    InjectText = 1,
    InjectTouch = 2,
    InjectScroll = 3,
    BackOrScreenOn = 4,
    ExpandNotificationPanel = 5,
    ExpandSettingsPanel = 6,
    CollapsePanels = 7,
}

impl TryFrom<u8> for ControlMessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(ControlMessageType::InjectKeycode),
            1 => Ok(ControlMessageType::InjectText),
            2 => Ok(ControlMessageType::InjectTouch),
            3 => Ok(ControlMessageType::InjectScroll),
            4 => Ok(ControlMessageType::BackOrScreenOn),
            5 => Ok(ControlMessageType::ExpandNotificationPanel),
            6 => Ok(ControlMessageType::ExpandSettingsPanel),
            7 => Ok(ControlMessageType::CollapsePanels),
            _ => Err(()),
        }
    }
}

// ── Input event enums ─────────────────────────────────────────────────────────

/// Key event action byte (Android `AKEY_EVENT_ACTION_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyEventAction {
    Down = 0,
    Up = 1,
}

impl TryFrom<u8> for KeyEventAction {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KeyEventAction::Down),
            1 => Ok(KeyEventAction::Up),
            _ => Err(()),
        }
    }
}

/// Motion event action byte (Android `AMOTION_EVENT_ACTION_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MotionEventAction {
    Down = 0,
    Up = 1,
    Move = 2,
}

impl TryFrom<u8> for MotionEventAction {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MotionEventAction::Down),
            1 => Ok(MotionEventAction::Up),
            2 => Ok(MotionEventAction::Move),
            _ => Err(()),
        }
    }
}

/// Mouse button bitmask values used in [`ControlCommand::InjectTouch`]
/// (Android `AMOTION_EVENT_BUTTON_*`).
pub mod buttons {
    pub const PRIMARY: u32 = 1 << 0;
    pub const SECONDARY: u32 = 1 << 1;
    pub const TERTIARY: u32 = 1 << 2;
}

// ── Outbound commands ─────────────────────────────────────────────────────────

/// All outbound input-injection commands, discriminated by tag byte.
///
/// Commands are constructed per call and consumed immediately by
/// encoding; they are never retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlCommand {
    /// Inject a UTF-8 text string.
    InjectText { text: String },
    /// Inject a single key event with an already-resolved numeric
    /// keycode (key mapping is the caller's concern).
    InjectKeycode {
        keycode: u32,
        action: KeyEventAction,
        repeat: u32,
        meta: u32,
    },
    /// Inject a touch event at an absolute position on the device
    /// screen. `pressure` is in `[0.0, 1.0]` and travels as unsigned
    /// 16-bit fixed point.
    InjectTouch {
        action: MotionEventAction,
        x: i32,
        y: i32,
        pressure: f32,
        action_button: u32,
        buttons: u32,
    },
    /// Inject a scroll event. `hscroll`/`vscroll` are in `[-1.0, 1.0]`
    /// and travel as signed 16-bit fixed point.
    InjectScroll {
        x: i32,
        y: i32,
        hscroll: f32,
        vscroll: f32,
        buttons: u32,
    },
    /// Press BACK, or wake the screen if it is off.
    BackOrScreenOn { action: KeyEventAction },
    /// Pull down the notification panel.
    ExpandNotificationPanel,
    /// Pull down the quick-settings panel.
    ExpandSettingsPanel,
    /// Collapse any open panels.
    CollapsePanels,
}

impl ControlCommand {
    /// Returns the [`ControlMessageType`] tag for this command.
    pub fn message_type(&self) -> ControlMessageType {
        match self {
            ControlCommand::InjectText { .. } => ControlMessageType::InjectText,
            ControlCommand::InjectKeycode { .. } => ControlMessageType::InjectKeycode,
            ControlCommand::InjectTouch { .. } => ControlMessageType::InjectTouch,
            ControlCommand::InjectScroll { .. } => ControlMessageType::InjectScroll,
            ControlCommand::BackOrScreenOn { .. } => ControlMessageType::BackOrScreenOn,
            ControlCommand::ExpandNotificationPanel => ControlMessageType::ExpandNotificationPanel,
            ControlCommand::ExpandSettingsPanel => ControlMessageType::ExpandSettingsPanel,
            ControlCommand::CollapsePanels => ControlMessageType::CollapsePanels,
        }
    }

    /// Whether this command embeds the device screen size and therefore
    /// cannot be encoded before the handshake publishes a [`Resolution`].
    pub fn needs_resolution(&self) -> bool {
        matches!(
            self,
            ControlCommand::InjectTouch { .. } | ControlCommand::InjectScroll { .. }
        )
    }
}

// ── Inbound device events ─────────────────────────────────────────────────────

/// Tag bytes for inbound device events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeviceEventType {
    Clipboard = 0,
    AckClipboard = 1,
    UhidOutput = 2,
}

impl TryFrom<u8> for DeviceEventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DeviceEventType::Clipboard),
            1 => Ok(DeviceEventType::AckClipboard),
            2 => Ok(DeviceEventType::UhidOutput),
            _ => Err(()),
        }
    }
}

/// Device-originated events surfaced to the application.
///
/// `AckClipboard` has a tag on the wire but is consumed by the read loop
/// and never surfaced, so it has no variant here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceEvent {
    /// The device clipboard changed.
    ClipboardChanged { text: String },
    /// Opaque UHID output for the HID-handling collaborator.
    UhidOutput { id: u16, payload: Vec<u8> },
}
