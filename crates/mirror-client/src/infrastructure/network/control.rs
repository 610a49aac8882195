//! Control-channel paths: outbound command injection and the inbound
//! device-event loop.

use std::sync::{Arc, OnceLock};

use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, trace};

use mirror_core::{
    ControlCommand, DeviceEvent, DeviceEventType, KeyEventAction, MotionEventAction, ProtocolError,
    Resolution,
};

use super::{read_exact_or_close, read_remaining, SessionError};

/// Handle for injecting input into the device.
///
/// Cloneable; all clones share the control-channel write half. Touch
/// and scroll commands are silently dropped until the video handshake
/// has published the device resolution, because their wire layout
/// embeds the screen size.
#[derive(Clone)]
pub struct Controller {
    write_half: Arc<Mutex<Option<OwnedWriteHalf>>>,
    resolution: Arc<OnceLock<Resolution>>,
}

impl Controller {
    pub(crate) fn new(
        write_half: Arc<Mutex<Option<OwnedWriteHalf>>>,
        resolution: Arc<OnceLock<Resolution>>,
    ) -> Self {
        Self {
            write_half,
            resolution,
        }
    }

    /// Encodes and sends a command on the control channel.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the session has released
    /// the write half, or [`SessionError::Io`] if the write fails.
    /// Touch and scroll commands before the handshake are a no-op, not
    /// an error.
    pub async fn send(&self, cmd: &ControlCommand) -> Result<(), SessionError> {
        let screen = self.resolution.get().copied();
        let Some(bytes) = mirror_core::encode_command(cmd, screen) else {
            trace!("dropping position command sent before handshake");
            return Ok(());
        };

        let mut guard = self.write_half.lock().await;
        match guard.as_mut() {
            Some(writer) => {
                writer.write_all(&bytes).await?;
                Ok(())
            }
            None => Err(SessionError::Stopped),
        }
    }

    /// Types a UTF-8 string on the device.
    pub async fn inject_text(&self, text: &str) -> Result<(), SessionError> {
        self.send(&ControlCommand::InjectText {
            text: text.to_string(),
        })
        .await
    }

    /// Injects a single keycode event.
    pub async fn inject_keycode(
        &self,
        keycode: u32,
        action: KeyEventAction,
        repeat: u32,
        meta: u32,
    ) -> Result<(), SessionError> {
        self.send(&ControlCommand::InjectKeycode {
            keycode,
            action,
            repeat,
            meta,
        })
        .await
    }

    /// Injects a touch event at device coordinates.
    pub async fn inject_touch(
        &self,
        action: MotionEventAction,
        x: i32,
        y: i32,
        pressure: f32,
        action_button: u32,
        buttons: u32,
    ) -> Result<(), SessionError> {
        self.send(&ControlCommand::InjectTouch {
            action,
            x,
            y,
            pressure,
            action_button,
            buttons,
        })
        .await
    }

    /// Convenience: a full press-and-release tap at `(x, y)`.
    pub async fn tap(&self, x: i32, y: i32) -> Result<(), SessionError> {
        use mirror_core::protocol::messages::buttons;
        self.inject_touch(
            MotionEventAction::Down,
            x,
            y,
            1.0,
            buttons::PRIMARY,
            buttons::PRIMARY,
        )
        .await?;
        self.inject_touch(MotionEventAction::Up, x, y, 0.0, buttons::PRIMARY, 0)
            .await
    }

    /// Injects a scroll event at device coordinates. `hscroll` and
    /// `vscroll` are normalized to `[-1.0, 1.0]`.
    pub async fn inject_scroll(
        &self,
        x: i32,
        y: i32,
        hscroll: f32,
        vscroll: f32,
        buttons: u32,
    ) -> Result<(), SessionError> {
        self.send(&ControlCommand::InjectScroll {
            x,
            y,
            hscroll,
            vscroll,
            buttons,
        })
        .await
    }

    /// Presses BACK, or turns the screen on if it is off.
    pub async fn back_or_screen_on(&self, action: KeyEventAction) -> Result<(), SessionError> {
        self.send(&ControlCommand::BackOrScreenOn { action }).await
    }

    /// Expands the notification panel.
    pub async fn expand_notification_panel(&self) -> Result<(), SessionError> {
        self.send(&ControlCommand::ExpandNotificationPanel).await
    }

    /// Expands the quick-settings panel.
    pub async fn expand_settings_panel(&self) -> Result<(), SessionError> {
        self.send(&ControlCommand::ExpandSettingsPanel).await
    }

    /// Collapses any open panel.
    pub async fn collapse_panels(&self) -> Result<(), SessionError> {
        self.send(&ControlCommand::CollapsePanels).await
    }
}

/// Pumps inbound device events from the control channel.
///
/// Each iteration reads one tag byte and then the tag's fixed layout.
/// Clipboard-ack events are consumed and logged but not surfaced. An
/// unknown tag is fatal: the layouts are tag-specific, so there is no
/// way to resynchronize past an unrecognized event.
///
/// Returns `Ok(())` on a clean close (EOF on an event boundary) or when
/// the receiver is dropped.
pub(crate) async fn run_event_loop<R>(
    mut reader: R,
    tx: mpsc::Sender<DeviceEvent>,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let mut tag = [0u8; 1];
        if !read_exact_or_close(&mut reader, &mut tag, "event tag").await? {
            info!("control channel closed by server");
            return Ok(());
        }
        let event_type = DeviceEventType::try_from(tag[0])
            .map_err(|_| ProtocolError::UnknownEventType(tag[0]))?;

        let event = match event_type {
            DeviceEventType::Clipboard => {
                let mut len_buf = [0u8; 4];
                read_remaining(&mut reader, &mut len_buf, "clipboard length").await?;
                let mut payload = vec![0u8; u32::from_be_bytes(len_buf) as usize];
                read_remaining(&mut reader, &mut payload, "clipboard text").await?;
                let text = String::from_utf8(payload).map_err(|e| {
                    ProtocolError::MalformedPayload(format!("invalid UTF-8 clipboard: {e}"))
                })?;
                DeviceEvent::ClipboardChanged { text }
            }
            DeviceEventType::AckClipboard => {
                let mut seq_buf = [0u8; 8];
                read_remaining(&mut reader, &mut seq_buf, "clipboard ack").await?;
                debug!(
                    sequence = u64::from_be_bytes(seq_buf),
                    "clipboard ack received"
                );
                continue;
            }
            DeviceEventType::UhidOutput => {
                let mut head = [0u8; 4];
                read_remaining(&mut reader, &mut head, "uhid header").await?;
                let id = u16::from_be_bytes([head[0], head[1]]);
                let size = u16::from_be_bytes([head[2], head[3]]);
                let mut payload = vec![0u8; size as usize];
                read_remaining(&mut reader, &mut payload, "uhid payload").await?;
                DeviceEvent::UhidOutput { id, payload }
            }
        };

        if tx.send(event).await.is_err() {
            debug!("event consumer dropped; stopping event loop");
            return Ok(());
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
