//! mirror-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and embedding applications share the same module tree.
//!
//! # What does mirror-client do?
//!
//! The mirroring server runs on the remote device and exposes two TCP
//! channels: a *video* channel carrying the coded elementary stream of
//! the device screen, and a *control* channel carrying input-injection
//! commands out and device events (clipboard changes, UHID output) back.
//!
//! This crate:
//!
//! 1. Connects both channels and parses the video handshake (device
//!    name, codec, resolution).
//! 2. Runs a read loop per channel, delivering demuxed [`VideoPacket`]s
//!    and [`DeviceEvent`]s on bounded `mpsc` channels.
//! 3. Exposes a [`Controller`] whose methods encode and send injection
//!    commands (text, keycodes, touch, scroll, panel actions).
//! 4. Coordinates shutdown so that [`Session::stop`] is safe to call
//!    from any task, any number of times.
//!
//! [`VideoPacket`]: mirror_core::VideoPacket
//! [`DeviceEvent`]: mirror_core::DeviceEvent
//! [`Controller`]: infrastructure::network::control::Controller
//! [`Session::stop`]: application::session::Session::stop

/// Application layer: session lifecycle coordination.
pub mod application;

/// TOML-backed session configuration.
pub mod config;

/// Infrastructure layer: TCP channels and read loops.
pub mod infrastructure;

pub use application::session::Session;
pub use config::{ConfigError, SessionConfig};
pub use infrastructure::network::control::Controller;
pub use infrastructure::network::SessionError;
