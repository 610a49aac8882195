//! Session lifecycle: channel setup, read-loop supervision, shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info, warn};

use mirror_core::{DeviceEvent, DeviceInfo, Resolution, VideoPacket};

use crate::config::SessionConfig;
use crate::infrastructure::network::control::{run_event_loop, Controller};
use crate::infrastructure::network::video::{read_handshake, run_video_loop};
use crate::infrastructure::network::SessionError;

/// One live mirroring session.
///
/// Created by [`Session::start`], which connects both channels, parses
/// the handshake, and spawns the two read loops. Video packets and
/// device events arrive on the returned `mpsc` receivers; input goes
/// out through the [`Controller`].
pub struct Session {
    controller: Controller,
    write_half: Arc<Mutex<Option<tokio::net::tcp::OwnedWriteHalf>>>,
    stopped: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    stop_timeout: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Connects to the mirroring server and starts the session.
    ///
    /// The video channel is connected first; the server identifies it
    /// by connection order, so this must not be reordered. The device
    /// resolution parsed from the handshake is published to the
    /// controller before the control channel opens, which guarantees a
    /// touch can never observe a session without a resolution.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ConnectFailed`] if either TCP connection
    /// fails, and handshake parse failures as [`SessionError::Protocol`]
    /// or [`SessionError::IncompleteRead`].
    pub async fn start(
        config: SessionConfig,
    ) -> Result<
        (
            Self,
            DeviceInfo,
            mpsc::Receiver<VideoPacket>,
            mpsc::Receiver<DeviceEvent>,
        ),
        SessionError,
    > {
        let mut video_stream = connect(&config.server_addr).await?;
        let device_info = read_handshake(&mut video_stream).await?;

        let resolution: Arc<OnceLock<Resolution>> = Arc::new(OnceLock::new());
        resolution
            .set(device_info.resolution)
            .ok();

        let control_stream = connect(&config.server_addr).await?;
        let (control_read, control_write) = control_stream.into_split();
        let write_half = Arc::new(Mutex::new(Some(control_write)));
        let controller = Controller::new(Arc::clone(&write_half), Arc::clone(&resolution));

        let (video_tx, video_rx) = mpsc::channel(config.video_buffer);
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer);

        // A fatal error on either loop escalates to session-wide
        // shutdown via the watch channel, so the sibling loop does not
        // keep running against a broken session.
        let (shutdown, _) = watch::channel(false);
        let stopped = Arc::new(AtomicBool::new(false));

        // Supervisor: whoever signals shutdown (a fatal loop error or
        // `stop`), the write half must be released and the session
        // marked stopped, so `Controller::send` cannot keep writing
        // into a dead session.
        let supervisor_stopped = Arc::clone(&stopped);
        let supervisor_write_half = Arc::clone(&write_half);
        let mut on_shutdown = shutdown.subscribe();
        let supervisor_task = tokio::spawn(async move {
            if on_shutdown.changed().await.is_ok() {
                supervisor_stopped.store(true, Ordering::SeqCst);
                let mut guard = supervisor_write_half.lock().await;
                *guard = None;
            }
        });

        let escalate = shutdown.clone();
        let mut on_shutdown = shutdown.subscribe();
        let video_task = tokio::spawn(async move {
            tokio::select! {
                result = run_video_loop(video_stream, video_tx) => {
                    if let Err(e) = result {
                        error!("video loop failed: {e}");
                        let _ = escalate.send(true);
                    }
                }
                _ = on_shutdown.changed() => {}
            }
        });

        let escalate = shutdown.clone();
        let mut on_shutdown = shutdown.subscribe();
        let event_task = tokio::spawn(async move {
            tokio::select! {
                result = run_event_loop(control_read, event_tx) => {
                    if let Err(e) = result {
                        error!("event loop failed: {e}");
                        let _ = escalate.send(true);
                    }
                }
                _ = on_shutdown.changed() => {}
            }
        });

        info!(
            server = %config.server_addr,
            device = %device_info.device_name,
            "session started"
        );

        let session = Self {
            controller,
            write_half,
            stopped,
            shutdown,
            stop_timeout: Duration::from_millis(config.stop_timeout_ms),
            tasks: Mutex::new(vec![video_task, event_task, supervisor_task]),
        };
        Ok((session, device_info, video_rx, event_rx))
    }

    /// Returns a handle for injecting input into the device.
    pub fn controller(&self) -> Controller {
        self.controller.clone()
    }

    /// True once the session has been torn down, either by
    /// [`stop`](Session::stop) or by a fatal read-loop error.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Stops the session.
    ///
    /// Idempotent and safe to call from any task: the first call wins,
    /// later calls return immediately. Signals both read loops over the
    /// shutdown channel, releases the control write half (so further
    /// [`Controller`] sends fail with [`SessionError::Stopped`]), then
    /// waits up to the configured stop timeout for the loops to finish
    /// before aborting them.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("stopping session");
        let _ = self.shutdown.send(true);

        {
            let mut guard = self.write_half.lock().await;
            *guard = None;
        }

        let tasks = {
            let mut guard = self.tasks.lock().await;
            std::mem::take(&mut *guard)
        };
        for task in tasks {
            let handle = task.abort_handle();
            if time::timeout(self.stop_timeout, task).await.is_err() {
                warn!("read loop did not wind down in time; aborting");
                handle.abort();
            }
        }
    }
}

async fn connect(addr: &str) -> Result<TcpStream, SessionError> {
    TcpStream::connect(addr)
        .await
        .map_err(|source| SessionError::ConnectFailed {
            addr: addr.to_string(),
            source,
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_fails_fast_on_refused_connection() {
        // Arrange – port 1 refuses connections
        let config = SessionConfig {
            server_addr: "127.0.0.1:1".to_string(),
            ..Default::default()
        };

        // Act
        let result = Session::start(config).await;

        // Assert
        assert!(matches!(
            result,
            Err(SessionError::ConnectFailed { ref addr, .. }) if addr == "127.0.0.1:1"
        ));
    }
}
