//! Minimal mirroring client: connect, print stream statistics, inject a
//! tap, and shut down on Ctrl-C.
//!
//! Run with a mirroring server reachable on the default address:
//! ```bash
//! cargo run --package mirror-client --example mirror
//! ```
//! Pass a different `host:port` as the first argument to override it.

use anyhow::Result;
use tracing::info;

use mirror_client::{Session, SessionConfig};
use mirror_core::DeviceEvent;

#[tokio::main]
async fn main() -> Result<()> {
    let config = SessionConfig {
        server_addr: std::env::args()
            .nth(1)
            .unwrap_or_else(|| SessionConfig::default().server_addr),
        ..Default::default()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let (session, info, mut video_rx, mut event_rx) = Session::start(config).await?;
    info!(
        "mirroring {} ({} {}x{})",
        info.device_name,
        info.codec.name(),
        info.resolution.width,
        info.resolution.height
    );

    let controller = session.controller();
    controller
        .tap(
            info.resolution.width as i32 / 2,
            info.resolution.height as i32 / 2,
        )
        .await?;

    let mut packets: u64 = 0;
    let mut bytes: u64 = 0;
    loop {
        tokio::select! {
            packet = video_rx.recv() => {
                let Some(packet) = packet else { break };
                packets += 1;
                bytes += packet.payload.len() as u64;
                if packets % 100 == 0 {
                    info!("{packets} packets, {bytes} bytes, last pts {}", packet.pts);
                }
            }
            event = event_rx.recv() => {
                match event {
                    Some(DeviceEvent::ClipboardChanged { text }) => {
                        info!("device clipboard: {text:?}");
                    }
                    Some(DeviceEvent::UhidOutput { id, payload }) => {
                        info!("uhid output from {id}: {} bytes", payload.len());
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    session.stop().await;
    info!("session stopped after {packets} packets ({bytes} bytes)");
    Ok(())
}
