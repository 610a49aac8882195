//! Integration tests for the session lifecycle against a mock device
//! server.
//!
//! The mock binds a real TCP listener and serves the two channels the
//! way the device does: the first accepted connection is the video
//! channel (handshake, then frames), the second is the control channel
//! (inbound commands, outbound events).

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use mirror_client::{Session, SessionConfig, SessionError};
use mirror_core::{
    decode_command, protocol::codec::{encode_ack_clipboard, encode_event},
    ControlCommand, DeviceEvent, VideoCodec, HANDSHAKE_SIZE,
};

const FOURCC_H264: u32 = 0x6832_3634;

fn handshake_bytes(name: &str, width: u32, height: u32) -> Vec<u8> {
    let mut buf = vec![0u8; HANDSHAKE_SIZE];
    buf[1..1 + name.len()].copy_from_slice(name.as_bytes());
    buf[65..69].copy_from_slice(&FOURCC_H264.to_be_bytes());
    buf[69..73].copy_from_slice(&width.to_be_bytes());
    buf[73..77].copy_from_slice(&height.to_be_bytes());
    buf
}

fn frame_bytes(pts_flags: u64, payload: &[u8]) -> Vec<u8> {
    let mut buf = pts_flags.to_be_bytes().to_vec();
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Accepts the two session connections in server order.
///
/// The handshake must go out on the video connection before the
/// control connection is accepted: the client reads the handshake
/// before it opens the control channel, so an accept-both-first server
/// would wait on a client that is waiting on the server.
async fn accept_session(listener: &TcpListener, handshake: &[u8]) -> (TcpStream, TcpStream) {
    let (mut video, _) = listener.accept().await.expect("accept video");
    video.write_all(handshake).await.expect("write handshake");
    let (control, _) = listener.accept().await.expect("accept control");
    (video, control)
}

fn config_for(listener: &TcpListener) -> SessionConfig {
    SessionConfig {
        server_addr: listener.local_addr().unwrap().to_string(),
        stop_timeout_ms: 500,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_session_delivers_handshake_info_and_spliced_video() {
    // Arrange – mock server sends handshake, a CONFIG frame, a keyframe
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = config_for(&listener);

    let server = tokio::spawn(async move {
        let (mut video, _control) =
            accept_session(&listener, &handshake_bytes("IntegrationPhone", 1080, 2400)).await;
        video
            .write_all(&frame_bytes(1 << 63, &[0x67, 0x68]))
            .await
            .unwrap();
        video
            .write_all(&frame_bytes(7777 | (1 << 62), &[0x65, 0x01]))
            .await
            .unwrap();
        // Keep the sockets open until the client has consumed the frames.
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    // Act
    let (session, info, mut video_rx, _event_rx) =
        Session::start(config).await.expect("session must start");

    // Assert
    assert_eq!(info.device_name, "IntegrationPhone");
    assert_eq!(info.codec, VideoCodec::H264);
    assert_eq!(info.resolution.width, 1080);
    assert_eq!(info.resolution.height, 2400);

    let packet = timeout(Duration::from_secs(1), video_rx.recv())
        .await
        .expect("packet within deadline")
        .expect("channel open");
    assert_eq!(packet.payload, vec![0x67, 0x68, 0x65, 0x01]);
    assert_eq!(packet.pts, 7777);
    assert!(packet.is_keyframe);

    session.stop().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_controller_commands_arrive_decodable_at_server() {
    // Arrange – server records every command it can decode off the wire
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = config_for(&listener);
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<ControlCommand>(16);

    let server = tokio::spawn(async move {
        let (_video, mut control) =
            accept_session(&listener, &handshake_bytes("Pixel", 1080, 2400)).await;

        let mut buf = Vec::new();
        loop {
            let mut chunk = [0u8; 256];
            let n = match control.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
            while let Ok((cmd, consumed)) = decode_command(&buf) {
                buf.drain(..consumed);
                if cmd_tx.send(cmd).await.is_err() {
                    return;
                }
            }
        }
    });

    let (session, _info, _video_rx, _event_rx) =
        Session::start(config).await.expect("session must start");
    let controller = session.controller();

    // Act
    controller.inject_text("hello").await.unwrap();
    controller.tap(540, 1200).await.unwrap();
    controller.collapse_panels().await.unwrap();

    // Assert – text, touch down, touch up, panel command, in order
    let first = timeout(Duration::from_secs(1), cmd_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        first,
        ControlCommand::InjectText {
            text: "hello".to_string()
        }
    );

    let down = timeout(Duration::from_secs(1), cmd_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        down,
        ControlCommand::InjectTouch { x: 540, y: 1200, .. }
    ));

    let up = timeout(Duration::from_secs(1), cmd_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(up, ControlCommand::InjectTouch { .. }));

    let panel = timeout(Duration::from_secs(1), cmd_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(panel, ControlCommand::CollapsePanels);

    session.stop().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_device_events_are_surfaced_except_acks() {
    // Arrange – server sends an ack then a clipboard change
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = config_for(&listener);

    let server = tokio::spawn(async move {
        let (_video, mut control) =
            accept_session(&listener, &handshake_bytes("Pixel", 1080, 2400)).await;
        control.write_all(&encode_ack_clipboard(3)).await.unwrap();
        control
            .write_all(&encode_event(&DeviceEvent::ClipboardChanged {
                text: "from device".to_string(),
            }))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    // Act
    let (session, _info, _video_rx, mut event_rx) =
        Session::start(config).await.expect("session must start");

    // Assert – the ack is swallowed, the clipboard change comes through
    let event = timeout(Duration::from_secs(1), event_rx.recv())
        .await
        .expect("event within deadline")
        .expect("channel open");
    assert_eq!(
        event,
        DeviceEvent::ClipboardChanged {
            text: "from device".to_string()
        }
    );

    session.stop().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_stop_is_idempotent_and_fails_later_sends() {
    // Arrange
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = config_for(&listener);

    let server = tokio::spawn(async move {
        let (_video, _control) =
            accept_session(&listener, &handshake_bytes("Pixel", 1080, 2400)).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let (session, _info, _video_rx, _event_rx) =
        Session::start(config).await.expect("session must start");
    let controller = session.controller();

    // Act – stop twice
    session.stop().await;
    session.stop().await;

    // Assert
    assert!(session.is_stopped());
    let result = controller.inject_text("too late").await;
    assert!(matches!(result, Err(SessionError::Stopped)));

    server.await.unwrap();
}

#[tokio::test]
async fn test_concurrent_stops_from_multiple_tasks() {
    // Arrange
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = config_for(&listener);

    let server = tokio::spawn(async move {
        let (_video, _control) =
            accept_session(&listener, &handshake_bytes("Pixel", 1080, 2400)).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let (session, _info, _video_rx, _event_rx) =
        Session::start(config).await.expect("session must start");
    let session = std::sync::Arc::new(session);

    // Act – race three stops against each other
    let mut stoppers = Vec::new();
    for _ in 0..3 {
        let session = std::sync::Arc::clone(&session);
        stoppers.push(tokio::spawn(async move { session.stop().await }));
    }
    for stopper in stoppers {
        timeout(Duration::from_secs(2), stopper)
            .await
            .expect("stop must not deadlock")
            .unwrap();
    }

    // Assert
    assert!(session.is_stopped());
    server.await.unwrap();
}

#[tokio::test]
async fn test_fatal_event_loop_error_tears_down_session() {
    // Arrange – server sends an unknown event tag, which is an
    // unrecoverable desync for the event loop
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = config_for(&listener);

    let server = tokio::spawn(async move {
        let (_video, mut control) =
            accept_session(&listener, &handshake_bytes("Pixel", 1080, 2400)).await;
        control.write_all(&[0x7F]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let (session, _info, _video_rx, mut event_rx) =
        Session::start(config).await.expect("session must start");
    let controller = session.controller();

    // Act – the event loop dies on the bad tag and closes its channel
    let closed = timeout(Duration::from_secs(1), event_rx.recv())
        .await
        .expect("event channel must close after the fatal tag");
    assert!(closed.is_none());

    // Teardown propagates asynchronously; give it a moment.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !session.is_stopped() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Assert – the whole session is down, not just the event loop
    assert!(session.is_stopped());
    let result = controller.inject_text("after fatal error").await;
    assert!(matches!(result, Err(SessionError::Stopped)));

    session.stop().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_video_channel_connects_before_control() {
    // Arrange – server tags each accepted connection with its order and
    // expects the handshake reader to be the first one
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = config_for(&listener);

    let server = tokio::spawn(async move {
        // Writing the handshake only on the first accepted socket: if
        // the client connected control first, start() would hang on the
        // handshake and the timeout below would fire.
        let (mut first, _) = listener.accept().await.unwrap();
        first
            .write_all(&handshake_bytes("Ordered", 1080, 2400))
            .await
            .unwrap();
        let (_second, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    // Act / Assert
    let (session, info, _video_rx, _event_rx) =
        timeout(Duration::from_secs(2), Session::start(config))
            .await
            .expect("start must not hang")
            .expect("session must start");
    assert_eq!(info.device_name, "Ordered");

    session.stop().await;
    server.await.unwrap();
}
