//! Criterion benchmarks for the device-mirroring binary codec.
//!
//! Measures encoding latency for every control command and the parsing
//! hot path of the video channel (frame header + demultiplexer), the
//! operations on the session's per-frame and per-input hot paths.
//!
//! Run with:
//! ```bash
//! cargo bench --package mirror-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mirror_core::protocol::messages::buttons;
use mirror_core::{
    decode_command, encode_command, parse_handshake, ControlCommand, Demuxer, FrameHeader,
    KeyEventAction, MotionEventAction, Resolution, HANDSHAKE_SIZE,
};

const SCREEN: Resolution = Resolution {
    width: 1080,
    height: 2400,
};

// ── Command fixtures ──────────────────────────────────────────────────────────

fn make_text() -> ControlCommand {
    ControlCommand::InjectText {
        text: "benchmark input text".to_string(),
    }
}

fn make_keycode() -> ControlCommand {
    ControlCommand::InjectKeycode {
        keycode: 66,
        action: KeyEventAction::Down,
        repeat: 0,
        meta: 0,
    }
}

fn make_touch() -> ControlCommand {
    ControlCommand::InjectTouch {
        action: MotionEventAction::Move,
        x: 540,
        y: 1200,
        pressure: 1.0,
        action_button: buttons::PRIMARY,
        buttons: buttons::PRIMARY,
    }
}

fn make_scroll() -> ControlCommand {
    ControlCommand::InjectScroll {
        x: 540,
        y: 1200,
        hscroll: 0.0,
        vscroll: -1.0,
        buttons: 0,
    }
}

fn make_back() -> ControlCommand {
    ControlCommand::BackOrScreenOn {
        action: KeyEventAction::Down,
    }
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

/// Benchmarks `encode_command` for every command type.
fn bench_encode(c: &mut Criterion) {
    let commands: &[(&str, ControlCommand)] = &[
        ("InjectText", make_text()),
        ("InjectKeycode", make_keycode()),
        ("InjectTouch", make_touch()),
        ("InjectScroll", make_scroll()),
        ("BackOrScreenOn", make_back()),
        ("CollapsePanels", ControlCommand::CollapsePanels),
    ];

    let mut group = c.benchmark_group("encode_command");
    for (name, cmd) in commands {
        group.bench_with_input(BenchmarkId::new("cmd", name), cmd, |b, cmd| {
            b.iter(|| {
                encode_command(black_box(cmd), black_box(Some(SCREEN)))
                    .expect("encode must succeed")
            })
        });
    }
    group.finish();
}

/// Benchmarks `decode_command` from pre-encoded bytes.
fn bench_decode(c: &mut Criterion) {
    let commands: &[(&str, ControlCommand)] = &[
        ("InjectText", make_text()),
        ("InjectKeycode", make_keycode()),
        ("InjectTouch", make_touch()),
        ("InjectScroll", make_scroll()),
    ];

    let mut group = c.benchmark_group("decode_command");
    for (name, cmd) in commands {
        let bytes = encode_command(cmd, Some(SCREEN)).expect("encode must succeed for setup");
        group.bench_with_input(BenchmarkId::new("cmd", name), &bytes, |b, bytes| {
            b.iter(|| decode_command(black_box(bytes)).expect("decode must succeed"))
        });
    }
    group.finish();
}

/// Benchmarks the video-channel parsing hot path: header parse plus
/// demux for a typical frame, with and without a config splice.
fn bench_video_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("video_path");

    let mut handshake = vec![0u8; HANDSHAKE_SIZE];
    handshake[1..6].copy_from_slice(b"bench");
    handshake[65..69].copy_from_slice(&0x6832_3634u32.to_be_bytes());
    handshake[69..73].copy_from_slice(&1080u32.to_be_bytes());
    handshake[73..77].copy_from_slice(&2400u32.to_be_bytes());
    group.bench_function("parse_handshake", |b| {
        b.iter(|| parse_handshake(black_box(&handshake)).expect("handshake must parse"))
    });

    let mut header_bytes = (987_654u64 | (1 << 62)).to_be_bytes().to_vec();
    header_bytes.extend_from_slice(&4096u32.to_be_bytes());
    group.bench_function("parse_frame_header", |b| {
        b.iter(|| FrameHeader::parse(black_box(&header_bytes)).expect("header must parse"))
    });

    let frame_header = FrameHeader::parse(&header_bytes).unwrap();
    let payload = vec![0x65u8; 4096];
    group.bench_function("demux_plain_frame", |b| {
        b.iter(|| {
            let mut demux = Demuxer::new();
            demux.push(black_box(&frame_header), black_box(payload.clone()))
        })
    });

    let config_header = FrameHeader {
        pts: 0,
        is_config: true,
        is_keyframe: false,
        payload_len: 64,
    };
    let config = vec![0x67u8; 64];
    group.bench_function("demux_config_splice", |b| {
        b.iter(|| {
            let mut demux = Demuxer::new();
            demux.push(black_box(&config_header), black_box(config.clone()));
            demux.push(black_box(&frame_header), black_box(payload.clone()))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_video_path);
criterion_main!(benches);
