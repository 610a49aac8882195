//! Infrastructure layer: TCP channels and per-channel read loops.

pub mod network;
