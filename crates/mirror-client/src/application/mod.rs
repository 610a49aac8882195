//! Application layer: session lifecycle coordination.

pub mod session;
