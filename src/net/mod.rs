// Network-facing layer: command decoding, snapshots, fan-out and the
// WebSocket transport

pub mod broadcast;
pub mod command;
pub mod snapshot;
pub mod transport;
