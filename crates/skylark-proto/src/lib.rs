//! Wire layouts for the Mission command set.
//!
//! Every record here is a fixed-size little-endian structure. Encoding goes
//! through [`wire::Wire`], decoding checks the buffer length first and never
//! reinterprets memory.

pub mod ack;
pub mod cmd;
pub mod frame;
pub mod hotpoint;
pub mod telemetry;
pub mod waypoint;
pub mod wire;

pub use cmd::{CommandId, MissionKind};
pub use frame::{FrameInfo, RecvFrame, PACKAGE_MIN};
pub use wire::{DecodeError, Wire};
