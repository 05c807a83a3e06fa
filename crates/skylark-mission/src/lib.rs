//! Mission command layer: hotpoint (orbit) and waypoint missions driven over
//! a [`CommandLink`](skylark_link::CommandLink).
//!
//! Every action comes in a blocking form taking a total timeout and a
//! non-blocking `*_async` form taking an optional callback. Callbacks run on
//! the link's processing context; mission state they touch sits behind a
//! per-mission lock.

pub mod ack;
pub mod dispatch;
pub mod doctor;
pub mod error;
pub mod hotpoint;
pub mod manager;
pub mod mock;
pub mod state;
pub mod waypoint;

pub use dispatch::{AckCallback, Dispatcher, PushCallback, RetryClass};
pub use error::MissionError;
pub use hotpoint::HotpointMission;
pub use manager::{MissionManager, Push};
pub use state::WaypointState;
pub use waypoint::WaypointMission;
