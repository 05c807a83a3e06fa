use std::sync::Arc;
use std::time::Duration;

use skylark_link::CommandLink;
use skylark_proto::ack::MissionAck;
use skylark_proto::waypoint::{WaypointInitSettings, WaypointSettings};
use skylark_proto::RecvFrame;
use tracing::info;

use crate::error::MissionError;
use crate::hotpoint::HotpointMission;
use crate::waypoint::WaypointMission;

/// Unsolicited frame classes the vehicle pushes to the mission layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    HotpointStatus,
    WaypointEvent,
    WaypointStatus,
}

/// Owns the link and one mission of each kind.
pub struct MissionManager {
    link: Arc<dyn CommandLink>,
    hotpoint: Arc<HotpointMission>,
    waypoint: Arc<WaypointMission>,
}

impl MissionManager {
    pub fn new(link: Arc<dyn CommandLink>) -> Self {
        Self {
            hotpoint: Arc::new(HotpointMission::new(Arc::clone(&link))),
            waypoint: Arc::new(WaypointMission::new(Arc::clone(&link))),
            link,
        }
    }

    pub fn hotpoint(&self) -> &Arc<HotpointMission> {
        &self.hotpoint
    }

    pub fn waypoint(&self) -> &Arc<WaypointMission> {
        &self.waypoint
    }

    /// An extra waypoint mission on the same link, with its own state.
    pub fn new_waypoint(&self) -> WaypointMission {
        WaypointMission::new(Arc::clone(&self.link))
    }

    /// Hands a push frame from the link's demultiplexer to the owning
    /// mission's callback.
    pub fn route_push(&self, kind: Push, frame: &RecvFrame) {
        match kind {
            Push::HotpointStatus => self.hotpoint.dispatch_push(frame),
            Push::WaypointEvent => self.waypoint.dispatch_event(frame),
            Push::WaypointStatus => self.waypoint.dispatch_status(frame),
        }
    }

    /// Init followed by one upload per point, stopping at the first
    /// failure. Returns the code of the last exchange.
    pub fn upload_waypoints(
        &self,
        init: WaypointInitSettings,
        points: &[WaypointSettings],
        timeout: Duration,
    ) -> Result<MissionAck, MissionError> {
        let wp = &self.waypoint;
        let code = wp.init(Some(init), timeout)?;
        if !code.is_success() {
            return Ok(code);
        }
        for p in points {
            let ack = wp.upload_point(p.clone(), timeout)?;
            if !ack.code.is_success() {
                return Ok(ack.code);
            }
        }
        info!("waypoint mission uploaded: {} point(s)", points.len());
        Ok(MissionAck::SUCCESS)
    }
}
