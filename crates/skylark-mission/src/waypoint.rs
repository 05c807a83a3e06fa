//! Waypoint mission: fly an ordered list of points.
//!
//! Default async callbacks hold their own `Arc` to this mission's state, so
//! any number of independent missions can share one link. Downloads apply
//! to local state only when the vehicle reports success. Concurrent async
//! calls are applied in whatever order their replies land; the last one
//! wins.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use skylark_link::CommandLink;
use skylark_proto::ack::{AckRecord, AddPointAck, MissionAck, VelocityAck, WaypointIndexAck, WaypointInitAck};
use skylark_proto::cmd::mission;
use skylark_proto::waypoint::{WaypointInitSettings, WaypointSettings};
use skylark_proto::{CommandId, RecvFrame, Wire};
use tracing::{info, warn};

use crate::dispatch::{flag, mission_callback, AckCallback, Dispatcher, PushCallback, RetryClass};
use crate::error::MissionError;
use crate::state::{lock, WaypointState};

pub struct WaypointMission {
    dispatch: Dispatcher,
    state: Arc<Mutex<WaypointState>>,
    event_push: Mutex<Option<PushCallback>>,
    status_push: Mutex<Option<PushCallback>>,
}

impl WaypointMission {
    pub fn new(link: Arc<dyn CommandLink>) -> Self {
        Self {
            dispatch: Dispatcher::new(link),
            state: Arc::new(Mutex::new(WaypointState::default())),
            event_push: Mutex::new(None),
            status_push: Mutex::new(None),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> WaypointState {
        lock(&self.state).clone()
    }

    pub fn init_settings(&self) -> WaypointInitSettings {
        lock(&self.state).init().clone()
    }

    pub fn set_init_settings(&self, settings: WaypointInitSettings) {
        lock(&self.state).set_init(settings);
    }

    pub fn point(&self, index: u8) -> Option<WaypointSettings> {
        lock(&self.state).point(index).cloned()
    }

    pub fn last_index(&self) -> Option<WaypointSettings> {
        lock(&self.state).last_index().cloned()
    }

    fn init_payload(&self, settings: Option<WaypointInitSettings>) -> Bytes {
        let mut st = lock(&self.state);
        if let Some(s) = settings {
            st.set_init(s);
        }
        st.init().to_bytes()
    }

    /// Uploads init settings, replacing the local ones first when given.
    pub fn init(&self, settings: Option<WaypointInitSettings>, timeout: Duration) -> Result<MissionAck, MissionError> {
        let payload = self.init_payload(settings);
        self.dispatch.call(mission::WAYPOINT_INIT, payload, RetryClass::Control, timeout)
    }

    pub fn init_async(&self, settings: Option<WaypointInitSettings>, callback: Option<AckCallback<MissionAck>>) {
        let payload = self.init_payload(settings);
        let cb = callback.unwrap_or_else(|| mission_callback(mission::WAYPOINT_INIT));
        self.dispatch.post(mission::WAYPOINT_INIT, payload, RetryClass::Control, cb);
    }

    pub fn start(&self, timeout: Duration) -> Result<MissionAck, MissionError> {
        self.dispatch.call(mission::WAYPOINT_SET_START, flag(0), RetryClass::Control, timeout)
    }

    pub fn start_async(&self, callback: Option<AckCallback<MissionAck>>) {
        self.control_async(mission::WAYPOINT_SET_START, 0, callback);
    }

    pub fn stop(&self, timeout: Duration) -> Result<MissionAck, MissionError> {
        self.dispatch.call(mission::WAYPOINT_SET_START, flag(1), RetryClass::Control, timeout)
    }

    pub fn stop_async(&self, callback: Option<AckCallback<MissionAck>>) {
        self.control_async(mission::WAYPOINT_SET_START, 1, callback);
    }

    pub fn pause(&self, timeout: Duration) -> Result<MissionAck, MissionError> {
        self.dispatch.call(mission::WAYPOINT_SET_PAUSE, flag(0), RetryClass::Control, timeout)
    }

    pub fn pause_async(&self, callback: Option<AckCallback<MissionAck>>) {
        self.control_async(mission::WAYPOINT_SET_PAUSE, 0, callback);
    }

    pub fn resume(&self, timeout: Duration) -> Result<MissionAck, MissionError> {
        self.dispatch.call(mission::WAYPOINT_SET_PAUSE, flag(1), RetryClass::Control, timeout)
    }

    pub fn resume_async(&self, callback: Option<AckCallback<MissionAck>>) {
        self.control_async(mission::WAYPOINT_SET_PAUSE, 1, callback);
    }

    fn control_async(&self, cmd: CommandId, value: u8, callback: Option<AckCallback<MissionAck>>) {
        let cb = callback.unwrap_or_else(|| mission_callback(cmd));
        self.dispatch.post(cmd, flag(value), RetryClass::Control, cb);
    }

    /// Reads the init settings the vehicle holds.
    pub fn download(&self, timeout: Duration) -> Result<WaypointInitAck, MissionError> {
        self.dispatch.call(mission::WAYPOINT_DOWNLOAD, flag(0), RetryClass::Data, timeout)
    }

    /// The default callback copies the downloaded settings into local
    /// state.
    pub fn download_async(&self, callback: Option<AckCallback<WaypointInitAck>>) {
        let cb = callback.unwrap_or_else(|| {
            let state = Arc::clone(&self.state);
            apply_on_success(mission::WAYPOINT_DOWNLOAD, move |ack: WaypointInitAck| {
                let mut st = lock(&state);
                st.set_init(ack.settings);
                info!("waypoint download: index number {}", st.index_number());
            })
        });
        self.dispatch.post(mission::WAYPOINT_DOWNLOAD, flag(0), RetryClass::Data, cb);
    }

    pub fn download_index(&self, index: u8, timeout: Duration) -> Result<WaypointIndexAck, MissionError> {
        self.dispatch.call(mission::WAYPOINT_INDEX_DOWNLOAD, flag(index), RetryClass::Data, timeout)
    }

    /// The default callback stores the entry in [`WaypointState::last_index`],
    /// overwriting whatever the previous download left there. The table is
    /// not touched.
    pub fn download_index_async(&self, index: u8, callback: Option<AckCallback<WaypointIndexAck>>) {
        let cb = callback.unwrap_or_else(|| {
            let state = Arc::clone(&self.state);
            apply_on_success(mission::WAYPOINT_INDEX_DOWNLOAD, move |ack: WaypointIndexAck| {
                info!("waypoint index download: index {}", ack.settings.index);
                lock(&state).set_last_index(ack.settings);
            })
        });
        self.dispatch.post(mission::WAYPOINT_INDEX_DOWNLOAD, flag(index), RetryClass::Data, cb);
    }

    /// Validates the index, stores the entry locally, and returns the stored
    /// copy to transmit. Nothing is stored on a range error.
    fn stage_point(&self, point: WaypointSettings) -> Result<Bytes, MissionError> {
        let stored = lock(&self.state).set_point(point).map_err(|e| {
            warn!("waypoint upload: {}", e);
            e
        })?;
        Ok(stored.to_bytes())
    }

    /// Uploads one entry. Fails before any transmission when `point.index`
    /// is not less than the declared index number.
    pub fn upload_point(&self, point: WaypointSettings, timeout: Duration) -> Result<AddPointAck, MissionError> {
        let payload = self.stage_point(point)?;
        self.dispatch.call(mission::WAYPOINT_ADD_POINT, payload, RetryClass::Data, timeout)
    }

    pub fn upload_point_async(&self, point: WaypointSettings, callback: Option<AckCallback<AddPointAck>>) -> Result<(), MissionError> {
        let payload = self.stage_point(point)?;
        let cb = callback.unwrap_or_else(|| Box::new(upload_point_callback));
        self.dispatch.post(mission::WAYPOINT_ADD_POINT, payload, RetryClass::Data, cb);
        Ok(())
    }

    pub fn read_idle_velocity(&self, timeout: Duration) -> Result<VelocityAck, MissionError> {
        self.dispatch.call(mission::WAYPOINT_GET_VELOCITY, flag(0), RetryClass::Control, timeout)
    }

    /// The default callback writes the reported velocity into local init
    /// settings.
    pub fn read_idle_velocity_async(&self, callback: Option<AckCallback<VelocityAck>>) {
        let cb = callback.unwrap_or_else(|| self.velocity_callback(mission::WAYPOINT_GET_VELOCITY));
        self.dispatch.post(mission::WAYPOINT_GET_VELOCITY, flag(0), RetryClass::Control, cb);
    }

    pub fn update_idle_velocity(&self, meters_per_s: f32, timeout: Duration) -> Result<VelocityAck, MissionError> {
        self.dispatch.call(mission::WAYPOINT_SET_VELOCITY, meters_per_s.to_bytes(), RetryClass::Control, timeout)
    }

    /// The default callback writes the velocity the vehicle confirmed into
    /// local init settings.
    pub fn update_idle_velocity_async(&self, meters_per_s: f32, callback: Option<AckCallback<VelocityAck>>) {
        let cb = callback.unwrap_or_else(|| self.velocity_callback(mission::WAYPOINT_SET_VELOCITY));
        self.dispatch.post(mission::WAYPOINT_SET_VELOCITY, meters_per_s.to_bytes(), RetryClass::Control, cb);
    }

    fn velocity_callback(&self, cmd: CommandId) -> AckCallback<VelocityAck> {
        let state = Arc::clone(&self.state);
        apply_on_success(cmd, move |ack: VelocityAck| {
            lock(&state).set_idle_velocity(ack.idle_velocity);
            info!("current idle velocity: {:.2}m/s", ack.idle_velocity);
        })
    }

    pub fn set_event_callback(&self, callback: PushCallback) {
        *lock(&self.event_push) = Some(callback);
    }

    pub fn set_status_callback(&self, callback: PushCallback) {
        *lock(&self.status_push) = Some(callback);
    }

    /// Forwards a waypoint event push (reached point, finished, ...).
    pub fn dispatch_event(&self, frame: &RecvFrame) {
        let cb = lock(&self.event_push).clone();
        if let Some(cb) = cb {
            cb(frame);
        }
    }

    /// Forwards a waypoint status push.
    pub fn dispatch_status(&self, frame: &RecvFrame) {
        let cb = lock(&self.status_push).clone();
        if let Some(cb) = cb {
            cb(frame);
        }
    }
}

/// Runs `apply` for replies carrying a success code. Error codes have
/// already been logged by the decoder.
fn apply_on_success<T, F>(cmd: CommandId, apply: F) -> AckCallback<T>
where
    T: AckRecord,
    F: FnOnce(T) + Send + 'static,
{
    Box::new(move |res: Result<T, MissionError>| match res {
        Ok(ack) if ack.code().is_success() => apply(ack),
        Ok(ack) => warn!("{}: not applied, ack {}", cmd, ack.code()),
        Err(e) => warn!("{}: {}", cmd, e),
    })
}

fn upload_point_callback(res: Result<AddPointAck, MissionError>) {
    match res {
        Ok(ack) => info!("waypoint upload: index {} ack {}", ack.index, ack.code),
        Err(e) => warn!("waypoint upload: {}", e),
    }
}
