//! Hotpoint (point of interest) mission: orbit a fixed center.
//!
//! Setters only change the local [`HotpointSettings`]; they reach the
//! vehicle on the next [`HotpointMission::start`]. The state machine
//! Idle -> Started -> Paused <-> Started -> Stopped is enforced by the
//! vehicle, not here.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use skylark_link::CommandLink;
use skylark_proto::ack::{HotpointReadAck, HotpointStartAck, MissionAck};
use skylark_proto::cmd::mission;
use skylark_proto::hotpoint::{HotpointSettings, View, YawMode, YawRate};
use skylark_proto::telemetry::GlobalPosition;
use skylark_proto::{CommandId, RecvFrame, Wire};
use tracing::{info, warn};

use crate::dispatch::{flag, mission_callback, AckCallback, Dispatcher, PushCallback, RetryClass};
use crate::error::MissionError;
use crate::state::lock;

pub struct HotpointMission {
    dispatch: Dispatcher,
    settings: Mutex<HotpointSettings>,
    push: Mutex<Option<PushCallback>>,
}

impl HotpointMission {
    pub fn new(link: Arc<dyn CommandLink>) -> Self {
        Self {
            dispatch: Dispatcher::new(link),
            settings: Mutex::new(HotpointSettings::default()),
            push: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> HotpointSettings {
        lock(&self.settings).clone()
    }

    /// Replaces all settings at once. The version field is not caller
    /// controlled and is reset to 0.
    pub fn set_settings(&self, mut settings: HotpointSettings) {
        settings.normalize();
        *lock(&self.settings) = settings;
    }

    /// Center in radians, height in meters above takeoff.
    pub fn set_hot_point(&self, latitude: f64, longitude: f64, height: f64) {
        let mut s = lock(&self.settings);
        s.latitude = latitude;
        s.longitude = longitude;
        s.height = height;
    }

    pub fn set_hot_point_from(&self, pos: &GlobalPosition) {
        self.set_hot_point(pos.latitude, pos.longitude, pos.altitude as f64);
    }

    pub fn set_radius(&self, meters: f64) {
        lock(&self.settings).radius = meters;
    }

    pub fn set_yaw_rate(&self, deg_per_s: f32) {
        lock(&self.settings).yaw_rate = deg_per_s;
    }

    pub fn set_clockwise(&self, clockwise: bool) {
        lock(&self.settings).clockwise = clockwise;
    }

    pub fn set_camera_view(&self, view: View) {
        lock(&self.settings).start_point = view;
    }

    pub fn set_yaw_mode(&self, mode: YawMode) {
        lock(&self.settings).yaw_mode = mode;
    }

    fn start_payload(&self) -> Bytes {
        let mut s = lock(&self.settings);
        s.normalize();
        s.to_bytes()
    }

    /// Uploads the current settings and starts orbiting.
    pub fn start(&self, timeout: Duration) -> Result<HotpointStartAck, MissionError> {
        let payload = self.start_payload();
        self.dispatch.call(mission::HOTPOINT_START, payload, RetryClass::Control, timeout)
    }

    pub fn start_async(&self, callback: Option<AckCallback<HotpointStartAck>>) {
        let payload = self.start_payload();
        let cb = callback.unwrap_or_else(|| Box::new(start_callback));
        self.dispatch.post(mission::HOTPOINT_START, payload, RetryClass::Control, cb);
    }

    pub fn stop(&self, timeout: Duration) -> Result<MissionAck, MissionError> {
        self.dispatch.call(mission::HOTPOINT_STOP, flag(0), RetryClass::Control, timeout)
    }

    pub fn stop_async(&self, callback: Option<AckCallback<MissionAck>>) {
        self.control_async(mission::HOTPOINT_STOP, 0, callback);
    }

    pub fn pause(&self, timeout: Duration) -> Result<MissionAck, MissionError> {
        self.dispatch.call(mission::HOTPOINT_SET_PAUSE, flag(0), RetryClass::Control, timeout)
    }

    pub fn pause_async(&self, callback: Option<AckCallback<MissionAck>>) {
        self.control_async(mission::HOTPOINT_SET_PAUSE, 0, callback);
    }

    pub fn resume(&self, timeout: Duration) -> Result<MissionAck, MissionError> {
        self.dispatch.call(mission::HOTPOINT_SET_PAUSE, flag(1), RetryClass::Control, timeout)
    }

    pub fn resume_async(&self, callback: Option<AckCallback<MissionAck>>) {
        self.control_async(mission::HOTPOINT_SET_PAUSE, 1, callback);
    }

    /// Points the nose back according to the configured yaw mode.
    pub fn reset_yaw(&self, timeout: Duration) -> Result<MissionAck, MissionError> {
        self.dispatch.call(mission::HOTPOINT_SET_YAW, flag(0), RetryClass::Control, timeout)
    }

    pub fn reset_yaw_async(&self, callback: Option<AckCallback<MissionAck>>) {
        self.control_async(mission::HOTPOINT_SET_YAW, 0, callback);
    }

    fn control_async(&self, cmd: CommandId, value: u8, callback: Option<AckCallback<MissionAck>>) {
        let cb = callback.unwrap_or_else(|| mission_callback(cmd));
        self.dispatch.post(cmd, flag(value), RetryClass::Control, cb);
    }

    /// Changes the rate of a running orbit. Fire-and-forget; the local
    /// settings follow the new values.
    pub fn update_yaw_rate(&self, yaw_rate: f32, clockwise: bool) -> Result<(), MissionError> {
        {
            let mut s = lock(&self.settings);
            s.yaw_rate = yaw_rate;
            s.clockwise = clockwise;
        }
        let payload = YawRate { yaw_rate, clockwise }.to_bytes();
        self.dispatch.fire(mission::HOTPOINT_YAW_RATE, payload)
    }

    /// Changes the radius of a running orbit. Fire-and-forget; local
    /// settings are left alone.
    pub fn update_radius(&self, meters: f32) -> Result<(), MissionError> {
        self.dispatch.fire(mission::HOTPOINT_RADIUS, meters.to_bytes())
    }

    /// Reads the settings the vehicle is flying.
    pub fn download(&self, timeout: Duration) -> Result<HotpointReadAck, MissionError> {
        self.dispatch.call(mission::HOTPOINT_DOWNLOAD, flag(0), RetryClass::Control, timeout)
    }

    /// The default callback only logs: downloaded values are telemetry and
    /// do not overwrite local configuration.
    pub fn download_async(&self, callback: Option<AckCallback<HotpointReadAck>>) {
        let cb = callback.unwrap_or_else(|| Box::new(download_callback));
        self.dispatch.post(mission::HOTPOINT_DOWNLOAD, flag(0), RetryClass::Control, cb);
    }

    pub fn set_push_callback(&self, callback: PushCallback) {
        *lock(&self.push) = Some(callback);
    }

    /// Forwards a hotpoint status push to the registered callback.
    pub fn dispatch_push(&self, frame: &RecvFrame) {
        let cb = lock(&self.push).clone();
        if let Some(cb) = cb {
            cb(frame);
        }
    }
}

fn start_callback(res: Result<HotpointStartAck, MissionError>) {
    match res {
        Ok(ack) => info!("hotpoint start: ack {}, max radius {:.1}m", ack.code, ack.max_radius),
        Err(e) => warn!("hotpoint start: {}", e),
    }
}

fn download_callback(res: Result<HotpointReadAck, MissionError>) {
    match res {
        Ok(ack) => info!(
            "hotpoint download: ack {}, radius {:.1}m, yaw rate {:.1}deg/s",
            ack.code, ack.settings.radius, ack.settings.yaw_rate
        ),
        Err(e) => warn!("hotpoint download: {}", e),
    }
}
