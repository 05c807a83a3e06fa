//! Mock of the remote mission controller.
//!
//! Plugs into [`SimLink`](skylark_link::sim::SimLink) as its responder and
//! answers every mission command with a well-formed ACK record. Clones
//! share one [`Remote`], so a test can keep a handle and inspect what the
//! vehicle received.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use skylark_link::sim::Responder;
use skylark_proto::ack::{
    AddPointAck, HotpointReadAck, HotpointStartAck, MissionAck, VelocityAck, WaypointIndexAck, WaypointInitAck,
};
use skylark_proto::cmd::mission;
use skylark_proto::hotpoint::{HotpointSettings, YawRate};
use skylark_proto::waypoint::{WaypointInitSettings, WaypointSettings};
use skylark_proto::{CommandId, DecodeError, Wire};
use tracing::debug;

use crate::state::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone)]
pub struct Remote {
    pub hotpoint: Option<HotpointSettings>,
    pub hotpoint_phase: Phase,
    pub max_radius: f32,
    pub last_yaw_rate: Option<YawRate>,
    pub last_radius: Option<f32>,

    pub init: Option<WaypointInitSettings>,
    pub points: Vec<Option<WaypointSettings>>,
    pub waypoint_phase: Phase,

    /// Answer every command with this code and change nothing.
    pub fail_with: Option<MissionAck>,
    /// Answer with an oversized body that fails the ACK length rule.
    pub malformed: bool,
    /// Stay silent.
    pub mute: bool,
    pub received: Vec<CommandId>,
}

impl Default for Remote {
    fn default() -> Self {
        Self {
            hotpoint: None,
            hotpoint_phase: Phase::Idle,
            max_radius: 500.0,
            last_yaw_rate: None,
            last_radius: None,
            init: None,
            points: Vec::new(),
            waypoint_phase: Phase::Idle,
            fail_with: None,
            malformed: false,
            mute: false,
            received: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockController {
    remote: Arc<Mutex<Remote>>,
}

impl MockController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remote(&self) -> Remote {
        lock(&self.remote).clone()
    }

    pub fn configure(&self, f: impl FnOnce(&mut Remote)) {
        f(&mut lock(&self.remote));
    }

    /// Number of times `cmd` reached the vehicle.
    pub fn count(&self, cmd: CommandId) -> usize {
        lock(&self.remote).received.iter().filter(|c| **c == cmd).count()
    }
}

impl Responder for MockController {
    fn respond(&mut self, cmd: CommandId, payload: &[u8]) -> Option<Bytes> {
        let mut r = lock(&self.remote);
        r.received.push(cmd);
        if r.mute {
            return None;
        }
        if r.malformed {
            return Some(Bytes::from(vec![0u8; 128]));
        }
        let reply = match r.fail_with {
            Some(code) => Ok(failure(cmd, code)),
            None => r.handle(cmd, payload),
        };
        match reply {
            Ok(reply) => reply,
            Err(e) => {
                debug!("mock controller: {} rejected: {}", cmd, e);
                Some(MissionAck::INVALID_PARAMETER.to_bytes())
            }
        }
    }
}

/// An ACK of the right shape for `cmd` carrying `code`.
fn failure(cmd: CommandId, code: MissionAck) -> Option<Bytes> {
    Some(match cmd {
        mission::HOTPOINT_START => HotpointStartAck { code, max_radius: 0.0 }.to_bytes(),
        mission::HOTPOINT_DOWNLOAD => HotpointReadAck { code, settings: HotpointSettings::default() }.to_bytes(),
        mission::WAYPOINT_DOWNLOAD => WaypointInitAck { code, settings: WaypointInitSettings::default() }.to_bytes(),
        mission::WAYPOINT_INDEX_DOWNLOAD => WaypointIndexAck { code, settings: WaypointSettings::default() }.to_bytes(),
        mission::WAYPOINT_ADD_POINT => AddPointAck { code, index: 0 }.to_bytes(),
        mission::WAYPOINT_SET_VELOCITY | mission::WAYPOINT_GET_VELOCITY => {
            VelocityAck { code, idle_velocity: 0.0 }.to_bytes()
        }
        mission::HOTPOINT_YAW_RATE | mission::HOTPOINT_RADIUS => return None,
        _ => code.to_bytes(),
    })
}

impl Remote {
    fn handle(&mut self, cmd: CommandId, payload: &[u8]) -> Result<Option<Bytes>, DecodeError> {
        let flag = payload.first().copied().unwrap_or(0);
        let reply = match cmd {
            mission::HOTPOINT_START => {
                let s = HotpointSettings::decode(payload)?;
                let code = if s.radius < 5.0 || s.radius > self.max_radius as f64 {
                    MissionAck::HOTPOINT_INVALID_RADIUS
                } else if self.hotpoint_phase != Phase::Idle {
                    MissionAck::IN_PROGRESS
                } else {
                    self.hotpoint = Some(s);
                    self.hotpoint_phase = Phase::Running;
                    MissionAck::SUCCESS
                };
                HotpointStartAck { code, max_radius: self.max_radius }.to_bytes()
            }
            mission::HOTPOINT_STOP => {
                self.hotpoint_phase = Phase::Idle;
                MissionAck::SUCCESS.to_bytes()
            }
            mission::HOTPOINT_SET_PAUSE => pause(&mut self.hotpoint_phase, flag).to_bytes(),
            mission::HOTPOINT_SET_YAW => running(self.hotpoint_phase).to_bytes(),
            mission::HOTPOINT_YAW_RATE => {
                let y = YawRate::decode(payload)?;
                if let Some(s) = self.hotpoint.as_mut() {
                    s.yaw_rate = y.yaw_rate;
                    s.clockwise = y.clockwise;
                }
                self.last_yaw_rate = Some(y);
                return Ok(None);
            }
            mission::HOTPOINT_RADIUS => {
                let r = f32::decode(payload)?;
                if let Some(s) = self.hotpoint.as_mut() {
                    s.radius = r as f64;
                }
                self.last_radius = Some(r);
                return Ok(None);
            }
            mission::HOTPOINT_DOWNLOAD => HotpointReadAck {
                code: MissionAck::SUCCESS,
                settings: self.hotpoint.clone().unwrap_or_default(),
            }
            .to_bytes(),

            mission::WAYPOINT_INIT => {
                let s = WaypointInitSettings::decode(payload)?;
                self.points = vec![None; s.index_number as usize];
                self.init = Some(s);
                self.waypoint_phase = Phase::Idle;
                MissionAck::SUCCESS.to_bytes()
            }
            mission::WAYPOINT_ADD_POINT => {
                let p = WaypointSettings::decode(payload)?;
                let index = p.index;
                let code = if self.init.is_none() {
                    MissionAck::NOT_INITIALIZED
                } else if let Some(slot) = self.points.get_mut(index as usize) {
                    *slot = Some(p);
                    MissionAck::SUCCESS
                } else {
                    MissionAck::WRONG_WAYPOINT_INDEX
                };
                AddPointAck { code, index }.to_bytes()
            }
            mission::WAYPOINT_SET_START => {
                let code = if flag == 1 {
                    self.waypoint_phase = Phase::Idle;
                    MissionAck::SUCCESS
                } else if self.init.is_none() {
                    MissionAck::NOT_INITIALIZED
                } else if self.points.iter().any(Option::is_none) {
                    MissionAck(0xEB)
                } else {
                    self.waypoint_phase = Phase::Running;
                    MissionAck::SUCCESS
                };
                code.to_bytes()
            }
            mission::WAYPOINT_SET_PAUSE => pause(&mut self.waypoint_phase, flag).to_bytes(),
            mission::WAYPOINT_DOWNLOAD => WaypointInitAck {
                code: if self.init.is_some() { MissionAck::SUCCESS } else { MissionAck::NOT_INITIALIZED },
                settings: self.init.clone().unwrap_or_default(),
            }
            .to_bytes(),
            mission::WAYPOINT_INDEX_DOWNLOAD => {
                let (code, settings) = match self.points.get(flag as usize) {
                    Some(Some(p)) => (MissionAck::SUCCESS, p.clone()),
                    _ => (MissionAck::WRONG_WAYPOINT_INDEX, WaypointSettings::default()),
                };
                WaypointIndexAck { code, settings }.to_bytes()
            }
            mission::WAYPOINT_SET_VELOCITY => {
                let v = f32::decode(payload)?;
                let (code, idle_velocity) = match self.init.as_mut() {
                    None => (MissionAck::NOT_INITIALIZED, 0.0),
                    Some(init) if v.abs() > init.max_velocity => {
                        (MissionAck::WAYPOINT_INVALID_VELOCITY, init.idle_velocity)
                    }
                    Some(init) => {
                        init.idle_velocity = v;
                        (MissionAck::SUCCESS, v)
                    }
                };
                VelocityAck { code, idle_velocity }.to_bytes()
            }
            mission::WAYPOINT_GET_VELOCITY => match &self.init {
                Some(init) => VelocityAck { code: MissionAck::SUCCESS, idle_velocity: init.idle_velocity },
                None => VelocityAck { code: MissionAck::NOT_INITIALIZED, idle_velocity: 0.0 },
            }
            .to_bytes(),
            _ => MissionAck::INVALID_COMMAND.to_bytes(),
        };
        Ok(Some(reply))
    }
}

/// 0 pauses, 1 resumes. Repeating the current request is accepted.
fn pause(phase: &mut Phase, flag: u8) -> MissionAck {
    match (*phase, flag) {
        (Phase::Idle, _) => MissionAck::NOT_RUNNING,
        (_, 0) => {
            *phase = Phase::Paused;
            MissionAck::SUCCESS
        }
        _ => {
            *phase = Phase::Running;
            MissionAck::SUCCESS
        }
    }
}

fn running(phase: Phase) -> MissionAck {
    if phase == Phase::Idle {
        MissionAck::NOT_RUNNING
    } else {
        MissionAck::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_needs_running_mission() {
        let mut m = MockController::new();
        let reply = m.respond(mission::HOTPOINT_SET_PAUSE, &[0]).unwrap();
        assert_eq!(MissionAck::decode(&reply).unwrap(), MissionAck::NOT_RUNNING);
    }

    #[test]
    fn test_fire_and_forget_gets_no_reply() {
        let mut m = MockController::new();
        assert!(m.respond(mission::HOTPOINT_RADIUS, &20.0f32.to_le_bytes()).is_none());
        assert_eq!(m.remote().last_radius, Some(20.0));
    }

    #[test]
    fn test_garbage_payload_is_invalid_parameter() {
        let mut m = MockController::new();
        let reply = m.respond(mission::WAYPOINT_INIT, &[1, 2]).unwrap();
        assert_eq!(MissionAck::decode(&reply).unwrap(), MissionAck::INVALID_PARAMETER);
    }
}
