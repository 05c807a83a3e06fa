use std::fmt;

/// Command set shared by every mission command.
pub const MISSION_SET: u8 = 0x03;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionKind {
    Hotpoint,
    Waypoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId {
    pub set: u8,
    pub id: u8,
}

impl CommandId {
    pub const fn mission(id: u8) -> Self {
        Self { set: MISSION_SET, id }
    }

    pub fn kind(&self) -> Option<MissionKind> {
        if self.set != MISSION_SET {
            return None;
        }
        match self.id {
            0x10..=0x17 => Some(MissionKind::Waypoint),
            0x20..=0x26 => Some(MissionKind::Hotpoint),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        use mission::*;
        match *self {
            WAYPOINT_INIT => "waypoint-init",
            WAYPOINT_ADD_POINT => "waypoint-add-point",
            WAYPOINT_SET_START => "waypoint-set-start",
            WAYPOINT_SET_PAUSE => "waypoint-set-pause",
            WAYPOINT_DOWNLOAD => "waypoint-download",
            WAYPOINT_INDEX_DOWNLOAD => "waypoint-index-download",
            WAYPOINT_SET_VELOCITY => "waypoint-set-velocity",
            WAYPOINT_GET_VELOCITY => "waypoint-get-velocity",
            HOTPOINT_START => "hotpoint-start",
            HOTPOINT_STOP => "hotpoint-stop",
            HOTPOINT_SET_PAUSE => "hotpoint-set-pause",
            HOTPOINT_YAW_RATE => "hotpoint-yaw-rate",
            HOTPOINT_RADIUS => "hotpoint-radius",
            HOTPOINT_SET_YAW => "hotpoint-set-yaw",
            HOTPOINT_DOWNLOAD => "hotpoint-download",
            _ => "unknown",
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X}:0x{:02X})", self.name(), self.set, self.id)
    }
}

pub mod mission {
    use super::CommandId;

    pub const WAYPOINT_INIT: CommandId = CommandId::mission(0x10);
    pub const WAYPOINT_ADD_POINT: CommandId = CommandId::mission(0x11);
    /// Payload 0 starts, 1 stops.
    pub const WAYPOINT_SET_START: CommandId = CommandId::mission(0x12);
    /// Payload 0 pauses, 1 resumes.
    pub const WAYPOINT_SET_PAUSE: CommandId = CommandId::mission(0x13);
    pub const WAYPOINT_DOWNLOAD: CommandId = CommandId::mission(0x14);
    pub const WAYPOINT_INDEX_DOWNLOAD: CommandId = CommandId::mission(0x15);
    pub const WAYPOINT_SET_VELOCITY: CommandId = CommandId::mission(0x16);
    pub const WAYPOINT_GET_VELOCITY: CommandId = CommandId::mission(0x17);

    pub const HOTPOINT_START: CommandId = CommandId::mission(0x20);
    pub const HOTPOINT_STOP: CommandId = CommandId::mission(0x21);
    /// Payload 0 pauses, 1 resumes.
    pub const HOTPOINT_SET_PAUSE: CommandId = CommandId::mission(0x22);
    pub const HOTPOINT_YAW_RATE: CommandId = CommandId::mission(0x23);
    pub const HOTPOINT_RADIUS: CommandId = CommandId::mission(0x24);
    pub const HOTPOINT_SET_YAW: CommandId = CommandId::mission(0x25);
    pub const HOTPOINT_DOWNLOAD: CommandId = CommandId::mission(0x26);
}
