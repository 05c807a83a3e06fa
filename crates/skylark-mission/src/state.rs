use std::sync::{Mutex, MutexGuard, PoisonError};

use skylark_proto::waypoint::{WaypointInitSettings, WaypointSettings};
use tracing::debug;

use crate::error::MissionError;

/// Locks mission state, recovering it if a callback panicked while
/// holding the lock.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Configuration and progress record of one waypoint mission.
///
/// The table does not exist until a write happens with a non-zero index
/// number; it is then sized exactly to that number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointState {
    init: WaypointInitSettings,
    table: Option<Vec<WaypointSettings>>,
    last_index: Option<WaypointSettings>,
}

impl WaypointState {
    pub fn init(&self) -> &WaypointInitSettings {
        &self.init
    }

    pub fn index_number(&self) -> u8 {
        self.init.index_number
    }

    /// Replaces the init settings. A different index number discards the
    /// table; the next write allocates one of the new size.
    pub fn set_init(&mut self, mut settings: WaypointInitSettings) {
        settings.normalize();
        let stale = matches!(&self.table, Some(t) if t.len() != settings.index_number as usize);
        if stale {
            debug!(
                "waypoint table discarded: index number {} -> {}",
                self.init.index_number, settings.index_number
            );
            self.table = None;
        }
        self.init = settings;
    }

    pub fn set_idle_velocity(&mut self, v: f32) {
        self.init.idle_velocity = v;
    }

    pub fn check_index(&self, index: u8) -> Result<(), MissionError> {
        if index >= self.init.index_number {
            return Err(MissionError::IndexOutOfRange { index, count: self.init.index_number });
        }
        Ok(())
    }

    /// Stores `point` at `point.index` and returns the stored entry.
    pub fn set_point(&mut self, mut point: WaypointSettings) -> Result<WaypointSettings, MissionError> {
        self.check_index(point.index)?;
        point.normalize();
        let n = self.init.index_number;
        let table = self.table.get_or_insert_with(|| {
            (0..n).map(|index| WaypointSettings { index, ..WaypointSettings::default() }).collect()
        });
        table[point.index as usize] = point.clone();
        Ok(point)
    }

    pub fn point(&self, index: u8) -> Option<&WaypointSettings> {
        self.table.as_ref()?.get(index as usize)
    }

    pub fn table(&self) -> Option<&[WaypointSettings]> {
        self.table.as_deref()
    }

    /// Result of the latest index download. Overwritten by each download.
    pub fn last_index(&self) -> Option<&WaypointSettings> {
        self.last_index.as_ref()
    }

    pub(crate) fn set_last_index(&mut self, point: WaypointSettings) {
        self.last_index = Some(point);
    }
}
