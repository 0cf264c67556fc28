use serde::{Deserialize, Serialize};

use crate::types::Direction;

/// Live application stream counts, split by direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCounters {
    pub playback: u32,
    pub capture: u32,
}

impl StreamCounters {
    pub fn count(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Playback => self.playback,
            Direction::Capture => self.capture,
        }
    }

    pub fn has_streams(&self, direction: Direction) -> bool {
        self.count(direction) > 0
    }

    pub fn stream_added(&mut self, direction: Direction) {
        let slot = self.slot(direction);
        *slot = slot.saturating_add(1);
    }

    /// Removal without a matching add is tolerated; counts never go below zero.
    pub fn stream_removed(&mut self, direction: Direction) {
        let slot = self.slot(direction);
        *slot = slot.saturating_sub(1);
    }

    fn slot(&mut self, direction: Direction) -> &mut u32 {
        match direction {
            Direction::Playback => &mut self.playback,
            Direction::Capture => &mut self.capture,
        }
    }
}
