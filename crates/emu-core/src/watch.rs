//! Global watchpoint switch shared by every CPU instance.

use std::cell::Cell;
use std::rc::Rc;

/// Shared on/off switch for the watchpoint memory path.
///
/// Clones share the same switch. When it is on, every CPU holding a clone
/// reports each load and store to its host's watch hooks before performing
/// the access; flipping it changes the access path for all of them at once.
#[derive(Debug, Clone, Default)]
pub struct WatchToggle(Rc<Cell<bool>>);

impl WatchToggle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_enabled(&self, enabled: bool) {
        if self.0.replace(enabled) != enabled {
            log::debug!("watchpoint access path {}", if enabled { "on" } else { "off" });
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.0.get()
    }
}
