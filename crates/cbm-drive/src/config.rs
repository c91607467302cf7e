//! Drive configuration.

use emu_core::MasterClock;

/// How the drive spends the firmware's idle loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IdleMethod {
    /// Run the idle loop instruction by instruction.
    None,
    /// Patch the loop with a trap that skips to the next scheduled event.
    #[default]
    TrapIdle,
}

/// Construction-time drive options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriveConfig {
    /// The drive's own crystal.
    pub drive_clock: MasterClock,
    /// The crystal of the machine the drive is attached to.
    pub main_clock: MasterClock,
    pub idle: IdleMethod,
}

impl Default for DriveConfig {
    /// A 1 MHz drive on a PAL C64.
    fn default() -> Self {
        Self {
            drive_clock: MasterClock::new(1_000_000),
            main_clock: MasterClock::new(985_248),
            idle: IdleMethod::default(),
        }
    }
}

impl DriveConfig {
    /// A 1 MHz drive on an NTSC C64.
    #[must_use]
    pub fn ntsc() -> Self {
        Self {
            main_clock: MasterClock::new(1_022_727),
            ..Self::default()
        }
    }
}
