//! Core traits and types for cycle-accurate 6502-family emulation.
//!
//! Every CPU instance counts its own clock. Peripherals schedule work on
//! that clock through an alarm context instead of being polled per cycle.

mod alarm;
mod bus;
mod clock;
mod cpu;
mod observable;
mod snapshot;
mod watch;

pub use alarm::{AlarmContext, AlarmId};
pub use bus::{BankWindow, Bus, SimpleBus};
pub use clock::{CLOCK_MAX, Clock, MasterClock, PREVENT_OVERFLOW_TICK, SyncFactor};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use snapshot::{ModuleMark, SnapshotError, SnapshotReader, SnapshotWriter};
pub use watch::WatchToggle;
