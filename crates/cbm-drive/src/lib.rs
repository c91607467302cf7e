//! Disk drive CPU harness.
//!
//! A drive is a [`Mos6502`](mos_6502::Mos6502) in its own clock domain,
//! wired to 2K of RAM, a 16K firmware ROM and the drive's I/O chips. The
//! main machine never runs the drive directly: whenever it touches the
//! serial bus it calls [`Drive::catch_up`] with its own clock, and the
//! drive runs until it has executed the same amount of real time.

mod config;
mod drive;
mod error;
mod memory;
mod snapshot;

pub use config::{DriveConfig, IdleMethod};
pub use drive::Drive;
pub use error::DriveError;
pub use memory::{
    DELAY_DONE, DELAY_TRAP, DriveHost, DriveIo, IDLE_LOOP, IDLE_TRAP, JAM_RESTART, MachineReset,
    RAM_SIZE, ROM_SIZE, Unconnected,
};
