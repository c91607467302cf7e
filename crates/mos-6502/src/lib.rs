//! Cycle-accurate NMOS 6502/6510 core.
//!
//! The same engine drives a computer's main CPU, its disk drive CPUs and
//! co-processors. Each instance is a [`Mos6502`] plus a [`Host`] that owns
//! the bus, the [`CpuContext`] (clock, interrupts, alarms) and the quirk
//! hooks of that machine.

mod alu;
mod config;
mod context;
mod cpu;
pub mod flags;
mod host;
pub mod interrupt;
mod opcodes;
mod opinfo;
mod registers;
mod snapshot;

pub use config::{CpuConfig, Variant};
pub use context::{CpuContext, MONITOR_BREAK, MONITOR_STEP, MONITOR_WATCH};
pub use cpu::Mos6502;
pub use flags::Status;
pub use host::{Host, JamAction, MonitorCheck, TrapDisposition};
pub use interrupt::{InterruptSnapshot, InterruptSource, InterruptStatus};
pub use opcodes::{Access, DOCUMENTED, Mnemonic, Mode, NMOS, Opcode};
pub use opinfo::OpcodeInfo;
pub use registers::Registers;
pub use snapshot::RegisterSnapshot;
