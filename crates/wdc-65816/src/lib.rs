//! Cycle-accurate WDC 65C816 (and 65C802) core.
//!
//! The engine shares its timing model with [`mos_6502`]: the host owns a
//! [`CpuContext`](mos_6502::CpuContext) with the clock, interrupt block and
//! alarms, and the CPU charges one cycle per bus access. Registers widen to
//! 16 bits in native mode and addresses grow to 24 bits through the bank
//! registers.

mod alu;
mod config;
mod cpu;
mod opcodes;
mod registers;
mod snapshot;

pub use config::{Cpu65816Config, Variant};
pub use cpu::Cpu65816;
pub use opcodes::{Access, Mnemonic, Mode, OPCODES, Opcode};
pub use registers::{M, Registers65816, X};
pub use snapshot::RegisterSnapshot65816;
