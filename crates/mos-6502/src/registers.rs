//! 6502 CPU registers.

use crate::Status;
use crate::flags::{I, U};

/// 6502 CPU register set.
///
/// - A: 8-bit accumulator
/// - X, Y: 8-bit index registers
/// - SP: 8-bit stack pointer (stack is at $0100-$01FF)
/// - PC: 16-bit program counter
/// - P: processor status, N and Z kept as shadows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Registers {
    /// Accumulator.
    pub a: u8,
    /// X index register.
    pub x: u8,
    /// Y index register.
    pub y: u8,
    /// Stack pointer (points to next free location).
    pub sp: u8,
    /// Program counter.
    pub pc: u16,
    /// Processor status flags.
    pub p: Status,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Create registers in reset state.
    ///
    /// A, X and Y are undefined on silicon; we use 0. PC is loaded from the
    /// reset vector by the CPU.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFF,
            pc: 0,
            p: Status::from_byte(I),
        }
    }

    /// Push a value onto the stack, return the address written.
    pub fn push(&mut self) -> u16 {
        let addr = 0x0100 | u16::from(self.sp);
        self.sp = self.sp.wrapping_sub(1);
        addr
    }

    /// Pop a value from the stack, return the address to read.
    pub fn pop(&mut self) -> u16 {
        self.sp = self.sp.wrapping_add(1);
        0x0100 | u16::from(self.sp)
    }

    /// The status byte as the CPU would push it (U always set).
    #[must_use]
    pub const fn status_byte(&self) -> u8 {
        self.p.to_byte() | U
    }
}
