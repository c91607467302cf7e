//! 65C816 CPU registers.

use mos_6502::Status;
use mos_6502::flags::{B, I, U};

/// Index register width select (native mode). Shares bit 4 with B.
pub const X: u8 = 0x10;

/// Accumulator and memory width select (native mode). Shares bit 5 with U.
pub const M: u8 = 0x20;

/// 65C816 register set.
///
/// A is the 16-bit C register; in 8-bit accumulator mode only the low
/// byte takes part and the high byte (B) is preserved. In emulation mode
/// the M and X bits of P are held set, so they read back as U and B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Registers65816 {
    /// Accumulator (C).
    pub a: u16,
    pub x: u16,
    pub y: u16,
    /// Stack pointer. High byte is forced to $01 in emulation mode.
    pub sp: u16,
    /// Direct page register.
    pub d: u16,
    /// Data bank register.
    pub dbr: u8,
    /// Program bank register.
    pub pbr: u8,
    pub pc: u16,
    pub p: Status,
    /// 6502 emulation mode (the hidden E flag).
    pub emulation: bool,
}

impl Default for Registers65816 {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers65816 {
    /// Registers in reset state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0x01FF,
            d: 0,
            dbr: 0,
            pbr: 0,
            pc: 0,
            p: Status::from_byte(M | X | I),
            emulation: true,
        }
    }

    /// 8-bit accumulator and memory.
    #[must_use]
    pub const fn m8(&self) -> bool {
        self.emulation || self.p.is_set(M)
    }

    /// 8-bit index registers.
    #[must_use]
    pub const fn x8(&self) -> bool {
        self.emulation || self.p.is_set(X)
    }

    /// Full 24-bit program counter.
    #[must_use]
    pub const fn pc24(&self) -> u32 {
        ((self.pbr as u32) << 16) | self.pc as u32
    }

    /// The status byte as the CPU holds it.
    #[must_use]
    pub const fn status_byte(&self) -> u8 {
        self.p.to_byte()
    }

    /// Status byte for an IRQ or NMI push: in emulation mode B reads 0.
    #[must_use]
    pub const fn interrupt_status_byte(&self) -> u8 {
        if self.emulation {
            (self.p.to_byte() & !B) | U
        } else {
            self.p.to_byte()
        }
    }

    /// Install a status byte (PLP, RTI, REP, SEP).
    ///
    /// In emulation mode M and X stay set. Switching to 8-bit index
    /// registers clears their high bytes.
    pub fn set_status(&mut self, value: u8) {
        let value = if self.emulation { value | M | X } else { value };
        self.p = Status::from_byte(value);
        if value & X != 0 {
            self.x &= 0x00FF;
            self.y &= 0x00FF;
        }
    }

    /// Push a byte: return the address to write and move SP down.
    pub fn push(&mut self) -> u16 {
        let addr = self.sp;
        self.sp = if self.emulation {
            0x0100 | (self.sp.wrapping_sub(1) & 0x00FF)
        } else {
            self.sp.wrapping_sub(1)
        };
        addr
    }

    /// Pull a byte: move SP up and return the address to read.
    pub fn pull(&mut self) -> u16 {
        self.sp = if self.emulation {
            0x0100 | (self.sp.wrapping_add(1) & 0x00FF)
        } else {
            self.sp.wrapping_add(1)
        };
        self.sp
    }

    /// Load SP, keeping it in page one in emulation mode.
    pub fn set_sp(&mut self, value: u16) {
        self.sp = if self.emulation {
            0x0100 | (value & 0x00FF)
        } else {
            value
        };
    }

    /// Enter 6502 emulation mode (XCE with carry set, reset).
    pub fn enter_emulation(&mut self) {
        self.emulation = true;
        let status = self.p.to_byte();
        self.set_status(status);
        self.sp = 0x0100 | (self.sp & 0x00FF);
    }

    /// Enter native mode. Registers keep their 8-bit widths.
    pub fn enter_native(&mut self) {
        self.emulation = false;
        let status = self.p.to_byte() | M | X;
        self.p = Status::from_byte(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emulation_stack_stays_in_page_one() {
        let mut r = Registers65816::new();
        r.sp = 0x0100;
        assert_eq!(r.push(), 0x0100);
        assert_eq!(r.sp, 0x01FF);
        assert_eq!(r.pull(), 0x0100);
    }

    #[test]
    fn native_stack_is_sixteen_bits() {
        let mut r = Registers65816::new();
        r.enter_native();
        r.sp = 0x0100;
        assert_eq!(r.push(), 0x0100);
        assert_eq!(r.sp, 0x00FF);
    }

    #[test]
    fn status_with_x_set_truncates_index_registers() {
        let mut r = Registers65816::new();
        r.enter_native();
        r.set_status(0);
        r.x = 0x1234;
        r.y = 0xABCD;
        assert!(!r.x8());
        r.set_status(X);
        assert_eq!(r.x, 0x0034);
        assert_eq!(r.y, 0x00CD);
    }

    #[test]
    fn emulation_forces_width_bits() {
        let mut r = Registers65816::new();
        r.enter_native();
        r.set_status(0);
        r.sp = 0x1FF0;
        r.enter_emulation();
        assert!(r.m8() && r.x8());
        assert_eq!(r.sp, 0x01F0);
        assert_eq!(r.interrupt_status_byte() & B, 0);
    }
}
