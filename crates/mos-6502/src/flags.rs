//! Processor status register (P).
//!
//! N and Z are not kept as bits. The last result that set them is stored
//! instead, and the packed byte is rebuilt whenever it is needed. Every
//! load, logic and arithmetic instruction updates N and Z, so storing the
//! raw result is one move instead of two masked updates.

/// Carry flag - set if operation resulted in carry/borrow.
pub const C: u8 = 0x01;

/// Zero flag - set if result is zero.
pub const Z: u8 = 0x02;

/// Interrupt disable - when set, IRQ interrupts are ignored.
pub const I: u8 = 0x04;

/// Decimal mode - enables BCD arithmetic for ADC/SBC.
pub const D: u8 = 0x08;

/// Break flag - only meaningful in the pushed copy of P.
/// Set when BRK/PHP push status, clear when IRQ/NMI push status.
pub const B: u8 = 0x10;

/// Unused bit - always reads as 1 on the 6502.
pub const U: u8 = 0x20;

/// Overflow flag - set if signed arithmetic overflowed.
pub const V: u8 = 0x40;

/// Negative flag - set if result has bit 7 set.
pub const N: u8 = 0x80;

/// Processor status register.
///
/// `packed` holds every bit except N and Z. `n` is a value whose bit 7 is
/// the N flag; `z` is a value that is zero exactly when Z is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status {
    packed: u8,
    n: u8,
    z: u8,
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

impl Status {
    /// Status with every flag clear (Z clear means a non-zero shadow).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            packed: 0,
            n: 0,
            z: 1,
        }
    }

    /// Unpack a status byte (PLP, RTI, snapshot load).
    #[must_use]
    pub const fn from_byte(value: u8) -> Self {
        Self {
            packed: value & !(N | Z),
            n: value,
            z: if value & Z != 0 { 0 } else { 1 },
        }
    }

    /// Rebuild the status byte from the packed bits and the N/Z shadows.
    ///
    /// No bit is forced; the 6502 register file ORs in U itself.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        let mut value = self.packed | (self.n & N);
        if self.z == 0 {
            value |= Z;
        }
        value
    }

    /// Check if a flag is set.
    #[must_use]
    pub const fn is_set(self, flag: u8) -> bool {
        self.to_byte() & flag != 0
    }

    /// Set a flag.
    pub fn set(&mut self, flag: u8) {
        if flag & N != 0 {
            self.n = N;
        }
        if flag & Z != 0 {
            self.z = 0;
        }
        self.packed |= flag & !(N | Z);
    }

    /// Clear a flag.
    pub fn clear(&mut self, flag: u8) {
        if flag & N != 0 {
            self.n = 0;
        }
        if flag & Z != 0 {
            self.z = 1;
        }
        self.packed &= !flag;
    }

    /// Set or clear a flag based on condition.
    pub fn set_if(&mut self, flag: u8, condition: bool) {
        if condition {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    /// Update N and Z flags based on an 8-bit result.
    pub fn update_nz(&mut self, value: u8) {
        self.n = value;
        self.z = value;
    }

    /// Update N and Z flags based on a 16-bit result.
    pub fn update_nz16(&mut self, value: u16) {
        let high = (value >> 8) as u8;
        self.n = high;
        self.z = (value as u8) | high;
    }
}
