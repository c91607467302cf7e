//! 65C816 variant configuration.

/// Which package of the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variant {
    /// 24-bit address bus.
    #[default]
    W65C816,
    /// 65C816 core in a 6502 pinout: bank bytes never reach the bus.
    W65C802,
}

/// Construction-time CPU options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cpu65816Config {
    pub variant: Variant,
    /// Offer every COP to [`Host::rom_trap`](mos_6502::Host::rom_trap).
    pub rom_traps: bool,
}

impl Cpu65816Config {
    /// Mask applied to every address put on the bus.
    #[must_use]
    pub const fn address_mask(&self) -> u32 {
        match self.variant {
            Variant::W65C816 => 0x00FF_FFFF,
            Variant::W65C802 => 0x0000_FFFF,
        }
    }
}
