//! CPU variant configuration.

/// Which member of the family, and so which quirks and opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variant {
    /// C64/C128 main CPU: full NMOS opcode set.
    #[default]
    Mos6510,
    /// Disk drive CPU: NMOS opcode set plus the byte-ready (SO pin) quirk.
    Mos6502,
    /// Documented opcodes only; every undocumented encoding jams.
    Documented,
}

/// Construction-time CPU options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuConfig {
    pub variant: Variant,
    /// Chip-dependent constant ORed into A by ANE ($8B).
    pub ane_magic: u8,
    /// Chip-dependent constant ORed into A by LXA ($AB).
    pub lxa_magic: u8,
    /// Offer every BRK to [`Host::rom_trap`](crate::Host::rom_trap).
    pub rom_traps: bool,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Mos6510,
            ane_magic: 0xEE,
            lxa_magic: 0xEE,
            rom_traps: false,
        }
    }
}

impl CpuConfig {
    /// Drive CPU defaults.
    #[must_use]
    pub fn drive() -> Self {
        Self {
            variant: Variant::Mos6502,
            rom_traps: true,
            ..Self::default()
        }
    }
}
