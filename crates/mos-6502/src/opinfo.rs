//! Per-instruction metadata consulted by the interrupt sequencer.

/// Opcode info word.
///
/// Bits 0-7 hold the opcode number of the last executed instruction. The
/// upper bits record how that instruction affects the next interrupt check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpcodeInfo(u32);

const NUMBER: u32 = 0xFF;
const DELAYS_INTERRUPT: u32 = 1 << 8;
const DISABLES_IRQ: u32 = 1 << 9;
const ENABLES_IRQ: u32 = 1 << 10;

impl OpcodeInfo {
    /// Fresh info for `opcode` with no interrupt effects.
    #[must_use]
    pub const fn new(opcode: u8) -> Self {
        Self(opcode as u32)
    }

    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn opcode(self) -> u8 {
        (self.0 & NUMBER) as u8
    }

    /// A taken branch without page crossing: interrupts see one extra
    /// cycle of delay.
    #[must_use]
    pub const fn delays_interrupt(self) -> bool {
        self.0 & DELAYS_INTERRUPT != 0
    }

    /// The instruction moved I from 0 to 1.
    #[must_use]
    pub const fn disables_irq(self) -> bool {
        self.0 & DISABLES_IRQ != 0
    }

    /// The instruction moved I from 1 to 0.
    #[must_use]
    pub const fn enables_irq(self) -> bool {
        self.0 & ENABLES_IRQ != 0
    }

    pub fn set_delays_interrupt(&mut self) {
        self.0 |= DELAYS_INTERRUPT;
    }

    pub fn set_disables_irq(&mut self) {
        self.0 |= DISABLES_IRQ;
    }

    pub fn set_enables_irq(&mut self) {
        self.0 |= ENABLES_IRQ;
    }
}
