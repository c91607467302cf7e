//! Interrupt status block.
//!
//! Every peripheral that can pull IRQ or NMI registers a source and drives
//! its own line. IRQ is level-triggered: it stays pending while any line is
//! asserted. NMI is edge-triggered: the pending bit latches on the first
//! assertion and is cleared only when the CPU acknowledges it.
//!
//! The block also records when each line went active so the CPU can apply
//! the 6502's two-cycle recognition delay.

use emu_core::{Clock, SnapshotError, SnapshotReader, SnapshotWriter};

use crate::OpcodeInfo;

/// Non-maskable interrupt.
pub const NMI: u8 = 1 << 0;
/// Maskable interrupt.
pub const IRQ: u8 = 1 << 1;
/// Reset request.
pub const RESET: u8 = 1 << 2;
/// Host trap request at the next instruction boundary.
pub const TRAP: u8 = 1 << 3;
/// Debugger attached: run breakpoint/step/watch checks.
pub const MONITOR: u8 = 1 << 4;
/// DMA request (65816 hosts).
pub const DMA: u8 = 1 << 5;

/// Cycles between a line going active and the CPU recognising it.
const INTERRUPT_DELAY: Clock = 2;

/// Handle for one interrupt-capable peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterruptSource(usize);

impl InterruptSource {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Pending-interrupt state shared by a CPU and its peripherals.
#[derive(Debug, Clone, Default)]
pub struct InterruptStatus {
    names: Vec<&'static str>,
    lines: Vec<u8>,
    nirq: u32,
    nnmi: u32,
    irq_clk: Clock,
    nmi_clk: Clock,
    pending: u8,
    trap_token: Option<u32>,
    num_last_stolen_cycles: Clock,
    last_stolen_cycles_clk: Clock,
}

/// Interrupt fields parsed from a snapshot, applied only once the whole
/// CPU module has been read.
#[derive(Debug, Clone)]
pub struct InterruptSnapshot {
    lines: Vec<u8>,
    pending: u8,
    irq_clk: Clock,
    nmi_clk: Clock,
    num_last_stolen_cycles: Clock,
    last_stolen_cycles_clk: Clock,
}

impl InterruptStatus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peripheral that can drive IRQ and/or NMI.
    pub fn register_source(&mut self, name: &'static str) -> InterruptSource {
        self.names.push(name);
        self.lines.push(0);
        InterruptSource(self.lines.len() - 1)
    }

    #[must_use]
    pub fn source_name(&self, source: InterruptSource) -> &'static str {
        self.names[source.0]
    }

    /// Bitmask of pending interrupt kinds.
    #[must_use]
    pub fn pending(&self) -> u8 {
        self.pending
    }

    #[must_use]
    pub fn is_pending(&self, kind: u8) -> bool {
        self.pending & kind != 0
    }

    #[must_use]
    pub fn irq_clk(&self) -> Clock {
        self.irq_clk
    }

    #[must_use]
    pub fn nmi_clk(&self) -> Clock {
        self.nmi_clk
    }

    /// Number of asserted IRQ lines.
    #[must_use]
    pub fn irq_lines(&self) -> u32 {
        self.nirq
    }

    /// Number of asserted NMI lines.
    #[must_use]
    pub fn nmi_lines(&self) -> u32 {
        self.nnmi
    }

    /// Clock at which a line raised now is considered to have gone active.
    fn line_clock(&self, clk: Clock) -> Clock {
        if self.last_stolen_cycles_clk <= clk {
            clk
        } else {
            self.last_stolen_cycles_clk - 1
        }
    }

    /// Drive `source`'s IRQ line at clock `clk`.
    pub fn set_irq(&mut self, source: InterruptSource, asserted: bool, clk: Clock) {
        let line = &mut self.lines[source.0];
        if asserted {
            if *line & IRQ == 0 {
                *line |= IRQ;
                self.nirq += 1;
                self.pending |= IRQ;
                self.irq_clk = self.line_clock(clk);
            }
        } else if *line & IRQ != 0 {
            *line &= !IRQ;
            if self.nirq == 0 {
                log::warn!("IRQ released by {} with no lines active", self.names[source.0]);
                return;
            }
            self.nirq -= 1;
            if self.nirq == 0 {
                self.pending &= !IRQ;
            }
        }
    }

    /// Drive `source`'s NMI line at clock `clk`.
    ///
    /// Only the first assertion while no NMI line is active latches a new
    /// NMI. Releasing the line in the same cycle it was latched cancels it.
    pub fn set_nmi(&mut self, source: InterruptSource, asserted: bool, clk: Clock) {
        let line = self.lines[source.0];
        if asserted {
            if line & NMI == 0 {
                if self.nnmi == 0 && self.pending & NMI == 0 {
                    self.pending |= NMI;
                    self.nmi_clk = self.line_clock(clk);
                }
                self.nnmi += 1;
                self.lines[source.0] |= NMI;
            }
        } else if line & NMI != 0 {
            self.lines[source.0] &= !NMI;
            if self.nnmi == 0 {
                log::warn!("NMI released by {} with no lines active", self.names[source.0]);
                return;
            }
            self.nnmi -= 1;
            if clk == self.nmi_clk {
                self.pending &= !NMI;
            }
        }
    }

    /// NMI serviced; the edge latch is cleared.
    pub fn ack_nmi(&mut self) {
        self.pending &= !NMI;
    }

    pub fn trigger_reset(&mut self) {
        self.pending |= RESET;
    }

    pub fn ack_reset(&mut self) {
        self.pending &= !RESET;
    }

    /// Ask the CPU to call the host trap handler with `token` before the
    /// next instruction.
    pub fn trigger_trap(&mut self, token: u32) {
        self.pending |= TRAP;
        self.trap_token = Some(token);
    }

    /// Acknowledge a trap request, returning its token.
    pub fn take_trap(&mut self) -> Option<u32> {
        self.pending &= !TRAP;
        self.trap_token.take()
    }

    pub fn trigger_dma(&mut self) {
        self.pending |= DMA;
    }

    pub fn ack_dma(&mut self) {
        self.pending &= !DMA;
    }

    pub fn monitor_on(&mut self) {
        self.pending |= MONITOR;
    }

    pub fn monitor_off(&mut self) {
        self.pending &= !MONITOR;
    }

    /// Has the pending NMI been active long enough to be taken at `clk`?
    ///
    /// Does not look at the NMI pending bit itself.
    #[must_use]
    pub fn check_nmi_delay(&self, clk: Clock, last: OpcodeInfo) -> bool {
        let mut nmi_clk = self.nmi_clk.wrapping_add(INTERRUPT_DELAY);
        if last.delays_interrupt() {
            nmi_clk = nmi_clk.wrapping_add(1);
        }
        clk >= nmi_clk
    }

    /// Has the pending IRQ been active long enough to be taken at `clk`?
    ///
    /// An instruction that cleared I holds the IRQ off for one more
    /// instruction.
    #[must_use]
    pub fn check_irq_delay(&self, clk: Clock, last: OpcodeInfo) -> bool {
        let mut irq_clk = self.irq_clk.wrapping_add(INTERRUPT_DELAY);
        if last.delays_interrupt() {
            irq_clk = irq_clk.wrapping_add(1);
        }
        clk >= irq_clk && !last.enables_irq()
    }

    /// Record `num` cycles stolen from the CPU starting at `start`.
    ///
    /// Line clocks move with the stolen window so an interrupt raised just
    /// before it is still recognised with the right delay afterwards.
    pub fn note_stolen_cycles(&mut self, start: Clock, num: Clock) {
        if num == 0 {
            return;
        }
        if start == self.last_stolen_cycles_clk {
            self.num_last_stolen_cycles += num;
        } else {
            self.num_last_stolen_cycles = num;
        }
        self.last_stolen_cycles_clk = start + num;
        self.irq_clk = self.irq_clk.wrapping_add(num - 1);
        self.nmi_clk = self.nmi_clk.wrapping_add(num - 1);
    }

    /// Clear every request and line for a CPU reset.
    ///
    /// An attached monitor stays attached.
    pub fn reinit(&mut self) {
        self.pending &= MONITOR;
        self.lines.iter_mut().for_each(|line| *line = 0);
        self.nirq = 0;
        self.nnmi = 0;
        self.irq_clk = 0;
        self.nmi_clk = 0;
        self.trap_token = None;
        self.num_last_stolen_cycles = 0;
        self.last_stolen_cycles_clk = 0;
    }

    /// Shift stored clocks down by `sub` along with the owning clock.
    pub fn rebase(&mut self, sub: Clock) {
        self.irq_clk = self.irq_clk.saturating_sub(sub);
        self.nmi_clk = self.nmi_clk.saturating_sub(sub);
        self.last_stolen_cycles_clk = self.last_stolen_cycles_clk.saturating_sub(sub);
    }

    /// Append the interrupt block to a CPU module.
    ///
    /// Traps and the monitor flag are session state and are not saved.
    pub fn write_snapshot(&self, w: &mut SnapshotWriter) {
        w.write_byte(self.pending & (NMI | IRQ | RESET | DMA));
        w.write_dword(self.irq_clk);
        w.write_dword(self.nmi_clk);
        w.write_dword(self.num_last_stolen_cycles);
        w.write_dword(self.last_stolen_cycles_clk);
        w.write_dword(self.lines.len() as u32);
        w.write_bytes(&self.lines);
    }

    /// Parse an interrupt block without touching `self`.
    pub fn read_snapshot(&self, r: &mut SnapshotReader<'_>) -> Result<InterruptSnapshot, SnapshotError> {
        let pending = r.read_byte()?;
        if pending & !(NMI | IRQ | RESET | DMA) != 0 {
            return Err(SnapshotError::InvalidValue {
                field: "pending interrupts",
                value: pending.into(),
            });
        }
        let irq_clk = r.read_dword()?;
        let nmi_clk = r.read_dword()?;
        let num_last_stolen_cycles = r.read_dword()?;
        let last_stolen_cycles_clk = r.read_dword()?;
        let count = r.read_dword()?;
        if count as usize != self.lines.len() {
            return Err(SnapshotError::InvalidValue {
                field: "interrupt source count",
                value: count,
            });
        }
        let mut lines = vec![0; self.lines.len()];
        r.read_bytes(&mut lines)?;
        if let Some(&bad) = lines.iter().find(|&&line| line & !(NMI | IRQ) != 0) {
            return Err(SnapshotError::InvalidValue {
                field: "interrupt line",
                value: bad.into(),
            });
        }
        Ok(InterruptSnapshot {
            lines,
            pending,
            irq_clk,
            nmi_clk,
            num_last_stolen_cycles,
            last_stolen_cycles_clk,
        })
    }

    /// Install a parsed interrupt block.
    pub fn apply_snapshot(&mut self, snap: InterruptSnapshot) {
        self.nirq = snap.lines.iter().filter(|&&l| l & IRQ != 0).count() as u32;
        self.nnmi = snap.lines.iter().filter(|&&l| l & NMI != 0).count() as u32;
        self.lines = snap.lines;
        let irq = if self.nirq > 0 { IRQ } else { 0 };
        self.pending = (self.pending & MONITOR) | (snap.pending & (NMI | RESET | DMA)) | irq;
        self.irq_clk = snap.irq_clk;
        self.nmi_clk = snap.nmi_clk;
        self.num_last_stolen_cycles = snap.num_last_stolen_cycles;
        self.last_stolen_cycles_clk = snap.last_stolen_cycles_clk;
        self.trap_token = None;
    }
}
