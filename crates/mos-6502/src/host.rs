//! The host side of a CPU instance: bus, context and quirk hooks.

use emu_core::{AlarmId, Bus, Clock};

use crate::{CpuContext, Registers};

/// What to do after the CPU fetched a JAM opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JamAction {
    /// Soft-reset the machine.
    Reset,
    /// Power-cycle the machine.
    HardReset,
    /// Stop in the debugger with PC on the JAM opcode.
    OpenMonitor,
    /// Stay jammed; each step burns one cycle.
    BurnOneCycle,
}

/// Result of offering a BRK (or a 65816 COP) to the host's ROM trap table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapDisposition {
    /// No trap at this address: run the normal BRK sequence.
    NotATrap,
    /// The host handled it; registers were imported from the handler.
    Consumed,
    /// Execute `opcode` as if it had been fetched in place of the trap.
    ResumeWithOpcode(u8),
}

/// Which debugger check is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCheck {
    Breakpoint,
    Step,
    Watchpoint,
}

/// A CPU's view of the machine it is plugged into.
///
/// `R` is the register file exported to hooks that may inspect or rewrite
/// it (trap handlers, the monitor, JAM handling).
///
/// Only [`Bus`] and [`Host::context`] are required. Every hook has a
/// default that does what a bare machine would.
pub trait Host<R = Registers>: Bus {
    /// The instance's clock, interrupt block and alarms.
    fn context(&mut self) -> &mut CpuContext;

    /// An alarm came due. `offset` is how many cycles late it is served.
    fn serve_alarm(&mut self, alarm: AlarmId, offset: Clock) {
        let _ = (alarm, offset);
    }

    /// The CPU fetched a JAM opcode at `regs.pc`.
    fn jam(&mut self, opcode: u8, regs: &mut R) -> JamAction {
        let _ = (opcode, regs);
        JamAction::BurnOneCycle
    }

    /// Reset the whole machine after a JAM. The default resets only this
    /// CPU at its next instruction boundary.
    fn machine_reset(&mut self, hard: bool) {
        let _ = hard;
        self.context().interrupts.trigger_reset();
    }

    /// Called from the CPU reset sequence before the reset vector is read.
    fn reset_peripherals(&mut self) {}

    /// Offer a trap opcode at `regs.pc` to the ROM trap table.
    ///
    /// The clock already includes the full seven cycles of the trap
    /// opcode, so a handler that moves the clock sets its final value.
    /// Handlers that return [`TrapDisposition::NotATrap`] or
    /// [`TrapDisposition::ResumeWithOpcode`] must leave the clock alone.
    fn rom_trap(&mut self, regs: &mut R) -> TrapDisposition {
        let _ = regs;
        TrapDisposition::NotATrap
    }

    /// Run the handler of a trap requested with
    /// [`InterruptStatus::trigger_trap`](crate::InterruptStatus::trigger_trap).
    fn run_trap(&mut self, token: u32, regs: &mut R) {
        let _ = (token, regs);
    }

    /// Debugger check before an instruction.
    fn monitor(&mut self, check: MonitorCheck, regs: &mut R) {
        let _ = (check, regs);
    }

    /// Enter the debugger (after a JAM).
    fn open_monitor(&mut self, regs: &mut R) {
        let _ = regs;
    }

    /// A DMA request is pending at this instruction boundary.
    fn dma(&mut self) {
        self.context().interrupts.ack_dma();
    }

    /// Watchpoint check for a load, made before the access.
    fn watch_load(&mut self, addr: u32) {
        let _ = addr;
    }

    /// Watchpoint check for a store, made before the access.
    fn watch_store(&mut self, addr: u32, value: u8) {
        let _ = (addr, value);
    }

    /// Drive byte-ready line (1541 SO pin).
    fn byte_ready(&mut self) -> bool {
        false
    }

    /// Acknowledge byte-ready after V was cleared.
    fn clear_byte_ready(&mut self) {}

    /// The CPU rebased its clock by `sub`; adjust clocks kept outside the
    /// context.
    fn clock_rebased(&mut self, sub: Clock) {
        let _ = sub;
    }
}
