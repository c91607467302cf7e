//! Per-instance CPU context: clock, interrupt block, alarms, monitor state.

use emu_core::{AlarmContext, Clock, Observable, PREVENT_OVERFLOW_TICK, Value, WatchToggle};

use crate::interrupt::{InterruptSource, InterruptStatus};

/// Monitor mask: check breakpoints before each instruction.
pub const MONITOR_BREAK: u8 = 1 << 0;
/// Monitor mask: single-step.
pub const MONITOR_STEP: u8 = 1 << 1;
/// Monitor mask: check watchpoints.
pub const MONITOR_WATCH: u8 = 1 << 2;

/// Everything a CPU instance owns besides its register file.
///
/// The host holds this and lends it to the CPU on every step; peripherals
/// reach it through the host to raise interrupts and schedule alarms.
#[derive(Debug, Clone)]
pub struct CpuContext {
    /// Cycle counter.
    pub clk: Clock,
    pub interrupts: InterruptStatus,
    pub alarms: AlarmContext,
    /// Which monitor checks run while the monitor is attached.
    pub monitor_mask: u8,
    /// Rebases subtract a multiple of this so frame-aligned counters stay
    /// aligned.
    pub rebase_base: Clock,
    watch: WatchToggle,
}

impl CpuContext {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self::with_watch(name, WatchToggle::new())
    }

    /// Context sharing a watchpoint toggle with other instances.
    #[must_use]
    pub fn with_watch(name: &'static str, watch: WatchToggle) -> Self {
        Self {
            clk: 0,
            interrupts: InterruptStatus::new(),
            alarms: AlarmContext::new(name),
            monitor_mask: 0,
            rebase_base: 1,
            watch,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.alarms.name()
    }

    #[must_use]
    pub fn watch(&self) -> &WatchToggle {
        &self.watch
    }

    /// Drive an IRQ line at the current clock.
    pub fn set_irq(&mut self, source: InterruptSource, asserted: bool) {
        self.interrupts.set_irq(source, asserted, self.clk);
    }

    /// Drive an NMI line at the current clock.
    pub fn set_nmi(&mut self, source: InterruptSource, asserted: bool) {
        self.interrupts.set_nmi(source, asserted, self.clk);
    }

    /// Take `num` cycles away from the CPU, starting now.
    ///
    /// Used for bus-stealing peripherals (badlines, DMA). The clock jumps
    /// forward; pending interrupts keep their recognition delay.
    pub fn steal_cycles(&mut self, num: Clock) {
        let start = self.clk;
        self.clk += num;
        self.interrupts.note_stolen_cycles(start, num);
    }

    /// Rebase the clock if it is close to wrapping.
    ///
    /// Subtracts the same amount from the clock, every alarm and the
    /// interrupt timestamps, so every distance to "now" is unchanged.
    /// Returns the amount subtracted, or `None` if no rebase was due or
    /// `rebase_base` leaves nothing to subtract.
    pub fn prevent_clock_overflow(&mut self) -> Option<Clock> {
        if self.clk < PREVENT_OVERFLOW_TICK {
            return None;
        }
        let base = self.rebase_base.max(1);
        let sub = (self.clk.saturating_sub(base) / base) * base;
        if sub == 0 {
            return None;
        }
        self.rebase(sub);
        log::debug!("{}: clock rebased by {sub}", self.name());
        Some(sub)
    }

    /// Subtract `sub` from the clock and everything scheduled against it.
    pub fn rebase(&mut self, sub: Clock) {
        self.clk -= sub.min(self.clk);
        self.alarms.rebase(sub);
        self.interrupts.rebase(sub);
    }
}

impl Observable for CpuContext {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "clock" => Some(self.clk.into()),
            "pending" => Some(self.interrupts.pending().into()),
            "irq_clk" => Some(self.interrupts.irq_clk().into()),
            "nmi_clk" => Some(self.interrupts.nmi_clk().into()),
            "next_alarm" => Some(self.alarms.next_pending_clock().into()),
            "watch" => Some(self.watch.is_enabled().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["clock", "pending", "irq_clk", "nmi_clk", "next_alarm", "watch"]
    }
}
