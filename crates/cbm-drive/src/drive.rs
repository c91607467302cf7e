//! The drive CPU and its clock-domain bookkeeping.

use emu_core::{Clock, Observable, SyncFactor, Value};
use mos_6502::{CpuConfig, CpuContext, Mos6502};

use crate::{DriveConfig, DriveError, DriveHost, DriveIo};

/// Main-clock gap after which catch-up gives up and resynchronises
/// instead of running the drive through it.
const MAX_SLEEP: Clock = 0x00FF_FFFF;

/// Drive clock below which a long gap is still run through (the firmware
/// is still initialising).
const BOOT_CYCLES: Clock = 934_639;

/// A drive CPU with its memory and I/O.
pub struct Drive<I: DriveIo> {
    pub cpu: Mos6502,
    pub host: DriveHost<I>,
    sync: SyncFactor,
    /// Main clock reached by the last catch-up.
    last_clk: Clock,
    /// Fractional drive cycles owed, in [`SyncFactor::ONE`] units.
    cycle_accum: u32,
    /// Cycles the last instruction ran past the previous stop clock.
    last_exc_cycles: Clock,
}

impl<I: DriveIo> Drive<I> {
    pub fn new(name: &'static str, config: DriveConfig, io: I) -> Self {
        Self::with_context(CpuContext::new(name), config, io)
    }

    /// Drive using a context built by the caller (e.g. sharing the
    /// machine's watchpoint toggle).
    pub fn with_context(ctx: CpuContext, config: DriveConfig, io: I) -> Self {
        Self {
            cpu: Mos6502::with_config(CpuConfig::drive()),
            host: DriveHost::new(ctx, io, config.idle),
            sync: SyncFactor::from_clocks(config.drive_clock, config.main_clock),
            last_clk: 0,
            cycle_accum: 0,
            last_exc_cycles: 0,
        }
    }

    pub fn load_rom(&mut self, image: &[u8]) -> Result<(), DriveError> {
        self.host.load_rom(image)?;
        self.cpu.invalidate_bank();
        Ok(())
    }

    /// Drive clock.
    #[must_use]
    pub fn clock(&self) -> Clock {
        self.host.ctx.clk
    }

    #[must_use]
    pub fn last_clk(&self) -> Clock {
        self.last_clk
    }

    #[must_use]
    pub fn cycle_accum(&self) -> u32 {
        self.cycle_accum
    }

    #[must_use]
    pub fn last_exc_cycles(&self) -> Clock {
        self.last_exc_cycles
    }

    #[must_use]
    pub fn sync_factor(&self) -> &SyncFactor {
        &self.sync
    }

    /// Change the crystal ratio (e.g. the machine switched video standard).
    pub fn set_clocks(&mut self, config: DriveConfig) {
        self.sync = SyncFactor::from_clocks(config.drive_clock, config.main_clock);
    }

    /// Reset the drive CPU. `main_clk` becomes the catch-up origin.
    pub fn reset(&mut self, main_clk: Clock) {
        self.last_clk = main_clk;
        self.last_exc_cycles = 0;
        self.cpu.reset(&mut self.host);
    }

    /// Run the drive until it has caught up with the main clock.
    ///
    /// Elapsed main cycles are converted in chunks of at most
    /// [`SyncFactor::MAX_TICKS`]; the fraction of each chunk accumulates
    /// until it adds a whole drive cycle. Overshoot of the last instruction
    /// in a chunk is paid back in the next one.
    pub fn catch_up(&mut self, main_clk: Clock) {
        self.wake_up(main_clk);

        let mut cycles = main_clk.saturating_sub(self.last_clk);
        while cycles > 0 {
            let chunk = cycles.min(SyncFactor::MAX_TICKS);
            cycles -= chunk;

            let (whole, fraction) = self.sync.lookup(chunk);
            let mut stop = (self.host.ctx.clk + whole).saturating_sub(self.last_exc_cycles);
            self.cycle_accum += fraction;
            if self.cycle_accum >= SyncFactor::ONE {
                self.cycle_accum -= SyncFactor::ONE;
                stop += 1;
            }
            self.host.stop_clk = stop;

            // The CPU may rebase the clock mid-run; stop_clk moves with it.
            while self.host.ctx.clk < self.host.stop_clk {
                self.cpu.step(&mut self.host);
            }
            self.last_exc_cycles = self.host.ctx.clk - self.host.stop_clk;
        }

        self.last_clk = main_clk;
    }

    fn wake_up(&mut self, main_clk: Clock) {
        if main_clk.saturating_sub(self.last_clk) > MAX_SLEEP && self.host.ctx.clk > BOOT_CYCLES {
            log::debug!("{}: skipping cycles", self.host.ctx.name());
            self.last_clk = main_clk;
        }
    }

    /// The main CPU rebased its clock by `sub`; `main_clk` is its new
    /// value.
    ///
    /// If the drive is behind the rebase point it first catches up to the
    /// old main clock so no elapsed time is lost.
    pub fn main_clock_rebased(&mut self, main_clk: Clock, sub: Clock) {
        if sub == 0 {
            return;
        }
        if self.last_clk < sub {
            self.catch_up(main_clk + sub);
        }
        self.last_clk -= sub;
    }

    pub(crate) fn set_sync_state(&mut self, last_clk: Clock, cycle_accum: u32, last_exc_cycles: Clock) {
        self.last_clk = last_clk;
        self.cycle_accum = cycle_accum;
        self.last_exc_cycles = last_exc_cycles;
    }
}

impl<I: DriveIo> Observable for Drive<I> {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "clock" => Some(self.host.ctx.clk.into()),
            "last_clk" => Some(self.last_clk.into()),
            "cycle_accum" => Some(self.cycle_accum.into()),
            "last_exc_cycles" => Some(self.last_exc_cycles.into()),
            "sync_factor" => Some(self.sync.factor().into()),
            _ => path.strip_prefix("cpu.").and_then(|p| self.cpu.query(p)),
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "clock",
            "last_clk",
            "cycle_accum",
            "last_exc_cycles",
            "sync_factor",
            "cpu.pc",
            "cpu.a",
            "cpu.x",
            "cpu.y",
            "cpu.sp",
            "cpu.p",
            "cpu.flags.c",
            "cpu.flags.z",
            "cpu.flags.i",
            "cpu.flags.d",
            "cpu.flags.b",
            "cpu.flags.v",
            "cpu.flags.n",
            "cpu.opinfo",
            "cpu.halted",
        ]
    }
}
