//! Drive CPU snapshot module.
//!
//! Layout: the 6502 register fields, then the catch-up state (`last_clk`,
//! `cycle_accum`, `last_exc_cycles` as dwords), the interrupt block and
//! the 2K of drive RAM.

use emu_core::{SnapshotError, SnapshotReader, SnapshotWriter};
use mos_6502::Mos6502;

use crate::{Drive, DriveIo, RAM_SIZE};

const MAJOR: u8 = 1;
const MINOR: u8 = 1;

impl<I: DriveIo> Drive<I> {
    pub fn write_snapshot(&self, name: &str, w: &mut SnapshotWriter) {
        let ctx = &self.host.ctx;
        let mark = w.begin_module(name, MAJOR, MINOR);
        self.cpu.write_registers(ctx, w);
        w.write_dword(self.last_clk());
        w.write_dword(self.cycle_accum());
        w.write_dword(self.last_exc_cycles());
        ctx.interrupts.write_snapshot(w);
        w.write_bytes(self.host.ram());
        w.end_module(mark);
    }

    /// Read a module written by [`Drive::write_snapshot`].
    ///
    /// Nothing changes unless the whole module parses. After an error the
    /// machine must be reset before it runs again.
    pub fn read_snapshot(&mut self, name: &str, r: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        let (major, minor) = r.open_module(name)?;
        if major != MAJOR {
            log::warn!("{name}: snapshot version {major}.{minor} not supported");
            return Err(SnapshotError::UnsupportedVersion {
                module: name.to_owned(),
                major,
                minor,
            });
        }
        let regs = Mos6502::read_registers(r)?;
        let last_clk = r.read_dword()?;
        let cycle_accum = r.read_dword()?;
        let last_exc_cycles = r.read_dword()?;
        let interrupts = self.host.ctx.interrupts.read_snapshot(r)?;
        let mut ram = vec![0; RAM_SIZE];
        r.read_bytes(&mut ram)?;

        self.cpu.apply_snapshot(&mut self.host.ctx, regs, interrupts);
        self.set_sync_state(last_clk, cycle_accum, last_exc_cycles);
        self.host.ram_mut().copy_from_slice(&ram);
        log::debug!("{name}: drive state restored at clock {}", self.host.ctx.clk);
        Ok(())
    }
}
