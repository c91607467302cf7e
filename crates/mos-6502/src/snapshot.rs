//! CPU snapshot module.
//!
//! Layout: clock (dword), A, X, Y, SP (bytes), PC (word), P (byte),
//! opcode info (dword), then the interrupt block.

use emu_core::{Clock, SnapshotError, SnapshotReader, SnapshotWriter};

use crate::interrupt::InterruptSnapshot;
use crate::{CpuContext, Mos6502, OpcodeInfo, Registers, Status};

const MAJOR: u8 = 1;
const MINOR: u8 = 0;

/// Register-file fields parsed from a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RegisterSnapshot {
    pub clk: Clock,
    pub regs: Registers,
    pub opinfo: OpcodeInfo,
}

impl Mos6502 {
    /// Write clock, registers and opcode info.
    pub fn write_registers(&self, ctx: &CpuContext, w: &mut SnapshotWriter) {
        w.write_dword(ctx.clk);
        w.write_byte(self.regs.a);
        w.write_byte(self.regs.x);
        w.write_byte(self.regs.y);
        w.write_byte(self.regs.sp);
        w.write_word(self.regs.pc);
        w.write_byte(self.regs.status_byte());
        w.write_dword(self.opinfo().raw());
    }

    /// Parse the fields written by [`Mos6502::write_registers`].
    pub fn read_registers(r: &mut SnapshotReader<'_>) -> Result<RegisterSnapshot, SnapshotError> {
        let clk = r.read_dword()?;
        let a = r.read_byte()?;
        let x = r.read_byte()?;
        let y = r.read_byte()?;
        let sp = r.read_byte()?;
        let pc = r.read_word()?;
        let p = Status::from_byte(r.read_byte()?);
        let opinfo = OpcodeInfo::from_raw(r.read_dword()?);
        Ok(RegisterSnapshot {
            clk,
            regs: Registers { a, x, y, sp, pc, p },
            opinfo,
        })
    }

    /// Install parsed state. Nothing is changed until every field of the
    /// module has been read.
    pub fn apply_snapshot(
        &mut self,
        ctx: &mut CpuContext,
        regs: RegisterSnapshot,
        interrupts: InterruptSnapshot,
    ) {
        ctx.clk = regs.clk;
        self.regs = regs.regs;
        self.set_opinfo(regs.opinfo);
        self.clear_transient();
        ctx.interrupts.apply_snapshot(interrupts);
    }

    /// Write a complete CPU module named `name`.
    pub fn write_snapshot(&self, ctx: &CpuContext, name: &str, w: &mut SnapshotWriter) {
        let mark = w.begin_module(name, MAJOR, MINOR);
        self.write_registers(ctx, w);
        ctx.interrupts.write_snapshot(w);
        w.end_module(mark);
    }

    /// Read a CPU module written by [`Mos6502::write_snapshot`].
    ///
    /// On error the CPU and context are left as they were, but the caller
    /// must still reset the machine before stepping: other modules of the
    /// same snapshot may already have been applied.
    pub fn read_snapshot(
        &mut self,
        ctx: &mut CpuContext,
        name: &str,
        r: &mut SnapshotReader<'_>,
    ) -> Result<(), SnapshotError> {
        let (major, minor) = r.open_module(name)?;
        if major != MAJOR {
            log::warn!("{name}: snapshot version {major}.{minor} not supported");
            return Err(SnapshotError::UnsupportedVersion {
                module: name.to_owned(),
                major,
                minor,
            });
        }
        if minor != MINOR {
            log::warn!("{name}: snapshot minor version {minor}, expected {MINOR}");
        }
        let regs = Self::read_registers(r)?;
        let interrupts = ctx.interrupts.read_snapshot(r)?;
        self.apply_snapshot(ctx, regs, interrupts);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_fields_follow_module_layout() {
        let mut cpu = Mos6502::new();
        let mut ctx = CpuContext::new("maincpu");
        ctx.clk = 0x0102_0304;
        cpu.regs.a = 0x11;
        cpu.regs.x = 0x22;
        cpu.regs.y = 0x33;
        cpu.regs.sp = 0xF0;
        cpu.regs.pc = 0xC0DE;

        let mut w = SnapshotWriter::new();
        cpu.write_registers(&ctx, &mut w);
        let data = w.finish();

        assert_eq!(&data[..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&data[4..8], &[0x11, 0x22, 0x33, 0xF0]);
        assert_eq!(&data[8..10], &[0xDE, 0xC0]);
        assert_eq!(data.len(), 4 + 4 + 2 + 1 + 4);
    }
}
