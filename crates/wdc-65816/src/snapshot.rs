//! 65C816 snapshot module.
//!
//! Layout: clock (dword), A, X, Y, SP, D (words), DBR (byte), PC (word),
//! PBR (byte), P (byte), E (byte), halt state (byte), opcode info (dword),
//! then the interrupt block shared with the 6502 core.

use emu_core::{Clock, SnapshotError, SnapshotReader, SnapshotWriter};
use mos_6502::{CpuContext, InterruptSnapshot, OpcodeInfo, Status};

use crate::{Cpu65816, Registers65816};

const MAJOR: u8 = 1;
const MINOR: u8 = 0;

const HALT_WAITING: u8 = 1 << 0;
const HALT_STOPPED: u8 = 1 << 1;

/// Register-file fields parsed from a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RegisterSnapshot65816 {
    pub clk: Clock,
    pub regs: Registers65816,
    pub opinfo: OpcodeInfo,
    pub waiting: bool,
    pub stopped: bool,
}

impl Cpu65816 {
    /// Write clock, registers, halt state and opcode info.
    pub fn write_registers(&self, ctx: &CpuContext, w: &mut SnapshotWriter) {
        let r = &self.regs;
        w.write_dword(ctx.clk);
        w.write_word(r.a);
        w.write_word(r.x);
        w.write_word(r.y);
        w.write_word(r.sp);
        w.write_word(r.d);
        w.write_byte(r.dbr);
        w.write_word(r.pc);
        w.write_byte(r.pbr);
        w.write_byte(r.status_byte());
        w.write_byte(u8::from(r.emulation));
        let mut halt = 0;
        if self.is_waiting() {
            halt |= HALT_WAITING;
        }
        if self.is_stopped() {
            halt |= HALT_STOPPED;
        }
        w.write_byte(halt);
        w.write_dword(self.opinfo().raw());
    }

    /// Parse the fields written by [`Cpu65816::write_registers`].
    pub fn read_registers(r: &mut SnapshotReader<'_>) -> Result<RegisterSnapshot65816, SnapshotError> {
        let clk = r.read_dword()?;
        let a = r.read_word()?;
        let x = r.read_word()?;
        let y = r.read_word()?;
        let sp = r.read_word()?;
        let d = r.read_word()?;
        let dbr = r.read_byte()?;
        let pc = r.read_word()?;
        let pbr = r.read_byte()?;
        let p = Status::from_byte(r.read_byte()?);
        let emulation = match r.read_byte()? {
            0 => false,
            1 => true,
            other => {
                return Err(SnapshotError::InvalidValue {
                    field: "emulation",
                    value: u32::from(other),
                });
            }
        };
        let halt = r.read_byte()?;
        let opinfo = OpcodeInfo::from_raw(r.read_dword()?);
        Ok(RegisterSnapshot65816 {
            clk,
            regs: Registers65816 {
                a,
                x,
                y,
                sp,
                d,
                dbr,
                pbr,
                pc,
                p,
                emulation,
            },
            opinfo,
            waiting: halt & HALT_WAITING != 0,
            stopped: halt & HALT_STOPPED != 0,
        })
    }

    /// Install parsed state once the whole module has been read.
    pub fn apply_snapshot(
        &mut self,
        ctx: &mut CpuContext,
        regs: RegisterSnapshot65816,
        interrupts: InterruptSnapshot,
    ) {
        ctx.clk = regs.clk;
        self.regs = regs.regs;
        self.set_opinfo(regs.opinfo);
        self.set_halt_state(regs.waiting, regs.stopped);
        ctx.interrupts.apply_snapshot(interrupts);
    }

    /// Write a complete CPU module named `name`.
    pub fn write_snapshot(&self, ctx: &CpuContext, name: &str, w: &mut SnapshotWriter) {
        let mark = w.begin_module(name, MAJOR, MINOR);
        self.write_registers(ctx, w);
        ctx.interrupts.write_snapshot(w);
        w.end_module(mark);
    }

    /// Read a CPU module written by [`Cpu65816::write_snapshot`].
    ///
    /// On error nothing is changed, but the machine must be reset before
    /// it runs again.
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
        let regs = Self::read_registers(r)?;
        let interrupts = ctx.interrupts.read_snapshot(r)?;
        self.apply_snapshot(ctx, regs, interrupts);
        Ok(())
    }
}
