//! Drive address space and the CPU hooks of a drive.
//!
//! | Range           | Contents                              |
//! |-----------------|---------------------------------------|
//! | `$0000-$17FF`   | 2K RAM, mirrored three times          |
//! | `$1800-$1FFF`   | I/O chips (VIAs), through [`DriveIo`] |
//! | `$2000-$7FFF`   | open bus                              |
//! | `$8000-$FFFF`   | 16K ROM, mirrored twice               |

use emu_core::{AlarmId, BankWindow, Bus, Clock};
use mos_6502::{CpuContext, Host, JamAction, Registers, TrapDisposition};

use crate::{DriveError, IdleMethod};

pub const RAM_SIZE: usize = 0x0800;
pub const ROM_SIZE: usize = 0x4000;

/// Trap address patched into the firmware idle loop.
pub const IDLE_TRAP: u16 = 0xEC9B;
/// Where the idle loop continues after the trap.
pub const IDLE_LOOP: u16 = 0xEBFF;
/// Trap address patched over the firmware delay loop.
pub const DELAY_TRAP: u16 = 0xDAEE;
/// Where the firmware continues once the delay loop is skipped.
pub const DELAY_DONE: u16 = 0xDAF6;
/// Firmware restart point used after a JAM.
pub const JAM_RESTART: u16 = 0xEAA0;

const RAM_END: u16 = 0x17FF;
const IO_START: u16 = 0x1800;
const IO_END: u16 = 0x1FFF;
const ROM_START: u16 = 0x8000;

/// ROM checksum bytes NOPed out while the idle trap is installed, so the
/// firmware's self test still passes.
const CHECKSUM_PATCH: [u16; 4] = [0xEAE4, 0xEAE5, 0xEAE8, 0xEAE9];

/// The trap opcode.
const BRK: u8 = 0x00;
const NOP: u8 = 0xEA;

/// The drive's I/O chips.
///
/// Handlers get the drive's context so they can raise interrupts and
/// schedule alarms on the drive clock.
pub trait DriveIo {
    /// Read an I/O register in `$1800-$1FFF`.
    fn read(&mut self, ctx: &mut CpuContext, addr: u16) -> u8;

    /// Write an I/O register in `$1800-$1FFF`.
    fn write(&mut self, ctx: &mut CpuContext, addr: u16, value: u8);

    /// An alarm registered by the chips came due.
    fn serve_alarm(&mut self, ctx: &mut CpuContext, alarm: AlarmId, offset: Clock) {
        let _ = (ctx, alarm, offset);
    }

    /// CPU reset: re-arm timers.
    fn reset(&mut self, ctx: &mut CpuContext) {
        let _ = ctx;
    }

    /// Byte-ready line from the read/write head.
    fn byte_ready(&mut self) -> bool {
        false
    }

    fn clear_byte_ready(&mut self) {}
}

/// No chips fitted: I/O reads float, writes are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconnected;

impl DriveIo for Unconnected {
    fn read(&mut self, _ctx: &mut CpuContext, addr: u16) -> u8 {
        (addr >> 8) as u8
    }

    fn write(&mut self, _ctx: &mut CpuContext, _addr: u16, _value: u8) {}
}

/// Machine reset requested by the drive after a JAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineReset {
    Soft,
    Hard,
}

/// The drive side of a drive CPU: memory, I/O, context and hooks.
pub struct DriveHost<I: DriveIo> {
    pub ctx: CpuContext,
    pub io: I,
    ram: Box<[u8]>,
    rom: Box<[u8]>,
    idle: IdleMethod,
    /// Original ROM bytes under the idle-trap patches.
    saved_checksum: [u8; 4],
    saved_idle: u8,
    saved_delay: u8,
    /// Drive clock at which the current catch-up ends.
    pub(crate) stop_clk: Clock,
    /// What to do when the drive CPU jams.
    pub jam_action: JamAction,
    last_jam: Option<(u8, u16)>,
    reset_request: Option<MachineReset>,
}

impl<I: DriveIo> DriveHost<I> {
    pub fn new(ctx: CpuContext, io: I, idle: IdleMethod) -> Self {
        Self {
            ctx,
            io,
            ram: vec![0; RAM_SIZE].into_boxed_slice(),
            rom: vec![0; ROM_SIZE].into_boxed_slice(),
            idle,
            saved_checksum: [0; 4],
            saved_idle: 0,
            saved_delay: 0,
            stop_clk: 0,
            jam_action: JamAction::BurnOneCycle,
            last_jam: None,
            reset_request: None,
        }
    }

    /// Install a firmware image, patching in the idle trap if enabled.
    pub fn load_rom(&mut self, image: &[u8]) -> Result<(), DriveError> {
        if image.len() != ROM_SIZE {
            return Err(DriveError::RomSize {
                expected: ROM_SIZE,
                found: image.len(),
            });
        }
        self.rom.copy_from_slice(image);
        for (saved, &addr) in self.saved_checksum.iter_mut().zip(&CHECKSUM_PATCH) {
            *saved = self.rom[rom_index(addr)];
        }
        self.saved_idle = self.rom[rom_index(IDLE_TRAP)];
        self.saved_delay = self.rom[rom_index(DELAY_TRAP)];
        if self.idle == IdleMethod::TrapIdle {
            self.patch_idle_trap();
        }
        Ok(())
    }

    #[must_use]
    pub fn idle_method(&self) -> IdleMethod {
        self.idle
    }

    /// Switch idle handling, installing or removing the ROM patches.
    pub fn set_idle_method(&mut self, idle: IdleMethod) {
        if idle == self.idle {
            return;
        }
        self.idle = idle;
        match idle {
            IdleMethod::TrapIdle => self.patch_idle_trap(),
            IdleMethod::None => {
                for (&saved, &addr) in self.saved_checksum.iter().zip(&CHECKSUM_PATCH) {
                    self.rom[rom_index(addr)] = saved;
                }
                self.rom[rom_index(IDLE_TRAP)] = self.saved_idle;
                self.rom[rom_index(DELAY_TRAP)] = self.saved_delay;
            }
        }
    }

    fn patch_idle_trap(&mut self) {
        for &addr in &CHECKSUM_PATCH {
            self.rom[rom_index(addr)] = NOP;
        }
        self.rom[rom_index(IDLE_TRAP)] = BRK;
        self.rom[rom_index(DELAY_TRAP)] = BRK;
    }

    #[must_use]
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    /// Opcode and address of the last JAM.
    #[must_use]
    pub fn last_jam(&self) -> Option<(u8, u16)> {
        self.last_jam
    }

    /// Machine reset the drive asked for, if any. The owning machine
    /// performs it.
    pub fn take_reset_request(&mut self) -> Option<MachineReset> {
        self.reset_request.take()
    }

    /// Drive clock at which the current catch-up stops.
    #[must_use]
    pub fn stop_clk(&self) -> Clock {
        self.stop_clk
    }
}

fn rom_index(addr: u16) -> usize {
    usize::from(addr) & (ROM_SIZE - 1)
}

fn ram_index(addr: u16) -> usize {
    usize::from(addr) & (RAM_SIZE - 1)
}

impl<I: DriveIo> Bus for DriveHost<I> {
    fn read(&mut self, address: u32) -> u8 {
        let addr = address as u16;
        match addr {
            0..=RAM_END => self.ram[ram_index(addr)],
            IO_START..=IO_END => self.io.read(&mut self.ctx, addr),
            ROM_START.. => self.rom[rom_index(addr)],
            _ => (addr >> 8) as u8,
        }
    }

    fn write(&mut self, address: u32, value: u8) {
        let addr = address as u16;
        match addr {
            0..=RAM_END => self.ram[ram_index(addr)] = value,
            IO_START..=IO_END => self.io.write(&mut self.ctx, addr, value),
            _ => {}
        }
    }

    fn read_zero(&mut self, address: u8) -> u8 {
        self.ram[usize::from(address)]
    }

    fn write_zero(&mut self, address: u8, value: u8) {
        self.ram[usize::from(address)] = value;
    }

    fn bank_window(&self, address: u32) -> Option<BankWindow> {
        let addr = address as u16;
        match addr {
            0..=RAM_END => {
                let start = u32::from(addr) & !(RAM_SIZE as u32 - 1);
                Some(BankWindow::new(start, start + RAM_SIZE as u32 - 1))
            }
            ROM_START.. => {
                let start = u32::from(addr) & !(ROM_SIZE as u32 - 1);
                Some(BankWindow::new(start, start + ROM_SIZE as u32 - 1))
            }
            _ => None,
        }
    }

    fn peek(&self, address: u32) -> u8 {
        let addr = address as u16;
        match addr {
            0..=RAM_END => self.ram[ram_index(addr)],
            ROM_START.. => self.rom[rom_index(addr)],
            _ => (addr >> 8) as u8,
        }
    }
}

impl<I: DriveIo> Host for DriveHost<I> {
    fn context(&mut self) -> &mut CpuContext {
        &mut self.ctx
    }

    fn serve_alarm(&mut self, alarm: AlarmId, offset: Clock) {
        self.io.serve_alarm(&mut self.ctx, alarm, offset);
    }

    fn jam(&mut self, opcode: u8, regs: &mut Registers) -> JamAction {
        self.last_jam = Some((opcode, regs.pc));
        if matches!(self.jam_action, JamAction::Reset | JamAction::HardReset) {
            regs.pc = JAM_RESTART;
        }
        self.jam_action
    }

    fn machine_reset(&mut self, hard: bool) {
        if hard {
            self.ram.fill(0);
            self.reset_request = Some(MachineReset::Hard);
        } else {
            self.reset_request = Some(MachineReset::Soft);
        }
    }

    fn reset_peripherals(&mut self) {
        self.io.reset(&mut self.ctx);
    }

    /// Firmware traps.
    ///
    /// The idle loop leaves PC on the loop and skips ahead to the next
    /// alarm, but not past the end of the current catch-up. The delay loop
    /// is skipped outright.
    fn rom_trap(&mut self, regs: &mut Registers) -> TrapDisposition {
        if self.idle != IdleMethod::TrapIdle {
            return TrapDisposition::NotATrap;
        }
        match regs.pc {
            IDLE_TRAP => {
                regs.pc = IDLE_LOOP;
                let next = self.ctx.alarms.next_pending_clock().min(self.stop_clk);
                if next > self.ctx.clk {
                    self.ctx.clk = next;
                }
                TrapDisposition::Consumed
            }
            DELAY_TRAP => {
                regs.pc = DELAY_DONE;
                TrapDisposition::Consumed
            }
            _ => TrapDisposition::NotATrap,
        }
    }

    fn byte_ready(&mut self) -> bool {
        self.io.byte_ready()
    }

    fn clear_byte_ready(&mut self) {
        self.io.clear_byte_ready();
    }

    fn clock_rebased(&mut self, sub: Clock) {
        self.stop_clk = self.stop_clk.saturating_sub(sub);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> DriveHost<Unconnected> {
        DriveHost::new(CpuContext::new("drive8"), Unconnected, IdleMethod::TrapIdle)
    }

    #[test]
    fn ram_is_mirrored_below_io() {
        let mut host = host();
        host.write(0x0801, 0x5A);
        assert_eq!(host.read(0x0001), 0x5A);
        assert_eq!(host.read(0x1001), 0x5A);
        assert_eq!(host.read_zero(0x01), 0x5A);
    }

    #[test]
    fn unmapped_reads_float() {
        let mut host = host();
        assert_eq!(host.read(0x2345), 0x23);
        assert_eq!(host.read(0x1C00), 0x1C);
        host.write(0x4000, 0xFF);
        assert_eq!(host.read(0x4000), 0x40);
    }

    #[test]
    fn rom_is_mirrored_at_8000() {
        let mut host = host();
        let mut image = vec![0; ROM_SIZE];
        image[0x0123] = 0x99;
        host.load_rom(&image).expect("rom fits");
        assert_eq!(host.read(0xC123), 0x99);
        assert_eq!(host.read(0x8123), 0x99);
        host.write(0xC123, 0);
        assert_eq!(host.read(0xC123), 0x99);
    }

    #[test]
    fn wrong_rom_size_is_rejected() {
        let mut host = host();
        assert_eq!(
            host.load_rom(&[0; 0x2000]),
            Err(DriveError::RomSize {
                expected: ROM_SIZE,
                found: 0x2000
            })
        );
    }

    #[test]
    fn bank_windows_cover_ram_and_rom_only() {
        let host = host();
        assert_eq!(host.bank_window(0x0910), Some(BankWindow::new(0x0800, 0x0FFF)));
        assert_eq!(host.bank_window(0xD000), Some(BankWindow::new(0xC000, 0xFFFF)));
        assert_eq!(host.bank_window(0x9000), Some(BankWindow::new(0x8000, 0xBFFF)));
        assert_eq!(host.bank_window(0x1800), None);
        assert_eq!(host.bank_window(0x3000), None);
    }

    #[test]
    fn idle_patches_follow_idle_method() {
        let mut host = host();
        let mut image = vec![0x60; ROM_SIZE];
        image[rom_index(IDLE_TRAP)] = 0x4C;
        image[rom_index(DELAY_TRAP)] = 0xCA;
        host.load_rom(&image).expect("rom fits");
        assert_eq!(host.peek(u32::from(IDLE_TRAP)), BRK);
        assert_eq!(host.peek(u32::from(DELAY_TRAP)), BRK);
        assert_eq!(host.peek(0xEAE4), NOP);

        host.set_idle_method(IdleMethod::None);
        assert_eq!(host.peek(u32::from(IDLE_TRAP)), 0x4C);
        assert_eq!(host.peek(u32::from(DELAY_TRAP)), 0xCA);
        assert_eq!(host.peek(0xEAE9), 0x60);

        host.set_idle_method(IdleMethod::TrapIdle);
        assert_eq!(host.peek(u32::from(DELAY_TRAP)), BRK);
    }
}
