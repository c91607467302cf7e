//! Shared drive fixtures: a ROM builder and a recording I/O stub.

#![allow(dead_code)]

use cbm_drive::{Drive, DriveConfig, DriveIo, IdleMethod, ROM_SIZE};
use emu_core::{AlarmId, Clock, MasterClock};
use mos_6502::CpuContext;

#[derive(Debug, Default)]
pub struct RecordingIo {
    pub reads: Vec<u16>,
    pub writes: Vec<(u16, u8)>,
    /// Drive clock and lateness of each served alarm.
    pub served: Vec<(Clock, Clock)>,
    pub resets: u32,
    pub byte_ready: bool,
    pub byte_ready_acks: u32,
}

impl DriveIo for RecordingIo {
    fn read(&mut self, _ctx: &mut CpuContext, addr: u16) -> u8 {
        self.reads.push(addr);
        0x00
    }

    fn write(&mut self, _ctx: &mut CpuContext, addr: u16, value: u8) {
        self.writes.push((addr, value));
    }

    fn serve_alarm(&mut self, ctx: &mut CpuContext, _alarm: AlarmId, offset: Clock) {
        self.served.push((ctx.clk, offset));
    }

    fn reset(&mut self, _ctx: &mut CpuContext) {
        self.resets += 1;
    }

    fn byte_ready(&mut self) -> bool {
        self.byte_ready
    }

    fn clear_byte_ready(&mut self) {
        self.byte_ready_acks += 1;
        self.byte_ready = false;
    }
}

/// Drive and main CPU on the same crystal: one main cycle is one drive
/// cycle.
pub fn unity(idle: IdleMethod) -> DriveConfig {
    DriveConfig {
        drive_clock: MasterClock::new(1_000_000),
        main_clock: MasterClock::new(1_000_000),
        idle,
    }
}

/// A ROM full of NOPs with the reset vector at `entry`.
pub fn rom(entry: u16) -> Vec<u8> {
    let mut image = vec![0xEA; ROM_SIZE];
    place(&mut image, 0xFFFC, &entry.to_le_bytes());
    image
}

/// Copy `bytes` into a ROM image at CPU address `addr`.
pub fn place(image: &mut [u8], addr: u16, bytes: &[u8]) {
    let start = usize::from(addr) & (ROM_SIZE - 1);
    image[start..start + bytes.len()].copy_from_slice(bytes);
}

/// A drive running `program` from $C000, reset at main clock 0.
pub fn drive_with(config: DriveConfig, program: &[u8]) -> Drive<RecordingIo> {
    let mut image = rom(0xC000);
    place(&mut image, 0xC000, program);
    boot(config, &image)
}

pub fn boot(config: DriveConfig, image: &[u8]) -> Drive<RecordingIo> {
    let mut drive = Drive::new("drive8", config, RecordingIo::default());
    drive.load_rom(image).expect("16K image");
    drive.reset(0);
    drive
}

/// `JMP $C000`: a three-cycle loop.
pub const SPIN: [u8; 3] = [0x4C, 0x00, 0xC0];
