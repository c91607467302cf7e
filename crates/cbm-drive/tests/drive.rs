//! Drive hooks: reset, JAM handling, byte-ready and I/O dispatch.

mod common;

use cbm_drive::{IdleMethod, JAM_RESTART, MachineReset};
use common::{SPIN, drive_with, unity};
use emu_core::{Observable, Value};
use mos_6502::JamAction;
use mos_6502::interrupt::MONITOR;

const JAM: [u8; 1] = [0x02];

#[test]
fn reset_rearms_io_and_keeps_monitor() {
    let mut drive = drive_with(unity(IdleMethod::None), &SPIN);
    drive.catch_up(100);
    drive.host.ctx.interrupts.monitor_on();

    drive.reset(500);
    assert_eq!(drive.clock(), 6);
    assert_eq!(drive.cpu.regs.pc, 0xC000);
    assert_eq!(drive.last_clk(), 500);
    assert_eq!(drive.host.io.resets, 2);
    assert!(drive.host.ctx.interrupts.is_pending(MONITOR));
}

#[test]
fn jam_reset_restarts_firmware_and_requests_machine_reset() {
    let mut drive = drive_with(unity(IdleMethod::None), &JAM);
    drive.host.jam_action = JamAction::Reset;
    drive.host.ram_mut()[0x10] = 0x77;

    drive.cpu.step(&mut drive.host);
    assert_eq!(drive.cpu.regs.pc, JAM_RESTART);
    assert!(!drive.cpu.is_jammed());
    assert_eq!(drive.host.last_jam(), Some((0x02, 0xC000)));
    assert_eq!(drive.host.take_reset_request(), Some(MachineReset::Soft));
    assert_eq!(drive.host.take_reset_request(), None);
    assert_eq!(drive.host.ram()[0x10], 0x77);
}

#[test]
fn jam_hard_reset_clears_ram() {
    let mut drive = drive_with(unity(IdleMethod::None), &JAM);
    drive.host.jam_action = JamAction::HardReset;
    drive.host.ram_mut()[0x10] = 0x77;

    drive.cpu.step(&mut drive.host);
    assert_eq!(drive.cpu.regs.pc, JAM_RESTART);
    assert_eq!(drive.host.take_reset_request(), Some(MachineReset::Hard));
    assert!(drive.host.ram().iter().all(|&b| b == 0));
}

#[test]
fn jam_by_default_burns_cycles() {
    let mut drive = drive_with(unity(IdleMethod::None), &JAM);
    drive.cpu.step(&mut drive.host);
    assert!(drive.cpu.is_jammed());
    assert_eq!(drive.host.take_reset_request(), None);

    let clk = drive.clock();
    drive.cpu.step(&mut drive.host);
    assert_eq!(drive.clock(), clk + 1);
    assert_eq!(drive.cpu.regs.pc, 0xC000);
}

#[test]
fn byte_ready_sets_overflow_until_clv() {
    // PHP; CLV
    let mut drive = drive_with(unity(IdleMethod::None), &[0x08, 0xB8]);
    drive.host.io.byte_ready = true;

    drive.cpu.step(&mut drive.host);
    assert_ne!(drive.host.ram()[0x1FF] & 0x40, 0, "pushed status has V");

    drive.cpu.step(&mut drive.host);
    assert_eq!(drive.host.io.byte_ready_acks, 1);
    assert!(!drive.host.io.byte_ready);
}

#[test]
fn io_range_goes_to_the_chips() {
    // LDA $1800; STA $1C00; STA $0800
    let program = [0xAD, 0x00, 0x18, 0x8D, 0x00, 0x1C, 0x8D, 0x00, 0x08];
    let mut drive = drive_with(unity(IdleMethod::None), &program);
    drive.host.ram_mut()[0] = 0xFF;

    for _ in 0..3 {
        drive.cpu.step(&mut drive.host);
    }
    assert_eq!(drive.host.io.reads, vec![0x1800]);
    assert_eq!(drive.host.io.writes, vec![(0x1C00, 0x00)]);
    // $0800 mirrors $0000.
    assert_eq!(drive.host.ram()[0], 0x00);
}

#[test]
fn observable_paths() {
    let drive = drive_with(unity(IdleMethod::None), &SPIN);
    assert_eq!(drive.query("clock"), Some(Value::U32(6)));
    assert_eq!(drive.query("cpu.pc"), Some(Value::U16(0xC000)));
    assert_eq!(drive.query("cpu.halted"), Some(Value::Bool(false)));
    assert_eq!(drive.query("sync_factor"), Some(Value::U32(0x1_0000)));
    assert_eq!(drive.query("cpu.bogus"), None);
    assert!(drive.query_paths().iter().all(|p| drive.query(p).is_some()));
}
