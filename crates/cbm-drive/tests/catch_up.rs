//! Clock-domain catch-up and the idle-loop trap.

mod common;

use cbm_drive::{DELAY_DONE, DELAY_TRAP, DriveConfig, IDLE_LOOP, IDLE_TRAP, IdleMethod};
use common::{SPIN, boot, drive_with, place, rom, unity};
use emu_core::PREVENT_OVERFLOW_TICK;

#[test]
fn unity_catch_up_pays_back_overshoot() {
    let mut drive = drive_with(unity(IdleMethod::None), &SPIN);
    assert_eq!(drive.clock(), 6);

    drive.catch_up(100);
    // Stop at 106; the loop instruction ends on 108.
    assert_eq!(drive.clock(), 108);
    assert_eq!(drive.last_exc_cycles(), 2);
    assert_eq!(drive.last_clk(), 100);

    drive.catch_up(200);
    assert_eq!(drive.clock(), 207);
    assert_eq!(drive.last_exc_cycles(), 1);
}

#[test]
fn pal_ratio_accumulates_fractions() {
    let config = DriveConfig {
        idle: IdleMethod::None,
        ..DriveConfig::default()
    };
    let mut drive = drive_with(config, &SPIN);

    // 1000 PAL cycles are 1014 drive cycles and a fraction.
    drive.catch_up(1000);
    assert_eq!(drive.clock(), 1020);
    assert_eq!(drive.cycle_accum(), 63_496);

    // The second fraction carries into a whole extra cycle.
    drive.catch_up(2000);
    assert_eq!(drive.cycle_accum(), 63_496 * 2 - 0x1_0000);
    assert_eq!(drive.clock(), 2037);
}

#[test]
fn long_gaps_run_in_chunks() {
    let mut drive = drive_with(unity(IdleMethod::None), &SPIN);
    drive.catch_up(0x3000);
    assert_eq!(drive.clock(), 6 + 0x3000);
    assert_eq!(drive.last_exc_cycles(), 0);
}

#[test]
fn catch_up_to_the_past_does_nothing() {
    let mut drive = drive_with(unity(IdleMethod::None), &SPIN);
    drive.catch_up(100);
    let clk = drive.clock();
    drive.catch_up(100);
    drive.catch_up(50);
    assert_eq!(drive.clock(), clk);
    assert_eq!(drive.last_clk(), 50);
}

#[test]
fn long_sleep_resynchronises_instead_of_running() {
    let mut drive = drive_with(unity(IdleMethod::None), &SPIN);
    drive.host.ctx.clk = 1_000_000;
    drive.catch_up(0x0100_0010);
    assert_eq!(drive.clock(), 1_000_000);
    assert_eq!(drive.last_clk(), 0x0100_0010);
}

fn idle_rom() -> Vec<u8> {
    let mut image = rom(IDLE_LOOP);
    // $EBFF: JMP $EC9B / $EC9B: JMP $EBFF
    place(&mut image, IDLE_LOOP, &[0x4C, 0x9B, 0xEC]);
    place(&mut image, IDLE_TRAP, &[0x4C, 0xFF, 0xEB]);
    image
}

#[test]
fn idle_trap_skips_to_the_end_of_catch_up() {
    let mut drive = boot(unity(IdleMethod::TrapIdle), &idle_rom());

    drive.catch_up(10_000);
    // JMP (3) and the trap (7) run, then the clock lands on the stop clock.
    assert_eq!(drive.clock(), 10_006);
    assert_eq!(drive.cpu.regs.pc, IDLE_LOOP);
    assert_eq!(drive.last_exc_cycles(), 0);
}

#[test]
fn idle_trap_stops_at_next_alarm() {
    let mut drive = boot(unity(IdleMethod::TrapIdle), &idle_rom());
    let timer = drive.host.ctx.alarms.register("via1 timer");
    drive.host.ctx.alarms.set(timer, 500);

    drive.catch_up(10_000);
    // Served exactly on time, then idled through to the stop clock.
    assert_eq!(drive.host.io.served, vec![(500, 0)]);
    assert_eq!(drive.clock(), 10_006);
    assert_eq!(drive.last_exc_cycles(), 0);
}

fn delay_rom() -> Vec<u8> {
    let mut image = rom(DELAY_TRAP);
    // $DAF6: JMP $DAF6
    place(&mut image, DELAY_DONE, &[0x4C, 0xF6, 0xDA]);
    image
}

#[test]
fn delay_loop_trap_skips_to_loop_exit() {
    let mut drive = boot(unity(IdleMethod::TrapIdle), &delay_rom());
    drive.cpu.step(&mut drive.host);
    assert_eq!(drive.cpu.regs.pc, DELAY_DONE);
    assert_eq!(drive.clock(), 6 + 7);
    assert_eq!(drive.cpu.regs.sp, 0xFF, "nothing pushed");
}

#[test]
fn delay_loop_runs_without_idle_trap() {
    let mut drive = boot(unity(IdleMethod::None), &delay_rom());
    drive.cpu.step(&mut drive.host);
    // The unpatched ROM byte is a NOP.
    assert_eq!(drive.cpu.regs.pc, DELAY_TRAP + 1);
    assert_eq!(drive.clock(), 6 + 2);
}

#[test]
fn idle_loop_runs_normally_without_trap() {
    let mut drive = boot(unity(IdleMethod::None), &idle_rom());
    drive.catch_up(1000);
    assert_eq!(drive.clock(), 1008);
    assert!(matches!(drive.cpu.regs.pc, IDLE_LOOP | IDLE_TRAP));
}

#[test]
fn main_rebase_shifts_catch_up_origin() {
    let mut drive = drive_with(unity(IdleMethod::None), &SPIN);
    drive.catch_up(100);

    // Main clock was 120 and is now 70.
    drive.main_clock_rebased(70, 50);
    assert_eq!(drive.last_clk(), 50);
    drive.catch_up(70);
    assert_eq!(drive.clock(), 126);
}

#[test]
fn main_rebase_past_origin_catches_up_first() {
    let mut drive = drive_with(unity(IdleMethod::None), &SPIN);
    drive.catch_up(100);

    // Main clock was 160 and is now 10.
    drive.main_clock_rebased(10, 150);
    assert_eq!(drive.clock(), 168);
    assert_eq!(drive.last_clk(), 10);
}

#[test]
fn drive_clock_rebase_moves_stop_clock() {
    let mut drive = drive_with(unity(IdleMethod::None), &SPIN);
    drive.host.ctx.clk = PREVENT_OVERFLOW_TICK + 9;

    drive.catch_up(100);
    // Rebased down to 1 on the first step; 100 cycles later is 101.
    assert_eq!(drive.host.stop_clk(), 101);
    assert_eq!(drive.clock(), 103);
}
