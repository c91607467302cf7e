//! CPU snapshot modules.

mod common;

use common::TestHost;
use emu_core::{SnapshotError, SnapshotReader, SnapshotWriter};
use mos_6502::interrupt::IRQ;
use mos_6502::{Mos6502, Status};

fn running_cpu() -> (Mos6502, TestHost) {
    let mut host = TestHost::new();
    let mut cpu = Mos6502::new();
    let via = host.ctx.interrupts.register_source("via");
    host.ctx.interrupts.register_source("cia");
    host.ctx.clk = 0x0001_2345;
    host.ctx.set_irq(via, true);
    cpu.regs.a = 0x11;
    cpu.regs.x = 0x22;
    cpu.regs.y = 0x33;
    cpu.regs.sp = 0xF7;
    cpu.regs.pc = 0xBEEF;
    cpu.regs.p = Status::from_byte(0xC3);
    (cpu, host)
}

fn fresh() -> (Mos6502, TestHost) {
    let mut host = TestHost::new();
    host.ctx.interrupts.register_source("via");
    host.ctx.interrupts.register_source("cia");
    (Mos6502::new(), host)
}

fn save(cpu: &Mos6502, host: &TestHost) -> Vec<u8> {
    let mut w = SnapshotWriter::new();
    cpu.write_snapshot(&host.ctx, "MAINCPU", &mut w);
    w.finish()
}

#[test]
fn round_trip_restores_registers_clock_and_interrupts() {
    let (cpu, host) = running_cpu();
    let data = save(&cpu, &host);

    let (mut restored, mut target) = fresh();
    let mut r = SnapshotReader::new(&data);
    restored
        .read_snapshot(&mut target.ctx, "MAINCPU", &mut r)
        .expect("snapshot loads");

    assert_eq!(r.position(), data.len());
    assert_eq!(restored.regs.a, 0x11);
    assert_eq!(restored.regs.pc, 0xBEEF);
    assert_eq!(restored.regs.sp, 0xF7);
    assert_eq!(restored.regs.status_byte(), cpu.regs.status_byte());
    assert_eq!(target.ctx.clk, 0x0001_2345);
    assert!(target.ctx.interrupts.is_pending(IRQ));
    assert_eq!(target.ctx.interrupts.irq_lines(), 1);
    assert_eq!(target.ctx.interrupts.irq_clk(), 0x0001_2345);
}

#[test]
fn register_block_follows_header() {
    let (cpu, host) = running_cpu();
    let data = save(&cpu, &host);

    // 16-byte name, major, minor, size dword.
    assert_eq!(&data[..7], b"MAINCPU");
    assert_eq!(data[16], 1);
    assert_eq!(u32::from_le_bytes([data[18], data[19], data[20], data[21]]) as usize, data.len());
    let body = &data[22..];
    assert_eq!(&body[..4], &0x0001_2345u32.to_le_bytes());
    assert_eq!(&body[4..8], &[0x11, 0x22, 0x33, 0xF7]);
    assert_eq!(&body[8..10], &[0xEF, 0xBE]);
    assert_eq!(body[10], 0xC3 | 0x20);
}

#[test]
fn truncated_module_fails_and_leaves_state_alone() {
    let (cpu, host) = running_cpu();
    let data = save(&cpu, &host);

    let (mut restored, mut target) = fresh();
    restored.regs.a = 0x99;
    target.ctx.clk = 77;
    let mut r = SnapshotReader::new(&data[..data.len() - 3]);
    let err = restored
        .read_snapshot(&mut target.ctx, "MAINCPU", &mut r)
        .unwrap_err();

    assert!(matches!(err, SnapshotError::UnexpectedEof { .. }), "{err}");
    assert_eq!(restored.regs.a, 0x99);
    assert_eq!(target.ctx.clk, 77);
    assert!(!target.ctx.interrupts.is_pending(IRQ));
}

#[test]
fn wrong_module_name_is_rejected() {
    let (cpu, host) = running_cpu();
    let data = save(&cpu, &host);

    let (mut restored, mut target) = fresh();
    let mut r = SnapshotReader::new(&data);
    let err = restored
        .read_snapshot(&mut target.ctx, "DRIVECPU0", &mut r)
        .unwrap_err();
    assert!(matches!(err, SnapshotError::ModuleNameMismatch { .. }), "{err}");
}

#[test]
fn newer_major_version_is_rejected() {
    let (cpu, host) = running_cpu();
    let mut data = save(&cpu, &host);
    data[16] = 2;

    let (mut restored, mut target) = fresh();
    let mut r = SnapshotReader::new(&data);
    let err = restored
        .read_snapshot(&mut target.ctx, "MAINCPU", &mut r)
        .unwrap_err();
    assert_eq!(
        err,
        SnapshotError::UnsupportedVersion {
            module: "MAINCPU".to_owned(),
            major: 2,
            minor: 0,
        }
    );
}

#[test]
fn mismatched_interrupt_sources_are_rejected() {
    let (cpu, host) = running_cpu();
    let data = save(&cpu, &host);

    let mut target = TestHost::new();
    target.ctx.interrupts.register_source("via");
    let mut restored = Mos6502::new();
    let mut r = SnapshotReader::new(&data);
    let err = restored
        .read_snapshot(&mut target.ctx, "MAINCPU", &mut r)
        .unwrap_err();
    assert!(matches!(err, SnapshotError::InvalidValue { .. }), "{err}");
}
