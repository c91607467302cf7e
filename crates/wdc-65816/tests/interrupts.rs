//! Exception frames, vectors, WAI/STP and the interrupt-driven hooks.

mod common;

use common::{TestHost, setup, setup_native, step};
use mos_6502::flags::{B, D, I};
use mos_6502::interrupt::{DMA, IRQ};
use mos_6502::TrapDisposition;
use wdc_65816::{Cpu65816, Cpu65816Config, Registers65816};

const NOPS: [u8; 8] = [0xEA; 8];

fn pushed_return_address(host: &TestHost) -> u16 {
    u16::from_le_bytes([host.peek(0x01FE), host.peek(0x01FF)])
}

fn trap_cpu(origin: u16, program: &[u8]) -> (Cpu65816, TestHost) {
    let (_, mut host) = setup(origin, program);
    let mut cpu = Cpu65816::with_config(Cpu65816Config {
        rom_traps: true,
        ..Cpu65816Config::default()
    });
    cpu.regs.pc = origin;
    host.vector(0xFFF4, 0x6000);
    host.load(0x6000, &NOPS);
    (cpu, host)
}

#[test]
fn native_irq_pushes_program_bank() {
    let (mut cpu, mut host) = setup_native(0x2000, &[]);
    cpu.regs.pbr = 0x03;
    cpu.regs.pc = 0x4000;
    cpu.regs.p.set(D);
    host.load(0x03_4000, &NOPS);
    host.vector(0xFFEE, 0x5000);
    host.load(0x5000, &[0xEA, 0x40]);
    let via = host.ctx.interrupts.register_source("via");
    host.ctx.set_irq(via, true);
    host.ctx.clk = 10;

    // Two internal cycles, four pushes, two vector reads, then the NOP.
    assert_eq!(step(&mut cpu, &mut host), 8 + 2);
    assert_eq!((cpu.regs.pbr, cpu.regs.pc), (0x00, 0x5001));
    assert_eq!(
        [host.peek(0x01FF), host.peek(0x01FE), host.peek(0x01FD)],
        [0x03, 0x40, 0x00]
    );
    assert_eq!(host.peek(0x01FC), D);
    assert!(cpu.regs.p.is_set(I));
    assert!(!cpu.regs.p.is_set(D));

    host.ctx.set_irq(via, false);
    assert_eq!(step(&mut cpu, &mut host), 7);
    assert_eq!((cpu.regs.pbr, cpu.regs.pc), (0x03, 0x4000));
    assert!(cpu.regs.p.is_set(D));
    assert!(!cpu.regs.p.is_set(I));
}

#[test]
fn emulation_irq_uses_6502_frame() {
    let (mut cpu, mut host) = setup(0x2000, &NOPS);
    cpu.regs.set_status(0);
    host.vector(0xFFFE, 0x3000);
    host.load(0x3000, &NOPS);
    let via = host.ctx.interrupts.register_source("via");
    host.ctx.set_irq(via, true);
    host.ctx.clk = 10;

    assert_eq!(step(&mut cpu, &mut host), 7 + 2);
    assert_eq!(cpu.regs.pc, 0x3001);
    assert_eq!(pushed_return_address(&host), 0x2000);
    // M reads as the unused bit and B is clear.
    assert_eq!(host.peek(0x01FD), 0x20);
    assert_eq!(cpu.regs.sp, 0x01FC);
}

#[test]
fn brk_vectors_by_mode() {
    let (mut cpu, mut host) = setup_native(0x2000, &[0x00, 0xFF]);
    host.vector(0xFFE6, 0x7000);
    assert_eq!(step(&mut cpu, &mut host), 8);
    assert_eq!(cpu.regs.pc, 0x7000);
    assert_eq!([host.peek(0x01FE), host.peek(0x01FD)], [0x20, 0x02]);

    let (mut cpu, mut host) = setup(0x2000, &[0x00, 0xFF]);
    host.vector(0xFFFE, 0x7100);
    assert_eq!(step(&mut cpu, &mut host), 7);
    assert_eq!(cpu.regs.pc, 0x7100);
    assert_eq!(pushed_return_address(&host), 0x2002);
    assert_ne!(host.peek(0x01FD) & B, 0);
}

#[test]
fn cop_vectors_by_mode() {
    let (mut cpu, mut host) = setup_native(0x2000, &[0x02, 0x00]);
    host.vector(0xFFE4, 0x7200);
    assert_eq!(step(&mut cpu, &mut host), 8);
    assert_eq!(cpu.regs.pc, 0x7200);

    let (mut cpu, mut host) = setup(0x2000, &[0x02, 0x00]);
    host.vector(0xFFF4, 0x7300);
    assert_eq!(step(&mut cpu, &mut host), 7);
    assert_eq!(cpu.regs.pc, 0x7300);
    assert_eq!(pushed_return_address(&host), 0x2002);
}

#[test]
fn native_nmi_vector() {
    let (mut cpu, mut host) = setup_native(0x2000, &NOPS);
    host.vector(0xFFEA, 0x4000);
    host.load(0x4000, &NOPS);
    let restore = host.ctx.interrupts.register_source("restore");
    host.ctx.set_nmi(restore, true);
    host.ctx.clk = 10;

    assert_eq!(step(&mut cpu, &mut host), 8 + 2);
    assert_eq!(cpu.regs.pc, 0x4001);
}

#[test]
fn wai_sleeps_until_the_irq_is_recognised() {
    // WAI; NOP with I set: execution resumes after WAI.
    let (mut cpu, mut host) = setup(0x2000, &[0xCB, 0xEA]);
    let via = host.ctx.interrupts.register_source("via");
    host.irq_on_alarm = Some(via);
    let timer = host.ctx.alarms.register("timer");
    host.ctx.alarms.set(timer, 100);

    step(&mut cpu, &mut host);
    assert_eq!(host.ctx.clk, 3);
    assert!(cpu.is_waiting());

    step(&mut cpu, &mut host);
    assert_eq!(host.ctx.clk, 100, "skips ahead to the alarm");

    // The line goes active at 100 and is recognised two cycles later.
    step(&mut cpu, &mut host);
    assert_eq!(host.ctx.clk, 101);
    step(&mut cpu, &mut host);
    assert_eq!(host.ctx.clk, 102);
    assert!(cpu.is_waiting());

    step(&mut cpu, &mut host);
    assert!(!cpu.is_waiting());
    assert_eq!(host.ctx.clk, 104);
    assert_eq!(cpu.regs.pc, 0x2002);
    assert!(host.ctx.interrupts.is_pending(IRQ));
}

#[test]
fn wai_with_irq_enabled_takes_the_interrupt() {
    let (mut cpu, mut host) = setup(0x2000, &[0xCB]);
    cpu.regs.set_status(0);
    host.vector(0xFFFE, 0x3000);
    host.load(0x3000, &NOPS);
    let via = host.ctx.interrupts.register_source("via");
    host.ctx.set_irq(via, true);

    step(&mut cpu, &mut host);
    assert!(cpu.is_waiting());

    step(&mut cpu, &mut host);
    assert!(!cpu.is_waiting());
    assert_eq!(cpu.regs.pc, 0x3001);
    assert_eq!(pushed_return_address(&host), 0x2001);
}

#[test]
fn stp_halts_until_reset() {
    let (mut cpu, mut host) = setup(0x2000, &[0xDB]);
    cpu.regs.set_status(0);
    host.vector(0xFFFC, 0x8000);
    host.load(0x8000, &NOPS);
    let via = host.ctx.interrupts.register_source("via");

    assert_eq!(step(&mut cpu, &mut host), 3);
    assert!(cpu.is_stopped());
    assert_eq!(step(&mut cpu, &mut host), 1);

    host.ctx.set_irq(via, true);
    for _ in 0..4 {
        assert_eq!(step(&mut cpu, &mut host), 1);
    }
    assert!(cpu.is_stopped());
    assert_eq!(cpu.regs.pc, 0x2001);

    host.ctx.interrupts.trigger_reset();
    step(&mut cpu, &mut host);
    assert!(!cpu.is_stopped());
    assert_eq!(host.ctx.clk, 8);
    assert_eq!(cpu.regs.pc, 0x8001);
}

#[test]
fn consumed_cop_trap_skips_the_exception() {
    let (mut cpu, mut host) = trap_cpu(0x2000, &[0x02, 0x10, 0xEA]);
    host.trap = Some(|regs: &mut Registers65816| {
        regs.a = 0x42;
        regs.pc = regs.pc.wrapping_add(2);
        TrapDisposition::Consumed
    });

    assert_eq!(step(&mut cpu, &mut host), 7);
    assert_eq!(cpu.regs.a, 0x42);
    assert_eq!(cpu.regs.pc, 0x2002);
    assert_eq!(cpu.regs.sp, 0x01FF);
}

#[test]
fn cop_trap_can_resume_with_another_opcode() {
    let (mut cpu, mut host) = trap_cpu(0x2000, &[0x02, 0x10]);
    host.trap = Some(|_: &mut Registers65816| TrapDisposition::ResumeWithOpcode(0xEA));

    assert_eq!(step(&mut cpu, &mut host), 2);
    assert_eq!(cpu.regs.pc, 0x2001);
}

#[test]
fn cop_that_is_not_a_trap_runs_normally() {
    let (mut cpu, mut host) = trap_cpu(0x2000, &[0x02, 0x10]);
    host.trap = Some(|_: &mut Registers65816| TrapDisposition::NotATrap);

    assert_eq!(step(&mut cpu, &mut host), 7);
    assert_eq!(cpu.regs.pc, 0x6000);
}

#[test]
fn trap_request_runs_before_next_instruction() {
    let (mut cpu, mut host) = setup(0x2000, &NOPS);
    host.ctx.interrupts.trigger_trap(7);

    step(&mut cpu, &mut host);
    assert_eq!(host.trap_runs, vec![7]);
    assert_eq!(cpu.regs.a, 7);
    assert_eq!(cpu.regs.pc, 0x2001);
}

#[test]
fn dma_request_reaches_host() {
    let (mut cpu, mut host) = setup(0x2000, &NOPS);
    host.ctx.interrupts.trigger_dma();

    step(&mut cpu, &mut host);
    assert_eq!(host.dma_requests, 1);
    assert!(!host.ctx.interrupts.is_pending(DMA));
}
