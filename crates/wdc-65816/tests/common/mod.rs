//! Shared 16 MB test host for the 65C816 integration tests.

#![allow(dead_code)]

use emu_core::{AlarmId, BankWindow, Bus, Clock, SimpleBus};
use mos_6502::{CpuContext, Host, InterruptSource, TrapDisposition};
use wdc_65816::{Cpu65816, Registers65816};

pub struct TestHost {
    pub bus: SimpleBus,
    pub ctx: CpuContext,
    pub reads: Vec<u32>,
    pub writes: Vec<(u32, u8)>,
    /// Raised when any alarm is served.
    pub irq_on_alarm: Option<InterruptSource>,
    pub trap: Option<fn(&mut Registers65816) -> TrapDisposition>,
    pub trap_runs: Vec<u32>,
    pub dma_requests: u32,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            bus: SimpleBus::with_address_bits(24),
            ctx: CpuContext::new("65816"),
            reads: Vec::new(),
            writes: Vec::new(),
            irq_on_alarm: None,
            trap: None,
            trap_runs: Vec::new(),
            dma_requests: 0,
        }
    }

    pub fn peek(&self, addr: u32) -> u8 {
        self.bus.peek(addr)
    }

    pub fn load(&mut self, addr: u32, data: &[u8]) {
        self.bus.load(addr, data);
    }

    /// Point a bank-0 vector at `target`.
    pub fn vector(&mut self, vector: u16, target: u16) {
        self.load(u32::from(vector), &target.to_le_bytes());
    }
}

impl Bus for TestHost {
    fn read(&mut self, address: u32) -> u8 {
        self.reads.push(address);
        self.bus.read(address)
    }

    fn write(&mut self, address: u32, value: u8) {
        self.writes.push((address, value));
        self.bus.write(address, value);
    }

    fn bank_window(&self, address: u32) -> Option<BankWindow> {
        self.bus.bank_window(address)
    }

    fn peek(&self, address: u32) -> u8 {
        self.bus.peek(address)
    }
}

impl Host<Registers65816> for TestHost {
    fn context(&mut self) -> &mut CpuContext {
        &mut self.ctx
    }

    fn serve_alarm(&mut self, _alarm: AlarmId, _offset: Clock) {
        if let Some(source) = self.irq_on_alarm {
            self.ctx.set_irq(source, true);
        }
    }

    fn rom_trap(&mut self, regs: &mut Registers65816) -> TrapDisposition {
        match self.trap {
            Some(handler) => handler(regs),
            None => TrapDisposition::NotATrap,
        }
    }

    fn run_trap(&mut self, token: u32, regs: &mut Registers65816) {
        self.trap_runs.push(token);
        regs.a = token as u16;
    }

    fn dma(&mut self) {
        self.dma_requests += 1;
        self.ctx.interrupts.ack_dma();
    }
}

/// Emulation-mode CPU with `program` at bank 0 `origin`.
pub fn setup(origin: u16, program: &[u8]) -> (Cpu65816, TestHost) {
    let mut host = TestHost::new();
    host.load(u32::from(origin), program);
    let mut cpu = Cpu65816::new();
    cpu.regs.pc = origin;
    (cpu, host)
}

/// Native-mode CPU with 16-bit accumulator and index registers.
pub fn setup_native(origin: u16, program: &[u8]) -> (Cpu65816, TestHost) {
    let (mut cpu, host) = setup(origin, program);
    cpu.regs.enter_native();
    cpu.regs.set_status(0);
    (cpu, host)
}

/// Step once and return the cycles it took.
pub fn step(cpu: &mut Cpu65816, host: &mut TestHost) -> Clock {
    let start = host.ctx.clk;
    cpu.step(host);
    host.ctx.clk - start
}
