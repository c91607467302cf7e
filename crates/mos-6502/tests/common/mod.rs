//! Shared test host for the integration tests.

#![allow(dead_code)]

use emu_core::{AlarmId, BankWindow, Bus, Clock, SimpleBus};
use mos_6502::{CpuContext, Host, MonitorCheck, Mos6502, Registers, TrapDisposition};

/// Flat 64K machine that records every store and hook call.
pub struct TestHost {
    pub bus: SimpleBus,
    pub ctx: CpuContext,
    pub writes: Vec<(u16, u8)>,
    pub served: Vec<(AlarmId, Clock)>,
    pub monitor_calls: Vec<MonitorCheck>,
    pub watched: Vec<(u16, Option<u8>)>,
    pub trap: Option<fn(&mut Registers) -> TrapDisposition>,
    pub trap_runs: Vec<u32>,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            bus: SimpleBus::new(),
            ctx: CpuContext::new("test"),
            writes: Vec::new(),
            served: Vec::new(),
            monitor_calls: Vec::new(),
            watched: Vec::new(),
            trap: None,
            trap_runs: Vec::new(),
        }
    }

    pub fn peek(&self, addr: u16) -> u8 {
        self.bus.peek(u32::from(addr))
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        self.bus.load(u32::from(addr), data);
    }

    /// Point a vector at `target`.
    pub fn vector(&mut self, vector: u16, target: u16) {
        self.load(vector, &target.to_le_bytes());
    }
}

impl Bus for TestHost {
    fn read(&mut self, address: u32) -> u8 {
        self.bus.read(address)
    }

    fn write(&mut self, address: u32, value: u8) {
        self.writes.push((address as u16, value));
        self.bus.write(address, value);
    }

    fn bank_window(&self, address: u32) -> Option<BankWindow> {
        self.bus.bank_window(address)
    }

    fn peek(&self, address: u32) -> u8 {
        self.bus.peek(address)
    }
}

impl Host for TestHost {
    fn context(&mut self) -> &mut CpuContext {
        &mut self.ctx
    }

    fn serve_alarm(&mut self, alarm: AlarmId, offset: Clock) {
        self.served.push((alarm, offset));
    }

    fn rom_trap(&mut self, regs: &mut Registers) -> TrapDisposition {
        match self.trap {
            Some(handler) => handler(regs),
            None => TrapDisposition::NotATrap,
        }
    }

    fn run_trap(&mut self, token: u32, regs: &mut Registers) {
        self.trap_runs.push(token);
        regs.a = token as u8;
    }

    fn monitor(&mut self, check: MonitorCheck, _regs: &mut Registers) {
        self.monitor_calls.push(check);
    }

    fn watch_load(&mut self, addr: u32) {
        self.watched.push((addr as u16, None));
    }

    fn watch_store(&mut self, addr: u32, value: u8) {
        self.watched.push((addr as u16, Some(value)));
    }
}

/// Load a program at `origin` and point PC at it.
pub fn setup(origin: u16, program: &[u8]) -> (Mos6502, TestHost) {
    let mut host = TestHost::new();
    host.load(origin, program);
    let mut cpu = Mos6502::new();
    cpu.regs.pc = origin;
    (cpu, host)
}

/// Step once and return the cycles it took.
pub fn step(cpu: &mut Mos6502, host: &mut TestHost) -> Clock {
    let start = host.ctx.clk;
    cpu.step(host);
    host.ctx.clk - start
}
