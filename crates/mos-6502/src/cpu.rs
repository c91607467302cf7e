//! 6502 CPU implementation.
//!
//! One call to [`Mos6502::step`] runs one instruction, or one interrupt
//! sequence followed by one instruction. The clock advances by one for
//! every bus access and every internal cycle, so peripherals see each
//! access at the clock value it happens on.

use emu_core::{BankWindow, Cpu, Observable, Value};

use crate::context::{MONITOR_BREAK, MONITOR_STEP, MONITOR_WATCH};
use crate::flags::{B, C, D, I, N, V, Z};
use crate::interrupt::{DMA, IRQ, MONITOR, NMI, RESET, TRAP};
use crate::opcodes::{Access, DOCUMENTED, Mnemonic, Mode, NMOS, Opcode};
use crate::{CpuConfig, Host, JamAction, MonitorCheck, OpcodeInfo, Registers, TrapDisposition, Variant};

const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

/// BRK cycles after the opcode fetch, charged before the ROM trap hook runs.
const TRAP_CYCLES: emu_core::Clock = 6;

/// The MOS 6502/6510 CPU.
///
/// Owns only the register file and per-instruction state. The clock,
/// interrupt block and alarms live in the host's
/// [`CpuContext`](crate::CpuContext).
#[derive(Debug, Clone)]
pub struct Mos6502 {
    /// CPU registers.
    pub regs: Registers,

    /// Info word of the last executed instruction.
    opinfo: OpcodeInfo,

    config: CpuConfig,

    table: &'static [Opcode; 256],

    /// Side-effect-free fetch window around PC, if the host offers one.
    bank: Option<BankWindow>,

    /// Stuck on a JAM opcode until reset.
    jammed: bool,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    /// Create a 6510 with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CpuConfig::default())
    }

    #[must_use]
    pub fn with_config(config: CpuConfig) -> Self {
        let table = match config.variant {
            Variant::Mos6510 | Variant::Mos6502 => &NMOS,
            Variant::Documented => &DOCUMENTED,
        };
        Self {
            regs: Registers::new(),
            opinfo: OpcodeInfo::default(),
            config,
            table,
            bank: None,
            jammed: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CpuConfig {
        &self.config
    }

    /// Info word of the last executed instruction.
    #[must_use]
    pub fn opinfo(&self) -> OpcodeInfo {
        self.opinfo
    }

    pub(crate) fn set_opinfo(&mut self, opinfo: OpcodeInfo) {
        self.opinfo = opinfo;
    }

    /// Clear the jam latch and drop the fetch window (snapshot load).
    pub(crate) fn clear_transient(&mut self) {
        self.jammed = false;
        self.bank = None;
    }

    #[must_use]
    pub fn is_jammed(&self) -> bool {
        self.jammed
    }

    /// Drop the cached fetch window. Hosts call this after remapping
    /// memory.
    pub fn invalidate_bank(&mut self) {
        self.bank = None;
    }

    /// Reset the CPU and load PC from the reset vector.
    ///
    /// Pending interrupts and alarms are cleared (an attached monitor stays
    /// attached), then the host re-arms its peripherals.
    pub fn reset<H: Host + ?Sized>(&mut self, host: &mut H) {
        let ctx = host.context();
        ctx.interrupts.reinit();
        ctx.alarms.unset_all();
        ctx.clk = 6;
        log::debug!("{}: CPU reset", ctx.name());

        self.regs.sp = 0xFF;
        self.regs.p = crate::Status::from_byte(I);
        self.opinfo = OpcodeInfo::default();
        self.jammed = false;
        self.bank = None;

        host.reset_peripherals();
        let lo = host.read(u32::from(RESET_VECTOR));
        let hi = host.read(u32::from(RESET_VECTOR + 1));
        self.regs.pc = u16::from_le_bytes([lo, hi]);
    }

    /// Execute one instruction, including any interrupt dispatch that
    /// precedes it.
    pub fn step<H: Host + ?Sized>(&mut self, host: &mut H) {
        if let Some(sub) = host.context().prevent_clock_overflow() {
            host.clock_rebased(sub);
        }

        Self::serve_alarms(host);
        if host.context().interrupts.pending() != 0 {
            self.do_interrupt(host);
            Self::serve_alarms(host);
        }

        if self.jammed {
            host.context().clk += 1;
            return;
        }

        let pc = self.regs.pc;
        let opcode = self.fetch_opcode(host, pc);
        self.execute(host, opcode, pc);
    }

    /// Step until the clock reaches `clk`.
    pub fn run_until<H: Host + ?Sized>(&mut self, host: &mut H, clk: emu_core::Clock) {
        while host.context().clk < clk {
            self.step(host);
        }
    }

    fn serve_alarms<H: Host + ?Sized>(host: &mut H) {
        loop {
            let ctx = host.context();
            let clk = ctx.clk;
            let Some((alarm, offset)) = ctx.alarms.dispatch(clk) else {
                break;
            };
            host.serve_alarm(alarm, offset);
        }
    }

    // ========================================================================
    // Interrupts
    // ========================================================================

    fn do_interrupt<H: Host + ?Sized>(&mut self, host: &mut H) {
        let ctx = host.context();
        let pending = ctx.interrupts.pending();
        let clk = ctx.clk;

        if pending & (NMI | IRQ) != 0 && !self.jammed {
            let ints = &mut ctx.interrupts;
            if pending & NMI != 0 && ints.check_nmi_delay(clk, self.opinfo) {
                ints.ack_nmi();
                log::trace!("{}: NMI at ${:04X}", ctx.name(), self.regs.pc);
                self.interrupt_sequence(host, NMI_VECTOR);
            } else if pending & IRQ != 0
                && (!self.regs.p.is_set(I) || self.opinfo.disables_irq())
                && ints.check_irq_delay(clk, self.opinfo)
            {
                log::trace!("{}: IRQ at ${:04X}", ctx.name(), self.regs.pc);
                self.interrupt_sequence(host, IRQ_VECTOR);
            }
        }

        if pending & TRAP != 0 {
            if let Some(token) = host.context().interrupts.take_trap() {
                log::trace!("trap {token} at ${:04X}", self.regs.pc);
                host.run_trap(token, &mut self.regs);
                self.bank = None;
            }
        }
        if host.context().interrupts.is_pending(RESET) {
            host.context().interrupts.ack_reset();
            self.reset(host);
        }

        if pending & DMA != 0 {
            host.dma();
        }

        if pending & MONITOR != 0 {
            let mask = host.context().monitor_mask;
            if mask & MONITOR_BREAK != 0 {
                host.monitor(MonitorCheck::Breakpoint, &mut self.regs);
            }
            if mask & MONITOR_STEP != 0 {
                host.monitor(MonitorCheck::Step, &mut self.regs);
            }
            if mask & MONITOR_WATCH != 0 {
                host.monitor(MonitorCheck::Watchpoint, &mut self.regs);
            }
            self.bank = None;
        }
    }

    /// IRQ/NMI entry: two internal cycles, three pushes, vector fetch.
    fn interrupt_sequence<H: Host + ?Sized>(&mut self, host: &mut H, vector: u16) {
        self.idle(host);
        self.idle(host);
        self.regs.p.clear(B);
        let [lo, hi] = self.regs.pc.to_le_bytes();
        self.push(host, hi);
        self.push(host, lo);
        self.push(host, self.regs.status_byte());
        self.regs.p.set(I);
        let target = self.load_vector(host, vector);
        self.jump(target);
        self.opinfo = OpcodeInfo::default();
    }

    // ========================================================================
    // Bus access
    // ========================================================================

    fn idle<H: Host + ?Sized>(&mut self, host: &mut H) {
        host.context().clk += 1;
    }

    fn load<H: Host + ?Sized>(&mut self, host: &mut H, addr: u16) -> u8 {
        let addr = u32::from(addr);
        if host.context().watch().is_enabled() {
            host.watch_load(addr);
        }
        let value = host.read(addr);
        host.context().clk += 1;
        value
    }

    fn store<H: Host + ?Sized>(&mut self, host: &mut H, addr: u16, value: u8) {
        let addr = u32::from(addr);
        if host.context().watch().is_enabled() {
            host.watch_store(addr, value);
        }
        host.write(addr, value);
        host.context().clk += 1;
    }

    fn load_zero<H: Host + ?Sized>(&mut self, host: &mut H, addr: u8) -> u8 {
        if host.context().watch().is_enabled() {
            host.watch_load(u32::from(addr));
        }
        let value = host.read_zero(addr);
        host.context().clk += 1;
        value
    }

    fn store_zero<H: Host + ?Sized>(&mut self, host: &mut H, addr: u8, value: u8) {
        if host.context().watch().is_enabled() {
            host.watch_store(u32::from(addr), value);
        }
        host.write_zero(addr, value);
        host.context().clk += 1;
    }

    fn push<H: Host + ?Sized>(&mut self, host: &mut H, value: u8) {
        let addr = self.regs.push();
        self.store(host, addr, value);
    }

    fn pull<H: Host + ?Sized>(&mut self, host: &mut H) -> u8 {
        let addr = self.regs.pop();
        self.load(host, addr)
    }

    fn load_vector<H: Host + ?Sized>(&mut self, host: &mut H, vector: u16) -> u16 {
        let lo = self.load(host, vector);
        let hi = self.load(host, vector.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn jump(&mut self, target: u16) {
        self.regs.pc = target;
        self.bank = None;
    }

    /// Instruction-stream byte: from the fetch window when PC lies inside
    /// it, otherwise through the bus.
    fn fetch_byte<H: Host + ?Sized>(&mut self, host: &mut H, addr: u16) -> u8 {
        if let Some(window) = self.bank {
            if window.contains(u32::from(addr), 1) && !host.context().watch().is_enabled() {
                host.context().clk += 1;
                return host.peek(u32::from(addr));
            }
        }
        self.load(host, addr)
    }

    fn fetch_opcode<H: Host + ?Sized>(&mut self, host: &mut H, pc: u16) -> u8 {
        let stale = self
            .bank
            .is_none_or(|window| !window.contains(u32::from(pc), 1));
        if stale {
            self.bank = host.bank_window(u32::from(pc));
        }
        self.fetch_byte(host, pc)
    }

    // ========================================================================
    // Decode and dispatch
    // ========================================================================

    /// Run `opcode` as if it had been fetched at `pc`.
    fn execute<H: Host + ?Sized>(&mut self, host: &mut H, opcode: u8, pc: u16) {
        self.opinfo = OpcodeInfo::new(opcode);
        let entry = self.table[usize::from(opcode)];
        let operand = match entry.mode.len() {
            1 => 0,
            2 => u16::from(self.fetch_byte(host, pc.wrapping_add(1))),
            _ => {
                let lo = self.fetch_byte(host, pc.wrapping_add(1));
                let hi = self.fetch_byte(host, pc.wrapping_add(2));
                u16::from_le_bytes([lo, hi])
            }
        };
        self.regs.pc = pc.wrapping_add(entry.mode.len());

        match entry.mnemonic {
            Mnemonic::Brk => self.op_brk(host, pc),
            Mnemonic::Jam => self.op_jam(host, opcode, pc),
            Mnemonic::Jsr => self.op_jsr(host, operand),
            Mnemonic::Rts => self.op_rts(host),
            Mnemonic::Rti => self.op_rti(host),
            Mnemonic::Jmp => self.op_jmp(host, entry.mode, operand),
            Mnemonic::Pha => {
                self.idle(host);
                self.push(host, self.regs.a);
            }
            Mnemonic::Php => self.op_php(host),
            Mnemonic::Pla => {
                self.idle(host);
                self.idle(host);
                let value = self.pull(host);
                self.regs.lda(value);
            }
            Mnemonic::Plp => self.op_plp(host),
            Mnemonic::Bpl => self.op_branch(host, !self.regs.p.is_set(N), operand),
            Mnemonic::Bmi => self.op_branch(host, self.regs.p.is_set(N), operand),
            Mnemonic::Bvc => {
                self.sample_byte_ready(host);
                self.op_branch(host, !self.regs.p.is_set(V), operand);
            }
            Mnemonic::Bvs => {
                self.sample_byte_ready(host);
                self.op_branch(host, self.regs.p.is_set(V), operand);
            }
            Mnemonic::Bcc => self.op_branch(host, !self.regs.p.is_set(C), operand),
            Mnemonic::Bcs => self.op_branch(host, self.regs.p.is_set(C), operand),
            Mnemonic::Bne => self.op_branch(host, !self.regs.p.is_set(Z), operand),
            Mnemonic::Beq => self.op_branch(host, self.regs.p.is_set(Z), operand),
            m => self.execute_operation(host, m, entry.mode, operand),
        }
    }

    /// Everything that is not control flow: an implied operation, or an
    /// addressing mode feeding a read, write or read-modify-write handler.
    fn execute_operation<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        m: Mnemonic,
        mode: Mode,
        operand: u16,
    ) {
        match (mode, m.access()) {
            (Mode::Implied, _) => {
                self.idle(host);
                self.implied(host, m);
            }
            (Mode::Accumulator, _) => {
                self.idle(host);
                self.regs.a = self.modify(host, m, self.regs.a);
            }
            (Mode::Immediate, _) => self.read_op(host, m, operand as u8),
            (_, Access::Read) => {
                let addr = self.effective_address(host, mode, operand, Access::Read);
                if m == Mnemonic::Nop && matches!(mode, Mode::ZeroPage | Mode::ZeroPageX) {
                    // Undocumented zero-page NOPs do not touch the bus.
                    self.idle(host);
                    return;
                }
                let value = if is_zero_page(mode) {
                    self.load_zero(host, addr as u8)
                } else {
                    self.load(host, addr)
                };
                self.read_op(host, m, value);
            }
            (_, Access::Write) => {
                let addr = self.effective_address(host, mode, operand, Access::Write);
                let value = self.store_value(m, addr);
                if is_zero_page(mode) {
                    self.store_zero(host, addr as u8, value);
                } else {
                    self.store(host, addr, value);
                }
            }
            (_, Access::ReadModifyWrite) => {
                let addr = self.effective_address(host, mode, operand, Access::ReadModifyWrite);
                let old = if is_zero_page(mode) {
                    self.load_zero(host, addr as u8)
                } else {
                    self.load(host, addr)
                };
                let new = self.modify(host, m, old);
                // The unmodified value is written back first.
                self.store(host, addr, old);
                self.store(host, addr, new);
            }
            (_, Access::None) => self.idle(host),
        }
    }

    fn effective_address<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        mode: Mode,
        operand: u16,
        access: Access,
    ) -> u16 {
        match mode {
            Mode::ZeroPage => operand & 0x00FF,
            Mode::ZeroPageX => {
                self.idle(host);
                u16::from((operand as u8).wrapping_add(self.regs.x))
            }
            Mode::ZeroPageY => {
                self.idle(host);
                u16::from((operand as u8).wrapping_add(self.regs.y))
            }
            Mode::AbsoluteX => self.indexed(host, operand, self.regs.x, access),
            Mode::AbsoluteY => self.indexed(host, operand, self.regs.y, access),
            Mode::IndirectX => {
                self.idle(host);
                let ptr = (operand as u8).wrapping_add(self.regs.x);
                let lo = self.load_zero(host, ptr);
                let hi = self.load_zero(host, ptr.wrapping_add(1));
                u16::from_le_bytes([lo, hi])
            }
            Mode::IndirectY => {
                let ptr = operand as u8;
                let lo = self.load_zero(host, ptr);
                let hi = self.load_zero(host, ptr.wrapping_add(1));
                self.indexed(host, u16::from_le_bytes([lo, hi]), self.regs.y, access)
            }
            _ => operand,
        }
    }

    /// Indexed address. Reads pay the dummy access only on a page
    /// crossing; writes and RMW always pay it.
    fn indexed<H: Host + ?Sized>(&mut self, host: &mut H, base: u16, index: u8, access: Access) -> u16 {
        let addr = base.wrapping_add(u16::from(index));
        if access != Access::Read || (base ^ addr) & 0xFF00 != 0 {
            self.load(host, (base & 0xFF00) | (addr & 0x00FF));
        }
        addr
    }

    // ========================================================================
    // Operation handlers
    // ========================================================================

    fn implied<H: Host + ?Sized>(&mut self, host: &mut H, m: Mnemonic) {
        let r = &mut self.regs;
        match m {
            Mnemonic::Clc => r.p.clear(C),
            Mnemonic::Sec => r.p.set(C),
            Mnemonic::Cld => r.p.clear(D),
            Mnemonic::Sed => r.p.set(D),
            Mnemonic::Cli => {
                if r.p.is_set(I) {
                    self.opinfo.set_enables_irq();
                }
                r.p.clear(I);
            }
            Mnemonic::Sei => {
                if !r.p.is_set(I) {
                    self.opinfo.set_disables_irq();
                }
                r.p.set(I);
            }
            Mnemonic::Clv => {
                r.p.clear(V);
                self.ack_byte_ready(host);
            }
            Mnemonic::Tax => r.ldx(r.a),
            Mnemonic::Tay => r.ldy(r.a),
            Mnemonic::Txa => r.lda(r.x),
            Mnemonic::Tya => r.lda(r.y),
            Mnemonic::Tsx => r.ldx(r.sp),
            Mnemonic::Txs => r.sp = r.x,
            Mnemonic::Inx => r.x = r.inc(r.x),
            Mnemonic::Iny => r.y = r.inc(r.y),
            Mnemonic::Dex => r.x = r.dec(r.x),
            Mnemonic::Dey => r.y = r.dec(r.y),
            _ => {}
        }
    }

    fn read_op<H: Host + ?Sized>(&mut self, host: &mut H, m: Mnemonic, value: u8) {
        let r = &mut self.regs;
        match m {
            Mnemonic::Lda => r.lda(value),
            Mnemonic::Ldx => r.ldx(value),
            Mnemonic::Ldy => r.ldy(value),
            Mnemonic::Ora => r.ora(value),
            Mnemonic::And => r.and(value),
            Mnemonic::Eor => r.eor(value),
            Mnemonic::Adc => r.adc(value),
            Mnemonic::Sbc => r.sbc(value),
            Mnemonic::Cmp => r.compare(r.a, value),
            Mnemonic::Cpx => r.compare(r.x, value),
            Mnemonic::Cpy => r.compare(r.y, value),
            Mnemonic::Bit => r.bit(value),
            Mnemonic::Anc => r.anc(value),
            Mnemonic::Ane => r.ane(value, self.config.ane_magic),
            Mnemonic::Arr => r.arr(value),
            Mnemonic::Asr => r.asr(value),
            Mnemonic::Las => r.las(value),
            Mnemonic::Lax => r.lax(value),
            Mnemonic::Lxa => r.lxa(value, self.config.lxa_magic),
            Mnemonic::Sbx => r.sbx(value),
            _ => {}
        }
        if matches!(m, Mnemonic::Adc | Mnemonic::Sbc | Mnemonic::Bit | Mnemonic::Arr) {
            self.ack_byte_ready(host);
        }
    }

    fn modify<H: Host + ?Sized>(&mut self, host: &mut H, m: Mnemonic, value: u8) -> u8 {
        let r = &mut self.regs;
        let result = match m {
            Mnemonic::Asl => r.asl(value),
            Mnemonic::Lsr => r.lsr(value),
            Mnemonic::Rol => r.rol(value),
            Mnemonic::Ror => r.ror(value),
            Mnemonic::Inc => r.inc(value),
            Mnemonic::Dec => r.dec(value),
            Mnemonic::Slo => r.slo(value),
            Mnemonic::Rla => r.rla(value),
            Mnemonic::Sre => r.sre(value),
            Mnemonic::Rra => r.rra(value),
            Mnemonic::Dcp => r.dcp(value),
            Mnemonic::Isb => r.isb(value),
            _ => value,
        };
        if matches!(m, Mnemonic::Rra | Mnemonic::Isb) {
            self.ack_byte_ready(host);
        }
        result
    }

    /// Value written by a store-class opcode to `addr`.
    fn store_value(&mut self, m: Mnemonic, addr: u16) -> u8 {
        let r = &mut self.regs;
        // SHA/SHX/SHY/SHS mask with the high byte of the target plus one.
        let high = ((addr >> 8) as u8).wrapping_add(1);
        match m {
            Mnemonic::Sta => r.a,
            Mnemonic::Stx => r.x,
            Mnemonic::Sty => r.y,
            Mnemonic::Sax => r.a & r.x,
            Mnemonic::Sha => r.a & r.x & high,
            Mnemonic::Shx => r.x & high,
            Mnemonic::Shy => r.y & high,
            Mnemonic::Shs => {
                r.sp = r.a & r.x;
                r.a & r.x & high
            }
            _ => 0,
        }
    }

    fn op_branch<H: Host + ?Sized>(&mut self, host: &mut H, taken: bool, operand: u16) {
        if !taken {
            return;
        }
        let pc = self.regs.pc;
        let dest = pc.wrapping_add(i16::from(operand as u8 as i8) as u16);
        self.idle(host);
        if (pc ^ dest) & 0xFF00 != 0 {
            self.idle(host);
        } else {
            self.opinfo.set_delays_interrupt();
        }
        self.jump(dest);
    }

    fn op_jsr<H: Host + ?Sized>(&mut self, host: &mut H, target: u16) {
        self.idle(host);
        let [lo, hi] = self.regs.pc.wrapping_sub(1).to_le_bytes();
        self.push(host, hi);
        self.push(host, lo);
        self.jump(target);
    }

    fn op_rts<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.idle(host);
        self.idle(host);
        let lo = self.pull(host);
        let hi = self.pull(host);
        self.idle(host);
        self.jump(u16::from_le_bytes([lo, hi]).wrapping_add(1));
    }

    fn op_rti<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.idle(host);
        self.idle(host);
        let status = self.pull(host);
        self.regs.p = crate::Status::from_byte(status);
        let lo = self.pull(host);
        let hi = self.pull(host);
        self.jump(u16::from_le_bytes([lo, hi]));
        self.ack_byte_ready(host);
    }

    fn op_jmp<H: Host + ?Sized>(&mut self, host: &mut H, mode: Mode, operand: u16) {
        let target = if mode == Mode::Indirect {
            // The pointer high byte is read from the same page.
            let lo = self.load(host, operand);
            let hi = self.load(host, (operand & 0xFF00) | (operand.wrapping_add(1) & 0x00FF));
            u16::from_le_bytes([lo, hi])
        } else {
            operand
        };
        self.jump(target);
    }

    fn op_php<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.sample_byte_ready(host);
        self.idle(host);
        self.push(host, self.regs.status_byte() | B);
    }

    fn op_plp<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.idle(host);
        self.idle(host);
        let status = self.pull(host);
        let was_disabled = self.regs.p.is_set(I);
        if status & I == 0 && was_disabled {
            self.opinfo.set_enables_irq();
        } else if status & I != 0 && !was_disabled {
            self.opinfo.set_disables_irq();
        }
        self.regs.p = crate::Status::from_byte(status);
        self.ack_byte_ready(host);
    }

    fn op_brk<H: Host + ?Sized>(&mut self, host: &mut H, pc: u16) {
        if self.config.rom_traps {
            self.regs.pc = pc;
            host.context().clk += TRAP_CYCLES;
            match host.rom_trap(&mut self.regs) {
                TrapDisposition::NotATrap => {
                    host.context().clk -= TRAP_CYCLES;
                    self.regs.pc = pc.wrapping_add(1);
                }
                TrapDisposition::Consumed => {
                    log::trace!("ROM trap at ${pc:04X} consumed");
                    self.bank = None;
                    return;
                }
                TrapDisposition::ResumeWithOpcode(opcode) => {
                    log::trace!("ROM trap at ${pc:04X} resumes with ${opcode:02X}");
                    host.context().clk -= TRAP_CYCLES;
                    self.execute(host, opcode, pc);
                    return;
                }
            }
        }

        // The byte after BRK is skipped.
        self.idle(host);
        let [lo, hi] = pc.wrapping_add(2).to_le_bytes();
        self.push(host, hi);
        self.push(host, lo);
        self.regs.p.set(B);
        self.push(host, self.regs.status_byte());
        self.regs.p.set(I);
        let target = self.load_vector(host, IRQ_VECTOR);
        self.jump(target);
    }

    fn op_jam<H: Host + ?Sized>(&mut self, host: &mut H, opcode: u8, pc: u16) {
        self.regs.pc = pc;
        log::warn!("{}: JAM ${opcode:02X} at ${pc:04X}", host.context().name());
        match host.jam(opcode, &mut self.regs) {
            JamAction::Reset => host.machine_reset(false),
            JamAction::HardReset => host.machine_reset(true),
            JamAction::OpenMonitor => host.open_monitor(&mut self.regs),
            JamAction::BurnOneCycle => self.jammed = true,
        }
        self.bank = None;
    }

    // ========================================================================
    // Drive byte-ready (SO pin) quirk
    // ========================================================================

    fn byte_ready_quirk(&self) -> bool {
        self.config.variant == Variant::Mos6502
    }

    /// PHP/BVC/BVS see V set while the byte-ready line is active.
    fn sample_byte_ready<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.byte_ready_quirk() && host.byte_ready() {
            self.regs.p.set(V);
        }
    }

    /// Clearing V acknowledges byte-ready.
    fn ack_byte_ready<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.byte_ready_quirk() && !self.regs.p.is_set(V) {
            host.clear_byte_ready();
        }
    }
}

fn is_zero_page(mode: Mode) -> bool {
    matches!(mode, Mode::ZeroPage | Mode::ZeroPageX | Mode::ZeroPageY)
}

// ============================================================================
// Trait implementations
// ============================================================================

impl<H: Host + ?Sized> Cpu<H> for Mos6502 {
    type Registers = Registers;

    fn step(&mut self, host: &mut H) {
        Mos6502::step(self, host);
    }

    fn reset(&mut self, host: &mut H) {
        Mos6502::reset(self, host);
    }

    fn pc(&self) -> u32 {
        u32::from(self.regs.pc)
    }

    fn registers(&self) -> Self::Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.jammed
    }
}

impl Observable for Mos6502 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "sp" => Some(self.regs.sp.into()),
            "p" => Some(self.regs.status_byte().into()),
            "flags.c" => Some(self.regs.p.is_set(C).into()),
            "flags.z" => Some(self.regs.p.is_set(Z).into()),
            "flags.i" => Some(self.regs.p.is_set(I).into()),
            "flags.d" => Some(self.regs.p.is_set(D).into()),
            "flags.b" => Some(self.regs.p.is_set(B).into()),
            "flags.v" => Some(self.regs.p.is_set(V).into()),
            "flags.n" => Some(self.regs.p.is_set(N).into()),
            "opinfo" => Some(self.opinfo.raw().into()),
            "halted" => Some(self.jammed.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "a", "x", "y", "sp", "p", "flags.c", "flags.z", "flags.i", "flags.d", "flags.b",
            "flags.v", "flags.n", "opinfo", "halted",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuContext;
    use emu_core::{BankWindow, Bus, SimpleBus};

    struct TestHost {
        bus: SimpleBus,
        ctx: CpuContext,
    }

    impl Bus for TestHost {
        fn read(&mut self, address: u32) -> u8 {
            self.bus.read(address)
        }
        fn write(&mut self, address: u32, value: u8) {
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
    }

    fn host() -> TestHost {
        TestHost {
            bus: SimpleBus::new(),
            ctx: CpuContext::new("test"),
        }
    }

    #[test]
    fn test_lda_immediate() {
        let mut cpu = Mos6502::new();
        let mut host = host();
        host.bus.load(0x0000, &[0xA9, 0x42]);
        cpu.regs.pc = 0x0000;

        cpu.step(&mut host);

        assert_eq!(cpu.regs.a, 0x42);
        assert_eq!(cpu.regs.pc, 0x0002);
        assert_eq!(host.ctx.clk, 2);
    }

    #[test]
    fn test_sta_zeropage() {
        let mut cpu = Mos6502::new();
        let mut host = host();
        cpu.regs.a = 0x55;
        host.bus.load(0x0000, &[0x85, 0x10]);
        cpu.regs.pc = 0x0000;

        cpu.step(&mut host);

        assert_eq!(host.bus.peek(0x0010), 0x55);
        assert_eq!(host.ctx.clk, 3);
    }

    #[test]
    fn test_jmp_indirect_page_wrap() {
        let mut cpu = Mos6502::new();
        let mut host = host();
        host.bus.load(0x0000, &[0x6C, 0xFF, 0x10]);
        host.bus.load(0x10FF, &[0x34]);
        host.bus.load(0x1000, &[0x12]);
        host.bus.load(0x1100, &[0x99]);

        cpu.step(&mut host);

        assert_eq!(cpu.regs.pc, 0x1234);
        assert_eq!(host.ctx.clk, 5);
    }

    #[test]
    fn sha_masks_with_target_high_byte_plus_one() {
        let mut cpu = Mos6502::new();
        let mut host = host();
        cpu.regs.a = 0xFF;
        cpu.regs.x = 0xFF;
        cpu.regs.y = 0x10;
        // SHA $3000,Y
        host.bus.load(0x0200, &[0x9F, 0x00, 0x30]);
        cpu.regs.pc = 0x0200;

        cpu.step(&mut host);

        assert_eq!(host.bus.peek(0x3010), 0x31);
        assert_eq!(host.ctx.clk, 5);
    }

    #[test]
    fn jam_burns_one_cycle_per_step() {
        let mut cpu = Mos6502::new();
        let mut host = host();
        host.bus.load(0x0400, &[0x02]);
        cpu.regs.pc = 0x0400;

        cpu.step(&mut host);
        assert!(cpu.is_jammed());
        assert_eq!(cpu.regs.pc, 0x0400);
        assert_eq!(host.ctx.clk, 1);

        cpu.step(&mut host);
        assert_eq!(host.ctx.clk, 2);
        assert_eq!(cpu.regs.pc, 0x0400);
    }

    #[test]
    fn documented_variant_jams_on_lax() {
        let mut cpu = Mos6502::with_config(CpuConfig {
            variant: Variant::Documented,
            ..CpuConfig::default()
        });
        let mut host = host();
        host.bus.load(0x0200, &[0xA7, 0x10]);
        cpu.regs.pc = 0x0200;

        cpu.step(&mut host);
        assert!(cpu.is_jammed());
    }

    #[test]
    fn observable_reports_registers() {
        let mut cpu = Mos6502::new();
        cpu.regs.a = 0x12;
        cpu.regs.pc = 0xC000;
        assert_eq!(cpu.query("a"), Some(Value::U8(0x12)));
        assert_eq!(cpu.query("pc"), Some(Value::U16(0xC000)));
        assert_eq!(cpu.query("flags.i"), Some(Value::Bool(true)));
        assert_eq!(cpu.query("nope"), None);
    }
}
