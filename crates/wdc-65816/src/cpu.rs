//! 65C816 CPU implementation.
//!
//! Built on the same model as the 6502 core: one call to
//! [`Cpu65816::step`] runs one instruction (or one interrupt sequence and
//! one instruction), and every bus access or internal cycle advances the
//! host clock by one. Widths follow the M and X flags; emulation mode
//! keeps the 6502 stack, vectors and direct-page wrapping.

use emu_core::{BankWindow, CLOCK_MAX, Cpu, Observable, Value};
use mos_6502::flags::{B, C, D, I, N, V, Z};
use mos_6502::interrupt::{DMA, IRQ, MONITOR, NMI, RESET, TRAP};
use mos_6502::{Host, MONITOR_BREAK, MONITOR_STEP, MONITOR_WATCH, MonitorCheck, OpcodeInfo, TrapDisposition};

use crate::opcodes::{Access, Mnemonic, Mode, OPCODES};
use crate::registers::{M, X};
use crate::{Cpu65816Config, Registers65816};

/// Cycles charged for the reset sequence.
const RESET_CYCLES: emu_core::Clock = 6;
/// COP cycles after the opcode fetch, charged before the ROM trap hook runs.
const TRAP_CYCLES: emu_core::Clock = 6;

const RESET_VECTOR: u16 = 0xFFFC;

/// Interrupt and exception vectors for one mode.
struct Vectors {
    cop: u16,
    brk: u16,
    nmi: u16,
    irq: u16,
}

const NATIVE_VECTORS: Vectors = Vectors {
    cop: 0xFFE4,
    brk: 0xFFE6,
    nmi: 0xFFEA,
    irq: 0xFFEE,
};

const EMULATION_VECTORS: Vectors = Vectors {
    cop: 0xFFF4,
    brk: 0xFFFE,
    nmi: 0xFFFA,
    irq: 0xFFFE,
};

/// Effective address of a data operand.
#[derive(Debug, Clone, Copy)]
enum Target {
    /// Bank-0 address (direct page, stack): the high byte of a 16-bit
    /// operand wraps within the bank.
    Bank0(u16),
    /// 24-bit address: a 16-bit operand may cross into the next bank.
    Long(u32),
}

impl Target {
    fn addr(self) -> u32 {
        match self {
            Target::Bank0(addr) => u32::from(addr),
            Target::Long(addr) => addr,
        }
    }

    fn next(self) -> Self {
        match self {
            Target::Bank0(addr) => Target::Bank0(addr.wrapping_add(1)),
            Target::Long(addr) => Target::Long(addr.wrapping_add(1) & 0x00FF_FFFF),
        }
    }
}

/// The WDC 65C816 (or 65C802) CPU.
#[derive(Debug, Clone)]
pub struct Cpu65816 {
    pub regs: Registers65816,

    /// Info word of the last executed instruction.
    opinfo: OpcodeInfo,

    config: Cpu65816Config,

    /// Side-effect-free fetch window around PBR:PC.
    bank: Option<BankWindow>,

    /// Halted by WAI until an interrupt arrives.
    waiting: bool,

    /// Halted by STP until reset.
    stopped: bool,
}

impl Default for Cpu65816 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu65816 {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Cpu65816Config::default())
    }

    #[must_use]
    pub fn with_config(config: Cpu65816Config) -> Self {
        Self {
            regs: Registers65816::new(),
            opinfo: OpcodeInfo::default(),
            config,
            bank: None,
            waiting: false,
            stopped: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Cpu65816Config {
        &self.config
    }

    #[must_use]
    pub fn opinfo(&self) -> OpcodeInfo {
        self.opinfo
    }

    pub(crate) fn set_opinfo(&mut self, opinfo: OpcodeInfo) {
        self.opinfo = opinfo;
    }

    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub(crate) fn set_halt_state(&mut self, waiting: bool, stopped: bool) {
        self.waiting = waiting;
        self.stopped = stopped;
        self.bank = None;
    }

    /// Drop the cached fetch window after the host remapped memory.
    pub fn invalidate_bank(&mut self) {
        self.bank = None;
    }

    /// Reset into emulation mode and load PC from $00:FFFC.
    pub fn reset<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H) {
        let ctx = host.context();
        ctx.interrupts.reinit();
        ctx.alarms.unset_all();
        ctx.clk = RESET_CYCLES;
        log::debug!("{}: 65816 reset", ctx.name());

        self.regs.enter_emulation();
        self.regs.p.set(I);
        self.regs.p.clear(D);
        self.regs.d = 0;
        self.regs.dbr = 0;
        self.regs.pbr = 0;
        self.opinfo = OpcodeInfo::default();
        self.waiting = false;
        self.stopped = false;
        self.bank = None;

        host.reset_peripherals();
        let lo = host.read(u32::from(RESET_VECTOR));
        let hi = host.read(u32::from(RESET_VECTOR + 1));
        self.regs.pc = u16::from_le_bytes([lo, hi]);
    }

    /// Execute one instruction, including any interrupt dispatch that
    /// precedes it. A CPU halted by WAI or STP advances to its next event
    /// instead.
    pub fn step<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H) {
        if let Some(sub) = host.context().prevent_clock_overflow() {
            host.clock_rebased(sub);
        }

        Self::serve_alarms(host);
        if self.waiting {
            let (wake, delayed) = self.wake_pending(host);
            if !wake {
                Self::sleep(host, delayed);
                return;
            }
            self.waiting = false;
        }

        if host.context().interrupts.pending() != 0 {
            self.do_interrupt(host);
            Self::serve_alarms(host);
        }

        if self.stopped {
            Self::sleep(host, false);
            return;
        }

        let pc = self.regs.pc;
        let opcode = self.fetch_opcode(host, pc);
        self.execute(host, opcode, pc);
    }

    /// Step until the clock reaches `clk`.
    pub fn run_until<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, clk: emu_core::Clock) {
        while host.context().clk < clk {
            self.step(host);
        }
    }

    fn serve_alarms<H: Host<Registers65816> + ?Sized>(host: &mut H) {
        loop {
            let ctx = host.context();
            let clk = ctx.clk;
            let Some((alarm, offset)) = ctx.alarms.dispatch(clk) else {
                break;
            };
            host.serve_alarm(alarm, offset);
        }
    }

    /// Would a pending line end WAI now? The second value reports a line
    /// that is pending but still inside its recognition delay.
    fn wake_pending<H: Host<Registers65816> + ?Sized>(&self, host: &mut H) -> (bool, bool) {
        let ctx = host.context();
        let ints = &ctx.interrupts;
        let pending = ints.pending();
        let clk = ctx.clk;
        if pending & RESET != 0 {
            return (true, false);
        }
        let mut delayed = false;
        if pending & NMI != 0 {
            if ints.check_nmi_delay(clk, self.opinfo) {
                return (true, false);
            }
            delayed = true;
        }
        // IRQ ends WAI even with I set; execution then continues after it.
        if pending & IRQ != 0 {
            if ints.check_irq_delay(clk, self.opinfo) {
                return (true, false);
            }
            delayed = true;
        }
        (false, delayed)
    }

    /// Advance a halted CPU to its next alarm, or by one cycle.
    fn sleep<H: Host<Registers65816> + ?Sized>(host: &mut H, single: bool) {
        let ctx = host.context();
        let next = ctx.alarms.next_pending_clock();
        ctx.clk = if single || next == CLOCK_MAX || next <= ctx.clk {
            ctx.clk + 1
        } else {
            next
        };
    }

    // ========================================================================
    // Interrupts
    // ========================================================================

    fn vectors(&self) -> &'static Vectors {
        if self.regs.emulation {
            &EMULATION_VECTORS
        } else {
            &NATIVE_VECTORS
        }
    }

    fn do_interrupt<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H) {
        let ctx = host.context();
        let pending = ctx.interrupts.pending();
        let clk = ctx.clk;

        if pending & (NMI | IRQ) != 0 && !self.stopped {
            let ints = &mut ctx.interrupts;
            if pending & NMI != 0 && ints.check_nmi_delay(clk, self.opinfo) {
                ints.ack_nmi();
                log::trace!("{}: NMI at {:06X}", ctx.name(), self.regs.pc24());
                let vector = self.vectors().nmi;
                self.interrupt_sequence(host, vector);
            } else if pending & IRQ != 0
                && (!self.regs.p.is_set(I) || self.opinfo.disables_irq())
                && ints.check_irq_delay(clk, self.opinfo)
            {
                log::trace!("{}: IRQ at {:06X}", ctx.name(), self.regs.pc24());
                let vector = self.vectors().irq;
                self.interrupt_sequence(host, vector);
            }
        }

        if pending & TRAP != 0 {
            if let Some(token) = host.context().interrupts.take_trap() {
                log::trace!("trap {token} at {:06X}", self.regs.pc24());
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

    /// IRQ/NMI entry: two internal cycles, then the exception frame.
    fn interrupt_sequence<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, vector: u16) {
        self.idle(host);
        self.idle(host);
        let status = self.regs.interrupt_status_byte();
        self.exception(host, self.regs.pc, status, vector);
        self.opinfo = OpcodeInfo::default();
    }

    /// Push the return frame (PBR only in native mode), mask IRQ, clear
    /// decimal mode and jump through a bank-0 vector.
    fn exception<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, ret: u16, status: u8, vector: u16) {
        if !self.regs.emulation {
            self.push(host, self.regs.pbr);
        }
        self.push16(host, ret);
        self.push(host, status);
        self.regs.p.set(I);
        self.regs.p.clear(D);
        let lo = self.load(host, u32::from(vector));
        let hi = self.load(host, u32::from(vector.wrapping_add(1)));
        self.jump_long(0, u16::from_le_bytes([lo, hi]));
    }

    // ========================================================================
    // Bus access
    // ========================================================================

    fn idle<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H) {
        host.context().clk += 1;
    }

    fn load<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, addr: u32) -> u8 {
        let addr = addr & self.config.address_mask();
        if host.context().watch().is_enabled() {
            host.watch_load(addr);
        }
        let value = host.read(addr);
        host.context().clk += 1;
        value
    }

    fn store<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, addr: u32, value: u8) {
        let addr = addr & self.config.address_mask();
        if host.context().watch().is_enabled() {
            host.watch_store(addr, value);
        }
        host.write(addr, value);
        host.context().clk += 1;
    }

    fn load_target<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, target: Target, wide: bool) -> u16 {
        let lo = self.load(host, target.addr());
        if !wide {
            return u16::from(lo);
        }
        let hi = self.load(host, target.next().addr());
        u16::from_le_bytes([lo, hi])
    }

    fn store_target<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, target: Target, value: u16, wide: bool) {
        let [lo, hi] = value.to_le_bytes();
        self.store(host, target.addr(), lo);
        if wide {
            self.store(host, target.next().addr(), hi);
        }
    }

    fn push<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, value: u8) {
        let addr = self.regs.push();
        self.store(host, u32::from(addr), value);
    }

    fn push16<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.push(host, hi);
        self.push(host, lo);
    }

    /// Push A, X or Y at the given width.
    fn push_sized<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, value: u16, wide: bool) {
        if wide {
            self.push16(host, value);
        } else {
            self.push(host, value as u8);
        }
    }

    fn pull<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H) -> u8 {
        let addr = self.regs.pull();
        self.load(host, u32::from(addr))
    }

    fn pull16<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H) -> u16 {
        let lo = self.pull(host);
        let hi = self.pull(host);
        u16::from_le_bytes([lo, hi])
    }

    fn pull_sized<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, wide: bool) -> u16 {
        if wide {
            self.pull16(host)
        } else {
            u16::from(self.pull(host))
        }
    }

    fn jump(&mut self, target: u16) {
        self.regs.pc = target;
        self.bank = None;
    }

    fn jump_long(&mut self, bank: u8, target: u16) {
        self.regs.pbr = bank;
        self.jump(target);
    }

    /// Instruction-stream byte at PBR:`addr`.
    fn fetch_byte<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, addr: u16) -> u8 {
        let full = ((u32::from(self.regs.pbr) << 16) | u32::from(addr)) & self.config.address_mask();
        if let Some(window) = self.bank {
            if window.contains(full, 1) && !host.context().watch().is_enabled() {
                host.context().clk += 1;
                return host.peek(full);
            }
        }
        self.load(host, full)
    }

    fn fetch_opcode<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, pc: u16) -> u8 {
        let full = ((u32::from(self.regs.pbr) << 16) | u32::from(pc)) & self.config.address_mask();
        let stale = self.bank.is_none_or(|window| !window.contains(full, 1));
        if stale {
            self.bank = host.bank_window(full);
        }
        self.fetch_byte(host, pc)
    }

    fn fetch_operand<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, pc: u16, len: u16) -> u32 {
        let mut operand = 0;
        for i in 0..len {
            let byte = self.fetch_byte(host, pc.wrapping_add(1 + i));
            operand |= u32::from(byte) << (8 * i);
        }
        operand
    }

    // ========================================================================
    // Addressing
    // ========================================================================

    fn data_bank(&self) -> u32 {
        u32::from(self.regs.dbr) << 16
    }

    /// Direct page with a non-zero low byte costs one cycle.
    fn direct_penalty<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H) {
        if self.regs.d & 0x00FF != 0 {
            self.idle(host);
        }
    }

    /// Emulation mode with a page-aligned direct page keeps indexing and
    /// pointers inside that page.
    fn direct_wraps(&self) -> bool {
        self.regs.emulation && self.regs.d & 0x00FF == 0
    }

    fn direct<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, offset: u8) -> u16 {
        self.direct_penalty(host);
        self.regs.d.wrapping_add(u16::from(offset))
    }

    fn direct_indexed<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, offset: u8, index: u16) -> u16 {
        self.direct_penalty(host);
        self.idle(host);
        if self.direct_wraps() {
            self.regs.d | u16::from(offset.wrapping_add(index as u8))
        } else {
            self.regs.d.wrapping_add(u16::from(offset)).wrapping_add(index)
        }
    }

    /// Read a 16-bit pointer from the direct page.
    fn direct_pointer<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, addr: u16) -> u16 {
        let lo = self.load(host, u32::from(addr));
        let next = if self.direct_wraps() {
            (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF)
        } else {
            addr.wrapping_add(1)
        };
        let hi = self.load(host, u32::from(next));
        u16::from_le_bytes([lo, hi])
    }

    /// Read a 24-bit pointer from bank 0.
    fn long_pointer<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, addr: u16) -> u32 {
        let lo = self.load(host, u32::from(addr));
        let mid = self.load(host, u32::from(addr.wrapping_add(1)));
        let bank = self.load(host, u32::from(addr.wrapping_add(2)));
        u32::from_le_bytes([lo, mid, bank, 0])
    }

    fn effective_address<H: Host<Registers65816> + ?Sized>(
        &mut self,
        host: &mut H,
        mode: Mode,
        operand: u32,
        access: Access,
    ) -> Target {
        let op8 = operand as u8;
        let op16 = operand as u16;
        match mode {
            Mode::Direct => Target::Bank0(self.direct(host, op8)),
            Mode::DirectX => Target::Bank0(self.direct_indexed(host, op8, self.regs.x)),
            Mode::DirectY => Target::Bank0(self.direct_indexed(host, op8, self.regs.y)),
            Mode::DirectIndirect => {
                let ptr = self.direct(host, op8);
                let addr = self.direct_pointer(host, ptr);
                Target::Long(self.data_bank() | u32::from(addr))
            }
            Mode::DirectXIndirect => {
                let ptr = self.direct_indexed(host, op8, self.regs.x);
                let addr = self.direct_pointer(host, ptr);
                Target::Long(self.data_bank() | u32::from(addr))
            }
            Mode::DirectIndirectY => {
                let ptr = self.direct(host, op8);
                let base = self.direct_pointer(host, ptr);
                Target::Long(self.indexed(host, self.data_bank() | u32::from(base), self.regs.y, access))
            }
            Mode::DirectIndirectLong => {
                let ptr = self.direct(host, op8);
                Target::Long(self.long_pointer(host, ptr))
            }
            Mode::DirectIndirectLongY => {
                let ptr = self.direct(host, op8);
                let base = self.long_pointer(host, ptr);
                Target::Long(base.wrapping_add(u32::from(self.regs.y)) & 0x00FF_FFFF)
            }
            Mode::StackRelative => {
                self.idle(host);
                Target::Bank0(self.regs.sp.wrapping_add(u16::from(op8)))
            }
            Mode::StackRelativeIndirectY => {
                self.idle(host);
                let ptr = self.regs.sp.wrapping_add(u16::from(op8));
                let lo = self.load(host, u32::from(ptr));
                let hi = self.load(host, u32::from(ptr.wrapping_add(1)));
                self.idle(host);
                let base = self.data_bank() | u32::from(u16::from_le_bytes([lo, hi]));
                Target::Long(base.wrapping_add(u32::from(self.regs.y)) & 0x00FF_FFFF)
            }
            Mode::AbsoluteX => {
                Target::Long(self.indexed(host, self.data_bank() | u32::from(op16), self.regs.x, access))
            }
            Mode::AbsoluteY => {
                Target::Long(self.indexed(host, self.data_bank() | u32::from(op16), self.regs.y, access))
            }
            Mode::AbsoluteLong => Target::Long(operand),
            Mode::AbsoluteLongX => Target::Long(operand.wrapping_add(u32::from(self.regs.x)) & 0x00FF_FFFF),
            _ => Target::Long(self.data_bank() | u32::from(op16)),
        }
    }

    /// Indexed address with the extra cycle taken on 16-bit index
    /// registers, on writes and RMW, and on a page crossing. In emulation
    /// mode that cycle re-reads the unfixed address like a 6502.
    fn indexed<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, base: u32, index: u16, access: Access) -> u32 {
        let addr = base.wrapping_add(u32::from(index)) & 0x00FF_FFFF;
        if !self.regs.x8() || access != Access::Read || (base ^ addr) & 0xFFFF_FF00 != 0 {
            if self.regs.emulation {
                self.load(host, (base & 0x00FF_FF00) | (addr & 0x0000_00FF));
            } else {
                self.idle(host);
            }
        }
        addr
    }

    // ========================================================================
    // Decode and dispatch
    // ========================================================================

    fn execute<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, opcode: u8, pc: u16) {
        self.opinfo = OpcodeInfo::new(opcode);
        let entry = OPCODES[usize::from(opcode)];
        let len = entry.mode.operand_len(self.regs.m8(), self.regs.x8());

        // These interleave their operand fetches with other bus cycles.
        let deferred = matches!(entry.mnemonic, Mnemonic::Jsl | Mnemonic::Cop)
            || (entry.mnemonic == Mnemonic::Jsr && entry.mode == Mode::AbsoluteXIndirect);
        let operand = if deferred {
            0
        } else {
            self.fetch_operand(host, pc, len)
        };
        self.regs.pc = pc.wrapping_add(1 + len);

        match entry.mnemonic {
            Mnemonic::Brk => {
                let status = self.regs.status_byte() | if self.regs.emulation { B } else { 0 };
                let vector = self.vectors().brk;
                self.exception(host, self.regs.pc, status, vector);
            }
            Mnemonic::Cop => self.op_cop(host, pc),
            Mnemonic::Jsr => self.op_jsr(host, entry.mode, operand, pc),
            Mnemonic::Jsl => self.op_jsl(host, pc),
            Mnemonic::Rts => {
                self.idle(host);
                self.idle(host);
                let ret = self.pull16(host);
                self.idle(host);
                self.jump(ret.wrapping_add(1));
            }
            Mnemonic::Rtl => {
                self.idle(host);
                self.idle(host);
                let ret = self.pull16(host);
                let bank = self.pull(host);
                self.jump_long(bank, ret.wrapping_add(1));
            }
            Mnemonic::Rti => self.op_rti(host),
            Mnemonic::Jmp => self.op_jmp(host, entry.mode, operand),
            Mnemonic::Jml => self.op_jml(host, entry.mode, operand),
            Mnemonic::Bpl => self.op_branch(host, !self.regs.p.is_set(N), operand),
            Mnemonic::Bmi => self.op_branch(host, self.regs.p.is_set(N), operand),
            Mnemonic::Bvc => self.op_branch(host, !self.regs.p.is_set(V), operand),
            Mnemonic::Bvs => self.op_branch(host, self.regs.p.is_set(V), operand),
            Mnemonic::Bcc => self.op_branch(host, !self.regs.p.is_set(C), operand),
            Mnemonic::Bcs => self.op_branch(host, self.regs.p.is_set(C), operand),
            Mnemonic::Bne => self.op_branch(host, !self.regs.p.is_set(Z), operand),
            Mnemonic::Beq => self.op_branch(host, self.regs.p.is_set(Z), operand),
            Mnemonic::Bra => self.op_branch(host, true, operand),
            Mnemonic::Brl => {
                self.idle(host);
                let dest = self.regs.pc.wrapping_add(operand as u16);
                self.jump(dest);
            }
            Mnemonic::Mvn => self.op_move(host, operand, pc, true),
            Mnemonic::Mvp => self.op_move(host, operand, pc, false),
            Mnemonic::Rep | Mnemonic::Sep => self.op_rep_sep(host, entry.mnemonic, operand as u8),
            Mnemonic::Wdm => {}
            m if m.access() == Access::None => self.execute_control(host, m, entry.mode, operand),
            m => self.execute_operation(host, m, entry.mode, operand),
        }
    }

    /// Loads, stores and read-modify-write instructions.
    fn execute_operation<H: Host<Registers65816> + ?Sized>(
        &mut self,
        host: &mut H,
        m: Mnemonic,
        mode: Mode,
        operand: u32,
    ) {
        let wide = if m.index_sized() {
            !self.regs.x8()
        } else {
            !self.regs.m8()
        };
        match (mode, m.access()) {
            (Mode::Accumulator, _) => {
                self.idle(host);
                let value = if wide { self.regs.a } else { self.regs.a & 0x00FF };
                let result = self.modify(m, value);
                self.regs.a = if wide { result } else { (self.regs.a & 0xFF00) | result };
            }
            (Mode::Immediate | Mode::ImmediateX, _) => self.read_op(m, operand as u16, true),
            (_, Access::Read) => {
                let target = self.effective_address(host, mode, operand, Access::Read);
                let value = self.load_target(host, target, wide);
                self.read_op(m, value, false);
            }
            (_, Access::Write) => {
                let target = self.effective_address(host, mode, operand, Access::Write);
                let value = match m {
                    Mnemonic::Sta => self.regs.a,
                    Mnemonic::Stx => self.regs.x,
                    Mnemonic::Sty => self.regs.y,
                    _ => 0,
                };
                self.store_target(host, target, value, wide);
            }
            (_, Access::ReadModifyWrite) => {
                let target = self.effective_address(host, mode, operand, Access::ReadModifyWrite);
                let old = self.load_target(host, target, wide);
                if self.regs.emulation {
                    // The unmodified value is written back first.
                    self.store(host, target.addr(), old as u8);
                } else {
                    // Native mode re-reads the last operand byte instead.
                    let last = if wide { target.next() } else { target };
                    self.load(host, last.addr());
                }
                let new = self.modify(m, old);
                let [lo, hi] = new.to_le_bytes();
                if wide {
                    self.store(host, target.next().addr(), hi);
                }
                self.store(host, target.addr(), lo);
            }
            (_, Access::None) => self.idle(host),
        }
    }

    fn read_op(&mut self, m: Mnemonic, value: u16, immediate: bool) {
        let r = &mut self.regs;
        match m {
            Mnemonic::Lda => r.set_a(value),
            Mnemonic::Ldx => r.set_x(value),
            Mnemonic::Ldy => r.set_y(value),
            Mnemonic::Ora => r.ora(value),
            Mnemonic::And => r.and(value),
            Mnemonic::Eor => r.eor(value),
            Mnemonic::Adc => r.adc(value),
            Mnemonic::Sbc => r.sbc(value),
            Mnemonic::Bit => r.bit(value, immediate),
            Mnemonic::Cmp => r.compare(r.a, value, !r.m8()),
            Mnemonic::Cpx => r.compare(r.x, value, !r.x8()),
            Mnemonic::Cpy => r.compare(r.y, value, !r.x8()),
            _ => {}
        }
    }

    fn modify(&mut self, m: Mnemonic, value: u16) -> u16 {
        let r = &mut self.regs;
        match m {
            Mnemonic::Asl => r.asl(value),
            Mnemonic::Lsr => r.lsr(value),
            Mnemonic::Rol => r.rol(value),
            Mnemonic::Ror => r.ror(value),
            Mnemonic::Inc => r.inc(value),
            Mnemonic::Dec => r.dec(value),
            Mnemonic::Tsb => r.tsb(value),
            Mnemonic::Trb => r.trb(value),
            _ => value,
        }
    }

    /// Register transfers, flag operations and stack instructions.
    fn execute_control<H: Host<Registers65816> + ?Sized>(
        &mut self,
        host: &mut H,
        m: Mnemonic,
        mode: Mode,
        operand: u32,
    ) {
        match m {
            Mnemonic::Pha => {
                self.idle(host);
                self.push_sized(host, self.regs.a, !self.regs.m8());
            }
            Mnemonic::Phx => {
                self.idle(host);
                self.push_sized(host, self.regs.x, !self.regs.x8());
            }
            Mnemonic::Phy => {
                self.idle(host);
                self.push_sized(host, self.regs.y, !self.regs.x8());
            }
            Mnemonic::Php => {
                self.idle(host);
                self.push(host, self.regs.status_byte());
            }
            Mnemonic::Phb => {
                self.idle(host);
                self.push(host, self.regs.dbr);
            }
            Mnemonic::Phk => {
                self.idle(host);
                self.push(host, self.regs.pbr);
            }
            Mnemonic::Phd => {
                self.idle(host);
                self.push16(host, self.regs.d);
            }
            Mnemonic::Pla => {
                self.idle(host);
                self.idle(host);
                let value = self.pull_sized(host, !self.regs.m8());
                self.regs.set_a(value);
            }
            Mnemonic::Plx => {
                self.idle(host);
                self.idle(host);
                let value = self.pull_sized(host, !self.regs.x8());
                self.regs.set_x(value);
            }
            Mnemonic::Ply => {
                self.idle(host);
                self.idle(host);
                let value = self.pull_sized(host, !self.regs.x8());
                self.regs.set_y(value);
            }
            Mnemonic::Plp => {
                self.idle(host);
                self.idle(host);
                let status = self.pull(host);
                self.install_status(status);
            }
            Mnemonic::Plb => {
                self.idle(host);
                self.idle(host);
                self.regs.dbr = self.pull(host);
                self.regs.p.update_nz(self.regs.dbr);
            }
            Mnemonic::Pld => {
                self.idle(host);
                self.idle(host);
                self.regs.d = self.pull16(host);
                self.regs.p.update_nz16(self.regs.d);
            }
            Mnemonic::Pea => self.push16(host, operand as u16),
            Mnemonic::Pei => {
                let ptr = self.direct(host, operand as u8);
                let value = self.direct_pointer(host, ptr);
                self.push16(host, value);
            }
            Mnemonic::Per => {
                self.idle(host);
                let value = self.regs.pc.wrapping_add(operand as u16);
                self.push16(host, value);
            }
            Mnemonic::Xba => {
                self.idle(host);
                self.idle(host);
                self.regs.a = self.regs.a.swap_bytes();
                self.regs.p.update_nz(self.regs.a as u8);
            }
            Mnemonic::Xce => {
                self.idle(host);
                let carry = self.regs.p.is_set(C);
                self.regs.p.set_if(C, self.regs.emulation);
                if carry {
                    self.regs.enter_emulation();
                } else {
                    self.regs.enter_native();
                }
            }
            Mnemonic::Wai => {
                self.idle(host);
                self.idle(host);
                self.waiting = true;
            }
            Mnemonic::Stp => {
                self.idle(host);
                self.idle(host);
                log::debug!("{}: STP at {:06X}", host.context().name(), self.regs.pc24());
                self.stopped = true;
            }
            _ => {
                debug_assert_eq!(mode, Mode::Implied);
                self.idle(host);
                self.implied(m);
            }
        }
    }

    fn implied(&mut self, m: Mnemonic) {
        let r = &mut self.regs;
        match m {
            Mnemonic::Clc => r.p.clear(C),
            Mnemonic::Sec => r.p.set(C),
            Mnemonic::Cld => r.p.clear(D),
            Mnemonic::Sed => r.p.set(D),
            Mnemonic::Clv => r.p.clear(V),
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
            Mnemonic::Tax => r.set_x(r.a),
            Mnemonic::Tay => r.set_y(r.a),
            Mnemonic::Txa => r.set_a(r.x),
            Mnemonic::Tya => r.set_a(r.y),
            Mnemonic::Txy => r.set_y(r.x),
            Mnemonic::Tyx => r.set_x(r.y),
            Mnemonic::Tsx => r.set_x(r.sp),
            Mnemonic::Txs => r.set_sp(r.x),
            Mnemonic::Tcs => r.set_sp(r.a),
            Mnemonic::Tsc => {
                r.a = r.sp;
                r.p.update_nz16(r.a);
            }
            Mnemonic::Tcd => {
                r.d = r.a;
                r.p.update_nz16(r.d);
            }
            Mnemonic::Tdc => {
                r.a = r.d;
                r.p.update_nz16(r.a);
            }
            Mnemonic::Inx => r.set_x(r.x.wrapping_add(1)),
            Mnemonic::Iny => r.set_y(r.y.wrapping_add(1)),
            Mnemonic::Dex => r.set_x(r.x.wrapping_sub(1)),
            Mnemonic::Dey => r.set_y(r.y.wrapping_sub(1)),
            _ => {}
        }
    }

    // ========================================================================
    // Operation handlers
    // ========================================================================

    /// Install a new status byte, noting I transitions for the IRQ delay.
    fn install_status(&mut self, status: u8) {
        let was_disabled = self.regs.p.is_set(I);
        if status & I == 0 && was_disabled {
            self.opinfo.set_enables_irq();
        } else if status & I != 0 && !was_disabled {
            self.opinfo.set_disables_irq();
        }
        self.regs.set_status(status);
    }

    fn op_rep_sep<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, m: Mnemonic, mask: u8) {
        self.idle(host);
        let status = self.regs.status_byte();
        let status = if m == Mnemonic::Rep { status & !mask } else { status | mask };
        self.install_status(status);
    }

    fn op_branch<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, taken: bool, operand: u32) {
        if !taken {
            return;
        }
        let pc = self.regs.pc;
        let dest = pc.wrapping_add(i16::from(operand as u8 as i8) as u16);
        self.idle(host);
        if self.regs.emulation && (pc ^ dest) & 0xFF00 != 0 {
            self.idle(host);
        } else {
            self.opinfo.set_delays_interrupt();
        }
        self.jump(dest);
    }

    fn op_jmp<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, mode: Mode, operand: u32) {
        let op16 = operand as u16;
        let target = match mode {
            Mode::AbsoluteIndirect => {
                let lo = self.load(host, u32::from(op16));
                let hi = self.load(host, u32::from(op16.wrapping_add(1)));
                u16::from_le_bytes([lo, hi])
            }
            Mode::AbsoluteXIndirect => {
                self.idle(host);
                self.program_pointer(host, op16.wrapping_add(self.regs.x))
            }
            _ => op16,
        };
        self.jump(target);
    }

    fn op_jml<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, mode: Mode, operand: u32) {
        let target = if mode == Mode::AbsoluteIndirectLong {
            self.long_pointer(host, operand as u16)
        } else {
            operand
        };
        self.jump_long((target >> 16) as u8, target as u16);
    }

    /// Read a jump-table entry from the program bank.
    fn program_pointer<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, addr: u16) -> u16 {
        let bank = u32::from(self.regs.pbr) << 16;
        let lo = self.load(host, bank | u32::from(addr));
        let hi = self.load(host, bank | u32::from(addr.wrapping_add(1)));
        u16::from_le_bytes([lo, hi])
    }

    fn op_jsr<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, mode: Mode, operand: u32, pc: u16) {
        if mode == Mode::AbsoluteXIndirect {
            // Return address is pushed between the two operand fetches.
            let lo = self.fetch_byte(host, pc.wrapping_add(1));
            self.push16(host, pc.wrapping_add(2));
            let hi = self.fetch_byte(host, pc.wrapping_add(2));
            self.idle(host);
            let base = u16::from_le_bytes([lo, hi]);
            let target = self.program_pointer(host, base.wrapping_add(self.regs.x));
            self.jump(target);
        } else {
            self.idle(host);
            self.push16(host, self.regs.pc.wrapping_sub(1));
            self.jump(operand as u16);
        }
    }

    fn op_jsl<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, pc: u16) {
        let lo = self.fetch_byte(host, pc.wrapping_add(1));
        let hi = self.fetch_byte(host, pc.wrapping_add(2));
        self.push(host, self.regs.pbr);
        self.idle(host);
        let bank = self.fetch_byte(host, pc.wrapping_add(3));
        self.push16(host, pc.wrapping_add(3));
        self.jump_long(bank, u16::from_le_bytes([lo, hi]));
    }

    fn op_rti<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H) {
        self.idle(host);
        self.idle(host);
        let status = self.pull(host);
        self.regs.set_status(status);
        let pc = self.pull16(host);
        if self.regs.emulation {
            self.jump(pc);
        } else {
            let bank = self.pull(host);
            self.jump_long(bank, pc);
        }
    }

    /// MVN/MVP move one byte per execution; PC stays on the instruction
    /// until the count in C runs out.
    fn op_move<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, operand: u32, pc: u16, increment: bool) {
        let dst_bank = operand as u8;
        let src_bank = (operand >> 8) as u8;
        self.regs.dbr = dst_bank;
        let value = self.load(host, (u32::from(src_bank) << 16) | u32::from(self.regs.x));
        self.store(host, (u32::from(dst_bank) << 16) | u32::from(self.regs.y), value);
        self.idle(host);
        self.idle(host);

        let step = |reg: u16| if increment { reg.wrapping_add(1) } else { reg.wrapping_sub(1) };
        let mask = if self.regs.x8() { 0x00FF } else { 0xFFFF };
        self.regs.x = step(self.regs.x) & mask;
        self.regs.y = step(self.regs.y) & mask;
        self.regs.a = self.regs.a.wrapping_sub(1);
        if self.regs.a != 0xFFFF {
            self.regs.pc = pc;
        }
    }

    /// COP, which doubles as the ROM trap opcode.
    fn op_cop<H: Host<Registers65816> + ?Sized>(&mut self, host: &mut H, pc: u16) {
        if self.config.rom_traps {
            self.regs.pc = pc;
            host.context().clk += TRAP_CYCLES;
            match host.rom_trap(&mut self.regs) {
                TrapDisposition::NotATrap => host.context().clk -= TRAP_CYCLES,
                TrapDisposition::Consumed => {
                    log::trace!("ROM trap at {:06X} consumed", self.regs.pc24());
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

        self.fetch_byte(host, pc.wrapping_add(1));
        let ret = pc.wrapping_add(2);
        let status = self.regs.status_byte();
        let vector = self.vectors().cop;
        self.exception(host, ret, status, vector);
    }
}

// ============================================================================
// Trait implementations
// ============================================================================

impl<H: Host<Registers65816> + ?Sized> Cpu<H> for Cpu65816 {
    type Registers = Registers65816;

    fn step(&mut self, host: &mut H) {
        Cpu65816::step(self, host);
    }

    fn reset(&mut self, host: &mut H) {
        Cpu65816::reset(self, host);
    }

    fn pc(&self) -> u32 {
        self.regs.pc24()
    }

    fn registers(&self) -> Self::Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.stopped
    }
}

impl Observable for Cpu65816 {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        match path {
            "pc" => Some(Value::Address24(r.pc24())),
            "a" => Some(r.a.into()),
            "x" => Some(r.x.into()),
            "y" => Some(r.y.into()),
            "sp" => Some(r.sp.into()),
            "d" => Some(r.d.into()),
            "dbr" => Some(r.dbr.into()),
            "pbr" => Some(r.pbr.into()),
            "p" => Some(r.status_byte().into()),
            "e" => Some(r.emulation.into()),
            "flags.c" => Some(r.p.is_set(C).into()),
            "flags.z" => Some(r.p.is_set(Z).into()),
            "flags.i" => Some(r.p.is_set(I).into()),
            "flags.d" => Some(r.p.is_set(D).into()),
            "flags.x" => Some(r.p.is_set(X).into()),
            "flags.m" => Some(r.p.is_set(M).into()),
            "flags.v" => Some(r.p.is_set(V).into()),
            "flags.n" => Some(r.p.is_set(N).into()),
            "opinfo" => Some(self.opinfo.raw().into()),
            "waiting" => Some(self.waiting.into()),
            "halted" => Some(self.stopped.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "a", "x", "y", "sp", "d", "dbr", "pbr", "p", "e", "flags.c", "flags.z", "flags.i",
            "flags.d", "flags.x", "flags.m", "flags.v", "flags.n", "opinfo", "waiting", "halted",
        ]
    }
}
