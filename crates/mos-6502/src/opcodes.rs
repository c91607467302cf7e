//! Opcode decode tables.
//!
//! Each table maps an opcode byte to its mnemonic, addressing mode and base
//! cycle count. A reduced instruction set is just another table.

/// Addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    IndirectX,
    IndirectY,
    Relative,
    Indirect,
}

impl Mode {
    /// Instruction length in bytes including the opcode.
    #[must_use]
    pub const fn len(self) -> u16 {
        match self {
            Mode::Implied | Mode::Accumulator => 1,
            Mode::Immediate
            | Mode::ZeroPage
            | Mode::ZeroPageX
            | Mode::ZeroPageY
            | Mode::IndirectX
            | Mode::IndirectY
            | Mode::Relative => 2,
            Mode::Absolute | Mode::AbsoluteX | Mode::AbsoluteY | Mode::Indirect => 3,
        }
    }

    /// Indexed read modes that pay one cycle when the index crosses a page.
    #[must_use]
    pub const fn has_page_penalty(self) -> bool {
        matches!(self, Mode::AbsoluteX | Mode::AbsoluteY | Mode::IndirectY)
    }
}

/// Instruction mnemonic, including the undocumented NMOS opcodes.
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Undocumented.
    Anc, Ane, Arr, Asr, Dcp, Isb, Jam, Las, Lax, Lxa, Rla, Rra, Sax, Sbx,
    Sha, Shs, Shx, Shy, Slo, Sre,
}

/// How an instruction uses its effective address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No memory operand (or control flow handled by the instruction).
    None,
    Read,
    Write,
    ReadModifyWrite,
}

impl Mnemonic {
    #[must_use]
    pub const fn access(self) -> Access {
        match self {
            Adc | And | Bit | Cmp | Cpx | Cpy | Eor | Lda | Ldx | Ldy | Ora | Sbc | Nop | Anc
            | Ane | Arr | Asr | Las | Lax | Lxa | Sbx => Access::Read,
            Sta | Stx | Sty | Sax | Sha | Shs | Shx | Shy => Access::Write,
            Asl | Lsr | Rol | Ror | Inc | Dec | Slo | Rla | Sre | Rra | Dcp | Isb => {
                Access::ReadModifyWrite
            }
            _ => Access::None,
        }
    }

    const fn is_undocumented(self) -> bool {
        matches!(
            self,
            Anc | Ane | Arr | Asr | Dcp | Isb | Jam | Las | Lax | Lxa | Rla | Rra | Sax | Sbx
                | Sha | Shs | Shx | Shy | Slo | Sre
        )
    }
}

/// One decode table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: Mode,
    /// Cycles with no page crossing and no branch taken.
    pub cycles: u8,
}

const fn op(mnemonic: Mnemonic, mode: Mode, cycles: u8) -> Opcode {
    Opcode {
        mnemonic,
        mode,
        cycles,
    }
}

/// JAM costs only its own fetch; the host decides what happens next.
const JAM: Opcode = op(Mnemonic::Jam, Mode::Implied, 1);

#[allow(clippy::enum_glob_use)]
use Mnemonic::*;
use Mode::{
    Absolute as Abs, AbsoluteX as Abx, AbsoluteY as Aby, Accumulator as Acc, Immediate as Imm,
    Implied as Imp, Indirect as Ind, IndirectX as Izx, IndirectY as Izy, Relative as Rel,
    ZeroPage as Zp, ZeroPageX as Zpx, ZeroPageY as Zpy,
};

#[rustfmt::skip]
const NMOS_TABLE: [Opcode; 256] = [
    // 0x00
    op(Brk, Imp, 7), op(Ora, Izx, 6), JAM,            op(Slo, Izx, 8),
    op(Nop, Zp, 3),  op(Ora, Zp, 3),  op(Asl, Zp, 5),  op(Slo, Zp, 5),
    op(Php, Imp, 3), op(Ora, Imm, 2), op(Asl, Acc, 2), op(Anc, Imm, 2),
    op(Nop, Abs, 4), op(Ora, Abs, 4), op(Asl, Abs, 6), op(Slo, Abs, 6),
    // 0x10
    op(Bpl, Rel, 2), op(Ora, Izy, 5), JAM,            op(Slo, Izy, 8),
    op(Nop, Zpx, 4), op(Ora, Zpx, 4), op(Asl, Zpx, 6), op(Slo, Zpx, 6),
    op(Clc, Imp, 2), op(Ora, Aby, 4), op(Nop, Imp, 2), op(Slo, Aby, 7),
    op(Nop, Abx, 4), op(Ora, Abx, 4), op(Asl, Abx, 7), op(Slo, Abx, 7),
    // 0x20
    op(Jsr, Abs, 6), op(And, Izx, 6), JAM,            op(Rla, Izx, 8),
    op(Bit, Zp, 3),  op(And, Zp, 3),  op(Rol, Zp, 5),  op(Rla, Zp, 5),
    op(Plp, Imp, 4), op(And, Imm, 2), op(Rol, Acc, 2), op(Anc, Imm, 2),
    op(Bit, Abs, 4), op(And, Abs, 4), op(Rol, Abs, 6), op(Rla, Abs, 6),
    // 0x30
    op(Bmi, Rel, 2), op(And, Izy, 5), JAM,            op(Rla, Izy, 8),
    op(Nop, Zpx, 4), op(And, Zpx, 4), op(Rol, Zpx, 6), op(Rla, Zpx, 6),
    op(Sec, Imp, 2), op(And, Aby, 4), op(Nop, Imp, 2), op(Rla, Aby, 7),
    op(Nop, Abx, 4), op(And, Abx, 4), op(Rol, Abx, 7), op(Rla, Abx, 7),
    // 0x40
    op(Rti, Imp, 6), op(Eor, Izx, 6), JAM,            op(Sre, Izx, 8),
    op(Nop, Zp, 3),  op(Eor, Zp, 3),  op(Lsr, Zp, 5),  op(Sre, Zp, 5),
    op(Pha, Imp, 3), op(Eor, Imm, 2), op(Lsr, Acc, 2), op(Asr, Imm, 2),
    op(Jmp, Abs, 3), op(Eor, Abs, 4), op(Lsr, Abs, 6), op(Sre, Abs, 6),
    // 0x50
    op(Bvc, Rel, 2), op(Eor, Izy, 5), JAM,            op(Sre, Izy, 8),
    op(Nop, Zpx, 4), op(Eor, Zpx, 4), op(Lsr, Zpx, 6), op(Sre, Zpx, 6),
    op(Cli, Imp, 2), op(Eor, Aby, 4), op(Nop, Imp, 2), op(Sre, Aby, 7),
    op(Nop, Abx, 4), op(Eor, Abx, 4), op(Lsr, Abx, 7), op(Sre, Abx, 7),
    // 0x60
    op(Rts, Imp, 6), op(Adc, Izx, 6), JAM,            op(Rra, Izx, 8),
    op(Nop, Zp, 3),  op(Adc, Zp, 3),  op(Ror, Zp, 5),  op(Rra, Zp, 5),
    op(Pla, Imp, 4), op(Adc, Imm, 2), op(Ror, Acc, 2), op(Arr, Imm, 2),
    op(Jmp, Ind, 5), op(Adc, Abs, 4), op(Ror, Abs, 6), op(Rra, Abs, 6),
    // 0x70
    op(Bvs, Rel, 2), op(Adc, Izy, 5), JAM,            op(Rra, Izy, 8),
    op(Nop, Zpx, 4), op(Adc, Zpx, 4), op(Ror, Zpx, 6), op(Rra, Zpx, 6),
    op(Sei, Imp, 2), op(Adc, Aby, 4), op(Nop, Imp, 2), op(Rra, Aby, 7),
    op(Nop, Abx, 4), op(Adc, Abx, 4), op(Ror, Abx, 7), op(Rra, Abx, 7),
    // 0x80
    op(Nop, Imm, 2), op(Sta, Izx, 6), op(Nop, Imm, 2), op(Sax, Izx, 6),
    op(Sty, Zp, 3),  op(Sta, Zp, 3),  op(Stx, Zp, 3),  op(Sax, Zp, 3),
    op(Dey, Imp, 2), op(Nop, Imm, 2), op(Txa, Imp, 2), op(Ane, Imm, 2),
    op(Sty, Abs, 4), op(Sta, Abs, 4), op(Stx, Abs, 4), op(Sax, Abs, 4),
    // 0x90
    op(Bcc, Rel, 2), op(Sta, Izy, 6), JAM,            op(Sha, Izy, 6),
    op(Sty, Zpx, 4), op(Sta, Zpx, 4), op(Stx, Zpy, 4), op(Sax, Zpy, 4),
    op(Tya, Imp, 2), op(Sta, Aby, 5), op(Txs, Imp, 2), op(Shs, Aby, 5),
    op(Shy, Abx, 5), op(Sta, Abx, 5), op(Shx, Aby, 5), op(Sha, Aby, 5),
    // 0xA0
    op(Ldy, Imm, 2), op(Lda, Izx, 6), op(Ldx, Imm, 2), op(Lax, Izx, 6),
    op(Ldy, Zp, 3),  op(Lda, Zp, 3),  op(Ldx, Zp, 3),  op(Lax, Zp, 3),
    op(Tay, Imp, 2), op(Lda, Imm, 2), op(Tax, Imp, 2), op(Lxa, Imm, 2),
    op(Ldy, Abs, 4), op(Lda, Abs, 4), op(Ldx, Abs, 4), op(Lax, Abs, 4),
    // 0xB0
    op(Bcs, Rel, 2), op(Lda, Izy, 5), JAM,            op(Lax, Izy, 5),
    op(Ldy, Zpx, 4), op(Lda, Zpx, 4), op(Ldx, Zpy, 4), op(Lax, Zpy, 4),
    op(Clv, Imp, 2), op(Lda, Aby, 4), op(Tsx, Imp, 2), op(Las, Aby, 4),
    op(Ldy, Abx, 4), op(Lda, Abx, 4), op(Ldx, Aby, 4), op(Lax, Aby, 4),
    // 0xC0
    op(Cpy, Imm, 2), op(Cmp, Izx, 6), op(Nop, Imm, 2), op(Dcp, Izx, 8),
    op(Cpy, Zp, 3),  op(Cmp, Zp, 3),  op(Dec, Zp, 5),  op(Dcp, Zp, 5),
    op(Iny, Imp, 2), op(Cmp, Imm, 2), op(Dex, Imp, 2), op(Sbx, Imm, 2),
    op(Cpy, Abs, 4), op(Cmp, Abs, 4), op(Dec, Abs, 6), op(Dcp, Abs, 6),
    // 0xD0
    op(Bne, Rel, 2), op(Cmp, Izy, 5), JAM,            op(Dcp, Izy, 8),
    op(Nop, Zpx, 4), op(Cmp, Zpx, 4), op(Dec, Zpx, 6), op(Dcp, Zpx, 6),
    op(Cld, Imp, 2), op(Cmp, Aby, 4), op(Nop, Imp, 2), op(Dcp, Aby, 7),
    op(Nop, Abx, 4), op(Cmp, Abx, 4), op(Dec, Abx, 7), op(Dcp, Abx, 7),
    // 0xE0
    op(Cpx, Imm, 2), op(Sbc, Izx, 6), op(Nop, Imm, 2), op(Isb, Izx, 8),
    op(Cpx, Zp, 3),  op(Sbc, Zp, 3),  op(Inc, Zp, 5),  op(Isb, Zp, 5),
    op(Inx, Imp, 2), op(Sbc, Imm, 2), op(Nop, Imp, 2), op(Sbc, Imm, 2),
    op(Cpx, Abs, 4), op(Sbc, Abs, 4), op(Inc, Abs, 6), op(Isb, Abs, 6),
    // 0xF0
    op(Beq, Rel, 2), op(Sbc, Izy, 5), JAM,            op(Isb, Izy, 8),
    op(Nop, Zpx, 4), op(Sbc, Zpx, 4), op(Inc, Zpx, 6), op(Isb, Zpx, 6),
    op(Sed, Imp, 2), op(Sbc, Aby, 4), op(Nop, Imp, 2), op(Isb, Aby, 7),
    op(Nop, Abx, 4), op(Sbc, Abx, 4), op(Inc, Abx, 7), op(Isb, Abx, 7),
];

/// Full NMOS 6502/6510 table.
pub static NMOS: [Opcode; 256] = NMOS_TABLE;

const fn is_documented(opcode: usize, entry: Opcode) -> bool {
    match entry.mnemonic {
        Nop => opcode == 0xEA,
        Sbc => opcode != 0xEB,
        m => !m.is_undocumented(),
    }
}

const fn documented_table() -> [Opcode; 256] {
    let mut table = NMOS_TABLE;
    let mut opcode = 0;
    while opcode < 256 {
        if !is_documented(opcode, table[opcode]) {
            table[opcode] = JAM;
        }
        opcode += 1;
    }
    table
}

/// Documented opcodes only; everything else jams.
pub static DOCUMENTED: [Opcode; 256] = documented_table();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nmos_has_twelve_jams() {
        let jams: Vec<usize> = (0..256).filter(|&i| NMOS[i].mnemonic == Jam).collect();
        assert_eq!(
            jams,
            [0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2]
        );
    }

    #[test]
    fn documented_set_has_151_opcodes() {
        let legal = DOCUMENTED.iter().filter(|o| o.mnemonic != Jam).count();
        assert_eq!(legal, 151);
        assert_eq!(DOCUMENTED[0xEB].mnemonic, Jam);
        assert_eq!(DOCUMENTED[0xEA].mnemonic, Nop);
        assert_eq!(DOCUMENTED[0xE9].mnemonic, Sbc);
    }
}
