//! 65C816 opcode decode table.
//!
//! All 256 encodings are defined. The cycle column is the count in
//! emulation mode with 8-bit registers, a page-aligned direct page, no
//! index page crossing and no branch taken.

/// Addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Implied,
    Accumulator,
    /// Immediate sized by M.
    Immediate,
    /// Immediate sized by X.
    ImmediateX,
    /// One-byte immediate regardless of width (REP, SEP, COP, BRK, WDM).
    Immediate8,
    Direct,
    DirectX,
    DirectY,
    /// `(d)`
    DirectIndirect,
    /// `[d]`
    DirectIndirectLong,
    /// `(d,X)`
    DirectXIndirect,
    /// `(d),Y`
    DirectIndirectY,
    /// `[d],Y`
    DirectIndirectLongY,
    /// `d,S`
    StackRelative,
    /// `(d,S),Y`
    StackRelativeIndirectY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    AbsoluteLong,
    AbsoluteLongX,
    /// `(a)`, pointer in bank 0.
    AbsoluteIndirect,
    /// `[a]`, pointer in bank 0.
    AbsoluteIndirectLong,
    /// `(a,X)`, pointer in the program bank.
    AbsoluteXIndirect,
    Relative,
    RelativeLong,
    /// Destination bank, source bank.
    BlockMove,
}

impl Mode {
    /// Operand bytes after the opcode for the given register widths.
    #[must_use]
    pub const fn operand_len(self, m8: bool, x8: bool) -> u16 {
        match self {
            Mode::Implied | Mode::Accumulator => 0,
            Mode::Immediate => {
                if m8 {
                    1
                } else {
                    2
                }
            }
            Mode::ImmediateX => {
                if x8 {
                    1
                } else {
                    2
                }
            }
            Mode::Immediate8
            | Mode::Direct
            | Mode::DirectX
            | Mode::DirectY
            | Mode::DirectIndirect
            | Mode::DirectIndirectLong
            | Mode::DirectXIndirect
            | Mode::DirectIndirectY
            | Mode::DirectIndirectLongY
            | Mode::StackRelative
            | Mode::StackRelativeIndirectY
            | Mode::Relative => 1,
            Mode::Absolute
            | Mode::AbsoluteX
            | Mode::AbsoluteY
            | Mode::AbsoluteIndirect
            | Mode::AbsoluteIndirectLong
            | Mode::AbsoluteXIndirect
            | Mode::RelativeLong
            | Mode::BlockMove => 2,
            Mode::AbsoluteLong | Mode::AbsoluteLongX => 3,
        }
    }

    /// Modes addressing through the direct page.
    #[must_use]
    pub const fn is_direct(self) -> bool {
        matches!(
            self,
            Mode::Direct
                | Mode::DirectX
                | Mode::DirectY
                | Mode::DirectIndirect
                | Mode::DirectIndirectLong
                | Mode::DirectXIndirect
                | Mode::DirectIndirectY
                | Mode::DirectIndirectLongY
        )
    }
}

/// Instruction mnemonic.
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Bra, Brk, Brl, Bvc,
    Bvs, Clc, Cld, Cli, Clv, Cmp, Cop, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc,
    Inx, Iny, Jml, Jmp, Jsl, Jsr, Lda, Ldx, Ldy, Lsr, Mvn, Mvp, Nop, Ora,
    Pea, Pei, Per, Pha, Phb, Phd, Phk, Php, Phx, Phy, Pla, Plb, Pld, Plp,
    Plx, Ply, Rep, Rol, Ror, Rti, Rtl, Rts, Sbc, Sec, Sed, Sei, Sep, Sta,
    Stp, Stx, Sty, Stz, Tax, Tay, Tcd, Tcs, Tdc, Trb, Tsb, Tsc, Tsx, Txa,
    Txs, Txy, Tya, Tyx, Wai, Wdm, Xba, Xce,
}

/// How an instruction uses its effective address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No memory operand, or control flow handled by the instruction.
    None,
    Read,
    Write,
    ReadModifyWrite,
}

impl Mnemonic {
    #[must_use]
    pub const fn access(self) -> Access {
        match self {
            Adc | And | Bit | Cmp | Cpx | Cpy | Eor | Lda | Ldx | Ldy | Ora | Sbc => Access::Read,
            Sta | Stx | Sty | Stz => Access::Write,
            Asl | Lsr | Rol | Ror | Inc | Dec | Tsb | Trb => Access::ReadModifyWrite,
            _ => Access::None,
        }
    }

    /// Operand width follows X rather than M.
    #[must_use]
    pub const fn index_sized(self) -> bool {
        matches!(self, Ldx | Ldy | Cpx | Cpy | Stx | Sty)
    }
}

/// One decode table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: Mode,
    pub cycles: u8,
}

const fn op(mnemonic: Mnemonic, mode: Mode, cycles: u8) -> Opcode {
    Opcode {
        mnemonic,
        mode,
        cycles,
    }
}

#[allow(clippy::enum_glob_use)]
use Mnemonic::*;
use Mode::{
    Absolute as Abs, AbsoluteIndirect as Ind, AbsoluteIndirectLong as Inl, AbsoluteLong as Abl,
    AbsoluteLongX as Alx, AbsoluteX as Abx, AbsoluteXIndirect as Iax, AbsoluteY as Aby,
    Accumulator as Acc, BlockMove as Blk, Direct as Dp, DirectIndirect as Idp,
    DirectIndirectLong as Idl, DirectIndirectLongY as Ily, DirectIndirectY as Idy, DirectX as Dpx,
    DirectXIndirect as Idx, DirectY as Dpy, Immediate as Imm, Immediate8 as Im8,
    ImmediateX as Imx, Implied as Imp, Relative as Rel, RelativeLong as Rll,
    StackRelative as Sr, StackRelativeIndirectY as Isy,
};

#[rustfmt::skip]
pub static OPCODES: [Opcode; 256] = [
    // 0x00
    op(Brk, Im8, 7), op(Ora, Idx, 6), op(Cop, Im8, 7), op(Ora, Sr, 4),
    op(Tsb, Dp, 5),  op(Ora, Dp, 3),  op(Asl, Dp, 5),  op(Ora, Idl, 6),
    op(Php, Imp, 3), op(Ora, Imm, 2), op(Asl, Acc, 2), op(Phd, Imp, 4),
    op(Tsb, Abs, 6), op(Ora, Abs, 4), op(Asl, Abs, 6), op(Ora, Abl, 5),
    // 0x10
    op(Bpl, Rel, 2), op(Ora, Idy, 5), op(Ora, Idp, 5), op(Ora, Isy, 7),
    op(Trb, Dp, 5),  op(Ora, Dpx, 4), op(Asl, Dpx, 6), op(Ora, Ily, 6),
    op(Clc, Imp, 2), op(Ora, Aby, 4), op(Inc, Acc, 2), op(Tcs, Imp, 2),
    op(Trb, Abs, 6), op(Ora, Abx, 4), op(Asl, Abx, 7), op(Ora, Alx, 5),
    // 0x20
    op(Jsr, Abs, 6), op(And, Idx, 6), op(Jsl, Abl, 8), op(And, Sr, 4),
    op(Bit, Dp, 3),  op(And, Dp, 3),  op(Rol, Dp, 5),  op(And, Idl, 6),
    op(Plp, Imp, 4), op(And, Imm, 2), op(Rol, Acc, 2), op(Pld, Imp, 5),
    op(Bit, Abs, 4), op(And, Abs, 4), op(Rol, Abs, 6), op(And, Abl, 5),
    // 0x30
    op(Bmi, Rel, 2), op(And, Idy, 5), op(And, Idp, 5), op(And, Isy, 7),
    op(Bit, Dpx, 4), op(And, Dpx, 4), op(Rol, Dpx, 6), op(And, Ily, 6),
    op(Sec, Imp, 2), op(And, Aby, 4), op(Dec, Acc, 2), op(Tsc, Imp, 2),
    op(Bit, Abx, 4), op(And, Abx, 4), op(Rol, Abx, 7), op(And, Alx, 5),
    // 0x40
    op(Rti, Imp, 6), op(Eor, Idx, 6), op(Wdm, Im8, 2), op(Eor, Sr, 4),
    op(Mvp, Blk, 7), op(Eor, Dp, 3),  op(Lsr, Dp, 5),  op(Eor, Idl, 6),
    op(Pha, Imp, 3), op(Eor, Imm, 2), op(Lsr, Acc, 2), op(Phk, Imp, 3),
    op(Jmp, Abs, 3), op(Eor, Abs, 4), op(Lsr, Abs, 6), op(Eor, Abl, 5),
    // 0x50
    op(Bvc, Rel, 2), op(Eor, Idy, 5), op(Eor, Idp, 5), op(Eor, Isy, 7),
    op(Mvn, Blk, 7), op(Eor, Dpx, 4), op(Lsr, Dpx, 6), op(Eor, Ily, 6),
    op(Cli, Imp, 2), op(Eor, Aby, 4), op(Phy, Imp, 3), op(Tcd, Imp, 2),
    op(Jml, Abl, 4), op(Eor, Abx, 4), op(Lsr, Abx, 7), op(Eor, Alx, 5),
    // 0x60
    op(Rts, Imp, 6), op(Adc, Idx, 6), op(Per, Rll, 6), op(Adc, Sr, 4),
    op(Stz, Dp, 3),  op(Adc, Dp, 3),  op(Ror, Dp, 5),  op(Adc, Idl, 6),
    op(Pla, Imp, 4), op(Adc, Imm, 2), op(Ror, Acc, 2), op(Rtl, Imp, 6),
    op(Jmp, Ind, 5), op(Adc, Abs, 4), op(Ror, Abs, 6), op(Adc, Abl, 5),
    // 0x70
    op(Bvs, Rel, 2), op(Adc, Idy, 5), op(Adc, Idp, 5), op(Adc, Isy, 7),
    op(Stz, Dpx, 4), op(Adc, Dpx, 4), op(Ror, Dpx, 6), op(Adc, Ily, 6),
    op(Sei, Imp, 2), op(Adc, Aby, 4), op(Ply, Imp, 4), op(Tdc, Imp, 2),
    op(Jmp, Iax, 6), op(Adc, Abx, 4), op(Ror, Abx, 7), op(Adc, Alx, 5),
    // 0x80
    op(Bra, Rel, 3), op(Sta, Idx, 6), op(Brl, Rll, 4), op(Sta, Sr, 4),
    op(Sty, Dp, 3),  op(Sta, Dp, 3),  op(Stx, Dp, 3),  op(Sta, Idl, 6),
    op(Dey, Imp, 2), op(Bit, Imm, 2), op(Txa, Imp, 2), op(Phb, Imp, 3),
    op(Sty, Abs, 4), op(Sta, Abs, 4), op(Stx, Abs, 4), op(Sta, Abl, 5),
    // 0x90
    op(Bcc, Rel, 2), op(Sta, Idy, 6), op(Sta, Idp, 5), op(Sta, Isy, 7),
    op(Sty, Dpx, 4), op(Sta, Dpx, 4), op(Stx, Dpy, 4), op(Sta, Ily, 6),
    op(Tya, Imp, 2), op(Sta, Aby, 5), op(Txs, Imp, 2), op(Txy, Imp, 2),
    op(Stz, Abs, 4), op(Sta, Abx, 5), op(Stz, Abx, 5), op(Sta, Alx, 5),
    // 0xA0
    op(Ldy, Imx, 2), op(Lda, Idx, 6), op(Ldx, Imx, 2), op(Lda, Sr, 4),
    op(Ldy, Dp, 3),  op(Lda, Dp, 3),  op(Ldx, Dp, 3),  op(Lda, Idl, 6),
    op(Tay, Imp, 2), op(Lda, Imm, 2), op(Tax, Imp, 2), op(Plb, Imp, 4),
    op(Ldy, Abs, 4), op(Lda, Abs, 4), op(Ldx, Abs, 4), op(Lda, Abl, 5),
    // 0xB0
    op(Bcs, Rel, 2), op(Lda, Idy, 5), op(Lda, Idp, 5), op(Lda, Isy, 7),
    op(Ldy, Dpx, 4), op(Lda, Dpx, 4), op(Ldx, Dpy, 4), op(Lda, Ily, 6),
    op(Clv, Imp, 2), op(Lda, Aby, 4), op(Tsx, Imp, 2), op(Tyx, Imp, 2),
    op(Ldy, Abx, 4), op(Lda, Abx, 4), op(Ldx, Aby, 4), op(Lda, Alx, 5),
    // 0xC0
    op(Cpy, Imx, 2), op(Cmp, Idx, 6), op(Rep, Im8, 3), op(Cmp, Sr, 4),
    op(Cpy, Dp, 3),  op(Cmp, Dp, 3),  op(Dec, Dp, 5),  op(Cmp, Idl, 6),
    op(Iny, Imp, 2), op(Cmp, Imm, 2), op(Dex, Imp, 2), op(Wai, Imp, 3),
    op(Cpy, Abs, 4), op(Cmp, Abs, 4), op(Dec, Abs, 6), op(Cmp, Abl, 5),
    // 0xD0
    op(Bne, Rel, 2), op(Cmp, Idy, 5), op(Cmp, Idp, 5), op(Cmp, Isy, 7),
    op(Pei, Idp, 6), op(Cmp, Dpx, 4), op(Dec, Dpx, 6), op(Cmp, Ily, 6),
    op(Cld, Imp, 2), op(Cmp, Aby, 4), op(Phx, Imp, 3), op(Stp, Imp, 3),
    op(Jml, Inl, 6), op(Cmp, Abx, 4), op(Dec, Abx, 7), op(Cmp, Alx, 5),
    // 0xE0
    op(Cpx, Imx, 2), op(Sbc, Idx, 6), op(Sep, Im8, 3), op(Sbc, Sr, 4),
    op(Cpx, Dp, 3),  op(Sbc, Dp, 3),  op(Inc, Dp, 5),  op(Sbc, Idl, 6),
    op(Inx, Imp, 2), op(Sbc, Imm, 2), op(Nop, Imp, 2), op(Xba, Imp, 3),
    op(Cpx, Abs, 4), op(Sbc, Abs, 4), op(Inc, Abs, 6), op(Sbc, Abl, 5),
    // 0xF0
    op(Beq, Rel, 2), op(Sbc, Idy, 5), op(Sbc, Idp, 5), op(Sbc, Isy, 7),
    op(Pea, Abs, 5), op(Sbc, Dpx, 4), op(Inc, Dpx, 6), op(Sbc, Ily, 6),
    op(Sed, Imp, 2), op(Sbc, Aby, 4), op(Plx, Imp, 4), op(Xce, Imp, 2),
    op(Jsr, Iax, 8), op(Sbc, Abx, 4), op(Inc, Abx, 7), op(Sbc, Alx, 5),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_read_write_and_rmw_mnemonic_has_a_direct_form() {
        for m in [Adc, And, Cmp, Eor, Lda, Ora, Sbc, Sta, Asl, Rol, Lsr, Ror, Inc, Dec, Tsb, Trb] {
            assert!(
                OPCODES.iter().any(|e| e.mnemonic == m && e.mode == Mode::Direct),
                "{m:?}"
            );
        }
    }

    #[test]
    fn group_one_has_fifteen_modes() {
        let lda = OPCODES.iter().filter(|e| e.mnemonic == Lda).count();
        assert_eq!(lda, 15);
        let sta = OPCODES.iter().filter(|e| e.mnemonic == Sta).count();
        assert_eq!(sta, 14);
    }

    #[test]
    fn immediate_length_follows_width() {
        assert_eq!(Mode::Immediate.operand_len(true, false), 1);
        assert_eq!(Mode::Immediate.operand_len(false, true), 2);
        assert_eq!(Mode::ImmediateX.operand_len(false, true), 1);
        assert_eq!(Mode::AbsoluteLongX.operand_len(true, true), 3);
    }
}
