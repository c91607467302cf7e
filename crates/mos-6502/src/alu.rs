//! Instruction semantics over the register file.
//!
//! Every handler is a pure state transition: it takes an operand that the
//! addressing logic already fetched and returns the byte to store, if any.
//! Bus timing lives in the CPU.

use crate::Registers;
use crate::flags::{C, D, N, V, Z};

impl Registers {
    fn carry(&self) -> u8 {
        u8::from(self.p.is_set(C))
    }

    // ========================================================================
    // Loads and logic
    // ========================================================================

    pub(crate) fn lda(&mut self, val: u8) {
        self.a = val;
        self.p.update_nz(val);
    }

    pub(crate) fn ldx(&mut self, val: u8) {
        self.x = val;
        self.p.update_nz(val);
    }

    pub(crate) fn ldy(&mut self, val: u8) {
        self.y = val;
        self.p.update_nz(val);
    }

    pub(crate) fn ora(&mut self, val: u8) {
        self.a |= val;
        self.p.update_nz(self.a);
    }

    pub(crate) fn and(&mut self, val: u8) {
        self.a &= val;
        self.p.update_nz(self.a);
    }

    pub(crate) fn eor(&mut self, val: u8) {
        self.a ^= val;
        self.p.update_nz(self.a);
    }

    pub(crate) fn bit(&mut self, val: u8) {
        self.p.set_if(Z, self.a & val == 0);
        self.p.set_if(N, val & 0x80 != 0);
        self.p.set_if(V, val & 0x40 != 0);
    }

    pub(crate) fn compare(&mut self, reg: u8, val: u8) {
        self.p.set_if(C, reg >= val);
        self.p.update_nz(reg.wrapping_sub(val));
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    pub(crate) fn adc(&mut self, val: u8) {
        let a = u32::from(self.a);
        let v = u32::from(val);
        let c = u32::from(self.carry());

        if self.p.is_set(D) {
            let mut tmp = (a & 0x0F) + (v & 0x0F) + c;
            if tmp > 0x09 {
                tmp += 0x06;
            }
            tmp = if tmp <= 0x0F {
                (tmp & 0x0F) + (a & 0xF0) + (v & 0xF0)
            } else {
                (tmp & 0x0F) + (a & 0xF0) + (v & 0xF0) + 0x10
            };
            // Z from the binary sum, N and V before the high-digit fixup.
            self.p.set_if(Z, (a + v + c) & 0xFF == 0);
            self.p.set_if(N, tmp & 0x80 != 0);
            self.p
                .set_if(V, (a ^ tmp) & 0x80 != 0 && (a ^ v) & 0x80 == 0);
            if tmp & 0x1F0 > 0x90 {
                tmp += 0x60;
            }
            self.p.set_if(C, tmp & 0xFF0 > 0xF0);
            self.a = tmp as u8;
        } else {
            let tmp = a + v + c;
            self.p.set_if(C, tmp > 0xFF);
            self.p
                .set_if(V, (a ^ v) & 0x80 == 0 && (a ^ tmp) & 0x80 != 0);
            self.a = tmp as u8;
            self.p.update_nz(self.a);
        }
    }

    /// Flags always come from the binary difference, decimal mode or not.
    pub(crate) fn sbc(&mut self, val: u8) {
        let a = u32::from(self.a);
        let v = u32::from(val);
        let borrow = u32::from(1 - self.carry());
        let tmp = a.wrapping_sub(v).wrapping_sub(borrow);

        let result = if self.p.is_set(D) {
            let mut tmp_a = (a & 0x0F).wrapping_sub(v & 0x0F).wrapping_sub(borrow);
            tmp_a = if tmp_a & 0x10 != 0 {
                (tmp_a.wrapping_sub(6) & 0x0F) | (a & 0xF0).wrapping_sub(v & 0xF0).wrapping_sub(0x10)
            } else {
                (tmp_a & 0x0F) | (a & 0xF0).wrapping_sub(v & 0xF0)
            };
            if tmp_a & 0x100 != 0 {
                tmp_a = tmp_a.wrapping_sub(0x60);
            }
            tmp_a
        } else {
            tmp
        };

        self.p.set_if(C, tmp < 0x100);
        self.p.update_nz(tmp as u8);
        self.p
            .set_if(V, (a ^ tmp) & 0x80 != 0 && (a ^ v) & 0x80 != 0);
        self.a = result as u8;
    }

    // ========================================================================
    // Shifts and increments (RMW results)
    // ========================================================================

    pub(crate) fn asl(&mut self, val: u8) -> u8 {
        self.p.set_if(C, val & 0x80 != 0);
        let result = val << 1;
        self.p.update_nz(result);
        result
    }

    pub(crate) fn lsr(&mut self, val: u8) -> u8 {
        self.p.set_if(C, val & 0x01 != 0);
        let result = val >> 1;
        self.p.update_nz(result);
        result
    }

    pub(crate) fn rol(&mut self, val: u8) -> u8 {
        let carry = self.carry();
        self.p.set_if(C, val & 0x80 != 0);
        let result = (val << 1) | carry;
        self.p.update_nz(result);
        result
    }

    pub(crate) fn ror(&mut self, val: u8) -> u8 {
        let carry = self.carry() << 7;
        self.p.set_if(C, val & 0x01 != 0);
        let result = (val >> 1) | carry;
        self.p.update_nz(result);
        result
    }

    pub(crate) fn inc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        self.p.update_nz(result);
        result
    }

    pub(crate) fn dec(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        self.p.update_nz(result);
        result
    }

    // ========================================================================
    // Undocumented
    // ========================================================================

    pub(crate) fn slo(&mut self, val: u8) -> u8 {
        let result = self.asl(val);
        self.ora(result);
        result
    }

    pub(crate) fn rla(&mut self, val: u8) -> u8 {
        let result = self.rol(val);
        self.and(result);
        result
    }

    pub(crate) fn sre(&mut self, val: u8) -> u8 {
        let result = self.lsr(val);
        self.eor(result);
        result
    }

    pub(crate) fn rra(&mut self, val: u8) -> u8 {
        let result = self.ror(val);
        self.adc(result);
        result
    }

    pub(crate) fn dcp(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        self.compare(self.a, result);
        result
    }

    pub(crate) fn isb(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        self.sbc(result);
        result
    }

    pub(crate) fn anc(&mut self, val: u8) {
        self.and(val);
        self.p.set_if(C, self.a & 0x80 != 0);
    }

    pub(crate) fn asr(&mut self, val: u8) {
        let tmp = self.a & val;
        self.p.set_if(C, tmp & 0x01 != 0);
        self.a = tmp >> 1;
        self.p.update_nz(self.a);
    }

    pub(crate) fn arr(&mut self, val: u8) {
        let tmp = self.a & val;
        let carry = self.carry();
        if self.p.is_set(D) {
            let mut t2 = (tmp >> 1) | (carry << 7);
            self.p.set_if(N, carry != 0);
            self.p.set_if(Z, t2 == 0);
            self.p.set_if(V, (t2 ^ tmp) & 0x40 != 0);
            if u16::from(tmp & 0x0F) + u16::from(tmp & 0x01) > 0x05 {
                t2 = (t2 & 0xF0) | (t2.wrapping_add(0x06) & 0x0F);
            }
            if u16::from(tmp & 0xF0) + u16::from(tmp & 0x10) > 0x50 {
                t2 = (t2 & 0x0F) | (t2.wrapping_add(0x60) & 0xF0);
                self.p.set(C);
            } else {
                self.p.clear(C);
            }
            self.a = t2;
        } else {
            let result = (tmp >> 1) | (carry << 7);
            self.p.update_nz(result);
            self.p.set_if(C, result & 0x40 != 0);
            self.p
                .set_if(V, (result & 0x40) ^ ((result & 0x20) << 1) != 0);
            self.a = result;
        }
    }

    pub(crate) fn ane(&mut self, val: u8, magic: u8) {
        self.a = (self.a | magic) & self.x & val;
        self.p.update_nz(self.a);
    }

    pub(crate) fn lxa(&mut self, val: u8, magic: u8) {
        self.a = (self.a | magic) & val;
        self.x = self.a;
        self.p.update_nz(self.a);
    }

    pub(crate) fn las(&mut self, val: u8) {
        self.a = self.sp & val;
        self.x = self.a;
        self.sp = self.a;
        self.p.update_nz(self.a);
    }

    pub(crate) fn lax(&mut self, val: u8) {
        self.a = val;
        self.x = val;
        self.p.update_nz(val);
    }

    pub(crate) fn sbx(&mut self, val: u8) {
        let tmp = u16::from(self.a & self.x).wrapping_sub(u16::from(val));
        self.p.set_if(C, tmp < 0x100);
        self.x = tmp as u8;
        self.p.update_nz(self.x);
    }
}
