//! Instruction semantics over the 65C816 register file.
//!
//! Operands arrive as `u16`; in 8-bit mode only the low byte is used and
//! the high byte of the destination register is left alone (A) or zero
//! (X, Y).

use mos_6502::flags::{C, D, N, V, Z};

use crate::Registers65816;

impl Registers65816 {
    fn carry(&self) -> u32 {
        u32::from(self.p.is_set(C))
    }

    fn update_nz_sized(&mut self, value: u16, wide: bool) {
        if wide {
            self.p.update_nz16(value);
        } else {
            self.p.update_nz(value as u8);
        }
    }

    /// Write the accumulator at the current M width and set N/Z.
    pub(crate) fn set_a(&mut self, value: u16) {
        if self.m8() {
            self.a = (self.a & 0xFF00) | (value & 0x00FF);
            self.p.update_nz(value as u8);
        } else {
            self.a = value;
            self.p.update_nz16(value);
        }
    }

    fn index_value(&self, value: u16) -> u16 {
        if self.x8() { value & 0x00FF } else { value }
    }

    pub(crate) fn set_x(&mut self, value: u16) {
        self.x = self.index_value(value);
        self.update_nz_sized(self.x, !self.x8());
    }

    pub(crate) fn set_y(&mut self, value: u16) {
        self.y = self.index_value(value);
        self.update_nz_sized(self.y, !self.x8());
    }

    // ========================================================================
    // Loads and logic
    // ========================================================================

    pub(crate) fn ora(&mut self, val: u16) {
        self.set_a(self.a | val);
    }

    pub(crate) fn and(&mut self, val: u16) {
        self.set_a(self.a & val);
    }

    pub(crate) fn eor(&mut self, val: u16) {
        self.set_a(self.a ^ val);
    }

    /// BIT. The immediate form only touches Z.
    pub(crate) fn bit(&mut self, val: u16, immediate: bool) {
        let (mask, sign) = if self.m8() { (0x00FF, 0x0080) } else { (0xFFFF, 0x8000) };
        self.p.set_if(Z, self.a & val & mask == 0);
        if !immediate {
            self.p.set_if(N, val & sign != 0);
            self.p.set_if(V, val & (sign >> 1) != 0);
        }
    }

    pub(crate) fn compare(&mut self, reg: u16, val: u16, wide: bool) {
        if wide {
            self.p.set_if(C, reg >= val);
            self.p.update_nz16(reg.wrapping_sub(val));
        } else {
            let (reg, val) = (reg as u8, val as u8);
            self.p.set_if(C, reg >= val);
            self.p.update_nz(reg.wrapping_sub(val));
        }
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// ADC. Decimal mode has no NMOS quirks: flags follow the adjusted
    /// result.
    pub(crate) fn adc(&mut self, val: u16) {
        let carry = self.carry();
        let decimal = self.p.is_set(D);
        let v = u32::from(val);
        if self.m8() {
            let a = u32::from(self.a & 0x00FF);
            let v = v & 0x00FF;
            let tmp = if decimal {
                let lo = (a & 0x0F) + (v & 0x0F) + carry;
                let mut tmp = (a & 0xF0) + (v & 0xF0) + lo;
                if lo > 0x09 {
                    tmp += 0x06;
                }
                if tmp > 0x99 {
                    tmp += 0x60;
                }
                tmp
            } else {
                a + v + carry
            };
            self.p.set_if(C, tmp & 0x100 != 0);
            self.p.set_if(V, !(a ^ v) & (a ^ tmp) & 0x80 != 0);
            self.set_a(tmp as u16);
        } else {
            let a = u32::from(self.a);
            let tmp = if decimal {
                let d0 = (a & 0x000F) + (v & 0x000F) + carry;
                let mut d1 = (a & 0x00F0) + (v & 0x00F0) + d0;
                if d0 > 0x09 {
                    d1 += 0x06;
                }
                let mut d2 = (a & 0x0F00) + (v & 0x0F00) + d1;
                if d1 > 0x99 {
                    d2 += 0x60;
                }
                let mut d3 = (a & 0xF000) + (v & 0xF000) + d2;
                if d2 > 0x999 {
                    d3 += 0x600;
                }
                if d3 > 0x9999 {
                    d3 += 0x6000;
                }
                d3
            } else {
                a + v + carry
            };
            self.p.set_if(C, tmp & 0x1_0000 != 0);
            self.p.set_if(V, !(a ^ v) & (a ^ tmp) & 0x8000 != 0);
            self.set_a(tmp as u16);
        }
    }

    pub(crate) fn sbc(&mut self, val: u16) {
        let carry = self.carry();
        let borrow = 1 - carry;
        let decimal = self.p.is_set(D);
        let v = u32::from(val);
        if self.m8() {
            let a = u32::from(self.a & 0x00FF);
            let v = v & 0x00FF;
            let tmp = if decimal {
                let lo = (a & 0x0F).wrapping_sub(v & 0x0F).wrapping_sub(borrow);
                let mut tmp = (a & 0xF0).wrapping_sub(v & 0xF0).wrapping_add(lo);
                if lo > 0xFF {
                    tmp = tmp.wrapping_sub(0x06);
                }
                if tmp > 0xFF {
                    tmp = tmp.wrapping_sub(0x60);
                }
                self.p.set_if(C, tmp & 0x100 == 0);
                tmp
            } else {
                let tmp = carry + (v ^ 0xFF) + a;
                self.p.set_if(C, tmp & 0x100 != 0);
                tmp
            };
            self.p.set_if(V, (a ^ v) & (a ^ tmp) & 0x80 != 0);
            self.set_a(tmp as u16);
        } else {
            let a = u32::from(self.a);
            let tmp = if decimal {
                let d0 = (a & 0x000F).wrapping_sub(v & 0x000F).wrapping_sub(borrow);
                let mut d1 = (a & 0x00F0).wrapping_sub(v & 0x00F0).wrapping_add(d0);
                if d0 > 0xFFFF {
                    d1 = d1.wrapping_sub(0x06);
                }
                let mut d2 = (a & 0x0F00).wrapping_sub(v & 0x0F00).wrapping_add(d1);
                if d1 > 0xFFFF {
                    d2 = d2.wrapping_sub(0x60);
                }
                let mut d3 = (a & 0xF000).wrapping_sub(v & 0xF000).wrapping_add(d2);
                if d2 > 0xFFFF {
                    d3 = d3.wrapping_sub(0x600);
                }
                if d3 > 0xFFFF {
                    d3 = d3.wrapping_sub(0x6000);
                }
                self.p.set_if(C, d3 & 0x1_0000 == 0);
                d3
            } else {
                let tmp = carry + (v ^ 0xFFFF) + a;
                self.p.set_if(C, tmp & 0x1_0000 != 0);
                tmp
            };
            self.p.set_if(V, (a ^ v) & (a ^ tmp) & 0x8000 != 0);
            self.set_a(tmp as u16);
        }
    }

    // ========================================================================
    // Read-modify-write (width from M)
    // ========================================================================

    fn sign_bit(&self) -> u16 {
        if self.m8() { 0x0080 } else { 0x8000 }
    }

    fn finish_rmw(&mut self, result: u16) -> u16 {
        let wide = !self.m8();
        let result = if wide { result } else { result & 0x00FF };
        self.update_nz_sized(result, wide);
        result
    }

    pub(crate) fn asl(&mut self, val: u16) -> u16 {
        self.p.set_if(C, val & self.sign_bit() != 0);
        self.finish_rmw(val << 1)
    }

    pub(crate) fn lsr(&mut self, val: u16) -> u16 {
        let val = if self.m8() { val & 0x00FF } else { val };
        self.p.set_if(C, val & 0x0001 != 0);
        self.finish_rmw(val >> 1)
    }

    pub(crate) fn rol(&mut self, val: u16) -> u16 {
        let carry = self.carry() as u16;
        self.p.set_if(C, val & self.sign_bit() != 0);
        self.finish_rmw((val << 1) | carry)
    }

    pub(crate) fn ror(&mut self, val: u16) -> u16 {
        let sign = self.sign_bit();
        let carry = if self.p.is_set(C) { sign } else { 0 };
        let val = if self.m8() { val & 0x00FF } else { val };
        self.p.set_if(C, val & 0x0001 != 0);
        self.finish_rmw((val >> 1) | carry)
    }

    pub(crate) fn inc(&mut self, val: u16) -> u16 {
        self.finish_rmw(val.wrapping_add(1))
    }

    pub(crate) fn dec(&mut self, val: u16) -> u16 {
        self.finish_rmw(val.wrapping_sub(1))
    }

    /// TSB: Z from A AND memory, then set the A bits in memory.
    pub(crate) fn tsb(&mut self, val: u16) -> u16 {
        let mask = if self.m8() { 0x00FF } else { 0xFFFF };
        self.p.set_if(Z, val & self.a & mask == 0);
        (val | self.a) & mask
    }

    /// TRB: Z from A AND memory, then clear the A bits in memory.
    pub(crate) fn trb(&mut self, val: u16) -> u16 {
        let mask = if self.m8() { 0x00FF } else { 0xFFFF };
        self.p.set_if(Z, val & self.a & mask == 0);
        val & !self.a & mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::M;

    fn native16(a: u16, flags: u8) -> Registers65816 {
        let mut r = Registers65816::new();
        r.enter_native();
        r.set_status(flags & !M);
        r.a = a;
        r
    }

    fn emulation(a: u8, flags: u8) -> Registers65816 {
        let mut r = Registers65816::new();
        r.set_status(flags);
        r.a = 0xAB00 | u16::from(a);
        r
    }

    #[test]
    fn eight_bit_adc_preserves_b() {
        let mut r = emulation(0x50, 0);
        r.adc(0x50);
        assert_eq!(r.a, 0xABA0);
        assert!(r.p.is_set(V));
        assert!(r.p.is_set(N));
    }

    #[test]
    fn sixteen_bit_adc_carries_out_of_bit_15() {
        let mut r = native16(0xFFFF, 0);
        r.adc(0x0001);
        assert_eq!(r.a, 0x0000);
        assert!(r.p.is_set(C));
        assert!(r.p.is_set(Z));
        assert!(!r.p.is_set(V));
    }

    #[test]
    fn decimal_flags_follow_adjusted_result() {
        let mut r = emulation(0x99, D);
        r.adc(0x01);
        assert_eq!(r.a & 0xFF, 0x00);
        assert!(r.p.is_set(C));
        assert!(r.p.is_set(Z));
    }

    #[test]
    fn sixteen_bit_decimal_add_and_subtract() {
        let mut r = native16(0x1999, D);
        r.adc(0x0001);
        assert_eq!(r.a, 0x2000);
        assert!(!r.p.is_set(C));

        let mut r = native16(0x9999, D);
        r.adc(0x0001);
        assert_eq!(r.a, 0x0000);
        assert!(r.p.is_set(C));

        let mut r = native16(0x2000, D | C);
        r.sbc(0x0001);
        assert_eq!(r.a, 0x1999);
        assert!(r.p.is_set(C));

        let mut r = native16(0x0000, D | C);
        r.sbc(0x0001);
        assert_eq!(r.a, 0x9999);
        assert!(!r.p.is_set(C));
    }

    #[test]
    fn eight_bit_decimal_subtract_borrows() {
        let mut r = emulation(0x00, D | C);
        r.sbc(0x01);
        assert_eq!(r.a & 0xFF, 0x99);
        assert!(!r.p.is_set(C));
    }

    #[test]
    fn sixteen_bit_binary_subtract() {
        let mut r = native16(0x8000, C);
        r.sbc(0x0001);
        assert_eq!(r.a, 0x7FFF);
        assert!(r.p.is_set(C));
        assert!(r.p.is_set(V));
    }

    #[test]
    fn immediate_bit_only_sets_z() {
        let mut r = emulation(0x01, N | V);
        r.bit(0x00, true);
        assert!(r.p.is_set(Z));
        assert!(r.p.is_set(N));
        assert!(r.p.is_set(V));
        r.bit(0x00, false);
        assert!(!r.p.is_set(N));
        assert!(!r.p.is_set(V));
    }

    #[test]
    fn tsb_and_trb() {
        let mut r = native16(0x0F0F, 0);
        assert_eq!(r.tsb(0xF000), 0xFF0F);
        assert!(r.p.is_set(Z));
        assert_eq!(r.trb(0xFFFF), 0xF0F0);
        assert!(!r.p.is_set(Z));
    }

    #[test]
    fn sixteen_bit_shifts_use_bit_15() {
        let mut r = native16(0, 0);
        assert_eq!(r.asl(0x8001), 0x0002);
        assert!(r.p.is_set(C));
        assert_eq!(r.ror(0x0002), 0x8001);
        assert!(!r.p.is_set(C));
        assert!(r.p.is_set(N));
    }

    #[test]
    fn eight_bit_index_loads_are_truncated() {
        let mut r = emulation(0, 0);
        r.set_x(0x1280);
        assert_eq!(r.x, 0x0080);
        assert!(r.p.is_set(N));
    }
}
