//! Integer data operations: quick forms, dedicated registers, two-operand
//! arithmetic and logic, shifts, bit tests and short bit fields.

use tracing::debug;

use crate::decode::{BinaryOp, FieldOp, ProcessorRegisterOp, QuickOp};
use crate::encoding::Width;
use crate::operand::GenOperand;
use crate::state::{PSR_C, PSR_F, PSR_L, PSR_N, PSR_Z};
use crate::{RegisterBus, RegisterCpu, Trap};

use super::arith::{add_with_carry, compare, divide, subtract_with_borrow, ArithResult, DivideOp};
use super::{Fault, Fetch, Location, Next};

impl RegisterCpu {
    pub(super) fn execute_quick(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        op: QuickOp,
        width: Width,
        value: i32,
        operand: GenOperand,
    ) -> Result<Next, Fault> {
        let loc = self.locate(bus, fetch, operand)?;
        match op {
            QuickOp::Addq => {
                let current = self.read(bus, loc, width);
                let result = add_with_carry(width, current, value as u32, false);
                self.write(bus, loc, width, result.value)?;
                self.set_arith_flags(result);
            }
            QuickOp::Cmpq => {
                let current = self.read(bus, loc, width);
                self.set_compare_flags(width, value as u32, current);
            }
            QuickOp::Movq => self.write(bus, loc, width, value as u32)?,
        }
        Ok(Next::Sequential)
    }

    pub(super) fn execute_processor_register(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        op: ProcessorRegisterOp,
        width: Width,
        register: u8,
        operand: GenOperand,
    ) -> Result<Next, Fault> {
        if matches!(register, 13 | 14) {
            self.require_supervisor()?;
        }
        match op {
            ProcessorRegisterOp::Spr => {
                let value = self.processor_register(register)?;
                let loc = self.locate(bus, fetch, operand)?;
                self.write(bus, loc, width, value)?;
            }
            ProcessorRegisterOp::Lpr => {
                let old = self.processor_register(register)?;
                let value = width.merge(old, self.read_operand(bus, fetch, operand, width)?);
                self.set_processor_register(register, value);
                debug!(register, value, "processor register loaded");
            }
        }
        Ok(Next::Sequential)
    }

    fn processor_register(&self, register: u8) -> Result<u32, Fault> {
        Ok(match register {
            0 => self.regs.sp[1],
            8 => self.regs.fp,
            9 => self.regs.sp(),
            10 => self.regs.sb,
            13 => u32::from(self.regs.psr),
            14 => self.regs.intbase,
            15 => u32::from(self.regs.mod_),
            _ => return Err(Trap::Und.into()),
        })
    }

    const fn set_processor_register(&mut self, register: u8, value: u32) {
        match register {
            0 => self.regs.sp[1] = value,
            8 => self.regs.fp = value,
            9 => self.regs.set_sp(value),
            10 => self.regs.sb = value,
            13 => self.regs.psr = value as u16,
            14 => self.regs.intbase = value,
            _ => self.regs.mod_ = value as u16,
        }
    }

    pub(super) fn execute_binary(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        op: BinaryOp,
        width: Width,
        source: GenOperand,
        destination: GenOperand,
    ) -> Result<Next, Fault> {
        match op {
            BinaryOp::Addr => {
                let addr = self.effective_address(bus, fetch, source)?;
                let dest = self.locate(bus, fetch, destination)?;
                self.write(bus, dest, Width::Double, addr)?;
            }
            BinaryOp::Subp | BinaryOp::Addp | BinaryOp::Mei | BinaryOp::Dei => {
                return Err(fetch.unimplemented())
            }
            BinaryOp::Tbit
            | BinaryOp::Cbit
            | BinaryOp::Cbiti
            | BinaryOp::Sbit
            | BinaryOp::Sbiti
            | BinaryOp::Ibit => {
                let offset = width.sign_extend(self.read_operand(bus, fetch, source, width)?);
                let base = self.locate(bus, fetch, destination)?;
                self.execute_bit(bus, op, base, offset)?;
            }
            BinaryOp::Quo | BinaryOp::Rem | BinaryOp::Div | BinaryOp::Mod => {
                let divisor = self.read_operand(bus, fetch, source, width)?;
                if divisor & width.mask() == 0 {
                    return Err(Trap::Dvz.into());
                }
                let dest = self.locate(bus, fetch, destination)?;
                let dividend = self.read(bus, dest, width);
                let kind = match op {
                    BinaryOp::Quo => DivideOp::Quo,
                    BinaryOp::Rem => DivideOp::Rem,
                    BinaryOp::Div => DivideOp::Div,
                    _ => DivideOp::Mod,
                };
                let value = divide(kind, width, dividend, divisor).ok_or(Trap::Dvz)?;
                self.write(bus, dest, width, value)?;
            }
            _ => {
                let value = self.read_operand(bus, fetch, source, op.source_width(width))?;
                let dest = self.locate(bus, fetch, destination)?;
                self.execute_value_op(bus, op, width, value, dest)?;
            }
        }
        Ok(Next::Sequential)
    }

    /// Operations that read a source value and then read, modify or replace the destination.
    fn execute_value_op(
        &mut self,
        bus: &mut dyn RegisterBus,
        op: BinaryOp,
        width: Width,
        src: u32,
        dest: Location,
    ) -> Result<(), Fault> {
        let result = match op {
            BinaryOp::Mov => src,
            BinaryOp::Cmp => {
                let second = self.read(bus, dest, width);
                self.set_compare_flags(width, src, second);
                return Ok(());
            }
            BinaryOp::Add | BinaryOp::Addc | BinaryOp::Sub | BinaryOp::Subc => {
                let current = self.read(bus, dest, width);
                let carry = matches!(op, BinaryOp::Addc | BinaryOp::Subc) && self.regs.flag(PSR_C);
                let result = if matches!(op, BinaryOp::Add | BinaryOp::Addc) {
                    add_with_carry(width, current, src, carry)
                } else {
                    subtract_with_borrow(width, current, src, carry)
                };
                self.set_arith_flags(result);
                result.value
            }
            BinaryOp::Bic => self.read(bus, dest, width) & !src,
            BinaryOp::Or => self.read(bus, dest, width) | src,
            BinaryOp::And => self.read(bus, dest, width) & src,
            BinaryOp::Xor => self.read(bus, dest, width) ^ src,
            BinaryOp::Mul => self.read(bus, dest, width).wrapping_mul(src),
            BinaryOp::Rot => {
                let count = (src as u8 as i8).rem_euclid(width.bits() as i8);
                rotate_left(width, self.read(bus, dest, width), count as u32)
            }
            BinaryOp::Ash => arithmetic_shift(width, self.read(bus, dest, width), src as u8 as i8),
            BinaryOp::Lsh => logical_shift(width, self.read(bus, dest, width), src as u8 as i8),
            BinaryOp::Neg => {
                let result = subtract_with_borrow(width, 0, src, false);
                self.set_arith_flags(result);
                result.value
            }
            BinaryOp::Not => src ^ 1,
            BinaryOp::Abs => {
                let signed = width.sign_extend(src);
                self.regs.set_flag(PSR_F, src & width.mask() == width.sign_bit());
                signed.wrapping_abs() as u32
            }
            BinaryOp::Com => !src,
            BinaryOp::Movxbw => Width::Byte.sign_extend(src) as u32,
            BinaryOp::Movzbw => src & Width::Byte.mask(),
            BinaryOp::Movxd => width.sign_extend(src) as u32,
            BinaryOp::Movzd => src & width.mask(),
            _ => return Err(Trap::Und.into()),
        };
        self.write(bus, dest, op.destination_width(width), result)
    }

    /// Bit test and modify on `base`: registers hold 32 bits, memory is bit-addressed
    /// from the base byte with a signed offset.
    fn execute_bit(
        &mut self,
        bus: &mut dyn RegisterBus,
        op: BinaryOp,
        base: Location,
        offset: i32,
    ) -> Result<(), Fault> {
        let (loc, width, bit) = match base {
            Location::Register(_) => (base, Width::Double, (offset & 31) as u32),
            Location::Memory(_) | Location::TopOfStack => {
                let addr = self.address(base)?;
                let byte = addr.wrapping_add_signed(offset >> 3) & crate::ADDRESS_MASK;
                (Location::Memory(byte), Width::Byte, (offset & 7) as u32)
            }
            Location::Immediate(_) => return Err(Trap::Ill.into()),
        };
        let value = self.read(bus, loc, width);
        let mask = 1u32 << bit;
        self.regs.set_flag(PSR_F, value & mask != 0);
        let updated = match op {
            BinaryOp::Cbit | BinaryOp::Cbiti => value & !mask,
            BinaryOp::Sbit | BinaryOp::Sbiti => value | mask,
            BinaryOp::Ibit => value ^ mask,
            _ => return Ok(()),
        };
        self.write(bus, loc, width, updated)
    }

    /// `INSS` and `EXTS` on a 32-bit base; fields crossing bit 31 are not modelled.
    pub(super) fn execute_field(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        op: FieldOp,
        width: Width,
        (source, destination): (GenOperand, GenOperand),
        (offset, length): (u8, u8),
    ) -> Result<Next, Fault> {
        if u32::from(offset) + u32::from(length) > 32 {
            return Err(fetch.unimplemented());
        }
        let field = if length >= 32 {
            u32::MAX
        } else {
            (1u32 << length) - 1
        };
        let shift = u32::from(offset);
        match op {
            FieldOp::Inss => {
                let value = self.read_operand(bus, fetch, source, width)?;
                let base = self.locate(bus, fetch, destination)?;
                let old = self.read(bus, base, Width::Double);
                let merged = (old & !(field << shift)) | ((value & field) << shift);
                self.write(bus, base, Width::Double, merged)?;
            }
            FieldOp::Exts => {
                let base = self.read_operand(bus, fetch, source, Width::Double)?;
                let dest = self.locate(bus, fetch, destination)?;
                self.write(bus, dest, width, (base >> shift) & field)?;
            }
        }
        Ok(Next::Sequential)
    }

    const fn set_arith_flags(&mut self, result: ArithResult) {
        self.regs.set_flag(PSR_C, result.carry);
        self.regs.set_flag(PSR_F, result.overflow);
    }

    const fn set_compare_flags(&mut self, width: Width, first: u32, second: u32) {
        let cmp = compare(width, first, second);
        self.regs.set_flag(PSR_Z, cmp.equal);
        self.regs.set_flag(PSR_N, cmp.greater);
        self.regs.set_flag(PSR_L, cmp.higher);
    }
}

const fn rotate_left(width: Width, value: u32, count: u32) -> u32 {
    let value = value & width.mask();
    if count == 0 {
        return value;
    }
    ((value << count) | (value >> (width.bits() - count))) & width.mask()
}

/// Positive counts shift left, negative counts shift right with sign fill.
fn arithmetic_shift(width: Width, value: u32, count: i8) -> u32 {
    let bits = width.bits();
    let magnitude = u32::from(count.unsigned_abs());
    if count >= 0 {
        value.checked_shl(magnitude).unwrap_or(0) & width.mask()
    } else {
        let signed = width.sign_extend(value);
        (signed >> magnitude.min(bits - 1)) as u32 & width.mask()
    }
}

/// Positive counts shift left, negative counts shift right with zero fill.
fn logical_shift(width: Width, value: u32, count: i8) -> u32 {
    let magnitude = u32::from(count.unsigned_abs());
    let value = value & width.mask();
    let shifted = if count >= 0 {
        value.checked_shl(magnitude)
    } else {
        value.checked_shr(magnitude)
    };
    shifted.unwrap_or(0) & width.mask()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{arithmetic_shift, logical_shift, rotate_left};
    use crate::encoding::Width;

    #[rstest]
    #[case(Width::Byte, 0x81, 1, 0x03)]
    #[case(Width::Byte, 0x81, 7, 0xC0)]
    #[case(Width::Word, 0x1234, 4, 0x2341)]
    #[case(Width::Double, 0x8000_0001, 0, 0x8000_0001)]
    fn rotate_wraps_within_width(
        #[case] width: Width,
        #[case] value: u32,
        #[case] count: u32,
        #[case] expected: u32,
    ) {
        assert_eq!(rotate_left(width, value, count), expected);
    }

    #[test]
    fn arithmetic_right_shift_fills_with_sign() {
        assert_eq!(arithmetic_shift(Width::Byte, 0x80, -2), 0xE0);
        assert_eq!(arithmetic_shift(Width::Byte, 0x80, -100), 0xFF);
        assert_eq!(arithmetic_shift(Width::Word, 0x0001, 15), 0x8000);
        assert_eq!(arithmetic_shift(Width::Word, 0x0001, 16), 0);
    }

    #[test]
    fn logical_right_shift_fills_with_zero() {
        assert_eq!(logical_shift(Width::Byte, 0x80, -2), 0x20);
        assert_eq!(logical_shift(Width::Double, 0xFFFF_FFFF, -32), 0);
        assert_eq!(logical_shift(Width::Double, 1, 31), 0x8000_0000);
    }
}
