//! Displacement encoding and general addressing-mode operands.
//!
//! Operand extensions follow the opcode bytes in operand order. Displacements
//! use a variable-length, most-significant-byte-first encoding whose top
//! bits in the first byte select the length:
//!
//! | first byte | length | range |
//! |------------|--------|-------|
//! | `0xxxxxxx` | 1 | -64..=63 |
//! | `10xxxxxx` | 2 | -8192..=8191 |
//! | `11xxxxxx` | 4 | -2^29..=2^29-1 |

use std::fmt;

use crate::Width;

/// Smallest value a displacement can hold.
pub const DISPLACEMENT_MIN: i32 = -(1 << 29);

/// Largest value a displacement can hold.
pub const DISPLACEMENT_MAX: i32 = (1 << 29) - 1;

/// Decodes the displacement starting at `bytes[offset]`.
///
/// Returns the sign-extended value and its length, or `None` when the
/// encoding runs past the end of `bytes`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn decode_displacement(bytes: &[u8], offset: usize) -> Option<(i32, usize)> {
    let first = *bytes.get(offset)?;
    match first >> 6 {
        0 | 1 => Some((i32::from(((first << 1) as i8) >> 1), 1)),
        2 => {
            let second = *bytes.get(offset + 1)?;
            let raw = u16::from_be_bytes([first, second]);
            Some((i32::from(((raw << 2) as i16) >> 2), 2))
        }
        _ => {
            let raw = bytes.get(offset..offset + 4)?;
            let raw = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
            Some((((raw << 2) as i32) >> 2, 4))
        }
    }
}

/// Encodes `value` in the shortest displacement form, or `None` when it is out of range.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn encode_displacement(value: i32) -> Option<Vec<u8>> {
    if (-64..=63).contains(&value) {
        Some(vec![(value as u8) & 0x7F])
    } else if (-8192..=8191).contains(&value) {
        Some((((value as u16) & 0x3FFF) | 0x8000).to_be_bytes().to_vec())
    } else if (DISPLACEMENT_MIN..=DISPLACEMENT_MAX).contains(&value) {
        Some((((value as u32) & 0x3FFF_FFFF) | 0xC000_0000).to_be_bytes().to_vec())
    } else {
        None
    }
}

/// Dedicated register a memory addressing mode is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Base {
    /// Frame pointer.
    Fp,
    /// Current stack pointer.
    Sp,
    /// Static base.
    Sb,
    /// Address of the current instruction.
    Pc,
}

impl Base {
    /// Assembler name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fp => "FP",
            Self::Sp => "SP",
            Self::Sb => "SB",
            Self::Pc => "PC",
        }
    }
}

/// A decoded general operand: addressing mode plus its extension fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum GenOperand {
    /// `Rn`, modes 0..=7.
    Register(u8),
    /// `disp(Rn)`, modes 8..=15.
    RegisterRelative {
        /// Register number.
        register: u8,
        /// Added to the register.
        displacement: i32,
    },
    /// `disp2(disp1(base))`, modes 16..=18: a pointer at `base + disp1`, plus `disp2`.
    MemoryRelative {
        /// FP, SP or SB.
        base: Base,
        /// Offset of the pointer from the base.
        displacement: i32,
        /// Added to the fetched pointer.
        offset: i32,
    },
    /// Mode 19.
    Reserved,
    /// `#value`, mode 20. Stored most significant byte first.
    Immediate {
        /// Zero-extended value.
        value: u32,
        /// Size of the value in the instruction stream.
        width: Width,
    },
    /// `@disp`, mode 21.
    Absolute(i32),
    /// `EXT(index) + offset`, mode 22: a link-table entry of the current module.
    External {
        /// Link-table entry number.
        index: i32,
        /// Added to the fetched pointer.
        offset: i32,
    },
    /// `TOS`, mode 23: pop on read, push on write.
    TopOfStack,
    /// `disp(base)`, modes 24..=27.
    MemorySpace {
        /// FP, SP, SB or PC.
        base: Base,
        /// Added to the base.
        displacement: i32,
    },
    /// Scaled-index modes 28..=31.
    ScaledIndex(u8),
}

impl GenOperand {
    /// Decodes the operand for mode `code` whose extension starts at `bytes[offset]`.
    ///
    /// `width` sizes the immediate mode. Returns the operand and the number of
    /// extension bytes it consumed, or `None` when `bytes` is too short.
    #[must_use]
    pub fn decode(code: u8, bytes: &[u8], offset: usize, width: Width) -> Option<(Self, usize)> {
        let operand = match code & 0x1F {
            reg @ 0..=7 => (Self::Register(reg), 0),
            mode @ 8..=15 => {
                let (displacement, len) = decode_displacement(bytes, offset)?;
                (
                    Self::RegisterRelative {
                        register: mode - 8,
                        displacement,
                    },
                    len,
                )
            }
            mode @ 16..=18 => {
                let (displacement, first) = decode_displacement(bytes, offset)?;
                let (extra, second) = decode_displacement(bytes, offset + first)?;
                let base = [Base::Fp, Base::Sp, Base::Sb][usize::from(mode - 16)];
                (
                    Self::MemoryRelative {
                        base,
                        displacement,
                        offset: extra,
                    },
                    first + second,
                )
            }
            19 => (Self::Reserved, 0),
            20 => {
                let len = width.bytes() as usize;
                let raw = bytes.get(offset..offset + len)?;
                let value = raw
                    .iter()
                    .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));
                (Self::Immediate { value, width }, len)
            }
            21 => {
                let (disp, len) = decode_displacement(bytes, offset)?;
                (Self::Absolute(disp), len)
            }
            22 => {
                let (index, first) = decode_displacement(bytes, offset)?;
                let (extra, second) = decode_displacement(bytes, offset + first)?;
                (
                    Self::External {
                        index,
                        offset: extra,
                    },
                    first + second,
                )
            }
            23 => (Self::TopOfStack, 0),
            mode @ 24..=27 => {
                let (displacement, len) = decode_displacement(bytes, offset)?;
                let base = [Base::Fp, Base::Sp, Base::Sb, Base::Pc][usize::from(mode - 24)];
                (Self::MemorySpace { base, displacement }, len)
            }
            mode => (Self::ScaledIndex(mode), 0),
        };
        Some(operand)
    }

    /// Returns `true` for the register modes 0..=7.
    #[must_use]
    pub const fn is_register(self) -> bool {
        matches!(self, Self::Register(_))
    }
}

/// Number of extension bytes the operand in mode `code` occupies at `bytes[offset]`.
#[must_use]
pub fn gen_size(code: u8, bytes: &[u8], offset: usize, width: Width) -> Option<usize> {
    GenOperand::decode(code, bytes, offset, width).map(|(_, len)| len)
}

impl fmt::Display for GenOperand {
    #[allow(clippy::cast_sign_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Register(reg) => write!(f, "R{reg}"),
            Self::RegisterRelative {
                register,
                displacement,
            } => write!(f, "{displacement}(R{register})"),
            Self::MemoryRelative {
                base,
                displacement,
                offset,
            } => write!(f, "{offset}({displacement}({}))", base.name()),
            Self::Reserved => f.write_str("[reserved]"),
            Self::Immediate { value, width } => match width {
                Width::Byte => write!(f, "#{value:02X}"),
                Width::Word => write!(f, "#{value:04X}"),
                Width::Double => write!(f, "#{value:08X}"),
            },
            Self::Absolute(disp) => write!(f, "@{:06X}", disp as u32),
            Self::External { index, offset } => write!(f, "EXT({index}) + {offset}"),
            Self::TopOfStack => f.write_str("TOS"),
            Self::MemorySpace {
                base: Base::Pc,
                displacement,
            } => write!(f, "* + {displacement}"),
            Self::MemorySpace { base, displacement } => {
                write!(f, "{displacement}({})", base.name())
            }
            Self::ScaledIndex(_) => f.write_str("[scaled index]"),
        }
    }
}
