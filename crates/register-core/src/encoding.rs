//! Opcode byte classification and raw instruction field layout.
//!
//! The first byte of every instruction selects its format through
//! [`FORMAT_TABLE`]. Field accessors on [`Opcode`] read the first four
//! instruction bytes as one little-endian word.

use crate::state::{PSR_C, PSR_F, PSR_L, PSR_N, PSR_Z};

/// Format number for each first opcode byte; `-1` marks bytes with no format.
pub const FORMAT_TABLE: [i8; 256] = [
    // -0 -1 -2 -3 -4 -5 -6 -7 -8 -9 -A -B -C -D -E -F
    4, 4, 1, 4, 4, 4, 19, 4, 4, 4, 0, 4, 2, 2, 5, 2, // 0-
    4, 4, 1, 4, 4, 4, 15, 4, 4, 4, 0, 4, 2, 2, 14, 2, // 1-
    4, 4, 1, 4, 4, 4, 19, 4, 4, 4, 0, 4, 2, 2, 8, 2, // 2-
    4, 4, 1, 4, 4, 4, 15, 4, 4, 4, 0, 4, 2, 2, 9, 2, // 3-
    4, 4, 1, 4, 4, 4, 19, 4, 4, 4, 0, 4, 2, 2, 6, 2, // 4-
    4, 4, 1, 4, 4, 4, 15, 4, 4, 4, 0, 4, 2, 2, 16, 2, // 5-
    4, 4, 1, 4, 4, 4, 19, 4, 4, 4, 0, 4, 2, 2, 8, 2, // 6-
    4, 4, 1, 4, 4, 4, 15, 4, 4, 4, 0, 4, 3, 3, 10, 3, // 7-
    4, 4, 1, 4, 4, 4, 19, 4, 4, 4, 0, 4, 2, 2, 18, 2, // 8-
    4, 4, 1, 4, 4, 4, 15, 4, 4, 4, 0, 4, 2, 2, 13, 2, // 9-
    4, 4, 1, 4, 4, 4, 19, 4, 4, 4, 0, 4, 2, 2, 8, 2, // A-
    4, 4, 1, 4, 4, 4, 15, 4, 4, 4, 0, 4, 2, 2, 11, 2, // B-
    4, 4, 1, 4, 4, 4, 19, 4, 4, 4, 0, 4, 2, 2, 7, 2, // C-
    4, 4, 1, 4, 4, 4, 15, 4, 4, 4, 0, 4, 2, 2, 17, 2, // D-
    4, 4, 1, 4, 4, 4, 19, 4, 4, 4, 0, 4, 2, 2, 8, 2, // E-
    4, 4, 1, 4, 4, 4, 15, 4, 4, 4, 0, 4, -1, -1, 12, -1, // F-
];

/// Format of an instruction starting with `byte`, or `None` for an undefined byte.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn format_of(byte: u8) -> Option<u8> {
    let format = FORMAT_TABLE[byte as usize];
    if format < 0 {
        None
    } else {
        Some(format as u8)
    }
}

/// Integer operand width selected by an instruction's `i` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Width {
    /// 8 bits.
    Byte,
    /// 16 bits.
    Word,
    /// 32 bits.
    Double,
}

impl Width {
    /// Decodes the 2-bit `i` field; `2` is not a width.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code & 0x3 {
            0 => Some(Self::Byte),
            1 => Some(Self::Word),
            3 => Some(Self::Double),
            _ => None,
        }
    }

    /// Size in bytes.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Double => 4,
        }
    }

    /// Size in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.bytes() * 8
    }

    /// Mask of the bits held by a value of this width.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0x0000_00FF,
            Self::Word => 0x0000_FFFF,
            Self::Double => 0xFFFF_FFFF,
        }
    }

    /// Most significant bit of this width.
    #[must_use]
    pub const fn sign_bit(self) -> u32 {
        match self {
            Self::Byte => 0x0000_0080,
            Self::Word => 0x0000_8000,
            Self::Double => 0x8000_0000,
        }
    }

    /// Sign-extends the low `bits()` of `value`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub const fn sign_extend(self, value: u32) -> i32 {
        match self {
            Self::Byte => value as u8 as i8 as i32,
            Self::Word => value as u16 as i16 as i32,
            Self::Double => value as i32,
        }
    }

    /// Replaces the low `bits()` of `old` with those of `new`.
    #[must_use]
    pub const fn merge(self, old: u32, new: u32) -> u32 {
        (old & !self.mask()) | (new & self.mask())
    }

    /// Mnemonic suffix.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Byte => "B",
            Self::Word => "W",
            Self::Double => "D",
        }
    }
}

/// Condition code tested by `Bcond` and `Scond`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Condition {
    /// Equal: Z set.
    Eq,
    /// Not equal: Z clear.
    Ne,
    /// Carry set.
    Cs,
    /// Carry clear.
    Cc,
    /// Higher: L set.
    H,
    /// Lower or same: L clear.
    Ls,
    /// Greater than: N set.
    Gt,
    /// Less or equal: N clear.
    Le,
    /// Flag set.
    Fs,
    /// Flag clear.
    Fc,
    /// Lower: L and Z clear.
    Lo,
    /// Higher or same: L or Z set.
    Hs,
    /// Less than: N and Z clear.
    Lt,
    /// Greater or equal: N or Z set.
    Ge,
    /// Always.
    R,
    /// Never.
    Rn,
}

impl Condition {
    /// Decodes a 4-bit condition field.
    #[must_use]
    pub const fn from_u4(bits: u32) -> Self {
        match bits & 0xF {
            0 => Self::Eq,
            1 => Self::Ne,
            2 => Self::Cs,
            3 => Self::Cc,
            4 => Self::H,
            5 => Self::Ls,
            6 => Self::Gt,
            7 => Self::Le,
            8 => Self::Fs,
            9 => Self::Fc,
            10 => Self::Lo,
            11 => Self::Hs,
            12 => Self::Lt,
            13 => Self::Ge,
            14 => Self::R,
            _ => Self::Rn,
        }
    }

    /// Evaluates the condition against a PSR value.
    #[must_use]
    pub const fn holds(self, psr: u16) -> bool {
        let z = psr & PSR_Z != 0;
        let c = psr & PSR_C != 0;
        let l = psr & PSR_L != 0;
        let n = psr & PSR_N != 0;
        let f = psr & PSR_F != 0;
        match self {
            Self::Eq => z,
            Self::Ne => !z,
            Self::Cs => c,
            Self::Cc => !c,
            Self::H => l,
            Self::Ls => !l,
            Self::Gt => n,
            Self::Le => !n,
            Self::Fs => f,
            Self::Fc => !f,
            Self::Lo => !(l || z),
            Self::Hs => l || z,
            Self::Lt => !(n || z),
            Self::Ge => n || z,
            Self::R => true,
            Self::Rn => false,
        }
    }

    /// Mnemonic suffix (`EQ`, `NE`, ...).
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Cs => "CS",
            Self::Cc => "CC",
            Self::H => "H",
            Self::Ls => "LS",
            Self::Gt => "GT",
            Self::Le => "LE",
            Self::Fs => "FS",
            Self::Fc => "FC",
            Self::Lo => "LO",
            Self::Hs => "HS",
            Self::Lt => "LT",
            Self::Ge => "GE",
            Self::R => "R",
            Self::Rn => "RN",
        }
    }
}

/// First four instruction bytes read as a little-endian word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(u32);

impl Opcode {
    /// Wraps a raw little-endian opcode word.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Builds the word from up to four leading instruction bytes; missing bytes read as zero.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut word = [0u8; 4];
        for (slot, byte) in word.iter_mut().zip(bytes) {
            *slot = *byte;
        }
        Self(u32::from_le_bytes(word))
    }

    /// Raw word.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// First opcode byte.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn first_byte(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Format selected by the first byte.
    #[must_use]
    pub const fn format(self) -> Option<u8> {
        format_of(self.first_byte())
    }

    /// Bits 7..4: branch condition (format 0) or operation (format 1).
    #[must_use]
    pub const fn high_nibble(self) -> u32 {
        (self.0 >> 4) & 0xF
    }

    /// Width field of formats 2, 3 and 4.
    #[must_use]
    pub const fn short_width(self) -> u32 {
        self.0 & 0x3
    }

    /// Operation field of format 2.
    #[must_use]
    pub const fn quick_op(self) -> u32 {
        (self.0 >> 4) & 0x7
    }

    /// 4-bit short field of format 2 and the operation field of format 3.
    #[must_use]
    pub const fn short_field(self) -> u32 {
        (self.0 >> 7) & 0xF
    }

    /// Short field of format 2 sign-extended as a quick constant.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn quick(self) -> i32 {
        let field = self.short_field() as i32;
        if field & 0x8 != 0 {
            field - 0x10
        } else {
            field
        }
    }

    /// General operand field at bits 15..11 (formats 2 and 3, first operand of format 4).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn gen_high(self) -> u8 {
        ((self.0 >> 11) & 0x1F) as u8
    }

    /// Operation field of format 4.
    #[must_use]
    pub const fn dyadic_op(self) -> u32 {
        (self.0 >> 2) & 0xF
    }

    /// Second operand field of format 4.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn gen_low(self) -> u8 {
        ((self.0 >> 6) & 0x1F) as u8
    }

    /// Width field of formats 5, 6 and 7.
    #[must_use]
    pub const fn long_width(self) -> u32 {
        (self.0 >> 8) & 0x3
    }

    /// Operation field of formats 5, 6 and 7.
    #[must_use]
    pub const fn long_op(self) -> u32 {
        (self.0 >> 10) & 0xF
    }

    /// Second operand field of formats 6 and 7.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn gen2(self) -> u8 {
        ((self.0 >> 14) & 0x1F) as u8
    }

    /// First operand field of formats 6 and 7.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn gen1(self) -> u8 {
        ((self.0 >> 19) & 0x1F) as u8
    }

    /// Short field of format 5 (string options or configuration list).
    #[must_use]
    pub const fn string_field(self) -> u32 {
        (self.0 >> 15) & 0xF
    }
}
