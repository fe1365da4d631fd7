/// Carry / borrow.
pub const PSR_C: u16 = 0x0001;
/// Trace.
pub const PSR_T: u16 = 0x0002;
/// Lower (unsigned comparison).
pub const PSR_L: u16 = 0x0004;
/// Flag: overflow, bit test and string termination.
pub const PSR_F: u16 = 0x0020;
/// Zero (comparison equal).
pub const PSR_Z: u16 = 0x0040;
/// Negative (signed comparison).
pub const PSR_N: u16 = 0x0080;
/// User mode.
pub const PSR_U: u16 = 0x0100;
/// Stack select: set selects the user stack pointer.
pub const PSR_S: u16 = 0x0200;
/// Trace pending.
pub const PSR_P: u16 = 0x0400;
/// Maskable interrupts enabled.
pub const PSR_I: u16 = 0x0800;

/// Architectural register file of the register processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    /// General registers R0..R7.
    pub r: [u32; 8],
    /// Program counter (24 bits significant).
    pub pc: u32,
    /// Static base.
    pub sb: u32,
    /// Frame pointer.
    pub fp: u32,
    /// Stack pointers: `sp[0]` is SP0 (supervisor), `sp[1]` is SP1 (user).
    pub sp: [u32; 2],
    /// Interrupt table base.
    pub intbase: u32,
    /// Processor status register.
    pub psr: u16,
    /// Module register.
    pub mod_: u16,
    /// Configuration register set by `SETCFG`.
    pub cfg: u8,
}

impl RegisterFile {
    /// Register state right after reset: every register zero.
    #[must_use]
    pub const fn at_boot(pc: u32) -> Self {
        Self {
            r: [0; 8],
            pc,
            sb: 0,
            fp: 0,
            sp: [0; 2],
            intbase: 0,
            psr: 0,
            mod_: 0,
            cfg: 0,
        }
    }

    /// Index into `sp` of the stack pointer selected by `PSR.S`.
    #[must_use]
    pub const fn active_stack(&self) -> usize {
        if self.psr & PSR_S != 0 {
            1
        } else {
            0
        }
    }

    /// Currently selected stack pointer.
    #[must_use]
    pub const fn sp(&self) -> u32 {
        self.sp[self.active_stack()]
    }

    /// Replaces the currently selected stack pointer.
    pub const fn set_sp(&mut self, value: u32) {
        self.sp[self.active_stack()] = value;
    }

    /// Returns `true` in user mode.
    #[must_use]
    pub const fn user_mode(&self) -> bool {
        self.psr & PSR_U != 0
    }

    /// Reads one PSR bit.
    #[must_use]
    pub const fn flag(&self, mask: u16) -> bool {
        self.psr & mask != 0
    }

    /// Sets or clears the PSR bits in `mask`.
    pub const fn set_flag(&mut self, mask: u16, on: bool) {
        if on {
            self.psr |= mask;
        } else {
            self.psr &= !mask;
        }
    }
}
