//! Register file and processor status bits.

mod registers;

pub use registers::{
    RegisterFile, PSR_C, PSR_F, PSR_I, PSR_L, PSR_N, PSR_P, PSR_S, PSR_T, PSR_U, PSR_Z,
};
