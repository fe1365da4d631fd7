//! Disassembly round-trip and formatting tests.

#![allow(clippy::pedantic, clippy::nursery)]

use proptest::prelude::*;
use register_core::decode::MAX_INSTRUCTION_BYTES;
use register_core::{decode, disassemble, Flow};
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

fn listing(bytes: &[u8], origin: u32) -> Vec<(u32, String)> {
    let mut lines = Vec::new();
    let mut offset = 0usize;
    let mut pc = origin;
    while let Some(dis) = disassemble(&bytes[offset..], pc) {
        lines.push((pc, dis.text));
        offset += usize::from(dis.len_bytes);
        pc += u32::from(dis.len_bytes);
    }
    lines
}

#[test]
fn listing_walks_a_counted_loop() {
    let program = [
        0x82, 0x01, 0x08, // ENTER [R0], 8
        0x8F, 0x08, // ADDQD 1, R1
        0xCC, 0x07, 0x7E, // ACBB -1, R0, -2
        0x92, 0x80, // EXIT [R0]
        0x12, 0x00, // RET 0
    ];
    assert_eq!(
        listing(&program, 0x1000),
        vec![
            (0x1000, "ENTER [R0], 8".to_string()),
            (0x1003, "ADDQD 1, R1".to_string()),
            (0x1005, "ACBB -1, R0, -2 ($001003)".to_string()),
            (0x1008, "EXIT [R0]".to_string()),
            (0x100A, "RET 0".to_string()),
        ]
    );
}

#[rstest]
#[case(&[0x17, 0x0E, 0x08], "MOVD R1, 8(FP)", 3)]
#[case(&[0x01, 0xA0, 0x00, 0x10], "ADDW #0010, R0", 4)]
#[case(&[0x4E, 0x07, 0xA0, 0xFE], "ASHD #FE, R0", 4)]
#[case(&[0x0E, 0x00, 0x07], "MOVSB B, U", 3)]
#[case(&[0x0A, 0x7E], "BEQ -2 ($000FFE)", 2)]
fn operands_and_lengths(#[case] bytes: &[u8], #[case] text: &str, #[case] len: u8) {
    let dis = disassemble(bytes, 0x1000).expect("complete instruction");
    assert_eq!(dis.text, text);
    assert_eq!(dis.len_bytes, len);
    assert_eq!(dis.flow, Flow::Sequential);
}

#[test]
fn jsr_is_stepped_over() {
    let dis = disassemble(&[0x7F, 0xAE, 0x98, 0x00], 0x1000).expect("JSR");
    assert_eq!(dis.text, "JSR @001800");
    assert_eq!(dis.flow, Flow::StepOver);
}

#[test]
fn truncated_instructions_do_not_disassemble() {
    assert_eq!(disassemble(&[], 0), None);
    assert_eq!(disassemble(&[0x82, 0x01], 0), None);
    assert_eq!(disassemble(&[0x4E, 0x07], 0), None);
}

proptest! {
    #[test]
    fn disassembly_agrees_with_the_decoder(bytes in prop::collection::vec(any::<u8>(), 0..32), pc in 0u32..0x0100_0000) {
        let dis = disassemble(&bytes, pc);
        let decoded = decode(&bytes);
        prop_assert_eq!(dis.is_some(), decoded.is_some());
        if let (Some(dis), Some(decoded)) = (dis, decoded) {
            prop_assert_eq!(usize::from(dis.len_bytes), decoded.len);
            prop_assert!(decoded.len <= bytes.len());
            prop_assert!(decoded.len <= MAX_INSTRUCTION_BYTES);
            prop_assert!(!dis.text.is_empty());
        }
    }
}
