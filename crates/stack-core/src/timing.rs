/// Instruction forms with fixed cycle costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleCostKind {
    /// ALU word, including iterative steps.
    Alu,
    /// IF, LOOP or ELSE.
    Branch,
    /// Subroutine call.
    Call,
    /// Memory fetch or store through `t`.
    Memory,
    /// Fetch or store of a 5-bit local address.
    LocalAccess,
    /// Fetch of the 16-bit literal following the instruction.
    LongLiteral,
    /// Short literal, internal register access or swap.
    Internal,
}

/// Single source-of-truth cycle-cost table.
pub const CYCLE_COST_TABLE: &[(CycleCostKind, u8)] = &[
    (CycleCostKind::Alu, 1),
    (CycleCostKind::Branch, 1),
    (CycleCostKind::Call, 1),
    (CycleCostKind::Memory, 2),
    (CycleCostKind::LocalAccess, 2),
    (CycleCostKind::LongLiteral, 2),
    (CycleCostKind::Internal, 1),
];

/// Looks up the cycle cost for a cycle-cost kind.
#[must_use]
pub fn cycle_cost(kind: CycleCostKind) -> Option<u8> {
    CYCLE_COST_TABLE
        .iter()
        .find_map(|(entry_kind, cycles)| (*entry_kind == kind).then_some(*cycles))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{cycle_cost, CycleCostKind, CYCLE_COST_TABLE};

    #[test]
    fn table_contains_unique_kinds() {
        let kinds: HashSet<_> = CYCLE_COST_TABLE.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds.len(), CYCLE_COST_TABLE.len());
    }

    #[test]
    fn memory_touching_forms_take_two_cycles() {
        assert_eq!(cycle_cost(CycleCostKind::Memory), Some(2));
        assert_eq!(cycle_cost(CycleCostKind::LocalAccess), Some(2));
        assert_eq!(cycle_cost(CycleCostKind::LongLiteral), Some(2));
        assert_eq!(cycle_cost(CycleCostKind::Alu), Some(1));
        assert_eq!(cycle_cost(CycleCostKind::Internal), Some(1));
    }

    #[test]
    fn every_table_entry_resolves_via_lookup() {
        for (kind, expected_cycles) in CYCLE_COST_TABLE {
            assert_eq!(cycle_cost(*kind), Some(*expected_cycles));
        }
    }
}
