//! Debugging support: breakpoints, memory snapshots and dumps.

use std::collections::BTreeSet;

use crate::decode;
use crate::machine::Machine;
use crate::memory::{self, MemoryChange};

/// Breakpoint addresses plus a latch recording the one we are suspended at.
///
/// The first visit to a breakpoint latches it and asks the engine to
/// suspend. The next check at the same address releases the latch and lets
/// the instruction run, so the breakpoint fires again on the following
/// visit rather than on this one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breakpoints {
    addresses: BTreeSet<usize>,
    latched: Option<usize>,
}

impl Breakpoints {
    pub fn set(&mut self, address: usize) {
        self.addresses.insert(address);
    }

    /// Remove a breakpoint. A latch on the same address is kept, so clearing
    /// and re-setting it while suspended there does not fire it twice.
    pub fn clear(&mut self, address: usize) {
        self.addresses.remove(&address);
    }

    pub fn contains(&self, address: usize) -> bool {
        self.addresses.contains(&address)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.addresses.iter().copied()
    }

    /// Returns true if execution must suspend before the instruction at `pc`.
    pub fn check(&mut self, pc: usize) -> bool {
        if !self.addresses.contains(&pc) {
            self.latched = None;
            return false;
        }
        if self.latched == Some(pc) {
            self.latched = None;
            false
        } else {
            self.latched = Some(pc);
            true
        }
    }
}

impl Machine {
    /// Suspend before executing the instruction at `address`. Idempotent.
    pub fn set_breakpoint(&mut self, address: usize) {
        self.breakpoints.set(address);
    }

    pub fn clear_breakpoint(&mut self, address: usize) {
        self.breakpoints.clear(address);
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = usize> + '_ {
        self.breakpoints.iter()
    }

    /// Replace the snapshot with a copy of the current memory.
    pub fn save_snapshot(&mut self) {
        self.snapshot = self.memory.clone();
    }

    /// Every address whose value changed since the last snapshot, in
    /// increasing address order. Addresses present on only one side compare
    /// against 0.
    pub fn snapshot_diff(&self) -> Vec<MemoryChange> {
        memory::diff(&self.snapshot, &self.memory)
    }

    /// Render `rows` rows of `cols` cells starting at `address`. Cells the
    /// memory does not hold print as `OOM`.
    pub fn dump(&self, address: usize, rows: usize, cols: usize) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        for row in 0..rows {
            // Rows starting past the end of the address space are not printed.
            let Some(start) = row
                .checked_mul(cols)
                .and_then(|offset| address.checked_add(offset))
            else {
                break;
            };
            let _ = write!(out, "{start:5}:");
            for col in 0..cols {
                match start.checked_add(col) {
                    Some(pointer) if self.memory.holds(pointer) => {
                        let _ = write!(out, " {}", self.memory.peek(pointer));
                    }
                    _ => out.push_str(" OOM"),
                }
            }
            out.push('\n');
        }
        out
    }

    /// Linear disassembly of the contiguous memory starting at address 0.
    pub fn disassemble(&self) -> String {
        let words: Vec<i64> = self
            .memory
            .entries()
            .enumerate()
            .take_while(|&(i, (address, _))| i == address)
            .map(|(_, (_, value))| value)
            .collect();
        decode::disassemble(&words)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::memory::MemoryPolicy;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn snapshot_diff_twice_is_stable(
            program in prop::collection::vec(0i64..2_000, 1..48),
            steps in 0usize..256
        ) {
            let mut vm = Machine::new(&program, &[1, 5], MemoryPolicy::Unbounded);
            let _ = vm.run_for(steps);
            prop_assert_eq!(vm.snapshot_diff(), vm.snapshot_diff());
        }

        #[test]
        fn snapshot_diff_is_sorted(
            program in prop::collection::vec(0i64..2_000, 1..48),
            steps in 0usize..256
        ) {
            let mut vm = Machine::new(&program, &[1, 5], MemoryPolicy::Unbounded);
            let _ = vm.run_for(steps);
            let diff = vm.snapshot_diff();
            prop_assert!(diff.windows(2).all(|w| w[0].address < w[1].address));
        }
    }
}
