use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Writes this far past the end of the dense region extend it; anything
/// further lands in the sparse map.
const DENSE_SLACK: usize = 1 << 16;

/// Bounds policy for a machine's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryPolicy {
    /// Fixed to the length of the original program. Every access outside it
    /// faults.
    Bounded,
    /// Conceptually infinite. Unwritten addresses read as 0; only negative
    /// addresses fault.
    #[default]
    Unbounded,
}

impl fmt::Display for MemoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryPolicy::Bounded => write!(f, "bounded"),
            MemoryPolicy::Unbounded => write!(f, "unbounded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown memory policy '{0}', expected bounded or unbounded")]
pub struct UnknownPolicy(pub String);

impl FromStr for MemoryPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bounded" => Ok(MemoryPolicy::Bounded),
            "unbounded" => Ok(MemoryPolicy::Unbounded),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// An address rejected by the active bounds policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal address {0}")]
pub struct IllegalAddress(pub i64);

/// Addressable integer storage.
///
/// Addresses are signed at the API boundary because programs compute them
/// from arbitrary values; validation happens before storage is touched.
/// The unbounded policy keeps a dense vector starting at address 0 plus a
/// sparse map for far-away writes. Every sparse key is at or past the end of
/// the dense region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    policy: MemoryPolicy,
    cells: Vec<i64>,
    sparse: BTreeMap<usize, i64>,
}

impl Memory {
    pub fn new(program: &[i64], policy: MemoryPolicy) -> Self {
        Self {
            policy,
            cells: program.to_vec(),
            sparse: BTreeMap::new(),
        }
    }

    fn validate(&self, address: i64) -> Result<usize, IllegalAddress> {
        let index = usize::try_from(address).map_err(|_| IllegalAddress(address))?;
        if self.policy == MemoryPolicy::Bounded && index >= self.cells.len() {
            return Err(IllegalAddress(address));
        }
        Ok(index)
    }

    pub fn read(&self, address: i64) -> Result<i64, IllegalAddress> {
        let index = self.validate(address)?;
        Ok(self.peek(index))
    }

    pub fn write(&mut self, address: i64, value: i64) -> Result<(), IllegalAddress> {
        let index = self.validate(address)?;
        if index < self.cells.len() {
            self.cells[index] = value;
        } else if index - self.cells.len() < DENSE_SLACK {
            self.grow(index + 1);
            self.cells[index] = value;
        } else {
            self.sparse.insert(index, value);
        }
        Ok(())
    }

    /// Extend the dense region to `len` cells, folding in any sparse entries
    /// it now covers.
    fn grow(&mut self, len: usize) {
        self.cells.resize(len, 0);
        let far = self.sparse.split_off(&len);
        let near = std::mem::replace(&mut self.sparse, far);
        for (index, value) in near {
            self.cells[index] = value;
        }
    }

    /// Value at `index` without policy checks. Addresses not held read as 0.
    pub fn peek(&self, index: usize) -> i64 {
        match self.cells.get(index) {
            Some(&value) => value,
            None => self.sparse.get(&index).copied().unwrap_or(0),
        }
    }

    /// Whether the address is backed by storage (written, or part of the
    /// original program).
    pub fn holds(&self, index: usize) -> bool {
        index < self.cells.len() || self.sparse.contains_key(&index)
    }

    /// Number of addresses currently held.
    pub fn len(&self) -> usize {
        self.cells.len() + self.sparse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every held address and its value, in increasing address order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.cells
            .iter()
            .copied()
            .enumerate()
            .chain(self.sparse.iter().map(|(&index, &value)| (index, value)))
    }
}

/// One address whose value differs between two memory images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryChange {
    pub address: usize,
    pub old: i64,
    pub new: i64,
}

impl From<MemoryChange> for (usize, i64, i64) {
    fn from(change: MemoryChange) -> Self {
        (change.address, change.old, change.new)
    }
}

impl fmt::Display for MemoryChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.address, self.old, self.new)
    }
}

/// Compare two memory images over the union of their held addresses.
/// An address held by only one side reads as 0 on the other.
pub fn diff(old: &Memory, new: &Memory) -> Vec<MemoryChange> {
    let addresses: BTreeSet<usize> = old
        .entries()
        .chain(new.entries())
        .map(|(address, _)| address)
        .collect();

    addresses
        .into_iter()
        .filter_map(|address| {
            let before = old.peek(address);
            let after = new.peek(address);
            (before != after).then_some(MemoryChange {
                address,
                old: before,
                new: after,
            })
        })
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn write_then_read_returns_value(
            program in prop::collection::vec(any::<i64>(), 0..64),
            address in 0i64..(1 << 24),
            value in any::<i64>()
        ) {
            let mut mem = Memory::new(&program, MemoryPolicy::Unbounded);
            mem.write(address, value).unwrap();
            prop_assert_eq!(mem.read(address), Ok(value));
        }

        #[test]
        fn diff_against_self_is_empty(
            program in prop::collection::vec(any::<i64>(), 0..64),
            writes in prop::collection::vec((0i64..(1 << 20), any::<i64>()), 0..16)
        ) {
            let mut mem = Memory::new(&program, MemoryPolicy::Unbounded);
            for (address, value) in writes {
                mem.write(address, value).unwrap();
            }
            prop_assert!(diff(&mem, &mem).is_empty());
        }
    }
}
