//! Core identifier and type primitives shared by the graph, persistence, and query layers.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Dense, 1-based identifier for a symbol. `0` is never a valid value; the
/// `NonZeroU64` representation makes `Option<SymbolUid>` free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolUid(NonZeroU64);

impl SymbolUid {
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn value(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for SymbolUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.get())
    }
}

/// Dense, 1-based identifier for a file. Lives in a namespace separate from
/// `SymbolUid`: the two populations are never compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileUid(NonZeroU64);

impl FileUid {
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn value(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for FileUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.get())
    }
}

/// The three symbol kinds the cross-reference graph distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolType {
    Function,
    Variable,
    End,
}

impl SymbolType {
    /// Matches the `symbol_types` wire encoding in (0/1/2).
    pub fn to_wire(self) -> u8 {
        match self {
            SymbolType::Function => 0,
            SymbolType::Variable => 1,
            SymbolType::End => 2,
        }
    }

    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(SymbolType::Function),
            1 => Some(SymbolType::Variable),
            2 => Some(SymbolType::End),
            _ => None,
        }
    }
}

/// Compact owned string type used for qualified names and paths.
pub type CompactString = Box<str>;

pub fn compact_string(s: &str) -> CompactString {
    s.into()
}

/// Name of the synthetic sink symbol allocated at `finalize()`.
pub const END_SYMBOL_NAME: &str = "END";

/// Sentinel accepted in place of a real qualified name on either end of a
/// `find_paths` query.
pub const START_SENTINEL: &str = "START";
pub const END_SENTINEL: &str = "END";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_uid_rejects_zero() {
        assert!(SymbolUid::new(0).is_none());
        assert!(SymbolUid::new(1).is_some());
    }

    #[test]
    fn symbol_type_wire_round_trip() {
        for ty in [SymbolType::Function, SymbolType::Variable, SymbolType::End] {
            assert_eq!(SymbolType::from_wire(ty.to_wire()), Some(ty));
        }
        assert_eq!(SymbolType::from_wire(9), None);
    }
}
