//! Per-binding completion bookkeeping shared by scope and object dumpers.
//!
//! Every binding (a variable, a property, or a prototype/owner slot) moves
//! through the [`Do`] levels in strictly increasing order. The
//! [`BindingTable`] records where each binding stands and enforces that
//! order; the [`SubDumper`] trait exposes it uniformly for both kinds of
//! wrapper.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{DumpError, Result};
use crate::selector::Part;

// ═══════════════════════════════════════════════════════════════════════════════
// LEVELS
// ═══════════════════════════════════════════════════════════════════════════════

/// How far a binding has been reproduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Do {
    #[default]
    Unstarted = 0,
    /// The binding exists.
    Decl = 1,
    /// The binding holds its final value.
    Set = 2,
    /// The binding also has its final attributes.
    Attr = 3,
    /// Done, and everything reachable through the value is done too.
    Recurse = 4,
}

impl Do {
    pub const DONE: Do = Do::Attr;
}

impl fmt::Display for Do {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Do::Unstarted => "UNSTARTED",
            Do::Decl => "DECL",
            Do::Set => "SET",
            Do::Attr => "DONE",
            Do::Recurse => "RECURSE",
        };
        write!(f, "{}", name)
    }
}

/// Completion of a whole object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Done {
    #[default]
    No,
    /// Slots, properties and extensibility all match.
    Done,
    /// Done, and every reachable object is done recursively.
    Recursive,
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDS & COMPONENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeDumperId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectDumperId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubDumperId {
    Scope(ScopeDumperId),
    Object(ObjectDumperId),
}

/// A concrete binding location: where a value was written, and a candidate
/// address for the object it holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Components {
    pub dumper: SubDumperId,
    pub part: Part,
}

impl Components {
    pub fn scope(sd: ScopeDumperId, name: &str) -> Self {
        Components {
            dumper: SubDumperId::Scope(sd),
            part: Part::name(name),
        }
    }

    pub fn object(od: ObjectDumperId, part: Part) -> Self {
        Components {
            dumper: SubDumperId::Object(od),
            part,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING TABLE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    levels: HashMap<Part, Do>,
    skipped: HashSet<Part>,
}

impl BindingTable {
    pub fn new() -> Self {
        BindingTable::default()
    }

    pub fn get(&self, part: &Part) -> Do {
        self.levels.get(part).copied().unwrap_or_default()
    }

    /// Moves `part` to `level`, which must be higher than where it stands.
    pub fn set(&mut self, part: &Part, level: Do) -> std::result::Result<(), Do> {
        let current = self.get(part);
        if level <= current {
            return Err(current);
        }
        self.levels.insert(part.clone(), level);
        Ok(())
    }

    /// Like `set`, but silently keeps a binding that is already at or past
    /// `level`.
    pub fn raise(&mut self, part: &Part, level: Do) {
        if level > self.get(part) {
            self.levels.insert(part.clone(), level);
        }
    }

    pub fn skip(&mut self, part: &Part) {
        self.skipped.insert(part.clone());
    }

    pub fn unskip(&mut self, part: &Part) {
        self.skipped.remove(part);
    }

    pub fn is_skipped(&self, part: &Part) -> bool {
        self.skipped.contains(part)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUB-DUMPER
// ═══════════════════════════════════════════════════════════════════════════════

/// Binding bookkeeping common to scope and object dumpers. Reachability
/// and survey edges need both heaps, so the session answers those for a
/// [`SubDumperId`].
pub trait SubDumper {
    fn bindings(&self) -> &BindingTable;
    fn bindings_mut(&mut self) -> &mut BindingTable;

    /// Human-readable name of one binding, for errors and logs.
    fn describe(&self, part: &Part) -> String;

    fn get_done(&self, part: &Part) -> Do {
        self.bindings().get(part)
    }

    fn set_done(&mut self, part: &Part, level: Do) -> Result<()> {
        self.bindings_mut().set(part, level).map_err(|from| DumpError::NonMonotonic {
            binding: self.describe(part),
            from,
            to: level,
        })
    }

    fn raise(&mut self, part: &Part, level: Do) {
        self.bindings_mut().raise(part, level);
    }

    /// Treats `part` as fully dumped without emitting anything for it.
    fn prune(&mut self, part: &Part) {
        self.raise(part, Do::Recurse);
    }

    fn skip(&mut self, part: &Part) {
        self.bindings_mut().skip(part);
    }

    fn unskip(&mut self, part: &Part) {
        self.bindings_mut().unskip(part);
    }

    fn is_skipped(&self, part: &Part) -> bool {
        self.bindings().is_skipped(part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Table(BindingTable);

    impl SubDumper for Table {
        fn bindings(&self) -> &BindingTable {
            &self.0
        }
        fn bindings_mut(&mut self) -> &mut BindingTable {
            &mut self.0
        }
        fn describe(&self, part: &Part) -> String {
            part.to_string()
        }
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(Do::Unstarted < Do::Decl);
        assert!(Do::Decl < Do::Set);
        assert!(Do::Set < Do::DONE);
        assert!(Do::DONE < Do::Recurse);
        assert!(Done::No < Done::Done && Done::Done < Done::Recursive);
    }

    #[test]
    fn test_set_done_is_monotonic() {
        let mut table = Table(BindingTable::new());
        let x = Part::name("x");
        assert_eq!(table.get_done(&x), Do::Unstarted);
        table.set_done(&x, Do::Set).unwrap();
        assert_eq!(
            table.set_done(&x, Do::Set),
            Err(DumpError::NonMonotonic {
                binding: "x".to_string(),
                from: Do::Set,
                to: Do::Set,
            })
        );
        assert!(table.set_done(&x, Do::Decl).is_err());
        table.set_done(&x, Do::Recurse).unwrap();
        assert_eq!(table.get_done(&x), Do::Recurse);
    }

    #[test]
    fn test_raise_prune_and_skip() {
        let mut table = Table(BindingTable::new());
        let x = Part::name("x");
        table.raise(&x, Do::DONE);
        table.raise(&x, Do::Decl);
        assert_eq!(table.get_done(&x), Do::DONE);

        let p = Part::Prototype;
        table.prune(&p);
        assert_eq!(table.get_done(&p), Do::Recurse);

        table.skip(&x);
        assert!(table.is_skipped(&x));
        table.unskip(&x);
        assert!(!table.is_skipped(&x));
    }
}
