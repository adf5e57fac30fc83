//! # Code City Heap Dumper Ground Truth
//!
//! Turns the difference between a pristine interpreter heap and a running
//! one into statements that, evaluated from the pristine heap, rebuild the
//! running one.
//!
//! ## Binding Invariants
//!
//! 1. **Monotonic Levels**: every binding moves through
//!    `UNSTARTED < DECL < SET < DONE < RECURSE` and never back.
//!    Asking for a level a binding already has emits nothing.
//!
//! 2. **Believed State**: each object dumper tracks what the replayed heap
//!    contains *so far* (prototype, owner, attributes, extensibility).
//!    Every emitted statement updates it, and every decision (assignment vs.
//!    `Object.defineProperty`) is made against it.
//!
//! 3. **Addresses**: an object is named through the binding that first
//!    stored it, or any later one that is reachable from the cursor.
//!    Built-ins without a usable address are written `new 'Dotted.name'`.
//!
//! 4. **Cycles Complete**: a cycle never stops a recursive dump. Its members
//!    become recursively done together once the traversal unwinds past the
//!    last of them.
//!
//! 5. **Warnings, Not Errors**: state statements cannot reproduce is
//!    reported as a `// ` comment in the output and a `tracing` warning.
//!    Only misuse (bad selectors, backward levels, uncreated objects,
//!    conflicting arguments objects) returns an error.
//!
//! ## Usage
//!
//! ```ignore
//! let pristine = MemoryHeap::pristine();
//! let current = /* a heap the interpreter has been running on */;
//! let mut dumper = Dumper::new(&pristine, &current)?;
//! let cursor = dumper.global_cursor();
//! dumper.dump_binding(&cursor, &Selector::parse("obj")?, Do::Recurse)?;
//! print!("{}", dumper.take_output());
//! ```

mod construct;
mod dumper;
mod error;
mod heap;
mod literal;
mod memory_heap;
mod object_dumper;
mod scope_dumper;
mod selector;
mod sub_dumper;

#[cfg(test)]
mod cycle_tests;
#[cfg(test)]
mod writability_tests;

pub use dumper::{Cursor, Dumper, DumperOptions, OptionsPatch};
pub use error::{DumpError, Result};
pub use heap::{
    Attributes, FunctionKind, Heap, Listener, ObjectClass, ObjectId, PropertyDescriptor, ScopeId,
    ScopeKind, Value, ERROR_CONSTRUCTORS,
};
pub use literal::{function_shape, iso_date, quote, FunctionShape};
pub use memory_heap::MemoryHeap;
pub use object_dumper::ObjectDumper;
pub use scope_dumper::ScopeDumper;
pub use selector::{Part, Selector, SelectorError};
pub use sub_dumper::{
    BindingTable, Components, Do, Done, ObjectDumperId, ScopeDumperId, SubDumper, SubDumperId,
};
