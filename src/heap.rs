//! The interpreter heap as the dumper sees it.
//!
//! The dumper never mutates a heap. Everything it needs is behind the
//! read-only [`Heap`] trait so any interpreter can be dumped by implementing
//! it; [`crate::MemoryHeap`] is the in-process implementation.

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLES
// ═══════════════════════════════════════════════════════════════════════════════

/// Handle of an object within one heap. Handles from different heaps are
/// unrelated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

/// Handle of a lexical scope within one heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

// ═══════════════════════════════════════════════════════════════════════════════
// VALUES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Object(ObjectId),
}

impl Value {
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Value of a prototype or owner slot.
    pub fn from_slot(slot: Option<ObjectId>) -> Value {
        slot.map_or(Value::Null, Value::Object)
    }

    /// SameValue: NaN equals itself and the two zeros differ.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b && a.is_sign_negative() == b.is_sign_negative()
                }
            }
            _ => self == other,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", crate::literal::number(*n)),
            Value::Str(s) => write!(f, "{}", crate::literal::quote(s)),
            Value::Object(id) => write!(f, "[object#{}]", id.0),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attributes {
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl Attributes {
    /// What plain assignment gives a new property.
    pub const PLAIN: Attributes = Attributes::new(true, true, true);
    /// What `Object.defineProperty` defaults absent attributes to.
    pub const NONE: Attributes = Attributes::new(false, false, false);
    /// Built-in methods and `constructor` back-references.
    pub const METHOD: Attributes = Attributes::new(true, false, true);
    /// `length` and `name` of a function.
    pub const FUNCTION_META: Attributes = Attributes::new(false, false, true);
    /// Writable but hidden: a user function's `prototype`, an array's
    /// `length`, a regexp's `lastIndex`.
    pub const HIDDEN: Attributes = Attributes::new(true, false, false);

    pub const fn new(writable: bool, enumerable: bool, configurable: bool) -> Self {
        Attributes {
            writable,
            enumerable,
            configurable,
        }
    }
}

/// A data property. Accessor properties are not part of the heap model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub value: Value,
    pub attributes: Attributes,
}

impl PropertyDescriptor {
    pub fn new(value: Value, attributes: Attributes) -> Self {
        PropertyDescriptor { value, attributes }
    }

    pub fn plain(value: Value) -> Self {
        PropertyDescriptor::new(value, Attributes::PLAIN)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSES & SCOPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionKind {
    /// A user function: its source text and the scope it closes over.
    Closure { source: String, scope: ScopeId },
    /// Implemented by the host; can only be referenced, never rebuilt.
    Native,
}

/// Runtime class of an object, with whatever internal state a class carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectClass {
    Object,
    Array,
    Function(FunctionKind),
    /// Time value in milliseconds since the epoch.
    Date(f64),
    RegExp { source: String, flags: String },
    Error,
    WeakMap,
    /// The reified `arguments` of the call that created `scope`.
    Arguments { scope: ScopeId },
}

impl ObjectClass {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectClass::Object => "Object",
            ObjectClass::Array => "Array",
            ObjectClass::Function(_) => "Function",
            ObjectClass::Date(_) => "Date",
            ObjectClass::RegExp { .. } => "RegExp",
            ObjectClass::Error => "Error",
            ObjectClass::WeakMap => "WeakMap",
            ObjectClass::Arguments { .. } => "Arguments",
        }
    }
}

/// Built-in constructors whose instances have the Error class.
pub const ERROR_CONSTRUCTORS: [&str; 8] = [
    "Error",
    "EvalError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "TypeError",
    "URIError",
    "PermissionError",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    Global,
    /// Scope of one function call.
    Call { arguments: Option<ObjectId> },
    Block,
}

/// A listening socket kept open by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub port: u16,
    /// Object whose methods handle new connections.
    pub handler: ObjectId,
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEAP
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only access to one interpreter heap.
pub trait Heap {
    fn global_scope(&self) -> ScopeId;

    /// Own property keys: array indices ascending, then insertion order.
    fn own_keys(&self, obj: ObjectId) -> Vec<String>;
    fn own_property(&self, obj: ObjectId, key: &str) -> Option<PropertyDescriptor>;
    fn prototype(&self, obj: ObjectId) -> Option<ObjectId>;
    fn owner(&self, obj: ObjectId) -> Option<ObjectId>;
    fn is_extensible(&self, obj: ObjectId) -> bool;
    fn class(&self, obj: ObjectId) -> ObjectClass;

    /// Declared names, in declaration order.
    fn scope_names(&self, scope: ScopeId) -> Vec<String>;
    fn scope_parent(&self, scope: ScopeId) -> Option<ScopeId>;
    fn scope_value(&self, scope: ScopeId, name: &str) -> Option<Value>;
    fn scope_kind(&self, scope: ScopeId) -> ScopeKind;

    /// Registered dotted name of a built-in object, e.g. `Object.prototype`.
    fn builtin_name(&self, obj: ObjectId) -> Option<String>;
    fn builtin(&self, name: &str) -> Option<ObjectId>;
    /// All registered built-in names, in registration order.
    fn builtin_names(&self) -> Vec<String>;

    fn listeners(&self) -> Vec<Listener>;
}
