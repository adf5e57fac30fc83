//! In-memory heap with the interpreter's pristine built-ins.
//!
//! Two calls to [`MemoryHeap::pristine`] produce heaps whose built-ins
//! correspond by name, which is all the dumper needs to diff them. The
//! mutators mirror the script-level operations (`set`, `define`, `delete`,
//! `set_prototype`, ...) closely enough to stage heaps for tests.

use std::collections::HashMap;

use crate::heap::{
    Attributes, FunctionKind, Heap, Listener, ObjectClass, ObjectId, PropertyDescriptor, ScopeId,
    ScopeKind, Value, ERROR_CONSTRUCTORS,
};
use crate::literal;

const METHOD: Attributes = Attributes::METHOD;
const FUNCTION_META: Attributes = Attributes::FUNCTION_META;
const FUNCTION_PROTOTYPE: Attributes = Attributes::HIDDEN;
const ARRAY_LENGTH: Attributes = Attributes::HIDDEN;
const REGEXP_LAST_INDEX: Attributes = Attributes::HIDDEN;
/// Built-in constructors' `prototype` and regexp flags.
const FROZEN: Attributes = Attributes::NONE;

#[derive(Debug, Clone)]
struct HeapObject {
    class: ObjectClass,
    proto: Option<ObjectId>,
    owner: Option<ObjectId>,
    extensible: bool,
    keys: Vec<String>,
    properties: HashMap<String, PropertyDescriptor>,
}

#[derive(Debug, Clone)]
struct HeapScope {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    names: Vec<String>,
    values: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct MemoryHeap {
    objects: Vec<HeapObject>,
    scopes: Vec<HeapScope>,
    builtins: Vec<(String, ObjectId)>,
    builtin_index: HashMap<String, ObjectId>,
    builtin_names: HashMap<ObjectId, String>,
    listeners: Vec<Listener>,
}

impl MemoryHeap {
    /// A heap with nothing but an empty global scope.
    pub fn empty() -> Self {
        MemoryHeap {
            objects: Vec::new(),
            scopes: vec![HeapScope {
                kind: ScopeKind::Global,
                parent: None,
                names: Vec::new(),
                values: HashMap::new(),
            }],
            builtins: Vec::new(),
            builtin_index: HashMap::new(),
            builtin_names: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    /// A freshly booted interpreter heap.
    pub fn pristine() -> Self {
        let mut heap = MemoryHeap::empty();
        heap.install_builtins();
        heap
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    fn object(&self, obj: ObjectId) -> &HeapObject {
        &self.objects[obj.0 as usize]
    }

    fn object_mut(&mut self, obj: ObjectId) -> &mut HeapObject {
        &mut self.objects[obj.0 as usize]
    }

    fn scope(&self, scope: ScopeId) -> &HeapScope {
        &self.scopes[scope.0 as usize]
    }

    fn alloc(&mut self, class: ObjectClass, proto: Option<ObjectId>) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(HeapObject {
            class,
            proto,
            owner: None,
            extensible: true,
            keys: Vec::new(),
            properties: HashMap::new(),
        });
        id
    }

    fn builtin_or_null(&self, name: &str) -> Option<ObjectId> {
        self.builtin_index.get(name).copied()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONSTRUCTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Equivalent of `Object.create(proto)`.
    pub fn new_object(&mut self, proto: Option<ObjectId>) -> ObjectId {
        self.alloc(ObjectClass::Object, proto)
    }

    /// Equivalent of `{}`.
    pub fn new_plain_object(&mut self) -> ObjectId {
        let proto = self.builtin_or_null("Object.prototype");
        self.new_object(proto)
    }

    pub fn new_array(&mut self, elements: &[Value]) -> ObjectId {
        let proto = self.builtin_or_null("Array.prototype");
        let arr = self.alloc(ObjectClass::Array, proto);
        self.define(arr, "length", Value::Number(0.0), ARRAY_LENGTH);
        for (i, element) in elements.iter().enumerate() {
            self.set(arr, &i.to_string(), element.clone());
        }
        arr
    }

    /// Evaluates a function expression `source` in `scope`.
    pub fn new_function(&mut self, source: &str, scope: ScopeId) -> ObjectId {
        let shape = literal::function_shape(source);
        let proto = self.builtin_or_null("Function.prototype");
        let func = self.alloc(
            ObjectClass::Function(FunctionKind::Closure {
                source: source.to_string(),
                scope,
            }),
            proto,
        );
        let params = shape.as_ref().map_or(0, |s| s.params);
        let name = shape
            .as_ref()
            .and_then(|s| s.name.clone())
            .unwrap_or_default();
        self.define(func, "length", Value::Number(params as f64), FUNCTION_META);
        self.define(func, "name", Value::Str(name), FUNCTION_META);
        if !shape.map_or(false, |s| s.arrow) {
            let prototype = self.new_plain_object();
            self.define(prototype, "constructor", Value::Object(func), METHOD);
            self.define(func, "prototype", Value::Object(prototype), FUNCTION_PROTOTYPE);
        }
        func
    }

    pub fn new_native(&mut self, name: &str, params: usize) -> ObjectId {
        let proto = self.builtin_or_null("Function.prototype");
        let func = self.alloc(ObjectClass::Function(FunctionKind::Native), proto);
        self.define(func, "length", Value::Number(params as f64), FUNCTION_META);
        self.define(func, "name", Value::from(name), FUNCTION_META);
        func
    }

    pub fn new_date(&mut self, ms: f64) -> ObjectId {
        let proto = self.builtin_or_null("Date.prototype");
        self.alloc(ObjectClass::Date(ms), proto)
    }

    pub fn new_regexp(&mut self, source: &str, flags: &str) -> ObjectId {
        let proto = self.builtin_or_null("RegExp.prototype");
        let re = self.alloc(
            ObjectClass::RegExp {
                source: source.to_string(),
                flags: flags.to_string(),
            },
            proto,
        );
        self.define(re, "source", Value::from(source), FROZEN);
        self.define(re, "global", Value::Bool(flags.contains('g')), FROZEN);
        self.define(re, "ignoreCase", Value::Bool(flags.contains('i')), FROZEN);
        self.define(re, "multiline", Value::Bool(flags.contains('m')), FROZEN);
        self.define(re, "lastIndex", Value::Number(0.0), REGEXP_LAST_INDEX);
        re
    }

    /// Equivalent of `new <constructor>(message)`.
    pub fn new_error(&mut self, constructor: &str, message: Option<&str>) -> ObjectId {
        let proto = self.builtin_or_null(&format!("{}.prototype", constructor));
        let err = self.alloc(ObjectClass::Error, proto);
        if let Some(message) = message {
            self.define(err, "message", Value::from(message), METHOD);
        }
        let stack = format!("{}: {}\n    at <eval>", constructor, message.unwrap_or(""));
        self.define(err, "stack", Value::Str(stack), METHOD);
        err
    }

    pub fn new_weak_map(&mut self) -> ObjectId {
        let proto = self.builtin_or_null("WeakMap.prototype");
        self.alloc(ObjectClass::WeakMap, proto)
    }

    pub fn new_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(HeapScope {
            kind,
            parent: Some(parent),
            names: Vec::new(),
            values: HashMap::new(),
        });
        id
    }

    /// Reifies `arguments` for the call scope `scope`.
    pub fn new_arguments(&mut self, scope: ScopeId, values: &[Value]) -> ObjectId {
        let proto = self.builtin_or_null("Object.prototype");
        let args = self.alloc(ObjectClass::Arguments { scope }, proto);
        for (i, value) in values.iter().enumerate() {
            self.set(args, &i.to_string(), value.clone());
        }
        self.define(args, "length", Value::Number(values.len() as f64), METHOD);
        self.attach_arguments(scope, args);
        args
    }

    /// Marks `args` as the arguments object of `scope`, whatever its class.
    pub fn attach_arguments(&mut self, scope: ScopeId, args: ObjectId) {
        self.scopes[scope.0 as usize].kind = ScopeKind::Call {
            arguments: Some(args),
        };
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MUTATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// `obj[key] = value`, ignoring the prototype chain.
    pub fn set(&mut self, obj: ObjectId, key: &str, value: Value) {
        let is_array = matches!(self.object(obj).class, ObjectClass::Array);
        let existing = self.object(obj).properties.get(key).map(|pd| pd.attributes);
        match existing {
            Some(attributes) => self.define(obj, key, value.clone(), attributes),
            None => self.define(obj, key, value.clone(), Attributes::PLAIN),
        }
        if !is_array {
            return;
        }
        if key == "length" {
            if let Value::Number(len) = value {
                let doomed: Vec<String> = self
                    .object(obj)
                    .keys
                    .iter()
                    .filter(|k| literal::is_array_index(k))
                    .filter(|k| k.parse::<f64>().map_or(false, |i| i >= len))
                    .cloned()
                    .collect();
                for k in doomed {
                    self.delete(obj, &k);
                }
            }
        } else if literal::is_array_index(key) {
            let index: f64 = key.parse().unwrap_or(0.0);
            let length = match self.get(obj, "length") {
                Some(Value::Number(n)) => n,
                _ => 0.0,
            };
            if index >= length {
                let attributes = self
                    .object(obj)
                    .properties
                    .get("length")
                    .map_or(ARRAY_LENGTH, |pd| pd.attributes);
                self.define(obj, "length", Value::Number(index + 1.0), attributes);
            }
        }
    }

    /// `Object.defineProperty(obj, key, {value, ...attributes})`, with every
    /// attribute given explicitly.
    pub fn define(&mut self, obj: ObjectId, key: &str, value: Value, attributes: Attributes) {
        let object = self.object_mut(obj);
        if !object.properties.contains_key(key) {
            object.keys.push(key.to_string());
        }
        object
            .properties
            .insert(key.to_string(), PropertyDescriptor::new(value, attributes));
    }

    pub fn delete(&mut self, obj: ObjectId, key: &str) -> bool {
        let object = self.object_mut(obj);
        if object.properties.remove(key).is_none() {
            return false;
        }
        object.keys.retain(|k| k != key);
        true
    }

    pub fn get(&self, obj: ObjectId, key: &str) -> Option<Value> {
        self.object(obj).properties.get(key).map(|pd| pd.value.clone())
    }

    pub fn set_prototype(&mut self, obj: ObjectId, proto: Option<ObjectId>) {
        self.object_mut(obj).proto = proto;
    }

    pub fn set_owner(&mut self, obj: ObjectId, owner: Option<ObjectId>) {
        self.object_mut(obj).owner = owner;
    }

    pub fn prevent_extensions(&mut self, obj: ObjectId) {
        self.object_mut(obj).extensible = false;
    }

    /// `var name = value;` in `scope`.
    pub fn declare(&mut self, scope: ScopeId, name: &str, value: Value) {
        let scope = &mut self.scopes[scope.0 as usize];
        if !scope.values.contains_key(name) {
            scope.names.push(name.to_string());
        }
        scope.values.insert(name.to_string(), value);
    }

    /// Declares `name` in the global scope.
    pub fn declare_global(&mut self, name: &str, value: Value) {
        let global = self.global();
        self.declare(global, name, value);
    }

    pub fn register_builtin(&mut self, name: &str, obj: ObjectId) {
        if self.builtin_index.insert(name.to_string(), obj).is_none() {
            self.builtins.push((name.to_string(), obj));
        }
        self.builtin_names.entry(obj).or_insert_with(|| name.to_string());
    }

    pub fn listen(&mut self, port: u16, handler: ObjectId) {
        self.listeners.retain(|l| l.port != port);
        self.listeners.push(Listener { port, handler });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BUILT-INS
    // ═══════════════════════════════════════════════════════════════════════════

    fn install_builtins(&mut self) {
        let object_prototype = self.alloc(ObjectClass::Object, None);
        self.register_builtin("Object.prototype", object_prototype);
        let function_prototype = self.alloc(
            ObjectClass::Function(FunctionKind::Native),
            Some(object_prototype),
        );
        self.register_builtin("Function.prototype", function_prototype);

        let object = self.install_constructor("Object", object_prototype, 1);
        self.install_constructor("Function", function_prototype, 1);

        for (name, params) in [
            ("create", 2),
            ("defineProperty", 3),
            ("getPrototypeOf", 1),
            ("setPrototypeOf", 2),
            ("getOwnerOf", 1),
            ("setOwnerOf", 2),
            ("preventExtensions", 1),
        ] {
            let method = self.new_native(name, params);
            self.define(object, name, Value::Object(method), METHOD);
            self.register_builtin(&format!("Object.{}", name), method);
        }

        let array_prototype = self.new_object(Some(object_prototype));
        self.register_builtin("Array.prototype", array_prototype);
        self.install_constructor("Array", array_prototype, 1);
        let push = self.new_native("push", 1);
        self.define(array_prototype, "push", Value::Object(push), METHOD);
        self.register_builtin("Array.prototype.push", push);

        for (name, params) in [("Date", 7), ("RegExp", 2), ("WeakMap", 0)] {
            let prototype = self.new_object(Some(object_prototype));
            self.register_builtin(&format!("{}.prototype", name), prototype);
            self.install_constructor(name, prototype, params);
        }

        let error_prototype = self.new_object(Some(object_prototype));
        for name in ERROR_CONSTRUCTORS {
            let prototype = if name == "Error" {
                error_prototype
            } else {
                self.new_object(Some(error_prototype))
            };
            self.register_builtin(&format!("{}.prototype", name), prototype);
            self.define(prototype, "name", Value::from(name), METHOD);
            self.define(prototype, "message", Value::from(""), METHOD);
            self.install_constructor(name, prototype, 1);
        }

        let cc = self.new_object(Some(object_prototype));
        self.register_builtin("CC", cc);
        let listen = self.new_native("connectionListen", 2);
        self.define(cc, "connectionListen", Value::Object(listen), METHOD);
        self.register_builtin("CC.connectionListen", listen);
        self.declare_global("CC", Value::Object(cc));

        self.declare_global("undefined", Value::Undefined);
        self.declare_global("NaN", Value::Number(f64::NAN));
        self.declare_global("Infinity", Value::Number(f64::INFINITY));
    }

    fn install_constructor(&mut self, name: &str, prototype: ObjectId, params: usize) -> ObjectId {
        let constructor = self.new_native(name, params);
        self.define(constructor, "prototype", Value::Object(prototype), FROZEN);
        self.define(prototype, "constructor", Value::Object(constructor), METHOD);
        self.register_builtin(name, constructor);
        self.declare_global(name, Value::Object(constructor));
        constructor
    }
}

impl Heap for MemoryHeap {
    fn global_scope(&self) -> ScopeId {
        self.global()
    }

    fn own_keys(&self, obj: ObjectId) -> Vec<String> {
        let object = self.object(obj);
        let mut indices: Vec<(u32, &String)> = object
            .keys
            .iter()
            .filter(|k| literal::is_array_index(k))
            .filter_map(|k| k.parse::<u32>().ok().map(|i| (i, k)))
            .collect();
        indices.sort();
        let mut keys: Vec<String> = indices.into_iter().map(|(_, k)| k.clone()).collect();
        keys.extend(
            object
                .keys
                .iter()
                .filter(|k| !literal::is_array_index(k))
                .cloned(),
        );
        keys
    }

    fn own_property(&self, obj: ObjectId, key: &str) -> Option<PropertyDescriptor> {
        self.object(obj).properties.get(key).cloned()
    }

    fn prototype(&self, obj: ObjectId) -> Option<ObjectId> {
        self.object(obj).proto
    }

    fn owner(&self, obj: ObjectId) -> Option<ObjectId> {
        self.object(obj).owner
    }

    fn is_extensible(&self, obj: ObjectId) -> bool {
        self.object(obj).extensible
    }

    fn class(&self, obj: ObjectId) -> ObjectClass {
        self.object(obj).class.clone()
    }

    fn scope_names(&self, scope: ScopeId) -> Vec<String> {
        self.scope(scope).names.clone()
    }

    fn scope_parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scope(scope).parent
    }

    fn scope_value(&self, scope: ScopeId, name: &str) -> Option<Value> {
        self.scope(scope).values.get(name).cloned()
    }

    fn scope_kind(&self, scope: ScopeId) -> ScopeKind {
        self.scope(scope).kind
    }

    fn builtin_name(&self, obj: ObjectId) -> Option<String> {
        self.builtin_names.get(&obj).cloned()
    }

    fn builtin(&self, name: &str) -> Option<ObjectId> {
        self.builtin_or_null(name)
    }

    fn builtin_names(&self) -> Vec<String> {
        self.builtins.iter().map(|(name, _)| name.clone()).collect()
    }

    fn listeners(&self) -> Vec<Listener> {
        self.listeners.clone()
    }
}
