//! The dump session: two heaps, the interned sub-dumpers, and the output
//! sink.
//!
//! A [`Dumper`] compares a pristine heap (what replay starts from) with the
//! current heap (what replay must reproduce). Construction pairs up the
//! built-ins of both heaps, marks every binding that already matches, and
//! runs the one-time survey that picks each object's preferred address.
//! Requests then emit statements until the named bindings reach the
//! requested [`Do`] level.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DumpError, Result};
use crate::heap::{Heap, ObjectId, ScopeId, Value};
use crate::literal::{self, IMMUTABLE_GLOBALS};
use crate::object_dumper::ObjectDumper;
use crate::scope_dumper::ScopeDumper;
use crate::selector::{Part, Selector};
use crate::sub_dumper::{
    Components, Do, Done, ObjectDumperId, ScopeDumperId, SubDumper, SubDumperId,
};

/// Survey cost of reaching a scope through a closure, or an arguments
/// object through its scope. Higher than any single selector part so named
/// paths always win.
pub(crate) const CLOSURE_COST: u32 = 16;

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DumperOptions {
    /// Parts never emitted anywhere; they count as complete.
    pub skip_bindings: Vec<Part>,
    /// Recurse only along each object's preferred reference on the first
    /// pass.
    pub tree_only: bool,
    /// Log per-binding progress at info level.
    pub verbose: bool,
}

impl Default for DumperOptions {
    fn default() -> Self {
        DumperOptions {
            skip_bindings: Vec::new(),
            tree_only: true,
            verbose: false,
        }
    }
}

impl DumperOptions {
    pub fn apply(&mut self, patch: OptionsPatch) {
        if let Some(skip_bindings) = patch.skip_bindings {
            self.skip_bindings = skip_bindings;
        }
        if let Some(tree_only) = patch.tree_only {
            self.tree_only = tree_only;
        }
        if let Some(verbose) = patch.verbose {
            self.verbose = verbose;
        }
    }
}

/// Options to merge into the current ones; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsPatch {
    pub skip_bindings: Option<Vec<Part>>,
    pub tree_only: Option<bool>,
    pub verbose: Option<bool>,
    /// `"output": null` sends further output back to the internal buffer.
    /// Writers themselves are installed with [`Dumper::set_output`].
    #[serde(
        rename = "output",
        default,
        deserialize_with = "null_output",
        skip_serializing
    )]
    pub reset_output: bool,
}

fn null_output<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    <()>::deserialize(deserializer).map(|()| true)
}

// ═══════════════════════════════════════════════════════════════════════════════
// CURSOR & OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// Where emitted statements will be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Scope the statements run in.
    pub scope: ScopeId,
    /// Permissions in effect; objects created by the statements get this
    /// owner.
    pub perms: Option<ObjectId>,
    /// Prefix of every emitted line.
    pub indent: String,
}

impl Cursor {
    pub fn new(scope: ScopeId) -> Self {
        Cursor {
            scope,
            perms: None,
            indent: String::new(),
        }
    }

    pub fn with_perms(mut self, perms: Option<ObjectId>) -> Self {
        self.perms = perms;
        self
    }

    pub fn with_indent(mut self, indent: &str) -> Self {
        self.indent = indent.to_string();
        self
    }
}

enum Sink<'h> {
    Buffer(String),
    External(Box<dyn fmt::Write + 'h>),
}

// ═══════════════════════════════════════════════════════════════════════════════
// SURVEY GRAPH
// ═══════════════════════════════════════════════════════════════════════════════

/// An outward edge found by surveying one sub-dumper. `via` is the binding that
/// names the target, if it can be named at all.
#[derive(Debug, Clone)]
pub(crate) struct Edge {
    pub to: SubDumperId,
    pub via: Option<Components>,
    pub cost: u32,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DUMPER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Dumper<'h> {
    pub(crate) pristine: &'h dyn Heap,
    pub(crate) heap: &'h dyn Heap,
    pub(crate) options: DumperOptions,
    output: Sink<'h>,
    pub(crate) scopes: Vec<ScopeDumper>,
    pub(crate) scope_index: HashMap<ScopeId, ScopeDumperId>,
    pub(crate) objects: Vec<ObjectDumper>,
    pub(crate) object_index: HashMap<ObjectId, ObjectDumperId>,
    /// Arguments objects and the call scopes they belong to.
    pub(crate) arguments: HashMap<ObjectDumperId, ScopeDumperId>,
    /// Current-heap built-ins keyed by their pristine counterparts.
    from_pristine: HashMap<ObjectId, ObjectId>,
    listened: HashSet<u16>,
}

impl<'h> Dumper<'h> {
    /// Starts a session reproducing `heap` on top of `pristine`.
    pub fn new(pristine: &'h dyn Heap, heap: &'h dyn Heap) -> Result<Self> {
        let mut dumper = Dumper {
            pristine,
            heap,
            options: DumperOptions::default(),
            output: Sink::Buffer(String::new()),
            scopes: Vec::new(),
            scope_index: HashMap::new(),
            objects: Vec::new(),
            object_index: HashMap::new(),
            arguments: HashMap::new(),
            from_pristine: HashMap::new(),
            listened: HashSet::new(),
        };
        let global = dumper.scope_dumper(heap.global_scope());

        dumper.match_builtins();
        dumper.mark_globals(global);
        dumper.assign_builtin_refs(global);
        let unmodified = dumper.mark_unmodified_builtins(global);
        let surveyed = dumper.survey(global)?;

        tracing::debug!(
            builtins = dumper.from_pristine.len(),
            unmodified,
            surveyed,
            "dump session ready"
        );
        Ok(dumper)
    }

    pub(crate) fn scope(&self, sd: ScopeDumperId) -> &ScopeDumper {
        &self.scopes[sd.0 as usize]
    }

    pub(crate) fn scope_mut(&mut self, sd: ScopeDumperId) -> &mut ScopeDumper {
        &mut self.scopes[sd.0 as usize]
    }

    pub(crate) fn object(&self, od: ObjectDumperId) -> &ObjectDumper {
        &self.objects[od.0 as usize]
    }

    pub(crate) fn object_mut(&mut self, od: ObjectDumperId) -> &mut ObjectDumper {
        &mut self.objects[od.0 as usize]
    }

    pub(crate) fn sub_dumper(&self, id: SubDumperId) -> &dyn SubDumper {
        match id {
            SubDumperId::Scope(sd) => self.scope(sd),
            SubDumperId::Object(od) => self.object(od),
        }
    }

    pub(crate) fn sub_dumper_mut(&mut self, id: SubDumperId) -> &mut dyn SubDumper {
        match id {
            SubDumperId::Scope(sd) => self.scope_mut(sd),
            SubDumperId::Object(od) => self.object_mut(od),
        }
    }

    pub(crate) fn raise_binding(&mut self, via: &Components, level: Do) {
        self.sub_dumper_mut(via.dumper).raise(&via.part, level);
    }

    /// The value `via` holds in the current heap.
    pub(crate) fn value_of(&self, via: &Components) -> Option<Value> {
        match via.dumper {
            SubDumperId::Scope(sd) => {
                let name = via.part.as_name()?;
                self.heap.scope_value(self.scope(sd).scope, name)
            }
            SubDumperId::Object(od) => {
                let obj = self.object(od).obj;
                match &via.part {
                    Part::Prototype => Some(Value::from_slot(self.heap.prototype(obj))),
                    Part::Owner => Some(Value::from_slot(self.heap.owner(obj))),
                    Part::Name(key) => self.heap.own_property(obj, key).map(|pd| pd.value),
                }
            }
        }
    }

    fn describe(&self, via: &Components) -> String {
        self.sub_dumper(via.dumper).describe(&via.part)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OUTPUT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Emits one statement. The indent goes in front of it once; the text
    /// itself is written verbatim, since it may be function source.
    pub(crate) fn write(&mut self, cursor: &Cursor, statement: &str) -> Result<()> {
        tracing::trace!(statement, "emit");
        self.emit(&cursor.indent)?;
        self.emit(statement)?;
        self.emit("\n")
    }

    fn emit(&mut self, text: &str) -> Result<()> {
        match &mut self.output {
            Sink::Buffer(buffer) => {
                buffer.push_str(text);
                Ok(())
            }
            Sink::External(writer) => {
                fmt::Write::write_str(writer.as_mut(), text).map_err(|_| DumpError::Output)
            }
        }
    }

    /// Logs `text` and emits it as a comment, one indented `// ` line per
    /// line of text.
    pub fn warn(&mut self, cursor: &Cursor, text: &str) -> Result<()> {
        tracing::warn!(scope = cursor.scope.0, "{}", text);
        for line in text.lines() {
            self.write(cursor, &format!("// {}", line))?;
        }
        Ok(())
    }

    /// Sends further output to `writer` instead of the internal buffer.
    pub fn set_output(&mut self, writer: Box<dyn fmt::Write + 'h>) {
        self.output = Sink::External(writer);
    }

    /// Everything written to the internal buffer since the last call.
    pub fn take_output(&mut self) -> String {
        match &mut self.output {
            Sink::Buffer(buffer) => std::mem::take(buffer),
            Sink::External(_) => String::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OPTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn options(&self) -> &DumperOptions {
        &self.options
    }

    pub fn set_options(&mut self, patch: OptionsPatch) {
        if patch.reset_output {
            self.output = Sink::Buffer(String::new());
        }
        self.options.apply(patch);
    }

    /// Merges options given as JSON, e.g. `{"treeOnly": false}`.
    pub fn set_options_json(&mut self, json: &str) -> Result<()> {
        let patch: OptionsPatch = serde_json::from_str(json)?;
        self.set_options(patch);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REQUESTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A cursor at the global scope with no permissions.
    pub fn global_cursor(&self) -> Cursor {
        Cursor::new(self.heap.global_scope())
    }

    /// Brings the binding `selector` names to at least `todo`, emitting
    /// whatever statements that takes. Returns the level reached.
    pub fn dump_binding(&mut self, cursor: &Cursor, selector: &Selector, todo: Do) -> Result<Do> {
        let via = self.resolve(cursor, selector)?;
        let level = self.descend(cursor, &via, todo)?;
        if self.options.verbose {
            tracing::info!(binding = %selector, requested = %todo, reached = %level, "dumped binding");
        }
        Ok(level)
    }

    /// Dumps every variable of the cursor scope, then re-opens listening
    /// sockets the pristine heap does not have.
    pub fn dump(&mut self, cursor: &Cursor) -> Result<()> {
        let sd = self.scope_dumper(cursor.scope);
        self.dump_scope(cursor, sd)?;
        self.dump_listeners(cursor)
    }

    fn dump_listeners(&mut self, cursor: &Cursor) -> Result<()> {
        let pristine_listeners = self.pristine.listeners();
        for listener in self.heap.listeners() {
            if self.listened.contains(&listener.port) {
                continue;
            }
            let unchanged = pristine_listeners.iter().any(|l| {
                l.port == listener.port && self.counterpart(l.handler) == Some(listener.handler)
            });
            if unchanged {
                self.listened.insert(listener.port);
                continue;
            }
            let Some(handler) = self.expr_for(cursor, &Value::Object(listener.handler))? else {
                continue;
            };
            self.write(
                cursor,
                &format!("CC.connectionListen({}, {});", listener.port, handler),
            )?;
            self.listened.insert(listener.port);
        }
        Ok(())
    }

    pub fn prune(&mut self, selector: &Selector) -> Result<()> {
        let cursor = self.global_cursor();
        let via = self.resolve(&cursor, selector)?;
        self.sub_dumper_mut(via.dumper).prune(&via.part);
        Ok(())
    }

    pub fn skip(&mut self, selector: &Selector) -> Result<()> {
        let cursor = self.global_cursor();
        let via = self.resolve(&cursor, selector)?;
        self.sub_dumper_mut(via.dumper).skip(&via.part);
        Ok(())
    }

    pub fn unskip(&mut self, selector: &Selector) -> Result<()> {
        let cursor = self.global_cursor();
        let via = self.resolve(&cursor, selector)?;
        self.sub_dumper_mut(via.dumper).unskip(&via.part);
        Ok(())
    }

    /// Leaves every own property of the object `selector` names out of
    /// recursive dumps.
    pub fn prune_rest(&mut self, selector: &Selector) -> Result<()> {
        let od = self.resolve_object(selector)?;
        self.object_mut(od).prune_rest = true;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INSPECTION
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn done_of(&mut self, selector: &Selector) -> Result<Do> {
        let cursor = self.global_cursor();
        let via = self.resolve(&cursor, selector)?;
        Ok(self.sub_dumper(via.dumper).get_done(&via.part))
    }

    pub fn object_done(&mut self, selector: &Selector) -> Result<Done> {
        let od = self.resolve_object(selector)?;
        Ok(self.object(od).done)
    }

    /// Whether assigning to the property `selector` names would work in
    /// the heap as reconstructed so far. The property itself need not
    /// exist.
    pub fn is_writable(&mut self, selector: &Selector) -> Result<bool> {
        let key = match (selector.parent(), selector.last()) {
            (Some(parent), Part::Name(key)) => (parent, key.clone()),
            _ => {
                return Err(DumpError::NoSuchBinding {
                    selector: selector.to_string(),
                })
            }
        };
        let od = self.resolve_object(&key.0)?;
        Ok(self.is_writable_key(od, &key.1))
    }

    /// The survey's preferred address for the object `selector` names.
    pub fn preferred_ref(&mut self, selector: &Selector) -> Result<Option<Selector>> {
        let od = self.resolve_object(selector)?;
        Ok(self.preferred_selector(od, 0))
    }

    fn preferred_selector(&self, od: ObjectDumperId, depth: usize) -> Option<Selector> {
        if depth > self.objects.len() {
            return None;
        }
        let via = self.object(od).preferred_ref.as_ref()?;
        match via.dumper {
            SubDumperId::Scope(_) => Selector::variable(via.part.as_name()?).ok(),
            SubDumperId::Object(parent) => {
                let base = self.preferred_selector(parent, depth + 1)?;
                Some(base.child(via.part.clone()))
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RESOLUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// The binding `selector` names, looked up from the cursor scope.
    pub(crate) fn resolve(&mut self, cursor: &Cursor, selector: &Selector) -> Result<Components> {
        let missing = || DumpError::NoSuchBinding {
            selector: selector.to_string(),
        };
        let root = selector.root();
        let mut scope = Some(cursor.scope);
        while let Some(s) = scope {
            if self.heap.scope_value(s, root).is_some() {
                break;
            }
            scope = self.heap.scope_parent(s);
        }
        let sd = self.scope_dumper(scope.ok_or_else(missing)?);

        let mut via = Components::scope(sd, root);
        for part in &selector.parts()[1..] {
            let Some(Value::Object(obj)) = self.value_of(&via) else {
                return Err(missing());
            };
            if let Part::Name(key) = part {
                if self.heap.own_property(obj, key).is_none() {
                    return Err(missing());
                }
            }
            let od = self.object_dumper(obj);
            via = Components::object(od, part.clone());
        }
        Ok(via)
    }

    /// Whether the binding `via` can be named from the cursor: a variable
    /// visible and unshadowed there, or a slot of an object with an address
    /// there.
    pub(crate) fn reachable(&self, cursor: &Cursor, via: &Components) -> bool {
        match (via.dumper, via.part.as_name()) {
            (SubDumperId::Scope(sd), Some(name)) => self.scope_reachable(cursor, sd, name),
            (SubDumperId::Scope(_), None) => false,
            (SubDumperId::Object(od), _) => self.object_selector(cursor, od).is_some(),
        }
    }

    fn resolve_object(&mut self, selector: &Selector) -> Result<ObjectDumperId> {
        let cursor = self.global_cursor();
        let via = self.resolve(&cursor, selector)?;
        match self.value_of(&via) {
            Some(Value::Object(obj)) => Ok(self.object_dumper(obj)),
            _ => Err(DumpError::NoSuchBinding {
                selector: selector.to_string(),
            }),
        }
    }

    fn dump_components(&mut self, cursor: &Cursor, via: &Components, todo: Do) -> Result<Do> {
        match (via.dumper, &via.part) {
            (SubDumperId::Scope(sd), Part::Name(name)) => {
                self.dump_scope_binding(cursor, sd, name, todo)
            }
            (SubDumperId::Object(od), part) => self.dump_object_binding(cursor, od, part, todo),
            (SubDumperId::Scope(_), _) => Err(DumpError::NoSuchBinding {
                selector: self.describe(via),
            }),
        }
    }

    /// Dumps `via` to `todo`. A RECURSE request dumps the binding to DONE,
    /// then dumps the object it holds recursively. With `tree_only`, children
    /// reached through other than their preferred reference are left at DONE.
    pub(crate) fn descend(&mut self, cursor: &Cursor, via: &Components, todo: Do) -> Result<Do> {
        let level = self.dump_components(cursor, via, todo.min(Do::DONE))?;
        if todo < Do::Recurse || level < Do::DONE || level >= Do::Recurse {
            return Ok(level);
        }
        match self.value_of(via).and_then(|v| v.as_object()) {
            None => self.raise_binding(via, Do::Recurse),
            Some(obj) => {
                let od = self.object_dumper(obj);
                let done = self.dump_object(cursor, od, self.options.tree_only)?;
                if done == Done::Recursive {
                    self.raise_binding(via, Do::Recurse);
                } else if self.options.verbose {
                    tracing::info!(binding = %self.describe(via), ?done, "incomplete after recursion");
                }
            }
        }
        Ok(self.sub_dumper(via.dumper).get_done(&via.part))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPRESSIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// An expression evaluating to `value` at the cursor. `None` means the
    /// value cannot be expressed there; a warning has been emitted.
    pub(crate) fn expr_for(&mut self, cursor: &Cursor, value: &Value) -> Result<Option<String>> {
        let expr = match value {
            Value::Undefined => self.global_literal(cursor, "undefined", "(void 0)"),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Str(s) => literal::quote(s),
            Value::Number(n) if n.is_nan() => self.global_literal(cursor, "NaN", "(0/0)"),
            Value::Number(n) if n.is_infinite() => {
                let expr = self.global_literal(cursor, "Infinity", "(1/0)");
                if *n < 0.0 {
                    format!("-{}", expr)
                } else {
                    expr
                }
            }
            Value::Number(n) => literal::number(*n),
            Value::Object(obj) => return self.object_expr(cursor, *obj),
        };
        Ok(Some(expr))
    }

    /// `name` if it still means the global constant at the cursor, else
    /// `fallback`.
    fn global_literal(&self, cursor: &Cursor, name: &str, fallback: &str) -> String {
        let global = self.heap.global_scope();
        let mut scope = Some(cursor.scope);
        while let Some(s) = scope {
            if s == global {
                break;
            }
            if self.heap.scope_value(s, name).is_some() {
                return fallback.to_string();
            }
            scope = self.heap.scope_parent(s);
        }
        name.to_string()
    }

    fn object_expr(&mut self, cursor: &Cursor, obj: ObjectId) -> Result<Option<String>> {
        let od = self.object_dumper(obj);
        if let Some(selector) = self.object_selector(cursor, od) {
            return Ok(Some(selector.to_expr()));
        }
        if let Some(name) = self.heap.builtin_name(obj) {
            if self.pristine.builtin(&name).is_some() {
                return Ok(Some(format!("new {}", literal::quote(&name))));
            }
        }
        if self.object(od).is_created() {
            self.warn(
                cursor,
                &format!("object#{} was created but is not reachable here", obj.0),
            )?;
            return Ok(None);
        }
        self.construct(cursor, od)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SESSION SETUP
    // ═══════════════════════════════════════════════════════════════════════════

    /// The current-heap built-in corresponding to pristine object `original`.
    pub(crate) fn counterpart(&self, original: ObjectId) -> Option<ObjectId> {
        self.from_pristine.get(&original).copied()
    }

    /// Whether a pristine value and a current value are the same, objects
    /// being compared through the built-in correspondence.
    fn same_across(&self, before: &Value, after: &Value) -> bool {
        match (before, after) {
            (Value::Object(original), Value::Object(current)) => {
                self.counterpart(*original) == Some(*current)
            }
            (Value::Object(_), _) | (_, Value::Object(_)) => false,
            _ => before.same_value(after),
        }
    }

    fn match_builtins(&mut self) {
        let mut pairs = Vec::new();
        for name in self.heap.builtin_names() {
            if let (Some(current), Some(original)) =
                (self.heap.builtin(&name), self.pristine.builtin(&name))
            {
                if !self.from_pristine.contains_key(&original) {
                    self.from_pristine.insert(original, current);
                    pairs.push((original, current));
                }
            }
        }
        for (original, current) in pairs {
            self.mark_builtin(original, current);
        }
    }

    /// Believes `current` is exactly as pristine `original` was, and marks
    /// the bindings where that belief already matches the current heap.
    fn mark_builtin(&mut self, original: ObjectId, current: ObjectId) {
        let od = self.object_dumper(current);
        let believed_proto = self
            .pristine
            .prototype(original)
            .and_then(|p| self.counterpart(p));
        let believed_owner = self.pristine.owner(original).and_then(|p| self.counterpart(p));

        let mut attributes = HashMap::new();
        let mut levels = Vec::new();
        let mut deletions = Vec::new();
        for key in self.pristine.own_keys(original) {
            let Some(before) = self.pristine.own_property(original, &key) else {
                continue;
            };
            attributes.insert(key.clone(), before.attributes);
            match self.heap.own_property(current, &key) {
                None => deletions.push(key),
                Some(after) => {
                    let level = if !self.same_across(&before.value, &after.value) {
                        Do::Decl
                    } else if before.attributes == after.attributes {
                        Do::DONE
                    } else {
                        Do::Set
                    };
                    levels.push((Part::Name(key), level));
                }
            }
        }
        let slot_level = |matches: bool| if matches { Do::DONE } else { Do::Decl };
        let proto_level = slot_level(believed_proto == self.heap.prototype(current));
        let owner_level = slot_level(believed_owner == self.heap.owner(current));
        let extensible = self.pristine.is_extensible(original);

        let dumper = self.object_mut(od);
        dumper.proto = Some(believed_proto);
        dumper.owner = believed_owner;
        dumper.extensible = extensible;
        dumper.attributes = attributes;
        dumper.deletions = deletions;
        dumper.raise(&Part::Prototype, proto_level);
        dumper.raise(&Part::Owner, owner_level);
        for (part, level) in levels {
            dumper.raise(&part, level);
        }
    }

    fn mark_globals(&mut self, sd: ScopeDumperId) {
        let global = self.heap.global_scope();
        let pristine_global = self.pristine.global_scope();
        for name in self.heap.scope_names(global) {
            let part = Part::name(name.as_str());
            if IMMUTABLE_GLOBALS.contains(name.as_str()) {
                self.scope_mut(sd).raise(&part, Do::Recurse);
                continue;
            }
            let Some(before) = self.pristine.scope_value(pristine_global, &name) else {
                continue;
            };
            let after = self.heap.scope_value(global, &name).unwrap_or(Value::Undefined);
            let level = match (self.same_across(&before, &after), after.is_object()) {
                (true, true) => Do::DONE,
                (true, false) => Do::Recurse,
                (false, _) => Do::Decl,
            };
            self.scope_mut(sd).raise(&part, level);
        }
    }

    /// Gives every built-in reachable through already-done bindings the
    /// shortest such path as its reference.
    fn assign_builtin_refs(&mut self, sd: ScopeDumperId) {
        let global = self.heap.global_scope();
        let mut queue = VecDeque::new();
        for name in self.heap.scope_names(global) {
            let via = Components::scope(sd, &name);
            if self.scope(sd).get_done(&via.part) < Do::DONE {
                continue;
            }
            if let Some(Value::Object(obj)) = self.heap.scope_value(global, &name) {
                if self.adopt_builtin_ref(obj, via) {
                    queue.extend(self.find_object(obj));
                }
            }
        }
        while let Some(od) = queue.pop_front() {
            let obj = self.object(od).obj;
            for key in self.heap.own_keys(obj) {
                let via = Components::object(od, Part::Name(key));
                if self.object(od).get_done(&via.part) < Do::DONE {
                    continue;
                }
                if let Some(Value::Object(child)) = self.value_of(&via) {
                    if self.adopt_builtin_ref(child, via) {
                        queue.extend(self.find_object(child));
                    }
                }
            }
        }
    }

    fn adopt_builtin_ref(&mut self, obj: ObjectId, via: Components) -> bool {
        let Some(od) = self.find_object(obj) else {
            return false;
        };
        let dumper = self.object_mut(od);
        if !dumper.is_created() || dumper.reference.is_some() {
            return false;
        }
        dumper.referrers.push(via.clone());
        dumper.reference = Some(via);
        true
    }

    /// Whether every binding of a built-in already matches.
    fn is_unmodified(&self, od: ObjectDumperId) -> bool {
        let dumper = self.object(od);
        let obj = dumper.obj;
        dumper.is_created()
            && dumper.deletions.is_empty()
            && dumper.extensible == self.heap.is_extensible(obj)
            && dumper.get_done(&Part::Prototype) >= Do::DONE
            && dumper.get_done(&Part::Owner) >= Do::DONE
            && self
                .heap
                .own_keys(obj)
                .into_iter()
                .all(|key| dumper.get_done(&Part::Name(key)) >= Do::DONE)
    }

    fn children(&self, od: ObjectDumperId) -> Vec<Option<ObjectDumperId>> {
        let obj = self.object(od).obj;
        let mut children: Vec<ObjectId> = self
            .heap
            .prototype(obj)
            .into_iter()
            .chain(self.heap.owner(obj))
            .collect();
        for key in self.heap.own_keys(obj) {
            if let Some(Value::Object(child)) = self.heap.own_property(obj, &key).map(|pd| pd.value) {
                children.push(child);
            }
        }
        children.into_iter().map(|c| self.find_object(c)).collect()
    }

    /// Marks the greatest set of unmodified built-ins that only reach one
    /// another as recursively done. Returns how many there are.
    fn mark_unmodified_builtins(&mut self, sd: ScopeDumperId) -> usize {
        let all: Vec<ObjectDumperId> = (0..self.objects.len() as u32).map(ObjectDumperId).collect();
        let mut unmodified: HashSet<ObjectDumperId> =
            all.iter().copied().filter(|&od| self.is_unmodified(od)).collect();
        for &od in &unmodified {
            self.object_mut(od).done = Done::Done;
        }

        loop {
            let failing: Vec<ObjectDumperId> = unmodified
                .iter()
                .copied()
                .filter(|&od| {
                    self.children(od)
                        .into_iter()
                        .any(|child| !child.map_or(false, |c| unmodified.contains(&c)))
                })
                .collect();
            if failing.is_empty() {
                break;
            }
            for od in failing {
                unmodified.remove(&od);
            }
        }

        for &od in &unmodified {
            let obj = self.object(od).obj;
            let keys = self.heap.own_keys(obj);
            let dumper = self.object_mut(od);
            dumper.done = Done::Recursive;
            dumper.raise(&Part::Prototype, Do::Recurse);
            dumper.raise(&Part::Owner, Do::Recurse);
            for key in keys {
                dumper.raise(&Part::Name(key), Do::Recurse);
            }
        }

        let global = self.heap.global_scope();
        for name in self.heap.scope_names(global) {
            let part = Part::name(name.as_str());
            if self.scope(sd).get_done(&part) != Do::DONE {
                continue;
            }
            if let Some(Value::Object(obj)) = self.heap.scope_value(global, &name) {
                if self.find_object(obj).map_or(false, |od| unmodified.contains(&od)) {
                    self.scope_mut(sd).raise(&part, Do::Recurse);
                }
            }
        }
        unmodified.len()
    }

    /// Outward edges of one sub-dumper, for the survey.
    pub(crate) fn survey_sub_dumper(&mut self, id: SubDumperId) -> Result<Vec<Edge>> {
        match id {
            SubDumperId::Scope(sd) => self.survey_scope(sd),
            SubDumperId::Object(od) => self.survey_object(od),
        }
    }

    /// Shortest-path survey from the global scope. Every object reached
    /// through a nameable binding gets the cheapest one as its preferred
    /// reference; ties go to the binding discovered first. Returns the
    /// number of nodes reached.
    fn survey(&mut self, start: ScopeDumperId) -> Result<usize> {
        let mut best: HashMap<SubDumperId, u32> = HashMap::new();
        let mut settled: HashSet<SubDumperId> = HashSet::new();
        let mut queue = BinaryHeap::new();
        let mut seq: u64 = 0;

        let start = SubDumperId::Scope(start);
        best.insert(start, 0);
        queue.push(Reverse((0u32, seq, start, None::<Components>)));

        while let Some(Reverse((cost, _, node, via))) = queue.pop() {
            if !settled.insert(node) {
                continue;
            }
            if let (SubDumperId::Object(od), Some(via)) = (node, via) {
                let dumper = self.object_mut(od);
                if dumper.preferred_ref.is_none() {
                    dumper.preferred_ref = Some(via);
                }
            }
            let edges = self.survey_sub_dumper(node)?;
            for edge in edges {
                if settled.contains(&edge.to) {
                    continue;
                }
                let next = cost + edge.cost;
                if best.get(&edge.to).map_or(true, |&known| next < known) {
                    best.insert(edge.to, next);
                    seq += 1;
                    queue.push(Reverse((next, seq, edge.to, edge.via)));
                }
            }
        }
        Ok(settled.len())
    }
}

impl fmt::Debug for Dumper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dumper")
            .field("options", &self.options)
            .field("scopes", &self.scopes.len())
            .field("objects", &self.objects.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_heap::MemoryHeap;

    #[test]
    fn test_options_defaults_and_json_patch() {
        let options = DumperOptions::default();
        assert!(options.tree_only);
        assert!(!options.verbose);

        let pristine = MemoryHeap::pristine();
        let current = MemoryHeap::pristine();
        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        dumper
            .set_options_json(r#"{"treeOnly": false, "skipBindings": ["{owner}", "x"], "output": null, "bogus": 1}"#)
            .unwrap();
        assert!(!dumper.options().tree_only);
        assert_eq!(
            dumper.options().skip_bindings,
            vec![Part::Owner, Part::name("x")]
        );

        dumper.set_options(OptionsPatch {
            verbose: Some(true),
            ..OptionsPatch::default()
        });
        assert!(dumper.options().verbose);
        assert!(!dumper.options().tree_only);

        assert!(matches!(
            dumper.set_options_json(r#"{"treeOnly": "yes"}"#),
            Err(DumpError::Options(_))
        ));
    }

    #[test]
    fn test_unmodified_pristine_emits_nothing() {
        let pristine = MemoryHeap::pristine();
        let current = MemoryHeap::pristine();
        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        let cursor = dumper.global_cursor();
        dumper.dump(&cursor).unwrap();
        assert_eq!(dumper.take_output(), "");
        assert_eq!(
            dumper.object_done(&Selector::parse("Object.prototype").unwrap()),
            Ok(Done::Recursive)
        );
        assert_eq!(
            dumper.done_of(&Selector::parse("Array").unwrap()),
            Ok(Do::Recurse)
        );
    }

    #[test]
    fn test_primitive_literals() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let global = current.global();
        let inner = current.new_scope(global, crate::heap::ScopeKind::Block);
        current.declare(inner, "undefined", Value::Null);
        current.declare(inner, "NaN", Value::Null);

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        let top = dumper.global_cursor();
        let nested = Cursor::new(inner);

        let cases = [
            (Value::Undefined, "undefined", "(void 0)"),
            (Value::Number(f64::NAN), "NaN", "(0/0)"),
            (Value::Number(f64::NEG_INFINITY), "-Infinity", "-Infinity"),
            (Value::Number(-0.0), "-0", "-0"),
            (Value::from("a'b"), "'a\\'b'", "'a\\'b'"),
            (Value::Bool(false), "false", "false"),
        ];
        for (value, at_top, in_inner) in cases {
            assert_eq!(dumper.expr_for(&top, &value).unwrap().as_deref(), Some(at_top));
            assert_eq!(dumper.expr_for(&nested, &value).unwrap().as_deref(), Some(in_inner));
        }
    }

    #[test]
    fn test_reachability_of_bindings() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let global = current.global();
        let obj = current.new_plain_object();
        current.set(obj, "a", Value::from(1.0));
        current.declare_global("obj", Value::Object(obj));
        let inner = current.new_scope(global, crate::heap::ScopeKind::Block);
        current.declare(inner, "obj", Value::Null);

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        let top = dumper.global_cursor();
        let nested = Cursor::new(inner);
        let variable = dumper.resolve(&top, &Selector::parse("obj").unwrap()).unwrap();
        let property = dumper.resolve(&top, &Selector::parse("obj.a").unwrap()).unwrap();
        assert!(dumper.reachable(&top, &variable));
        assert!(!dumper.reachable(&nested, &variable));
        assert!(!dumper.reachable(&top, &property));

        dumper
            .dump_binding(&top, &Selector::parse("obj").unwrap(), Do::Set)
            .unwrap();
        assert!(dumper.reachable(&top, &property));
        assert!(!dumper.reachable(&nested, &property));
    }

    #[test]
    fn test_unreferenced_builtin_uses_registered_name() {
        let pristine = MemoryHeap::pristine();
        let mut current = MemoryHeap::pristine();
        let push = current.builtin("Array.prototype.push").unwrap();
        let array_prototype = current.builtin("Array.prototype").unwrap();
        current.delete(array_prototype, "push");
        current.declare_global("myPush", Value::Object(push));

        let mut dumper = Dumper::new(&pristine, &current).unwrap();
        let cursor = dumper.global_cursor();
        dumper
            .dump_binding(&cursor, &Selector::parse("myPush").unwrap(), Do::Recurse)
            .unwrap();
        assert_eq!(
            dumper.take_output(),
            "var myPush = new 'Array.prototype.push';\n"
        );
    }
}
