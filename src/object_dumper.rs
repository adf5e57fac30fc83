//! Object dumpers: slot and property completion, writability, and the
//! recursive dump with cycle detection.
//!
//! An object dumper tracks what the replayed heap is *believed* to contain
//! for one object: its prototype and owner, the attributes of every own
//! property written so far, and its extensibility. Every statement the
//! dumper emits updates that belief, so writability decisions are made
//! against the partially reconstructed heap rather than the final one.
//!
//! ## Recursive dump
//!
//! `dump_object` walks the object graph with an explicit frame stack.
//! A child that is still on the stack is a cycle: instead of failing, the
//! binding that reached it waits in a [`Pending`] group along with the
//! objects whose completion depends on the on-stack child. Groups merge as
//! frames unwind; when the last dependency unwinds, every member becomes
//! recursively done and every waiting binding reaches `RECURSE` at once.
//! A group that cannot close leaves its members capped at DONE for the rest
//! of the traversal.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::dumper::{Cursor, Dumper, Edge, CLOSURE_COST};
use crate::error::{DumpError, Result};
use crate::heap::{Attributes, FunctionKind, ObjectClass, ObjectId, Value};
use crate::literal;
use crate::selector::{Part, Selector};
use crate::sub_dumper::{
    BindingTable, Components, Do, Done, ObjectDumperId, SubDumper, SubDumperId,
};

#[derive(Debug, Clone)]
pub struct ObjectDumper {
    pub(crate) obj: ObjectId,
    pub(crate) bindings: BindingTable,
    /// Believed attributes of the own properties written so far.
    pub(crate) attributes: HashMap<String, Attributes>,
    /// Believed prototype; `None` until the object has been created.
    pub(crate) proto: Option<Option<ObjectId>>,
    pub(crate) owner: Option<ObjectId>,
    pub(crate) extensible: bool,
    /// Binding through which the object was first made addressable.
    pub(crate) reference: Option<Components>,
    /// Least-badness binding found by the survey.
    pub(crate) preferred_ref: Option<Components>,
    pub(crate) prune_rest: bool,
    /// Construction artifacts to delete before anything else.
    pub(crate) deletions: Vec<String>,
    pub(crate) done: Done,
    /// Every binding emitted so far whose value is this object.
    pub(crate) referrers: Vec<Components>,
}

impl ObjectDumper {
    pub(crate) fn new(obj: ObjectId) -> Self {
        ObjectDumper {
            obj,
            bindings: BindingTable::new(),
            attributes: HashMap::new(),
            proto: None,
            owner: None,
            extensible: true,
            reference: None,
            preferred_ref: None,
            prune_rest: false,
            deletions: Vec::new(),
            done: Done::No,
            referrers: Vec::new(),
        }
    }

    pub fn object(&self) -> ObjectId {
        self.obj
    }

    pub fn is_created(&self) -> bool {
        self.proto.is_some()
    }

    pub fn believed_prototype(&self) -> Option<ObjectId> {
        self.proto.flatten()
    }

    pub fn done(&self) -> Done {
        self.done
    }

    pub fn preferred_ref(&self) -> Option<&Components> {
        self.preferred_ref.as_ref()
    }
}

impl SubDumper for ObjectDumper {
    fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut BindingTable {
        &mut self.bindings
    }

    fn describe(&self, part: &Part) -> String {
        match part {
            Part::Name(key) if literal::is_identifier_name(key) => {
                format!("object#{}.{}", self.obj.0, key)
            }
            Part::Name(key) => format!("object#{}[{}]", self.obj.0, literal::quote(key)),
            special => format!("object#{}{}", self.obj.0, special),
        }
    }
}

/// `Object.defineProperty` call moving a property from `from` to `to`
/// attributes, optionally also storing a value.
fn define_property(
    target: &Selector,
    key: &str,
    from: Attributes,
    to: Attributes,
    value: Option<&str>,
) -> String {
    let mut fields = Vec::new();
    if from.writable != to.writable {
        fields.push(format!("writable: {}", to.writable));
    }
    if from.enumerable != to.enumerable {
        fields.push(format!("enumerable: {}", to.enumerable));
    }
    if from.configurable != to.configurable {
        fields.push(format!("configurable: {}", to.configurable));
    }
    if let Some(value) = value {
        fields.push(format!("value: {}", value));
    }
    format!(
        "Object.defineProperty({}, {}, {{{}}});",
        target.to_expr(),
        literal::quote(key),
        fields.join(", ")
    )
}

/// Only `writable` may change on a non-configurable property, and only
/// from true to false.
fn reachable_without_configurable(from: Attributes, to: Attributes) -> bool {
    from.enumerable == to.enumerable
        && from.configurable == to.configurable
        && (from.writable == to.writable || from.writable)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRAVERSAL STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Objects and bindings whose completion waits on objects still on the
/// traversal stack.
#[derive(Debug, Default)]
struct Pending {
    members: Vec<ObjectDumperId>,
    waiting: Vec<Components>,
    deps: BTreeSet<ObjectDumperId>,
}

impl Pending {
    fn merge(&mut self, other: Pending) {
        self.members.extend(other.members);
        self.waiting.extend(other.waiting);
        self.deps.extend(other.deps);
    }
}

#[derive(Debug)]
enum Outcome {
    Recursive,
    Pending(Pending),
    Incomplete,
}

/// What an earlier visit in the same traversal concluded.
#[derive(Debug, Clone)]
enum Visit {
    Capped,
    Waiting(BTreeSet<ObjectDumperId>),
}

#[derive(Debug)]
struct Frame {
    od: ObjectDumperId,
    parts: Vec<Part>,
    next: usize,
    /// Every binding reached DONE.
    complete: bool,
    /// Every binding reached RECURSE or is waiting in `pending`.
    recursive: bool,
    pending: Pending,
    /// Binding whose value is the frame above this one.
    child: Option<Part>,
}

impl<'h> Dumper<'h> {
    /// Interns the dumper for `obj`.
    pub(crate) fn object_dumper(&mut self, obj: ObjectId) -> ObjectDumperId {
        if let Some(&od) = self.object_index.get(&obj) {
            return od;
        }
        let od = ObjectDumperId(self.objects.len() as u32);
        self.objects.push(ObjectDumper::new(obj));
        self.object_index.insert(obj, od);
        od
    }

    pub(crate) fn find_object(&self, obj: ObjectId) -> Option<ObjectDumperId> {
        self.object_index.get(&obj).copied()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ADDRESSING
    // ═══════════════════════════════════════════════════════════════════════════

    /// An expression path to `od` usable from the cursor, if there is one.
    pub(crate) fn object_selector(&self, cursor: &Cursor, od: ObjectDumperId) -> Option<Selector> {
        self.object_selector_avoiding(cursor, od, &mut HashSet::new())
    }

    /// Tries the preferred reference, the first reference, then every later
    /// referrer. `path` holds the objects already being addressed, so
    /// referrer cycles end.
    fn object_selector_avoiding(
        &self,
        cursor: &Cursor,
        od: ObjectDumperId,
        path: &mut HashSet<ObjectDumperId>,
    ) -> Option<Selector> {
        if !path.insert(od) {
            return None;
        }
        let dumper = self.object(od);
        let found = dumper
            .preferred_ref
            .iter()
            .chain(dumper.reference.iter())
            .chain(dumper.referrers.iter())
            .find_map(|via| self.components_selector(cursor, via, path));
        path.remove(&od);
        found
    }

    fn components_selector(
        &self,
        cursor: &Cursor,
        via: &Components,
        path: &mut HashSet<ObjectDumperId>,
    ) -> Option<Selector> {
        if self.sub_dumper(via.dumper).get_done(&via.part) < Do::Set {
            return None;
        }
        match via.dumper {
            SubDumperId::Scope(sd) => {
                let name = via.part.as_name()?;
                if !self.scope_reachable(cursor, sd, name) {
                    return None;
                }
                Selector::variable(name).ok()
            }
            SubDumperId::Object(parent) => {
                let base = self.object_selector_avoiding(cursor, parent, path)?;
                Some(base.child(via.part.clone()))
            }
        }
    }

    /// Records that the binding `via` now holds `value`.
    pub(crate) fn note_reference(&mut self, value: &Value, via: &Components) {
        if let Value::Object(obj) = value {
            let od = self.object_dumper(*obj);
            let dumper = self.object_mut(od);
            if dumper.reference.is_none() {
                dumper.reference = Some(via.clone());
            }
            if !dumper.referrers.contains(via) {
                dumper.referrers.push(via.clone());
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // WRITABILITY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Whether plain assignment to `key` on `od` would store a value in the
    /// heap as reconstructed so far.
    pub(crate) fn is_writable_key(&self, od: ObjectDumperId, key: &str) -> bool {
        let dumper = self.object(od);
        if let Some(attributes) = dumper.attributes.get(key) {
            return attributes.writable;
        }
        let mut seen = HashSet::new();
        let mut next = dumper.believed_prototype();
        while let Some(proto) = next {
            if !seen.insert(proto) {
                break;
            }
            let Some(pd) = self.find_object(proto) else {
                break;
            };
            let ancestor = self.object(pd);
            if ancestor.attributes.get(key).map_or(false, |a| !a.writable) {
                return false;
            }
            next = ancestor.believed_prototype();
        }
        true
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BINDINGS
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn dump_object_binding(
        &mut self,
        cursor: &Cursor,
        od: ObjectDumperId,
        part: &Part,
        todo: Do,
    ) -> Result<Do> {
        let current = self.object(od).get_done(part);
        if current >= todo || self.object(od).is_skipped(part) {
            return Ok(current);
        }
        if !self.object(od).is_created() {
            return Err(DumpError::Uncreated {
                binding: self.object(od).describe(part),
            });
        }
        match part {
            Part::Prototype | Part::Owner => self.dump_slot(cursor, od, part, todo),
            Part::Name(key) => self.dump_property(cursor, od, key, todo),
        }
    }

    fn dump_slot(&mut self, cursor: &Cursor, od: ObjectDumperId, part: &Part, todo: Do) -> Result<Do> {
        let current = self.object(od).get_done(part);
        if todo < Do::Set {
            return Ok(current);
        }
        let obj = self.object(od).obj;
        let (actual, believed) = if *part == Part::Prototype {
            (self.heap.prototype(obj), self.object(od).believed_prototype())
        } else {
            (self.heap.owner(obj), self.object(od).owner)
        };
        let value = Value::from_slot(actual);
        let via = Components::object(od, part.clone());

        if actual != believed {
            let Some(target) = self.object_selector(cursor, od) else {
                self.warn_unreachable(cursor, od)?;
                return Ok(current);
            };
            if *part == Part::Prototype && !self.object(od).extensible {
                self.warn(
                    cursor,
                    &format!("cannot change the prototype of non-extensible {}", target),
                )?;
                return Ok(current);
            }
            let Some(expr) = self.expr_for(cursor, &value)? else {
                return Ok(current);
            };
            self.write(cursor, &format!("{};", part.write_expr(&target.to_expr(), &expr)))?;
            let dumper = self.object_mut(od);
            if *part == Part::Prototype {
                dumper.proto = Some(actual);
            } else {
                dumper.owner = actual;
            }
        }
        self.note_reference(&value, &via);
        self.object_mut(od).set_done(part, Do::DONE)?;
        Ok(Do::DONE)
    }

    fn dump_property(&mut self, cursor: &Cursor, od: ObjectDumperId, key: &str, todo: Do) -> Result<Do> {
        let part = Part::name(key);
        let obj = self.object(od).obj;
        let actual = self
            .heap
            .own_property(obj, key)
            .ok_or_else(|| DumpError::NoSuchBinding {
                selector: self.object(od).describe(&part),
            })?;
        let via = Components::object(od, part.clone());
        let mut level = self.object(od).get_done(&part);

        if level < Do::Set {
            let Some(target) = self.object_selector(cursor, od) else {
                self.warn_unreachable(cursor, od)?;
                return Ok(level);
            };
            let believed = self.object(od).attributes.get(key).copied();
            let extensible = self.object(od).extensible;
            let assignable = self.is_writable_key(od, key) && (believed.is_some() || extensible);

            if assignable {
                let Some(expr) = self.expr_for(cursor, &actual.value)? else {
                    return Ok(level);
                };
                self.write(cursor, &format!("{};", part.write_expr(&target.to_expr(), &expr)))?;
                self.object_mut(od)
                    .attributes
                    .entry(key.to_string())
                    .or_insert(Attributes::PLAIN);
                self.note_reference(&actual.value, &via);
                self.object_mut(od).set_done(&part, Do::Set)?;
                level = Do::Set;
            } else {
                let definable = match believed {
                    Some(attributes) => attributes.configurable,
                    None => extensible,
                };
                if !definable {
                    let reason = if believed.is_some() {
                        "it is read-only and non-configurable"
                    } else {
                        "the object is not extensible"
                    };
                    self.warn(cursor, &format!("cannot set {}: {}", target.child(part.clone()), reason))?;
                    return Ok(level);
                }
                let Some(expr) = self.expr_for(cursor, &actual.value)? else {
                    return Ok(level);
                };
                let from = believed.unwrap_or(Attributes::NONE);
                self.write(
                    cursor,
                    &define_property(&target, key, from, actual.attributes, Some(&expr)),
                )?;
                self.object_mut(od)
                    .attributes
                    .insert(key.to_string(), actual.attributes);
                self.note_reference(&actual.value, &via);
                self.object_mut(od).set_done(&part, Do::DONE)?;
                level = Do::DONE;
            }
        }

        if todo >= Do::DONE && level < Do::DONE {
            let believed = self
                .object(od)
                .attributes
                .get(key)
                .copied()
                .unwrap_or(Attributes::PLAIN);
            if believed != actual.attributes {
                let Some(target) = self.object_selector(cursor, od) else {
                    self.warn_unreachable(cursor, od)?;
                    return Ok(level);
                };
                if !believed.configurable
                    && !reachable_without_configurable(believed, actual.attributes)
                {
                    self.warn(
                        cursor,
                        &format!(
                            "cannot change attributes of non-configurable {}",
                            target.child(part.clone())
                        ),
                    )?;
                    return Ok(level);
                }
                self.write(
                    cursor,
                    &define_property(&target, key, believed, actual.attributes, None),
                )?;
                self.object_mut(od)
                    .attributes
                    .insert(key.to_string(), actual.attributes);
            }
            self.object_mut(od).set_done(&part, Do::DONE)?;
            level = Do::DONE;
        }

        Ok(level)
    }

    fn warn_unreachable(&mut self, cursor: &Cursor, od: ObjectDumperId) -> Result<()> {
        let text = format!("object#{} has no usable reference here", self.object(od).obj.0);
        self.warn(cursor, &text)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RECURSIVE DUMP
    // ═══════════════════════════════════════════════════════════════════════════

    /// Brings `root` and everything reachable from it to DONE, and to
    /// DONE_RECURSIVELY where the whole subgraph completes.
    ///
    /// With `tree_only`, recursion follows only bindings that are a child's
    /// preferred reference.
    pub(crate) fn dump_object(
        &mut self,
        cursor: &Cursor,
        root: ObjectDumperId,
        tree_only: bool,
    ) -> Result<Done> {
        if self.object(root).done == Done::Recursive {
            return Ok(Done::Recursive);
        }
        if !self.object(root).is_created() {
            return Err(DumpError::Uncreated {
                binding: format!("object#{}", self.object(root).obj.0),
            });
        }

        let mut on_stack: HashMap<ObjectDumperId, usize> = HashMap::new();
        let mut visited: HashMap<ObjectDumperId, Visit> = HashMap::new();
        let mut stack = vec![self.open_frame(cursor, root)?];
        on_stack.insert(root, 0);
        let mut returned: Option<Outcome> = None;

        while let Some(frame) = stack.last_mut() {
            if let Some(outcome) = returned.take() {
                if let Some(part) = frame.child.take() {
                    let via = Components::object(frame.od, part);
                    match outcome {
                        Outcome::Recursive => self.raise_binding(&via, Do::Recurse),
                        Outcome::Pending(pending) => {
                            frame.pending.merge(pending);
                            frame.pending.waiting.push(via);
                        }
                        Outcome::Incomplete => frame.recursive = false,
                    }
                }
            }

            if frame.next < frame.parts.len() {
                let part = frame.parts[frame.next].clone();
                frame.next += 1;
                let od = frame.od;
                let via = Components::object(od, part.clone());

                let level = self.dump_object_binding(cursor, od, &part, Do::DONE)?;
                if level < Do::DONE {
                    frame.complete = false;
                    frame.recursive = false;
                    continue;
                }
                if level >= Do::Recurse {
                    continue;
                }
                let Some(child_obj) = self.value_of(&via).and_then(|v| v.as_object()) else {
                    self.raise_binding(&via, Do::Recurse);
                    continue;
                };
                let child = self.object_dumper(child_obj);
                if self.object(child).done == Done::Recursive {
                    self.raise_binding(&via, Do::Recurse);
                    continue;
                }
                if on_stack.contains_key(&child) {
                    frame.pending.deps.insert(child);
                    frame.pending.waiting.push(via);
                    continue;
                }
                match visited.get(&child) {
                    Some(Visit::Capped) => {
                        frame.recursive = false;
                        continue;
                    }
                    Some(Visit::Waiting(deps)) => {
                        let live = deps.iter().filter(|&d| on_stack.contains_key(d)).copied();
                        frame.pending.deps.extend(live);
                        frame.pending.waiting.push(via);
                        continue;
                    }
                    None => {}
                }
                if tree_only
                    && self
                        .object(child)
                        .preferred_ref
                        .as_ref()
                        .map_or(false, |preferred| *preferred != via)
                {
                    frame.recursive = false;
                    continue;
                }

                frame.child = Some(part);
                let depth = stack.len();
                let child_frame = self.open_frame(cursor, child)?;
                on_stack.insert(child, depth);
                stack.push(child_frame);
                continue;
            }

            let Some(finished) = stack.pop() else {
                break;
            };
            on_stack.remove(&finished.od);
            returned = Some(self.close_frame(cursor, finished, &mut visited)?);
        }

        Ok(self.object(root).done)
    }

    fn open_frame(&mut self, cursor: &Cursor, od: ObjectDumperId) -> Result<Frame> {
        let complete = self.emit_deletions(cursor, od)?;
        let obj = self.object(od).obj;
        let mut parts = vec![Part::Prototype, Part::Owner];
        if !self.object(od).prune_rest {
            parts.extend(self.heap.own_keys(obj).into_iter().map(Part::Name));
        }
        parts.retain(|part| !self.options.skip_bindings.contains(part));
        Ok(Frame {
            od,
            parts,
            next: 0,
            complete,
            recursive: true,
            pending: Pending::default(),
            child: None,
        })
    }

    /// Deletes construction artifacts the current object does not have.
    /// False if some could not be deleted.
    fn emit_deletions(&mut self, cursor: &Cursor, od: ObjectDumperId) -> Result<bool> {
        if self.object(od).deletions.is_empty() {
            return Ok(true);
        }
        let Some(target) = self.object_selector(cursor, od) else {
            self.warn_unreachable(cursor, od)?;
            return Ok(false);
        };
        let keys = std::mem::take(&mut self.object_mut(od).deletions);
        let mut kept = Vec::new();
        for key in keys {
            let configurable = self
                .object(od)
                .attributes
                .get(&key)
                .map_or(true, |a| a.configurable);
            let member = Part::name(key.as_str()).read_expr(&target.to_expr());
            if !configurable {
                self.warn(cursor, &format!("cannot delete non-configurable {}", member))?;
                kept.push(key);
                continue;
            }
            self.write(cursor, &format!("delete {};", member))?;
            self.object_mut(od).attributes.remove(&key);
        }
        let complete = kept.is_empty();
        self.object_mut(od).deletions = kept;
        Ok(complete)
    }

    fn close_frame(
        &mut self,
        cursor: &Cursor,
        frame: Frame,
        visited: &mut HashMap<ObjectDumperId, Visit>,
    ) -> Result<Outcome> {
        let Frame {
            od,
            mut complete,
            recursive,
            mut pending,
            ..
        } = frame;

        if complete && self.object(od).done == Done::No {
            complete = self.settle_extensibility(cursor, od)?;
            if complete {
                self.object_mut(od).done = Done::Done;
            }
        }
        pending.deps.remove(&od);

        if !complete || !recursive {
            for member in pending.members.iter().chain(std::iter::once(&od)) {
                visited.insert(*member, Visit::Capped);
            }
            return Ok(Outcome::Incomplete);
        }

        if pending.deps.is_empty() {
            self.object_mut(od).done = Done::Recursive;
            for member in pending.members {
                self.object_mut(member).done = Done::Recursive;
            }
            for via in pending.waiting {
                self.raise_binding(&via, Do::Recurse);
            }
            return Ok(Outcome::Recursive);
        }

        pending.members.push(od);
        for member in &pending.members {
            visited.insert(*member, Visit::Waiting(pending.deps.clone()));
        }
        Ok(Outcome::Pending(pending))
    }

    fn settle_extensibility(&mut self, cursor: &Cursor, od: ObjectDumperId) -> Result<bool> {
        let actual = self.heap.is_extensible(self.object(od).obj);
        let believed = self.object(od).extensible;
        if actual == believed {
            return Ok(true);
        }
        if actual {
            let text = format!(
                "object#{} cannot be made extensible again",
                self.object(od).obj.0
            );
            self.warn(cursor, &text)?;
            return Ok(false);
        }
        let Some(target) = self.object_selector(cursor, od) else {
            self.warn_unreachable(cursor, od)?;
            return Ok(false);
        };
        self.write(cursor, &format!("Object.preventExtensions({});", target.to_expr()))?;
        self.object_mut(od).extensible = false;
        Ok(true)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SURVEY
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn survey_object(&mut self, od: ObjectDumperId) -> Result<Vec<Edge>> {
        let obj = self.object(od).obj;
        let mut edges = Vec::new();

        let slots = [
            (Part::Prototype, self.heap.prototype(obj)),
            (Part::Owner, self.heap.owner(obj)),
        ];
        for (part, target) in slots {
            if let Some(target) = target {
                let to = self.object_dumper(target);
                edges.push(Edge {
                    to: SubDumperId::Object(to),
                    cost: part.badness(),
                    via: Some(Components::object(od, part)),
                });
            }
        }

        for key in self.heap.own_keys(obj) {
            let Some(Value::Object(target)) = self.heap.own_property(obj, &key).map(|pd| pd.value)
            else {
                continue;
            };
            let to = self.object_dumper(target);
            let part = Part::Name(key);
            edges.push(Edge {
                to: SubDumperId::Object(to),
                cost: part.badness(),
                via: Some(Components::object(od, part)),
            });
        }

        match self.heap.class(obj) {
            ObjectClass::Function(FunctionKind::Closure { scope, .. }) => {
                let sd = self.scope_dumper(scope);
                self.scope_mut(sd).inner_functions.insert(od);
                edges.push(Edge {
                    to: SubDumperId::Scope(sd),
                    via: None,
                    cost: CLOSURE_COST,
                });
            }
            ObjectClass::Arguments { scope } => {
                let sd = self.scope_dumper(scope);
                self.associate_arguments(od, sd)?;
            }
            _ => {}
        }

        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_property_lists_only_changes() {
        let target = Selector::parse("child").unwrap();
        assert_eq!(
            define_property(&target, "foo", Attributes::NONE, Attributes::PLAIN, Some("2")),
            "Object.defineProperty(child, 'foo', {writable: true, enumerable: true, configurable: true, value: 2});"
        );
        assert_eq!(
            define_property(
                &target,
                "x y",
                Attributes::PLAIN,
                Attributes::new(false, true, false),
                None
            ),
            "Object.defineProperty(child, 'x y', {writable: false, configurable: false});"
        );
    }

    #[test]
    fn test_non_configurable_may_only_lose_writability() {
        let locked = Attributes::new(true, true, false);
        assert!(reachable_without_configurable(
            locked,
            Attributes::new(false, true, false)
        ));
        assert!(!reachable_without_configurable(
            Attributes::new(false, true, false),
            locked
        ));
        assert!(!reachable_without_configurable(
            locked,
            Attributes::new(true, false, false)
        ));
    }
}
