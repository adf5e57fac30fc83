//! Per-class construction expressions.
//!
//! Constructing an object does more than produce an expression: evaluating
//! `[]`, a function source or `new Error('x')` leaves properties behind.
//! Each rule records those artifacts as believed state, pre-marks the ones
//! that already match the current object, and schedules deletions for the
//! ones the current object no longer has.

use crate::dumper::{Cursor, Dumper};
use crate::error::Result;
use crate::heap::{
    Attributes, FunctionKind, ObjectClass, ObjectId, PropertyDescriptor, ScopeId, Value,
    ERROR_CONSTRUCTORS,
};
use crate::literal::{self, FunctionShape};
use crate::selector::Part;
use crate::sub_dumper::{Components, Do, ObjectDumperId, SubDumper};

impl<'h> Dumper<'h> {
    /// Expression creating a fresh copy of the uncreated object `od`, or
    /// `None` (after a warning) if its class cannot be rebuilt here.
    pub(crate) fn construct(&mut self, cursor: &Cursor, od: ObjectDumperId) -> Result<Option<String>> {
        let obj = self.object(od).obj;
        let constructed = match self.heap.class(obj) {
            ObjectClass::Object => Some(self.construct_object(cursor, od)),
            ObjectClass::Array => Some(self.construct_array(cursor, od)),
            ObjectClass::Function(FunctionKind::Closure { source, scope }) => {
                Some(self.construct_closure(cursor, od, &source, scope)?)
            }
            ObjectClass::Function(FunctionKind::Native) => {
                self.warn(cursor, &format!("cannot rebuild native function object#{}", obj.0))?;
                None
            }
            ObjectClass::Date(ms) => Some(self.construct_date(cursor, od, ms)),
            ObjectClass::RegExp { source, flags } => {
                Some(self.construct_regexp(cursor, od, &source, &flags))
            }
            ObjectClass::Error => Some(self.construct_error(cursor, od)),
            ObjectClass::WeakMap => {
                let proto = self.heap.builtin("WeakMap.prototype");
                self.finish_construction(cursor, od, proto);
                Some("new WeakMap()".to_string())
            }
            ObjectClass::Arguments { scope } => self.construct_arguments(cursor, od, scope)?,
        };
        if constructed.is_some() {
            tracing::trace!(object = obj.0, "constructed");
        }
        Ok(constructed)
    }

    /// Records what creation leaves in place: the believed prototype, the
    /// cursor's permissions as owner, and a fresh extensible object.
    fn finish_construction(&mut self, cursor: &Cursor, od: ObjectDumperId, proto: Option<ObjectId>) {
        let obj = self.object(od).obj;
        let actual_proto = self.heap.prototype(obj);
        let actual_owner = self.heap.owner(obj);
        let dumper = self.object_mut(od);
        dumper.proto = Some(proto);
        dumper.owner = cursor.perms;
        dumper.extensible = true;
        if proto == actual_proto {
            dumper.raise(&Part::Prototype, Do::DONE);
        }
        if cursor.perms == actual_owner {
            dumper.raise(&Part::Owner, Do::DONE);
        }
    }

    /// Records a property that construction creates as `created`. If the
    /// current object has the same property the binding starts at
    /// `matched`; a differing one starts lower, and a missing one is
    /// scheduled for deletion.
    fn expect_artifact(
        &mut self,
        od: ObjectDumperId,
        key: &str,
        created: PropertyDescriptor,
        matched: Do,
    ) {
        let obj = self.object(od).obj;
        let actual = self.heap.own_property(obj, key);
        let dumper = self.object_mut(od);
        dumper.attributes.insert(key.to_string(), created.attributes);
        let Some(actual) = actual else {
            dumper.deletions.push(key.to_string());
            return;
        };
        let level = if !actual.value.same_value(&created.value) {
            Do::Decl
        } else if actual.attributes == created.attributes {
            matched
        } else {
            Do::Set
        };
        dumper.raise(&Part::name(key), level);
    }

    fn construct_object(&mut self, cursor: &Cursor, od: ObjectDumperId) -> String {
        let obj = self.object(od).obj;
        let object_prototype = self.heap.builtin("Object.prototype");
        let (expr, believed) = match self.heap.prototype(obj) {
            None => ("Object.create(null)".to_string(), None),
            Some(proto) if Some(proto) == object_prototype => ("{}".to_string(), object_prototype),
            Some(proto) => {
                let pd = self.object_dumper(proto);
                match self.object_selector(cursor, pd) {
                    Some(selector) => (format!("Object.create({})", selector.to_expr()), Some(proto)),
                    None => ("{}".to_string(), object_prototype),
                }
            }
        };
        self.finish_construction(cursor, od, believed);
        expr
    }

    fn construct_array(&mut self, cursor: &Cursor, od: ObjectDumperId) -> String {
        let obj = self.object(od).obj;
        let proto = self.heap.builtin("Array.prototype");
        self.finish_construction(cursor, od, proto);

        let next_index = self
            .heap
            .own_keys(obj)
            .iter()
            .filter(|key| literal::is_array_index(key))
            .filter_map(|key| key.parse::<f64>().ok())
            .fold(0.0, |next: f64, index| next.max(index + 1.0));
        // Assigning the indices leaves length one past the highest of them.
        let implied = PropertyDescriptor::new(Value::Number(next_index), Attributes::HIDDEN);
        self.expect_artifact(od, "length", implied, Do::Recurse);
        "[]".to_string()
    }

    fn construct_closure(
        &mut self,
        cursor: &Cursor,
        od: ObjectDumperId,
        source: &str,
        scope: ScopeId,
    ) -> Result<String> {
        let obj = self.object(od).obj;
        if scope != cursor.scope {
            self.warn(
                cursor,
                &format!(
                    "closure scope mismatch: object#{} closes over scope #{}, not scope #{}",
                    obj.0, scope.0, cursor.scope.0
                ),
            )?;
        }
        let shape = literal::function_shape(source).unwrap_or(FunctionShape {
            name: None,
            params: 0,
            arrow: false,
        });
        let proto = self.heap.builtin("Function.prototype");
        self.finish_construction(cursor, od, proto);

        let length = Value::Number(shape.params as f64);
        self.expect_artifact(
            od,
            "length",
            PropertyDescriptor::new(length, Attributes::FUNCTION_META),
            Do::Recurse,
        );
        let name = Value::Str(shape.name.clone().unwrap_or_default());
        self.expect_artifact(
            od,
            "name",
            PropertyDescriptor::new(name, Attributes::FUNCTION_META),
            Do::Set,
        );

        if !shape.arrow {
            let dumper = self.object_mut(od);
            dumper
                .attributes
                .insert("prototype".to_string(), Attributes::HIDDEN);
            match self.heap.own_property(obj, "prototype") {
                None => self.object_mut(od).deletions.push("prototype".to_string()),
                Some(actual) => {
                    let adopted = match actual.value {
                        Value::Object(p) if actual.attributes == Attributes::HIDDEN => {
                            self.adopt_prototype(cursor, od, p)
                        }
                        _ => false,
                    };
                    let level = if adopted { Do::Set } else { Do::Decl };
                    self.object_mut(od).raise(&Part::name("prototype"), level);
                }
            }
        }
        Ok(source.to_string())
    }

    /// Treats the object evaluating the function creates as `.prototype`
    /// as the current `p`, when `p` is an ordinary object nothing else has
    /// created or referenced yet.
    fn adopt_prototype(&mut self, cursor: &Cursor, f: ObjectDumperId, p: ObjectId) -> bool {
        let pd = self.object_dumper(p);
        let candidate = self.object(pd);
        if candidate.is_created() || candidate.reference.is_some() || !candidate.referrers.is_empty()
        {
            return false;
        }
        let object_prototype = self.heap.builtin("Object.prototype");
        if self.heap.class(p) != ObjectClass::Object || self.heap.prototype(p) != object_prototype {
            return false;
        }

        self.finish_construction(cursor, pd, object_prototype);
        let f_obj = self.object(f).obj;
        self.expect_artifact(
            pd,
            "constructor",
            PropertyDescriptor::new(Value::Object(f_obj), Attributes::METHOD),
            Do::DONE,
        );
        let via = Components::object(f, Part::name("prototype"));
        self.note_reference(&Value::Object(p), &via);
        true
    }

    fn construct_date(&mut self, cursor: &Cursor, od: ObjectDumperId, ms: f64) -> String {
        let proto = self.heap.builtin("Date.prototype");
        self.finish_construction(cursor, od, proto);
        match literal::iso_date(ms) {
            Some(iso) => format!("new Date({})", literal::quote(&iso)),
            None => format!("new Date({})", literal::number(ms)),
        }
    }

    fn construct_regexp(&mut self, cursor: &Cursor, od: ObjectDumperId, source: &str, flags: &str) -> String {
        let proto = self.heap.builtin("RegExp.prototype");
        self.finish_construction(cursor, od, proto);

        let fixed = [
            ("source", Value::from(source)),
            ("global", Value::Bool(flags.contains('g'))),
            ("ignoreCase", Value::Bool(flags.contains('i'))),
            ("multiline", Value::Bool(flags.contains('m'))),
        ];
        for (key, value) in fixed {
            self.expect_artifact(
                od,
                key,
                PropertyDescriptor::new(value, Attributes::NONE),
                Do::Recurse,
            );
        }
        self.expect_artifact(
            od,
            "lastIndex",
            PropertyDescriptor::new(Value::Number(0.0), Attributes::HIDDEN),
            Do::Recurse,
        );

        let body = if source.is_empty() { "(?:)" } else { source };
        format!("/{}/{}", body, flags)
    }

    fn construct_error(&mut self, cursor: &Cursor, od: ObjectDumperId) -> String {
        let obj = self.object(od).obj;
        let actual_proto = self.heap.prototype(obj);
        let known = actual_proto
            .and_then(|proto| self.heap.builtin_name(proto))
            .and_then(|name| {
                let ctor = name.strip_suffix(".prototype")?.to_string();
                ERROR_CONSTRUCTORS.contains(&ctor.as_str()).then_some(ctor)
            });
        // An unknown prototype is fixed up later by setPrototypeOf.
        let (constructor, proto) = match known {
            Some(ctor) => (ctor, actual_proto),
            None => ("Error".to_string(), self.heap.builtin("Error.prototype")),
        };
        self.finish_construction(cursor, od, proto);

        let message = self
            .heap
            .own_property(obj, "message")
            .filter(|pd| pd.attributes == Attributes::METHOD)
            .and_then(|pd| match pd.value {
                Value::Str(s) => Some(s),
                _ => None,
            });
        let args = match &message {
            Some(text) => {
                self.expect_artifact(
                    od,
                    "message",
                    PropertyDescriptor::new(Value::from(text.as_str()), Attributes::METHOD),
                    Do::DONE,
                );
                literal::quote(text)
            }
            None => String::new(),
        };

        // The replayed stack never matches, so it is always rewritten or
        // deleted.
        let dumper = self.object_mut(od);
        dumper.attributes.insert("stack".to_string(), Attributes::METHOD);
        if self.heap.own_property(obj, "stack").is_some() {
            self.object_mut(od).raise(&Part::name("stack"), Do::Decl);
        } else {
            self.object_mut(od).deletions.push("stack".to_string());
        }

        format!("new {}({})", constructor, args)
    }

    fn construct_arguments(
        &mut self,
        cursor: &Cursor,
        od: ObjectDumperId,
        scope: ScopeId,
    ) -> Result<Option<String>> {
        let obj = self.object(od).obj;
        if scope != cursor.scope {
            self.warn(
                cursor,
                &format!(
                    "arguments object#{} belongs to scope #{} and cannot be referenced from scope #{}",
                    obj.0, scope.0, cursor.scope.0
                ),
            )?;
            return Ok(None);
        }
        let proto = self.heap.prototype(obj);
        self.finish_construction(cursor, od, proto);
        for key in self.heap.own_keys(obj) {
            if let Some(actual) = self.heap.own_property(obj, &key) {
                let dumper = self.object_mut(od);
                dumper.attributes.insert(key.clone(), actual.attributes);
                dumper.raise(&Part::Name(key), Do::Decl);
            }
        }
        Ok(Some("arguments".to_string()))
    }
}
