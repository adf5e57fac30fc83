//! Scope dumpers: variable completion for one lexical scope.

use std::collections::BTreeSet;

use crate::dumper::{Cursor, Dumper, Edge, CLOSURE_COST};
use crate::error::{DumpError, Result};
use crate::heap::{ScopeId, ScopeKind, Value};
use crate::selector::Part;
use crate::sub_dumper::{
    BindingTable, Components, Do, ObjectDumperId, ScopeDumperId, SubDumper, SubDumperId,
};

#[derive(Debug, Clone)]
pub struct ScopeDumper {
    pub(crate) scope: ScopeId,
    pub(crate) bindings: BindingTable,
    pub(crate) parent: Option<ScopeDumperId>,
    pub(crate) inner_scopes: BTreeSet<ScopeDumperId>,
    pub(crate) inner_functions: BTreeSet<ObjectDumperId>,
    /// The reified `arguments` of the call this scope belongs to.
    pub(crate) arguments: Option<ObjectDumperId>,
}

impl ScopeDumper {
    pub(crate) fn new(scope: ScopeId, parent: Option<ScopeDumperId>) -> Self {
        ScopeDumper {
            scope,
            bindings: BindingTable::new(),
            parent,
            inner_scopes: BTreeSet::new(),
            inner_functions: BTreeSet::new(),
            arguments: None,
        }
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn inner_scopes(&self) -> &BTreeSet<ScopeDumperId> {
        &self.inner_scopes
    }

    pub fn inner_functions(&self) -> &BTreeSet<ObjectDumperId> {
        &self.inner_functions
    }
}

impl SubDumper for ScopeDumper {
    fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut BindingTable {
        &mut self.bindings
    }

    fn describe(&self, part: &Part) -> String {
        if self.parent.is_none() {
            part.to_string()
        } else {
            format!("{} (scope #{})", part, self.scope.0)
        }
    }
}

impl<'h> Dumper<'h> {
    /// Interns the dumper for `scope`, and for every scope enclosing it.
    pub(crate) fn scope_dumper(&mut self, scope: ScopeId) -> ScopeDumperId {
        if let Some(&sd) = self.scope_index.get(&scope) {
            return sd;
        }
        let parent = self.heap.scope_parent(scope).map(|p| self.scope_dumper(p));
        let sd = ScopeDumperId(self.scopes.len() as u32);
        self.scopes.push(ScopeDumper::new(scope, parent));
        self.scope_index.insert(scope, sd);
        sd
    }

    /// True if `name` in `sd` can be named from the cursor: the scope is
    /// the cursor scope or encloses it, and no scope in between declares
    /// the same name.
    pub(crate) fn scope_reachable(&self, cursor: &Cursor, sd: ScopeDumperId, name: &str) -> bool {
        let target = self.scope(sd).scope;
        let mut current = Some(cursor.scope);
        while let Some(scope) = current {
            if scope == target {
                return true;
            }
            if self.heap.scope_value(scope, name).is_some() {
                return false;
            }
            current = self.heap.scope_parent(scope);
        }
        false
    }

    pub(crate) fn dump_scope_binding(
        &mut self,
        cursor: &Cursor,
        sd: ScopeDumperId,
        name: &str,
        todo: Do,
    ) -> Result<Do> {
        let part = Part::name(name);
        let current = self.scope(sd).get_done(&part);
        if current >= todo || self.scope(sd).is_skipped(&part) {
            return Ok(current);
        }
        let scope = self.scope(sd).scope;
        let value = self
            .heap
            .scope_value(scope, name)
            .ok_or_else(|| DumpError::NoSuchBinding {
                selector: self.scope(sd).describe(&part),
            })?;
        let via = Components::scope(sd, name);
        let mut unexpressible = false;

        if current < Do::Decl {
            if scope != cursor.scope {
                self.warn(cursor, &format!("cannot declare {} from another scope", name))?;
                return Ok(current);
            }
            let expr = match value {
                Value::Undefined => None,
                _ if todo >= Do::Set => {
                    let expr = self.expr_for(cursor, &value)?;
                    unexpressible = expr.is_none();
                    expr
                }
                _ => None,
            };
            match expr {
                Some(expr) => {
                    self.write(cursor, &format!("var {} = {};", name, expr))?;
                    self.note_reference(&value, &via);
                    self.scope_mut(sd).set_done(&part, Do::DONE)?;
                }
                None => {
                    self.write(cursor, &format!("var {};", name))?;
                    let level = if value == Value::Undefined {
                        Do::DONE
                    } else {
                        Do::Decl
                    };
                    self.scope_mut(sd).set_done(&part, level)?;
                }
            }
        }

        // Already warned about; trying again would only repeat the warning.
        if unexpressible {
            return Ok(self.scope(sd).get_done(&part));
        }

        if todo >= Do::Set && self.scope(sd).get_done(&part) < Do::Set {
            if !self.reachable(cursor, &via) {
                self.warn(cursor, &format!("variable {} is not reachable here", name))?;
                return Ok(self.scope(sd).get_done(&part));
            }
            if let Some(expr) = self.expr_for(cursor, &value)? {
                self.write(cursor, &format!("{} = {};", name, expr))?;
                self.note_reference(&value, &via);
                self.scope_mut(sd).set_done(&part, Do::DONE)?;
            }
        }

        Ok(self.scope(sd).get_done(&part))
    }

    /// Dumps every variable of `sd` that is not yet complete, descending
    /// into object values.
    pub(crate) fn dump_scope(&mut self, cursor: &Cursor, sd: ScopeDumperId) -> Result<()> {
        let scope = self.scope(sd).scope;
        for name in self.heap.scope_names(scope) {
            let part = Part::name(name.as_str());
            if self.options.skip_bindings.contains(&part) {
                continue;
            }
            if self.scope(sd).get_done(&part) >= Do::Recurse {
                continue;
            }
            self.descend(cursor, &Components::scope(sd, &name), Do::Recurse)?;
        }
        Ok(())
    }

    /// Records that `od` is the arguments object of the call scope `sd`.
    pub(crate) fn associate_arguments(
        &mut self,
        od: ObjectDumperId,
        sd: ScopeDumperId,
    ) -> Result<()> {
        let rebound = |dumper: &Self, existing: ScopeDumperId| DumpError::ArgumentsRebound {
            arguments: dumper.object(od).obj.0,
            existing: dumper.scope(existing).scope.0,
            scope: dumper.scope(sd).scope.0,
        };
        if let Some(&existing) = self.arguments.get(&od) {
            if existing != sd {
                return Err(rebound(self, existing));
            }
            return Ok(());
        }
        if let Some(other) = self.scope(sd).arguments {
            if other != od {
                return Err(rebound(self, sd));
            }
        }
        self.arguments.insert(od, sd);
        self.scope_mut(sd).arguments = Some(od);
        Ok(())
    }

    pub(crate) fn survey_scope(&mut self, sd: ScopeDumperId) -> Result<Vec<Edge>> {
        let scope = self.scope(sd).scope;
        let mut edges = Vec::new();

        if let Some(parent) = self.scope(sd).parent {
            self.scope_mut(parent).inner_scopes.insert(sd);
            edges.push(Edge {
                to: SubDumperId::Scope(parent),
                via: None,
                cost: CLOSURE_COST,
            });
        }

        for name in self.heap.scope_names(scope) {
            if let Some(Value::Object(obj)) = self.heap.scope_value(scope, &name) {
                let od = self.object_dumper(obj);
                edges.push(Edge {
                    to: SubDumperId::Object(od),
                    cost: Part::name(name.as_str()).badness(),
                    via: Some(Components::scope(sd, &name)),
                });
            }
        }

        if let ScopeKind::Call {
            arguments: Some(args),
        } = self.heap.scope_kind(scope)
        {
            let od = self.object_dumper(args);
            self.associate_arguments(od, sd)?;
            edges.push(Edge {
                to: SubDumperId::Object(od),
                via: None,
                cost: CLOSURE_COST,
            });
        }

        Ok(edges)
    }
}
