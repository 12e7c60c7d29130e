//! The Scope Stack
//!
//! Variables live in a stack of scopes.  The bottom scope is the global frame; every block and
//! every function call pushes another.  Each scope names its parent by [`ScopeId`], so the
//! stack doubles as an arena and the chain of parents is the lexical (for blocks) or dynamic
//! (for calls) nesting that name lookup walks.
//!
//! # Lookup and assignment
//!
//! A read walks outward from a scope and returns the first binding of the name.  An assignment
//! rebinds the name in the nearest scope that already defines it, and defines it locally if
//! none does.  Removal tries the local scope first, then the parents, innermost first.
//!
//! # Parameter frames
//!
//! The global scope and every function scope are *frames*: they own a positional parameter
//! list with a reserved-name prefix (`$` for the global frame, `_` for functions).  Parameters
//! are bound one at a time and the frame is then finalized, which binds the whole list as
//! `<prefix>*` and its length as `<prefix>#`.
//!
//! A `with` scope shares the name table of the object it opens, so assignments inside the block
//! land in the object.

use crate::binding::{Binding, BindingKind, Slot};
use crate::container::{Container, Mapping, Sequence};
use crate::reserved::{self, Positional, GLOBAL_PREFIX};
use crate::types::{ErrorKind, Exception, ReckonInt, ReckonResult};
use crate::value::{MapRef, SeqRef, Value};
use core::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

/// A handle on one scope in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    /// The scope's depth in the stack; the global scope is 0.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A value to bind as one positional parameter.
#[derive(Debug, Clone)]
pub struct ParameterValue {
    /// The formal name, if there is one.  Unnamed parameters are reachable only by position.
    pub name: Option<String>,
    pub value: Value,
    pub mutable: bool,
}

impl ParameterValue {
    pub fn new(name: Option<&str>, value: Value, mutable: bool) -> Self {
        Self {
            name: name.map(String::from),
            value,
            mutable,
        }
    }
}

/// The positional parameters of a frame.
#[derive(Debug)]
pub struct Parameters {
    prefix: String,
    values: SeqRef,
    variadic: Option<SeqRef>,
    finalized: bool,
}

impl Parameters {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.into(),
            values: Rc::new(RefCell::new(Sequence::new())),
            variadic: None,
            finalized: false,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// All positional parameter values, in order.
    pub fn values(&self) -> &SeqRef {
        &self.values
    }

    /// The sequence bound to the variadic parameter, if one was bound.
    pub fn variadic(&self) -> Option<&SeqRef> {
        self.variadic.as_ref()
    }

    pub fn count(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The name bound to the parameter array.
    pub fn array_name(&self) -> String {
        format!("{}*", self.prefix)
    }

    /// The name bound to the parameter count.
    pub fn count_name(&self) -> String {
        format!("{}#", self.prefix)
    }
}

/// One scope: a name table, a parent, and possibly a parameter frame.
#[derive(Debug)]
pub struct Scope {
    kind: BindingKind,
    vars: MapRef,
    parent: Option<ScopeId>,
    params: Option<Parameters>,
}

impl Scope {
    fn new(kind: BindingKind, parent: Option<ScopeId>, params: Option<Parameters>) -> Self {
        Self {
            kind,
            vars: Rc::new(RefCell::new(Mapping::with_binding(Binding::new(kind)))),
            parent,
            params,
        }
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    /// The scope's name table.
    pub fn vars(&self) -> &MapRef {
        &self.vars
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn parameters(&self) -> Option<&Parameters> {
        self.params.as_ref()
    }
}

/// The stack of scopes.
#[derive(Debug)]
pub struct ScopeStack {
    stack: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// Creates a stack holding just the global frame.
    pub fn new() -> Self {
        Self {
            stack: vec![Scope::new(
                BindingKind::Global,
                None,
                Some(Parameters::new(GLOBAL_PREFIX)),
            )],
        }
    }

    //--------------------------------------------------------------------------------------------
    // Stack management

    /// The global frame.
    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    /// The innermost scope.
    pub fn current(&self) -> ScopeId {
        ScopeId(self.stack.len() - 1)
    }

    /// The number of scopes on the stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.stack[id.0]
    }

    /// Pushes a block scope.
    pub fn push(&mut self, kind: BindingKind, parent: ScopeId) -> ScopeId {
        self.stack.push(Scope::new(kind, Some(parent), None));
        trace!(depth = self.stack.len(), %kind, "push scope");
        self.current()
    }

    /// Pushes a parameter frame with the given reserved-name prefix.
    pub fn push_frame(&mut self, kind: BindingKind, parent: ScopeId, prefix: &str) -> ScopeId {
        self.stack
            .push(Scope::new(kind, Some(parent), Some(Parameters::new(prefix))));
        trace!(depth = self.stack.len(), %kind, prefix, "push frame");
        self.current()
    }

    /// Pushes a `with` scope whose name table is the given object.
    pub fn push_with(&mut self, vars: MapRef, parent: ScopeId) -> ScopeId {
        self.stack.push(Scope {
            kind: BindingKind::With,
            vars,
            parent: Some(parent),
            params: None,
        });
        trace!(depth = self.stack.len(), "push with");
        self.current()
    }

    /// Pops the innermost scope.
    ///
    /// # Panics
    ///
    /// Panics on an attempt to pop the global frame.
    pub fn pop(&mut self) {
        assert!(self.stack.len() > 1, "cannot pop the global scope");
        self.stack.pop();
        trace!(depth = self.stack.len(), "pop scope");
    }

    /// Pops the given scope and everything above it.
    pub fn pop_to(&mut self, id: ScopeId) {
        assert!(id.0 > 0, "cannot pop the global scope");
        self.stack.truncate(id.0);
        trace!(depth = self.stack.len(), "pop to");
    }

    /// The chain of scopes from `id` outward.
    fn chain(&self, id: ScopeId) -> impl Iterator<Item = (ScopeId, &Scope)> {
        let mut next = Some(id);
        core::iter::from_fn(move || {
            let id = next?;
            let scope = &self.stack[id.0];
            next = scope.parent;
            Some((id, scope))
        })
    }

    //--------------------------------------------------------------------------------------------
    // Names

    /// Is the name bound in this very scope?
    pub fn is_defined_here(&self, id: ScopeId, name: &str, ignore_case: bool) -> bool {
        self.scope(id).vars.borrow().contains(name, ignore_case)
    }

    /// Is the name bound in this scope or any of its parents?
    pub fn is_defined_anywhere(&self, id: ScopeId, name: &str, ignore_case: bool) -> bool {
        self.find(id, name, ignore_case).is_some()
    }

    /// The nearest scope that binds the name.
    pub fn find(&self, id: ScopeId, name: &str, ignore_case: bool) -> Option<ScopeId> {
        self.chain(id)
            .find(|(_, scope)| scope.vars.borrow().contains(name, ignore_case))
            .map(|(id, _)| id)
    }

    /// Reads the value bound to the name, walking outward.
    pub fn lookup(&self, id: ScopeId, name: &str, ignore_case: bool) -> Option<Value> {
        let slot = self.slot(id, name, ignore_case)?;
        Some(slot.value())
    }

    /// The slot bound to the name, walking outward.
    pub fn slot(&self, id: ScopeId, name: &str, ignore_case: bool) -> Option<Slot> {
        self.chain(id)
            .find_map(|(_, scope)| scope.vars.borrow().slot(name, ignore_case).cloned())
    }

    /// Assigns the value to the name in the nearest scope that binds it, or binds it in this
    /// scope if none does.  Returns the value.
    pub fn assign(&mut self, id: ScopeId, name: &str, ignore_case: bool, value: Value) -> ReckonResult {
        let target = self.find(id, name, ignore_case).unwrap_or(id);
        self.scope(target)
            .vars
            .borrow_mut()
            .set(name, ignore_case, value.clone())?;
        Ok(value)
    }

    /// Installs a slot under the name in this scope, shadowing any outer binding.
    pub fn define(&mut self, id: ScopeId, name: &str, slot: Slot) -> Result<(), Exception> {
        self.scope(id).vars.borrow_mut().define(name, slot)
    }

    /// Removes the name from the nearest scope that binds it, trying this scope first.  Parent
    /// scopes are always matched ignoring case.  Returns the removed value, if any.
    pub fn remove(&mut self, id: ScopeId, name: &str, ignore_case: bool) -> Result<Option<Value>, Exception> {
        let mut first = true;
        let mut next = Some(id);

        while let Some(sid) = next {
            let scope = self.scope(sid);
            let ic = ignore_case || !first;
            if scope.vars.borrow().contains(name, ic) {
                return scope.vars.borrow_mut().remove(name, ic);
            }
            first = false;
            next = scope.parent;
        }
        Ok(None)
    }

    /// Every name visible from the scope, innermost binding first.
    pub fn vars_in_scope(&self, id: ScopeId) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (_, scope) in self.chain(id) {
            for key in scope.vars.borrow().keys() {
                if !names.iter().any(|n| n == key) {
                    names.push(key.into());
                }
            }
        }
        names
    }

    /// The names bound in this scope alone.
    pub fn vars_in_local_scope(&self, id: ScopeId) -> Vec<String> {
        self.scope(id).vars.borrow().keys().map(String::from).collect()
    }

    /// Every binding visible from the scope whose name matches a glob pattern, as a new object.
    /// Where the same name is bound at several levels the innermost binding wins.
    #[cfg(feature = "wildcard")]
    pub fn wildcard_lookup(&self, id: ScopeId, pattern: &str, ignore_case: bool) -> Result<Mapping, Exception> {
        let pattern = glob::Pattern::new(pattern)
            .map_err(|e| Exception::message(&format!("bad wildcard pattern: {}", e)))?;

        let mut result = Mapping::new();
        for (_, scope) in self.chain(id) {
            for (name, value) in scope.vars.borrow().wildcard(&pattern, ignore_case) {
                if !result.contains(&name, false) {
                    result.set(&name, false, value)?;
                }
            }
        }
        Ok(result)
    }

    //--------------------------------------------------------------------------------------------
    // Parameter frames

    fn params(&self, id: ScopeId) -> Result<&Parameters, Exception> {
        self.scope(id).params.as_ref().ok_or_else(|| {
            Exception::message(&format!("{} scope has no parameter frame", self.scope(id).kind))
        })
    }

    /// The nearest frame, from `id` outward, whose parameter prefix is `prefix`.
    pub fn nearest_frame(&self, id: ScopeId, prefix: &str) -> Option<ScopeId> {
        self.chain(id)
            .find(|(_, scope)| scope.params.as_ref().is_some_and(|p| p.prefix == prefix))
            .map(|(id, _)| id)
    }

    /// Appends one positional parameter to a frame, binding its name if it has one.
    pub fn bind_parameter(&mut self, id: ScopeId, param: ParameterValue) -> Result<(), Exception> {
        let params = self.params(id)?;
        params.values.borrow_mut().add(param.value.clone())?;

        if let Some(name) = &param.name {
            let slot = Slot::parameter(name, param.value, param.mutable);
            self.define(id, name, slot)?;
        }
        Ok(())
    }

    /// Binds the extra actual values to a frame's variadic parameter: they are collected in a
    /// new sequence, bound to the name if there is one, and appended to the positional list.
    pub fn bind_variadic(
        &mut self,
        id: ScopeId,
        name: Option<&str>,
        extras: Vec<Value>,
        mutable: bool,
    ) -> Result<(), Exception> {
        let rest = Rc::new(RefCell::new(Sequence::from_values(extras.clone())));
        if !mutable {
            rest.borrow_mut().set_immutable();
        }

        let params = self.params(id)?;
        params.values.borrow_mut().add_all(extras)?;

        if let Some(name) = name {
            let slot = Slot::parameter(name, Value::Seq(rest.clone()), mutable);
            self.define(id, name, slot)?;
        }

        if let Some(params) = self.stack[id.0].params.as_mut() {
            params.variadic = Some(rest);
        }
        Ok(())
    }

    /// Finalizes a frame: binds the parameter array and count under the frame's reserved names.
    /// The array is frozen; positional parameters are read-only.
    ///
    /// # Panics
    ///
    /// Panics if the frame was already finalized.
    pub fn finalize(&mut self, id: ScopeId) -> Result<(), Exception> {
        let params = self.params(id)?;
        assert!(!params.finalized, "parameter frame finalized twice");

        let values = params.values.clone();
        let count = params.count();
        let (array_name, count_name) = (params.array_name(), params.count_name());
        values.borrow_mut().set_immutable();

        self.define(id, &array_name, Slot::parameter(&array_name, Value::Seq(values), false))?;
        self.define(id, &count_name, Slot::parameter(&count_name, Value::from(count), false))?;

        if let Some(params) = self.stack[id.0].params.as_mut() {
            params.finalized = true;
        }
        trace!(scope = id.0, count, "finalized frame");
        Ok(())
    }

    /// Discards a frame's parameters so it can be bound again.
    pub fn reset_parameters(&mut self, id: ScopeId) -> Result<(), Exception> {
        let (array_name, count_name, prefix) = {
            let params = self.params(id)?;
            (params.array_name(), params.count_name(), params.prefix.clone())
        };

        {
            let mut vars = self.scope(id).vars.borrow_mut();
            vars.remove(&array_name, false)?;
            vars.remove(&count_name, false)?;
        }

        if let Some(params) = self.stack[id.0].params.as_mut() {
            *params = Parameters::new(&prefix);
        }
        Ok(())
    }

    /// Reads a positional parameter by its reserved name, e.g., `_0` or `$2`, from the nearest
    /// frame with the name's prefix.  Past the end of the list reads as `Null`.
    pub fn positional(&self, id: ScopeId, name: &str) -> ReckonResult {
        let Some((prefix, positional)) = reserved::parse(name) else {
            return Err(ErrorKind::Undefined(name.into()).into());
        };

        let Some(frame) = self.nearest_frame(id, prefix) else {
            return Err(ErrorKind::LocalNotAvailable(name.into()).into());
        };
        let params = self.params(frame)?;

        match positional {
            Positional::Index(i) => match ReckonInt::try_from(i) {
                Ok(i) => params.values.borrow().get(i),
                Err(_) => Ok(Value::Null),
            },
            Positional::Array => Ok(Value::Seq(params.values.clone())),
            Positional::Count => Ok(Value::from(params.count())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reserved::LOCAL_PREFIX;

    fn int(i: i64) -> Value {
        Value::from(i)
    }

    #[test]
    fn test_new() {
        let scopes = ScopeStack::new();
        assert_eq!(scopes.depth(), 1);
        assert_eq!(scopes.current(), scopes.global());
        assert_eq!(scopes.scope(scopes.global()).kind(), BindingKind::Global);
    }

    #[test]
    fn test_shadowing() {
        let mut scopes = ScopeStack::new();
        let g = scopes.global();
        scopes.assign(g, "x", false, int(1)).unwrap();

        let inner = scopes.push(BindingKind::Loop, g);
        scopes.define(inner, "x", Slot::Value(int(2))).unwrap();
        assert_eq!(scopes.lookup(inner, "x", false), Some(int(2)));
        assert_eq!(scopes.lookup(g, "x", false), Some(int(1)));

        scopes.pop();
        assert_eq!(scopes.lookup(g, "x", false), Some(int(1)));
    }

    #[test]
    fn test_assign_goes_to_defining_scope() {
        let mut scopes = ScopeStack::new();
        let g = scopes.global();
        scopes.assign(g, "x", false, int(1)).unwrap();

        let inner = scopes.push(BindingKind::While, g);
        scopes.assign(inner, "x", false, int(5)).unwrap();
        scopes.assign(inner, "y", false, int(6)).unwrap();

        assert!(!scopes.is_defined_here(inner, "x", false));
        assert!(scopes.is_defined_here(inner, "y", false));
        assert_eq!(scopes.lookup(g, "x", false), Some(int(5)));
        assert_eq!(scopes.lookup(g, "y", false), None);
        assert!(scopes.is_defined_anywhere(inner, "x", false));
    }

    #[test]
    fn test_remove_local_first() {
        let mut scopes = ScopeStack::new();
        let g = scopes.global();
        scopes.assign(g, "Name", false, int(1)).unwrap();
        let inner = scopes.push(BindingKind::If, g);
        scopes.define(inner, "name", Slot::Value(int(2))).unwrap();

        assert_eq!(scopes.remove(inner, "name", false), Ok(Some(int(2))));
        // Parents match ignoring case.
        assert_eq!(scopes.remove(inner, "name", false), Ok(Some(int(1))));
        assert_eq!(scopes.remove(inner, "name", false), Ok(None));
    }

    #[test]
    fn test_constant_is_not_reassigned() {
        let mut scopes = ScopeStack::new();
        let g = scopes.global();
        scopes.define(g, "k", Slot::constant("k", int(1))).unwrap();

        let inner = scopes.push(BindingKind::Loop, g);
        assert!(scopes.assign(inner, "k", false, int(2)).is_err());
        assert_eq!(scopes.lookup(inner, "k", false), Some(int(1)));
    }

    #[test]
    fn test_with_scope_shares_object() {
        let mut scopes = ScopeStack::new();
        let g = scopes.global();
        let obj = Rc::new(RefCell::new(Mapping::new()));
        obj.borrow_mut().set("a", false, int(1)).unwrap();

        let with = scopes.push_with(obj.clone(), g);
        scopes.assign(with, "a", false, int(10)).unwrap();
        assert_eq!(obj.borrow().get("a", false), Some(int(10)));
    }

    #[test]
    fn test_parameter_frame() {
        let mut scopes = ScopeStack::new();
        let g = scopes.global();
        let f = scopes.push_frame(BindingKind::Function, g, LOCAL_PREFIX);

        scopes
            .bind_parameter(f, ParameterValue::new(Some("a"), int(1), false))
            .unwrap();
        scopes
            .bind_variadic(f, Some("rest"), vec![int(2), int(3)], false)
            .unwrap();
        scopes.finalize(f).unwrap();

        assert_eq!(scopes.lookup(f, "_#", false), Some(int(3)));
        assert_eq!(scopes.positional(f, "_0"), Ok(int(1)));
        assert_eq!(scopes.positional(f, "_2"), Ok(int(3)));
        assert_eq!(scopes.positional(f, "_5"), Ok(Value::Null));
        assert_eq!(
            scopes.lookup(f, "rest", false),
            Some(Value::from(vec![int(2), int(3)]))
        );
        assert_eq!(scopes.positional(f, "$#"), Ok(int(0)));

        // The parameter is immutable.
        assert!(scopes.assign(f, "a", false, int(9)).is_err());
    }

    #[test]
    fn test_local_not_available_globally() {
        let scopes = ScopeStack::new();
        let err = scopes.positional(scopes.global(), "_1").unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::LocalNotAvailable("_1".into())));
    }

    #[test]
    fn test_reset_parameters() {
        let mut scopes = ScopeStack::new();
        let g = scopes.global();
        scopes
            .bind_parameter(g, ParameterValue::new(None, int(7), false))
            .unwrap();
        scopes.finalize(g).unwrap();
        assert_eq!(scopes.positional(g, "$0"), Ok(int(7)));

        scopes.reset_parameters(g).unwrap();
        scopes.finalize(g).unwrap();
        assert_eq!(scopes.lookup(g, "$#", false), Some(int(0)));
    }

    #[test]
    fn test_pop_to() {
        let mut scopes = ScopeStack::new();
        let g = scopes.global();
        let f = scopes.push_frame(BindingKind::Function, g, LOCAL_PREFIX);
        let b = scopes.push(BindingKind::Loop, f);
        scopes.push(BindingKind::If, b);

        scopes.pop_to(f);
        assert_eq!(scopes.current(), g);
    }

    #[cfg(feature = "wildcard")]
    #[test]
    fn test_wildcard_innermost_wins() {
        let mut scopes = ScopeStack::new();
        let g = scopes.global();
        scopes.assign(g, "ab", false, int(1)).unwrap();
        scopes.assign(g, "ac", false, int(2)).unwrap();
        scopes.assign(g, "b", false, int(3)).unwrap();
        let inner = scopes.push(BindingKind::Loop, g);
        scopes.define(inner, "ab", Slot::Value(int(10))).unwrap();

        let hits = scopes.wildcard_lookup(inner, "a*", false).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits.get("ab", false), Some(int(10)));
        assert_eq!(hits.get("ac", false), Some(int(2)));
    }
}
