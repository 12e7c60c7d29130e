//! Binding actual arguments to formal parameters.
//!
//! [`bind_call`] sets up the frame for a call to a user-defined function:
//!
//! 1. A function frame is pushed, parented on the caller's current scope, with the function's
//!    own name bound in it as a constant.  Every default and actual expression is evaluated
//!    with this frame active.
//! 2. A call with a single empty actual, `f()`, has no actuals at all.  A function that isn't
//!    variadic rejects more actuals than it has parameters.
//! 3. Named actuals are matched with formals by name, and the rest fill the remaining formals
//!    in order.  A formal with no actual, or with an empty one, takes its default, or `Null`.
//! 4. A named actual that matches no formal is an error.
//! 5. Any positional actuals left over go to the variadic parameter.
//! 6. The frame is finalized.
//!
//! On error the frame is popped again before the error is returned.

use crate::binding::{BindingKind, Slot};
use crate::params::{Actual, Arity, Function};
use crate::reserved::LOCAL_PREFIX;
use crate::runtime::{Evaluator, Runtime};
use crate::scope::{ParameterValue, ScopeId};
use crate::types::{ErrorKind, Exception, Mode, ReckonHasher};
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

/// Pushes and populates the frame for a call.  Returns the frame, which the caller pops when
/// the call is done.
pub fn bind_call(
    rt: &mut Runtime,
    eval: &mut dyn Evaluator,
    function: &Rc<Function>,
    actuals: &[Actual],
) -> Result<ScopeId, Exception> {
    // FIRST, push the frame and bind the function's own name in it.
    let caller = rt.scopes().current();
    let frame = rt
        .scopes_mut()
        .push_frame(BindingKind::Function, caller, LOCAL_PREFIX);

    match bind_frame(rt, eval, frame, function, actuals) {
        Ok(()) => {
            debug!(function = function.name(), depth = frame.index(), "bound call");
            Ok(frame)
        }
        Err(e) => {
            rt.scopes_mut().pop_to(frame);
            Err(e)
        }
    }
}

fn bind_frame(
    rt: &mut Runtime,
    eval: &mut dyn Evaluator,
    frame: ScopeId,
    function: &Rc<Function>,
    actuals: &[Actual],
) -> Result<(), Exception> {
    let name = function.name();
    let params = function.params();
    let ignore_case = rt.settings().ignore_case;

    rt.scopes_mut().define(
        frame,
        name,
        Slot::constant(name, Value::Function(Rc::clone(function))),
    )?;

    // NEXT, check the number of actuals.  `f()` has one empty actual, which means none.
    let actuals = match actuals {
        [only] if only.is_empty() => &[][..],
        _ => actuals,
    };

    if let Arity::Exactly(expected) = params.arity() {
        if actuals.len() > expected {
            let function = name.to_string();
            let given = actuals.len();
            return Err(if expected == 1 {
                ErrorKind::TooManyArgsOne { function, given }
            } else {
                ErrorKind::TooManyArgs {
                    function,
                    expected,
                    given,
                }
            }
            .into());
        }
    }

    // NEXT, split the actuals into named and positional.
    let mut named: IndexMap<String, &Actual, ReckonHasher> = IndexMap::default();
    let mut positional: VecDeque<&Actual> = VecDeque::new();

    for actual in actuals {
        match actual.name() {
            Some(n) => {
                if named.insert(n.to_string(), actual).is_some() {
                    return Err(ErrorKind::DuplicateParameter(n.into()).into());
                }
            }
            None => positional.push_back(actual),
        }
    }

    // NEXT, bind each formal to its named actual, else the next positional, else its default.
    for formal in params.iter() {
        let key = named
            .keys()
            .find(|k| k.as_str() == formal.name())
            .or_else(|| {
                if ignore_case {
                    named
                        .keys()
                        .find(|k| k.to_lowercase() == formal.name().to_lowercase())
                } else {
                    None
                }
            })
            .cloned();

        let actual = match key {
            Some(key) => named.shift_remove(&key),
            None => positional.pop_front(),
        };

        let expr = actual.and_then(|a| a.expr()).or(formal.default()).cloned();
        let value = match expr {
            Some(node) => eval.evaluate(rt, node.as_ref(), Mode::Lenient)?,
            None => Value::Null,
        };

        rt.scopes_mut().bind_parameter(
            frame,
            ParameterValue::new(Some(formal.name()), value, formal.is_mutable()),
        )?;
    }

    // NEXT, any named actuals left over don't match a formal.
    if !named.is_empty() {
        let names: Vec<&str> = named.keys().map(String::as_str).collect();
        return Err(ErrorKind::UnknownParameter {
            function: name.into(),
            names: names.join(", "),
        }
        .into());
    }

    // NEXT, extra positionals belong to the variadic parameter.
    if let Some(variadic) = params.variadic() {
        let mut extras = Vec::with_capacity(positional.len());
        for actual in positional.drain(..) {
            let value = match actual.expr() {
                Some(node) => eval.evaluate(rt, node.as_ref(), Mode::Lenient)?,
                None => Value::Null,
            };
            extras.push(value);
        }

        rt.scopes_mut()
            .bind_variadic(frame, variadic.name(), extras, variadic.is_mutable())?;
    } else if !positional.is_empty() {
        return Err(ErrorKind::TooManyArgs {
            function: name.into(),
            expected: params.len(),
            given: actuals.len(),
        }
        .into());
    }

    // FINALLY, bind the parameter array and count.
    rt.scopes_mut().finalize(frame)
}
