//! The Reckon Runtime
//!
//! The [`Runtime`] struct is the primary API for embedding Reckon's binding machinery in a
//! calculator or scripting front end.  The front end owns the parser and the expression
//! evaluator; the runtime owns everything those need to agree on:
//!
//! * The stack of variable scopes, from the global frame down to the innermost block
//! * The predefined names: `true`, `false`, `null`, `pi`, `e`, and the `settings` object
//! * Function calls: binding actuals to formals in a fresh frame, and translating the non-local
//!   exits that escape a function body
//! * Variable references: reading and assigning through chains of members, indices and calls
//! * The background [`ConstantProvider`] that computes `pi` and `e` at the working precision
//!
//! # Runtime is not Sync!
//!
//! The [`Runtime`] (and the rest of Reckon) is intended for use in a single thread.  Values
//! share their containers through `Rc`, so [`Value`] is not `Send`.  The only other thread is
//! the constant provider's worker, which shares nothing but plain numbers with the runtime.
//!
//! # Creating a Runtime
//!
//! There are two ways to create a runtime.  The usual way is to call
//! [`Runtime::new`](struct.Runtime.html#method.new), which creates a runtime and populates
//! the global scope with the predefined names.  Alternatively,
//! [`Runtime::empty`](struct.Runtime.html#method.empty) creates a runtime whose global scope
//! holds only the positional parameter names.
//!
//! ```
//! use reckon::Runtime;
//! let mut rt = Runtime::new();
//!
//! // define variables, call functions, etc.
//! ```
//!
//! # Plugging in an Evaluator
//!
//! Reckon doesn't evaluate expressions itself.  The front end implements the [`Evaluator`]
//! trait over its own syntax tree, whose nodes implement [`Node`], and passes the evaluator to
//! the runtime methods that need to evaluate something: index expressions, default parameter
//! values, actual arguments, and function bodies.
//!
//! The evaluator reports non-local exits (`leave`, `next`) as [`Exception`] values.  Loops and
//! blocks handle the ones aimed at them; a `leave` that reaches a function boundary becomes
//! the function's result, and anything else that escapes a function becomes an error.
//!
//! # Accessing Variables
//!
//! Front-end code will usually use [`Runtime::resolve`](struct.Runtime.html#method.resolve)
//! and [`Runtime::assign`](struct.Runtime.html#method.assign), which take a parsed
//! [`VarRef`].  For simple names, [`Runtime::var`](struct.Runtime.html#method.var) and
//! [`Runtime::set_var`](struct.Runtime.html#method.set_var) are more convenient:
//!
//! ```
//! use reckon::*;
//!
//! # fn dummy() -> ReckonResult {
//! let mut rt = Runtime::new();
//! rt.set_var("a", Value::from(1))?;
//! assert_eq!(rt.var("a")?, Value::from(1));
//! assert!(rt.var("b").is_err());
//! # reckon_ok!()
//! # }
//! ```
//!
//! [`Exception`]: ../types/enum.Exception.html
//! [`Value`]: ../value/enum.Value.html
//! [`VarRef`]: ../lvalue/enum.VarRef.html
//! [`ConstantProvider`]: ../constants/struct.ConstantProvider.html

use crate::binder;
use crate::binding::{BindingKind, Slot};
#[cfg(feature = "constants")]
use crate::constants::ConstantProvider;
use crate::container::Mapping;
use crate::lvalue::{self, VarRef};
use crate::params::{Actual, Function, NativeFn, NativeFunc};
use crate::reckon_err;
use crate::reserved;
use crate::scope::{ParameterValue, ScopeId, ScopeStack};
use crate::settings::{Settings, MAX_PRECISION};
use crate::types::*;
use crate::value::Value;
use cfg_if::cfg_if;
use core::cell::Cell;
use core::fmt;
use std::any::Any;
use std::rc::Rc;
#[cfg(feature = "constants")]
use std::sync::Arc;
use tracing::debug;

/// A node of the front end's syntax tree, as far as the runtime needs to know it.
pub trait Node: fmt::Debug {
    /// Where the node starts in the source.
    fn position(&self) -> Position {
        Position::default()
    }

    /// The node's source text, for signatures and messages.
    fn text(&self) -> String;

    /// The node as `Any`, so the evaluator can recover its own node type.
    fn as_any(&self) -> &dyn Any;
}

/// A shared syntax-tree node.
pub type NodeRef = Rc<dyn Node>;

/// The front end's expression evaluator.
pub trait Evaluator {
    /// Evaluates a node in the runtime's current scope.
    fn evaluate(&mut self, rt: &mut Runtime, node: &dyn Node, mode: Mode) -> ReckonResult;

    /// Evaluates a function's body.  The call's frame is already the current scope.
    fn invoke(&mut self, rt: &mut Runtime, function: &Function) -> ReckonResult {
        self.evaluate(rt, function.body().as_ref(), Mode::Lenient)
    }
}

/// The Reckon Runtime.
///
/// The `Runtime` struct is the primary API for embedding Reckon.  See the
/// [module level documentation](index.html) for an overview.
///
/// # Example
///
/// ```
/// use reckon::*;
///
/// # fn dummy() -> ReckonResult {
/// let mut rt = Runtime::new();
/// rt.define_constant("answer", Value::from(42))?;
/// assert_eq!(rt.var("answer")?, Value::from(42));
/// assert!(rt.set_var("answer", Value::from(0)).is_err());
/// # reckon_ok!()
/// # }
/// ```
pub struct Runtime {
    // Variable Scopes
    scopes: ScopeStack,

    // Preferences, shared with the slots of the `settings` object.
    settings: Rc<Cell<Settings>>,

    // Background computation of pi and e.
    #[cfg(feature = "constants")]
    constants: Arc<ConstantProvider>,

    // Defines the recursion limit for function calls.
    recursion_limit: usize,

    // Current number of nested calls.
    num_levels: usize,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("depth", &self.scopes.depth())
            .field("settings", &self.settings.get())
            .field("num_levels", &self.num_levels)
            .finish()
    }
}

// NOTE: The order of methods in the generated RustDoc depends on the order in this block.
// Consequently, methods are ordered pedagogically.
impl Runtime {
    //--------------------------------------------------------------------------------------------
    // Constructors

    /// Creates a runtime with nothing predefined but the global frame's positional parameter
    /// names, `$*` and `$#`.
    ///
    /// # Example
    ///
    /// ```
    /// # use reckon::*;
    /// let rt = Runtime::empty();
    /// assert_eq!(rt.vars_in_scope(), vec!["$*".to_string(), "$#".to_string()]);
    /// ```
    pub fn empty() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Creates an empty runtime with the given settings.
    pub fn with_settings(settings: Settings) -> Self {
        let mut rt = Self {
            scopes: ScopeStack::new(),
            settings: Rc::new(Cell::new(settings)),
            #[cfg(feature = "constants")]
            constants: Arc::new(ConstantProvider::new(settings.precision)),
            recursion_limit: 1000,
            num_levels: 0,
        };

        let global = rt.scopes.global();
        if let Err(e) = rt.scopes.finalize(global) {
            debug!(%e, "cannot finalize the global frame");
        }
        rt
    }

    /// Creates a runtime with the standard predefined names in its global scope: `true`,
    /// `false`, `null` and `nil`, the constants `pi` (also `π`) and `e`, and the `settings`
    /// object, whose members read and write the runtime's [`Settings`].
    ///
    /// ```
    /// # use reckon::*;
    /// # fn dummy() -> ReckonResult {
    /// let mut rt = Runtime::new();
    /// assert_eq!(rt.var("true")?, Value::Bool(true));
    /// assert_eq!(rt.var("pi")?.to_string(), "3.141592653589793238462643383279503");
    /// # reckon_ok!()
    /// # }
    /// ```
    ///
    /// [`Settings`]: ../settings/struct.Settings.html
    pub fn new() -> Self {
        let mut rt = Runtime::empty();
        rt.predefine();
        rt
    }

    fn predefine(&mut self) {
        let global = self.scopes.global();
        let mut slots: Vec<(&str, Slot)> = vec![
            ("true", Slot::predefined("true", Value::Bool(true))),
            ("false", Slot::predefined("false", Value::Bool(false))),
            ("null", Slot::predefined("null", Value::Null)),
            ("nil", Slot::predefined("nil", Value::Null)),
        ];

        cfg_if! {
            if #[cfg(feature = "constants")] {
                const PI: &str = "the ratio of circumference to diameter";
                let pi = self.constant_supplier(ConstantProvider::pi);
                let e = self.constant_supplier(ConstantProvider::e);
                slots.push(("pi", Slot::supplier("pi", PI, pi.clone())));
                slots.push(("π", Slot::supplier("π", PI, pi)));
                slots.push(("e", Slot::supplier("e", "the base of the natural logarithm", e)));
            } else {
                debug!("constants feature disabled; pi and e are not predefined");
            }
        }

        slots.push(("settings", Slot::predefined("settings", self.settings_object())));

        for (name, slot) in slots {
            if let Err(e) = self.scopes.define(global, name, slot) {
                debug!(name, %e, "cannot predefine");
            }
        }
    }

    /// A supplier that reads one of the provider's constants at the current settings.
    #[cfg(feature = "constants")]
    fn constant_supplier(
        &self,
        read: fn(&ConstantProvider, u32, bool) -> ReckonResult,
    ) -> crate::binding::Supplier {
        let provider = Arc::clone(&self.constants);
        let settings = Rc::clone(&self.settings);
        Rc::new(move || {
            let s = settings.get();
            read(&provider, s.precision, s.rational).unwrap_or_else(|e| {
                tracing::warn!(%e, "constant unavailable");
                Value::Null
            })
        })
    }

    /// The `settings` object: one host-setting slot per preference.
    fn settings_object(&self) -> Value {
        let mut map = Mapping::new();

        let get = Rc::clone(&self.settings);
        let set = Rc::clone(&self.settings);
        #[cfg(feature = "constants")]
        let provider = Arc::clone(&self.constants);
        let precision = Slot::system(
            "precision",
            Rc::new(move || Value::from(get.get().precision as ReckonInt)),
            Rc::new(move |value: Value| {
                let digits = match value.as_index() {
                    Some(n) if (1..=MAX_PRECISION as ReckonInt).contains(&n) => n as u32,
                    _ => {
                        return reckon_err!(
                            "precision must be an integer from 1 to {}, not {}",
                            MAX_PRECISION,
                            value
                        )
                    }
                };
                set.set(set.get().with_precision(digits));
                #[cfg(feature = "constants")]
                provider.request(digits);
                Ok(())
            }),
        );

        let flags: [(&str, fn(&Settings) -> bool, fn(Settings, bool) -> Settings); 3] = [
            ("ignorecase", |s| s.ignore_case, Settings::with_ignore_case),
            ("sortkeys", |s| s.sort_keys, Settings::with_sort_keys),
            ("rational", |s| s.rational, Settings::with_rational),
        ];

        let mut entries = vec![("precision", precision)];
        for (name, read, write) in flags {
            let get = Rc::clone(&self.settings);
            let set = Rc::clone(&self.settings);
            entries.push((
                name,
                Slot::system(
                    name,
                    Rc::new(move || Value::Bool(read(&get.get()))),
                    Rc::new(move |value: Value| match value {
                        Value::Bool(flag) => {
                            set.set(write(set.get(), flag));
                            Ok(())
                        }
                        other => reckon_err!("setting must be true or false, not {}", other),
                    }),
                ),
            ));
        }

        for (name, slot) in entries {
            if let Err(e) = map.define(name, slot) {
                debug!(name, %e, "cannot define setting");
            }
        }
        Value::map(map)
    }

    //--------------------------------------------------------------------------------------------
    // Settings

    /// The current settings.
    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    /// Replaces the settings.  A precision change requests the constants at the new precision.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings.set(settings);
        #[cfg(feature = "constants")]
        self.constants.request(settings.precision);
    }

    /// The background provider of `pi` and `e`.
    #[cfg(feature = "constants")]
    pub fn constants(&self) -> &ConstantProvider {
        &self.constants
    }

    /// Gets the runtime's recursion limit: how deep the stack of function calls may be.
    ///
    /// # Example
    /// ```
    /// # use reckon::*;
    /// let rt = Runtime::empty();
    /// assert_eq!(rt.recursion_limit(), 1000);
    /// ```
    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// Sets the runtime's recursion limit.  The default is 1000.
    pub fn set_recursion_limit(&mut self, limit: usize) {
        self.recursion_limit = limit;
    }

    //--------------------------------------------------------------------------------------------
    // Scopes

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    pub fn scopes_mut(&mut self) -> &mut ScopeStack {
        &mut self.scopes
    }

    /// Pushes a block scope of the given kind, nested in the current scope.
    ///
    /// **Note:** a construct that pushes a scope must also call `Runtime::pop_scope` before it
    /// exits!
    pub fn push_scope(&mut self, kind: BindingKind) -> ScopeId {
        let parent = self.scopes.current();
        self.scopes.push(kind, parent)
    }

    /// Pushes a `with` scope over an object, so that its members read and assign as variables.
    /// An unset value is an error: there is nothing to open.
    pub fn push_with(&mut self, object: &Value) -> Result<ScopeId, Exception> {
        match object {
            Value::Map(map) => {
                let parent = self.scopes.current();
                Ok(self.scopes.push_with(Rc::clone(map), parent))
            }
            other => Err(ErrorKind::NotAnObject(other.to_string()).into()),
        }
    }

    /// Pops the innermost scope.  Calls to `push_scope`/`push_with` and `pop_scope` must exist
    /// in pairs.
    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// The current scope depth; the global scope is level `0`.
    pub fn scope_level(&self) -> usize {
        self.scopes.current().index()
    }

    /// Binds the global frame's positional parameters, `$0`, `$1`, ..., `$*` and `$#`,
    /// replacing any earlier ones.
    ///
    /// ```
    /// # use reckon::*;
    /// # fn dummy() -> ReckonResult {
    /// let mut rt = Runtime::empty();
    /// rt.set_arguments(&[Value::from("input.txt"), Value::from(3)])?;
    /// assert_eq!(rt.var("$1")?, Value::from(3));
    /// assert_eq!(rt.var("$#")?, Value::from(2));
    /// # reckon_ok!()
    /// # }
    /// ```
    pub fn set_arguments(&mut self, args: &[Value]) -> Result<(), Exception> {
        let global = self.scopes.global();
        self.scopes.reset_parameters(global)?;
        for arg in args {
            self.scopes
                .bind_parameter(global, ParameterValue::new(None, arg.clone(), false))?;
        }
        self.scopes.finalize(global)
    }

    //--------------------------------------------------------------------------------------------
    // Variable Handling

    /// Retrieves the value of the named variable, as seen from the current scope.  Reserved
    /// positional names such as `_0` and `$#` read from the nearest matching frame.
    ///
    /// Returns an error if the variable isn't defined.
    pub fn var(&self, name: &str) -> ReckonResult {
        let scope = self.scopes.current();
        if reserved::is_reserved(name) {
            return self.scopes.positional(scope, name);
        }

        match self.scopes.lookup(scope, name, self.settings().ignore_case) {
            Some(value) => Ok(value),
            None => reckon_err!(ErrorKind::Undefined(name.into())),
        }
    }

    /// Returns true if the named variable is visible from the current scope.
    pub fn var_exists(&self, name: &str) -> bool {
        let scope = self.scopes.current();
        self.scopes
            .is_defined_anywhere(scope, name, self.settings().ignore_case)
    }

    /// Sets the value of the named variable: the nearest binding of the name is updated, or a
    /// new one is made in the current scope.  Returns the value.
    pub fn set_var(&mut self, name: &str, value: Value) -> ReckonResult {
        if reserved::is_reserved(name) {
            return reckon_err!(ErrorKind::ReservedName(name.into()));
        }
        let scope = self.scopes.current();
        let ignore_case = self.settings().ignore_case;
        self.scopes.assign(scope, name, ignore_case, value)
    }

    /// Defines a variable in the current scope, shadowing any outer binding.
    pub fn define_var(&mut self, name: &str, value: Value) -> Result<(), Exception> {
        self.define(name, Slot::Value(value))
    }

    /// Defines a constant in the current scope.  Containers in the value are frozen.
    pub fn define_constant(&mut self, name: &str, value: Value) -> Result<(), Exception> {
        self.define(name, Slot::constant(name, value))
    }

    /// Defines one member of an enumeration in the current scope.
    pub fn define_enum(&mut self, name: &str, value: Value) -> Result<(), Exception> {
        self.define(name, Slot::enum_value(name, value))
    }

    fn define(&mut self, name: &str, slot: Slot) -> Result<(), Exception> {
        if reserved::is_reserved(name) {
            return Err(ErrorKind::ReservedName(name.into()).into());
        }
        let scope = self.scopes.current();
        self.scopes.define(scope, name, slot)
    }

    /// Removes the named variable from the nearest scope that defines it.  Returns its value,
    /// if there was one.
    pub fn unset(&mut self, name: &str) -> Result<Option<Value>, Exception> {
        let scope = self.scopes.current();
        let ignore_case = self.settings().ignore_case;
        self.scopes.remove(scope, name, ignore_case)
    }

    /// The names of all variables visible from the current scope.
    pub fn vars_in_scope(&self) -> Vec<String> {
        self.scopes.vars_in_scope(self.scopes.current())
    }

    /// The names of the variables defined in the current scope itself.
    pub fn vars_in_local_scope(&self) -> Vec<String> {
        self.scopes.vars_in_local_scope(self.scopes.current())
    }

    /// The variables visible from the current scope whose names match a glob pattern, as an
    /// object.
    #[cfg(feature = "wildcard")]
    pub fn wildcard(&self, pattern: &str) -> ReckonResult {
        let scope = self.scopes.current();
        let found = self
            .scopes
            .wildcard_lookup(scope, pattern, self.settings().ignore_case)?;
        Ok(Value::map(found))
    }

    /// Wraps an object for use as a value, sorting its keys if the `sort_keys` setting is on.
    pub fn new_object(&self, mut map: Mapping) -> Value {
        if self.settings().sort_keys {
            map.sort_keys();
        }
        Value::map(map)
    }

    //--------------------------------------------------------------------------------------------
    // References

    /// Reads the value a reference denotes.  In strict mode an undefined name or member is an
    /// error; otherwise it reads as `Null`.
    pub fn resolve(&mut self, eval: &mut dyn Evaluator, var: &VarRef, mode: Mode) -> ReckonResult {
        lvalue::resolve(self, eval, var, mode)
    }

    /// Assigns a value to the place a reference denotes.  Unset values along the way are
    /// promoted to objects or arrays as needed.  Returns the value.
    pub fn assign(&mut self, eval: &mut dyn Evaluator, var: &VarRef, value: Value) -> ReckonResult {
        lvalue::assign(self, eval, var, value)
    }

    //--------------------------------------------------------------------------------------------
    // Functions

    /// Defines a user function in the current scope and returns it.
    pub fn define_function(&mut self, function: Function) -> Result<Rc<Function>, Exception> {
        let function = Rc::new(function);
        self.define_var(function.name(), Value::Function(Rc::clone(&function)))?;
        Ok(function)
    }

    /// Defines a builtin function in the global scope.
    pub fn define_native(&mut self, name: &str, func: NativeFunc) -> Result<(), Exception> {
        let global = self.scopes.global();
        let native = Value::Native(Rc::new(NativeFn::new(name, func)));
        self.scopes.define(global, name, Slot::predefined(name, native))
    }

    /// Calls a user function: binds the actuals in a new frame, evaluates the body there, and
    /// pops the frame.
    ///
    /// A `leave` that escapes the body supplies the call's value.  A labelled `leave` or a
    /// `next` that escapes the body is an error, as is nesting calls deeper than the
    /// recursion limit.
    pub fn call_function(
        &mut self,
        eval: &mut dyn Evaluator,
        function: &Rc<Function>,
        actuals: &[Actual],
    ) -> ReckonResult {
        if self.num_levels >= self.recursion_limit {
            return reckon_err!(ErrorKind::RecursionLimit);
        }

        self.num_levels += 1;
        let result = self.call_in_frame(eval, function, actuals);
        self.num_levels -= 1;

        match result {
            Err(Exception::Leave { value, label: None }) => Ok(value.unwrap_or_default()),
            Err(Exception::Leave {
                label: Some(label), ..
            }) => reckon_err!("invoked \"leave {}\" outside of a matching block", label),
            Err(Exception::Next { .. }) => reckon_err!("invoked \"next\" outside of a loop"),
            other => other,
        }
    }

    fn call_in_frame(
        &mut self,
        eval: &mut dyn Evaluator,
        function: &Rc<Function>,
        actuals: &[Actual],
    ) -> ReckonResult {
        // FIRST, push the frame and bind the parameters.
        let frame = binder::bind_call(self, eval, function, actuals)?;

        // NEXT, evaluate the body.
        let result = eval.invoke(self, function);

        // NEXT, pop the frame (and anything the body left behind); we're done with it.
        self.scopes.pop_to(frame);
        result
    }

    /// Calls a builtin with the evaluated actuals.  Builtins take positional arguments only;
    /// an empty actual is `Null`.
    pub fn call_native(
        &mut self,
        eval: &mut dyn Evaluator,
        func: &Rc<NativeFn>,
        actuals: &[Actual],
    ) -> ReckonResult {
        let actuals = match actuals {
            [only] if only.is_empty() => &[][..],
            _ => actuals,
        };

        let mut args = Vec::with_capacity(actuals.len());
        for actual in actuals {
            if let Some(name) = actual.name() {
                return reckon_err!(ErrorKind::UnknownParameter {
                    function: func.name().into(),
                    names: name.into(),
                });
            }
            args.push(match actual.expr() {
                Some(node) => eval.evaluate(self, node.as_ref(), Mode::Lenient)?,
                None => Value::Null,
            });
        }
        func.call(self, &args)
    }
}
