//! # Reckon: the binding runtime of an embeddable calculator language
//!
//! Reckon supplies the parts of a calculator or small scripting language that sit between the
//! parser and the arithmetic: variables and their scopes, constants and other read-only
//! bindings, function calls and their parameter frames, and the resolution of references like
//! `a.b[2](x)` for reading and for assignment.
//!
//! The main entry point is the [`Runtime`](runtime/struct.Runtime.html); see its module
//! documentation for an overview.  The front end plugs in its own expression evaluator through
//! the [`Evaluator`](runtime/trait.Evaluator.html) trait.
//!
//! # Features
//!
//! * `constants` (default): compute `pi` and `e` at the working precision on a background
//!   thread, and predefine them.
//! * `wildcard` (default): glob-pattern lookups of variables and object members.

#![doc(html_root_url = "https://docs.rs/reckon/0.3.2")]

pub use crate::container::{Container, Mapping, Sequence, UniqueSet};
pub use crate::lvalue::VarRef;
pub use crate::params::{Actual, FormalParameterList, Function, NativeFn};
pub use crate::runtime::{Evaluator, Node, NodeRef, Runtime};
pub use crate::settings::Settings;
pub use crate::types::*;
pub use crate::value::Value;

mod macros;

pub mod binder;
pub mod binding;
#[cfg(feature = "constants")]
pub mod constants;
pub mod container;
pub mod lvalue;
pub mod number;
pub mod params;
pub mod reserved;
pub mod runtime;
pub mod scope;
pub mod settings;
pub mod types;
pub mod value;
