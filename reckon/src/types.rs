//! Public Type Declarations
//!
//! This module defines a number of types used throughout Reckon's public API.
//!
//! # Reckon Results
//!
//! The standard Reckon `Result<T,E>` type is [`ReckonResult`], which is an alias for
//! `Result<Value,Exception>`.  Every resolver, binder and container operation that produces a
//! [`Value`] returns one; operations that produce nothing return `Result<(),Exception>`.
//!
//! [`Exception`] is a closed enum of every non-normal outcome: real errors, which carry an
//! [`ErrorKind`] and optional source [`Position`], and the evaluator's non-local exits
//! (`leave`, `next`, failed assertions), which propagate by return value through the recursive
//! evaluator until some construct handles them.
//!
//! The macros `reckon_ok!` and `reckon_err!` are shorthands for the two arms.
//!
//! [`Value`]: ../value/enum.Value.html

use crate::value::Value;
use core::fmt;
use core::hash::BuildHasherDefault;
use fnv::FnvHasher;
use thiserror::Error;

/// The standard integer type for Reckon code.
pub type ReckonInt = i64;

/// The standard floating point type for Reckon code.
pub type ReckonFloat = f64;

/// A list of Reckon values.
pub type ReckonList = Vec<Value>;

/// The hasher used by every map and set in the runtime.
pub type ReckonHasher = BuildHasherDefault<FnvHasher>;

/// The standard `Result<T,E>` type for Reckon code.
pub type ReckonResult = Result<Value, Exception>;

/// A location in the source text, as reported by the external parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// How undefined names are treated when a reference is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Absent bindings read as "no value".
    #[default]
    Lenient,

    /// Absent bindings are an error.
    Strict,
}

/// Everything that can go wrong while binding, resolving or mutating values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    //--------------------------------------------------------------------------------------------
    // Binding errors
    #[error("cannot modify immutable value {value} of \"{name}{path}\"")]
    Immutable {
        value: String,
        name: String,
        path: String,
    },

    #[error("cannot modify an immutable {0}")]
    ImmutableContainer(String),

    #[error("\"{0}\" is a constant and cannot be reassigned")]
    ConstantAssign(String),

    #[error("cannot assign to reserved name \"{0}\"")]
    ReservedName(String),

    #[error("unknown parameter name(s) for \"{function}\": {names}")]
    UnknownParameter { function: String, names: String },

    #[error("\"{function}\" takes one parameter but {given} were given")]
    TooManyArgsOne { function: String, given: usize },

    #[error("\"{function}\" takes {expected} parameters but {given} were given")]
    TooManyArgs {
        function: String,
        expected: usize,
        given: usize,
    },

    #[error("duplicate parameter name \"{0}\"")]
    DuplicateParameter(String),

    #[error("the variadic parameter must be the last parameter declared")]
    VariadicNotLast,

    //--------------------------------------------------------------------------------------------
    // Index errors
    #[error("negative index {0}")]
    NegativeIndex(ReckonInt),

    #[error("index {index} is out of range for size {size}")]
    IndexOutOfRange { index: ReckonInt, size: usize },

    //--------------------------------------------------------------------------------------------
    // Structural errors
    #[error("value of \"{0}\" is not an object")]
    NotAnObject(String),

    #[error("value of \"{0}\" is not an array or string")]
    NotAnArray(String),

    #[error("value of \"{0}\" is not a function")]
    NotCallable(String),

    #[error("{index} is not a valid index for \"{path}\"")]
    InvalidIndex { index: String, path: String },

    #[error("cannot assign to an element of set \"{0}\"")]
    SetElementAssign(String),

    #[error("cannot assign to the result of \"{0}\"")]
    ResultAssign(String),

    #[error("{op} needs an array, set or object operand, not {kind}")]
    BadOperand { op: &'static str, kind: &'static str },

    //--------------------------------------------------------------------------------------------
    // Lookup errors
    #[error("local variable \"{0}\" is not available outside a function")]
    LocalNotAvailable(String),

    #[error("undefined variable \"{0}\"")]
    Undefined(String),

    //--------------------------------------------------------------------------------------------
    // Evaluation
    #[error("too many nested function calls (infinite recursion?)")]
    RecursionLimit,

    #[error("the constants could not be computed")]
    ConstantsUnavailable,

    #[error("{0}")]
    Message(String),
}

/// An error together with where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorData {
    kind: ErrorKind,
    position: Option<Position>,
}

impl ErrorData {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            position: None,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }
}

impl fmt::Display for ErrorData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{} ({})", self.kind, pos),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// The non-normal outcomes of evaluation.
///
/// `Error` is a real failure.  `Leave`, `Next` and `Assert` are the evaluator's non-local exits;
/// the constructs that handle them (loops, blocks, function calls) match on them, and anything
/// left unhandled at a function boundary is translated by
/// [`Runtime::call_function`](../runtime/struct.Runtime.html#method.call_function).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Exception {
    #[error("{0}")]
    Error(ErrorData),

    #[error("\"leave\" outside of a block or function")]
    Leave {
        value: Option<Value>,
        label: Option<String>,
    },

    #[error("\"next\" outside of a loop")]
    Next { label: Option<String> },

    #[error("assertion failed: {message}")]
    Assert {
        message: String,
        position: Option<Position>,
    },
}

impl Exception {
    /// Creates an error exception of the given kind.
    pub fn error(kind: ErrorKind) -> Self {
        Exception::Error(ErrorData::new(kind))
    }

    /// Creates an error exception from a plain message.
    pub fn message(msg: &str) -> Self {
        Exception::error(ErrorKind::Message(msg.into()))
    }

    /// Attaches a source position to an error that doesn't have one yet.  Other outcomes are
    /// returned unchanged.
    pub fn at(mut self, position: Position) -> Self {
        if let Exception::Error(data) = &mut self {
            if data.position.is_none() {
                data.position = Some(position);
            }
        }
        self
    }

    /// Returns true if this is a real error rather than a control signal.
    pub fn is_error(&self) -> bool {
        matches!(self, Exception::Error(_))
    }

    /// Returns the error kind, if this is an error.
    pub fn kind(&self) -> Option<&ErrorKind> {
        match self {
            Exception::Error(data) => Some(data.kind()),
            _ => None,
        }
    }

    /// Returns the error data, if this is an error.
    pub fn error_data(&self) -> Option<&ErrorData> {
        match self {
            Exception::Error(data) => Some(data),
            _ => None,
        }
    }
}

impl From<ErrorKind> for Exception {
    fn from(kind: ErrorKind) -> Self {
        Exception::error(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_only_sets_first_position() {
        let ex = Exception::error(ErrorKind::NegativeIndex(-3))
            .at(Position::new(1, 2))
            .at(Position::new(9, 9));

        assert_eq!(ex.error_data().unwrap().position(), Some(Position::new(1, 2)));
        assert_eq!(ex.to_string(), "negative index -3 (line 1, column 2)");
    }

    #[test]
    fn test_signals_are_not_errors() {
        let ex = Exception::Next { label: None }.at(Position::new(1, 1));
        assert!(!ex.is_error());
        assert_eq!(ex.kind(), None);
        assert!(Exception::message("boom").is_error());
    }

    #[test]
    fn test_messages() {
        let ex: Exception = ErrorKind::Immutable {
            value: "[ 1, 2 ]".into(),
            name: "a".into(),
            path: "[0]".into(),
        }
        .into();
        assert_eq!(
            ex.to_string(),
            "cannot modify immutable value [ 1, 2 ] of \"a[0]\""
        );
    }
}
