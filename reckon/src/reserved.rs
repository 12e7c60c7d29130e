//! Reserved names.
//!
//! The positional parameters of a frame are reachable by reserved names built from the frame's
//! prefix: `$0`, `$1`, ... for the global frame's arguments and `_0`, `_1`, ... for the current
//! function's, with `$*`/`_*` naming the whole argument array and `$#`/`_#` its length.  These
//! names can be read but never assigned.

use lazy_static::lazy_static;
use regex::Regex;

/// The parameter prefix of the global frame.
pub const GLOBAL_PREFIX: &str = "$";

/// The parameter prefix of function frames.
pub const LOCAL_PREFIX: &str = "_";

lazy_static! {
    static ref GLOBAL_ARG: Regex = Regex::new(r"^\$([0-9]+|\*|#)$").expect("valid regex");
    static ref LOCAL_ARG: Regex = Regex::new(r"^_([0-9]+|\*|#)$").expect("valid regex");
}

/// What a reserved name refers to within its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Positional {
    /// One argument, by position.
    Index(usize),

    /// The argument array.
    Array,

    /// The argument count.
    Count,
}

/// Is this one of the global frame's argument names?
pub fn is_global_arg(name: &str) -> bool {
    GLOBAL_ARG.is_match(name)
}

/// Is this one of a function frame's argument names?
pub fn is_local_arg(name: &str) -> bool {
    LOCAL_ARG.is_match(name)
}

/// Is this name reserved for positional parameters?
pub fn is_reserved(name: &str) -> bool {
    is_global_arg(name) || is_local_arg(name)
}

/// Parses a reserved name into the frame prefix it belongs to and what it refers to.
pub fn parse(name: &str) -> Option<(&'static str, Positional)> {
    let (prefix, caps) = if let Some(caps) = GLOBAL_ARG.captures(name) {
        (GLOBAL_PREFIX, caps)
    } else {
        (LOCAL_PREFIX, LOCAL_ARG.captures(name)?)
    };

    let positional = match &caps[1] {
        "*" => Positional::Array,
        "#" => Positional::Count,
        // Too many digits for a position is still past the end.
        digits => Positional::Index(digits.parse().unwrap_or(usize::MAX)),
    };
    Some((prefix, positional))
}
