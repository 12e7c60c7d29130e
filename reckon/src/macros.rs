//! Convenience macros for returning Reckon results.

/// Returns an `Ok` [`ReckonResult`](types/type.ReckonResult.html).
///
/// With no arguments the result is `Value::Null`; otherwise the argument is converted with
/// `Value::from`.
///
/// # Example
///
/// ```
/// use reckon::*;
///
/// fn answer() -> ReckonResult {
///     reckon_ok!(42)
/// }
///
/// assert_eq!(answer(), Ok(Value::Int(42)));
/// ```
#[macro_export]
macro_rules! reckon_ok {
    () => (
        Ok($crate::Value::Null)
    );
    ($arg:expr) => (
        Ok($crate::Value::from($arg))
    );
}

/// Returns an `Err` [`ReckonResult`](types/type.ReckonResult.html).
///
/// Given a format string and arguments, the error is an `ErrorKind::Message`; given any
/// other expression, the expression is an [`ErrorKind`](types/enum.ErrorKind.html).
///
/// # Example
///
/// ```
/// use reckon::*;
///
/// fn check(index: ReckonInt) -> ReckonResult {
///     if index < 0 {
///         return reckon_err!(ErrorKind::NegativeIndex(index));
///     }
///     reckon_err!("index {} is not supported", index)
/// }
///
/// assert_eq!(check(-1).unwrap_err().to_string(), "negative index -1");
/// assert_eq!(check(2).unwrap_err().to_string(), "index 2 is not supported");
/// ```
#[macro_export]
macro_rules! reckon_err {
    ($fmt:literal) => (
        Err($crate::Exception::error($crate::ErrorKind::Message(format!($fmt))))
    );
    ($fmt:literal, $($arg:expr),+ $(,)?) => (
        Err($crate::Exception::error($crate::ErrorKind::Message(format!($fmt, $($arg),+))))
    );
    ($kind:expr) => (
        Err($crate::Exception::error($kind))
    );
}
