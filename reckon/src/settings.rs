//! Runtime settings.
//!
//! The settings are plain data shared between the [`Runtime`](../runtime/struct.Runtime.html)
//! and the host-setting slots of the predefined `settings` object, so a script can read and
//! change them like any other object member.

/// The default working precision, in significant digits.
pub const DEFAULT_PRECISION: u32 = 34;

/// The largest working precision.
pub const MAX_PRECISION: u32 = 10_000;

/// Preferences that affect binding and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Member and variable lookups ignore case.
    pub ignore_case: bool,

    /// Newly created objects have their keys sorted.
    pub sort_keys: bool,

    /// Significant digits for the predefined constants.
    pub precision: u32,

    /// Predefined constants read as exact fractions.
    pub rational: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ignore_case: false,
            sort_keys: false,
            precision: DEFAULT_PRECISION,
            rational: false,
        }
    }
}

impl Settings {
    pub fn with_ignore_case(mut self, flag: bool) -> Self {
        self.ignore_case = flag;
        self
    }

    pub fn with_sort_keys(mut self, flag: bool) -> Self {
        self.sort_keys = flag;
        self
    }

    /// Sets the precision, clamped to between one digit and [`MAX_PRECISION`].
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision.clamp(1, MAX_PRECISION);
        self
    }

    pub fn with_rational(mut self, flag: bool) -> Self {
        self.rational = flag;
        self
    }
}
