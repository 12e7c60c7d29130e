//! Arbitrary-precision numbers.
//!
//! [`Decimal`] is a base-10 number with an arbitrary-length mantissa; it is what the constant
//! provider computes and what high-precision arithmetic produces.  [`Fraction`] is an exact
//! rational, used when the "rational" preference asks for constants as fractions.
//!
//! Both are immutable and always kept in normal form, so the derived equality and hashing
//! compare numeric values.

use core::cmp::Ordering;
use core::fmt;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

/// Returns 10 raised to the given power.
pub(crate) fn pow10(exp: u32) -> BigInt {
    BigInt::from(10u32).pow(exp)
}

/// The number of decimal digits in the magnitude of a value; zero has one digit.
fn digit_count(value: &BigInt) -> u32 {
    if value.is_zero() {
        1
    } else {
        value.abs().to_string().len() as u32
    }
}

/// A decimal number: `mantissa * 10^-scale`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: BigInt,
    scale: i64,
}

impl Decimal {
    /// Creates a decimal, stripping trailing zeros from the mantissa.
    pub fn new(mantissa: BigInt, scale: i64) -> Self {
        let mut mantissa = mantissa;
        let mut scale = scale;

        if mantissa.is_zero() {
            return Self { mantissa, scale: 0 };
        }

        let ten = BigInt::from(10u32);
        while (&mantissa % &ten).is_zero() {
            mantissa /= &ten;
            scale -= 1;
        }

        Self { mantissa, scale }
    }

    pub fn from_int(value: i64) -> Self {
        Self::new(BigInt::from(value), 0)
    }

    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// The number of significant digits.
    pub fn precision(&self) -> u32 {
        digit_count(&self.mantissa)
    }

    /// Rounds to the given number of significant digits, halves rounding away from zero.
    pub fn round(&self, precision: u32) -> Decimal {
        self.reduce(precision, true)
    }

    /// Truncates to the given number of significant digits.
    pub fn truncate(&self, precision: u32) -> Decimal {
        self.reduce(precision, false)
    }

    fn reduce(&self, precision: u32, half_up: bool) -> Decimal {
        let precision = precision.max(1);
        let digits = self.precision();
        if digits <= precision {
            return self.clone();
        }

        let drop = digits - precision;
        let divisor = pow10(drop);
        let magnitude = self.mantissa.abs();
        let mut kept = &magnitude / &divisor;
        if half_up {
            let rest = &magnitude % &divisor;
            if rest * 2 >= divisor {
                kept += 1;
            }
        }

        if self.mantissa.is_negative() {
            kept = -kept;
        }
        Decimal::new(kept, self.scale - drop as i64)
    }

    /// Exactly half of this value.
    pub fn half(&self) -> Decimal {
        Decimal::new(&self.mantissa * 5, self.scale + 1)
    }

    /// Divides by a small integer, rounding the quotient to the given precision.
    pub fn div_small(&self, divisor: u32, precision: u32) -> Decimal {
        let shift = precision + digit_count(&BigInt::from(divisor)) + 2;
        let widened = &self.mantissa * pow10(shift);
        Decimal::new(widened / divisor, self.scale + shift as i64).round(precision)
    }

    /// The exact rational equivalent.
    pub fn to_fraction(&self) -> Fraction {
        if self.scale >= 0 {
            Fraction::new(self.mantissa.clone(), pow10(self.scale as u32))
        } else {
            Fraction::new(&self.mantissa * pow10((-self.scale) as u32), BigInt::one())
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        let lhs = &self.mantissa * pow10((scale - self.scale) as u32);
        let rhs = &other.mantissa * pow10((scale - other.scale) as u32);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.mantissa.is_negative() { "-" } else { "" };
        let digits = self.mantissa.abs().to_string();

        if self.scale <= 0 {
            return write!(f, "{}{}{}", sign, digits, "0".repeat((-self.scale) as usize));
        }

        let scale = self.scale as usize;
        if digits.len() > scale {
            let (whole, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{}{}.{}", sign, whole, frac)
        } else {
            write!(f, "{}0.{}{}", sign, "0".repeat(scale - digits.len()), digits)
        }
    }
}

fn gcd(a: &BigInt, b: &BigInt) -> BigInt {
    let mut a = a.abs();
    let mut b = b.abs();
    while !b.is_zero() {
        let r = &a % &b;
        a = b;
        b = r;
    }
    a
}

/// An exact rational number in lowest terms with a positive denominator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fraction {
    numer: BigInt,
    denom: BigInt,
}

impl Fraction {
    /// Creates a fraction in lowest terms.
    ///
    /// # Panics
    ///
    /// Panics if the denominator is zero.
    pub fn new(numer: BigInt, denom: BigInt) -> Self {
        assert!(!denom.is_zero(), "fraction with zero denominator");

        let divisor = gcd(&numer, &denom);
        let (mut numer, mut denom) = (numer / &divisor, denom / &divisor);
        if denom.is_negative() {
            numer = -numer;
            denom = -denom;
        }
        Self { numer, denom }
    }

    pub fn numer(&self) -> &BigInt {
        &self.numer
    }

    pub fn denom(&self) -> &BigInt {
        &self.denom
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.denom.is_one() {
            write!(f, "{}", self.numer)
        } else {
            write!(f, "{}/{}", self.numer, self.denom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str, scale: i64) -> Decimal {
        Decimal::new(s.parse::<BigInt>().unwrap(), scale)
    }

    #[test]
    fn test_normal_form() {
        assert_eq!(dec("31400", 4), dec("314", 2));
        assert_eq!(dec("0", 7).scale(), 0);
        assert_eq!(dec("1200", 0).to_string(), "1200");
    }

    #[test]
    fn test_display() {
        assert_eq!(dec("314159", 5).to_string(), "3.14159");
        assert_eq!(dec("-25", 3).to_string(), "-0.025");
        assert_eq!(dec("7", 0).to_string(), "7");
    }

    #[test]
    fn test_round_and_truncate() {
        let x = dec("314159", 5);
        assert_eq!(x.round(3).to_string(), "3.14");
        assert_eq!(x.round(5).to_string(), "3.1416");
        assert_eq!(x.truncate(5).to_string(), "3.1415");
        assert_eq!(dec("-995", 3).round(2).to_string(), "-1");
        assert_eq!(x.round(10), x);
    }

    #[test]
    fn test_half_and_div() {
        assert_eq!(dec("3", 0).half().to_string(), "1.5");
        assert_eq!(dec("1", 0).div_small(3, 5).to_string(), "0.33333");
        assert_eq!(dec("180", 0).div_small(180, 10).to_string(), "1");
    }

    #[test]
    fn test_ordering() {
        assert!(dec("314", 2) < dec("3142", 3));
        assert!(dec("-1", 0) < dec("1", 5));
    }

    #[test]
    fn test_fraction() {
        let f = dec("125", 3).to_fraction();
        assert_eq!(f.to_string(), "1/8");

        let f = Fraction::new(BigInt::from(6), BigInt::from(-4));
        assert_eq!(f.to_string(), "-3/2");
        assert_eq!(dec("5", -2).to_fraction().to_string(), "500");
    }
}
