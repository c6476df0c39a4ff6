//! Arbitrary-precision decimal view of JSON numbers.
//!
//! `serde_json` is built with `arbitrary_precision`, so a [`Number`] keeps the
//! exact text it was parsed from. [`Decimal`] normalizes that text into a
//! canonical sign, significand and exponent so that `1`, `1.0`, `1.00` and
//! `1e0` compare and hash identically, with no detour through `f64`.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Number;

/// Largest divisor significand (in digits) handled by exact modular arithmetic.
const EXACT_DIVISOR_DIGITS: usize = 36;

/// A decimal number `significand × 10^exponent`.
///
/// The significand has neither leading nor trailing zeros; zero is the empty
/// significand with exponent 0 and no sign.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    negative: bool,
    digits: String,
    exponent: i128,
}

impl Decimal {
    /// Parse a JSON number literal.
    ///
    /// Returns `None` when the text is not a JSON number or its exponent does
    /// not fit in 128 bits.
    pub fn parse(text: &str) -> Option<Self> {
        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (mantissa, exp) = match rest.find(|c: char| c == 'e' || c == 'E') {
            Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
            None => (rest, None),
        };
        let mut exponent: i128 = match exp {
            Some(e) => {
                let e = e.strip_prefix('+').unwrap_or(e);
                if e.is_empty() || !e.trim_start_matches('-').bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                e.parse().ok()?
            }
            None => 0,
        };
        let (int_part, frac_part) = match mantissa.find('.') {
            Some(idx) => (&mantissa[..idx], &mantissa[idx + 1..]),
            None => (mantissa, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        exponent = exponent.checked_sub(frac_part.len() as i128)?;

        let all: String = int_part.chars().chain(frac_part.chars()).collect();
        let significant = all.trim_start_matches('0');
        if significant.is_empty() {
            return Some(Self::zero());
        }
        let trimmed = significant.trim_end_matches('0');
        exponent = exponent.checked_add((significant.len() - trimmed.len()) as i128)?;

        Some(Self {
            negative,
            digits: trimmed.to_string(),
            exponent,
        })
    }

    /// Decimal view of a `serde_json` number.
    pub fn from_number(n: &Number) -> Option<Self> {
        Self::parse(&n.to_string())
    }

    pub fn zero() -> Self {
        Self {
            negative: false,
            digits: String::new(),
            exponent: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// True when the value has no fractional part.
    pub fn is_integer(&self) -> bool {
        self.is_zero() || self.exponent >= 0
    }

    /// True when `self / divisor` is an integer.
    ///
    /// Exact whenever the divisor's significand has at most 36 digits; larger
    /// divisors fall back to `f64` division.
    pub fn is_multiple_of(&self, divisor: &Decimal) -> bool {
        if divisor.is_zero() {
            return false;
        }
        if self.is_zero() {
            return true;
        }
        // The dividend's significand is never a multiple of ten, so it cannot
        // absorb a larger power of ten from the divisor.
        if self.exponent < divisor.exponent {
            return false;
        }
        if divisor.digits.len() > EXACT_DIVISOR_DIGITS {
            let quotient = self.to_f64() / divisor.to_f64();
            return quotient.is_finite() && quotient.fract() == 0.0;
        }
        let Ok(modulus) = divisor.digits.parse::<u128>() else {
            return false;
        };
        let remainder = self
            .digits
            .bytes()
            .fold(0u128, |r, b| (r * 10 + u128::from(b - b'0')) % modulus);
        let shift = self.exponent.abs_diff(divisor.exponent);
        mul_mod(remainder, pow_mod(10, shift, modulus), modulus) == 0
    }

    /// Exact `u64` value, when non-negative, integral and in range.
    pub fn to_u64(&self) -> Option<u64> {
        if self.is_zero() {
            return Some(0);
        }
        if self.negative || self.exponent < 0 || self.exponent > 20 {
            return None;
        }
        let zeros = "0".repeat(self.exponent as usize);
        format!("{}{}", self.digits, zeros).parse().ok()
    }

    /// Nearest `f64`, infinite when out of range.
    pub fn to_f64(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        let text = format!(
            "{}{}e{}",
            if self.negative { "-" } else { "" },
            self.digits,
            self.exponent
        );
        text.parse().unwrap_or(if self.negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        })
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        // Orders exponent + digit count without leaving i128.
        let gap = self.exponent.abs_diff(other.exponent);
        let left = self.digits.len() as u128;
        let right = other.digits.len() as u128;
        let order = match self.exponent.cmp(&other.exponent) {
            Ordering::Equal => left.cmp(&right),
            Ordering::Greater => gap.saturating_add(left).cmp(&right),
            Ordering::Less => left.cmp(&gap.saturating_add(right)),
        };
        order.then_with(|| self.digits.as_str().cmp(other.digits.as_str()))
    }

    fn signum(&self) -> i8 {
        match (self.is_zero(), self.negative) {
            (true, _) => 0,
            (false, true) => -1,
            (false, false) => 1,
        }
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.signum().cmp(&other.signum()) {
            Ordering::Equal if self.is_zero() => Ordering::Equal,
            Ordering::Equal if self.negative => other.cmp_magnitude(self),
            Ordering::Equal => self.cmp_magnitude(other),
            unequal => unequal,
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str(&self.digits)?;
        if self.exponent != 0 {
            write!(f, "e{}", self.exponent)?;
        }
        Ok(())
    }
}

fn mul_mod(mut a: u128, mut b: u128, m: u128) -> u128 {
    let mut result = 0;
    a %= m;
    while b > 0 {
        if b & 1 == 1 {
            result = (result + a) % m;
        }
        a = (a + a) % m;
        b >>= 1;
    }
    result
}

fn pow_mod(base: u128, mut exp: u128, m: u128) -> u128 {
    if m == 1 {
        return 0;
    }
    let mut result = 1;
    let mut base = base % m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::parse(s).unwrap()
    }

    #[test]
    fn representations_normalize() {
        assert_eq!(d("1"), d("1.0"));
        assert_eq!(d("1"), d("1.00000"));
        assert_eq!(d("1"), d("1e0"));
        assert_eq!(d("1"), d("10e-1"));
        assert_eq!(d("0"), d("-0.0"));
        assert_eq!(d("1200"), d("1.2E3"));
        assert_ne!(d("1"), d("-1"));
    }

    #[test]
    fn rejects_non_numbers() {
        assert!(Decimal::parse("").is_none());
        assert!(Decimal::parse("abc").is_none());
        assert!(Decimal::parse("1e").is_none());
        assert!(Decimal::parse(".5").is_none());
    }

    #[test]
    fn ordering() {
        assert!(d("-1") < d("0"));
        assert!(d("0.12") < d("0.123"));
        assert!(d("0.2") > d("0.123"));
        assert!(d("-0.2") < d("-0.123"));
        assert!(d("1e400") > d("9e399"));
        assert_eq!(d("5").cmp(&d("5.0")), Ordering::Equal);
    }

    #[test]
    fn huge_exponents_keep_precision() {
        assert_ne!(d("1e1000"), d("1.0000000000000001e1000"));
        assert!(d("1e1000") < d("1.0000000000000001e1000"));
    }

    #[test]
    fn extreme_exponents_do_not_overflow() {
        let max = "170141183460469231731687303715884105727";
        let min = "170141183460469231731687303715884105728";
        let top = d(&format!("1e{}", max));
        let tiny = d(&format!("1e-{}", min));

        assert!(top.is_multiple_of(&tiny));
        assert!(!top.is_multiple_of(&d(&format!("3e-{}", min))));
        assert!(!tiny.is_multiple_of(&top));

        assert!(top > tiny);
        assert!(d(&format!("12e{}", "170141183460469231731687303715884105726")) > top);
        assert!(d(&format!("-1e{}", max)) < d(&format!("-1e-{}", min)));
    }

    #[test]
    fn integers() {
        assert!(d("3").is_integer());
        assert!(d("3.0").is_integer());
        assert!(d("1e2").is_integer());
        assert!(!d("0.5").is_integer());
        assert!(d("0").is_integer());
    }

    #[test]
    fn multiples() {
        assert!(d("10").is_multiple_of(&d("2.5")));
        assert!(d("0.3").is_multiple_of(&d("0.1")));
        assert!(!d("0.35").is_multiple_of(&d("0.1")));
        assert!(!d("1e100").is_multiple_of(&d("7e98")));
        assert!(d("7e100").is_multiple_of(&d("7")));
        assert!(d("0").is_multiple_of(&d("3")));
        assert!(!d("3").is_multiple_of(&d("0")));
        assert!(d("-9").is_multiple_of(&d("3")));
    }

    #[test]
    fn unsigned_conversion() {
        assert_eq!(d("3.0").to_u64(), Some(3));
        assert_eq!(d("1e3").to_u64(), Some(1000));
        assert_eq!(d("0").to_u64(), Some(0));
        assert_eq!(d("-1").to_u64(), None);
        assert_eq!(d("1.5").to_u64(), None);
        assert_eq!(d("1e30").to_u64(), None);
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(d("1.50").to_string(), "15e-1");
        assert_eq!(d("-200").to_string(), "-2e2");
        assert_eq!(d("0.000").to_string(), "0");
    }
}
