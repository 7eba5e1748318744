//! `an+b` expressions for the `:nth-*` pseudo-class family.

use crate::error::{Error, Result};

/// A parsed `an+b` formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    pub a: i64,
    pub b: i64,
}

impl Nth {
    /// `odd` is `2n+1`.
    pub fn odd() -> Self {
        Nth { a: 2, b: 1 }
    }

    /// `even` is `2n`.
    pub fn even() -> Self {
        Nth { a: 2, b: 0 }
    }

    /// Parse `odd`, `even`, a bare integer, or an `an+b` formula.
    pub fn parse(input: &str) -> Result<Self> {
        let bad = || Error::SelectorValidation(format!("invalid nth formula {:?}", input));

        let s = input.trim().to_ascii_lowercase();
        match s.as_str() {
            "odd" => return Ok(Nth::odd()),
            "even" => return Ok(Nth::even()),
            _ => {}
        }

        if let Ok(b) = s.parse::<i64>() {
            return Ok(Nth { a: 0, b });
        }

        let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let n_pos = s.find('n').ok_or_else(bad)?;

        let a_str = &s[..n_pos];
        let a = match a_str {
            "" | "+" => 1,
            "-" => -1,
            _ => a_str.parse().map_err(|_| bad())?,
        };

        let rest = &s[n_pos + 1..];
        let b = if rest.is_empty() {
            0
        } else {
            let (sign, digits) = match rest.as_bytes()[0] {
                b'+' => (1, &rest[1..]),
                b'-' => (-1, &rest[1..]),
                _ => return Err(bad()),
            };
            if digits.is_empty() {
                return Err(bad());
            }
            sign * digits.parse::<i64>().map_err(|_| bad())?
        };

        Ok(Nth { a, b })
    }

    /// Whether 1-based index `n` satisfies the formula: `n = a*k + b` for
    /// some non-negative integer `k`.
    pub fn matches(&self, n: usize) -> bool {
        let n = n as i64;
        if self.a == 0 {
            return n == self.b;
        }
        let diff = n - self.b;
        if self.a > 0 {
            diff >= 0 && diff % self.a == 0
        } else {
            diff <= 0 && diff % self.a == 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_even() {
        let odd = Nth::parse("odd").unwrap();
        assert!(odd.matches(1) && odd.matches(3));
        assert!(!odd.matches(2));

        let even = Nth::parse("even").unwrap();
        assert!(even.matches(2) && even.matches(4));
        assert!(!even.matches(1));
    }

    #[test]
    fn test_bare_index() {
        let third = Nth::parse("3").unwrap();
        assert_eq!(third, Nth { a: 0, b: 3 });
        assert!(third.matches(3));
        assert!(!third.matches(1));
    }

    #[test]
    fn test_formulas() {
        assert_eq!(Nth::parse("2n+1").unwrap(), Nth { a: 2, b: 1 });
        assert_eq!(Nth::parse("n").unwrap(), Nth { a: 1, b: 0 });
        assert_eq!(Nth::parse("-n+3").unwrap(), Nth { a: -1, b: 3 });
        assert_eq!(Nth::parse("+3n-2").unwrap(), Nth { a: 3, b: -2 });
        assert_eq!(Nth::parse(" 2N + 1 ").unwrap(), Nth { a: 2, b: 1 });
    }

    #[test]
    fn test_negative_a_selects_prefix() {
        // -n+3 matches the first three positions
        let nth = Nth::parse("-n+3").unwrap();
        assert!(nth.matches(1) && nth.matches(2) && nth.matches(3));
        assert!(!nth.matches(4));
    }

    #[test]
    fn test_bad_formulas() {
        for bad in ["", "x", "n+", "2n1", "--n", "1n+2n"] {
            assert!(Nth::parse(bad).is_err(), "{:?} should fail", bad);
        }
    }
}
