//! ---
//! portal_section: "08-pricing"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Price reconstruction for quotations and calculations."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
//! Fixed-point decimal used for prices, quantities and factors.
//!
//! Values carry four decimal places so that intermediate products such as
//! `unit × quantity × factor` keep sub-cent precision; money leaves the crate
//! rounded to cents.

use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::errors::ParseAmountError;

/// Raw units per whole unit.
pub const SCALE: i64 = 10_000;
/// Raw units per cent.
const CENT: i64 = SCALE / 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    pub const ONE: Amount = Amount(SCALE);
    pub const HUNDRED: Amount = Amount(100 * SCALE);

    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub fn from_units(units: i64) -> Option<Self> {
        units.checked_mul(SCALE).map(Self)
    }

    pub fn from_cents(cents: i64) -> Option<Self> {
        cents.checked_mul(CENT).map(Self)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    pub fn checked_add(self, other: Amount) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Sum of `amounts`, or `None` once the total leaves the `i64` range.
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |total, next| total.checked_add(next))
    }

    pub fn checked_mul(self, other: Amount) -> Option<Self> {
        narrow(div_round(
            i128::from(self.0) * i128::from(other.0),
            i128::from(SCALE),
        ))
    }

    pub fn checked_div(self, other: Amount) -> Option<Self> {
        if other.0 == 0 {
            return None;
        }
        narrow(div_round(
            i128::from(self.0) * i128::from(SCALE),
            i128::from(other.0),
        ))
    }

    /// `self × numerator / denominator` computed without intermediate rounding.
    pub fn mul_div(self, numerator: Amount, denominator: Amount) -> Option<Self> {
        if denominator.0 == 0 {
            return None;
        }
        narrow(div_round(
            i128::from(self.0) * i128::from(numerator.0),
            i128::from(denominator.0),
        ))
    }

    /// `self × rate / 100`.
    pub fn percent(self, rate: Amount) -> Option<Self> {
        self.mul_div(rate, Amount::HUNDRED)
    }

    pub fn round_cents(self) -> Self {
        Self(self.cents().saturating_mul(CENT))
    }

    /// Whole cents, rounded half away from zero.
    pub fn cents(self) -> i64 {
        // |raw / CENT| never exceeds |raw|, so the narrowing cannot fail.
        div_round(i128::from(self.0), i128::from(CENT)) as i64
    }

    /// Four-decimal rendering used for ratios and factors.
    pub fn to_precise_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE.unsigned_abs();
        format!("{sign}{}.{:04}", abs / scale, abs % scale)
    }
}

fn narrow(value: i128) -> Option<Amount> {
    i64::try_from(value).ok().map(Amount)
}

/// Integer division rounding half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        if (numerator < 0) != (denominator < 0) {
            quotient - 1
        } else {
            quotient + 1
        }
    } else {
        quotient
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(self.0.saturating_neg())
    }
}

/// Prints the value rounded to cents, e.g. `1234.50`.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = self.cents();
        let sign = if cents < 0 { "-" } else { "" };
        let abs = cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Serialize helper for fields that need all four decimals (ratios, factors).
pub fn serialize_precise<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&amount.to_precise_string())
}

fn is_currency_noise(c: char) -> bool {
    c.is_alphabetic() || c.is_whitespace() || matches!(c, '€' | '$' | '£' | '¥')
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Accepts the shapes legacy calculation rows contain: `12`, `12.5`,
    /// `12,50`, `1.234,56`, `1,234.56`, `€ 1 234,50`, `-12.00 EUR`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut negative = false;
        let mut sign_seen = false;
        let mut body = input.trim();
        loop {
            let before = body;
            if let Some(rest) = body.strip_prefix(['-', '+']) {
                if sign_seen {
                    return Err(ParseAmountError::InvalidCharacter(
                        body.chars().next().unwrap_or('-'),
                    ));
                }
                sign_seen = true;
                negative = body.starts_with('-');
                body = rest;
            }
            body = body.trim_start_matches(is_currency_noise);
            if body == before {
                break;
            }
        }
        body = body.trim_end_matches(is_currency_noise);

        let cleaned: String = body
            .chars()
            .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '\'' | '_'))
            .collect();
        if cleaned.is_empty() {
            return Err(ParseAmountError::Empty);
        }
        if let Some(bad) = cleaned
            .chars()
            .find(|c| !(c.is_ascii_digit() || *c == '.' || *c == ','))
        {
            return Err(ParseAmountError::InvalidCharacter(bad));
        }

        let dots = cleaned.matches('.').count();
        let commas = cleaned.matches(',').count();
        let decimal = match (dots, commas) {
            (1, 0) => Some('.'),
            (0, 1) => Some(','),
            (_, 0) | (0, _) => None,
            _ => {
                let last_dot = cleaned.rfind('.');
                let last_comma = cleaned.rfind(',');
                let (separator, occurrences) = if last_dot > last_comma {
                    ('.', dots)
                } else {
                    (',', commas)
                };
                if occurrences > 1 {
                    return Err(ParseAmountError::AmbiguousSeparators);
                }
                Some(separator)
            }
        };

        let (int_part, frac_part) = match decimal.and_then(|sep| cleaned.split_once(sep)) {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (cleaned.as_str(), ""),
        };
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseAmountError::AmbiguousSeparators);
        }
        let int_digits: Vec<u8> = int_part
            .bytes()
            .filter(u8::is_ascii_digit)
            .map(|b| b - b'0')
            .collect();
        let frac_digits: Vec<u8> = frac_part.bytes().map(|b| b - b'0').collect();
        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(ParseAmountError::Empty);
        }

        let mut whole: i128 = 0;
        for digit in int_digits {
            whole = whole * 10 + i128::from(digit);
            if whole > i128::from(i64::MAX) {
                return Err(ParseAmountError::OutOfRange);
            }
        }
        let mut fraction: i128 = 0;
        for position in 0..4 {
            fraction = fraction * 10 + i128::from(frac_digits.get(position).copied().unwrap_or(0));
        }
        if frac_digits.get(4).is_some_and(|digit| *digit >= 5) {
            fraction += 1;
        }

        let magnitude = whole * i128::from(SCALE) + fraction;
        let raw = if negative { -magnitude } else { magnitude };
        i64::try_from(raw)
            .map(Amount)
            .map_err(|_| ParseAmountError::OutOfRange)
    }
}
