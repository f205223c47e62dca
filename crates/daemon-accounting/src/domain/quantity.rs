//! Kubernetes resource quantities and per-resource lists.
//!
//! Quantities are held as signed milli-units so that `100m` CPU and `128Mi`
//! memory share one exact integer representation. Parsing follows the
//! Kubernetes quantity grammar; values below one milli-unit round up.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;
use std::ops::AddAssign;
use std::str::FromStr;

use serde::de;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

const BINARY_SUFFIXES: [&str; 6] = ["Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];

/// Largest power of ten representable in an `i128`.
const MAX_POW10: u32 = 38;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    #[error("invalid quantity `{0}`")]
    Invalid(String),
    #[error("quantity `{0}` is out of range")]
    OutOfRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suffix {
    /// Multiplier of 1024^n
    Binary(u32),
    /// Multiplier of 10^n
    Decimal(i32),
}

impl Suffix {
    fn parse(raw: &str) -> Option<Self> {
        let suffix = match raw {
            "" => Self::Decimal(0),
            "n" => Self::Decimal(-9),
            "u" => Self::Decimal(-6),
            "m" => Self::Decimal(-3),
            "k" => Self::Decimal(3),
            "M" => Self::Decimal(6),
            "G" => Self::Decimal(9),
            "T" => Self::Decimal(12),
            "P" => Self::Decimal(15),
            "E" => Self::Decimal(18),
            _ => {
                if let Some(pos) = BINARY_SUFFIXES.iter().position(|s| *s == raw) {
                    return Some(Self::Binary(pos as u32 + 1));
                }
                let exponent = raw.strip_prefix(['e', 'E'])?;
                let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                Self::Decimal(exponent.parse().ok()?)
            }
        };
        Some(suffix)
    }
}

/// A resource amount in milli-units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceQuantity {
    millis: i64,
}

impl ResourceQuantity {
    pub const ZERO: Self = Self { millis: 0 };

    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub const fn from_units(units: i64) -> Self {
        Self {
            millis: units.saturating_mul(1000),
        }
    }

    pub const fn millis(self) -> i64 {
        self.millis
    }

    pub const fn is_zero(self) -> bool {
        self.millis == 0
    }

    /// Subtract, clamping at zero.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self {
            millis: self.millis.saturating_sub(rhs.millis).max(0),
        }
    }
}

impl Add for ResourceQuantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            millis: self.millis.saturating_add(rhs.millis),
        }
    }
}

impl AddAssign for ResourceQuantity {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl FromStr for ResourceQuantity {
    type Err = QuantityError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || QuantityError::Invalid(raw.to_string());
        let out_of_range = || QuantityError::OutOfRange(raw.to_string());

        let trimmed = raw.trim();
        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let split = unsigned
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(unsigned.len());
        let (number, suffix) = unsigned.split_at(split);

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(invalid());
        }
        let suffix = Suffix::parse(suffix).ok_or_else(invalid)?;

        let joined = format!("{whole}{fraction}");
        let digits = match joined.trim_start_matches('0') {
            "" => "0",
            significant => significant,
        };
        if digits.len() > MAX_POW10 as usize {
            return Err(out_of_range());
        }
        let mantissa: i128 = digits.parse().map_err(|_| invalid())?;
        let scale = fraction.len() as i32;

        // value = mantissa * 10^-scale * suffix, expressed in milli-units
        let mut numerator = mantissa.checked_mul(1000).ok_or_else(out_of_range)?;
        let exp10 = match suffix {
            Suffix::Binary(power) => {
                let factor = 1024_i128.checked_pow(power).ok_or_else(out_of_range)?;
                numerator = numerator.checked_mul(factor).ok_or_else(out_of_range)?;
                -scale
            }
            Suffix::Decimal(exponent) => exponent.checked_sub(scale).ok_or_else(out_of_range)?,
        };

        let magnitude = if exp10 >= 0 {
            let factor = 10_i128
                .checked_pow(exp10 as u32)
                .ok_or_else(out_of_range)?;
            numerator.checked_mul(factor).ok_or_else(out_of_range)?
        } else if exp10.unsigned_abs() > MAX_POW10 {
            i128::from(numerator > 0)
        } else {
            let divisor = 10_i128.pow(exp10.unsigned_abs());
            numerator / divisor + i128::from(numerator % divisor != 0)
        };

        let millis = i64::try_from(magnitude).map_err(|_| out_of_range())?;
        Ok(Self {
            millis: if negative { -millis } else { millis },
        })
    }
}

impl fmt::Display for ResourceQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.millis % 1000 != 0 {
            return write!(f, "{}m", self.millis);
        }

        let units = self.millis / 1000;
        if units != 0 {
            for (power, suffix) in BINARY_SUFFIXES.iter().enumerate().rev() {
                let factor = 1_i64 << (10 * (power as u32 + 1));
                if units % factor == 0 {
                    return write!(f, "{}{suffix}", units / factor);
                }
            }
        }
        write!(f, "{units}")
    }
}

impl Serialize for ResourceQuantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceQuantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Resource name to quantity mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceList(BTreeMap<String, ResourceQuantity>);

impl ResourceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from `(name, quantity string)` pairs.
    ///
    /// # Errors
    ///
    /// - [`QuantityError`] for the first quantity that does not parse
    pub fn parse<I, K, V>(pairs: I) -> Result<Self, QuantityError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        pairs
            .into_iter()
            .map(|(name, raw)| -> Result<(String, ResourceQuantity), QuantityError> {
                Ok((name.into(), raw.as_ref().parse()?))
            })
            .collect()
    }

    /// Quantity for `name`, zero when absent.
    pub fn get(&self, name: &str) -> ResourceQuantity {
        self.0.get(name).copied().unwrap_or_default()
    }

    pub fn insert(&mut self, name: impl Into<String>, quantity: ResourceQuantity) {
        self.0.insert(name.into(), quantity);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ResourceQuantity)> {
        self.0.iter().map(|(name, quantity)| (name.as_str(), *quantity))
    }

    /// Element-wise maximum, in place.
    pub fn max_assign(&mut self, other: &Self) {
        for (name, quantity) in other.iter() {
            let entry = self.0.entry(name.to_string()).or_default();
            *entry = (*entry).max(quantity);
        }
    }

    /// Element-wise `self - other` over the resources in `self`, clamped at zero.
    pub fn saturating_sub(&self, other: &Self) -> Self {
        self.iter()
            .map(|(name, quantity)| (name.to_string(), quantity.saturating_sub(other.get(name))))
            .collect()
    }

    /// Whether every resource in `self` is available in `available`.
    pub fn fits_within(&self, available: &Self) -> bool {
        self.iter()
            .all(|(name, quantity)| quantity <= available.get(name))
    }

    /// Canonical string form, for exposition.
    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(name, quantity)| (name.to_string(), quantity.to_string()))
            .collect()
    }
}

impl AddAssign<&ResourceList> for ResourceList {
    fn add_assign(&mut self, rhs: &ResourceList) {
        for (name, quantity) in rhs.iter() {
            *self.0.entry(name.to_string()).or_default() += quantity;
        }
    }
}

impl FromIterator<(String, ResourceQuantity)> for ResourceList {
    fn from_iter<T: IntoIterator<Item = (String, ResourceQuantity)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a ResourceList> for ResourceList {
    fn from_iter<T: IntoIterator<Item = &'a ResourceList>>(iter: T) -> Self {
        iter.into_iter().fold(Self::new(), |mut total, list| {
            total += list;
            total
        })
    }
}
