use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::{
    de::{self, Visitor},
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use sqlx::Type;
use thiserror::Error;

const CENTS_PER_UNIT: i64 = 100;
const SUB_CENT_TOLERANCE: f64 = 1e-9;

//--------------------------------------        Price        ---------------------------------------------------------
/// A non-negative decimal price, held as an integer number of cents so that storage is exact.
///
/// Prices travel over the wire as JSON numbers (`12.5`) or decimal strings (`"12.50"`), and are stored as an
/// `INTEGER` column of cents.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash)]
#[sqlx(transparent)]
pub struct Price(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("A price cannot be negative: {0}")]
    Negative(String),
    #[error("Not a valid price: {0}")]
    Malformed(String),
    #[error("Prices have at most two decimal places: {0}")]
    TooPrecise(String),
    #[error("Price is too large: {0}")]
    Overflow(String),
}

impl Price {
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        if cents < 0 {
            return Err(PriceError::Negative(cents.to_string()));
        }
        Ok(Self(cents))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / CENTS_PER_UNIT as f64
    }
}

impl TryFrom<f64> for Price {
    type Error = PriceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(PriceError::Malformed(value.to_string()));
        }
        if value < 0.0 {
            return Err(PriceError::Negative(value.to_string()));
        }
        let scaled = value * CENTS_PER_UNIT as f64;
        let cents = scaled.round();
        // Tolerates the representation error of values like 19.99, but not a real third decimal place.
        if (scaled - cents).abs() > SUB_CENT_TOLERANCE * cents.max(1.0) {
            return Err(PriceError::TooPrecise(value.to_string()));
        }
        if cents > i64::MAX as f64 {
            return Err(PriceError::Overflow(value.to_string()));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(cents as i64))
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(PriceError::Negative(s.to_string()));
        }
        let (units, fraction) = s.split_once('.').unwrap_or((s, ""));
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (units.is_empty() && fraction.is_empty()) || !all_digits(units) || !all_digits(fraction) {
            return Err(PriceError::Malformed(s.to_string()));
        }
        if fraction.len() > 2 {
            return Err(PriceError::TooPrecise(s.to_string()));
        }
        let units = if units.is_empty() { 0 } else { units.parse::<i64>().map_err(|_| PriceError::Overflow(s.to_string()))? };
        let cents = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| PriceError::Malformed(s.to_string()))? * 10,
            _ => fraction.parse::<i64>().map_err(|_| PriceError::Malformed(s.to_string()))?,
        };
        units
            .checked_mul(CENTS_PER_UNIT)
            .and_then(|c| c.checked_add(cents))
            .map(Self)
            .ok_or_else(|| PriceError::Overflow(s.to_string()))
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / CENTS_PER_UNIT, self.0 % CENTS_PER_UNIT)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PriceVisitor)
    }
}

struct PriceVisitor;

impl<'de> Visitor<'de> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative decimal number or decimal string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
        v.checked_mul(CENTS_PER_UNIT)
            .ok_or_else(|| PriceError::Overflow(v.to_string()))
            .and_then(Price::from_cents)
            .map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
        i64::try_from(v).map_err(|_| E::custom(PriceError::Overflow(v.to_string()))).and_then(|v| self.visit_i64(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Price, E> {
        Price::try_from(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
        v.parse().map_err(E::custom)
    }
}
