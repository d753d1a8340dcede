//! Lenient numeric decoding for remote payloads.
//!
//! The remote API delivers ids, prices and quantities either as JSON numbers
//! or as numeric strings. These helpers normalize both at the boundary.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(serde_json::Number),
    Text(String),
}

impl NumberOrText {
    fn into_text(self) -> String {
        match self {
            NumberOrText::Number(n) => n.to_string(),
            NumberOrText::Text(s) => s.trim().to_string(),
        }
    }
}

fn parse_whole(text: &str) -> Option<u64> {
    text.parse::<u64>().ok().or_else(|| {
        // "3.0" style integers
        let value = text.parse::<f64>().ok()?;
        (value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64).then_some(value as u64)
    })
}

/// Non-negative integer from a number or numeric string.
pub fn whole<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let text = NumberOrText::deserialize(deserializer)?.into_text();
    parse_whole(&text).ok_or_else(|| D::Error::custom(format!("expected a whole number, got {text:?}")))
}

/// Like [`whole`], with `null` and `""` mapping to `None`.
pub fn optional_whole<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => {
            let text = raw.into_text();
            if text.is_empty() {
                return Ok(None);
            }
            parse_whole(&text)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("expected a whole number, got {text:?}")))
        }
    }
}

/// Quantity clamped into `u32`.
pub fn quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = whole(deserializer)?;
    u32::try_from(value).map_err(|_| D::Error::custom(format!("quantity {value} out of range")))
}

/// Decimal amount from a number or numeric string.
pub fn decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let text = NumberOrText::deserialize(deserializer)?.into_text();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| D::Error::custom(format!("expected a decimal amount, got {text:?}")))
}
