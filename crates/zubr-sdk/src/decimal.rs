/*
[INPUT]:  Exact decimal values (Decimal, integer, string) and inbound JSON trees
[OUTPUT]: {mantissa, exponent} wire pairs and JSON with decimals rewritten to strings
[POS]:    Data layer - exchange-native decimal encoding
[UPDATE]: When the wire decimal format or the inbound decimal representation changes
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ZubrError};

/// Largest scale `rust_decimal` can hold
const MAX_DECIMAL_SCALE: i32 = 28;
/// Largest exponent magnitude rendered as a plain decimal string
const MAX_RENDERED_EXPONENT: u32 = 1024;

/// Exchange wire form of an exact decimal: `mantissa * 10^exponent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDecimal {
    pub mantissa: i128,
    pub exponent: i32,
}

impl WireDecimal {
    /// Encode any decimal-like input without a floating-point intermediate
    pub fn encode(value: impl IntoWireDecimal) -> Result<Self> {
        value.into_wire_decimal()
    }

    /// Parse a decimal literal (`-12.50`, `1e-29`, `+2.5E3`) keeping its native exponent
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| ZubrError::InvalidDecimal(format!("{raw:?}: {reason}"));
        let trimmed = raw.trim();

        let (coefficient, exponent) = match trimmed.find(['e', 'E']) {
            Some(pos) => {
                let exponent: i64 = trimmed[pos + 1..]
                    .parse()
                    .map_err(|_| invalid("bad exponent"))?;
                (&trimmed[..pos], exponent)
            }
            None => (trimmed, 0),
        };
        let (negative, unsigned) = match coefficient.as_bytes().first() {
            Some(b'-') => (true, &coefficient[1..]),
            Some(b'+') => (false, &coefficient[1..]),
            _ => (false, coefficient),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("no digits"));
        }
        if !int_part
            .bytes()
            .chain(frac_part.bytes())
            .all(|b| b.is_ascii_digit())
        {
            return Err(invalid("not a decimal number"));
        }

        let magnitude: i128 = format!("{int_part}{frac_part}")
            .parse()
            .map_err(|_| invalid("mantissa out of range"))?;
        let exponent = i64::try_from(frac_part.len())
            .ok()
            .and_then(|scale| exponent.checked_sub(scale))
            .and_then(|exp| i32::try_from(exp).ok())
            .ok_or_else(|| invalid("exponent out of range"))?;

        Ok(Self {
            mantissa: if negative { -magnitude } else { magnitude },
            exponent,
        })
    }

    /// Exact reconstruction as a `Decimal`.
    ///
    /// Trailing mantissa zeros are folded into the exponent when the scale exceeds what
    /// `Decimal` holds.
    pub fn to_decimal(&self) -> Result<Decimal> {
        let (mut mantissa, mut exponent) = (self.mantissa, self.exponent);
        while exponent < -MAX_DECIMAL_SCALE && mantissa % 10 == 0 {
            if mantissa == 0 {
                return Ok(Decimal::ZERO);
            }
            mantissa /= 10;
            exponent += 1;
        }

        if exponent <= 0 {
            return Decimal::try_from_i128_with_scale(mantissa, exponent.unsigned_abs())
                .map_err(|err| ZubrError::InvalidDecimal(format!("{self:?}: {err}")));
        }

        let mut value = Decimal::try_from_i128_with_scale(mantissa, 0)
            .map_err(|err| ZubrError::InvalidDecimal(format!("{self:?}: {err}")))?;
        if value.is_zero() {
            return Ok(Decimal::ZERO);
        }
        for _ in 0..exponent {
            value = value
                .checked_mul(Decimal::TEN)
                .ok_or_else(|| ZubrError::InvalidDecimal(format!("{self:?}: out of range")))?;
        }
        Ok(value)
    }

    /// Plain decimal string keeping the native scale: `{150, -2}` renders as `1.50`
    pub fn to_canonical_string(&self) -> Result<String> {
        if self.mantissa == 0 && self.exponent >= 0 {
            return Ok("0".to_string());
        }
        if self.exponent.unsigned_abs() > MAX_RENDERED_EXPONENT {
            return Err(ZubrError::InvalidDecimal(format!(
                "{self:?}: exponent beyond {MAX_RENDERED_EXPONENT}"
            )));
        }

        let digits = self.mantissa.unsigned_abs().to_string();
        let sign = if self.mantissa < 0 { "-" } else { "" };
        if self.exponent >= 0 {
            let zeros = "0".repeat(self.exponent.unsigned_abs() as usize);
            return Ok(format!("{sign}{digits}{zeros}"));
        }

        let scale = self.exponent.unsigned_abs() as usize;
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        Ok(format!("{sign}{int_part}.{frac_part}"))
    }

    /// Recognize a JSON object holding exactly an integer `mantissa` and `exponent`.
    ///
    /// Integers that do not fit the wire types are an error rather than a passthrough.
    pub fn from_map(map: &Map<String, Value>) -> Result<Option<Self>> {
        if map.len() != 2 {
            return Ok(None);
        }
        let (Some(mantissa), Some(exponent)) = (
            map.get("mantissa").and_then(integer_literal),
            map.get("exponent").and_then(integer_literal),
        ) else {
            return Ok(None);
        };

        let mantissa = mantissa.parse::<i128>().map_err(|_| {
            ZubrError::InvalidDecimal(format!("mantissa {mantissa} out of range"))
        })?;
        let exponent = exponent.parse::<i32>().map_err(|_| {
            ZubrError::InvalidDecimal(format!("exponent {exponent} out of range"))
        })?;
        Ok(Some(Self { mantissa, exponent }))
    }
}

impl From<Decimal> for WireDecimal {
    fn from(value: Decimal) -> Self {
        Self {
            mantissa: value.mantissa(),
            exponent: -(value.scale() as i32),
        }
    }
}

/// Source text of a JSON integer, at any magnitude
fn integer_literal(value: &Value) -> Option<&str> {
    let Value::Number(number) = value else {
        return None;
    };
    let text = number.as_str();
    let digits = text.strip_prefix('-').unwrap_or(text);
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(text)
}

/// Inputs accepted wherever the exchange expects a decimal
pub trait IntoWireDecimal {
    fn into_wire_decimal(self) -> Result<WireDecimal>;
}

impl IntoWireDecimal for WireDecimal {
    fn into_wire_decimal(self) -> Result<WireDecimal> {
        Ok(self)
    }
}

impl IntoWireDecimal for Decimal {
    fn into_wire_decimal(self) -> Result<WireDecimal> {
        Ok(WireDecimal::from(self))
    }
}

impl IntoWireDecimal for &str {
    fn into_wire_decimal(self) -> Result<WireDecimal> {
        WireDecimal::parse(self)
    }
}

impl IntoWireDecimal for String {
    fn into_wire_decimal(self) -> Result<WireDecimal> {
        WireDecimal::parse(&self)
    }
}

macro_rules! impl_into_wire_decimal_for_int {
    ($($ty:ty),*) => {
        $(
            impl IntoWireDecimal for $ty {
                fn into_wire_decimal(self) -> Result<WireDecimal> {
                    Ok(WireDecimal {
                        mantissa: i128::from(self),
                        exponent: 0,
                    })
                }
            }
        )*
    };
}

impl_into_wire_decimal_for_int!(i32, i64, u32, u64);

/// Rewrite every `{mantissa, exponent}` object in an inbound tree into its decimal string.
///
/// Consumes the tree and returns a new one; other objects and arrays are walked recursively
/// and scalars pass through unchanged.
pub fn rewrite(value: Value) -> Result<Value> {
    match value {
        Value::Object(map) => {
            if let Some(wire) = WireDecimal::from_map(&map)? {
                return wire.to_canonical_string().map(Value::String);
            }
            map.into_iter()
                .map(|(key, child)| rewrite(child).map(|child| (key, child)))
                .collect::<Result<Map<String, Value>>>()
                .map(Value::Object)
        }
        Value::Array(items) => items
            .into_iter()
            .map(rewrite)
            .collect::<Result<Vec<Value>>>()
            .map(Value::Array),
        scalar => Ok(scalar),
    }
}
