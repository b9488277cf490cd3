//! Decimal helpers shared by the RPC and subgraph models
//!
//! RenVM and the subgraph send numbers either as JSON strings or as JSON
//! numbers, sometimes both for the same field across versions. Everything
//! is parsed into `BigDecimal` at the boundary so a malformed value fails
//! deserialization instead of leaking into the aggregation code.

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::{de, Deserialize, Deserializer, Serializer};
use serde_json::Value;
use std::str::FromStr;

/// Parse a string or number JSON value into a decimal
pub fn parse_value(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

pub fn deserialize_decimal<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_value(&value)
        .ok_or_else(|| de::Error::custom(format!("expected a numeric value, got {}", value)))
}

/// Missing and `null` both deserialize to zero
pub fn deserialize_decimal_or_zero<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(BigDecimal::zero()),
        Some(value) => parse_value(&value)
            .ok_or_else(|| de::Error::custom(format!("expected a numeric value, got {}", value))),
    }
}

pub fn deserialize_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_decimal(deserializer)?;
    value
        .to_u64()
        .ok_or_else(|| de::Error::custom(format!("expected an unsigned integer, got {}", value)))
}

pub fn deserialize_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_value(&value)
            .and_then(|d| d.to_u64())
            .map(Some)
            .ok_or_else(|| {
                de::Error::custom(format!("expected an unsigned integer, got {}", value))
            }),
    }
}

/// Claimed-epoch counters: `0`, `""` and anything unparsable mean "never
/// claimed" and come out as `None`
pub fn deserialize_claimed_epoch<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(parse_value)
        .and_then(|d| d.to_u64())
        .filter(|epoch| *epoch != 0))
}

pub fn deserialize_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_decimal(deserializer)?;
    value
        .to_i64()
        .ok_or_else(|| de::Error::custom(format!("expected an integer, got {}", value)))
}

pub fn serialize_decimal<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

/// `10^-decimals`, exact
fn unit_scale(decimals: u32) -> BigDecimal {
    BigDecimal::from_str(&format!("1e-{}", decimals)).unwrap_or_else(|_| BigDecimal::from(1))
}

/// Scale a base-unit amount down to standard units (e.g. satoshis to BTC)
pub fn to_standard_amount(amount: &BigDecimal, decimals: u32) -> BigDecimal {
    if decimals == 0 {
        return amount.clone();
    }
    amount.clone() * unit_scale(decimals)
}

/// Format a decimal for terminal output, trimmed to `places` fractional digits
pub fn display(value: &BigDecimal, places: i64) -> String {
    let fixed = value.with_scale(places).to_string();
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "deserialize_decimal")]
        amount: BigDecimal,
        #[serde(deserialize_with = "deserialize_u64")]
        count: u64,
        #[serde(default, deserialize_with = "deserialize_decimal_or_zero")]
        extra: BigDecimal,
    }

    #[test]
    fn test_accepts_strings_and_numbers() {
        let a: Sample = serde_json::from_value(serde_json::json!({
            "amount": "123456789012345678901234567890",
            "count": 4
        }))
        .unwrap();
        assert_eq!(
            a.amount,
            BigDecimal::from_str("123456789012345678901234567890").unwrap()
        );
        assert_eq!(a.count, 4);
        assert!(a.extra.is_zero());

        let b: Sample = serde_json::from_value(serde_json::json!({
            "amount": 12.5,
            "count": "7",
            "extra": null
        }))
        .unwrap();
        assert_eq!(b.amount, BigDecimal::from_str("12.5").unwrap());
        assert_eq!(b.count, 7);
    }

    #[test]
    fn test_rejects_malformed_numbers() {
        let result: Result<Sample, _> = serde_json::from_value(serde_json::json!({
            "amount": "12abc",
            "count": 1
        }));
        assert!(result.is_err());
    }

    #[derive(Deserialize)]
    struct Claim {
        #[serde(default, deserialize_with = "deserialize_claimed_epoch")]
        last: Option<u64>,
    }

    #[test]
    fn test_claimed_epoch_collapses_falsy_values() {
        let parse = |value: serde_json::Value| {
            serde_json::from_value::<Claim>(serde_json::json!({ "last": value }))
                .unwrap()
                .last
        };
        assert_eq!(parse(serde_json::json!("")), None);
        assert_eq!(parse(serde_json::json!("n/a")), None);
        assert_eq!(parse(serde_json::json!(0)), None);
        assert_eq!(parse(serde_json::json!("0")), None);
        assert_eq!(parse(serde_json::Value::Null), None);
        assert_eq!(parse(serde_json::json!("7")), Some(7));
        assert_eq!(parse(serde_json::json!(9)), Some(9));
    }

    #[test]
    fn test_to_standard_amount() {
        let sats = BigDecimal::from(150_000_000);
        assert_eq!(to_standard_amount(&sats, 8), BigDecimal::from_str("1.5").unwrap());
        assert_eq!(to_standard_amount(&sats, 0), sats);
    }

    #[test]
    fn test_display_trims_zeros() {
        assert_eq!(display(&BigDecimal::from_str("1.50000").unwrap(), 4), "1.5");
        assert_eq!(display(&BigDecimal::from_str("2.123456").unwrap(), 2), "2.12");
        assert_eq!(display(&BigDecimal::from(3), 2), "3");
    }
}
