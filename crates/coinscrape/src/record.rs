//! Normalization of scraped price text into typed records.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{ScrapeError, ScrapeResult};
use crate::types::PriceRecord;

/// Characters removed before parsing: currency symbols, thousands separators,
/// and the spaces pages use around them.
const FORMATTING_CHARS: &[char] = &[
    '$', '€', '£', '¥', ',', ' ', '\t', '\n', '\r', '\u{00A0}', '\u{202F}',
];

/// Build a [`PriceRecord`] from raw price text such as `"$12,345.67"`.
///
/// Fails with [`ScrapeError::ParseError`] unless the text, once formatting
/// characters are stripped, is a plain positive decimal (digits with an
/// optional fractional part).
pub fn normalize(
    raw_text: &str,
    timestamp: DateTime<Utc>,
    currency: &str,
    source: &str,
) -> ScrapeResult<PriceRecord> {
    let price = parse_price(raw_text)?;
    Ok(PriceRecord {
        timestamp,
        price,
        currency: currency.to_string(),
        source: source.to_string(),
    })
}

/// Parse the numeric part of a formatted price.
pub fn parse_price(raw_text: &str) -> ScrapeResult<Decimal> {
    let cleaned: String = raw_text
        .chars()
        .filter(|c| !FORMATTING_CHARS.contains(c))
        .collect();

    let fail = |reason: &str| ScrapeError::ParseError {
        raw: raw_text.to_string(),
        reason: reason.to_string(),
    };

    if cleaned.is_empty() {
        return Err(fail("no digits"));
    }

    // Decimal::from_str is more permissive than a displayed price should be
    // (signs, underscores), so check the shape first.
    let mut parts = cleaned.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let frac = parts.next();
    let digits_only = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    let well_formed = match frac {
        Some(frac) => (whole.is_empty() || digits_only(whole)) && digits_only(frac),
        None => digits_only(whole),
    };
    if !well_formed {
        return Err(fail("not a decimal number"));
    }

    let numeric = if whole.is_empty() {
        format!("0{cleaned}")
    } else {
        cleaned.clone()
    };
    let price = Decimal::from_str(&numeric).map_err(|e| fail(&e.to_string()))?;
    if price.is_zero() {
        return Err(fail("price must be positive"));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_normalize_dollar_price() {
        let record = normalize("$12,345.67", ts(), "BTC", "https://example.com/btc").unwrap();
        assert_eq!(record.price, Decimal::new(1234567, 2));
        assert_eq!(record.currency, "BTC");
        assert_eq!(record.source, "https://example.com/btc");
        assert_eq!(record.timestamp, ts());
    }

    #[test]
    fn test_normalize_plain_and_spaced_values() {
        assert_eq!(parse_price("42").unwrap(), Decimal::new(42, 0));
        assert_eq!(parse_price(" $ 3,001.5 ").unwrap(), Decimal::new(30015, 1));
        assert_eq!(parse_price("€1\u{00A0}234.00").unwrap(), Decimal::new(123400, 2));
        assert_eq!(parse_price("$.25").unwrap(), Decimal::new(25, 2));
        assert_eq!(parse_price("$0.000012").unwrap(), Decimal::new(12, 6));
    }

    #[test]
    fn test_normalize_rejects_non_numeric() {
        for raw in ["N/A", "", "free", "   ", "$", "Loading..."] {
            let err = normalize(raw, ts(), "BTC", "src").unwrap_err();
            assert!(
                matches!(err, ScrapeError::ParseError { .. }),
                "{raw:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_normalize_rejects_signs_and_exponents() {
        for raw in ["-5.00", "+5", "1e5", "1.2.3", "12.", "1_000"] {
            assert!(parse_price(raw).is_err(), "{raw:?} should not parse");
        }
    }

    #[test]
    fn test_normalize_rejects_zero() {
        let err = parse_price("$0.00").unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_serialized_column_names() {
        let record = normalize("$1.50", ts(), "SOL", "https://example.com/sol").unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["price"], "1.50");
        assert_eq!(json["currency"], "SOL");
        assert_eq!(json["source"], "https://example.com/sol");
        assert!(json["timestamp"].as_str().unwrap().starts_with("2026-01-02T03:04:05"));
    }
}
