use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Plain digits, or digits grouped in threes with `'` (or `’`), followed by
/// an optional fractional part.
static CHF_AMOUNT: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^-?(?:\d{1,3}(?:['’]\d{3})+|\d+)(?:\.\d+)?$"));

/// Error returned when a string cannot be parsed as a CHF amount.
#[derive(Debug, Error)]
pub enum ParseAmountError {
    #[error("invalid amount '{0}', expected e.g. 100'000 or 1234.50")]
    Format(String),

    #[error("invalid amount '{input}': {source}")]
    Decimal {
        input: String,
        #[source]
        source: rust_decimal::Error,
    },

    #[error("amount pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}

/// Trims whitespace and an optional `CHF` prefix.
fn normalize_amount_input(s: &str) -> &str {
    let trimmed = s.trim();
    trimmed
        .strip_prefix("CHF")
        .map(str::trim_start)
        .unwrap_or(trimmed)
}

/// Parses a Swiss-formatted amount into a [`Decimal`].
///
/// Accepts `'` as thousands separator (`"100'000"`, `"1'234.50"`) and an
/// optional `CHF` prefix. Empty or whitespace-only input is treated as 0.
pub fn parse_chf(s: &str) -> Result<Decimal, ParseAmountError> {
    let normalized = normalize_amount_input(s);
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }

    let pattern = CHF_AMOUNT.as_ref().map_err(|e| e.clone())?;
    if !pattern.is_match(normalized) {
        tracing::debug!(input = %s, "rejected amount format");
        return Err(ParseAmountError::Format(s.to_string()));
    }

    normalized
        .replace(['\'', '’'], "")
        .parse()
        .map_err(|source| ParseAmountError::Decimal {
            input: s.to_string(),
            source,
        })
}

/// Formats an amount with two decimals and `'` between thousands.
pub fn format_chf(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('\'');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{fraction}")
}

/// Formats a percentage with two decimals.
pub fn format_percent(rate: Decimal) -> String {
    let rounded = rate.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2} %")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_chf_accepts_apostrophe_thousands_separator() {
        assert_eq!(parse_chf("100'000").unwrap(), dec!(100000));
        assert_eq!(parse_chf("1'234.50").unwrap(), dec!(1234.50));
        assert_eq!(parse_chf("1’250’000").unwrap(), dec!(1250000));
    }

    #[test]
    fn parse_chf_accepts_plain_digits_and_prefix() {
        assert_eq!(parse_chf("85000").unwrap(), dec!(85000));
        assert_eq!(parse_chf("CHF 7'056").unwrap(), dec!(7056));
        assert_eq!(parse_chf("  123.45  ").unwrap(), dec!(123.45));
    }

    #[test]
    fn parse_chf_empty_treated_as_zero() {
        assert_eq!(parse_chf("").unwrap(), Decimal::ZERO);
        assert_eq!(parse_chf("   ").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn parse_chf_rejects_misplaced_separators() {
        assert!(matches!(parse_chf("12'34"), Err(ParseAmountError::Format(_))));
        assert!(matches!(parse_chf("1,234.56"), Err(ParseAmountError::Format(_))));
        assert!(matches!(parse_chf("abc"), Err(ParseAmountError::Format(_))));
    }

    #[test]
    fn format_chf_groups_thousands() {
        assert_eq!(format_chf(dec!(1234567.891)), "1'234'567.89");
        assert_eq!(format_chf(dec!(100000)), "100'000.00");
        assert_eq!(format_chf(dec!(999.995)), "1'000.00");
        assert_eq!(format_chf(dec!(0)), "0.00");
        assert_eq!(format_chf(dec!(-4944)), "-4'944.00");
    }

    #[test]
    fn format_percent_two_decimals() {
        assert_eq!(format_percent(dec!(10.8607)), "10.86 %");
    }
}
