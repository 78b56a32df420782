//! Shared helpers for command handlers.

use std::io::IsTerminal;

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::error::CliError;

/// Parse a decimal amount ("1500", "-12.5", "99.99") into minor units.
pub fn parse_amount(field: &str, raw: &str) -> Result<i64, CliError> {
    let invalid = |reason: &str| CliError::Validation {
        field: field.into(),
        reason: format!("{reason}: '{raw}'"),
    };

    let trimmed = raw.trim().replace('_', "");
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("expected an amount"));
    }
    if fraction.len() > 2 {
        return Err(invalid("at most two decimal places"));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("expected digits"));
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("amount too large"))?
    };
    let cents: i64 = format!("{fraction:0<2}")
        .parse()
        .map_err(|_| invalid("expected digits"))?;
    let minor = whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(cents))
        .ok_or_else(|| invalid("amount too large"))?;
    Ok(if negative { -minor } else { minor })
}

pub fn parse_positive_amount(field: &str, raw: &str) -> Result<i64, CliError> {
    let amount = parse_amount(field, raw)?;
    if amount <= 0 {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(amount)
}

/// Render minor units as `1,234.50 HTG`.
pub fn format_amount(minor: i64, currency: &str) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let whole = (abs / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}.{:02} {currency}", abs % 100)
}

pub fn parse_timestamp(raw: Option<&str>) -> Result<DateTime<Utc>, CliError> {
    raw.map_or_else(
        || Ok(Utc::now()),
        |raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| CliError::Validation {
                    field: "at".into(),
                    reason: e.to_string(),
                })
        },
    )
}

/// Serialized name of a unit enum (`mobile_money`).
pub fn wire_name<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::new(),
    }
}

/// Password from `env`, or an interactive prompt.
pub fn read_password(env: &str) -> Result<SecretString, CliError> {
    if let Ok(password) = std::env::var(env) {
        if !password.is_empty() {
            return Ok(SecretString::from(password));
        }
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NoPassword { env: env.into() });
    }
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        return Err(CliError::NoPassword { env: env.into() });
    }
    Ok(SecretString::from(password))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn amounts_parse_to_minor_units() {
        assert_eq!(parse_amount("amount", "1500").unwrap(), 150_000);
        assert_eq!(parse_amount("amount", "12.5").unwrap(), 1250);
        assert_eq!(parse_amount("amount", "-0.75").unwrap(), -75);
        assert_eq!(parse_amount("amount", ".5").unwrap(), 50);
        assert_eq!(parse_amount("amount", "1_000").unwrap(), 100_000);
    }

    #[test]
    fn malformed_amounts_are_rejected() {
        for raw in ["", "-", "abc", "1.234", "1.2.3", "12e3"] {
            assert!(parse_amount("amount", raw).is_err(), "{raw}");
        }
        assert!(parse_positive_amount("amount", "0").is_err());
    }

    #[test]
    fn amounts_format_with_grouping() {
        assert_eq!(format_amount(123_456_789, "HTG"), "1,234,567.89 HTG");
        assert_eq!(format_amount(-50, "USD"), "-0.50 USD");
        assert_eq!(format_amount(100_000, "HTG"), "1,000.00 HTG");
    }
}
