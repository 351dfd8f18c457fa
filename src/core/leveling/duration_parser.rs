use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("Duration is empty")]
    Empty,
    #[error("Unknown time unit `{0}`")]
    UnknownUnit(String),
    #[error("Expected a number before `{0}`")]
    MissingNumber(String),
    #[error("Duration is too large")]
    Overflow,
}

/// Parse a human duration such as `90`, `10m`, `1h30m` or `2 days`.
///
/// A bare number is read as seconds. Units may be repeated and combined
/// in any order; whitespace between parts is ignored.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let mut total: u64 = 0;
    let mut chars = compact.chars().peekable();

    while chars.peek().is_some() {
        let mut digits = String::new();
        while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(c);
            chars.next();
        }

        let mut unit = String::new();
        while let Some(c) = chars.peek().copied().filter(|c| c.is_alphabetic()) {
            unit.push(c.to_ascii_lowercase());
            chars.next();
        }

        if digits.is_empty() {
            // Anything that is neither digit nor letter lands here too.
            let rest: String = if unit.is_empty() {
                chars.by_ref().collect()
            } else {
                unit
            };
            return Err(DurationParseError::MissingNumber(rest));
        }

        let amount: u64 = digits.parse().map_err(|_| DurationParseError::Overflow)?;
        let scale = unit_seconds(&unit)?;
        total = amount
            .checked_mul(scale)
            .and_then(|secs| total.checked_add(secs))
            .ok_or(DurationParseError::Overflow)?;
    }

    Ok(Duration::from_secs(total))
}

fn unit_seconds(unit: &str) -> Result<u64, DurationParseError> {
    let seconds = match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 60 * 60,
        "d" | "day" | "days" => 60 * 60 * 24,
        "w" | "wk" | "wks" | "week" | "weeks" => 60 * 60 * 24 * 7,
        other => return Err(DurationParseError::UnknownUnit(other.to_string())),
    };
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_numbers_are_seconds() {
        assert_eq!(parse_duration("90"), Ok(Duration::from_secs(90)));
    }

    #[test]
    fn combined_units() {
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("2 days 4h"), Ok(Duration::from_secs(187_200)));
        assert_eq!(parse_duration("1w"), Ok(Duration::from_secs(604_800)));
        assert_eq!(parse_duration("10M"), Ok(Duration::from_secs(600)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_duration("   "), Err(DurationParseError::Empty));
        assert_eq!(
            parse_duration("5 fortnights"),
            Err(DurationParseError::UnknownUnit("fortnights".into()))
        );
        assert_eq!(
            parse_duration("h"),
            Err(DurationParseError::MissingNumber("h".into()))
        );
        assert_eq!(
            parse_duration("-5"),
            Err(DurationParseError::MissingNumber("-5".into()))
        );
    }
}
