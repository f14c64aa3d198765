use std::fmt;

/// Money is represented as integer cents, so every stored amount is already rounded to
/// two decimal places. $1,250.00 = 125000 cents.
pub type Cents = i64;

/// Format cents as a human-readable amount.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');

    let parts: Vec<&str> = input.split('.').collect();
    let cents = match parts.as_slice() {
        [units] => parse_units(units)? * 100,
        [units, decimals] => {
            let units = if units.is_empty() { 0 } else { parse_units(units)? };
            if !decimals.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseCentsError::InvalidFormat);
            }
            let digits = decimals.as_bytes();
            let decimal_cents = match digits {
                [] => 0,
                [tenths] => i64::from(tenths - b'0') * 10,
                // More than 2 decimal places - round on the third digit
                [tenths, hundredths, rest @ ..] => {
                    let head = i64::from(tenths - b'0') * 10 + i64::from(hundredths - b'0');
                    match rest.first() {
                        Some(third) if *third >= b'5' => head + 1,
                        _ => head,
                    }
                }
            };
            units * 100 + decimal_cents
        }
        _ => return Err(ParseCentsError::InvalidFormat),
    };

    Ok(if negative { -cents } else { cents })
}

fn parse_units(digits: &str) -> Result<i64, ParseCentsError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseCentsError::InvalidFormat);
    }
    digits.parse().map_err(|_| ParseCentsError::InvalidFormat)
}

/// Scale `amount` by `numerator / denominator`, rounding half away from zero to the cent.
///
/// This is the only normalization applied to computed charges.
pub fn prorate(amount: Cents, numerator: i64, denominator: i64) -> Cents {
    if denominator == 0 {
        return 0;
    }
    let product = amount as i128 * numerator as i128;
    let denominator = denominator as i128;
    let quotient = product / denominator;
    let remainder = product % denominator;
    let rounded = if remainder.abs() * 2 >= denominator.abs() {
        quotient + product.signum() * denominator.signum()
    } else {
        quotient
    };
    rounded as Cents
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(125000), "1250.00");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-7500), "-75.00");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("1000.00"), Ok(100000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-75"), Ok(-7500));
        assert_eq!(parse_cents("33.335"), Ok(3334));
        assert_eq!(parse_cents("33.334"), Ok(3333));
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("12.34.56").is_err());
        assert!(parse_cents("").is_err());
        assert!(parse_cents("1.x").is_err());
    }

    #[test]
    fn test_parse_cents_rejects_non_ascii_fraction() {
        assert_eq!(parse_cents("12.3é"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("12.é"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("12.34٥"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("1é.00"), Err(ParseCentsError::InvalidFormat));
    }

    #[test]
    fn test_prorate_rounds_half_away_from_zero() {
        // 1000.00 for 10 of 31 days = 322.580.. -> 322.58
        assert_eq!(prorate(100000, 10, 31), 32258);
        // 0.05 * 1/2 = 0.025 -> 0.03
        assert_eq!(prorate(5, 1, 2), 3);
        assert_eq!(prorate(-5, 1, 2), -3);
        assert_eq!(prorate(100000, 31, 31), 100000);
        assert_eq!(prorate(100000, 3, 0), 0);
    }
}
