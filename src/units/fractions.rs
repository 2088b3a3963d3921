//! Fractional inch sizes ("1/4", "1 3/8", "0.375")

use thiserror::Error;

/// Largest denominator used when printing inch fractions
pub const MAX_FRACTION_DENOMINATOR: u32 = 64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FractionError {
    #[error("empty input")]
    Empty,

    #[error("division by zero in fraction '{0}'")]
    ZeroDenominator(String),

    #[error("cannot parse '{0}' as a fraction or decimal")]
    Invalid(String),
}

/// Parse a fraction, mixed fraction, or decimal into a float
///
/// Accepts `"1/4"`, `"1 1/4"`, `"1-1/4"`, `"0.25"` and `"2"`. Trailing inch marks are ignored.
pub fn parse_fraction(input: &str) -> Result<f64, FractionError> {
    let trimmed = input.trim().trim_end_matches('"').trim();
    if trimmed.is_empty() {
        return Err(FractionError::Empty);
    }

    let invalid = || FractionError::Invalid(input.to_string());

    // Mixed fraction: whole part, separator, then a simple fraction
    let (whole, fraction) = match trimmed.split_once(|c: char| c == ' ' || c == '-') {
        Some((whole, rest)) if rest.contains('/') => {
            let whole: u32 = whole.trim().parse().map_err(|_| invalid())?;
            (whole as f64, rest.trim())
        }
        Some(_) => return Err(invalid()),
        None => (0.0, trimmed),
    };

    match fraction.split_once('/') {
        Some((num, den)) => {
            let num: u32 = num.trim().parse().map_err(|_| invalid())?;
            let den: u32 = den.trim().parse().map_err(|_| invalid())?;
            if den == 0 {
                return Err(FractionError::ZeroDenominator(input.to_string()));
            }
            Ok(whole + num as f64 / den as f64)
        }
        None => {
            let value: f64 = fraction.parse().map_err(|_| invalid())?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(invalid())
            }
        }
    }
}

/// Format a value as an inch fraction when it lands on a simple fraction
///
/// Returns `None` when no denominator up to `max_denominator` represents the
/// value exactly (e.g. 0.123).
pub fn format_fraction(value: f64, max_denominator: u32) -> Option<String> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    // The first denominator that fits is already the reduced form.
    let (numerator, denominator) = (1..=max_denominator.max(1)).find_map(|den| {
        let num = (value * den as f64).round();
        ((num / den as f64 - value).abs() <= 1e-10).then_some((num as u64, den as u64))
    })?;

    let whole = numerator / denominator;
    let remainder = numerator % denominator;

    Some(match (whole, remainder) {
        (w, 0) => w.to_string(),
        (0, r) => format!("{}/{}", r, denominator),
        (w, r) => format!("{} {}/{}", w, r, denominator),
    })
}

/// Common fractional end mill sizes, 1/64" through 1", as (label, inches)
pub fn common_imperial_sizes() -> Vec<(String, f64)> {
    (1..=MAX_FRACTION_DENOMINATOR)
        .filter_map(|sixty_fourths| {
            let inches = sixty_fourths as f64 / MAX_FRACTION_DENOMINATOR as f64;
            format_fraction(inches, MAX_FRACTION_DENOMINATOR).map(|label| (label, inches))
        })
        .collect()
}

/// Display a diameter, showing the fraction for inch sizes when there is one
pub fn format_diameter(diameter: f64, imperial: bool) -> String {
    if !imperial {
        return format!("{:.3}mm", diameter);
    }
    match format_fraction(diameter, MAX_FRACTION_DENOMINATOR) {
        Some(fraction) => format!("{}\" ({:.4}\")", fraction, diameter),
        None => format!("{:.4}\"", diameter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_fraction() {
        assert_eq!(parse_fraction("1/4").unwrap(), 0.25);
        assert_eq!(parse_fraction("3/8").unwrap(), 0.375);
        assert_eq!(parse_fraction(" 1/2\" ").unwrap(), 0.5);
    }

    #[test]
    fn test_parse_mixed_fraction() {
        assert_eq!(parse_fraction("1 1/4").unwrap(), 1.25);
        assert_eq!(parse_fraction("2-3/8").unwrap(), 2.375);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_fraction("0.375").unwrap(), 0.375);
        assert_eq!(parse_fraction("2").unwrap(), 2.0);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_fraction("   "), Err(FractionError::Empty));
        assert!(matches!(
            parse_fraction("1/0"),
            Err(FractionError::ZeroDenominator(_))
        ));
        assert!(matches!(parse_fraction("abc"), Err(FractionError::Invalid(_))));
        assert!(matches!(parse_fraction("1 2"), Err(FractionError::Invalid(_))));
        assert!(matches!(parse_fraction("inf"), Err(FractionError::Invalid(_))));
    }

    #[test]
    fn test_format_fraction() {
        assert_eq!(format_fraction(0.25, 64).as_deref(), Some("1/4"));
        assert_eq!(format_fraction(1.5, 64).as_deref(), Some("1 1/2"));
        assert_eq!(format_fraction(0.015625, 64).as_deref(), Some("1/64"));
        assert_eq!(format_fraction(3.0, 64).as_deref(), Some("3"));
        assert_eq!(format_fraction(0.123, 64), None);
    }

    #[test]
    fn test_common_sizes() {
        let sizes = common_imperial_sizes();
        assert_eq!(sizes.len(), 64);
        assert_eq!(sizes[0].0, "1/64");
        assert_eq!(sizes[15], ("1/4".to_string(), 0.25));
        assert_eq!(sizes[63].0, "1");
    }

    #[test]
    fn test_format_diameter() {
        assert_eq!(format_diameter(0.25, true), "1/4\" (0.2500\")");
        assert_eq!(format_diameter(0.123, true), "0.1230\"");
        assert_eq!(format_diameter(6.35, false), "6.350mm");
    }
}
