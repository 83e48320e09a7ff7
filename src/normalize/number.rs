use regex::Regex;
use std::sync::OnceLock;

/// A parsed quantity. Whole values come back as `Integer`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Decimal(f64),
}

impl Numeric {
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Integer(n) => n as f64,
            Numeric::Decimal(x) => x,
        }
    }

    /// Non-negative whole numbers only (room and garage counts).
    pub fn as_count(self) -> Option<u32> {
        match self {
            Numeric::Integer(n) => u32::try_from(n).ok(),
            Numeric::Decimal(_) => None,
        }
    }
}

fn unit_suffix() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\s*(kwh\s*/\s*m[2²]|kwh\s+per\s+m[2²]|square\s+met(?:er|re)s?|sq\.?\s*m|sqm|m[2²])",
        )
        .ok()
    })
    .as_ref()
}

fn number_token() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-+]?\d[\d.,]*").ok()).as_ref()
}

/// Parse a locale-formatted quantity such as `"1.234,56"`, `"1,234"` or `"150 m²"`.
///
/// Separator rules:
/// - both `.` and `,`: the one appearing last is the decimal point
/// - one kind repeated: thousands separators, all stripped
/// - a single separator followed by exactly three digits: thousands separator
/// - otherwise a single `,` is the decimal point, a single `.` stays as is
///
/// Returns `None` for anything without a usable number.
pub fn parse_number(text: &str) -> Option<Numeric> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let without_units = unit_suffix()?.replace_all(text, "");
    let token = number_token()?.find(&without_units)?.as_str();

    let dots = token.matches('.').count();
    let commas = token.matches(',').count();

    let mut digits = match (dots, commas) {
        (d, c) if d > 0 && c > 0 => {
            let last_comma = token.rfind(',');
            let last_dot = token.rfind('.');
            if last_comma > last_dot {
                token.replace('.', "").replace(',', ".")
            } else {
                token.replace(',', "")
            }
        }
        (0, c) if c > 0 => single_separator(token, ','),
        (d, 0) if d > 0 => single_separator(token, '.'),
        _ => token.to_string(),
    };

    digits.retain(|c| c.is_ascii_digit() || c == '.' || c == '-');
    if digits.is_empty() || matches!(digits.as_str(), "." | "-" | "-.") {
        return None;
    }
    if digits.matches('.').count() > 1 {
        return None;
    }

    let value: f64 = digits.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(Numeric::Integer(value as i64))
    } else {
        Some(Numeric::Decimal(value))
    }
}

fn single_separator(token: &str, sep: char) -> String {
    if token.matches(sep).count() > 1 {
        return token.replace(sep, "");
    }

    let parts: Vec<&str> = token.split(sep).collect();
    let thousands_group =
        parts.len() == 2 && parts[1].len() == 3 && parts[1].chars().all(|c| c.is_ascii_digit());

    if thousands_group {
        token.replace(sep, "")
    } else if sep == ',' {
        token.replace(',', ".")
    } else {
        token.to_string()
    }
}

/// Asking prices as the site prints them: `€ 350.000` or `€ 1.250.000,50`.
/// Dots group thousands and a comma marks cents.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '€' && !c.is_whitespace() && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// Construction year: keep the digits, accept only four of them.
pub fn parse_year(text: &str) -> Option<i32> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits
        .parse::<i32>()
        .ok()
        .filter(|y| (1000..=9999).contains(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_separators_use_the_last_one_as_decimal() {
        assert_eq!(parse_number("1.234,56"), Some(Numeric::Decimal(1234.56)));
        assert_eq!(parse_number("1,234.56"), Some(Numeric::Decimal(1234.56)));
        assert_eq!(parse_number("1.234.567,00"), Some(Numeric::Integer(1234567)));
    }

    #[test]
    fn single_comma_is_thousands_only_before_three_digits() {
        assert_eq!(parse_number("1,234"), Some(Numeric::Integer(1234)));
        assert_eq!(parse_number("1,25"), Some(Numeric::Decimal(1.25)));
        assert_eq!(parse_number("1,2345"), Some(Numeric::Decimal(1.2345)));
        assert_eq!(parse_number("1,234,567"), Some(Numeric::Integer(1234567)));
    }

    #[test]
    fn single_dot_mirrors_the_comma_rule() {
        assert_eq!(parse_number("1.234"), Some(Numeric::Integer(1234)));
        assert_eq!(parse_number("1.5"), Some(Numeric::Decimal(1.5)));
        assert_eq!(parse_number("2.000.000"), Some(Numeric::Integer(2000000)));
    }

    #[test]
    fn units_are_stripped() {
        assert_eq!(parse_number("150 m²"), Some(Numeric::Integer(150)));
        assert_eq!(parse_number("85,5 m2"), Some(Numeric::Decimal(85.5)));
        assert_eq!(parse_number("245 kWh/m²"), Some(Numeric::Integer(245)));
        assert_eq!(parse_number("1.200 SQM"), Some(Numeric::Integer(1200)));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("m²"), None);
    }

    #[test]
    fn counts_reject_fractions_and_negatives() {
        assert_eq!(parse_number("3").and_then(Numeric::as_count), Some(3));
        assert_eq!(parse_number("2,5").and_then(Numeric::as_count), None);
        assert_eq!(parse_number("-1").and_then(Numeric::as_count), None);
    }

    #[test]
    fn prices_follow_site_format() {
        assert_eq!(parse_price("€ 350.000"), Some(350000.0));
        assert_eq!(parse_price("€ 1.250.000,50"), Some(1250000.5));
        assert_eq!(parse_price("Prijs op aanvraag"), None);
        assert_eq!(parse_price("-5"), None);
    }

    #[test]
    fn years_need_four_digits() {
        assert_eq!(parse_year("1995"), Some(1995));
        assert_eq!(parse_year("ca. 2010"), Some(2010));
        assert_eq!(parse_year("95"), None);
        assert_eq!(parse_year("onbekend"), None);
    }
}
