use crate::domain::Address;

/// Placeholder the site prints when the street is withheld.
pub const STREET_UNKNOWN: &str = "Straat niet gekend";

/// Split `"Street Name 12A, 1000 City"` into its parts.
///
/// The house number starts at the first token containing a digit; the number
/// keeps every following token with inner whitespace removed. Postcode and
/// city split on the first space after the comma.
pub fn parse_address(full: &str) -> Address {
    let cleaned = full.split_whitespace().collect::<Vec<_>>().join(" ");

    let (street_part, locality) = match cleaned.split_once(',') {
        Some((street, rest)) => (street, Some(rest)),
        None => (cleaned.as_str(), None),
    };

    let tokens: Vec<&str> = street_part.split_whitespace().collect();
    let boundary = tokens
        .iter()
        .position(|t| t.chars().any(|c| c.is_ascii_digit()))
        .unwrap_or(tokens.len());
    let (name, number) = tokens.split_at(boundary);

    let street = Some(name.join(" "))
        .filter(|s| !s.is_empty() && s != STREET_UNKNOWN);
    let number = Some(number.concat()).filter(|n| !n.is_empty());

    let (postcode, city) = locality.map(split_locality).unwrap_or((None, None));

    Address {
        street,
        number,
        postcode,
        city,
    }
}

fn split_locality(part: &str) -> (Option<String>, Option<String>) {
    let part = part.trim();
    if part.is_empty() {
        return (None, None);
    }
    match part.split_once(' ') {
        Some((postcode, city)) => {
            let city = city.trim();
            (
                Some(postcode.to_string()),
                (!city.is_empty()).then(|| city.to_string()),
            )
        }
        None => (Some(part.to_string()), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn splits_street_number_postcode_city() {
        let a = parse_address("Sample Street 123, 1000 Brussels");
        assert_eq!(a.street, some("Sample Street"));
        assert_eq!(a.number, some("123"));
        assert_eq!(a.postcode, some("1000"));
        assert_eq!(a.city, some("Brussels"));
    }

    #[test]
    fn number_tokens_are_joined_without_spaces() {
        let a = parse_address("Kerkstraat 12 bus 3, 9000 Gent");
        assert_eq!(a.street, some("Kerkstraat"));
        assert_eq!(a.number, some("12bus3"));
    }

    #[test]
    fn newlines_and_runs_of_spaces_collapse() {
        let a = parse_address("Lange\n  Nieuwstraat   7,\n 2000   Antwerpen");
        assert_eq!(a.street, some("Lange Nieuwstraat"));
        assert_eq!(a.number, some("7"));
        assert_eq!(a.postcode, some("2000"));
        assert_eq!(a.city, some("Antwerpen"));
    }

    #[test]
    fn unknown_street_placeholder_is_null() {
        let a = parse_address("Straat niet gekend, 3000 Leuven");
        assert_eq!(a.street, None);
        assert_eq!(a.number, None);
        assert_eq!(a.city, some("Leuven"));
    }

    #[test]
    fn multi_word_city_stays_whole() {
        let a = parse_address("Dorp 1, 8300 Knokke Heist");
        assert_eq!(a.city, some("Knokke Heist"));
    }

    #[test]
    fn missing_comma_keeps_street_only() {
        let a = parse_address("Marktplein 4");
        assert_eq!(a.street, some("Marktplein"));
        assert_eq!(a.number, some("4"));
        assert_eq!(a.postcode, None);
        assert_eq!(a.city, None);
    }
}
