//! Field-level helpers shared by the registry normalisers.

use chrono::NaiveDate;
use serde_json::Value;
use ttb_core::{clean_value, Coordinates, Executive, MAX_EXECUTIVES};

/// Registries disagree on whether numbers come as JSON numbers or strings.
pub(crate) fn scalar_to_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => clean_value(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD`, ignoring anything after the date part.
pub(crate) fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Reads a point from separate lat/lon fields, falling back to a
/// `"lat,lon"` pair string.
pub(crate) fn parse_coordinates(
    lat: Option<&Value>,
    lon: Option<&Value>,
    pair: Option<&str>,
) -> Option<Coordinates> {
    if let (Some(lat), Some(lon)) = (scalar_to_string(lat), scalar_to_string(lon)) {
        if let Some(point) = Coordinates::parse(&lat, &lon) {
            return Some(point);
        }
    }
    let (lat, lon) = pair?.split_once(',')?;
    Coordinates::parse(lat, lon)
}

/// Joins first and last name, either of which may be missing.
pub(crate) fn person_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    match (clean_value(first), clean_value(last)) {
        (Some(f), Some(l)) => Some(format!("{f} {l}")),
        (f, l) => f.or(l),
    }
}

pub(crate) fn executive(
    last_name: Option<&str>,
    first_names: Option<&str>,
    role: Option<&str>,
) -> Option<Executive> {
    Some(Executive {
        last_name: clean_value(last_name)?,
        first_names: clean_value(first_names),
        role: clean_value(role),
    })
}

pub(crate) fn bounded_executives(executives: impl Iterator<Item = Executive>) -> Vec<Executive> {
    executives.take(MAX_EXECUTIVES).collect()
}

/// Keeps the digits of a French postcode, `None` unless exactly five remain.
pub(crate) fn postcode_digits(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (digits.len() == 5).then_some(digits)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn scalar_to_string_handles_numbers_and_strings() {
        assert_eq!(scalar_to_string(Some(&json!(48.5))).as_deref(), Some("48.5"));
        assert_eq!(scalar_to_string(Some(&json!(" 2.3 "))).as_deref(), Some("2.3"));
        assert_eq!(scalar_to_string(Some(&json!(null))), None);
        assert_eq!(scalar_to_string(None), None);
    }

    #[test]
    fn parse_date_accepts_datetime_suffix() {
        let d = parse_date(Some("2015-03-01T00:00:00")).unwrap();
        assert_eq!(d.to_string(), "2015-03-01");
        assert!(parse_date(Some("01/03/2015")).is_none());
    }

    #[test]
    fn coordinates_fall_back_to_pair() {
        let point = parse_coordinates(None, None, Some("45.76,4.83")).unwrap();
        assert!((point.lat - 45.76).abs() < 1e-9);
        let point =
            parse_coordinates(Some(&json!("48.1")), Some(&json!(2.2)), Some("1,1")).unwrap();
        assert!((point.lat - 48.1).abs() < 1e-9);
        assert!(parse_coordinates(None, None, Some("garbage")).is_none());
    }

    #[test]
    fn person_name_joins_available_parts() {
        assert_eq!(person_name(Some("Jean"), Some("DUPONT")).as_deref(), Some("Jean DUPONT"));
        assert_eq!(person_name(Some("[ND]"), Some("DUPONT")).as_deref(), Some("DUPONT"));
        assert_eq!(person_name(None, None), None);
    }

    #[test]
    fn executives_are_bounded() {
        let many = (0..25).filter_map(|i| executive(Some(format!("N{i}").as_str()), None, None));
        assert_eq!(bounded_executives(many).len(), MAX_EXECUTIVES);
    }

    #[test]
    fn postcode_digits_requires_five() {
        assert_eq!(postcode_digits("75 001").as_deref(), Some("75001"));
        assert_eq!(postcode_digits("7500"), None);
    }
}
