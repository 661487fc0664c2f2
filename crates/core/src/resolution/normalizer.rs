//! Canonicalization of free-text request fields.
//!
//! City names, payment forms and parcel types are compared on a canonical
//! key: compatibility-decomposed, stripped of combining marks, whitespace
//! collapsed and uppercased. `"  valparaíso "` and `"VALPARAISO"` share a key.

use std::str::FromStr;

use rust_decimal::Decimal;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::domain::tariff::CityCode;
use crate::errors::QuoteError;

/// Returns `None` when nothing but whitespace remains.
pub fn canonical_label(raw: &str) -> Option<String> {
    let folded: String = raw.nfkd().filter(|ch| !is_combining_mark(*ch)).collect();
    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.to_uppercase())
}

pub fn normalize_city(field: &'static str, raw: &str) -> Result<CityCode, QuoteError> {
    CityCode::parse(field, raw)
}

/// Optional filters treat blank input as "not supplied".
pub fn normalize_filter(raw: Option<&str>) -> Option<String> {
    raw.and_then(canonical_label)
}

/// Parses a numeric form field. Accepts `,` as the decimal separator when no
/// `.` is present.
pub fn parse_quantity(field: &'static str, raw: &str) -> Result<Decimal, QuoteError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(QuoteError::invalid_input(field, "value is required"));
    }

    let candidate = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_owned()
    };

    Decimal::from_str(&candidate)
        .map(|value| value.normalize())
        .map_err(|_| QuoteError::invalid_input(field, format!("`{trimmed}` is not a number")))
}

pub fn require_positive(field: &'static str, value: Decimal) -> Result<Decimal, QuoteError> {
    if value <= Decimal::ZERO {
        return Err(QuoteError::invalid_input(field, "must be greater than zero"));
    }
    Ok(value.normalize())
}

pub fn require_non_negative(field: &'static str, value: Decimal) -> Result<Decimal, QuoteError> {
    if value < Decimal::ZERO {
        return Err(QuoteError::invalid_input(field, "must not be negative"));
    }
    Ok(value.normalize())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        canonical_label, normalize_city, normalize_filter, parse_quantity, require_non_negative,
        require_positive,
    };
    use crate::errors::QuoteErrorKind;

    #[test]
    fn mixed_case_and_padding_collapse_to_the_same_key() {
        let origin = normalize_city("origin", "santiago ").expect("origin");
        let destination = normalize_city("destination", " Valparaiso").expect("destination");

        assert_eq!(origin.as_str(), "SANTIAGO");
        assert_eq!(destination.as_str(), "VALPARAISO");
    }

    #[test]
    fn accents_and_inner_whitespace_are_folded() {
        assert_eq!(canonical_label("Valparaíso").as_deref(), Some("VALPARAISO"));
        assert_eq!(canonical_label("concepción").as_deref(), Some("CONCEPCION"));
        assert_eq!(canonical_label("  Punta   Arenas\t").as_deref(), Some("PUNTA ARENAS"));
        assert_eq!(canonical_label("ñuñoa").as_deref(), Some("NUNOA"));
    }

    #[test]
    fn blank_city_is_invalid_input() {
        let error = normalize_city("origin", " \t ").expect_err("blank origin");
        assert_eq!(error.kind(), QuoteErrorKind::InvalidInput);
        assert!(error.to_string().contains("origin"));
    }

    #[test]
    fn blank_filters_are_treated_as_absent() {
        assert_eq!(normalize_filter(Some("  ")), None);
        assert_eq!(normalize_filter(None), None);
        assert_eq!(normalize_filter(Some("por pagar")).as_deref(), Some("POR PAGAR"));
    }

    #[test]
    fn quantities_accept_comma_or_dot_separators() {
        assert_eq!(parse_quantity("weight", "12,5").expect("comma"), Decimal::new(125, 1));
        assert_eq!(parse_quantity("weight", " 12.50 ").expect("dot"), Decimal::new(125, 1));
        assert_eq!(parse_quantity("weight", "3").expect("integer"), Decimal::from(3));
    }

    #[test]
    fn garbage_quantities_are_invalid_input() {
        for raw in ["", "abc", "1,2.3,4", "--1"] {
            let error = parse_quantity("weight", raw).expect_err(raw);
            assert_eq!(error.kind(), QuoteErrorKind::InvalidInput, "input {raw:?}");
        }
    }

    #[test]
    fn sign_checks_reject_out_of_range_values() {
        assert!(require_positive("weight", Decimal::ZERO).is_err());
        assert!(require_positive("weight", Decimal::NEGATIVE_ONE).is_err());
        assert_eq!(require_positive("weight", Decimal::new(300, 2)).expect("ok"), Decimal::from(3));
        assert!(require_non_negative("declared_value", Decimal::ZERO).is_ok());
        assert!(require_non_negative("declared_value", Decimal::new(-1, 2)).is_err());
    }
}
