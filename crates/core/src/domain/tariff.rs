use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{CatalogError, QuoteError};
use crate::resolution::normalizer;

/// Route token that catalogs use to mean "any city".
pub const WILDCARD_CITY: &str = "*";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TariffRuleId(pub String);

impl fmt::Display for TariffRuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical city key. Only obtainable through the normalizer, deserialization included.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CityCode(String);

impl CityCode {
    pub fn parse(field: &'static str, raw: &str) -> Result<Self, QuoteError> {
        normalizer::canonical_label(raw)
            .map(Self)
            .ok_or_else(|| QuoteError::invalid_input(field, "city must not be empty"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CityCode {
    type Error = QuoteError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse("city", &raw)
    }
}

impl From<CityCode> for String {
    fn from(code: CityCode) -> Self {
        code.0
    }
}

impl fmt::Display for CityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    #[default]
    Active,
    Inactive,
}

/// Inclusive weight interval in kilograms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightBand {
    pub from: Decimal,
    pub to: Decimal,
}

impl WeightBand {
    pub fn contains(&self, weight: Decimal) -> bool {
        self.from <= weight && weight <= self.to
    }

    pub fn width(&self) -> Decimal {
        self.to - self.from
    }
}

impl fmt::Display for WeightBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from.normalize(), self.to.normalize())
    }
}

/// Closed validity interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ValidityWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant <= self.to
    }
}

/// Catalog row as supplied by the catalog collaborator, before validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TariffRuleRecord {
    pub id: String,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    pub weight_from: Decimal,
    pub weight_to: Decimal,
    pub service_type: String,
    pub parcel_type: String,
    pub fare_name: String,
    pub delivery_type: String,
    pub price: Decimal,
    #[serde(default)]
    pub payment_forms: Vec<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    #[serde(default)]
    pub status: RuleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated, immutable rate rule. A `None` route side is a wildcard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TariffRuleRecord", into = "TariffRuleRecord")]
pub struct TariffRule {
    id: TariffRuleId,
    origin: Option<CityCode>,
    destination: Option<CityCode>,
    band: WeightBand,
    service_type: String,
    parcel_type: String,
    fare_name: String,
    delivery_type: String,
    price: Decimal,
    payment_forms: BTreeSet<String>,
    validity: ValidityWindow,
    status: RuleStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TariffRule {
    pub fn id(&self) -> &TariffRuleId {
        &self.id
    }

    pub fn origin(&self) -> Option<&CityCode> {
        self.origin.as_ref()
    }

    pub fn destination(&self) -> Option<&CityCode> {
        self.destination.as_ref()
    }

    pub fn band(&self) -> WeightBand {
        self.band
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn parcel_type(&self) -> &str {
        &self.parcel_type
    }

    pub fn fare_name(&self) -> &str {
        &self.fare_name
    }

    pub fn delivery_type(&self) -> &str {
        &self.delivery_type
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn payment_forms(&self) -> &BTreeSet<String> {
        &self.payment_forms
    }

    pub fn validity(&self) -> ValidityWindow {
        self.validity
    }

    pub fn status(&self) -> RuleStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_active_at(&self, instant: DateTime<Utc>) -> bool {
        self.status == RuleStatus::Active && self.validity.contains(instant)
    }

    pub fn serves(&self, origin: &CityCode, destination: &CityCode) -> bool {
        self.origin.as_ref().map_or(true, |code| code == origin)
            && self.destination.as_ref().map_or(true, |code| code == destination)
    }

    /// `payment_form` must already be canonicalized.
    pub fn accepts_payment_form(&self, payment_form: &str) -> bool {
        self.payment_forms.contains(payment_form)
    }

    /// `parcel_type` must already be canonicalized.
    pub fn matches_parcel_type(&self, parcel_type: &str) -> bool {
        normalizer::canonical_label(&self.parcel_type).as_deref() == Some(parcel_type)
    }
}

impl TryFrom<TariffRuleRecord> for TariffRule {
    type Error = CatalogError;

    fn try_from(record: TariffRuleRecord) -> Result<Self, Self::Error> {
        let id = record.id.trim().to_owned();
        if id.is_empty() {
            return Err(CatalogError::InvalidRule {
                id: record.id,
                reason: "rule id must not be empty".to_owned(),
            });
        }
        let invalid = |reason: String| CatalogError::InvalidRule { id: id.clone(), reason };

        let origin = route_side(record.origin.as_deref()).map_err(|_| {
            invalid("origin must be a city name or `*`".to_owned())
        })?;
        let destination = route_side(record.destination.as_deref()).map_err(|_| {
            invalid("destination must be a city name or `*`".to_owned())
        })?;

        if record.weight_from < Decimal::ZERO {
            return Err(invalid(format!("weight_from {} is negative", record.weight_from)));
        }
        if record.weight_to <= Decimal::ZERO {
            return Err(invalid(format!("weight_to {} must be greater than zero", record.weight_to)));
        }
        if record.weight_from > record.weight_to {
            return Err(invalid(format!(
                "weight_from {} exceeds weight_to {}",
                record.weight_from, record.weight_to
            )));
        }
        if record.price < Decimal::ZERO {
            return Err(invalid(format!("price {} is negative", record.price)));
        }
        if record.valid_from > record.valid_to {
            return Err(invalid("valid_from is after valid_to".to_owned()));
        }

        let service_type = required_label(&record.service_type, "service_type").map_err(invalid)?;
        let delivery_type =
            required_label(&record.delivery_type, "delivery_type").map_err(invalid)?;
        let parcel_type = required_label(&record.parcel_type, "parcel_type").map_err(invalid)?;
        let fare_name = required_label(&record.fare_name, "fare_name").map_err(invalid)?;

        let payment_forms =
            record.payment_forms.iter().filter_map(|form| normalizer::canonical_label(form)).collect();

        Ok(Self {
            id: TariffRuleId(id),
            origin,
            destination,
            band: WeightBand { from: record.weight_from, to: record.weight_to },
            service_type,
            parcel_type,
            fare_name,
            delivery_type,
            price: record.price,
            payment_forms,
            validity: ValidityWindow { from: record.valid_from, to: record.valid_to },
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

impl From<TariffRule> for TariffRuleRecord {
    fn from(rule: TariffRule) -> Self {
        Self {
            id: rule.id.0,
            origin: rule.origin.map(|code| code.0),
            destination: rule.destination.map(|code| code.0),
            weight_from: rule.band.from,
            weight_to: rule.band.to,
            service_type: rule.service_type,
            parcel_type: rule.parcel_type,
            fare_name: rule.fare_name,
            delivery_type: rule.delivery_type,
            price: rule.price,
            payment_forms: rule.payment_forms.into_iter().collect(),
            valid_from: rule.validity.from,
            valid_to: rule.validity.to,
            status: rule.status,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

fn route_side(raw: Option<&str>) -> Result<Option<CityCode>, QuoteError> {
    match raw.map(str::trim) {
        None | Some(WILDCARD_CITY) => Ok(None),
        Some(city) => CityCode::parse("route", city).map(Some),
    }
}

fn required_label(raw: &str, field: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{CityCode, RuleStatus, TariffRule, TariffRuleRecord, WeightBand};
    use crate::errors::CatalogError;

    fn record() -> TariffRuleRecord {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        TariffRuleRecord {
            id: "T-100".to_owned(),
            origin: Some(" Santiago".to_owned()),
            destination: Some("valparaíso ".to_owned()),
            weight_from: Decimal::ZERO,
            weight_to: Decimal::from(10),
            service_type: "Normal".to_owned(),
            parcel_type: "Caja".to_owned(),
            fare_name: "Tarifa Pullman Nueva".to_owned(),
            delivery_type: "Domicilio".to_owned(),
            price: Decimal::from(5000),
            payment_forms: vec!["contado".to_owned(), " Por Pagar ".to_owned()],
            valid_from: at,
            valid_to: Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap(),
            status: RuleStatus::Active,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn construction_normalizes_route_and_payment_forms() {
        let rule = TariffRule::try_from(record()).expect("valid rule");

        assert_eq!(rule.origin().map(CityCode::as_str), Some("SANTIAGO"));
        assert_eq!(rule.destination().map(CityCode::as_str), Some("VALPARAISO"));
        assert!(rule.accepts_payment_form("POR PAGAR"));
        assert!(rule.accepts_payment_form("CONTADO"));
        assert!(rule.matches_parcel_type("CAJA"));
        assert_eq!(rule.fare_name(), "Tarifa Pullman Nueva");
    }

    #[test]
    fn star_and_missing_route_sides_are_wildcards() {
        let mut wildcard = record();
        wildcard.origin = Some("*".to_owned());
        wildcard.destination = None;
        let rule = TariffRule::try_from(wildcard).expect("valid rule");

        let origin = CityCode::parse("origin", "Arica").expect("city");
        let destination = CityCode::parse("destination", "Punta Arenas").expect("city");
        assert!(rule.origin().is_none());
        assert!(rule.serves(&origin, &destination));
    }

    #[test]
    fn rejects_inverted_band_negative_price_and_inverted_window() {
        let mut inverted = record();
        inverted.weight_from = Decimal::from(11);
        assert!(matches!(
            TariffRule::try_from(inverted),
            Err(CatalogError::InvalidRule { ref reason, .. }) if reason.contains("exceeds")
        ));

        let mut negative_price = record();
        negative_price.price = Decimal::NEGATIVE_ONE;
        assert!(TariffRule::try_from(negative_price).is_err());

        let mut zero_band = record();
        zero_band.weight_to = Decimal::ZERO;
        assert!(TariffRule::try_from(zero_band).is_err());

        let mut window = record();
        window.valid_to = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(TariffRule::try_from(window).is_err());

        let mut blank_origin = record();
        blank_origin.origin = Some("   ".to_owned());
        assert!(TariffRule::try_from(blank_origin).is_err());
    }

    #[test]
    fn band_bounds_are_inclusive() {
        let band = WeightBand { from: Decimal::from(5), to: Decimal::from(10) };
        assert!(band.contains(Decimal::from(5)));
        assert!(band.contains(Decimal::from(10)));
        assert!(!band.contains(Decimal::new(1001, 2)));
        assert_eq!(band.width(), Decimal::from(5));
        assert_eq!(band.to_string(), "[5, 10]");
    }

    #[test]
    fn inactive_or_expired_rules_are_not_active() {
        let mut inactive = record();
        inactive.status = RuleStatus::Inactive;
        let rule = TariffRule::try_from(inactive).expect("valid rule");
        let mid_year = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        assert!(!rule.is_active_at(mid_year));

        let rule = TariffRule::try_from(record()).expect("valid rule");
        assert!(rule.is_active_at(mid_year));
        assert!(!rule.is_active_at(Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn serde_round_trip_goes_through_validation() {
        let json = serde_json::to_value(TariffRule::try_from(record()).expect("valid"))
            .expect("serialize");
        assert_eq!(json["origin"], "SANTIAGO");

        let mut broken = json.clone();
        broken["weight_from"] = serde_json::json!("20");
        assert!(serde_json::from_value::<TariffRule>(broken).is_err());
        assert!(serde_json::from_value::<TariffRule>(json).is_ok());
    }

    #[test]
    fn deserialized_city_codes_are_canonical() {
        let code: CityCode = serde_json::from_value(serde_json::json!(" valparaíso "))
            .expect("city code");
        assert_eq!(code.as_str(), "VALPARAISO");
        assert_eq!(serde_json::to_value(&code).expect("serialize"), "VALPARAISO");
        assert!(serde_json::from_value::<CityCode>(serde_json::json!("  ")).is_err());
    }
}
