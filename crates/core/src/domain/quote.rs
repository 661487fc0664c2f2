use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::tariff::{CityCode, TariffRuleId, WeightBand};
use crate::flows::ResolutionTrace;

/// Parcel measurements in centimeters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_cm: Decimal,
    pub width_cm: Decimal,
    pub height_cm: Decimal,
}

impl Dimensions {
    pub fn new(length_cm: Decimal, width_cm: Decimal, height_cm: Decimal) -> Self {
        Self { length_cm, width_cm, height_cm }
    }

    pub fn all_positive(&self) -> bool {
        self.length_cm > Decimal::ZERO
            && self.width_cm > Decimal::ZERO
            && self.height_cm > Decimal::ZERO
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub origin: String,
    pub destination: String,
    pub weight_kg: Decimal,
    pub dimensions: Option<Dimensions>,
    pub declared_value: Option<Decimal>,
    pub payment_form: Option<String>,
    pub parcel_type: Option<String>,
    /// Defaults to the moment resolution starts.
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl QuoteRequest {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        weight_kg: Decimal,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            weight_kg,
            dimensions: None,
            declared_value: None,
            payment_form: None,
            parcel_type: None,
            evaluated_at: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_declared_value(mut self, declared_value: Decimal) -> Self {
        self.declared_value = Some(declared_value);
        self
    }

    pub fn with_payment_form(mut self, payment_form: impl Into<String>) -> Self {
        self.payment_form = Some(payment_form.into());
        self
    }

    pub fn with_parcel_type(mut self, parcel_type: impl Into<String>) -> Self {
        self.parcel_type = Some(parcel_type.into());
        self
    }

    pub fn evaluated_at(mut self, instant: DateTime<Utc>) -> Self {
        self.evaluated_at = Some(instant);
        self
    }
}

/// Route and weight facts the rule was matched on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteMatch {
    pub origin: CityCode,
    pub destination: CityCode,
    pub requested_weight: Decimal,
    pub volumetric_weight: Decimal,
    pub billable_weight: Decimal,
    pub bucket: WeightBand,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePricing {
    pub price: Decimal,
    pub currency: String,
    pub service_type: String,
    pub delivery_type: String,
    pub fare_name: String,
    pub parcel_type: String,
    pub payment_forms: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub rule_id: TariffRuleId,
    pub catalog_version: String,
    pub evaluated_at: DateTime<Utc>,
    #[serde(rename = "match")]
    pub matched: QuoteMatch,
    pub pricing: QuotePricing,
    pub commitment_date: DateTime<Utc>,
    pub declared_value: Option<Decimal>,
    pub trace: ResolutionTrace,
}
