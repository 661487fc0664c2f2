use chrono::{DateTime, Utc};

use crate::domain::tariff::{CityCode, TariffRule};
use crate::errors::QuoteError;

/// Route, instant and optional commercial filters. Filters must already be
/// canonicalized.
#[derive(Clone, Debug)]
pub struct CandidateQuery<'a> {
    pub origin: &'a CityCode,
    pub destination: &'a CityCode,
    pub evaluated_at: DateTime<Utc>,
    pub payment_form: Option<&'a str>,
    pub parcel_type: Option<&'a str>,
}

impl CandidateQuery<'_> {
    pub fn admits(&self, rule: &TariffRule) -> bool {
        rule.serves(self.origin, self.destination)
            && rule.is_active_at(self.evaluated_at)
            && self.payment_form.map_or(true, |form| rule.accepts_payment_form(form))
            && self.parcel_type.map_or(true, |parcel| rule.matches_parcel_type(parcel))
    }
}

/// Keeps catalog order. An empty result is `NoRouteAvailable`; weight is not
/// considered here.
pub fn filter_candidates<'s>(
    rules: &'s [TariffRule],
    query: &CandidateQuery<'_>,
) -> Result<Vec<&'s TariffRule>, QuoteError> {
    let candidates: Vec<&TariffRule> = rules.iter().filter(|rule| query.admits(rule)).collect();

    if candidates.is_empty() {
        return Err(QuoteError::NoRouteAvailable {
            origin: query.origin.to_string(),
            destination: query.destination.to_string(),
            evaluated_at: query.evaluated_at,
        });
    }

    Ok(candidates)
}
