use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::domain::tariff::{CityCode, TariffRule};
use crate::errors::QuoteError;

#[derive(Clone, Copy, Debug)]
pub struct BucketSelection<'s> {
    pub rule: &'s TariffRule,
    /// Number of candidate bands that contained the billable weight.
    pub contenders: usize,
}

/// Total order used when several bands contain the billable weight:
/// narrowest band, then most recently updated, then lowest id.
pub fn precedence(left: &TariffRule, right: &TariffRule) -> Ordering {
    left.band()
        .width()
        .cmp(&right.band().width())
        .then_with(|| right.updated_at().cmp(&left.updated_at()))
        .then_with(|| left.id().cmp(right.id()))
}

pub fn select_bucket<'s>(
    candidates: &[&'s TariffRule],
    billable_weight: Decimal,
    origin: &CityCode,
    destination: &CityCode,
) -> Result<BucketSelection<'s>, QuoteError> {
    let mut contenders =
        candidates.iter().copied().filter(|rule| rule.band().contains(billable_weight));

    let Some(mut best) = contenders.next() else {
        return Err(QuoteError::WeightOutOfRange {
            origin: origin.to_string(),
            destination: destination.to_string(),
            billable_weight,
        });
    };

    let mut count = 1;
    for rule in contenders {
        count += 1;
        if precedence(rule, best) == Ordering::Less {
            best = rule;
        }
    }

    Ok(BucketSelection { rule: best, contenders: count })
}
