//! Commitment (promised delivery) dates.
//!
//! The offset table and business calendar are policy data supplied from
//! outside the engine. This module only looks up the business-day offset for
//! a `(service type, delivery type)` pair and walks the calendar forward from
//! the evaluation instant, keeping its time of day.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::{CatalogError, QuoteError};
use crate::resolution::normalizer;

/// A run of non-business days this long means the calendar is broken.
const MAX_CALENDAR_SCAN_DAYS: u32 = 3660;

pub trait CommitmentPolicy: Send + Sync {
    /// Business days promised for the pair, or `None` when not configured.
    fn offset_for(&self, service_type: &str, delivery_type: &str) -> Option<u32>;

    fn is_business_day(&self, date: NaiveDate) -> bool;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessCalendar {
    #[serde(default)]
    pub skip_weekends: bool,
    #[serde(default)]
    pub holidays: BTreeSet<NaiveDate>,
}

impl BusinessCalendar {
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        if self.skip_weekends && matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        !self.holidays.contains(&date)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentOffset {
    pub service_type: String,
    pub delivery_type: String,
    pub business_days: u32,
}

/// In-memory offset table keyed by canonical service and delivery labels.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitmentTable {
    offsets: BTreeMap<(String, String), u32>,
    calendar: BusinessCalendar,
}

impl CommitmentTable {
    pub fn new(calendar: BusinessCalendar) -> Self {
        Self { offsets: BTreeMap::new(), calendar }
    }

    pub fn from_entries(
        calendar: BusinessCalendar,
        entries: impl IntoIterator<Item = CommitmentOffset>,
    ) -> Result<Self, CatalogError> {
        let mut table = Self::new(calendar);
        for entry in entries {
            let key = policy_key(&entry.service_type, &entry.delivery_type).ok_or_else(|| {
                CatalogError::InvalidPolicy(
                    "offset entries need a service_type and a delivery_type".to_owned(),
                )
            })?;
            if table.offsets.insert(key.clone(), entry.business_days).is_some() {
                return Err(CatalogError::InvalidPolicy(format!(
                    "duplicate offset for {}/{}",
                    key.0, key.1
                )));
            }
        }
        Ok(table)
    }

    /// Adds or replaces an entry. Blank labels are ignored.
    pub fn with_offset(mut self, service_type: &str, delivery_type: &str, days: u32) -> Self {
        if let Some(key) = policy_key(service_type, delivery_type) {
            self.offsets.insert(key, days);
        }
        self
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

impl CommitmentPolicy for CommitmentTable {
    fn offset_for(&self, service_type: &str, delivery_type: &str) -> Option<u32> {
        policy_key(service_type, delivery_type).and_then(|key| self.offsets.get(&key).copied())
    }

    fn is_business_day(&self, date: NaiveDate) -> bool {
        self.calendar.is_business_day(date)
    }
}

fn policy_key(service_type: &str, delivery_type: &str) -> Option<(String, String)> {
    Some((normalizer::canonical_label(service_type)?, normalizer::canonical_label(delivery_type)?))
}

pub fn commitment_date<P>(
    policy: &P,
    service_type: &str,
    delivery_type: &str,
    evaluated_at: DateTime<Utc>,
) -> Result<DateTime<Utc>, QuoteError>
where
    P: CommitmentPolicy + ?Sized,
{
    let not_configured = |reason: &str| QuoteError::PolicyNotConfigured {
        service_type: service_type.to_owned(),
        delivery_type: delivery_type.to_owned(),
        reason: reason.to_owned(),
    };

    let mut remaining = policy
        .offset_for(service_type, delivery_type)
        .ok_or_else(|| not_configured("no offset entry"))?;

    let time_of_day = evaluated_at.time();
    let mut date = evaluated_at.date_naive();
    let mut scanned = 0;

    while remaining > 0 {
        if scanned == MAX_CALENDAR_SCAN_DAYS {
            return Err(not_configured("calendar has no business days ahead"));
        }
        date = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| not_configured("commitment date is out of range"))?;
        scanned += 1;
        if policy.is_business_day(date) {
            remaining -= 1;
            scanned = 0;
        }
    }

    Ok(Utc.from_utc_datetime(&date.and_time(time_of_day)))
}
