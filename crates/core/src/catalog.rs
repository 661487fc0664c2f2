use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::tariff::{CityCode, TariffRule, TariffRuleId, TariffRuleRecord};
use crate::errors::CatalogError;

pub const DEFAULT_CURRENCY: &str = "CLP";

/// Immutable point-in-time view of the rule catalog. Cloning shares the rule
/// storage.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogSnapshot {
    version: String,
    currency: String,
    rules: Arc<[TariffRule]>,
}

impl CatalogSnapshot {
    pub fn new(
        version: impl Into<String>,
        currency: impl Into<String>,
        rules: Vec<TariffRule>,
    ) -> Result<Self, CatalogError> {
        let currency = currency.into().trim().to_ascii_uppercase();
        if currency.is_empty() {
            return Err(CatalogError::InvalidSnapshot("currency must not be empty".to_owned()));
        }

        let mut seen = HashSet::with_capacity(rules.len());
        for rule in &rules {
            if !seen.insert(rule.id()) {
                return Err(CatalogError::DuplicateRuleId(rule.id().0.clone()));
            }
        }

        Ok(Self { version: version.into(), currency, rules: rules.into() })
    }

    pub fn from_records(
        version: impl Into<String>,
        currency: impl Into<String>,
        records: impl IntoIterator<Item = TariffRuleRecord>,
    ) -> Result<Self, CatalogError> {
        let rules = records.into_iter().map(TariffRule::try_from).collect::<Result<Vec<_>, _>>()?;
        Self::new(version, currency, rules)
    }

    pub fn empty() -> Self {
        Self {
            version: "empty".to_owned(),
            currency: DEFAULT_CURRENCY.to_owned(),
            rules: Vec::new().into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn rules(&self) -> &[TariffRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn find(&self, id: &TariffRuleId) -> Option<&TariffRule> {
        self.rules.iter().find(|rule| rule.id() == id)
    }

    /// Distinct routes with at least one rule active at `instant`, sorted.
    pub fn routes_active_at(&self, instant: DateTime<Utc>) -> Vec<RouteSummary> {
        let mut routes: BTreeMap<(Option<CityCode>, Option<CityCode>), usize> = BTreeMap::new();
        for rule in self.rules.iter().filter(|rule| rule.is_active_at(instant)) {
            *routes
                .entry((rule.origin().cloned(), rule.destination().cloned()))
                .or_default() += 1;
        }

        routes
            .into_iter()
            .map(|((origin, destination), rule_count)| RouteSummary {
                origin,
                destination,
                rule_count,
            })
            .collect()
    }
}

/// `None` on either side is a wildcard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub origin: Option<CityCode>,
    pub destination: Option<CityCode>,
    pub rule_count: usize,
}

pub trait CatalogProvider: Send + Sync {
    /// The snapshot to use for one whole resolution call.
    fn current_snapshot(&self) -> Arc<CatalogSnapshot>;
}

impl CatalogProvider for Arc<CatalogSnapshot> {
    fn current_snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(self)
    }
}

/// Process-wide catalog reference that the refresh side swaps atomically.
#[derive(Debug)]
pub struct SharedCatalog {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl SharedCatalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self { current: RwLock::new(Arc::new(snapshot)) }
    }

    /// Installs `snapshot` and returns the one it replaced. Resolutions that
    /// already hold the previous snapshot keep using it.
    pub fn swap(&self, snapshot: CatalogSnapshot) -> Arc<CatalogSnapshot> {
        let next = Arc::new(snapshot);
        let previous = match self.current.write() {
            Ok(mut current) => std::mem::replace(&mut *current, Arc::clone(&next)),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), Arc::clone(&next)),
        };

        tracing::info!(
            event_name = "catalog.snapshot.swapped",
            previous_version = previous.version(),
            version = next.version(),
            rule_count = next.len(),
            "catalog snapshot replaced"
        );
        previous
    }
}

impl Default for SharedCatalog {
    fn default() -> Self {
        Self::new(CatalogSnapshot::empty())
    }
}

impl CatalogProvider for SharedCatalog {
    fn current_snapshot(&self) -> Arc<CatalogSnapshot> {
        match self.current.read() {
            Ok(current) => Arc::clone(&current),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}
