//! File-backed catalog and commitment policy sources.
//!
//! Both documents may be TOML or JSON; the format follows the file
//! extension.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tarifa_core::catalog::{CatalogSnapshot, DEFAULT_CURRENCY};
use tarifa_core::domain::tariff::TariffRuleRecord;
use tarifa_core::resolution::commitment::{BusinessCalendar, CommitmentOffset, CommitmentTable};

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    version: String,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default)]
    rules: Vec<TariffRuleRecord>,
}

#[derive(Debug, Deserialize)]
struct CommitmentDocument {
    #[serde(default)]
    skip_weekends: bool,
    #[serde(default)]
    holidays: BTreeSet<NaiveDate>,
    #[serde(default)]
    offsets: Vec<CommitmentOffset>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

pub fn load_catalog(path: &Path) -> Result<CatalogSnapshot> {
    let document: CatalogDocument = read_document(path)?;
    let snapshot = CatalogSnapshot::from_records(document.version, document.currency, document.rules)
        .with_context(|| format!("catalog `{}` failed validation", path.display()))?;

    tracing::info!(
        event_name = "cli.catalog.loaded",
        path = %path.display(),
        version = snapshot.version(),
        currency = snapshot.currency(),
        rule_count = snapshot.len(),
        "tariff catalog loaded"
    );
    Ok(snapshot)
}

pub fn load_commitment_policy(path: &Path) -> Result<CommitmentTable> {
    let document: CommitmentDocument = read_document(path)?;
    let calendar =
        BusinessCalendar { skip_weekends: document.skip_weekends, holidays: document.holidays };
    let table = CommitmentTable::from_entries(calendar, document.offsets)
        .with_context(|| format!("commitment policy `{}` failed validation", path.display()))?;

    tracing::debug!(
        event_name = "cli.commitment.loaded",
        path = %path.display(),
        offset_count = table.len(),
        holiday_count = table.calendar().holidays.len(),
        "commitment policy loaded"
    );
    Ok(table)
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read `{}`", path.display()))?;

    let extension =
        path.extension().and_then(|ext| ext.to_str()).map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("toml") => toml::from_str(&raw)
            .with_context(|| format!("could not parse TOML document `{}`", path.display())),
        Some("json") => serde_json::from_str(&raw)
            .with_context(|| format!("could not parse JSON document `{}`", path.display())),
        _ => bail!("unsupported document format for `{}` (expected .toml or .json)", path.display()),
    }
}
