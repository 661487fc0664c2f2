pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod resolution;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink};
pub use catalog::{CatalogProvider, CatalogSnapshot, RouteSummary, SharedCatalog};
pub use domain::quote::{Dimensions, QuoteMatch, QuotePricing, QuoteRequest, QuoteResult};
pub use domain::tariff::{CityCode, RuleStatus, TariffRule, TariffRuleId, TariffRuleRecord};
pub use errors::{ApplicationError, CatalogError, InterfaceError, QuoteError, QuoteErrorKind};
pub use flows::{ResolutionState, ResolutionTrace};
pub use resolution::commitment::{
    BusinessCalendar, CommitmentOffset, CommitmentPolicy, CommitmentTable,
};
pub use resolution::QuoteEngine;
