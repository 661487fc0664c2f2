//! Tariff resolution: one pure pass from a shipment request and a catalog
//! snapshot to a single priced rule and its commitment date.

pub mod bucket;
pub mod candidates;
pub mod commitment;
pub mod normalizer;
pub mod pricing;
pub mod volumetric;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::catalog::{CatalogProvider, CatalogSnapshot};
use crate::domain::quote::{Dimensions, QuoteMatch, QuoteRequest, QuoteResult};
use crate::domain::tariff::CityCode;
use crate::errors::QuoteError;
use crate::flows::{ResolutionFlow, ResolutionState};

use self::{
    bucket::select_bucket,
    candidates::{filter_candidates, CandidateQuery},
    commitment::{commitment_date, CommitmentPolicy},
    volumetric::WeightAssessment,
};

/// Request fields after canonicalization and validation.
#[derive(Clone, Debug, PartialEq, Eq)]
struct NormalizedRequest {
    origin: CityCode,
    destination: CityCode,
    weights: WeightAssessment,
    declared_value: Option<Decimal>,
    payment_form: Option<String>,
    parcel_type: Option<String>,
}

/// Stateless resolver. Safe to share across threads; every call works on the
/// snapshot it was handed.
#[derive(Clone, Debug)]
pub struct QuoteEngine<P> {
    policy: P,
}

impl<P> QuoteEngine<P>
where
    P: CommitmentPolicy,
{
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Acquires the provider's snapshot once and resolves against it.
    pub fn resolve_current<C>(
        &self,
        catalog: &C,
        request: &QuoteRequest,
    ) -> Result<QuoteResult, QuoteError>
    where
        C: CatalogProvider + ?Sized,
    {
        let snapshot = catalog.current_snapshot();
        self.resolve(&snapshot, request)
    }

    pub fn resolve(
        &self,
        snapshot: &CatalogSnapshot,
        request: &QuoteRequest,
    ) -> Result<QuoteResult, QuoteError> {
        let evaluated_at = request.evaluated_at.unwrap_or_else(Utc::now);
        let mut flow = ResolutionFlow::start(format!(
            "{} -> {} at {} against catalog {}",
            request.origin.trim(),
            request.destination.trim(),
            evaluated_at.to_rfc3339(),
            snapshot.version()
        ));

        match self.run(snapshot, request, evaluated_at, &mut flow) {
            Ok(mut result) => {
                flow.advance(ResolutionState::Completed, format!("rule {}", result.rule_id));
                result.trace = flow.into_trace();
                tracing::debug!(
                    event_name = "quote.resolution.completed",
                    rule_id = %result.rule_id,
                    catalog_version = snapshot.version(),
                    origin = %result.matched.origin,
                    destination = %result.matched.destination,
                    billable_weight = %result.matched.billable_weight,
                    price = %result.pricing.price,
                    "quote resolved"
                );
                Ok(result)
            }
            Err(error) => {
                flow.reject(&error);
                tracing::info!(
                    event_name = "quote.resolution.rejected",
                    error_kind = error.kind().as_str(),
                    catalog_version = snapshot.version(),
                    error = %error,
                    "quote rejected"
                );
                Err(error)
            }
        }
    }

    pub fn resolve_with_audit<S>(
        &self,
        snapshot: &CatalogSnapshot,
        request: &QuoteRequest,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<QuoteResult, QuoteError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.resolve(snapshot, request);
        let event = match &result {
            Ok(quote) => AuditEvent::new(
                Some(quote.rule_id.clone()),
                audit.correlation_id.clone(),
                "quote.resolved",
                AuditCategory::Resolution,
                audit.actor.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("route", format!("{} -> {}", quote.matched.origin, quote.matched.destination))
            .with_metadata("billable_weight", quote.matched.billable_weight.to_string())
            .with_metadata("price", quote.pricing.price.to_string())
            .with_metadata("commitment_date", quote.commitment_date.to_rfc3339()),
            Err(error) => AuditEvent::new(
                None,
                audit.correlation_id.clone(),
                "quote.rejected",
                AuditCategory::Resolution,
                audit.actor.clone(),
                AuditOutcome::Rejected,
            )
            .with_metadata("error_kind", error.kind().as_str())
            .with_metadata("error", error.to_string()),
        };
        sink.emit(event.with_metadata("catalog_version", snapshot.version()));
        result
    }

    fn run(
        &self,
        snapshot: &CatalogSnapshot,
        request: &QuoteRequest,
        evaluated_at: DateTime<Utc>,
        flow: &mut ResolutionFlow,
    ) -> Result<QuoteResult, QuoteError> {
        let normalized = normalize_request(request)?;
        let weights = normalized.weights;
        flow.advance(
            ResolutionState::Normalized,
            format!(
                "{} -> {}; declared {} kg, volumetric {} kg, billable {} kg",
                normalized.origin,
                normalized.destination,
                weights.requested,
                weights.volumetric,
                weights.billable
            ),
        );

        let query = CandidateQuery {
            origin: &normalized.origin,
            destination: &normalized.destination,
            evaluated_at,
            payment_form: normalized.payment_form.as_deref(),
            parcel_type: normalized.parcel_type.as_deref(),
        };
        let candidates = filter_candidates(snapshot.rules(), &query)?;
        flow.advance(
            ResolutionState::Filtered,
            format!("{} candidate rule(s) of {}", candidates.len(), snapshot.len()),
        );

        let selection = select_bucket(
            &candidates,
            weights.billable,
            &normalized.origin,
            &normalized.destination,
        )?;
        let rule = selection.rule;
        flow.advance(
            ResolutionState::BucketSelected,
            format!(
                "rule {} band {} chosen from {} containing band(s)",
                rule.id(),
                rule.band(),
                selection.contenders
            ),
        );

        let pricing = pricing::project(rule, snapshot.currency());
        flow.advance(
            ResolutionState::Priced,
            format!("{} {} ({})", pricing.price, pricing.currency, pricing.fare_name),
        );

        let due = commitment_date(
            &self.policy,
            rule.service_type(),
            rule.delivery_type(),
            evaluated_at,
        )?;
        flow.advance(
            ResolutionState::CommitmentComputed,
            format!("{}/{} due {}", rule.service_type(), rule.delivery_type(), due.to_rfc3339()),
        );

        Ok(QuoteResult {
            rule_id: rule.id().clone(),
            catalog_version: snapshot.version().to_owned(),
            evaluated_at,
            matched: QuoteMatch {
                origin: normalized.origin.clone(),
                destination: normalized.destination.clone(),
                requested_weight: weights.requested,
                volumetric_weight: weights.volumetric,
                billable_weight: weights.billable,
                bucket: rule.band(),
            },
            pricing,
            commitment_date: due,
            declared_value: normalized.declared_value,
            trace: Default::default(),
        })
    }
}

fn normalize_request(request: &QuoteRequest) -> Result<NormalizedRequest, QuoteError> {
    let origin = normalizer::normalize_city("origin", &request.origin)?;
    let destination = normalizer::normalize_city("destination", &request.destination)?;
    let declared_value = request
        .declared_value
        .map(|value| normalizer::require_non_negative("declared_value", value))
        .transpose()?;
    let dimensions = request.dimensions.as_ref().map(validate_dimensions).transpose()?;
    let weights = volumetric::assess(request.weight_kg, dimensions)?;

    Ok(NormalizedRequest {
        origin,
        destination,
        weights,
        declared_value,
        payment_form: normalizer::normalize_filter(request.payment_form.as_deref()),
        parcel_type: normalizer::normalize_filter(request.parcel_type.as_deref()),
    })
}

fn validate_dimensions(dimensions: &Dimensions) -> Result<&Dimensions, QuoteError> {
    if !dimensions.all_positive() {
        return Err(QuoteError::invalid_input(
            "dimensions",
            "length, width and height must all be greater than zero",
        ));
    }
    Ok(dimensions)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::QuoteEngine;
    use crate::audit::{AuditContext, AuditOutcome, InMemoryAuditSink};
    use crate::catalog::{CatalogSnapshot, SharedCatalog};
    use crate::domain::quote::{Dimensions, QuoteRequest};
    use crate::domain::tariff::{RuleStatus, TariffRuleRecord};
    use crate::errors::QuoteErrorKind;
    use crate::flows::ResolutionState;
    use crate::resolution::commitment::{BusinessCalendar, CommitmentTable};

    fn today() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 10, 0, 0).unwrap()
    }

    fn santiago_valparaiso() -> TariffRuleRecord {
        TariffRuleRecord {
            id: "T-STGO-VALPO".to_owned(),
            origin: Some("SANTIAGO".to_owned()),
            destination: Some("VALPARAISO".to_owned()),
            weight_from: Decimal::ZERO,
            weight_to: Decimal::from(10),
            service_type: "Normal".to_owned(),
            parcel_type: "Caja".to_owned(),
            fare_name: "Tarifa Pullman Nueva".to_owned(),
            delivery_type: "Agencia".to_owned(),
            price: Decimal::from(5000),
            payment_forms: vec!["Contado".to_owned()],
            valid_from: today() - Duration::days(10),
            valid_to: today() + Duration::days(10),
            status: RuleStatus::Active,
            created_at: today() - Duration::days(10),
            updated_at: today() - Duration::days(10),
        }
    }

    fn snapshot(records: Vec<TariffRuleRecord>) -> CatalogSnapshot {
        CatalogSnapshot::from_records("2026-10-16", "CLP", records).expect("snapshot")
    }

    fn engine() -> QuoteEngine<CommitmentTable> {
        QuoteEngine::new(
            CommitmentTable::new(BusinessCalendar { skip_weekends: true, ..Default::default() })
                .with_offset("Normal", "Agencia", 2),
        )
    }

    #[test]
    fn resolves_single_rule_and_records_full_trace() {
        let request = QuoteRequest::new("Santiago", "Valparaiso", Decimal::from(3))
            .evaluated_at(today());

        let result = engine().resolve(&snapshot(vec![santiago_valparaiso()]), &request).expect("quote");

        assert_eq!(result.pricing.price, Decimal::from(5000));
        assert_eq!(result.pricing.currency, "CLP");
        assert_eq!(result.matched.billable_weight, Decimal::from(3));
        assert_eq!(result.rule_id.0, "T-STGO-VALPO");
        assert_eq!(result.catalog_version, "2026-10-16");
        // Friday + 2 business days
        assert_eq!(result.commitment_date, Utc.with_ymd_and_hms(2026, 10, 20, 10, 0, 0).unwrap());

        let states: Vec<_> = result.trace.steps.iter().map(|step| step.state).collect();
        assert_eq!(states.first(), Some(&ResolutionState::Received));
        assert_eq!(states.last(), Some(&ResolutionState::Completed));
        assert_eq!(states.len(), 7);
    }

    #[test]
    fn blank_destination_is_rejected_before_catalog_lookup() {
        let request = QuoteRequest::new("Santiago", "   ", Decimal::from(3)).evaluated_at(today());
        let error = engine().resolve(&CatalogSnapshot::empty(), &request).expect_err("blank");
        assert_eq!(error.kind(), QuoteErrorKind::InvalidInput);
    }

    #[test]
    fn negative_declared_value_and_bad_dimensions_are_invalid_input() {
        let catalog = snapshot(vec![santiago_valparaiso()]);

        let negative = QuoteRequest::new("Santiago", "Valparaiso", Decimal::from(3))
            .with_declared_value(Decimal::new(-1, 0))
            .evaluated_at(today());
        assert_eq!(
            engine().resolve(&catalog, &negative).expect_err("negative").kind(),
            QuoteErrorKind::InvalidInput
        );

        let flat = QuoteRequest::new("Santiago", "Valparaiso", Decimal::from(3))
            .with_dimensions(Dimensions::new(Decimal::from(10), Decimal::ZERO, Decimal::from(10)))
            .evaluated_at(today());
        assert_eq!(
            engine().resolve(&catalog, &flat).expect_err("flat").kind(),
            QuoteErrorKind::InvalidInput
        );
    }

    #[test]
    fn missing_commitment_entry_is_policy_not_configured() {
        let mut express = santiago_valparaiso();
        express.service_type = "Express".to_owned();
        let request = QuoteRequest::new("Santiago", "Valparaiso", Decimal::from(3))
            .evaluated_at(today());

        let error = engine().resolve(&snapshot(vec![express]), &request).expect_err("policy");
        assert_eq!(error.kind(), QuoteErrorKind::PolicyNotConfigured);
    }

    #[test]
    fn declared_value_is_echoed_and_payment_form_filters() {
        let request = QuoteRequest::new("Santiago", "Valparaiso", Decimal::from(3))
            .with_declared_value(Decimal::from(150_000))
            .with_payment_form("contado")
            .evaluated_at(today());
        let result = engine().resolve(&snapshot(vec![santiago_valparaiso()]), &request).expect("quote");
        assert_eq!(result.declared_value, Some(Decimal::from(150_000)));

        let request = request.with_payment_form("por pagar");
        let error = engine()
            .resolve(&snapshot(vec![santiago_valparaiso()]), &request)
            .expect_err("payment form not accepted");
        assert_eq!(error.kind(), QuoteErrorKind::NoRouteAvailable);
    }

    #[test]
    fn resolve_current_reads_from_the_shared_catalog() {
        let catalog = SharedCatalog::new(snapshot(vec![santiago_valparaiso()]));
        let request = QuoteRequest::new("santiago", "valparaíso", Decimal::from(3))
            .evaluated_at(today());

        assert!(engine().resolve_current(&catalog, &request).is_ok());

        catalog.swap(CatalogSnapshot::empty());
        assert_eq!(
            engine().resolve_current(&catalog, &request).expect_err("empty").kind(),
            QuoteErrorKind::NoRouteAvailable
        );
    }

    #[test]
    fn audit_events_capture_success_and_rejection() {
        let sink = InMemoryAuditSink::default();
        let context = AuditContext::new("req-9", "cli");
        let catalog = snapshot(vec![santiago_valparaiso()]);

        let ok = QuoteRequest::new("Santiago", "Valparaiso", Decimal::from(3)).evaluated_at(today());
        let heavy = QuoteRequest::new("Santiago", "Valparaiso", Decimal::from(30)).evaluated_at(today());
        engine().resolve_with_audit(&catalog, &ok, &sink, &context).expect("quote");
        engine().resolve_with_audit(&catalog, &heavy, &sink, &context).expect_err("too heavy");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].outcome, AuditOutcome::Success);
        assert_eq!(events[0].metadata.get("price").map(String::as_str), Some("5000"));
        assert_eq!(events[1].outcome, AuditOutcome::Rejected);
        assert_eq!(
            events[1].metadata.get("error_kind").map(String::as_str),
            Some("weight_out_of_range")
        );
        assert!(events.iter().all(|event| event.correlation_id == "req-9"));
    }
}
