use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, serializable classification of a failed resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteErrorKind {
    InvalidInput,
    NoRouteAvailable,
    WeightOutOfRange,
    PolicyNotConfigured,
}

impl QuoteErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NoRouteAvailable => "no_route_available",
            Self::WeightOutOfRange => "weight_out_of_range",
            Self::PolicyNotConfigured => "policy_not_configured",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QuoteError {
    #[error("invalid input for `{field}`: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("no active tariff covers {origin} -> {destination} at {evaluated_at}")]
    NoRouteAvailable { origin: String, destination: String, evaluated_at: DateTime<Utc> },
    #[error(
        "route {origin} -> {destination} has no weight band covering {billable_weight} kg"
    )]
    WeightOutOfRange { origin: String, destination: String, billable_weight: Decimal },
    #[error("commitment policy has no usable entry for {service_type}/{delivery_type}: {reason}")]
    PolicyNotConfigured { service_type: String, delivery_type: String, reason: String },
}

impl QuoteError {
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput { field, reason: reason.into() }
    }

    pub fn kind(&self) -> QuoteErrorKind {
        match self {
            Self::InvalidInput { .. } => QuoteErrorKind::InvalidInput,
            Self::NoRouteAvailable { .. } => QuoteErrorKind::NoRouteAvailable,
            Self::WeightOutOfRange { .. } => QuoteErrorKind::WeightOutOfRange,
            Self::PolicyNotConfigured { .. } => QuoteErrorKind::PolicyNotConfigured,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("tariff rule `{id}` is invalid: {reason}")]
    InvalidRule { id: String, reason: String },
    #[error("tariff rule id `{0}` appears more than once in the snapshot")]
    DuplicateRuleId(String),
    #[error("catalog snapshot is invalid: {0}")]
    InvalidSnapshot(String),
    #[error("commitment policy is invalid: {0}")]
    InvalidPolicy(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Quote(#[from] QuoteError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("catalog source failure: {0}")]
    CatalogSource(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unprocessable request: {message}")]
    Unprocessable { message: String, kind: QuoteErrorKind, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check origin, destination and measurements."
            }
            Self::Unprocessable { kind: QuoteErrorKind::NoRouteAvailable, .. } => {
                "There is no active rate for the selected route."
            }
            Self::Unprocessable { kind: QuoteErrorKind::WeightOutOfRange, .. } => {
                "The route exists, but no rate covers the billable weight of this shipment."
            }
            Self::Unprocessable { .. } => "A quote could not be produced for this shipment.",
            Self::ServiceUnavailable { .. } => {
                "The rate catalog is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Unprocessable { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Unprocessable { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        match value {
            ApplicationError::Quote(error @ QuoteError::InvalidInput { .. }) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Quote(error @ QuoteError::PolicyNotConfigured { .. }) => {
                Self::Internal { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Quote(error) => Self::Unprocessable {
                kind: error.kind(),
                message: error.to_string(),
                correlation_id: unassigned(),
            },
            ApplicationError::CatalogSource(message) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned() }
            }
            ApplicationError::Catalog(error) => {
                Self::Internal { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
        }
    }
}
