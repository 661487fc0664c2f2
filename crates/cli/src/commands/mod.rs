pub mod config;
pub mod doctor;
pub mod quote;
pub mod routes;

use std::path::PathBuf;

use serde::Serialize;
use tarifa_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use tarifa_core::catalog::CatalogSnapshot;
use tarifa_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use tarifa_core::errors::{ApplicationError, CatalogError, InterfaceError, QuoteErrorKind};
use tarifa_core::resolution::commitment::CommitmentTable;
use uuid::Uuid;

use crate::audit::TracingAuditSink;
use crate::sources;

const ACTOR: &str = "tarifa-cli";

pub const EXIT_CATALOG_UNAVAILABLE: u8 = 6;
pub const EXIT_CONFIG_INVALID: u8 = 7;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl CommandResult {
    /// Pretty JSON of `payload` as the successful output.
    pub fn payload<T: Serialize>(command: &str, payload: &T) -> Self {
        match serde_json::to_string_pretty(payload) {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            correlation_id: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Failure for a resolution the engine rejected, keyed by error kind.
    pub fn rejection(command: &str, kind: QuoteErrorKind, interface: &InterfaceError) -> Self {
        let output = interface_outcome(command, kind.as_str(), interface);
        Self { exit_code: exit_code_for(kind), output }
    }

    /// Failure to load one of the command inputs. The error is reported
    /// through its interface mapping and recorded as a failed audit event.
    pub(crate) fn source_failure<S>(
        command: &str,
        source: InputSource,
        error: ApplicationError,
        audit: &AuditContext,
        sink: &S,
    ) -> Self
    where
        S: AuditSink + ?Sized,
    {
        sink.emit(
            AuditEvent::new(
                None,
                audit.correlation_id.clone(),
                format!("{command}.source_failed"),
                source.audit_category(),
                audit.actor.clone(),
                AuditOutcome::Failed,
            )
            .with_metadata("source", source.error_class())
            .with_metadata("error", error.to_string()),
        );

        let interface = error.into_interface(audit.correlation_id.as_str());
        Self {
            exit_code: source.exit_code(),
            output: interface_outcome(command, source.error_class(), &interface),
        }
    }
}

/// Inputs a command loads before doing any work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InputSource {
    Config,
    Catalog,
    CommitmentPolicy,
}

impl InputSource {
    fn error_class(self) -> &'static str {
        match self {
            Self::Config => "config_validation",
            Self::Catalog => "catalog_unavailable",
            Self::CommitmentPolicy => "commitment_policy_unavailable",
        }
    }

    fn exit_code(self) -> u8 {
        match self {
            Self::Config => EXIT_CONFIG_INVALID,
            Self::Catalog | Self::CommitmentPolicy => EXIT_CATALOG_UNAVAILABLE,
        }
    }

    fn audit_category(self) -> AuditCategory {
        match self {
            Self::Config => AuditCategory::System,
            Self::Catalog | Self::CommitmentPolicy => AuditCategory::Catalog,
        }
    }
}

/// Correlation and actor for one command invocation.
pub(crate) fn audit_context() -> AuditContext {
    AuditContext::new(Uuid::new_v4().to_string(), ACTOR)
}

pub fn exit_code_for(kind: QuoteErrorKind) -> u8 {
    match kind {
        QuoteErrorKind::InvalidInput => 2,
        QuoteErrorKind::NoRouteAvailable => 3,
        QuoteErrorKind::WeightOutOfRange => 4,
        QuoteErrorKind::PolicyNotConfigured => 5,
    }
}

/// Effective configuration for a command, with per-invocation file overrides.
pub(crate) fn load_config(
    command: &str,
    audit: &AuditContext,
    catalog_path: Option<PathBuf>,
    commitment_path: Option<PathBuf>,
) -> Result<AppConfig, CommandResult> {
    let overrides = ConfigOverrides { catalog_path, commitment_path, ..ConfigOverrides::default() };
    AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }).map_err(|error| {
        CommandResult::source_failure(
            command,
            InputSource::Config,
            ApplicationError::Configuration(error.to_string()),
            audit,
            &TracingAuditSink,
        )
    })
}

pub(crate) fn load_catalog(
    command: &str,
    audit: &AuditContext,
    config: &AppConfig,
) -> Result<CatalogSnapshot, CommandResult> {
    sources::load_catalog(&config.catalog.path).map_err(|error| {
        CommandResult::source_failure(
            command,
            InputSource::Catalog,
            source_error(&error),
            audit,
            &TracingAuditSink,
        )
    })
}

pub(crate) fn load_commitment_policy(
    command: &str,
    audit: &AuditContext,
    config: &AppConfig,
) -> Result<CommitmentTable, CommandResult> {
    sources::load_commitment_policy(&config.commitment.path).map_err(|error| {
        CommandResult::source_failure(
            command,
            InputSource::CommitmentPolicy,
            source_error(&error),
            audit,
            &TracingAuditSink,
        )
    })
}

/// A document that parsed but failed validation keeps its catalog error;
/// anything else means the source itself is unavailable.
fn source_error(error: &anyhow::Error) -> ApplicationError {
    match error.downcast_ref::<CatalogError>() {
        Some(invalid) => ApplicationError::Catalog(invalid.clone()),
        None => ApplicationError::CatalogSource(format!("{error:#}")),
    }
}

fn interface_outcome(command: &str, error_class: &str, interface: &InterfaceError) -> String {
    serialize_payload(CommandOutcome {
        command: command.to_string(),
        status: "error".to_string(),
        error_class: Some(error_class.to_string()),
        message: format!("{} ({interface})", interface.user_message()),
        correlation_id: Some(interface.correlation_id().to_string()),
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use serde_json::Value;
    use tarifa_core::audit::{AuditCategory, AuditContext, AuditOutcome, InMemoryAuditSink};
    use tarifa_core::errors::{ApplicationError, CatalogError};

    use super::{
        source_error, CommandResult, InputSource, EXIT_CATALOG_UNAVAILABLE, EXIT_CONFIG_INVALID,
    };

    fn parse(output: &str) -> Value {
        serde_json::from_str(output).expect("command output should be valid JSON")
    }

    #[test]
    fn unavailable_catalog_is_reported_through_the_interface_mapping() {
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new("req-42", "tarifa-cli");
        let result = CommandResult::source_failure(
            "quote",
            InputSource::Catalog,
            ApplicationError::CatalogSource("could not read `tarifas.toml`".to_owned()),
            &audit,
            &sink,
        );

        assert_eq!(result.exit_code, EXIT_CATALOG_UNAVAILABLE);
        let payload = parse(&result.output);
        assert_eq!(payload["error_class"], "catalog_unavailable");
        assert_eq!(payload["correlation_id"], "req-42");
        assert!(payload["message"]
            .as_str()
            .unwrap_or_default()
            .starts_with("The rate catalog is temporarily unavailable."));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "quote.source_failed");
        assert_eq!(events[0].category, AuditCategory::Catalog);
        assert_eq!(events[0].outcome, AuditOutcome::Failed);
        assert_eq!(events[0].correlation_id, "req-42");
    }

    #[test]
    fn configuration_failure_is_a_failed_system_event() {
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new("req-43", "tarifa-cli");
        let result = CommandResult::source_failure(
            "routes",
            InputSource::Config,
            ApplicationError::Configuration("logging.level `loud` is not valid".to_owned()),
            &audit,
            &sink,
        );

        assert_eq!(result.exit_code, EXIT_CONFIG_INVALID);
        let payload = parse(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("loud"));

        let events = sink.events();
        assert_eq!(events[0].category, AuditCategory::System);
        assert_eq!(events[0].metadata.get("source").map(String::as_str), Some("config_validation"));
    }

    #[test]
    fn validation_errors_keep_their_catalog_type_through_context() {
        let invalid: anyhow::Result<()> = Err(CatalogError::DuplicateRuleId("T-1".to_owned()))
            .context("catalog `x.toml` failed validation");
        let missing: anyhow::Result<()> = Err(anyhow::anyhow!("could not read `x.toml`"));

        assert!(matches!(
            source_error(&invalid.expect_err("invalid")),
            ApplicationError::Catalog(CatalogError::DuplicateRuleId(_))
        ));
        assert!(matches!(
            source_error(&missing.expect_err("missing")),
            ApplicationError::CatalogSource(ref message) if message.contains("x.toml")
        ));
    }
}
