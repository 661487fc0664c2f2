use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tarifa_core::domain::quote::{Dimensions, QuoteRequest, QuoteResult};
use tarifa_core::errors::{ApplicationError, QuoteError};
use tarifa_core::resolution::normalizer::parse_quantity;
use tarifa_core::resolution::QuoteEngine;

use crate::audit::TracingAuditSink;
use crate::commands::{self, CommandResult};

const COMMAND: &str = "quote";

#[derive(Debug, Clone, Default, Args)]
pub struct QuoteArgs {
    #[arg(long, help = "Origin city, matched case- and accent-insensitively")]
    pub origin: String,
    #[arg(long, help = "Destination city")]
    pub destination: String,
    #[arg(long, help = "Declared weight in kilograms (`,` is accepted as decimal separator)")]
    pub weight: String,
    #[arg(long, help = "Length in centimeters")]
    pub length: Option<String>,
    #[arg(long, help = "Width in centimeters")]
    pub width: Option<String>,
    #[arg(long, help = "Height in centimeters")]
    pub height: Option<String>,
    #[arg(long, help = "Declared commercial value, echoed in the result")]
    pub declared_value: Option<String>,
    #[arg(long, help = "Only consider rules accepting this payment form")]
    pub payment_form: Option<String>,
    #[arg(long, help = "Only consider rules for this packaging (parcel type)")]
    pub packaging: Option<String>,
    #[arg(long, help = "Evaluation instant in RFC 3339; defaults to now")]
    pub at: Option<String>,
    #[arg(long, help = "Catalog file overriding catalog.path")]
    pub catalog: Option<PathBuf>,
    #[arg(long, help = "Commitment policy file overriding commitment.path")]
    pub commitment: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct QuoteOutput<'a> {
    command: &'static str,
    status: &'static str,
    correlation_id: &'a str,
    #[serde(flatten)]
    quote: &'a QuoteResult,
}

pub fn run(args: QuoteArgs) -> CommandResult {
    let audit = commands::audit_context();
    let correlation_id = audit.correlation_id.clone();

    let config = match commands::load_config(
        COMMAND,
        &audit,
        args.catalog.clone(),
        args.commitment.clone(),
    ) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let snapshot = match commands::load_catalog(COMMAND, &audit, &config) {
        Ok(snapshot) => snapshot,
        Err(result) => return result,
    };
    let policy = match commands::load_commitment_policy(COMMAND, &audit, &config) {
        Ok(policy) => policy,
        Err(result) => return result,
    };

    let engine = QuoteEngine::new(policy);
    let outcome = build_request(&args, config.quote.default_payment_form.as_deref()).and_then(
        |request| engine.resolve_with_audit(&snapshot, &request, &TracingAuditSink, &audit),
    );

    match outcome {
        Ok(quote) => CommandResult::payload(
            COMMAND,
            &QuoteOutput {
                command: COMMAND,
                status: "ok",
                correlation_id: &correlation_id,
                quote: &quote,
            },
        ),
        Err(error) => reject(error, &correlation_id),
    }
}

fn reject(error: QuoteError, correlation_id: &str) -> CommandResult {
    let kind = error.kind();
    let interface = ApplicationError::from(error).into_interface(correlation_id);
    CommandResult::rejection(COMMAND, kind, &interface)
}

/// Parses the raw command-line values into an engine request.
pub fn build_request(
    args: &QuoteArgs,
    default_payment_form: Option<&str>,
) -> Result<QuoteRequest, QuoteError> {
    let weight = parse_quantity("weight", &args.weight)?;
    let mut request = QuoteRequest::new(args.origin.as_str(), args.destination.as_str(), weight);

    let dimensions = match (&args.length, &args.width, &args.height) {
        (None, None, None) => None,
        (Some(length), Some(width), Some(height)) => Some(Dimensions::new(
            parse_quantity("length", length)?,
            parse_quantity("width", width)?,
            parse_quantity("height", height)?,
        )),
        _ => {
            return Err(QuoteError::invalid_input(
                "dimensions",
                "length, width and height must be supplied together",
            ))
        }
    };
    if let Some(dimensions) = dimensions {
        request = request.with_dimensions(dimensions);
    }

    if let Some(raw) = &args.declared_value {
        request = request.with_declared_value(parse_quantity("declared_value", raw)?);
    }
    if let Some(form) = args.payment_form.as_deref().or(default_payment_form) {
        request = request.with_payment_form(form);
    }
    if let Some(packaging) = &args.packaging {
        request = request.with_parcel_type(packaging.as_str());
    }
    if let Some(raw) = &args.at {
        let instant = DateTime::parse_from_rfc3339(raw.trim())
            .map_err(|error| QuoteError::invalid_input("at", format!("`{raw}`: {error}")))?;
        request = request.evaluated_at(instant.with_timezone(&Utc));
    }

    Ok(request)
}
