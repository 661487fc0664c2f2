use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tarifa_core::catalog::RouteSummary;
use tarifa_core::domain::tariff::WILDCARD_CITY;

use crate::commands::{self, CommandResult};

const COMMAND: &str = "routes";

#[derive(Debug, Clone, Default, Args)]
pub struct RoutesArgs {
    #[arg(long, help = "Instant (RFC 3339) at which rules must be active; defaults to now")]
    pub at: Option<String>,
    #[arg(long, help = "Catalog file overriding catalog.path")]
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RouteLine {
    origin: String,
    destination: String,
    rule_count: usize,
}

#[derive(Debug, Serialize)]
struct RoutesReport {
    command: &'static str,
    status: &'static str,
    catalog_version: String,
    evaluated_at: DateTime<Utc>,
    origins: BTreeSet<String>,
    destinations: BTreeSet<String>,
    routes: Vec<RouteLine>,
}

pub fn run(args: RoutesArgs) -> CommandResult {
    let evaluated_at = match args.at.as_deref().map(parse_instant).transpose() {
        Ok(instant) => instant.unwrap_or_else(Utc::now),
        Err(message) => {
            return CommandResult::failure(
                COMMAND,
                "invalid_input",
                message,
                commands::exit_code_for(tarifa_core::errors::QuoteErrorKind::InvalidInput),
            )
        }
    };

    let audit = commands::audit_context();
    let config = match commands::load_config(COMMAND, &audit, args.catalog, None) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let snapshot = match commands::load_catalog(COMMAND, &audit, &config) {
        Ok(snapshot) => snapshot,
        Err(result) => return result,
    };

    let routes: Vec<RouteLine> =
        snapshot.routes_active_at(evaluated_at).into_iter().map(route_line).collect();
    let origins = routes.iter().map(|route| route.origin.clone()).collect();
    let destinations = routes.iter().map(|route| route.destination.clone()).collect();

    CommandResult::payload(
        COMMAND,
        &RoutesReport {
            command: COMMAND,
            status: "ok",
            catalog_version: snapshot.version().to_string(),
            evaluated_at,
            origins,
            destinations,
            routes,
        },
    )
}

fn route_line(summary: RouteSummary) -> RouteLine {
    let side = |city: Option<tarifa_core::domain::tariff::CityCode>| {
        city.map(|city| city.as_str().to_string()).unwrap_or_else(|| WILDCARD_CITY.to_string())
    };
    RouteLine {
        origin: side(summary.origin),
        destination: side(summary.destination),
        rule_count: summary.rule_count,
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|error| format!("invalid input for `at`: `{raw}`: {error}"))
}
