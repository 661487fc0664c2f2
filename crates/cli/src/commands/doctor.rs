use std::collections::BTreeSet;

use chrono::Utc;
use serde::Serialize;
use tarifa_core::catalog::CatalogSnapshot;
use tarifa_core::config::{AppConfig, LoadOptions};
use tarifa_core::resolution::commitment::{CommitmentPolicy, CommitmentTable};

use crate::commands::CommandResult;
use crate::sources;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });

            let catalog = sources::load_catalog(&config.catalog.path);
            let policy = sources::load_commitment_policy(&config.commitment.path);

            checks.push(match &catalog {
                Ok(snapshot) => DoctorCheck {
                    name: "catalog_load",
                    status: CheckStatus::Pass,
                    details: format!(
                        "catalog `{}` version {} with {} rule(s) in {}",
                        config.catalog.path.display(),
                        snapshot.version(),
                        snapshot.len(),
                        snapshot.currency()
                    ),
                },
                Err(error) => DoctorCheck {
                    name: "catalog_load",
                    status: CheckStatus::Fail,
                    details: format!("{error:#}"),
                },
            });
            checks.push(match &policy {
                Ok(table) => DoctorCheck {
                    name: "commitment_policy_load",
                    status: CheckStatus::Pass,
                    details: format!(
                        "policy `{}` with {} offset(s) and {} holiday(s)",
                        config.commitment.path.display(),
                        table.len(),
                        table.calendar().holidays.len()
                    ),
                },
                Err(error) => DoctorCheck {
                    name: "commitment_policy_load",
                    status: CheckStatus::Fail,
                    details: format!("{error:#}"),
                },
            });

            checks.push(match (&catalog, &policy) {
                (Ok(snapshot), Ok(table)) => check_policy_coverage(snapshot, table),
                _ => skipped("policy_coverage", "catalog or commitment policy did not load"),
            });
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            let reason = "configuration did not load";
            checks.push(skipped("catalog_load", reason));
            checks.push(skipped("commitment_policy_load", reason));
            checks.push(skipped("policy_coverage", reason));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Every service/delivery pair used by a currently active rule needs an
/// offset, otherwise quotes on that rule fail with `policy_not_configured`.
fn check_policy_coverage(snapshot: &CatalogSnapshot, table: &CommitmentTable) -> DoctorCheck {
    let now = Utc::now();
    let missing: BTreeSet<String> = snapshot
        .rules()
        .iter()
        .filter(|rule| rule.is_active_at(now))
        .filter(|rule| table.offset_for(rule.service_type(), rule.delivery_type()).is_none())
        .map(|rule| format!("{}/{}", rule.service_type(), rule.delivery_type()))
        .collect();

    if missing.is_empty() {
        DoctorCheck {
            name: "policy_coverage",
            status: CheckStatus::Pass,
            details: "every active service/delivery pair has a commitment offset".to_string(),
        }
    } else {
        DoctorCheck {
            name: "policy_coverage",
            status: CheckStatus::Fail,
            details: format!(
                "no commitment offset for: {}",
                missing.into_iter().collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
