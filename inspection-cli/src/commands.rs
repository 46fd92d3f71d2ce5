//! Command implementations, kept free of argument parsing so they can be
//! driven from tests.

use std::fmt::Write as _;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use inspection_core::api::{ApiConfig, CompletionSummary, MemoryBackendFactory};
use inspection_core::calculations::{PricingEngine, PricingError, PricingPolicy};
use inspection_core::wizard::{
    StepId, WizardConfig, WizardController, validate_for_completion, validate_step,
};
use inspection_core::{ApiRegistry, InspectionRecord, InspectionSession};
use inspection_data::PricingPolicyLoader;
use inspection_http::HttpBackendFactory;
use serde_json::Value;
use tracing::{debug, info};

/// Registry with every backend this binary ships.
///
/// The in-memory backend prices with `policy`.
pub fn build_registry(policy: PricingPolicy) -> ApiRegistry {
    let mut registry = ApiRegistry::new();
    registry.register(Box::new(HttpBackendFactory));
    registry.register(Box::new(MemoryBackendFactory::new(policy)));
    registry
}

/// Pricing from `table`, or the bundled standard table.
pub fn load_policy(table: Option<&Path>) -> Result<PricingPolicy> {
    match table {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open pricing table: {}", path.display()))?;
            let policy = PricingPolicyLoader::load(file)
                .with_context(|| format!("Invalid pricing table: {}", path.display()))?;
            info!(table = %path.display(), "loaded pricing table");
            Ok(policy)
        }
        None => PricingPolicyLoader::standard().context("Bundled pricing table is invalid"),
    }
}

/// Reads an inspection from JSON.
///
/// Accepts either a bare inspection or an API response envelope whose
/// `data` is the inspection.
pub fn parse_record(json: &str) -> Result<InspectionRecord> {
    let value: Value = serde_json::from_str(json).context("Inspection is not valid JSON")?;
    let record = match value {
        Value::Object(mut map) if map.contains_key("success") && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    let mut record: InspectionRecord =
        serde_json::from_value(record).context("Inspection does not match the expected shape")?;
    record.refresh_dew_points();
    Ok(record)
}

pub fn load_record(path: &Path) -> Result<InspectionRecord> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read inspection: {}", path.display()))?;
    parse_record(&json).with_context(|| format!("Failed to load inspection: {}", path.display()))
}

/// The formatted estimate, or a notice when there is nothing to price.
pub fn estimate_report(
    record: &InspectionRecord,
    policy: PricingPolicy,
) -> Result<String, PricingError> {
    let engine = PricingEngine::new(policy);
    let Some(breakdown) = engine.calculate(&record.pricing_input())? else {
        return Ok("Cost estimate not available".to_string());
    };

    let mut report = String::new();
    for area in &breakdown.area_details {
        let _ = writeln!(
            report,
            "  {:<20} {:>4} min + {:>4} min demolition",
            area.area_name, area.job_time, area.demolition_time
        );
    }
    for (kind, line) in breakdown.equipment_details.displayed_lines() {
        let _ = writeln!(
            report,
            "  {:<20} {:>4} x {} day(s)",
            kind.label(),
            line.qty,
            line.days
        );
    }
    if !report.is_empty() {
        report.push('\n');
    }
    report.push_str(&breakdown.to_string());
    Ok(report)
}

/// Per-step validation and completion readiness.
///
/// With `only`, just that step is reported (inactive steps say so).
pub fn validation_report(
    record: &InspectionRecord,
    only: Option<StepId>,
) -> String {
    let active = inspection_core::wizard::active_steps(record);
    let mut report = String::new();

    let steps: Vec<StepId> = match only {
        Some(step) if !active.contains(&step) => {
            let _ = writeln!(
                report,
                "Step {} ({}) is not active for this inspection",
                step.number(),
                step.title()
            );
            return report;
        }
        Some(step) => vec![step],
        None => active,
    };

    for step in steps {
        let validation = validate_step(step, record);
        if validation.is_valid {
            let _ = writeln!(report, "[ok]      {}. {}", step.number(), step.title());
        } else {
            let _ = writeln!(
                report,
                "[missing] {}. {}: {}",
                step.number(),
                step.title(),
                validation.missing_fields.join("; ")
            );
        }
    }

    if only.is_none() {
        let completion = validate_for_completion(record);
        let _ = writeln!(
            report,
            "\nReady to complete: {}",
            if completion.is_valid { "yes" } else { "no" }
        );
    }
    report
}

/// Active steps with the wizard positioned at `at` (or the first step).
pub fn steps_report(
    record: InspectionRecord,
    policy: PricingPolicy,
    config: WizardConfig,
    at: Option<StepId>,
) -> Result<String> {
    let controller = WizardController::resume(record, PricingEngine::new(policy), config, at)
        .context("Cannot open the inspection in the wizard")?;

    let mut report = String::new();
    for step in controller.active_steps() {
        let definition = step.definition();
        let marker = if step == controller.current_step() {
            ">"
        } else {
            " "
        };
        let optional = if definition.is_optional {
            " (optional)"
        } else {
            ""
        };
        let _ = writeln!(
            report,
            "{marker} {}. {}{optional}",
            step.number(),
            definition.title
        );
    }

    let (position, total) = controller.position();
    let _ = writeln!(
        report,
        "\nStep {position} of {total} ({}%)",
        controller.progress_percent()
    );
    Ok(report)
}

/// Completes `id` through the configured backend.
///
/// The draft is loaded and checked locally first, so an incomplete
/// inspection is rejected without calling the completion endpoint.
pub async fn complete_remote(
    registry: &ApiRegistry,
    api_config: &ApiConfig,
    id: &str,
    policy: PricingPolicy,
    wizard_config: WizardConfig,
) -> Result<CompletionSummary> {
    debug!(backend = %api_config.backend, inspection = id, "completing inspection");
    let api = registry
        .create(api_config)
        .await
        .with_context(|| format!("Failed to create '{}' backend", api_config.backend))?;

    complete_with(api, id, policy, wizard_config, api_config.timeout).await
}

async fn complete_with(
    api: Arc<dyn inspection_core::InspectionApi>,
    id: &str,
    policy: PricingPolicy,
    wizard_config: WizardConfig,
    timeout: Duration,
) -> Result<CompletionSummary> {
    let mut session =
        InspectionSession::open(api, id, PricingEngine::new(policy), wizard_config, timeout)
            .await
            .with_context(|| format!("Failed to open inspection {id}"))?;

    session
        .complete()
        .await
        .with_context(|| format!("Failed to complete inspection {id}"))
}
