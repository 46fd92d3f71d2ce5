//! Required-field rules for each wizard step.
//!
//! A single rule table drives both the per-step check used by `Next` and the
//! full-form check run before completion.

use serde::{Deserialize, Serialize};

use super::steps::{StepId, active_steps};
use crate::models::{AreaAssessment, ExteriorPhoto, InspectionRecord};

/// One required-field check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Address,
    Inspector,
    PropertyOccupation,
    DwellingType,
    AtLeastOneArea,
    /// Every area has a name, a mould visibility answer and both readings.
    AreasComplete,
    OutdoorTemperature,
    OutdoorHumidity,
    Photo(ExteriorPhoto),
    WorkProcedure,
}

const HEADER_RULES: &[FieldRule] = &[FieldRule::Address, FieldRule::Inspector];
const PROPERTY_RULES: &[FieldRule] = &[FieldRule::PropertyOccupation, FieldRule::DwellingType];
const AREAS_RULES: &[FieldRule] = &[FieldRule::AtLeastOneArea, FieldRule::AreasComplete];
const OUTDOOR_RULES: &[FieldRule] = &[
    FieldRule::OutdoorTemperature,
    FieldRule::OutdoorHumidity,
    FieldRule::Photo(ExteriorPhoto::FrontDoor),
    FieldRule::Photo(ExteriorPhoto::FrontHouse),
    FieldRule::Photo(ExteriorPhoto::Mailbox),
    FieldRule::Photo(ExteriorPhoto::Street),
];
const PROCEDURE_RULES: &[FieldRule] = &[FieldRule::WorkProcedure];

/// The rule table.
pub fn rules_for(step: StepId) -> &'static [FieldRule] {
    match step {
        StepId::Header => HEADER_RULES,
        StepId::Property => PROPERTY_RULES,
        StepId::Areas => AREAS_RULES,
        StepId::Outdoor => OUTDOOR_RULES,
        StepId::Procedure => PROCEDURE_RULES,
        StepId::Subfloor | StepId::Waste | StepId::Summary => &[],
    }
}

impl FieldRule {
    /// Appends the names of any missing fields to `missing`.
    pub fn check(
        &self,
        record: &InspectionRecord,
        missing: &mut Vec<String>,
    ) {
        let absent = match self {
            Self::Address => is_blank(record.address.as_deref()),
            Self::Inspector => is_blank(record.inspector_id.as_deref()),
            Self::PropertyOccupation => record.property_occupation.is_none(),
            Self::DwellingType => record.dwelling_type.is_none(),
            Self::AtLeastOneArea => record.areas.is_empty(),
            Self::AreasComplete => {
                missing.extend(
                    record
                        .areas
                        .iter()
                        .enumerate()
                        .filter_map(|(index, area)| incomplete_area(index, area)),
                );
                false
            }
            Self::OutdoorTemperature => record.outdoor_temperature.is_none(),
            Self::OutdoorHumidity => record.outdoor_humidity.is_none(),
            Self::Photo(kind) => is_blank(record.photo(*kind)),
            Self::WorkProcedure => is_blank(record.work_procedure.as_deref()),
        };

        if absent {
            missing.extend(self.label().map(str::to_string));
        }
    }

    fn label(&self) -> Option<&'static str> {
        match self {
            Self::Address => Some("Property Address"),
            Self::Inspector => Some("Inspector Assignment"),
            Self::PropertyOccupation => Some("Property Occupation Status"),
            Self::DwellingType => Some("Dwelling Type"),
            Self::AtLeastOneArea => Some("At least one Area Assessment"),
            Self::AreasComplete => None,
            Self::OutdoorTemperature => Some("Outdoor Temperature"),
            Self::OutdoorHumidity => Some("Outdoor Humidity"),
            Self::Photo(kind) => Some(kind.label()),
            Self::WorkProcedure => Some("Work Procedure Description"),
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|s| s.trim().is_empty())
}

fn incomplete_area(
    index: usize,
    area: &AreaAssessment,
) -> Option<String> {
    let mut fields = Vec::new();
    if area.area_name.trim().is_empty() {
        fields.push("Area Name");
    }
    if area.mould_visibility.is_empty() {
        fields.push("Mould Visibility");
    }
    if area.temperature.is_none() {
        fields.push("Temperature");
    }
    if area.humidity.is_none() {
        fields.push("Humidity");
    }

    if fields.is_empty() {
        return None;
    }

    let label = if area.area_name.trim().is_empty() {
        format!("Area {}", index + 1)
    } else {
        area.area_name.trim().to_string()
    };
    Some(format!("{label}: {}", fields.join(", ")))
}

/// Outcome of checking a step or the whole form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepValidation {
    pub is_valid: bool,
    pub missing_fields: Vec<String>,
}

impl StepValidation {
    fn from_missing(missing_fields: Vec<String>) -> Self {
        Self {
            is_valid: missing_fields.is_empty(),
            missing_fields,
        }
    }
}

fn run_rules<'a>(
    rules: impl IntoIterator<Item = &'a FieldRule>,
    record: &InspectionRecord,
) -> StepValidation {
    let mut missing = Vec::new();
    for rule in rules {
        rule.check(record, &mut missing);
    }
    StepValidation::from_missing(missing)
}

/// Checks the required fields of a single step.
pub fn validate_step(
    step: StepId,
    record: &InspectionRecord,
) -> StepValidation {
    run_rules(rules_for(step), record)
}

/// Checks every active step, in wizard order.
pub fn validate_for_completion(record: &InspectionRecord) -> StepValidation {
    let steps = active_steps(record);
    run_rules(steps.iter().flat_map(|step| rules_for(*step)), record)
}
