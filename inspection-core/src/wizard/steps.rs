use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::InspectionRecord;

/// The eight sections of an inspection, in wizard order.
///
/// The lowercase name doubles as the inspection API section path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepId {
    Header,
    Property,
    Areas,
    Subfloor,
    Outdoor,
    Waste,
    Procedure,
    Summary,
}

impl StepId {
    pub fn all() -> &'static [StepId] {
        &[
            StepId::Header,
            StepId::Property,
            StepId::Areas,
            StepId::Subfloor,
            StepId::Outdoor,
            StepId::Waste,
            StepId::Procedure,
            StepId::Summary,
        ]
    }

    /// One-based position in the full (unfiltered) step table.
    pub fn number(&self) -> u8 {
        *self as u8 + 1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Property => "property",
            Self::Areas => "areas",
            Self::Subfloor => "subfloor",
            Self::Outdoor => "outdoor",
            Self::Waste => "waste",
            Self::Procedure => "procedure",
            Self::Summary => "summary",
        }
    }

    /// Accepts a section name or a step number.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(number) = s.parse::<usize>() {
            return number
                .checked_sub(1)
                .and_then(|index| Self::all().get(index))
                .copied();
        }
        Self::all()
            .iter()
            .find(|step| step.as_str().eq_ignore_ascii_case(s))
            .copied()
    }

    pub fn definition(&self) -> &'static WizardStep {
        &WIZARD_STEPS[*self as usize]
    }

    pub fn title(&self) -> &'static str {
        self.definition().title
    }
}

impl fmt::Display for StepId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data-only predicate deciding whether an optional step is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCondition {
    SubfloorEnabled,
    WasteDisposalEnabled,
}

impl StepCondition {
    pub fn holds(
        &self,
        record: &InspectionRecord,
    ) -> bool {
        match self {
            Self::SubfloorEnabled => record.subfloor_enabled,
            Self::WasteDisposalEnabled => record.waste_disposal_enabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardStep {
    pub id: StepId,
    pub title: &'static str,
    pub short_title: &'static str,
    pub is_optional: bool,
    pub condition: Option<StepCondition>,
}

impl WizardStep {
    pub fn is_active(
        &self,
        record: &InspectionRecord,
    ) -> bool {
        self.condition
            .is_none_or(|condition| condition.holds(record))
    }
}

pub const WIZARD_STEPS: [WizardStep; 8] = [
    WizardStep {
        id: StepId::Header,
        title: "Inspection Header",
        short_title: "Header",
        is_optional: false,
        condition: None,
    },
    WizardStep {
        id: StepId::Property,
        title: "Property Information",
        short_title: "Property",
        is_optional: false,
        condition: None,
    },
    WizardStep {
        id: StepId::Areas,
        title: "Area Assessments",
        short_title: "Areas",
        is_optional: false,
        condition: None,
    },
    WizardStep {
        id: StepId::Subfloor,
        title: "Subfloor Inspection",
        short_title: "Subfloor",
        is_optional: true,
        condition: Some(StepCondition::SubfloorEnabled),
    },
    WizardStep {
        id: StepId::Outdoor,
        title: "Outdoor Conditions",
        short_title: "Outdoor",
        is_optional: false,
        condition: None,
    },
    WizardStep {
        id: StepId::Waste,
        title: "Waste Disposal",
        short_title: "Waste",
        is_optional: true,
        condition: Some(StepCondition::WasteDisposalEnabled),
    },
    WizardStep {
        id: StepId::Procedure,
        title: "Work Procedure",
        short_title: "Procedure",
        is_optional: false,
        condition: None,
    },
    WizardStep {
        id: StepId::Summary,
        title: "Job Summary & Cost",
        short_title: "Summary",
        is_optional: false,
        condition: None,
    },
];

/// Steps shown for `record`, in order.
pub fn active_steps(record: &InspectionRecord) -> Vec<StepId> {
    WIZARD_STEPS
        .iter()
        .filter(|step| step.is_active(record))
        .map(|step| step.id)
        .collect()
}
