//! Navigation and editing state for one inspection wizard session.
//!
//! The controller owns the [`InspectionRecord`] being edited. Every change
//! goes through an [`InspectionUpdate`], which lets the controller keep the
//! derived dew points and cost breakdown current and remember which API
//! sections have unsaved fields.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::steps::{StepId, active_steps};
use super::validation::{validate_for_completion, validate_step};
use crate::api::CompletionSummary;
use crate::calculations::{PricingEngine, PricingError};
use crate::models::{
    AreaAssessment, CostBreakdown, DwellingType, EquipmentKind, ExteriorPhoto, InspectionRecord,
    InspectionStatus, PropertyOccupation, Treatment, WasteAmount,
};

/// Unsaved field names, grouped by API section.
pub type PendingChanges = BTreeMap<StepId, BTreeSet<&'static str>>;

/// Which steps the pill navigation may jump to directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JumpPolicy {
    /// Any active step.
    Unrestricted,
    /// Only active steps that have already been shown.
    #[default]
    VisitedOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardConfig {
    pub jump_policy: JumpPolicy,
    /// Quiet period after the last edit before unsaved sections are sent.
    pub autosave_debounce: Duration,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            jump_policy: JumpPolicy::default(),
            autosave_debounce: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("{} is incomplete: {}", .step.title(), .missing_fields.join(", "))]
    Incomplete {
        step: StepId,
        missing_fields: Vec<String>,
    },

    #[error("inspection cannot be completed, missing: {}", .missing_fields.join(", "))]
    NotReadyToComplete { missing_fields: Vec<String> },

    #[error("step '{0}' is not part of this inspection")]
    InactiveStep(StepId),

    #[error("step '{0}' has not been reached yet")]
    StepNotReached(StepId),

    #[error("inspection is already completed")]
    AlreadyCompleted,

    #[error("area {index} does not exist ({len} areas)")]
    AreaOutOfRange { index: usize, len: usize },

    #[error("drying days must be at least 1")]
    InvalidDryingDays,

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// A single edit to the inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectionUpdate {
    Address(Option<String>),
    Inspector(Option<String>),
    AttentionTo(Option<String>),
    InspectionDate(Option<DateTime<Utc>>),
    PropertyOccupation(Option<PropertyOccupation>),
    DwellingType(Option<DwellingType>),
    AddArea(AreaAssessment),
    ReplaceArea { index: usize, area: AreaAssessment },
    RemoveArea(usize),
    SubfloorEnabled(bool),
    /// Minutes.
    SubfloorTreatmentTime(u32),
    SubfloorObservation(Option<String>),
    OutdoorTemperature(Option<Decimal>),
    OutdoorHumidity(Option<Decimal>),
    OutdoorComments(Option<String>),
    ExteriorPhoto {
        kind: ExteriorPhoto,
        url: Option<String>,
    },
    WasteDisposalEnabled(bool),
    WasteDisposalAmount(Option<WasteAmount>),
    WorkProcedure(Option<String>),
    Treatment {
        treatment: Treatment,
        applied: bool,
    },
    DryingEquipmentEnabled(bool),
    EquipmentQuantity {
        kind: EquipmentKind,
        qty: u32,
    },
    DryingDays(u32),
    CauseOfMould(Option<String>),
    ParkingOptions(Option<String>),
    AdditionalInfo(Option<String>),
}

impl InspectionUpdate {
    /// The API section the changed fields are saved through.
    pub fn section(&self) -> StepId {
        match self {
            Self::Address(_) | Self::Inspector(_) | Self::AttentionTo(_) | Self::InspectionDate(_) => {
                StepId::Header
            }
            Self::PropertyOccupation(_) | Self::DwellingType(_) => StepId::Property,
            Self::AddArea(_) | Self::ReplaceArea { .. } | Self::RemoveArea(_) => StepId::Areas,
            Self::SubfloorEnabled(_)
            | Self::SubfloorTreatmentTime(_)
            | Self::SubfloorObservation(_) => StepId::Subfloor,
            Self::OutdoorTemperature(_)
            | Self::OutdoorHumidity(_)
            | Self::OutdoorComments(_)
            | Self::ExteriorPhoto { .. } => StepId::Outdoor,
            Self::WasteDisposalEnabled(_) | Self::WasteDisposalAmount(_) => StepId::Waste,
            Self::WorkProcedure(_)
            | Self::Treatment { .. }
            | Self::DryingEquipmentEnabled(_)
            | Self::EquipmentQuantity { .. }
            | Self::DryingDays(_) => StepId::Procedure,
            Self::CauseOfMould(_) | Self::ParkingOptions(_) | Self::AdditionalInfo(_) => {
                StepId::Summary
            }
        }
    }

    /// True when the change can alter the cost estimate.
    pub fn affects_cost(&self) -> bool {
        matches!(
            self,
            Self::AddArea(_)
                | Self::ReplaceArea { .. }
                | Self::RemoveArea(_)
                | Self::SubfloorEnabled(_)
                | Self::DwellingType(_)
                | Self::DryingEquipmentEnabled(_)
                | Self::EquipmentQuantity { .. }
                | Self::DryingDays(_)
        )
    }

    /// API field names written by this change.
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            Self::Address(_) => &["address"],
            Self::Inspector(_) => &["inspectorId"],
            Self::AttentionTo(_) => &["attentionTo"],
            Self::InspectionDate(_) => &["inspectionDate"],
            Self::PropertyOccupation(_) => &["propertyOccupation"],
            Self::DwellingType(_) => &["dwellingType"],
            Self::AddArea(_) | Self::ReplaceArea { .. } | Self::RemoveArea(_) => &["areas"],
            Self::SubfloorEnabled(_) => &["subfloorEnabled"],
            Self::SubfloorTreatmentTime(_) => &["subfloorTreatmentTime"],
            Self::SubfloorObservation(_) => &["subfloorObservation"],
            Self::OutdoorTemperature(_) => &["outdoorTemperature", "outdoorDewPoint"],
            Self::OutdoorHumidity(_) => &["outdoorHumidity", "outdoorDewPoint"],
            Self::OutdoorComments(_) => &["outdoorComments"],
            Self::ExteriorPhoto { kind, .. } => match kind {
                ExteriorPhoto::FrontDoor => &["frontDoorPhoto"],
                ExteriorPhoto::FrontHouse => &["frontHousePhoto"],
                ExteriorPhoto::Mailbox => &["mailboxPhoto"],
                ExteriorPhoto::Street => &["streetPhoto"],
            },
            Self::WasteDisposalEnabled(_) => &["wasteDisposalEnabled"],
            Self::WasteDisposalAmount(_) => &["wasteDisposalAmount"],
            Self::WorkProcedure(_) => &["workProcedure"],
            Self::Treatment { treatment, .. } => match treatment {
                Treatment::HepaVac => &["hepaVac"],
                Treatment::Antimicrobial => &["antimicrobial"],
                Treatment::StainRemovingAntimicrobial => &["stainRemovingAntimicrobial"],
                Treatment::HomeSanitationFogging => &["homeSanitationFogging"],
            },
            Self::DryingEquipmentEnabled(_) => &["dryingEquipmentEnabled"],
            Self::EquipmentQuantity { kind, .. } => match kind {
                EquipmentKind::Dehumidifier => &["dehumidifierQty"],
                EquipmentKind::AirMover => &["airMoverQty"],
                EquipmentKind::RcdBox => &["rcdBoxQty"],
            },
            Self::DryingDays(_) => &["dryingDays"],
            Self::CauseOfMould(_) => &["causeOfMould"],
            Self::ParkingOptions(_) => &["parkingOptions"],
            Self::AdditionalInfo(_) => &["additionalInfoTechnician"],
        }
    }
}

/// What to submit once the whole form validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub inspection_id: String,
    /// Local estimate shown to the technician at submission time.
    pub estimate: Option<CostBreakdown>,
}

/// State machine over the active wizard steps.
#[derive(Debug)]
pub struct WizardController {
    engine: PricingEngine,
    config: WizardConfig,
    record: InspectionRecord,
    current: StepId,
    visited: BTreeSet<StepId>,
    breakdown: Option<CostBreakdown>,
    generation: u64,
    pending: PendingChanges,
}

impl WizardController {
    /// Starts at the first active step.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::Pricing`] if the engine's policy is invalid.
    pub fn new(
        record: InspectionRecord,
        engine: PricingEngine,
        config: WizardConfig,
    ) -> Result<Self, WizardError> {
        Self::resume(record, engine, config, None)
    }

    /// Reopens a saved draft at `step` when that step is active.
    ///
    /// Every active step up to the resumed one counts as visited.
    pub fn resume(
        mut record: InspectionRecord,
        engine: PricingEngine,
        config: WizardConfig,
        step: Option<StepId>,
    ) -> Result<Self, WizardError> {
        engine.policy().validate()?;
        record.refresh_dew_points();

        let steps = active_steps(&record);
        let current = step
            .filter(|step| steps.contains(step))
            .unwrap_or(StepId::Header);
        let visited = steps.iter().copied().filter(|s| *s <= current).collect();

        let mut controller = Self {
            engine,
            config,
            record,
            current,
            visited,
            breakdown: None,
            generation: 0,
            pending: PendingChanges::new(),
        };
        controller.recalculate()?;
        Ok(controller)
    }

    pub fn record(&self) -> &InspectionRecord {
        &self.record
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn engine(&self) -> &PricingEngine {
        &self.engine
    }

    pub fn current_step(&self) -> StepId {
        self.current
    }

    /// `None` means "cost estimate not available".
    pub fn breakdown(&self) -> Option<&CostBreakdown> {
        self.breakdown.as_ref()
    }

    /// Incremented on every applied edit.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_completed(&self) -> bool {
        self.record.status == InspectionStatus::Completed
    }

    pub fn active_steps(&self) -> Vec<StepId> {
        active_steps(&self.record)
    }

    /// One-based position of the current step and the number of active steps.
    pub fn position(&self) -> (usize, usize) {
        let steps = self.active_steps();
        let index = steps
            .iter()
            .position(|step| *step == self.current)
            .unwrap_or(0);
        (index + 1, steps.len())
    }

    pub fn progress_percent(&self) -> u8 {
        let (position, total) = self.position();
        let percent = (position * 100 + total / 2) / total.max(1);
        u8::try_from(percent.min(100)).unwrap_or(100)
    }

    pub fn validate_current(&self) -> super::StepValidation {
        validate_step(self.current, &self.record)
    }

    /// Applies one edit and refreshes everything derived from it.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if the inspection is completed, an
    /// area index is out of range or drying days is zero.
    pub fn apply(
        &mut self,
        update: InspectionUpdate,
    ) -> Result<(), WizardError> {
        if self.is_completed() {
            return Err(WizardError::AlreadyCompleted);
        }
        self.check(&update)?;

        let section = update.section();
        let fields = update.field_names();
        let affects_cost = update.affects_cost();

        self.mutate(update);
        self.record.refresh_dew_points();
        self.pending
            .entry(section)
            .or_default()
            .extend(fields.iter().copied());
        self.generation += 1;

        if affects_cost {
            self.recalculate()?;
        }
        self.snap_to_active_step();
        Ok(())
    }

    fn check(
        &self,
        update: &InspectionUpdate,
    ) -> Result<(), WizardError> {
        let len = self.record.areas.len();
        match update {
            InspectionUpdate::ReplaceArea { index, .. } | InspectionUpdate::RemoveArea(index)
                if *index >= len =>
            {
                Err(WizardError::AreaOutOfRange { index: *index, len })
            }
            InspectionUpdate::DryingDays(0) => Err(WizardError::InvalidDryingDays),
            _ => Ok(()),
        }
    }

    fn mutate(
        &mut self,
        update: InspectionUpdate,
    ) {
        let record = &mut self.record;
        match update {
            InspectionUpdate::Address(value) => record.address = value,
            InspectionUpdate::Inspector(value) => record.inspector_id = value,
            InspectionUpdate::AttentionTo(value) => record.attention_to = value,
            InspectionUpdate::InspectionDate(value) => record.inspection_date = value,
            InspectionUpdate::PropertyOccupation(value) => record.property_occupation = value,
            InspectionUpdate::DwellingType(value) => record.dwelling_type = value,
            InspectionUpdate::AddArea(area) => record.areas.push(area),
            InspectionUpdate::ReplaceArea { index, area } => record.areas[index] = area,
            InspectionUpdate::RemoveArea(index) => {
                record.areas.remove(index);
            }
            InspectionUpdate::SubfloorEnabled(value) => record.subfloor_enabled = value,
            InspectionUpdate::SubfloorTreatmentTime(value) => {
                record.subfloor_treatment_time = value
            }
            InspectionUpdate::SubfloorObservation(value) => record.subfloor_observation = value,
            InspectionUpdate::OutdoorTemperature(value) => record.outdoor_temperature = value,
            InspectionUpdate::OutdoorHumidity(value) => record.outdoor_humidity = value,
            InspectionUpdate::OutdoorComments(value) => record.outdoor_comments = value,
            InspectionUpdate::ExteriorPhoto { kind, url } => *record.photo_mut(kind) = url,
            InspectionUpdate::WasteDisposalEnabled(value) => record.waste_disposal_enabled = value,
            InspectionUpdate::WasteDisposalAmount(value) => record.waste_disposal_amount = value,
            InspectionUpdate::WorkProcedure(value) => record.work_procedure = value,
            InspectionUpdate::Treatment { treatment, applied } => {
                *record.treatment_mut(treatment) = applied
            }
            InspectionUpdate::DryingEquipmentEnabled(value) => {
                record.drying_equipment_enabled = value
            }
            InspectionUpdate::EquipmentQuantity { kind, qty } => {
                *record.equipment_qty_mut(kind) = qty
            }
            InspectionUpdate::DryingDays(days) => record.drying_days = Some(days),
            InspectionUpdate::CauseOfMould(value) => record.cause_of_mould = value,
            InspectionUpdate::ParkingOptions(value) => record.parking_options = value,
            InspectionUpdate::AdditionalInfo(value) => record.additional_info_technician = value,
        }
    }

    /// Recomputes the local estimate; skipped until some area has job time.
    fn recalculate(&mut self) -> Result<(), WizardError> {
        if !self.record.has_area_time() {
            self.breakdown = None;
            return Ok(());
        }
        self.breakdown = self.engine.calculate(&self.record.pricing_input())?;
        Ok(())
    }

    /// Moves back to the nearest earlier active step if the current one was
    /// hidden by the last edit.
    fn snap_to_active_step(&mut self) {
        let steps = self.active_steps();
        if steps.contains(&self.current) {
            return;
        }

        let hidden = self.current;
        self.current = steps
            .iter()
            .rev()
            .find(|step| **step < hidden)
            .copied()
            .unwrap_or(StepId::Header);
        debug!(%hidden, current = %self.current, "current step no longer active");
    }

    /// Advances to the next active step if the current step validates.
    ///
    /// Stays on the last step when there is nowhere further to go.
    pub fn next(&mut self) -> Result<StepId, WizardError> {
        let validation = self.validate_current();
        if !validation.is_valid {
            warn!(
                step = %self.current,
                missing = ?validation.missing_fields,
                "blocked navigation to next step"
            );
            return Err(WizardError::Incomplete {
                step: self.current,
                missing_fields: validation.missing_fields,
            });
        }

        if let Some(next) = self.active_steps().into_iter().find(|s| *s > self.current) {
            self.current = next;
            self.visited.insert(next);
        }
        Ok(self.current)
    }

    /// Moves to the previous active step. Never blocked.
    pub fn previous(&mut self) -> StepId {
        if let Some(previous) = self
            .active_steps()
            .into_iter()
            .rev()
            .find(|s| *s < self.current)
        {
            self.current = previous;
        }
        self.current
    }

    /// Jumps directly to `step`, subject to the configured [`JumpPolicy`].
    pub fn jump_to(
        &mut self,
        step: StepId,
    ) -> Result<StepId, WizardError> {
        if !self.active_steps().contains(&step) {
            return Err(WizardError::InactiveStep(step));
        }
        if self.config.jump_policy == JumpPolicy::VisitedOnly && !self.visited.contains(&step) {
            return Err(WizardError::StepNotReached(step));
        }

        self.current = step;
        self.visited.insert(step);
        Ok(step)
    }

    /// Runs the full-form check and returns what to submit.
    pub fn begin_completion(&self) -> Result<CompletionRequest, WizardError> {
        if self.is_completed() {
            return Err(WizardError::AlreadyCompleted);
        }

        let validation = validate_for_completion(&self.record);
        if !validation.is_valid {
            warn!(
                inspection_id = %self.record.id,
                missing = ?validation.missing_fields,
                "inspection not ready to complete"
            );
            return Err(WizardError::NotReadyToComplete {
                missing_fields: validation.missing_fields,
            });
        }

        Ok(CompletionRequest {
            inspection_id: self.record.id.clone(),
            estimate: self.breakdown.clone(),
        })
    }

    /// Records the server-confirmed completion.
    pub fn mark_completed(
        &mut self,
        summary: &CompletionSummary,
    ) {
        self.record.status = InspectionStatus::Completed;
        self.record.completed_at = Some(Utc::now());
        self.record.total_cost = Some(summary.total_cost);
        if let Some(breakdown) = &summary.breakdown {
            self.breakdown = Some(breakdown.clone());
        }
        self.pending.clear();
        info!(
            inspection_id = %self.record.id,
            total_cost = %summary.total_cost,
            "inspection completed"
        );
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Hands the unsaved fields to the caller, leaving none pending.
    pub fn take_pending(&mut self) -> PendingChanges {
        std::mem::take(&mut self.pending)
    }

    /// Puts back fields whose save failed.
    pub fn restore_pending(
        &mut self,
        changes: PendingChanges,
    ) {
        for (section, fields) in changes {
            self.pending.entry(section).or_default().extend(fields);
        }
    }

    /// Adopts server-assigned fields from a saved copy of the inspection.
    pub fn merge_server_record(
        &mut self,
        server: &InspectionRecord,
    ) {
        self.record.merge_server_fields(server);
    }

    /// Replaces the estimate with one computed elsewhere.
    pub fn set_breakdown(
        &mut self,
        breakdown: Option<CostBreakdown>,
    ) {
        self.breakdown = breakdown;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::PricingPolicy;
    use crate::models::{MouldLocation, WorkType};

    fn controller(record: InspectionRecord) -> WizardController {
        WizardController::new(
            record,
            PricingEngine::new(PricingPolicy::standard()),
            WizardConfig::default(),
        )
        .unwrap()
    }

    fn complete_area(name: &str) -> AreaAssessment {
        AreaAssessment {
            mould_visibility: vec![MouldLocation::Walls],
            temperature: Some(dec!(20)),
            humidity: Some(dec!(60)),
            ..AreaAssessment::new(name, 120, 0)
        }
    }

    fn complete_record() -> InspectionRecord {
        InspectionRecord {
            address: Some("3 Test Ave".to_string()),
            inspector_id: Some("tech-1".to_string()),
            property_occupation: Some(PropertyOccupation::Vacant),
            dwelling_type: Some(DwellingType::House),
            areas: vec![complete_area("Bathroom")],
            outdoor_temperature: Some(dec!(14)),
            outdoor_humidity: Some(dec!(72)),
            front_door_photo: Some("door.jpg".to_string()),
            front_house_photo: Some("house.jpg".to_string()),
            mailbox_photo: Some("mailbox.jpg".to_string()),
            street_photo: Some("street.jpg".to_string()),
            work_procedure: Some("Surface treatment".to_string()),
            ..InspectionRecord::new("insp-1")
        }
    }

    // =========================================================================
    // Navigation tests
    // =========================================================================

    #[test]
    fn starts_on_header() {
        let wizard = controller(InspectionRecord::new("insp-1"));

        assert_eq!(wizard.current_step(), StepId::Header);
        assert_eq!(wizard.position(), (1, 6));
    }

    #[test]
    fn next_is_blocked_by_missing_fields() {
        let mut wizard = controller(InspectionRecord::new("insp-1"));

        let result = wizard.next();

        assert_eq!(
            result,
            Err(WizardError::Incomplete {
                step: StepId::Header,
                missing_fields: vec![
                    "Property Address".to_string(),
                    "Inspector Assignment".to_string(),
                ],
            })
        );
        assert_eq!(wizard.current_step(), StepId::Header);
    }

    #[test]
    fn next_skips_inactive_optional_steps() {
        let mut wizard = controller(complete_record());

        assert_eq!(wizard.next(), Ok(StepId::Property));
        assert_eq!(wizard.next(), Ok(StepId::Areas));
        assert_eq!(wizard.next(), Ok(StepId::Outdoor));
        assert_eq!(wizard.next(), Ok(StepId::Procedure));
        assert_eq!(wizard.next(), Ok(StepId::Summary));
        assert_eq!(wizard.next(), Ok(StepId::Summary));
        assert_eq!(wizard.progress_percent(), 100);
    }

    #[test]
    fn previous_is_never_blocked() {
        let mut wizard = WizardController::resume(
            InspectionRecord::new("insp-1"),
            PricingEngine::new(PricingPolicy::standard()),
            WizardConfig::default(),
            Some(StepId::Outdoor),
        )
        .unwrap();

        assert_eq!(wizard.previous(), StepId::Areas);
        assert_eq!(wizard.previous(), StepId::Property);
        assert_eq!(wizard.previous(), StepId::Header);
        assert_eq!(wizard.previous(), StepId::Header);
    }

    #[test]
    fn resume_ignores_inactive_step() {
        let wizard = WizardController::resume(
            complete_record(),
            PricingEngine::new(PricingPolicy::standard()),
            WizardConfig::default(),
            Some(StepId::Waste),
        )
        .unwrap();

        assert_eq!(wizard.current_step(), StepId::Header);
    }

    #[test]
    fn visited_only_policy_blocks_unvisited_jumps() {
        let mut wizard = controller(complete_record());

        assert_eq!(
            wizard.jump_to(StepId::Outdoor),
            Err(WizardError::StepNotReached(StepId::Outdoor))
        );

        wizard.next().unwrap();
        wizard.next().unwrap();
        assert_eq!(wizard.jump_to(StepId::Header), Ok(StepId::Header));
        assert_eq!(wizard.jump_to(StepId::Areas), Ok(StepId::Areas));
    }

    #[test]
    fn unrestricted_policy_allows_any_active_step() {
        let mut wizard = WizardController::new(
            InspectionRecord::new("insp-1"),
            PricingEngine::new(PricingPolicy::standard()),
            WizardConfig {
                jump_policy: JumpPolicy::Unrestricted,
                ..WizardConfig::default()
            },
        )
        .unwrap();

        assert_eq!(wizard.jump_to(StepId::Summary), Ok(StepId::Summary));
        assert_eq!(
            wizard.jump_to(StepId::Subfloor),
            Err(WizardError::InactiveStep(StepId::Subfloor))
        );
    }

    #[test]
    fn disabling_current_optional_step_snaps_back() {
        let record = InspectionRecord {
            subfloor_enabled: true,
            ..complete_record()
        };
        let mut wizard = WizardController::resume(
            record,
            PricingEngine::new(PricingPolicy::standard()),
            WizardConfig::default(),
            Some(StepId::Subfloor),
        )
        .unwrap();

        wizard.apply(InspectionUpdate::SubfloorEnabled(false)).unwrap();

        assert_eq!(wizard.current_step(), StepId::Areas);
    }

    // =========================================================================
    // Editing tests
    // =========================================================================

    #[test]
    fn apply_marks_section_fields_pending() {
        let mut wizard = controller(InspectionRecord::new("insp-1"));

        wizard
            .apply(InspectionUpdate::Address(Some("9 New St".to_string())))
            .unwrap();
        wizard
            .apply(InspectionUpdate::OutdoorHumidity(Some(dec!(55))))
            .unwrap();

        let pending = wizard.take_pending();
        assert_eq!(wizard.generation(), 2);
        assert_eq!(
            pending.get(&StepId::Header),
            Some(&BTreeSet::from(["address"]))
        );
        assert_eq!(
            pending.get(&StepId::Outdoor),
            Some(&BTreeSet::from(["outdoorDewPoint", "outdoorHumidity"]))
        );
        assert!(!wizard.has_pending());
    }

    #[test]
    fn restore_pending_merges_with_new_edits() {
        let mut wizard = controller(InspectionRecord::new("insp-1"));
        wizard
            .apply(InspectionUpdate::Address(Some("9 New St".to_string())))
            .unwrap();
        let taken = wizard.take_pending();

        wizard
            .apply(InspectionUpdate::Inspector(Some("tech-2".to_string())))
            .unwrap();
        wizard.restore_pending(taken);

        assert_eq!(
            wizard.take_pending().get(&StepId::Header),
            Some(&BTreeSet::from(["address", "inspectorId"]))
        );
    }

    #[test]
    fn readings_update_dew_point() {
        let mut wizard = controller(InspectionRecord::new("insp-1"));

        wizard
            .apply(InspectionUpdate::OutdoorTemperature(Some(dec!(20))))
            .unwrap();
        wizard
            .apply(InspectionUpdate::OutdoorHumidity(Some(dec!(50))))
            .unwrap();

        assert_eq!(wizard.record().outdoor_dew_point, Some(dec!(9.3)));
    }

    #[test]
    fn area_index_out_of_range_is_rejected() {
        let mut wizard = controller(InspectionRecord::new("insp-1"));

        let result = wizard.apply(InspectionUpdate::RemoveArea(0));

        assert_eq!(result, Err(WizardError::AreaOutOfRange { index: 0, len: 0 }));
        assert_eq!(wizard.generation(), 0);
    }

    #[test]
    fn zero_drying_days_is_rejected() {
        let mut wizard = controller(InspectionRecord::new("insp-1"));

        assert_eq!(
            wizard.apply(InspectionUpdate::DryingDays(0)),
            Err(WizardError::InvalidDryingDays)
        );
        assert!(!wizard.has_pending());
    }

    // =========================================================================
    // Breakdown tests
    // =========================================================================

    #[test]
    fn breakdown_absent_until_an_area_has_time() {
        let mut wizard = controller(InspectionRecord::new("insp-1"));
        assert_eq!(wizard.breakdown(), None);

        wizard
            .apply(InspectionUpdate::AddArea(AreaAssessment::new("Hall", 0, 0)))
            .unwrap();
        assert_eq!(wizard.breakdown(), None);

        wizard
            .apply(InspectionUpdate::ReplaceArea {
                index: 0,
                area: AreaAssessment::new("Hall", 120, 0),
            })
            .unwrap();
        assert_eq!(wizard.breakdown().map(|b| b.labour_cost), Some(dec!(612.00)));
    }

    #[test]
    fn equipment_changes_recalculate() {
        let mut wizard = controller(complete_record());

        wizard
            .apply(InspectionUpdate::DryingEquipmentEnabled(true))
            .unwrap();
        wizard
            .apply(InspectionUpdate::EquipmentQuantity {
                kind: EquipmentKind::Dehumidifier,
                qty: 2,
            })
            .unwrap();
        wizard.apply(InspectionUpdate::DryingDays(3)).unwrap();

        let breakdown = wizard.breakdown().unwrap();
        assert_eq!(breakdown.equipment_cost, dec!(792));
        assert_eq!(breakdown.subtotal, dec!(1404.00));
        assert_eq!(breakdown.total_cost, dec!(1544.40));
    }

    #[test]
    fn subfloor_and_dwelling_change_work_type() {
        let mut wizard = controller(complete_record());

        wizard
            .apply(InspectionUpdate::DwellingType(Some(DwellingType::Construction)))
            .unwrap();
        assert_eq!(
            wizard.breakdown().map(|b| b.work_type),
            Some(WorkType::Construction)
        );

        wizard.apply(InspectionUpdate::SubfloorEnabled(true)).unwrap();
        assert_eq!(
            wizard.breakdown().map(|b| b.work_type),
            Some(WorkType::Subfloor)
        );
    }

    // =========================================================================
    // Completion tests
    // =========================================================================

    #[test]
    fn begin_completion_requires_every_active_step() {
        let record = InspectionRecord {
            street_photo: None,
            ..complete_record()
        };
        let wizard = controller(record);

        assert_eq!(
            wizard.begin_completion(),
            Err(WizardError::NotReadyToComplete {
                missing_fields: vec!["Street Photo".to_string()],
            })
        );
    }

    #[test]
    fn completed_inspection_rejects_edits() {
        let mut wizard = controller(complete_record());
        let request = wizard.begin_completion().unwrap();
        assert_eq!(request.inspection_id, "insp-1");
        assert_eq!(
            request.estimate.as_ref().map(|b| b.total_cost),
            Some(dec!(673.20))
        );

        wizard.mark_completed(&CompletionSummary {
            total_cost: dec!(673.20),
            breakdown: None,
        });

        assert!(wizard.is_completed());
        assert_eq!(wizard.record().total_cost, Some(dec!(673.20)));
        assert_eq!(
            wizard.apply(InspectionUpdate::Address(None)),
            Err(WizardError::AlreadyCompleted)
        );
        assert_eq!(
            wizard.begin_completion(),
            Err(WizardError::AlreadyCompleted)
        );
    }

    #[test]
    fn invalid_policy_is_rejected_up_front() {
        let policy = PricingPolicy {
            gst_rate: dec!(2),
            ..PricingPolicy::standard()
        };

        let result = WizardController::new(
            InspectionRecord::new("insp-1"),
            PricingEngine::new(policy),
            WizardConfig::default(),
        );

        assert_eq!(
            result.err(),
            Some(WizardError::Pricing(PricingError::InvalidGstRate(dec!(2))))
        );
    }
}
