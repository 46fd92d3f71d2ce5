use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AreaAssessment, EquipmentKind, EquipmentSelection, null_as_default};
use crate::calculations::PricingInput;
use crate::calculations::dew_point::dew_point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyOccupation {
    Tenanted,
    Vacant,
    OwnerOccupied,
    TenantsVacating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DwellingType {
    House,
    Units,
    Apartment,
    Duplex,
    Townhouse,
    Commercial,
    Construction,
    Industrial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WasteAmount {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

/// The four exterior photographs required in the outdoor section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExteriorPhoto {
    FrontDoor,
    FrontHouse,
    Mailbox,
    Street,
}

impl ExteriorPhoto {
    pub fn all() -> &'static [ExteriorPhoto] {
        &[
            ExteriorPhoto::FrontDoor,
            ExteriorPhoto::FrontHouse,
            ExteriorPhoto::Mailbox,
            ExteriorPhoto::Street,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FrontDoor => "Front Door Photo",
            Self::FrontHouse => "Front House Photo",
            Self::Mailbox => "Mailbox Photo",
            Self::Street => "Street Photo",
        }
    }

    /// Field name in the inspection API payload.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::FrontDoor => "frontDoorPhoto",
            Self::FrontHouse => "frontHousePhoto",
            Self::Mailbox => "mailboxPhoto",
            Self::Street => "streetPhoto",
        }
    }
}

/// Treatment steps ticked in the work procedure section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Treatment {
    HepaVac,
    Antimicrobial,
    StainRemovingAntimicrobial,
    HomeSanitationFogging,
}

impl Treatment {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::HepaVac => "hepaVac",
            Self::Antimicrobial => "antimicrobial",
            Self::StainRemovingAntimicrobial => "stainRemovingAntimicrobial",
            Self::HomeSanitationFogging => "homeSanitationFogging",
        }
    }
}

/// Everything the inspection wizard collects for one job.
///
/// Field names serialize in camelCase to match the inspection API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectionRecord {
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: InspectionStatus,
    pub job_number: Option<String>,

    // Header
    pub address: Option<String>,
    pub inspector_id: Option<String>,
    pub attention_to: Option<String>,
    pub inspection_date: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,

    // Property
    pub property_occupation: Option<PropertyOccupation>,
    pub dwelling_type: Option<DwellingType>,

    // Areas
    #[serde(deserialize_with = "null_as_default")]
    pub areas: Vec<AreaAssessment>,

    // Subfloor
    #[serde(deserialize_with = "null_as_default")]
    pub subfloor_enabled: bool,
    /// Subfloor treatment time in minutes.
    #[serde(deserialize_with = "null_as_default")]
    pub subfloor_treatment_time: u32,
    pub subfloor_observation: Option<String>,

    // Outdoor
    #[serde(with = "rust_decimal::serde::float_option")]
    pub outdoor_temperature: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub outdoor_humidity: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub outdoor_dew_point: Option<Decimal>,
    pub outdoor_comments: Option<String>,
    pub front_door_photo: Option<String>,
    pub front_house_photo: Option<String>,
    pub mailbox_photo: Option<String>,
    pub street_photo: Option<String>,

    // Waste
    #[serde(deserialize_with = "null_as_default")]
    pub waste_disposal_enabled: bool,
    pub waste_disposal_amount: Option<WasteAmount>,

    // Procedure
    pub work_procedure: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub hepa_vac: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub antimicrobial: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub stain_removing_antimicrobial: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub home_sanitation_fogging: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub drying_equipment_enabled: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub dehumidifier_qty: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub air_mover_qty: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub rcd_box_qty: u32,
    pub drying_days: Option<u32>,

    // Summary
    pub cause_of_mould: Option<String>,
    pub parking_options: Option<String>,
    pub additional_info_technician: Option<String>,

    // Completion
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub total_cost: Option<Decimal>,
}

impl Default for InspectionRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            status: InspectionStatus::Scheduled,
            job_number: None,
            address: None,
            inspector_id: None,
            attention_to: None,
            inspection_date: None,
            arrived_at: None,
            property_occupation: None,
            dwelling_type: None,
            areas: Vec::new(),
            subfloor_enabled: false,
            subfloor_treatment_time: 0,
            subfloor_observation: None,
            outdoor_temperature: None,
            outdoor_humidity: None,
            outdoor_dew_point: None,
            outdoor_comments: None,
            front_door_photo: None,
            front_house_photo: None,
            mailbox_photo: None,
            street_photo: None,
            waste_disposal_enabled: false,
            waste_disposal_amount: None,
            work_procedure: None,
            hepa_vac: false,
            antimicrobial: false,
            stain_removing_antimicrobial: false,
            home_sanitation_fogging: false,
            drying_equipment_enabled: false,
            dehumidifier_qty: 0,
            air_mover_qty: 0,
            rcd_box_qty: 0,
            drying_days: None,
            cause_of_mould: None,
            parking_options: None,
            additional_info_technician: None,
            completed_at: None,
            total_cost: None,
        }
    }
}

impl InspectionRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn photo(
        &self,
        kind: ExteriorPhoto,
    ) -> Option<&str> {
        match kind {
            ExteriorPhoto::FrontDoor => self.front_door_photo.as_deref(),
            ExteriorPhoto::FrontHouse => self.front_house_photo.as_deref(),
            ExteriorPhoto::Mailbox => self.mailbox_photo.as_deref(),
            ExteriorPhoto::Street => self.street_photo.as_deref(),
        }
    }

    pub fn photo_mut(
        &mut self,
        kind: ExteriorPhoto,
    ) -> &mut Option<String> {
        match kind {
            ExteriorPhoto::FrontDoor => &mut self.front_door_photo,
            ExteriorPhoto::FrontHouse => &mut self.front_house_photo,
            ExteriorPhoto::Mailbox => &mut self.mailbox_photo,
            ExteriorPhoto::Street => &mut self.street_photo,
        }
    }

    pub fn treatment_mut(
        &mut self,
        treatment: Treatment,
    ) -> &mut bool {
        match treatment {
            Treatment::HepaVac => &mut self.hepa_vac,
            Treatment::Antimicrobial => &mut self.antimicrobial,
            Treatment::StainRemovingAntimicrobial => &mut self.stain_removing_antimicrobial,
            Treatment::HomeSanitationFogging => &mut self.home_sanitation_fogging,
        }
    }

    pub fn equipment_qty_mut(
        &mut self,
        kind: EquipmentKind,
    ) -> &mut u32 {
        match kind {
            EquipmentKind::Dehumidifier => &mut self.dehumidifier_qty,
            EquipmentKind::AirMover => &mut self.air_mover_qty,
            EquipmentKind::RcdBox => &mut self.rcd_box_qty,
        }
    }

    /// Hire days for drying equipment; unset or zero counts as one day.
    pub fn rental_days(&self) -> u32 {
        self.drying_days.filter(|days| *days > 0).unwrap_or(1)
    }

    /// Equipment that will actually be charged.
    ///
    /// Quantities are ignored while drying equipment is switched off.
    pub fn equipment_selection(&self) -> EquipmentSelection {
        if !self.drying_equipment_enabled {
            return EquipmentSelection {
                rental_days: self.rental_days(),
                ..EquipmentSelection::none()
            };
        }

        EquipmentSelection {
            dehumidifier_qty: self.dehumidifier_qty,
            air_mover_qty: self.air_mover_qty,
            rcd_box_qty: self.rcd_box_qty,
            rental_days: self.rental_days(),
        }
    }

    pub fn pricing_input(&self) -> PricingInput<'_> {
        PricingInput {
            areas: &self.areas,
            equipment: self.equipment_selection(),
            subfloor_enabled: self.subfloor_enabled,
            dwelling_type: self.dwelling_type,
        }
    }

    /// True when at least one area carries treatment time.
    pub fn has_area_time(&self) -> bool {
        self.areas.iter().any(|area| area.job_time_minutes > 0)
    }

    /// Builds the JSON body for a section save containing only `fields`.
    ///
    /// Field names are the camelCase API names; unknown names are skipped.
    pub fn section_payload<'a>(
        &self,
        fields: impl IntoIterator<Item = &'a str>,
    ) -> Result<serde_json::Map<String, serde_json::Value>, serde_json::Error> {
        let serde_json::Value::Object(mut all) = serde_json::to_value(self)? else {
            return Ok(serde_json::Map::new());
        };

        Ok(fields
            .into_iter()
            .filter_map(|field| all.remove_entry(field))
            .collect())
    }

    /// Copies the fields only the server assigns (status, job number and
    /// timestamps) from a saved copy of this inspection.
    pub fn merge_server_fields(
        &mut self,
        server: &InspectionRecord,
    ) {
        self.status = server.status;
        if server.job_number.is_some() {
            self.job_number.clone_from(&server.job_number);
        }
        if server.arrived_at.is_some() {
            self.arrived_at = server.arrived_at;
        }
        if server.completed_at.is_some() {
            self.completed_at = server.completed_at;
        }
        if server.total_cost.is_some() {
            self.total_cost = server.total_cost;
        }
    }

    /// Recomputes the outdoor and per-area dew points from their readings.
    pub fn refresh_dew_points(&mut self) {
        self.outdoor_dew_point = match (self.outdoor_temperature, self.outdoor_humidity) {
            (Some(temperature), Some(humidity)) => dew_point(temperature, humidity),
            _ => None,
        };

        for area in &mut self.areas {
            area.dew_point = match (area.temperature, area.humidity) {
                (Some(temperature), Some(humidity)) => dew_point(temperature, humidity),
                _ => None,
            };
        }
    }
}
