use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::{EquipmentKind, WorkType};
use crate::calculations::common::format_currency;

/// Per-area time line shown in the estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDetail {
    pub area_name: String,
    pub job_time: u32,
    pub demolition_time: u32,
    pub total_minutes: u64,
}

/// One equipment hire line. Unused equipment is all zeroes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EquipmentLine {
    pub qty: u32,
    pub days: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
}

/// Equipment hire lines keyed the way the inspection API reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentDetails {
    pub dehumidifiers: EquipmentLine,
    pub air_movers: EquipmentLine,
    pub rcd_box: EquipmentLine,
}

impl EquipmentDetails {
    pub fn line(
        &self,
        kind: EquipmentKind,
    ) -> &EquipmentLine {
        match kind {
            EquipmentKind::Dehumidifier => &self.dehumidifiers,
            EquipmentKind::AirMover => &self.air_movers,
            EquipmentKind::RcdBox => &self.rcd_box,
        }
    }

    pub(crate) fn line_mut(
        &mut self,
        kind: EquipmentKind,
    ) -> &mut EquipmentLine {
        match kind {
            EquipmentKind::Dehumidifier => &mut self.dehumidifiers,
            EquipmentKind::AirMover => &mut self.air_movers,
            EquipmentKind::RcdBox => &mut self.rcd_box,
        }
    }

    /// Lines with a non-zero quantity, in display order.
    pub fn displayed_lines(&self) -> Vec<(EquipmentKind, EquipmentLine)> {
        EquipmentKind::all()
            .iter()
            .map(|kind| (*kind, *self.line(*kind)))
            .filter(|(_, line)| line.qty > 0)
            .collect()
    }
}

/// Job cost estimate derived from the current inspection data.
///
/// Recomputed on every relevant change and never persisted on its own.
/// All money values are rounded to cents; `total_hours` keeps full
/// precision and is only rounded for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    #[serde(with = "rust_decimal::serde::float")]
    pub labour_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub equipment_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gst: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cost: Decimal,
    pub work_type: WorkType,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_hours: Decimal,
    /// Volume discount as a fraction, e.g. `0.075` for 7.5 %.
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub area_details: Vec<AreaDetail>,
    #[serde(default)]
    pub equipment_details: EquipmentDetails,
}

impl fmt::Display for CostBreakdown {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Labour:      {}", format_currency(self.labour_cost))?;
        writeln!(f, "Equipment:   {}", format_currency(self.equipment_cost))?;
        writeln!(f, "Subtotal:    {}", format_currency(self.subtotal))?;
        writeln!(f, "GST (10%):   {}", format_currency(self.gst))?;
        writeln!(f, "Total:       {}", format_currency(self.total_cost))?;
        writeln!(f)?;
        writeln!(f, "Work type:   {}", self.work_type)?;
        writeln!(
            f,
            "Total hours: {:.2}",
            self.total_hours
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        )?;
        write!(
            f,
            "Discount:    {:.1}%",
            (self.discount_percent * Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        )
    }
}
