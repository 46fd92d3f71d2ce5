use std::fmt;

use serde::{Deserialize, Serialize};

/// Hire equipment left on site for drying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentKind {
    Dehumidifier,
    AirMover,
    RcdBox,
}

impl EquipmentKind {
    pub fn all() -> &'static [EquipmentKind] {
        &[
            EquipmentKind::Dehumidifier,
            EquipmentKind::AirMover,
            EquipmentKind::RcdBox,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dehumidifier => "DEHUMIDIFIER",
            Self::AirMover => "AIR_MOVER",
            Self::RcdBox => "RCD_BOX",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEHUMIDIFIER" => Some(Self::Dehumidifier),
            "AIR_MOVER" => Some(Self::AirMover),
            "RCD_BOX" => Some(Self::RcdBox),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Dehumidifier => "Dehumidifiers",
            Self::AirMover => "Air movers",
            Self::RcdBox => "RCD boxes",
        }
    }
}

impl fmt::Display for EquipmentKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quantities of each equipment kind and how many days they are hired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentSelection {
    pub dehumidifier_qty: u32,
    pub air_mover_qty: u32,
    pub rcd_box_qty: u32,
    /// Must be at least 1; a zero is rejected by the cost calculator.
    pub rental_days: u32,
}

impl EquipmentSelection {
    /// A selection with no equipment hired for the minimum of one day.
    pub fn none() -> Self {
        Self {
            dehumidifier_qty: 0,
            air_mover_qty: 0,
            rcd_box_qty: 0,
            rental_days: 1,
        }
    }

    pub fn quantity(
        &self,
        kind: EquipmentKind,
    ) -> u32 {
        match kind {
            EquipmentKind::Dehumidifier => self.dehumidifier_qty,
            EquipmentKind::AirMover => self.air_mover_qty,
            EquipmentKind::RcdBox => self.rcd_box_qty,
        }
    }

    pub fn is_empty(&self) -> bool {
        EquipmentKind::all()
            .iter()
            .all(|kind| self.quantity(*kind) == 0)
    }
}

impl Default for EquipmentSelection {
    fn default() -> Self {
        Self::none()
    }
}
