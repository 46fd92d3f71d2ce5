mod area;
mod cost_breakdown;
mod equipment;
mod inspection;
mod work_type;

pub use area::{AreaAssessment, MouldLocation};
pub use cost_breakdown::{AreaDetail, CostBreakdown, EquipmentDetails, EquipmentLine};
pub use equipment::{EquipmentKind, EquipmentSelection};
pub use inspection::{
    DwellingType, ExteriorPhoto, InspectionRecord, InspectionStatus, PropertyOccupation,
    Treatment, WasteAmount,
};
pub use work_type::WorkType;

use serde::{Deserialize, Deserializer};

/// Treats an explicit JSON `null` the same as a missing field.
///
/// The inspection API sends `null` for numeric and boolean columns that were
/// never filled in, which plain `#[serde(default)]` does not cover.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
