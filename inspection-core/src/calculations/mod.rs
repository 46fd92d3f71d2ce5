//! Cost calculations for mould inspections.
//!
//! Leaf calculators ([`area_time`], [`equipment`]) feed the [`pricing`]
//! engine, which composes the final GST-inclusive estimate.

pub mod area_time;
pub mod common;
pub mod dew_point;
pub mod equipment;
pub mod pricing;

pub use area_time::{AreaTimeSummary, aggregate_area_time};
pub use equipment::{EquipmentCost, EquipmentCostCalculator, EquipmentRates};
pub use pricing::{
    DiscountTier, LabourAnchors, PricingEngine, PricingError, PricingInput, PricingPolicy,
    determine_work_type,
};
