//! Job cost estimate for a mould inspection.
//!
//! The engine turns area times, the dwelling context and an equipment
//! selection into a GST-inclusive [`CostBreakdown`]:
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Total hours = Σ (job time + demolition time) / 60 |
//! | 2    | Work type: Subfloor, then Demolition, then Construction, else Surface |
//! | 3    | Hourly rate interpolated between the 2-hour and 8-hour package prices |
//! | 4    | Volume discount from the tier table, applied to labour only |
//! | 5    | Labour = rate × hours × (1 − discount), rounded to cents |
//! | 6    | Equipment = Σ qty × daily rate × rental days |
//! | 7    | Subtotal = labour + equipment |
//! | 8    | GST = subtotal × GST rate, rounded to cents |
//! | 9    | Total = subtotal + GST |
//!
//! # Insufficient data
//!
//! When there is no labour time and no equipment the engine returns
//! `Ok(None)` rather than a zero estimate.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use rust_decimal_macros::dec;
//! use inspection_core::{AreaAssessment, EquipmentSelection, WorkType};
//! use inspection_core::calculations::{
//!     DiscountTier, EquipmentRates, LabourAnchors, PricingEngine, PricingInput, PricingPolicy,
//! };
//!
//! let anchors = LabourAnchors { two_hour: dec!(80), eight_hour: dec!(320) };
//! let policy = PricingPolicy {
//!     labour: WorkType::all().iter().map(|w| (*w, anchors.clone())).collect::<BTreeMap<_, _>>(),
//!     equipment: EquipmentRates { dehumidifier: dec!(50), air_mover: dec!(0), rcd_box: dec!(0) },
//!     discount_tiers: vec![DiscountTier { above_hours: dec!(16), discount: dec!(0.10) }],
//!     gst_rate: dec!(0.10),
//! };
//!
//! let areas = vec![AreaAssessment::new("Basement", 1200, 0)];
//! let input = PricingInput {
//!     areas: &areas,
//!     equipment: EquipmentSelection { dehumidifier_qty: 2, rental_days: 3, ..EquipmentSelection::none() },
//!     subfloor_enabled: false,
//!     dwelling_type: None,
//! };
//!
//! let breakdown = PricingEngine::new(policy).calculate(&input).unwrap().unwrap();
//! assert_eq!(breakdown.labour_cost, dec!(720.00));
//! assert_eq!(breakdown.equipment_cost, dec!(300));
//! assert_eq!(breakdown.gst, dec!(102.00));
//! assert_eq!(breakdown.total_cost, dec!(1122.00));
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::area_time::aggregate_area_time;
use crate::calculations::common::round_half_up;
use crate::calculations::equipment::{EquipmentCostCalculator, EquipmentRates};
use crate::models::{
    AreaAssessment, CostBreakdown, DwellingType, EquipmentKind, EquipmentSelection, WorkType,
};

const TWO_HOURS: Decimal = Decimal::TWO;
const EIGHT_HOURS: Decimal = Decimal::from_parts(8, 0, 0, false, 0);
const INTERPOLATION_SPAN: Decimal = Decimal::from_parts(6, 0, 0, false, 0);

/// Errors raised for an invalid pricing policy or equipment selection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("labour anchor for {work_type} must be non-negative, got {value}")]
    InvalidLabourAnchor { work_type: WorkType, value: Decimal },

    #[error("no labour anchors configured for {0}")]
    MissingLabourAnchor(WorkType),

    #[error("daily rate for {kind} must be non-negative, got {rate}")]
    InvalidEquipmentRate { kind: EquipmentKind, rate: Decimal },

    #[error("discount must be in [0, 1), got {0}")]
    InvalidDiscount(Decimal),

    /// Tier thresholds must be non-negative and strictly ascending.
    #[error("discount threshold {0} hours is negative or out of order")]
    InvalidDiscountThreshold(Decimal),

    #[error("GST rate must be in [0, 1), got {0}")]
    InvalidGstRate(Decimal),

    #[error("equipment rental days must be at least 1")]
    InvalidRentalDays,
}

/// Package prices for a 2-hour and an 8-hour job of one work type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabourAnchors {
    pub two_hour: Decimal,
    pub eight_hour: Decimal,
}

impl LabourAnchors {
    /// Hourly rate for a job of `hours`.
    ///
    /// Jobs of 2 hours or less pay the 2-hour rate, jobs of 8 hours or more
    /// pay the 8-hour rate, and the rate is linear in between.
    pub fn hourly_rate(
        &self,
        hours: Decimal,
    ) -> Decimal {
        let rate_2h = self.two_hour / TWO_HOURS;
        let rate_8h = self.eight_hour / EIGHT_HOURS;

        if hours <= TWO_HOURS {
            return rate_2h;
        }
        if hours >= EIGHT_HOURS {
            return rate_8h;
        }

        rate_2h + (rate_8h - rate_2h) * (hours - TWO_HOURS) / INTERPOLATION_SPAN
    }
}

/// A volume discount that applies once total hours exceed `above_hours`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTier {
    pub above_hours: Decimal,
    /// Fraction of labour, e.g. `0.075`.
    pub discount: Decimal,
}

/// Rates, discounts and tax used to price a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub labour: BTreeMap<WorkType, LabourAnchors>,
    pub equipment: EquipmentRates,
    /// Ordered by ascending threshold.
    pub discount_tiers: Vec<DiscountTier>,
    pub gst_rate: Decimal,
}

impl PricingPolicy {
    /// Rates in effect when no pricing table is supplied.
    pub fn standard() -> Self {
        let anchors = [
            (WorkType::Surface, dec!(612.00), dec!(1216.99)),
            (WorkType::Demolition, dec!(711.90), dec!(1798.90)),
            (WorkType::Construction, dec!(661.96), dec!(1507.95)),
            (WorkType::Subfloor, dec!(900.00), dec!(2334.69)),
        ];

        Self {
            labour: anchors
                .into_iter()
                .map(|(work_type, two_hour, eight_hour)| {
                    (
                        work_type,
                        LabourAnchors {
                            two_hour,
                            eight_hour,
                        },
                    )
                })
                .collect(),
            equipment: EquipmentRates {
                dehumidifier: dec!(132),
                air_mover: dec!(46),
                rcd_box: dec!(5),
            },
            discount_tiers: vec![
                DiscountTier {
                    above_hours: dec!(8),
                    discount: dec!(0.075),
                },
                DiscountTier {
                    above_hours: dec!(16),
                    discount: dec!(0.10),
                },
                DiscountTier {
                    above_hours: dec!(24),
                    discount: dec!(0.13),
                },
            ],
            gst_rate: dec!(0.10),
        }
    }

    /// Validates the policy values.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] if:
    /// - any work type has no anchors, or an anchor is negative
    /// - any equipment rate is negative
    /// - a discount is outside [0, 1) or thresholds are not strictly ascending
    /// - `gst_rate` is outside [0, 1)
    pub fn validate(&self) -> Result<(), PricingError> {
        for work_type in WorkType::all() {
            let anchors = self
                .labour
                .get(work_type)
                .ok_or(PricingError::MissingLabourAnchor(*work_type))?;
            for value in [anchors.two_hour, anchors.eight_hour] {
                if value < Decimal::ZERO {
                    return Err(PricingError::InvalidLabourAnchor {
                        work_type: *work_type,
                        value,
                    });
                }
            }
        }

        self.equipment.validate()?;

        let mut previous: Option<Decimal> = None;
        for tier in &self.discount_tiers {
            if tier.discount < Decimal::ZERO || tier.discount >= Decimal::ONE {
                return Err(PricingError::InvalidDiscount(tier.discount));
            }
            let out_of_order = previous.is_some_and(|prev| tier.above_hours <= prev);
            if tier.above_hours < Decimal::ZERO || out_of_order {
                return Err(PricingError::InvalidDiscountThreshold(tier.above_hours));
            }
            previous = Some(tier.above_hours);
        }

        if self.gst_rate < Decimal::ZERO || self.gst_rate >= Decimal::ONE {
            return Err(PricingError::InvalidGstRate(self.gst_rate));
        }
        Ok(())
    }

    /// Discount of the highest tier whose threshold is strictly below `hours`.
    pub fn discount_for(
        &self,
        hours: Decimal,
    ) -> Decimal {
        self.discount_tiers
            .iter()
            .rev()
            .find(|tier| hours > tier.above_hours)
            .map(|tier| tier.discount)
            .unwrap_or(Decimal::ZERO)
    }
}

/// The parts of an inspection that affect its price.
#[derive(Debug, Clone, Copy)]
pub struct PricingInput<'a> {
    pub areas: &'a [AreaAssessment],
    pub equipment: EquipmentSelection,
    pub subfloor_enabled: bool,
    pub dwelling_type: Option<DwellingType>,
}

/// Classifies the job, most labour-intensive first.
pub fn determine_work_type(
    areas: &[AreaAssessment],
    subfloor_enabled: bool,
    dwelling_type: Option<DwellingType>,
) -> WorkType {
    if subfloor_enabled {
        WorkType::Subfloor
    } else if areas.iter().any(AreaAssessment::requires_demolition) {
        WorkType::Demolition
    } else if dwelling_type == Some(DwellingType::Construction) {
        WorkType::Construction
    } else {
        WorkType::Surface
    }
}

/// Calculator producing a [`CostBreakdown`] from a [`PricingInput`].
#[derive(Debug, Clone)]
pub struct PricingEngine {
    policy: PricingPolicy,
}

impl PricingEngine {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// Calculates the estimate, or `None` when there is nothing to charge.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] if the policy is invalid or the equipment
    /// selection has zero rental days.
    pub fn calculate(
        &self,
        input: &PricingInput<'_>,
    ) -> Result<Option<CostBreakdown>, PricingError> {
        self.policy.validate()?;

        let time = aggregate_area_time(input.areas);
        let equipment = EquipmentCostCalculator::new(&self.policy.equipment)
            .calculate(&input.equipment)?;

        if time.is_empty() && equipment.total.is_zero() {
            debug!(
                areas = input.areas.len(),
                "no labour time or equipment, cost estimate not available"
            );
            return Ok(None);
        }

        let work_type =
            determine_work_type(input.areas, input.subfloor_enabled, input.dwelling_type);
        let discount = self.policy.discount_for(time.total_hours);
        let labour_cost = self.labour_cost(work_type, time.total_hours, discount)?;

        let subtotal = labour_cost + equipment.total;
        let gst = round_half_up(subtotal * self.policy.gst_rate);
        let total_cost = subtotal + gst;

        debug!(
            %work_type,
            hours = %time.total_hours,
            %discount,
            %total_cost,
            "calculated cost estimate"
        );

        Ok(Some(CostBreakdown {
            labour_cost,
            equipment_cost: equipment.total,
            subtotal,
            gst,
            total_cost,
            work_type,
            total_hours: time.total_hours,
            discount_percent: discount,
            area_details: time.area_details,
            equipment_details: equipment.details,
        }))
    }

    fn labour_cost(
        &self,
        work_type: WorkType,
        hours: Decimal,
        discount: Decimal,
    ) -> Result<Decimal, PricingError> {
        if hours.is_zero() {
            return Ok(Decimal::ZERO);
        }

        let anchors = self
            .policy
            .labour
            .get(&work_type)
            .ok_or(PricingError::MissingLabourAnchor(work_type))?;
        let rate = anchors.hourly_rate(hours);

        Ok(round_half_up(rate * hours * (Decimal::ONE - discount)))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn standard_policy() -> PricingPolicy {
        PricingPolicy::standard()
    }

    /// $40/h for every work type and a single 10 % tier above 16 hours.
    fn flat_policy() -> PricingPolicy {
        PricingPolicy {
            labour: WorkType::all()
                .iter()
                .map(|work_type| {
                    (
                        *work_type,
                        LabourAnchors {
                            two_hour: dec!(80),
                            eight_hour: dec!(320),
                        },
                    )
                })
                .collect(),
            equipment: EquipmentRates {
                dehumidifier: dec!(50),
                air_mover: dec!(0),
                rcd_box: dec!(0),
            },
            discount_tiers: vec![DiscountTier {
                above_hours: dec!(16),
                discount: dec!(0.10),
            }],
            gst_rate: dec!(0.10),
        }
    }

    fn input(areas: &[AreaAssessment]) -> PricingInput<'_> {
        PricingInput {
            areas,
            equipment: EquipmentSelection::none(),
            subfloor_enabled: false,
            dwelling_type: None,
        }
    }

    fn calculate(
        policy: PricingPolicy,
        input: &PricingInput<'_>,
    ) -> CostBreakdown {
        PricingEngine::new(policy)
            .calculate(input)
            .unwrap()
            .expect("estimate should be available")
    }

    // =========================================================================
    // Labour anchor tests
    // =========================================================================

    #[test]
    fn two_hour_surface_job_costs_the_package_price() {
        let areas = vec![AreaAssessment::new("Bathroom", 120, 0)];

        let breakdown = calculate(standard_policy(), &input(&areas));

        assert_eq!(breakdown.labour_cost, dec!(612.00));
        assert_eq!(breakdown.discount_percent, Decimal::ZERO);
    }

    #[test]
    fn eight_hour_surface_job_costs_the_package_price_without_discount() {
        let areas = vec![AreaAssessment::new("Whole house", 480, 0)];

        let breakdown = calculate(standard_policy(), &input(&areas));

        assert_eq!(breakdown.labour_cost, dec!(1216.99));
        assert_eq!(breakdown.discount_percent, Decimal::ZERO);
    }

    #[test]
    fn short_jobs_pay_the_two_hour_rate() {
        let anchors = &standard_policy().labour[&WorkType::Surface];

        assert_eq!(anchors.hourly_rate(dec!(0.5)), dec!(306));
        assert_eq!(anchors.hourly_rate(dec!(2)), dec!(306));
    }

    #[test]
    fn rate_is_interpolated_between_anchors() {
        let areas = vec![AreaAssessment::new("Ground floor", 300, 0)];

        let breakdown = calculate(standard_policy(), &input(&areas));

        // rate = 306 + (152.12375 − 306) × 3 / 6 = 229.061875
        assert_eq!(breakdown.labour_cost, dec!(1145.31));
    }

    #[test]
    fn long_jobs_pay_the_eight_hour_rate_with_discount() {
        let areas = vec![AreaAssessment::new("Whole house", 600, 0)];

        let breakdown = calculate(standard_policy(), &input(&areas));

        // 152.12375 × 10 × 0.925 = 1407.1446875
        assert_eq!(breakdown.labour_cost, dec!(1407.14));
        assert_eq!(breakdown.discount_percent, dec!(0.075));
    }

    // =========================================================================
    // Discount tests
    // =========================================================================

    #[test]
    fn discount_requires_hours_strictly_above_threshold() {
        let policy = standard_policy();

        assert_eq!(policy.discount_for(dec!(8)), Decimal::ZERO);
        assert_eq!(policy.discount_for(dec!(8.01)), dec!(0.075));
        assert_eq!(policy.discount_for(dec!(16)), dec!(0.075));
        assert_eq!(policy.discount_for(dec!(16.5)), dec!(0.10));
        assert_eq!(policy.discount_for(dec!(40)), dec!(0.13));
    }

    // =========================================================================
    // Work type tests
    // =========================================================================

    #[test]
    fn subfloor_takes_priority_over_demolition() {
        let areas = vec![AreaAssessment::new("Kitchen", 60, 30)];

        let work_type = determine_work_type(&areas, true, Some(DwellingType::Construction));

        assert_eq!(work_type, WorkType::Subfloor);
    }

    #[test]
    fn demolition_takes_priority_over_construction() {
        let areas = vec![
            AreaAssessment::new("Kitchen", 60, 0),
            AreaAssessment::new("Laundry", 30, 15),
        ];

        let work_type = determine_work_type(&areas, false, Some(DwellingType::Construction));

        assert_eq!(work_type, WorkType::Demolition);
    }

    #[test]
    fn construction_dwelling_selects_construction() {
        let areas = vec![AreaAssessment::new("Kitchen", 60, 0)];

        assert_eq!(
            determine_work_type(&areas, false, Some(DwellingType::Construction)),
            WorkType::Construction
        );
        assert_eq!(
            determine_work_type(&areas, false, Some(DwellingType::House)),
            WorkType::Surface
        );
    }

    #[test]
    fn demolition_job_uses_demolition_anchors() {
        let areas = vec![AreaAssessment::new("Bathroom", 60, 60)];

        let breakdown = calculate(standard_policy(), &input(&areas));

        assert_eq!(breakdown.work_type, WorkType::Demolition);
        assert_eq!(breakdown.labour_cost, dec!(711.90));
    }

    // =========================================================================
    // Totals tests
    // =========================================================================

    #[test]
    fn worked_scenario_with_discount_equipment_and_gst() {
        let areas = vec![AreaAssessment::new("Basement", 1200, 0)];
        let input = PricingInput {
            equipment: EquipmentSelection {
                dehumidifier_qty: 2,
                rental_days: 3,
                ..EquipmentSelection::none()
            },
            ..input(&areas)
        };

        let breakdown = calculate(flat_policy(), &input);

        assert_eq!(breakdown.total_hours, dec!(20));
        assert_eq!(breakdown.labour_cost, dec!(720.00));
        assert_eq!(breakdown.equipment_cost, dec!(300));
        assert_eq!(breakdown.subtotal, dec!(1020.00));
        assert_eq!(breakdown.gst, dec!(102.00));
        assert_eq!(breakdown.total_cost, dec!(1122.00));
    }

    #[test]
    fn gst_is_rounded_tenth_of_subtotal() {
        let areas = vec![AreaAssessment::new("Whole house", 600, 0)];
        let input = PricingInput {
            equipment: EquipmentSelection {
                dehumidifier_qty: 3,
                ..EquipmentSelection::none()
            },
            ..input(&areas)
        };

        let breakdown = calculate(standard_policy(), &input);

        assert_eq!(breakdown.subtotal, dec!(1803.14));
        assert_eq!(breakdown.gst, round_half_up(breakdown.subtotal * dec!(0.10)));
        assert_eq!(breakdown.gst, dec!(180.31));
        assert_eq!(breakdown.total_cost, breakdown.subtotal + breakdown.gst);
        assert!(breakdown.total_cost >= breakdown.equipment_cost);
    }

    #[test]
    fn equipment_only_job_is_priced() {
        let input = PricingInput {
            equipment: EquipmentSelection {
                air_mover_qty: 2,
                ..EquipmentSelection::none()
            },
            ..input(&[])
        };

        let breakdown = calculate(standard_policy(), &input);

        assert_eq!(breakdown.labour_cost, Decimal::ZERO);
        assert_eq!(breakdown.equipment_cost, dec!(92));
        assert_eq!(breakdown.total_cost, dec!(101.20));
    }

    #[test]
    fn no_time_and_no_equipment_is_not_available() {
        let engine = PricingEngine::new(standard_policy());

        assert_eq!(engine.calculate(&input(&[])), Ok(None));

        let idle = vec![AreaAssessment::new("Hallway", 0, 0)];
        assert_eq!(engine.calculate(&input(&idle)), Ok(None));
    }

    #[test]
    fn identical_inputs_give_identical_breakdowns() {
        let areas = vec![
            AreaAssessment::new("Bathroom", 95, 20),
            AreaAssessment::new("Laundry", 45, 0),
        ];
        let engine = PricingEngine::new(standard_policy());

        let first = engine.calculate(&input(&areas)).unwrap();
        let second = engine.calculate(&input(&areas)).unwrap();

        assert_eq!(first, second);
    }

    // =========================================================================
    // Policy validation tests
    // =========================================================================

    #[test]
    fn standard_policy_is_valid() {
        assert_eq!(standard_policy().validate(), Ok(()));
    }

    #[test]
    fn rejects_missing_anchor() {
        let mut policy = standard_policy();
        policy.labour.remove(&WorkType::Subfloor);

        assert_eq!(
            policy.validate(),
            Err(PricingError::MissingLabourAnchor(WorkType::Subfloor))
        );
    }

    #[test]
    fn rejects_negative_anchor() {
        let mut policy = standard_policy();
        policy.labour.insert(
            WorkType::Surface,
            LabourAnchors {
                two_hour: dec!(-1),
                eight_hour: dec!(100),
            },
        );

        assert_eq!(
            policy.validate(),
            Err(PricingError::InvalidLabourAnchor {
                work_type: WorkType::Surface,
                value: dec!(-1),
            })
        );
    }

    #[test]
    fn rejects_full_discount() {
        let mut policy = standard_policy();
        policy.discount_tiers[0].discount = dec!(1);

        assert_eq!(policy.validate(), Err(PricingError::InvalidDiscount(dec!(1))));
    }

    #[test]
    fn rejects_unordered_tiers() {
        let mut policy = standard_policy();
        policy.discount_tiers.swap(0, 1);

        assert_eq!(
            policy.validate(),
            Err(PricingError::InvalidDiscountThreshold(dec!(8)))
        );
    }

    #[test]
    fn rejects_gst_rate_of_one() {
        let policy = PricingPolicy {
            gst_rate: dec!(1),
            ..standard_policy()
        };

        assert_eq!(policy.validate(), Err(PricingError::InvalidGstRate(dec!(1))));
    }

    #[test]
    fn calculate_surfaces_invalid_policy() {
        let policy = PricingPolicy {
            gst_rate: dec!(-0.1),
            ..standard_policy()
        };
        let areas = vec![AreaAssessment::new("Kitchen", 60, 0)];

        let result = PricingEngine::new(policy).calculate(&input(&areas));

        assert_eq!(result, Err(PricingError::InvalidGstRate(dec!(-0.1))));
    }
}
