//! Drying equipment hire costs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::PricingError;
use crate::models::{EquipmentDetails, EquipmentKind, EquipmentLine, EquipmentSelection};

/// Daily hire rate for each kind of equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentRates {
    pub dehumidifier: Decimal,
    pub air_mover: Decimal,
    pub rcd_box: Decimal,
}

impl EquipmentRates {
    pub fn rate(
        &self,
        kind: EquipmentKind,
    ) -> Decimal {
        match kind {
            EquipmentKind::Dehumidifier => self.dehumidifier,
            EquipmentKind::AirMover => self.air_mover,
            EquipmentKind::RcdBox => self.rcd_box,
        }
    }

    /// Rejects negative daily rates.
    pub fn validate(&self) -> Result<(), PricingError> {
        for kind in EquipmentKind::all() {
            let rate = self.rate(*kind);
            if rate < Decimal::ZERO {
                return Err(PricingError::InvalidEquipmentRate { kind: *kind, rate });
            }
        }
        Ok(())
    }
}

/// Equipment lines plus their sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquipmentCost {
    pub details: EquipmentDetails,
    pub total: Decimal,
}

/// Prices an [`EquipmentSelection`] against a set of daily rates.
///
/// ```
/// use rust_decimal_macros::dec;
/// use inspection_core::EquipmentSelection;
/// use inspection_core::calculations::{EquipmentCostCalculator, EquipmentRates};
///
/// let rates = EquipmentRates {
///     dehumidifier: dec!(132),
///     air_mover: dec!(46),
///     rcd_box: dec!(5),
/// };
/// let selection = EquipmentSelection {
///     dehumidifier_qty: 1,
///     air_mover_qty: 2,
///     rcd_box_qty: 0,
///     rental_days: 2,
/// };
///
/// let cost = EquipmentCostCalculator::new(&rates).calculate(&selection).unwrap();
/// assert_eq!(cost.total, dec!(448));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EquipmentCostCalculator<'a> {
    rates: &'a EquipmentRates,
}

impl<'a> EquipmentCostCalculator<'a> {
    pub fn new(rates: &'a EquipmentRates) -> Self {
        Self { rates }
    }

    /// Computes `qty × daily rate × rental days` per line.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidRentalDays`] when `rental_days` is zero,
    /// or [`PricingError::InvalidEquipmentRate`] for a negative rate.
    pub fn calculate(
        &self,
        selection: &EquipmentSelection,
    ) -> Result<EquipmentCost, PricingError> {
        self.rates.validate()?;
        if selection.rental_days == 0 {
            return Err(PricingError::InvalidRentalDays);
        }

        let mut details = EquipmentDetails::default();
        let mut total = Decimal::ZERO;

        for kind in EquipmentKind::all() {
            let line = self.line(*kind, selection);
            total += line.cost;
            *details.line_mut(*kind) = line;
        }

        Ok(EquipmentCost { details, total })
    }

    fn line(
        &self,
        kind: EquipmentKind,
        selection: &EquipmentSelection,
    ) -> EquipmentLine {
        let qty = selection.quantity(kind);
        if qty == 0 {
            return EquipmentLine::default();
        }

        let days = selection.rental_days;
        EquipmentLine {
            qty,
            days,
            cost: Decimal::from(qty) * self.rates.rate(kind) * Decimal::from(days),
        }
    }
}
