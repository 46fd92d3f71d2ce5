//! Total treatment time across all assessed areas.

use rust_decimal::Decimal;

use crate::calculations::common::minutes_to_hours;
use crate::models::{AreaAssessment, AreaDetail};

/// Aggregated labour time for an inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaTimeSummary {
    pub total_minutes: u64,
    /// `total_minutes / 60`, unrounded.
    pub total_hours: Decimal,
    pub area_details: Vec<AreaDetail>,
}

impl AreaTimeSummary {
    pub fn is_empty(&self) -> bool {
        self.total_minutes == 0
    }
}

/// Sums job and demolition time over `areas`, keeping one detail line per area.
///
/// ```
/// use rust_decimal_macros::dec;
/// use inspection_core::AreaAssessment;
/// use inspection_core::calculations::aggregate_area_time;
///
/// let areas = vec![
///     AreaAssessment::new("Bathroom", 60, 30),
///     AreaAssessment::new("Laundry", 90, 0),
/// ];
///
/// let summary = aggregate_area_time(&areas);
/// assert_eq!(summary.total_minutes, 180);
/// assert_eq!(summary.total_hours, dec!(3));
/// ```
pub fn aggregate_area_time(areas: &[AreaAssessment]) -> AreaTimeSummary {
    let area_details: Vec<AreaDetail> = areas
        .iter()
        .map(|area| AreaDetail {
            area_name: area.area_name.clone(),
            job_time: area.job_time_minutes,
            demolition_time: area.demolition_time_minutes,
            total_minutes: area.total_minutes(),
        })
        .collect();

    let total_minutes = area_details.iter().map(|detail| detail.total_minutes).sum();

    AreaTimeSummary {
        total_minutes,
        total_hours: minutes_to_hours(total_minutes),
        area_details,
    }
}
