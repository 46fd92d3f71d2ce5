use std::collections::BTreeMap;
use std::io::Read;

use inspection_core::calculations::{
    DiscountTier, EquipmentRates, LabourAnchors, PricingError, PricingPolicy,
};
use inspection_core::{EquipmentKind, WorkType};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Pricing table shipped with the crate; matches [`PricingPolicy::standard`].
pub const STANDARD_PRICING_CSV: &str = include_str!("../data/standard_pricing.csv");

/// Errors that can occur when loading a pricing table.
#[derive(Debug, Error)]
pub enum PricingLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Unknown pricing category '{0}'")]
    UnknownCategory(String),

    #[error("Unknown work type '{0}'")]
    UnknownWorkType(String),

    #[error("Unknown equipment '{0}'")]
    UnknownEquipment(String),

    #[error("Invalid discount threshold '{0}'")]
    InvalidThreshold(String),

    #[error("Unexpected key '{key}' for category '{category}'")]
    UnexpectedKey { category: String, key: String },

    #[error("Duplicate entry '{key}' in category '{category}'")]
    DuplicateKey { category: String, key: String },

    #[error("Missing {category} anchor for {work_type}")]
    MissingAnchor {
        category: &'static str,
        work_type: WorkType,
    },

    #[error("Missing daily rate for {0}")]
    MissingRate(EquipmentKind),

    #[error("Missing GST rate")]
    MissingGstRate,

    #[error("Invalid pricing policy: {0}")]
    Policy(#[from] PricingError),
}

impl From<csv::Error> for PricingLoaderError {
    fn from(err: csv::Error) -> Self {
        PricingLoaderError::CsvParse(err.to_string())
    }
}

/// A single row of a pricing CSV file.
///
/// - `category`: one of `labour_2h`, `labour_8h`, `equipment_daily`,
///   `discount`, `gst`
/// - `key`: work type, equipment kind, hour threshold, or `rate` for GST
/// - `value`: the price, daily rate or fraction
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PricingRecord {
    pub category: String,
    pub key: String,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub value: Decimal,
}

fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.trim()
        .parse::<Decimal>()
        .map_err(serde::de::Error::custom)
}

/// Loader for pricing policies from CSV files.
pub struct PricingPolicyLoader;

impl PricingPolicyLoader {
    /// Parse pricing records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<PricingRecord>, PricingLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: PricingRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Assemble and validate a policy from parsed records.
    ///
    /// Every work type needs both anchors and every equipment kind needs a
    /// daily rate. Discount rows may appear in any order; they are sorted by
    /// threshold before validation.
    pub fn build(records: &[PricingRecord]) -> Result<PricingPolicy, PricingLoaderError> {
        let mut two_hour: BTreeMap<WorkType, Decimal> = BTreeMap::new();
        let mut eight_hour: BTreeMap<WorkType, Decimal> = BTreeMap::new();
        let mut equipment: BTreeMap<EquipmentKind, Decimal> = BTreeMap::new();
        let mut tiers: BTreeMap<Decimal, Decimal> = BTreeMap::new();
        let mut gst_rate: Option<Decimal> = None;

        for record in records {
            let duplicate = || PricingLoaderError::DuplicateKey {
                category: record.category.clone(),
                key: record.key.clone(),
            };

            match record.category.trim() {
                "labour_2h" | "labour_8h" => {
                    let work_type = WorkType::parse(&record.key)
                        .ok_or_else(|| PricingLoaderError::UnknownWorkType(record.key.clone()))?;
                    let anchors = if record.category.trim() == "labour_2h" {
                        &mut two_hour
                    } else {
                        &mut eight_hour
                    };
                    if anchors.insert(work_type, record.value).is_some() {
                        return Err(duplicate());
                    }
                }
                "equipment_daily" => {
                    let kind = EquipmentKind::parse(&record.key)
                        .ok_or_else(|| PricingLoaderError::UnknownEquipment(record.key.clone()))?;
                    if equipment.insert(kind, record.value).is_some() {
                        return Err(duplicate());
                    }
                }
                "discount" => {
                    let threshold = record
                        .key
                        .trim()
                        .parse::<Decimal>()
                        .map_err(|_| PricingLoaderError::InvalidThreshold(record.key.clone()))?;
                    if tiers.insert(threshold, record.value).is_some() {
                        return Err(duplicate());
                    }
                }
                "gst" => {
                    if !record.key.trim().eq_ignore_ascii_case("rate") {
                        return Err(PricingLoaderError::UnexpectedKey {
                            category: record.category.clone(),
                            key: record.key.clone(),
                        });
                    }
                    if gst_rate.replace(record.value).is_some() {
                        return Err(duplicate());
                    }
                }
                other => return Err(PricingLoaderError::UnknownCategory(other.to_string())),
            }
        }

        let mut labour = BTreeMap::new();
        for work_type in WorkType::all() {
            let two = two_hour
                .get(work_type)
                .copied()
                .ok_or(PricingLoaderError::MissingAnchor {
                    category: "labour_2h",
                    work_type: *work_type,
                })?;
            let eight = eight_hour
                .get(work_type)
                .copied()
                .ok_or(PricingLoaderError::MissingAnchor {
                    category: "labour_8h",
                    work_type: *work_type,
                })?;
            labour.insert(
                *work_type,
                LabourAnchors {
                    two_hour: two,
                    eight_hour: eight,
                },
            );
        }

        let rate = |kind: EquipmentKind| {
            equipment
                .get(&kind)
                .copied()
                .ok_or(PricingLoaderError::MissingRate(kind))
        };

        let policy = PricingPolicy {
            labour,
            equipment: EquipmentRates {
                dehumidifier: rate(EquipmentKind::Dehumidifier)?,
                air_mover: rate(EquipmentKind::AirMover)?,
                rcd_box: rate(EquipmentKind::RcdBox)?,
            },
            discount_tiers: tiers
                .into_iter()
                .map(|(above_hours, discount)| DiscountTier {
                    above_hours,
                    discount,
                })
                .collect(),
            gst_rate: gst_rate.ok_or(PricingLoaderError::MissingGstRate)?,
        };

        policy.validate()?;
        debug!(
            rows = records.len(),
            tiers = policy.discount_tiers.len(),
            "pricing policy assembled"
        );
        Ok(policy)
    }

    /// Parse and build in one step.
    pub fn load<R: Read>(reader: R) -> Result<PricingPolicy, PricingLoaderError> {
        let records = Self::parse(reader)?;
        Self::build(&records)
    }

    /// The bundled standard pricing table.
    pub fn standard() -> Result<PricingPolicy, PricingLoaderError> {
        Self::load(STANDARD_PRICING_CSV.as_bytes())
    }
}
