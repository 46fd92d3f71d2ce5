use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Surfaces on which a technician can record visible mould.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouldLocation {
    #[serde(rename = "Ceiling")]
    Ceiling,
    #[serde(rename = "Cornice")]
    Cornice,
    #[serde(rename = "Windows")]
    Windows,
    #[serde(rename = "Window furnishings")]
    WindowFurnishings,
    #[serde(rename = "Walls")]
    Walls,
    #[serde(rename = "Skirting")]
    Skirting,
    #[serde(rename = "Flooring")]
    Flooring,
    #[serde(rename = "Wardrobe")]
    Wardrobe,
    #[serde(rename = "Cupboard")]
    Cupboard,
    #[serde(rename = "Contents")]
    Contents,
    #[serde(rename = "Grout/silicone")]
    GroutSilicone,
    #[serde(rename = "No mould visible")]
    NoneVisible,
}

impl MouldLocation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ceiling => "Ceiling",
            Self::Cornice => "Cornice",
            Self::Windows => "Windows",
            Self::WindowFurnishings => "Window furnishings",
            Self::Walls => "Walls",
            Self::Skirting => "Skirting",
            Self::Flooring => "Flooring",
            Self::Wardrobe => "Wardrobe",
            Self::Cupboard => "Cupboard",
            Self::Contents => "Contents",
            Self::GroutSilicone => "Grout/silicone",
            Self::NoneVisible => "No mould visible",
        }
    }
}

/// Observations and labour estimate for a single room or area.
///
/// Times are whole minutes, so negative values cannot be represented.
/// `mould_visibility` is considered unanswered while empty; technicians
/// pick [`MouldLocation::NoneVisible`] for a clean area.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaAssessment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub area_name: String,

    /// Treatment time in minutes.
    #[serde(rename = "jobTime", default, deserialize_with = "null_as_default")]
    pub job_time_minutes: u32,

    /// Demolition time in minutes; zero when no demolition is required.
    #[serde(
        rename = "demolitionTime",
        default,
        deserialize_with = "null_as_default"
    )]
    pub demolition_time_minutes: u32,

    #[serde(default, deserialize_with = "null_as_default")]
    pub mould_visibility: Vec<MouldLocation>,

    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub temperature: Option<Decimal>,

    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub humidity: Option<Decimal>,

    /// Derived from temperature and humidity whenever both are present.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub dew_point: Option<Decimal>,
}

impl AreaAssessment {
    pub fn new(
        area_name: impl Into<String>,
        job_time_minutes: u32,
        demolition_time_minutes: u32,
    ) -> Self {
        Self {
            area_name: area_name.into(),
            job_time_minutes,
            demolition_time_minutes,
            ..Default::default()
        }
    }

    /// Job time plus demolition time.
    pub fn total_minutes(&self) -> u64 {
        u64::from(self.job_time_minutes) + u64::from(self.demolition_time_minutes)
    }

    pub fn requires_demolition(&self) -> bool {
        self.demolition_time_minutes > 0
    }
}
