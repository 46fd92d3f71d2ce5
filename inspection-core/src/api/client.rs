use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AreaAssessment, CostBreakdown, InspectionRecord};
use crate::wizard::StepId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Inspection not found: {0}")]
    NotFound(String),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Body of the live cost calculation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateCostRequest {
    pub areas: Vec<AreaAssessment>,
    pub subfloor_treatment_time: u32,
    pub dehumidifier_qty: u32,
    pub air_mover_qty: u32,
    pub rcd_box_qty: u32,
    pub drying_days: u32,
}

impl CalculateCostRequest {
    /// Snapshot of the cost-relevant fields of `record`.
    pub fn from_record(record: &InspectionRecord) -> Self {
        let equipment = record.equipment_selection();
        Self {
            areas: record.areas.clone(),
            subfloor_treatment_time: record.subfloor_treatment_time,
            dehumidifier_qty: equipment.dehumidifier_qty,
            air_mover_qty: equipment.air_mover_qty,
            rcd_box_qty: equipment.rcd_box_qty,
            drying_days: equipment.rental_days,
        }
    }
}

/// Result of starting a scheduled inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedInspection {
    pub inspection: InspectionRecord,
    pub job_number: String,
}

/// Server-confirmed outcome of completing an inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSummary {
    pub total_cost: Decimal,
    pub breakdown: Option<CostBreakdown>,
}

/// Operations of the external inspection service.
#[async_trait]
pub trait InspectionApi: Send + Sync {
    async fn load_draft(&self, id: &str) -> Result<InspectionRecord, ApiError>;

    /// Marks the inspection in progress and assigns a job number.
    async fn start(
        &self,
        id: &str,
        arrived_at: DateTime<Utc>,
    ) -> Result<StartedInspection, ApiError>;

    /// Saves the given camelCase fields of one section and returns the
    /// server's copy of the inspection.
    async fn save_section(
        &self,
        id: &str,
        section: StepId,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<InspectionRecord, ApiError>;

    /// `Ok(None)` when the server has insufficient data to price the job.
    async fn calculate_cost(
        &self,
        id: &str,
        request: &CalculateCostRequest,
    ) -> Result<Option<CostBreakdown>, ApiError>;

    async fn complete(&self, id: &str) -> Result<CompletionSummary, ApiError>;
}
