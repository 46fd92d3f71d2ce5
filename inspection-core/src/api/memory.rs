//! In-process inspection service used for offline runs and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use super::client::{
    ApiError, CalculateCostRequest, CompletionSummary, InspectionApi, StartedInspection,
};
use super::factory::{ApiClientFactory, ApiConfig};
use crate::calculations::{PricingEngine, PricingInput, PricingPolicy};
use crate::models::{CostBreakdown, EquipmentSelection, InspectionRecord, InspectionStatus};
use crate::wizard::StepId;

/// Stores inspections in a map and prices them with a local engine.
///
/// Latency and save failures can be injected to exercise the autosave
/// session without a network.
pub struct InMemoryInspectionApi {
    engine: PricingEngine,
    inspections: Mutex<HashMap<String, InspectionRecord>>,
    saves: Mutex<Vec<(StepId, Vec<String>)>>,
    latency: Mutex<Duration>,
    failing_saves: AtomicUsize,
    next_job: AtomicU32,
}

impl InMemoryInspectionApi {
    pub fn new(engine: PricingEngine) -> Self {
        Self {
            engine,
            inspections: Mutex::new(HashMap::new()),
            saves: Mutex::new(Vec::new()),
            latency: Mutex::new(Duration::ZERO),
            failing_saves: AtomicUsize::new(0),
            next_job: AtomicU32::new(1),
        }
    }

    /// A service priced with [`PricingPolicy::standard`].
    pub fn standard() -> Self {
        Self::new(PricingEngine::new(PricingPolicy::standard()))
    }

    pub async fn insert(
        &self,
        record: InspectionRecord,
    ) {
        self.inspections
            .lock()
            .await
            .insert(record.id.clone(), record);
    }

    pub async fn get(
        &self,
        id: &str,
    ) -> Option<InspectionRecord> {
        self.inspections.lock().await.get(id).cloned()
    }

    /// Delay applied before every response.
    pub async fn set_latency(
        &self,
        latency: Duration,
    ) {
        *self.latency.lock().await = latency;
    }

    /// Makes the next `count` section saves fail with a 503.
    pub fn fail_next_saves(
        &self,
        count: usize,
    ) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    /// Sections saved so far with the field names each save carried.
    pub async fn saved_sections(&self) -> Vec<(StepId, Vec<String>)> {
        self.saves.lock().await.clone()
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn take_failure(&self) -> bool {
        self.failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn job_number(
        &self,
        now: DateTime<Utc>,
    ) -> String {
        let seq = self.next_job.fetch_add(1, Ordering::SeqCst);
        format!("MRC-{}-{seq:04}", now.year())
    }

    fn price(
        &self,
        record: &InspectionRecord,
    ) -> Result<Option<CostBreakdown>, ApiError> {
        self.engine
            .calculate(&record.pricing_input())
            .map_err(|err| ApiError::Status {
                status: 500,
                message: err.to_string(),
            })
    }
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(id.to_string())
}

#[async_trait]
impl InspectionApi for InMemoryInspectionApi {
    async fn load_draft(&self, id: &str) -> Result<InspectionRecord, ApiError> {
        self.simulate_latency().await;
        self.get(id).await.ok_or_else(|| not_found(id))
    }

    async fn start(
        &self,
        id: &str,
        arrived_at: DateTime<Utc>,
    ) -> Result<StartedInspection, ApiError> {
        self.simulate_latency().await;
        let mut inspections = self.inspections.lock().await;
        let record = inspections.get_mut(id).ok_or_else(|| not_found(id))?;

        let job_number = match &record.job_number {
            Some(existing) => existing.clone(),
            None => self.job_number(arrived_at),
        };
        record.status = InspectionStatus::InProgress;
        record.arrived_at = Some(arrived_at);
        record.job_number = Some(job_number.clone());
        record.inspection_date.get_or_insert(arrived_at);

        debug!(inspection_id = id, %job_number, "started inspection");
        Ok(StartedInspection {
            inspection: record.clone(),
            job_number,
        })
    }

    async fn save_section(
        &self,
        id: &str,
        section: StepId,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<InspectionRecord, ApiError> {
        self.simulate_latency().await;
        if self.take_failure() {
            return Err(ApiError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }

        let mut inspections = self.inspections.lock().await;
        let record = inspections.get_mut(id).ok_or_else(|| not_found(id))?;

        let mut value =
            serde_json::to_value(&*record).map_err(|err| ApiError::Decode(err.to_string()))?;
        let names: Vec<String> = fields.keys().cloned().collect();
        if let serde_json::Value::Object(stored) = &mut value {
            stored.extend(fields);
        }
        *record = serde_json::from_value(value).map_err(|err| ApiError::Status {
            status: 400,
            message: format!("invalid {section} data: {err}"),
        })?;

        self.saves.lock().await.push((section, names));
        Ok(record.clone())
    }

    async fn calculate_cost(
        &self,
        id: &str,
        request: &CalculateCostRequest,
    ) -> Result<Option<CostBreakdown>, ApiError> {
        self.simulate_latency().await;
        let stored = self.get(id).await.ok_or_else(|| not_found(id))?;

        let input = PricingInput {
            areas: &request.areas,
            equipment: EquipmentSelection {
                dehumidifier_qty: request.dehumidifier_qty,
                air_mover_qty: request.air_mover_qty,
                rcd_box_qty: request.rcd_box_qty,
                rental_days: request.drying_days.max(1),
            },
            subfloor_enabled: stored.subfloor_enabled,
            dwelling_type: stored.dwelling_type,
        };

        self.engine
            .calculate(&input)
            .map_err(|err| ApiError::Status {
                status: 500,
                message: err.to_string(),
            })
    }

    async fn complete(&self, id: &str) -> Result<CompletionSummary, ApiError> {
        self.simulate_latency().await;
        let mut inspections = self.inspections.lock().await;
        let record = inspections.get_mut(id).ok_or_else(|| not_found(id))?;

        let breakdown = self.price(record)?.ok_or_else(|| ApiError::Status {
            status: 422,
            message: "insufficient data to calculate cost".to_string(),
        })?;

        record.status = InspectionStatus::Completed;
        record.completed_at = Some(Utc::now());
        record.total_cost = Some(breakdown.total_cost);

        Ok(CompletionSummary {
            total_cost: breakdown.total_cost,
            breakdown: Some(breakdown),
        })
    }
}

/// Registers the in-memory service under the `memory` backend name.
///
/// Every `create` call returns a fresh, empty service.
pub struct MemoryBackendFactory {
    policy: PricingPolicy,
}

impl MemoryBackendFactory {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl ApiClientFactory for MemoryBackendFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, _config: &ApiConfig) -> Result<Arc<dyn InspectionApi>, ApiError> {
        Ok(Arc::new(InMemoryInspectionApi::new(PricingEngine::new(
            self.policy.clone(),
        ))))
    }
}
