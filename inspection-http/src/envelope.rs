//! JSON shapes exchanged with the inspection service.

use inspection_core::api::{ApiError, CompletionSummary, StartedInspection};
use inspection_core::{CostBreakdown, InspectionRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every response is wrapped as `{success, message, data}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// The payload of a successful response.
    ///
    /// A `success: false` body is reported with the HTTP status it arrived
    /// with; a successful body without `data` is a decode error.
    pub fn into_data(
        self,
        status: u16,
    ) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Status {
                status,
                message: self
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }
        self.data
            .ok_or_else(|| ApiError::Decode("response has no data".to_string()))
    }

    /// Like [`Envelope::into_data`] but a missing `data` is allowed.
    pub fn into_optional_data(
        self,
        status: u16,
    ) -> Result<Option<T>, ApiError> {
        if !self.success {
            return Err(ApiError::Status {
                status,
                message: self
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }
        Ok(self.data)
    }
}

/// Error body; only the message is used.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub arrived_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    pub inspection: InspectionRecord,
    pub job_number: String,
}

impl From<StartPayload> for StartedInspection {
    fn from(payload: StartPayload) -> Self {
        StartedInspection {
            inspection: payload.inspection,
            job_number: payload.job_number,
        }
    }
}

/// `costCalculation` may be a full breakdown or just `{totalCost}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    #[serde(default)]
    pub inspection: Option<InspectionRecord>,
    #[serde(default)]
    pub cost_calculation: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CostTotal {
    total_cost: Option<Decimal>,
}

impl TryFrom<CompletePayload> for CompletionSummary {
    type Error = ApiError;

    /// The calculated total wins; the stored inspection total is the
    /// fallback when the server sends no calculation.
    fn try_from(payload: CompletePayload) -> Result<Self, Self::Error> {
        let (calculated, breakdown) = match payload.cost_calculation {
            Some(value) => {
                let total: CostTotal = serde_json::from_value(value.clone()).map_err(|err| {
                    ApiError::Decode(format!("invalid costCalculation: {err}"))
                })?;
                let breakdown = serde_json::from_value::<CostBreakdown>(value).ok();
                (total.total_cost, breakdown)
            }
            None => (None, None),
        };

        let total_cost = calculated
            .or_else(|| payload.inspection.as_ref().and_then(|i| i.total_cost))
            .ok_or_else(|| {
                ApiError::Decode("completion response has no total cost".to_string())
            })?;

        Ok(CompletionSummary {
            total_cost,
            breakdown,
        })
    }
}
