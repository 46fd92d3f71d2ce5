pub mod client;
pub mod factory;
pub mod memory;

pub use client::{
    ApiError, CalculateCostRequest, CompletionSummary, InspectionApi, StartedInspection,
};
pub use factory::{ApiClientFactory, ApiConfig, ApiRegistry};
pub use memory::{InMemoryInspectionApi, MemoryBackendFactory};
