use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::client::{ApiError, InspectionApi};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend-agnostic connection settings for the inspection service.
///
/// `backend` must match the [`ApiClientFactory::backend_name`] of a
/// registered factory.
///
/// | backend  | base_url                        |
/// |----------|---------------------------------|
/// | `http`   | `https://example.com/api`       |
/// | `memory` | ignored                         |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub backend: String,
    pub base_url: String,
    /// Sent as a bearer token when present.
    pub auth_token: Option<String>,
    /// Applied to every request.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            backend: "http".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// One implementation per API backend, registered with an [`ApiRegistry`]
/// at startup.
#[async_trait]
pub trait ApiClientFactory: Send + Sync {
    /// Unique, lowercase identifier for this backend.
    fn backend_name(&self) -> &'static str;

    async fn create(&self, config: &ApiConfig) -> Result<Arc<dyn InspectionApi>, ApiError>;
}

/// Registry of [`ApiClientFactory`] instances, keyed by backend name.
pub struct ApiRegistry {
    factories: HashMap<&'static str, Box<dyn ApiClientFactory>>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory, replacing any with the same name.
    pub fn register(
        &mut self,
        factory: Box<dyn ApiClientFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Names of every registered backend, sorted alphabetically.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Dispatch to the factory that matches `config.backend`.
    ///
    /// # Errors
    /// * [`ApiError::Configuration`] if no factory is registered for the
    ///   requested backend name.
    /// * Any error the chosen factory itself returns.
    pub async fn create(
        &self,
        config: &ApiConfig,
    ) -> Result<Arc<dyn InspectionApi>, ApiError> {
        let factory = self
            .factories
            .get(config.backend.as_str())
            .ok_or_else(|| {
                ApiError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    config.backend,
                    self.available_backends()
                ))
            })?;

        factory.create(config).await
    }
}

impl Default for ApiRegistry {
    fn default() -> Self {
        Self::new()
    }
}
