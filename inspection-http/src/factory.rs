use std::sync::Arc;

use async_trait::async_trait;
use inspection_core::api::{ApiClientFactory, ApiConfig, ApiError, InspectionApi};
use tracing::info;

use crate::client::HttpInspectionApi;

/// [`ApiClientFactory`] for the REST service.
///
/// Register this with an [`inspection_core::ApiRegistry`] to make the
/// `"http"` backend available:
///
/// ```rust,no_run
/// use inspection_core::ApiRegistry;
/// use inspection_http::HttpBackendFactory;
///
/// let mut registry = ApiRegistry::new();
/// registry.register(Box::new(HttpBackendFactory));
/// ```
pub struct HttpBackendFactory;

#[async_trait]
impl ApiClientFactory for HttpBackendFactory {
    fn backend_name(&self) -> &'static str {
        "http"
    }

    async fn create(
        &self,
        config: &ApiConfig,
    ) -> Result<Arc<dyn InspectionApi>, ApiError> {
        let api = HttpInspectionApi::new(config)?;
        info!(
            base_url = api.base_url(),
            authenticated = config.auth_token.is_some(),
            "using HTTP inspection backend"
        );
        Ok(Arc::new(api))
    }
}
