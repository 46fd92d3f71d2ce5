pub mod api;
pub mod calculations;
pub mod models;
pub mod session;
pub mod wizard;

pub use api::{ApiConfig, ApiError, ApiRegistry, InspectionApi};
pub use models::*;
pub use session::{InspectionSession, SessionError, SessionStats};
