//! HTTP backend for [`inspection_core::InspectionApi`].

mod client;
mod envelope;
mod factory;

pub use client::HttpInspectionApi;
pub use factory::HttpBackendFactory;
