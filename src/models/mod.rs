//! Request and Response models for the cache HTTP surface
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request parameters and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::PutParams;
pub use responses::{
    HealthResponse, InvalidateAllResponse, InvalidateResponse, PurgeResponse, PutResponse,
    StatsResponse,
};
