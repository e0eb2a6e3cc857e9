//! API Module
//!
//! HTTP handlers and routing that expose the cache engine over REST.
//!
//! # Endpoints
//! - `PUT /entries/:key` - Store a payload
//! - `GET /entries/:key` - Retrieve a payload
//! - `DELETE /entries/:key` - Invalidate a key
//! - `DELETE /entries` - Invalidate every key
//! - `POST /purge` - Remove expired entries
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
