//! Read-only HTTP API exposing daemon capacity accounting
//!
//! # API Endpoints
//!
//! - `GET /api/v1/stats` - Daemon pod cache statistics
//! - `GET /api/v1/nodes` - Reserved capacity of every node with daemon pods
//! - `GET /api/v1/nodes/:node_name/reserved` - Reserved capacity of one node
//! - `GET /api/v1/owner-kinds` - Configured other-daemon owner kinds

use core::error::Error;

pub use api_types::DaemonCacheStats;
pub use api_types::NodeReservationsResponse;
pub use api_types::NodeReservedCapacity;
pub use api_types::NodeReservedResponse;
pub use api_types::OwnerKindsResponse;
pub use api_types::StatsResponse;

pub mod handlers;
pub mod server;

/// API errors
#[derive(Debug, derive_more::Display)]
pub enum ApiError {
    #[display("Server error: {message}")]
    ServerError { message: String },
}

impl Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_formatting() {
        let server_error = ApiError::ServerError {
            message: "address in use".to_string(),
        };
        assert_eq!(server_error.to_string(), "Server error: address in use");
    }
}
