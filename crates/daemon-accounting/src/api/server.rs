use std::sync::Arc;

use error_stack::Report;
use poem::get;
use poem::listener::TcpListener;
use poem::middleware::Tracing;
use poem::Endpoint;
use poem::EndpointExt;
use poem::Route;
use poem::Server;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;

use super::handlers::get_node_reserved;
use super::handlers::get_stats;
use super::handlers::list_node_reservations;
use super::handlers::list_owner_kinds;
use super::ApiError;
use crate::domain::accountant::NodeCapacityAccountant;

/// All API routes bound to `accountant`.
pub fn routes(accountant: Arc<NodeCapacityAccountant>) -> impl Endpoint {
    Route::new()
        .at("/api/v1/stats", get(get_stats))
        .at("/api/v1/nodes", get(list_node_reservations))
        .at("/api/v1/nodes/:node_name/reserved", get(get_node_reserved))
        .at("/api/v1/owner-kinds", get(list_owner_kinds))
        .data(accountant)
        .with(Tracing)
}

/// HTTP API server for querying daemon capacity accounting
pub struct ApiServer {
    accountant: Arc<NodeCapacityAccountant>,
    listen_addr: String,
}

impl ApiServer {
    pub fn new(accountant: Arc<NodeCapacityAccountant>, listen_addr: String) -> Self {
        Self {
            accountant,
            listen_addr,
        }
    }

    /// Serve until `cancellation_token` fires.
    ///
    /// # Errors
    ///
    /// - [`ApiError::ServerError`] if the server fails to start or bind to the address
    pub async fn run(self, cancellation_token: CancellationToken) -> Result<(), Report<ApiError>> {
        info!("Starting HTTP API server on {}", self.listen_addr);

        let app = routes(self.accountant);
        let listener = TcpListener::bind(&self.listen_addr);
        let server = Server::new(listener);

        tokio::select! {
            result = server.run(app) => {
                match result {
                    Ok(()) => {
                        info!("API server stopped normally");
                        Ok(())
                    }
                    Err(e) => {
                        error!("API server failed: {e}");
                        Err(Report::new(ApiError::ServerError {
                            message: format!("Server failed on {}: {e}", self.listen_addr),
                        }))
                    }
                }
            }
            _ = cancellation_token.cancelled() => {
                info!("API server shutdown requested");
                Ok(())
            }
        }
    }
}
