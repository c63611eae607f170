use crate::api::router::build_router;
use crate::config::ServerConfig;
use crate::core::correlator::QueryCorrelator;
use crate::utils::error::Result;
use tokio::net::TcpListener;

/// HTTP server for the title query endpoints.
pub struct ApiServer {
    config: ServerConfig,
    correlator: QueryCorrelator,
}

impl ApiServer {
    pub fn new(config: ServerConfig, correlator: QueryCorrelator) -> Self {
        Self { config, correlator }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.correlator.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> Result<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("Title query API listening on {}", self.config.bind_addr);
        axum::serve(listener, app).await?;
        Ok(())
    }
}
