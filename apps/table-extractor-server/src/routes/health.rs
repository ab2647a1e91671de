//! Health check route

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::extraction::BackendName;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// Backends registered with the orchestrator
    backends: Vec<BackendName>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backends: state.orchestrator().registered_backends(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{Orchestrator, OrchestratorConfig};
    use axum_test::TestServer;

    #[tokio::test]
    async fn test_health_reports_ok() {
        let state = AppState::new(Orchestrator::new(OrchestratorConfig::default()));
        let server = TestServer::new(router().with_state(state)).unwrap();

        let response = server.get("/health").await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["backends"], serde_json::json!([]));
    }
}
