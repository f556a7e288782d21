//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the gateway's health endpoints and their response
//! bodies. The generated document is served by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use utoipa::OpenApi;

use crate::inbound::http::health::{
    BackendFailure, BackendHealthResponse, HealthLabel, HealthResponse, ServerHealth,
};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "pocketgate API",
        description = "Health surface of the PocketBase gateway."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::health::health,
        crate::inbound::http::health::backend_health,
    ),
    components(schemas(
        HealthLabel,
        ServerHealth,
        HealthResponse,
        BackendFailure,
        BackendHealthResponse
    )),
    tags(
        (name = "health", description = "Gateway and backend health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated OpenAPI document.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/api/health")]
    #[case("/api/health/backend")]
    fn health_paths_are_documented(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }

    #[test]
    fn response_schemas_are_registered() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        for name in ["HealthResponse", "BackendHealthResponse", "HealthLabel"] {
            assert!(schemas.contains_key(name), "missing schema {name}");
        }
    }
}
