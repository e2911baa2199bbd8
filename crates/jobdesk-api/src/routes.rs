//! API routes.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post, put};
use axum::{middleware, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::applications::{apply, change_status, list_applicants};
use crate::handlers::jobs::{
    create_job, create_jobs_batch, delete_job, get_job, list_jobs, list_my_jobs, update_job,
};
use crate::handlers::users::{
    get_user, list_users, login, register, register_batch, update_profile,
};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Fixed JSON body for unmatched routes.
async fn fallback() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "message": "Route not found" })),
    )
}

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let user_routes = Router::new()
        .route("/users/register", post(register))
        .route("/users/multipleregister", post(register_batch))
        .route("/users/login", post(login))
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id", patch(update_profile));

    let job_routes = Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs", post(create_job))
        .route("/jobs/multiple", post(create_jobs_batch))
        // Static segments before the /jobs/:id parameter routes.
        .route("/jobs/my/:id", get(list_my_jobs))
        .route("/jobs/applicants/:company_id", get(list_applicants))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id", patch(update_job))
        .route("/jobs/:id", delete(delete_job))
        .route("/jobs/:id/apply", post(apply))
        .route("/jobs/:id/status/:application_id", put(change_status));

    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(user_routes)
        .merge(job_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .fallback(fallback)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    // The full router needs live store credentials, so these tests exercise
    // the pieces that stand alone: the fallback and the middleware stack.
    fn bare_router() -> Router {
        Router::new()
            .route("/health", get(health))
            .fallback(fallback)
            .layer(middleware::from_fn(security_headers))
            .layer(middleware::from_fn(request_id))
    }

    #[tokio::test]
    async fn test_unmatched_route_returns_fixed_json_404() {
        let response = bare_router()
            .oneshot(
                Request::builder()
                    .uri("/no/such/route")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Route not found");
    }

    #[tokio::test]
    async fn test_health_route_reports_healthy() {
        let response = bare_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let response = bare_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers["X-Content-Type-Options"], "nosniff");
        assert_eq!(headers["X-Frame-Options"], "DENY");
        assert!(headers.contains_key("X-Request-ID"));
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = bare_router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("X-Request-ID", "test-trace-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["X-Request-ID"], "test-trace-42");
    }
}
