//! API Route Configuration

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, AppState};
use super::middleware::{logging_middleware, rate_limit_middleware};
use crate::utils::constants::MAX_CONCURRENT_REQUESTS;

/// Create the router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        .route("/model", get(handlers::model_info))
        .route("/score", post(handlers::score_client));

    let app = Router::new()
        // HTML form
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict))
        .nest("/v1", api_v1)
        .route("/health", get(handlers::health_check))
        // Middleware (order matters - bottom runs first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state);

    limit_in_flight(app, MAX_CONCURRENT_REQUESTS)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(logging_middleware))
}

/// Cap in-flight requests with one semaphore shared by every route
fn limit_in_flight(router: Router, max: usize) -> Router {
    router.layer(GlobalConcurrencyLimitLayer::new(max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tower::ServiceExt;

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_in_flight_limit_spans_routes() {
        let gate = Arc::new(Notify::new());
        let held = gate.clone();
        let router = Router::new()
            .route(
                "/slow",
                get(move || {
                    let held = held.clone();
                    async move {
                        held.notified().await;
                        "slow"
                    }
                }),
            )
            .route("/fast", get(|| async { "fast" }));
        let app = limit_in_flight(router, 1);

        let slow = tokio::spawn(app.clone().oneshot(get_req("/slow")));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // the only permit is held by /slow
        let blocked =
            tokio::time::timeout(Duration::from_millis(100), app.clone().oneshot(get_req("/fast")))
                .await;
        assert!(blocked.is_err());

        gate.notify_one();
        assert_eq!(slow.await.unwrap().unwrap().status(), StatusCode::OK);
        let response = app.oneshot(get_req("/fast")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
