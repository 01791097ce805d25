//! Top-level router with the shared middleware stack.

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use http::{Request, StatusCode};
use tower::ServiceBuilder;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::billing::{billing_router, BillingAppState};

/// Assigns a UUID `x-request-id` to requests that arrive without one.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let request_id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(request_id))
    }
}

/// Builds the service router.
///
/// Layer order, outermost first: request id, trace, timeout.
pub fn build_router(state: BillingAppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(billing_router())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout)),
        )
}

async fn health() -> StatusCode {
    StatusCode::OK
}
