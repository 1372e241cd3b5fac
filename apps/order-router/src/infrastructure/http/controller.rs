//! HTTP Controller (Driver Adapter)
//!
//! Axum-based operator API. Orders posted here go through the same resolver
//! and dispatch lane as queued commands.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};

use crate::application::dto::{OrderMessage, OrderResult};
use crate::application::ports::VenuePort;
use crate::application::services::DispatchError;
use crate::application::use_cases::OrderActionResolver;
use crate::error::RouterError;

use super::response::{DispatcherStatusResponse, HealthResponse};

/// Application state shared across handlers.
pub struct AppState<V>
where
    V: VenuePort + ?Sized + 'static,
{
    /// Resolver for posted orders.
    pub resolver: Arc<OrderActionResolver<V>>,
    /// Application version.
    pub version: String,
}

impl<V> Clone for AppState<V>
where
    V: VenuePort + ?Sized + 'static,
{
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<V>(state: AppState<V>) -> Router
where
    V: VenuePort + ?Sized + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/dispatcher", get(dispatcher_status))
        .route("/v1/orders", post(resolve_order))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<V>(State(state): State<AppState<V>>) -> impl IntoResponse
where
    V: VenuePort + ?Sized + 'static,
{
    let status = if state.resolver.dispatcher().is_closed() {
        "draining"
    } else {
        "healthy"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: state.version.clone(),
        venue: state.resolver.venue_name().to_string(),
    })
}

/// Dispatcher counters.
async fn dispatcher_status<V>(State(state): State<AppState<V>>) -> impl IntoResponse
where
    V: VenuePort + ?Sized + 'static,
{
    let dispatcher = state.resolver.dispatcher();
    let settings = dispatcher.settings();
    let stats = dispatcher.stats();

    Json(DispatcherStatusResponse {
        closed: dispatcher.is_closed(),
        pause_ms: settings.pause.as_millis() as u64,
        capacity: settings.capacity,
        operation_timeout_ms: settings.operation_timeout.as_millis() as u64,
        pending: stats.pending,
        enqueued: stats.enqueued,
        executed: stats.executed,
        succeeded: stats.succeeded,
        failed: stats.failed,
        timed_out: stats.timed_out,
        rejected: stats.rejected,
    })
}

/// Resolve one order command synchronously.
///
/// The resolver is shared with the queue pipeline, so a posted command waits
/// for any command with the same order id already being resolved, from
/// either entry point.
async fn resolve_order<V>(
    State(state): State<AppState<V>>,
    body: Bytes,
) -> Result<Json<OrderResult>, RouterError>
where
    V: VenuePort + ?Sized + 'static,
{
    let inbound = OrderMessage::decode(&body)?;
    if state.resolver.dispatcher().is_closed() {
        return Err(
            RouterError::from(DispatchError::Closed).with_context("order_id", inbound.id.to_string())
        );
    }

    tracing::info!(order_id = inbound.id, action = %inbound.action, "Order posted over HTTP");
    Ok(Json(state.resolver.resolve(inbound).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::ResolutionOutcome;
    use crate::application::services::{DispatcherSettings, OrderDispatcher};
    use crate::error::HttpErrorResponse;
    use crate::infrastructure::venue::PaperVenue;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    fn create_test_state() -> AppState<dyn VenuePort> {
        let venue: Arc<dyn VenuePort> = Arc::new(PaperVenue::starting_at(500));
        let dispatcher = OrderDispatcher::start(DispatcherSettings {
            pause: Duration::from_millis(1),
            ..DispatcherSettings::default()
        })
        .unwrap();
        AppState {
            resolver: Arc::new(OrderActionResolver::new(venue, dispatcher)),
            version: "1.0.0-test".to_string(),
        }
    }

    async fn post_order(app: Router, body: &str) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/orders")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.venue, "paper");
    }

    #[tokio::test]
    async fn posted_place_order_is_resolved() {
        let app = create_router(create_test_state());

        let response = post_order(
            app,
            r#"{"id":1,"symbol":"btcusdt","side":"BUY","quantity":0.01,"price":42000,"action":"place_order","strategy_id":3}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let result: OrderResult = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(result.outcome, ResolutionOutcome::Placed);
        assert_eq!(result.venue_order_id(), Some(500));
        assert_eq!(result.record.status, "PLACED");
        assert_eq!(result.record.symbol, "BTCUSDT");
    }

    #[tokio::test]
    async fn undecodable_body_is_bad_request() {
        let app = create_router(create_test_state());

        let response = post_order(app, "{nope").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: HttpErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn closed_dispatcher_is_unavailable() {
        let state = create_test_state();
        state.resolver.dispatcher().shutdown().await;
        let app = create_router(state);

        let response = post_order(app, r#"{"id":9,"action":"place_order"}"#).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let error: HttpErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.details.get("order_id").map(String::as_str), Some("9"));
    }

    #[tokio::test]
    async fn posted_commands_for_one_order_do_not_interleave() {
        let state = create_test_state();
        let app = create_router(state.clone());

        let placed = post_order(
            app.clone(),
            r#"{"id":5,"symbol":"BTCUSDT","side":"BUY","quantity":1,"price":100,"action":"place_order"}"#,
        )
        .await;
        assert_eq!(placed.status(), StatusCode::OK);

        let (edited, cancelled) = tokio::join!(
            post_order(
                app.clone(),
                r#"{"id":5,"symbol":"BTCUSDT","side":"BUY","quantity":1,"price":101,"action":"edit_order","venue_order_id":500}"#,
            ),
            post_order(
                app,
                r#"{"id":5,"symbol":"BTCUSDT","action":"cancel_orders","venue_order_id":501}"#,
            ),
        );

        let edited: OrderResult = serde_json::from_slice(&body_bytes(edited).await).unwrap();
        let cancelled: OrderResult = serde_json::from_slice(&body_bytes(cancelled).await).unwrap();
        assert_eq!(edited.outcome, ResolutionOutcome::Replaced);
        assert_eq!(edited.venue_order_id(), Some(501));
        assert_eq!(cancelled.outcome, ResolutionOutcome::Cancelled);
    }

    #[tokio::test]
    async fn dispatcher_status_reports_counters() {
        let state = create_test_state();
        let app = create_router(state.clone());

        let _ = post_order(
            app.clone(),
            r#"{"id":2,"symbol":"ETHUSDT","side":"SELL","quantity":1,"price":3000,"action":"place_order"}"#,
        )
        .await;

        let response = app
            .oneshot(Request::builder().uri("/v1/dispatcher").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let status: DispatcherStatusResponse =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(!status.closed);
        assert_eq!(status.enqueued, 1);
        assert_eq!(status.rejected, 0);
        assert_eq!(status.capacity, 64);
    }
}
