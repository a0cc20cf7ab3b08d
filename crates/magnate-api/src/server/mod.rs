use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use contracts::{
    Account, AccountProfile, ApiError, Category, ErrorCode, InvestmentEntry, Notification,
    PushMessage, SCHEMA_VERSION_V1,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};

use crate::clock::IncomeClock;
use crate::dispatcher::{LogGateway, MessageGateway, NotificationDispatcher};
use crate::registry::ConnectionRegistry;
use crate::{GameApi, GameError};

include!("error.rs");
include!("state.rs");
include!("routes/accounts.rs");
include!("routes/catalog.rs");
include!("routes/notify.rs");
include!("routes/stream.rs");
include!("util.rs");

pub async fn serve(addr: SocketAddr, api: GameApi) -> Result<(), ServerError> {
    serve_with_gateway(addr, api, Arc::new(LogGateway)).await
}

/// Serve with a custom messaging gateway (e.g. a real bot adapter). Spawns
/// the periodic income clock alongside the HTTP listener.
pub async fn serve_with_gateway(
    addr: SocketAddr,
    api: GameApi,
    gateway: Arc<dyn MessageGateway>,
) -> Result<(), ServerError> {
    let state = AppState::new(api, gateway);
    IncomeClock::new(state.api.clone()).spawn();
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/accounts/{account_id}",
            put(register_account).get(get_account),
        )
        .route(
            "/api/v1/accounts/{account_id}/income/collect",
            post(collect_income),
        )
        .route(
            "/api/v1/accounts/{account_id}/investments/purchase",
            post(purchase_investment),
        )
        .route("/api/v1/accounts/{account_id}/stream", get(stream_account))
        .route("/api/v1/catalog", get(list_catalog))
        .route("/api/v1/catalog/{investment_id}", put(upsert_catalog_entry))
        .route("/api/v1/notifications", post(send_notification))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}
