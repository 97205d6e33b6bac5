//! HTTP 接口
//!
//! - `POST /api/scan-receipt` 识别单据 (multipart: `receipt`, `fallbackCurrency`)
//! - `GET  /api/health`
//! - `GET  /api/currencies/:code`, `GET /api/regions/:region/currency`
//! - `POST /api/detect-currency` 从文本猜测币种
//! - `/api/sessions/...` 分摊会话

pub mod handlers;
pub mod sessions;

use crate::service::{ReceiptScanner, SessionStore};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

pub use handlers::{currency_info, detect_currency, health_check, region_currency, scan_receipt};

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub scanner: Arc<ReceiptScanner>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(scanner: ReceiptScanner) -> Self {
        Self::with_sessions(scanner, Arc::new(SessionStore::new()))
    }

    pub fn with_sessions(scanner: ReceiptScanner, sessions: Arc<SessionStore>) -> Self {
        Self {
            scanner: Arc::new(scanner),
            sessions,
        }
    }
}

/// 构建路由 (服务与测试共用)
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    let session_routes = Router::new()
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/api/sessions/:id/items", put(sessions::replace_items))
        .route("/api/sessions/:id/people", post(sessions::add_person))
        .route("/api/sessions/:id/assign", post(sessions::assign_units))
        .route("/api/sessions/:id/items/:item_id/clear", post(sessions::clear_item))
        .route("/api/sessions/:id/items/:item_id/move", post(sessions::move_units))
        .route("/api/sessions/:id/items/:item_id/reassign", post(sessions::reassign_item))
        .route("/api/sessions/:id/tip", put(sessions::set_tip))
        .route("/api/sessions/:id/summary", get(sessions::get_summary))
        .route("/api/sessions/:id/summary.csv", get(sessions::export_summary));

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/scan-receipt", post(scan_receipt))
        .route("/api/currencies/:code", get(currency_info))
        .route("/api/regions/:region/currency", get(region_currency))
        .route("/api/detect-currency", post(detect_currency))
        .merge(session_routes)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_upload_bytes))
                .layer(RequestBodyLimitLayer::new(max_upload_bytes)),
        )
}
