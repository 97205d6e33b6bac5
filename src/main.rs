use bill_split_rust::{api, AppConfig, OcrTransport, ReceiptScanner, SessionStore, TabscannerClient};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt::time::ChronoLocal, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load configuration ({}), falling back to environment", e);
        AppConfig::from_env()
    });
    info!(
        "Starting server with config: server={:?}, ocr_base_url={}, poll={}ms x {}",
        config.server,
        config.ocr.base_url,
        config.ocr.poll_interval_ms,
        config.ocr.max_poll_attempts
    );

    // OCR 服务: 未配置 key 时进入演示模式
    let scanner = match config.ocr.api_key() {
        Some(key) => {
            let client: Arc<dyn OcrTransport> = Arc::new(TabscannerClient::new(&config.ocr, key)?);
            ReceiptScanner::new(client)
        }
        None => {
            warn!("TABSCANNER_API_KEY not configured, scans will return mock data");
            ReceiptScanner::mock()
        }
    };

    // 分摊会话: 过期清理 + 数量上限
    let sessions = Arc::new(SessionStore::with_limits(
        config.server.session_ttl(),
        config.server.max_sessions,
    ));
    sessions.spawn_sweeper(config.server.session_sweep_interval());
    info!(
        "Split sessions expire after {}s idle, at most {} kept",
        config.server.session_ttl_secs, config.server.max_sessions
    );

    let state = api::AppState::with_sessions(scanner, sessions);
    let app = api::create_router(state, config.server.max_upload_bytes);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/scan-receipt      - Scan and normalize a receipt");
    info!("  GET  /api/health            - Health check");
    info!("  POST /api/sessions          - Start a split session");
    info!("  GET  /api/sessions/:id      - Session state and per-person totals");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
