use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 上传图片大小上限
    pub max_upload_bytes: usize,
    /// 会话自最后一次修改起的保留时长
    pub session_ttl_secs: u64,
    /// 同时保留的会话数上限, 满时淘汰最久未修改的会话
    pub max_sessions: usize,
    pub session_sweep_secs: u64,
}

/// OCR 服务配置; 未配置 api_key 时使用演示数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_upload_bytes: 10 * 1024 * 1024,
            session_ttl_secs: 4 * 60 * 60,
            max_sessions: 10_000,
            session_sweep_secs: 60,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.tabscanner.com".to_string(),
            poll_interval_ms: 1000,
            max_poll_attempts: 30,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs)
    }
}

impl OcrConfig {
    /// 去除空白后的有效 key
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> bill-split.toml (可选) -> BILLSPLIT_* 环境变量 -> 兼容旧变量
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&AppConfig::default())?;
        let config = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("bill-split").required(false))
            .add_source(
                config::Environment::with_prefix("BILLSPLIT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut app: AppConfig = config.try_deserialize()?;
        app.apply_legacy_env();
        Ok(app)
    }

    /// 仅从环境变量加载
    pub fn from_env() -> Self {
        let mut app = Self::default();
        app.apply_legacy_env();
        app
    }

    fn apply_legacy_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Ok(key) = std::env::var("TABSCANNER_API_KEY") {
            self.ocr.api_key = Some(key);
        }
    }
}
