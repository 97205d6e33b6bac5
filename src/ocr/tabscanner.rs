use crate::config::OcrConfig;
use crate::error::ScanError;
use crate::models::{ProviderResponse, ScanResult};
use crate::ocr::{OcrTransport, ReceiptUpload};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use std::time::Duration;

/// 日志中保留的响应体长度
const LOG_PREVIEW_CHARS: usize = 200;
/// 上传类型无法解析时使用
const FALLBACK_MIME: &str = "application/octet-stream";

/// Tabscanner 兼容的 OCR 客户端: 提交后按固定间隔轮询结果
pub struct TabscannerClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl TabscannerClient {
    pub fn new(config: &OcrConfig, api_key: impl Into<String>) -> Result<Self, ScanError> {
        let base_url = Url::parse(config.base_url.trim())
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ScanError::Config(config.base_url.clone()))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ScanError::Transport)?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            poll_interval: config.poll_interval(),
            max_poll_attempts: config.max_poll_attempts,
        })
    }

    /// 上传图片
    async fn submit(&self, upload: ReceiptUpload) -> Result<ProviderResponse, ScanError> {
        let size = upload.bytes.len();
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(upload_mime(&upload.mime_type))
            .map_err(|e| ScanError::Upload(e.to_string()))?;
        let form = Form::new().part("file", part);

        tracing::info!("Submitting receipt to OCR service ({} bytes)", size);
        let request = self
            .client
            .post(self.endpoint(&["api", "2", "process"]))
            .header("apikey", &self.api_key)
            .multipart(form);

        self.send(request, "submit").await
    }

    /// 轮询结果: 每次请求前等待一个间隔, 达到上限后超时
    async fn poll(&self, token: &str) -> Result<ScanResult, ScanError> {
        let url = self.endpoint(&["api", "result", token]);

        for attempt in 1..=self.max_poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let request = self.client.get(url.clone()).header("apikey", &self.api_key);
            match self.send(request, "poll").await? {
                ProviderResponse::Done(result) => {
                    tracing::info!(
                        "OCR result ready after {} poll(s), {} line items",
                        attempt,
                        result.line_items.len()
                    );
                    return Ok(result);
                }
                ProviderResponse::Failed { message } => return Err(ScanError::Provider(message)),
                ProviderResponse::Pending { .. } => {
                    tracing::debug!("Poll attempt {}/{}: still processing", attempt, self.max_poll_attempts);
                }
            }
        }

        tracing::error!("OCR polling gave up after {} attempts", self.max_poll_attempts);
        Err(ScanError::Timeout {
            attempts: self.max_poll_attempts,
        })
    }

    /// 在基础地址后追加路径段 (逐段转义)
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: reqwest::RequestBuilder, stage: &str) -> Result<ProviderResponse, ScanError> {
        let start = std::time::Instant::now();
        let response = request.send().await.map_err(|e| {
            tracing::error!("OCR {} request failed: {}", stage, e);
            ScanError::Transport(e)
        })?;
        let status = response.status();
        let body = response.bytes().await.map_err(ScanError::Transport)?;

        tracing::debug!(
            "OCR {} -> HTTP {} in {:?}: {}",
            stage,
            status.as_u16(),
            start.elapsed(),
            preview(&body)
        );

        let decoded = ProviderResponse::from_slice(&body);
        if !status.is_success() {
            // 非 2xx 时优先使用服务端给出的失败信息
            return match decoded {
                Ok(ProviderResponse::Failed { message }) => Err(ScanError::Provider(message)),
                _ => Err(ScanError::HttpStatus {
                    status: status.as_u16(),
                }),
            };
        }
        decoded.map_err(ScanError::Decode)
    }
}

#[async_trait]
impl OcrTransport for TabscannerClient {
    async fn scan(&self, upload: ReceiptUpload) -> Result<ScanResult, ScanError> {
        match self.submit(upload).await? {
            ProviderResponse::Failed { message } => Err(ScanError::Provider(message)),
            ProviderResponse::Done(result) => Ok(result),
            ProviderResponse::Pending { token: Some(token) } => {
                tracing::info!("Got token, polling for results: {}", token);
                self.poll(&token).await
            }
            ProviderResponse::Pending { token: None } => {
                tracing::error!("OCR submit returned neither a token nor a result");
                Err(ScanError::Unexpected)
            }
        }
    }
}

fn preview(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(LOG_PREVIEW_CHARS)
        .collect()
}

/// 客户端声明的类型无法解析时按二进制流提交
fn upload_mime(mime_type: &str) -> &str {
    if Part::text("").mime_str(mime_type).is_ok() {
        mime_type
    } else {
        tracing::warn!("Unparseable upload content type {:?}, sending as {}", mime_type, FALLBACK_MIME);
        FALLBACK_MIME
    }
}
