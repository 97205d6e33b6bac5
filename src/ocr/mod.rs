//! OCR 服务适配层
//!
//! 核心清洗逻辑不依赖具体服务; 这里只负责上传、轮询与响应解码.

pub mod mock;
pub mod tabscanner;

use crate::error::ScanError;
use crate::models::ScanResult;
use async_trait::async_trait;

pub use mock::mock_receipt;
pub use tabscanner::TabscannerClient;

/// 待识别的单据图片
#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

/// OCR 传输协作者: 提交图片并返回识别结果 (含重试/轮询)
#[async_trait]
pub trait OcrTransport: Send + Sync {
    async fn scan(&self, upload: ReceiptUpload) -> Result<ScanResult, ScanError>;
}
