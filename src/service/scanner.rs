use crate::currency::{currency_symbol, format_amount};
use crate::error::ScanError;
use crate::models::{ScanResponse, ScanResult};
use crate::ocr::{mock_receipt, OcrTransport, ReceiptUpload};
use crate::service::normalizer;
use std::sync::Arc;

/// 单据识别服务: 有 OCR 凭据时走真实服务, 否则返回演示数据
pub struct ReceiptScanner {
    transport: Option<Arc<dyn OcrTransport>>,
}

impl ReceiptScanner {
    pub fn new(transport: Arc<dyn OcrTransport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    /// 演示模式
    pub fn mock() -> Self {
        Self { transport: None }
    }

    pub fn is_mock(&self) -> bool {
        self.transport.is_none()
    }

    pub async fn scan(
        &self,
        upload: ReceiptUpload,
        fallback_currency: Option<&str>,
    ) -> Result<ScanResponse, ScanError> {
        let Some(transport) = &self.transport else {
            tracing::info!("OCR API key not configured, returning mock data for demo");
            return Ok(mock_receipt());
        };

        tracing::info!("Processing receipt {} ({})", upload.file_name, upload.mime_type);
        let result = transport.scan(upload).await?;
        build_response(result, fallback_currency)
    }
}

/// 识别结果 -> 清洗 -> 响应; 无明细视为失败
pub fn build_response(result: ScanResult, fallback_currency: Option<&str>) -> Result<ScanResponse, ScanError> {
    if result.line_items.is_empty() {
        tracing::warn!("OCR result contained no line items");
        return Err(ScanError::Empty);
    }

    let currency = result.currency.as_deref().or(fallback_currency);
    let receipt = normalizer::normalize(
        &result.line_items,
        result.sub_total,
        result.total,
        result.tip,
        currency,
    );

    let symbol = currency_symbol(&receipt.totals.currency);
    if receipt.low_confidence {
        tracing::warn!(
            "Low-confidence receipt: items sum {} vs declared subtotal {:?} / total {:?}",
            format_amount(receipt.totals.items_subtotal, &symbol),
            receipt.totals.declared_subtotal,
            receipt.totals.declared_total
        );
    }

    tracing::info!(
        "Receipt processed: {} items, subtotal {} ({})",
        receipt.items.len(),
        format_amount(receipt.totals.items_subtotal, &symbol),
        receipt.totals.currency
    );

    Ok(receipt.into())
}
