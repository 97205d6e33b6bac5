use serde::{Deserialize, Serialize};

/// 扫描服务返回的原始明细行 (可能含 OCR 拼接错误)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScanItem {
    pub description: String,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub line_total: f64,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// 清洗后的明细行, price 为整行金额 (非单价)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub description: String,
    pub price: f64,
    pub quantity: u32,
}

impl NormalizedItem {
    pub fn new(description: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            description: description.into(),
            price,
            quantity,
        }
    }
}

/// 单据级汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptTotals {
    pub items_subtotal: f64,
    pub declared_subtotal: Option<f64>,
    pub declared_total: Option<f64>,
    pub service_charge: f64,
    pub tip: f64,
    pub currency: String,
}

impl ReceiptTotals {
    /// 对外报告的小计: 优先使用票面小计
    pub fn reported_subtotal(&self) -> f64 {
        self.declared_subtotal.unwrap_or(self.items_subtotal)
    }
}

/// normalize 的输出
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReceipt {
    pub items: Vec<NormalizedItem>,
    pub totals: ReceiptTotals,
    /// 票面金额与明细合计偏差超过阈值
    pub low_confidence: bool,
}

/// POST /api/scan-receipt 的响应体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub items: Vec<NormalizedItem>,
    pub total: f64,
    pub sub_total: f64,
    pub service_charge: f64,
    pub tip: f64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub const LOW_CONFIDENCE_WARNING: &str = "Total doesn't match items. Try a clearer photo.";

impl From<NormalizedReceipt> for ScanResponse {
    fn from(receipt: NormalizedReceipt) -> Self {
        let sub_total = receipt.totals.reported_subtotal();
        Self {
            items: receipt.items,
            total: receipt.totals.items_subtotal,
            sub_total,
            service_charge: receipt.totals.service_charge,
            tip: receipt.totals.tip,
            currency: receipt.totals.currency,
            warning: receipt
                .low_confidence
                .then(|| LOW_CONFIDENCE_WARNING.to_string()),
        }
    }
}
