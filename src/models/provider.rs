use crate::models::RawScanItem;
use serde_json::{Map, Value};

/// OCR 服务响应 (不可信 JSON 的显式解码结果)
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse {
    /// 识别完成
    Done(ScanResult),
    /// 仍在处理; 首次提交时携带轮询 token
    Pending { token: Option<String> },
    /// 服务端明确失败
    Failed { message: String },
}

/// 识别结果 (字段缺失即为 None)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    pub line_items: Vec<RawScanItem>,
    pub total: Option<f64>,
    pub sub_total: Option<f64>,
    pub currency: Option<String>,
    pub tip: Option<f64>,
}

const DEFAULT_FAILURE_MESSAGE: &str = "Receipt processing failed";

impl ProviderResponse {
    /// 从原始 JSON 解码, 不依赖字段必然存在
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::Pending { token: None };
        };

        let status = obj.get("status").and_then(Value::as_str).unwrap_or("");
        let code = obj.get("code").and_then(read_count);

        if status.eq_ignore_ascii_case("failed") || code == Some(400) {
            let message = obj
                .get("message")
                .and_then(read_text)
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
            return Self::Failed { message };
        }

        if status.eq_ignore_ascii_case("done") {
            let result = obj
                .get("result")
                .and_then(Value::as_object)
                .map(ScanResult::from_object)
                .unwrap_or_default();
            return Self::Done(result);
        }

        Self::Pending {
            token: obj.get("token").and_then(read_text),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(bytes)?;
        Ok(Self::from_json(&value))
    }
}

impl ScanResult {
    fn from_object(obj: &Map<String, Value>) -> Self {
        let line_items = obj
            .get("lineItems")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(read_line_item).collect())
            .unwrap_or_default();

        let currency = obj
            .get("currencyCode")
            .and_then(read_text)
            .or_else(|| obj.get("currency").and_then(read_text));

        Self {
            line_items,
            total: obj.get("total").and_then(read_amount),
            sub_total: obj.get("subTotal").and_then(read_amount),
            currency,
            tip: obj.get("tip").and_then(read_amount),
        }
    }
}

fn read_line_item(value: &Value) -> RawScanItem {
    let Some(obj) = value.as_object() else {
        return RawScanItem::default();
    };

    // desc/description, qty/quantity: 取第一个有效值
    let description = obj
        .get("desc")
        .and_then(read_text)
        .or_else(|| obj.get("description").and_then(read_text))
        .unwrap_or_default();
    let quantity = obj
        .get("qty")
        .and_then(read_count)
        .filter(|q| *q != 0)
        .or_else(|| obj.get("quantity").and_then(read_count).filter(|q| *q != 0));

    RawScanItem {
        description,
        unit_price: obj.get("price").and_then(read_amount).unwrap_or(0.0),
        line_total: obj.get("lineTotal").and_then(read_amount).unwrap_or(0.0),
        quantity,
    }
}

/// 金额: 数字或数字字符串
fn read_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    amount.is_finite().then_some(amount)
}

fn read_count(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn read_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}
