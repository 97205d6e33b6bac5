use crate::api::AppState;
use crate::currency::{currency_for_region, currency_symbol, detect_currency as detect_from_text, CurrencyInfo};
use crate::error::ScanError;
use crate::ocr::ReceiptUpload;
use axum::{
    extract::{Json, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorResponse {
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// 地区默认币种
#[derive(Debug, Serialize)]
pub struct RegionCurrencyResponse {
    pub region: String,
    pub currency: String,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct DetectCurrencyRequest {
    pub text: String,
}

/// 健康检查
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// 单据识别接口
pub async fn scan_receipt(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload: Option<ReceiptUpload> = None;
    let mut fallback_currency: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Malformed multipart upload: {}", e);
                return error_response(StatusCode::BAD_REQUEST, format!("Invalid upload: {}", e));
            }
        };

        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "receipt" => {
                let file_name = field.file_name().unwrap_or("receipt.jpg").to_string();
                let mime_type = field.content_type().unwrap_or("image/jpeg").to_string();
                match field.bytes().await {
                    Ok(bytes) if !bytes.is_empty() => {
                        upload = Some(ReceiptUpload {
                            bytes: bytes.to_vec(),
                            file_name,
                            mime_type,
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        return error_response(StatusCode::BAD_REQUEST, format!("Invalid upload: {}", e));
                    }
                }
            }
            "fallbackCurrency" => match field.text().await {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        fallback_currency = Some(text.to_string());
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to read fallbackCurrency field: {}", e);
                    return error_response(StatusCode::BAD_REQUEST, format!("Invalid upload: {}", e));
                }
            },
            _ => {}
        }
    }

    let Some(upload) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "No receipt image provided");
    };

    match state.scanner.scan(upload, fallback_currency.as_deref()).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            tracing::error!("Receipt scan failed: {:?}", e);
            scan_error_response(&e)
        }
    }
}

fn scan_error_response(err: &ScanError) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

/// 币种符号
pub async fn currency_info(Path(code): Path<String>) -> Json<CurrencyInfo> {
    Json(CurrencyInfo::for_code(&code))
}

/// 地区默认币种
pub async fn region_currency(Path(region): Path<String>) -> Json<RegionCurrencyResponse> {
    let currency = currency_for_region(Some(&region));
    Json(RegionCurrencyResponse {
        region: region.to_uppercase(),
        currency: currency.to_string(),
        symbol: currency_symbol(currency),
    })
}

/// 从票面文本猜测币种 (识别结果未给出币种时供客户端使用)
pub async fn detect_currency(Json(req): Json<DetectCurrencyRequest>) -> Json<CurrencyInfo> {
    Json(detect_from_text(&req.text))
}
