use crate::models::{NormalizedItem, ScanResponse};

/// 演示用固定单据 (未配置 OCR 凭据时返回)
pub fn mock_receipt() -> ScanResponse {
    let menu = [
        ("Grilled Salmon", 24.99, 1),
        ("Caesar Salad", 12.50, 2),
        ("Margherita Pizza", 18.00, 1),
        ("Sparkling Water", 4.50, 3),
        ("Tiramisu", 8.99, 2),
        ("Espresso", 3.50, 4),
    ];

    // 金额按整行计
    let items: Vec<NormalizedItem> = menu
        .iter()
        .map(|&(description, unit_price, quantity)| {
            NormalizedItem::new(description, unit_price * f64::from(quantity), quantity)
        })
        .collect();
    let sub_total: f64 = items.iter().map(|i| i.price).sum();

    ScanResponse {
        items,
        total: sub_total,
        sub_total,
        service_charge: 0.0,
        tip: 0.0,
        currency: "USD".to_string(),
        warning: None,
    }
}
