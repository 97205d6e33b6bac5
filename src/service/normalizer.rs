//! OCR 明细清洗与单据汇总
//!
//! 对扫描服务返回的原始明细逐行执行固定顺序的修正:
//! 1. 描述前导数字与数量拼接修复 (如 qty=16 + "6 Wings" -> qty=1 "Wings")
//! 2. 由整行金额 / 单价反推数量
//! 3. 描述尾部误识别的单价反推数量
//! 4. 数量越界 (不在 1..=20) 归 1
//! 5. 金额取整行金额, 其次单价
//! 6. 空描述使用 "Item N"
//!
//! 纯函数, 不做任何 I/O; 同样输入得到同样输出.

use crate::currency::DEFAULT_CURRENCY;
use crate::models::{NormalizedItem, NormalizedReceipt, RawScanItem, ReceiptTotals};
use once_cell::sync::Lazy;
use regex::Regex;

/// 单行数量上限, 超过视为 OCR 噪声
pub const MAX_LINE_QUANTITY: i64 = 20;
/// 数量反推的回算容差
pub const ROUND_TRIP_TOLERANCE: f64 = 0.01;
/// 票面金额与明细合计的相对偏差阈值
pub const MISMATCH_RATIO: f64 = 0.05;

static LEADING_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)\s+(.+)$").expect("leading count pattern"));
static TRAILING_PRICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s+([0-9]+\.?[0-9]*)$").expect("trailing price pattern"));

/// 清洗全部明细并推导单据汇总
pub fn normalize(
    raw_items: &[RawScanItem],
    declared_subtotal: Option<f64>,
    declared_total: Option<f64>,
    tip: Option<f64>,
    currency_hint: Option<&str>,
) -> NormalizedReceipt {
    let items: Vec<NormalizedItem> = raw_items
        .iter()
        .enumerate()
        .map(|(idx, raw)| normalize_item(raw, idx))
        .collect();

    let items_subtotal: f64 = items.iter().map(|i| i.price).sum();
    let declared_subtotal = declared_subtotal.filter(|v| v.is_finite() && *v > 0.0);
    let declared_total = declared_total.filter(|v| v.is_finite() && *v > 0.0);

    let totals = ReceiptTotals {
        items_subtotal,
        declared_subtotal,
        declared_total,
        service_charge: service_charge(declared_subtotal, declared_total, items_subtotal),
        tip: tip.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0),
        currency: resolve_currency(currency_hint),
    };

    let low_confidence = is_low_confidence(&totals);

    NormalizedReceipt {
        items,
        totals,
        low_confidence,
    }
}

/// 单行修正流程
pub fn normalize_item(raw: &RawScanItem, index: usize) -> NormalizedItem {
    let mut quantity = raw.quantity.filter(|q| *q != 0).unwrap_or(1);
    let mut description = raw.description.clone();

    // 1. 前导数字
    if let Some((rest, repaired)) = repair_leading_count(&description, quantity) {
        description = rest;
        quantity = repaired;
    }

    // 2. 整行金额 / 单价
    if needs_inference(quantity) {
        if let Some(inferred) = infer_quantity(raw.line_total, raw.unit_price) {
            quantity = inferred;
        }
    }

    // 3. 描述尾部的单价
    if needs_inference(quantity) {
        let repaired = TRAILING_PRICE.captures(&description).and_then(|caps| {
            let price_from_desc = caps[2].parse::<f64>().ok()?;
            let inferred = infer_quantity(raw.line_total, price_from_desc)?;
            Some((caps[1].to_string(), inferred))
        });
        if let Some((rest, inferred)) = repaired {
            description = rest;
            quantity = inferred;
        }
    }

    // 4. 越界归 1
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        quantity = 1;
    }

    let price = if raw.line_total != 0.0 {
        raw.line_total
    } else {
        raw.unit_price
    };

    let description = description.trim();
    let description = if description.is_empty() {
        format!("Item {}", index + 1)
    } else {
        description.to_string()
    };

    NormalizedItem {
        description,
        price,
        quantity: quantity as u32,
    }
}

/// 描述以整数开头时剥离该整数; 若数量末尾恰好是这个整数, 说明二者被拼接,
/// 数量还原为去掉该后缀后的前缀 (前缀为空时为 1)
fn repair_leading_count(description: &str, quantity: i64) -> Option<(String, i64)> {
    let caps = LEADING_COUNT.captures(description)?;
    let rest = caps[2].to_string();

    if quantity <= 9 {
        return Some((rest, quantity));
    }

    // 大整数解析失败时只清理描述
    let Ok(leading) = caps[1].parse::<u64>() else {
        return Some((rest, quantity));
    };

    let quantity_digits = quantity.to_string();
    let repaired = match quantity_digits.strip_suffix(leading.to_string().as_str()) {
        Some("") => 1,
        Some(prefix) => prefix.parse().unwrap_or(1),
        None => quantity,
    };
    Some((rest, repaired))
}

fn needs_inference(quantity: i64) -> bool {
    quantity <= 0 || quantity == 1
}

/// round(line_total / unit) 落在 (1, 20] 且回算误差 < 0.01 时接受
fn infer_quantity(line_total: f64, unit: f64) -> Option<i64> {
    if !(unit > 0.0 && line_total > unit) {
        return None;
    }
    let inferred = (line_total / unit).round();
    let in_range = inferred > 1.0 && inferred <= MAX_LINE_QUANTITY as f64;
    let round_trips = (inferred * unit - line_total).abs() < ROUND_TRIP_TOLERANCE;
    (in_range && round_trips).then_some(inferred as i64)
}

/// 服务费: 优先用票面总额 - 票面小计, 其次总额 - 明细合计
fn service_charge(declared_subtotal: Option<f64>, declared_total: Option<f64>, items_subtotal: f64) -> f64 {
    match (declared_total, declared_subtotal) {
        (Some(total), Some(subtotal)) if total > subtotal => total - subtotal,
        (Some(total), _) if total > items_subtotal => total - items_subtotal,
        _ => 0.0,
    }
}

fn resolve_currency(hint: Option<&str>) -> String {
    hint.map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_uppercase)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

/// 票面小计 (缺失时用总额) 与明细合计相对偏差 > 5%
fn is_low_confidence(totals: &ReceiptTotals) -> bool {
    match totals.declared_subtotal.or(totals.declared_total) {
        Some(reference) if reference > 0.0 => {
            ((reference - totals.items_subtotal) / reference).abs() > MISMATCH_RATIO
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(description: &str, quantity: Option<i64>, unit_price: f64, line_total: f64) -> RawScanItem {
        RawScanItem {
            description: description.to_string(),
            unit_price,
            line_total,
            quantity,
        }
    }

    #[test]
    fn merged_quantity_digit_is_split_off() {
        let item = normalize_item(&raw("6 Wings", Some(16), 0.0, 6.0), 0);
        assert_eq!(item.description, "Wings");
        assert_eq!(item.quantity, 1);
        assert_eq!(item.price, 6.0);
    }

    #[test]
    fn merged_suffix_keeps_multi_digit_prefix() {
        // qty=126 + "6 Nuggets": 真实数量 12
        let item = normalize_item(&raw("6 Nuggets", Some(126), 0.0, 72.0), 0);
        assert_eq!(item.description, "Nuggets");
        assert_eq!(item.quantity, 12);
    }

    #[test]
    fn leading_count_matching_small_quantity_only_cleans_description() {
        let item = normalize_item(&raw("2 Chai Latte", Some(2), 0.0, 10.0), 0);
        assert_eq!(item.description, "Chai Latte");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.price, 10.0);
    }

    #[test]
    fn unrelated_leading_number_leaves_large_quantity_to_clamp() {
        let item = normalize_item(&raw("3 Cheese Platter", Some(45), 0.0, 20.0), 0);
        assert_eq!(item.description, "Cheese Platter");
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn quantity_inferred_from_line_total() {
        let item = normalize_item(&raw("Coffee", Some(1), 3.0, 9.0), 0);
        assert_eq!(item.quantity, 3);
        assert_eq!(item.price, 9.0);
    }

    #[test]
    fn inference_rejects_non_integral_ratio() {
        let item = normalize_item(&raw("Coffee", Some(1), 3.0, 10.0), 0);
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn inference_rejects_more_than_twenty() {
        let item = normalize_item(&raw("Napkin", None, 0.5, 11.0), 0);
        assert_eq!(item.quantity, 1);
        assert_eq!(item.price, 11.0);
    }

    #[test]
    fn trailing_price_in_description_drives_quantity() {
        let item = normalize_item(&raw("Draft Beer 5.50", Some(1), 0.0, 16.5), 0);
        assert_eq!(item.description, "Draft Beer");
        assert_eq!(item.quantity, 3);
    }

    #[test]
    fn trailing_number_kept_when_it_does_not_divide() {
        let item = normalize_item(&raw("Table 7", Some(1), 0.0, 15.0), 0);
        assert_eq!(item.description, "Table 7");
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn out_of_range_quantities_clamp_to_one() {
        assert_eq!(normalize_item(&raw("Fries", Some(-2), 0.0, 4.0), 0).quantity, 1);
        assert_eq!(normalize_item(&raw("Fries", Some(21), 0.0, 4.0), 0).quantity, 1);
        assert_eq!(normalize_item(&raw("Fries", Some(20), 0.0, 80.0), 0).quantity, 20);
    }

    #[test]
    fn exact_clean_item_round_trips() {
        let item = normalize_item(&raw("Margherita Pizza", Some(2), 18.0, 36.0), 0);
        assert_eq!(item, NormalizedItem::new("Margherita Pizza", 36.0, 2));
    }

    #[test]
    fn price_falls_back_to_unit_price_then_zero() {
        assert_eq!(normalize_item(&raw("Soda", Some(1), 2.5, 0.0), 0).price, 2.5);
        assert_eq!(normalize_item(&raw("Soda", Some(1), 0.0, 0.0), 0).price, 0.0);
    }

    #[test]
    fn empty_description_gets_positional_name() {
        let item = normalize_item(&raw("   ", Some(1), 0.0, 4.0), 2);
        assert_eq!(item.description, "Item 3");
    }

    #[test]
    fn service_charge_prefers_declared_subtotal() {
        let items = vec![raw("Steak", Some(1), 0.0, 40.0), raw("Wine", Some(1), 0.0, 50.0)];
        let receipt = normalize(&items, Some(90.0), Some(100.0), None, Some("eur"));

        assert_eq!(receipt.totals.items_subtotal, 90.0);
        assert_eq!(receipt.totals.service_charge, 10.0);
        assert_eq!(receipt.totals.currency, "EUR");
        assert!(!receipt.low_confidence);
    }

    #[test]
    fn service_charge_falls_back_to_items_sum() {
        let items = vec![raw("Steak", Some(1), 0.0, 40.0)];
        let receipt = normalize(&items, None, Some(46.0), Some(3.0), None);

        assert!((receipt.totals.service_charge - 6.0).abs() < 1e-9);
        assert_eq!(receipt.totals.tip, 3.0);
        assert_eq!(receipt.totals.currency, DEFAULT_CURRENCY);
        // 46 vs 40: 13% 偏差
        assert!(receipt.low_confidence);
    }

    #[test]
    fn no_service_charge_without_declared_total() {
        let items = vec![raw("Steak", Some(1), 0.0, 40.0)];
        let receipt = normalize(&items, Some(45.0), None, Some(-1.0), None);
        assert_eq!(receipt.totals.service_charge, 0.0);
        assert_eq!(receipt.totals.tip, 0.0);
        assert!(receipt.low_confidence);
    }

    #[test]
    fn small_mismatch_is_not_low_confidence() {
        let items = vec![raw("Steak", Some(1), 0.0, 98.0)];
        let receipt = normalize(&items, Some(100.0), None, None, None);
        assert!(!receipt.low_confidence);
        assert_eq!(receipt.totals.reported_subtotal(), 100.0);

        let receipt = normalize(&items, None, None, None, None);
        assert!(!receipt.low_confidence);
        assert_eq!(receipt.totals.reported_subtotal(), 98.0);
    }

    #[test]
    fn every_quantity_stays_in_range() {
        let samples = [
            raw("1 6 Wings", Some(16), 6.0, 36.0),
            raw("99 Bottles 1", Some(999), 1.0, 999.0),
            raw("", Some(0), 0.0, 0.0),
            raw("Rice 0.0", Some(1), 0.0, 5.0),
            raw("12345678901234567890123 Soup", Some(123), 0.0, 5.0),
            raw("Water", Some(i64::MAX), 1.0, 3.0),
        ];
        for (idx, sample) in samples.iter().enumerate() {
            let item = normalize_item(sample, idx);
            assert!((1..=20).contains(&item.quantity), "{:?} -> {:?}", sample, item);
            assert!(!item.description.is_empty());
        }
    }
}
