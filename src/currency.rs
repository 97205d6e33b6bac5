//! 币种符号与地区默认币种 (静态查找表)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const DEFAULT_CURRENCY: &str = "USD";

const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("ZAR", "R"),
    ("USD", "$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("CNY", "¥"),
    ("INR", "₹"),
    ("AUD", "A$"),
    ("CAD", "C$"),
    ("CHF", "CHF"),
    ("NZD", "NZ$"),
    ("SGD", "S$"),
    ("HKD", "HK$"),
    ("KRW", "₩"),
    ("MXN", "MX$"),
    ("BRL", "R$"),
    ("RUB", "₽"),
    ("TRY", "₺"),
    ("PLN", "zł"),
    ("SEK", "kr"),
    ("NOK", "kr"),
    ("DKK", "kr"),
    ("THB", "฿"),
    ("MYR", "RM"),
    ("PHP", "₱"),
    ("IDR", "Rp"),
    ("VND", "₫"),
    ("AED", "د.إ"),
    ("SAR", "﷼"),
    ("EGP", "E£"),
    ("NGN", "₦"),
    ("KES", "KSh"),
];

const REGION_CURRENCIES: &[(&str, &str)] = &[
    ("ZA", "ZAR"),
    ("US", "USD"),
    ("GB", "GBP"),
    ("DE", "EUR"),
    ("FR", "EUR"),
    ("IT", "EUR"),
    ("ES", "EUR"),
    ("NL", "EUR"),
    ("BE", "EUR"),
    ("AT", "EUR"),
    ("IE", "EUR"),
    ("PT", "EUR"),
    ("FI", "EUR"),
    ("GR", "EUR"),
    ("JP", "JPY"),
    ("CN", "CNY"),
    ("IN", "INR"),
    ("AU", "AUD"),
    ("CA", "CAD"),
    ("CH", "CHF"),
    ("NZ", "NZD"),
    ("SG", "SGD"),
    ("HK", "HKD"),
    ("KR", "KRW"),
    ("MX", "MXN"),
    ("BR", "BRL"),
    ("RU", "RUB"),
    ("TR", "TRY"),
    ("PL", "PLN"),
    ("SE", "SEK"),
    ("NO", "NOK"),
    ("DK", "DKK"),
    ("TH", "THB"),
    ("MY", "MYR"),
    ("PH", "PHP"),
    ("ID", "IDR"),
    ("VN", "VND"),
    ("AE", "AED"),
    ("SA", "SAR"),
    ("EG", "EGP"),
    ("NG", "NGN"),
    ("KE", "KES"),
];

/// 按顺序匹配, 先命中者胜
static CURRENCY_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)R\s*[0-9]+[,.]?[0-9]*", "ZAR"),
        (r"(?i)ZAR\s*[0-9]+", "ZAR"),
        (r"\$\s*[0-9]+[,.]?[0-9]*", "USD"),
        (r"(?i)USD\s*[0-9]+", "USD"),
        (r"€\s*[0-9]+[,.]?[0-9]*", "EUR"),
        (r"(?i)EUR\s*[0-9]+", "EUR"),
        (r"£\s*[0-9]+[,.]?[0-9]*", "GBP"),
        (r"(?i)GBP\s*[0-9]+", "GBP"),
        (r"¥\s*[0-9]+[,.]?[0-9]*", "JPY"),
    ]
    .into_iter()
    .map(|(pattern, code)| (Regex::new(pattern).expect("currency pattern"), code))
    .collect()
});

/// 币种代码 + 显示符号
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyInfo {
    pub code: String,
    pub symbol: String,
}

impl CurrencyInfo {
    pub fn for_code(code: &str) -> Self {
        let code = code.trim().to_uppercase();
        let symbol = currency_symbol(&code);
        Self { code, symbol }
    }
}

/// 未知代码返回代码本身
pub fn currency_symbol(code: &str) -> String {
    let upper = code.trim().to_uppercase();
    CURRENCY_SYMBOLS
        .iter()
        .find(|(c, _)| *c == upper)
        .map(|(_, symbol)| symbol.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// 地区 (ISO 3166 alpha-2) 默认币种, 未知或缺失为 USD
pub fn currency_for_region(region: Option<&str>) -> &'static str {
    let Some(region) = region else {
        return DEFAULT_CURRENCY;
    };
    let upper = region.trim().to_uppercase();
    REGION_CURRENCIES
        .iter()
        .find(|(r, _)| *r == upper)
        .map(|(_, currency)| *currency)
        .unwrap_or(DEFAULT_CURRENCY)
}

pub fn format_amount(amount: f64, symbol: &str) -> String {
    format!("{}{:.2}", symbol, amount)
}

/// 从自由文本中猜测币种
pub fn detect_currency(text: &str) -> CurrencyInfo {
    let code = CURRENCY_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, code)| *code)
        .unwrap_or(DEFAULT_CURRENCY);
    CurrencyInfo::for_code(code)
}
