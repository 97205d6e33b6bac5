pub mod api;
pub mod config;
pub mod currency;
pub mod error;
pub mod models;
pub mod ocr;
pub mod service;

pub use config::AppConfig;
pub use error::{ScanError, SplitError};
pub use ocr::{OcrTransport, ReceiptUpload, TabscannerClient};
pub use service::{normalize, summarize, ReceiptScanner, SessionStore};
