pub mod allocation;
pub mod export;
pub mod normalizer;
pub mod scanner;
pub mod session;

pub use allocation::summarize;
pub use export::export_summary_csv;
pub use normalizer::normalize;
pub use scanner::ReceiptScanner;
pub use session::{NewSession, SessionSnapshot, SessionStore, SplitSession};
