pub mod provider;
pub mod receipt;
pub mod split;

pub use provider::{ProviderResponse, ScanResult};
pub use receipt::{
    NormalizedItem, NormalizedReceipt, RawScanItem, ReceiptTotals, ScanResponse,
    LOW_CONFIDENCE_WARNING,
};
pub use split::{
    Allocation, Person, PersonLine, PersonSummary, ReceiptItem, SplitSummary, PERSON_COLOR_COUNT,
};
