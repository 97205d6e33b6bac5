//! 错误类型
//!
//! - `ScanError`: 识别流程失败 (传输、服务端失败、超时、空结果), 对本次扫描是致命的
//! - `SplitError`: 分摊会话上的非法操作, 不会改变会话状态
//!
//! Display 文本直接作为用户可见提示, 保持简短.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to connect to receipt processing service")]
    Transport(#[source] reqwest::Error),

    #[error("Receipt processing service returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("{0}")]
    Provider(String),

    #[error("Receipt processing timed out")]
    Timeout { attempts: u32 },

    #[error("Failed to parse receipt data")]
    Decode(#[source] serde_json::Error),

    #[error("Unexpected response from receipt processing service")]
    Unexpected,

    #[error("No items found in receipt")]
    Empty,

    #[error("Failed to read uploaded receipt: {0}")]
    Upload(String),

    #[error("Invalid receipt processing service URL: {0}")]
    Config(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("Split session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Unknown item {0}")]
    UnknownItem(String),

    #[error("Unknown person {0}")]
    UnknownPerson(String),

    #[error("Select at least one unit to assign")]
    ZeroUnits,

    #[error("Only {available} unit(s) of {item_id} left to assign, requested {requested}")]
    OverAllocation {
        item_id: String,
        requested: u32,
        available: u32,
    },

    #[error("{person_id} holds {held} unit(s) of {item_id}, cannot move {requested}")]
    InsufficientUnits {
        item_id: String,
        person_id: String,
        requested: u32,
        held: u32,
    },

    #[error("Tip percentage must be a whole number between 0 and 100, got {0}")]
    InvalidTip(f64),

    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Receipt has no items to split")]
    EmptyReceipt,
}

impl SplitError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_) | Self::UnknownItem(_) | Self::UnknownPerson(_)
        )
    }
}
