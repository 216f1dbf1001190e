//! エラー型定義

use crate::session::AppState;
use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid transition: {from:?} -> {to:?}")]
    InvalidTransition { from: AppState, to: AppState },

    #[error("Style index out of range: {index} (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
