use std::path::PathBuf;

use thiserror::Error;

/// 起動時にしか起こらない、利用者へ報告すべきエラー
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to open log file {path}: {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialize terminal: {source}")]
    Terminal {
        #[source]
        source: std::io::Error,
    },

    #[error("invalid monitor configuration: {reason}")]
    InvalidConfig { reason: String },
}
