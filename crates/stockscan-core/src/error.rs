use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StockscanError {
    #[error("failed to read workbook: {0}")]
    Workbook(String),

    #[error("legacy binary workbook format (.xls); a converted copy is required")]
    LegacyFormat,

    #[error("header oracle request failed: {0}")]
    Oracle(String),

    #[error("header oracle reply is not a four-field mapping: {0}")]
    OracleReply(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("price lookup failed: {0}")]
    PriceLookup(String),

    #[error("mail request failed: {0}")]
    Mail(String),

    #[error("mail access token expired or invalid")]
    AuthExpired,

    #[error("failed to write report: {0}")]
    Report(String),

    #[error("failed to load config from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
