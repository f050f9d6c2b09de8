use thiserror::Error;

pub type Result<T> = std::result::Result<T, CleanError>;

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("column not found: {name}")]
    MissingColumn { name: String },
    #[error("expected 2 salary columns (min, max), got {found}")]
    SalaryColumns { found: usize },
    #[error("unrecognized post age at row {row}: {value}")]
    PostAge { row: usize, value: String },
    #[error("fill values length {values} does not match {columns} salary columns")]
    FillLength { values: usize, columns: usize },
    #[error("schema mismatch (missing: {missing:?}, extra: {extra:?})")]
    SchemaMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },
}
