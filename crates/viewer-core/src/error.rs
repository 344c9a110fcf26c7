use pageflow_scheduler::PageId;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: PageId, page_count: u32 },
    #[error("rotation {0} is not a multiple of 90 degrees")]
    InvalidRotation(i32),
    #[error("invalid scale {0}")]
    InvalidScale(String),
    #[error("no document is loaded")]
    NoDocument,
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
}
