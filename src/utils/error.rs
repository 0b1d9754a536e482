use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parse { message: String },

    #[error("Plugin error: {plugin_type}: {message}")]
    Plugin { plugin_type: String, message: String },

    #[error("Fetch failed for {url}: status code {status}")]
    Fetch { url: String, status: u16 },

    #[error("Price not found in page")]
    PriceNotFound,

    #[error("Unparsable price: '{text}'")]
    UnparsablePrice { text: String },

    #[error("Unsupported source: {url}")]
    UnsupportedSource { url: String },

    #[error("Product is already being tracked: {url}")]
    DuplicateTracking { url: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {resource}")]
    NotFound { resource: String },
}

impl AppError {
    /// Failures that leave the product with its stale price until the next cycle.
    pub fn is_extraction_failure(&self) -> bool {
        matches!(self, AppError::PriceNotFound | AppError::UnparsablePrice { .. })
    }
}

// Implement conversion from validation errors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
