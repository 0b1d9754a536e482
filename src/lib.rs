pub mod bot;
pub mod commands;
pub mod config;
pub mod database;
pub mod evaluator;
pub mod extractor;
pub mod models;
pub mod plugins;
pub mod product_manager;
pub mod scheduler;
pub mod tracker;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
