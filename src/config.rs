use config::{Config, ConfigError, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    pub scraper: ScraperConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Chat that receives alerts and is allowed to issue commands.
    pub chat_id: Option<i64>,
    pub api_base_url: String,
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub request_timeout: u64,
    pub user_agent: String,
    pub accept_language: String,
    /// Pause between two products of the same cycle.
    pub request_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub check_interval_minutes: u64,
    pub run_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub directory: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            request_timeout: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            request_delay_ms: 2000,
        }
    }
}

impl AppConfig {
    /// Loads and validates the configuration.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config = Self::read(config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Layers defaults, then the optional config file, then `PROMO__*` variables,
    /// then the legacy flat variables (`TELEGRAM_BOT_TOKEN`, ...). No validation.
    pub fn read(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_sources(config_path, env::vars().collect())
    }

    /// Same layering as `read`, with the environment given as a map.
    fn from_sources(config_path: Option<&str>, vars: Map<String, String>) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) => File::with_name(path),
            None => File::with_name("config/default").required(false),
        };
        let legacy = |key: &str| vars.get(key).map(|value| value.trim().to_string());

        let s = Config::builder()
            .set_default("telegram.bot_token", "")?
            .set_default("telegram.api_base_url", "https://api.telegram.org")?
            .set_default("telegram.poll_timeout_secs", 30)?
            .set_default("database.url", "sqlite://products.db")?
            .set_default("database.max_connections", 4)?
            .set_default("scraper.request_timeout", 30)?
            .set_default("scraper.user_agent", DEFAULT_USER_AGENT)?
            .set_default("scraper.accept_language", DEFAULT_ACCEPT_LANGUAGE)?
            .set_default("scraper.request_delay_ms", 2000)?
            .set_default("scheduler.check_interval_minutes", 30)?
            .set_default("scheduler.run_on_start", true)?
            .set_default("logging.filter", "promo_watcher=info")?
            .add_source(file)
            // Add environment variables with prefix "PROMO_"
            .add_source(
                Environment::with_prefix("PROMO")
                    .separator("__")
                    .source(Some(vars.clone())),
            )
            .set_override_option("telegram.bot_token", legacy("TELEGRAM_BOT_TOKEN"))?
            .set_override_option(
                "telegram.chat_id",
                legacy("TELEGRAM_CHAT_ID").and_then(|v| v.parse::<i64>().ok()),
            )?
            .set_override_option(
                "scheduler.check_interval_minutes",
                legacy("CHECK_INTERVAL_MINUTES").and_then(|v| v.parse::<u64>().ok()),
            )?
            .set_override_option(
                "database.url",
                legacy("DATABASE_PATH").map(|path| format!("sqlite://{}", path)),
            )?
            .build()?;

        s.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Message("telegram.bot_token must be set (TELEGRAM_BOT_TOKEN)".into()));
        }

        if self.telegram.chat_id.is_none() {
            return Err(ConfigError::Message("telegram.chat_id must be set (TELEGRAM_CHAT_ID)".into()));
        }

        if Url::parse(&self.telegram.api_base_url).is_err() {
            return Err(ConfigError::Message("Invalid telegram.api_base_url format".into()));
        }

        if !self.database.url.starts_with("sqlite:") {
            return Err(ConfigError::Message("database.url must be a sqlite: URL".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message("Database max_connections must be greater than 0".into()));
        }

        if self.scraper.request_timeout == 0 {
            return Err(ConfigError::Message("Scraper request_timeout must be greater than 0".into()));
        }

        if self.scraper.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Scraper user_agent must not be empty".into()));
        }

        if self.scheduler.check_interval_minutes == 0 {
            return Err(ConfigError::Message("Scheduler check_interval_minutes must be greater than 0".into()));
        }

        Ok(())
    }

    /// Chat id, only valid after `validate` succeeded.
    pub fn notification_chat_id(&self) -> i64 {
        self.telegram.chat_id.unwrap_or_default()
    }
}
