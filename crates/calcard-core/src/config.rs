use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

pub const DEFAULT_PRODID: &str = "-//CalCard//CalCard Server//EN";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub calendar: CalendarConfig,
    pub sync: SyncConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// PRODID written into the header of newly created calendar resources.
    pub prodid: String,
    /// Upper bound on occurrences produced by one series expansion.
    pub max_expanded_occurrences: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Tombstones older than this are eligible for the retention purge.
    pub tombstone_retention_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Entries beyond this count in one uploaded file are skipped.
    pub max_entries: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            calendar: CalendarConfig {
                prodid: DEFAULT_PRODID.to_string(),
                max_expanded_occurrences: 1000,
            },
            sync: SyncConfig {
                tombstone_retention_days: 90,
            },
            import: ImportConfig { max_entries: 5000 },
        }
    }
}

/// Prefix of environment variables read by [`Settings::load`].
pub const ENV_PREFIX: &str = "CALCARD";

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

impl Settings {
    /// ## Summary
    /// Loads configuration from an optional `config.toml` and environment
    /// variables. Environment variables take precedence over file values.
    ///
    /// Variables are named `CALCARD_<SECTION>__<KEY>`, for example
    /// `CALCARD_CALENDAR__MAX_EXPANDED_OCCURRENCES=500`.
    ///
    /// ## Errors
    /// Returns an error if building or deserializing the configuration fails,
    /// or if a value is out of range.
    pub fn load() -> Result<Self> {
        Self::from_sources(environment())
    }

    fn from_sources(environment: config::Environment) -> Result<Self> {
        let settings = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("calendar.prodid", DEFAULT_PRODID)?
            .set_default("calendar.max_expanded_occurrences", 1000)?
            .set_default("sync.tombstone_retention_days", 90)?
            .set_default("import.max_entries", 5000)?
            .add_source(config::File::with_name("config.toml").required(false))
            .add_source(environment)
            .build()?
            .try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Checks the values a deserialized configuration cannot express.
    ///
    /// ## Errors
    /// Returns [`CoreError::ConfigError`] for an empty or multi-line PRODID
    /// and for zero expansion or import limits.
    pub fn validate(&self) -> CoreResult<()> {
        let prodid = self.calendar.prodid.trim();
        if prodid.is_empty() || prodid.chars().any(char::is_control) {
            return Err(CoreError::ConfigError {
                key: "calendar.prodid",
                reason: "must be a non-empty single line".to_string(),
            });
        }
        if self.calendar.max_expanded_occurrences == 0 {
            return Err(CoreError::ConfigError {
                key: "calendar.max_expanded_occurrences",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.import.max_entries == 0 {
            return Err(CoreError::ConfigError {
                key: "import.max_entries",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// ## Summary
    /// Retention window for tombstones, in seconds.
    #[must_use]
    pub fn tombstone_retention_secs(&self) -> i64 {
        i64::from(self.sync.tombstone_retention_days) * 86_400
    }
}

/// ## Summary
/// Loads `.env` into the environment, then [`Settings::load`].
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
