use almanac_core::models::ExpansionConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CONFIG_FILE: &str = "almanac.toml";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding all series
    pub database_path: String,
    /// User the CLI acts as when `--user` is not given
    pub default_user: Uuid,
    /// Length of the default agenda window
    pub agenda_days: i64,
    pub expansion: ExpansionSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "almanac.db".to_string(),
            default_user: Uuid::nil(),
            agenda_days: 7,
            expansion: ExpansionSettings::default(),
        }
    }
}

/// Bounds on occurrence expansion; mapped onto the core `ExpansionConfig`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExpansionSettings {
    pub max_occurrences_per_query: usize,
    pub max_candidates_per_series: usize,
    pub max_reminder_minutes: i32,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        let core = ExpansionConfig::default();
        Self {
            max_occurrences_per_query: core.max_occurrences_per_query,
            max_candidates_per_series: core.max_candidates_per_series,
            max_reminder_minutes: core.max_reminder_minutes,
        }
    }
}

impl From<&ExpansionSettings> for ExpansionConfig {
    fn from(settings: &ExpansionSettings) -> Self {
        ExpansionConfig {
            max_occurrences_per_query: settings.max_occurrences_per_query,
            max_candidates_per_series: settings.max_candidates_per_series,
            max_reminder_minutes: settings.max_reminder_minutes,
        }
    }
}

impl Config {
    /// Defaults, then `almanac.toml`, then `ALMANAC_*` variables
    /// (`ALMANAC_EXPANSION__MAX_REMINDER_MINUTES` for nested keys).
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("ALMANAC_").split("__"))
    }

    pub fn expansion(&self) -> ExpansionConfig {
        ExpansionConfig::from(&self.expansion)
    }
}
