//! Runtime settings: defaults, then `rewear.toml`, then `REWEAR_*` variables.
use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

pub const DEV_JWT_SECRET: &str = "rewear-dev-secret";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub db_path: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub log_level: String,
    pub log_json: bool,
    pub default_page_size: usize,
    // promoted to admin at start-up when the account exists
    pub admin_username: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        defaults()?
            .add_source(File::with_name("rewear").required(false))
            .add_source(Environment::with_prefix("REWEAR").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Defaults with explicit overrides and no file or environment lookup.
    pub fn with_overrides(overrides: &[(&str, &str)]) -> Result<Self, ConfigError> {
        let mut builder = defaults()?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        builder.build()?.try_deserialize()
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("bind_addr", "127.0.0.1:5000")?
        .set_default("db_path", "rewear.db")?
        .set_default("jwt_secret", DEV_JWT_SECRET)?
        .set_default("token_ttl_hours", 24_i64)?
        .set_default("log_level", "info")?
        .set_default("log_json", false)?
        .set_default("default_page_size", 10_i64)
}
