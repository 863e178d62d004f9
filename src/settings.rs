use std::net::SocketAddr;

use anyhow::Context;
use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;

/// Runtime configuration.
///
/// Sources, lowest priority first: built-in defaults, an optional
/// `kuizzz.toml` in the working directory, then `KUIZZZ__SECTION__KEY`
/// environment variables (a `.env` file is loaded into the environment first).
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub seed: SeedSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Empty means any origin is allowed.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub session_ttl_hours: i64,
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSettings {
    pub sample_data: bool,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::builder()?
            .add_source(File::with_name("kuizzz").required(false))
            .add_source(
                Environment::with_prefix("KUIZZZ")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Defaults only, used by tests and as the base layer of [`Settings::load`].
    pub fn defaults() -> anyhow::Result<Self> {
        Ok(Self::builder()?.build()?.try_deserialize()?)
    }

    fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.cors_origins", Vec::<String>::new())?
            .set_default("database.path", "kuizzz.db")?
            .set_default("auth.session_ttl_hours", 24)?
            .set_default("auth.admin_username", "admin")?
            .set_default("auth.admin_email", "admin@kuizzz.local")?
            .set_default("seed.sample_data", true)?)
    }

    pub fn address(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid listen address {}:{}",
                    self.server.host, self.server.port
                )
            })
    }
}
