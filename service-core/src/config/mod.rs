use crate::error::AppError;
use config::{builder::DefaultState, ConfigBuilder, Environment, File};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// HTTP listener settings shared by every service.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Layered configuration: defaults, then an optional `configuration.*` file, then
/// `<PREFIX>__SECTION__KEY` environment variables.
pub struct ConfigLoader {
    builder: ConfigBuilder<DefaultState>,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new(env_prefix: &str) -> Self {
        Self {
            builder: config::Config::builder(),
            env_prefix: env_prefix.to_string(),
        }
    }

    pub fn with_default<V>(mut self, key: &str, value: V) -> Result<Self, AppError>
    where
        V: Into<config::Value>,
    {
        self.builder = self.builder.set_default(key, value)?;
        Ok(self)
    }

    pub fn load<T: DeserializeOwned>(self) -> Result<T, AppError> {
        dotenvy::dotenv().ok();

        let config = self
            .builder
            .add_source(File::with_name("configuration").required(false))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
