use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,

    #[serde(default = "default_handler_timeout_ms")]
    pub handler_timeout_ms: u64,

    #[serde(default = "default_connection_buffer_size")]
    pub connection_buffer_size: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    #[serde(default = "default_identity_header")]
    pub identity_header: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_server_port() -> u16 {
    8080
}

fn default_delivery_timeout_ms() -> u64 {
    2_000
}

fn default_handler_timeout_ms() -> u64 {
    30_000
}

fn default_connection_buffer_size() -> usize {
    64
}

fn default_max_page_size() -> u32 {
    100
}

fn default_identity_header() -> String {
    "x-user-id".to_string()
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Self>(pairs)
            .map_err(|e| anyhow!("Invalid configuration value: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.delivery_timeout_ms == 0 {
            return Err(anyhow!("DELIVERY_TIMEOUT_MS must be greater than zero"));
        }

        if self.handler_timeout_ms == 0 {
            return Err(anyhow!("HANDLER_TIMEOUT_MS must be greater than zero"));
        }

        if self.connection_buffer_size == 0 {
            return Err(anyhow!("CONNECTION_BUFFER_SIZE must be greater than zero"));
        }

        if self.max_page_size == 0 {
            return Err(anyhow!("MAX_PAGE_SIZE must be greater than zero"));
        }

        if self.identity_header.trim().is_empty() {
            return Err(anyhow!("IDENTITY_HEADER cannot be empty"));
        }

        Ok(())
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }

    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}
