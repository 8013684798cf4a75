use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use log::info;

use crate::error::ConfigError;

pub const DEFAULT_DATA_PATH: &str = "./data";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9876;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the post log.
    pub data_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            data_path: PathBuf::from(or_default(&lookup, "GUESTBOOK_DATA_PATH", DEFAULT_DATA_PATH)),
            host: or_default(&lookup, "GUESTBOOK_HOST", DEFAULT_HOST),
            port: parse(&lookup, "PORT", DEFAULT_PORT)?,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key,
            reason: e.to_string(),
            value: value,
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
