use config::Environment;
use reqwest::Url;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_SUBGRAPH_URL: &str = "https://api.studio.thegraph.com/query/1121/bankv1/v0.0.5";

const DB_SCHEMES: [&str; 3] = ["postgres://", "postgresql://", "sqlite:"];

const KEYS: [&str; 2] = ["DB_STRING", "SUBGRAPH_URL"];

#[derive(Debug, Clone)]
pub struct Config {
    pub db_string: String,
    pub subgraph_url: Url,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    db_string: Option<String>,
    subgraph_url: Option<String>,
}

impl Config {
    /// Reads `DB_STRING` and `SUBGRAPH_URL` from the process environment, after `.env` if present.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_vars(KEYS.iter().filter_map(|&key| lookup(key).map(|value| (key, value))))
    }

    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_environment(Environment::default().source(Some(vars)))
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        let raw: RawConfig = config::Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        let db_string = raw
            .db_string
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingDbString)?;

        if !DB_SCHEMES.iter().any(|scheme| db_string.starts_with(scheme)) {
            let scheme = db_string.split(':').next().unwrap_or_default().to_string();
            return Err(ConfigError::UnsupportedDbScheme(scheme));
        }

        let subgraph_url = raw
            .subgraph_url
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SUBGRAPH_URL.to_string());
        let subgraph_url = Url::parse(&subgraph_url)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or(ConfigError::InvalidSubgraphUrl(subgraph_url))?;

        Ok(Config {
            db_string,
            subgraph_url,
        })
    }
}
