use std::{env, path::PathBuf, time::Duration};

use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::error::{CollectorError, Result};

/// Process-wide settings, built once in `main` and handed to each component.
///
/// Sources, lowest priority first: built-in defaults, optional `zillow.toml`,
/// `ZILLOW_*` environment variables, then the variable names the collection
/// scripts have always used (`X_RAPIDAPI_KEY`, `STATE`, `BUCKET_NAME`,
/// `GOOGLE_APPLICATION_CREDENTIALS`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub x_rapidapi_key: Option<String>,
    pub api_base_url: String,
    pub api_host: String,
    pub site_url: String,
    pub state: String,
    pub request_delay_ms: u64,
    pub output_dir: PathBuf,
    pub bucket_name: Option<String>,
    pub google_application_credentials: Option<PathBuf>,
    pub marked_file: PathBuf,
    pub pics_dir: PathBuf,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // .env is optional

        let builder = Self::defaults()?
            .add_source(File::with_name("zillow").required(false))
            .add_source(Environment::with_prefix("ZILLOW").try_parsing(true))
            .set_override_option("x_rapidapi_key", env::var("X_RAPIDAPI_KEY").ok())?
            .set_override_option("state", env::var("STATE").ok())?
            .set_override_option("bucket_name", env::var("BUCKET_NAME").ok())?
            .set_override_option(
                "google_application_credentials",
                env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
            )?;

        Self::from_builder(builder)
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("api_base_url", "https://zillow-com1.p.rapidapi.com")?
            .set_default("api_host", "zillow-com1.p.rapidapi.com")?
            .set_default("site_url", "https://www.zillow.com")?
            .set_default("state", "ca")?
            .set_default("request_delay_ms", 1000)?
            .set_default("output_dir", ".")?
            .set_default("marked_file", "marked.csv")?
            .set_default("pics_dir", "pics")?)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// RapidAPI key, required before any listing call is made.
    pub fn api_key(&self) -> Result<&str> {
        match self.x_rapidapi_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(CollectorError::Configuration(
                "environment variable X_RAPIDAPI_KEY is not set".to_string(),
            )),
        }
    }

    pub fn bucket(&self) -> Result<&str> {
        self.bucket_name.as_deref().ok_or_else(|| {
            CollectorError::Configuration("BUCKET_NAME is required for uploads".to_string())
        })
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_required_setting() {
        let settings = Settings::from_builder(Settings::defaults().unwrap()).unwrap();
        assert_eq!(settings.state, "ca");
        assert_eq!(settings.request_delay(), Duration::from_secs(1));
        assert_eq!(settings.marked_file, PathBuf::from("marked.csv"));
        assert!(settings.x_rapidapi_key.is_none());
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let settings = Settings::from_builder(Settings::defaults().unwrap()).unwrap();
        assert!(matches!(
            settings.api_key(),
            Err(CollectorError::Configuration(_))
        ));
    }

    #[test]
    fn overrides_win_over_defaults() {
        let builder = Settings::defaults()
            .unwrap()
            .set_override("x_rapidapi_key", "secret")
            .unwrap()
            .set_override("state", "tx")
            .unwrap()
            .set_override("request_delay_ms", 0)
            .unwrap();
        let settings = Settings::from_builder(builder).unwrap();
        assert_eq!(settings.api_key().unwrap(), "secret");
        assert_eq!(settings.state, "tx");
        assert_eq!(settings.request_delay(), Duration::ZERO);
        assert!(settings.bucket().is_err());
    }
}
