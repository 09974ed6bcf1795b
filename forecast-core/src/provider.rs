use crate::{Config, Forecast, UnitSystem, provider::openweather::OpenWeatherSource};
use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};

pub mod openweather;

/// Why a remote forecast could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("forecast request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode forecast: {0}")]
    Decode(String),

    #[error("forecast request timed out after {0:?}")]
    Timeout(Duration),

    #[error("no API key configured; run `forecast configure` or set OPENWEATHER_API_KEY")]
    MissingApiKey,
}

/// Remote data source for daily forecasts.
#[async_trait]
pub trait ForecastSource: Send + Sync + Debug {
    async fn get_forecast(&self, city: &str, units: UnitSystem) -> Result<Forecast, FetchError>;
}

/// Construct the OpenWeather source from config.
///
/// A missing API key is not an error here: the store works without one,
/// and every fetch fails with [`FetchError::MissingApiKey`] instead.
pub fn source_from_config(config: &Config) -> OpenWeatherSource {
    OpenWeatherSource::new(config.api_key().ok())
        .with_base_url(config.base_url.clone())
        .with_days(config.days)
}
