use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::model::{Forecast, UnitSystem};

use super::{FetchError, ForecastSource};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_DAYS: u8 = 7;

#[derive(Debug, Clone)]
pub struct OpenWeatherSource {
    api_key: Option<String>,
    base_url: String,
    days: u8,
    http: Client,
}

impl OpenWeatherSource {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            days: DEFAULT_DAYS,
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_days(mut self, days: u8) -> Self {
        self.days = days.max(1);
        self
    }

    pub fn days(&self) -> u8 {
        self.days
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn forecast_url(&self) -> String {
        format!("{}/data/2.5/forecast/daily", self.base_url)
    }
}

#[async_trait]
impl ForecastSource for OpenWeatherSource {
    async fn get_forecast(&self, city: &str, units: UnitSystem) -> Result<Forecast, FetchError> {
        let api_key = self.api_key.as_deref().ok_or(FetchError::MissingApiKey)?;
        let cnt = self.days.to_string();
        debug!(city, units = units.as_str(), days = self.days, "requesting daily forecast");

        let res = self
            .http
            .get(self.forecast_url())
            .query(&[
                ("q", city),
                ("units", units.as_str()),
                ("cnt", cnt.as_str()),
                ("appid", api_key),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| FetchError::Transport(e.to_string()))?;

        parse_forecast(status, &body)
    }
}

/// Turn a raw OpenWeather response into a forecast.
pub fn parse_forecast(status: StatusCode, body: &str) -> Result<Forecast, FetchError> {
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            body: truncate_body(body),
        });
    }

    serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEATTLE: &str = r#"{
        "city": {
            "id": 5809844,
            "name": "Seattle",
            "coord": {"lon": -122.3321, "lat": 47.6062},
            "country": "US",
            "population": 608660,
            "timezone": -25200
        },
        "cod": "200",
        "message": 0.0453,
        "cnt": 2,
        "list": [
            {
                "dt": 1697659200,
                "sunrise": 1697640012,
                "sunset": 1697678493,
                "temp": {
                    "day": 58.1, "min": 49.3, "max": 60.2,
                    "night": 51.0, "eve": 55.4, "morn": 49.8
                },
                "feels_like": {"day": 56.9, "night": 50.1, "eve": 54.3, "morn": 47.2},
                "pressure": 1017,
                "humidity": 78,
                "weather": [
                    {"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}
                ],
                "speed": 6.4,
                "deg": 190,
                "gust": 12.1,
                "clouds": 90,
                "pop": 0.62,
                "rain": 1.7
            },
            {
                "dt": 1697745600,
                "sunrise": 1697726512,
                "sunset": 1697764774,
                "temp": {
                    "day": 61.0, "min": 50.0, "max": 63.5,
                    "night": 52.0, "eve": 57.0, "morn": 50.5
                },
                "feels_like": {"day": 60.0, "night": 51.0, "eve": 56.0, "morn": 49.0},
                "pressure": 1021,
                "humidity": 64,
                "weather": [
                    {"id": 800, "main": "Clear", "description": "sky is clear", "icon": "01d"}
                ],
                "speed": 4.2,
                "deg": 200,
                "gust": 7.0,
                "clouds": 5,
                "pop": 0.0
            }
        ]
    }"#;

    #[test]
    fn parses_daily_forecast() {
        let forecast = parse_forecast(StatusCode::OK, SEATTLE).expect("valid forecast");

        assert_eq!(forecast.location_name(), "Seattle, US");
        assert_eq!(forecast.cnt, 2);
        assert_eq!(forecast.list.len(), 2);

        let today = forecast.today().expect("first day");
        assert_eq!(today.humidity, 78);
        assert_eq!(today.pressure, 1017);
        assert_eq!(today.rain, Some(1.7));
        assert_eq!(today.temp.max, 60.2);

        let condition = today.condition().expect("condition");
        assert_eq!(condition.description, "light rain");
        assert_eq!(condition.icon_url(), "https://openweathermap.org/img/wn/10d.png");

        assert_eq!(forecast.list[1].rain, None);
    }

    #[test]
    fn non_success_status_is_an_error() {
        let body = r#"{"cod":"404","message":"city not found"}"#;
        let err = parse_forecast(StatusCode::NOT_FOUND, body).unwrap_err();

        assert_eq!(
            err,
            FetchError::Status {
                status: 404,
                body: body.to_string(),
            }
        );
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = parse_forecast(StatusCode::OK, "{not json").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        let err = parse_forecast(StatusCode::INTERNAL_SERVER_ERROR, &body).unwrap_err();

        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), 203);
                assert!(body.ends_with("..."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let source = OpenWeatherSource::new(Some("KEY".into()))
            .with_base_url("http://localhost:8080/".into());
        assert_eq!(source.forecast_url(), "http://localhost:8080/data/2.5/forecast/daily");
    }
}
