use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A city the user saved; `city` is the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub city: String,
    pub country: String,
}

impl Favorite {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }
}

/// A stored measurement-system choice, e.g. `"Imperial (F)"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPreference {
    pub unit: String,
}

impl UnitPreference {
    pub fn new(unit: impl Into<String>) -> Self {
        Self { unit: unit.into() }
    }
}

impl From<UnitSystem> for UnitPreference {
    fn from(system: UnitSystem) -> Self {
        Self::new(system.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitSystem {
    #[default]
    Imperial,
    Metric,
}

impl UnitSystem {
    /// Value of the `units` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => "imperial",
            UnitSystem::Metric => "metric",
        }
    }

    /// Label stored in the settings table.
    pub fn label(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => "Imperial (F)",
            UnitSystem::Metric => "Metric (C)",
        }
    }

    pub const fn all() -> &'static [UnitSystem] {
        &[UnitSystem::Imperial, UnitSystem::Metric]
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => "°F",
            UnitSystem::Metric => "°C",
        }
    }

    pub fn wind_speed_unit(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => "mph",
            UnitSystem::Metric => "m/s",
        }
    }

    /// Parse a stored label. Only the first word counts, so `"Metric (C)"`
    /// and `"metric"` are the same system.
    pub fn from_label(label: &str) -> Option<Self> {
        let word = label.split_whitespace().next()?.to_lowercase();

        match word.as_str() {
            "imperial" => Some(UnitSystem::Imperial),
            "metric" => Some(UnitSystem::Metric),
            _ => None,
        }
    }

    /// Pick the system from stored preferences; the first parsable one wins.
    pub fn resolve(preferences: &[UnitPreference]) -> Self {
        preferences
            .iter()
            .find_map(|p| Self::from_label(&p.unit))
            .unwrap_or_default()
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UnitSystem {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_label(value).ok_or_else(|| {
            anyhow::anyhow!("Unknown unit system '{value}'. Supported: imperial, metric.")
        })
    }
}

/// Daily forecast for one city, as returned by the remote source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub city: City,
    #[serde(default)]
    pub cnt: u32,
    #[serde(default, deserialize_with = "code_as_string")]
    pub cod: String,
    #[serde(default)]
    pub message: f64,
    #[serde(default)]
    pub list: Vec<DailyForecast>,
}

impl Forecast {
    pub fn today(&self) -> Option<&DailyForecast> {
        self.list.first()
    }

    /// `"Seattle, US"`
    pub fn location_name(&self) -> String {
        format!("{}, {}", self.city.name, self.city.country)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub coord: Coord,
    #[serde(default)]
    pub population: u64,
    #[serde(default)]
    pub timezone: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub dt: i64,
    #[serde(default)]
    pub sunrise: i64,
    #[serde(default)]
    pub sunset: i64,
    pub temp: Temperature,
    #[serde(default)]
    pub feels_like: FeelsLike,
    #[serde(default)]
    pub pressure: u32,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: u16,
    #[serde(default)]
    pub gust: f64,
    #[serde(default)]
    pub clouds: u8,
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub rain: Option<f64>,
}

impl DailyForecast {
    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.dt, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Temperature {
    pub day: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub night: f64,
    #[serde(default)]
    pub eve: f64,
    #[serde(default)]
    pub morn: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeelsLike {
    pub day: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub main: String,
    pub description: String,
    pub icon: String,
}

impl Condition {
    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}.png", self.icon)
    }
}

// OpenWeather sends `cod` as a string on success and as a number on some errors.
fn code_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(i64),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Text(s) => s,
        Code::Number(n) => n.to_string(),
    })
}
