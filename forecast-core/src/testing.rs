//! Stubs shared by the unit tests.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::{
    model::{
        City, Condition, Coord, DailyForecast, Favorite, FeelsLike, Forecast, Temperature,
        UnitPreference, UnitSystem,
    },
    provider::{FetchError, ForecastSource},
    store::{LocalStore, Snapshots, StoreError},
};

pub fn sample_forecast(city: &str) -> Forecast {
    Forecast {
        city: City {
            id: 1,
            name: city.to_string(),
            country: "US".to_string(),
            coord: Coord {
                lat: 47.6,
                lon: -122.3,
            },
            population: 1000,
            timezone: 0,
        },
        cnt: 1,
        cod: "200".to_string(),
        message: 0.0,
        list: vec![DailyForecast {
            dt: 1_697_659_200,
            sunrise: 1_697_640_012,
            sunset: 1_697_678_493,
            temp: Temperature {
                day: 58.0,
                min: 49.0,
                max: 60.0,
                night: 51.0,
                eve: 55.0,
                morn: 50.0,
            },
            feels_like: FeelsLike::default(),
            pressure: 1017,
            humidity: 78,
            weather: vec![Condition {
                id: 500,
                main: "Rain".to_string(),
                description: "light rain".to_string(),
                icon: "10d".to_string(),
            }],
            speed: 6.4,
            deg: 190,
            gust: 12.1,
            clouds: 90,
            pop: 0.6,
            rain: None,
        }],
    }
}

type Calls = Arc<Mutex<Vec<(String, UnitSystem)>>>;

/// Forecast source returning a fixed result, optionally after a delay.
#[derive(Debug, Clone)]
pub struct StubSource {
    result: Result<Forecast, FetchError>,
    delay: Option<Duration>,
    calls: Calls,
}

impl StubSource {
    pub fn ok(forecast: Forecast) -> Self {
        Self {
            result: Ok(forecast),
            delay: None,
            calls: Calls::default(),
        }
    }

    pub fn err(error: FetchError) -> Self {
        Self {
            result: Err(error),
            delay: None,
            calls: Calls::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Calls {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ForecastSource for StubSource {
    async fn get_forecast(&self, city: &str, units: UnitSystem) -> Result<Forecast, FetchError> {
        self.calls.lock().unwrap().push((city.to_string(), units));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}

/// Senders driving a [`ScriptedStore`]'s snapshot streams.
pub struct Script {
    pub favorites: mpsc::UnboundedSender<Vec<Favorite>>,
    pub units: mpsc::UnboundedSender<Vec<UnitPreference>>,
}

/// Store whose snapshots are pushed by the test and whose writes are only recorded.
pub struct ScriptedStore {
    favorites: Mutex<Option<mpsc::UnboundedReceiver<Vec<Favorite>>>>,
    units: Mutex<Option<mpsc::UnboundedReceiver<Vec<UnitPreference>>>>,
    fail_writes: bool,
    pub writes: Arc<Mutex<Vec<String>>>,
}

impl ScriptedStore {
    pub fn new() -> (Self, Script) {
        let (fav_tx, fav_rx) = mpsc::unbounded_channel();
        let (unit_tx, unit_rx) = mpsc::unbounded_channel();

        let store = Self {
            favorites: Mutex::new(Some(fav_rx)),
            units: Mutex::new(Some(unit_rx)),
            fail_writes: false,
            writes: Arc::default(),
        };

        let script = Script {
            favorites: fav_tx,
            units: unit_tx,
        };
        (store, script)
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    fn record(&self, write: String) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Task(format!("rejected {write}")));
        }
        self.writes.lock().unwrap().push(write);
        Ok(())
    }
}

#[async_trait]
impl LocalStore for ScriptedStore {
    fn favorites(&self) -> Snapshots<Favorite> {
        match self.favorites.lock().unwrap().take() {
            Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
            None => stream::pending().boxed(),
        }
    }

    fn units(&self) -> Snapshots<UnitPreference> {
        match self.units.lock().unwrap().take() {
            Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
            None => stream::pending().boxed(),
        }
    }

    async fn insert_favorite(&self, favorite: &Favorite) -> Result<(), StoreError> {
        self.record(format!("insert_favorite {}", favorite.city))
    }

    async fn update_favorite(&self, favorite: &Favorite) -> Result<(), StoreError> {
        self.record(format!("update_favorite {}", favorite.city))
    }

    async fn delete_favorite(&self, favorite: &Favorite) -> Result<(), StoreError> {
        self.record(format!("delete_favorite {}", favorite.city))
    }

    async fn insert_unit(&self, unit: &UnitPreference) -> Result<(), StoreError> {
        self.record(format!("insert_unit {}", unit.unit))
    }

    async fn update_unit(&self, unit: &UnitPreference) -> Result<(), StoreError> {
        self.record(format!("update_unit {}", unit.unit))
    }

    async fn delete_unit(&self, unit: &UnitPreference) -> Result<(), StoreError> {
        self.record(format!("delete_unit {}", unit.unit))
    }

    async fn delete_all_units(&self) -> Result<(), StoreError> {
        self.record("delete_all_units".to_string())
    }
}
