use std::{fmt, sync::Arc, time::Duration};

use futures::StreamExt;
use tracing::{debug, warn};

use crate::{
    envelope::Envelope,
    model::{Favorite, Forecast, UnitPreference, UnitSystem},
    observe::distinct_until_changed,
    provider::{FetchError, ForecastSource},
    store::{LocalStore, Snapshots, StoreError},
};

pub type ForecastEnvelope = Envelope<Forecast, FetchError>;

/// Single entry point to the remote source and the local store.
///
/// Remote failures come back as [`Envelope::Failed`]; store failures
/// propagate unchanged.
#[derive(Clone)]
pub struct Repository {
    source: Arc<dyn ForecastSource>,
    store: Arc<dyn LocalStore>,
    timeout: Duration,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("source", &self.source)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Repository {
    pub fn new(
        source: Arc<dyn ForecastSource>,
        store: Arc<dyn LocalStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            store,
            timeout,
        }
    }

    /// One attempt, bounded by the configured timeout. Never fails.
    pub async fn fetch_forecast(&self, city: &str, unit: UnitSystem) -> ForecastEnvelope {
        let request = self.source.get_forecast(city, unit);
        let result = match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        };

        match &result {
            Ok(forecast) => debug!(city, days = forecast.list.len(), "forecast received"),
            Err(err) => warn!(city, error = %err, "forecast request failed"),
        }

        Envelope::from_result(result)
    }

    pub fn observe_favorites(&self) -> Snapshots<Favorite> {
        distinct_until_changed(self.store.favorites()).boxed()
    }

    pub fn observe_units(&self) -> Snapshots<UnitPreference> {
        distinct_until_changed(self.store.units()).boxed()
    }

    /// The favorites table as it is right now.
    pub async fn current_favorites(&self) -> Vec<Favorite> {
        self.store.favorites().next().await.unwrap_or_default()
    }

    pub async fn current_units(&self) -> Vec<UnitPreference> {
        self.store.units().next().await.unwrap_or_default()
    }

    pub async fn insert_favorite(&self, favorite: &Favorite) -> Result<(), StoreError> {
        self.store.insert_favorite(favorite).await
    }

    pub async fn update_favorite(&self, favorite: &Favorite) -> Result<(), StoreError> {
        self.store.update_favorite(favorite).await
    }

    pub async fn delete_favorite(&self, favorite: &Favorite) -> Result<(), StoreError> {
        self.store.delete_favorite(favorite).await
    }

    pub async fn insert_unit(&self, unit: &UnitPreference) -> Result<(), StoreError> {
        self.store.insert_unit(unit).await
    }

    pub async fn update_unit(&self, unit: &UnitPreference) -> Result<(), StoreError> {
        self.store.update_unit(unit).await
    }

    pub async fn delete_unit(&self, unit: &UnitPreference) -> Result<(), StoreError> {
        self.store.delete_unit(unit).await
    }

    pub async fn delete_all_units(&self) -> Result<(), StoreError> {
        self.store.delete_all_units().await
    }
}
