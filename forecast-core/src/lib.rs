//! Core library for the `forecast` CLI.
//!
//! This crate defines:
//! - The result envelope carried from a fetch to whatever displays it
//! - The remote forecast source and the local store of favorites and units
//! - The repository in front of both, and per-screen state holders on top
//! - Configuration handling
//!
//! It is used by `forecast-cli`, but can also be reused by other front ends.

pub mod config;
pub mod envelope;
pub mod holder;
pub mod model;
pub mod observe;
pub mod provider;
pub mod repository;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::{Config, repository_from_config};
pub use envelope::Envelope;
pub use holder::{
    EmptySnapshots, FavoritesHolder, ForecastHolder, ForecastState, ListHolder, UnitsHolder,
};
pub use model::{DailyForecast, Favorite, Forecast, UnitPreference, UnitSystem};
pub use provider::{FetchError, ForecastSource};
pub use repository::{ForecastEnvelope, Repository};
pub use store::{LocalStore, StoreError};
