//! Local persistence for favorites and unit preferences.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::model::{Favorite, UnitPreference};

pub mod sqlite;

/// Full-table snapshots, current one first, then one per write.
pub type Snapshots<T> = BoxStream<'static, Vec<T>>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),

    #[error("store task failed: {0}")]
    Task(String),
}

#[async_trait]
pub trait LocalStore: Send + Sync {
    fn favorites(&self) -> Snapshots<Favorite>;
    fn units(&self) -> Snapshots<UnitPreference>;

    /// Inserting an existing city replaces its row.
    async fn insert_favorite(&self, favorite: &Favorite) -> Result<(), StoreError>;
    async fn update_favorite(&self, favorite: &Favorite) -> Result<(), StoreError>;
    async fn delete_favorite(&self, favorite: &Favorite) -> Result<(), StoreError>;

    async fn insert_unit(&self, unit: &UnitPreference) -> Result<(), StoreError>;
    async fn update_unit(&self, unit: &UnitPreference) -> Result<(), StoreError>;
    async fn delete_unit(&self, unit: &UnitPreference) -> Result<(), StoreError>;
    async fn delete_all_units(&self) -> Result<(), StoreError>;
}
