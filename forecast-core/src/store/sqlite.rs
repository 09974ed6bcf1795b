use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use futures::StreamExt;
use rusqlite::{Connection, params};
use tokio::{sync::watch, task};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

use crate::model::{Favorite, UnitPreference};

use super::{LocalStore, Snapshots, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS fav_tbl (
    city TEXT PRIMARY KEY NOT NULL,
    country TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS settings_tbl (
    unit TEXT PRIMARY KEY NOT NULL
);
"#;

/// SQLite-backed store.
///
/// Every write republishes the affected table, even when no row changed;
/// coalescing is left to the consumer.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    favorites: Arc<watch::Sender<Vec<Favorite>>>,
    units: Arc<watch::Sender<Vec<UnitPreference>>>,
}

impl SqliteStore {
    /// Open (or create) the database file, creating parent directories as needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let conn = task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            debug!(path = %path.display(), "opening forecast database");
            Ok::<_, StoreError>(Connection::open(&path)?)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))??;

        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;

        let (favorites, _) = watch::channel(load_favorites(&conn)?);
        let (units, _) = watch::channel(load_units(&conn)?);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            favorites: Arc::new(favorites),
            units: Arc::new(units),
        })
    }

    /// Run `op` on the blocking pool, then publish a fresh favorites snapshot.
    async fn write_favorites<F>(&self, op: F) -> Result<(), StoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<usize> + Send + 'static,
    {
        let tx = Arc::clone(&self.favorites);
        self.with_conn(move |conn| {
            let changed = op(conn)?;
            // Published under the connection lock so snapshots keep write order.
            tx.send_replace(load_favorites(conn)?);
            Ok(changed)
        })
        .await
        .map(|changed| debug!(changed, "favorites written"))
    }

    async fn write_units<F>(&self, op: F) -> Result<(), StoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<usize> + Send + 'static,
    {
        let tx = Arc::clone(&self.units);
        self.with_conn(move |conn| {
            let changed = op(conn)?;
            tx.send_replace(load_units(conn)?);
            Ok(changed)
        })
        .await
        .map(|changed| debug!(changed, "units written"))
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Task("database connection lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    fn favorites(&self) -> Snapshots<Favorite> {
        WatchStream::new(self.favorites.subscribe()).boxed()
    }

    fn units(&self) -> Snapshots<UnitPreference> {
        WatchStream::new(self.units.subscribe()).boxed()
    }

    async fn insert_favorite(&self, favorite: &Favorite) -> Result<(), StoreError> {
        info!(city = %favorite.city, "inserting favorite");
        let Favorite { city, country } = favorite.clone();

        self.write_favorites(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO fav_tbl (city, country) VALUES (?1, ?2)",
                params![city, country],
            )
        })
        .await
    }

    async fn update_favorite(&self, favorite: &Favorite) -> Result<(), StoreError> {
        info!(city = %favorite.city, "updating favorite");
        let Favorite { city, country } = favorite.clone();

        self.write_favorites(move |conn| {
            conn.execute("UPDATE fav_tbl SET country = ?2 WHERE city = ?1", params![city, country])
        })
        .await
    }

    async fn delete_favorite(&self, favorite: &Favorite) -> Result<(), StoreError> {
        info!(city = %favorite.city, "deleting favorite");
        let city = favorite.city.clone();

        self.write_favorites(move |conn| {
            conn.execute("DELETE FROM fav_tbl WHERE city = ?1", params![city])
        })
        .await
    }

    async fn insert_unit(&self, unit: &UnitPreference) -> Result<(), StoreError> {
        info!(unit = %unit.unit, "inserting unit preference");
        let unit = unit.unit.clone();

        self.write_units(move |conn| {
            conn.execute("INSERT OR REPLACE INTO settings_tbl (unit) VALUES (?1)", params![unit])
        })
        .await
    }

    async fn update_unit(&self, unit: &UnitPreference) -> Result<(), StoreError> {
        info!(unit = %unit.unit, "updating unit preference");
        let unit = unit.unit.clone();

        // The label is the whole row, so an update can only touch an existing key.
        self.write_units(move |conn| {
            conn.execute("UPDATE settings_tbl SET unit = ?1 WHERE unit = ?1", params![unit])
        })
        .await
    }

    async fn delete_unit(&self, unit: &UnitPreference) -> Result<(), StoreError> {
        info!(unit = %unit.unit, "deleting unit preference");
        let unit = unit.unit.clone();

        self.write_units(move |conn| {
            conn.execute("DELETE FROM settings_tbl WHERE unit = ?1", params![unit])
        })
        .await
    }

    async fn delete_all_units(&self) -> Result<(), StoreError> {
        info!("deleting all unit preferences");
        self.write_units(|conn| conn.execute("DELETE FROM settings_tbl", [])).await
    }
}

fn load_favorites(conn: &Connection) -> rusqlite::Result<Vec<Favorite>> {
    let mut stmt = conn.prepare_cached("SELECT city, country FROM fav_tbl ORDER BY city")?;
    let rows = stmt.query_map([], |row| {
        Ok(Favorite {
            city: row.get(0)?,
            country: row.get(1)?,
        })
    })?;
    let favorites = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(favorites)
}

fn load_units(conn: &Connection) -> rusqlite::Result<Vec<UnitPreference>> {
    let mut stmt = conn.prepare_cached("SELECT unit FROM settings_tbl ORDER BY unit")?;
    let rows = stmt.query_map([], |row| Ok(UnitPreference { unit: row.get(0)? }))?;
    let units = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(units)
}
