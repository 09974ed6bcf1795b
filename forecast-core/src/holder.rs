//! Per-screen presentation state.
//!
//! A holder is the only writer of the state it publishes. Display code
//! subscribes to a [`watch::Receiver`] and sends intents back through the
//! holder's methods. Every task a holder starts is owned by it and is
//! aborted when the holder is dropped or shut down.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use futures::{FutureExt, StreamExt, future::BoxFuture};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    envelope::Envelope,
    model::{Favorite, UnitPreference, UnitSystem},
    repository::{ForecastEnvelope, Repository},
    store::{Snapshots, StoreError},
};

/// `None` until the first request.
pub type ForecastState = Option<ForecastEnvelope>;

/// Holds the forecast for the main screen, one fetch per request.
pub struct ForecastHolder {
    repository: Repository,
    default_city: String,
    state: Arc<watch::Sender<ForecastState>>,
    generation: Arc<AtomicU64>,
    in_flight: Option<JoinHandle<()>>,
}

impl ForecastHolder {
    pub fn new(repository: Repository, default_city: impl Into<String>) -> Self {
        let (state, _) = watch::channel(None);

        Self {
            repository,
            default_city: default_city.into(),
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ForecastState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ForecastState {
        self.state.borrow().clone()
    }

    /// Publish `Loading`, then the outcome of a single fetch.
    ///
    /// A newer request supersedes an older one still in flight.
    pub fn request(&mut self, city: &str, unit: UnitSystem) {
        self.cancel_in_flight();

        let city = match city.trim() {
            "" => self.default_city.clone(),
            c => c.to_string(),
        };

        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = Some(Envelope::Loading);
        });
        debug!(%city, %unit, generation, "forecast requested");

        let repository = self.repository.clone();
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);

        self.in_flight = Some(tokio::spawn(async move {
            let envelope = repository.fetch_forecast(&city, unit).await;

            // Checked under the channel lock, so a superseded fetch never lands.
            state.send_if_modified(|state| {
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *state = Some(envelope);
                true
            });
        }));
    }

    /// Cancel any in-flight fetch and wait for it to stop.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.cancel_in_flight() {
            let _ = handle.await;
        }
    }

    fn cancel_in_flight(&mut self) -> Option<JoinHandle<()>> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let handle = self.in_flight.take()?;
        handle.abort();
        Some(handle)
    }
}

impl Drop for ForecastHolder {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}

/// What a list holder does with an empty snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptySnapshots {
    /// Keep the last non-empty list.
    #[default]
    Skip,
    /// Treat an empty table as a state worth showing.
    Publish,
}

type Mutation = BoxFuture<'static, Result<(), StoreError>>;

enum Job {
    Write(&'static str, Mutation),
    Flush(oneshot::Sender<()>),
}

/// Holds a record list mirrored from the local store.
///
/// Mutations are queued to a single writer task and applied one at a time,
/// in the order they were issued.
pub struct ListHolder<T> {
    repository: Repository,
    state: watch::Receiver<Vec<T>>,
    subscription: JoinHandle<()>,
    jobs: mpsc::UnboundedSender<Job>,
    writer: JoinHandle<()>,
}

pub type FavoritesHolder = ListHolder<Favorite>;
pub type UnitsHolder = ListHolder<UnitPreference>;

impl<T> ListHolder<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn spawn(repository: Repository, mut snapshots: Snapshots<T>, empty: EmptySnapshots) -> Self {
        let (tx, state) = watch::channel(Vec::new());

        let subscription = tokio::spawn(async move {
            while let Some(list) = snapshots.next().await {
                if list.is_empty() && empty == EmptySnapshots::Skip {
                    debug!("empty snapshot skipped");
                    continue;
                }
                tx.send_if_modified(|current| {
                    if *current == list {
                        return false;
                    }
                    *current = list;
                    true
                });
            }
        });

        let (jobs, queue) = mpsc::unbounded_channel();
        let writer = tokio::spawn(apply_in_order(queue));

        Self {
            repository,
            state,
            subscription,
            jobs,
            writer,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.state.clone()
    }

    pub fn current(&self) -> Vec<T> {
        self.state.borrow().clone()
    }

    /// Wait for every mutation issued so far.
    pub async fn flush(&mut self) {
        let (done, flushed) = oneshot::channel();
        if self.jobs.send(Job::Flush(done)).is_err() {
            warn!("mutation writer is gone");
            return;
        }
        let _ = flushed.await;
    }

    /// Abort the subscription and any queued mutation, and wait for both.
    pub async fn shutdown(mut self) {
        self.writer.abort();
        self.subscription.abort();

        let _ = (&mut self.writer).await;
        let _ = (&mut self.subscription).await;
    }

    fn launch<F>(&mut self, action: &'static str, mutation: F)
    where
        F: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        if self.jobs.send(Job::Write(action, mutation.boxed())).is_err() {
            warn!(action, "mutation dropped, writer is gone");
        }
    }
}

async fn apply_in_order(mut queue: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = queue.recv().await {
        match job {
            Job::Write(action, mutation) => {
                if let Err(err) = mutation.await {
                    warn!(action, error = %err, "store mutation failed");
                }
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

impl<T> Drop for ListHolder<T> {
    fn drop(&mut self) {
        self.writer.abort();
        self.subscription.abort();
    }
}

impl ListHolder<Favorite> {
    pub fn favorites(repository: Repository, empty: EmptySnapshots) -> Self {
        let snapshots = repository.observe_favorites();
        Self::spawn(repository, snapshots, empty)
    }

    pub fn insert_favorite(&mut self, favorite: Favorite) {
        let repository = self.repository.clone();
        self.launch("insert favorite", async move {
            repository.insert_favorite(&favorite).await
        });
    }

    pub fn update_favorite(&mut self, favorite: Favorite) {
        let repository = self.repository.clone();
        self.launch("update favorite", async move {
            repository.update_favorite(&favorite).await
        });
    }

    pub fn delete_favorite(&mut self, favorite: Favorite) {
        let repository = self.repository.clone();
        self.launch("delete favorite", async move {
            repository.delete_favorite(&favorite).await
        });
    }
}

impl ListHolder<UnitPreference> {
    pub fn units(repository: Repository, empty: EmptySnapshots) -> Self {
        let snapshots = repository.observe_units();
        Self::spawn(repository, snapshots, empty)
    }

    pub fn insert_unit(&mut self, unit: UnitPreference) {
        let repository = self.repository.clone();
        self.launch("insert unit", async move {
            repository.insert_unit(&unit).await
        });
    }

    pub fn update_unit(&mut self, unit: UnitPreference) {
        let repository = self.repository.clone();
        self.launch("update unit", async move {
            repository.update_unit(&unit).await
        });
    }

    pub fn delete_unit(&mut self, unit: UnitPreference) {
        let repository = self.repository.clone();
        self.launch("delete unit", async move {
            repository.delete_unit(&unit).await
        });
    }

    pub fn delete_all_units(&mut self) {
        let repository = self.repository.clone();
        self.launch("delete all units", async move {
            repository.delete_all_units().await
        });
    }
}
