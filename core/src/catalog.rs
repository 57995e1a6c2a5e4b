//! Collection Synchronizer.
//!
//! # Design
//! `Catalog` owns the canonical list of pets and the loading flag. Writes are
//! confirm-then-apply: the local list changes only after the server accepted
//! the write, so a failure never leaves a partial edit behind.
//!
//! State lives in a `watch` channel so a shell can subscribe and re-render on
//! every change. Every mutation happens inside `send_modify`, which also
//! serializes the bookkeeping:
//! - `latest_load` identifies the most recently issued load. Only that load
//!   applies its response and clears the loading flag.
//! - `replay` records the writes applied while the latest load is in flight.
//!   When its response lands, the server list is applied first and the
//!   recorded writes on top, so a list fetched before a create neither loses
//!   the server's rows nor erases that create.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::RequestError;
use crate::remote::RemoteStore;
use crate::transport::Transport;
use crate::types::{NewPet, Pet, PetId};

/// Snapshot of the canonical state, as seen by the shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogState {
    pub pets: Vec<Pet>,
    pub loading: bool,
}

/// Notices emitted after each operation settles.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    Loaded { count: usize },
    LoadFailed { message: String },
    Created(PetId),
    Updated(PetId),
    Removed(PetId),
    RemoveFailed { id: PetId, message: String },
}

/// Outcome of a remove request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The user declined; nothing was sent.
    Declined,
}

/// Yes/no question asked before a pet is removed.
pub trait Confirmation {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirmation for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// A fixed answer, for callers that asked the user up front.
impl Confirmation for bool {
    fn confirm(&self, _prompt: &str) -> bool {
        *self
    }
}

/// The question put to the user before `pet` is removed.
pub fn removal_prompt(pet: &Pet) -> String {
    format!("Are you sure you want to adopt {}?", pet.name)
}

/// A write the server confirmed, as applied to the local list.
#[derive(Debug, Clone)]
enum AppliedWrite {
    Created(Pet),
    Updated(Pet),
    Removed(PetId),
}

impl AppliedWrite {
    fn apply(&self, pets: &mut Vec<Pet>) {
        match self {
            // A racing load may already have brought the new pet in.
            AppliedWrite::Created(created) => {
                match pets.iter_mut().find(|p| p.id == created.id) {
                    Some(existing) => *existing = created.clone(),
                    None => pets.push(created.clone()),
                }
            }
            // Removed meanwhile: nothing to replace.
            AppliedWrite::Updated(updated) => {
                if let Some(existing) = pets.iter_mut().find(|p| p.id == updated.id) {
                    *existing = updated.clone();
                }
            }
            AppliedWrite::Removed(id) => pets.retain(|p| &p.id != id),
        }
    }
}

/// Canonical in-memory collection kept in step with the backend.
pub struct Catalog<T> {
    store: RemoteStore<T>,
    state: watch::Sender<CatalogState>,
    latest_load: AtomicU64,
    replay: Mutex<Vec<AppliedWrite>>,
    event_tx: mpsc::UnboundedSender<CatalogEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<CatalogEvent>>,
}

impl<T: Transport> Catalog<T> {
    pub fn new(store: RemoteStore<T>) -> Self {
        let (state, _) = watch::channel(CatalogState::default());
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            store,
            state,
            latest_load: AtomicU64::new(0),
            replay: Mutex::new(Vec::new()),
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> CatalogState {
        self.state.borrow().clone()
    }

    pub fn pets(&self) -> Vec<Pet> {
        self.state.borrow().pets.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn len(&self) -> usize {
        self.state.borrow().pets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().pets.is_empty()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    /// Take the event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<CatalogEvent>> {
        self.event_rx.take()
    }

    /// Replace the collection with the server's list.
    ///
    /// Failures are logged and reported as `CatalogEvent::LoadFailed`, never
    /// returned. A response overtaken by a newer load is discarded. Writes
    /// confirmed while the request was in flight are re-applied on top of the
    /// response.
    pub async fn load(&self) {
        let mut ticket = 0;
        self.state.send_modify(|state| {
            ticket = self.latest_load.fetch_add(1, Ordering::SeqCst) + 1;
            self.replay_log().clear();
            state.loading = true;
        });

        let result = self.store.list().await;

        let mut replayed = None;
        self.state.send_if_modified(|state| {
            if self.latest_load.load(Ordering::SeqCst) != ticket {
                return false;
            }
            state.pets = match &result {
                Ok(pets) => pets.clone(),
                Err(_) => Vec::new(),
            };
            let writes = std::mem::take(&mut *self.replay_log());
            for write in &writes {
                write.apply(&mut state.pets);
            }
            state.loading = false;
            replayed = Some(writes.len());
            true
        });

        let Some(replayed) = replayed else {
            match result {
                Ok(_) => debug!("discarding stale pet list"),
                Err(err) => debug!(error = %err, "discarding stale load failure"),
            }
            return;
        };
        if replayed > 0 {
            debug!(replayed, "re-applied writes confirmed during load");
        }

        match result {
            Ok(pets) => {
                info!(count = pets.len(), "loaded pets");
                self.emit(CatalogEvent::Loaded { count: pets.len() });
            }
            Err(err) => {
                warn!(error = %err, "failed to load pets");
                self.emit(CatalogEvent::LoadFailed {
                    message: err.message(),
                });
            }
        }
    }

    /// Send a draft to the server and append the created pet.
    pub async fn create(&self, pet: NewPet) -> Result<Pet, RequestError> {
        let created = self.store.create(&pet).await?;
        self.record(AppliedWrite::Created(created.clone()));
        debug!(id = %created.id, "created pet");
        self.emit(CatalogEvent::Created(created.id.clone()));
        Ok(created)
    }

    /// Send an edited pet to the server and replace the entry in place.
    pub async fn update(&self, pet: &Pet) -> Result<Pet, RequestError> {
        let updated = self.store.update(pet).await?;
        self.record(AppliedWrite::Updated(updated.clone()));
        debug!(id = %updated.id, "updated pet");
        self.emit(CatalogEvent::Updated(updated.id.clone()));
        Ok(updated)
    }

    /// Ask for confirmation, then delete the pet on the server and locally.
    ///
    /// A failed delete leaves the pet in place, logs a warning, and emits
    /// `CatalogEvent::RemoveFailed` before returning the error.
    pub async fn remove<C>(&self, pet: &Pet, confirmation: &C) -> Result<RemoveOutcome, RequestError>
    where
        C: Confirmation + ?Sized,
    {
        if !confirmation.confirm(&removal_prompt(pet)) {
            debug!(id = %pet.id, "removal declined");
            return Ok(RemoveOutcome::Declined);
        }

        if let Err(err) = self.store.delete(&pet.id).await {
            warn!(id = %pet.id, error = %err, "failed to remove pet");
            self.emit(CatalogEvent::RemoveFailed {
                id: pet.id.clone(),
                message: err.message(),
            });
            return Err(err);
        }

        self.record(AppliedWrite::Removed(pet.id.clone()));
        debug!(id = %pet.id, "removed pet");
        self.emit(CatalogEvent::Removed(pet.id.clone()));
        Ok(RemoveOutcome::Removed)
    }

    /// Apply a confirmed write, keeping it for replay while a load is pending.
    fn record(&self, write: AppliedWrite) {
        self.state.send_modify(|state| {
            write.apply(&mut state.pets);
            if state.loading {
                self.replay_log().push(write.clone());
            }
        });
    }

    fn replay_log(&self) -> std::sync::MutexGuard<'_, Vec<AppliedWrite>> {
        self.replay.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: CatalogEvent) {
        // Nobody listening is fine.
        let _ = self.event_tx.send(event);
    }
}
