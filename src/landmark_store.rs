//! The shared landmark store.
//!
//! [`LandmarkStore`] owns the landmark collection and the favorites filter
//! flag. It is the single source of truth for every view built on top of it:
//! views read derived data through [`LandmarkStore::visible_items`] and the
//! other derived views, and register an observer to learn when to re-render.
//!
//! Observers are invoked synchronously, once per mutation, in registration
//! order. They receive a [`StoreEvent`] rather than the store itself, and the
//! store is exclusively borrowed while they run, so safe Rust cannot reach it
//! from inside a callback. Host callbacks behind the FFI are dispatched by
//! [`crate::store_handle::StoreHandle`] after that borrow ends.

use std::collections::{BTreeMap, HashSet};

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::app_response::AppResponse;
use crate::landmark::{Category, Landmark, LandmarkId};

const BUNDLED_LANDMARKS: &str = include_str!("landmark_data.json");

/// Handle returned by [`LandmarkStore::subscribe`], used to unsubscribe.
///
/// Only the store issues ids, so an `ObserverId` always names an observer
/// that was registered on some store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// What changed in the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
    FavoriteChanged { id: LandmarkId, is_favorite: bool },
    FilterChanged { show_favorites_only: bool },
}

type Observer = Box<dyn FnMut(&StoreEvent)>;

pub struct LandmarkStore {
    items: Vec<Landmark>,
    show_favorites_only: bool,
    observers: Vec<(ObserverId, Observer)>,
    next_observer_id: u64,
}

impl std::fmt::Debug for LandmarkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LandmarkStore")
            .field("items", &self.items.len())
            .field("show_favorites_only", &self.show_favorites_only)
            .field("observer_count", &self.observers.len())
            .finish()
    }
}

impl LandmarkStore {
    /// Builds a store from already constructed records.
    ///
    /// # Errors
    ///
    /// Returns [`AppResponse::ValidationError`] if two records share an id.
    pub fn new(items: Vec<Landmark>) -> Result<Self, AppResponse> {
        let mut seen = HashSet::with_capacity(items.len());
        for landmark in &items {
            if !seen.insert(landmark.id) {
                warn!("Rejecting seed: duplicate landmark id {}", landmark.id);
                return Err(AppResponse::ValidationError(format!(
                    "Duplicate landmark id: {}",
                    landmark.id
                )));
            }
        }

        info!("Landmark store initialized with {} landmarks", items.len());

        Ok(Self {
            items,
            show_favorites_only: false,
            observers: Vec::new(),
            next_observer_id: 1,
        })
    }

    /// Builds a store from a JSON array of landmarks.
    ///
    /// # Errors
    ///
    /// - [`AppResponse::SerializationError`] for malformed JSON, missing
    ///   fields or an unknown category
    /// - [`AppResponse::ValidationError`] for duplicate ids
    pub fn from_json(json: &str) -> Result<Self, AppResponse> {
        let items: Vec<Landmark> = serde_json::from_str(json).map_err(|e| {
            warn!("Rejecting seed: invalid landmark JSON: {e}");
            AppResponse::from(e)
        })?;
        Self::new(items)
    }

    /// Builds a store from the data set embedded in the library.
    ///
    /// # Panics
    ///
    /// Panics if the embedded document does not load, which can only happen
    /// if a broken data file was compiled in.
    pub fn bundled() -> Self {
        match Self::from_json(BUNDLED_LANDMARKS) {
            Ok(store) => store,
            Err(e) => {
                error!("Bundled landmark data failed to load: {e}");
                panic!("bundled landmark data is invalid: {e}");
            }
        }
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.items
    }

    pub fn landmark(&self, id: LandmarkId) -> Option<&Landmark> {
        self.items.iter().find(|landmark| landmark.id == id)
    }

    /// Position of the landmark with `id` in display order.
    pub fn index_of(&self, id: LandmarkId) -> Option<usize> {
        self.items.iter().position(|landmark| landmark.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn show_favorites_only(&self) -> bool {
        self.show_favorites_only
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Sets the favorite flag of the landmark with `id` and notifies every
    /// observer.
    ///
    /// # Panics
    ///
    /// Panics if no landmark has this id. The data set is closed after load,
    /// so a miss means a caller holds an identity that never belonged to this
    /// store.
    pub fn set_favorite(&mut self, id: LandmarkId, value: bool) {
        if let Err(e) = self.try_set_favorite(id, value) {
            error!("set_favorite on unknown landmark id {id}: {e}");
            panic!("no landmark with id {id} in store");
        }
    }

    /// Like [`set_favorite`](Self::set_favorite), but reports a miss as
    /// [`AppResponse::NotFound`] instead of panicking. Nothing is notified on
    /// a miss.
    pub fn try_set_favorite(&mut self, id: LandmarkId, value: bool) -> Result<(), AppResponse> {
        let index = self
            .index_of(id)
            .ok_or_else(|| AppResponse::NotFound(format!("No landmark found with id: {id}")))?;

        self.items[index].is_favorite = value;
        debug!("Landmark {id} favorite set to {value}");

        self.notify(&StoreEvent::FavoriteChanged {
            id,
            is_favorite: value,
        });
        Ok(())
    }

    /// Flips the favorite flag of the landmark with `id` and returns the new
    /// value.
    ///
    /// # Panics
    ///
    /// Panics if no landmark has this id, as [`set_favorite`](Self::set_favorite) does.
    pub fn toggle_favorite(&mut self, id: LandmarkId) -> bool {
        let value = match self.landmark(id) {
            Some(landmark) => !landmark.is_favorite,
            None => {
                error!("toggle_favorite on unknown landmark id {id}");
                panic!("no landmark with id {id} in store");
            }
        };
        self.set_favorite(id, value);
        value
    }

    pub fn set_show_favorites_only(&mut self, value: bool) {
        self.show_favorites_only = value;
        debug!("Show favorites only set to {value}");

        self.notify(&StoreEvent::FilterChanged {
            show_favorites_only: value,
        });
    }

    /// Landmarks eligible for display under the current filter, in original
    /// order.
    ///
    /// The iterator borrows the store and is computed lazily; clone it to
    /// walk the same sequence again.
    pub fn visible_items(&self) -> impl Iterator<Item = &Landmark> + Clone + '_ {
        let favorites_only = self.show_favorites_only;
        self.items
            .iter()
            .filter(move |landmark| !favorites_only || landmark.is_favorite)
    }

    /// Landmarks marked as featured, in original order.
    pub fn features(&self) -> Vec<&Landmark> {
        self.items.iter().filter(|landmark| landmark.is_featured).collect()
    }

    /// Landmarks grouped by category. Each landmark appears in exactly one
    /// group, groups keep the original order, and empty categories are
    /// omitted.
    pub fn categories(&self) -> BTreeMap<Category, Vec<&Landmark>> {
        let mut groups: BTreeMap<Category, Vec<&Landmark>> = BTreeMap::new();
        for landmark in &self.items {
            groups.entry(landmark.category).or_default().push(landmark);
        }
        groups
    }

    pub fn favorite_count(&self) -> usize {
        self.items.iter().filter(|landmark| landmark.is_favorite).count()
    }

    /// Registers `observer` to be called after every mutation.
    pub fn subscribe(&mut self, observer: impl FnMut(&StoreEvent) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, Box::new(observer)));
        debug!("Observer {} subscribed ({} total)", id.0, self.observers.len());
        id
    }

    /// Removes a previously registered observer. Returns `false` if `id` is
    /// not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        let removed = self.observers.len() != before;
        if removed {
            debug!("Observer {} unsubscribed", id.0);
        } else {
            warn!("Unsubscribe for unknown observer {}", id.0);
        }
        removed
    }

    fn notify(&mut self, event: &StoreEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer(event);
        }
    }
}
