//! The store as seen by FFI callers.
//!
//! A host holds a raw pointer to a [`StoreHandle`] and may call back into any
//! FFI function from inside one of its own callbacks, through that pointer.
//! The handle therefore never lends out `&mut` access across a host call:
//!
//! - the store sits in a [`RefCell`] and is borrowed only for the duration of
//!   a single read or mutation;
//! - store events are queued by one bridge observer while the store is
//!   borrowed, and host callbacks run from that queue after the borrow ends;
//! - the callback list is copied before a dispatch round, so subscribing or
//!   unsubscribing from a callback never touches the list being walked.
//!
//! Events produced by a mutation made from inside a callback are appended to
//! the queue and delivered by the dispatch round already running, after the
//! current event has reached every callback.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ffi::{c_void, CString};
use std::rc::Rc;

use log::{debug, warn};

use crate::app_response::AppResponse;
use crate::landmark_store::{LandmarkStore, StoreEvent};
use crate::StoreCallback;

#[derive(Clone, Copy)]
struct HostCallback {
    id: u64,
    callback: StoreCallback,
    user_data: *mut c_void,
}

pub struct StoreHandle {
    store: RefCell<LandmarkStore>,
    events: Rc<RefCell<VecDeque<StoreEvent>>>,
    callbacks: RefCell<Vec<HostCallback>>,
    next_callback_id: Cell<u64>,
    dispatching: Cell<bool>,
}

impl StoreHandle {
    pub fn new(mut store: LandmarkStore) -> Self {
        let events = Rc::new(RefCell::new(VecDeque::new()));
        let queue = Rc::clone(&events);
        store.subscribe(move |event| queue.borrow_mut().push_back(event.clone()));

        Self {
            store: RefCell::new(store),
            events,
            callbacks: RefCell::new(Vec::new()),
            next_callback_id: Cell::new(1),
            dispatching: Cell::new(false),
        }
    }

    /// Runs `f` against the store.
    ///
    /// # Errors
    ///
    /// [`AppResponse::BadRequest`] if the store is already mutably borrowed,
    /// which only happens if a Rust observer re-enters the handle.
    pub fn read<R>(&self, f: impl FnOnce(&LandmarkStore) -> R) -> Result<R, AppResponse> {
        let store = self
            .store
            .try_borrow()
            .map_err(|_| AppResponse::BadRequest("Store is busy".to_string()))?;
        Ok(f(&store))
    }

    /// Runs `f` against the store mutably, then delivers the resulting events
    /// to the host callbacks.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut LandmarkStore) -> R) -> Result<R, AppResponse> {
        let result = {
            let mut store = self
                .store
                .try_borrow_mut()
                .map_err(|_| AppResponse::BadRequest("Store is busy".to_string()))?;
            f(&mut store)
        };
        self.dispatch();
        Ok(result)
    }

    /// Registers a host callback and returns its id (never `0`).
    pub fn subscribe(&self, callback: StoreCallback, user_data: *mut c_void) -> u64 {
        let id = self.next_callback_id.get();
        self.next_callback_id.set(id + 1);
        self.callbacks.borrow_mut().push(HostCallback {
            id,
            callback,
            user_data,
        });
        debug!("Host callback {id} subscribed");
        id
    }

    /// Removes a host callback. Returns `false` if `id` is not registered.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut callbacks = self.callbacks.borrow_mut();
        let before = callbacks.len();
        callbacks.retain(|registered| registered.id != id);
        let removed = callbacks.len() != before;
        if removed {
            debug!("Host callback {id} unsubscribed");
        } else {
            warn!("Unsubscribe for unknown host callback {id}");
        }
        removed
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// True while host callbacks are running.
    pub fn is_dispatching(&self) -> bool {
        self.dispatching.get()
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.callbacks.borrow().iter().any(|registered| registered.id == id)
    }

    fn dispatch(&self) {
        // A mutation made from inside a callback leaves its event queued for
        // the round already running.
        if self.dispatching.get() {
            return;
        }
        self.dispatching.set(true);

        loop {
            let next = self.events.borrow_mut().pop_front();
            let Some(event) = next else { break };

            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(e) => {
                    warn!("Error serializing store event: {e}");
                    continue;
                }
            };
            let json = match CString::new(json) {
                Ok(c_str) => c_str,
                Err(e) => {
                    warn!("Error creating CString for store event: {e}");
                    continue;
                }
            };

            let snapshot: Vec<HostCallback> = self.callbacks.borrow().clone();
            for registered in snapshot {
                // Skip callbacks removed by an earlier callback this round.
                if self.is_subscribed(registered.id) {
                    (registered.callback)(json.as_ptr(), registered.user_data);
                }
            }
        }

        self.dispatching.set(false);
    }
}
