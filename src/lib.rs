//! # Landmark Core
//!
//! The data core of a landmark list/detail application, built to sit behind a
//! native UI layer (SwiftUI, Flutter or any host that can call a C ABI).
//!
//! The crate owns the landmark collection and the favorites filter, and tells
//! the UI when to re-render. Rendering, navigation, images and maps stay on the
//! host side; the core only hands out plain data (ids, coordinates, image
//! names).
//!
//! ## Features
//!
//! - **Bundled data set**: landmarks are embedded at compile time and loaded once
//! - **Explicit store handle**: no global state, the host owns the store pointer
//! - **Observer notification**: every mutation synchronously notifies subscribers
//! - **Derived views**: visible, featured and per-category lists computed on demand
//!
//! ## Quick Start
//!
//! ```rust
//! use landmark_core::landmark_store::LandmarkStore;
//!
//! let mut store = LandmarkStore::bundled();
//! let id = store.landmarks()[1].id;
//!
//! store.subscribe(|event| println!("store changed: {event:?}"));
//! store.set_favorite(id, true);
//! store.set_show_favorites_only(true);
//!
//! assert!(store.visible_items().any(|landmark| landmark.id == id));
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_store`] / [`create_bundled_store`] - Initialize a store instance
//! - [`get_all`] / [`get_by_id`] - Read landmarks
//! - [`get_visible`] / [`get_features`] / [`get_categories`] - Derived views
//! - [`set_favorite`] / [`toggle_favorite`] - Mutate a favorite flag
//! - [`set_show_favorites_only`] - Mutate the filter
//! - [`subscribe`] / [`unsubscribe`] - Register a C callback for changes
//! - [`free_response`] - Release a string returned by this library
//! - [`close_store`] - Drop the store
//!
//! ## Callbacks and Re-entrancy
//!
//! A [`StoreCallback`] may call any function of this library on the same
//! store, including [`subscribe`], [`unsubscribe`] and the mutators. Callbacks
//! always run after the store has finished the mutation that triggered them:
//!
//! - an observer unsubscribed by an earlier callback is not called again, not
//!   even for the event in flight;
//! - an observer subscribed from a callback receives the next event;
//! - a mutation made from a callback is applied immediately, and its event is
//!   delivered to every observer once the current event has been delivered;
//! - [`close_store`] called from a callback is refused with `BadRequest`.

pub mod app_response;
pub mod landmark;
pub mod landmark_store;
pub mod store_handle;

use crate::app_response::AppResponse;
use crate::landmark::{Landmark, LandmarkId};
use crate::landmark_store::LandmarkStore;
use crate::store_handle::StoreHandle;

use log::{info, warn};
use serde::Serialize;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;

/// C callback invoked after every store mutation.
///
/// `event_json` is a JSON-encoded [`landmark_store::StoreEvent`], valid only
/// for the duration of the call. `user_data` is the pointer passed to
/// [`subscribe`].
///
/// The callback may call back into this library with the same store pointer.
/// See the crate-level "Callbacks and Re-entrancy" rules.
pub type StoreCallback = extern "C" fn(event_json: *const c_char, user_data: *mut c_void);

/// A featured landmark as sent to the host, with the name of its wide image.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeaturedLandmark<'a> {
    #[serde(flatten)]
    landmark: &'a Landmark,
    feature_image_name: Option<String>,
}

/// Creates a store from a JSON array of landmarks.
///
/// # Parameters
///
/// * `json_ptr` - Null-terminated C string containing a JSON array of landmarks
///
/// # Returns
///
/// A pointer to the new [`StoreHandle`], or a null pointer on failure. Release
/// it with [`close_store`].
///
/// # Safety
///
/// `json_ptr` must be null or point to a valid null-terminated string.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use landmark_core::create_store;
///
/// let json = CString::new("[]").unwrap();
/// let store = create_store(json.as_ptr());
/// assert!(!store.is_null());
/// ```
///
/// # Errors
///
/// Returns null pointer if:
/// - Input pointer is null
/// - Input string contains invalid UTF-8
/// - The document is malformed, has an unknown category or duplicate ids
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_store(json_ptr: *const c_char) -> *mut StoreHandle {
    if json_ptr.is_null() {
        warn!("Null JSON pointer passed to create_store");
        return std::ptr::null_mut();
    }

    let json = match unsafe { CStr::from_ptr(json_ptr).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in create_store JSON: {e}");
            return std::ptr::null_mut();
        }
    };

    match LandmarkStore::from_json(json) {
        Ok(store) => {
            info!("✅ Store created with {} landmarks", store.len());
            Box::into_raw(Box::new(StoreHandle::new(store)))
        }
        Err(e) => {
            warn!("❌ Failed to create store: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Creates a store from the landmark data embedded in the library.
///
/// # Returns
///
/// A pointer to the new [`StoreHandle`]; never null. Release it with
/// [`close_store`].
#[no_mangle]
pub extern "C" fn create_bundled_store() -> *mut StoreHandle {
    let store = LandmarkStore::bundled();
    info!("✅ Bundled store created with {} landmarks", store.len());
    Box::into_raw(Box::new(StoreHandle::new(store)))
}

/// Retrieves every landmark in display order.
///
/// # Parameters
///
/// * `state` - Pointer to the store handle
///
/// # Returns
///
/// An `Ok` response whose payload is a JSON array of landmarks, or
/// `BadRequest` for a null pointer. Release it with [`free_response`].
///
/// # Safety
///
/// `state` must be null or a live pointer returned by [`create_store`] or
/// [`create_bundled_store`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_all(state: *mut StoreHandle) -> *const c_char {
    let handle = match handle_ref(state, "get_all") {
        Ok(h) => h,
        Err(err) => return err,
    };

    match handle.read(|store| serde_json::to_string(store.landmarks())) {
        Ok(json) => json_payload_response(json),
        Err(e) => response_to_c_string(&e),
    }
}

/// Retrieves one landmark by id.
///
/// # Parameters
///
/// * `state` - Pointer to the store handle
/// * `id` - Landmark id
///
/// # Returns
///
/// An `Ok` response whose payload is the landmark as JSON, `NotFound` if no
/// landmark has this id, or `BadRequest` for a null pointer.
///
/// # Safety
///
/// `state` must be null or a live store pointer.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_by_id(state: *mut StoreHandle, id: LandmarkId) -> *const c_char {
    let handle = match handle_ref(state, "get_by_id") {
        Ok(h) => h,
        Err(err) => return err,
    };

    let found = handle.read(|store| store.landmark(id).map(serde_json::to_string));
    match found {
        Ok(Some(json)) => json_payload_response(json),
        Ok(None) => {
            let error = AppResponse::NotFound(format!("No landmark found with id: {id}"));
            response_to_c_string(&error)
        }
        Err(e) => response_to_c_string(&e),
    }
}

/// Retrieves the landmarks visible under the current favorites filter.
///
/// # Parameters
///
/// * `state` - Pointer to the store handle
///
/// # Returns
///
/// An `Ok` response whose payload is a JSON array in display order, or
/// `BadRequest` for a null pointer.
///
/// # Safety
///
/// `state` must be null or a live store pointer.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_visible(state: *mut StoreHandle) -> *const c_char {
    let handle = match handle_ref(state, "get_visible") {
        Ok(h) => h,
        Err(err) => return err,
    };

    let visible = handle.read(|store| {
        let visible: Vec<_> = store.visible_items().collect();
        serde_json::to_string(&visible)
    });
    match visible {
        Ok(json) => json_payload_response(json),
        Err(e) => response_to_c_string(&e),
    }
}

/// Retrieves the featured landmarks.
///
/// Each entry is a landmark object with an extra `featureImageName` field
/// naming the wide image for the featured row.
///
/// # Parameters
///
/// * `state` - Pointer to the store handle
///
/// # Returns
///
/// An `Ok` response whose payload is a JSON array, or `BadRequest` for a null
/// pointer.
///
/// # Safety
///
/// `state` must be null or a live store pointer.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_features(state: *mut StoreHandle) -> *const c_char {
    let handle = match handle_ref(state, "get_features") {
        Ok(h) => h,
        Err(err) => return err,
    };

    let features = handle.read(|store| {
        let features: Vec<FeaturedLandmark> = store
            .features()
            .into_iter()
            .map(|landmark| FeaturedLandmark {
                landmark,
                feature_image_name: landmark.feature_image_name(),
            })
            .collect();
        serde_json::to_string(&features)
    });
    match features {
        Ok(json) => json_payload_response(json),
        Err(e) => response_to_c_string(&e),
    }
}

/// Retrieves the landmarks grouped by category.
///
/// # Parameters
///
/// * `state` - Pointer to the store handle
///
/// # Returns
///
/// An `Ok` response whose payload is a JSON object keyed by category name
/// (`"Lakes"`, `"Rivers"`, `"Mountains"`), or `BadRequest` for a null pointer.
/// Categories without landmarks are omitted.
///
/// # Safety
///
/// `state` must be null or a live store pointer.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_categories(state: *mut StoreHandle) -> *const c_char {
    let handle = match handle_ref(state, "get_categories") {
        Ok(h) => h,
        Err(err) => return err,
    };

    match handle.read(|store| serde_json::to_string(&store.categories())) {
        Ok(json) => json_payload_response(json),
        Err(e) => response_to_c_string(&e),
    }
}

/// Sets the favorite flag of a landmark and notifies every callback.
///
/// An unknown id yields a `NotFound` response rather than the panic the Rust
/// API raises, since unwinding must not cross into the host.
///
/// # Parameters
///
/// * `state` - Pointer to the store handle
/// * `id` - Landmark id
/// * `value` - New favorite flag
///
/// # Returns
///
/// `Ok` on success, `NotFound` for an unknown id (nothing is notified), or
/// `BadRequest` for a null pointer.
///
/// # Safety
///
/// `state` must be null or a live store pointer. May be called from a
/// [`StoreCallback`]; the resulting event is delivered after the current one.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn set_favorite(state: *mut StoreHandle, id: LandmarkId, value: bool) -> *const c_char {
    let handle = match handle_ref(state, "set_favorite") {
        Ok(h) => h,
        Err(err) => return err,
    };

    match handle.mutate(|store| store.try_set_favorite(id, value)) {
        Ok(Ok(())) => response_to_c_string(&AppResponse::success(format!("Landmark {id} favorite set to {value}"))),
        Ok(Err(e)) | Err(e) => {
            warn!("set_favorite failed: {e}");
            response_to_c_string(&e)
        }
    }
}

/// Flips the favorite flag of a landmark and notifies every callback.
///
/// # Parameters
///
/// * `state` - Pointer to the store handle
/// * `id` - Landmark id
///
/// # Returns
///
/// An `Ok` response whose payload is the new value (`"true"` or `"false"`),
/// `NotFound` for an unknown id, or `BadRequest` for a null pointer.
///
/// # Safety
///
/// `state` must be null or a live store pointer. May be called from a
/// [`StoreCallback`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn toggle_favorite(state: *mut StoreHandle, id: LandmarkId) -> *const c_char {
    let handle = match handle_ref(state, "toggle_favorite") {
        Ok(h) => h,
        Err(err) => return err,
    };

    let toggled = handle.mutate(|store| {
        let value = match store.landmark(id) {
            Some(landmark) => !landmark.is_favorite,
            None => return Err(AppResponse::NotFound(format!("No landmark found with id: {id}"))),
        };
        store.try_set_favorite(id, value).map(|()| value)
    });

    match toggled {
        Ok(Ok(value)) => response_to_c_string(&AppResponse::success(value.to_string())),
        Ok(Err(e)) | Err(e) => response_to_c_string(&e),
    }
}

/// Sets the favorites-only filter and notifies every callback.
///
/// # Parameters
///
/// * `state` - Pointer to the store handle
/// * `value` - `true` to show only favorites
///
/// # Returns
///
/// `Ok` on success, or `BadRequest` for a null pointer.
///
/// # Safety
///
/// `state` must be null or a live store pointer. May be called from a
/// [`StoreCallback`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn set_show_favorites_only(state: *mut StoreHandle, value: bool) -> *const c_char {
    let handle = match handle_ref(state, "set_show_favorites_only") {
        Ok(h) => h,
        Err(err) => return err,
    };

    match handle.mutate(|store| store.set_show_favorites_only(value)) {
        Ok(()) => response_to_c_string(&AppResponse::success(format!("Show favorites only set to {value}"))),
        Err(e) => response_to_c_string(&e),
    }
}

/// Registers a C callback invoked after every mutation.
///
/// # Parameters
///
/// * `state` - Pointer to the store handle
/// * `callback` - Function receiving the JSON event and `user_data`
/// * `user_data` - Opaque pointer handed back to `callback` untouched
///
/// # Returns
///
/// The callback id to pass to [`unsubscribe`], or `0` if `state` is null.
///
/// # Safety
///
/// The host keeps `user_data` valid until it unsubscribes or closes the store.
/// May be called from a [`StoreCallback`]; the new callback receives events
/// from the next one on.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn subscribe(state: *mut StoreHandle, callback: StoreCallback, user_data: *mut c_void) -> u64 {
    match unsafe { state.as_ref() } {
        Some(handle) => handle.subscribe(callback, user_data),
        None => {
            warn!("Null state pointer passed to subscribe");
            0
        }
    }
}

/// Removes a C callback registered with [`subscribe`].
///
/// # Parameters
///
/// * `state` - Pointer to the store handle
/// * `observer_id` - Id returned by [`subscribe`]
///
/// # Returns
///
/// `Ok` if the callback was removed, `NotFound` if the id is not registered,
/// or `BadRequest` for a null pointer.
///
/// # Safety
///
/// `state` must be null or a live store pointer. May be called from a
/// [`StoreCallback`], including for the calling callback itself or a peer;
/// a removed callback is not called again, even for the event in flight.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn unsubscribe(state: *mut StoreHandle, observer_id: u64) -> *const c_char {
    let handle = match handle_ref(state, "unsubscribe") {
        Ok(h) => h,
        Err(err) => return err,
    };

    if handle.unsubscribe(observer_id) {
        response_to_c_string(&AppResponse::success(format!("Observer {observer_id} removed")))
    } else {
        let error = AppResponse::NotFound(format!("No observer registered with id: {observer_id}"));
        response_to_c_string(&error)
    }
}

/// Releases a string returned by any function of this library.
///
/// # Parameters
///
/// * `ptr` - String returned by this library; null is ignored
///
/// # Safety
///
/// Each returned string must be released exactly once, and never a string
/// passed to a [`StoreCallback`] (those are owned by the library).
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(ptr as *mut c_char) });
}

/// Drops the store and every registered callback.
///
/// # Parameters
///
/// * `state` - Pointer to the store handle
///
/// # Returns
///
/// `Ok` once the store is released, or `BadRequest` for a null pointer or
/// when called from a [`StoreCallback`] (the store is left open).
///
/// # Safety
///
/// After an `Ok` response `state` is dangling and must not be used again.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_store(state: *mut StoreHandle) -> *const c_char {
    let handle = match handle_ref(state, "close_store") {
        Ok(h) => h,
        Err(err) => return err,
    };

    if handle.is_dispatching() {
        warn!("close_store called from a store callback; refusing");
        let error = AppResponse::BadRequest("Cannot close the store from inside a store callback".to_string());
        return response_to_c_string(&error);
    }

    drop(unsafe { Box::from_raw(state) });
    info!("Store closed");
    response_to_c_string(&AppResponse::success("Store closed successfully"))
}

fn handle_ref<'a>(state: *mut StoreHandle, caller: &str) -> Result<&'a StoreHandle, *const c_char> {
    match unsafe { state.as_ref() } {
        Some(h) => Ok(h),
        None => {
            let error = AppResponse::BadRequest(format!("Null state pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

/// Wraps serialized JSON into the payload of an `Ok` response.
fn json_payload_response(json: Result<String, serde_json::Error>) -> *const c_char {
    match json {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Error serializing response: {e}"));
            response_to_c_string(&error)
        }
    }
}

/// Converts an [`AppResponse`] to a C string owned by the caller.
///
/// Returns null if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}
