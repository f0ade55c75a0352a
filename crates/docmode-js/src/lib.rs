//! docmode JS - Script builtins for a docmode realm
//!
//! The objects a window exposes on top of the DOM proper.
//!
//! Features:
//! - Map, Set and WeakMap with SameValue keys and live iteration
//! - sessionStorage and localStorage areas with quota and persistence
//! - Location over a parsed URL
//! - Console routed to tracing
//! - Structured clone for cross-window messages

mod clone;
mod collections;
mod console;
mod error;
mod location;
mod storage;

pub use clone::{structured_clone, CloneData};
pub use collections::{Cursor, MapObject, SetObject, WeakMapObject};
pub use console::{create_console_object, Console, ConsoleLevel};
pub use error::StorageError;
pub use location::{create_location_object, Location, LocationHandle};
pub use storage::{
    create_storage_object, StorageArea, StorageChange, StorageCursor, StorageHandle, StorageKind,
    DEFAULT_QUOTA,
};

use docmode_dom::{DomResult, Realm, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Register every builtin's natives with `realm`
pub fn install(realm: &mut Realm) {
    collections::install(realm);
    storage::install(realm);
    location::install(realm);
    console::install(realm);
    tracing::trace!(natives = realm.natives().len(), "script builtins installed");
}

/// Host objects a window is wired to
#[derive(Debug, Default, Clone)]
pub struct WindowBindings {
    pub session_storage: Option<StorageHandle>,
    pub local_storage: Option<StorageHandle>,
    pub location: Option<Rc<RefCell<Location>>>,
}

/// Create the window's storage, location and console objects and hang
/// them off the global. Console only exists from mode 10.
pub fn bind_window(realm: &mut Realm, bindings: WindowBindings) -> DomResult<()> {
    let window = realm.window();

    if let Some(handle) = bindings.session_storage {
        let id = create_storage_object(realm, handle)?;
        realm.obj_mut(window).fields.insert("sessionStorage", Value::Object(id));
    }
    if let Some(handle) = bindings.local_storage {
        let id = create_storage_object(realm, handle)?;
        realm.obj_mut(window).fields.insert("localStorage", Value::Object(id));
    }
    if let Some(location) = bindings.location {
        let id = create_location_object(realm, location)?;
        realm.obj_mut(window).fields.insert("location", Value::Object(id));
    }
    if realm.graph().by_name("Console").is_some() {
        let id = create_console_object(realm)?;
        realm.obj_mut(window).fields.insert("console", Value::Object(id));
    }
    Ok(())
}
