//! Browsing Context
//!
//! One window: its realm, location, storage views, network and lifecycle.

use crate::error::EngineResult;
use crate::event_loop::{install_timers, ContextId, EventLoop};
use crate::messaging;
use docmode_dom::{DocumentMode, DomResult, Feature, ReadyState, Realm, Value};
use docmode_js::{Location, StorageArea, StorageHandle, WindowBindings};
use docmode_net::Network;
use std::cell::RefCell;
use std::rc::Rc;

/// Where a context is in its document's life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Created,
    Loaded,
    Unloaded,
}

/// Everything a new context is wired to
#[derive(Debug)]
pub struct ContextInit {
    pub id: ContextId,
    pub parent: Option<ContextId>,
    pub mode: DocumentMode,
    pub location: Location,
    pub session_area: Rc<RefCell<StorageArea>>,
    pub local_area: Rc<RefCell<StorageArea>>,
    pub network: Network,
    pub user_agent: Option<String>,
}

#[derive(Debug)]
pub struct BrowsingContext {
    id: ContextId,
    parent: Option<ContextId>,
    frames: Vec<ContextId>,
    realm: Realm,
    location: Rc<RefCell<Location>>,
    session_storage: StorageHandle,
    local_storage: StorageHandle,
    network: Network,
    state: LoadState,
}

/// Log a failure raised by a page's handler; it never reaches the caller
fn report(what: &str, result: DomResult<bool>) {
    if let Err(err) = result {
        tracing::warn!(event = what, error = %err, "event handler failed");
    }
}

impl BrowsingContext {
    pub fn new(init: ContextInit, event_loop: Rc<RefCell<EventLoop>>) -> EngineResult<Self> {
        let ContextInit {
            id,
            parent,
            mode,
            location,
            session_area,
            local_area,
            network,
            user_agent,
        } = init;

        let mut realm = Realm::new(mode);
        let location = Rc::new(RefCell::new(location));
        let session_storage = StorageHandle::new(session_area);
        let local_storage = StorageHandle::new(local_area);

        docmode_js::install(&mut realm);
        docmode_net::install(&mut realm, &network);
        install_timers(&mut realm, id, event_loop.clone());
        messaging::install(&mut realm, id, location.clone(), event_loop);
        if let Some(ua) = user_agent {
            realm
                .natives_mut()
                .getter("Navigator", "userAgent", move |_, _, _| Ok(Value::String(ua.clone())));
        }
        docmode_js::bind_window(
            &mut realm,
            WindowBindings {
                session_storage: Some(session_storage.clone()),
                local_storage: Some(local_storage.clone()),
                location: Some(location.clone()),
            },
        )?;
        let window = realm.window();
        let document = realm.document();
        if let Some(loc) = realm.obj(window).fields.get("location").cloned() {
            realm.obj_mut(document).fields.insert("location", loc);
        }

        tracing::info!(context = %id, mode = mode.version(), url = %location.borrow().href(), "browsing context created");
        Ok(Self {
            id,
            parent,
            frames: Vec::new(),
            realm,
            location,
            session_storage,
            local_storage,
            network,
            state: LoadState::Created,
        })
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn parent(&self) -> Option<ContextId> {
        self.parent
    }

    pub fn frames(&self) -> &[ContextId] {
        &self.frames
    }

    pub(crate) fn add_frame(&mut self, frame: ContextId) {
        self.frames.push(frame);
    }

    pub fn mode(&self) -> DocumentMode {
        self.realm.mode()
    }

    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    pub fn realm_mut(&mut self) -> &mut Realm {
        &mut self.realm
    }

    pub fn window(&self) -> Value {
        Value::Object(self.realm.window())
    }

    pub fn document(&self) -> Value {
        Value::Object(self.realm.document())
    }

    pub fn location(&self) -> &Rc<RefCell<Location>> {
        &self.location
    }

    pub fn href(&self) -> String {
        self.location.borrow().href()
    }

    pub fn session_storage(&self) -> &StorageHandle {
        &self.session_storage
    }

    pub fn local_storage(&self) -> &StorageHandle {
        &self.local_storage
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != LoadState::Unloaded
    }

    /// Event handler currently set on the window, if any
    pub fn window_handler(&mut self, name: &'static str) -> DomResult<Value> {
        let window = self.realm.window();
        self.realm.handler_value(window, name)
    }

    fn set_ready_state(&mut self, state: ReadyState) {
        self.realm.set_ready_state(state);
        let document = self.realm.document();
        tracing::trace!(context = %self.id, state = state.as_str(), "ready state");
        let result = self.realm.fire_event(document, "Event", "readystatechange", false, Vec::new());
        report("readystatechange", result);
    }

    /// Run the document through loading: timing marks in order, ready
    /// states up to `complete`, then `load` and (11+) `pageshow`.
    pub fn load(&mut self, navigation_start: f64) -> DomResult<()> {
        if self.state != LoadState::Created {
            return Ok(());
        }
        let realm = &mut self.realm;
        realm.advance_clock(navigation_start);
        realm.stamp_timing("navigationStart", navigation_start)?;
        for field in [
            "fetchStart",
            "domainLookupStart",
            "domainLookupEnd",
            "connectStart",
            "connectEnd",
            "requestStart",
            "responseStart",
            "responseEnd",
            "domLoading",
        ] {
            let now = realm.next_timestamp();
            realm.stamp_timing(field, now)?;
        }

        self.set_ready_state(ReadyState::Interactive);
        for field in ["domInteractive", "domContentLoadedEventStart", "domContentLoadedEventEnd", "domComplete"] {
            let now = self.realm.next_timestamp();
            self.realm.stamp_timing(field, now)?;
        }

        self.set_ready_state(ReadyState::Complete);
        let now = self.realm.next_timestamp();
        self.realm.stamp_timing("loadEventStart", now)?;
        let window = self.realm.window();
        report("load", self.realm.fire_event(window, "Event", "load", false, Vec::new()));
        let now = self.realm.next_timestamp();
        self.realm.stamp_timing("loadEventEnd", now)?;

        if self.mode().supports(Feature::PageTransition) {
            let persisted = vec![("persisted", Value::Bool(false))];
            report(
                "pageshow",
                self.realm.fire_event(window, "PageTransitionEvent", "pageshow", false, persisted),
            );
        }
        self.state = LoadState::Loaded;
        tracing::debug!(context = %self.id, "document loaded");
        Ok(())
    }

    /// Tear the document down: `pagehide` (11+) strictly before `unload`
    pub fn unload(&mut self) {
        if self.state == LoadState::Unloaded {
            return;
        }
        let window = self.realm.window();
        if self.mode().supports(Feature::PageTransition) {
            let persisted = vec![("persisted", Value::Bool(false))];
            report(
                "pagehide",
                self.realm.fire_event(window, "PageTransitionEvent", "pagehide", false, persisted),
            );
        }
        report("unload", self.realm.fire_event(window, "Event", "unload", false, Vec::new()));
        self.state = LoadState::Unloaded;
        tracing::debug!(context = %self.id, "document unloaded");
    }
}
