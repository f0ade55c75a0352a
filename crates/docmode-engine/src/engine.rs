//! Engine
//!
//! Owns the browsing contexts and drives the shared event loop.

use crate::config::EngineConfig;
use crate::context::{BrowsingContext, ContextInit};
use crate::error::{EngineError, EngineResult};
use crate::event_loop::{ContextId, EventLoop, Task, TaskKind};
use crate::messaging;
use crate::storage_hub::{notifications, StorageHub};
use docmode_dom::{DocumentMode, DomResult, Feature, Realm, Value};
use docmode_js::{Location, StorageChange, StorageHandle, StorageKind};
use docmode_net::{EchoTransport, Network, Transport};
use std::cell::RefCell;
use std::rc::Rc;

/// Upper bound on tasks a single `run_until_idle` executes
const MAX_TASKS_PER_RUN: usize = 10_000;

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    event_loop: Rc<RefCell<EventLoop>>,
    hub: StorageHub,
    transport: Rc<dyn Transport>,
    contexts: Vec<BrowsingContext>,
}

impl Engine {
    /// Engine whose XHRs are answered by an echo endpoint
    pub fn new(config: EngineConfig) -> Self {
        Self::with_transport(config, Rc::new(EchoTransport))
    }

    pub fn with_transport(config: EngineConfig, transport: Rc<dyn Transport>) -> Self {
        let hub = StorageHub::new(config.local_storage_path.clone());
        Self {
            config,
            event_loop: Rc::new(RefCell::new(EventLoop::new())),
            hub,
            transport,
            contexts: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn event_loop(&self) -> &Rc<RefCell<EventLoop>> {
        &self.event_loop
    }

    /// Open the configured start page
    pub fn open_default(&mut self) -> EngineResult<ContextId> {
        let url = self.config.url.clone();
        self.open(&url)
    }

    /// New top-level context at `url`, in the configured mode
    pub fn open(&mut self, url: &str) -> EngineResult<ContextId> {
        let mode = self.config.mode();
        self.create_context(None, mode, url)
    }

    /// New iframe inside `parent`. Frames of legacy documents fall back to
    /// quirks; newer documents pass their own mode down.
    pub fn create_iframe(&mut self, parent: ContextId, url: &str) -> EngineResult<ContextId> {
        let parent_ctx = self.context(parent)?;
        let mode = DocumentMode::for_child_frame(parent_ctx.mode());
        let base = parent_ctx.location().borrow().url().clone();
        let url = base.join(url)?;
        let id = self.create_context(Some(parent), mode, url.as_str())?;
        self.context_mut(parent)?.add_frame(id);
        Ok(id)
    }

    fn create_context(&mut self, parent: Option<ContextId>, mode: DocumentMode, url: &str) -> EngineResult<ContextId> {
        let id = ContextId(self.contexts.len());
        let location = Location::parse(url)?;
        let top = match parent {
            Some(parent) => self.top(parent)?,
            None => id,
        };
        let session_area = self.hub.session_area(top, &location);
        let local_area = self.hub.local_area(&location)?;
        let mut network = Network::new(self.transport.clone());
        if let Some(timeout) = self.config.xhr_timeout_ms {
            network = network.with_default_timeout(timeout);
        }
        let init = ContextInit {
            id,
            parent,
            mode,
            location,
            session_area,
            local_area,
            network,
            user_agent: self.config.user_agent.clone(),
        };
        let context = BrowsingContext::new(init, self.event_loop.clone())?;
        self.contexts.push(context);
        Ok(id)
    }

    fn top(&self, mut id: ContextId) -> EngineResult<ContextId> {
        while let Some(parent) = self.context(id)?.parent() {
            id = parent;
        }
        Ok(id)
    }

    pub fn context(&self, id: ContextId) -> EngineResult<&BrowsingContext> {
        self.contexts.get(id.0).ok_or(EngineError::NoContext(id))
    }

    pub fn context_mut(&mut self, id: ContextId) -> EngineResult<&mut BrowsingContext> {
        self.contexts.get_mut(id.0).ok_or(EngineError::NoContext(id))
    }

    pub fn realm_mut(&mut self, id: ContextId) -> EngineResult<&mut Realm> {
        Ok(self.context_mut(id)?.realm_mut())
    }

    pub fn contexts(&self) -> impl Iterator<Item = &BrowsingContext> {
        self.contexts.iter()
    }

    /// Load `id` and then its frames
    pub fn load(&mut self, id: ContextId) -> EngineResult<()> {
        let start = self.config.navigation_start_ms + self.event_loop.borrow().current_time() as f64;
        self.context_mut(id)?.load(start)?;
        let frames = self.context(id)?.frames().to_vec();
        for frame in frames {
            self.load(frame)?;
        }
        self.collect()?;
        Ok(())
    }

    /// Unload the frames of `id`, then `id` itself, and drop its pending
    /// work
    pub fn unload(&mut self, id: ContextId) -> EngineResult<()> {
        let frames = self.context(id)?.frames().to_vec();
        for frame in frames {
            self.unload(frame)?;
        }
        self.context_mut(id)?.unload();
        self.event_loop.borrow_mut().forget(id);
        if self.context(id)?.parent().is_none() {
            self.hub.close_session(id);
        }
        Ok(())
    }

    /// Turn what scripts left behind (storage changes, asynchronous sends)
    /// into tasks
    pub fn collect(&mut self) -> EngineResult<()> {
        let mut queued = Vec::new();
        for context in self.contexts.iter().filter(|c| c.is_active()) {
            for pending in context.network().take_pending() {
                queued.push((context.id(), TaskKind::Xhr(pending)));
            }
            for handle in [context.session_storage(), context.local_storage()] {
                for change in handle.take_changes() {
                    queued.extend(self.storage_tasks(context, handle, &change));
                }
            }
        }
        let mut event_loop = self.event_loop.borrow_mut();
        for (context, kind) in queued {
            event_loop.queue(context, kind);
        }
        Ok(())
    }

    fn storage_tasks(
        &self,
        mutator: &BrowsingContext,
        handle: &StorageHandle,
        change: &StorageChange,
    ) -> Vec<(ContextId, TaskKind)> {
        let sharers: Vec<ContextId> = self
            .contexts
            .iter()
            .filter(|c| c.is_active())
            .filter(|c| {
                let other = match change.kind {
                    StorageKind::Session => c.session_storage(),
                    StorageKind::Local => c.local_storage(),
                };
                Rc::ptr_eq(other.area(), handle.area())
            })
            .map(BrowsingContext::id)
            .collect();
        let url = mutator.location().borrow().href_without_fragment();
        tracing::debug!(
            context = %mutator.id(),
            key = change.key.as_deref().unwrap_or(""),
            sharers = sharers.len(),
            "storage mutated"
        );
        notifications(change, mutator.id(), &url, &sharers)
    }

    /// Run tasks, and timers as they come due, until nothing is left.
    /// Returns the number of tasks run.
    pub fn run_until_idle(&mut self) -> EngineResult<usize> {
        let mut ran = 0;
        self.collect()?;
        while ran < MAX_TASKS_PER_RUN {
            let next = self.event_loop.borrow_mut().next_task();
            let task = match next {
                Some(task) => task,
                None => {
                    if self.event_loop.borrow_mut().fire_next_timer() {
                        continue;
                    }
                    return Ok(ran);
                }
            };
            self.run_task(task)?;
            self.collect()?;
            ran += 1;
        }
        tracing::warn!(ran, "event loop still busy, giving up");
        Ok(ran)
    }

    fn run_task(&mut self, task: Task) -> EngineResult<()> {
        let source = task.source();
        let context = self.context_mut(task.context)?;
        if !context.is_active() {
            tracing::trace!(context = %task.context, source = source.as_str(), "task for unloaded context dropped");
            return Ok(());
        }
        tracing::trace!(context = %task.context, source = source.as_str(), "running task");
        let result = match task.kind {
            TaskKind::Timer { callback, .. } => {
                let window = context.window();
                context.realm_mut().call(&callback, window, &[]).map(|_| ())
            }
            TaskKind::Message { data, origin, source } => {
                let source = if source == task.context { context.window() } else { Value::Null };
                messaging::deliver(context.realm_mut(), &data, &origin, source)
            }
            TaskKind::Storage { change, url } => fire_storage(context, &change, &url),
            TaskKind::StorageCommit { url } => fire_storage_commit(context, &url),
            TaskKind::Xhr(pending) => {
                let network = context.network().clone();
                network.complete(context.realm_mut(), pending)
            }
        };
        if let Err(err) = result {
            tracing::warn!(context = %task.context, source = source.as_str(), error = %err, "task failed");
        }
        Ok(())
    }
}

fn storage_fields(key: &str, old_value: &str, new_value: &str, url: &str) -> Vec<(&'static str, Value)> {
    vec![
        ("key", Value::string(key)),
        ("oldValue", Value::string(old_value)),
        ("newValue", Value::string(new_value)),
        ("url", Value::string(url)),
    ]
}

/// `storage` on the window from mode 9, on the document before
fn fire_storage(context: &mut BrowsingContext, change: &StorageChange, url: &str) -> DomResult<()> {
    let realm = context.realm_mut();
    if !realm.mode().supports(Feature::StandardEvents) {
        let document = realm.document();
        realm.fire_event(document, "Event", "storage", false, Vec::new())?;
        return Ok(());
    }
    let window = realm.window();
    let mut fields = storage_fields(
        change.key.as_deref().unwrap_or(""),
        change.old_value.as_deref().unwrap_or(""),
        change.new_value.as_deref().unwrap_or(""),
        url,
    );
    let area = match change.kind {
        StorageKind::Session => "sessionStorage",
        StorageKind::Local => "localStorage",
    };
    if let Some(storage) = realm.obj(window).fields.get(area).cloned() {
        fields.push(("storageArea", storage));
    }
    realm.fire_event(window, "StorageEvent", "storage", false, fields)?;
    Ok(())
}

fn fire_storage_commit(context: &mut BrowsingContext, url: &str) -> DomResult<()> {
    let realm = context.realm_mut();
    let document = realm.document();
    realm.fire_event(document, "StorageEvent", "storagecommit", false, storage_fields("", "", "", url))?;
    Ok(())
}
