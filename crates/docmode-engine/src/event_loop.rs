//! Event Loop
//!
//! FIFO task queue shared by every browsing context, plus virtual-time timers.

use docmode_dom::{arg, DomError, ErrorKind, Realm, Value};
use docmode_js::{CloneData, StorageChange};
use docmode_net::PendingSend;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Index of a browsing context inside its engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub(crate) usize);

impl ContextId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a task came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskSource {
    Timer,
    Messaging,
    Storage,
    Networking,
}

impl TaskSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskSource::Timer => "timer",
            TaskSource::Messaging => "messaging",
            TaskSource::Storage => "storage",
            TaskSource::Networking => "networking",
        }
    }
}

#[derive(Debug, Clone)]
pub enum TaskKind {
    /// Timer callback, called with the window as `this`
    Timer { timer: u32, callback: Value },
    /// `message` event for the target window
    Message {
        data: CloneData,
        origin: String,
        source: ContextId,
    },
    /// `storage` event about a change made elsewhere
    Storage { change: StorageChange, url: String },
    /// `storagecommit` on the mutating document
    StorageCommit { url: String },
    /// Response for an asynchronous XMLHttpRequest
    Xhr(PendingSend),
}

#[derive(Debug, Clone)]
pub struct Task {
    pub context: ContextId,
    pub kind: TaskKind,
}

impl Task {
    pub fn source(&self) -> TaskSource {
        match self.kind {
            TaskKind::Timer { .. } => TaskSource::Timer,
            TaskKind::Message { .. } => TaskSource::Messaging,
            TaskKind::Storage { .. } | TaskKind::StorageCommit { .. } => TaskSource::Storage,
            TaskKind::Xhr(_) => TaskSource::Networking,
        }
    }
}

#[derive(Debug, Clone)]
struct Timer {
    id: u32,
    context: ContextId,
    callback: Value,
    due: u64,
    interval: Option<u64>,
}

/// Task queue plus pending timers
#[derive(Debug, Default)]
pub struct EventLoop {
    tasks: VecDeque<Task>,
    timers: Vec<Timer>,
    next_timer_id: u32,
    /// Virtual time in milliseconds
    current_time: u64,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&mut self, context: ContextId, kind: TaskKind) {
        let task = Task { context, kind };
        tracing::trace!(context = %context, source = task.source().as_str(), "task queued");
        self.tasks.push_back(task);
    }

    pub fn next_task(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn has_pending_work(&self) -> bool {
        !self.tasks.is_empty() || !self.timers.is_empty()
    }

    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    pub fn set_timeout(&mut self, context: ContextId, callback: Value, delay_ms: u64) -> u32 {
        self.add_timer(context, callback, delay_ms, None)
    }

    pub fn set_interval(&mut self, context: ContextId, callback: Value, delay_ms: u64) -> u32 {
        self.add_timer(context, callback, delay_ms, Some(delay_ms.max(1)))
    }

    fn add_timer(&mut self, context: ContextId, callback: Value, delay_ms: u64, interval: Option<u64>) -> u32 {
        self.next_timer_id += 1;
        let id = self.next_timer_id;
        self.timers.push(Timer {
            id,
            context,
            callback,
            due: self.current_time + delay_ms,
            interval,
        });
        id
    }

    /// Cancel timer `id` of `context`; unknown ids are ignored
    pub fn clear_timer(&mut self, context: ContextId, id: u32) {
        self.timers.retain(|t| !(t.id == id && t.context == context));
    }

    /// Drop every timer and task of `context`
    pub fn forget(&mut self, context: ContextId) {
        self.timers.retain(|t| t.context != context);
        self.tasks.retain(|t| t.context != context);
    }

    /// When the earliest timer fires
    pub fn next_timer_due(&self) -> Option<u64> {
        self.timers.iter().map(|t| t.due).min()
    }

    /// Advance virtual time and queue the timers that came due, earliest
    /// first and in creation order on ties
    pub fn tick(&mut self, delta_ms: u64) {
        self.current_time += delta_ms;
        let now = self.current_time;

        let mut due: Vec<Timer> = self.timers.iter().filter(|t| t.due <= now).cloned().collect();
        due.sort_by_key(|t| (t.due, t.id));
        for timer in due {
            self.queue(
                timer.context,
                TaskKind::Timer {
                    timer: timer.id,
                    callback: timer.callback.clone(),
                },
            );
            match timer.interval {
                Some(interval) => {
                    if let Some(t) = self.timers.iter_mut().find(|t| t.id == timer.id) {
                        t.due = now + interval;
                    }
                }
                None => self.timers.retain(|t| t.id != timer.id),
            }
        }
    }

    /// Jump to the next timer and queue it
    pub fn fire_next_timer(&mut self) -> bool {
        match self.next_timer_due() {
            Some(due) => {
                self.tick(due.saturating_sub(self.current_time));
                true
            }
            None => false,
        }
    }
}

fn delay_arg(realm: &mut Realm, args: &[Value]) -> Result<u64, DomError> {
    let ms = realm.to_number(&arg(args, 1))?;
    Ok(if ms.is_finite() && ms > 0.0 { ms as u64 } else { 0 })
}

/// Register `setTimeout`, `setInterval` and `clearTimeout` for the window of
/// `context`
pub fn install_timers(realm: &mut Realm, context: ContextId, event_loop: Rc<RefCell<EventLoop>>) {
    let natives = realm.natives_mut();

    let timers = event_loop.clone();
    natives.method("Window", "setTimeout", move |realm, _, args| {
        let callback = arg(args, 0);
        if !realm.is_callable(&callback) {
            return Err(DomError::new(ErrorKind::InvalidArg, "setTimeout expects a function"));
        }
        let delay = delay_arg(realm, args)?;
        let id = timers.borrow_mut().set_timeout(context, callback, delay);
        Ok(Value::Number(f64::from(id)))
    });
    let timers = event_loop.clone();
    natives.method("Window", "setInterval", move |realm, _, args| {
        let callback = arg(args, 0);
        if !realm.is_callable(&callback) {
            return Err(DomError::new(ErrorKind::InvalidArg, "setInterval expects a function"));
        }
        let delay = delay_arg(realm, args)?;
        let id = timers.borrow_mut().set_interval(context, callback, delay);
        Ok(Value::Number(f64::from(id)))
    });
    natives.method("Window", "clearTimeout", move |realm, _, args| {
        let id = realm.to_number(&arg(args, 0))?;
        if id.is_finite() && id >= 0.0 {
            event_loop.borrow_mut().clear_timer(context, id as u32);
        }
        Ok(Value::Undefined)
    });
}
