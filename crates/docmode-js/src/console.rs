//! Console API
//!
//! `console.log` and friends, routed to `tracing` under the `console` target.

use docmode_dom::{arg, DomError, DomResult, ErrorKind, HostData, ObjectData, ObjectId, Realm, Value};
use std::any::Any;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

/// Per-window console state
#[derive(Debug, Default)]
pub struct Console {
    timers: HashMap<String, f64>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(level: ConsoleLevel, message: &str) {
        match level {
            ConsoleLevel::Error => tracing::error!(target: "console", "{message}"),
            ConsoleLevel::Warn => tracing::warn!(target: "console", "{message}"),
            ConsoleLevel::Debug => tracing::debug!(target: "console", "{message}"),
            ConsoleLevel::Log | ConsoleLevel::Info => tracing::info!(target: "console", "{message}"),
        }
    }

    /// Start timer `label` at `now`
    pub fn time(&mut self, label: &str, now: f64) {
        self.timers.insert(label.to_string(), now);
    }

    /// Elapsed milliseconds of `label`, which stops
    pub fn time_end(&mut self, label: &str, now: f64) -> Option<f64> {
        self.timers.remove(label).map(|start| now - start)
    }
}

impl HostData for Console {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Space-joined string forms of `args`
pub fn format_args(realm: &mut Realm, args: &[Value]) -> DomResult<String> {
    let parts = args
        .iter()
        .map(|v| realm.host_to_string(v))
        .collect::<DomResult<Vec<_>>>()?;
    Ok(parts.join(" "))
}

pub fn create_console_object(realm: &mut Realm) -> DomResult<ObjectId> {
    realm.create_host("Console", ObjectData::Host(Box::new(Console::new())))
}

fn this_console(realm: &Realm, this: &Value) -> DomResult<ObjectId> {
    this.as_object()
        .filter(|id| realm.obj(*id).host_data::<Console>().is_some())
        .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
}

fn label_arg(realm: &mut Realm, args: &[Value]) -> DomResult<String> {
    match arg(args, 0) {
        Value::Undefined => Ok("default".to_string()),
        v => realm.to_string(&v),
    }
}

pub(crate) fn install(realm: &mut Realm) {
    let natives = realm.natives_mut();

    let levels = [
        ("log", ConsoleLevel::Log),
        ("info", ConsoleLevel::Info),
        ("warn", ConsoleLevel::Warn),
        ("error", ConsoleLevel::Error),
        ("debug", ConsoleLevel::Debug),
        ("dir", ConsoleLevel::Log),
    ];
    for (name, level) in levels {
        natives.method("Console", name, move |realm, this, args| {
            this_console(realm, this)?;
            let message = format_args(realm, args)?;
            Console::emit(level, &message);
            Ok(Value::Undefined)
        });
    }
    natives.method("Console", "assert", |realm, this, args| {
        this_console(realm, this)?;
        if !arg(args, 0).truthy() {
            let message = format_args(realm, args.get(1..).unwrap_or_default())?;
            Console::emit(ConsoleLevel::Error, &format!("Assertion failed: {message}"));
        }
        Ok(Value::Undefined)
    });
    natives.method("Console", "clear", |realm, this, _| {
        this_console(realm, this)?;
        tracing::trace!(target: "console", "clear");
        Ok(Value::Undefined)
    });
    natives.method("Console", "time", |realm, this, args| {
        let id = this_console(realm, this)?;
        let label = label_arg(realm, args)?;
        let now = realm.next_timestamp();
        if let Some(console) = realm.obj_mut(id).host_data_mut::<Console>() {
            console.time(&label, now);
        }
        Ok(Value::Undefined)
    });
    natives.method("Console", "timeEnd", |realm, this, args| {
        let id = this_console(realm, this)?;
        let label = label_arg(realm, args)?;
        let now = realm.next_timestamp();
        let elapsed = realm
            .obj_mut(id)
            .host_data_mut::<Console>()
            .and_then(|c| c.time_end(&label, now));
        if let Some(ms) = elapsed {
            Console::emit(ConsoleLevel::Info, &format!("{label}: {ms}ms"));
        }
        Ok(Value::Undefined)
    });
}
