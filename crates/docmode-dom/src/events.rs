//! Events
//!
//! Event objects, listener lists, `on*` handler slots and dispatch.

use crate::error::{DomError, DomResult, ErrorKind};
use crate::mode::Feature;
use crate::object::{FunctionKind, ObjectData};
use crate::realm::{arg, Realm};
use crate::value::{ObjectId, Value};
use std::collections::HashMap;

/// `eventPhase` values
pub mod phase {
    pub const NONE: u8 = 0;
    pub const CAPTURING: u8 = 1;
    pub const AT_TARGET: u8 = 2;
    pub const BUBBLING: u8 = 3;
}

/// State of an event object
#[derive(Debug, Clone, Default)]
pub struct EventData {
    pub event_type: String,
    pub bubbles: bool,
    pub cancelable: bool,
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    pub immediate_stopped: bool,
    pub phase: u8,
    pub target: Option<ObjectId>,
    pub current_target: Option<ObjectId>,
    pub time_stamp: f64,
    pub trusted: bool,
    pub dispatching: bool,
}

/// What an `on*` slot currently holds
#[derive(Debug, Clone)]
pub enum HandlerValue {
    Function(ObjectId),
    /// Legacy modes keep whatever was assigned
    Raw(Value),
    /// Content attribute not compiled yet
    Source(String),
    Compiled { func: ObjectId, source: String },
}

#[derive(Debug, Clone, Default)]
pub struct HandlerSlot {
    pub value: Option<HandlerValue>,
    /// Removing the content attribute already left an empty function once
    pub emptied: bool,
}

impl HandlerSlot {
    pub fn is_from_content(&self) -> bool {
        matches!(
            self.value,
            Some(HandlerValue::Source(_) | HandlerValue::Compiled { .. })
        )
    }
}

#[derive(Debug, Clone)]
pub struct Listener {
    pub event_type: String,
    pub callback: ObjectId,
    pub capture: bool,
    /// Registered through attachEvent
    pub legacy: bool,
}

/// Handlers and listeners carried by every event target
#[derive(Debug, Clone, Default)]
pub struct EventTargetData {
    pub handlers: HashMap<&'static str, HandlerSlot>,
    pub listeners: Vec<Listener>,
}

/// Interface created by `document.createEvent(kind)`
fn event_interface_for(kind: &str) -> Option<&'static str> {
    let lower = kind.to_ascii_lowercase();
    Some(match lower.as_str() {
        "event" | "events" | "htmlevents" => "Event",
        "uievent" | "uievents" => "UIEvent",
        "mouseevent" | "mouseevents" => "MouseEvent",
        "keyboardevent" => "KeyboardEvent",
        "customevent" => "CustomEvent",
        "messageevent" => "MessageEvent",
        "storageevent" => "StorageEvent",
        "pagetransitionevent" => "PageTransitionEvent",
        _ => return None,
    })
}

impl Realm {
    /// Allocate an uninitialized event object of interface `iface`
    pub fn create_event_object(&mut self, iface: &str) -> DomResult<ObjectId> {
        let data = EventData {
            time_stamp: self.next_timestamp(),
            ..EventData::default()
        };
        let id = self.create_host(iface, ObjectData::Event(data))?;
        if self.graph().implements_name(self.obj(id).class, "MessageEvent") {
            let stringly = self.mode_version() < 10;
            let fields = &mut self.obj_mut(id).fields;
            if stringly {
                fields.insert("data", Value::string(""));
            }
            fields.insert("origin", Value::string(""));
            fields.insert("source", Value::Null);
        }
        Ok(id)
    }

    /// `document.createEvent(kind)`
    pub fn create_event(&mut self, kind: &str) -> DomResult<ObjectId> {
        let iface = event_interface_for(kind)
            .filter(|name| self.graph().by_name(name).is_some())
            .ok_or_else(|| DomError::new(ErrorKind::InvalidArg, format!("unsupported event type {kind}")))?;
        self.create_event_object(iface)
    }

    pub fn event_data(&self, id: ObjectId) -> Option<&EventData> {
        match &self.obj(id).data {
            ObjectData::Event(e) => Some(e),
            _ => None,
        }
    }

    pub fn event_data_mut(&mut self, id: ObjectId) -> Option<&mut EventData> {
        match &mut self.obj_mut(id).data {
            ObjectData::Event(e) => Some(e),
            _ => None,
        }
    }

    fn this_event(&self, this: &Value) -> DomResult<ObjectId> {
        this.as_object()
            .filter(|id| self.event_data(*id).is_some())
            .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
    }

    /// `initEvent(type, bubbles, cancelable)`
    pub fn init_event(&mut self, event: ObjectId, event_type: &str, bubbles: bool, cancelable: bool) {
        if let Some(e) = self.event_data_mut(event) {
            if e.dispatching {
                return;
            }
            e.event_type = event_type.to_string();
            e.bubbles = bubbles;
            e.cancelable = cancelable;
            e.default_prevented = false;
            e.propagation_stopped = false;
            e.immediate_stopped = false;
        }
    }

    // ========================================================================
    // Handler slots
    // ========================================================================

    /// Current value of the `name` handler on `target` as seen by script
    pub fn handler_value(&mut self, target: ObjectId, name: &'static str) -> DomResult<Value> {
        if self.is_element(target) {
            return crate::reflect::element_handler_get(self, target, name);
        }
        let value = self.obj(target).target.handlers.get(name).and_then(|s| s.value.clone());
        Ok(match value {
            None => Value::Null,
            Some(HandlerValue::Function(f)) => Value::Object(f),
            Some(HandlerValue::Raw(v)) => v,
            Some(HandlerValue::Compiled { func, .. }) => Value::Object(func),
            Some(HandlerValue::Source(src)) => Value::Object(self.compile_handler(target, name, src)),
        })
    }

    /// Assign the `name` handler property
    pub fn set_handler_value(
        &mut self,
        target: ObjectId,
        name: &'static str,
        value: Value,
    ) -> DomResult<()> {
        if self.is_element(target) {
            return crate::reflect::element_handler_set(self, target, name, value);
        }
        let legacy = self.mode().is_legacy();
        let new = if value.is_null() {
            None
        } else if self.is_callable(&value) {
            value.as_object().map(HandlerValue::Function)
        } else if legacy {
            Some(HandlerValue::Raw(value))
        } else {
            None
        };
        self.obj_mut(target).target.handlers.entry(name).or_default().value = new;
        Ok(())
    }

    /// Turn a pending source handler into a function object
    pub(crate) fn compile_handler(&mut self, target: ObjectId, name: &'static str, source: String) -> ObjectId {
        let func = self.create_function_object(FunctionKind::Compiled { source: source.clone() }, name, 1);
        tracing::trace!(handler = name, "compiled content handler");
        let slot = self.obj_mut(target).target.handlers.entry(name).or_default();
        slot.value = Some(HandlerValue::Compiled { func, source });
        func
    }

    /// Call the `on<type>` handler of `target`, if it is callable
    pub fn invoke_handler(
        &mut self,
        target: ObjectId,
        name: &'static str,
        event: Option<Value>,
    ) -> DomResult<Option<Value>> {
        if self.graph().find_member(self.obj(target).class, name).is_none() {
            return Ok(None);
        }
        let handler = self.handler_value(target, name)?;
        if !self.is_callable(&handler) {
            return Ok(None);
        }
        let args: Vec<Value> = event.into_iter().collect();
        self.call(&handler, Value::Object(target), &args).map(Some)
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn add_event_listener(&mut self, target: ObjectId, event_type: &str, callback: ObjectId, capture: bool) {
        let listeners = &mut self.obj_mut(target).target.listeners;
        let exists = listeners
            .iter()
            .any(|l| !l.legacy && l.event_type == event_type && l.callback == callback && l.capture == capture);
        if !exists {
            listeners.push(Listener {
                event_type: event_type.to_string(),
                callback,
                capture,
                legacy: false,
            });
        }
    }

    pub fn remove_event_listener(&mut self, target: ObjectId, event_type: &str, callback: ObjectId, capture: bool) {
        self.obj_mut(target).target.listeners.retain(|l| {
            l.legacy || l.event_type != event_type || l.callback != callback || l.capture != capture
        });
    }

    /// `attachEvent("onclick", fn)`
    pub fn attach_event(&mut self, target: ObjectId, name: &str, callback: ObjectId) -> bool {
        let Some(event_type) = name.strip_prefix("on") else {
            return false;
        };
        self.obj_mut(target).target.listeners.push(Listener {
            event_type: event_type.to_string(),
            callback,
            capture: false,
            legacy: true,
        });
        true
    }

    pub fn detach_event(&mut self, target: ObjectId, name: &str, callback: ObjectId) {
        let Some(event_type) = name.strip_prefix("on") else {
            return;
        };
        let listeners = &mut self.obj_mut(target).target.listeners;
        if let Some(pos) = listeners
            .iter()
            .position(|l| l.legacy && l.event_type == event_type && l.callback == callback)
        {
            listeners.remove(pos);
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Targets an event visits, target first
    fn propagation_path(&self, target: ObjectId) -> Vec<ObjectId> {
        let mut path = vec![target];
        let mut cur = target;
        while let Some(parent) = self.parent_node(cur) {
            path.push(parent);
            cur = parent;
        }
        if let Some(window) = self.document_window(cur) {
            path.push(window);
        }
        path
    }

    /// Standard dispatch; returns false when the default was prevented
    pub fn dispatch_event(&mut self, target: ObjectId, event: ObjectId) -> DomResult<bool> {
        let event_type = match self.event_data_mut(event) {
            Some(e) if e.dispatching || e.event_type.is_empty() => {
                return Err(DomError::kind(ErrorKind::InvalidState));
            }
            Some(e) => {
                e.dispatching = true;
                e.target = Some(target);
                e.propagation_stopped = false;
                e.immediate_stopped = false;
                e.event_type.clone()
            }
            None => return Err(DomError::kind(ErrorKind::TypeMismatch)),
        };
        tracing::trace!(event = %event_type, target = %target, "dispatch");

        let path = self.propagation_path(target);
        let bubbles = self.event_data(event).is_some_and(|e| e.bubbles);
        let result = self.run_path(&path, event, &event_type, bubbles);

        if let Some(e) = self.event_data_mut(event) {
            e.dispatching = false;
            e.phase = phase::NONE;
            e.current_target = None;
        }
        result?;
        Ok(!self.event_data(event).is_some_and(|e| e.default_prevented))
    }

    fn run_path(&mut self, path: &[ObjectId], event: ObjectId, event_type: &str, bubbles: bool) -> DomResult<()> {
        for &node in path.iter().skip(1).rev() {
            self.visit(node, event, event_type, phase::CAPTURING)?;
            if self.stopped(event) {
                return Ok(());
            }
        }
        self.visit(path[0], event, event_type, phase::AT_TARGET)?;
        if !bubbles {
            return Ok(());
        }
        for &node in path.iter().skip(1) {
            if self.stopped(event) {
                return Ok(());
            }
            self.visit(node, event, event_type, phase::BUBBLING)?;
        }
        Ok(())
    }

    fn stopped(&self, event: ObjectId) -> bool {
        self.event_data(event).is_some_and(|e| e.propagation_stopped)
    }

    fn visit(&mut self, node: ObjectId, event: ObjectId, event_type: &str, at: u8) -> DomResult<()> {
        if let Some(e) = self.event_data_mut(event) {
            e.phase = at;
            e.current_target = Some(node);
        }
        if at != phase::CAPTURING {
            if let Some(name) = self.handler_name(node, event_type) {
                let ret = self.invoke_handler(node, name, Some(Value::Object(event)))?;
                if ret.is_some_and(|r| r.strict_equals(&Value::Bool(false))) {
                    if let Some(e) = self.event_data_mut(event) {
                        e.default_prevented |= e.cancelable;
                    }
                }
            }
        }
        let listeners: Vec<ObjectId> = self
            .obj(node)
            .target
            .listeners
            .iter()
            .filter(|l| !l.legacy && l.event_type == event_type)
            .filter(|l| match at {
                phase::CAPTURING => l.capture,
                phase::BUBBLING => !l.capture,
                _ => true,
            })
            .map(|l| l.callback)
            .collect();
        for callback in listeners {
            if self.event_data(event).is_some_and(|e| e.immediate_stopped) {
                break;
            }
            self.call(&Value::Object(callback), Value::Object(node), &[Value::Object(event)])?;
        }
        Ok(())
    }

    /// Schema handler name for `event_type` on `node`
    fn handler_name(&self, node: ObjectId, event_type: &str) -> Option<&'static str> {
        let name = format!("on{event_type}");
        self.graph()
            .find_member(self.obj(node).class, &name)
            .map(|(_, m)| m.name)
    }

    /// Legacy firing: handler without arguments, then attachEvent listeners
    pub fn fire_legacy_event(&mut self, target: ObjectId, event_type: &str, bubbles: bool) -> DomResult<()> {
        let path = if bubbles { self.propagation_path(target) } else { vec![target] };
        for node in path {
            if let Some(name) = self.handler_name(node, event_type) {
                self.invoke_handler(node, name, None)?;
            }
            let attached: Vec<ObjectId> = self
                .obj(node)
                .target
                .listeners
                .iter()
                .filter(|l| l.legacy && l.event_type == event_type)
                .map(|l| l.callback)
                .collect();
            for callback in attached {
                let obj = self.create_host("MSEventObj", ObjectData::Plain)?;
                self.obj_mut(obj).fields.insert("type", Value::string(event_type));
                self.obj_mut(obj).fields.insert("srcElement", Value::Object(target));
                self.call(&Value::Object(callback), Value::Object(node), &[Value::Object(obj)])?;
            }
        }
        Ok(())
    }

    /// Fire `event_type` on `target` the way the active mode does it.
    ///
    /// Standard modes get an event object of interface `iface` with `fields`
    /// applied; legacy modes call handlers without an argument.
    pub fn fire_event(
        &mut self,
        target: ObjectId,
        iface: &str,
        event_type: &str,
        bubbles: bool,
        fields: Vec<(&'static str, Value)>,
    ) -> DomResult<bool> {
        if !self.mode().supports(Feature::StandardEvents) {
            self.fire_legacy_event(target, event_type, bubbles)?;
            return Ok(true);
        }
        let event = self.create_event_object(iface)?;
        self.init_event(event, event_type, bubbles, false);
        if let Some(e) = self.event_data_mut(event) {
            e.trusted = true;
        }
        for (name, value) in fields {
            self.obj_mut(event).fields.insert(name, value);
        }
        self.dispatch_event(target, event)
    }
}

/// Event natives
pub(crate) fn install(realm: &mut Realm) {
    let natives = realm.natives_mut();

    natives.getter("Event", "type", |realm, this, _| {
        let id = realm.this_event(this)?;
        Ok(Value::string(realm.event_data(id).map(|e| e.event_type.clone()).unwrap_or_default()))
    });
    natives.getter("Event", "bubbles", |realm, this, _| {
        let id = realm.this_event(this)?;
        Ok(Value::Bool(realm.event_data(id).is_some_and(|e| e.bubbles)))
    });
    natives.getter("Event", "cancelable", |realm, this, _| {
        let id = realm.this_event(this)?;
        Ok(Value::Bool(realm.event_data(id).is_some_and(|e| e.cancelable)))
    });
    natives.getter("Event", "defaultPrevented", |realm, this, _| {
        let id = realm.this_event(this)?;
        Ok(Value::Bool(realm.event_data(id).is_some_and(|e| e.default_prevented)))
    });
    natives.getter("Event", "isTrusted", |realm, this, _| {
        let id = realm.this_event(this)?;
        Ok(Value::Bool(realm.event_data(id).is_some_and(|e| e.trusted)))
    });
    natives.getter("Event", "eventPhase", |realm, this, _| {
        let id = realm.this_event(this)?;
        Ok(Value::from(realm.event_data(id).map_or(0, |e| e.phase) as i32))
    });
    natives.getter("Event", "timeStamp", |realm, this, _| {
        let id = realm.this_event(this)?;
        Ok(Value::Number(realm.event_data(id).map_or(0.0, |e| e.time_stamp)))
    });
    natives.getter("Event", "target", |realm, this, _| {
        let id = realm.this_event(this)?;
        Ok(realm.event_data(id).and_then(|e| e.target).into())
    });
    natives.getter("Event", "currentTarget", |realm, this, _| {
        let id = realm.this_event(this)?;
        Ok(realm.event_data(id).and_then(|e| e.current_target).into())
    });

    natives.method("Event", "preventDefault", |realm, this, _| {
        let id = realm.this_event(this)?;
        if let Some(e) = realm.event_data_mut(id) {
            e.default_prevented |= e.cancelable;
        }
        Ok(Value::Undefined)
    });
    natives.method("Event", "stopPropagation", |realm, this, _| {
        let id = realm.this_event(this)?;
        if let Some(e) = realm.event_data_mut(id) {
            e.propagation_stopped = true;
        }
        Ok(Value::Undefined)
    });
    natives.method("Event", "stopImmediatePropagation", |realm, this, _| {
        let id = realm.this_event(this)?;
        if let Some(e) = realm.event_data_mut(id) {
            e.propagation_stopped = true;
            e.immediate_stopped = true;
        }
        Ok(Value::Undefined)
    });
    natives.method("Event", "initEvent", |realm, this, args| {
        let id = realm.this_event(this)?;
        let event_type = realm.to_string(&arg(args, 0))?;
        realm.init_event(id, &event_type, arg(args, 1).truthy(), arg(args, 2).truthy());
        Ok(Value::Undefined)
    });
    natives.method("UIEvent", "initUIEvent", |realm, this, args| {
        let id = realm.this_event(this)?;
        let event_type = realm.to_string(&arg(args, 0))?;
        realm.init_event(id, &event_type, arg(args, 1).truthy(), arg(args, 2).truthy());
        realm.obj_mut(id).fields.insert("view", arg(args, 3));
        realm.obj_mut(id).fields.insert("detail", arg(args, 4));
        Ok(Value::Undefined)
    });
    natives.method("CustomEvent", "initCustomEvent", |realm, this, args| {
        let id = realm.this_event(this)?;
        let event_type = realm.to_string(&arg(args, 0))?;
        realm.init_event(id, &event_type, arg(args, 1).truthy(), arg(args, 2).truthy());
        realm.obj_mut(id).fields.insert("detail", arg(args, 3));
        Ok(Value::Undefined)
    });
    natives.method("MessageEvent", "initMessageEvent", |realm, this, args| {
        let id = realm.this_event(this)?;
        let event_type = realm.to_string(&arg(args, 0))?;
        realm.init_event(id, &event_type, arg(args, 1).truthy(), arg(args, 2).truthy());
        let data = realm.to_string(&arg(args, 3))?;
        let origin = realm.to_string(&arg(args, 4))?;
        let source = match arg(args, 6) {
            Value::Object(o) => Value::Object(o),
            _ => Value::Null,
        };
        let fields = &mut realm.obj_mut(id).fields;
        fields.insert("data", Value::String(data));
        fields.insert("origin", Value::String(origin));
        fields.insert("source", source);
        Ok(Value::Undefined)
    });
    natives.method("StorageEvent", "initStorageEvent", |realm, this, args| {
        let id = realm.this_event(this)?;
        let event_type = realm.to_string(&arg(args, 0))?;
        realm.init_event(id, &event_type, arg(args, 1).truthy(), arg(args, 2).truthy());
        for (i, name) in ["key", "oldValue", "newValue", "url"].into_iter().enumerate() {
            let v = arg(args, 3 + i);
            let v = if v.is_nullish() { Value::Null } else { Value::String(realm.to_string(&v)?) };
            realm.obj_mut(id).fields.insert(name, v);
        }
        realm.obj_mut(id).fields.insert("storageArea", arg(args, 7));
        Ok(Value::Undefined)
    });

    for iface in ["Node", "Window", "XMLHttpRequest"] {
        natives.method(iface, "addEventListener", |realm, this, args| {
            let target = realm.this_object(this)?;
            let event_type = realm.to_string(&arg(args, 0))?;
            if let Some(callback) = arg(args, 1).as_object() {
                realm.add_event_listener(target, &event_type, callback, arg(args, 2).truthy());
            }
            Ok(Value::Undefined)
        });
        natives.method(iface, "removeEventListener", |realm, this, args| {
            let target = realm.this_object(this)?;
            let event_type = realm.to_string(&arg(args, 0))?;
            if let Some(callback) = arg(args, 1).as_object() {
                realm.remove_event_listener(target, &event_type, callback, arg(args, 2).truthy());
            }
            Ok(Value::Undefined)
        });
        natives.method(iface, "dispatchEvent", |realm, this, args| {
            let target = realm.this_object(this)?;
            let event = arg(args, 0)
                .as_object()
                .ok_or_else(|| DomError::kind(ErrorKind::TypeMismatch))?;
            realm.dispatch_event(target, event).map(Value::Bool)
        });
    }

    for iface in ["HTMLElement", "Document", "Window"] {
        natives.method(iface, "attachEvent", |realm, this, args| {
            let target = realm.this_object(this)?;
            let name = realm.to_string(&arg(args, 0))?;
            let ok = match arg(args, 1).as_object() {
                Some(callback) => realm.attach_event(target, &name, callback),
                None => false,
            };
            Ok(Value::Bool(ok))
        });
        natives.method(iface, "detachEvent", |realm, this, args| {
            let target = realm.this_object(this)?;
            let name = realm.to_string(&arg(args, 0))?;
            if let Some(callback) = arg(args, 1).as_object() {
                realm.detach_event(target, &name, callback);
            }
            Ok(Value::Undefined)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::DocumentMode;

    #[test]
    fn test_create_event_kinds() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let e = realm.create_event("UIEvents").unwrap();
        assert_eq!(realm.object_to_string(&Value::Object(e)), "[object UIEvent]");
        let err = realm.create_event("NoSuchEvent").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArg);
        // PageTransitionEvent only exists in 11
        assert!(realm.create_event("PageTransitionEvent").is_err());
    }

    #[test]
    fn test_message_event_defaults() {
        let mut r9 = Realm::new(DocumentMode::IE9);
        let e = r9.create_event("MessageEvent").unwrap();
        assert_eq!(r9.get(e, "data").unwrap(), Value::string(""));
        assert_eq!(r9.get(e, "source").unwrap(), Value::Null);

        let mut r10 = Realm::new(DocumentMode::IE10);
        let e = r10.create_event("MessageEvent").unwrap();
        assert_eq!(r10.get(e, "data").unwrap(), Value::Undefined);
        assert_eq!(r10.get(e, "origin").unwrap(), Value::string(""));
    }

    #[test]
    fn test_init_message_event_stringifies_data() {
        let mut realm = Realm::new(DocumentMode::IE11);
        let e = realm.create_event("MessageEvent").unwrap();
        let window = realm.window();
        realm
            .call_method(
                &Value::Object(e),
                "initMessageEvent",
                &[
                    Value::string("blah"),
                    Value::Bool(true),
                    Value::Bool(true),
                    Value::from(137),
                    Value::string("wine"),
                    Value::from(1234),
                    Value::Object(window),
                ],
            )
            .unwrap();
        assert_eq!(realm.get(e, "data").unwrap(), Value::string("137"));
        assert_eq!(realm.get(e, "bubbles").unwrap(), Value::Bool(true));
        assert_eq!(realm.get(e, "source").unwrap(), Value::Object(window));
        assert_eq!(realm.get(e, "origin").unwrap(), Value::string("wine"));
    }

    #[test]
    fn test_dispatch_bubbles_to_window() {
        let mut realm = Realm::new(DocumentMode::IE10);
        let body = realm.body().unwrap();
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let log = seen.clone();
        let listener = realm.create_native_closure("listener", 1, move |realm, this, _| {
            let tag = realm.object_to_string(&this);
            log.borrow_mut().push(tag);
            Ok(Value::Undefined)
        });
        realm.add_event_listener(body, "click", listener, false);
        let window = realm.window();
        realm.add_event_listener(window, "click", listener, false);

        let e = realm.create_event("Event").unwrap();
        realm.init_event(e, "click", true, true);
        assert!(realm.dispatch_event(body, e).unwrap());
        assert_eq!(
            *seen.borrow(),
            vec!["[object HTMLBodyElement]".to_string(), "[object Window]".to_string()]
        );
    }

    #[test]
    fn test_handler_false_prevents_default() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let body = realm.body().unwrap();
        let handler = realm.create_native_closure("h", 1, |_, _, _| Ok(Value::Bool(false)));
        realm.set(body, "onclick", Value::Object(handler)).unwrap();
        let e = realm.create_event("Event").unwrap();
        realm.init_event(e, "click", false, true);
        assert!(!realm.dispatch_event(body, e).unwrap());
    }

    #[test]
    fn test_legacy_fire_has_no_argument() {
        let mut realm = Realm::new(DocumentMode::IE8);
        let window = realm.window();
        let argc = std::rc::Rc::new(std::cell::Cell::new(usize::MAX));
        let seen = argc.clone();
        let handler = realm.create_native_closure("h", 0, move |_, _, args| {
            seen.set(args.len());
            Ok(Value::Undefined)
        });
        realm.set(window, "onload", Value::Object(handler)).unwrap();
        realm.fire_event(window, "Event", "load", false, Vec::new()).unwrap();
        assert_eq!(argc.get(), 0);
    }

    #[test]
    fn test_attach_event_roundtrip() {
        let mut realm = Realm::new(DocumentMode::IE8);
        let body = realm.body().unwrap();
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let c = calls.clone();
        let f = realm.create_native_closure("f", 0, move |_, _, _| {
            c.set(c.get() + 1);
            Ok(Value::Undefined)
        });
        assert!(realm.attach_event(body, "onclick", f));
        realm.fire_legacy_event(body, "click", false).unwrap();
        realm.detach_event(body, "onclick", f);
        realm.fire_legacy_event(body, "click", false).unwrap();
        assert_eq!(calls.get(), 1);
    }
}
