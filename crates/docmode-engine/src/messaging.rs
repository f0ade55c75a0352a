//! Cross-document messaging
//!
//! `window.postMessage` and the `message` events it produces.

use crate::event_loop::{ContextId, EventLoop, TaskKind};
use docmode_dom::{arg, DocumentMode, DomError, DomResult, ErrorKind, Feature, Realm, Value};
use docmode_js::{CloneData, Location};
use std::cell::RefCell;
use std::rc::Rc;
use url::Url;

/// Parsed `targetOrigin` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOrigin {
    /// `"*"`
    Any,
    Origin(Url),
}

impl TargetOrigin {
    /// Validate a `targetOrigin` string
    pub fn parse(s: &str) -> DomResult<Self> {
        if s.is_empty() {
            return Err(DomError::new(ErrorKind::InvalidArg, "empty targetOrigin"));
        }
        if s == "*" {
            return Ok(TargetOrigin::Any);
        }
        match Url::parse(s) {
            Ok(url) if url.has_host() => Ok(TargetOrigin::Origin(url)),
            _ => Err(DomError::new(ErrorKind::Syntax, format!("invalid targetOrigin {s:?}"))),
        }
    }

    /// Convert a script value. Objects are only accepted from mode 10,
    /// through their string conversion.
    pub fn from_value(realm: &mut Realm, value: &Value) -> DomResult<Self> {
        match value {
            Value::Undefined => Err(DomError::new(ErrorKind::Syntax, "targetOrigin is undefined")),
            Value::Object(_) if realm.is_callable(value) || realm.mode_version() < 10 => {
                Err(DomError::new(ErrorKind::Syntax, "targetOrigin must be a string"))
            }
            Value::String(s) => Self::parse(s),
            other => {
                let s = realm.to_string(other)?;
                Self::parse(&s)
            }
        }
    }

    /// Whether a window at `location` accepts the message. Below mode 9 the
    /// port is not compared.
    pub fn matches(&self, location: &Location, mode: DocumentMode) -> bool {
        let TargetOrigin::Origin(target) = self else {
            return true;
        };
        let here = location.url();
        if mode.supports(Feature::MessageEvent) {
            target.origin() == here.origin()
        } else {
            target.scheme() == here.scheme() && target.host_str() == here.host_str()
        }
    }
}

/// Fire the queued `message` event at the window of `realm`
pub fn deliver(realm: &mut Realm, data: &CloneData, origin: &str, source: Value) -> DomResult<()> {
    let data = data.materialize(realm)?;
    let window = realm.window();
    tracing::debug!(origin, "message delivered");
    realm.fire_event(
        window,
        "MessageEvent",
        "message",
        false,
        vec![
            ("data", data),
            ("origin", Value::string(origin)),
            ("source", source),
        ],
    )?;
    Ok(())
}

/// Register `postMessage` for the window of `context`
pub fn install(
    realm: &mut Realm,
    context: ContextId,
    location: Rc<RefCell<Location>>,
    event_loop: Rc<RefCell<EventLoop>>,
) {
    realm.natives_mut().method("Window", "postMessage", move |realm, this, args| {
        let window = realm.this_object(this)?;
        let target = TargetOrigin::from_value(realm, &arg(args, 1))?;
        let mode = realm.mode();
        let (accepted, origin) = {
            let location = location.borrow();
            (target.matches(&location, mode), location.origin())
        };
        if !accepted {
            tracing::debug!(context = %context, ?target, "message dropped, origin mismatch");
            return Ok(Value::Undefined);
        }

        if !mode.supports(Feature::MessageEvent) {
            // delivered before postMessage returns, handler gets no event
            realm.fire_event(window, "Event", "message", false, Vec::new())?;
            return Ok(Value::Undefined);
        }
        let data = CloneData::serialize_for_mode(realm, &arg(args, 0))?;
        event_loop.borrow_mut().queue(
            context,
            TaskKind::Message {
                data,
                origin,
                source: context,
            },
        );
        Ok(Value::Undefined)
    });
}
