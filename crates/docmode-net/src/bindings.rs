//! XHR bindings
//!
//! `XMLHttpRequest` as a realm host object. Synchronous requests complete
//! inside `send()`; asynchronous ones wait in the network outbox until the
//! embedder delivers them.

use crate::loader::{Request, Transport};
use crate::xhr::{ResponseBody, XmlHttpRequest};
use crate::XhrError;
use docmode_dom::{arg, DomError, DomResult, ErrorKind, HostData, ObjectData, ObjectId, Realm, Value};
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use url::Url;

/// An asynchronous send waiting for its response
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub target: ObjectId,
    pub generation: u64,
    pub request: Request,
}

/// Transport plus the outbox of a realm's asynchronous requests
#[derive(Debug, Clone)]
pub struct Network {
    transport: Rc<dyn Transport>,
    outbox: Rc<RefCell<VecDeque<PendingSend>>>,
    default_timeout_ms: u64,
}

impl Network {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self {
            transport,
            outbox: Rc::new(RefCell::new(VecDeque::new())),
            default_timeout_ms: 0,
        }
    }

    /// Timeout new request objects start with
    pub fn with_default_timeout(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Drain the sends queued since the last call, oldest first
    pub fn take_pending(&self) -> Vec<PendingSend> {
        self.outbox.borrow_mut().drain(..).collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.outbox.borrow().is_empty()
    }

    /// Fetch `pending` and deliver the outcome to its request object
    pub fn complete(&self, realm: &mut Realm, pending: PendingSend) -> DomResult<()> {
        let result = self.transport.fetch(&pending.request);
        deliver(realm, pending.target, pending.generation, result)
    }
}

/// Host data of an `XMLHttpRequest` instance
#[derive(Debug)]
pub struct XhrHandle {
    xhr: Rc<RefCell<XmlHttpRequest>>,
    /// `responseXML` built for the given generation
    document: Option<(u64, ObjectId)>,
}

impl XhrHandle {
    pub fn new(xhr: XmlHttpRequest) -> Self {
        Self {
            xhr: Rc::new(RefCell::new(xhr)),
            document: None,
        }
    }

    pub fn request(&self) -> &Rc<RefCell<XmlHttpRequest>> {
        &self.xhr
    }
}

impl HostData for XhrHandle {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn this_xhr(realm: &Realm, this: &Value) -> DomResult<(ObjectId, Rc<RefCell<XmlHttpRequest>>)> {
    this.as_object()
        .and_then(|id| realm.obj(id).host_data::<XhrHandle>().map(|h| (id, h.xhr.clone())))
        .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
}

/// Fire every queued event of `xhr` at `target`. Handler failures are
/// logged, never thrown back at the caller.
fn dispatch(realm: &mut Realm, target: ObjectId, xhr: &Rc<RefCell<XmlHttpRequest>>) {
    loop {
        let events = xhr.borrow_mut().take_events();
        if events.is_empty() {
            return;
        }
        for event in events {
            let event_type = event.event_type();
            tracing::trace!(event = event_type, target = %target, "xhr event");
            if let Err(err) = realm.fire_event(target, "Event", event_type, false, Vec::new()) {
                tracing::warn!(event = event_type, error = %err, "xhr handler failed");
            }
        }
    }
}

/// Hand the outcome of request `generation` to the object `target` and
/// run it through the remaining ready states
pub fn deliver(
    realm: &mut Realm,
    target: ObjectId,
    generation: u64,
    result: Result<crate::Response, XhrError>,
) -> DomResult<()> {
    let (_, xhr) = this_xhr(realm, &Value::Object(target))?;
    if !xhr.borrow_mut().receive(generation, result) {
        return Ok(());
    }
    loop {
        let advanced = xhr.borrow_mut().step();
        if !advanced {
            return Ok(());
        }
        dispatch(realm, target, &xhr);
    }
}

/// `responseXML`, built once per request
fn response_document(realm: &mut Realm, target: ObjectId) -> DomResult<Value> {
    let (_, xhr) = this_xhr(realm, &Value::Object(target))?;
    let (generation, parsed) = {
        let xhr = xhr.borrow();
        (xhr.generation(), xhr.response_xml())
    };
    let Some(parsed) = parsed else {
        return Ok(Value::Null);
    };
    let cached = realm
        .obj(target)
        .host_data::<XhrHandle>()
        .and_then(|h| h.document)
        .filter(|(g, _)| *g == generation);
    if let Some((_, doc)) = cached {
        return Ok(Value::Object(doc));
    }
    let doc = realm.create_xml_document(Some(parsed.root()))?;
    realm.obj_mut(doc).fields.insert("xml", Value::string(parsed.source()));
    if let Some(handle) = realm.obj_mut(target).host_data_mut::<XhrHandle>() {
        handle.document = Some((generation, doc));
    }
    Ok(Value::Object(doc))
}

fn string_arg(realm: &mut Realm, args: &[Value], i: usize) -> DomResult<String> {
    realm.to_string(&arg(args, i))
}

/// Register the `XMLHttpRequest` natives, sending through `network`
pub fn install(realm: &mut Realm, network: &Network) {
    let natives = realm.natives_mut();

    let timeout = network.default_timeout_ms;
    natives.constructor("XMLHttpRequest", move |realm, _, _| {
        let mut xhr = XmlHttpRequest::new(realm.mode_version());
        xhr.timeout_ms = timeout;
        let id = realm.create_host("XMLHttpRequest", ObjectData::Host(Box::new(XhrHandle::new(xhr))))?;
        Ok(Value::Object(id))
    });

    // state
    natives.getter("XMLHttpRequest", "readyState", |realm, this, _| {
        let (_, xhr) = this_xhr(realm, this)?;
        let state = xhr.borrow().ready_state();
        Ok(Value::Number(f64::from(state as u8)))
    });
    natives.getter("XMLHttpRequest", "status", |realm, this, _| {
        let (_, xhr) = this_xhr(realm, this)?;
        let status = xhr.borrow().status();
        Ok(Value::Number(f64::from(status)))
    });
    natives.getter("XMLHttpRequest", "statusText", |realm, this, _| {
        let (_, xhr) = this_xhr(realm, this)?;
        let text = xhr.borrow().status_text().to_string();
        Ok(Value::String(text))
    });
    natives.getter("XMLHttpRequest", "upload", |realm, this, _| {
        this_xhr(realm, this)?;
        Ok(Value::Null)
    });

    // response
    natives.getter("XMLHttpRequest", "responseText", |realm, this, _| {
        let (_, xhr) = this_xhr(realm, this)?;
        let text = xhr.borrow().response_text().to_string();
        Ok(Value::String(text))
    });
    natives.getter("XMLHttpRequest", "responseXML", |realm, this, _| {
        let (id, _) = this_xhr(realm, this)?;
        response_document(realm, id)
    });
    natives.getter("XMLHttpRequest", "response", |realm, this, _| {
        let (id, xhr) = this_xhr(realm, this)?;
        let body = xhr.borrow().response();
        match body {
            ResponseBody::Empty => Ok(Value::Null),
            ResponseBody::Text(text) => Ok(Value::String(text)),
            ResponseBody::Document(_) => response_document(realm, id),
            ResponseBody::Binary(bytes) => {
                let items = bytes.into_iter().map(|b| Value::Number(f64::from(b))).collect();
                Ok(Value::Object(realm.create_array(items)))
            }
        }
    });
    natives.getter("XMLHttpRequest", "responseType", |realm, this, _| {
        let (_, xhr) = this_xhr(realm, this)?;
        let ty = xhr.borrow().response_type();
        Ok(Value::string(ty.as_str()))
    });
    natives.setter("XMLHttpRequest", "responseType", |realm, this, args| {
        let (_, xhr) = this_xhr(realm, this)?;
        let value = string_arg(realm, args, 0)?;
        xhr.borrow_mut().set_response_type(&value)?;
        Ok(Value::Undefined)
    });
    natives.getter("XMLHttpRequest", "timeout", |realm, this, _| {
        let (_, xhr) = this_xhr(realm, this)?;
        let timeout = xhr.borrow().timeout_ms;
        Ok(Value::Number(timeout as f64))
    });
    natives.setter("XMLHttpRequest", "timeout", |realm, this, args| {
        let (_, xhr) = this_xhr(realm, this)?;
        let ms = realm.to_number(&arg(args, 0))?;
        xhr.borrow_mut().timeout_ms = if ms.is_finite() && ms > 0.0 { ms as u64 } else { 0 };
        Ok(Value::Undefined)
    });
    natives.getter("XMLHttpRequest", "withCredentials", |realm, this, _| {
        let (_, xhr) = this_xhr(realm, this)?;
        let flag = xhr.borrow().with_credentials;
        Ok(Value::Bool(flag))
    });
    natives.setter("XMLHttpRequest", "withCredentials", |realm, this, args| {
        let (_, xhr) = this_xhr(realm, this)?;
        xhr.borrow_mut().with_credentials = arg(args, 0).truthy();
        Ok(Value::Undefined)
    });

    // methods
    natives.method("XMLHttpRequest", "open", |realm, this, args| {
        let (id, xhr) = this_xhr(realm, this)?;
        let method = string_arg(realm, args, 0)?;
        let url = string_arg(realm, args, 1)?;
        let async_flag = args.get(2).map(Value::truthy);
        let base = Url::parse(&realm.document_url()).ok();
        xhr.borrow_mut().open(&method, &url, async_flag, base.as_ref())?;
        dispatch(realm, id, &xhr);
        Ok(Value::Undefined)
    });
    natives.method("XMLHttpRequest", "setRequestHeader", |realm, this, args| {
        let (_, xhr) = this_xhr(realm, this)?;
        let name = string_arg(realm, args, 0)?;
        let value = string_arg(realm, args, 1)?;
        xhr.borrow_mut().set_request_header(&name, &value)?;
        Ok(Value::Undefined)
    });
    let net = network.clone();
    natives.method("XMLHttpRequest", "send", move |realm, this, args| {
        let (id, xhr) = this_xhr(realm, this)?;
        let body = match arg(args, 0) {
            v if v.is_nullish() => None,
            v => Some(realm.to_string(&v)?),
        };
        let request = xhr.borrow_mut().send(body)?;
        let (generation, is_async) = {
            let xhr = xhr.borrow();
            (xhr.generation(), xhr.is_async())
        };
        dispatch(realm, id, &xhr);
        let pending = PendingSend {
            target: id,
            generation,
            request,
        };
        if is_async {
            net.outbox.borrow_mut().push_back(pending);
        } else {
            net.complete(realm, pending)?;
        }
        Ok(Value::Undefined)
    });
    natives.method("XMLHttpRequest", "abort", |realm, this, _| {
        let (id, xhr) = this_xhr(realm, this)?;
        xhr.borrow_mut().abort();
        dispatch(realm, id, &xhr);
        Ok(Value::Undefined)
    });
    natives.method("XMLHttpRequest", "getResponseHeader", |realm, this, args| {
        let (_, xhr) = this_xhr(realm, this)?;
        let name = string_arg(realm, args, 0)?;
        let value = xhr.borrow().response_header(&name).map(str::to_string);
        Ok(value.into())
    });
    natives.method("XMLHttpRequest", "getAllResponseHeaders", |realm, this, _| {
        let (_, xhr) = this_xhr(realm, this)?;
        let headers = xhr.borrow().all_response_headers();
        Ok(Value::String(headers))
    });
    natives.method("XMLHttpRequest", "overrideMimeType", |realm, this, args| {
        let (_, xhr) = this_xhr(realm, this)?;
        let mime = string_arg(realm, args, 0)?;
        xhr.borrow_mut().override_mime_type(&mime)?;
        Ok(Value::Undefined)
    });
}
