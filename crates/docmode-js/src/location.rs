//! Location API
//!
//! `window.location` over a parsed URL.

use docmode_dom::{arg, DomError, DomResult, ErrorKind, HostData, ObjectData, ObjectId, Realm, Value};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use url::{ParseError, Url};

/// Location state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    url: Url,
}

impl Location {
    pub fn parse(href: &str) -> Result<Self, ParseError> {
        Ok(Self {
            url: Url::parse(href)?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Full URL
    pub fn href(&self) -> String {
        self.url.to_string()
    }

    /// Navigate; relative references resolve against the current URL
    pub fn set_href(&mut self, href: &str) -> Result<(), ParseError> {
        self.url = self.url.join(href)?;
        Ok(())
    }

    /// `"http:"`
    pub fn protocol(&self) -> String {
        format!("{}:", self.url.scheme())
    }

    /// Hostname plus an explicit port
    pub fn host(&self) -> String {
        let hostname = self.hostname();
        match self.url.port() {
            Some(port) => format!("{hostname}:{port}"),
            None => hostname,
        }
    }

    pub fn hostname(&self) -> String {
        self.url.host_str().unwrap_or("").to_string()
    }

    pub fn port(&self) -> String {
        self.url.port().map(|p| p.to_string()).unwrap_or_default()
    }

    pub fn pathname(&self) -> &str {
        self.url.path()
    }

    pub fn set_pathname(&mut self, path: &str) {
        self.url.set_path(path);
    }

    /// Query including `?`, empty when there is none
    pub fn search(&self) -> String {
        match self.url.query() {
            Some(q) if !q.is_empty() => format!("?{q}"),
            _ => String::new(),
        }
    }

    pub fn set_search(&mut self, search: &str) {
        let q = search.strip_prefix('?').unwrap_or(search);
        self.url.set_query((!q.is_empty()).then_some(q));
    }

    /// Fragment including `#`, empty when there is none
    pub fn hash(&self) -> String {
        match self.url.fragment() {
            Some(f) if !f.is_empty() => format!("#{f}"),
            _ => String::new(),
        }
    }

    pub fn set_hash(&mut self, hash: &str) {
        let f = hash.strip_prefix('#').unwrap_or(hash);
        self.url.set_fragment((!f.is_empty()).then_some(f));
    }

    /// `scheme://host[:port]`
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// Used as `StorageEvent.url`
    pub fn href_without_fragment(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.to_string()
    }

    /// Scheme, host and port all match
    pub fn same_origin(&self, other: &Location) -> bool {
        self.url.origin() == other.url.origin()
    }
}

/// Host data of a `Location` object, shared with the embedder
#[derive(Debug, Clone)]
pub struct LocationHandle {
    location: Rc<RefCell<Location>>,
}

impl LocationHandle {
    pub fn new(location: Rc<RefCell<Location>>) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &Rc<RefCell<Location>> {
        &self.location
    }
}

impl HostData for LocationHandle {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Expose `location` as a `Location` host object
pub fn create_location_object(realm: &mut Realm, location: Rc<RefCell<Location>>) -> DomResult<ObjectId> {
    let href = location.borrow().href();
    realm.set_document_url(&href);
    realm.create_host("Location", ObjectData::Host(Box::new(LocationHandle::new(location))))
}

fn this_location(realm: &Realm, this: &Value) -> DomResult<Rc<RefCell<Location>>> {
    this.as_object()
        .and_then(|id| realm.obj(id).host_data::<LocationHandle>())
        .map(|h| h.location.clone())
        .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
}

fn navigate(realm: &mut Realm, location: &Rc<RefCell<Location>>, href: &str) -> DomResult<()> {
    location
        .borrow_mut()
        .set_href(href)
        .map_err(|e| DomError::new(ErrorKind::InvalidArg, e.to_string()))?;
    let href = location.borrow().href();
    tracing::debug!(%href, "location changed");
    realm.set_document_url(&href);
    Ok(())
}

type Read = fn(&Location) -> String;

fn pathname_text(location: &Location) -> String {
    location.pathname().to_string()
}

const READERS: &[(&str, Read)] = &[
    ("href", Location::href),
    ("protocol", Location::protocol),
    ("host", Location::host),
    ("hostname", Location::hostname),
    ("port", Location::port),
    ("pathname", pathname_text),
    ("search", Location::search),
    ("hash", Location::hash),
];

pub(crate) fn install(realm: &mut Realm) {
    let natives = realm.natives_mut();

    for &(name, read) in READERS {
        natives.getter("Location", name, move |realm, this, _| {
            let location = this_location(realm, this)?;
            let text = read(&location.borrow());
            Ok(Value::String(text))
        });
    }
    natives.method("Location", "toString", |realm, this, _| {
        let location = this_location(realm, this)?;
        let href = location.borrow().href();
        Ok(Value::String(href))
    });

    natives.setter("Location", "href", |realm, this, args| {
        let location = this_location(realm, this)?;
        let href = realm.to_string(&arg(args, 0))?;
        navigate(realm, &location, &href)?;
        Ok(Value::Undefined)
    });
    for name in ["assign", "replace"] {
        natives.method("Location", name, |realm, this, args| {
            let location = this_location(realm, this)?;
            let href = realm.to_string(&arg(args, 0))?;
            navigate(realm, &location, &href)?;
            Ok(Value::Undefined)
        });
    }
    natives.method("Location", "reload", |realm, this, _| {
        let location = this_location(realm, this)?;
        tracing::debug!(href = %location.borrow().href(), "reload requested");
        Ok(Value::Undefined)
    });
    natives.setter("Location", "hash", |realm, this, args| {
        let location = this_location(realm, this)?;
        let hash = realm.to_string(&arg(args, 0))?;
        location.borrow_mut().set_hash(&hash);
        let href = location.borrow().href();
        realm.set_document_url(&href);
        Ok(Value::Undefined)
    });
    natives.setter("Location", "search", |realm, this, args| {
        let location = this_location(realm, this)?;
        let search = realm.to_string(&arg(args, 0))?;
        location.borrow_mut().set_search(&search);
        let href = location.borrow().href();
        realm.set_document_url(&href);
        Ok(Value::Undefined)
    });
    natives.setter("Location", "pathname", |realm, this, args| {
        let location = this_location(realm, this)?;
        let path = realm.to_string(&arg(args, 0))?;
        location.borrow_mut().set_pathname(&path);
        let href = location.borrow().href();
        realm.set_document_url(&href);
        Ok(Value::Undefined)
    });

    // `window.location = url` navigates the existing object
    natives.setter("Window", "location", |realm, this, args| {
        let window = this
            .as_object()
            .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))?;
        let current = realm.obj(window).fields.get("location").cloned();
        let Some(current) = current else {
            return Ok(Value::Undefined);
        };
        let location = this_location(realm, &current)?;
        let href = realm.to_string(&arg(args, 0))?;
        navigate(realm, &location, &href)?;
        Ok(Value::Undefined)
    });
}
