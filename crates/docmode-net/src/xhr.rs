//! XMLHttpRequest
//!
//! The request state machine, independent of any realm. Each transition
//! queues the events it causes; the caller drains and dispatches them.

use crate::error::XhrError;
use crate::loader::{Request, Response};
use crate::mime;
use crate::xml::XmlDocument;
use std::collections::VecDeque;
use url::Url;

/// XMLHttpRequest ready states
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum ReadyState {
    /// open() not called yet
    #[default]
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    /// responseText holds partial data
    Loading = 3,
    Done = 4,
}

/// `responseType` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    #[default]
    Default,
    Text,
    Document,
    ArrayBuffer,
    Blob,
    MsStream,
}

impl ResponseType {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "" => Self::Default,
            "text" => Self::Text,
            "document" => Self::Document,
            "arraybuffer" => Self::ArrayBuffer,
            "blob" => Self::Blob,
            "ms-stream" => Self::MsStream,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Text => "text",
            Self::Document => "document",
            Self::ArrayBuffer => "arraybuffer",
            Self::Blob => "blob",
            Self::MsStream => "ms-stream",
        }
    }
}

/// Events an XHR fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XhrEvent {
    ReadyStateChange,
    LoadStart,
    Progress,
    Load,
    LoadEnd,
    Abort,
    Timeout,
    Error,
}

impl XhrEvent {
    pub fn event_type(self) -> &'static str {
        match self {
            Self::ReadyStateChange => "readystatechange",
            Self::LoadStart => "loadstart",
            Self::Progress => "progress",
            Self::Load => "load",
            Self::LoadEnd => "loadend",
            Self::Abort => "abort",
            Self::Timeout => "timeout",
            Self::Error => "error",
        }
    }

    /// Mode from which the event is fired at all
    fn since(self) -> u8 {
        match self {
            Self::ReadyStateChange | Self::Timeout => 5,
            _ => 10,
        }
    }
}

/// What `response` holds for the current `responseType`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Empty,
    Text(String),
    Document(Option<XmlDocument>),
    Binary(Vec<u8>),
}

const METHODS: &[&str] = &["GET", "POST", "HEAD", "PUT", "DELETE", "OPTIONS", "PATCH"];

/// Check if header is forbidden
fn is_forbidden_header(name: &str) -> bool {
    matches!(name,
        "accept-charset" | "accept-encoding" | "access-control-request-headers" |
        "access-control-request-method" | "connection" | "content-length" |
        "cookie" | "cookie2" | "date" | "dnt" | "expect" | "host" |
        "keep-alive" | "origin" | "referer" | "te" | "trailer" |
        "transfer-encoding" | "upgrade" | "via"
    ) || name.starts_with("proxy-") || name.starts_with("sec-")
}

/// XMLHttpRequest object
#[derive(Debug, Default)]
pub struct XmlHttpRequest {
    mode: u8,
    ready_state: ReadyState,
    method: String,
    url: Option<Url>,
    async_flag: bool,
    request_headers: Vec<(String, String)>,
    send_flag: bool,
    /// Bumped by open() and abort(); stale deliveries are dropped
    generation: u64,
    incoming: Option<Result<Response, XhrError>>,
    response: Option<Response>,
    body_received: bool,
    response_type: ResponseType,
    override_mime: Option<String>,
    pub timeout_ms: u64,
    pub with_credentials: bool,
    events: VecDeque<XhrEvent>,
}

impl XmlHttpRequest {
    /// New request object for a document in `mode`
    pub fn new(mode: u8) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_async(&self) -> bool {
        self.async_flag
    }

    /// Request in flight
    pub fn is_sending(&self) -> bool {
        self.send_flag
    }

    fn queue(&mut self, event: XhrEvent) {
        if self.mode >= event.since() {
            self.events.push_back(event);
        }
    }

    /// Drain the events queued since the last call
    pub fn take_events(&mut self) -> Vec<XhrEvent> {
        self.events.drain(..).collect()
    }

    /// Open the request; `url` resolves against `base`
    pub fn open(
        &mut self,
        method: &str,
        url: &str,
        async_flag: Option<bool>,
        base: Option<&Url>,
    ) -> Result<(), XhrError> {
        let async_flag = match async_flag {
            Some(a) => a,
            None if self.mode < 10 => return Err(XhrError::MissingAsync),
            None => true,
        };
        let upper = method.to_ascii_uppercase();
        if !METHODS.contains(&upper.as_str()) {
            return Err(XhrError::UnsupportedMethod(method.to_string()));
        }
        let url = match base {
            Some(base) => base.join(url)?,
            None => Url::parse(url)?,
        };
        tracing::debug!(method = %upper, %url, async_flag, "xhr open");

        self.method = upper;
        self.url = Some(url);
        self.async_flag = async_flag;
        self.request_headers.clear();
        self.send_flag = false;
        self.generation += 1;
        self.incoming = None;
        self.response = None;
        self.body_received = false;
        self.ready_state = ReadyState::Opened;
        self.queue(XhrEvent::ReadyStateChange);
        Ok(())
    }

    /// Set request header
    pub fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), XhrError> {
        if self.ready_state != ReadyState::Opened || self.send_flag {
            return Err(XhrError::InvalidState);
        }
        let lower = name.to_ascii_lowercase();
        if is_forbidden_header(&lower) {
            return Err(XhrError::ForbiddenHeader(name.to_string()));
        }
        // Combine with existing header if present
        match self
            .request_headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => self.request_headers.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Start the request and hand back what must be fetched
    pub fn send(&mut self, body: Option<String>) -> Result<Request, XhrError> {
        if self.ready_state != ReadyState::Opened || self.send_flag {
            return Err(XhrError::InvalidState);
        }
        let url = self.url.clone().ok_or(XhrError::InvalidState)?;
        let body = match self.method.as_str() {
            "GET" | "HEAD" => None,
            _ => body,
        };
        self.send_flag = true;
        self.queue(XhrEvent::LoadStart);
        tracing::debug!(method = %self.method, %url, "xhr send");
        Ok(Request {
            method: self.method.clone(),
            url,
            headers: self.request_headers.clone(),
            body,
        })
    }

    /// Hand the outcome of request `generation` to the object. Returns
    /// false when the request was aborted or reopened meanwhile.
    pub fn receive(&mut self, generation: u64, result: Result<Response, XhrError>) -> bool {
        if generation != self.generation || !self.send_flag || self.incoming.is_some() {
            tracing::trace!(generation, current = self.generation, "stale xhr delivery dropped");
            return false;
        }
        let result = match result {
            Ok(response) if self.timeout_ms > 0 && response.latency_ms > self.timeout_ms => Err(XhrError::Timeout),
            other => other,
        };
        self.incoming = Some(result);
        true
    }

    /// Advance a received response by one ready state. Returns false once
    /// there is nothing left to do.
    pub fn step(&mut self) -> bool {
        let Some(incoming) = self.incoming.as_ref() else {
            return false;
        };
        match incoming {
            Err(err) => {
                let event = if *err == XhrError::Timeout {
                    XhrEvent::Timeout
                } else {
                    XhrEvent::Error
                };
                tracing::debug!(error = %err, "xhr failed");
                self.incoming = None;
                self.send_flag = false;
                self.ready_state = ReadyState::Done;
                self.queue(XhrEvent::ReadyStateChange);
                self.queue(event);
                self.queue(XhrEvent::LoadEnd);
            }
            Ok(response) => match self.ready_state {
                ReadyState::Opened => {
                    self.response = Some(response.clone());
                    self.ready_state = ReadyState::HeadersReceived;
                    self.queue(XhrEvent::ReadyStateChange);
                }
                ReadyState::HeadersReceived => {
                    self.body_received = true;
                    self.ready_state = ReadyState::Loading;
                    self.queue(XhrEvent::ReadyStateChange);
                    self.queue(XhrEvent::Progress);
                }
                _ => {
                    self.incoming = None;
                    self.send_flag = false;
                    self.ready_state = ReadyState::Done;
                    tracing::debug!(status = self.status(), "xhr done");
                    self.queue(XhrEvent::ReadyStateChange);
                    self.queue(XhrEvent::Load);
                    self.queue(XhrEvent::LoadEnd);
                }
            },
        }
        true
    }

    /// Cancel the request in flight
    pub fn abort(&mut self) {
        self.generation += 1;
        self.incoming = None;
        if !self.send_flag {
            return;
        }
        tracing::debug!("xhr aborted");
        self.send_flag = false;
        self.response = None;
        self.body_received = false;
        self.ready_state = ReadyState::Unsent;
        self.queue(XhrEvent::Abort);
        self.queue(XhrEvent::LoadEnd);
    }

    pub fn status(&self) -> u16 {
        match &self.response {
            Some(r) if self.ready_state >= ReadyState::HeadersReceived => r.status,
            _ => 0,
        }
    }

    pub fn status_text(&self) -> &str {
        match &self.response {
            Some(r) if self.ready_state >= ReadyState::HeadersReceived => &r.status_text,
            _ => "",
        }
    }

    /// Get response header
    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response.as_ref().and_then(|r| r.header(name))
    }

    /// Get all response headers as string
    pub fn all_response_headers(&self) -> String {
        let Some(response) = &self.response else {
            return String::new();
        };
        response
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}\r\n"))
            .collect()
    }

    /// Override MIME type
    pub fn override_mime_type(&mut self, mime: &str) -> Result<(), XhrError> {
        if self.ready_state >= ReadyState::Loading {
            return Err(XhrError::InvalidState);
        }
        self.override_mime = Some(mime.to_string());
        Ok(())
    }

    /// MIME type used to interpret the body
    pub fn effective_mime(&self) -> Option<&str> {
        self.override_mime
            .as_deref()
            .or_else(|| self.response.as_ref().and_then(|r| r.content_type()))
    }

    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    /// Unknown values are ignored; changing it while loading is an error
    pub fn set_response_type(&mut self, value: &str) -> Result<(), XhrError> {
        if self.ready_state >= ReadyState::Loading {
            return Err(XhrError::InvalidState);
        }
        if let Some(ty) = ResponseType::parse(value) {
            self.response_type = ty;
        }
        Ok(())
    }

    fn body(&self) -> Option<&str> {
        match &self.response {
            Some(r) if self.body_received => Some(&r.body),
            _ => None,
        }
    }

    pub fn response_text(&self) -> &str {
        self.body().unwrap_or_default()
    }

    /// Parsed body when the request is done and the MIME type is XML
    pub fn response_xml(&self) -> Option<XmlDocument> {
        if self.ready_state != ReadyState::Done {
            return None;
        }
        let body = self.body()?;
        if !self.effective_mime().is_some_and(mime::is_xml_mime) {
            return None;
        }
        match XmlDocument::parse(body) {
            Ok(doc) => Some(doc),
            Err(err) => {
                tracing::debug!(error = %err, "response is not well-formed XML");
                None
            }
        }
    }

    /// `response` according to `responseType`
    pub fn response(&self) -> ResponseBody {
        match self.response_type {
            ResponseType::Default | ResponseType::Text => ResponseBody::Text(self.response_text().to_string()),
            ResponseType::Document => ResponseBody::Document(self.response_xml()),
            ResponseType::ArrayBuffer | ResponseType::Blob | ResponseType::MsStream => {
                if self.ready_state == ReadyState::Done {
                    ResponseBody::Binary(self.response_text().as_bytes().to_vec())
                } else {
                    ResponseBody::Empty
                }
            }
        }
    }
}
