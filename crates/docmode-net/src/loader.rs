//! Transports
//!
//! Where XHR requests actually go. The engine never touches a socket; a
//! transport turns a request into a canned or echoed response.

use crate::error::XhrError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// Outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Request {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response as delivered to the request object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default = "default_status_text")]
    pub status_text: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: String,
    /// Simulated time until the response arrives
    #[serde(default)]
    pub latency_ms: u64,
}

fn default_status() -> u16 {
    200
}

fn default_status_text() -> String {
    "OK".to_string()
}

impl Response {
    /// 200 OK with `body` of `content_type`
    pub fn ok(body: impl Into<String>, content_type: &str) -> Self {
        Self {
            status: default_status(),
            status_text: default_status_text(),
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body: body.into(),
            latency_ms: 0,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            status_text: "Not Found".to_string(),
            headers: Vec::new(),
            body: String::new(),
            latency_ms: 0,
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }
}

/// Turns requests into responses
pub trait Transport: fmt::Debug {
    fn fetch(&self, request: &Request) -> Result<Response, XhrError>;
}

/// Answers every request with its own body and content type
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoTransport;

impl Transport for EchoTransport {
    fn fetch(&self, request: &Request) -> Result<Response, XhrError> {
        let content_type = request.header("Content-Type").unwrap_or("text/xml");
        tracing::trace!(url = %request.url, "echo");
        Ok(Response::ok(request.body.clone().unwrap_or_default(), content_type))
    }
}

/// Canned responses keyed by URL; anything else is a 404
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StaticTransport {
    routes: HashMap<String, Response>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, response: Response) -> Self {
        self.routes.insert(url.to_string(), response);
        self
    }

    /// Routes from a JSON object of `url -> response`
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let routes = serde_json::from_str(json)?;
        Ok(Self { routes })
    }
}

impl Transport for StaticTransport {
    fn fetch(&self, request: &Request) -> Result<Response, XhrError> {
        match self.routes.get(request.url.as_str()) {
            Some(response) => Ok(response.clone()),
            None => {
                tracing::debug!(url = %request.url, "no canned response");
                Ok(Response::not_found())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str, body: Option<&str>) -> Request {
        Request {
            method: "POST".to_string(),
            url: Url::parse(url).unwrap(),
            headers: vec![("content-type".to_string(), "application/xml".to_string())],
            body: body.map(str::to_string),
        }
    }

    #[test]
    fn test_echo_returns_body() {
        let response = EchoTransport.fetch(&request("http://winetest.example.org/echo.php", Some("<a/>"))).unwrap();
        assert_eq!(response.body, "<a/>");
        assert_eq!(response.content_type(), Some("application/xml"));
        assert_eq!(response.status_text, "OK");
    }

    #[test]
    fn test_static_routes_from_json() {
        let transport = StaticTransport::from_json(
            r#"{"http://winetest.example.org/data.txt": {"body": "hello", "latency_ms": 50}}"#,
        )
        .unwrap();
        let hit = transport.fetch(&request("http://winetest.example.org/data.txt", None)).unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body, "hello");
        assert_eq!(hit.latency_ms, 50);

        let miss = transport.fetch(&request("http://winetest.example.org/missing", None)).unwrap();
        assert_eq!(miss.status, 404);
    }
}
