//! docmode Net - XMLHttpRequest for the docmode engine
//!
//! Request lifecycle, response typing and transports.
//!
//! Features:
//! - Ready state machine with abort, timeout and stale-delivery protection
//! - MIME sniffing table for `responseXML`
//! - Echo and canned transports, no real sockets

mod bindings;
mod error;
mod loader;
pub mod mime;
mod xhr;
mod xml;

pub use bindings::{deliver, install, Network, PendingSend, XhrHandle};
pub use error::XhrError;
pub use loader::{EchoTransport, Request, Response, StaticTransport, Transport};
pub use mime::is_xml_mime;
pub use url::Url;
pub use xhr::{ReadyState, ResponseBody, ResponseType, XhrEvent, XmlHttpRequest};
pub use xml::XmlDocument;
