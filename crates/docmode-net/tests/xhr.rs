//! XMLHttpRequest integration tests
//!
//! Requests driven through realm natives, completed by a transport.

use docmode_dom::{DocumentMode, ErrorKind, ObjectId, Realm, Value};
use docmode_net::{EchoTransport, Network, Response, StaticTransport};
use std::cell::RefCell;
use std::rc::Rc;

const URL: &str = "http://winetest.example.org/index.html";
const XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a name=\"test\">wine</a>";

fn setup(mode: DocumentMode, network: &Network) -> (Realm, Value) {
    let mut realm = Realm::new(mode);
    realm.set_document_url(URL);
    docmode_net::install(&mut realm, network);
    let window = realm.window();
    let ctor = realm.get(window, "XMLHttpRequest").unwrap();
    let xhr = realm.construct(&ctor, &[]).unwrap();
    (realm, xhr)
}

fn flush(realm: &mut Realm, network: &Network) {
    for pending in network.take_pending() {
        network.complete(realm, pending).unwrap();
    }
}

/// Record `label` into `log` whenever the `handler` fires
fn on(realm: &mut Realm, xhr: &Value, handler: &str, label: &'static str, log: &Rc<RefCell<Vec<String>>>) {
    let log = log.clone();
    let f = realm.create_native_closure(handler, 0, move |realm, this, _| {
        let id = this.as_object().unwrap();
        let state = realm.get(id, "readyState").unwrap();
        log.borrow_mut().push(format!("{label}:{}", realm.to_string(&state).unwrap()));
        Ok(Value::Undefined)
    });
    realm.set(xhr.as_object().unwrap(), handler, Value::Object(f)).unwrap();
}

fn get(realm: &mut Realm, xhr: &Value, name: &str) -> Value {
    realm.get(xhr.as_object().unwrap(), name).unwrap()
}

// ============================================================================
// ECHO SCENARIO
// ============================================================================

#[test]
fn test_echo_xml_round_trip() {
    for mode in [DocumentMode::IE8, DocumentMode::IE9, DocumentMode::IE10, DocumentMode::IE11] {
        let network = Network::new(Rc::new(EchoTransport));
        let (mut realm, xhr) = setup(mode, &network);
        let log = Rc::new(RefCell::new(Vec::new()));
        on(&mut realm, &xhr, "onreadystatechange", "rsc", &log);

        realm
            .call_method(&xhr, "open", &[Value::string("POST"), Value::string("echo.php"), Value::Bool(true)])
            .unwrap();
        realm
            .call_method(&xhr, "setRequestHeader", &[Value::string("X-Test"), Value::string("True")])
            .unwrap();
        realm.call_method(&xhr, "send", &[Value::string(XML)]).unwrap();
        assert_eq!(get(&mut realm, &xhr, "readyState"), Value::from(1), "{mode}");

        flush(&mut realm, &network);
        assert_eq!(*log.borrow(), vec!["rsc:1", "rsc:2", "rsc:3", "rsc:4"], "{mode}");
        assert_eq!(get(&mut realm, &xhr, "responseText"), Value::string(XML), "{mode}");
        assert_eq!(get(&mut realm, &xhr, "statusText"), Value::string("OK"), "{mode}");
        assert!(get(&mut realm, &xhr, "responseXML").as_object().is_some(), "{mode}");
    }
}

#[test]
fn test_response_xml_shape_per_mode() {
    let expected = [
        (DocumentMode::IE9, "[object Object]", None),
        (DocumentMode::IE10, "[object Document]", Some("Document")),
        (DocumentMode::IE11, "[object XMLDocument]", Some("XMLDocument")),
    ];
    for (mode, tag, proto) in expected {
        let network = Network::new(Rc::new(EchoTransport));
        let (mut realm, xhr) = setup(mode, &network);
        realm
            .call_method(&xhr, "open", &[Value::string("POST"), Value::string("echo.php"), Value::Bool(true)])
            .unwrap();
        realm.call_method(&xhr, "send", &[Value::string(XML)]).unwrap();
        flush(&mut realm, &network);

        let doc = get(&mut realm, &xhr, "responseXML");
        let id: ObjectId = doc.as_object().unwrap();
        assert_eq!(realm.object_to_string(&doc), tag);
        assert_eq!(realm.get_prototype_of(id), proto.and_then(|p| realm.prototype(p)), "{mode}");

        if mode == DocumentMode::IE9 {
            assert!(!realm.has(id, "anchors"));
            assert!(realm.has_own(id, "createElement"));
        } else {
            assert!(realm.has(id, "anchors"));
            assert!(!realm.has_own(id, "createElement"));
            let anchors = realm.get(id, "anchors").unwrap();
            assert_eq!(realm.get(anchors.as_object().unwrap(), "length").unwrap(), Value::from(0));
        }

        // same object on every read
        assert_eq!(get(&mut realm, &xhr, "responseXML"), doc);
    }
}

#[test]
fn test_onload_from_ie10() {
    for (mode, fired) in [(DocumentMode::IE9, false), (DocumentMode::IE10, true), (DocumentMode::IE11, true)] {
        let network = Network::new(Rc::new(EchoTransport));
        let (mut realm, xhr) = setup(mode, &network);
        let log = Rc::new(RefCell::new(Vec::new()));
        on(&mut realm, &xhr, "onload", "load", &log);
        realm
            .call_method(&xhr, "open", &[Value::string("POST"), Value::string("echo.php"), Value::Bool(true)])
            .unwrap();
        realm.call_method(&xhr, "send", &[Value::string("x")]).unwrap();
        flush(&mut realm, &network);
        assert_eq!(log.borrow().len(), usize::from(fired), "{mode}");
    }
}

// ============================================================================
// OPEN AND SEND
// ============================================================================

#[test]
fn test_open_async_argument() {
    let network = Network::new(Rc::new(EchoTransport));
    let (mut realm, xhr) = setup(DocumentMode::IE9, &network);
    let err = realm
        .call_method(&xhr, "open", &[Value::string("GET"), Value::string("a.txt")])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArg);

    let (mut realm, xhr) = setup(DocumentMode::IE10, &network);
    realm
        .call_method(&xhr, "open", &[Value::string("GET"), Value::string("a.txt")])
        .unwrap();
    assert_eq!(get(&mut realm, &xhr, "readyState"), Value::from(1));
}

#[test]
fn test_synchronous_send_completes_inline() {
    let transport = StaticTransport::new().route(
        "http://winetest.example.org/data.txt",
        Response::ok("hello", "text/plain"),
    );
    let network = Network::new(Rc::new(transport));
    let (mut realm, xhr) = setup(DocumentMode::IE11, &network);
    realm
        .call_method(&xhr, "open", &[Value::string("GET"), Value::string("data.txt"), Value::Bool(false)])
        .unwrap();
    realm.call_method(&xhr, "send", &[]).unwrap();

    assert!(!network.has_pending());
    assert_eq!(get(&mut realm, &xhr, "readyState"), Value::from(4));
    assert_eq!(get(&mut realm, &xhr, "status"), Value::from(200));
    assert_eq!(get(&mut realm, &xhr, "responseText"), Value::string("hello"));
    assert_eq!(get(&mut realm, &xhr, "responseXML"), Value::Null);
    assert_eq!(
        realm
            .call_method(&xhr, "getResponseHeader", &[Value::string("content-type")])
            .unwrap(),
        Value::string("text/plain")
    );
}

#[test]
fn test_forbidden_header_throws() {
    let network = Network::new(Rc::new(EchoTransport));
    let (mut realm, xhr) = setup(DocumentMode::IE11, &network);
    realm
        .call_method(&xhr, "open", &[Value::string("GET"), Value::string("a.txt"), Value::Bool(true)])
        .unwrap();
    assert!(realm
        .call_method(&xhr, "setRequestHeader", &[Value::string("Host"), Value::string("x")])
        .is_err());
}

// ============================================================================
// CANCELLATION
// ============================================================================

#[test]
fn test_abort_fires_abort_and_never_load() {
    let network = Network::new(Rc::new(EchoTransport));
    let (mut realm, xhr) = setup(DocumentMode::IE11, &network);
    let log = Rc::new(RefCell::new(Vec::new()));
    on(&mut realm, &xhr, "onload", "load", &log);
    on(&mut realm, &xhr, "onabort", "abort", &log);

    realm
        .call_method(&xhr, "open", &[Value::string("POST"), Value::string("echo.php"), Value::Bool(true)])
        .unwrap();
    realm.call_method(&xhr, "send", &[Value::string("x")]).unwrap();
    on(&mut realm, &xhr, "onreadystatechange", "rsc", &log);
    realm.call_method(&xhr, "abort", &[]).unwrap();
    flush(&mut realm, &network);

    assert_eq!(*log.borrow(), vec!["abort:0"]);
    assert_eq!(get(&mut realm, &xhr, "responseText"), Value::string(""));
}

#[test]
fn test_timeout_excludes_load() {
    let transport = StaticTransport::new().route(
        "http://winetest.example.org/slow",
        Response::ok("late", "text/plain").with_latency(500),
    );
    let network = Network::new(Rc::new(transport));
    let (mut realm, xhr) = setup(DocumentMode::IE11, &network);
    let log = Rc::new(RefCell::new(Vec::new()));
    on(&mut realm, &xhr, "onload", "load", &log);
    on(&mut realm, &xhr, "ontimeout", "timeout", &log);

    realm
        .call_method(&xhr, "open", &[Value::string("GET"), Value::string("slow"), Value::Bool(true)])
        .unwrap();
    realm.set(xhr.as_object().unwrap(), "timeout", Value::from(100)).unwrap();
    assert_eq!(get(&mut realm, &xhr, "timeout"), Value::from(100));
    realm.call_method(&xhr, "send", &[]).unwrap();
    flush(&mut realm, &network);

    assert_eq!(*log.borrow(), vec!["timeout:4"]);
}
