//! Engine integration tests
//!
//! Windows, frames and the event loop driven through the public API.

use docmode_dom::{DocumentMode, DomResult, ErrorKind, Realm, Value};
use docmode_engine::{ContextId, Engine, EngineConfig, LoadState, DEFAULT_URL};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn engine(mode: DocumentMode) -> Engine {
    Engine::new(EngineConfig::with_mode(mode))
}

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn text(realm: &mut Realm, obj: &Value, name: &str) -> String {
    let v = realm.get_value(obj, name).unwrap();
    realm.to_string(&v).unwrap()
}

/// Install a handler named `handler` on `target` that logs `label`
/// followed by the event fields named in `fields`
fn record(
    engine: &mut Engine,
    id: ContextId,
    target: Value,
    handler: &str,
    label: &'static str,
    fields: &'static [&'static str],
    log: &Log,
) {
    let log = log.clone();
    let realm = engine.realm_mut(id).unwrap();
    let f = realm.create_native_closure(handler, 1, move |realm, _, args| {
        let mut entry = label.to_string();
        match args.first() {
            None => entry.push_str(":noarg"),
            Some(event) => {
                for name in fields {
                    entry.push(':');
                    entry.push_str(&text(realm, event, name));
                }
            }
        }
        log.borrow_mut().push(entry);
        Ok(Value::Undefined)
    });
    realm.set(target.as_object().unwrap(), handler, Value::Object(f)).unwrap();
}

fn window(engine: &Engine, id: ContextId) -> Value {
    engine.context(id).unwrap().window()
}

fn document(engine: &Engine, id: ContextId) -> Value {
    engine.context(id).unwrap().document()
}

// ============================================================================
// POSTMESSAGE
// ============================================================================

fn post(engine: &mut Engine, id: ContextId, data: Value, origin: Value) -> DomResult<Value> {
    let window = window(engine, id);
    engine
        .realm_mut(id)
        .unwrap()
        .call_method(&window, "postMessage", &[data, origin])
}

#[test]
fn test_post_message_per_mode() {
    for mode in [
        DocumentMode::QUIRKS,
        DocumentMode::IE8,
        DocumentMode::IE9,
        DocumentMode::IE10,
        DocumentMode::IE11,
    ] {
        let v = mode.version();
        let mut engine = engine(mode);
        let id = engine.open(DEFAULT_URL).unwrap();
        engine.load(id).unwrap();

        let log: Rc<RefCell<Vec<Option<(Value, Value, bool)>>>> = Rc::new(RefCell::new(Vec::new()));
        let seen = log.clone();
        let realm = engine.realm_mut(id).unwrap();
        let handler = realm.create_native_closure("onmessage", 1, move |realm, _, args| {
            let entry = match args.first() {
                None => None,
                Some(e) => {
                    let data = realm.get_value(e, "data")?;
                    let origin = realm.get_value(e, "origin")?;
                    let source = realm.get_value(e, "source")?;
                    Some((data, origin, source == Value::Object(realm.window())))
                }
            };
            seen.borrow_mut().push(entry);
            Ok(Value::Undefined)
        });
        let win = realm.window();
        realm.set(win, "onmessage", Value::Object(handler)).unwrap();

        // malformed targets throw
        let obj = Value::Object(realm.create_object());
        let func = Value::Object(realm.create_native_closure("f", 0, |_, _, _| {
            Ok(Value::string("http://winetest.example.org"))
        }));
        let invalid = [
            if v < 10 { obj } else { Value::Null },
            func,
            Value::string("winetest.example.org"),
            Value::string("example.org"),
            Value::Undefined,
        ];
        for (i, target) in invalid.into_iter().enumerate() {
            let err = post(&mut engine, id, Value::string("invalid"), target).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Syntax, "mode {v} target {i}");
        }
        let err = post(&mut engine, id, Value::string("invalid empty"), Value::string("")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArg, "mode {v}");

        // legacy modes ignore the port and deliver on the spot
        post(&mut engine, id, Value::string("wrong port"), Value::string("http://winetest.example.org:1234")).unwrap();
        assert_eq!(log.borrow().len(), usize::from(v < 9), "mode {v}");
        engine.run_until_idle().unwrap();
        assert_eq!(log.borrow().len(), usize::from(v < 9), "mode {v}");
        log.borrow_mut().clear();

        for target in [
            "http://winetest.example.com",
            "ftp://winetest.example.org",
            "http://wine.example.org",
            "http://example.org",
        ] {
            post(&mut engine, id, Value::string("not sent"), Value::string(target)).unwrap();
        }
        engine.run_until_idle().unwrap();
        assert!(log.borrow().is_empty(), "mode {v}");

        let star = if v < 10 {
            Value::string("*")
        } else {
            let realm = engine.realm_mut(id).unwrap();
            let obj = realm.create_object();
            let to_string = realm.create_native_closure("toString", 0, |_, _, _| Ok(Value::string("*")));
            realm.set(obj, "toString", Value::Object(to_string)).unwrap();
            Value::Object(obj)
        };
        post(&mut engine, id, Value::from(10), star).unwrap();
        if v < 9 {
            assert_eq!(*log.borrow(), vec![None], "mode {v}");
            continue;
        }
        assert!(log.borrow().is_empty(), "mode {v}: delivered synchronously");
        assert_eq!(engine.run_until_idle().unwrap(), 1);
        let expected_data = if v < 10 { Value::string("10") } else { Value::from(10) };
        assert_eq!(
            *log.borrow(),
            vec![Some((expected_data, Value::string("http://winetest.example.org"), true))],
            "mode {v}"
        );
    }
}

#[test]
fn test_post_message_clones_objects() {
    let mut engine = engine(DocumentMode::IE11);
    let id = engine.open(DEFAULT_URL).unwrap();
    let log = new_log();
    let seen = log.clone();
    let realm = engine.realm_mut(id).unwrap();
    let handler = realm.create_native_closure("onmessage", 1, move |realm, _, args| {
        let data = realm.get_value(&args[0], "data")?;
        let answer = realm.get_value(&data, "answer")?;
        seen.borrow_mut().push(realm.to_string(&answer)?);
        Ok(Value::Undefined)
    });
    let win = realm.window();
    realm.set(win, "onmessage", Value::Object(handler)).unwrap();
    let payload = realm.create_object();
    realm.set(payload, "answer", Value::from(42)).unwrap();

    post(&mut engine, id, Value::Object(payload), Value::string("*")).unwrap();
    // mutations after posting are not seen by the receiver
    engine.realm_mut(id).unwrap().set(payload, "answer", Value::from(0)).unwrap();
    engine.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["42"]);

    // host objects cannot be cloned
    let document = document(&engine, id);
    let err = post(&mut engine, id, document, Value::string("*")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArg);
}

// ============================================================================
// STORAGE EVENTS
// ============================================================================

const STORAGE_FIELDS: &[&str] = &["key", "oldValue", "newValue", "url"];

fn storage_call(engine: &mut Engine, id: ContextId, area: &str, method: &str, args: &[Value]) {
    let window = window(engine, id);
    let realm = engine.realm_mut(id).unwrap();
    let storage = realm.get_value(&window, area).unwrap();
    realm.call_method(&storage, method, args).unwrap();
}

/// Top window, a same-origin frame and an about:blank frame
fn frames(mode: DocumentMode) -> (Engine, ContextId, ContextId, ContextId) {
    let mut engine = engine(mode);
    let top = engine.open("http://winetest.example.org/index.html#frag").unwrap();
    let frame = engine.create_iframe(top, "blank.html").unwrap();
    let blank = engine.create_iframe(top, "about:blank").unwrap();
    engine.load(top).unwrap();
    (engine, top, frame, blank)
}

#[test]
fn test_session_storage_events() {
    let (mut engine, top, frame, blank) = frames(DocumentMode::IE10);
    let log = new_log();
    for (id, label) in [(top, "top"), (frame, "frame"), (blank, "blank")] {
        let w = window(&engine, id);
        record(&mut engine, id, w, "onstorage", label, STORAGE_FIELDS, &log);
    }
    let url = "http://winetest.example.org/index.html";

    // removing a missing key changes nothing
    storage_call(&mut engine, top, "sessionStorage", "removeItem", &[Value::string("foobar")]);
    assert_eq!(engine.run_until_idle().unwrap(), 0);
    assert!(log.borrow().is_empty());

    storage_call(
        &mut engine,
        top,
        "sessionStorage",
        "setItem",
        &[Value::string("foobar"), Value::string("test")],
    );
    assert!(log.borrow().is_empty(), "storage events are asynchronous");
    engine.run_until_idle().unwrap();
    assert_eq!(
        *log.borrow(),
        vec![format!("frame:foobar::test:{url}"), format!("top:foobar::test:{url}")]
    );
    log.borrow_mut().clear();

    storage_call(
        &mut engine,
        frame,
        "sessionStorage",
        "setItem",
        &[Value::string("foobar"), Value::string("TEST")],
    );
    engine.run_until_idle().unwrap();
    let frame_url = "http://winetest.example.org/blank.html";
    assert_eq!(
        *log.borrow(),
        vec![format!("top:foobar:test:TEST:{frame_url}"), format!("frame:foobar:test:TEST:{frame_url}")]
    );
    log.borrow_mut().clear();

    storage_call(&mut engine, top, "sessionStorage", "clear", &[]);
    engine.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec![format!("frame::::{url}"), format!("top::::{url}")]);
}

#[test]
fn test_local_storage_events_and_commit() {
    let (mut engine, top, frame, _) = frames(DocumentMode::IE11);
    let log = new_log();
    for (id, label) in [(top, "top"), (frame, "frame")] {
        let w = window(&engine, id);
        record(&mut engine, id, w, "onstorage", label, STORAGE_FIELDS, &log);
        let d = document(&engine, id);
        let commit = if id == top { "top-commit" } else { "frame-commit" };
        record(&mut engine, id, d, "onstoragecommit", commit, STORAGE_FIELDS, &log);
    }

    storage_call(
        &mut engine,
        top,
        "localStorage",
        "setItem",
        &[Value::string("winetest"), Value::string("WineTest")],
    );
    engine.run_until_idle().unwrap();
    let url = "http://winetest.example.org/index.html";
    assert_eq!(
        *log.borrow(),
        vec![format!("frame:winetest::WineTest:{url}"), format!("top-commit::::{url}")]
    );

    // both windows see the same area
    let w = window(&engine, frame);
    let realm = engine.realm_mut(frame).unwrap();
    let storage = realm.get_value(&w, "localStorage").unwrap();
    let value = realm.call_method(&storage, "getItem", &[Value::string("winetest")]).unwrap();
    assert_eq!(value, Value::string("WineTest"));
}

#[test]
fn test_legacy_storage_events_go_to_document() {
    let (mut engine, top, frame, _) = frames(DocumentMode::IE8);
    assert_eq!(engine.context(frame).unwrap().mode(), DocumentMode::QUIRKS);
    let log = new_log();
    for (id, label) in [(top, "top"), (frame, "frame")] {
        let d = document(&engine, id);
        record(&mut engine, id, d, "onstorage", label, STORAGE_FIELDS, &log);
    }

    storage_call(
        &mut engine,
        frame,
        "sessionStorage",
        "setItem",
        &[Value::string("foobar"), Value::string("test")],
    );
    engine.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["top:noarg", "frame:noarg"]);
}

#[test]
fn test_unloaded_frames_hear_nothing() {
    let (mut engine, top, frame, _) = frames(DocumentMode::IE10);
    let log = new_log();
    let w = window(&engine, frame);
    record(&mut engine, frame, w, "onstorage", "frame", STORAGE_FIELDS, &log);
    engine.unload(frame).unwrap();
    assert_eq!(engine.context(frame).unwrap().state(), LoadState::Unloaded);

    storage_call(
        &mut engine,
        top,
        "sessionStorage",
        "setItem",
        &[Value::string("k"), Value::string("v")],
    );
    engine.run_until_idle().unwrap();
    assert!(log.borrow().is_empty());
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn test_page_transition_order() {
    for (mode, transitions) in [(DocumentMode::IE10, false), (DocumentMode::IE11, true)] {
        let mut engine = engine(mode);
        let id = engine.open(DEFAULT_URL).unwrap();
        let log = new_log();
        let w = window(&engine, id);
        for (handler, label) in [
            ("onload", "load"),
            ("onpageshow", "pageshow"),
            ("onpagehide", "pagehide"),
            ("onunload", "unload"),
        ] {
            let log = log.clone();
            let realm = engine.realm_mut(id).unwrap();
            if !realm.has(w.as_object().unwrap(), handler) {
                continue;
            }
            let f = realm.create_native_closure(handler, 1, move |realm, _, args| {
                let document = Value::Object(realm.document());
                let state = text(realm, &document, "readyState");
                let persisted = match args.first() {
                    Some(e) if label.starts_with("page") => format!(":{}", text(realm, e, "persisted")),
                    _ => String::new(),
                };
                log.borrow_mut().push(format!("{label}:{state}{persisted}"));
                Ok(Value::Undefined)
            });
            realm.set(w.as_object().unwrap(), handler, Value::Object(f)).unwrap();
        }

        engine.load(id).unwrap();
        engine.unload(id).unwrap();
        let expected: Vec<&str> = if transitions {
            vec![
                "load:complete",
                "pageshow:complete:false",
                "pagehide:complete:false",
                "unload:complete",
            ]
        } else {
            vec!["load:complete", "unload:complete"]
        };
        assert_eq!(*log.borrow(), expected, "{mode}");
    }
}

#[test]
fn test_legacy_load_handler_gets_no_event() {
    let mut engine = engine(DocumentMode::IE8);
    let id = engine.open(DEFAULT_URL).unwrap();
    let log = new_log();
    let w = window(&engine, id);
    record(&mut engine, id, w, "onload", "load", &["type"], &log);
    engine.load(id).unwrap();
    assert_eq!(*log.borrow(), vec!["load:noarg"]);
}

#[test]
fn test_performance_timing_is_ordered() {
    let mut engine = Engine::new(EngineConfig {
        document_mode: Some(9),
        navigation_start_ms: 5000.0,
        ..EngineConfig::default()
    });
    let id = engine.open(DEFAULT_URL).unwrap();
    engine.load(id).unwrap();
    let realm = engine.realm_mut(id).unwrap();

    let order = [
        "navigationStart",
        "fetchStart",
        "domainLookupStart",
        "domainLookupEnd",
        "connectStart",
        "connectEnd",
        "requestStart",
        "responseStart",
        "responseEnd",
        "domLoading",
        "domInteractive",
        "domContentLoadedEventStart",
        "domContentLoadedEventEnd",
        "domComplete",
        "loadEventStart",
        "loadEventEnd",
    ];
    let times: Vec<f64> = order.iter().map(|f| realm.timing_value(f).unwrap()).collect();
    assert_eq!(times[0], 5000.0);
    assert!(times.windows(2).all(|w| w[0] <= w[1]), "{times:?}");
    for unset in ["unloadEventStart", "unloadEventEnd", "redirectStart", "redirectEnd"] {
        assert_eq!(realm.timing_value(unset).unwrap(), 0.0, "{unset}");
    }
}

// ============================================================================
// FRAMES AND CONFIGURATION
// ============================================================================

#[test]
fn test_iframe_document_mode() {
    for (parent, child) in [
        (DocumentMode::QUIRKS, DocumentMode::QUIRKS),
        (DocumentMode::IE8, DocumentMode::QUIRKS),
        (DocumentMode::IE9, DocumentMode::IE9),
        (DocumentMode::IE11, DocumentMode::IE11),
    ] {
        let mut engine = engine(parent);
        let top = engine.open(DEFAULT_URL).unwrap();
        let frame = engine.create_iframe(top, "blank.html").unwrap();
        assert_eq!(engine.context(top).unwrap().frames(), &[frame]);
        assert_eq!(engine.context(frame).unwrap().parent(), Some(top));

        let d = document(&engine, frame);
        let realm = engine.realm_mut(frame).unwrap();
        let mode = realm.get_value(&d, "documentMode").unwrap();
        assert_eq!(mode, Value::from(i32::from(child.version())), "{parent}");
    }
}

#[test]
fn test_config_user_agent_and_location() {
    let config = EngineConfig::from_json(
        r#"{"document_mode": 11, "url": "http://winetest.example.org/test/page.html?x=1", "user_agent": "docmode-test"}"#,
    )
    .unwrap();
    let mut engine = Engine::new(config);
    let id = engine.open_default().unwrap();
    let w = window(&engine, id);
    let realm = engine.realm_mut(id).unwrap();

    let navigator = realm.get_value(&w, "navigator").unwrap();
    assert_eq!(text(realm, &navigator, "userAgent"), "docmode-test");
    let location = realm.get_value(&w, "location").unwrap();
    assert_eq!(text(realm, &location, "pathname"), "/test/page.html");
    assert_eq!(text(realm, &location, "search"), "?x=1");
}

// ============================================================================
// TIMERS AND XHR
// ============================================================================

#[test]
fn test_timers_run_in_due_order() {
    let mut engine = engine(DocumentMode::IE10);
    let id = engine.open(DEFAULT_URL).unwrap();
    let log = new_log();
    let w = window(&engine, id);
    let realm = engine.realm_mut(id).unwrap();

    let schedule = |realm: &mut Realm, label: &'static str, delay: i32| {
        let log = log.clone();
        let f = realm.create_native_closure("cb", 0, move |_, _, _| {
            log.borrow_mut().push(label.to_string());
            Ok(Value::Undefined)
        });
        realm
            .call_method(&w, "setTimeout", &[Value::Object(f), Value::from(delay)])
            .unwrap()
    };
    schedule(realm, "late", 50);
    let cancelled = schedule(realm, "cancelled", 10);
    schedule(realm, "first", 0);
    realm.call_method(&w, "clearTimeout", &[cancelled]).unwrap();

    assert!(log.borrow().is_empty());
    assert_eq!(engine.run_until_idle().unwrap(), 2);
    assert_eq!(*log.borrow(), vec!["first", "late"]);
    assert_eq!(engine.event_loop().borrow().current_time(), 50);
}

#[test]
fn test_async_xhr_completes_in_event_loop() {
    let mut engine = engine(DocumentMode::IE10);
    let id = engine.open(DEFAULT_URL).unwrap();
    let log = new_log();
    let w = window(&engine, id);
    let realm = engine.realm_mut(id).unwrap();
    let ctor = realm.get_value(&w, "XMLHttpRequest").unwrap();
    let xhr = realm.construct(&ctor, &[]).unwrap();
    record(&mut engine, id, xhr.clone(), "onload", "load", &["type"], &log);

    let realm = engine.realm_mut(id).unwrap();
    realm
        .call_method(&xhr, "open", &[Value::string("POST"), Value::string("echo.php"), Value::Bool(true)])
        .unwrap();
    realm.call_method(&xhr, "send", &[Value::string("<a/>")]).unwrap();
    assert_eq!(realm.get_value(&xhr, "readyState").unwrap(), Value::from(1));

    engine.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["load:load"]);
    let realm = engine.realm_mut(id).unwrap();
    assert_eq!(realm.get_value(&xhr, "readyState").unwrap(), Value::from(4));
    assert_eq!(realm.get_value(&xhr, "responseText").unwrap(), Value::string("<a/>"));
}
