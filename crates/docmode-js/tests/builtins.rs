//! Builtin integration tests
//!
//! Collections, storage and location reached through a realm's globals.

use docmode_dom::{DocumentMode, ErrorKind, Realm, Value};
use docmode_js::{bind_window, Location, StorageArea, StorageHandle, WindowBindings};
use std::cell::RefCell;
use std::rc::Rc;

fn realm(mode: DocumentMode) -> Realm {
    let mut realm = Realm::new(mode);
    docmode_js::install(&mut realm);
    realm
}

fn global(realm: &mut Realm, name: &str) -> Value {
    let window = realm.window();
    realm.get(window, name).unwrap()
}

fn construct(realm: &mut Realm, name: &str) -> Value {
    let ctor = global(realm, name);
    realm.construct(&ctor, &[]).unwrap()
}

// ============================================================================
// MAP AND SET
// ============================================================================

#[test]
fn test_map_through_realm() {
    let mut realm = realm(DocumentMode::IE11);
    let map = construct(&mut realm, "Map");

    let r = realm.call_method(&map, "set", &[Value::from(0), Value::from(10)]).unwrap();
    assert_eq!(r, Value::Undefined);
    realm
        .call_method(&map, "set", &[Value::Number(-0.0), Value::from(20)])
        .unwrap();

    let id = map.as_object().unwrap();
    assert_eq!(realm.get(id, "size").unwrap(), Value::from(2));
    assert_eq!(
        realm.call_method(&map, "get", &[Value::Number(-0.0)]).unwrap(),
        Value::from(20)
    );
    assert_eq!(
        realm.call_method(&map, "has", &[Value::string("0")]).unwrap(),
        Value::Bool(false)
    );
    assert_eq!(realm.object_to_string(&map), "[object Object]");
}

#[test]
fn test_set_for_each_passes_value_twice() {
    let mut realm = realm(DocumentMode::IE11);
    let set = construct(&mut realm, "Set");
    realm.call_method(&set, "add", &[Value::string("a")]).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let callback = realm.create_native_closure("cb", 3, move |_, _, args| {
        sink.borrow_mut().extend_from_slice(args);
        Ok(Value::Undefined)
    });
    realm
        .call_method(&set, "forEach", &[Value::Object(callback)])
        .unwrap();

    let seen = seen.borrow();
    assert_eq!(seen[0], Value::string("a"));
    assert_eq!(seen[1], Value::string("a"));
    assert_eq!(seen[2], set);
}

#[test]
fn test_for_each_passes_this_arg() {
    for name in ["Map", "Set"] {
        let mut realm = realm(DocumentMode::IE11);
        let collection = construct(&mut realm, name);
        let args: &[Value] = if name == "Map" {
            &[Value::from(1), Value::from(2)]
        } else {
            &[Value::from(1)]
        };
        let method = if name == "Map" { "set" } else { "add" };
        realm.call_method(&collection, method, args).unwrap();

        let receivers = Rc::new(RefCell::new(Vec::new()));
        let sink = receivers.clone();
        let callback = realm.create_native_closure("cb", 3, move |_, this, _| {
            sink.borrow_mut().push(this.clone());
            Ok(Value::Undefined)
        });
        let this_arg = Value::Object(realm.create_array(Vec::new()));
        realm
            .call_method(&collection, "forEach", &[Value::Object(callback), this_arg.clone()])
            .unwrap();
        assert_eq!(*receivers.borrow(), vec![this_arg], "{name}");

        realm
            .call_method(&collection, "forEach", &[Value::Object(callback)])
            .unwrap();
        assert_eq!(receivers.borrow()[1], Value::Undefined, "{name}");
    }
}

#[test]
fn test_constructor_without_new() {
    let mut realm = realm(DocumentMode::IE11);
    for name in ["Map", "Set", "WeakMap"] {
        let ctor = global(&mut realm, name);
        let err = realm.call(&ctor, Value::Undefined, &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::WrongThis, "{name}");
    }
}

#[test]
fn test_method_on_wrong_object() {
    let mut realm = realm(DocumentMode::IE11);
    let map = construct(&mut realm, "Map");
    let set = construct(&mut realm, "Set");
    let set_fn = realm.get(set.as_object().unwrap(), "add").unwrap();
    let err = realm.call(&set_fn, map, &[Value::from(1)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongThis);
}

#[test]
fn test_weak_map_rejects_primitive_keys() {
    let mut realm = realm(DocumentMode::IE11);
    let weak = construct(&mut realm, "WeakMap");
    let err = realm
        .call_method(&weak, "set", &[Value::from(1), Value::from(2)])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::WeakMapKey);

    let key = Value::Object(realm.create_object());
    realm.call_method(&weak, "set", &[key.clone(), Value::from(2)]).unwrap();
    assert_eq!(realm.call_method(&weak, "get", &[key]).unwrap(), Value::from(2));
}

#[test]
fn test_collections_absent_before_ie11() {
    for mode in [DocumentMode::IE9, DocumentMode::IE10] {
        let realm = realm(mode);
        assert!(realm.interface_object("Map").is_none(), "{mode}");
        assert!(realm.interface_object("WeakMap").is_none(), "{mode}");
    }
}

// ============================================================================
// STORAGE
// ============================================================================

fn with_session(mode: DocumentMode) -> (Realm, StorageHandle) {
    let mut realm = realm(mode);
    let handle = StorageHandle::new(Rc::new(RefCell::new(StorageArea::session())));
    bind_window(
        &mut realm,
        WindowBindings {
            session_storage: Some(handle.clone()),
            ..WindowBindings::default()
        },
    )
    .unwrap();
    (realm, handle)
}

#[test]
fn test_storage_methods() {
    let (mut realm, handle) = with_session(DocumentMode::IE10);
    let storage = global(&mut realm, "sessionStorage");

    realm
        .call_method(&storage, "setItem", &[Value::string("foo"), Value::from(1)])
        .unwrap();
    assert_eq!(
        realm.call_method(&storage, "getItem", &[Value::string("foo")]).unwrap(),
        Value::string("1")
    );
    assert_eq!(
        realm.call_method(&storage, "getItem", &[Value::string("nope")]).unwrap(),
        Value::Null
    );
    assert_eq!(realm.get(storage.as_object().unwrap(), "length").unwrap(), Value::from(1));
    assert_eq!(handle.take_changes().len(), 1);

    realm.call_method(&storage, "clear", &[]).unwrap();
    assert_eq!(handle.area().borrow().len(), 0);
}

#[test]
fn test_storage_enumerates_keys() {
    let (mut realm, handle) = with_session(DocumentMode::IE11);
    handle.set_item("foobar", "1").unwrap();
    handle.set_item("barfoo", "2").unwrap();
    let storage = global(&mut realm, "sessionStorage").as_object().unwrap();

    let keys = realm.for_in_keys(storage);
    assert_eq!(keys, vec!["foobar".to_string(), "barfoo".to_string()]);
}

#[test]
fn test_storage_for_in_sees_live_changes() {
    for mode in [DocumentMode::IE8, DocumentMode::IE9, DocumentMode::IE10, DocumentMode::IE11] {
        let (mut realm, _handle) = with_session(mode);
        let storage = global(&mut realm, "sessionStorage");
        let id = storage.as_object().unwrap();
        let call = |realm: &mut Realm, method: &str, args: &[&str]| {
            let args: Vec<Value> = args.iter().map(|a| Value::string(*a)).collect();
            realm.call_method(&storage, method, &args).unwrap();
        };

        realm.set(id, "add-at-end", Value::from(0)).unwrap();
        call(&mut realm, "removeItem", &["add-at-end"]);
        call(&mut realm, "setItem", &["foobar", "1234"]);
        realm.set(id, "barfoo", Value::from(4321)).unwrap();
        call(&mut realm, "setItem", &["abcd", "blah"]);
        realm.set(id, "dcba", Value::string("test")).unwrap();

        let mut pending = vec!["foobar", "barfoo", "abcd", "dcba"];
        let mut seen = Vec::new();
        let mut it = realm.for_in(id);
        while let Some(key) = it.next(&realm) {
            let pos = pending.iter().position(|k| *k == key);
            assert!(pos.is_some(), "mode {mode}: unexpected key {key}");
            if let Some(pos) = pos {
                pending.remove(pos);
            }
            if seen.len() == 1 {
                let next = pending[0];
                call(&mut realm, "removeItem", &[next]);
                call(&mut realm, "setItem", &["new", "new"]);
                pending[0] = "new";
            }
            if pending.is_empty() {
                call(&mut realm, "setItem", &["add-at-end", "0"]);
            }
            seen.push(key);
        }
        assert_eq!(seen.len(), 4, "mode {mode}: {seen:?}");
        assert!(!seen.iter().any(|k| k == "add-at-end" || k == "abcd"), "mode {mode}: {seen:?}");
    }
}

#[test]
fn test_storage_shared_between_windows() {
    let area = Rc::new(RefCell::new(StorageArea::session()));
    let mut first = realm(DocumentMode::IE10);
    let mut second = realm(DocumentMode::IE10);
    for realm in [&mut first, &mut second] {
        bind_window(
            realm,
            WindowBindings {
                local_storage: Some(StorageHandle::new(area.clone())),
                ..WindowBindings::default()
            },
        )
        .unwrap();
    }

    let a = global(&mut first, "localStorage");
    first
        .call_method(&a, "setItem", &[Value::string("k"), Value::string("v")])
        .unwrap();
    let b = global(&mut second, "localStorage");
    assert_eq!(
        second.call_method(&b, "getItem", &[Value::string("k")]).unwrap(),
        Value::string("v")
    );
}

// ============================================================================
// LOCATION AND CONSOLE
// ============================================================================

#[test]
fn test_location_object() {
    let mut realm = realm(DocumentMode::IE11);
    let location = Rc::new(RefCell::new(
        Location::parse("http://winetest.example.org/tests/index.html").unwrap(),
    ));
    bind_window(
        &mut realm,
        WindowBindings {
            location: Some(location.clone()),
            ..WindowBindings::default()
        },
    )
    .unwrap();

    let loc = global(&mut realm, "location");
    assert_eq!(realm.object_to_string(&loc), "[object Object]");
    let id = loc.as_object().unwrap();
    assert_eq!(realm.get(id, "pathname").unwrap(), Value::string("/tests/index.html"));

    realm.call_method(&loc, "assign", &[Value::string("other.html")]).unwrap();
    assert_eq!(
        location.borrow().href(),
        "http://winetest.example.org/tests/other.html"
    );
}

#[test]
fn test_console_from_mode_10() {
    let mut legacy = realm(DocumentMode::IE9);
    bind_window(&mut legacy, WindowBindings::default()).unwrap();
    let window = legacy.window();
    assert!(!legacy.obj(window).fields.contains_key("console"));

    let mut modern = realm(DocumentMode::IE10);
    bind_window(&mut modern, WindowBindings::default()).unwrap();
    let console = global(&mut modern, "console");
    assert_eq!(
        modern.call_method(&console, "log", &[Value::string("hi")]).unwrap(),
        Value::Undefined
    );
}
