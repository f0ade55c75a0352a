//! Attribute reflection integration tests
//!
//! Content attributes against script properties under each attribute model.

use docmode_dom::{AttributeModel, DocumentMode, ErrorKind, ObjectId, Realm, Value};

const ALL_MODES: [DocumentMode; 5] = [
    DocumentMode::IE7,
    DocumentMode::IE8,
    DocumentMode::IE9,
    DocumentMode::IE10,
    DocumentMode::IE11,
];

fn attached_div(realm: &mut Realm) -> ObjectId {
    let div = realm.create_element("div").unwrap();
    let body = realm.body().unwrap();
    realm.append_child(body, div).unwrap();
    div
}

// ============================================================================
// REFLECTED PROPERTIES
// ============================================================================

#[test]
fn test_id_property_reflects_to_attribute() {
    for mode in ALL_MODES {
        let mut realm = Realm::new(mode);
        let div = attached_div(&mut realm);
        realm.set(div, "id", Value::string("target")).unwrap();
        assert_eq!(
            realm.get_attribute(div, "id").unwrap(),
            Value::string("target"),
            "mode {mode}"
        );
        let doc = realm.document();
        assert_eq!(realm.element_by_id(doc, "target"), Some(div), "mode {mode}");
    }
}

#[test]
fn test_attribute_model_follows_mode() {
    let models: Vec<AttributeModel> = ALL_MODES
        .iter()
        .map(|m| Realm::new(*m).attribute_model())
        .collect();
    assert_eq!(
        models,
        vec![
            AttributeModel::Properties,
            AttributeModel::Shared,
            AttributeModel::Strings,
            AttributeModel::Strings,
            AttributeModel::Strings,
        ]
    );
}

#[test]
fn test_class_attribute_drives_class_lookup() {
    for mode in [DocumentMode::IE8, DocumentMode::IE9, DocumentMode::IE11] {
        let mut realm = Realm::new(mode);
        let div = attached_div(&mut realm);
        realm.set_attribute(div, "class", Value::string("a b")).unwrap();
        let doc = realm.document();
        assert_eq!(realm.elements_by_class_name(doc, "b"), vec![div], "mode {mode}");
        assert_eq!(realm.get(div, "className").unwrap(), Value::string("a b"));
    }
}

// ============================================================================
// REMOVE ATTRIBUTE
// ============================================================================

#[test]
fn test_standard_remove_attribute_returns_undefined() {
    let mut realm = Realm::new(DocumentMode::IE9);
    let div = attached_div(&mut realm);
    realm.set_attribute(div, "title", Value::string("t")).unwrap();
    assert!(realm.has_attribute(div, "title"));
    assert_eq!(realm.remove_attribute(div, "title").unwrap(), Value::Undefined);
    assert_eq!(realm.remove_attribute(div, "title").unwrap(), Value::Undefined);
    assert!(!realm.has_attribute(div, "title"));
    assert_eq!(realm.get_attribute(div, "title").unwrap(), Value::Null);
}

#[test]
fn test_legacy_remove_attribute_reports_removal() {
    let mut realm = Realm::new(DocumentMode::IE7);
    let div = attached_div(&mut realm);
    realm.set(div, "myattr", Value::from(1)).unwrap();
    assert_eq!(realm.remove_attribute(div, "myattr").unwrap(), Value::Bool(true));
    assert_eq!(realm.remove_attribute(div, "myattr").unwrap(), Value::Bool(false));
    assert_eq!(realm.get(div, "myattr").unwrap(), Value::Undefined);
}

// ============================================================================
// NAMESPACES
// ============================================================================

#[test]
fn test_namespaced_attribute_lifecycle() {
    let mut realm = Realm::new(DocumentMode::IE10);
    let div = attached_div(&mut realm);
    let ns = Value::string("http://www.example.org/ns");
    realm
        .set_attribute_ns(div, &ns, "ex:level", &Value::from(3))
        .unwrap();
    assert!(realm.has_attribute_ns(div, &ns, "level").unwrap());
    assert!(!realm.has_attribute_ns(div, &Value::Null, "level").unwrap());
    assert_eq!(realm.get_attribute_ns(div, &ns, "level").unwrap(), Value::string("3"));

    realm.remove_attribute_ns(div, &ns, "level").unwrap();
    assert!(!realm.has_attribute_ns(div, &ns, "level").unwrap());
    assert_eq!(realm.get_attribute_ns(div, &ns, "level").unwrap(), Value::string(""));
}

#[test]
fn test_prefix_without_namespace_rejected() {
    let mut realm = Realm::new(DocumentMode::IE9);
    let div = attached_div(&mut realm);
    let err = realm
        .set_attribute_ns(div, &Value::Null, "ex:level", &Value::from(1))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Namespace);
}

// ============================================================================
// EVENT HANDLER ATTRIBUTES
// ============================================================================

#[test]
fn test_handler_attribute_compiles_in_standard_modes() {
    for mode in [DocumentMode::IE9, DocumentMode::IE10, DocumentMode::IE11] {
        let mut realm = Realm::new(mode);
        let div = attached_div(&mut realm);
        realm.set_attribute(div, "onclick", Value::string("go()")).unwrap();
        assert_eq!(realm.get_attribute(div, "onclick").unwrap(), Value::string("go()"));
        let handler = realm.get(div, "onclick").unwrap();
        assert_eq!(realm.type_of(&handler), "function", "mode {mode}");
    }
}

#[test]
fn test_handler_attribute_is_raw_string_in_ie8() {
    let mut realm = Realm::new(DocumentMode::IE8);
    let div = attached_div(&mut realm);
    realm.set_attribute(div, "onclick", Value::string("go()")).unwrap();
    assert_eq!(realm.get_attribute(div, "onclick").unwrap(), Value::string("go()"));
    assert!(realm.has_attribute(div, "onclick"));
    assert_eq!(realm.remove_attribute(div, "onclick").unwrap(), Value::Bool(true));
    assert!(!realm.has_attribute(div, "onclick"));
}

#[test]
fn test_function_handler_is_not_an_attribute() {
    let mut realm = Realm::new(DocumentMode::IE10);
    let div = attached_div(&mut realm);
    let f = realm.create_native_closure("f", 0, |_, _, _| Ok(Value::Undefined));
    realm.set(div, "onclick", Value::Object(f)).unwrap();
    assert_eq!(realm.get_attribute(div, "onclick").unwrap(), Value::Null);
    assert!(!realm.has_attribute(div, "onclick"));
}
