//! Window
//!
//! The global object and the host objects hanging off it.

use crate::error::{DomError, DomResult, ErrorKind};
use crate::object::{ObjectData, WindowData};
use crate::realm::{arg, Realm};
use crate::value::{ObjectId, Value};

/// Fields of `performance.timing`, in the order a page load stamps them
pub const TIMING_FIELDS: &[&str] = &[
    "navigationStart",
    "unloadEventStart",
    "unloadEventEnd",
    "redirectStart",
    "redirectEnd",
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
    "msFirstPaint",
];

const SCREEN_WIDTH: i32 = 1024;
const SCREEN_HEIGHT: i32 = 768;

/// `navigator.appVersion` for a mode version
pub fn app_version(version: u8) -> String {
    if version >= 11 {
        return "5.0 (Windows NT 6.1; Trident/7.0; rv:11.0) like Gecko".to_string();
    }
    let major = if version < 9 { 4 } else { 5 };
    format!(
        "{major}.0 (compatible; MSIE {}.0; Windows NT 6.1; Trident/7.0)",
        version.max(7)
    )
}

/// Evaluate a media query list against a screen viewport
pub fn evaluate_media_query(query: &str) -> bool {
    query.split(',').any(|q| {
        let q = q.trim().to_ascii_lowercase();
        let (negated, q) = match q.strip_prefix("not ") {
            Some(rest) => (true, rest.trim().to_string()),
            None => (false, q.strip_prefix("only ").unwrap_or(&q).trim().to_string()),
        };
        let matched = q.split(" and ").all(|part| media_part_matches(part.trim()));
        matched != negated
    })
}

fn media_part_matches(part: &str) -> bool {
    let Some(feature) = part.strip_prefix('(').and_then(|p| p.strip_suffix(')')) else {
        return matches!(part, "all" | "screen" | "");
    };
    let Some((name, value)) = feature.split_once(':') else {
        return matches!(feature.trim(), "color" | "hover" | "pointer");
    };
    let value = value.trim();
    let px = || value.trim_end_matches("px").trim().parse::<f64>().ok();
    match name.trim() {
        "min-width" => px().is_some_and(|w| f64::from(SCREEN_WIDTH) >= w),
        "max-width" => px().is_some_and(|w| f64::from(SCREEN_WIDTH) <= w),
        "min-height" => px().is_some_and(|h| f64::from(SCREEN_HEIGHT) >= h),
        "max-height" => px().is_some_and(|h| f64::from(SCREEN_HEIGHT) <= h),
        "orientation" => value == "landscape",
        "hover" => value == "hover",
        "pointer" => value == "fine",
        _ => false,
    }
}

impl Realm {
    pub fn window_data(&self, id: ObjectId) -> Option<&WindowData> {
        match &self.obj(id).data {
            ObjectData::Window(w) => Some(w),
            _ => None,
        }
    }

    /// `window.performance.timing`
    pub fn performance_timing(&mut self) -> DomResult<ObjectId> {
        let window = self.window();
        let performance = self.cached_host(window, "performance", "Performance", || ObjectData::Plain)?;
        let performance = performance
            .as_object()
            .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))?;
        self.cached_host(performance, "timing", "PerformanceTiming", || ObjectData::Plain)?
            .as_object()
            .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
    }

    /// Record a timing mark; unknown fields are ignored
    pub fn stamp_timing(&mut self, field: &str, time: f64) -> DomResult<()> {
        let Some(name) = TIMING_FIELDS.iter().copied().find(|f| *f == field) else {
            tracing::warn!(field, "unknown timing field");
            return Ok(());
        };
        let timing = self.performance_timing()?;
        self.obj_mut(timing).fields.insert(name, Value::Number(time));
        Ok(())
    }

    pub fn timing_value(&mut self, field: &str) -> DomResult<f64> {
        let timing = self.performance_timing()?;
        Ok(self
            .obj(timing)
            .fields
            .iter()
            .find(|(k, _)| **k == field)
            .and_then(|(_, v)| v.as_number())
            .unwrap_or(0.0))
    }
}

fn this_window(realm: &Realm, this: &Value) -> DomResult<ObjectId> {
    this.as_object()
        .filter(|id| realm.window_data(*id).is_some())
        .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
}

fn field_or(realm: &Realm, id: ObjectId, name: &'static str, default: Value) -> Value {
    realm.obj(id).fields.get(name).cloned().unwrap_or(default)
}

pub(crate) fn install(realm: &mut Realm) {
    let natives = realm.natives_mut();

    // self references
    natives.method("Window", "toString", |realm, this, _| {
        this_window(realm, this)?;
        Ok(Value::string("[object Window]"))
    });
    for name in ["self", "window", "frames", "top", "parent"] {
        natives.getter("Window", name, move |realm, this, _| {
            let window = this_window(realm, this)?;
            let mut cur = window;
            match name {
                "parent" => cur = realm.window_data(window).and_then(|w| w.parent).unwrap_or(window),
                "top" => {
                    while let Some(parent) = realm.window_data(cur).and_then(|w| w.parent) {
                        cur = parent;
                    }
                }
                _ => {}
            }
            Ok(Value::Object(cur))
        });
    }
    natives.getter("Window", "document", |realm, this, _| {
        let window = this_window(realm, this)?;
        Ok(realm.window_data(window).map(|w| w.document).into())
    });
    natives.getter("Window", "name", |realm, this, _| {
        let window = this_window(realm, this)?;
        Ok(field_or(realm, window, "name", Value::string("")))
    });
    natives.setter("Window", "name", |realm, this, args| {
        let window = this_window(realm, this)?;
        let name = realm.to_string(&arg(args, 0))?;
        realm.obj_mut(window).fields.insert("name", Value::String(name));
        Ok(Value::Undefined)
    });

    // dialogs and misc
    natives.method("Window", "alert", |realm, this, args| {
        this_window(realm, this)?;
        let message = match arg(args, 0) {
            Value::Undefined => String::new(),
            v => realm.to_string(&v)?,
        };
        tracing::info!(message = %message, "alert");
        Ok(Value::Undefined)
    });
    natives.method("Window", "getSelection", |realm, this, _| {
        this_window(realm, this)?;
        Ok(Value::Null)
    });
    natives.method("Window", "getComputedStyle", |realm, this, args| {
        this_window(realm, this)?;
        if !arg(args, 0).as_object().is_some_and(|el| realm.is_element(el)) {
            return Err(DomError::kind(ErrorKind::TypeMismatch));
        }
        realm
            .create_style_declaration("CSSStyleDeclaration")
            .map(Value::Object)
    });
    natives.method("Window", "matchMedia", |realm, this, args| {
        this_window(realm, this)?;
        let media = realm.to_string(&arg(args, 0))?;
        let list = realm.create_host("MediaQueryList", ObjectData::Plain)?;
        let matches = evaluate_media_query(&media);
        tracing::trace!(media = %media, matches, "media query evaluated");
        let fields = &mut realm.obj_mut(list).fields;
        fields.insert("media", Value::String(media));
        fields.insert("matches", Value::Bool(matches));
        Ok(Value::Object(list))
    });
    for name in ["addListener", "removeListener"] {
        natives.method("MediaQueryList", name, |realm, this, _| {
            realm.this_object(this)?;
            Ok(Value::Undefined)
        });
    }

    // navigator
    natives.getter("Window", "navigator", |realm, this, _| {
        let window = this_window(realm, this)?;
        realm.cached_host(window, "navigator", "Navigator", || ObjectData::Plain)
    });
    natives.getter("Navigator", "appVersion", |realm, _, _| {
        Ok(Value::String(app_version(realm.mode_version())))
    });
    natives.getter("Navigator", "userAgent", |realm, _, _| {
        Ok(Value::String(format!("Mozilla/{}", app_version(realm.mode_version()))))
    });
    natives.getter("Navigator", "appCodeName", |_, _, _| Ok(Value::string("Mozilla")));
    natives.getter("Navigator", "appName", |realm, _, _| {
        Ok(Value::string(if realm.mode_version() < 11 {
            "Microsoft Internet Explorer"
        } else {
            "Netscape"
        }))
    });
    natives.getter("Navigator", "platform", |_, _, _| Ok(Value::string("Win32")));
    natives.getter("Navigator", "cookieEnabled", |_, _, _| Ok(Value::Bool(true)));
    for name in ["mimeTypes", "plugins"] {
        natives.getter("Navigator", name, |realm, _, _| Ok(Value::Object(realm.create_array(Vec::new()))));
    }
    natives.method("Navigator", "javaEnabled", |_, _, _| Ok(Value::Bool(false)));

    // screen and history
    natives.getter("Window", "screen", |realm, this, _| {
        let window = this_window(realm, this)?;
        realm.cached_host(window, "screen", "Screen", || ObjectData::Plain)
    });
    natives.getter("Screen", "width", |_, _, _| Ok(Value::from(SCREEN_WIDTH)));
    natives.getter("Screen", "height", |_, _, _| Ok(Value::from(SCREEN_HEIGHT)));
    natives.getter("Screen", "colorDepth", |_, _, _| Ok(Value::from(24)));
    natives.getter("Window", "history", |realm, this, _| {
        let window = this_window(realm, this)?;
        realm.cached_host(window, "history", "History", || ObjectData::Plain)
    });
    natives.getter("History", "length", |_, _, _| Ok(Value::from(1)));
    for name in ["back", "forward", "go"] {
        natives.method("History", name, |_, _, _| Ok(Value::Undefined));
    }

    // performance
    natives.getter("Window", "performance", |realm, this, _| {
        let window = this_window(realm, this)?;
        realm.cached_host(window, "performance", "Performance", || ObjectData::Plain)
    });
    natives.getter("Performance", "timing", |realm, this, _| {
        let performance = realm.this_object(this)?;
        realm.cached_host(performance, "timing", "PerformanceTiming", || ObjectData::Plain)
    });
    natives.getter("Performance", "navigation", |realm, this, _| {
        let performance = realm.this_object(this)?;
        realm.cached_host(performance, "navigation", "PerformanceNavigation", || ObjectData::Plain)
    });
    natives.method("Performance", "now", |realm, _, _| Ok(Value::Number(realm.next_timestamp())));
    for &name in TIMING_FIELDS {
        natives.getter("PerformanceTiming", name, move |realm, this, _| {
            let timing = realm.this_object(this)?;
            Ok(field_or(realm, timing, name, Value::from(0)))
        });
    }
    for name in ["type", "redirectCount"] {
        natives.getter("PerformanceNavigation", name, |_, _, _| Ok(Value::from(0)));
    }

    // msCrypto
    natives.getter("Window", "msCrypto", |realm, this, _| {
        let window = this_window(realm, this)?;
        realm.cached_host(window, "msCrypto", "Crypto", || ObjectData::Plain)
    });
    natives.getter("Crypto", "subtle", |realm, this, _| {
        let crypto = realm.this_object(this)?;
        if let Some(v @ Value::Object(_)) = realm.obj(crypto).fields.get("subtle") {
            return Ok(v.clone());
        }
        let subtle = realm.create_object();
        realm.obj_mut(crypto).fields.insert("subtle", Value::Object(subtle));
        Ok(Value::Object(subtle))
    });
    natives.method("Crypto", "getRandomValues", |realm, this, args| {
        realm.this_object(this)?;
        let target = arg(args, 0);
        let Some(array) = target.as_object().filter(|id| realm.array_items(*id).is_some()) else {
            return Err(DomError::kind(ErrorKind::TypeMismatch));
        };
        let len = realm.array_items(array).map_or(0, <[_]>::len);
        let mut bytes = vec![0u8; len];
        getrandom::fill(&mut bytes)
            .map_err(|e| DomError::new(ErrorKind::Unspecified, format!("random source: {e}")))?;
        for (i, byte) in bytes.into_iter().enumerate() {
            realm.set(array, &i.to_string(), Value::from(i32::from(byte)))?;
        }
        Ok(target)
    });

    // MutationObserver
    natives.constructor("MutationObserver", |realm, _, args| {
        let observer = realm.create_host("MutationObserver", ObjectData::Plain)?;
        realm.obj_mut(observer).fields.insert("callback", arg(args, 0));
        Ok(Value::Object(observer))
    });
    natives.method("MutationObserver", "observe", |realm, this, args| {
        let observer = realm.this_object(this)?;
        let Some(target) = arg(args, 0).as_object().filter(|id| realm.node(*id).is_some()) else {
            return Err(DomError::kind(ErrorKind::TypeMismatch));
        };
        if arg(args, 1).as_object().is_none() {
            return Err(DomError::kind(ErrorKind::TypeMismatch));
        }
        realm.obj_mut(observer).fields.insert("target", Value::Object(target));
        Ok(Value::Undefined)
    });
    natives.method("MutationObserver", "disconnect", |realm, this, _| {
        let observer = realm.this_object(this)?;
        realm.obj_mut(observer).fields.remove("target");
        Ok(Value::Undefined)
    });
    natives.method("MutationObserver", "takeRecords", |realm, this, _| {
        realm.this_object(this)?;
        Ok(Value::Object(realm.create_array(Vec::new())))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::DocumentMode;

    #[test]
    fn test_app_version() {
        assert_eq!(app_version(5), "4.0 (compatible; MSIE 7.0; Windows NT 6.1; Trident/7.0)");
        assert_eq!(app_version(8), "4.0 (compatible; MSIE 8.0; Windows NT 6.1; Trident/7.0)");
        assert_eq!(app_version(10), "5.0 (compatible; MSIE 10.0; Windows NT 6.1; Trident/7.0)");
        assert_eq!(app_version(11), "5.0 (Windows NT 6.1; Trident/7.0; rv:11.0) like Gecko");
    }

    #[test]
    fn test_navigator_by_mode() {
        let mut realm = Realm::new(DocumentMode::IE8);
        let window = realm.window();
        let nav = realm.get(window, "navigator").unwrap();
        assert_eq!(realm.to_string(&nav).unwrap(), "[object]");
        assert_eq!(
            realm.get_value(&nav, "appName").unwrap(),
            Value::string("Microsoft Internet Explorer")
        );

        let mut realm = Realm::new(DocumentMode::IE11);
        let window = realm.window();
        let nav = realm.get(window, "navigator").unwrap();
        assert_eq!(realm.to_string(&nav).unwrap(), "[object Navigator]");
        assert_eq!(realm.get_value(&nav, "appName").unwrap(), Value::string("Netscape"));
        let ua = realm.get_value(&nav, "userAgent").unwrap();
        assert_eq!(ua, Value::String(format!("Mozilla/{}", app_version(11))));
        assert_eq!(realm.get(window, "navigator").unwrap(), nav);
    }

    #[test]
    fn test_self_references() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let window = realm.window();
        for name in ["self", "window", "top", "parent", "frames"] {
            assert_eq!(realm.get(window, name).unwrap(), Value::Object(window), "{name}");
        }
        assert_eq!(realm.get(window, "document").unwrap(), Value::Object(realm.document()));
    }

    #[test]
    fn test_media_queries() {
        assert!(evaluate_media_query("(hover:hover)"));
        assert!(evaluate_media_query("screen and (min-width: 800px)"));
        assert!(!evaluate_media_query("print"));
        assert!(evaluate_media_query("not print"));
        assert!(evaluate_media_query("print, all"));
        assert!(!evaluate_media_query("(max-width: 100px)"));

        let mut realm = Realm::new(DocumentMode::IE10);
        let window = Value::Object(realm.window());
        let list = realm
            .call_method(&window, "matchMedia", &[Value::string("(hover:hover)")])
            .unwrap();
        assert_eq!(realm.object_to_string(&list), "[object MediaQueryList]");
        assert_eq!(realm.get_value(&list, "matches").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_performance_navigation() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let window = realm.window();
        let perf = realm.get(window, "performance").unwrap();
        let nav = realm.get_value(&perf, "navigation").unwrap();
        assert_eq!(realm.get_value(&nav, "type").unwrap(), Value::from(0));
        assert_eq!(realm.get_value(&nav, "redirectCount").unwrap(), Value::from(0));

        realm.stamp_timing("fetchStart", 12.0).unwrap();
        let timing = realm.get_value(&perf, "timing").unwrap();
        assert_eq!(realm.get_value(&timing, "fetchStart").unwrap(), Value::from(12));
        assert_eq!(realm.get_value(&timing, "loadEventEnd").unwrap(), Value::from(0));
    }

    #[test]
    fn test_ms_crypto_on_prototype() {
        let realm = Realm::new(DocumentMode::IE11);
        let proto = realm.prototype("Window").unwrap();
        assert!(realm.has_own(proto, "msCrypto"));
        assert!(!realm.has_own(realm.window(), "msCrypto"));

        let realm = Realm::new(DocumentMode::IE10);
        assert!(!realm.has(realm.window(), "msCrypto"));
    }

    #[test]
    fn test_get_random_values() {
        let mut realm = Realm::new(DocumentMode::IE11);
        let window = realm.window();
        let crypto = realm.get(window, "msCrypto").unwrap();
        let array = realm.create_array(vec![Value::from(0); 4]);
        let out = realm
            .call_method(&crypto, "getRandomValues", &[Value::Object(array)])
            .unwrap();
        assert_eq!(out, Value::Object(array));
        assert_eq!(realm.array_items(array).map(<[_]>::len), Some(4));
        for item in realm.array_items(array).unwrap() {
            let Value::Number(n) = item else {
                panic!("not a number: {item:?}");
            };
            assert!((0.0..=255.0).contains(n) && n.fract() == 0.0);
        }
        let err = realm
            .call_method(&crypto, "getRandomValues", &[Value::from(1)])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_mutation_observer() {
        let mut realm = Realm::new(DocumentMode::IE11);
        let ctor = realm.interface_object("MutationObserver").unwrap();
        let err = realm.construct(&Value::Object(ctor), &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unexpected);
        let err = realm.construct(&Value::Object(ctor), &[Value::from(1)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);

        let callback = realm.create_native_closure("cb", 0, |_, _, _| Ok(Value::Undefined));
        let observer = realm.call(&Value::Object(ctor), Value::Undefined, &[Value::Object(callback)]).unwrap();
        assert_eq!(realm.object_to_string(&observer), "[object MutationObserver]");
        let body = realm.body().unwrap();
        let options = realm.create_object();
        realm
            .call_method(&observer, "observe", &[Value::Object(body), Value::Object(options)])
            .unwrap();
        let records = realm.call_method(&observer, "takeRecords", &[]).unwrap();
        assert_eq!(realm.object_to_string(&records), "[object Array]");
        realm.call_method(&observer, "disconnect", &[]).unwrap();
    }
}
