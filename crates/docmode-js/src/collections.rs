//! Keyed Collections
//!
//! `Map`, `Set` and `WeakMap` storage and their realm natives.

use docmode_dom::{arg, DomError, DomResult, ErrorKind, HostData, ObjectData, ObjectId, Realm, Value};
use std::any::Any;
use std::collections::HashMap;

/// Hashable SameValue identity: `+0` and `-0` differ, every `NaN` is equal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyId {
    Undefined,
    Null,
    Bool(bool),
    Number(u64),
    String(String),
    Object(ObjectId),
}

impl KeyId {
    fn of(v: &Value) -> Self {
        match v {
            Value::Undefined => KeyId::Undefined,
            Value::Null => KeyId::Null,
            Value::Bool(b) => KeyId::Bool(*b),
            Value::Number(n) if n.is_nan() => KeyId::Number(f64::NAN.to_bits()),
            Value::Number(n) => KeyId::Number(n.to_bits()),
            Value::String(s) => KeyId::String(s.clone()),
            Value::Object(id) => KeyId::Object(*id),
        }
    }
}

/// Insertion-ordered entries. Removal leaves a hole so open cursors keep
/// their position; `clear` starts a new epoch.
#[derive(Debug, Default, Clone)]
struct Slots {
    entries: Vec<Option<(Value, Value)>>,
    index: HashMap<KeyId, usize>,
    live: usize,
    epoch: u64,
}

impl Slots {
    fn get(&self, key: &Value) -> Option<&Value> {
        let i = *self.index.get(&KeyId::of(key))?;
        self.entries[i].as_ref().map(|(_, v)| v)
    }

    fn contains(&self, key: &Value) -> bool {
        self.index.contains_key(&KeyId::of(key))
    }

    fn insert(&mut self, key: Value, value: Value) {
        let id = KeyId::of(&key);
        match self.index.get(&id) {
            Some(&i) => {
                if let Some(entry) = self.entries[i].as_mut() {
                    entry.1 = value;
                }
            }
            None => {
                self.index.insert(id, self.entries.len());
                self.entries.push(Some((key, value)));
                self.live += 1;
            }
        }
    }

    fn remove(&mut self, key: &Value) -> bool {
        match self.index.remove(&KeyId::of(key)) {
            Some(i) => {
                self.entries[i] = None;
                self.live -= 1;
                true
            }
            None => false,
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.live = 0;
        self.epoch += 1;
    }
}

/// Position of a live iteration over a collection
#[derive(Debug, Clone)]
pub struct Cursor {
    next: usize,
    epoch: u64,
}

impl Cursor {
    fn new(slots: &Slots) -> Self {
        Self {
            next: 0,
            epoch: slots.epoch,
        }
    }

    /// Entries removed before being reached are skipped, entries added
    /// meanwhile are visited, and a `clear` ends the walk
    fn advance(&mut self, slots: &Slots) -> Option<(Value, Value)> {
        if self.epoch != slots.epoch {
            return None;
        }
        while let Some(slot) = slots.entries.get(self.next) {
            self.next += 1;
            if let Some((k, v)) = slot {
                return Some((k.clone(), v.clone()));
            }
        }
        None
    }
}

/// Backing store of a `Map` instance
#[derive(Debug, Default, Clone)]
pub struct MapObject {
    slots: Slots,
}

impl MapObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: Value, value: Value) -> &mut Self {
        self.slots.insert(key, value);
        self
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.slots.get(key)
    }

    pub fn has(&self, key: &Value) -> bool {
        self.slots.contains(key)
    }

    pub fn delete(&mut self, key: &Value) -> bool {
        self.slots.remove(key)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn size(&self) -> usize {
        self.slots.live
    }

    pub fn cursor(&self) -> Cursor {
        Cursor::new(&self.slots)
    }

    /// Next `(key, value)` for `cursor`
    pub fn next_entry(&self, cursor: &mut Cursor) -> Option<(Value, Value)> {
        cursor.advance(&self.slots)
    }
}

impl HostData for MapObject {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Backing store of a `Set` instance
#[derive(Debug, Default, Clone)]
pub struct SetObject {
    slots: Slots,
}

impl SetObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: Value) -> &mut Self {
        self.slots.insert(value.clone(), value);
        self
    }

    pub fn has(&self, value: &Value) -> bool {
        self.slots.contains(value)
    }

    pub fn delete(&mut self, value: &Value) -> bool {
        self.slots.remove(value)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn size(&self) -> usize {
        self.slots.live
    }

    pub fn cursor(&self) -> Cursor {
        Cursor::new(&self.slots)
    }

    pub fn next_value(&self, cursor: &mut Cursor) -> Option<Value> {
        cursor.advance(&self.slots).map(|(v, _)| v)
    }
}

impl HostData for SetObject {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Backing store of a `WeakMap`; keys are object handles
#[derive(Debug, Default, Clone)]
pub struct WeakMapObject {
    entries: HashMap<ObjectId, Value>,
}

impl WeakMapObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: ObjectId, value: Value) -> &mut Self {
        self.entries.insert(key, value);
        self
    }

    pub fn get(&self, key: ObjectId) -> Option<&Value> {
        self.entries.get(&key)
    }

    pub fn has(&self, key: ObjectId) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn delete(&mut self, key: ObjectId) -> bool {
        self.entries.remove(&key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HostData for WeakMapObject {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Natives
// ============================================================================

fn wrong_this(name: &str) -> DomError {
    DomError::new(ErrorKind::WrongThis, name)
}

/// Run `f` on the collection behind `this`
fn with_host<T: HostData, R>(
    realm: &mut Realm,
    this: &Value,
    name: &str,
    f: impl FnOnce(&mut T) -> R,
) -> DomResult<R> {
    let id = this.as_object().ok_or_else(|| wrong_this(name))?;
    realm
        .obj_mut(id)
        .host_data_mut::<T>()
        .map(f)
        .ok_or_else(|| wrong_this(name))
}

fn callback_arg(realm: &Realm, args: &[Value]) -> DomResult<Value> {
    let callback = arg(args, 0);
    if realm.is_callable(&callback) {
        Ok(callback)
    } else {
        Err(DomError::new(ErrorKind::FunctionExpected, "forEach"))
    }
}

fn weak_key(v: &Value) -> DomResult<ObjectId> {
    v.as_object().ok_or_else(|| DomError::kind(ErrorKind::WeakMapKey))
}

fn size_value(n: usize) -> Value {
    Value::Number(n as f64)
}

pub(crate) fn install(realm: &mut Realm) {
    let natives = realm.natives_mut();

    natives.constructor("Map", |realm, _, _| {
        let map = realm.create_host("Map", ObjectData::Host(Box::new(MapObject::new())))?;
        Ok(Value::Object(map))
    });
    natives.call("Map", |_, _, _| Err(wrong_this("Map")));
    natives.getter("Map", "size", |realm, this, _| {
        with_host(realm, this, "size", |m: &mut MapObject| size_value(m.size()))
    });
    natives.method("Map", "get", |realm, this, args| {
        let key = arg(args, 0);
        with_host(realm, this, "get", |m: &mut MapObject| m.get(&key).cloned().unwrap_or_default())
    });
    natives.method("Map", "set", |realm, this, args| {
        let (key, value) = (arg(args, 0), arg(args, 1));
        with_host(realm, this, "set", |m: &mut MapObject| {
            m.set(key, value);
        })?;
        Ok(Value::Undefined)
    });
    natives.method("Map", "has", |realm, this, args| {
        let key = arg(args, 0);
        with_host(realm, this, "has", |m: &mut MapObject| Value::Bool(m.has(&key)))
    });
    natives.method("Map", "delete", |realm, this, args| {
        let key = arg(args, 0);
        with_host(realm, this, "delete", |m: &mut MapObject| Value::Bool(m.delete(&key)))
    });
    natives.method("Map", "clear", |realm, this, _| {
        with_host(realm, this, "clear", MapObject::clear)?;
        Ok(Value::Undefined)
    });
    natives.method("Map", "forEach", |realm, this, args| {
        let mut cursor = with_host(realm, this, "forEach", |m: &mut MapObject| m.cursor())?;
        let callback = callback_arg(realm, args)?;
        let receiver = arg(args, 1);
        while let Some((key, value)) =
            with_host(realm, this, "forEach", |m: &mut MapObject| m.next_entry(&mut cursor))?
        {
            realm.call(&callback, receiver.clone(), &[value, key, this.clone()])?;
        }
        Ok(Value::Undefined)
    });

    // `new Set(iterable)` ignores its argument
    natives.constructor("Set", |realm, _, _| {
        let set = realm.create_host("Set", ObjectData::Host(Box::new(SetObject::new())))?;
        Ok(Value::Object(set))
    });
    natives.call("Set", |_, _, _| Err(wrong_this("Set")));
    natives.getter("Set", "size", |realm, this, _| {
        with_host(realm, this, "size", |s: &mut SetObject| size_value(s.size()))
    });
    natives.method("Set", "add", |realm, this, args| {
        let value = arg(args, 0);
        with_host(realm, this, "add", |s: &mut SetObject| {
            s.add(value);
        })?;
        Ok(Value::Undefined)
    });
    natives.method("Set", "has", |realm, this, args| {
        let value = arg(args, 0);
        with_host(realm, this, "has", |s: &mut SetObject| Value::Bool(s.has(&value)))
    });
    natives.method("Set", "delete", |realm, this, args| {
        let value = arg(args, 0);
        with_host(realm, this, "delete", |s: &mut SetObject| Value::Bool(s.delete(&value)))
    });
    natives.method("Set", "clear", |realm, this, _| {
        with_host(realm, this, "clear", SetObject::clear)?;
        Ok(Value::Undefined)
    });
    natives.method("Set", "forEach", |realm, this, args| {
        let mut cursor = with_host(realm, this, "forEach", |s: &mut SetObject| s.cursor())?;
        let callback = callback_arg(realm, args)?;
        let receiver = arg(args, 1);
        while let Some(value) =
            with_host(realm, this, "forEach", |s: &mut SetObject| s.next_value(&mut cursor))?
        {
            realm.call(&callback, receiver.clone(), &[value.clone(), value, this.clone()])?;
        }
        Ok(Value::Undefined)
    });

    natives.constructor("WeakMap", |realm, _, _| {
        let map = realm.create_host("WeakMap", ObjectData::Host(Box::new(WeakMapObject::new())))?;
        Ok(Value::Object(map))
    });
    natives.call("WeakMap", |_, _, _| Err(wrong_this("WeakMap")));
    natives.method("WeakMap", "set", |realm, this, args| {
        with_host(realm, this, "set", |_: &mut WeakMapObject| ())?;
        let key = weak_key(&arg(args, 0))?;
        let value = arg(args, 1);
        with_host(realm, this, "set", |m: &mut WeakMapObject| {
            m.set(key, value);
        })?;
        Ok(Value::Undefined)
    });
    natives.method("WeakMap", "get", |realm, this, args| {
        let key = arg(args, 0).as_object();
        with_host(realm, this, "get", |m: &mut WeakMapObject| {
            key.and_then(|k| m.get(k).cloned()).unwrap_or_default()
        })
    });
    natives.method("WeakMap", "has", |realm, this, args| {
        let key = arg(args, 0).as_object();
        with_host(realm, this, "has", |m: &mut WeakMapObject| {
            Value::Bool(key.is_some_and(|k| m.has(k)))
        })
    });
    natives.method("WeakMap", "delete", |realm, this, args| {
        let key = arg(args, 0).as_object();
        with_host(realm, this, "delete", |m: &mut WeakMapObject| {
            Value::Bool(key.is_some_and(|k| m.delete(k)))
        })
    });
    natives.method("WeakMap", "clear", |realm, this, _| {
        with_host(realm, this, "clear", WeakMapObject::clear)?;
        Ok(Value::Undefined)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_distinguishes_signed_zero() {
        let mut map = MapObject::new();
        map.set(Value::from(0), Value::from(10)).set(Value::Number(-0.0), Value::from(20));
        assert_eq!(map.size(), 2);
        assert_eq!(map.get(&Value::Number(-0.0)), Some(&Value::from(20)));
        assert_eq!(map.get(&Value::from(0)), Some(&Value::from(10)));
    }

    #[test]
    fn test_set_signed_zero() {
        let mut set = SetObject::new();
        set.add(Value::from(0));
        assert!(!set.has(&Value::Number(-0.0)));
        set.add(Value::Number(-0.0));
        assert!(set.has(&Value::Number(-0.0)));
        assert_eq!(set.size(), 2);
    }

    #[test]
    fn test_nan_key_is_stable() {
        let mut map = MapObject::new();
        map.set(Value::Number(f64::NAN), Value::from(1));
        map.set(Value::Number(f64::NAN), Value::from(2));
        assert_eq!(map.size(), 1);
        assert_eq!(map.get(&Value::Number(f64::NAN)), Some(&Value::from(2)));
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut map = MapObject::new();
        map.set(Value::from("a"), Value::from(1))
            .set(Value::from("b"), Value::from(2))
            .set(Value::from("a"), Value::from(3));
        let mut cursor = map.cursor();
        let mut keys = Vec::new();
        while let Some((k, _)) = map.next_entry(&mut cursor) {
            keys.push(k);
        }
        assert_eq!(keys, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_cursor_sees_live_mutation() {
        let mut map = MapObject::new();
        for (k, v) in [("a", 1), ("b", 2), ("c", 3)] {
            map.set(Value::from(k), Value::from(v));
        }
        let mut cursor = map.cursor();
        let mut seen = Vec::new();
        while let Some((k, _)) = map.next_entry(&mut cursor) {
            if k == Value::from("a") {
                map.delete(&Value::from("b"));
                map.set(Value::from("d"), Value::from(4));
            }
            seen.push(k);
        }
        assert_eq!(seen, vec![Value::from("a"), Value::from("c"), Value::from("d")]);
    }

    #[test]
    fn test_clear_ends_iteration() {
        let mut set = SetObject::new();
        set.add(Value::from(1)).add(Value::from(2));
        let mut cursor = set.cursor();
        assert_eq!(set.next_value(&mut cursor), Some(Value::from(1)));
        set.clear();
        set.add(Value::from(3));
        assert_eq!(set.next_value(&mut cursor), None);
        assert_eq!(set.size(), 1);
    }

    #[test]
    fn test_weak_map_store() {
        let mut realm = Realm::new(docmode_dom::DocumentMode::IE11);
        let a = realm.create_object();
        let b = realm.create_object();
        let mut map = WeakMapObject::new();
        map.set(a, Value::from(1)).set(b, Value::from(2));
        assert_eq!(map.get(a), Some(&Value::from(1)));
        assert!(map.delete(b));
        assert!(!map.has(b));
        assert_eq!(map.len(), 1);
    }
}
