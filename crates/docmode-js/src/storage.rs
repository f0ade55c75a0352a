//! Storage APIs
//!
//! sessionStorage and localStorage areas, the host object that exposes
//! them to a realm, and the change records that drive storage events.

use crate::error::StorageError;
use docmode_dom::{arg, DomError, DomResult, ErrorKind, HostData, NamedSlot, ObjectId, Realm, Value};
use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Characters (keys plus values) an area may hold by default
pub const DEFAULT_QUOTA: usize = 5_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Session,
    Local,
}

/// One effective mutation; `key` is `None` for `clear()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub kind: StorageKind,
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Ordered string map backing one storage area.
///
/// Keys keep the slot they were first stored in. Removal leaves a vacant
/// slot that the next new key takes over, so a live enumeration neither
/// repeats nor skips remaining keys.
#[derive(Debug)]
pub struct StorageArea {
    kind: StorageKind,
    slots: Vec<Option<(String, String)>>,
    index: HashMap<String, usize>,
    vacant: BTreeSet<usize>,
    /// Characters stored, keys included
    used: usize,
    quota: Option<usize>,
    path: Option<PathBuf>,
}

impl StorageArea {
    /// In-memory area (sessionStorage)
    pub fn session() -> Self {
        Self {
            kind: StorageKind::Session,
            slots: Vec::new(),
            index: HashMap::new(),
            vacant: BTreeSet::new(),
            used: 0,
            quota: Some(DEFAULT_QUOTA),
            path: None,
        }
    }

    /// localStorage area, persisted to `path` when given
    pub fn local(path: Option<PathBuf>) -> Result<Self, StorageError> {
        let mut area = Self {
            kind: StorageKind::Local,
            slots: Vec::new(),
            index: HashMap::new(),
            vacant: BTreeSet::new(),
            used: 0,
            quota: Some(DEFAULT_QUOTA),
            path: None,
        };
        if let Some(path) = path {
            if path.exists() {
                let contents = fs::read_to_string(&path).map_err(|source| StorageError::Io {
                    path: path.clone(),
                    source,
                })?;
                for line in contents.lines() {
                    if let Some((key, value)) = line.split_once('\t') {
                        area.insert(unescape(key), unescape(value));
                    }
                }
                tracing::debug!(path = %path.display(), items = area.len(), "loaded local storage");
            }
            area.path = Some(path);
        }
        Ok(area)
    }

    pub fn with_quota(mut self, quota: Option<usize>) -> Self {
        self.quota = quota;
        self
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn live(&self) -> impl Iterator<Item = &(String, String)> {
        self.slots.iter().flatten()
    }

    /// Key at position `index` among the stored items
    pub fn key(&self, index: usize) -> Option<&str> {
        if self.vacant.is_empty() {
            return self.slots.get(index)?.as_ref().map(|(k, _)| k.as_str());
        }
        self.live().nth(index).map(|(k, _)| k.as_str())
    }

    pub fn keys(&self) -> Vec<String> {
        self.live().map(|(k, _)| k.clone()).collect()
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        let i = *self.index.get(key)?;
        self.slots[i].as_ref().map(|(_, v)| v.as_str())
    }

    /// Characters currently stored
    pub fn used(&self) -> usize {
        self.used
    }

    /// Slots a live enumeration can currently reach
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// `remainingSpace`; unbounded areas report `usize::MAX`
    pub fn remaining_space(&self) -> usize {
        self.quota.map_or(usize::MAX, |q| q.saturating_sub(self.used()))
    }

    fn insert(&mut self, key: String, value: String) -> Option<String> {
        let added = value.chars().count();
        if let Some(&i) = self.index.get(&key) {
            let old = self.slots[i]
                .as_mut()
                .map(|entry| std::mem::replace(&mut entry.1, value));
            let freed = old.as_ref().map_or(0, |v| v.chars().count());
            self.used = self.used - freed + added;
            return old;
        }
        self.used += key.chars().count() + added;
        match self.vacant.pop_first() {
            Some(i) => {
                self.index.insert(key.clone(), i);
                self.slots[i] = Some((key, value));
            }
            None => {
                self.index.insert(key.clone(), self.slots.len());
                self.slots.push(Some((key, value)));
            }
        }
        None
    }

    fn change(&self, key: Option<&str>, old_value: Option<String>, new_value: Option<String>) -> StorageChange {
        StorageChange {
            kind: self.kind,
            key: key.map(str::to_string),
            old_value,
            new_value,
        }
    }

    /// `setItem`; `None` when the stored value was already `value`
    pub fn set_item(&mut self, key: &str, value: &str) -> Result<Option<StorageChange>, StorageError> {
        let old = self.get_item(key).map(str::to_string);
        if old.as_deref() == Some(value) {
            return Ok(None);
        }
        if let Some(quota) = self.quota {
            let freed = old
                .as_ref()
                .map_or(0, |v| v.chars().count() + key.chars().count());
            let needed = key.chars().count() + value.chars().count();
            if self.used - freed + needed > quota {
                return Err(StorageError::QuotaExceeded { quota });
            }
        }
        self.insert(key.to_string(), value.to_string());
        self.persist()?;
        tracing::debug!(kind = ?self.kind, key, "storage item set");
        Ok(Some(self.change(Some(key), old, Some(value.to_string()))))
    }

    /// `removeItem`; `None` when `key` was absent
    pub fn remove_item(&mut self, key: &str) -> Result<Option<StorageChange>, StorageError> {
        let Some(i) = self.index.remove(key) else {
            return Ok(None);
        };
        let old = self.slots[i].take().map(|(_, v)| v);
        self.vacant.insert(i);
        self.used -= key.chars().count() + old.as_ref().map_or(0, |v| v.chars().count());
        self.persist()?;
        tracing::debug!(kind = ?self.kind, key, "storage item removed");
        Ok(Some(self.change(Some(key), old, None)))
    }

    /// `clear`; `None` when the area was already empty
    pub fn clear(&mut self) -> Result<Option<StorageChange>, StorageError> {
        if self.is_empty() {
            return Ok(None);
        }
        self.slots.clear();
        self.vacant.clear();
        self.index.clear();
        self.used = 0;
        self.persist()?;
        tracing::debug!(kind = ?self.kind, "storage cleared");
        Ok(Some(self.change(None, None, None)))
    }

    /// Slot view used by `for..in`
    pub fn slot(&self, index: usize) -> NamedSlot {
        match self.slots.get(index) {
            Some(Some((k, _))) => NamedSlot::Live(k.clone()),
            Some(None) => NamedSlot::Vacant,
            None => NamedSlot::End,
        }
    }

    pub fn cursor(&self) -> StorageCursor {
        StorageCursor { next: 0 }
    }

    fn persist(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents: String = self
            .live()
            .map(|(k, v)| format!("{}\t{}\n", escape(k), escape(v)))
            .collect();
        fs::write(path, contents).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\t', "\\t").replace('\n', "\\n")
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Live enumeration over a [`StorageArea`]
#[derive(Debug, Clone)]
pub struct StorageCursor {
    next: usize,
}

impl StorageCursor {
    pub fn next(&mut self, area: &StorageArea) -> Option<String> {
        loop {
            let slot = area.slot(self.next);
            self.next += 1;
            match slot {
                NamedSlot::Live(key) => return Some(key),
                NamedSlot::Vacant => continue,
                NamedSlot::End => return None,
            }
        }
    }
}

/// A window's view of a shared area. Changes made through the handle are
/// queued for the embedder to turn into storage events.
#[derive(Debug, Clone)]
pub struct StorageHandle {
    area: Rc<RefCell<StorageArea>>,
    changes: Rc<RefCell<Vec<StorageChange>>>,
}

impl StorageHandle {
    pub fn new(area: Rc<RefCell<StorageArea>>) -> Self {
        Self {
            area,
            changes: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn area(&self) -> &Rc<RefCell<StorageArea>> {
        &self.area
    }

    /// Drain the changes recorded since the last call
    pub fn take_changes(&self) -> Vec<StorageChange> {
        std::mem::take(&mut *self.changes.borrow_mut())
    }

    fn record(&self, change: Option<StorageChange>) {
        if let Some(change) = change {
            self.changes.borrow_mut().push(change);
        }
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let change = self.area.borrow_mut().set_item(key, value)?;
        self.record(change);
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let change = self.area.borrow_mut().remove_item(key)?;
        self.record(change);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        let change = self.area.borrow_mut().clear()?;
        self.record(change);
        Ok(())
    }
}

impl HostData for StorageHandle {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn has_named_items(&self) -> bool {
        true
    }

    fn named_item(&self, name: &str) -> Option<Value> {
        self.area.borrow().get_item(name).map(Value::string)
    }

    fn set_named_item(&mut self, name: &str, value: &str) -> bool {
        self.set_item(name, value).is_ok()
    }

    fn delete_named_item(&mut self, name: &str) -> bool {
        self.remove_item(name).is_ok()
    }

    fn named_slot(&self, index: usize) -> NamedSlot {
        self.area.borrow().slot(index)
    }

    fn named_slot_count(&self) -> usize {
        self.area.borrow().slot_count()
    }
}

// ============================================================================
// Natives
// ============================================================================

fn this_storage(realm: &Realm, this: &Value) -> DomResult<StorageHandle> {
    this.as_object()
        .and_then(|id| realm.obj(id).host_data::<StorageHandle>())
        .cloned()
        .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
}

fn key_arg(realm: &mut Realm, args: &[Value], i: usize) -> DomResult<String> {
    realm.to_string(&arg(args, i))
}

/// Expose `handle` as a `Storage` host object
pub fn create_storage_object(realm: &mut Realm, handle: StorageHandle) -> DomResult<ObjectId> {
    realm.create_host("Storage", docmode_dom::ObjectData::Host(Box::new(handle)))
}

pub(crate) fn install(realm: &mut Realm) {
    let natives = realm.natives_mut();

    natives.getter("Storage", "length", |realm, this, _| {
        let handle = this_storage(realm, this)?;
        let len = handle.area().borrow().len();
        Ok(Value::Number(len as f64))
    });
    natives.getter("Storage", "remainingSpace", |realm, this, _| {
        let handle = this_storage(realm, this)?;
        let space = handle.area().borrow().remaining_space();
        Ok(Value::Number(space as f64))
    });
    natives.method("Storage", "key", |realm, this, args| {
        let handle = this_storage(realm, this)?;
        let index = realm.to_number(&arg(args, 0))?;
        if !(index >= 0.0 && index.is_finite()) {
            return Ok(Value::Null);
        }
        let area = handle.area().borrow();
        Ok(area.key(index as usize).map_or(Value::Null, Value::string))
    });
    natives.method("Storage", "getItem", |realm, this, args| {
        let handle = this_storage(realm, this)?;
        let key = key_arg(realm, args, 0)?;
        let area = handle.area().borrow();
        Ok(area.get_item(&key).map_or(Value::Null, Value::string))
    });
    natives.method("Storage", "setItem", |realm, this, args| {
        let handle = this_storage(realm, this)?;
        let key = key_arg(realm, args, 0)?;
        let value = key_arg(realm, args, 1)?;
        handle.set_item(&key, &value)?;
        Ok(Value::Undefined)
    });
    natives.method("Storage", "removeItem", |realm, this, args| {
        let handle = this_storage(realm, this)?;
        let key = key_arg(realm, args, 0)?;
        handle.remove_item(&key)?;
        Ok(Value::Undefined)
    });
    natives.method("Storage", "clear", |realm, this, _| {
        let handle = this_storage(realm, this)?;
        handle.clear()?;
        Ok(Value::Undefined)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> StorageArea {
        let mut area = StorageArea::session();
        for key in ["foobar", "barfoo", "abcd", "dcba"] {
            area.set_item(key, "x").unwrap();
        }
        area
    }

    #[test]
    fn test_session_storage() {
        let mut area = StorageArea::session();
        area.set_item("key1", "value1").unwrap();
        assert_eq!(area.get_item("key1"), Some("value1"));
        area.set_item("key2", "value2").unwrap();
        assert_eq!(area.len(), 2);
        assert_eq!(area.key(1), Some("key2"));
        area.remove_item("key1").unwrap();
        assert_eq!(area.get_item("key1"), None);
        assert_eq!(area.key(0), Some("key2"));
        area.clear().unwrap();
        assert!(area.is_empty());
    }

    #[test]
    fn test_change_records() {
        let mut area = StorageArea::session();
        let change = area.set_item("k", "v").unwrap().unwrap();
        assert_eq!(change.key.as_deref(), Some("k"));
        assert_eq!(change.old_value, None);
        assert_eq!(change.new_value.as_deref(), Some("v"));
        assert!(area.set_item("k", "v").unwrap().is_none());
        assert!(area.remove_item("missing").unwrap().is_none());
        let cleared = area.clear().unwrap().unwrap();
        assert_eq!(cleared.key, None);
        assert!(area.clear().unwrap().is_none());
    }

    #[test]
    fn test_enumeration_during_mutation() {
        let mut area = filled();
        let mut cursor = area.cursor();
        let mut seen = Vec::new();
        while let Some(key) = cursor.next(&area) {
            if seen.len() == 1 {
                area.remove_item("abcd").unwrap();
                area.set_item("new", "new").unwrap();
            }
            seen.push(key);
        }
        assert_eq!(seen, vec!["foobar", "barfoo", "new", "dcba"]);
    }

    #[test]
    fn test_new_key_takes_vacant_slot() {
        let mut area = filled();
        area.remove_item("barfoo").unwrap();
        area.set_item("other", "y").unwrap();
        assert_eq!(area.keys(), vec!["foobar", "other", "abcd", "dcba"]);
        assert_eq!(area.slot_count(), 4);
    }

    #[test]
    fn test_set_remove_cycles_do_not_grow() {
        let mut area = StorageArea::session();
        for i in 0..100 {
            let key = format!("key{i}");
            area.set_item(&key, "value").unwrap();
            area.remove_item(&key).unwrap();
        }
        assert_eq!(area.slot_count(), 1);
        assert_eq!(area.used(), 0);

        area.set_item("a", "bc").unwrap();
        area.set_item("d", "e").unwrap();
        assert_eq!(area.used(), 5);
        area.set_item("a", "b").unwrap();
        assert_eq!(area.used(), 4);
        area.clear().unwrap();
        assert_eq!(area.slot_count(), 0);
        assert_eq!(area.used(), 0);
    }

    #[test]
    fn test_quota() {
        let mut area = StorageArea::session().with_quota(Some(10));
        area.set_item("abc", "defg").unwrap();
        assert_eq!(area.remaining_space(), 3);
        let err = area.set_item("x", "yyyy").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 10 }));
        area.set_item("abc", "d").unwrap();
        assert_eq!(area.remaining_space(), 6);
    }

    #[test]
    fn test_escape_roundtrip() {
        let raw = "a\tb\nc\\d";
        assert_eq!(unescape(&escape(raw)), raw);
    }

    #[test]
    fn test_local_storage_persists() {
        let path = std::env::temp_dir().join(format!("docmode-storage-{}.tsv", std::process::id()));
        let _ = fs::remove_file(&path);
        {
            let mut area = StorageArea::local(Some(path.clone())).unwrap();
            area.set_item("greeting", "hello\tworld").unwrap();
        }
        let area = StorageArea::local(Some(path.clone())).unwrap();
        assert_eq!(area.get_item("greeting"), Some("hello\tworld"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_handle_queues_changes() {
        let area = Rc::new(RefCell::new(StorageArea::session()));
        let mut handle = StorageHandle::new(area.clone());
        assert!(handle.set_named_item("a", "1"));
        handle.set_item("a", "1").unwrap();
        handle.remove_item("a").unwrap();
        let changes = handle.take_changes();
        assert_eq!(changes.len(), 2);
        assert!(handle.take_changes().is_empty());
        assert!(area.borrow().is_empty());
    }
}
