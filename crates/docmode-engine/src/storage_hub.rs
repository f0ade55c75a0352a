//! Storage Hub
//!
//! Owns the storage areas browsing contexts share and decides who hears
//! about a mutation.

use crate::error::EngineResult;
use crate::event_loop::{ContextId, TaskKind};
use docmode_js::{Location, StorageArea, StorageChange, StorageError, StorageKind};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

type SharedArea = Rc<RefCell<StorageArea>>;

#[derive(Debug, Default)]
pub struct StorageHub {
    /// Keyed by top-level context and origin
    session: HashMap<(ContextId, String), SharedArea>,
    /// Keyed by origin
    local: HashMap<String, SharedArea>,
    /// Directory local areas persist into
    local_dir: Option<PathBuf>,
}

/// Origin key; `None` for opaque origins, which never share an area
fn origin_key(location: &Location) -> Option<String> {
    let origin = location.url().origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

fn file_name(origin: &str) -> String {
    let name: String = origin
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect();
    format!("{name}.tsv")
}

impl StorageHub {
    pub fn new(local_dir: Option<PathBuf>) -> Self {
        Self {
            local_dir,
            ..Self::default()
        }
    }

    /// sessionStorage of a document under top-level context `top`
    pub fn session_area(&mut self, top: ContextId, location: &Location) -> SharedArea {
        let Some(origin) = origin_key(location) else {
            return Rc::new(RefCell::new(StorageArea::session()));
        };
        self.session
            .entry((top, origin))
            .or_insert_with(|| Rc::new(RefCell::new(StorageArea::session())))
            .clone()
    }

    /// localStorage of the document's origin, loaded from disk on first use
    pub fn local_area(&mut self, location: &Location) -> EngineResult<SharedArea> {
        let Some(origin) = origin_key(location) else {
            return Ok(Rc::new(RefCell::new(StorageArea::local(None)?)));
        };
        if let Some(area) = self.local.get(&origin) {
            return Ok(area.clone());
        }
        let path = match &self.local_dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|source| StorageError::Io {
                    path: dir.clone(),
                    source,
                })?;
                Some(dir.join(file_name(&origin)))
            }
            None => None,
        };
        let area = Rc::new(RefCell::new(StorageArea::local(path)?));
        tracing::debug!(origin = %origin, "local storage area opened");
        self.local.insert(origin, area.clone());
        Ok(area)
    }

    /// Drop the session areas of a closed top-level context
    pub fn close_session(&mut self, top: ContextId) {
        self.session.retain(|(owner, _), _| *owner != top);
    }
}

/// Tasks announcing `change`, made through `mutator`, to the contexts
/// sharing the area. `sharers` lists every context using the area, the
/// mutator included, oldest first.
///
/// Session changes reach the other sharers, newest first, and then the
/// mutator itself. Local changes reach only the other sharers and give the
/// mutator a `storagecommit`.
pub fn notifications(
    change: &StorageChange,
    mutator: ContextId,
    url: &str,
    sharers: &[ContextId],
) -> Vec<(ContextId, TaskKind)> {
    let storage = || TaskKind::Storage {
        change: change.clone(),
        url: url.to_string(),
    };
    let mut tasks: Vec<(ContextId, TaskKind)> = sharers
        .iter()
        .rev()
        .filter(|id| **id != mutator)
        .map(|id| (*id, storage()))
        .collect();
    match change.kind {
        StorageKind::Session => tasks.push((mutator, storage())),
        StorageKind::Local => tasks.push((mutator, TaskKind::StorageCommit { url: url.to_string() })),
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(href: &str) -> Location {
        Location::parse(href).unwrap()
    }

    fn change(kind: StorageKind) -> StorageChange {
        StorageChange {
            kind,
            key: Some("foobar".to_string()),
            old_value: None,
            new_value: Some("test".to_string()),
        }
    }

    fn targets(tasks: &[(ContextId, TaskKind)]) -> Vec<(usize, bool)> {
        tasks
            .iter()
            .map(|(id, kind)| (id.index(), matches!(kind, TaskKind::StorageCommit { .. })))
            .collect()
    }

    #[test]
    fn test_session_areas_per_top_level_context() {
        let mut hub = StorageHub::new(None);
        let here = location("http://winetest.example.org/index.html");
        let frame = location("http://winetest.example.org/blank.html");

        let a = hub.session_area(ContextId(0), &here);
        let b = hub.session_area(ContextId(0), &frame);
        let c = hub.session_area(ContextId(5), &here);
        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));

        hub.close_session(ContextId(0));
        let d = hub.session_area(ContextId(0), &here);
        assert!(!Rc::ptr_eq(&a, &d));
    }

    #[test]
    fn test_local_areas_per_origin() {
        let mut hub = StorageHub::new(None);
        let a = hub.local_area(&location("http://winetest.example.org/a")).unwrap();
        let b = hub.local_area(&location("http://winetest.example.org/b#x")).unwrap();
        let c = hub.local_area(&location("http://winetest.example.org:8080/")).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));

        // about:blank never shares
        let d = hub.local_area(&location("about:blank")).unwrap();
        let e = hub.local_area(&location("about:blank")).unwrap();
        assert!(!Rc::ptr_eq(&d, &e));
    }

    #[test]
    fn test_session_notifications_include_mutator_last() {
        let sharers = [ContextId(0), ContextId(1), ContextId(2)];
        let tasks = notifications(&change(StorageKind::Session), ContextId(1), "u", &sharers);
        assert_eq!(targets(&tasks), vec![(2, false), (0, false), (1, false)]);
    }

    #[test]
    fn test_local_notifications_commit_on_mutator() {
        let sharers = [ContextId(0), ContextId(1)];
        let tasks = notifications(&change(StorageKind::Local), ContextId(0), "u", &sharers);
        assert_eq!(targets(&tasks), vec![(1, false), (0, true)]);

        let alone = notifications(&change(StorageKind::Local), ContextId(0), "u", &[ContextId(0)]);
        assert_eq!(targets(&alone), vec![(0, true)]);
    }

    #[test]
    fn test_file_name_is_flat() {
        assert_eq!(file_name("http://winetest.example.org:8080"), "http___winetest.example.org_8080.tsv");
    }
}
