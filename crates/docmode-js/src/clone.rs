//! Structured Clone
//!
//! Copies `postMessage` payloads out of one realm and into another.

use docmode_dom::{DomError, DomResult, ErrorKind, ObjectData, ObjectId, Realm, Value};

/// Realm-independent snapshot of a cloneable value
#[derive(Debug, Clone, PartialEq)]
pub enum CloneData {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<CloneData>),
    Object(Vec<(String, CloneData)>),
}

fn data_clone_error(what: &str) -> DomError {
    DomError::new(ErrorKind::InvalidArg, format!("DataCloneError: {what} could not be cloned"))
}

impl CloneData {
    /// Snapshot `value` from `realm`. Functions, host objects and cyclic
    /// structures are rejected.
    pub fn serialize(realm: &mut Realm, value: &Value) -> DomResult<Self> {
        let mut stack = Vec::new();
        Self::walk(realm, value, &mut stack)
    }

    /// Mode 9 delivers every message as its string conversion
    pub fn serialize_for_mode(realm: &mut Realm, value: &Value) -> DomResult<Self> {
        if realm.mode_version() == 9 {
            return Ok(CloneData::String(realm.to_string(value)?));
        }
        Self::serialize(realm, value)
    }

    fn walk(realm: &mut Realm, value: &Value, stack: &mut Vec<ObjectId>) -> DomResult<Self> {
        let id = match value {
            Value::Undefined => return Ok(CloneData::Undefined),
            Value::Null => return Ok(CloneData::Null),
            Value::Bool(b) => return Ok(CloneData::Bool(*b)),
            Value::Number(n) => return Ok(CloneData::Number(*n)),
            Value::String(s) => return Ok(CloneData::String(s.clone())),
            Value::Object(id) => *id,
        };
        if stack.contains(&id) {
            return Err(data_clone_error("cyclic value"));
        }
        let items = match &realm.obj(id).data {
            ObjectData::Array(items) => Some(items.clone()),
            ObjectData::Ordinary => None,
            ObjectData::Function(_) => return Err(data_clone_error("function")),
            _ => return Err(data_clone_error("host object")),
        };
        stack.push(id);
        let result = match items {
            Some(items) => items
                .iter()
                .map(|v| Self::walk(realm, v, stack))
                .collect::<DomResult<Vec<_>>>()
                .map(CloneData::Array),
            None => Self::walk_fields(realm, id, stack).map(CloneData::Object),
        };
        stack.pop();
        result
    }

    fn walk_fields(
        realm: &mut Realm,
        id: ObjectId,
        stack: &mut Vec<ObjectId>,
    ) -> DomResult<Vec<(String, CloneData)>> {
        let mut fields = Vec::new();
        for key in realm.keys(id) {
            let v = realm.get(id, &key)?;
            fields.push((key, Self::walk(realm, &v, stack)?));
        }
        Ok(fields)
    }

    /// Recreate the value inside `realm`
    pub fn materialize(&self, realm: &mut Realm) -> DomResult<Value> {
        Ok(match self {
            CloneData::Undefined => Value::Undefined,
            CloneData::Null => Value::Null,
            CloneData::Bool(b) => Value::Bool(*b),
            CloneData::Number(n) => Value::Number(*n),
            CloneData::String(s) => Value::String(s.clone()),
            CloneData::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| item.materialize(realm))
                    .collect::<DomResult<Vec<_>>>()?;
                Value::Object(realm.create_array(values))
            }
            CloneData::Object(fields) => {
                let obj = realm.create_object();
                for (key, item) in fields {
                    let v = item.materialize(realm)?;
                    realm.set(obj, key, v)?;
                }
                Value::Object(obj)
            }
        })
    }
}

/// Clone `value` from `src` into `dst`
pub fn structured_clone(src: &mut Realm, dst: &mut Realm, value: &Value) -> DomResult<Value> {
    CloneData::serialize_for_mode(src, value)?.materialize(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmode_dom::DocumentMode;

    #[test]
    fn test_primitives_survive() {
        let mut src = Realm::new(DocumentMode::IE10);
        let mut dst = Realm::new(DocumentMode::IE10);
        for v in [Value::from(10), Value::string("x"), Value::Bool(true), Value::Null] {
            assert_eq!(structured_clone(&mut src, &mut dst, &v).unwrap(), v);
        }
    }

    #[test]
    fn test_mode_9_stringifies() {
        let mut src = Realm::new(DocumentMode::IE9);
        let mut dst = Realm::new(DocumentMode::IE9);
        let v = structured_clone(&mut src, &mut dst, &Value::from(10)).unwrap();
        assert_eq!(v, Value::string("10"));
    }

    #[test]
    fn test_nested_object_is_copied() {
        let mut src = Realm::new(DocumentMode::IE11);
        let inner = src.create_array(vec![Value::from(1), Value::from(2)]);
        let outer = src.create_object();
        src.set(outer, "list", Value::Object(inner)).unwrap();
        src.set(outer, "name", Value::string("msg")).unwrap();

        let mut dst = Realm::new(DocumentMode::IE11);
        let copy = structured_clone(&mut src, &mut dst, &Value::Object(outer)).unwrap();
        let copy = copy.as_object().unwrap();
        assert_eq!(dst.get(copy, "name").unwrap(), Value::string("msg"));
        let list = dst.get(copy, "list").unwrap().as_object().unwrap();
        assert_eq!(dst.array_items(list).unwrap(), &[Value::from(1), Value::from(2)]);
    }

    #[test]
    fn test_functions_rejected() {
        let mut realm = Realm::new(DocumentMode::IE10);
        let f = realm.create_native_closure("f", 0, |_, _, _| Ok(Value::Undefined));
        let err = CloneData::serialize(&mut realm, &Value::Object(f)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArg);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut realm = Realm::new(DocumentMode::IE10);
        let obj = realm.create_object();
        realm.set(obj, "me", Value::Object(obj)).unwrap();
        assert!(CloneData::serialize(&mut realm, &Value::Object(obj)).is_err());
    }
}
