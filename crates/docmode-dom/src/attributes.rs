//! Element Attributes
//!
//! Ordered, namespace-aware content attribute list.

use crate::error::{DomError, DomResult, ErrorKind};
use crate::value::Value;

/// Single content attribute
#[derive(Debug, Clone)]
pub struct Attr {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local_name: String,
    /// Strings in standard modes; the shared store of mode 8 keeps raw values
    pub value: Value,
}

impl Attr {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            namespace: None,
            prefix: None,
            local_name: name.into(),
            value,
        }
    }

    /// `prefix:local` or just `local`
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.local_name),
            None => self.local_name.clone(),
        }
    }

    fn matches_qualified(&self, name: &str) -> bool {
        match &self.prefix {
            Some(p) => name
                .split_once(':')
                .is_some_and(|(np, nl)| np.eq_ignore_ascii_case(p) && nl.eq_ignore_ascii_case(&self.local_name)),
            None => self.local_name.eq_ignore_ascii_case(name),
        }
    }

    fn matches_ns(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.namespace.as_deref() == namespace && self.local_name == local_name
    }
}

/// `""` and null name the same (absent) namespace
pub fn normalize_namespace(ns: Option<&str>) -> Option<&str> {
    ns.filter(|s| !s.is_empty())
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Split a qualified name for `namespace`
pub fn parse_qualified_name(
    namespace: Option<&str>,
    qualified: &str,
) -> DomResult<(Option<String>, String)> {
    if !valid_name(qualified) {
        return Err(DomError::new(ErrorKind::InvalidCharacter, qualified));
    }
    match qualified.split_once(':') {
        Some((prefix, local)) => {
            if prefix.is_empty() || local.is_empty() || local.contains(':') {
                return Err(DomError::new(ErrorKind::Namespace, qualified));
            }
            if normalize_namespace(namespace).is_none() {
                return Err(DomError::new(ErrorKind::Namespace, qualified));
            }
            Ok((Some(prefix.to_string()), local.to_string()))
        }
        None => Ok((None, qualified.to_string())),
    }
}

/// Attribute collection of one element
#[derive(Debug, Clone, Default)]
pub struct AttributeList {
    attributes: Vec<Attr>,
}

impl AttributeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&Attr> {
        self.attributes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.attributes.iter()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.matches_qualified(name))
    }

    fn position_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<usize> {
        let ns = normalize_namespace(namespace);
        self.attributes.iter().position(|a| a.matches_ns(ns, local_name))
    }

    /// First attribute whose qualified name matches (ASCII case-insensitive)
    pub fn get(&self, name: &str) -> Option<&Attr> {
        self.position(name).map(|i| &self.attributes[i])
    }

    pub fn get_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<&Attr> {
        self.position_ns(namespace, local_name).map(|i| &self.attributes[i])
    }

    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn has_ns(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.position_ns(namespace, local_name).is_some()
    }

    /// Update the first match or append a null-namespace attribute
    pub fn set(&mut self, name: &str, value: Value) {
        match self.position(name) {
            Some(i) => self.attributes[i].value = value,
            None => self.attributes.push(Attr::new(name, value)),
        }
    }

    /// `setAttributeNS`: matched by namespace and local name
    pub fn set_ns(&mut self, namespace: Option<&str>, qualified: &str, value: Value) -> DomResult<()> {
        let (prefix, local_name) = parse_qualified_name(namespace, qualified)?;
        let namespace = normalize_namespace(namespace);
        match self.position_ns(namespace, &local_name) {
            Some(i) => {
                let attr = &mut self.attributes[i];
                attr.prefix = prefix;
                attr.value = value;
            }
            None => self.attributes.push(Attr {
                namespace: namespace.map(str::to_string),
                prefix,
                local_name,
                value,
            }),
        }
        Ok(())
    }

    /// Remove the first match
    pub fn remove(&mut self, name: &str) -> Option<Attr> {
        self.position(name).map(|i| self.attributes.remove(i))
    }

    pub fn remove_ns(&mut self, namespace: Option<&str>, local_name: &str) -> Option<Attr> {
        self.position_ns(namespace, local_name)
            .map(|i| self.attributes.remove(i))
    }

    pub fn names(&self) -> Vec<String> {
        self.attributes.iter().map(Attr::qualified_name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECIAL: &str = "http://www.mozilla.org/ns/specialspace";

    #[test]
    fn test_set_get_attribute() {
        let mut attrs = AttributeList::new();
        attrs.set("class", Value::string("btn"));
        attrs.set("ID", Value::string("submit"));
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("id").map(|a| a.value.clone()), Some(Value::string("submit")));
        attrs.set("Class", Value::string("other"));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_prefixed_attribute() {
        let mut attrs = AttributeList::new();
        attrs.set_ns(Some(SPECIAL), "spec:align", Value::string("left")).unwrap();
        assert!(attrs.has("spec:align"));
        assert!(!attrs.has("align"));
        assert!(attrs.has_ns(Some(SPECIAL), "align"));
        assert!(!attrs.has_ns(None, "align"));
        assert!(!attrs.has_ns(Some(SPECIAL), "spec:align"));
    }

    #[test]
    fn test_prefix_without_namespace() {
        let mut attrs = AttributeList::new();
        let err = attrs.set_ns(None, "spec:align", Value::string("x")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Namespace);
        let err = attrs.set_ns(Some(""), "spec:align", Value::string("x")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Namespace);
    }

    #[test]
    fn test_empty_namespace_is_null() {
        let mut attrs = AttributeList::new();
        attrs.set("emptynsattr", Value::string("none"));
        attrs.set_ns(Some(""), "emptynsattr", Value::string("test")).unwrap();
        assert_eq!(attrs.len(), 1);
        attrs.set_ns(Some(SPECIAL), "emptynsattr", Value::string("ns")).unwrap();
        assert_eq!(attrs.get("emptynsattr").map(|a| a.value.clone()), Some(Value::string("test")));

        attrs.remove_ns(Some(""), "emptynsattr");
        assert_eq!(attrs.get("emptynsattr").map(|a| a.value.clone()), Some(Value::string("ns")));
        attrs.set("emptynsattr", Value::string("again"));
        assert_eq!(
            attrs.get_ns(Some(SPECIAL), "emptynsattr").map(|a| a.value.clone()),
            Some(Value::string("again"))
        );
    }

    #[test]
    fn test_remove_twice() {
        let mut attrs = AttributeList::new();
        attrs.set("foo", Value::string("bar"));
        assert!(attrs.remove("foo").is_some());
        assert!(attrs.remove("foo").is_none());
    }
}
