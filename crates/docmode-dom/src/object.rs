//! Object Heap
//!
//! Arena of host and script objects with ordered, tombstoned property maps.

use crate::error::DomResult;
use crate::events::{EventData, EventTargetData};
use crate::graph::InterfaceId;
use crate::node::NodeData;
use crate::realm::Realm;
use crate::value::{ObjectId, Value};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Property attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyFlags {
    pub enumerable: bool,
    pub writable: bool,
    pub configurable: bool,
}

impl PropertyFlags {
    /// Plain assignment
    pub const DEFAULT: Self = Self {
        enumerable: true,
        writable: true,
        configurable: true,
    };
    /// Builtin data members (methods on prototypes, `constructor`)
    pub const HIDDEN: Self = Self {
        enumerable: false,
        writable: true,
        configurable: true,
    };
    pub const FROZEN: Self = Self {
        enumerable: false,
        writable: false,
        configurable: false,
    };
}

#[derive(Debug, Clone)]
pub enum PropertyValue {
    Data(Value),
    Accessor {
        get: Option<ObjectId>,
        set: Option<ObjectId>,
    },
}

#[derive(Debug, Clone)]
pub struct Property {
    pub value: PropertyValue,
    pub flags: PropertyFlags,
}

impl Property {
    pub fn data(value: Value) -> Self {
        Self::with_flags(value, PropertyFlags::DEFAULT)
    }

    pub fn hidden(value: Value) -> Self {
        Self::with_flags(value, PropertyFlags::HIDDEN)
    }

    pub fn with_flags(value: Value, flags: PropertyFlags) -> Self {
        Self {
            value: PropertyValue::Data(value),
            flags,
        }
    }

    pub fn accessor(get: Option<ObjectId>, set: Option<ObjectId>, flags: PropertyFlags) -> Self {
        Self {
            value: PropertyValue::Accessor { get, set },
            flags,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self.value, PropertyValue::Accessor { .. })
    }
}

#[derive(Debug, Clone)]
struct Slot {
    name: Box<str>,
    /// `None` marks a deleted entry
    prop: Option<Property>,
}

/// Insertion-ordered property storage; deleted names leave tombstones and a
/// re-added name takes its old slot back
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    slots: Vec<Slot>,
    index: HashMap<Box<str>, usize>,
}

impl PropertyMap {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.index.get(name).and_then(|&i| self.slots[i].prop.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Property> {
        let i = *self.index.get(name)?;
        self.slots[i].prop.as_mut()
    }

    pub fn contains(&self, name: &str) -> bool { self.get(name).is_some() }

    /// Insert or replace; returns the previous live property
    pub fn insert(&mut self, name: &str, prop: Property) -> Option<Property> {
        match self.index.get(name) {
            Some(&i) => self.slots[i].prop.replace(prop),
            None => {
                self.index.insert(name.into(), self.slots.len());
                self.slots.push(Slot {
                    name: name.into(),
                    prop: Some(prop),
                });
                None
            }
        }
    }

    /// Tombstone `name`; returns the removed property
    pub fn remove(&mut self, name: &str) -> Option<Property> {
        let i = *self.index.get(name)?;
        self.slots[i].prop.take()
    }

    /// Number of slots, tombstones included
    pub fn slot_count(&self) -> usize { self.slots.len() }

    /// Live entry at slot `i`
    pub fn slot(&self, i: usize) -> Option<(&str, &Property)> {
        let slot = self.slots.get(i)?;
        slot.prop.as_ref().map(|p| (&*slot.name, p))
    }

    /// Live entries in slot order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.slots
            .iter()
            .filter_map(|s| s.prop.as_ref().map(|p| (&*s.name, p)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> { self.iter().map(|(k, _)| k) }

    pub fn len(&self) -> usize { self.iter().count() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Body of a script-defined function
pub type ScriptFn = Rc<dyn Fn(&mut Realm, Value, &[Value]) -> DomResult<Value>>;

/// Function created from script (or from Rust on behalf of script)
#[derive(Clone)]
pub struct ScriptFunction {
    pub name: String,
    pub length: u32,
    /// Text returned by `toString`
    pub source: Option<String>,
    pub body: ScriptFn,
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFunction")
            .field("name", &self.name)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Which half of a member a native function implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeRole {
    Method,
    Getter,
    Setter,
    /// Function hanging off an interface object (`Object.keys`)
    Static,
    Constructor,
    /// Interface object invoked without `new`
    Call,
}

/// Function object backed by the native registry
#[derive(Debug, Clone)]
pub struct NativeFunction {
    pub iface: InterfaceId,
    pub member: &'static str,
    pub role: NativeRole,
    pub length: u8,
    /// Legacy method objects remember the instance they were read from
    pub owner: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub enum FunctionKind {
    Script(ScriptFunction),
    Native(NativeFunction),
    Bound {
        target: ObjectId,
        this: Value,
        args: Vec<Value>,
    },
    /// `f.call` / `f.apply` read from a legacy host method
    CallHelper { target: ObjectId, apply: bool },
    /// Handler compiled from a content attribute
    Compiled { source: String },
    /// `function() {}`
    Empty,
}

/// Slot of a named item exposed by a [`HostData`] provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedSlot {
    Live(String),
    Vacant,
    End,
}

/// State owned by another crate (storage areas, collections, XHR)
pub trait HostData: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Whether non-builtin names are routed to the named-item hooks
    fn has_named_items(&self) -> bool { false }
    fn named_item(&self, _name: &str) -> Option<Value> { None }
    /// Returns false when the item could not be stored
    fn set_named_item(&mut self, _name: &str, _value: &str) -> bool { false }
    fn delete_named_item(&mut self, _name: &str) -> bool { false }
    /// Stable slot view used by live enumeration
    fn named_slot(&self, _index: usize) -> NamedSlot { NamedSlot::End }
    /// Slots currently in use; an enumeration stops at the count it started with
    fn named_slot_count(&self) -> usize { 0 }
}

/// Per-window state
#[derive(Debug, Clone)]
pub struct WindowData {
    pub document: ObjectId,
    pub parent: Option<ObjectId>,
}

#[derive(Debug)]
pub enum ObjectData {
    Ordinary,
    Array(Vec<Value>),
    Function(FunctionKind),
    /// Interface prototype object of the object's class
    Prototype,
    /// Interface object (constructor) of the object's class
    Interface,
    Node(NodeData),
    Window(WindowData),
    /// NodeList / HTMLCollection snapshot
    List(Vec<ObjectId>),
    Event(EventData),
    Host(Box<dyn HostData>),
    /// Host instance without extra state
    Plain,
}

/// One heap object
#[derive(Debug)]
pub struct HostObject {
    pub class: InterfaceId,
    pub proto: Option<ObjectId>,
    pub extensible: bool,
    pub props: PropertyMap,
    /// Builtins deleted from a standard-mode prototype
    pub removed: Vec<&'static str>,
    /// Backing store for schema properties without dedicated accessors
    pub fields: HashMap<&'static str, Value>,
    pub target: EventTargetData,
    pub data: ObjectData,
}

impl HostObject {
    pub fn new(class: InterfaceId, proto: Option<ObjectId>, data: ObjectData) -> Self {
        Self {
            class,
            proto,
            extensible: true,
            props: PropertyMap::new(),
            removed: Vec::new(),
            fields: HashMap::new(),
            target: EventTargetData::default(),
            data,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.data, ObjectData::Function(_) | ObjectData::Interface)
    }

    pub fn is_prototype(&self) -> bool {
        matches!(self.data, ObjectData::Prototype)
    }

    pub fn function(&self) -> Option<&FunctionKind> {
        match &self.data {
            ObjectData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn node(&self) -> Option<&NodeData> {
        match &self.data {
            ObjectData::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn node_mut(&mut self) -> Option<&mut NodeData> {
        match &mut self.data {
            ObjectData::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn host_data<T: HostData>(&self) -> Option<&T> {
        match &self.data {
            ObjectData::Host(h) => h.as_any().downcast_ref(),
            _ => None,
        }
    }

    pub fn host_data_mut<T: HostData>(&mut self) -> Option<&mut T> {
        match &mut self.data {
            ObjectData::Host(h) => h.as_any_mut().downcast_mut(),
            _ => None,
        }
    }

    pub fn named_items(&self) -> Option<&dyn HostData> {
        match &self.data {
            ObjectData::Host(h) if h.has_named_items() => Some(h.as_ref()),
            _ => None,
        }
    }

    pub fn named_items_mut(&mut self) -> Option<&mut Box<dyn HostData>> {
        match &mut self.data {
            ObjectData::Host(h) if h.has_named_items() => Some(h),
            _ => None,
        }
    }
}

/// Object arena; ids are never reused
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HostObject>,
}

impl Heap {
    pub fn new() -> Self { Self::default() }

    pub fn alloc(&mut self, obj: HostObject) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(obj);
        id
    }

    pub fn get(&self, id: ObjectId) -> &HostObject { &self.objects[id.index()] }

    pub fn get_mut(&mut self, id: ObjectId) -> &mut HostObject { &mut self.objects[id.index()] }

    pub fn len(&self) -> usize { self.objects.len() }

    pub fn is_empty(&self) -> bool { self.objects.is_empty() }
}
