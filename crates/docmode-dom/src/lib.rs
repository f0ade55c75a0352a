//! docmode DOM - Document-mode aware host objects
//!
//! One realm per window: the interface graph of a compatibility mode, the
//! object heap and the property resolver that sits between scripts and it.
//!
//! Features:
//! - Mode resolution and feature gates (quirks through IE11)
//! - Legacy (<9) and standard (>=9) property resolution
//! - Attribute reflection per mode
//! - Node tree, elements, documents, selectors and events

mod attributes;
mod document;
mod element;
mod error;
mod events;
mod graph;
mod interfaces;
mod markup;
mod mode;
mod natives;
mod node;
mod object;
mod realm;
mod reflect;
mod resolver;
mod selector;
mod value;
mod window;

pub use attributes::{normalize_namespace, parse_qualified_name, Attr, AttributeList};
pub use element::{StyleData, TokenListData};
pub use error::{DomError, DomResult, ErrorKind, ScriptException};
pub use events::{phase, EventData, EventTargetData, HandlerSlot, HandlerValue, Listener};
pub use graph::{build_graph, Graph, GraphNode, InterfaceId};
pub use interfaces::{
    descriptor, element_interface_for_tag, CtorKind, InterfaceDescriptor, MemberDescriptor, MemberKind,
    NamedConstructor, INTERFACES, NAMED_CONSTRUCTORS,
};
pub use mode::{is_feature_enabled, resolve_mode, DocumentMode, Feature, ModeCell, ModeError};
pub use node::{DocumentData, ElementData, NodeData, NodeKind, ReadyState};
pub use object::{
    FunctionKind, HostData, HostObject, NamedSlot, NativeRole, ObjectData, PropertyFlags, ScriptFn,
    ScriptFunction, WindowData,
};
pub use realm::{arg, Intrinsics, NativeFn, NativeRegistry, Realm, ScriptHost};
pub use reflect::AttributeModel;
pub use resolver::{ForIn, PropertyDescriptor, PropertyModel};
pub use selector::SelectorList;
pub use value::{number_to_string, string_to_number, ObjectId, Value};
pub use window::{app_version, evaluate_media_query, TIMING_FIELDS};
