//! Realm
//!
//! Heap, prototypes, interface objects and the call machinery of one window.

use crate::error::{DomError, DomResult, ErrorKind};
use crate::graph::{build_graph, Graph, InterfaceId};
use crate::interfaces::{
    descriptor, element_interface_for_tag, CtorKind, InterfaceDescriptor, MemberDescriptor,
    MemberKind, NamedConstructor,
};
use crate::mode::{DocumentMode, Feature, ModeCell};
use crate::node::{DocumentData, ElementData, NodeData, NodeKind};
use crate::object::{
    FunctionKind, Heap, HostObject, NativeFunction, NativeRole, ObjectData, Property,
    PropertyFlags, ScriptFunction, WindowData,
};
use crate::resolver::{self, PropertyModel};
use crate::value::{string_to_number, ObjectId, Value};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Rust implementation of one native member
pub type NativeFn = Rc<dyn Fn(&mut Realm, &Value, &[Value]) -> DomResult<Value>>;

/// Member name under which constructors are registered
pub const CONSTRUCTOR: &str = "constructor";

/// Argument `i`, undefined when missing
pub fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// Native implementations keyed by (interface, member, role)
#[derive(Default)]
pub struct NativeRegistry {
    entries: HashMap<(&'static str, &'static str, NativeRole), NativeFn>,
}

impl fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl NativeRegistry {
    pub fn register(
        &mut self,
        iface: &'static str,
        member: &'static str,
        role: NativeRole,
        f: impl Fn(&mut Realm, &Value, &[Value]) -> DomResult<Value> + 'static,
    ) {
        self.entries.insert((iface, member, role), Rc::new(f));
    }

    pub fn method(
        &mut self,
        iface: &'static str,
        member: &'static str,
        f: impl Fn(&mut Realm, &Value, &[Value]) -> DomResult<Value> + 'static,
    ) {
        self.register(iface, member, NativeRole::Method, f);
    }

    pub fn getter(
        &mut self,
        iface: &'static str,
        member: &'static str,
        f: impl Fn(&mut Realm, &Value, &[Value]) -> DomResult<Value> + 'static,
    ) {
        self.register(iface, member, NativeRole::Getter, f);
    }

    /// Setters receive the assigned value as their only argument
    pub fn setter(
        &mut self,
        iface: &'static str,
        member: &'static str,
        f: impl Fn(&mut Realm, &Value, &[Value]) -> DomResult<Value> + 'static,
    ) {
        self.register(iface, member, NativeRole::Setter, f);
    }

    pub fn static_fn(
        &mut self,
        iface: &'static str,
        member: &'static str,
        f: impl Fn(&mut Realm, &Value, &[Value]) -> DomResult<Value> + 'static,
    ) {
        self.register(iface, member, NativeRole::Static, f);
    }

    /// `new Iface(...)`
    pub fn constructor(
        &mut self,
        iface: &'static str,
        f: impl Fn(&mut Realm, &Value, &[Value]) -> DomResult<Value> + 'static,
    ) {
        self.register(iface, CONSTRUCTOR, NativeRole::Constructor, f);
    }

    /// `Iface(...)` without `new`
    pub fn call(
        &mut self,
        iface: &'static str,
        f: impl Fn(&mut Realm, &Value, &[Value]) -> DomResult<Value> + 'static,
    ) {
        self.register(iface, CONSTRUCTOR, NativeRole::Call, f);
    }

    pub fn lookup(&self, iface: &'static str, member: &'static str, role: NativeRole) -> Option<NativeFn> {
        self.entries.get(&(iface, member, role)).cloned()
    }

    /// Nearest implementation along the static parent chain
    pub fn resolve(
        &self,
        desc: &'static InterfaceDescriptor,
        member: &'static str,
        role: NativeRole,
    ) -> Option<NativeFn> {
        let mut cur = Some(desc);
        while let Some(d) = cur {
            if let Some(f) = self.lookup(d.name, member, role) {
                return Some(f);
            }
            cur = d.parent.and_then(descriptor);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Runs handler source compiled from content attributes
pub trait ScriptHost {
    fn run_handler(&self, realm: &mut Realm, source: &str, this: Value, args: &[Value]) -> DomResult<Value>;
}

/// Well-known objects
#[derive(Debug, Clone, Copy)]
pub struct Intrinsics {
    pub object_prototype: ObjectId,
    pub function_prototype: ObjectId,
    pub array_prototype: ObjectId,
    pub string_prototype: ObjectId,
    pub number_prototype: ObjectId,
    pub boolean_prototype: ObjectId,
    pub window: ObjectId,
    pub document: ObjectId,
}

impl Default for Intrinsics {
    fn default() -> Self {
        let none = ObjectId(0);
        Self {
            object_prototype: none,
            function_prototype: none,
            array_prototype: none,
            string_prototype: none,
            number_prototype: none,
            boolean_prototype: none,
            window: none,
            document: none,
        }
    }
}

/// Object world of one window in one document mode
pub struct Realm {
    mode: DocumentMode,
    model: PropertyModel,
    graph: Graph,
    pub(crate) heap: Heap,
    natives: NativeRegistry,
    fn_cache: HashMap<(ObjectId, &'static str, NativeRole), ObjectId>,
    prototypes: HashMap<InterfaceId, ObjectId>,
    interface_objects: HashMap<InterfaceId, ObjectId>,
    named_ctors: HashMap<ObjectId, &'static NamedConstructor>,
    named_ctor_objects: HashMap<&'static str, ObjectId>,
    intrinsics: Intrinsics,
    script_host: Option<Rc<dyn ScriptHost>>,
    clock: f64,
}

impl fmt::Debug for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Realm")
            .field("mode", &self.mode)
            .field("model", &self.model)
            .field("objects", &self.heap.len())
            .field("natives", &self.natives)
            .finish_non_exhaustive()
    }
}

impl Realm {
    /// Build the window, its document and every interface object of `mode`
    pub fn new(mode: DocumentMode) -> Self {
        let mut realm = Self {
            mode,
            model: PropertyModel::for_mode(mode),
            graph: build_graph(mode),
            heap: Heap::new(),
            natives: NativeRegistry::default(),
            fn_cache: HashMap::new(),
            prototypes: HashMap::new(),
            interface_objects: HashMap::new(),
            named_ctors: HashMap::new(),
            named_ctor_objects: HashMap::new(),
            intrinsics: Intrinsics::default(),
            script_host: None,
            clock: 0.0,
        };
        realm.create_prototypes();
        realm.create_interface_objects();
        realm.create_named_constructors();
        realm.create_window();

        crate::natives::install(&mut realm);
        crate::node::install(&mut realm);
        crate::events::install(&mut realm);
        crate::element::install(&mut realm);
        crate::document::install(&mut realm);
        crate::window::install(&mut realm);

        tracing::debug!(
            mode = %mode,
            interfaces = realm.graph.iter().count(),
            objects = realm.heap.len(),
            natives = realm.natives.len(),
            "realm ready"
        );
        realm
    }

    fn create_prototypes(&mut self) {
        let legacy = self.model.is_legacy();
        let nodes: Vec<(InterfaceId, Option<InterfaceId>, bool)> = self
            .graph
            .iter()
            .map(|n| (n.id, n.parent, n.desc.is_script_builtin()))
            .collect();
        for (id, parent, script) in nodes {
            let proto = if legacy && !script {
                None
            } else if id == InterfaceId::OBJECT {
                None
            } else {
                let chained = parent.unwrap_or(InterfaceId::OBJECT);
                self.prototypes.get(&chained).copied()
            };
            let obj = self.heap.alloc(HostObject::new(id, proto, ObjectData::Prototype));
            self.prototypes.insert(id, obj);
        }

        let proto_of = |realm: &Self, name: &str| {
            realm
                .graph
                .by_name(name)
                .and_then(|id| realm.prototypes.get(&id).copied())
                .unwrap_or(ObjectId(0))
        };
        self.intrinsics.object_prototype = proto_of(self, "Object");
        self.intrinsics.function_prototype = proto_of(self, "Function");
        self.intrinsics.array_prototype = proto_of(self, "Array");
        self.intrinsics.string_prototype = proto_of(self, "String");
        self.intrinsics.number_prototype = proto_of(self, "Number");
        self.intrinsics.boolean_prototype = proto_of(self, "Boolean");
    }

    fn create_interface_objects(&mut self) {
        let legacy = self.model.is_legacy();
        let version = self.mode.version();
        let function_proto = self.intrinsics.function_prototype;
        let nodes: Vec<(InterfaceId, &'static InterfaceDescriptor)> =
            self.graph.iter().map(|n| (n.id, n.desc)).collect();

        for (id, desc) in nodes {
            let script = desc.is_script_builtin();
            let wanted = !legacy
                || script
                || matches!(desc.ctor, CtorKind::Constructible | CtorKind::Callable);
            let Some(&proto) = self.prototypes.get(&id) else {
                continue;
            };
            if !wanted {
                continue;
            }
            let obj = self
                .heap
                .alloc(HostObject::new(id, Some(function_proto), ObjectData::Interface));
            let ctor = self.heap.get_mut(obj);
            ctor.props
                .insert("prototype", Property::with_flags(Value::Object(proto), PropertyFlags::FROZEN));
            ctor.fields.insert("name", Value::string(desc.name));
            self.interface_objects.insert(id, obj);

            if !legacy || script || version >= 8 {
                self.heap
                    .get_mut(proto)
                    .props
                    .insert("constructor", Property::hidden(Value::Object(obj)));
            }
        }
    }

    fn create_named_constructors(&mut self) {
        let function_proto = self.intrinsics.function_prototype;
        let ctors: Vec<&'static NamedConstructor> = self.graph.named_constructors().collect();
        for nc in ctors {
            let Some(class) = self.graph.by_name(nc.interface) else {
                continue;
            };
            let proto = self.prototypes.get(&class).copied();
            let obj = self
                .heap
                .alloc(HostObject::new(class, Some(function_proto), ObjectData::Interface));
            let ctor = self.heap.get_mut(obj);
            if let Some(proto) = proto {
                ctor.props
                    .insert("prototype", Property::with_flags(Value::Object(proto), PropertyFlags::FROZEN));
            }
            ctor.fields.insert("name", Value::string(nc.name));
            self.named_ctors.insert(obj, nc);
            self.named_ctor_objects.insert(nc.name, obj);
        }
    }

    fn create_window(&mut self) {
        let doc_name = if self.graph.by_name("HTMLDocument").is_some() {
            "HTMLDocument"
        } else {
            "Document"
        };
        let doc_class = self.class_or_root(doc_name);
        let doc_data = DocumentData {
            url: "about:blank".to_string(),
            mode: ModeCell::bound(self.mode),
            ..DocumentData::default()
        };
        let document = self.alloc_instance(
            doc_class,
            ObjectData::Node(NodeData::new(NodeKind::Document(doc_data), None)),
        );

        let win_class = self.class_or_root("Window");
        let window = self.alloc_instance(
            win_class,
            ObjectData::Window(WindowData {
                document,
                parent: None,
            }),
        );
        if let Some(d) = self.document_data_mut(document) {
            d.window = Some(window);
        }
        self.intrinsics.window = window;
        self.intrinsics.document = document;

        let html = self.alloc_element("html");
        let head = self.alloc_element("head");
        let body = self.alloc_element("body");
        self.attach_child(document, html);
        self.attach_child(html, head);
        self.attach_child(html, body);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn mode(&self) -> DocumentMode {
        self.mode
    }

    pub fn mode_version(&self) -> u8 {
        self.mode.version()
    }

    pub fn model(&self) -> PropertyModel {
        self.model
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    pub fn obj(&self, id: ObjectId) -> &HostObject {
        self.heap.get(id)
    }

    pub fn obj_mut(&mut self, id: ObjectId) -> &mut HostObject {
        self.heap.get_mut(id)
    }

    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    pub fn natives_mut(&mut self) -> &mut NativeRegistry {
        &mut self.natives
    }

    pub fn window(&self) -> ObjectId {
        self.intrinsics.window
    }

    pub fn document(&self) -> ObjectId {
        self.intrinsics.document
    }

    /// Owner document for new nodes; `None` while bootstrapping
    pub(crate) fn document_opt(&self) -> Option<ObjectId> {
        let doc = self.intrinsics.document;
        (doc.index() < self.heap.len() && self.document_data(doc).is_some()).then_some(doc)
    }

    pub fn document_element(&self) -> Option<ObjectId> {
        self.children(self.document()).into_iter().find(|c| self.is_element(*c))
    }

    fn root_child(&self, tag: &str) -> Option<ObjectId> {
        let html = self.document_element()?;
        self.children(html)
            .into_iter()
            .find(|c| self.tag_name(*c) == Some(tag))
    }

    pub fn head(&self) -> Option<ObjectId> {
        self.root_child("head")
    }

    pub fn body(&self) -> Option<ObjectId> {
        self.root_child("body")
    }

    /// Interface prototype object of `name`
    pub fn prototype(&self, name: &str) -> Option<ObjectId> {
        self.graph
            .by_name(name)
            .and_then(|id| self.prototypes.get(&id).copied())
    }

    pub(crate) fn prototype_of_class(&self, class: InterfaceId) -> Option<ObjectId> {
        self.prototypes.get(&class).copied()
    }

    /// Interface object of `name`; legacy modes only have them for
    /// constructible interfaces
    pub fn interface_object(&self, name: &str) -> Option<ObjectId> {
        self.graph
            .by_name(name)
            .and_then(|id| self.interface_objects.get(&id).copied())
    }

    pub fn named_constructor(&self, name: &str) -> Option<ObjectId> {
        self.named_ctor_objects.get(name).copied()
    }

    /// `window.<key>` for interface names
    pub(crate) fn global_value(&self, key: &str) -> Option<Value> {
        if let Some(&ctor) = self.named_ctor_objects.get(key) {
            return Some(Value::Object(ctor));
        }
        let id = self.graph.global(key)?;
        self.interface_objects
            .get(&id)
            .or_else(|| self.prototypes.get(&id))
            .map(|o| Value::Object(*o))
    }

    pub fn set_script_host(&mut self, host: Rc<dyn ScriptHost>) {
        self.script_host = Some(host);
    }

    /// Monotonic timestamp source for events
    pub fn next_timestamp(&mut self) -> f64 {
        self.clock += 1.0;
        self.clock
    }

    /// Move the timestamp clock forward to `now`
    pub fn advance_clock(&mut self, now: f64) {
        self.clock = self.clock.max(now);
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    fn class_or_root(&self, name: &str) -> InterfaceId {
        self.graph.by_name(name).unwrap_or(InterfaceId::OBJECT)
    }

    /// Prototype a fresh instance of `class` starts with
    pub(crate) fn instance_proto(&self, class: InterfaceId) -> Option<ObjectId> {
        let desc = self.graph.node(class).desc;
        if desc.prototype_less && !self.model.is_legacy() {
            None
        } else {
            self.prototypes.get(&class).copied()
        }
    }

    pub(crate) fn alloc_instance(&mut self, class: InterfaceId, data: ObjectData) -> ObjectId {
        let proto = self.instance_proto(class);
        self.heap.alloc(HostObject::new(class, proto, data))
    }

    /// Instance of the interface called `name`
    pub fn create_host(&mut self, name: &str, data: ObjectData) -> DomResult<ObjectId> {
        let class = self
            .graph
            .by_name(name)
            .ok_or_else(|| DomError::new(ErrorKind::InvalidArg, format!("no interface {name} in this mode")))?;
        Ok(self.alloc_instance(class, data))
    }

    /// Element class for `tag`, falling back to `HTMLUnknownElement`
    pub(crate) fn element_class(&self, tag: &str) -> InterfaceId {
        let name = element_interface_for_tag(tag, self.mode.version());
        self.graph
            .by_name(&name)
            .or_else(|| self.graph.by_name("HTMLUnknownElement"))
            .unwrap_or(InterfaceId::OBJECT)
    }

    /// Element with an already validated tag name
    pub(crate) fn alloc_element(&mut self, tag: &str) -> ObjectId {
        let class = self.element_class(tag);
        let data = ElementData {
            tag: tag.to_ascii_lowercase(),
            ..ElementData::default()
        };
        let owner = self.document_opt();
        self.alloc_instance(class, ObjectData::Node(NodeData::new(NodeKind::Element(data), owner)))
    }

    /// `{}`
    pub fn create_object(&mut self) -> ObjectId {
        let proto = self.intrinsics.object_prototype;
        self.heap
            .alloc(HostObject::new(InterfaceId::OBJECT, Some(proto), ObjectData::Ordinary))
    }

    /// Ordinary object with an explicit prototype
    pub fn create_object_with_proto(&mut self, proto: Option<ObjectId>) -> ObjectId {
        self.heap
            .alloc(HostObject::new(InterfaceId::OBJECT, proto, ObjectData::Ordinary))
    }

    pub fn create_array(&mut self, items: Vec<Value>) -> ObjectId {
        let class = self.class_or_root("Array");
        let proto = self.intrinsics.array_prototype;
        self.heap
            .alloc(HostObject::new(class, Some(proto), ObjectData::Array(items)))
    }

    pub fn array_items(&self, id: ObjectId) -> Option<&[Value]> {
        match &self.obj(id).data {
            ObjectData::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Function object of any kind
    pub fn create_function_object(&mut self, kind: FunctionKind, name: &str, length: u32) -> ObjectId {
        let class = self.class_or_root("Function");
        let proto = self.intrinsics.function_prototype;
        let is_script = matches!(kind, FunctionKind::Script(_));
        let id = self
            .heap
            .alloc(HostObject::new(class, Some(proto), ObjectData::Function(kind)));
        {
            let f = self.heap.get_mut(id);
            f.fields.insert("name", Value::string(name));
            f.fields.insert("length", Value::from(length as f64));
        }
        if !self.is_legacy_host(id) {
            self.heap.get_mut(id).props.insert(
                "length",
                Property::with_flags(Value::from(length as f64), PropertyFlags::FROZEN),
            );
        }
        if is_script {
            let prototype = self.create_object();
            self.heap
                .get_mut(prototype)
                .props
                .insert("constructor", Property::hidden(Value::Object(id)));
            self.heap.get_mut(id).props.insert(
                "prototype",
                Property::with_flags(
                    Value::Object(prototype),
                    PropertyFlags {
                        enumerable: false,
                        writable: true,
                        configurable: false,
                    },
                ),
            );
        }
        id
    }

    /// Script-visible function backed by a Rust closure
    pub fn create_native_closure(
        &mut self,
        name: &str,
        length: u32,
        body: impl Fn(&mut Realm, Value, &[Value]) -> DomResult<Value> + 'static,
    ) -> ObjectId {
        let func = ScriptFunction {
            name: name.to_string(),
            length,
            source: None,
            body: Rc::new(body),
        };
        self.create_function_object(FunctionKind::Script(func), name, length)
    }

    /// Cached function object for a schema member read from `holder`
    pub(crate) fn member_function(
        &mut self,
        holder: ObjectId,
        iface: InterfaceId,
        member: &'static MemberDescriptor,
        role: NativeRole,
        owner: Option<ObjectId>,
    ) -> ObjectId {
        if let Some(&f) = self.fn_cache.get(&(holder, member.name, role)) {
            return f;
        }
        let length = match (member.kind, role) {
            (MemberKind::Method { length }, _) => length,
            (_, NativeRole::Setter) => 1,
            _ => 0,
        };
        let native = NativeFunction {
            iface,
            member: member.name,
            role,
            length,
            owner,
        };
        let f = self.create_function_object(FunctionKind::Native(native), member.name, length as u32);
        self.fn_cache.insert((holder, member.name, role), f);
        f
    }

    /// Static function hanging off an interface object
    pub(crate) fn static_function(
        &mut self,
        holder: ObjectId,
        iface: InterfaceId,
        name: &'static str,
        length: u8,
    ) -> ObjectId {
        if let Some(&f) = self.fn_cache.get(&(holder, name, NativeRole::Static)) {
            return f;
        }
        let native = NativeFunction {
            iface,
            member: name,
            role: NativeRole::Static,
            length,
            owner: None,
        };
        let f = self.create_function_object(FunctionKind::Native(native), name, length as u32);
        self.fn_cache.insert((holder, name, NativeRole::Static), f);
        f
    }

    // ========================================================================
    // Classification
    // ========================================================================

    /// Objects resolved by the legacy (non-prototype) rules
    pub fn is_legacy_host(&self, id: ObjectId) -> bool {
        if !self.model.is_legacy() {
            return false;
        }
        let obj = self.obj(id);
        match &obj.data {
            ObjectData::Function(FunctionKind::Native(nf)) => {
                !self.graph.node(nf.iface).desc.is_script_builtin()
            }
            ObjectData::Function(FunctionKind::CallHelper { .. }) => true,
            ObjectData::Function(_) | ObjectData::Ordinary | ObjectData::Array(_) => false,
            _ => !self.graph.node(obj.class).desc.is_script_builtin(),
        }
    }

    pub fn is_callable(&self, v: &Value) -> bool {
        let Some(id) = v.as_object() else {
            return false;
        };
        let obj = self.obj(id);
        match obj.data {
            ObjectData::Function(_) => true,
            ObjectData::Interface => {
                self.named_ctors.contains_key(&id)
                    || self.graph.node(obj.class).desc.ctor != CtorKind::NotConstructible
            }
            _ => false,
        }
    }

    /// `typeof v`
    pub fn type_of(&self, v: &Value) -> &'static str {
        let Some(id) = v.as_object() else {
            return v.primitive_type();
        };
        let obj = self.obj(id);
        match obj.data {
            ObjectData::Function(_) if self.is_legacy_host(id) => "object",
            ObjectData::Function(_) => "function",
            ObjectData::Interface => {
                let desc = self.graph.node(obj.class).desc;
                let constructible = self.named_ctors.contains_key(&id) || desc.ctor != CtorKind::NotConstructible;
                if self.model.is_legacy() && !desc.is_script_builtin() {
                    "object"
                } else if constructible {
                    "function"
                } else {
                    "object"
                }
            }
            _ => "object",
        }
    }

    /// Receiver of a native that needs an object
    pub fn this_object(&self, this: &Value) -> DomResult<ObjectId> {
        this.as_object()
            .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
    }

    /// Function `name` as reported by `toString`
    pub fn function_name(&self, id: ObjectId) -> String {
        self.obj(id)
            .fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// `f.call(this, ...args)`
    pub fn call(&mut self, f: &Value, this: Value, args: &[Value]) -> DomResult<Value> {
        let Some(id) = f.as_object() else {
            return Err(DomError::kind(ErrorKind::FunctionExpected));
        };
        let kind = match &self.obj(id).data {
            ObjectData::Function(kind) => Some(kind.clone()),
            ObjectData::Interface => None,
            _ => return Err(DomError::kind(ErrorKind::FunctionExpected)),
        };
        let Some(kind) = kind else {
            return self.call_interface(id, args);
        };
        match kind {
            FunctionKind::Script(func) => (func.body)(self, this, args),
            FunctionKind::Native(native) => self.call_native(&native, this, args),
            FunctionKind::Bound {
                target,
                this: bound_this,
                args: mut bound,
            } => {
                bound.extend_from_slice(args);
                self.call(&Value::Object(target), bound_this, &bound)
            }
            FunctionKind::CallHelper { target, apply } => self.call_helper(target, apply, this, args),
            FunctionKind::Compiled { source } => match self.script_host.clone() {
                Some(host) => host.run_handler(self, &source, this, args),
                None => {
                    tracing::debug!(len = source.len(), "no script host; compiled handler skipped");
                    Ok(Value::Undefined)
                }
            },
            FunctionKind::Empty => Ok(Value::Undefined),
        }
    }

    fn call_native(&mut self, native: &NativeFunction, this: Value, args: &[Value]) -> DomResult<Value> {
        let desc = self.graph.node(native.iface).desc;
        let this = match native.role {
            NativeRole::Static | NativeRole::Constructor | NativeRole::Call => this,
            _ if desc.is_script_builtin() => this,
            _ => Value::Object(self.check_this(native, this)?),
        };
        match native.role {
            NativeRole::Getter | NativeRole::Setter => {
                let Some(member) = self.graph.node(native.iface).own_member(native.member) else {
                    return Ok(Value::Undefined);
                };
                if native.role == NativeRole::Getter {
                    resolver::accessor_get(self, native.iface, member, &this)
                } else {
                    resolver::accessor_set(self, native.iface, member, &this, arg(args, 0))?;
                    Ok(Value::Undefined)
                }
            }
            role => match self.natives.resolve(desc, native.member, role) {
                Some(f) => f(self, &this, args),
                None => {
                    tracing::trace!(iface = desc.name, member = native.member, "member has no native body");
                    Ok(Value::Undefined)
                }
            },
        }
    }

    /// Validate the receiver of a host member call
    fn check_this(&self, native: &NativeFunction, this: Value) -> DomResult<ObjectId> {
        let legacy = self.model.is_legacy();
        let mismatch = || {
            DomError::kind(if legacy {
                ErrorKind::InvalidProcedureCall
            } else {
                ErrorKind::Unexpected
            })
        };
        match this {
            Value::Undefined if legacy => native.owner.ok_or_else(mismatch),
            Value::Undefined | Value::Null => {
                if !legacy && self.graph.name(native.iface) == "Window" {
                    Ok(self.window())
                } else {
                    Err(mismatch())
                }
            }
            Value::Object(id) => {
                let obj = self.obj(id);
                if obj.is_prototype() {
                    return Err(DomError::kind(if legacy {
                        ErrorKind::InvalidProperty
                    } else {
                        ErrorKind::Unexpected
                    }));
                }
                if !self.graph.implements(obj.class, native.iface) {
                    return Err(mismatch());
                }
                Ok(id)
            }
            _ => Err(mismatch()),
        }
    }

    fn call_helper(&mut self, target: ObjectId, apply: bool, this: Value, args: &[Value]) -> DomResult<Value> {
        if this.as_object() != Some(target) {
            return Err(DomError::kind(ErrorKind::InvalidProperty));
        }
        let this_arg = match arg(args, 0) {
            v if v.is_nullish() => Value::Null,
            v => v,
        };
        let rest = if apply {
            self.array_like(&arg(args, 1))?
        } else {
            args.get(1..).unwrap_or_default().to_vec()
        };
        self.call(&Value::Object(target), this_arg, &rest)
    }

    /// Elements of an array-like argument
    pub fn array_like(&mut self, v: &Value) -> DomResult<Vec<Value>> {
        let id = match v {
            Value::Undefined | Value::Null => return Ok(Vec::new()),
            Value::Object(id) => *id,
            _ => return Err(DomError::kind(ErrorKind::ObjectExpected)),
        };
        if let Some(items) = self.array_items(id) {
            return Ok(items.to_vec());
        }
        let len = self.get(id, "length")?;
        let len = self.to_number(&len)?;
        let len = if len.is_finite() && len > 0.0 { len as usize } else { 0 };
        (0..len).map(|i| self.get(id, &i.to_string())).collect()
    }

    fn call_interface(&mut self, id: ObjectId, args: &[Value]) -> DomResult<Value> {
        if self.named_ctors.contains_key(&id) {
            return self.construct(&Value::Object(id), args);
        }
        let desc = self.graph.node(self.obj(id).class).desc;
        match desc.ctor {
            CtorKind::Callable => self.construct_interface(id, args),
            CtorKind::Constructible | CtorKind::Script => {
                match self.natives.lookup(desc.name, CONSTRUCTOR, NativeRole::Call) {
                    Some(f) => f(self, &Value::Undefined, args),
                    None => Err(DomError::kind(ErrorKind::InvalidAction)),
                }
            }
            CtorKind::NotConstructible => Err(DomError::kind(ErrorKind::InvalidAction)),
        }
    }

    /// `new f(...args)`
    pub fn construct(&mut self, f: &Value, args: &[Value]) -> DomResult<Value> {
        let Some(id) = f.as_object() else {
            return Err(DomError::kind(ErrorKind::InvalidAction));
        };
        let func = match &self.obj(id).data {
            ObjectData::Interface => None,
            ObjectData::Function(kind) => Some(kind.clone()),
            _ => return Err(DomError::kind(ErrorKind::InvalidAction)),
        };
        let Some(func) = func else {
            return self.construct_interface(id, args);
        };
        match func {
            FunctionKind::Script(script) => {
                let proto = match self.get(id, "prototype")? {
                    Value::Object(p) => p,
                    _ => self.intrinsics.object_prototype,
                };
                let obj = self.create_object_with_proto(Some(proto));
                let ret = (script.body)(self, Value::Object(obj), args)?;
                Ok(if ret.as_object().is_some() { ret } else { Value::Object(obj) })
            }
            FunctionKind::Bound {
                target,
                args: mut bound,
                ..
            } => {
                bound.extend_from_slice(args);
                self.construct(&Value::Object(target), &bound)
            }
            _ => Err(DomError::kind(if self.model.is_legacy() {
                ErrorKind::InvalidProperty
            } else {
                ErrorKind::Unexpected
            })),
        }
    }

    fn construct_interface(&mut self, id: ObjectId, args: &[Value]) -> DomResult<Value> {
        if let Some(nc) = self.named_ctors.get(&id).copied() {
            let el = self.alloc_element(nc.tag);
            if nc.name == "Image" {
                for (i, dim) in ["width", "height"].into_iter().enumerate() {
                    if let Some(v) = args.get(i) {
                        let n = self.to_number(v)?;
                        self.obj_mut(el).fields.insert(dim, Value::Number(n));
                    }
                }
            }
            return Ok(Value::Object(el));
        }
        let class = self.obj(id).class;
        let desc = self.graph.node(class).desc;
        match desc.ctor {
            CtorKind::NotConstructible => return Err(DomError::kind(ErrorKind::InvalidAction)),
            CtorKind::Callable => {
                if args.is_empty() {
                    return Err(DomError::kind(ErrorKind::Unexpected));
                }
                if !self.is_callable(&args[0]) {
                    return Err(DomError::kind(ErrorKind::TypeMismatch));
                }
            }
            CtorKind::Constructible | CtorKind::Script => {}
        }
        match self.natives.lookup(desc.name, CONSTRUCTOR, NativeRole::Constructor) {
            Some(f) => f(self, &Value::Undefined, args),
            None => Ok(Value::Object(self.alloc_instance(class, ObjectData::Plain))),
        }
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Script `ToString`
    pub fn to_string(&mut self, v: &Value) -> DomResult<String> {
        match v {
            Value::Object(id) => {
                if self.is_legacy_host(*id) {
                    return self.legacy_host_string(*id);
                }
                let prim = self.to_primitive(*id, &["toString", "valueOf"])?;
                Ok(prim.primitive_to_string().unwrap_or_default())
            }
            _ => Ok(v.primitive_to_string().unwrap_or_default()),
        }
    }

    /// Host-side string coercion; `valueOf` goes first before mode 10
    pub fn host_to_string(&mut self, v: &Value) -> DomResult<String> {
        let Value::Object(id) = v else {
            return self.to_string(v);
        };
        if self.is_legacy_host(*id) {
            return self.legacy_host_string(*id);
        }
        let order: [&str; 2] = if self.mode.supports(Feature::ToStringFirst) {
            ["toString", "valueOf"]
        } else {
            ["valueOf", "toString"]
        };
        let prim = self.to_primitive(*id, &order)?;
        Ok(prim.primitive_to_string().unwrap_or_default())
    }

    /// Script `ToNumber`
    pub fn to_number(&mut self, v: &Value) -> DomResult<f64> {
        Ok(match v {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Object(id) => {
                if self.is_legacy_host(*id) {
                    let s = self.legacy_host_string(*id)?;
                    return Ok(string_to_number(&s));
                }
                let prim = self.to_primitive(*id, &["valueOf", "toString"])?;
                return self.to_number(&prim);
            }
        })
    }

    fn to_primitive(&mut self, id: ObjectId, order: &[&str]) -> DomResult<Value> {
        for name in order {
            let f = self.get(id, name)?;
            if self.is_callable(&f) {
                let r = self.call(&f, Value::Object(id), &[])?;
                if r.as_object().is_none() {
                    return Ok(r);
                }
            }
        }
        Err(DomError::kind(ErrorKind::ObjectExpected))
    }

    fn legacy_host_string(&mut self, id: ObjectId) -> DomResult<String> {
        let obj = self.obj(id);
        if obj.is_prototype() {
            return Ok("[Interface prototype object]".to_string());
        }
        if obj.is_function() {
            return Ok(format!(
                "\nfunction {}() {{\n    [native code]\n}}\n",
                self.function_name(id)
            ));
        }
        let f = resolver::legacy::get(self, id, "toString")?;
        if !self.is_callable(&f) {
            return Ok("[object]".to_string());
        }
        let r = self.call(&f, Value::Object(id), &[])?;
        self.to_string(&r)
    }

    /// `Object.prototype.toString.call(v)`
    pub fn object_to_string(&self, v: &Value) -> String {
        let legacy = self.model.is_legacy();
        let tag = match v {
            Value::Undefined if legacy => "Object".to_string(),
            Value::Null if legacy => "Object".to_string(),
            Value::Undefined => "Undefined".to_string(),
            Value::Null => "Null".to_string(),
            Value::Bool(_) => "Boolean".to_string(),
            Value::Number(_) => "Number".to_string(),
            Value::String(_) => "String".to_string(),
            Value::Object(id) => self.class_tag(*id),
        };
        format!("[object {tag}]")
    }

    fn class_tag(&self, id: ObjectId) -> String {
        let obj = self.obj(id);
        let desc = self.graph.node(obj.class).desc;
        if self.is_legacy_host(id) {
            return "Object".to_string();
        }
        match obj.data {
            ObjectData::Function(_) => "Function".to_string(),
            ObjectData::Array(_) => "Array".to_string(),
            ObjectData::Ordinary => "Object".to_string(),
            ObjectData::Prototype if desc.is_script_builtin() => desc.class_tag().to_string(),
            ObjectData::Prototype => format!("{}Prototype", desc.name),
            ObjectData::Interface => {
                if self.named_ctors.contains_key(&id) || desc.ctor != CtorKind::NotConstructible {
                    "Function".to_string()
                } else {
                    desc.name.to_string()
                }
            }
            _ => desc.class_tag().to_string(),
        }
    }

    /// `v instanceof ctor`
    pub fn instance_of(&mut self, v: &Value, ctor: &Value) -> DomResult<bool> {
        let Some(ctor_id) = ctor.as_object() else {
            return Err(DomError::kind(ErrorKind::FunctionExpected));
        };
        let Some(id) = v.as_object() else {
            return Ok(false);
        };
        if self.is_legacy_host(id) {
            return Ok(false);
        }
        let Value::Object(proto) = self.get(ctor_id, "prototype")? else {
            return Err(DomError::kind(ErrorKind::ObjectExpected));
        };
        let mut cur = self.obj(id).proto;
        while let Some(p) = cur {
            if p == proto {
                return Ok(true);
            }
            cur = self.obj(p).proto;
        }
        Ok(false)
    }

    /// Source text of a function object
    pub fn function_source(&self, id: ObjectId) -> Option<String> {
        let name = self.function_name(id);
        let native = || format!("\nfunction {name}() {{\n    [native code]\n}}\n");
        Some(match &self.obj(id).data {
            ObjectData::Function(FunctionKind::Script(s)) => match &s.source {
                Some(src) => src.clone(),
                None => native(),
            },
            ObjectData::Function(FunctionKind::Compiled { source }) => {
                format!("function {name}(event) {{\n{source}\n}}")
            }
            ObjectData::Function(FunctionKind::Empty) => "function() {}".to_string(),
            ObjectData::Function(_) | ObjectData::Interface => native(),
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_tree() {
        let realm = Realm::new(DocumentMode::IE9);
        let body = realm.body().unwrap();
        assert_eq!(realm.tag_name(body), Some("body"));
        assert_eq!(realm.document_window(realm.document()), Some(realm.window()));
        assert!(realm.head().is_some());
    }

    #[test]
    fn test_standard_prototype_chain() {
        let realm = Realm::new(DocumentMode::IE9);
        let body = realm.body().unwrap();
        let mut chain = Vec::new();
        let mut cur = realm.obj(body).proto;
        while let Some(p) = cur {
            chain.push(realm.graph().name(realm.obj(p).class));
            cur = realm.obj(p).proto;
        }
        assert_eq!(
            chain,
            vec!["HTMLBodyElement", "HTMLElement", "Element", "Node", "Object"]
        );
    }

    #[test]
    fn test_legacy_host_prototypes_are_unchained() {
        let realm = Realm::new(DocumentMode::IE8);
        let proto = realm.prototype("HTMLElement").unwrap();
        assert!(realm.obj(proto).proto.is_none());
        assert!(realm.interface_object("HTMLElement").is_none());
        assert!(realm.interface_object("XMLHttpRequest").is_some());
        assert!(realm.is_legacy_host(realm.window()));
    }

    #[test]
    fn test_document_class_by_mode() {
        let r10 = Realm::new(DocumentMode::IE10);
        let r11 = Realm::new(DocumentMode::IE11);
        assert_eq!(r10.object_to_string(&Value::Object(r10.document())), "[object Document]");
        assert_eq!(r11.object_to_string(&Value::Object(r11.document())), "[object HTMLDocument]");
    }

    #[test]
    fn test_audio_falls_back_to_unknown() {
        let mut realm = Realm::new(DocumentMode::IE8);
        let el = realm.alloc_element("audio");
        assert_eq!(realm.graph().name(realm.obj(el).class), "HTMLUnknownElement");
    }

    #[test]
    fn test_typeof_interface_objects() {
        let realm = Realm::new(DocumentMode::IE9);
        let elem = realm.interface_object("HTMLElement").map(Value::Object).unwrap();
        let xhr = realm.interface_object("XMLHttpRequest").map(Value::Object).unwrap();
        assert_eq!(realm.type_of(&elem), "object");
        assert_eq!(realm.type_of(&xhr), "function");
        assert_eq!(realm.type_of(&Value::from(1)), "number");
    }

    #[test]
    fn test_object_to_string_tags() {
        let realm = Realm::new(DocumentMode::IE9);
        let proto = realm.prototype("HTMLElement").map(Value::Object).unwrap();
        assert_eq!(realm.object_to_string(&proto), "[object HTMLElementPrototype]");
        assert_eq!(realm.object_to_string(&Value::Null), "[object Null]");

        let legacy = Realm::new(DocumentMode::IE8);
        assert_eq!(legacy.object_to_string(&Value::Null), "[object Object]");
        let win = Value::Object(legacy.window());
        assert_eq!(legacy.object_to_string(&win), "[object Object]");
    }

    #[test]
    fn test_compiled_handler_without_host() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let f = realm.create_function_object(
            FunctionKind::Compiled {
                source: "x()".to_string(),
            },
            "onclick",
            1,
        );
        assert_eq!(realm.call(&Value::Object(f), Value::Undefined, &[]).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_mutation_observer_call_rules() {
        let mut realm = Realm::new(DocumentMode::IE11);
        let ctor = Value::Object(realm.interface_object("MutationObserver").unwrap());
        let err = realm.call(&ctor, Value::Undefined, &[]).unwrap_err();
        assert_eq!(err.to_exception(DocumentMode::IE11).unsigned_number(), 0x8000ffff);
        let err = realm.call(&ctor, Value::Undefined, &[Value::from(1)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);

        let cb = realm.create_native_closure("cb", 0, |_, _, _| Ok(Value::Undefined));
        let mo = realm
            .construct(&ctor, &[Value::Object(cb), Value::from(1)])
            .unwrap();
        assert_eq!(realm.object_to_string(&mo), "[object MutationObserver]");
    }

    #[test]
    fn test_not_constructible() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let ctor = Value::Object(realm.interface_object("HTMLElement").unwrap());
        let err = realm.construct(&ctor, &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAction);
    }
}
