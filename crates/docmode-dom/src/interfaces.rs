//! Interface Tables
//!
//! Static schema of every host and script interface: parent, members,
//! mode ranges, constructor behavior.

/// What a member is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method { length: u8 },
    Property { readonly: bool },
    /// `on*` handler slot
    EventHandler,
}

/// One schema member of an interface
#[derive(Debug, Clone, Copy)]
pub struct MemberDescriptor {
    pub name: &'static str,
    pub kind: MemberKind,
    pub min_mode: u8,
    pub max_mode: u8,
}

impl MemberDescriptor {
    pub const fn since(mut self, mode: u8) -> Self {
        self.min_mode = mode;
        self
    }

    pub const fn until(mut self, mode: u8) -> Self {
        self.max_mode = mode;
        self
    }

    pub fn available(&self, mode: u8) -> bool {
        (self.min_mode..=self.max_mode).contains(&mode)
    }

    pub fn is_method(&self) -> bool {
        matches!(self.kind, MemberKind::Method { .. })
    }

    pub fn is_readonly(&self) -> bool {
        matches!(self.kind, MemberKind::Property { readonly: true })
    }
}

const fn member(name: &'static str, kind: MemberKind) -> MemberDescriptor {
    MemberDescriptor {
        name,
        kind,
        min_mode: 5,
        max_mode: 11,
    }
}

pub const fn method(name: &'static str, length: u8) -> MemberDescriptor {
    member(name, MemberKind::Method { length })
}

pub const fn prop(name: &'static str) -> MemberDescriptor {
    member(name, MemberKind::Property { readonly: false })
}

pub const fn ro(name: &'static str) -> MemberDescriptor {
    member(name, MemberKind::Property { readonly: true })
}

pub const fn handler(name: &'static str) -> MemberDescriptor {
    member(name, MemberKind::EventHandler)
}

/// How an interface object reacts to `new` and to plain calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtorKind {
    /// Interface object only; `new` fails with an illegal-constructor error
    NotConstructible,
    /// `new Ctor()` creates an instance
    Constructible,
    /// Also callable without `new`
    Callable,
    /// Script-engine builtin (`Object`, `Map`, ...)
    Script,
}

/// Static description of one interface
#[derive(Debug)]
pub struct InterfaceDescriptor {
    pub name: &'static str,
    pub parent: Option<&'static str>,
    pub members: &'static [MemberDescriptor],
    pub min_mode: u8,
    pub max_mode: u8,
    /// Mode from which `window.<name>` exists
    pub global_from: u8,
    pub ctor: CtorKind,
    /// Class tag reported instead of `name` (`location` reports `Object`)
    pub tag: Option<&'static str>,
    /// Instances have a null prototype in standard modes
    pub prototype_less: bool,
    /// Schema properties show up in for..in
    pub enumerable_members: bool,
}

const NEVER: u8 = 99;

const fn iface(
    name: &'static str,
    parent: Option<&'static str>,
    members: &'static [MemberDescriptor],
) -> InterfaceDescriptor {
    InterfaceDescriptor {
        name,
        parent,
        members,
        min_mode: 5,
        max_mode: 11,
        global_from: 9,
        ctor: CtorKind::NotConstructible,
        tag: None,
        prototype_less: false,
        enumerable_members: true,
    }
}

impl InterfaceDescriptor {
    const fn exists(mut self, min: u8, max: u8) -> Self {
        self.min_mode = min;
        self.max_mode = max;
        self
    }

    const fn global(mut self, from: u8) -> Self {
        self.global_from = from;
        self
    }

    const fn ctor(mut self, ctor: CtorKind) -> Self {
        self.ctor = ctor;
        self
    }

    const fn tagged(mut self, tag: &'static str) -> Self {
        self.tag = Some(tag);
        self
    }

    const fn detached(mut self) -> Self {
        self.prototype_less = true;
        self
    }

    const fn hidden_members(mut self) -> Self {
        self.enumerable_members = false;
        self
    }

    pub fn available(&self, mode: u8) -> bool {
        (self.min_mode..=self.max_mode).contains(&mode)
    }

    pub fn is_script_builtin(&self) -> bool {
        self.ctor == CtorKind::Script
    }

    /// Tag used by `Object.prototype.toString`
    pub fn class_tag(&self) -> &'static str {
        self.tag.unwrap_or(self.name)
    }
}

/// Named constructors that alias an element interface
#[derive(Debug)]
pub struct NamedConstructor {
    pub name: &'static str,
    pub interface: &'static str,
    pub tag: &'static str,
}

pub static NAMED_CONSTRUCTORS: &[NamedConstructor] = &[
    NamedConstructor {
        name: "Image",
        interface: "HTMLImageElement",
        tag: "img",
    },
    NamedConstructor {
        name: "Option",
        interface: "HTMLOptionElement",
        tag: "option",
    },
];

// ============================================================================
// Script builtins
// ============================================================================

static OBJECT_MEMBERS: &[MemberDescriptor] = &[
    method("toString", 0),
    method("toLocaleString", 0),
    method("valueOf", 0),
    method("hasOwnProperty", 1),
    method("isPrototypeOf", 1),
    method("propertyIsEnumerable", 1),
    prop("__proto__").since(11),
];

static FUNCTION_MEMBERS: &[MemberDescriptor] = &[
    method("toString", 0),
    method("call", 1),
    method("apply", 2),
    method("bind", 1).since(9),
];

static ARRAY_MEMBERS: &[MemberDescriptor] = &[
    method("toString", 0),
    method("join", 1),
    method("push", 1),
    method("pop", 0),
    method("splice", 2),
];

static MAP_MEMBERS: &[MemberDescriptor] = &[
    method("clear", 0),
    method("delete", 1),
    method("forEach", 1),
    method("get", 1),
    method("has", 1),
    method("set", 2),
    ro("size"),
];

static SET_MEMBERS: &[MemberDescriptor] = &[
    method("add", 1),
    method("clear", 0),
    method("delete", 1),
    method("forEach", 1),
    method("has", 1),
    ro("size"),
];

static WEAKMAP_MEMBERS: &[MemberDescriptor] = &[
    method("clear", 0),
    method("delete", 1),
    method("get", 1),
    method("has", 1),
    method("set", 2),
];

// ============================================================================
// DOM core
// ============================================================================

static NODE_MEMBERS: &[MemberDescriptor] = &[
    method("appendChild", 1),
    method("removeChild", 1),
    method("insertBefore", 2),
    method("hasChildNodes", 0),
    method("cloneNode", 1),
    method("compareDocumentPosition", 1).since(9),
    method("addEventListener", 3).since(9),
    method("removeEventListener", 3).since(9),
    method("dispatchEvent", 1).since(9),
    ro("parentNode"),
    ro("childNodes"),
    ro("firstChild"),
    ro("lastChild"),
    ro("previousSibling"),
    ro("nextSibling"),
    ro("nodeName"),
    ro("nodeType"),
    prop("nodeValue"),
    ro("ownerDocument"),
    prop("textContent").since(9),
    ro("prefix").since(9),
    ro("localName").since(9),
    ro("namespaceURI").since(9),
];

static ELEMENT_MEMBERS: &[MemberDescriptor] = &[
    method("getAttribute", 1),
    method("setAttribute", 2),
    method("removeAttribute", 1),
    method("hasAttribute", 1).since(8),
    method("getAttributeNS", 2).since(9),
    method("setAttributeNS", 3).since(9),
    method("removeAttributeNS", 2).since(9),
    method("hasAttributeNS", 2).since(9),
    method("getElementsByTagName", 1),
    method("getElementsByClassName", 1).since(9),
    method("querySelector", 1).since(8),
    method("querySelectorAll", 1).since(8),
    method("msMatchesSelector", 1).since(9),
    method("msSetPointerCapture", 1).since(10),
    method("msReleasePointerCapture", 1).since(10),
    method("getClientRects", 0),
    method("getBoundingClientRect", 0),
    ro("tagName"),
    ro("firstElementChild").since(9),
    ro("lastElementChild").since(9),
    ro("childElementCount").since(9),
    ro("clientTop"),
    ro("clientLeft"),
    ro("clientWidth"),
    ro("clientHeight"),
];

static HTML_ELEMENT_MEMBERS: &[MemberDescriptor] = &[
    method("click", 0),
    method("focus", 0),
    method("blur", 0),
    method("contains", 1),
    method("doScroll", 1).until(10),
    method("attachEvent", 2).until(10),
    method("detachEvent", 2).until(10),
    method("toString", 0).until(8),
    prop("id"),
    prop("className"),
    prop("title"),
    prop("lang"),
    prop("dir"),
    prop("innerHTML"),
    prop("innerText"),
    ro("style"),
    ro("currentStyle"),
    ro("readyState").until(10),
    ro("classList").since(10),
    prop("spellcheck").since(10),
    ro("offsetTop"),
    ro("offsetLeft"),
    handler("onclick"),
    handler("ondblclick"),
    handler("ondragstart"),
    handler("onmousedown"),
    handler("onmouseup"),
    handler("onmouseover"),
    handler("onkeydown"),
    handler("onkeyup"),
    handler("onfocus"),
    handler("onblur"),
    handler("onscroll"),
    handler("onchange"),
    handler("onsubmit").since(9),
    handler("oninput").since(9),
];

static ANCHOR_MEMBERS: &[MemberDescriptor] = &[
    prop("href"),
    prop("target"),
    prop("name"),
    method("toString", 0),
];

static AREA_MEMBERS: &[MemberDescriptor] = &[
    prop("href"),
    prop("alt"),
    prop("shape"),
    method("toString", 0),
];

static IMAGE_MEMBERS: &[MemberDescriptor] = &[
    prop("src"),
    prop("alt"),
    prop("border"),
    prop("width"),
    prop("height"),
    prop("isMap"),
    ro("complete"),
    ro("fileSize").until(10),
];

static OPTION_MEMBERS: &[MemberDescriptor] = &[
    prop("text"),
    prop("value"),
    prop("selected"),
    prop("defaultSelected"),
    ro("index"),
];

static STYLE_ELEMENT_MEMBERS: &[MemberDescriptor] = &[
    prop("media"),
    prop("type"),
    prop("disabled"),
    ro("sheet").since(9),
    ro("styleSheet").until(10),
];

static LABEL_MEMBERS: &[MemberDescriptor] = &[prop("htmlFor")];

static IFRAME_MEMBERS: &[MemberDescriptor] = &[
    prop("src"),
    prop("name"),
    prop("frameBorder"),
    ro("contentWindow"),
    ro("contentDocument").since(8),
    handler("onload"),
];

static INPUT_MEMBERS: &[MemberDescriptor] = &[
    prop("value"),
    prop("type"),
    prop("name"),
    prop("checked"),
    prop("disabled"),
];

static SCRIPT_MEMBERS: &[MemberDescriptor] = &[prop("src"), prop("type"), prop("text")];

static FORM_MEMBERS: &[MemberDescriptor] = &[prop("action"), prop("method"), method("submit", 0)];

static BODY_MEMBERS: &[MemberDescriptor] = &[
    prop("bgColor"),
    method("createTextRange", 0).until(10),
    handler("onload"),
    handler("onunload"),
];

static PROGRESS_MEMBERS: &[MemberDescriptor] = &[prop("value"), prop("max")];

static MEDIA_MEMBERS: &[MemberDescriptor] = &[
    prop("src"),
    method("play", 0),
    method("pause", 0),
    ro("paused"),
];

static CHARACTER_DATA_MEMBERS: &[MemberDescriptor] = &[
    prop("data"),
    ro("length"),
    method("appendData", 1),
];

static TEXT_MEMBERS: &[MemberDescriptor] = &[method("splitText", 1), method("toString", 0).until(8)];

static ATTR_MEMBERS: &[MemberDescriptor] = &[
    ro("name"),
    prop("value"),
    ro("specified"),
    ro("ownerElement").since(9),
];

static DOCUMENT_MEMBERS: &[MemberDescriptor] = &[
    method("createElement", 1),
    method("createTextNode", 1),
    method("createAttribute", 1),
    method("createComment", 1),
    method("createDocumentFragment", 0),
    method("createEvent", 1).since(9),
    method("createEventObject", 0).until(10),
    method("createStyleSheet", 2).until(10),
    method("getElementById", 1),
    method("getElementsByTagName", 1),
    method("getElementsByName", 1),
    method("getElementsByClassName", 1).since(9),
    method("querySelector", 1).since(8),
    method("querySelectorAll", 1).since(8),
    method("attachEvent", 2).until(10),
    method("detachEvent", 2).until(10),
    ro("body"),
    ro("head").since(9),
    ro("documentElement"),
    ro("documentMode"),
    ro("compatMode"),
    ro("readyState"),
    ro("defaultView").since(9),
    ro("parentWindow"),
    prop("title"),
    ro("URL"),
    ro("anchors"),
    prop("location"),
    prop("cookie"),
    ro("mimeType"),
    ro("implementation"),
    ro("doctype").since(9),
    ro("styleSheets"),
    ro("fileSize").until(10),
    ro("selection").until(10),
    ro("namespaces").until(9),
    handler("onclick"),
    handler("ondblclick"),
    handler("ondragstart"),
    handler("onmousedown"),
    handler("onkeydown"),
    handler("onreadystatechange"),
    handler("onstorage").until(8),
    handler("onstoragecommit"),
];

/// MSXML document handed out by `responseXML` before mode 10
static XML_DOM_MEMBERS: &[MemberDescriptor] = &[
    method("createElement", 1),
    method("getElementsByTagName", 1),
    ro("documentElement"),
    ro("xml"),
];

static FRAGMENT_MEMBERS: &[MemberDescriptor] = &[
    method("querySelector", 1).since(8),
    method("querySelectorAll", 1).since(8),
];

static DOCTYPE_MEMBERS: &[MemberDescriptor] = &[ro("name"), ro("publicId"), ro("systemId")];

static DOMIMPL_MEMBERS: &[MemberDescriptor] = &[
    method("hasFeature", 2),
    method("createDocument", 3).since(9),
    method("createDocumentType", 3).since(9),
    method("createHTMLDocument", 1).since(9),
];

static LIST_MEMBERS: &[MemberDescriptor] = &[ro("length"), method("item", 1)];

static COLLECTION_MEMBERS: &[MemberDescriptor] = &[
    ro("length"),
    method("item", 1),
    method("namedItem", 1),
];

static TOKEN_LIST_MEMBERS: &[MemberDescriptor] = &[
    ro("length"),
    method("add", 1),
    method("remove", 1),
    method("toggle", 1),
    method("contains", 1),
    method("item", 1),
    method("toString", 0),
];

static STYLE_DECL_MEMBERS: &[MemberDescriptor] = &[
    prop("cssText"),
    prop("border"),
    prop("opacity"),
    prop("color"),
    method("getPropertyValue", 1).since(9),
    method("setProperty", 3).since(9),
    method("removeProperty", 1).since(9),
];

// ============================================================================
// Window and friends
// ============================================================================

static WINDOW_MEMBERS: &[MemberDescriptor] = &[
    method("postMessage", 2),
    method("setTimeout", 2),
    method("clearTimeout", 1),
    method("setInterval", 2),
    method("clearInterval", 1),
    method("alert", 1),
    method("attachEvent", 2).until(10),
    method("detachEvent", 2).until(10),
    method("execScript", 2).until(10),
    method("createPopup", 1).until(10),
    method("addEventListener", 3).since(9),
    method("removeEventListener", 3).since(9),
    method("dispatchEvent", 1).since(9),
    method("getSelection", 0).since(9),
    method("getComputedStyle", 2).since(9),
    method("requestAnimationFrame", 1).since(10),
    method("cancelAnimationFrame", 1).since(10),
    method("matchMedia", 1).since(10),
    method("toString", 0),
    ro("document"),
    prop("location"),
    ro("navigator"),
    ro("performance"),
    ro("screen"),
    ro("history"),
    ro("sessionStorage"),
    ro("localStorage"),
    ro("parent"),
    ro("top"),
    ro("self"),
    ro("window"),
    ro("frames"),
    prop("name"),
    ro("console").since(10),
    ro("msCrypto").since(11),
    handler("onload"),
    handler("onunload"),
    handler("onbeforeunload"),
    handler("onmessage"),
    handler("onhashchange").since(8),
    handler("onresize"),
    handler("onscroll"),
    handler("onerror"),
    handler("onfocus"),
    handler("onblur"),
    handler("onstorage").since(9),
    handler("onfocusout").since(9),
    handler("onpageshow").since(11),
    handler("onpagehide").since(11),
];

static LOCATION_MEMBERS: &[MemberDescriptor] = &[
    prop("href"),
    prop("protocol"),
    prop("host"),
    prop("hostname"),
    prop("port"),
    prop("pathname"),
    prop("search"),
    prop("hash"),
    method("reload", 1),
    method("replace", 1),
    method("assign", 1),
    method("toString", 0),
];

static NAVIGATOR_MEMBERS: &[MemberDescriptor] = &[
    ro("userAgent"),
    ro("appCodeName"),
    ro("appName"),
    ro("appVersion"),
    ro("platform"),
    ro("cookieEnabled"),
    ro("mimeTypes"),
    ro("plugins"),
    method("javaEnabled", 0),
];

static SCREEN_MEMBERS: &[MemberDescriptor] = &[ro("width"), ro("height"), ro("colorDepth")];

static HISTORY_MEMBERS: &[MemberDescriptor] = &[
    ro("length"),
    method("back", 0),
    method("forward", 0),
    method("go", 1),
];

static PERFORMANCE_MEMBERS: &[MemberDescriptor] = &[
    ro("timing"),
    ro("navigation"),
    method("now", 0).since(10),
];

static TIMING_MEMBERS: &[MemberDescriptor] = &[
    ro("navigationStart"),
    ro("unloadEventStart"),
    ro("unloadEventEnd"),
    ro("redirectStart"),
    ro("redirectEnd"),
    ro("fetchStart"),
    ro("domainLookupStart"),
    ro("domainLookupEnd"),
    ro("connectStart"),
    ro("connectEnd"),
    ro("requestStart"),
    ro("responseStart"),
    ro("responseEnd"),
    ro("domLoading"),
    ro("domInteractive"),
    ro("domContentLoadedEventStart"),
    ro("domContentLoadedEventEnd"),
    ro("domComplete"),
    ro("loadEventStart"),
    ro("loadEventEnd"),
    ro("msFirstPaint"),
];

static NAVIGATION_MEMBERS: &[MemberDescriptor] = &[ro("type"), ro("redirectCount")];

static STORAGE_MEMBERS: &[MemberDescriptor] = &[
    ro("length"),
    ro("remainingSpace"),
    method("key", 1),
    method("getItem", 1),
    method("setItem", 2),
    method("removeItem", 1),
    method("clear", 0),
];

static CONSOLE_MEMBERS: &[MemberDescriptor] = &[
    method("log", 0),
    method("info", 0),
    method("warn", 0),
    method("error", 0),
    method("debug", 0),
    method("assert", 0),
    method("clear", 0),
    method("dir", 0),
    method("time", 0),
    method("timeEnd", 0),
];

static MEDIA_QUERY_MEMBERS: &[MemberDescriptor] = &[
    ro("matches"),
    ro("media"),
    method("addListener", 1),
    method("removeListener", 1),
];

static CRYPTO_MEMBERS: &[MemberDescriptor] = &[ro("subtle"), method("getRandomValues", 1)];

static MUTATION_OBSERVER_MEMBERS: &[MemberDescriptor] = &[
    method("observe", 2),
    method("disconnect", 0),
    method("takeRecords", 0),
];

static XHR_MEMBERS: &[MemberDescriptor] = &[
    method("open", 5),
    method("send", 1),
    method("abort", 0),
    method("setRequestHeader", 2),
    method("getResponseHeader", 1),
    method("getAllResponseHeaders", 0),
    method("overrideMimeType", 1).since(11),
    method("addEventListener", 3).since(9),
    method("removeEventListener", 3).since(9),
    method("dispatchEvent", 1).since(9),
    ro("readyState"),
    ro("status"),
    ro("statusText"),
    ro("responseText"),
    ro("responseXML"),
    ro("response").since(10),
    prop("responseType").since(10),
    prop("timeout"),
    ro("upload").since(10),
    prop("withCredentials").since(10),
    handler("onreadystatechange"),
    handler("ontimeout"),
    handler("onload").since(10),
    handler("onabort").since(10),
    handler("onerror").since(10),
    handler("onloadend").since(10),
    handler("onloadstart").since(10),
    handler("onprogress").since(10),
];

// ============================================================================
// Events
// ============================================================================

static EVENT_MEMBERS: &[MemberDescriptor] = &[
    ro("type"),
    ro("bubbles"),
    ro("cancelable"),
    ro("target"),
    ro("currentTarget"),
    ro("eventPhase"),
    ro("defaultPrevented"),
    ro("timeStamp"),
    ro("isTrusted"),
    method("preventDefault", 0),
    method("stopPropagation", 0),
    method("stopImmediatePropagation", 0),
    method("initEvent", 3),
];

static UI_EVENT_MEMBERS: &[MemberDescriptor] = &[ro("view"), ro("detail"), method("initUIEvent", 5)];

static MOUSE_EVENT_MEMBERS: &[MemberDescriptor] = &[
    ro("screenX"),
    ro("screenY"),
    ro("clientX"),
    ro("clientY"),
    ro("button"),
    method("initMouseEvent", 15),
];

static KEYBOARD_EVENT_MEMBERS: &[MemberDescriptor] = &[
    ro("key"),
    ro("keyCode"),
    method("initKeyboardEvent", 7),
];

static CUSTOM_EVENT_MEMBERS: &[MemberDescriptor] = &[ro("detail"), method("initCustomEvent", 4)];

static MESSAGE_EVENT_MEMBERS: &[MemberDescriptor] = &[
    ro("data"),
    ro("origin"),
    ro("source"),
    method("initMessageEvent", 7),
];

static STORAGE_EVENT_MEMBERS: &[MemberDescriptor] = &[
    ro("key"),
    ro("oldValue"),
    ro("newValue"),
    ro("url"),
    ro("storageArea"),
    method("initStorageEvent", 8),
];

static PAGE_TRANSITION_MEMBERS: &[MemberDescriptor] = &[ro("persisted")];

static LEGACY_EVENT_MEMBERS: &[MemberDescriptor] = &[
    prop("type"),
    prop("srcElement"),
    prop("returnValue"),
    prop("cancelBubble"),
    prop("keyCode"),
];

static NO_MEMBERS: &[MemberDescriptor] = &[];

/// Every interface known to the engine, parents before children
pub static INTERFACES: &[InterfaceDescriptor] = &[
    // script builtins
    iface("Object", None, OBJECT_MEMBERS)
        .ctor(CtorKind::Script)
        .global(5)
        .hidden_members(),
    iface("Function", Some("Object"), FUNCTION_MEMBERS)
        .ctor(CtorKind::Script)
        .global(5)
        .hidden_members(),
    iface("Array", Some("Object"), ARRAY_MEMBERS)
        .ctor(CtorKind::Script)
        .global(5)
        .hidden_members(),
    iface("Number", Some("Object"), NO_MEMBERS).ctor(CtorKind::Script).global(5),
    iface("String", Some("Object"), NO_MEMBERS).ctor(CtorKind::Script).global(5),
    iface("Boolean", Some("Object"), NO_MEMBERS).ctor(CtorKind::Script).global(5),
    iface("Map", Some("Object"), MAP_MEMBERS)
        .ctor(CtorKind::Script)
        .exists(11, 11)
        .global(11)
        .tagged("Object")
        .hidden_members(),
    iface("Set", Some("Object"), SET_MEMBERS)
        .ctor(CtorKind::Script)
        .exists(11, 11)
        .global(11)
        .tagged("Object")
        .hidden_members(),
    iface("WeakMap", Some("Object"), WEAKMAP_MEMBERS)
        .ctor(CtorKind::Script)
        .exists(11, 11)
        .global(11)
        .tagged("Object")
        .hidden_members(),
    // window
    iface("Window", None, WINDOW_MEMBERS),
    iface("Location", None, LOCATION_MEMBERS)
        .global(NEVER)
        .tagged("Object")
        .detached(),
    iface("Navigator", None, NAVIGATOR_MEMBERS),
    iface("Screen", None, SCREEN_MEMBERS),
    iface("History", None, HISTORY_MEMBERS),
    iface("Performance", None, PERFORMANCE_MEMBERS),
    iface("PerformanceTiming", None, TIMING_MEMBERS),
    iface("PerformanceNavigation", None, NAVIGATION_MEMBERS),
    iface("Storage", None, STORAGE_MEMBERS).global(8).hidden_members(),
    iface("Console", None, CONSOLE_MEMBERS).exists(10, 11).global(10),
    iface("MediaQueryList", None, MEDIA_QUERY_MEMBERS).exists(10, 11).global(10),
    iface("Crypto", None, CRYPTO_MEMBERS).exists(11, 11).global(11),
    iface("MutationObserver", None, MUTATION_OBSERVER_MEMBERS)
        .exists(11, 11)
        .global(11)
        .ctor(CtorKind::Callable),
    iface("XMLHttpRequest", None, XHR_MEMBERS)
        .global(5)
        .ctor(CtorKind::Constructible),
    // nodes
    iface("Node", None, NODE_MEMBERS),
    iface("Document", Some("Node"), DOCUMENT_MEMBERS),
    iface("HTMLDocument", Some("Document"), NO_MEMBERS).exists(11, 11),
    iface("XMLDocument", Some("Document"), NO_MEMBERS).exists(11, 11).global(11),
    iface("XMLDOMDocument", None, XML_DOM_MEMBERS)
        .exists(5, 9)
        .global(NEVER)
        .tagged("Object")
        .detached(),
    iface("DocumentFragment", Some("Node"), FRAGMENT_MEMBERS),
    iface("DocumentType", Some("Node"), DOCTYPE_MEMBERS).exists(9, 11),
    iface("CharacterData", Some("Node"), CHARACTER_DATA_MEMBERS),
    iface("Text", Some("CharacterData"), TEXT_MEMBERS),
    iface("Comment", Some("CharacterData"), NO_MEMBERS),
    iface("Attr", Some("Node"), ATTR_MEMBERS).global(8),
    iface("Element", Some("Node"), ELEMENT_MEMBERS).global(8),
    iface("HTMLElement", Some("Element"), HTML_ELEMENT_MEMBERS).global(8),
    iface("HTMLAnchorElement", Some("HTMLElement"), ANCHOR_MEMBERS).global(8),
    iface("HTMLAreaElement", Some("HTMLElement"), AREA_MEMBERS).global(8),
    iface("HTMLImageElement", Some("HTMLElement"), IMAGE_MEMBERS).global(8),
    iface("HTMLOptionElement", Some("HTMLElement"), OPTION_MEMBERS).global(8),
    iface("HTMLStyleElement", Some("HTMLElement"), STYLE_ELEMENT_MEMBERS).global(8),
    iface("HTMLLabelElement", Some("HTMLElement"), LABEL_MEMBERS).global(8),
    iface("HTMLIFrameElement", Some("HTMLElement"), IFRAME_MEMBERS).global(8),
    iface("HTMLInputElement", Some("HTMLElement"), INPUT_MEMBERS).global(8),
    iface("HTMLScriptElement", Some("HTMLElement"), SCRIPT_MEMBERS).global(8),
    iface("HTMLFormElement", Some("HTMLElement"), FORM_MEMBERS).global(8),
    iface("HTMLBodyElement", Some("HTMLElement"), BODY_MEMBERS).global(8),
    iface("HTMLMediaElement", Some("HTMLElement"), MEDIA_MEMBERS).exists(9, 11),
    iface("HTMLAudioElement", Some("HTMLMediaElement"), NO_MEMBERS).exists(9, 11),
    iface("HTMLVideoElement", Some("HTMLMediaElement"), NO_MEMBERS).exists(9, 11),
    iface("HTMLTableCellElement", Some("HTMLElement"), NO_MEMBERS).exists(9, 11),
    iface("HTMLTableDataCellElement", Some("HTMLTableCellElement"), NO_MEMBERS).global(8),
    iface("HTMLTableHeaderCellElement", Some("HTMLTableCellElement"), NO_MEMBERS).global(8),
    iface("HTMLProgressElement", Some("HTMLElement"), PROGRESS_MEMBERS).exists(10, 11),
    iface("HTMLDataListElement", Some("HTMLElement"), NO_MEMBERS).exists(10, 11),
    iface("HTMLTrackElement", Some("HTMLElement"), NO_MEMBERS).exists(10, 11),
    iface("HTMLCanvasElement", Some("HTMLElement"), NO_MEMBERS).exists(9, 11),
    iface("HTMLSourceElement", Some("HTMLElement"), NO_MEMBERS).exists(9, 11),
    iface("HTMLUnknownElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLPhraseElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLBlockElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLBaseElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLBaseFontElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLBRElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLButtonElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLTableCaptionElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLTableColElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLDDElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLModElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLDirectoryElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLDivElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLDListElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLDTElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLEmbedElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLFieldSetElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLFontElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLFrameElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLFrameSetElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLHeadingElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLHeadElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLHRElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLHtmlElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLLegendElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLLIElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLLinkElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLMapElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLMetaElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLObjectElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLOListElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLOptGroupElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLParagraphElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLParamElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLPreElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLQuoteElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLSelectElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLSpanElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLTableElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLTableSectionElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLTextAreaElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLTitleElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLTableRowElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    iface("HTMLUListElement", Some("HTMLElement"), NO_MEMBERS).global(8),
    // collections and misc
    iface("NodeList", None, LIST_MEMBERS),
    iface("HTMLCollection", None, COLLECTION_MEMBERS),
    iface("DOMTokenList", None, TOKEN_LIST_MEMBERS).exists(10, 11).global(10),
    iface("DOMImplementation", None, DOMIMPL_MEMBERS),
    iface("CSSStyleDeclaration", None, STYLE_DECL_MEMBERS),
    iface("MSStyleCSSProperties", Some("CSSStyleDeclaration"), NO_MEMBERS),
    // events
    iface("Event", None, EVENT_MEMBERS).exists(9, 11),
    iface("UIEvent", Some("Event"), UI_EVENT_MEMBERS).exists(9, 11),
    iface("MouseEvent", Some("UIEvent"), MOUSE_EVENT_MEMBERS).exists(9, 11),
    iface("KeyboardEvent", Some("UIEvent"), KEYBOARD_EVENT_MEMBERS).exists(9, 11),
    iface("CustomEvent", Some("Event"), CUSTOM_EVENT_MEMBERS).exists(9, 11),
    iface("MessageEvent", Some("Event"), MESSAGE_EVENT_MEMBERS).exists(9, 11),
    iface("StorageEvent", Some("Event"), STORAGE_EVENT_MEMBERS).exists(9, 11),
    iface("PageTransitionEvent", Some("Event"), PAGE_TRANSITION_MEMBERS).exists(11, 11),
    iface("MSEventObj", None, LEGACY_EVENT_MEMBERS)
        .exists(5, 10)
        .global(NEVER),
];

/// HTML tag → element interface suffix (`HTML<suffix>Element`), with the
/// lowest mode the mapping needs
pub static TAGS: &[(&str, &str, u8)] = &[
    ("a", "Anchor", 5),
    ("abbr", "Phrase", 5),
    ("acronym", "Phrase", 5),
    ("address", "Block", 5),
    ("area", "Area", 5),
    ("article", "", 5),
    ("aside", "", 5),
    ("audio", "Audio", 5),
    ("b", "Phrase", 5),
    ("base", "Base", 5),
    ("basefont", "BaseFont", 5),
    ("bdi", "Unknown", 5),
    ("bdo", "Phrase", 5),
    ("big", "Phrase", 5),
    ("blockquote", "Block", 5),
    ("body", "Body", 5),
    ("br", "BR", 5),
    ("button", "Button", 5),
    ("canvas", "Canvas", 5),
    ("caption", "TableCaption", 5),
    ("center", "Block", 5),
    ("cite", "Phrase", 5),
    ("code", "Phrase", 5),
    ("col", "TableCol", 5),
    ("colgroup", "TableCol", 5),
    ("data", "Unknown", 5),
    ("datalist", "DataList", 10),
    ("dd", "DD", 5),
    ("del", "Mod", 5),
    ("details", "Unknown", 5),
    ("dfn", "Phrase", 5),
    ("dialog", "Unknown", 5),
    ("dir", "Directory", 5),
    ("div", "Div", 5),
    ("dl", "DList", 5),
    ("dt", "DT", 5),
    ("em", "Phrase", 5),
    ("embed", "Embed", 5),
    ("fieldset", "FieldSet", 5),
    ("figcaption", "", 5),
    ("figure", "", 5),
    ("font", "Font", 5),
    ("footer", "", 5),
    ("form", "Form", 5),
    ("frame", "Frame", 5),
    ("frameset", "FrameSet", 5),
    ("h1", "Heading", 5),
    ("h2", "Heading", 5),
    ("h3", "Heading", 5),
    ("h4", "Heading", 5),
    ("h5", "Heading", 5),
    ("h6", "Heading", 5),
    ("head", "Head", 5),
    ("header", "", 5),
    ("hr", "HR", 5),
    ("html", "Html", 5),
    ("i", "Phrase", 5),
    ("iframe", "IFrame", 5),
    ("img", "Image", 5),
    ("input", "Input", 5),
    ("ins", "Mod", 5),
    ("kbd", "Phrase", 5),
    ("label", "Label", 5),
    ("legend", "Legend", 5),
    ("li", "LI", 5),
    ("link", "Link", 5),
    ("map", "Map", 5),
    ("mark", "", 5),
    ("meta", "Meta", 5),
    ("nav", "", 5),
    ("noframes", "", 5),
    ("noscript", "", 5),
    ("object", "Object", 5),
    ("ol", "OList", 5),
    ("optgroup", "OptGroup", 5),
    ("option", "Option", 5),
    ("p", "Paragraph", 5),
    ("param", "Param", 5),
    ("pre", "Pre", 5),
    ("progress", "Progress", 10),
    ("q", "Quote", 5),
    ("rp", "Phrase", 5),
    ("rt", "Phrase", 5),
    ("ruby", "Phrase", 5),
    ("s", "Phrase", 5),
    ("samp", "Phrase", 5),
    ("script", "Script", 5),
    ("section", "", 5),
    ("select", "Select", 5),
    ("small", "Phrase", 5),
    ("source", "Source", 5),
    ("span", "Span", 5),
    ("strike", "Phrase", 5),
    ("strong", "Phrase", 5),
    ("style", "Style", 5),
    ("sub", "Phrase", 5),
    ("sup", "Phrase", 5),
    ("table", "Table", 5),
    ("tbody", "TableSection", 5),
    ("td", "TableDataCell", 5),
    ("textarea", "TextArea", 5),
    ("tfoot", "TableSection", 5),
    ("th", "TableHeaderCell", 5),
    ("thead", "TableSection", 5),
    ("title", "Title", 5),
    ("tr", "TableRow", 5),
    ("track", "Track", 10),
    ("tt", "Phrase", 5),
    ("u", "Phrase", 5),
    ("ul", "UList", 5),
    ("var", "Phrase", 5),
    ("video", "Video", 5),
    ("wbr", "", 5),
];

/// Element interface name for a tag in `mode`; unknown tags map to
/// `HTMLUnknownElement`
pub fn element_interface_for_tag(tag: &str, mode: u8) -> String {
    let lower = tag.to_ascii_lowercase();
    let suffix = TAGS
        .iter()
        .find(|(t, _, min)| *t == lower && mode >= *min)
        .map_or("Unknown", |(_, suffix, _)| *suffix);
    format!("HTML{}Element", suffix)
}

/// Static lookup by name
pub fn descriptor(name: &str) -> Option<&'static InterfaceDescriptor> {
    INTERFACES.iter().find(|d| d.name == name)
}
