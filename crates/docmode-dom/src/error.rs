//! Error Model
//!
//! One structured error type; the script boundary picks the numeric code or
//! the named error for the active mode.

use crate::mode::{DocumentMode, ModeError};
use std::fmt;

/// Failure classes observable by scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorKind {
    #[error("object doesn't support this property or method")]
    InvalidProperty,
    #[error("object doesn't support this action")]
    InvalidAction,
    #[error("invalid procedure call or argument")]
    InvalidProcedureCall,
    #[error("unexpected call to method or property access")]
    Unexpected,
    #[error("invalid argument")]
    InvalidArg,
    #[error("object expected")]
    ObjectExpected,
    #[error("function expected")]
    FunctionExpected,
    #[error("'this' is not of the expected type")]
    WrongThis,
    #[error("WeakMap key must be an object")]
    WeakMapKey,
    #[error("cyclic __proto__ value")]
    CyclicProto,
    #[error("object is not extensible")]
    NotExtensible,
    #[error("cannot redefine non-configurable property")]
    NonConfigurable,
    #[error("syntax error")]
    Syntax,
    #[error("namespace error")]
    Namespace,
    #[error("invalid state")]
    InvalidState,
    #[error("invalid character")]
    InvalidCharacter,
    #[error("type mismatch")]
    TypeMismatch,
    #[error("not enough storage is available")]
    QuotaExceeded,
    #[error("unspecified error")]
    Unspecified,
}

struct KindInfo {
    code: u32,
    modern_name: Option<&'static str>,
    modern_from: u8,
    /// Named DOM exceptions report number 0
    dom_exception: bool,
}

const fn info(code: u32, modern_name: Option<&'static str>, modern_from: u8, dom_exception: bool) -> KindInfo {
    KindInfo {
        code,
        modern_name,
        modern_from,
        dom_exception,
    }
}

impl ErrorKind {
    fn info(self) -> KindInfo {
        use ErrorKind::*;
        match self {
            InvalidProperty => info(0x800a01b6, None, 0, false),
            InvalidAction => info(0x800a01bd, None, 0, false),
            InvalidProcedureCall => info(0x800a0005, None, 0, false),
            Unexpected => info(0x8000ffff, None, 0, false),
            InvalidArg => info(0x80070057, None, 0, false),
            ObjectExpected => info(0x800a138f, Some("TypeError"), 9, false),
            FunctionExpected => info(0x800a138a, Some("TypeError"), 9, false),
            WrongThis => info(0x800a13fc, Some("TypeError"), 9, false),
            WeakMapKey => info(0x800a13fd, Some("TypeError"), 9, false),
            CyclicProto => info(0x800a13b0, Some("TypeError"), 9, false),
            NotExtensible => info(0x800a13b6, Some("TypeError"), 9, false),
            NonConfigurable => info(0x800a13d6, Some("TypeError"), 9, false),
            Syntax => info(0x80070057, Some("SyntaxError"), 10, true),
            Namespace => info(0x80070057, Some("NamespaceError"), 9, true),
            InvalidState => info(0x8007000b, Some("InvalidStateError"), 9, true),
            InvalidCharacter => info(0x80070057, Some("InvalidCharacterError"), 9, true),
            TypeMismatch => info(0x80070057, Some("TypeMismatchError"), 9, true),
            QuotaExceeded => info(0x8007000e, Some("QuotaExceededError"), 9, true),
            Unspecified => info(0x80004005, None, 0, false),
        }
    }

    /// Stable native code (HRESULT)
    pub fn legacy_code(self) -> u32 {
        self.info().code
    }

    /// ECMAScript/DOM error name, if the kind has one at all
    pub fn modern_name(self) -> Option<&'static str> {
        self.info().modern_name
    }
}

/// Structured DOM failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomError {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for DomError {}

impl DomError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(kind: ErrorKind) -> Self {
        Self::new(kind, "")
    }

    /// Representation seen by script code in `mode`
    pub fn to_exception(&self, mode: DocumentMode) -> ScriptException {
        let info = self.kind.info();
        let named = info
            .modern_name
            .filter(|_| mode.version() >= info.modern_from);
        match named {
            Some(name) => ScriptException {
                number: if info.dom_exception { 0 } else { info.code as i32 },
                name: Some(name),
                message: if info.dom_exception {
                    name.to_string()
                } else {
                    self.to_string()
                },
            },
            None => ScriptException {
                number: info.code as i32,
                name: None,
                message: self.to_string(),
            },
        }
    }
}

impl From<ErrorKind> for DomError {
    fn from(kind: ErrorKind) -> Self {
        Self::kind(kind)
    }
}

impl From<ModeError> for DomError {
    fn from(err: ModeError) -> Self {
        DomError::new(ErrorKind::Unexpected, err.to_string())
    }
}

/// Exception object as observed by scripts (`e.number`, `e.name`, `e.message`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptException {
    pub number: i32,
    pub name: Option<&'static str>,
    pub message: String,
}

impl ScriptException {
    /// `e.number >>> 0`
    pub fn unsigned_number(&self) -> u32 {
        self.number as u32
    }
}

/// Result alias used throughout the crate
pub type DomResult<T> = Result<T, DomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_codes_are_signed() {
        let e = DomError::kind(ErrorKind::InvalidProperty).to_exception(DocumentMode::IE8);
        assert_eq!(e.number, 0x800a01b6_u32 as i32);
        assert!(e.number < 0);
        assert_eq!(e.name, None);
    }

    #[test]
    fn test_type_error_named_in_modern_modes() {
        let err = DomError::kind(ErrorKind::CyclicProto);
        let e = err.to_exception(DocumentMode::IE11);
        assert_eq!(e.name, Some("TypeError"));
        assert_eq!(e.unsigned_number(), 0x800a13b0);
    }

    #[test]
    fn test_syntax_error_threshold() {
        let err = DomError::kind(ErrorKind::Syntax);
        let e9 = err.to_exception(DocumentMode::IE9);
        assert_eq!(e9.unsigned_number(), 0x80070057);
        assert_eq!(e9.name, None);
        let e10 = err.to_exception(DocumentMode::IE10);
        assert_eq!(e10.name, Some("SyntaxError"));
        assert_eq!(e10.number, 0);
    }

    #[test]
    fn test_namespace_error_message() {
        let e = DomError::kind(ErrorKind::Namespace).to_exception(DocumentMode::IE9);
        assert_eq!(e.message, "NamespaceError");
    }
}
