//! Document Modes
//!
//! Compatibility mode registry: mode resolution, feature table, bind-once cell.

use std::cell::Cell;
use std::fmt;

/// Emulated document mode (5..=11)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentMode(u8);

impl DocumentMode {
    pub const QUIRKS: Self = Self(5);
    pub const IE6: Self = Self(6);
    pub const IE7: Self = Self(7);
    pub const IE8: Self = Self(8);
    pub const IE9: Self = Self(9);
    pub const IE10: Self = Self(10);
    pub const IE11: Self = Self(11);

    pub const MIN: Self = Self::QUIRKS;
    pub const MAX: Self = Self::IE11;

    /// All supported modes, lowest first
    pub const ALL: [Self; 7] = [
        Self::QUIRKS,
        Self::IE6,
        Self::IE7,
        Self::IE8,
        Self::IE9,
        Self::IE10,
        Self::IE11,
    ];

    /// Exact mode, `None` when out of range
    pub fn new(version: u8) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0)
            .contains(&version)
            .then_some(Self(version))
    }

    pub fn version(self) -> u8 {
        self.0
    }

    /// Modes below 9 have no real prototype chain
    pub fn is_legacy(self) -> bool {
        self.0 < 9
    }

    /// Value of `document.compatMode`
    pub fn compat_mode(self) -> &'static str {
        if self == Self::QUIRKS {
            "BackCompat"
        } else {
            "CSS1Compat"
        }
    }

    /// Mode of a frame document hosted by a document in `parent` mode
    pub fn for_child_frame(parent: Self) -> Self {
        if parent.is_legacy() {
            Self::QUIRKS
        } else {
            parent
        }
    }

    pub fn supports(self, feature: Feature) -> bool {
        is_feature_enabled(self, feature)
    }
}

impl Default for DocumentMode {
    fn default() -> Self {
        Self::QUIRKS
    }
}

impl fmt::Display for DocumentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolve a requested mode, clamping to the supported range
pub fn resolve_mode(requested: Option<i64>) -> DocumentMode {
    match requested {
        None => DocumentMode::MIN,
        Some(v) => {
            let clamped = v.clamp(DocumentMode::MIN.0 as i64, DocumentMode::MAX.0 as i64);
            DocumentMode(clamped as u8)
        }
    }
}

/// Mode-gated behaviors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Interfaces have real prototype objects chained to `Object.prototype`
    PrototypeChain,
    /// addEventListener / dispatchEvent
    StandardEvents,
    /// attachEvent / detachEvent
    LegacyEvents,
    /// `delete` on host objects does not throw
    ExpandoDelete,
    /// querySelector / querySelectorAll
    Selectors,
    /// *AttributeNS family
    Namespaces,
    /// `Object.prototype.__proto__`
    ProtoAccessor,
    /// Map / Set / WeakMap
    Collections,
    Console,
    MatchMedia,
    /// pageshow / pagehide
    PageTransition,
    /// postMessage data keeps its type
    StructuredClone,
    /// Host string coercion calls toString before valueOf
    ToStringFirst,
    /// onmessage receives a MessageEvent
    MessageEvent,
    /// XHR level 2 members (response, responseType, onabort, ...)
    XhrLevel2,
    XhrMimeOverride,
    Crypto,
    MutationObserver,
    /// Content attributes and properties are the same thing
    AttributeProperties,
    /// Expandos live in the attribute store
    SharedAttributeStore,
}

struct FeatureRange {
    feature: Feature,
    min: u8,
    max: u8,
}

const fn range(feature: Feature, min: u8, max: u8) -> FeatureRange {
    FeatureRange { feature, min, max }
}

static FEATURES: &[FeatureRange] = &[
    range(Feature::PrototypeChain, 9, 11),
    range(Feature::StandardEvents, 9, 11),
    range(Feature::LegacyEvents, 5, 10),
    range(Feature::ExpandoDelete, 8, 11),
    range(Feature::Selectors, 8, 11),
    range(Feature::Namespaces, 9, 11),
    range(Feature::ProtoAccessor, 11, 11),
    range(Feature::Collections, 11, 11),
    range(Feature::Console, 10, 11),
    range(Feature::MatchMedia, 10, 11),
    range(Feature::PageTransition, 11, 11),
    range(Feature::StructuredClone, 10, 11),
    range(Feature::ToStringFirst, 10, 11),
    range(Feature::MessageEvent, 9, 11),
    range(Feature::XhrLevel2, 10, 11),
    range(Feature::XhrMimeOverride, 11, 11),
    range(Feature::Crypto, 11, 11),
    range(Feature::MutationObserver, 11, 11),
    range(Feature::AttributeProperties, 5, 7),
    range(Feature::SharedAttributeStore, 8, 8),
];

/// Pure lookup over the static feature table
pub fn is_feature_enabled(mode: DocumentMode, feature: Feature) -> bool {
    FEATURES
        .iter()
        .find(|r| r.feature == feature)
        .is_some_and(|r| (r.min..=r.max).contains(&mode.0))
}

/// Mode binding failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    #[error("document mode queried before it was bound")]
    Unbound,
    #[error("document mode already bound to {0}")]
    AlreadyBound(DocumentMode),
}

/// Bind-once holder for a document's mode
#[derive(Debug, Clone, Default)]
pub struct ModeCell {
    mode: Cell<Option<DocumentMode>>,
}

impl ModeCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell already holding `mode`
    pub fn bound(mode: DocumentMode) -> Self {
        Self {
            mode: Cell::new(Some(mode)),
        }
    }

    /// Fix the mode; a document's mode never changes afterwards
    pub fn bind(&self, mode: DocumentMode) -> Result<(), ModeError> {
        if let Some(bound) = self.mode.get() {
            return Err(ModeError::AlreadyBound(bound));
        }
        tracing::debug!(mode = mode.version(), "document mode bound");
        self.mode.set(Some(mode));
        Ok(())
    }

    pub fn get(&self) -> Result<DocumentMode, ModeError> {
        self.mode.get().ok_or(ModeError::Unbound)
    }

    pub fn is_bound(&self) -> bool {
        self.mode.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_mode_clamps() {
        assert_eq!(resolve_mode(None), DocumentMode::QUIRKS);
        assert_eq!(resolve_mode(Some(2)), DocumentMode::QUIRKS);
        assert_eq!(resolve_mode(Some(9)), DocumentMode::IE9);
        assert_eq!(resolve_mode(Some(42)), DocumentMode::IE11);
    }

    #[test]
    fn test_compat_mode() {
        assert_eq!(DocumentMode::QUIRKS.compat_mode(), "BackCompat");
        assert_eq!(DocumentMode::IE7.compat_mode(), "CSS1Compat");
        assert_eq!(DocumentMode::IE11.compat_mode(), "CSS1Compat");
    }

    #[test]
    fn test_child_frame_mode() {
        assert_eq!(DocumentMode::for_child_frame(DocumentMode::IE8), DocumentMode::QUIRKS);
        assert_eq!(DocumentMode::for_child_frame(DocumentMode::IE10), DocumentMode::IE10);
    }

    #[test]
    fn test_feature_table() {
        assert!(!is_feature_enabled(DocumentMode::IE8, Feature::PrototypeChain));
        assert!(is_feature_enabled(DocumentMode::IE9, Feature::PrototypeChain));
        assert!(is_feature_enabled(DocumentMode::IE10, Feature::LegacyEvents));
        assert!(!is_feature_enabled(DocumentMode::IE11, Feature::LegacyEvents));
        assert!(is_feature_enabled(DocumentMode::IE8, Feature::SharedAttributeStore));
        assert!(!is_feature_enabled(DocumentMode::IE7, Feature::ExpandoDelete));
    }

    #[test]
    fn test_mode_cell() {
        let cell = ModeCell::new();
        assert_eq!(cell.get(), Err(ModeError::Unbound));
        cell.bind(DocumentMode::IE9).unwrap();
        assert_eq!(cell.get(), Ok(DocumentMode::IE9));
        assert_eq!(
            cell.bind(DocumentMode::IE10),
            Err(ModeError::AlreadyBound(DocumentMode::IE9))
        );

        let fixed = ModeCell::bound(DocumentMode::IE8);
        assert!(fixed.is_bound());
        assert!(fixed.bind(DocumentMode::IE11).is_err());
        assert_eq!(fixed.get(), Ok(DocumentMode::IE8));
    }
}
