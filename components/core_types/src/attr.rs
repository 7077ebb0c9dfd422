//! Object and property attribute bits, and the structured attribute
//! descriptor used by `define_property`.

/// Bitmask type for object-level attributes.
pub type ObjAttrs = u8;

/// Bitmask type for property-level attributes.
pub type PropAttrs = u8;

/// Object attribute bits.
pub mod obj_attr {
    use super::ObjAttrs;

    /// New own properties may not be added.
    pub const NOT_EXTENSIBLE: ObjAttrs = 1 << 0;
    /// Indexed elements live in a contiguous backing buffer.
    pub const DENSE_ARRAY: ObjAttrs = 1 << 1;
    /// The object is a closure.
    pub const FUNCTION: ObjAttrs = 1 << 2;
    /// The object is not managed by the engine heap.
    pub const OFF_HEAP: ObjAttrs = 1 << 3;
    /// A destructor must run before the collector reclaims the object.
    pub const HAS_DESTRUCTOR: ObjAttrs = 1 << 4;
}

/// Property attribute bits.
pub mod prop_attr {
    use super::PropAttrs;

    /// Assignment does not change the value.
    pub const NON_WRITABLE: PropAttrs = 1 << 0;
    /// Enumeration skips the property.
    pub const NON_ENUMERABLE: PropAttrs = 1 << 1;
    /// The property may not be deleted or incompatibly redefined.
    pub const NON_CONFIGURABLE: PropAttrs = 1 << 2;
    /// The property is an accessor with a getter.
    pub const GETTER: PropAttrs = 1 << 3;
    /// The property is an accessor with a setter.
    pub const SETTER: PropAttrs = 1 << 4;
    /// Invisible to user code entirely (internal slots).
    pub const HIDDEN: PropAttrs = 1 << 5;
    /// The property value is not heap-managed.
    pub const OFF_HEAP: PropAttrs = 1 << 6;
    /// The value slot carries user data with a registered destructor.
    pub const USER_DATA_AND_DESTRUCTOR: PropAttrs = 1 << 7;
}

/// A structured property-attribute update.
///
/// Carries the attribute bits to set, a mask of which bits the caller is
/// controlling at all, and a preserve-value flag meaning "update attributes
/// only". Bits outside the mask keep their default on first create and stay
/// unchanged on update, so "not mentioned" is never confused with "clear".
///
/// # Examples
///
/// ```
/// use core_types::{prop_attr, AttrDesc};
///
/// // Make a property read-only, touch nothing else.
/// let desc = AttrDesc::new().writable(false);
/// assert_eq!(desc.apply(0), prop_attr::NON_WRITABLE);
///
/// // Not mentioning writability leaves an existing read-only bit alone.
/// let desc = AttrDesc::new().enumerable(false);
/// let out = desc.apply(prop_attr::NON_WRITABLE);
/// assert_eq!(out, prop_attr::NON_WRITABLE | prop_attr::NON_ENUMERABLE);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttrDesc {
    /// Attribute bits to set, for positions selected by `mask`.
    pub bits: PropAttrs,
    /// Which attribute positions this descriptor controls.
    pub mask: PropAttrs,
    /// Update attributes only; keep the existing value.
    pub preserve_value: bool,
}

impl AttrDesc {
    /// An empty descriptor: controls nothing, replaces the value.
    pub fn new() -> AttrDesc {
        AttrDesc::default()
    }

    fn with(mut self, bit: PropAttrs, on: bool) -> AttrDesc {
        self.mask |= bit;
        if on {
            self.bits |= bit;
        } else {
            self.bits &= !bit;
        }
        self
    }

    /// Controls the writability of the property.
    pub fn writable(self, yes: bool) -> AttrDesc {
        self.with(prop_attr::NON_WRITABLE, !yes)
    }

    /// Controls whether enumeration reports the property.
    pub fn enumerable(self, yes: bool) -> AttrDesc {
        self.with(prop_attr::NON_ENUMERABLE, !yes)
    }

    /// Controls whether the property may be deleted or redefined.
    pub fn configurable(self, yes: bool) -> AttrDesc {
        self.with(prop_attr::NON_CONFIGURABLE, !yes)
    }

    /// Marks the property as an accessor with a getter.
    pub fn getter(self, yes: bool) -> AttrDesc {
        self.with(prop_attr::GETTER, yes)
    }

    /// Marks the property as an accessor with a setter.
    pub fn setter(self, yes: bool) -> AttrDesc {
        self.with(prop_attr::SETTER, yes)
    }

    /// Hides the property from user code.
    pub fn hidden(self, yes: bool) -> AttrDesc {
        self.with(prop_attr::HIDDEN, yes)
    }

    /// Keep the existing value; update attributes only.
    pub fn preserve_value(mut self) -> AttrDesc {
        self.preserve_value = true;
        self
    }

    /// Applies the descriptor to existing attribute bits.
    ///
    /// A non-configurable property accepts exactly one change: narrowing
    /// writable to non-writable. Everything else keeps the old bits; the
    /// caller decides whether the rejected change is an error (the
    /// `define_property` value-compatibility rules live there).
    pub fn apply(&self, old: PropAttrs) -> PropAttrs {
        if old & prop_attr::NON_CONFIGURABLE != 0 {
            let mut out = old;
            if self.mask & self.bits & prop_attr::NON_WRITABLE != 0 {
                out |= prop_attr::NON_WRITABLE;
            }
            out
        } else {
            (old & !self.mask) | (self.bits & self.mask)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_on_create_defaults() {
        // Defaults are all-zero: writable, enumerable, configurable.
        let desc = AttrDesc::new();
        assert_eq!(desc.apply(0), 0);
    }

    #[test]
    fn test_unmentioned_bits_are_kept() {
        let desc = AttrDesc::new().configurable(false);
        let out = desc.apply(prop_attr::NON_ENUMERABLE);
        assert_eq!(out, prop_attr::NON_ENUMERABLE | prop_attr::NON_CONFIGURABLE);
    }

    #[test]
    fn test_non_configurable_only_narrows_writable() {
        let old = prop_attr::NON_CONFIGURABLE;
        // Trying to flip enumerability on a sealed property does nothing.
        let out = AttrDesc::new().enumerable(false).apply(old);
        assert_eq!(out, old);
        // Narrowing to read-only is the one permitted change.
        let out = AttrDesc::new().writable(false).apply(old);
        assert_eq!(out, old | prop_attr::NON_WRITABLE);
        // Widening back is not.
        let out = AttrDesc::new().writable(true).apply(old | prop_attr::NON_WRITABLE);
        assert_eq!(out, old | prop_attr::NON_WRITABLE);
    }

    #[test]
    fn test_accessor_bits() {
        let desc = AttrDesc::new().getter(true).setter(true);
        let out = desc.apply(0);
        assert_eq!(out, prop_attr::GETTER | prop_attr::SETTER);
    }
}
