//! Handles into the context's node arenas.
//!
//! Every node lives in an append-only arena owned by the
//! [`TypeSystemContext`](crate::TypeSystemContext) and is referenced by a
//! 32-bit index. Because the context uniques nodes structurally, handle
//! equality is semantic equality: two `TypeId`s compare equal exactly when
//! they name the same type.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create a handle from a raw index.
            ///
            /// The index must come from the same context that created the node.
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw index.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub(crate) const fn index(self) -> usize {
                self.0 as usize
            }

            /// # Panics
            /// Panics if the arena has grown past `u32::MAX` nodes.
            pub(crate) fn from_index(index: usize) -> Self {
                match u32::try_from(index) {
                    Ok(raw) => Self(raw),
                    Err(_) => panic!(
                        concat!(stringify!($name), " arena exceeded u32::MAX nodes (index {})"),
                        index
                    ),
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "({})"), self.0)
            }
        }
    };
}

define_id!(
    /// Handle to a type node.
    TypeId,
    "TypeId"
);

define_id!(
    /// Handle to a method node.
    MethodId,
    "MethodId"
);

define_id!(
    /// Handle to a field node.
    FieldId,
    "FieldId"
);

define_id!(
    /// Handle to a module.
    ModuleId,
    "ModuleId"
);
