//! Target architecture facts and alignment arithmetic.

use crate::TypeCategory;

/// Packing used when a type declares none.
const DEFAULT_PACKING_SIZE: u32 = 32;

/// Largest number of elements in a homogeneous float aggregate.
const MAXIMUM_HFA_ELEMENT_COUNT: u32 = 4;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TargetArchitecture {
    X86,
    X64,
    Arm,
    Arm64,
    Wasm32,
}

impl TargetArchitecture {
    /// Size of a pointer in bytes.
    pub const fn pointer_size(self) -> u32 {
        match self {
            TargetArchitecture::X86 | TargetArchitecture::Arm | TargetArchitecture::Wasm32 => 4,
            TargetArchitecture::X64 | TargetArchitecture::Arm64 => 8,
        }
    }
}

/// The compilation target as seen by the layout engine.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TargetDetails {
    architecture: TargetArchitecture,
    pointer_size: u32,
}

impl TargetDetails {
    pub const fn new(architecture: TargetArchitecture) -> Self {
        Self {
            architecture,
            pointer_size: architecture.pointer_size(),
        }
    }

    #[inline]
    pub const fn architecture(&self) -> TargetArchitecture {
        self.architecture
    }

    #[inline]
    pub const fn pointer_size(&self) -> u32 {
        self.pointer_size
    }

    #[inline]
    pub const fn default_packing_size(&self) -> u32 {
        DEFAULT_PACKING_SIZE
    }

    #[inline]
    pub const fn maximum_hfa_element_count(&self) -> u32 {
        MAXIMUM_HFA_ELEMENT_COUNT
    }

    /// Alignment of an object's instance data given the largest alignment
    /// among its fields.
    ///
    /// 64-bit targets always align objects to 8 bytes, X86 to 4. 32-bit ARM
    /// and Wasm only go to 8 when some field needs it.
    pub const fn object_alignment(&self, field_alignment: u32) -> u32 {
        match self.architecture {
            TargetArchitecture::X64 | TargetArchitecture::Arm64 => 8,
            TargetArchitecture::X86 => 4,
            TargetArchitecture::Arm | TargetArchitecture::Wasm32 => {
                if field_alignment <= 4 {
                    4
                } else {
                    8
                }
            }
        }
    }

    /// Size of a primitive category, or `None` for non-primitives.
    ///
    /// `Void` is given pointer size so that it can appear in layouts.
    pub const fn primitive_size(&self, category: TypeCategory) -> Option<u32> {
        let size = match category {
            TypeCategory::Boolean | TypeCategory::SByte | TypeCategory::Byte => 1,
            TypeCategory::Char | TypeCategory::Int16 | TypeCategory::UInt16 => 2,
            TypeCategory::Int32 | TypeCategory::UInt32 | TypeCategory::Single => 4,
            TypeCategory::Int64 | TypeCategory::UInt64 | TypeCategory::Double => 8,
            TypeCategory::Void | TypeCategory::IntPtr | TypeCategory::UIntPtr => {
                self.pointer_size
            }
            _ => return None,
        };
        Some(size)
    }

    /// Natural alignment of a primitive category: equal to its size.
    #[inline]
    pub const fn primitive_alignment(&self, category: TypeCategory) -> Option<u32> {
        self.primitive_size(category)
    }
}

/// Round `value` up to a multiple of the power of two `alignment`.
///
/// Returns `None` on overflow.
#[inline]
pub const fn align_up(value: u32, alignment: u32) -> Option<u32> {
    debug_assert!(alignment.is_power_of_two());
    let mask = alignment - 1;
    match value.checked_add(mask) {
        Some(sum) => Some(sum & !mask),
        None => None,
    }
}
