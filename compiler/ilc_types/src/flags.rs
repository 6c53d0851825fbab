//! Lazily computed, cached classification flags.
//!
//! Each type node carries two [`AtomicFlags`] cells: [`TypeFlags`] (category
//! and generic-variable presence) and [`LayoutFlags`] (facts derived from
//! field layout). A query asks for a mask; if none of the mask's bits are set
//! the flags are computed, OR-merged into the cell, and returned.
//!
//! Merging only ever adds bits, so two threads computing the same flags at
//! the same time both succeed and leave the cell in the same state.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;
use bitflags::Flags;

bitflags! {
    /// Category and generic-variable flags of a type.
    ///
    /// The low six bits hold a [`TypeCategory`]; a nonzero category doubles
    /// as its own "computed" marker since no category encodes as zero.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct TypeFlags: u32 {
        /// Bits holding the [`TypeCategory`].
        const CATEGORY_MASK = 0x3F;
        /// Some reachable generic parameter is unbound.
        const CONTAINS_GENERIC_VARIABLES = 1 << 8;
        /// [`Self::CONTAINS_GENERIC_VARIABLES`] has been computed.
        const CONTAINS_GENERIC_VARIABLES_COMPUTED = 1 << 9;
    }
}

impl TypeFlags {
    /// Flags holding just `category`.
    #[inline]
    pub const fn from_category(category: TypeCategory) -> Self {
        Self::from_bits_retain(category as u32)
    }

    /// The category stored in these flags, if any.
    #[inline]
    pub fn category(self) -> Option<TypeCategory> {
        TypeCategory::from_bits(self.bits() & Self::CATEGORY_MASK.bits())
    }
}

bitflags! {
    /// Facts about a type that depend on its fields.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct LayoutFlags: u32 {
        /// Instances hold at least one GC-tracked reference.
        const CONTAINS_GC_POINTERS = 1 << 0;
        /// [`Self::CONTAINS_GC_POINTERS`] has been computed.
        const CONTAINS_GC_POINTERS_COMPUTED = 1 << 1;
        /// The type is a homogeneous float aggregate.
        const IS_HFA = 1 << 2;
        /// [`Self::IS_HFA`] has been computed.
        const IS_HFA_COMPUTED = 1 << 3;
    }
}

/// The closed set of type kinds.
///
/// Ordering matters: everything before [`TypeCategory::ValueType`] is a
/// primitive, everything before [`TypeCategory::Class`] is a value type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
#[repr(u32)]
pub enum TypeCategory {
    Void = 0x01,
    Boolean = 0x02,
    Char = 0x03,
    SByte = 0x04,
    Byte = 0x05,
    Int16 = 0x06,
    UInt16 = 0x07,
    Int32 = 0x08,
    UInt32 = 0x09,
    Int64 = 0x0A,
    UInt64 = 0x0B,
    IntPtr = 0x0C,
    UIntPtr = 0x0D,
    Single = 0x0E,
    Double = 0x0F,

    ValueType = 0x10,
    Enum = 0x11,
    Nullable = 0x12,

    Class = 0x14,
    Interface = 0x15,

    Array = 0x16,
    SzArray = 0x17,
    ByRef = 0x18,
    Pointer = 0x19,

    SignatureTypeVariable = 0x1C,
    SignatureMethodVariable = 0x1D,
}

impl TypeCategory {
    const ALL: [Self; 26] = [
        Self::Void,
        Self::Boolean,
        Self::Char,
        Self::SByte,
        Self::Byte,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::IntPtr,
        Self::UIntPtr,
        Self::Single,
        Self::Double,
        Self::ValueType,
        Self::Enum,
        Self::Nullable,
        Self::Class,
        Self::Interface,
        Self::Array,
        Self::SzArray,
        Self::ByRef,
        Self::Pointer,
        Self::SignatureTypeVariable,
        Self::SignatureMethodVariable,
    ];

    /// Decode a category from its flag bits.
    pub fn from_bits(bits: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|&category| category as u32 == bits)
    }

    #[inline]
    pub const fn is_primitive(self) -> bool {
        (self as u32) < (Self::ValueType as u32)
    }

    /// Primitives, structs, enums and nullables.
    #[inline]
    pub const fn is_value_type(self) -> bool {
        (self as u32) < (Self::Class as u32)
    }

    /// Categories whose values are GC-tracked object references.
    #[inline]
    pub const fn is_gc_pointer(self) -> bool {
        matches!(
            self,
            Self::Class | Self::Interface | Self::Array | Self::SzArray
        )
    }

    #[inline]
    pub const fn is_signature_variable(self) -> bool {
        matches!(
            self,
            Self::SignatureTypeVariable | Self::SignatureMethodVariable
        )
    }
}

/// An atomic cell of OR-merged flags.
pub struct AtomicFlags<F> {
    bits: AtomicU32,
    marker: PhantomData<F>,
}

impl<F: Flags<Bits = u32> + Copy> AtomicFlags<F> {
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
            marker: PhantomData,
        }
    }

    /// Current flags restricted to `mask`.
    #[inline]
    pub fn get(&self, mask: F) -> F {
        F::from_bits_retain(self.bits.load(Ordering::Acquire) & mask.bits())
    }

    /// OR `flags` into the cell.
    pub fn merge(&self, flags: F) {
        let bits = flags.bits();
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let merged = current | bits;
            if merged == current {
                return;
            }
            match self.bits.compare_exchange_weak(
                current,
                merged,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Flags restricted to `mask`, computing and caching them if no bit of
    /// `mask` is set yet.
    ///
    /// `compute` receives `mask` and must set at least one of its bits:
    /// an all-zero answer would be indistinguishable from "not computed".
    pub fn get_or_compute(&self, mask: F, compute: impl FnOnce(F) -> F) -> F {
        let cached = self.get(mask);
        if cached.bits() != 0 {
            return cached;
        }
        let computed = compute(mask);
        debug_assert!(
            computed.bits() & mask.bits() != 0,
            "flag computation left every requested bit clear"
        );
        self.merge(computed);
        F::from_bits_retain(computed.bits() & mask.bits())
    }
}

impl<F: Flags<Bits = u32> + Copy> Default for AtomicFlags<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Flags<Bits = u32> + Copy + std::fmt::Debug> std::fmt::Debug for AtomicFlags<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AtomicFlags")
            .field(&F::from_bits_retain(self.bits.load(Ordering::Relaxed)))
            .finish()
    }
}
