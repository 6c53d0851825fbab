//! GC pointer containment.
//!
//! Memoized per type in its [`LayoutFlags`] cell. Containment is decided
//! from field types alone and never needs offsets, so it may be queried
//! while a layout is being computed.

use crate::flags::LayoutFlags;
use crate::{TypeCategory, TypeData, TypeId, TypeSystemContext};

impl TypeSystemContext {
    /// Whether instances of `ty` hold GC-tracked references.
    ///
    /// For arrays: whether the elements do.
    pub fn contains_gc_pointers(&self, ty: TypeId) -> bool {
        if self.members_pending(ty) {
            return self.compute_contains_gc_pointers(ty);
        }
        self.type_node(ty)
            .layout_flags
            .get_or_compute(
                LayoutFlags::CONTAINS_GC_POINTERS | LayoutFlags::CONTAINS_GC_POINTERS_COMPUTED,
                |_| {
                    let mut flags = LayoutFlags::CONTAINS_GC_POINTERS_COMPUTED;
                    if self.compute_contains_gc_pointers(ty) {
                        flags |= LayoutFlags::CONTAINS_GC_POINTERS;
                    }
                    flags
                },
            )
            .contains(LayoutFlags::CONTAINS_GC_POINTERS)
    }

    fn compute_contains_gc_pointers(&self, ty: TypeId) -> bool {
        match self.type_data(ty) {
            TypeData::Definition(_) | TypeData::Instantiated { .. } => {}
            TypeData::Array { element, .. } => {
                return self.is_gc_pointer(*element)
                    || (self.is_value_type(*element) && self.contains_gc_pointers(*element));
            }
            TypeData::ByRef { .. }
            | TypeData::Pointer { .. }
            | TypeData::SignatureVariable { .. }
            | TypeData::Canon => return false,
        }

        if !self.is_value_type(ty) {
            if let Some(base) = self.base_type(ty) {
                if self.contains_gc_pointers(base) {
                    return true;
                }
            }
        }

        self.instance_fields(ty).any(|field| {
            let field_type = self.field_type(field);
            match self.category(field_type) {
                category if category.is_primitive() => false,
                category if category.is_value_type() => self.contains_gc_pointers(field_type),
                // An open parameter may be instantiated over a reference.
                TypeCategory::Class
                | TypeCategory::Interface
                | TypeCategory::Array
                | TypeCategory::SzArray
                | TypeCategory::ByRef
                | TypeCategory::SignatureTypeVariable
                | TypeCategory::SignatureMethodVariable => true,
                _ => false,
            }
        })
    }
}
