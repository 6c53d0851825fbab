//! Field layout: instance sizes, field offsets, static blocks.
//!
//! Layouts are computed on first use and cached on the type node for the
//! lifetime of the context, failures included. An instantiated type whose
//! definition has no members yet is refused without caching anything.
//! Computing a layout also publishes the offsets of the type's fields; a
//! field offset is written once and a redundant computation asserts it
//! produced the same value.
//!
//! The `compute_*` entry points are pure: they return the full result
//! without caching, and back the cached accessors.

use crate::{FieldId, LayoutError, TypeId, TypeSystemContext};

mod gc;
mod hfa;
mod instance;
mod statics;

/// Header reserved at the start of each GC statics block.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum StaticsHeader {
    None,
    /// One pointer, dropped again if no field lands in the block.
    PointerSized,
}

/// The three independent static storage blocks of a type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum StaticBlockKind {
    /// Statics the GC must scan: references and structs holding them.
    GcStatics,
    /// Per-thread statics, GC-scanned.
    ThreadStatics,
    /// Plain data statics.
    NonGcStatics,
}

/// How static fields are assigned to blocks.
///
/// Chosen once at context construction. The runtime lays statics out the
/// way the runtime allocates them; compile-time-only consumers use the
/// header-free metadata variant.
#[derive(Copy, Clone, Debug)]
pub struct FieldLayoutPolicy {
    pub gc_statics_header: StaticsHeader,
    pub classify_static_block: fn(&TypeSystemContext, FieldId) -> StaticBlockKind,
}

impl FieldLayoutPolicy {
    pub fn runtime() -> Self {
        Self {
            gc_statics_header: StaticsHeader::PointerSized,
            classify_static_block: default_static_block,
        }
    }

    pub fn metadata() -> Self {
        Self {
            gc_statics_header: StaticsHeader::None,
            classify_static_block: default_static_block,
        }
    }
}

impl Default for FieldLayoutPolicy {
    fn default() -> Self {
        Self::runtime()
    }
}

/// Thread statics go to the thread block, the rest by whether they hold
/// GC references.
pub fn default_static_block(ctx: &TypeSystemContext, field: FieldId) -> StaticBlockKind {
    if ctx.is_thread_static(field) {
        StaticBlockKind::ThreadStatics
    } else if ctx.has_gc_static_base(field) {
        StaticBlockKind::GcStatics
    } else {
        StaticBlockKind::NonGcStatics
    }
}

/// Byte sizes and alignments of a type's instances.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct InstanceLayout {
    /// Bytes a field of this type occupies: the instance size for value
    /// types, a pointer for reference types.
    pub field_size: u32,
    pub field_alignment: u32,
    /// Instance data size before rounding to [`Self::byte_count_alignment`].
    pub byte_count_unaligned: u32,
    pub byte_count_alignment: u32,
}

impl InstanceLayout {
    /// Instance data size rounded up to its alignment.
    pub fn byte_count(&self) -> Option<u32> {
        crate::align_up(self.byte_count_unaligned, self.byte_count_alignment)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldAndOffset {
    pub field: FieldId,
    pub offset: u32,
}

/// Result of laying out a type's instance fields.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ComputedInstanceFieldLayout {
    pub layout: InstanceLayout,
    /// Instance fields in declaration order.
    pub offsets: Vec<FieldAndOffset>,
}

/// Size and largest alignment of one static block.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct StaticsBlock {
    pub size: u32,
    pub largest_alignment: u32,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct StaticLayout {
    pub gc_statics: StaticsBlock,
    pub thread_statics: StaticsBlock,
    pub non_gc_statics: StaticsBlock,
}

impl StaticLayout {
    pub fn block(&self, kind: StaticBlockKind) -> &StaticsBlock {
        match kind {
            StaticBlockKind::GcStatics => &self.gc_statics,
            StaticBlockKind::ThreadStatics => &self.thread_statics,
            StaticBlockKind::NonGcStatics => &self.non_gc_statics,
        }
    }

    pub(crate) fn block_mut(&mut self, kind: StaticBlockKind) -> &mut StaticsBlock {
        match kind {
            StaticBlockKind::GcStatics => &mut self.gc_statics,
            StaticBlockKind::ThreadStatics => &mut self.thread_statics,
            StaticBlockKind::NonGcStatics => &mut self.non_gc_statics,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct StaticFieldOffset {
    pub field: FieldId,
    pub block: StaticBlockKind,
    /// Offset within `block`.
    pub offset: u32,
}

/// Result of laying out a type's static fields.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ComputedStaticFieldLayout {
    pub layout: StaticLayout,
    /// Statics with storage, in declaration order.
    pub offsets: Vec<StaticFieldOffset>,
}

impl TypeSystemContext {
    /// Instance layout of `ty`, computed once and cached.
    pub fn instance_layout(&self, ty: TypeId) -> Result<InstanceLayout, LayoutError> {
        let node = self.type_node(ty);
        if let Some(cached) = node.instance_layout.get() {
            return cached.clone();
        }
        if self.members_pending(ty) {
            return Err(self.members_pending_error(ty));
        }

        let result = self.compute_instance_field_layout(ty).map(|computed| {
            for &FieldAndOffset { field, offset } in &computed.offsets {
                self.publish_field_offset(field, offset);
            }
            computed.layout
        });
        if let Err(error) = &result {
            tracing::debug!(%error, "instance layout failed");
        }

        let stored = node.instance_layout.get_or_init(|| result.clone());
        debug_assert_eq!(
            stored,
            &result,
            "instance layout of `{}` recomputed differently",
            self.type_name(ty)
        );
        stored.clone()
    }

    /// Static layout of `ty`, computed once and cached.
    pub fn static_layout(&self, ty: TypeId) -> Result<StaticLayout, LayoutError> {
        let node = self.type_node(ty);
        if let Some(cached) = node.static_layout.get() {
            return cached.clone();
        }
        if self.members_pending(ty) {
            return Err(self.members_pending_error(ty));
        }

        let result = self.compute_static_field_layout(ty).map(|computed| {
            for static_offset in &computed.offsets {
                self.publish_field_offset(static_offset.field, static_offset.offset);
            }
            computed.layout
        });
        if let Err(error) = &result {
            tracing::debug!(%error, "static layout failed");
        }

        let stored = node.static_layout.get_or_init(|| result.clone());
        debug_assert_eq!(
            stored,
            &result,
            "static layout of `{}` recomputed differently",
            self.type_name(ty)
        );
        stored.clone()
    }

    fn publish_field_offset(&self, field: FieldId, offset: u32) {
        let stored = *self.field_node(field).offset.get_or_init(|| offset);
        debug_assert_eq!(
            stored,
            offset,
            "offset of `{}` rewritten with a different value",
            self.format_field(field)
        );
    }

    /// Offset of an instance field within the instance data, or of a static
    /// field within its static block.
    pub fn field_offset(&self, field: FieldId) -> Result<u32, LayoutError> {
        let node = self.field_node(field);
        if let Some(&offset) = node.offset.get() {
            return Ok(offset);
        }

        let owner = self.field_owner(field);
        if self.is_static(field) {
            self.static_layout(owner)?;
        } else {
            self.instance_layout(owner)?;
        }
        node.offset.get().copied().ok_or_else(|| LayoutError::Unsupported {
            type_name: self.type_name(owner),
            what: format!("field `{}` occupies no storage", self.field_name(field)),
        })
    }

    /// Block holding a static field's storage.
    pub fn static_field_block(&self, field: FieldId) -> StaticBlockKind {
        debug_assert!(self.is_static(field), "{field:?} is not static");
        (self.policy().classify_static_block)(self, field)
    }

    pub fn instance_field_size(&self, ty: TypeId) -> Result<u32, LayoutError> {
        self.instance_layout(ty).map(|layout| layout.field_size)
    }

    pub fn instance_field_alignment(&self, ty: TypeId) -> Result<u32, LayoutError> {
        self.instance_layout(ty).map(|layout| layout.field_alignment)
    }

    pub fn instance_byte_count_unaligned(&self, ty: TypeId) -> Result<u32, LayoutError> {
        self.instance_layout(ty)
            .map(|layout| layout.byte_count_unaligned)
    }

    pub fn instance_byte_alignment(&self, ty: TypeId) -> Result<u32, LayoutError> {
        self.instance_layout(ty)
            .map(|layout| layout.byte_count_alignment)
    }

    /// Instance data size rounded up to the instance byte alignment.
    pub fn instance_byte_count(&self, ty: TypeId) -> Result<u32, LayoutError> {
        let layout = self.instance_layout(ty)?;
        layout
            .byte_count()
            .ok_or_else(|| self.type_load_error(ty, crate::TypeLoadReason::LayoutOverflow))
    }

    pub(crate) fn members_pending_error(&self, ty: TypeId) -> LayoutError {
        LayoutError::Unsupported {
            type_name: self.type_name(ty),
            what: format!(
                "members of `{}` are not defined yet",
                self.type_name(self.type_definition(ty))
            ),
        }
    }

    pub(crate) fn type_load_error(&self, ty: TypeId, reason: crate::TypeLoadReason) -> LayoutError {
        LayoutError::TypeLoad {
            type_name: self.type_name(ty),
            reason,
        }
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    reason = "tests use unwrap for concise assertions"
)]
mod tests;
