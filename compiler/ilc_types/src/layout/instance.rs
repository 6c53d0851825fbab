//! Instance field layout.
//!
//! Three classes of type:
//! - the module global type, which may have no instance fields;
//! - primitives, sized from the target table;
//! - everything else, laid out sequentially or at explicit offsets.
//!
//! Sequential layout continues after the base type's unaligned byte count;
//! explicit offsets are relative to the base type's aligned byte count.

use crate::layout::{ComputedInstanceFieldLayout, FieldAndOffset, InstanceLayout};
use crate::target::align_up;
use crate::{
    ClassLayout, FieldId, LayoutError, LayoutKind, TypeCategory, TypeData, TypeId,
    TypeLoadReason, TypeSystemContext,
};

/// Largest packing size metadata may declare.
const MAXIMUM_PACKING_SIZE: u32 = 128;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(super) struct SizeAndAlignment {
    pub(super) size: u32,
    pub(super) alignment: u32,
}

impl TypeSystemContext {
    /// Lay out the instance fields of `ty` without caching anything.
    #[tracing::instrument(level = "debug", skip_all, fields(ty = %self.type_name(ty)))]
    pub fn compute_instance_field_layout(
        &self,
        ty: TypeId,
    ) -> Result<ComputedInstanceFieldLayout, LayoutError> {
        if self.members_pending(ty) {
            return Err(self.members_pending_error(ty));
        }
        let Some(definition) = self.type_definition_data(ty) else {
            return Err(LayoutError::Unsupported {
                type_name: self.type_name(ty),
                what: "type has no instance fields to lay out".to_owned(),
            });
        };
        let class_layout = definition.class_layout;

        if class_layout.kind == LayoutKind::Explicit && self.has_instantiation(ty) {
            return Err(self.type_load_error(ty, TypeLoadReason::ExplicitLayoutOnGenericType));
        }

        let fields: Vec<FieldId> = self.instance_fields(ty).collect();
        if let Some(&field) = fields
            .iter()
            .find(|&&field| self.is_by_ref(self.field_type(field)))
        {
            return Err(self.type_load_error(
                ty,
                TypeLoadReason::ByRefInstanceField {
                    field: self.field_name(field).to_owned(),
                },
            ));
        }

        if definition.is_module_type() {
            if let Some(&field) = fields.first() {
                return Err(self.type_load_error(
                    ty,
                    TypeLoadReason::InstanceFieldOnGlobalType {
                        field: self.field_name(field).to_owned(),
                    },
                ));
            }
            return Ok(ComputedInstanceFieldLayout {
                layout: InstanceLayout::default(),
                offsets: Vec::new(),
            });
        }

        self.check_layout_matches_base(ty, class_layout.kind)?;

        if self.is_enum(ty) && fields.len() != 1 {
            return Err(self.type_load_error(
                ty,
                TypeLoadReason::EnumFieldCount {
                    found: fields.len(),
                },
            ));
        }

        if self.is_primitive(ty) {
            return self.compute_primitive_layout(ty, &fields);
        }

        if class_layout.kind != LayoutKind::Auto {
            if self.is_enum(ty) {
                return Err(self.type_load_error(ty, TypeLoadReason::LayoutOnEnum));
            }
            let packing = class_layout.packing_size;
            if packing > MAXIMUM_PACKING_SIZE || packing & packing.wrapping_sub(1) != 0 {
                return Err(
                    self.type_load_error(ty, TypeLoadReason::InvalidPackingSize { packing })
                );
            }
        }

        let computed = match class_layout.kind {
            LayoutKind::Explicit => self.compute_explicit_layout(ty, class_layout, &fields),
            LayoutKind::Auto | LayoutKind::Sequential => {
                self.compute_sequential_layout(ty, class_layout, &fields)
            }
        }?;
        tracing::debug!(layout = ?computed.layout, "computed instance layout");
        Ok(computed)
    }

    /// Below the object root, a laid-out class must use the same layout
    /// kind as its base.
    fn check_layout_matches_base(&self, ty: TypeId, kind: LayoutKind) -> Result<(), LayoutError> {
        if kind == LayoutKind::Auto || self.is_value_type(ty) || self.is_object(ty) {
            return Ok(());
        }
        let Some(base) = self.base_type(ty) else {
            return Ok(());
        };
        if self.is_value_type(base) || self.is_object(base) {
            return Ok(());
        }
        let base_kind = self
            .type_definition_data(base)
            .map(|definition| definition.class_layout.kind);
        if base_kind == Some(kind) {
            Ok(())
        } else {
            Err(self.type_load_error(
                ty,
                TypeLoadReason::LayoutKindMismatch {
                    base: self.type_name(base),
                },
            ))
        }
    }

    fn compute_primitive_layout(
        &self,
        ty: TypeId,
        fields: &[FieldId],
    ) -> Result<ComputedInstanceFieldLayout, LayoutError> {
        if fields.len() > 1 {
            return Err(self.type_load_error(
                ty,
                TypeLoadReason::PrimitiveFieldCount {
                    found: fields.len(),
                },
            ));
        }

        let category = self.category(ty);
        let (Some(size), Some(alignment)) = (
            self.target().primitive_size(category),
            self.target().primitive_alignment(category),
        ) else {
            return Err(LayoutError::Unsupported {
                type_name: self.type_name(ty),
                what: format!("no size known for primitive category {category:?}"),
            });
        };

        Ok(ComputedInstanceFieldLayout {
            layout: self.compute_instance_size(ty, size, alignment)?,
            offsets: fields
                .iter()
                .map(|&field| FieldAndOffset { field, offset: 0 })
                .collect(),
        })
    }

    fn compute_explicit_layout(
        &self,
        ty: TypeId,
        class_layout: ClassLayout,
        fields: &[FieldId],
    ) -> Result<ComputedInstanceFieldLayout, LayoutError> {
        let overflow = || self.type_load_error(ty, TypeLoadReason::LayoutOverflow);
        let pointer_size = self.target().pointer_size();

        // Offsets are relative to the end of the base type's aligned data.
        let mut cumulative_base = 0;
        if !self.is_value_type(ty) {
            if let Some(base) = self.base_type(ty) {
                cumulative_base = self.instance_byte_count(base)?;
            }
        }

        let packing = self.compute_packing_size(ty, class_layout);
        let mut instance_size = cumulative_base;
        let mut largest_alignment = 1;
        let mut offsets = Vec::with_capacity(fields.len());

        for &field in fields {
            let field_layout = self.field_size_and_alignment(ty, field, packing)?;
            largest_alignment = largest_alignment.max(field_layout.alignment);

            let Some(declared) = self.explicit_offset(field) else {
                return Err(self.type_load_error(
                    ty,
                    TypeLoadReason::MissingExplicitOffset {
                        field: self.field_name(field).to_owned(),
                    },
                ));
            };
            let offset = declared.checked_add(cumulative_base).ok_or_else(overflow)?;

            if self.is_gc_pointer(self.field_type(field)) && offset % pointer_size != 0 {
                return Err(self.type_load_error(
                    ty,
                    TypeLoadReason::MisalignedReferenceField {
                        field: self.field_name(field).to_owned(),
                        offset: declared,
                        pointer_size,
                    },
                ));
            }

            offsets.push(FieldAndOffset { field, offset });
            let extent = offset.checked_add(field_layout.size).ok_or_else(overflow)?;
            instance_size = instance_size.max(extent);
        }

        if self.is_value_type(ty) {
            instance_size = instance_size.max(class_layout.size);
        }

        Ok(ComputedInstanceFieldLayout {
            layout: self.compute_instance_size(ty, instance_size, largest_alignment)?,
            offsets,
        })
    }

    fn compute_sequential_layout(
        &self,
        ty: TypeId,
        class_layout: ClassLayout,
        fields: &[FieldId],
    ) -> Result<ComputedInstanceFieldLayout, LayoutError> {
        let overflow = || self.type_load_error(ty, TypeLoadReason::LayoutOverflow);

        let mut cumulative = 0;
        if !self.is_value_type(ty) {
            if let Some(base) = self.base_type(ty) {
                cumulative = self.instance_byte_count_unaligned(base)?;
            }
        }

        let packing = self.compute_packing_size(ty, class_layout);
        let mut largest_alignment = 1;
        let mut offsets = Vec::with_capacity(fields.len());

        for &field in fields {
            let field_layout = self.field_size_and_alignment(ty, field, packing)?;
            largest_alignment = largest_alignment.max(field_layout.alignment);

            cumulative = align_up(cumulative, field_layout.alignment).ok_or_else(overflow)?;
            offsets.push(FieldAndOffset {
                field,
                offset: cumulative,
            });
            cumulative = cumulative
                .checked_add(field_layout.size)
                .ok_or_else(overflow)?;
        }

        if self.is_value_type(ty) {
            cumulative = cumulative.max(class_layout.size);
        }

        Ok(ComputedInstanceFieldLayout {
            layout: self.compute_instance_size(ty, cumulative, largest_alignment)?,
            offsets,
        })
    }

    /// Declared packing, or the target default when none is declared or the
    /// type holds GC references.
    fn compute_packing_size(&self, ty: TypeId, class_layout: ClassLayout) -> u32 {
        if class_layout.packing_size == 0 || self.contains_gc_pointers(ty) {
            self.target().default_packing_size()
        } else {
            class_layout.packing_size
        }
    }

    /// Turn a raw instance size and field alignment into the final layout.
    ///
    /// Value types pad an empty layout to one byte and are rounded up to
    /// their alignment; reference types occupy a pointer in fields and
    /// inherit at least their base type's alignment.
    fn compute_instance_size(
        &self,
        ty: TypeId,
        instance_size: u32,
        alignment: u32,
    ) -> Result<InstanceLayout, LayoutError> {
        let pointer_size = self.target().pointer_size();
        let mut instance_size = instance_size;
        let mut alignment = alignment;
        let field_size;
        let field_alignment;

        if self.is_value_type(ty) {
            if instance_size == 0 {
                instance_size = 1;
            }
            instance_size = align_up(instance_size, alignment)
                .ok_or_else(|| self.type_load_error(ty, TypeLoadReason::LayoutOverflow))?;
            field_size = instance_size;
            field_alignment = alignment;
        } else {
            field_size = pointer_size;
            field_alignment = pointer_size;
            if let Some(base) = self.base_type(ty) {
                alignment = alignment.max(self.instance_byte_alignment(base)?);
            }
        }

        Ok(InstanceLayout {
            field_size,
            field_alignment,
            byte_count_unaligned: instance_size,
            byte_count_alignment: self.target().object_alignment(alignment),
        })
    }

    /// Space a field of `field`'s type occupies, with alignment capped by
    /// `packing`.
    pub(super) fn field_size_and_alignment(
        &self,
        owner: TypeId,
        field: FieldId,
        packing: u32,
    ) -> Result<SizeAndAlignment, LayoutError> {
        let field_type = self.field_type(field);
        let pointer_size = self.target().pointer_size();

        let (size, alignment) = match self.category(field_type) {
            category if category.is_value_type() => match self.type_data(field_type) {
                TypeData::Definition(_) | TypeData::Instantiated { .. } => {
                    let layout = self.instance_layout(field_type)?;
                    (layout.field_size, layout.field_alignment)
                }
                _ => return Err(self.unsupported_field(owner, field_type, field)),
            },
            TypeCategory::Class
            | TypeCategory::Interface
            | TypeCategory::Array
            | TypeCategory::SzArray
            | TypeCategory::Pointer
            | TypeCategory::ByRef => (pointer_size, pointer_size),
            _ => return Err(self.unsupported_field(owner, field_type, field)),
        };

        Ok(SizeAndAlignment {
            size,
            alignment: alignment.min(packing),
        })
    }

    fn unsupported_field(&self, owner: TypeId, field_type: TypeId, field: FieldId) -> LayoutError {
        LayoutError::Unsupported {
            type_name: self.type_name(owner),
            what: format!(
                "field `{}` has open type `{}`",
                self.field_name(field),
                self.type_name(field_type)
            ),
        }
    }
}
