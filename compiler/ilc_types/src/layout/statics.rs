//! Static field layout.
//!
//! Statics are assigned to one of three blocks by the context's
//! [`FieldLayoutPolicy`](super::FieldLayoutPolicy). Each block is laid out
//! on its own from offset zero, or after the policy's header for the two
//! GC-scanned blocks. Literal and RVA statics take no storage.

use crate::layout::{ComputedStaticFieldLayout, StaticBlockKind, StaticFieldOffset, StaticsHeader};
use crate::target::align_up;
use crate::{FieldId, LayoutError, TypeId, TypeLoadReason, TypeSystemContext};

impl TypeSystemContext {
    /// Lay out the static fields of `ty` without caching anything.
    #[tracing::instrument(level = "debug", skip_all, fields(ty = %self.type_name(ty)))]
    pub fn compute_static_field_layout(
        &self,
        ty: TypeId,
    ) -> Result<ComputedStaticFieldLayout, LayoutError> {
        if self.members_pending(ty) {
            return Err(self.members_pending_error(ty));
        }
        let statics: Vec<FieldId> = self
            .fields(ty)
            .iter()
            .copied()
            .filter(|&field| self.is_static(field) && !self.is_literal(field) && !self.has_rva(field))
            .collect();

        let mut computed = ComputedStaticFieldLayout::default();
        if statics.is_empty() {
            return Ok(computed);
        }

        let header = match self.policy().gc_statics_header {
            StaticsHeader::None => 0,
            StaticsHeader::PointerSized => self.target().pointer_size(),
        };
        computed.layout.gc_statics.size = header;
        computed.layout.thread_statics.size = header;

        let overflow = || self.type_load_error(ty, TypeLoadReason::LayoutOverflow);
        let packing = self.target().default_packing_size();

        for field in statics {
            if self.is_by_ref(self.field_type(field)) {
                return Err(self.type_load_error(
                    ty,
                    TypeLoadReason::ByRefStaticField {
                        field: self.field_name(field).to_owned(),
                    },
                ));
            }

            let kind = self.static_field_block(field);
            let field_layout = self.field_size_and_alignment(ty, field, packing)?;
            let block = computed.layout.block_mut(kind);

            let offset = align_up(block.size, field_layout.alignment).ok_or_else(overflow)?;
            block.size = offset
                .checked_add(field_layout.size)
                .ok_or_else(overflow)?;
            block.largest_alignment = block.largest_alignment.max(field_layout.alignment);
            computed.offsets.push(StaticFieldOffset {
                field,
                block: kind,
                offset,
            });
        }

        // A header with nothing after it is dropped.
        for kind in [StaticBlockKind::GcStatics, StaticBlockKind::ThreadStatics] {
            let block = computed.layout.block_mut(kind);
            if header != 0 && block.size == header {
                block.size = 0;
            }
        }

        tracing::debug!(layout = ?computed.layout, "computed static layout");
        Ok(computed)
    }
}
