//! Homogeneous float aggregates.
//!
//! A value type made only of `float`s or only of `double`s, possibly through
//! nested structs, with at most four elements. Such types travel in
//! floating-point registers under the ARM calling conventions.

use crate::flags::LayoutFlags;
use crate::{LayoutError, LayoutKind, TypeCategory, TypeId, TypeSystemContext};

impl TypeSystemContext {
    /// Whether `ty` is a homogeneous float aggregate. Memoized.
    pub fn is_hfa(&self, ty: TypeId) -> Result<bool, LayoutError> {
        let node = self.type_node(ty);
        let cached = node
            .layout_flags
            .get(LayoutFlags::IS_HFA | LayoutFlags::IS_HFA_COMPUTED);
        if !cached.is_empty() {
            return Ok(cached.contains(LayoutFlags::IS_HFA));
        }

        let is_hfa = self.compute_is_hfa(ty)?;
        node.layout_flags.merge(if is_hfa {
            LayoutFlags::IS_HFA | LayoutFlags::IS_HFA_COMPUTED
        } else {
            LayoutFlags::IS_HFA_COMPUTED
        });
        Ok(is_hfa)
    }

    /// The `float` or `double` type every element of an HFA shares.
    pub fn hfa_element_type(&self, ty: TypeId) -> Result<Option<TypeId>, LayoutError> {
        if !self.is_hfa(ty)? {
            return Ok(None);
        }

        let mut current = ty;
        loop {
            match self.category(current) {
                TypeCategory::Single | TypeCategory::Double => return Ok(Some(current)),
                TypeCategory::ValueType => match self.instance_fields(current).next() {
                    Some(field) => current = self.field_type(field),
                    None => return Ok(None),
                },
                _ => return Ok(None),
            }
        }
    }

    fn compute_is_hfa(&self, ty: TypeId) -> Result<bool, LayoutError> {
        let Some(definition) = self.type_definition_data(ty) else {
            return Ok(false);
        };
        if definition.class_layout.kind == LayoutKind::Explicit {
            return Ok(false);
        }

        match self.category(ty) {
            TypeCategory::Single | TypeCategory::Double => Ok(true),
            TypeCategory::ValueType => {
                let mut element = None;
                for field in self.instance_fields(ty) {
                    let field_type = self.field_type(field);
                    if self.type_definition_data(field_type).is_none() || !self.is_hfa(field_type)? {
                        return Ok(false);
                    }
                    let field_element = self.hfa_element_type(field_type)?;
                    match element {
                        None => element = field_element,
                        Some(_) if element != field_element => return Ok(false),
                        Some(_) => {}
                    }
                }

                let Some(element) = element else {
                    return Ok(false);
                };
                let maximum_size = self
                    .instance_field_size(element)?
                    .saturating_mul(self.target().maximum_hfa_element_count());
                Ok(self.instance_field_size(ty)? <= maximum_size)
            }
            _ => Ok(false),
        }
    }
}
