//! Canonical forms for shared generic code.
//!
//! Instantiations over reference types share one body of code. The
//! canonical form of such an instantiation replaces every reference-type
//! argument by `__Canon`: `List<string>` and `List<object>` both become
//! `List<__Canon>`. Value-type arguments keep their identity because their
//! layout differs, but their own arguments are canonicalized in turn.

use crate::{Instantiation, TypeData, TypeId, TypeSystemContext};

impl TypeSystemContext {
    /// The canonical form of `ty`. Types with nothing to share are their
    /// own canonical form.
    pub fn convert_to_canon_form(&self, ty: TypeId) -> TypeId {
        match self.type_data(ty) {
            TypeData::Instantiated {
                definition,
                instantiation,
            } => {
                let canonical: Instantiation = instantiation
                    .iter()
                    .map(|&arg| self.canon_argument(arg))
                    .collect();
                if canonical[..] == instantiation[..] {
                    ty
                } else {
                    self.get_instantiated_type(*definition, &canonical)
                }
            }
            TypeData::Array { element, rank } => {
                let canonical = self.canon_argument(*element);
                if canonical == *element {
                    ty
                } else {
                    self.array_of(canonical, *rank)
                }
            }
            TypeData::ByRef { parameter } => {
                let canonical = self.canon_argument(*parameter);
                if canonical == *parameter {
                    ty
                } else {
                    self.get_by_ref_type(canonical)
                }
            }
            TypeData::Pointer { parameter } => {
                let canonical = self.canon_argument(*parameter);
                if canonical == *parameter {
                    ty
                } else {
                    self.get_pointer_type(canonical)
                }
            }
            TypeData::Definition(_) | TypeData::SignatureVariable { .. } | TypeData::Canon => ty,
        }
    }

    /// Canonical stand-in for `ty` in argument position.
    fn canon_argument(&self, ty: TypeId) -> TypeId {
        match self.type_data(ty) {
            TypeData::Definition(_) | TypeData::Instantiated { .. } => {
                if !self.is_value_type(ty) {
                    self.canon_type()
                } else if self.has_instantiation(ty) {
                    self.convert_to_canon_form(ty)
                } else {
                    ty
                }
            }
            TypeData::Array { .. } => self.canon_type(),
            TypeData::ByRef { .. } | TypeData::Pointer { .. } => self.convert_to_canon_form(ty),
            TypeData::SignatureVariable { .. } | TypeData::Canon => ty,
        }
    }

    #[inline]
    pub fn is_canon_type(&self, ty: TypeId) -> bool {
        ty == self.canon_type()
    }

    /// Whether `ty` is already in canonical form.
    pub fn is_canonical(&self, ty: TypeId) -> bool {
        self.convert_to_canon_form(ty) == ty
    }
}

#[cfg(test)]
mod tests;
