//! Signature substitution.
//!
//! Replaces signature variables with concrete arguments. Two argument
//! tuples are threaded through every call: `type_args` binds `!n` and
//! `method_args` binds `!!n`. An empty tuple leaves its variables alone.
//!
//! Substitution rebuilds a node only when one of its components changed,
//! and always through the uniquing constructors, so the result is the
//! canonical node. A type that contains no generic variables is returned
//! as is without being walked.

use crate::{
    FieldId, GenericParameterKind, Instantiation, MethodId, MethodSignature, TypeData, TypeId,
    TypeSystemContext,
};

impl TypeSystemContext {
    /// Substitute `type_args` and `method_args` into `ty`.
    ///
    /// # Panics
    /// In debug builds, if a signature variable indexes past a non-empty
    /// argument tuple.
    pub fn instantiate_signature(
        &self,
        ty: TypeId,
        type_args: &[TypeId],
        method_args: &[TypeId],
    ) -> TypeId {
        if !self.contains_generic_variables(ty) {
            return ty;
        }

        match self.type_data(ty) {
            TypeData::SignatureVariable { kind, index } => {
                let args = match kind {
                    GenericParameterKind::Type => type_args,
                    GenericParameterKind::Method => method_args,
                };
                if args.is_empty() {
                    return ty;
                }
                debug_assert!(
                    (*index as usize) < args.len(),
                    "`{}` is out of range for {} arguments",
                    self.type_name(ty),
                    args.len()
                );
                args.get(*index as usize).copied().unwrap_or(ty)
            }
            TypeData::Array { element, rank } => {
                let substituted = self.instantiate_signature(*element, type_args, method_args);
                if substituted == *element {
                    ty
                } else {
                    self.array_of(substituted, *rank)
                }
            }
            TypeData::ByRef { parameter } => {
                let substituted = self.instantiate_signature(*parameter, type_args, method_args);
                if substituted == *parameter {
                    ty
                } else {
                    self.get_by_ref_type(substituted)
                }
            }
            TypeData::Pointer { parameter } => {
                let substituted = self.instantiate_signature(*parameter, type_args, method_args);
                if substituted == *parameter {
                    ty
                } else {
                    self.get_pointer_type(substituted)
                }
            }
            TypeData::Instantiated {
                definition,
                instantiation,
            } => match self.instantiate_arguments(instantiation, type_args, method_args) {
                Some(substituted) => self.get_instantiated_type(*definition, &substituted),
                None => ty,
            },
            // Formal parameters of a definition are not substituted: the
            // definition stands for itself.
            TypeData::Definition(_) | TypeData::Canon => ty,
        }
    }

    /// Substitute each argument; `None` if none of them changed.
    fn instantiate_arguments(
        &self,
        args: &[TypeId],
        type_args: &[TypeId],
        method_args: &[TypeId],
    ) -> Option<Instantiation> {
        let mut changed: Option<Instantiation> = None;
        for (position, &arg) in args.iter().enumerate() {
            let substituted = self.instantiate_signature(arg, type_args, method_args);
            match &mut changed {
                Some(result) => result.push(substituted),
                None if substituted != arg => {
                    let mut result = Instantiation::from(&args[..position]);
                    result.push(substituted);
                    changed = Some(result);
                }
                None => {}
            }
        }
        changed
    }

    /// Substitute into every type of a method signature.
    pub fn instantiate_method_signature(
        &self,
        signature: &MethodSignature,
        type_args: &[TypeId],
        method_args: &[TypeId],
    ) -> MethodSignature {
        signature.map_types(|ty| self.instantiate_signature(ty, type_args, method_args))
    }

    /// Substitute into a method's owning type and its own instantiation.
    ///
    /// A method on `List<!0>` substituted with `[int]` becomes the same
    /// method on `List<int>`; a generic method instantiated over `[!!0]`
    /// substituted with method arguments `[string]` becomes the method
    /// instantiated over `[string]`.
    pub fn instantiate_method(
        &self,
        method: MethodId,
        type_args: &[TypeId],
        method_args: &[TypeId],
    ) -> MethodId {
        let instantiation = self.method_instantiation(method);
        // The formals `!!0..` of an uninstantiated generic method stand for
        // themselves, like the formals of a type definition.
        let substituted_instantiation = if self.is_instantiated_method(method) {
            self.instantiate_arguments(instantiation, type_args, method_args)
        } else {
            None
        };

        let owner = self.owning_type(method);
        let substituted_owner = self.instantiate_signature(owner, type_args, method_args);

        let mut result = method;
        if substituted_owner != owner {
            result = self.get_method_for_instantiated_type(
                self.typical_method_definition(method),
                substituted_owner,
            );
            if substituted_instantiation.is_none() && self.is_instantiated_method(method) {
                return self.get_instantiated_method(result, instantiation);
            }
        }

        match substituted_instantiation {
            Some(substituted) => {
                self.get_instantiated_method(self.method_definition(result), &substituted)
            }
            None => result,
        }
    }

    fn is_instantiated_method(&self, method: MethodId) -> bool {
        self.method_definition(method) != method
    }

    /// Substitute into a field's owning type.
    pub fn instantiate_field(
        &self,
        field: FieldId,
        type_args: &[TypeId],
        method_args: &[TypeId],
    ) -> FieldId {
        let owner = self.field_owner(field);
        let substituted_owner = self.instantiate_signature(owner, type_args, method_args);
        if substituted_owner == owner {
            field
        } else {
            self.get_field_for_instantiated_type(self.field_definition(field), substituted_owner)
        }
    }
}
