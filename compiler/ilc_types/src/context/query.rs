//! Read-side queries over nodes: classification, members, signatures.
//!
//! Category and generic-variable presence are cached in the node's
//! [`TypeFlags`] cell. Members, base types, field types and signatures of
//! nodes on instantiated types are substituted on first use and stored in
//! the node's set-once slots.

use crate::flags::TypeFlags;
use crate::node::{FieldData, FieldDefinition, MethodData, MethodDefinition, TypeMembers, NO_MEMBERS};
use crate::{
    FieldAttributes, FieldId, GenericParameterKind, MethodAttributes, MethodId, MethodSignature,
    TypeAttributes, TypeCategory, TypeData, TypeDefinition, TypeId, TypeSystemContext,
    WellKnownType,
};
use ilc_hash::ArrayRank;

impl TypeSystemContext {
    // ── Type shape ──────────────────────────────────────────────

    #[inline]
    pub fn type_data(&self, ty: TypeId) -> &TypeData {
        &self.type_node(ty).data
    }

    /// Structural hash, stable across runs.
    #[inline]
    pub fn type_hash(&self, ty: TypeId) -> u32 {
        self.type_node(ty).hash
    }

    /// Definition metadata of a definition or of an instantiated type's
    /// definition.
    pub fn type_definition_data(&self, ty: TypeId) -> Option<&TypeDefinition> {
        match self.type_data(ty) {
            TypeData::Definition(definition) => Some(definition),
            TypeData::Instantiated { definition, .. } => self.type_definition_data(*definition),
            _ => None,
        }
    }

    /// The generic definition of an instantiated type; any other type is its
    /// own definition.
    pub fn type_definition(&self, ty: TypeId) -> TypeId {
        match self.type_data(ty) {
            TypeData::Instantiated { definition, .. } => *definition,
            _ => ty,
        }
    }

    pub fn has_same_type_definition(&self, a: TypeId, b: TypeId) -> bool {
        self.type_definition(a) == self.type_definition(b)
    }

    /// Type arguments of an instantiated type, or the formal parameters of
    /// a generic definition. Empty for everything else.
    pub fn instantiation(&self, ty: TypeId) -> &[TypeId] {
        match self.type_data(ty) {
            TypeData::Definition(definition) => &definition.instantiation,
            TypeData::Instantiated { instantiation, .. } => instantiation,
            _ => &[],
        }
    }

    #[inline]
    pub fn has_instantiation(&self, ty: TypeId) -> bool {
        !self.instantiation(ty).is_empty()
    }

    /// Whether `ty` is a definition with formal generic parameters.
    pub fn is_generic_definition(&self, ty: TypeId) -> bool {
        matches!(self.type_data(ty), TypeData::Definition(definition) if !definition.instantiation.is_empty())
    }

    /// Parameter of a pointer or by-ref, element of an array.
    pub fn parameter_type(&self, ty: TypeId) -> Option<TypeId> {
        match self.type_data(ty) {
            TypeData::Array { element, .. } => Some(*element),
            TypeData::ByRef { parameter } | TypeData::Pointer { parameter } => Some(*parameter),
            _ => None,
        }
    }

    pub fn element_type(&self, ty: TypeId) -> Option<TypeId> {
        match self.type_data(ty) {
            TypeData::Array { element, .. } => Some(*element),
            _ => None,
        }
    }

    /// Number of dimensions of an array type.
    pub fn rank(&self, ty: TypeId) -> Option<u32> {
        match self.type_data(ty) {
            TypeData::Array { rank, .. } => Some(rank.rank()),
            _ => None,
        }
    }

    // ── Cached flags ────────────────────────────────────────────

    pub fn category(&self, ty: TypeId) -> TypeCategory {
        let flags = self
            .type_node(ty)
            .flags
            .get_or_compute(TypeFlags::CATEGORY_MASK, |mask| self.compute_type_flags(ty, mask));
        flags
            .category()
            .unwrap_or_else(|| self.compute_category(ty))
    }

    /// Whether some reachable generic parameter is unbound.
    pub fn contains_generic_variables(&self, ty: TypeId) -> bool {
        let mask = TypeFlags::CONTAINS_GENERIC_VARIABLES
            | TypeFlags::CONTAINS_GENERIC_VARIABLES_COMPUTED;
        self.type_node(ty)
            .flags
            .get_or_compute(mask, |mask| self.compute_type_flags(ty, mask))
            .contains(TypeFlags::CONTAINS_GENERIC_VARIABLES)
    }

    fn compute_type_flags(&self, ty: TypeId, mask: TypeFlags) -> TypeFlags {
        let mut flags = TypeFlags::empty();
        if mask.intersects(TypeFlags::CATEGORY_MASK) {
            flags |= TypeFlags::from_category(self.compute_category(ty));
        }
        if mask.contains(TypeFlags::CONTAINS_GENERIC_VARIABLES_COMPUTED) {
            flags |= TypeFlags::CONTAINS_GENERIC_VARIABLES_COMPUTED;
            if self.compute_contains_generic_variables(ty) {
                flags |= TypeFlags::CONTAINS_GENERIC_VARIABLES;
            }
        }
        flags
    }

    fn compute_category(&self, ty: TypeId) -> TypeCategory {
        match self.type_data(ty) {
            TypeData::Definition(definition) => self.definition_category(definition),
            TypeData::Instantiated { definition, .. } => self.category(*definition),
            TypeData::Array {
                rank: ArrayRank::SingleDimensional,
                ..
            } => TypeCategory::SzArray,
            TypeData::Array { .. } => TypeCategory::Array,
            TypeData::ByRef { .. } => TypeCategory::ByRef,
            TypeData::Pointer { .. } => TypeCategory::Pointer,
            TypeData::SignatureVariable {
                kind: GenericParameterKind::Type,
                ..
            } => TypeCategory::SignatureTypeVariable,
            TypeData::SignatureVariable {
                kind: GenericParameterKind::Method,
                ..
            } => TypeCategory::SignatureMethodVariable,
            TypeData::Canon => TypeCategory::Class,
        }
    }

    fn definition_category(&self, definition: &TypeDefinition) -> TypeCategory {
        match definition.well_known {
            Some(WellKnownType::Nullable) => return TypeCategory::Nullable,
            // The roots of the hierarchy are classes even though `Enum`
            // derives from `ValueType`.
            Some(
                WellKnownType::Object
                | WellKnownType::ValueType
                | WellKnownType::Enum
                | WellKnownType::String
                | WellKnownType::Array,
            ) => return TypeCategory::Class,
            Some(well_known) => {
                if let Some(category) = well_known.primitive_category() {
                    return category;
                }
            }
            None => {}
        }

        if definition.attributes.contains(TypeAttributes::INTERFACE) {
            return TypeCategory::Interface;
        }
        match definition.base_type {
            Some(base) if self.is_well_known(base, WellKnownType::ValueType) => {
                TypeCategory::ValueType
            }
            Some(base) if self.is_well_known(base, WellKnownType::Enum) => TypeCategory::Enum,
            _ => TypeCategory::Class,
        }
    }

    fn compute_contains_generic_variables(&self, ty: TypeId) -> bool {
        match self.type_data(ty) {
            TypeData::Definition(definition) => !definition.instantiation.is_empty(),
            TypeData::Instantiated { instantiation, .. } => instantiation
                .iter()
                .any(|&arg| self.contains_generic_variables(arg)),
            TypeData::Array { element: inner, .. }
            | TypeData::ByRef { parameter: inner }
            | TypeData::Pointer { parameter: inner } => self.contains_generic_variables(*inner),
            TypeData::SignatureVariable { .. } => true,
            TypeData::Canon => false,
        }
    }

    // ── Classification ──────────────────────────────────────────

    #[inline]
    pub fn is_value_type(&self, ty: TypeId) -> bool {
        self.category(ty).is_value_type()
    }

    #[inline]
    pub fn is_primitive(&self, ty: TypeId) -> bool {
        self.category(ty).is_primitive()
    }

    pub fn is_enum(&self, ty: TypeId) -> bool {
        self.category(ty) == TypeCategory::Enum
    }

    pub fn is_nullable(&self, ty: TypeId) -> bool {
        self.category(ty) == TypeCategory::Nullable
    }

    pub fn is_interface(&self, ty: TypeId) -> bool {
        self.category(ty) == TypeCategory::Interface
    }

    /// Single- or multi-dimensional array.
    pub fn is_array(&self, ty: TypeId) -> bool {
        matches!(self.category(ty), TypeCategory::Array | TypeCategory::SzArray)
    }

    pub fn is_sz_array(&self, ty: TypeId) -> bool {
        self.category(ty) == TypeCategory::SzArray
    }

    pub fn is_by_ref(&self, ty: TypeId) -> bool {
        self.category(ty) == TypeCategory::ByRef
    }

    pub fn is_pointer(&self, ty: TypeId) -> bool {
        self.category(ty) == TypeCategory::Pointer
    }

    /// Whether values of `ty` are GC-tracked object references.
    #[inline]
    pub fn is_gc_pointer(&self, ty: TypeId) -> bool {
        self.category(ty).is_gc_pointer()
    }

    pub fn is_signature_variable(&self, ty: TypeId) -> bool {
        self.category(ty).is_signature_variable()
    }

    pub fn is_object(&self, ty: TypeId) -> bool {
        self.is_well_known(ty, WellKnownType::Object)
    }

    pub fn is_string(&self, ty: TypeId) -> bool {
        self.is_well_known(ty, WellKnownType::String)
    }

    pub fn is_module_type(&self, ty: TypeId) -> bool {
        self.type_definition_data(ty)
            .is_some_and(TypeDefinition::is_module_type)
    }

    // ── Hierarchy and members ───────────────────────────────────

    /// Base type, substituted for instantiated types. Arrays derive from
    /// `System.Array`.
    pub fn base_type(&self, ty: TypeId) -> Option<TypeId> {
        let node = self.type_node(ty);
        match &node.data {
            TypeData::Definition(definition) => definition.base_type,
            TypeData::Instantiated {
                definition,
                instantiation,
            } => *node.base_type.get_or_init(|| {
                let base = self.type_definition_data(*definition)?.base_type?;
                Some(self.instantiate_signature(base, instantiation, &[]))
            }),
            TypeData::Array { .. } => self.well_known_type(WellKnownType::Array),
            TypeData::Canon => self.well_known_type(WellKnownType::Object),
            TypeData::ByRef { .. }
            | TypeData::Pointer { .. }
            | TypeData::SignatureVariable { .. } => None,
        }
    }

    /// Whether `ty` is an instantiated type whose definition has not been
    /// completed yet. Nothing derived from its members may be cached.
    pub(crate) fn members_pending(&self, ty: TypeId) -> bool {
        match self.type_data(ty) {
            TypeData::Instantiated { definition, .. } => {
                self.type_node(*definition).members.get().is_none()
            }
            _ => false,
        }
    }

    /// Members of a definition, or of an instantiated type with the
    /// definition's members mapped onto it.
    ///
    /// An instantiated type whose definition has not been completed yet
    /// reports no members and caches nothing.
    fn members(&self, ty: TypeId) -> &TypeMembers {
        let node = self.type_node(ty);
        if let Some(members) = node.members.get() {
            return members;
        }
        let TypeData::Instantiated {
            definition,
            instantiation,
        } = &node.data
        else {
            return &NO_MEMBERS;
        };
        let Some(typical) = self.type_node(*definition).members.get() else {
            return &NO_MEMBERS;
        };

        node.members.get_or_init(|| TypeMembers {
            fields: typical
                .fields
                .iter()
                .map(|&field| self.get_field_for_instantiated_type(field, ty))
                .collect(),
            methods: typical
                .methods
                .iter()
                .map(|&method| self.get_method_for_instantiated_type(method, ty))
                .collect(),
            interfaces: typical
                .interfaces
                .iter()
                .map(|&interface| self.instantiate_signature(interface, instantiation, &[]))
                .collect(),
        })
    }

    /// Fields in declaration order, static and instance.
    pub fn fields(&self, ty: TypeId) -> &[FieldId] {
        &self.members(ty).fields
    }

    /// Instance fields in declaration order.
    pub fn instance_fields(&self, ty: TypeId) -> impl Iterator<Item = FieldId> + '_ {
        self.fields(ty)
            .iter()
            .copied()
            .filter(|&field| !self.is_static(field))
    }

    pub fn methods(&self, ty: TypeId) -> &[MethodId] {
        &self.members(ty).methods
    }

    /// Directly implemented interfaces, substituted for instantiated types.
    pub fn implemented_interfaces(&self, ty: TypeId) -> &[TypeId] {
        &self.members(ty).interfaces
    }

    pub fn find_field(&self, ty: TypeId, name: &str) -> Option<FieldId> {
        self.fields(ty)
            .iter()
            .copied()
            .find(|&field| self.field_name(field) == name)
    }

    /// First method named `name`, optionally also matching `signature`.
    pub fn find_method(
        &self,
        ty: TypeId,
        name: &str,
        signature: Option<&MethodSignature>,
    ) -> Option<MethodId> {
        self.methods(ty).iter().copied().find(|&method| {
            self.method_name(method) == name
                && signature.map_or(true, |signature| self.signature(method) == signature)
        })
    }

    /// Storage type of an enum; any other type is its own underlying type.
    pub fn underlying_type(&self, ty: TypeId) -> TypeId {
        if !self.is_enum(ty) {
            return ty;
        }
        self.instance_fields(ty)
            .next()
            .map_or(ty, |field| self.field_type(field))
    }

    // ── Fields ──────────────────────────────────────────────────

    fn field_definition_data(&self, field: FieldId) -> &FieldDefinition {
        match &self.field_node(field).data {
            FieldData::Definition(definition) => definition,
            FieldData::ForInstantiatedType { definition, .. } => {
                self.field_definition_data(*definition)
            }
        }
    }

    /// The type the field is a member of.
    pub fn field_owner(&self, field: FieldId) -> TypeId {
        match &self.field_node(field).data {
            FieldData::Definition(definition) => definition.owner,
            FieldData::ForInstantiatedType { owner, .. } => *owner,
        }
    }

    /// The field definition behind a field on an instantiated type.
    pub fn field_definition(&self, field: FieldId) -> FieldId {
        match &self.field_node(field).data {
            FieldData::Definition(_) => field,
            FieldData::ForInstantiatedType { definition, .. } => *definition,
        }
    }

    pub fn field_name(&self, field: FieldId) -> &str {
        &self.field_definition_data(field).name
    }

    /// Declared type, substituted for fields on instantiated types.
    pub fn field_type(&self, field: FieldId) -> TypeId {
        let node = self.field_node(field);
        match &node.data {
            FieldData::Definition(definition) => definition.field_type,
            FieldData::ForInstantiatedType { definition, owner } => {
                *node.field_type.get_or_init(|| {
                    self.instantiate_signature(
                        self.field_type(*definition),
                        self.instantiation(*owner),
                        &[],
                    )
                })
            }
        }
    }

    pub fn field_attributes(&self, field: FieldId) -> FieldAttributes {
        self.field_definition_data(field).attributes
    }

    pub fn is_static(&self, field: FieldId) -> bool {
        self.field_attributes(field).contains(FieldAttributes::STATIC)
    }

    pub fn is_thread_static(&self, field: FieldId) -> bool {
        self.field_attributes(field)
            .contains(FieldAttributes::THREAD_STATIC)
    }

    pub fn is_literal(&self, field: FieldId) -> bool {
        self.field_attributes(field).contains(FieldAttributes::LITERAL)
    }

    pub fn has_rva(&self, field: FieldId) -> bool {
        self.field_attributes(field).contains(FieldAttributes::HAS_RVA)
    }

    /// Offset declared for explicit layout.
    pub fn explicit_offset(&self, field: FieldId) -> Option<u32> {
        self.field_definition_data(field).explicit_offset
    }

    /// Whether a static field lives in the GC statics region: references
    /// and value types holding references do.
    pub fn has_gc_static_base(&self, field: FieldId) -> bool {
        debug_assert!(self.is_static(field), "{field:?} is not static");
        let field_type = self.field_type(field);
        if self.is_value_type(field_type) {
            self.contains_gc_pointers(field_type)
        } else {
            self.is_gc_pointer(field_type)
        }
    }

    // ── Methods ─────────────────────────────────────────────────

    fn method_definition_data(&self, method: MethodId) -> &MethodDefinition {
        match &self.method_node(method).data {
            MethodData::Definition(definition) => definition,
            MethodData::ForInstantiatedType { definition, .. } => {
                self.method_definition_data(*definition)
            }
            MethodData::Instantiated { method, .. } => self.method_definition_data(*method),
        }
    }

    pub fn owning_type(&self, method: MethodId) -> TypeId {
        match &self.method_node(method).data {
            MethodData::Definition(definition) => definition.owner,
            MethodData::ForInstantiatedType { owner, .. } => *owner,
            MethodData::Instantiated { method, .. } => self.owning_type(*method),
        }
    }

    pub fn method_name(&self, method: MethodId) -> &str {
        &self.method_definition_data(method).name
    }

    pub fn method_attributes(&self, method: MethodId) -> MethodAttributes {
        self.method_definition_data(method).attributes
    }

    /// Structural hash, stable across runs.
    #[inline]
    pub fn method_hash(&self, method: MethodId) -> u32 {
        self.method_node(method).hash
    }

    /// Method-level type arguments, or the formal parameters `!!0..` of an
    /// uninstantiated generic method.
    pub fn method_instantiation(&self, method: MethodId) -> &[TypeId] {
        match &self.method_node(method).data {
            MethodData::Definition(definition) => &definition.instantiation,
            MethodData::ForInstantiatedType { definition, .. } => {
                self.method_instantiation(*definition)
            }
            MethodData::Instantiated { instantiation, .. } => instantiation,
        }
    }

    /// Strip the method-level instantiation, keeping the owning type.
    pub fn method_definition(&self, method: MethodId) -> MethodId {
        match &self.method_node(method).data {
            MethodData::Instantiated { method, .. } => *method,
            _ => method,
        }
    }

    /// The method definition on the generic type definition.
    pub fn typical_method_definition(&self, method: MethodId) -> MethodId {
        match &self.method_node(method).data {
            MethodData::Definition(_) => method,
            MethodData::ForInstantiatedType { definition, .. } => *definition,
            MethodData::Instantiated { method, .. } => self.typical_method_definition(*method),
        }
    }

    /// Signature with both the owner's and the method's arguments
    /// substituted.
    pub fn signature(&self, method: MethodId) -> &MethodSignature {
        let node = self.method_node(method);
        match &node.data {
            MethodData::Definition(definition) => &definition.signature,
            MethodData::ForInstantiatedType { definition, owner } => {
                node.signature.get_or_init(|| {
                    self.instantiate_method_signature(
                        self.signature(*definition),
                        self.instantiation(*owner),
                        &[],
                    )
                })
            }
            MethodData::Instantiated {
                method,
                instantiation,
            } => node.signature.get_or_init(|| {
                self.instantiate_method_signature(self.signature(*method), &[], instantiation)
            }),
        }
    }
}
