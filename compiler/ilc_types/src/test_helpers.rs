//! Shared test fixtures: a miniature core library.
//!
//! Mirrors the shape of a real core library closely enough for layout:
//! `Object` carries the pointer-sized type-handle field that gives every
//! object its 8-byte header on 64-bit targets, and each primitive wraps a
//! single `m_value` field of its own type. Only compiled in test builds.

use std::ops::Deref;

use crate::{
    ClassLayout, FieldAttributes, FieldId, FieldLayoutPolicy, FieldSpec, GenericParameterKind,
    MethodId, MethodSignature, MethodSpec, ModuleId, TargetArchitecture, TargetDetails, TypeAttributes,
    TypeDefinitionBuilder, TypeId, TypeMembersBuilder, TypeSystemContext, WellKnownType,
};

const PRIMITIVES: [(&str, WellKnownType); 15] = [
    ("Void", WellKnownType::Void),
    ("Boolean", WellKnownType::Boolean),
    ("Char", WellKnownType::Char),
    ("SByte", WellKnownType::SByte),
    ("Byte", WellKnownType::Byte),
    ("Int16", WellKnownType::Int16),
    ("UInt16", WellKnownType::UInt16),
    ("Int32", WellKnownType::Int32),
    ("UInt32", WellKnownType::UInt32),
    ("Int64", WellKnownType::Int64),
    ("UInt64", WellKnownType::UInt64),
    ("IntPtr", WellKnownType::IntPtr),
    ("UIntPtr", WellKnownType::UIntPtr),
    ("Single", WellKnownType::Single),
    ("Double", WellKnownType::Double),
];

/// A context preloaded with the core library, plus a `Test` module for the
/// types under test. Derefs to the context.
pub(crate) struct CoreLib {
    ctx: TypeSystemContext,
    /// Module holding the types defined by tests.
    pub(crate) module: ModuleId,
}

impl CoreLib {
    /// Core library on X64 with the runtime static layout policy.
    pub(crate) fn new() -> Self {
        Self::with_target(TargetArchitecture::X64, FieldLayoutPolicy::runtime())
    }

    pub(crate) fn with_target(architecture: TargetArchitecture, policy: FieldLayoutPolicy) -> Self {
        let ctx = TypeSystemContext::with_policy(TargetDetails::new(architecture), policy);
        let corelib = ctx.create_module("System.Private.CoreLib");
        let system = |name: &str, well_known: WellKnownType| {
            TypeDefinitionBuilder::new(corelib, "System", name).with_well_known(well_known)
        };

        let object = ctx.define_type(system("Object", WellKnownType::Object)).unwrap();
        let value_type = ctx
            .define_type(system("ValueType", WellKnownType::ValueType).with_base(object))
            .unwrap();
        ctx.define_type(system("Enum", WellKnownType::Enum).with_base(value_type))
            .unwrap();
        for (name, well_known) in PRIMITIVES {
            ctx.define_type(system(name, well_known).with_base(value_type))
                .unwrap();
        }
        let string = ctx
            .define_type(system("String", WellKnownType::String).with_base(object))
            .unwrap();
        ctx.define_type(
            system("Array", WellKnownType::Array)
                .with_base(object)
                .with_attributes(TypeAttributes::ABSTRACT),
        )
        .unwrap();
        let nullable = ctx
            .define_type(
                TypeDefinitionBuilder::new(corelib, "System", "Nullable`1")
                    .with_base(value_type)
                    .with_generic_arity(1)
                    .with_well_known(WellKnownType::Nullable),
            )
            .unwrap();

        let known = |well_known| ctx.well_known_type(well_known).unwrap();
        let int_ptr = known(WellKnownType::IntPtr);
        ctx.complete_type(
            object,
            TypeMembersBuilder::new().field(FieldSpec::new("m_pEEType", int_ptr)),
        )
        .unwrap();
        for (_, well_known) in PRIMITIVES {
            if well_known == WellKnownType::Void {
                continue;
            }
            let primitive = known(well_known);
            ctx.complete_type(
                primitive,
                TypeMembersBuilder::new().field(FieldSpec::new("m_value", primitive)),
            )
            .unwrap();
        }
        ctx.complete_type(
            string,
            TypeMembersBuilder::new()
                .field(FieldSpec::new("_stringLength", known(WellKnownType::Int32)))
                .field(FieldSpec::new("_firstChar", known(WellKnownType::Char))),
        )
        .unwrap();
        ctx.complete_type(
            nullable,
            TypeMembersBuilder::new()
                .field(FieldSpec::new("hasValue", known(WellKnownType::Boolean)))
                .field(FieldSpec::new(
                    "value",
                    ctx.get_signature_variable(GenericParameterKind::Type, 0),
                )),
        )
        .unwrap();

        let module = ctx.create_module("Test");
        Self { ctx, module }
    }

    pub(crate) fn known(&self, well_known: WellKnownType) -> TypeId {
        self.ctx.well_known_type(well_known).unwrap()
    }

    pub(crate) fn object(&self) -> TypeId {
        self.known(WellKnownType::Object)
    }

    pub(crate) fn int32(&self) -> TypeId {
        self.known(WellKnownType::Int32)
    }

    pub(crate) fn string(&self) -> TypeId {
        self.known(WellKnownType::String)
    }

    /// `!index`
    pub(crate) fn t(&self, index: u32) -> TypeId {
        self.ctx
            .get_signature_variable(GenericParameterKind::Type, index)
    }

    /// `!!index`
    pub(crate) fn m(&self, index: u32) -> TypeId {
        self.ctx
            .get_signature_variable(GenericParameterKind::Method, index)
    }

    /// Builder for a type in the `Test` namespace.
    pub(crate) fn builder(&self, name: &str) -> TypeDefinitionBuilder {
        TypeDefinitionBuilder::new(self.module, "Test", name)
    }

    /// Define a type and supply its members in one go.
    pub(crate) fn define(&self, builder: TypeDefinitionBuilder, members: TypeMembersBuilder) -> TypeId {
        let ty = self.ctx.define_type(builder).unwrap();
        self.ctx.complete_type(ty, members).unwrap();
        ty
    }

    /// Auto-layout class over `base` with the given instance fields.
    pub(crate) fn class(&self, name: &str, base: TypeId, fields: &[(&str, TypeId)]) -> TypeId {
        self.define(self.builder(name).with_base(base), instance_fields(fields))
    }

    /// Auto-layout struct with the given instance fields.
    pub(crate) fn struct_(&self, name: &str, fields: &[(&str, TypeId)]) -> TypeId {
        self.define(
            self.builder(name)
                .with_base(self.known(WellKnownType::ValueType)),
            instance_fields(fields),
        )
    }

    /// Type with the given layout and instance fields.
    pub(crate) fn laid_out(
        &self,
        name: &str,
        base: TypeId,
        layout: ClassLayout,
        fields: &[(&str, TypeId)],
    ) -> TypeId {
        self.define(
            self.builder(name).with_base(base).with_layout(layout),
            instance_fields(fields),
        )
    }

    /// Explicit-layout type; each field carries its offset.
    pub(crate) fn explicit(
        &self,
        name: &str,
        base: TypeId,
        layout: ClassLayout,
        fields: &[(&str, TypeId, u32)],
    ) -> TypeId {
        let members = fields
            .iter()
            .fold(TypeMembersBuilder::new(), |members, &(name, ty, offset)| {
                members.field(FieldSpec::new(name, ty).at_offset(offset))
            });
        self.define(self.builder(name).with_base(base).with_layout(layout), members)
    }

    /// Class over `Object` with only static fields.
    pub(crate) fn statics(&self, name: &str, fields: &[(&str, TypeId, FieldAttributes)]) -> TypeId {
        let members = fields
            .iter()
            .fold(TypeMembersBuilder::new(), |members, &(name, ty, attributes)| {
                members.field(
                    FieldSpec::new(name, ty)
                        .with_attributes(attributes | FieldAttributes::STATIC),
                )
            });
        self.define(self.builder(name).with_base(self.object()), members)
    }

    /// `Test.List`1` over `Object`: instance fields `_items: !0[]` and
    /// `_size: int`, a method `Add(!0)` and a generic method
    /// `Map<!!0>(!0) -> !!0[]`.
    pub(crate) fn define_list(&self) -> TypeId {
        let list = self
            .ctx
            .define_type(
                self.builder("List`1")
                    .with_base(self.object())
                    .with_generic_arity(1),
            )
            .unwrap();
        let void = self.known(WellKnownType::Void);
        let add = MethodSignature::new(void, &[self.t(0)]);
        let map = MethodSignature::new(self.ctx.get_array_type(self.m(0)), &[self.t(0)])
            .with_generic_parameter_count(1);
        self.ctx
            .complete_type(
                list,
                TypeMembersBuilder::new()
                    .field(FieldSpec::new("_items", self.ctx.get_array_type(self.t(0))))
                    .field(FieldSpec::new("_size", self.int32()))
                    .method(MethodSpec::new("Add", add))
                    .method(MethodSpec::new("Map", map)),
            )
            .unwrap();
        list
    }

    pub(crate) fn field(&self, ty: TypeId, name: &str) -> FieldId {
        self.ctx
            .find_field(ty, name)
            .unwrap_or_else(|| panic!("no field `{name}` on `{}`", self.ctx.type_name(ty)))
    }

    pub(crate) fn offset(&self, ty: TypeId, name: &str) -> u32 {
        self.ctx.field_offset(self.field(ty, name)).unwrap()
    }

    pub(crate) fn method(&self, ty: TypeId, name: &str) -> MethodId {
        self.ctx
            .find_method(ty, name, None)
            .unwrap_or_else(|| panic!("no method `{name}` on `{}`", self.ctx.type_name(ty)))
    }
}

fn instance_fields(fields: &[(&str, TypeId)]) -> TypeMembersBuilder {
    fields
        .iter()
        .fold(TypeMembersBuilder::new(), |members, &(name, ty)| {
            members.field(FieldSpec::new(name, ty))
        })
}

impl Deref for CoreLib {
    type Target = TypeSystemContext;

    fn deref(&self) -> &TypeSystemContext {
        &self.ctx
    }
}
