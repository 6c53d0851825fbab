//! Type, method and field nodes, and the definition vocabulary the metadata
//! reader uses to describe them.
//!
//! Nodes are immutable apart from their set-once caches. Everything a node
//! computes lazily (flags, members of instantiated types, layouts, field
//! offsets) lives in an `OnceLock` or an [`AtomicFlags`] cell on the node.

use std::ops::Deref;
use std::sync::OnceLock;

use bitflags::bitflags;
use ilc_hash::ArrayRank;
use smallvec::SmallVec;

use crate::flags::{AtomicFlags, LayoutFlags, TypeFlags};
use crate::layout::{InstanceLayout, StaticLayout};
use crate::{FieldId, LayoutError, MethodId, ModuleId, TypeCategory, TypeId};

/// Ordered tuple of type arguments.
///
/// Empty means "not generic".
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Instantiation(SmallVec<[TypeId; 4]>);

impl Instantiation {
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    pub(crate) fn push(&mut self, ty: TypeId) {
        self.0.push(ty);
    }
}

impl Deref for Instantiation {
    type Target = [TypeId];

    #[inline]
    fn deref(&self) -> &[TypeId] {
        &self.0
    }
}

impl From<&[TypeId]> for Instantiation {
    fn from(args: &[TypeId]) -> Self {
        Self(SmallVec::from_slice(args))
    }
}

impl FromIterator<TypeId> for Instantiation {
    fn from_iter<I: IntoIterator<Item = TypeId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Which generic parameter list a signature variable indexes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum GenericParameterKind {
    /// `!n`, bound by the owning type's instantiation.
    Type,
    /// `!!n`, bound by the method's instantiation.
    Method,
}

/// Types the core library designates and the type system relies on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum WellKnownType {
    Void,
    Boolean,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    IntPtr,
    UIntPtr,
    Single,
    Double,
    Object,
    ValueType,
    Enum,
    Nullable,
    String,
    Array,
}

impl WellKnownType {
    pub(crate) const COUNT: usize = 21;

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Category of a primitive designation; `None` for the rest.
    pub const fn primitive_category(self) -> Option<TypeCategory> {
        let category = match self {
            WellKnownType::Void => TypeCategory::Void,
            WellKnownType::Boolean => TypeCategory::Boolean,
            WellKnownType::Char => TypeCategory::Char,
            WellKnownType::SByte => TypeCategory::SByte,
            WellKnownType::Byte => TypeCategory::Byte,
            WellKnownType::Int16 => TypeCategory::Int16,
            WellKnownType::UInt16 => TypeCategory::UInt16,
            WellKnownType::Int32 => TypeCategory::Int32,
            WellKnownType::UInt32 => TypeCategory::UInt32,
            WellKnownType::Int64 => TypeCategory::Int64,
            WellKnownType::UInt64 => TypeCategory::UInt64,
            WellKnownType::IntPtr => TypeCategory::IntPtr,
            WellKnownType::UIntPtr => TypeCategory::UIntPtr,
            WellKnownType::Single => TypeCategory::Single,
            WellKnownType::Double => TypeCategory::Double,
            WellKnownType::Object
            | WellKnownType::ValueType
            | WellKnownType::Enum
            | WellKnownType::Nullable
            | WellKnownType::String
            | WellKnownType::Array => return None,
        };
        Some(category)
    }
}

// ── Types ───────────────────────────────────────────────────────

/// Structural shape of a type node.
#[derive(Debug)]
pub enum TypeData {
    /// A type definition supplied by the metadata reader.
    Definition(TypeDefinition),
    /// A generic definition applied to type arguments.
    Instantiated {
        definition: TypeId,
        instantiation: Instantiation,
    },
    Array {
        element: TypeId,
        rank: ArrayRank,
    },
    ByRef {
        parameter: TypeId,
    },
    Pointer {
        parameter: TypeId,
    },
    /// Open generic parameter `!index` or `!!index`.
    SignatureVariable {
        kind: GenericParameterKind,
        index: u32,
    },
    /// The `__Canon` placeholder standing for any reference type in shared
    /// generic code.
    Canon,
}

bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct TypeAttributes: u32 {
        const INTERFACE = 1 << 0;
        const ABSTRACT = 1 << 1;
        const SEALED = 1 << 2;
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum LayoutKind {
    /// Field order is up to the compiler. Laid out in declaration order.
    #[default]
    Auto,
    Sequential,
    /// Every instance field carries its own offset.
    Explicit,
}

/// Layout metadata declared on a type definition.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ClassLayout {
    pub kind: LayoutKind,
    /// 0 means "use the target default".
    pub packing_size: u32,
    /// Declared minimum instance size of value types; 0 if none.
    pub size: u32,
}

impl ClassLayout {
    pub fn sequential() -> Self {
        Self {
            kind: LayoutKind::Sequential,
            ..Self::default()
        }
    }

    pub fn explicit() -> Self {
        Self {
            kind: LayoutKind::Explicit,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_packing(mut self, packing_size: u32) -> Self {
        self.packing_size = packing_size;
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }
}

/// Metadata of a type definition.
#[derive(Debug)]
pub struct TypeDefinition {
    pub(crate) module: ModuleId,
    pub(crate) namespace: Box<str>,
    pub(crate) name: Box<str>,
    pub(crate) enclosing: Option<TypeId>,
    pub(crate) base_type: Option<TypeId>,
    /// Formal parameters `!0..!n-1`.
    pub(crate) instantiation: Instantiation,
    pub(crate) attributes: TypeAttributes,
    pub(crate) class_layout: ClassLayout,
    pub(crate) well_known: Option<WellKnownType>,
    pub(crate) is_module_type: bool,
}

impl TypeDefinition {
    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enclosing_type(&self) -> Option<TypeId> {
        self.enclosing
    }

    /// Declared base type, unsubstituted.
    pub fn base_type(&self) -> Option<TypeId> {
        self.base_type
    }

    pub fn generic_arity(&self) -> usize {
        self.instantiation.len()
    }

    pub fn attributes(&self) -> TypeAttributes {
        self.attributes
    }

    pub fn class_layout(&self) -> ClassLayout {
        self.class_layout
    }

    pub fn well_known(&self) -> Option<WellKnownType> {
        self.well_known
    }

    /// Whether this is a module's `<Module>` global type.
    pub fn is_module_type(&self) -> bool {
        self.is_module_type
    }
}

/// Description of a type definition, handed to
/// [`TypeSystemContext::define_type`](crate::TypeSystemContext::define_type).
#[derive(Clone, Debug)]
pub struct TypeDefinitionBuilder {
    pub(crate) module: ModuleId,
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) enclosing: Option<TypeId>,
    pub(crate) base_type: Option<TypeId>,
    pub(crate) generic_arity: u32,
    pub(crate) attributes: TypeAttributes,
    pub(crate) class_layout: ClassLayout,
    pub(crate) well_known: Option<WellKnownType>,
}

impl TypeDefinitionBuilder {
    pub fn new(module: ModuleId, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module,
            namespace: namespace.into(),
            name: name.into(),
            enclosing: None,
            base_type: None,
            generic_arity: 0,
            attributes: TypeAttributes::empty(),
            class_layout: ClassLayout::default(),
            well_known: None,
        }
    }

    /// Nest the type inside `enclosing`. Nested types have no namespace of
    /// their own.
    #[must_use]
    pub fn nested_in(mut self, enclosing: TypeId) -> Self {
        self.enclosing = Some(enclosing);
        self.namespace.clear();
        self
    }

    #[must_use]
    pub fn with_base(mut self, base_type: TypeId) -> Self {
        self.base_type = Some(base_type);
        self
    }

    #[must_use]
    pub fn with_generic_arity(mut self, arity: u32) -> Self {
        self.generic_arity = arity;
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: TypeAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn with_layout(mut self, class_layout: ClassLayout) -> Self {
        self.class_layout = class_layout;
        self
    }

    #[must_use]
    pub fn with_well_known(mut self, well_known: WellKnownType) -> Self {
        self.well_known = Some(well_known);
        self
    }
}

/// Members of a type. Empty for types that have none (arrays, pointers...).
#[derive(Debug)]
pub(crate) struct TypeMembers {
    pub(crate) fields: Vec<FieldId>,
    pub(crate) methods: Vec<MethodId>,
    pub(crate) interfaces: Vec<TypeId>,
}

/// Members of every type without any.
pub(crate) static NO_MEMBERS: TypeMembers = TypeMembers {
    fields: Vec::new(),
    methods: Vec::new(),
    interfaces: Vec::new(),
};

/// Description of a type's members, handed to
/// [`TypeSystemContext::complete_type`](crate::TypeSystemContext::complete_type).
#[derive(Clone, Debug, Default)]
pub struct TypeMembersBuilder {
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) methods: Vec<MethodSpec>,
    pub(crate) interfaces: Vec<TypeId>,
}

impl TypeMembersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn interface(mut self, interface: TypeId) -> Self {
        self.interfaces.push(interface);
        self
    }
}

pub(crate) struct TypeNode {
    pub(crate) data: TypeData,
    pub(crate) hash: u32,
    pub(crate) flags: AtomicFlags<TypeFlags>,
    pub(crate) layout_flags: AtomicFlags<LayoutFlags>,
    pub(crate) members: OnceLock<TypeMembers>,
    /// Substituted base type of instantiated types.
    pub(crate) base_type: OnceLock<Option<TypeId>>,
    pub(crate) instance_layout: OnceLock<Result<InstanceLayout, LayoutError>>,
    pub(crate) static_layout: OnceLock<Result<StaticLayout, LayoutError>>,
}

impl TypeNode {
    pub(crate) fn new(data: TypeData, hash: u32) -> Self {
        Self {
            data,
            hash,
            flags: AtomicFlags::new(),
            layout_flags: AtomicFlags::new(),
            members: OnceLock::new(),
            base_type: OnceLock::new(),
            instance_layout: OnceLock::new(),
            static_layout: OnceLock::new(),
        }
    }
}

// ── Fields ──────────────────────────────────────────────────────

bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct FieldAttributes: u32 {
        const STATIC = 1 << 0;
        /// Static with one copy per thread. Implies `STATIC`.
        const THREAD_STATIC = 1 << 1;
        /// Compile-time constant; occupies no storage.
        const LITERAL = 1 << 2;
        /// Static data mapped from the image; occupies no static block.
        const HAS_RVA = 1 << 3;
    }
}

/// Description of one field in a [`TypeMembersBuilder`].
#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub(crate) name: String,
    pub(crate) field_type: TypeId,
    pub(crate) attributes: FieldAttributes,
    pub(crate) offset: Option<u32>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: TypeId) -> Self {
        Self {
            name: name.into(),
            field_type,
            attributes: FieldAttributes::empty(),
            offset: None,
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: FieldAttributes) -> Self {
        self.attributes = attributes;
        if attributes.contains(FieldAttributes::THREAD_STATIC) {
            self.attributes |= FieldAttributes::STATIC;
        }
        self
    }

    /// Declared offset for explicit layout.
    #[must_use]
    pub fn at_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Debug)]
pub(crate) struct FieldDefinition {
    pub(crate) owner: TypeId,
    pub(crate) name: Box<str>,
    pub(crate) field_type: TypeId,
    pub(crate) attributes: FieldAttributes,
    pub(crate) explicit_offset: Option<u32>,
}

#[derive(Debug)]
pub(crate) enum FieldData {
    Definition(FieldDefinition),
    /// The field `definition` as seen on the instantiated type `owner`.
    ForInstantiatedType { definition: FieldId, owner: TypeId },
}

pub(crate) struct FieldNode {
    pub(crate) data: FieldData,
    /// Substituted type of fields on instantiated types.
    pub(crate) field_type: OnceLock<TypeId>,
    pub(crate) offset: OnceLock<u32>,
}

impl FieldNode {
    pub(crate) fn new(data: FieldData) -> Self {
        Self {
            data,
            field_type: OnceLock::new(),
            offset: OnceLock::new(),
        }
    }
}

// ── Methods ─────────────────────────────────────────────────────

bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct MethodAttributes: u32 {
        const STATIC = 1 << 0;
        const VIRTUAL = 1 << 1;
        const ABSTRACT = 1 << 2;
    }
}

/// A method signature. Equality is component-wise over type handles.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodSignature {
    is_static: bool,
    generic_parameter_count: u32,
    return_type: TypeId,
    parameters: SmallVec<[TypeId; 4]>,
}

impl MethodSignature {
    pub fn new(return_type: TypeId, parameters: &[TypeId]) -> Self {
        Self {
            is_static: false,
            generic_parameter_count: 0,
            return_type,
            parameters: SmallVec::from_slice(parameters),
        }
    }

    #[must_use]
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn with_generic_parameter_count(mut self, count: u32) -> Self {
        self.generic_parameter_count = count;
        self
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn generic_parameter_count(&self) -> u32 {
        self.generic_parameter_count
    }

    pub fn return_type(&self) -> TypeId {
        self.return_type
    }

    pub fn parameters(&self) -> &[TypeId] {
        &self.parameters
    }

    /// Same shape with every type replaced through `map`.
    pub(crate) fn map_types(&self, mut map: impl FnMut(TypeId) -> TypeId) -> Self {
        Self {
            is_static: self.is_static,
            generic_parameter_count: self.generic_parameter_count,
            return_type: map(self.return_type),
            parameters: self.parameters.iter().map(|&p| map(p)).collect(),
        }
    }
}

/// Description of one method in a [`TypeMembersBuilder`].
#[derive(Clone, Debug)]
pub struct MethodSpec {
    pub(crate) name: String,
    pub(crate) signature: MethodSignature,
    pub(crate) attributes: MethodAttributes,
}

impl MethodSpec {
    /// The method's generic arity is the signature's generic parameter count.
    pub fn new(name: impl Into<String>, signature: MethodSignature) -> Self {
        Self {
            name: name.into(),
            signature,
            attributes: MethodAttributes::empty(),
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: MethodAttributes) -> Self {
        self.attributes = attributes;
        self
    }
}

#[derive(Debug)]
pub(crate) struct MethodDefinition {
    pub(crate) owner: TypeId,
    pub(crate) name: Box<str>,
    pub(crate) signature: MethodSignature,
    /// Formal parameters `!!0..!!n-1`.
    pub(crate) instantiation: Instantiation,
    pub(crate) attributes: MethodAttributes,
}

#[derive(Debug)]
pub(crate) enum MethodData {
    Definition(MethodDefinition),
    /// The method `definition` as seen on the instantiated type `owner`.
    ForInstantiatedType { definition: MethodId, owner: TypeId },
    /// A generic method (definition or for-instantiated-type) applied to
    /// method-level type arguments.
    Instantiated {
        method: MethodId,
        instantiation: Instantiation,
    },
}

pub(crate) struct MethodNode {
    pub(crate) data: MethodData,
    pub(crate) hash: u32,
    /// Substituted signature of non-definition methods.
    pub(crate) signature: OnceLock<MethodSignature>,
}

impl MethodNode {
    pub(crate) fn new(data: MethodData, hash: u32) -> Self {
        Self {
            data,
            hash,
            signature: OnceLock::new(),
        }
    }
}

// ── Modules ─────────────────────────────────────────────────────

pub(crate) struct ModuleNode {
    pub(crate) name: Box<str>,
    pub(crate) global_type: OnceLock<TypeId>,
}
