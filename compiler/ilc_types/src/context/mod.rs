//! The type-system context: node arenas plus the uniquing tables.
//!
//! Every node is created here and nowhere else. Constructed nodes
//! (instantiations, arrays, pointers, by-refs, signature variables, members
//! of instantiated types) go through a [`UniqueMap`] keyed by structure, so
//! one node exists per structural key and handle equality is type identity.
//!
//! Nodes are stored in append-only `boxcar` arenas and never removed; a
//! `TypeId` stays valid for the lifetime of the context.

use std::sync::OnceLock;

use parking_lot::Mutex;

use ilc_hash::{
    array_hash, by_ref_hash, generic_instance_hash, method_hash, name_hash, nested_type_hash,
    pointer_hash, signature_variable_hash, ArrayRank, HashCodeBuilder,
};

use crate::intern::{DefinitionKey, FieldKey, MethodKey, TypeKey, UniqueMap};
use crate::layout::FieldLayoutPolicy;
use crate::node::{
    FieldData, FieldDefinition, FieldNode, MethodData, MethodDefinition, MethodNode, ModuleNode,
    TypeMembers, TypeNode,
};
use crate::{
    ClassLayout, DefinitionError, FieldId, GenericParameterKind, Instantiation, MethodId,
    ModuleId, TargetDetails, TypeAttributes, TypeData, TypeDefinition, TypeDefinitionBuilder,
    TypeId, TypeMembersBuilder, WellKnownType,
};

mod query;

/// Name of every module's global type.
const MODULE_TYPE_NAME: &str = "<Module>";

/// Owner of every type, method and field node.
///
/// `Send + Sync`: all queries take `&self` and may run on any thread.
pub struct TypeSystemContext {
    target: TargetDetails,
    policy: FieldLayoutPolicy,
    types: boxcar::Vec<TypeNode>,
    methods: boxcar::Vec<MethodNode>,
    fields: boxcar::Vec<FieldNode>,
    modules: boxcar::Vec<ModuleNode>,
    type_table: UniqueMap<TypeKey, TypeId>,
    method_table: UniqueMap<MethodKey, MethodId>,
    field_table: UniqueMap<FieldKey, FieldId>,
    definitions: UniqueMap<DefinitionKey, TypeId>,
    well_known: [OnceLock<TypeId>; WellKnownType::COUNT],
    /// Held while a well-known definition is registered, so that a rejected
    /// redefinition never reaches the definition table.
    well_known_registration: Mutex<()>,
    canon: TypeId,
}

impl TypeSystemContext {
    /// A context using the runtime static layout policy.
    pub fn new(target: TargetDetails) -> Self {
        Self::with_policy(target, FieldLayoutPolicy::runtime())
    }

    pub fn with_policy(target: TargetDetails, policy: FieldLayoutPolicy) -> Self {
        let types = boxcar::Vec::new();
        let canon = TypeId::from_index(
            types.push(TypeNode::new(TypeData::Canon, name_hash("System.__Canon"))),
        );
        tracing::debug!(?target, "created type system context");
        Self {
            target,
            policy,
            types,
            methods: boxcar::Vec::new(),
            fields: boxcar::Vec::new(),
            modules: boxcar::Vec::new(),
            type_table: UniqueMap::new(),
            method_table: UniqueMap::new(),
            field_table: UniqueMap::new(),
            definitions: UniqueMap::new(),
            well_known: std::array::from_fn(|_| OnceLock::new()),
            well_known_registration: Mutex::new(()),
            canon,
        }
    }

    #[inline]
    pub fn target(&self) -> &TargetDetails {
        &self.target
    }

    #[inline]
    pub fn policy(&self) -> &FieldLayoutPolicy {
        &self.policy
    }

    // ── Arena access ────────────────────────────────────────────

    pub(crate) fn type_node(&self, ty: TypeId) -> &TypeNode {
        self.types
            .get(ty.index())
            .unwrap_or_else(|| panic!("{ty:?} does not belong to this context"))
    }

    pub(crate) fn method_node(&self, method: MethodId) -> &MethodNode {
        self.methods
            .get(method.index())
            .unwrap_or_else(|| panic!("{method:?} does not belong to this context"))
    }

    pub(crate) fn field_node(&self, field: FieldId) -> &FieldNode {
        self.fields
            .get(field.index())
            .unwrap_or_else(|| panic!("{field:?} does not belong to this context"))
    }

    fn module_node(&self, module: ModuleId) -> &ModuleNode {
        self.modules
            .get(module.index())
            .unwrap_or_else(|| panic!("{module:?} does not belong to this context"))
    }

    fn push_type(&self, data: TypeData, hash: u32) -> TypeId {
        let ty = TypeId::from_index(self.types.push(TypeNode::new(data, hash)));
        tracing::trace!(?ty, name = %self.type_name(ty), "created type node");
        ty
    }

    fn push_method(&self, data: MethodData, hash: u32) -> MethodId {
        let method = MethodId::from_index(self.methods.push(MethodNode::new(data, hash)));
        tracing::trace!(?method, "created method node");
        method
    }

    fn push_field(&self, data: FieldData) -> FieldId {
        let field = FieldId::from_index(self.fields.push(FieldNode::new(data)));
        tracing::trace!(?field, "created field node");
        field
    }

    // ── Definitions ─────────────────────────────────────────────

    /// Create a module and its `<Module>` global type.
    pub fn create_module(&self, name: impl Into<String>) -> ModuleId {
        let module = ModuleId::from_index(self.modules.push(ModuleNode {
            name: name.into().into_boxed_str(),
            global_type: OnceLock::new(),
        }));

        let hash = name_hash(MODULE_TYPE_NAME);
        let definition = TypeDefinition {
            module,
            namespace: "".into(),
            name: MODULE_TYPE_NAME.into(),
            enclosing: None,
            base_type: None,
            instantiation: Instantiation::new(),
            attributes: TypeAttributes::empty(),
            class_layout: ClassLayout::default(),
            well_known: None,
            is_module_type: true,
        };
        let key = DefinitionKey {
            module,
            enclosing: None,
            namespace: "".into(),
            name: MODULE_TYPE_NAME.into(),
        };
        let global = self.definitions.get_or_insert_with(hash, key, || {
            self.push_type(TypeData::Definition(definition), hash)
        });
        // The module was created above, so its slot is still empty.
        let _ = self.module_node(module).global_type.set(global);

        tracing::debug!(?module, name = %self.module_name(module), "created module");
        module
    }

    pub fn module_name(&self, module: ModuleId) -> &str {
        &self.module_node(module).name
    }

    /// The `<Module>` type of `module`.
    pub fn module_global_type(&self, module: ModuleId) -> TypeId {
        match self.module_node(module).global_type.get() {
            Some(&global) => global,
            None => panic!("{module:?} has no global type"),
        }
    }

    /// Register a type definition.
    ///
    /// Members are supplied separately through [`Self::complete_type`] so
    /// that definitions can reference each other in any order.
    pub fn define_type(&self, builder: TypeDefinitionBuilder) -> Result<TypeId, DefinitionError> {
        let _registration = builder
            .well_known
            .map(|_| self.well_known_registration.lock());
        if let Some(well_known) = builder.well_known {
            if self.well_known[well_known.index()].get().is_some() {
                return Err(DefinitionError::WellKnownTypeRedefined { well_known });
            }
        }

        let TypeDefinitionBuilder {
            module,
            namespace,
            name,
            enclosing,
            base_type,
            generic_arity,
            attributes,
            class_layout,
            well_known,
        } = builder;

        let hash = self.definition_hash(enclosing, &namespace, &name);
        let instantiation = (0..generic_arity)
            .map(|index| self.get_signature_variable(GenericParameterKind::Type, index))
            .collect();
        let key = DefinitionKey {
            module,
            enclosing,
            namespace: namespace.as_str().into(),
            name: name.as_str().into(),
        };
        let definition = TypeDefinition {
            module,
            namespace: namespace.into_boxed_str(),
            name: name.into_boxed_str(),
            enclosing,
            base_type,
            instantiation,
            attributes,
            class_layout,
            well_known,
            is_module_type: false,
        };

        let ty = self
            .definitions
            .insert_new(hash, key, || {
                self.push_type(TypeData::Definition(definition), hash)
            })
            .map_err(|existing| DefinitionError::DuplicateType {
                type_name: self.type_name(existing),
            })?;

        if let Some(well_known) = well_known {
            if self.well_known[well_known.index()].set(ty).is_err() {
                return Err(DefinitionError::WellKnownTypeRedefined { well_known });
            }
        }
        Ok(ty)
    }

    /// Supply the members of a type definition. Allowed once per type.
    pub fn complete_type(
        &self,
        ty: TypeId,
        members: TypeMembersBuilder,
    ) -> Result<(), DefinitionError> {
        let node = self.type_node(ty);
        if !matches!(node.data, TypeData::Definition(_)) {
            return Err(DefinitionError::NotATypeDefinition {
                type_name: self.type_name(ty),
            });
        }
        if node.members.get().is_some() {
            return Err(DefinitionError::MembersAlreadyDefined {
                type_name: self.type_name(ty),
            });
        }

        let TypeMembersBuilder {
            fields,
            methods,
            interfaces,
        } = members;

        let fields = fields
            .into_iter()
            .map(|spec| {
                self.push_field(FieldData::Definition(FieldDefinition {
                    owner: ty,
                    name: spec.name.into_boxed_str(),
                    field_type: spec.field_type,
                    attributes: spec.attributes,
                    explicit_offset: spec.offset,
                }))
            })
            .collect();

        let methods = methods
            .into_iter()
            .map(|spec| {
                let hash = method_hash(node.hash, name_hash(&spec.name));
                let instantiation = (0..spec.signature.generic_parameter_count())
                    .map(|index| self.get_signature_variable(GenericParameterKind::Method, index))
                    .collect();
                self.push_method(
                    MethodData::Definition(MethodDefinition {
                        owner: ty,
                        name: spec.name.into_boxed_str(),
                        signature: spec.signature,
                        instantiation,
                        attributes: spec.attributes,
                    }),
                    hash,
                )
            })
            .collect();

        node.members
            .set(TypeMembers {
                fields,
                methods,
                interfaces,
            })
            .map_err(|_| DefinitionError::MembersAlreadyDefined {
                type_name: self.type_name(ty),
            })
    }

    /// Look up a top-level type definition by name.
    pub fn find_type(&self, module: ModuleId, namespace: &str, name: &str) -> Option<TypeId> {
        let key = DefinitionKey {
            module,
            enclosing: None,
            namespace: namespace.into(),
            name: name.into(),
        };
        self.definitions
            .get(self.definition_hash(None, namespace, name), &key)
    }

    /// Look up a type nested directly inside `enclosing`.
    pub fn find_nested_type(&self, enclosing: TypeId, name: &str) -> Option<TypeId> {
        let module = self.type_definition_data(enclosing)?.module;
        let key = DefinitionKey {
            module,
            enclosing: Some(enclosing),
            namespace: "".into(),
            name: name.into(),
        };
        self.definitions
            .get(self.definition_hash(Some(enclosing), "", name), &key)
    }

    fn definition_hash(&self, enclosing: Option<TypeId>, namespace: &str, name: &str) -> u32 {
        match enclosing {
            Some(outer) => nested_type_hash(self.type_hash(outer), name_hash(name)),
            None if namespace.is_empty() => name_hash(name),
            None => {
                let mut builder = HashCodeBuilder::new(namespace);
                builder.append(".");
                builder.append(name);
                builder.finish()
            }
        }
    }

    /// The definition registered under `well_known`, if the core library
    /// has been loaded.
    pub fn well_known_type(&self, well_known: WellKnownType) -> Option<TypeId> {
        self.well_known[well_known.index()].get().copied()
    }

    pub fn is_well_known(&self, ty: TypeId, well_known: WellKnownType) -> bool {
        self.well_known[well_known.index()].get() == Some(&ty)
    }

    // ── Uniquing constructors ───────────────────────────────────

    fn intern_type(&self, hash: u32, key: TypeKey, data: impl FnOnce() -> TypeData) -> TypeId {
        self.type_table
            .get_or_insert_with(hash, key, || self.push_type(data(), hash))
    }

    /// The unique instantiation of `definition` over `args`.
    ///
    /// A non-generic definition with no arguments is its own instantiation.
    pub fn get_instantiated_type(&self, definition: TypeId, args: &[TypeId]) -> TypeId {
        debug_assert!(
            matches!(self.type_data(definition), TypeData::Definition(_)),
            "`{}` is not a type definition",
            self.type_name(definition)
        );
        debug_assert_eq!(
            args.len(),
            self.instantiation(definition).len(),
            "wrong number of type arguments for `{}`",
            self.type_name(definition)
        );
        if args.is_empty() {
            return definition;
        }

        let hash = generic_instance_hash(
            self.type_hash(definition),
            args.iter().map(|&arg| self.type_hash(arg)),
        );
        let instantiation = Instantiation::from(args);
        self.intern_type(
            hash,
            TypeKey::Instantiated(definition, instantiation.clone()),
            || TypeData::Instantiated {
                definition,
                instantiation,
            },
        )
    }

    /// `element[]`: single-dimensional, zero-based.
    pub fn get_array_type(&self, element: TypeId) -> TypeId {
        self.array_of(element, ArrayRank::SingleDimensional)
    }

    /// Multi-dimensional array of `rank` dimensions. Rank 1 is `element[*]`,
    /// distinct from `element[]`.
    pub fn get_md_array_type(&self, element: TypeId, rank: u32) -> TypeId {
        debug_assert!(rank >= 1, "array rank must be at least 1");
        self.array_of(element, ArrayRank::MultiDimensional(rank))
    }

    pub(crate) fn array_of(&self, element: TypeId, rank: ArrayRank) -> TypeId {
        let hash = array_hash(self.type_hash(element), rank);
        self.intern_type(hash, TypeKey::Array(element, rank), || TypeData::Array {
            element,
            rank,
        })
    }

    pub fn get_pointer_type(&self, parameter: TypeId) -> TypeId {
        let hash = pointer_hash(self.type_hash(parameter));
        self.intern_type(hash, TypeKey::Pointer(parameter), || TypeData::Pointer {
            parameter,
        })
    }

    pub fn get_by_ref_type(&self, parameter: TypeId) -> TypeId {
        let hash = by_ref_hash(self.type_hash(parameter));
        self.intern_type(hash, TypeKey::ByRef(parameter), || TypeData::ByRef {
            parameter,
        })
    }

    /// The open parameter `!index` or `!!index`.
    pub fn get_signature_variable(&self, kind: GenericParameterKind, index: u32) -> TypeId {
        let hash = signature_variable_hash(index, kind == GenericParameterKind::Method);
        self.intern_type(hash, TypeKey::SignatureVariable(kind, index), || {
            TypeData::SignatureVariable { kind, index }
        })
    }

    /// The `__Canon` placeholder.
    #[inline]
    pub fn canon_type(&self) -> TypeId {
        self.canon
    }

    /// The field `definition` as a member of the instantiated type `owner`.
    pub fn get_field_for_instantiated_type(&self, definition: FieldId, owner: TypeId) -> FieldId {
        debug_assert!(
            matches!(self.field_node(definition).data, FieldData::Definition(_)),
            "{definition:?} is not a field definition"
        );
        debug_assert_eq!(
            self.type_definition(owner),
            self.field_owner(definition),
            "`{}` is not an instantiation of the field's owner",
            self.type_name(owner)
        );

        let hash = self.type_hash(owner) ^ name_hash(self.field_name(definition));
        self.field_table
            .get_or_insert_with(hash, FieldKey { definition, owner }, || {
                self.push_field(FieldData::ForInstantiatedType { definition, owner })
            })
    }

    /// The method `definition` as a member of the instantiated type `owner`.
    pub fn get_method_for_instantiated_type(
        &self,
        definition: MethodId,
        owner: TypeId,
    ) -> MethodId {
        debug_assert!(
            matches!(self.method_node(definition).data, MethodData::Definition(_)),
            "{definition:?} is not a method definition"
        );
        debug_assert_eq!(
            self.type_definition(owner),
            self.owning_type(definition),
            "`{}` is not an instantiation of the method's owner",
            self.type_name(owner)
        );

        let hash = method_hash(self.type_hash(owner), name_hash(self.method_name(definition)));
        self.method_table.get_or_insert_with(
            hash,
            MethodKey::ForInstantiatedType(definition, owner),
            || self.push_method(MethodData::ForInstantiatedType { definition, owner }, hash),
        )
    }

    /// The generic method `method` applied to method-level arguments.
    ///
    /// `method` is a definition or a method on an instantiated type, never
    /// an already instantiated method.
    pub fn get_instantiated_method(&self, method: MethodId, args: &[TypeId]) -> MethodId {
        debug_assert!(
            !matches!(self.method_node(method).data, MethodData::Instantiated { .. }),
            "{method:?} is already instantiated"
        );
        debug_assert_eq!(
            args.len(),
            self.method_instantiation(method).len(),
            "wrong number of method type arguments"
        );
        if args.is_empty() {
            return method;
        }

        let instantiated_name_hash = generic_instance_hash(
            name_hash(self.method_name(method)),
            args.iter().map(|&arg| self.type_hash(arg)),
        );
        let hash = method_hash(self.type_hash(self.owning_type(method)), instantiated_name_hash);
        let instantiation = Instantiation::from(args);
        self.method_table.get_or_insert_with(
            hash,
            MethodKey::Instantiated(method, instantiation.clone()),
            || {
                self.push_method(
                    MethodData::Instantiated {
                        method,
                        instantiation,
                    },
                    hash,
                )
            },
        )
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    reason = "tests use unwrap for concise assertions"
)]
