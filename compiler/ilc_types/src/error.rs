//! Error types.
//!
//! Layout failures are deterministic for a given type, so they are cached on
//! the type node alongside successful layouts and cloned out on every query.

use thiserror::Error;

use crate::WellKnownType;

/// Failure to compute a layout.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The type's metadata is invalid; the type can never be loaded.
    #[error("failed to load type `{type_name}`: {reason}")]
    TypeLoad {
        type_name: String,
        reason: TypeLoadReason,
    },
    /// The request is meaningless for this type, e.g. the instance layout of
    /// an open signature variable.
    #[error("cannot lay out `{type_name}`: {what}")]
    Unsupported { type_name: String, what: String },
}

impl LayoutError {
    /// Name of the type the error was raised for.
    pub fn type_name(&self) -> &str {
        match self {
            LayoutError::TypeLoad { type_name, .. } | LayoutError::Unsupported { type_name, .. } => {
                type_name
            }
        }
    }

    pub fn reason(&self) -> Option<&TypeLoadReason> {
        match self {
            LayoutError::TypeLoad { reason, .. } => Some(reason),
            LayoutError::Unsupported { .. } => None,
        }
    }
}

/// Why a type failed to load.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TypeLoadReason {
    #[error("generic types cannot have explicit layout")]
    ExplicitLayoutOnGenericType,
    #[error("the global module type cannot declare instance field `{field}`")]
    InstanceFieldOnGlobalType { field: String },
    #[error("layout kind differs from that of base type `{base}`")]
    LayoutKindMismatch { base: String },
    #[error("enums must have exactly one instance field, found {found}")]
    EnumFieldCount { found: usize },
    #[error("primitive types may have at most one instance field, found {found}")]
    PrimitiveFieldCount { found: usize },
    #[error("enums cannot declare sequential or explicit layout")]
    LayoutOnEnum,
    #[error("invalid packing size {packing}: must be 0 or a power of two no larger than 128")]
    InvalidPackingSize { packing: u32 },
    #[error("instance field `{field}` has a by-ref type")]
    ByRefInstanceField { field: String },
    #[error("static field `{field}` has a by-ref type")]
    ByRefStaticField { field: String },
    #[error("field `{field}` has no explicit offset")]
    MissingExplicitOffset { field: String },
    #[error(
        "explicit layout offset {offset} not pointer-aligned for field `{field}` \
         (pointer size {pointer_size})"
    )]
    MisalignedReferenceField {
        field: String,
        offset: u32,
        pointer_size: u32,
    },
    #[error("instance size overflows")]
    LayoutOverflow,
}

/// Misuse of the definition API by the metadata reader.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("`{type_name}` is not a type definition")]
    NotATypeDefinition { type_name: String },
    #[error("members of `{type_name}` are already defined")]
    MembersAlreadyDefined { type_name: String },
    #[error("type `{type_name}` is already defined in this module")]
    DuplicateType { type_name: String },
    #[error("well-known type {well_known:?} is already registered")]
    WellKnownTypeRedefined { well_known: WellKnownType },
}
