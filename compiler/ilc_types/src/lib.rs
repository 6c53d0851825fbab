//! Type-system core of the ilc ahead-of-time compiler.
//!
//! Models the types, methods and fields of a managed program, instantiates
//! generic definitions, assigns deterministic memory layouts, and hashes
//! every node structurally.
//!
//! # Node identity
//!
//! All nodes live in a [`TypeSystemContext`] and are addressed by 32-bit
//! handles ([`TypeId`], [`MethodId`], [`FieldId`]). Constructed nodes are
//! uniqued, so two handles are equal iff they name the same entity:
//!
//! ```text
//! get_instantiated_type(List`1, [int]) == get_instantiated_type(List`1, [int])
//! ```
//!
//! # Laziness
//!
//! Nothing is computed when a node is created. Categories, generic-variable
//! presence, members of instantiated types, layouts and field offsets are
//! computed on first query and cached on the node. Every cache is
//! write-once or merge-only, so concurrent queries from many threads agree.
//!
//! # Building the type graph
//!
//! The metadata reader registers definitions with
//! [`TypeSystemContext::define_type`] and supplies their members with
//! [`TypeSystemContext::complete_type`]. The two steps are separate so that
//! definitions can refer to one another in any order.

mod canon;
mod context;
mod error;
mod flags;
mod format;
mod id;
mod intern;
mod layout;
mod node;
mod subst;
mod target;

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    reason = "tests use unwrap for concise assertions"
)]
mod test_helpers;

use std::sync::Once;

pub use context::TypeSystemContext;
pub use error::{DefinitionError, LayoutError, TypeLoadReason};
pub use flags::{AtomicFlags, LayoutFlags, TypeCategory, TypeFlags};
pub use id::{FieldId, MethodId, ModuleId, TypeId};
pub use ilc_hash::ArrayRank;
pub use layout::{
    default_static_block, ComputedInstanceFieldLayout, ComputedStaticFieldLayout, FieldAndOffset,
    FieldLayoutPolicy, InstanceLayout, StaticBlockKind, StaticFieldOffset, StaticLayout,
    StaticsBlock, StaticsHeader,
};
pub use node::{
    ClassLayout, FieldAttributes, FieldSpec, GenericParameterKind, Instantiation, LayoutKind,
    MethodAttributes, MethodSignature, MethodSpec, TypeAttributes, TypeData, TypeDefinition,
    TypeDefinitionBuilder, TypeMembersBuilder, WellKnownType,
};
pub use target::{align_up, TargetArchitecture, TargetDetails};

// Handles are passed by value everywhere; keep them one word.
const _: () = assert!(std::mem::size_of::<TypeId>() == 4);
const _: () = assert!(std::mem::size_of::<Option<TypeId>>() == 8);

/// Guard for one-time tracing initialization.
static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing unless `RUST_LOG` is set. Safe to call more than once;
/// only the first call has an effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
