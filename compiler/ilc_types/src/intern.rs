//! Sharded uniquing table.
//!
//! Maps a structural key to the handle of its canonical node. The key's
//! structural hash (from `ilc_hash`) picks the shard; equality inside a shard
//! compares keys, which are built from handles, so a hash collision only
//! costs a comparison.
//!
//! # Thread Safety
//! One `RwLock` per shard. Lookups take the read lock; a miss retakes the
//! write lock and checks again before inserting, so at most one node is ever
//! created per key. The `create` callback runs under the write lock and must
//! not touch the same table.

use std::hash::Hash;

use ilc_hash::ArrayRank;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{FieldId, GenericParameterKind, Instantiation, MethodId, ModuleId, TypeId};

/// Number of shards per table.
const NUM_SHARDS: usize = 16;

pub(crate) struct UniqueMap<K, V> {
    shards: [RwLock<FxHashMap<K, V>>; NUM_SHARDS],
}

impl<K: Eq + Hash, V: Copy> UniqueMap<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            shards: std::array::from_fn(|_| RwLock::new(FxHashMap::default())),
        }
    }

    #[inline]
    fn shard(&self, hash: u32) -> &RwLock<FxHashMap<K, V>> {
        &self.shards[hash as usize % NUM_SHARDS]
    }

    pub(crate) fn get(&self, hash: u32, key: &K) -> Option<V> {
        self.shard(hash).read().get(key).copied()
    }

    /// The value for `key`, creating it with `create` on first use.
    pub(crate) fn get_or_insert_with(&self, hash: u32, key: K, create: impl FnOnce() -> V) -> V {
        let shard = self.shard(hash);
        if let Some(&value) = shard.read().get(&key) {
            return value;
        }

        let mut guard = shard.write();
        if let Some(&value) = guard.get(&key) {
            return value;
        }
        let value = create();
        guard.insert(key, value);
        value
    }

    /// Insert a value for a key that must not be present yet.
    ///
    /// Returns the existing value as `Err` if the key is taken.
    pub(crate) fn insert_new(
        &self,
        hash: u32,
        key: K,
        create: impl FnOnce() -> V,
    ) -> Result<V, V> {
        let mut guard = self.shard(hash).write();
        if let Some(&existing) = guard.get(&key) {
            return Err(existing);
        }
        let value = create();
        guard.insert(key, value);
        Ok(value)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }
}

/// Structural key of a constructed type.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) enum TypeKey {
    Instantiated(TypeId, Instantiation),
    Array(TypeId, ArrayRank),
    ByRef(TypeId),
    Pointer(TypeId),
    SignatureVariable(GenericParameterKind, u32),
}

/// Structural key of a constructed method.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) enum MethodKey {
    ForInstantiatedType(MethodId, TypeId),
    Instantiated(MethodId, Instantiation),
}

/// A field definition seen on an instantiated owner.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FieldKey {
    pub(crate) definition: FieldId,
    pub(crate) owner: TypeId,
}

/// Qualified name of a type definition within its module.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct DefinitionKey {
    pub(crate) module: ModuleId,
    pub(crate) enclosing: Option<TypeId>,
    pub(crate) namespace: Box<str>,
    pub(crate) name: Box<str>,
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    reason = "tests use unwrap for concise assertions"
)]
