//! Structural hash codes for type-system nodes.
//!
//! Every function here is a pure function of its semantic inputs: no
//! allocation order, addresses or process state leak into the result. The
//! uniquing context uses these values as a first-pass bucket key and falls
//! back to handle comparison for equality, so collisions are permitted.
//!
//! # Combinators
//!
//! All combinators share one mixing step, `(h + rotl(h, n)) ^ value`, with a
//! different rotation per node kind:
//!
//! | node                 | rotation | finalizer        |
//! |----------------------|----------|------------------|
//! | name characters      | 5        | `h += rotl(h, 8)` |
//! | pointer              | 5        | n/a              |
//! | by-ref               | 7        | n/a              |
//! | nested type          | 11       | n/a              |
//! | generic instance     | 13       | `h += rotl(h, 15)` |
//!
//! Arrays hash exactly like a one-argument generic instantiation of a
//! synthetic definition (``System.Array`1`` or ``System.MDArrayRank{n}`1``),
//! so code that canonicalizes generic instantiations handles arrays without
//! special cases.

/// Seed of the even-index accumulator in [`name_hash`].
const NAME_HASH_SEED: u32 = 0x6DA3_B944;

/// Tag mixed into pointer hashes.
const POINTER_TAG: u32 = 0x12D0;

/// Tag mixed into by-ref hashes.
const BY_REF_TAG: u32 = 0x4C85;

/// Name hash of ``System.Array`1``, the synthetic definition behind
/// single-dimensional zero-based arrays.
pub const SZ_ARRAY_DEFINITION_HASH: u32 = 0xD531_3557;

#[inline]
const fn mix(hash: u32, value: u32, rotation: u32) -> u32 {
    hash.wrapping_add(hash.rotate_left(rotation)) ^ value
}

#[inline]
const fn finalize(hash: u32, rotation: u32) -> u32 {
    hash.wrapping_add(hash.rotate_left(rotation))
}

/// Shape of an array type.
///
/// A single-dimensional zero-based array is distinct from a rank-1
/// multi-dimensional array: they hash differently and are different types.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ArrayRank {
    /// `T[]`
    SingleDimensional,
    /// `T[,]`, `T[,,]`, ... (and `T[*]` for rank 1).
    MultiDimensional(u32),
}

impl ArrayRank {
    /// Number of dimensions.
    #[inline]
    pub const fn rank(self) -> u32 {
        match self {
            ArrayRank::SingleDimensional => 1,
            ArrayRank::MultiDimensional(rank) => rank,
        }
    }
}

/// Incremental form of [`name_hash`].
///
/// Appending pieces produces the same hash as hashing their concatenation,
/// which lets callers hash `namespace + "." + name` without building the
/// string.
#[derive(Copy, Clone, Debug)]
pub struct HashCodeBuilder {
    hash1: u32,
    hash2: u32,
    /// Whether the next code unit lands in the odd accumulator.
    odd: bool,
}

impl HashCodeBuilder {
    /// Start a hash with `seed` already appended.
    pub fn new(seed: &str) -> Self {
        let mut builder = Self {
            hash1: NAME_HASH_SEED,
            hash2: 0,
            odd: false,
        };
        builder.append(seed);
        builder
    }

    /// Append the UTF-16 code units of `piece`.
    pub fn append(&mut self, piece: &str) {
        for unit in piece.encode_utf16() {
            if self.odd {
                self.hash2 = mix(self.hash2, u32::from(unit), 5);
            } else {
                self.hash1 = mix(self.hash1, u32::from(unit), 5);
            }
            self.odd = !self.odd;
        }
    }

    /// Finish the hash. The builder stays usable.
    #[inline]
    pub fn finish(&self) -> u32 {
        finalize(self.hash1, 8) ^ finalize(self.hash2, 8)
    }
}

impl Default for HashCodeBuilder {
    fn default() -> Self {
        Self::new("")
    }
}

/// Hash a simple or qualified name.
///
/// Characters at even and odd UTF-16 indices feed two interleaved
/// accumulators which are finalized separately and XORed together.
pub fn name_hash(name: &str) -> u32 {
    HashCodeBuilder::new(name).finish()
}

/// Hash of the synthetic ``System.MDArrayRank{rank}`1`` definition.
pub fn md_array_definition_hash(rank: u32) -> u32 {
    let mut builder = HashCodeBuilder::new("System.MDArrayRank");
    builder.append(&rank.to_string());
    builder.append("`1");
    builder.finish()
}

/// Hash an array type from its element hash and shape.
pub fn array_hash(element_hash: u32, rank: ArrayRank) -> u32 {
    let definition_hash = match rank {
        ArrayRank::SingleDimensional => SZ_ARRAY_DEFINITION_HASH,
        ArrayRank::MultiDimensional(rank) => md_array_definition_hash(rank),
    };
    generic_instance_hash(definition_hash, [element_hash])
}

/// Hash a pointer type from its pointee hash.
#[inline]
pub const fn pointer_hash(pointee_hash: u32) -> u32 {
    mix(pointee_hash, POINTER_TAG, 5)
}

/// Hash a by-ref type from its parameter hash.
#[inline]
pub const fn by_ref_hash(parameter_hash: u32) -> u32 {
    mix(parameter_hash, BY_REF_TAG, 7)
}

/// Hash a nested type from its enclosing type's hash and its simple name hash.
#[inline]
pub const fn nested_type_hash(enclosing_hash: u32, simple_name_hash: u32) -> u32 {
    mix(enclosing_hash, simple_name_hash, 11)
}

/// Hash a generic instantiation.
///
/// Position-sensitive: each argument is folded into the accumulator in order.
pub fn generic_instance_hash<I>(definition_hash: u32, argument_hashes: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    let hash = argument_hashes
        .into_iter()
        .fold(definition_hash, |acc, arg| mix(acc, arg, 13));
    finalize(hash, 15)
}

/// Hash a method signature from its return type and parameter hashes.
pub fn method_signature_hash<I>(return_type_hash: u32, parameter_hashes: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    generic_instance_hash(return_type_hash, parameter_hashes)
}

/// Hash a method from its owning type's hash and its name hash.
///
/// For instantiated methods `name_hash` is the generic-instance hash of the
/// name over the method instantiation.
#[inline]
pub const fn method_hash(owning_type_hash: u32, name_hash: u32) -> u32 {
    owning_type_hash ^ name_hash
}

/// Hash an open signature variable: the name hash of `!index` for type-level
/// variables and `!!index` for method-level ones.
pub fn signature_variable_hash(index: u32, method_level: bool) -> u32 {
    let mut builder = HashCodeBuilder::new(if method_level { "!!" } else { "!" });
    builder.append(&index.to_string());
    builder.finish()
}
