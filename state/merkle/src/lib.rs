//! Sparse Merkle map from 32-byte keys to `u64` values.
//!
//! The map is a full binary tree of depth 256 addressed by the key bits
//! (most significant bit first). Empty subtrees hash to the zero commitment,
//! so the root of a map is a pure function of its key/value set: insertion
//! order and history never leak into it.
//!
//! Off-chain holders keep the whole map; on-chain code only ever sees the
//! root plus a [`MapWitness`] for the keys it touches.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use codec::{Decode, DecodeWithMemTracking, Encode};
use crypto::hashes::{merkle_leaf, merkle_node, Commitment, ZERO_COMMITMENT};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

#[cfg(feature = "std")]
use thiserror::Error;

/// Number of levels between the root and a leaf.
pub const TREE_DEPTH: usize = 256;

pub type MapKey = Commitment;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum MerkleError {
    #[cfg_attr(
        feature = "std",
        error("witness carries {actual} siblings but its bitmap marks {expected}")
    )]
    SiblingCountMismatch { expected: usize, actual: usize },
    #[cfg_attr(feature = "std", error("witness marks an empty sibling as present"))]
    NonCanonicalWitness,
}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for MerkleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MerkleError::SiblingCountMismatch { expected, actual } => write!(
                f,
                "witness carries {} siblings but its bitmap marks {}",
                actual, expected
            ),
            MerkleError::NonCanonicalWitness => {
                write!(f, "witness marks an empty sibling as present")
            }
        }
    }
}

fn bit_at(key: &MapKey, depth: usize) -> bool {
    (key[depth / 8] >> (7 - depth % 8)) & 1 == 1
}

/// Authentication path for one key, compressed by omitting empty siblings.
///
/// Bit `d` of `bitmap` is set when the sibling at depth `d` (0 = child of
/// the root) is non-empty; `siblings` lists those siblings root first.
#[derive(
    Clone, Debug, PartialEq, Eq, Encode, Decode, DecodeWithMemTracking, TypeInfo, Serialize, Deserialize,
)]
pub struct MapWitness {
    pub bitmap: [u8; 32],
    pub siblings: Vec<Commitment>,
}

impl MapWitness {
    /// Witness for a key in the empty map.
    pub fn empty() -> Self {
        Self {
            bitmap: [0u8; 32],
            siblings: Vec::new(),
        }
    }

    /// Root of the map in which `key` holds `value` (or is absent when
    /// `value` is `None`) and every other key matches this witness.
    pub fn compute_root(&self, key: &MapKey, value: Option<u64>) -> Result<Commitment, MerkleError> {
        let expected = self
            .bitmap
            .iter()
            .map(|byte| byte.count_ones() as usize)
            .sum::<usize>();
        if expected != self.siblings.len() {
            return Err(MerkleError::SiblingCountMismatch {
                expected,
                actual: self.siblings.len(),
            });
        }

        let mut current = match value {
            Some(v) => merkle_leaf(key, v),
            None => ZERO_COMMITMENT,
        };
        let mut remaining = self.siblings.iter().rev();
        for depth in (0..TREE_DEPTH).rev() {
            let sibling = if bit_at(&self.bitmap, depth) {
                let sibling = remaining
                    .next()
                    .ok_or(MerkleError::NonCanonicalWitness)?;
                if *sibling == ZERO_COMMITMENT {
                    return Err(MerkleError::NonCanonicalWitness);
                }
                *sibling
            } else {
                ZERO_COMMITMENT
            };
            current = if bit_at(key, depth) {
                merkle_node(&sibling, &current)
            } else {
                merkle_node(&current, &sibling)
            };
        }
        Ok(current)
    }

    /// Whether this witness proves `key -> value` (or absence) under `root`.
    pub fn verify(&self, root: &Commitment, key: &MapKey, value: Option<u64>) -> bool {
        matches!(self.compute_root(key, value), Ok(computed) if computed == *root)
    }
}

/// In-memory sparse Merkle map holding the full key/value set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SparseMerkleMap {
    entries: BTreeMap<MapKey, u64>,
    root: Commitment,
}

impl SparseMerkleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (MapKey, u64)>,
    {
        let mut map = Self {
            entries: entries.into_iter().collect(),
            root: ZERO_COMMITMENT,
        };
        map.refresh_root();
        map
    }

    pub fn root(&self) -> Commitment {
        self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &MapKey) -> Option<u64> {
        self.entries.get(key).copied()
    }

    /// Set `key` to `value`, returning the previous value.
    pub fn insert(&mut self, key: MapKey, value: u64) -> Option<u64> {
        let previous = self.entries.insert(key, value);
        if previous != Some(value) {
            self.refresh_root();
        }
        previous
    }

    pub fn remove(&mut self, key: &MapKey) -> Option<u64> {
        let previous = self.entries.remove(key);
        if previous.is_some() {
            self.refresh_root();
        }
        previous
    }

    /// Authentication path for `key`, valid whether or not the key is present.
    pub fn witness(&self, key: &MapKey) -> MapWitness {
        let sorted: Vec<(MapKey, u64)> = self.entries.iter().map(|(k, v)| (*k, *v)).collect();
        let mut bitmap = [0u8; 32];
        let mut siblings = Vec::new();
        let mut slice = sorted.as_slice();
        for depth in 0..TREE_DEPTH {
            if slice.is_empty() {
                break;
            }
            let split = slice.partition_point(|(k, _)| !bit_at(k, depth));
            let (left, right) = slice.split_at(split);
            let (path, other) = if bit_at(key, depth) {
                (right, left)
            } else {
                (left, right)
            };
            let sibling = subtree_root(other, depth + 1);
            if sibling != ZERO_COMMITMENT {
                bitmap[depth / 8] |= 1 << (7 - depth % 8);
                siblings.push(sibling);
            }
            slice = path;
        }
        MapWitness { bitmap, siblings }
    }

    fn refresh_root(&mut self) {
        let sorted: Vec<(MapKey, u64)> = self.entries.iter().map(|(k, v)| (*k, *v)).collect();
        self.root = subtree_root(&sorted, 0);
    }
}

/// Root of the subtree at `depth` holding `entries`, which must be sorted and
/// share their first `depth` key bits.
fn subtree_root(entries: &[(MapKey, u64)], depth: usize) -> Commitment {
    match entries {
        [] => ZERO_COMMITMENT,
        [(key, value)] if depth == TREE_DEPTH => merkle_leaf(key, *value),
        _ => {
            let split = entries.partition_point(|(k, _)| !bit_at(k, depth));
            let (left, right) = entries.split_at(split);
            merkle_node(&subtree_root(left, depth + 1), &subtree_root(right, depth + 1))
        }
    }
}
