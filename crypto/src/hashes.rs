//! Domain separated commitment hashes.
//!
//! Every commitment in the oracle is a 32-byte blake3 output. Each use gets
//! its own tag so a digest computed for one structure can never be confused
//! with a digest for another.

use blake3::Hasher as Blake3Hasher;

pub type Commitment = [u8; 32];

pub const ZERO_COMMITMENT: Commitment = [0u8; 32];

const ASSET_KEY_TAG: &[u8] = b"oracle-asset-key";
const SECRET_TAG: &[u8] = b"oracle-secret";
const LEAF_TAG: &[u8] = b"oracle-smt-leaf";
const NODE_TAG: &[u8] = b"oracle-smt-node";

pub fn blake3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake3Hasher::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize_xof().fill(&mut out);
    out
}

/// blake3 over `tag || part_0 || part_1 || ...`.
pub fn tagged_hash(tag: &[u8], parts: &[&[u8]]) -> Commitment {
    let mut hasher = Blake3Hasher::new();
    hasher.update(tag);
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    hasher.finalize_xof().fill(&mut out);
    out
}

/// Map key for an asset's human readable name, e.g. `"Bitcoin"`.
pub fn asset_key(name: &str) -> Commitment {
    tagged_hash(ASSET_KEY_TAG, &[name.as_bytes()])
}

/// Hash stored on-chain in place of the update secret.
///
/// Never returns the zero commitment for any practical input, which is what
/// lets zero stand for "not yet initialised".
pub fn secret_commitment(secret: &[u8; 32]) -> Commitment {
    tagged_hash(SECRET_TAG, &[secret])
}

pub fn merkle_leaf(key: &Commitment, value: u64) -> Commitment {
    tagged_hash(LEAF_TAG, &[key, &value.to_be_bytes()])
}

/// Interior node hash. Two empty children collapse to the empty commitment.
pub fn merkle_node(left: &Commitment, right: &Commitment) -> Commitment {
    if *left == ZERO_COMMITMENT && *right == ZERO_COMMITMENT {
        return ZERO_COMMITMENT;
    }
    tagged_hash(NODE_TAG, &[left, right])
}

/// One link of a running hash chain: `H(tag || acc || item)`.
pub fn chain_hash(tag: &[u8], acc: &Commitment, item: &[u8]) -> Commitment {
    tagged_hash(tag, &[acc, item])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_keys_are_distinct() {
        assert_ne!(asset_key("Mina"), asset_key("Bitcoin"));
        assert_eq!(asset_key("Mina"), asset_key("Mina"));
    }

    #[test]
    fn empty_nodes_collapse() {
        assert_eq!(merkle_node(&ZERO_COMMITMENT, &ZERO_COMMITMENT), ZERO_COMMITMENT);
        let leaf = merkle_leaf(&asset_key("Mina"), 1);
        assert_ne!(merkle_node(&leaf, &ZERO_COMMITMENT), merkle_node(&ZERO_COMMITMENT, &leaf));
    }

    #[test]
    fn secret_commitment_is_not_zero() {
        assert_ne!(secret_commitment(&[0u8; 32]), ZERO_COMMITMENT);
    }

    #[test]
    fn tags_separate_domains() {
        let key = asset_key("Mina");
        assert_ne!(tagged_hash(LEAF_TAG, &[&key]), tagged_hash(NODE_TAG, &[&key]));
        assert_eq!(blake3_256(b"x"), tagged_hash(b"", &[b"x"]));
    }
}
