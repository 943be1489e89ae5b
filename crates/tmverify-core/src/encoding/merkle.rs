use crate::types::Hash;
use sha2::{Digest, Sha256};

const LEAF_PREFIX: u8 = 0x00;
const INNER_PREFIX: u8 = 0x01;

/// Merkle root over an ordered list of byte strings (RFC 6962 tree shape).
///
/// Leaves are domain-separated from inner nodes, so a leaf can never be passed off as a subtree.
/// The empty list hashes to SHA256 of nothing.
pub fn simple_hash_from_byte_slices<T: AsRef<[u8]>>(items: &[T]) -> Hash {
    match items.len() {
        0 => sha256_hash(&[]),
        1 => leaf_hash(items[0].as_ref()),
        n => {
            let k = split_point(n);
            let left = simple_hash_from_byte_slices(&items[..k]);
            let right = simple_hash_from_byte_slices(&items[k..]);
            inner_hash(&left, &right)
        }
    }
}

/// Largest power of two strictly less than `n` (n >= 2).
fn split_point(n: usize) -> usize {
    let mut k = 1;
    while k * 2 < n {
        k *= 2;
    }
    k
}

fn leaf_hash(leaf: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(leaf);
    hasher.finalize().into()
}

fn inner_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([INNER_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// SHA256 hash of arbitrary data.
pub fn sha256_hash(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}
