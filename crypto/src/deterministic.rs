use alloc::vec::Vec;
use core::cmp::min;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

/// Deterministic RNG seeded via SHA-256 over a domain separated label.
#[derive(Clone)]
pub struct DeterministicRng {
    inner: ChaCha20Rng,
}

impl DeterministicRng {
    /// Create a deterministic RNG from arbitrary seed material.
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"oracle-drg");
        hasher.update(seed);
        let digest = hasher.finalize();
        let mut seed_bytes = [0u8; 32];
        seed_bytes.copy_from_slice(&digest);
        let inner = ChaCha20Rng::from_seed(seed_bytes);
        Self { inner }
    }

    /// Fill the provided buffer with pseudo-random bytes.
    pub fn fill_bytes(&mut self, buffer: &mut [u8]) {
        rand_core::RngCore::fill_bytes(&mut self.inner, buffer);
    }

    pub fn next_u64(&mut self) -> u64 {
        rand_core::RngCore::next_u64(&mut self.inner)
    }

    /// Uniform value in `low..=high`. Returns `low` when the range is empty.
    pub fn next_in_range(&mut self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        let span = (high - low) as u128 + 1;
        low + (self.next_u64() as u128 % span) as u64
    }
}

/// Expand the provided input into a deterministic byte vector of the requested length.
pub fn expand_to_length(domain: &[u8], input: &[u8], length: usize) -> Vec<u8> {
    let mut output = Vec::with_capacity(length);
    let mut counter = 0u32;
    while output.len() < length {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        hasher.update(counter.to_be_bytes());
        hasher.update(input);
        let digest = hasher.finalize();
        let take = min(length - output.len(), digest.len());
        output.extend_from_slice(&digest[..take]);
        counter = counter.wrapping_add(1);
    }
    output
}

/// Derive a 32-byte seed for one purpose from a master seed.
pub fn derive_seed(domain: &[u8], master: &[u8]) -> [u8; 32] {
    let bytes = expand_to_length(domain, master, 32);
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    out
}
