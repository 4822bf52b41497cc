use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use crypto::hashes::{chain_hash, tagged_hash, Commitment};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::AggregationError;

/// Running average reported by the base case, whatever the batch holds.
pub const BASE_AVERAGE: u64 = 1;

const BATCH_TAG: &[u8] = b"oracle-price-batch";
const BATCH_CHAIN_TAG: &[u8] = b"oracle-batch-chain";

/// Exactly `N` prices plus an explicit count that must equal `N`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceBatch<const N: usize> {
    pub prices: [u64; N],
    pub count: u64,
}

pub type PriceBatch20 = PriceBatch<20>;
pub type PriceBatch100 = PriceBatch<100>;

impl<const N: usize> PriceBatch<N> {
    pub fn new(prices: [u64; N]) -> Self {
        Self {
            prices,
            count: N as u64,
        }
    }

    /// A batch with every slot set to `value`.
    pub fn filled(value: u64) -> Self {
        Self::new([value; N])
    }

    pub fn from_slice(prices: &[u64]) -> Result<Self, AggregationError> {
        let prices: [u64; N] = prices
            .try_into()
            .map_err(|_| AggregationError::BatchSizeMismatch {
                expected: N as u64,
                actual: prices.len() as u64,
            })?;
        Ok(Self::new(prices))
    }

    pub fn validate(&self) -> Result<(), AggregationError> {
        if self.count != N as u64 {
            return Err(AggregationError::BatchSizeMismatch {
                expected: N as u64,
                actual: self.count,
            });
        }
        Ok(())
    }

    pub fn sum(&self) -> u128 {
        self.prices.iter().map(|p| *p as u128).sum()
    }

    pub fn digest(&self) -> Commitment {
        let mut bytes = alloc::vec::Vec::with_capacity(8 * (N + 1));
        bytes.extend_from_slice(&self.count.to_le_bytes());
        for price in &self.prices {
            bytes.extend_from_slice(&price.to_le_bytes());
        }
        tagged_hash(BATCH_TAG, &[&bytes])
    }
}

/// Fold one more batch into the commitment over every batch in a chain.
pub(crate) fn extend_batch_commitment(acc: &Commitment, batch_digest: &Commitment) -> Commitment {
    chain_hash(BATCH_CHAIN_TAG, acc, batch_digest)
}

/// Public output of an aggregation proof.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Encode,
    Decode,
    DecodeWithMemTracking,
    MaxEncodedLen,
    TypeInfo,
    Serialize,
    Deserialize,
)]
pub struct AggregationState {
    pub running_average: u64,
    pub total_count: u64,
}

impl AggregationState {
    pub fn base(batch_size: u64) -> Self {
        Self {
            running_average: BASE_AVERAGE,
            total_count: batch_size,
        }
    }

    /// `(avg * count + sum) / (count + batch_size)`, truncating.
    pub fn fold(&self, batch_sum: u128, batch_size: u64) -> Result<Self, AggregationError> {
        let total_count = self
            .total_count
            .checked_add(batch_size)
            .ok_or(AggregationError::Overflow)?;
        let new_sum = (self.running_average as u128)
            .checked_mul(self.total_count as u128)
            .and_then(|prior| prior.checked_add(batch_sum))
            .ok_or(AggregationError::Overflow)?;
        let running_average = u64::try_from(new_sum / total_count as u128)
            .map_err(|_| AggregationError::Overflow)?;
        Ok(Self {
            running_average,
            total_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_must_match_batch_size() {
        let mut batch = PriceBatch20::filled(5);
        assert!(batch.validate().is_ok());
        batch.count = 19;
        assert_eq!(
            batch.validate(),
            Err(AggregationError::BatchSizeMismatch {
                expected: 20,
                actual: 19
            })
        );
        assert!(PriceBatch20::from_slice(&[1u64; 21]).is_err());
        assert!(PriceBatch100::from_slice(&[1u64; 100]).is_ok());
    }

    #[test]
    fn fold_truncates() {
        let state = AggregationState::base(20);
        let next = state.fold(20 * 10 + 1, 20).unwrap();
        assert_eq!(next.total_count, 40);
        assert_eq!(next.running_average, (20 + 201) / 40);
    }

    #[test]
    fn fold_handles_large_prices() {
        let state = AggregationState {
            running_average: u64::MAX,
            total_count: 1_000,
        };
        let next = state.fold(u64::MAX as u128 * 20, 20).unwrap();
        assert_eq!(next.running_average, u64::MAX);
    }

    #[test]
    fn digest_binds_count() {
        let a = PriceBatch20::filled(1);
        let mut b = a;
        b.count = 0;
        assert_ne!(a.digest(), b.digest());
    }
}
