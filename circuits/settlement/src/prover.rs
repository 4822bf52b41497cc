//! Off-chain settlement construction.

use alloc::vec::Vec;

use oracle_protocol::{intents_commitment, UpdateIntent};
use state_merkle::SparseMerkleMap;

use crate::constants::MAX_INTENTS;
use crate::{SettlementError, SettlementProof, SettlementStep, StepOutcome};

/// Apply `intents` in order to a copy of `map`.
///
/// Returns the proof together with the map it ends in; `map` itself is left
/// untouched so the caller can keep serving the settled view until the
/// ledger accepts the proof.
pub fn prove_settlement(
    map: &SparseMerkleMap,
    intents: &[UpdateIntent],
) -> Result<(SettlementProof, SparseMerkleMap), SettlementError> {
    if intents.is_empty() {
        return Err(SettlementError::EmptyBatch);
    }
    if intents.len() > MAX_INTENTS {
        return Err(SettlementError::TooManyIntents {
            max: MAX_INTENTS,
            actual: intents.len(),
        });
    }

    let start_root = map.root();
    let mut next = map.clone();
    let mut steps = Vec::with_capacity(intents.len());
    for intent in intents {
        let key = intent.key.0;
        let observed = next.get(&key);
        let witness = next.witness(&key);
        let outcome = if observed == intent.from {
            next.insert(key, intent.to);
            StepOutcome::Applied
        } else {
            log::debug!(
                target: "settlement",
                "rejecting intent for {:?}: expected {:?}, found {:?}",
                intent.key,
                intent.from,
                observed
            );
            StepOutcome::Rejected
        };
        steps.push(SettlementStep {
            intent: *intent,
            observed,
            witness,
            outcome,
        });
    }

    let proof = SettlementProof {
        start_root,
        end_root: next.root(),
        intents_commitment: intents_commitment(intents),
        steps,
    };
    Ok((proof, next))
}
