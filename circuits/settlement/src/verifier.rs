//! Settlement verification by witness replay.

use crypto::hashes::Commitment;
use oracle_protocol::intents_commitment;

use crate::constants::MAX_INTENTS;
use crate::{SettlementError, SettlementProof, SettlementSummary, StepOutcome};

/// Replay `proof` starting from `expected_start_root`.
pub fn verify_settlement_proof(
    proof: &SettlementProof,
    expected_start_root: &Commitment,
) -> Result<SettlementSummary, SettlementError> {
    if proof.start_root != *expected_start_root {
        return Err(SettlementError::StaleRoot);
    }
    if proof.steps.is_empty() {
        return Err(SettlementError::EmptyBatch);
    }
    if proof.steps.len() > MAX_INTENTS {
        return Err(SettlementError::TooManyIntents {
            max: MAX_INTENTS,
            actual: proof.steps.len(),
        });
    }
    if intents_commitment(proof.intents()) != proof.intents_commitment {
        return Err(SettlementError::CommitmentMismatch);
    }

    let mut root = proof.start_root;
    let mut applied = 0;
    for (index, step) in proof.steps.iter().enumerate() {
        let key = step.intent.key.as_bytes();
        let before = step
            .witness
            .compute_root(key, step.observed)
            .map_err(|_| SettlementError::WitnessMismatch(index))?;
        if before != root {
            return Err(SettlementError::WitnessMismatch(index));
        }

        let matches = step.observed == step.intent.from;
        match (step.outcome, matches) {
            (StepOutcome::Applied, true) => {
                root = step
                    .witness
                    .compute_root(key, Some(step.intent.to))
                    .map_err(|_| SettlementError::WitnessMismatch(index))?;
                applied += 1;
            }
            (StepOutcome::Rejected, false) => {}
            _ => return Err(SettlementError::OutcomeMismatch(index)),
        }
    }

    if root != proof.end_root {
        return Err(SettlementError::EndRootMismatch);
    }

    Ok(SettlementSummary {
        start_root: proof.start_root,
        end_root: proof.end_root,
        intents_commitment: proof.intents_commitment,
        intent_count: proof.steps.len(),
        applied,
        rejected: proof.steps.len() - applied,
    })
}

/// Decode and verify in one go.
pub fn verify_settlement_proof_bytes(
    proof_bytes: &[u8],
    expected_start_root: &Commitment,
) -> Result<(SettlementProof, SettlementSummary), SettlementError> {
    let proof = SettlementProof::from_bytes(proof_bytes)?;
    let summary = verify_settlement_proof(&proof, expected_start_root)?;
    Ok((proof, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prover::prove_settlement;
    use oracle_protocol::{AssetKey, UpdateIntent};
    use state_merkle::SparseMerkleMap;

    fn mina() -> AssetKey {
        AssetKey::from_name("Mina")
    }

    fn bitcoin() -> AssetKey {
        AssetKey::from_name("Bitcoin")
    }

    #[test]
    fn first_writes_apply() {
        let map = SparseMerkleMap::new();
        let intents = [
            UpdateIntent::new(mina(), None, 1_848_770_935),
            UpdateIntent::new(bitcoin(), None, 1_115_439_169_547_040),
        ];
        let (proof, next) = prove_settlement(&map, &intents).unwrap();
        let summary = verify_settlement_proof(&proof, &map.root()).unwrap();
        assert_eq!(summary.applied, 2);
        assert_eq!(summary.rejected, 0);
        assert_eq!(summary.end_root, next.root());
        assert_eq!(next.get(&mina().0), Some(1_848_770_935));

        let independent = SparseMerkleMap::from_entries([
            (mina().0, 1_848_770_935),
            (bitcoin().0, 1_115_439_169_547_040),
        ]);
        assert_eq!(independent.root(), proof.end_root);
    }

    #[test]
    fn mismatched_from_is_rejected_not_applied() {
        let map = SparseMerkleMap::from_entries([(mina().0, 10)]);
        let intents = [
            UpdateIntent::new(mina(), Some(9), 11),
            UpdateIntent::new(mina(), Some(10), 12),
            UpdateIntent::new(bitcoin(), Some(1), 2),
        ];
        let (proof, next) = prove_settlement(&map, &intents).unwrap();
        assert_eq!(
            proof.steps.iter().map(|s| s.outcome).collect::<Vec<_>>(),
            vec![StepOutcome::Rejected, StepOutcome::Applied, StepOutcome::Rejected]
        );
        let summary = verify_settlement_proof(&proof, &map.root()).unwrap();
        assert_eq!((summary.applied, summary.rejected), (1, 2));
        assert_eq!(next.get(&mina().0), Some(12));
        assert_eq!(next.get(&bitcoin().0), None);
    }

    #[test]
    fn chained_intents_on_one_key() {
        let map = SparseMerkleMap::new();
        let intents = [
            UpdateIntent::new(mina(), None, 1),
            UpdateIntent::new(mina(), Some(1), 2),
            UpdateIntent::new(mina(), Some(2), 3),
        ];
        let (proof, next) = prove_settlement(&map, &intents).unwrap();
        assert_eq!(verify_settlement_proof(&proof, &map.root()).unwrap().applied, 3);
        assert_eq!(next.get(&mina().0), Some(3));
    }

    #[test]
    fn stale_start_root_is_rejected() {
        let map = SparseMerkleMap::new();
        let (proof, _) = prove_settlement(&map, &[UpdateIntent::new(mina(), None, 1)]).unwrap();
        let moved = SparseMerkleMap::from_entries([(bitcoin().0, 5)]);
        assert_eq!(
            verify_settlement_proof(&proof, &moved.root()),
            Err(SettlementError::StaleRoot)
        );
    }

    #[test]
    fn forged_outcome_is_rejected() {
        let map = SparseMerkleMap::from_entries([(mina().0, 10)]);
        let (mut proof, _) =
            prove_settlement(&map, &[UpdateIntent::new(mina(), Some(9), 11)]).unwrap();
        proof.steps[0].outcome = StepOutcome::Applied;
        assert_eq!(
            verify_settlement_proof(&proof, &map.root()),
            Err(SettlementError::OutcomeMismatch(0))
        );
    }

    #[test]
    fn lying_about_the_observed_value_is_caught() {
        let map = SparseMerkleMap::from_entries([(mina().0, 10)]);
        let (mut proof, _) =
            prove_settlement(&map, &[UpdateIntent::new(mina(), Some(9), 11)]).unwrap();
        proof.steps[0].observed = Some(9);
        proof.steps[0].outcome = StepOutcome::Applied;
        assert_eq!(
            verify_settlement_proof(&proof, &map.root()),
            Err(SettlementError::WitnessMismatch(0))
        );
    }

    #[test]
    fn tampered_end_root_and_intents_are_rejected() {
        let map = SparseMerkleMap::new();
        let (proof, _) = prove_settlement(&map, &[UpdateIntent::new(mina(), None, 1)]).unwrap();

        let mut bad_end = proof.clone();
        bad_end.end_root = [9u8; 32];
        assert_eq!(
            verify_settlement_proof(&bad_end, &map.root()),
            Err(SettlementError::EndRootMismatch)
        );

        let mut bad_intent = proof.clone();
        bad_intent.steps[0].intent.to = 2;
        assert_eq!(
            verify_settlement_proof(&bad_intent, &map.root()),
            Err(SettlementError::CommitmentMismatch)
        );
    }

    #[test]
    fn bytes_round_trip() {
        let map = SparseMerkleMap::new();
        let (proof, _) = prove_settlement(&map, &[UpdateIntent::new(mina(), None, 1)]).unwrap();
        let bytes = proof.to_bytes().unwrap();
        let (decoded, summary) = verify_settlement_proof_bytes(&bytes, &map.root()).unwrap();
        assert_eq!(decoded, proof);
        assert_eq!(summary.intent_count, 1);
        assert_eq!(
            verify_settlement_proof_bytes(&[1, 2, 3], &map.root()),
            Err(SettlementError::DeserializeFailed)
        );
    }

    #[test]
    fn batch_limits() {
        let map = SparseMerkleMap::new();
        assert_eq!(prove_settlement(&map, &[]).unwrap_err(), SettlementError::EmptyBatch);
        let too_many = vec![UpdateIntent::new(mina(), None, 1); MAX_INTENTS + 1];
        assert!(matches!(
            prove_settlement(&map, &too_many),
            Err(SettlementError::TooManyIntents { .. })
        ));
    }
}
