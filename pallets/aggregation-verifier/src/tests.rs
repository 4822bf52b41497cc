use crate::pallet::{LatestOutputs, VerificationKeys};
use crate::{BatchSize, Error, Event};
use aggregation_circuit::{PriceBatch100, PriceBatch20, BASE_AVERAGE};
use frame_support::{assert_noop, assert_ok, BoundedVec};

use super::mock::{
    new_test_ext, programs, AggregationVerifier as Pallet, RuntimeEvent, RuntimeOrigin, System,
    Test,
};

fn bounded(bytes: Vec<u8>) -> BoundedVec<u8, super::mock::MaxProofSize> {
    BoundedVec::try_from(bytes).expect("proof fits")
}

#[test]
fn genesis_installs_both_keys() {
    new_test_ext().execute_with(|| {
        let (small, large) = programs();
        assert_eq!(
            VerificationKeys::<Test>::get(BatchSize::Twenty).as_ref(),
            Some(small.verification_key())
        );
        assert_eq!(
            VerificationKeys::<Test>::get(BatchSize::Hundred).as_ref(),
            Some(large.verification_key())
        );
        assert!(LatestOutputs::<Test>::get(BatchSize::Twenty).is_none());
    });
}

#[test]
fn valid_step_proof_is_recorded() {
    new_test_ext().execute_with(|| {
        let (small, _) = programs();
        let (base, _) = small.base(&PriceBatch20::filled(1)).unwrap();
        let (step, state) = small.step(&PriceBatch20::filled(41), &base).unwrap();

        assert_ok!(Pallet::verify_aggregation_proof_20(
            RuntimeOrigin::signed(1),
            bounded(step.to_bytes().unwrap())
        ));

        assert_eq!(LatestOutputs::<Test>::get(BatchSize::Twenty), Some(state));
        assert_eq!(state.running_average, (20 + 41 * 20) / 40);
        System::assert_last_event(RuntimeEvent::AggregationVerifier(
            Event::AggregationVerified {
                batch_size: BatchSize::Twenty,
                running_average: state.running_average,
                total_count: 40,
                chain_length: 2,
            },
        ));
    });
}

#[test]
fn large_chain_base_proof_verifies() {
    new_test_ext().execute_with(|| {
        let (_, large) = programs();
        let (base, _) = large.base(&PriceBatch100::filled(9)).unwrap();
        let state = Pallet::verify_and_record(BatchSize::Hundred, &base.to_bytes().unwrap())
            .expect("base proof verifies");
        assert_eq!(state.running_average, BASE_AVERAGE);
        assert_eq!(state.total_count, 100);
        assert_eq!(LatestOutputs::<Test>::get(BatchSize::Hundred), Some(state));
    });
}

#[test]
fn proofs_do_not_cross_chains() {
    new_test_ext().execute_with(|| {
        let (small, large) = programs();
        let (small_proof, _) = small.base(&PriceBatch20::filled(1)).unwrap();
        let (large_proof, _) = large.base(&PriceBatch100::filled(1)).unwrap();

        assert_noop!(
            Pallet::verify_aggregation_proof_100(
                RuntimeOrigin::signed(1),
                bounded(small_proof.to_bytes().unwrap())
            ),
            Error::<Test>::WrongCircuit
        );
        assert_noop!(
            Pallet::verify_aggregation_proof_20(
                RuntimeOrigin::signed(1),
                bounded(large_proof.to_bytes().unwrap())
            ),
            Error::<Test>::WrongCircuit
        );
    });
}

#[test]
fn tampered_proof_leaves_no_trace() {
    new_test_ext().execute_with(|| {
        let (small, _) = programs();
        let (base, _) = small.base(&PriceBatch20::filled(1)).unwrap();
        assert_ok!(Pallet::verify_aggregation_proof_20(
            RuntimeOrigin::signed(1),
            bounded(base.to_bytes().unwrap())
        ));
        let recorded = LatestOutputs::<Test>::get(BatchSize::Twenty);

        let (mut forged, _) = small.step(&PriceBatch20::filled(5), &base).unwrap();
        forged.public_output.running_average = 1_000_000;
        assert_noop!(
            Pallet::verify_aggregation_proof_20(
                RuntimeOrigin::signed(1),
                bounded(forged.to_bytes().unwrap())
            ),
            Error::<Test>::InvalidProof
        );
        assert_eq!(LatestOutputs::<Test>::get(BatchSize::Twenty), recorded);
    });
}

#[test]
fn garbage_bytes_are_malformed() {
    new_test_ext().execute_with(|| {
        assert_noop!(
            Pallet::verify_aggregation_proof_20(RuntimeOrigin::signed(1), bounded(vec![0xde, 0xad])),
            Error::<Test>::MalformedProof
        );
    });
}

#[test]
fn missing_key_is_reported() {
    new_test_ext().execute_with(|| {
        VerificationKeys::<Test>::remove(BatchSize::Hundred);
        let (_, large) = programs();
        let (base, _) = large.base(&PriceBatch100::filled(1)).unwrap();
        assert_noop!(
            Pallet::verify_aggregation_proof_100(
                RuntimeOrigin::signed(1),
                bounded(base.to_bytes().unwrap())
            ),
            Error::<Test>::VerificationKeyMissing
        );
    });
}

#[test]
fn unsigned_origin_is_rejected() {
    new_test_ext().execute_with(|| {
        assert_noop!(
            Pallet::verify_aggregation_proof_20(RuntimeOrigin::none(), bounded(vec![])),
            sp_runtime::DispatchError::BadOrigin
        );
    });
}
