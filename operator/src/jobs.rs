//! Background proving.
//!
//! Proving is CPU-bound, so every job runs on tokio's blocking pool behind a
//! semaphore sized by `proving_workers`. The two aggregation chains have
//! separate locks and can be extended at the same time. Reads never wait on
//! a proof in progress: keys are fixed at setup and the head is published
//! through its own cell once a step lands.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use aggregation_circuit::{
    AggregationChain, AggregationProgram, AggregationProof, AggregationState, PriceBatch,
    VerificationKey,
};
use oracle_protocol::UpdateIntent;
use parking_lot::{Mutex, RwLock};
use settlement_circuit::prove_settlement;
use state_merkle::SparseMerkleMap;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::OperatorConfig;
use crate::error::{OperatorError, OperatorResult};
use crate::offchain::PendingSettlement;

/// Where a [`ProofJob`] is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    /// Waiting for a proving worker.
    Queued,
    Proving,
    Finished,
}

impl JobStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => JobStatus::Queued,
            1 => JobStatus::Proving,
            _ => JobStatus::Finished,
        }
    }
}

#[derive(Default)]
struct JobControl {
    cancelled: AtomicBool,
    status: AtomicU8,
}

impl JobControl {
    fn set(&self, status: JobStatus) {
        self.status.store(status as u8, Ordering::Release);
    }
}

/// Handle to a proof being computed in the background.
pub struct ProofJob<T> {
    handle: JoinHandle<OperatorResult<T>>,
    control: Arc<JobControl>,
}

impl<T: Send + 'static> ProofJob<T> {
    fn spawn<F>(permits: Arc<Semaphore>, work: F) -> Self
    where
        F: FnOnce(&AtomicBool) -> OperatorResult<T> + Send + 'static,
    {
        let control = Arc::new(JobControl::default());
        let shared = control.clone();
        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| OperatorError::Cancelled)?;
            if shared.cancelled.load(Ordering::Acquire) {
                return Err(OperatorError::Cancelled);
            }
            tokio::task::spawn_blocking(move || {
                shared.set(JobStatus::Proving);
                let result = work(&shared.cancelled);
                shared.set(JobStatus::Finished);
                result
            })
            .await
            .map_err(|err| OperatorError::WorkerFailed(err.to_string()))?
        });
        Self { handle, control }
    }

    /// Ask the job to stop. A job still queued is dropped; one already
    /// proving finishes its computation but does not publish the result.
    pub fn cancel(&self) {
        self.control.cancelled.store(true, Ordering::Release);
        self.handle.abort();
    }

    /// Progress of the proving work itself. A job cancelled while queued
    /// stays `Queued`.
    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.control.status.load(Ordering::Acquire))
    }

    /// Whether [`Self::wait`] would return without blocking.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> OperatorResult<T> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(OperatorError::Cancelled),
            Err(err) => Err(OperatorError::WorkerFailed(err.to_string())),
        }
    }
}

/// One aggregation chain and what readers see of it.
struct ChainSlot<const N: usize> {
    verification_key: VerificationKey,
    /// Held for a whole step so proofs of one chain stay linear.
    chain: Mutex<AggregationChain<N>>,
    head: RwLock<Option<AggregationProof>>,
}

impl<const N: usize> ChainSlot<N> {
    fn new(program: AggregationProgram<N>) -> Self {
        Self {
            verification_key: program.verification_key().clone(),
            chain: Mutex::new(AggregationChain::new(program)),
            head: RwLock::new(None),
        }
    }

    fn latest(&self) -> Option<AggregationProof> {
        self.head.read().clone()
    }

    fn state(&self) -> Option<AggregationState> {
        self.head.read().as_ref().map(|proof| proof.public_output)
    }
}

pub struct ProvingService {
    chain_20: Arc<ChainSlot<20>>,
    chain_100: Arc<ChainSlot<100>>,
    permits: Arc<Semaphore>,
}

impl ProvingService {
    pub fn new(config: &OperatorConfig) -> OperatorResult<Self> {
        config.validate()?;
        let chain_20 = ChainSlot::new(AggregationProgram::compile(&config.setup_seed));
        let chain_100 = ChainSlot::new(AggregationProgram::compile(&config.setup_seed));
        info!(workers = config.proving_workers, "proving service ready");
        Ok(Self {
            chain_20: Arc::new(chain_20),
            chain_100: Arc::new(chain_100),
            permits: Arc::new(Semaphore::new(config.proving_workers)),
        })
    }

    pub fn verification_key_20(&self) -> VerificationKey {
        self.chain_20.verification_key.clone()
    }

    pub fn verification_key_100(&self) -> VerificationKey {
        self.chain_100.verification_key.clone()
    }

    pub fn latest_20(&self) -> Option<AggregationProof> {
        self.chain_20.latest()
    }

    pub fn latest_100(&self) -> Option<AggregationProof> {
        self.chain_100.latest()
    }

    pub fn state_20(&self) -> Option<AggregationState> {
        self.chain_20.state()
    }

    pub fn state_100(&self) -> Option<AggregationState> {
        self.chain_100.state()
    }

    /// Fold one batch of 20 prices into the N=20 chain.
    pub fn extend_20(&self, batch: PriceBatch<20>) -> ProofJob<AggregationProof> {
        self.extend(self.chain_20.clone(), batch)
    }

    /// Fold one batch of 100 prices into the N=100 chain.
    pub fn extend_100(&self, batch: PriceBatch<100>) -> ProofJob<AggregationProof> {
        self.extend(self.chain_100.clone(), batch)
    }

    /// Build a settlement proof for `intents` on top of `map`.
    pub fn prove_settlement(
        &self,
        map: SparseMerkleMap,
        intents: Vec<UpdateIntent>,
    ) -> ProofJob<PendingSettlement> {
        ProofJob::spawn(self.permits.clone(), move |_| {
            let (proof, next) = prove_settlement(&map, &intents)?;
            debug!(intents = intents.len(), "settlement proof ready");
            Ok(PendingSettlement { proof, next })
        })
    }

    fn extend<const N: usize>(
        &self,
        slot: Arc<ChainSlot<N>>,
        batch: PriceBatch<N>,
    ) -> ProofJob<AggregationProof> {
        ProofJob::spawn(self.permits.clone(), move |cancelled| {
            let mut chain = slot.chain.lock();
            let (proof, state) = match chain.latest() {
                None => chain.program().base(&batch)?,
                Some(head) => chain.program().step(&batch, head)?,
            };
            if cancelled.load(Ordering::Acquire) {
                debug!(batch_size = N, "cancelled step discarded");
                return Err(OperatorError::Cancelled);
            }
            chain.append(proof.clone())?;
            *slot.head.write() = Some(proof.clone());
            info!(
                batch_size = N,
                running_average = state.running_average,
                total_count = state.total_count,
                chain_length = proof.chain_length,
                "aggregation proof ready"
            );
            Ok(proof)
        })
    }
}
