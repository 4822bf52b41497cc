//! Mirror of the settled price map.

use std::collections::BTreeMap;

use crypto::hashes::Commitment;
use oracle_protocol::{asset_keys, AssetKey, PriceClaim, PricesArray, UpdateIntent};
use settlement_circuit::{prove_settlement, SettlementProof};
use state_merkle::SparseMerkleMap;
use tracing::{debug, info, warn};

use crate::error::{OperatorError, OperatorResult};

/// Read access to the on-chain half of the oracle.
pub trait OracleLedger {
    /// Root of the price map as of the last accepted settlement.
    fn settled_root(&self) -> Commitment;
    /// Intents staged on-chain and not yet settled, oldest first.
    fn pending_intents(&self) -> Vec<UpdateIntent>;
    /// Number of intents consumed by settlements so far.
    fn settled_count(&self) -> u64;
    /// Consumed intents from position `from` on, in settlement order.
    fn settled_intents(&self, from: u64) -> Vec<UpdateIntent>;
}

impl<L: OracleLedger + ?Sized> OracleLedger for &L {
    fn settled_root(&self) -> Commitment {
        (**self).settled_root()
    }

    fn pending_intents(&self) -> Vec<UpdateIntent> {
        (**self).pending_intents()
    }

    fn settled_count(&self) -> u64 {
        (**self).settled_count()
    }

    fn settled_intents(&self, from: u64) -> Vec<UpdateIntent> {
        (**self).settled_intents(from)
    }
}

/// A proof waiting for the ledger, plus the map it leads to.
#[derive(Clone, Debug)]
pub struct PendingSettlement {
    pub proof: SettlementProof,
    pub next: SparseMerkleMap,
}

impl PendingSettlement {
    pub fn end_root(&self) -> Commitment {
        self.proof.end_root
    }
}

pub struct OffchainState<L> {
    ledger: L,
    map: SparseMerkleMap,
    /// Settled intents already reflected in `map`.
    settled: u64,
    max_intents: usize,
}

impl<L: OracleLedger> OffchainState<L> {
    /// Start from an empty map and catch up with every settlement the
    /// ledger has accepted.
    pub fn new(ledger: L, max_intents: usize) -> OperatorResult<Self> {
        Self::with_map(ledger, SparseMerkleMap::new(), 0, max_intents)
    }

    /// Resume from a persisted map that reflects the first `settled`
    /// settled intents.
    pub fn with_map(
        ledger: L,
        map: SparseMerkleMap,
        settled: u64,
        max_intents: usize,
    ) -> OperatorResult<Self> {
        let mut state = Self {
            ledger,
            map,
            settled,
            max_intents,
        };
        state.resync()?;
        Ok(state)
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn map(&self) -> &SparseMerkleMap {
        &self.map
    }

    pub fn root(&self) -> Commitment {
        self.map.root()
    }

    pub fn settled_count(&self) -> u64 {
        self.settled
    }

    /// Settled value of `key`.
    pub fn get(&self, key: &AssetKey) -> Option<u64> {
        self.map.get(&key.0)
    }

    /// Value `key` will hold once every pending intent settles.
    pub fn get_staged(&self, key: &AssetKey) -> Option<u64> {
        self.staged_view()
            .get(key)
            .copied()
            .unwrap_or_else(|| self.get(key))
    }

    /// Settled prices of every published asset, 0 where unset.
    pub fn prices(&self) -> PricesArray {
        let mut prices = PricesArray::default();
        for (slot, key) in prices.0.iter_mut().zip(asset_keys().iter()) {
            *slot = self.get(key).unwrap_or(0);
        }
        prices
    }

    pub fn claim(&self, key: &AssetKey) -> PriceClaim {
        PriceClaim {
            value: self.get(key),
            witness: self.map.witness(&key.0),
        }
    }

    /// Claims for every published asset in slot order, as `init_base` and
    /// `update` expect them.
    pub fn prior_claims(&self) -> Vec<PriceClaim> {
        asset_keys().iter().map(|key| self.claim(key)).collect()
    }

    /// The map and the oldest pending intents a settlement should cover.
    pub fn settlement_inputs(&self) -> OperatorResult<(SparseMerkleMap, Vec<UpdateIntent>)> {
        self.ensure_in_sync()?;
        let mut intents = self.ledger.pending_intents();
        if intents.is_empty() {
            return Err(OperatorError::NothingPending);
        }
        intents.truncate(self.max_intents);
        Ok((self.map.clone(), intents))
    }

    /// Prove the oldest pending intents against the settled map. The mirror
    /// is left as is until [`Self::apply_settled`].
    pub fn create_settlement_proof(&self) -> OperatorResult<PendingSettlement> {
        let (map, intents) = self.settlement_inputs()?;
        let (proof, next) = prove_settlement(&map, &intents)?;
        debug!(
            intents = intents.len(),
            end_root = %hex::encode(proof.end_root),
            "built settlement proof"
        );
        Ok(PendingSettlement { proof, next })
    }

    /// Adopt the map of a settlement the ledger has accepted. If another
    /// settlement landed instead, fails with `NotAccepted`; [`Self::resync`]
    /// then brings the mirror up to date.
    pub fn apply_settled(&mut self, settlement: PendingSettlement) -> OperatorResult<()> {
        let ledger_root = self.ledger.settled_root();
        let settled = self.settled + settlement.proof.steps.len() as u64;
        if ledger_root != settlement.end_root() || self.ledger.settled_count() != settled {
            warn!(
                end_root = %hex::encode(settlement.end_root()),
                ledger_root = %hex::encode(ledger_root),
                "settlement not reflected on the ledger"
            );
            return Err(OperatorError::NotAccepted(hex::encode(settlement.end_root())));
        }
        self.map = settlement.next;
        self.settled = settled;
        info!(root = %hex::encode(ledger_root), entries = self.map.len(), "mirror advanced");
        Ok(())
    }

    /// Replay settlements the mirror has not seen, with settlement's
    /// compare-and-swap rule. Returns the number of intents replayed.
    pub fn resync(&mut self) -> OperatorResult<usize> {
        let ledger_count = self.ledger.settled_count();
        if ledger_count < self.settled {
            return Err(OperatorError::Behind {
                local: self.settled,
                ledger: ledger_count,
            });
        }
        let missed = self.ledger.settled_intents(self.settled);
        if missed.len() as u64 != ledger_count - self.settled {
            return Err(OperatorError::Behind {
                local: self.settled + missed.len() as u64,
                ledger: ledger_count,
            });
        }

        let mut map = self.map.clone();
        for intent in &missed {
            if map.get(&intent.key.0) == intent.from {
                map.insert(intent.key.0, intent.to);
            }
        }
        let ledger_root = self.ledger.settled_root();
        if map.root() != ledger_root {
            return Err(OperatorError::OutOfSync {
                local: hex::encode(map.root()),
                ledger: hex::encode(ledger_root),
            });
        }
        if !missed.is_empty() {
            info!(replayed = missed.len(), root = %hex::encode(ledger_root), "mirror resynced");
        }
        self.map = map;
        self.settled = ledger_count;
        Ok(missed.len())
    }

    fn ensure_in_sync(&self) -> OperatorResult<()> {
        let ledger_count = self.ledger.settled_count();
        if ledger_count != self.settled {
            return Err(OperatorError::Behind {
                local: self.settled,
                ledger: ledger_count,
            });
        }
        let ledger = self.ledger.settled_root();
        let local = self.map.root();
        if ledger != local {
            return Err(OperatorError::OutOfSync {
                local: hex::encode(local),
                ledger: hex::encode(ledger),
            });
        }
        Ok(())
    }

    /// Replay pending intents with settlement's compare-and-swap rule.
    fn staged_view(&self) -> BTreeMap<AssetKey, Option<u64>> {
        let mut view: BTreeMap<AssetKey, Option<u64>> = BTreeMap::new();
        for intent in self.ledger.pending_intents() {
            let current = match view.get(&intent.key) {
                Some(value) => *value,
                None => self.get(&intent.key),
            };
            if current == intent.from {
                view.insert(intent.key, Some(intent.to));
            }
        }
        view
    }
}
