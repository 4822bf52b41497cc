//! Off-chain side of the price oracle.
//!
//! [`offchain::OffchainState`] mirrors the settled price map and turns the
//! ledger's pending intents into settlement proofs, [`jobs::ProvingService`]
//! runs aggregation and settlement proving off the async runtime, and
//! [`attest::PriceSigner`] produces the owner signatures the oracle pallet
//! checks in `verify`.

pub mod attest;
pub mod config;
pub mod error;
pub mod jobs;
pub mod offchain;
pub mod telemetry;

pub use attest::PriceSigner;
pub use config::OperatorConfig;
pub use error::{OperatorError, OperatorResult};
pub use jobs::{JobStatus, ProofJob, ProvingService};
pub use offchain::{OffchainState, OracleLedger, PendingSettlement};
