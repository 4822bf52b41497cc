use aggregation_circuit::AggregationError;
use crypto::CryptoError;
use settlement_circuit::SettlementError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("aggregation error: {0}")]
    Aggregation(#[from] AggregationError),
    #[error("settlement error: {0}")]
    Settlement(#[from] SettlementError),
    #[error("cryptography error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("no intents are pending settlement")]
    NothingPending,
    #[error("local map root {local} does not match settled root {ledger}")]
    OutOfSync { local: String, ledger: String },
    #[error("mirror reflects {local} settled intents, ledger has {ledger}")]
    Behind { local: u64, ledger: u64 },
    #[error("ledger has not accepted settlement ending in {0}")]
    NotAccepted(String),
    #[error("proving job was cancelled")]
    Cancelled,
    #[error("proving worker failed: {0}")]
    WorkerFailed(String),
}

pub type OperatorResult<T> = Result<T, OperatorError>;
