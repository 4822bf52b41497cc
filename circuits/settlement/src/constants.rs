//! Settlement limits.

/// Maximum intents folded by one settlement (must match runtime MaxPendingIntents).
pub const MAX_INTENTS: usize = 64;

/// Upper bound on an encoded settlement proof.
pub const MAX_PROOF_BYTES: usize = 256 * 1024;
