#[cfg(feature = "std")]
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum CryptoError {
    #[cfg_attr(
        feature = "std",
        error("invalid length: expected {expected} bytes, found {actual}")
    )]
    InvalidLength { expected: usize, actual: usize },

    #[cfg_attr(feature = "std", error("verification failed"))]
    VerificationFailed,

    #[cfg_attr(feature = "std", error("invalid key"))]
    InvalidKey,

    #[cfg_attr(feature = "std", error("invalid signature"))]
    InvalidSignature,
}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CryptoError::InvalidLength { expected, actual } => {
                write!(
                    f,
                    "invalid length: expected {} bytes, found {}",
                    expected, actual
                )
            }
            CryptoError::VerificationFailed => write!(f, "verification failed"),
            CryptoError::InvalidKey => write!(f, "invalid key"),
            CryptoError::InvalidSignature => write!(f, "invalid signature"),
        }
    }
}
