//! Error taxonomy for the RLWE core.
//!
//! Construction-time misconfiguration and corrupted-buffer contract
//! violations are `panic!`/`debug_assert!` per the fatal-error policy;
//! everything recoverable returns [`Error`].

use thiserror::Error;

/// Recoverable failure modes surfaced by this crate's operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter literal failed validation (out-of-range LogN, non-prime
    /// moduli, non-NTT-friendly primes, mismatched ring type requirements).
    #[error("invalid parameters: {0}")]
    Configuration(String),

    /// Inputs whose domains mismatch (ring degree mismatch, level
    /// exceeding the parameters' chain, degree ≠ 1 where required).
    #[error("domain mismatch: {0}")]
    Domain(String),

    /// The evaluation-key set lacks the key required for a Galois element
    /// or for relinearization.
    #[error("missing key for galois element {galois_element} (discrete log {discrete_log:?})")]
    MissingKey {
        /// The Galois element whose key was not found.
        galois_element: u64,
        /// Discrete log of the element w.r.t. the parameters' generator,
        /// when it could be computed.
        discrete_log: Option<usize>,
    },

    /// A gadget ciphertext's `LevelP` exceeds the output QP buffer's
    /// `LevelP`, or a requested level is outside the parameters' chain.
    #[error("level error: {0}")]
    Level(String),

    /// A byte slice shorter than `BinarySize`, or malformed fields.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An operation requested in a ring type or configuration that does
    /// not support it (Expand/Pack in ConjugateInvariant, hoisted calls
    /// with BaseTwoDecomposition ≠ 0, etc).
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn missing_galois_key(g: u64, dlog: Option<usize>) -> Self {
        Error::MissingKey {
            galois_element: g,
            discrete_log: dlog,
        }
    }
}
