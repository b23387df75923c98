//! Key material: secret/public keys and the gadget-ciphertext-based
//! evaluation keys (relinearization, Galois) used by the evaluator.

pub mod evaluation;
pub mod gadget;
pub mod public;
pub mod secret;

pub use evaluation::{EvaluationKey, EvaluationKeySet, GaloisKey, RelinearizationKey};
pub use gadget::{GadgetCiphertext, GadgetPlaintext};
pub use public::PublicKey;
pub use secret::SecretKey;
