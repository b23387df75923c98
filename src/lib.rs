//! RNS-based Ring-Learning-With-Errors core: ring arithmetic, key
//! switching, and the evaluator circuits underlying RNS homomorphic
//! encryption schemes.
//!
//! Module layout mirrors the dependency order a scheme built on top of
//! this crate needs: `modulus`/`ring` (arithmetic), `params` (ring and
//! distribution configuration), `plaintext`/`ciphertext`/`metadata`
//! (the data model), `keys` (secret/public/evaluation keys),
//! `encryptor`/`decryptor`/`keygen`, then `evaluator`/`circuits` built on
//! top of all of it, plus `serialization` for the wire format.

pub mod ciphertext;
pub mod circuits;
pub mod decryptor;
pub mod encryptor;
pub mod error;
pub mod evaluator;
pub mod keygen;
pub mod keys;
pub mod metadata;
pub mod modulus;
pub mod params;
pub mod plaintext;
pub mod ring;
pub mod serialization;

pub use ciphertext::Ciphertext;
pub use decryptor::Decryptor;
pub use encryptor::Encryptor;
pub use error::{Error, Result};
pub use evaluator::Evaluator;
pub use keygen::KeyGenerator;
pub use keys::{EvaluationKeySet, GaloisKey, GadgetCiphertext, PublicKey, RelinearizationKey, SecretKey};
pub use metadata::{LogDimensions, MetaData, Scale};
pub use params::{Distribution, EvaluationKeyParameters, ModuliSpec, ParametersLiteral, Parameters};
pub use plaintext::Plaintext;
