//! RNS ring arithmetic: coefficients, NTT, sampling, automorphisms, and
//! basis conversion between the `Q` and `P` prime chains.

pub mod automorphism;
pub mod basis_extension;
pub mod ntt;
pub mod poly;
pub mod qp;
pub mod rns;
pub mod sampler;

pub use basis_extension::BasisExtender;
pub use ntt::NttTable;
pub use poly::Poly;
pub use qp::{QpPoly, QpRing};
pub use rns::{RingType, RnsRing};
pub use sampler::{DiscreteGaussian, Prng, Ternary, UniformSampler};
