//! Higher-level ciphertext circuits built on the evaluator: batched
//! linear transforms, slot reductions, and ring packing.

pub mod expand_pack;
pub mod inner_sum;
pub mod linear_transform;
pub mod ring_packing;

pub use expand_pack::{expand, pack};
pub use inner_sum::{inner_function, inner_sum, replicate, trace};
pub use linear_transform::{evaluate_linear_transform, evaluate_linear_transform_bsgs, Diagonal};
pub use ring_packing::{extract, merge, repack, split, LweSample};
