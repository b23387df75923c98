//! Immutable scheme configuration: ring dimension, the `Q`/`P` prime
//! chains, secret/error distributions, and the derived Galois-element
//! helpers and gadget-decomposition sizes everything else is built from.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::modulus::generate_ntt_friendly_primes;
use crate::ring::automorphism;
use crate::ring::{RingType, RnsRing};

pub const MIN_LOG_N: usize = 4;
pub const MAX_LOG_N: usize = 20;
pub const MAX_MODULUS_BITS: usize = 60;

/// A distribution over ternary/Gaussian secrets and errors, as configured
/// on a [`Parameters`] instance. Wraps the sampler-level types with the
/// choice of which one applies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Distribution {
    Ternary(crate::ring::Ternary),
    DiscreteGaussian { sigma: f64, bound: f64 },
}

impl Distribution {
    pub fn ternary_density(zero_probability: f64) -> Self {
        Distribution::Ternary(crate::ring::Ternary::Density { zero_probability })
    }

    pub fn ternary_hamming_weight(hamming_weight: usize) -> Self {
        Distribution::Ternary(crate::ring::Ternary::HammingWeight { hamming_weight })
    }

    pub fn discrete_gaussian(sigma: f64, bound: f64) -> Self {
        Distribution::DiscreteGaussian { sigma, bound }
    }

    pub fn expected_std_dev(&self, n: usize) -> f64 {
        match *self {
            Distribution::Ternary(t) => t.expected_std_dev(n),
            Distribution::DiscreteGaussian { sigma, .. } => sigma,
        }
    }

    pub fn sample_centered(
        &self,
        prng: &mut crate::ring::Prng,
        n: usize,
    ) -> Vec<i64> {
        match *self {
            Distribution::Ternary(t) => t.sample_centered(prng, n),
            Distribution::DiscreteGaussian { sigma, bound } => {
                crate::ring::DiscreteGaussian::new(sigma, bound).sample_centered(prng, n)
            }
        }
    }
}

/// JSON-compatible moduli specification: either literal primes or
/// requested bit-sizes (from which NTT-friendly primes are generated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModuliSpec {
    Literal(Vec<u64>),
    LogSizes(Vec<usize>),
}

/// The wire/config-file literal form of [`Parameters`]: the struct users
/// build by hand or deserialize from JSON before it's validated and
/// resolved into ring and NTT state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParametersLiteral {
    pub log_n: usize,
    pub q: ModuliSpec,
    pub p: Option<ModuliSpec>,
    pub xs: Distribution,
    pub xe: Distribution,
    pub ring_type: RingType,
    pub default_scale: f64,
    pub ntt_flag: bool,
}

/// Controls the shape of a generated evaluation key: how many `Q`/`P`
/// levels it spans and its base-2 decomposition width.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationKeyParameters {
    pub level_q: Option<usize>,
    pub level_p: Option<usize>,
    pub base_two_decomposition: Option<u32>,
}

/// Immutable scheme configuration, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct Parameters {
    log_n: usize,
    n: usize,
    ring_type: RingType,
    ring_q: RnsRing,
    ring_p: Option<RnsRing>,
    xs: Distribution,
    xe: Distribution,
    default_scale: f64,
    ntt_flag: bool,
}

impl Parameters {
    pub fn new(lit: ParametersLiteral) -> Result<Self> {
        if lit.log_n < MIN_LOG_N || lit.log_n > MAX_LOG_N {
            return Err(Error::Configuration(format!(
                "LogN {} out of range [{}, {}]",
                lit.log_n, MIN_LOG_N, MAX_LOG_N
            )));
        }
        let n = 1usize << lit.log_n;
        let modulus_step = match lit.ring_type {
            RingType::Standard => 2 * n as u64,
            RingType::ConjugateInvariant => 4 * n as u64,
        };

        let q_primes = Self::resolve_chain(&lit.q, modulus_step, &[])?;
        let p_primes = match &lit.p {
            Some(spec) => Some(Self::resolve_chain(spec, modulus_step, &q_primes)?),
            None => None,
        };

        for &prime in q_primes.iter().chain(p_primes.iter().flatten()) {
            Self::validate_prime(prime, modulus_step)?;
        }

        let levels_p = p_primes.as_ref().map_or(0, |p| p.len());
        let ring_q = RnsRing::new(n, &q_primes, lit.ring_type);
        let ring_p = p_primes.map(|primes| RnsRing::new(n, &primes, lit.ring_type));

        log::info!(
            "parameters: log_n={} levels_q={} levels_p={} ring_type={:?}",
            lit.log_n,
            q_primes.len(),
            levels_p,
            lit.ring_type,
        );

        Ok(Parameters {
            log_n: lit.log_n,
            n,
            ring_type: lit.ring_type,
            ring_q,
            ring_p,
            xs: lit.xs,
            xe: lit.xe,
            default_scale: lit.default_scale,
            ntt_flag: lit.ntt_flag,
        })
    }

    fn resolve_chain(spec: &ModuliSpec, modulus_step: u64, avoid: &[u64]) -> Result<Vec<u64>> {
        match spec {
            ModuliSpec::Literal(primes) => Ok(primes.clone()),
            ModuliSpec::LogSizes(sizes) => {
                let mut chosen = avoid.to_vec();
                let mut result = Vec::with_capacity(sizes.len());
                for &log_q in sizes {
                    let found = generate_ntt_friendly_primes(log_q, modulus_step, 1, &chosen)?;
                    chosen.push(found[0]);
                    result.push(found[0]);
                }
                Ok(result)
            }
        }
    }

    fn validate_prime(prime: u64, modulus_step: u64) -> Result<()> {
        if prime.leading_zeros() < (64 - MAX_MODULUS_BITS as u32) {
            return Err(Error::Configuration(format!(
                "prime {prime} exceeds {MAX_MODULUS_BITS}-bit limit"
            )));
        }
        if prime % modulus_step != 1 {
            return Err(Error::Configuration(format!(
                "prime {prime} is not NTT-friendly for step {modulus_step}"
            )));
        }
        if !crate::modulus::is_prime(prime) {
            return Err(Error::Configuration(format!("{prime} is not prime")));
        }
        Ok(())
    }

    pub fn log_n(&self) -> usize {
        self.log_n
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn ring_type(&self) -> RingType {
        self.ring_type
    }

    pub fn ring_q(&self) -> &RnsRing {
        &self.ring_q
    }

    pub fn ring_p(&self) -> Option<&RnsRing> {
        self.ring_p.as_ref()
    }

    pub fn max_level_q(&self) -> usize {
        self.ring_q.level()
    }

    pub fn max_level_p(&self) -> i32 {
        self.ring_p.as_ref().map(|r| r.level() as i32).unwrap_or(-1)
    }

    pub fn xs(&self) -> &Distribution {
        &self.xs
    }

    pub fn xe(&self) -> &Distribution {
        &self.xe
    }

    pub fn default_scale(&self) -> f64 {
        self.default_scale
    }

    pub fn ntt_flag(&self) -> bool {
        self.ntt_flag
    }

    pub fn galois_element(&self, k: i64) -> u64 {
        automorphism::galois_element(self.n, k)
    }

    pub fn galois_element_inverse(&self, g: u64) -> u64 {
        automorphism::galois_element_inverse(self.n, g)
    }

    pub fn galois_orthogonal_element(&self) -> u64 {
        automorphism::galois_orthogonal_element(self.n)
    }

    pub fn discrete_log(&self, g: u64) -> Option<usize> {
        automorphism::discrete_log_base_5(self.n, g)
    }

    /// `DR`: the number of gadget-decomposition rows for a ciphertext at
    /// `level_q`, given the requested (or inherited) `level_p`.
    pub fn decomposition_rows(&self, level_q: usize, level_p: i32) -> usize {
        if level_p >= 0 {
            let dp = level_p as usize + 1;
            (level_q + 1 + dp - 1) / dp
        } else {
            level_q + 1
        }
    }

    /// The number of consecutive `Q`-primes one gadget row spans: `1`
    /// when there's no `P` chain (one row per prime, the full-RNS case),
    /// `levelP + 1` otherwise (hybrid key switching, `DR` rows each
    /// covering up to `levelP + 1` primes so the digit's CRT sub-basis
    /// never exceeds `P`'s size).
    pub fn decomposition_group_size(&self, level_p: i32) -> usize {
        if level_p >= 0 {
            level_p as usize + 1
        } else {
            1
        }
    }

    /// The `[start, start + count)` range of `Q`-prime indices gadget row
    /// `row` covers, given `level_q`/`level_p`. The last row may cover
    /// fewer than `decomposition_group_size` primes when `levelQ + 1`
    /// isn't an exact multiple of the group size.
    pub fn decomposition_row_range(&self, level_q: usize, level_p: i32, row: usize) -> (usize, usize) {
        let group_size = self.decomposition_group_size(level_p);
        let start = row * group_size;
        let count = group_size.min(level_q + 1 - start);
        (start, count)
    }

    /// `DT_i`: the number of base-2 columns for row `i`'s prime, given
    /// decomposition width `w` (0 meaning "no base-2 decomposition").
    pub fn decomposition_cols(&self, q_i_bits: u32, w: u32, level_p: i32) -> usize {
        if w == 0 || level_p > 0 {
            1
        } else {
            ((q_i_bits + w - 1) / w) as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(log_n: usize) -> ParametersLiteral {
        ParametersLiteral {
            log_n,
            q: ModuliSpec::LogSizes(vec![55, 55]),
            p: Some(ModuliSpec::LogSizes(vec![55])),
            xs: Distribution::ternary_hamming_weight(1 << (log_n - 1)),
            xe: Distribution::discrete_gaussian(3.2, 19.2),
            ring_type: RingType::Standard,
            default_scale: (1u64 << 40) as f64,
            ntt_flag: true,
        }
    }

    #[test]
    fn constructs_from_log_sizes() {
        let params = Parameters::new(literal(4)).unwrap();
        assert_eq!(params.n(), 16);
        assert_eq!(params.max_level_q(), 1);
        assert_eq!(params.max_level_p(), 0);
    }

    #[test]
    fn rejects_log_n_out_of_range() {
        let mut lit = literal(4);
        lit.log_n = 2;
        assert!(Parameters::new(lit).is_err());
    }

    #[test]
    fn decomposition_sizes_match_invariants() {
        let params = Parameters::new(literal(4)).unwrap();
        assert_eq!(params.decomposition_rows(1, 0), 2);
        assert_eq!(params.decomposition_cols(55, 0, 0), 1);
        assert_eq!(params.decomposition_cols(55, 20, -1), 3);
    }

    #[test]
    fn grouped_decomposition_spans_multiple_q_primes_when_p_is_larger() {
        let params = Parameters::new(literal(4)).unwrap();
        // levelQ = 4 (5 primes), levelP = 1 (2 primes) -> DR = ceil(5/2) = 3,
        // groups of 2 primes each except the last (1 prime).
        assert_eq!(params.decomposition_rows(4, 1), 3);
        assert_eq!(params.decomposition_group_size(1), 2);
        assert_eq!(params.decomposition_row_range(4, 1, 0), (0, 2));
        assert_eq!(params.decomposition_row_range(4, 1, 1), (2, 2));
        assert_eq!(params.decomposition_row_range(4, 1, 2), (4, 1));
    }

    #[test]
    fn full_rns_decomposition_has_one_prime_per_row() {
        let params = Parameters::new(literal(4)).unwrap();
        assert_eq!(params.decomposition_group_size(0), 1);
        assert_eq!(params.decomposition_group_size(-1), 1);
        assert_eq!(params.decomposition_row_range(1, 0, 1), (1, 1));
    }
}
