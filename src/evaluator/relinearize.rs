//! Relinearization (degree-2 → degree-1) and the general
//! `ApplyEvaluationKey` this specializes, including the ring-degree
//! mismatch case used by ring packing (`Y = X^{N_large/N_small}`).

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::evaluator::gadget_product::gadget_product;
use crate::keys::{EvaluationKey, RelinearizationKey};
use crate::params::Parameters;
use crate::ring::Poly;

/// Reduces a degree-2 ciphertext `(c0, c1, c2)` to degree 1: key-switches
/// `c2` (which decrypts against `s^2`) back under `s` and folds it into
/// `(c0, c1)`.
pub fn relinearize(params: &Parameters, ct: &Ciphertext, rlk: &RelinearizationKey) -> Result<Ciphertext> {
    if ct.degree() != 2 {
        return Err(Error::Domain(format!(
            "relinearize requires a degree-2 ciphertext, got degree {}",
            ct.degree()
        )));
    }
    let ring_q = params.ring_q();
    let mut c2 = ct.at(2).clone();
    if ct.metadata.is_montgomery {
        ring_q.from_montgomery(&mut c2);
    }
    if ct.metadata.is_ntt {
        ring_q.ntt_backward(&mut c2);
    }

    let (g0, g1) = gadget_product(params, &c2, &rlk.key.gadget);

    let mut new_c0 = ct.at(0).clone();
    let mut new_c1 = ct.at(1).clone();
    if ct.metadata.is_montgomery {
        ring_q.from_montgomery(&mut new_c0);
        ring_q.from_montgomery(&mut new_c1);
    }
    if ct.metadata.is_ntt {
        ring_q.ntt_backward(&mut new_c0);
        ring_q.ntt_backward(&mut new_c1);
    }

    let mut sum0 = ring_q.new_poly(new_c0.level());
    let mut sum1 = ring_q.new_poly(new_c1.level());
    ring_q.add(&new_c0, &g0, &mut sum0);
    ring_q.add(&new_c1, &g1, &mut sum1);

    if ct.metadata.is_ntt {
        ring_q.ntt_forward(&mut sum0);
        ring_q.ntt_forward(&mut sum1);
    }
    if ct.metadata.is_montgomery {
        ring_q.to_montgomery(&mut sum0);
        ring_q.to_montgomery(&mut sum1);
    }

    Ok(Ciphertext::new(vec![sum0, sum1], ct.metadata))
}

/// The general operation relinearization and automorphism application
/// both specialize: key-switch a single polynomial `cx` (plain,
/// time-domain, decrypting against `skIn`) into a degree-1 ciphertext
/// decrypting against `skOut`, via `ek`.
pub fn apply_evaluation_key(ring_q_plain_cx: &Poly, params: &Parameters, ek: &EvaluationKey) -> (Poly, Poly) {
    gadget_product(params, ring_q_plain_cx, &ek.gadget)
}

/// Re-embeds a ciphertext defined over a smaller ring (`N_small`) into a
/// larger one (`N_large`) by the substitution `X -> X^{N_large/N_small}`,
/// spreading each coefficient to index `k * (N_large/N_small)` and
/// zero-filling the rest. Used when ring packing needs to combine
/// ciphertexts over rings of different degree before a shared gadget
/// product.
pub fn embed_into_larger_ring(small: &Poly, ring_q_large_n: usize) -> Poly {
    let n_small = small.n();
    debug_assert!(ring_q_large_n % n_small == 0, "ring degree mismatch must be a clean multiple");
    let step = ring_q_large_n / n_small;
    let rows: Vec<Vec<u64>> = small
        .rows()
        .iter()
        .map(|row| {
            let mut out = vec![0u64; ring_q_large_n];
            for (k, v) in row.iter().enumerate() {
                out[k * step] = *v;
            }
            out
        })
        .collect();
    Poly::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decryptor::Decryptor;
    use crate::encryptor::Encryptor;
    use crate::keys::SecretKey;
    use crate::metadata::{MetaData, Scale};
    use crate::params::{Distribution, EvaluationKeyParameters, ModuliSpec, ParametersLiteral};
    use crate::ring::{Prng, RingType};
    use num_traits::ToPrimitive;

    fn test_params() -> Parameters {
        Parameters::new(ParametersLiteral {
            log_n: 4,
            q: ModuliSpec::LogSizes(vec![55, 55]),
            p: Some(ModuliSpec::LogSizes(vec![55])),
            xs: Distribution::ternary_hamming_weight(8),
            xe: Distribution::discrete_gaussian(3.2, 19.2),
            ring_type: RingType::Standard,
            default_scale: (1u64 << 40) as f64,
            ntt_flag: true,
        })
        .unwrap()
    }

    #[test]
    fn relinearize_of_fresh_square_decrypts_small() {
        let params = test_params();
        let mut prng = Prng::from_seed([13u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let metadata = MetaData::new(Scale::new(1.0), params.log_n());
        let rlk = RelinearizationKey::generate(&params, &sk, &mut prng, EvaluationKeyParameters::default());

        let encryptor = Encryptor::new(&params);
        let ct = encryptor
            .encrypt_zero_sk(&sk, params.max_level_q(), metadata, &mut prng, None)
            .unwrap();

        let mut degree2 = ct.clone();
        degree2.parts.push(params.ring_q().new_poly(params.max_level_q()));

        let relinearized = relinearize(&params, &degree2, &rlk).unwrap();
        assert_eq!(relinearized.degree(), 1);

        let decryptor = Decryptor::new(&params);
        let pt = decryptor.decrypt(&relinearized, &sk);
        let centered = params.ring_q().reconstruct_centered(&pt.poly);
        let bound = params.xe().expected_std_dev(params.n()) as i64 * 64 + 128;
        for c in centered {
            let v = c.to_i64().unwrap_or(i64::MAX);
            assert!(v.abs() < bound, "relinearized noise {v} exceeds bound {bound}");
        }
    }

    /// `levelQ = 3` (4 primes), `levelP = 1` (2 primes): `DR = ceil(4/2)
    /// = 2` gadget rows, each spanning 2 Q primes, exercising the grouped
    /// decomposition rather than the one-prime-per-row case.
    fn grouped_test_params() -> Parameters {
        Parameters::new(ParametersLiteral {
            log_n: 4,
            q: ModuliSpec::LogSizes(vec![45, 45, 45, 45]),
            p: Some(ModuliSpec::LogSizes(vec![45, 45])),
            xs: Distribution::ternary_hamming_weight(8),
            xe: Distribution::discrete_gaussian(3.2, 19.2),
            ring_type: RingType::Standard,
            default_scale: (1u64 << 40) as f64,
            ntt_flag: true,
        })
        .unwrap()
    }

    #[test]
    fn relinearize_with_grouped_gadget_rows_decrypts_small() {
        let params = grouped_test_params();
        let mut prng = Prng::from_seed([21u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let metadata = MetaData::new(Scale::new(1.0), params.log_n());
        let rlk = RelinearizationKey::generate(&params, &sk, &mut prng, EvaluationKeyParameters::default());
        assert_eq!(rlk.key.gadget.decomposition_rows(), 2);
        assert_eq!(rlk.key.gadget.rows[0].len(), 1);

        let encryptor = Encryptor::new(&params);
        let ct = encryptor
            .encrypt_zero_sk(&sk, params.max_level_q(), metadata, &mut prng, None)
            .unwrap();

        let mut degree2 = ct.clone();
        degree2.parts.push(params.ring_q().new_poly(params.max_level_q()));

        let relinearized = relinearize(&params, &degree2, &rlk).unwrap();

        let decryptor = Decryptor::new(&params);
        let pt = decryptor.decrypt(&relinearized, &sk);
        let centered = params.ring_q().reconstruct_centered(&pt.poly);
        let bound = params.xe().expected_std_dev(params.n()) as i64 * 64 + 128;
        for c in centered {
            let v = c.to_i64().unwrap_or(i64::MAX);
            assert!(v.abs() < bound, "grouped relinearized noise {v} exceeds bound {bound}");
        }
    }

    #[test]
    fn embedding_spreads_coefficients_by_ring_ratio() {
        let small = Poly::from_rows(vec![vec![1, 2, 3, 4]]);
        let large = embed_into_larger_ring(&small, 8);
        assert_eq!(large.row(0), &[1, 0, 2, 0, 3, 0, 4, 0]);
    }
}
