//! `Expand`/`Pack`: converting between one ciphertext whose coefficients
//! encode many values and many ciphertexts each isolating a single one.
//! Not supported over the conjugate-invariant ring: its automorphism
//! group doesn't contain the element expand's recursive split needs.

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::keys::EvaluationKeySet;
use crate::params::Parameters;
use crate::ring::{Poly, RingType};

/// Negacyclic monomial multiplication `X^k`, plain coefficient domain.
pub(crate) fn mul_by_monomial(params: &Parameters, poly: &Poly, k: i64) -> Poly {
    let ring_q = params.ring_q();
    let n = poly.n() as i64;
    let k = k.rem_euclid(2 * n);
    let mut out = ring_q.new_poly(poly.level());
    for (i, m) in ring_q.moduli_at(poly.level()).iter().enumerate() {
        let row_in = poly.row(i);
        let row_out = out.row_mut(i);
        for j in 0..n as usize {
            let total = j as i64 + k;
            let q = total.div_euclid(n);
            let idx = total.rem_euclid(n) as usize;
            row_out[idx] = if q % 2 == 0 {
                m.add(row_out[idx], row_in[j])
            } else {
                m.sub(row_out[idx], row_in[j])
            };
        }
    }
    out
}

fn require_standard_ring(params: &Parameters) -> Result<()> {
    if params.ring_type() == RingType::ConjugateInvariant {
        Err(Error::Unsupported(
            "expand/pack require an automorphism not present over the conjugate-invariant ring".to_string(),
        ))
    } else {
        Ok(())
    }
}

pub(crate) fn ct_poly_op(params: &Parameters, ct: &Ciphertext, f: impl Fn(&Parameters, &Poly, i64) -> Poly, k: i64) -> Ciphertext {
    let parts = ct.parts.iter().map(|p| f(params, p, k)).collect();
    Ciphertext::new(parts, ct.metadata)
}

/// Scales every part of `ct` by the modular inverse of `2^log_count`
/// (per prime). Each level of the expand/pack recursion doubles the
/// signal it carries; this undoes the total factor in one shot instead
/// of dividing at every level.
fn scale_by_inverse_power_of_two(params: &Parameters, ct: &Ciphertext, log_count: u32) -> Ciphertext {
    let ring_q = params.ring_q();
    let parts = ct
        .parts
        .iter()
        .map(|p| {
            let mut out = ring_q.new_poly(p.level());
            for (i, m) in ring_q.moduli_at(p.level()).iter().enumerate() {
                let inv = m.inv(m.pow(2, log_count as u64));
                let row_in = p.row(i);
                let row_out = out.row_mut(i);
                for j in 0..row_in.len() {
                    row_out[j] = ((row_in[j] as u128 * inv as u128) % m.q() as u128) as u64;
                }
            }
            out
        })
        .collect();
    Ciphertext::new(parts, ct.metadata)
}

/// Splits `ct` into `2^log_count` ciphertexts, each isolating one of the
/// first `2^log_count` coefficients in its constant term (the rest
/// driven to zero), using `log_count` automorphisms by the explicit
/// Galois elements `(N >> i) + 1` — the standard power-of-two expand
/// recursion. The Galois keys for those exact elements must already be
/// present in `eks`. Output `k` (`0 <= k < 2^log_count`) holds
/// coefficient `k` of `ct`'s underlying plaintext, unscaled: the
/// recursion's per-level doubling is cancelled up front by pre-scaling
/// the input by `2^{-log_count}`.
pub fn expand(params: &Parameters, ct: &Ciphertext, eks: &EvaluationKeySet, log_count: u32) -> Result<Vec<Ciphertext>> {
    require_standard_ring(params)?;
    let evaluator = Evaluator::new(params);
    let n = params.n() as u64;

    let mut cur = vec![scale_by_inverse_power_of_two(params, ct, log_count)];
    for i in 0..log_count {
        let g = (n >> i) + 1;
        let len = cur.len();
        let mut next: Vec<Option<Ciphertext>> = (0..len * 2).map(|_| None).collect();
        for (a, c) in cur.into_iter().enumerate() {
            let rotated = evaluator.apply_galois(&c, g, eks)?;
            let c0 = evaluator.add(&c, &rotated)?;
            let diff = evaluator.sub(&c, &rotated)?;
            let shift = -(1i64 << i);
            let c1 = ct_poly_op(params, &diff, mul_by_monomial, shift);
            next[a] = Some(c0);
            next[a + len] = Some(c1);
        }
        cur = next.into_iter().map(|c| c.expect("every slot of this level gets filled")).collect();
    }
    Ok(cur)
}

/// The inverse of [`expand`]: folds `2^log_count` single-coefficient
/// ciphertexts back into one. Each recursion level undoes one expand
/// step exactly — `c0 = c + Aut(c)`, `c1 = (c - Aut(c)) * X^{-2^i}`
/// implies `c0 + c1 * X^{2^i} = 2c`, recovering twice the pre-split
/// value with no automorphism needed at this stage. `expand` bakes the
/// matching `2^{-log_count}` normalization into its input, so the two
/// are exact inverses of each other without `pack` needing to scale.
pub fn pack(params: &Parameters, cts: &[Ciphertext], log_count: u32) -> Result<Ciphertext> {
    require_standard_ring(params)?;
    if cts.len() != 1usize << log_count {
        return Err(Error::Domain(format!(
            "pack expected {} ciphertexts, got {}",
            1usize << log_count,
            cts.len()
        )));
    }
    let evaluator = Evaluator::new(params);

    let mut level = cts.to_vec();
    for i in (0..log_count).rev() {
        let half = level.len() / 2;
        let second = level.split_off(half);
        let first = level;
        let mut next = Vec::with_capacity(half);
        for (c0, c1) in first.iter().zip(second.iter()) {
            let shift = 1i64 << i;
            let unshifted = ct_poly_op(params, c1, mul_by_monomial, shift);
            let sum = evaluator.add(c0, &unshifted)?;
            next.push(sum);
        }
        level = next;
    }
    Ok(level.into_iter().next().expect("log_count >= 0 leaves exactly one ciphertext"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decryptor::Decryptor;
    use crate::encryptor::Encryptor;
    use crate::keys::{GaloisKey, SecretKey};
    use crate::metadata::{MetaData, Scale};
    use crate::params::{Distribution, EvaluationKeyParameters, ModuliSpec, ParametersLiteral};
    use crate::plaintext::Plaintext;
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

    fn eks_for_expand(params: &Parameters, sk: &SecretKey, prng: &mut Prng, log_count: u32) -> EvaluationKeySet {
        let n = params.n() as u64;
        let mut eks = EvaluationKeySet::new();
        for i in 0..log_count {
            let g = (n >> i) + 1;
            let gk = GaloisKey::generate(params, sk, g, prng, EvaluationKeyParameters::default());
            eks.insert_galois_key(gk);
        }
        eks
    }

    fn noise_bound(params: &Parameters) -> i64 {
        params.xe().expected_std_dev(params.n()) as i64 * 64 + 128
    }

    fn encrypt_ramp(params: &Parameters, sk: &SecretKey, prng: &mut Prng, metadata: MetaData) -> Ciphertext {
        let coeffs: Vec<i64> = (0..params.n() as i64).collect();
        let pt_poly = Poly::from_centered_coeffs(&coeffs, params.ring_q().moduli_at(params.max_level_q()));
        let pt = Plaintext::new(pt_poly, metadata);
        let encryptor = Encryptor::new(params);
        let mut ct = Ciphertext::zero(params, params.max_level_q(), metadata);
        encryptor.encrypt(&pt, &mut ct).unwrap();
        ct
    }

    #[test]
    fn expand_isolates_each_coefficient_in_natural_order() {
        let params = test_params();
        let mut prng = Prng::from_seed([31u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let metadata = MetaData::new(Scale::new(1.0), params.log_n());
        let log_count = 2u32;
        let eks = eks_for_expand(&params, &sk, &mut prng, log_count);
        let ct = encrypt_ramp(&params, &sk, &mut prng, metadata);

        let expanded = expand(&params, &ct, &eks, log_count).unwrap();
        assert_eq!(expanded.len(), 1usize << log_count);

        let decryptor = Decryptor::new(&params);
        let bound = noise_bound(&params);
        for (k, c) in expanded.iter().enumerate() {
            let pt_out = decryptor.decrypt(c, &sk);
            let centered = params.ring_q().reconstruct_centered(&pt_out.poly);
            let got = centered[0].to_i64().unwrap_or(i64::MAX);
            assert!((got - k as i64).abs() < bound, "expand slot {k}: got {got}, want {k}");
        }
    }

    #[test]
    fn pack_is_the_inverse_of_expand() {
        let params = test_params();
        let mut prng = Prng::from_seed([32u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let metadata = MetaData::new(Scale::new(1.0), params.log_n());
        let log_count = 2u32;
        let eks = eks_for_expand(&params, &sk, &mut prng, log_count);
        let ct = encrypt_ramp(&params, &sk, &mut prng, metadata);

        let expanded = expand(&params, &ct, &eks, log_count).unwrap();
        let packed = pack(&params, &expanded, log_count).unwrap();

        let decryptor = Decryptor::new(&params);
        let pt_out = decryptor.decrypt(&packed, &sk);
        let centered = params.ring_q().reconstruct_centered(&pt_out.poly);
        let bound = noise_bound(&params);
        for (k, c) in centered.iter().enumerate().take(1usize << log_count) {
            let got = c.to_i64().unwrap_or(i64::MAX);
            assert!((got - k as i64).abs() < bound, "packed coeff {k}: got {got}, want {k}");
        }
    }
}
