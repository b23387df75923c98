//! Ring packing: `Split`/`Merge` (switching a ciphertext between ring
//! `R_N` and its half `R_{N/2}` via a real key switch, not a bare
//! coefficient de-interleave) and `Extract`/`Repack` (pulling a single
//! coefficient out of an RLWE ciphertext as an LWE sample, and its
//! structural inverse).
//!
//! `Split`/`Merge` rest on the even/odd ring decomposition `R_N ≅
//! R_{N/2} x R_{N/2}` (`f(X) = f_even(X^2) + X f_odd(X^2)`), but that
//! decomposition alone doesn't commute with the RLWE decryption
//! relation: the convolution `c1 * s mod X^N+1` mixes the even/odd
//! parts of `c1` and `s` together, so de-interleaving `c1` and `s`
//! separately does not produce a ciphertext decryptable under any
//! secret derived from `s`. The fix is a genuine key switch: isolate
//! the even/odd half of the *message* homomorphically (the conjugate
//! automorphism `X -> -X`, still under `sk_N`), then key-switch that
//! ciphertext from `sk_N` to `sk_{N/2}` embedded into `R_N` (a
//! ciphertext whose secret is itself embedded makes the projection
//! `R_N -> R_{N/2}` commute with decryption, since multiplying by an
//! embedded/pure-`Y` operand never produces odd-indexed cross terms —
//! see [`RingSwitchingKey`]). Only after that key switch is the
//! coefficient de-interleave in [`split_poly`]/[`merge_poly`] a valid
//! final projection step.
//!
//! `Extract`/`Repack` here only reconstruct a single ciphertext's own
//! coefficients — they do not implement the general "combine many LWE
//! ciphertexts under independent keys into one RLWE ciphertext" packing
//! construction, which needs its own key-switching keys per input and is
//! out of scope here (see the design notes for the full rationale).

use crate::ciphertext::Ciphertext;
use crate::circuits::expand_pack::{ct_poly_op, mul_by_monomial};
use crate::error::{Error, Result};
use crate::evaluator::relinearize::{apply_evaluation_key, embed_into_larger_ring};
use crate::evaluator::Evaluator;
use crate::keys::{EvaluationKey, GaloisKey, SecretKey};
use crate::metadata::MetaData;
use crate::params::{EvaluationKeyParameters, Parameters};
use crate::ring::{Poly, Prng, QpPoly};

/// A single LWE sample extracted from one coefficient of an RLWE
/// ciphertext: `b + <a, s> = m[index] + e`, `s` being the ring secret's
/// own coefficients. Single-prime only (the top RNS level).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LweSample {
    pub a: Vec<u64>,
    pub b: u64,
    pub index: usize,
}

fn to_plain_time_domain(params: &Parameters, ct: &Ciphertext) -> Ciphertext {
    let ring_q = params.ring_q();
    let mut out = ct.clone();
    for part in out.parts.iter_mut() {
        if ct.metadata.is_montgomery {
            ring_q.from_montgomery(part);
        }
        if ct.metadata.is_ntt {
            ring_q.ntt_backward(part);
        }
    }
    out
}

/// Pulls the coefficient at `index` out of `ct` as a standalone LWE
/// sample. `ct` must be degree 1 and at RNS level 0.
pub fn extract(params: &Parameters, ct: &Ciphertext, index: usize) -> Result<LweSample> {
    if ct.degree() != 1 {
        return Err(Error::Domain("extract requires a degree-1 ciphertext".to_string()));
    }
    if ct.level() != 0 {
        return Err(Error::Unsupported("extract only supports RNS level 0".to_string()));
    }
    let n = params.n();
    if index >= n {
        return Err(Error::Domain(format!("coefficient index {index} out of range for n={n}")));
    }
    let plain = to_plain_time_domain(params, ct);
    let m = params.ring_q().moduli()[0];
    let c0_row = plain.at(0).row(0);
    let c1_row = plain.at(1).row(0);

    let mut a = vec![0u64; n];
    for j in 0..n {
        let diff = index as i64 - j as i64;
        let idx = diff.rem_euclid(n as i64) as usize;
        let v = c1_row[idx];
        a[j] = if diff >= 0 { v } else { m.neg(v) };
    }
    Ok(LweSample { a, b: c0_row[index], index })
}

/// Reconstructs the RLWE ciphertext a single [`LweSample`] was extracted
/// from: inverts the negacyclic reversal `extract` applied to `c1`, and
/// places `b` back at its coefficient index of `c0`.
pub fn repack(params: &Parameters, sample: &LweSample, metadata: MetaData) -> Ciphertext {
    let ring_q = params.ring_q();
    let n = params.n();
    let m = ring_q.moduli()[0];
    let t = sample.index as i64;

    let mut c0 = ring_q.new_poly(0);
    c0.row_mut(0)[sample.index] = sample.b;

    let mut c1 = ring_q.new_poly(0);
    let c1_row = c1.row_mut(0);
    for (j, &a_j) in sample.a.iter().enumerate() {
        let diff = t - j as i64;
        let idx = diff.rem_euclid(n as i64) as usize;
        c1_row[idx] = if diff >= 0 { a_j } else { m.neg(a_j) };
    }

    let mut ct = Ciphertext::new(vec![c0, c1], MetaData::new(metadata.scale, params.log_n()));
    if metadata.is_ntt {
        ring_q.ntt_forward(ct.at_mut(0));
        ring_q.ntt_forward(ct.at_mut(1));
    }
    if metadata.is_montgomery {
        ring_q.to_montgomery(ct.at_mut(0));
        ring_q.to_montgomery(ct.at_mut(1));
    }
    ct.metadata = metadata;
    ct
}

/// De-interleaves a ring-`N` polynomial's even and odd coefficients into
/// two ring-`N/2` polynomials.
fn split_poly(poly: &Poly) -> (Poly, Poly) {
    let half = poly.n() / 2;
    let even_rows: Vec<Vec<u64>> = poly.rows().iter().map(|row| (0..half).map(|k| row[2 * k]).collect()).collect();
    let odd_rows: Vec<Vec<u64>> = poly.rows().iter().map(|row| (0..half).map(|k| row[2 * k + 1]).collect()).collect();
    (Poly::from_rows(even_rows), Poly::from_rows(odd_rows))
}

/// Interleaves two ring-`N/2` polynomials back into one ring-`N`
/// polynomial: the inverse of [`split_poly`].
fn merge_poly(even: &Poly, odd: &Poly) -> Poly {
    let half = even.n();
    let rows: Vec<Vec<u64>> = even
        .rows()
        .iter()
        .zip(odd.rows().iter())
        .map(|(e, o)| {
            let mut row = vec![0u64; half * 2];
            for k in 0..half {
                row[2 * k] = e[k];
                row[2 * k + 1] = o[k];
            }
            row
        })
        .collect();
    Poly::from_rows(rows)
}

/// Embeds a half-ring secret key into the full ring `R_N` via `Y ->
/// X^2` (the same substitution [`embed_into_larger_ring`] applies to
/// ciphertext polynomials), converting through plain, time-domain form
/// on the way. The embedded key is pure in `Y`: all its odd-indexed
/// coefficients (in `X`) are zero, which is exactly the property that
/// lets a ciphertext switched to it project cleanly back to `R_{N/2}`.
fn embed_secret_key(params_n: &Parameters, params_half: &Parameters, sk_half: &SecretKey) -> SecretKey {
    let ring_q_half = params_half.ring_q();
    let ring_q_n = params_n.ring_q();
    let n = params_n.n();

    let mut q_plain = sk_half.q().clone();
    ring_q_half.from_montgomery(&mut q_plain);
    ring_q_half.ntt_backward(&mut q_plain);
    let mut q_embedded = embed_into_larger_ring(&q_plain, n);
    ring_q_n.ntt_forward(&mut q_embedded);
    ring_q_n.to_montgomery(&mut q_embedded);

    let p_embedded = match (&sk_half.data.p, params_n.ring_p(), params_half.ring_p()) {
        (Some(p_half), Some(ring_p_n), Some(ring_p_half)) => {
            let mut p_plain = p_half.clone();
            ring_p_half.from_montgomery(&mut p_plain);
            ring_p_half.ntt_backward(&mut p_plain);
            let mut p_embedded = embed_into_larger_ring(&p_plain, n);
            ring_p_n.ntt_forward(&mut p_embedded);
            ring_p_n.to_montgomery(&mut p_embedded);
            Some(p_embedded)
        }
        _ => None,
    };

    SecretKey {
        data: QpPoly::new(Some(q_embedded), p_embedded),
    }
}

/// The key material `split`/`merge` need: key-switching keys between
/// `sk_N` and `sk_{N/2}` embedded into `R_N`, plus the order-2
/// conjugate Galois key (`g = N+1`, `X -> -X`) that isolates even/odd
/// parity homomorphically before the switch down.
pub struct RingSwitchingKey {
    down: EvaluationKey,
    up: EvaluationKey,
    conjugate: GaloisKey,
}

impl RingSwitchingKey {
    pub fn generate(
        params_n: &Parameters,
        params_half: &Parameters,
        sk_n: &SecretKey,
        sk_half: &SecretKey,
        prng: &mut Prng,
        ek_params: EvaluationKeyParameters,
    ) -> Self {
        let embedded_half = embed_secret_key(params_n, params_half, sk_half);
        let down = EvaluationKey::generate(params_n, sk_n.q(), &embedded_half, prng, ek_params);
        let up = EvaluationKey::generate(params_n, embedded_half.q(), sk_n, prng, ek_params);
        let g = params_n.n() as u64 + 1;
        let conjugate = GaloisKey::generate(params_n, sk_n, g, prng, ek_params);
        RingSwitchingKey { down, up, conjugate }
    }
}

fn key_switch(params: &Parameters, ct: &Ciphertext, ek: &EvaluationKey) -> Ciphertext {
    let ring_q = params.ring_q();
    let (g0, g1) = apply_evaluation_key(ct.at(1), params, ek);
    let mut new_c0 = ring_q.new_poly(ct.level());
    ring_q.add(ct.at(0), &g0, &mut new_c0);
    Ciphertext::new(vec![new_c0, g1], ct.metadata)
}

/// Scales every part of `ct` by the modular inverse of `2` (per prime).
/// The conjugate automorphism's sum/difference doubles each isolated
/// parity half; this undoes that factor.
fn scale_ciphertext_by_half(params: &Parameters, ct: &Ciphertext) -> Ciphertext {
    let ring_q = params.ring_q();
    let parts = ct
        .parts
        .iter()
        .map(|p| {
            let mut out = ring_q.new_poly(p.level());
            for (i, m) in ring_q.moduli_at(p.level()).iter().enumerate() {
                let inv = m.inv(2);
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

/// Splits a ciphertext over `R_N`, decrypting against `sk_N`, into two
/// over `R_{N/2}`, decrypting against `sk_{N/2}`: one holding the even
/// coefficients, one the odd. `ct` must be plain, time-domain, degree 1.
///
/// The even/odd halves of the *plaintext* are isolated homomorphically
/// first, under the original key (`c +/- Aut_{N+1}(c)`, scaled by
/// `1/2`), exactly as [`crate::circuits::expand_pack::expand`] isolates
/// single coefficients. Each half is then key-switched to the embedded
/// `sk_{N/2}` via `rsk.down`; only once the ciphertext's own secret is
/// pure-`Y` does the even-coefficient projection in [`split_poly`]
/// commute with decryption, so it's applied last.
pub fn split(params_n: &Parameters, params_half: &Parameters, ct: &Ciphertext, rsk: &RingSwitchingKey) -> Result<(Ciphertext, Ciphertext)> {
    if ct.metadata.is_ntt {
        return Err(Error::Domain("split requires a time-domain ciphertext".to_string()));
    }
    if ct.degree() != 1 {
        return Err(Error::Domain("split requires a degree-1 ciphertext".to_string()));
    }
    let evaluator = Evaluator::new(params_n);
    let conjugated = evaluator.apply_galois_key(ct, &rsk.conjugate)?;

    let sum = evaluator.add(ct, &conjugated)?;
    let diff = evaluator.sub(ct, &conjugated)?;
    let even_n = scale_ciphertext_by_half(params_n, &sum);
    let odd_shifted_n = scale_ciphertext_by_half(params_n, &diff);
    let odd_n = ct_poly_op(params_n, &odd_shifted_n, mul_by_monomial, -1);

    let even_switched = key_switch(params_n, &even_n, &rsk.down);
    let odd_switched = key_switch(params_n, &odd_n, &rsk.down);

    let half = params_half.n();
    let project = |switched: &Ciphertext| -> Ciphertext {
        let parts = switched.parts.iter().map(|p| split_poly(p).0).collect::<Vec<_>>();
        debug_assert_eq!(parts[0].n(), half);
        Ciphertext::new(parts, switched.metadata)
    };
    Ok((project(&even_switched), project(&odd_switched)))
}

/// The inverse of [`split`]: merges an even and odd `R_{N/2}`
/// ciphertext, each decrypting against `sk_{N/2}`, back into one `R_N`
/// ciphertext decrypting against `sk_N`.
///
/// Each half is first embedded into `R_N` (`Y -> X^2`, a genuine ring
/// homomorphism, unlike the projection `split` ends with) and
/// key-switched up to `sk_N` via `rsk.up`; the odd half is then shifted
/// by `X` and the two added, recovering `f_even(X^2) + X f_odd(X^2)`.
pub fn merge(params_n: &Parameters, even: &Ciphertext, odd: &Ciphertext, rsk: &RingSwitchingKey) -> Result<Ciphertext> {
    if even.metadata.is_ntt || odd.metadata.is_ntt {
        return Err(Error::Domain("merge requires time-domain ciphertexts".to_string()));
    }
    if even.degree() != 1 || odd.degree() != 1 {
        return Err(Error::Domain("merge requires degree-1 ciphertexts".to_string()));
    }
    let n = params_n.n();
    let embed = |ct: &Ciphertext| -> Ciphertext {
        let parts = ct.parts.iter().map(|p| embed_into_larger_ring(p, n)).collect();
        Ciphertext::new(parts, ct.metadata)
    };
    let even_embedded = embed(even);
    let odd_embedded = embed(odd);

    let even_switched = key_switch(params_n, &even_embedded, &rsk.up);
    let odd_switched = key_switch(params_n, &odd_embedded, &rsk.up);
    let odd_shifted = ct_poly_op(params_n, &odd_switched, mul_by_monomial, 1);

    let evaluator = Evaluator::new(params_n);
    evaluator.add(&even_switched, &odd_shifted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decryptor::Decryptor;
    use crate::encryptor::Encryptor;
    use crate::metadata::Scale;
    use crate::params::{Distribution, ModuliSpec, ParametersLiteral};
    use crate::plaintext::Plaintext;
    use crate::ring::RingType;
    use num_traits::ToPrimitive;

    fn test_params(log_n: usize) -> Parameters {
        Parameters::new(ParametersLiteral {
            log_n,
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
    fn extract_then_repack_round_trips() {
        let params = test_params(4);
        let mut prng = Prng::from_seed([14u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let metadata = MetaData::new(Scale::new(1.0), params.log_n());
        let encryptor = Encryptor::new(&params);
        let ct = encryptor.encrypt_zero_sk(&sk, 0, metadata, &mut prng, None).unwrap();

        let sample = extract(&params, &ct, 3).unwrap();
        let rebuilt = repack(&params, &sample, metadata);

        let decryptor = Decryptor::new(&params);
        let original_pt = decryptor.decrypt(&ct, &sk);
        let rebuilt_pt = decryptor.decrypt(&rebuilt, &sk);
        assert_eq!(original_pt.poly.row(0)[3], rebuilt_pt.poly.row(0)[3]);
    }

    fn noise_bound(params: &Parameters) -> i64 {
        params.xe().expected_std_dev(params.n()) as i64 * 256 + 1024
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

    struct SplitFixture {
        params_n: Parameters,
        params_half: Parameters,
        sk_n: SecretKey,
        sk_half: SecretKey,
        rsk: RingSwitchingKey,
        ct: Ciphertext,
    }

    fn split_fixture(seed: u8) -> SplitFixture {
        let params_n = test_params(4);
        let params_half = test_params(3);
        let mut prng = Prng::from_seed([seed; 32]);
        let sk_n = SecretKey::generate(&params_n, &mut prng);
        let sk_half = SecretKey::generate(&params_half, &mut prng);
        let rsk = RingSwitchingKey::generate(&params_n, &params_half, &sk_n, &sk_half, &mut prng, EvaluationKeyParameters::default());
        let metadata = MetaData::new(Scale::new(1.0), params_n.log_n());
        let ct = encrypt_ramp(&params_n, &sk_n, &mut prng, metadata);
        SplitFixture {
            params_n,
            params_half,
            sk_n,
            sk_half,
            rsk,
            ct,
        }
    }

    #[test]
    fn split_decrypts_even_and_odd_halves_under_the_half_ring_key() {
        let f = split_fixture(51);
        let (even, odd) = split(&f.params_n, &f.params_half, &f.ct, &f.rsk).unwrap();
        assert_eq!(even.at(0).n(), f.params_half.n());
        assert_eq!(odd.at(0).n(), f.params_half.n());

        let decryptor = Decryptor::new(&f.params_half);
        let bound = noise_bound(&f.params_half);

        let even_pt = decryptor.decrypt(&even, &f.sk_half);
        let even_centered = f.params_half.ring_q().reconstruct_centered(&even_pt.poly);
        for (k, c) in even_centered.iter().enumerate() {
            let want = (2 * k) as i64;
            let got = c.to_i64().unwrap_or(i64::MAX);
            assert!((got - want).abs() < bound, "even slot {k}: got {got}, want {want}");
        }

        let odd_pt = decryptor.decrypt(&odd, &f.sk_half);
        let odd_centered = f.params_half.ring_q().reconstruct_centered(&odd_pt.poly);
        for (k, c) in odd_centered.iter().enumerate() {
            let want = (2 * k + 1) as i64;
            let got = c.to_i64().unwrap_or(i64::MAX);
            assert!((got - want).abs() < bound, "odd slot {k}: got {got}, want {want}");
        }
    }

    #[test]
    fn split_then_merge_round_trips_under_real_keys() {
        let f = split_fixture(52);
        let (even, odd) = split(&f.params_n, &f.params_half, &f.ct, &f.rsk).unwrap();
        let merged = merge(&f.params_n, &even, &odd, &f.rsk).unwrap();

        let decryptor = Decryptor::new(&f.params_n);
        let bound = noise_bound(&f.params_n);
        let pt = decryptor.decrypt(&merged, &f.sk_n);
        let centered = f.params_n.ring_q().reconstruct_centered(&pt.poly);
        for (k, c) in centered.iter().enumerate() {
            let got = c.to_i64().unwrap_or(i64::MAX);
            assert!((got - k as i64).abs() < bound, "merged coeff {k}: got {got}, want {k}");
        }
    }
}
