//! Gadget product: applies a [`GadgetCiphertext`] to an input polynomial,
//! the shared primitive behind key switching, relinearization, and
//! automorphism evaluation.

use crate::keys::GadgetCiphertext;
use crate::params::Parameters;
use crate::ring::{BasisExtender, Poly, QpPoly, QpRing};

/// Decomposes the `count` `Q`-rows starting at `start` into gadget
/// digits: the single-prime case (`count == 1`) splits that row into
/// `digit_count` base-`2^w` chunks; the grouped case (`count > 1`, hybrid
/// key switching with `P` large enough to force a single digit per row)
/// produces exactly one digit, the group's own CRT sub-basis value.
fn decompose_group_into_qp_digits(
    params: &Parameters,
    cx: &Poly,
    start: usize,
    count: usize,
    w: u32,
    digit_count: usize,
) -> Vec<QpPoly> {
    if count > 1 {
        debug_assert_eq!(digit_count, 1, "grouped gadget rows never use base-2 sub-decomposition");
        let ring_p = params
            .ring_p()
            .expect("a gadget row spanning multiple Q primes only occurs when P is configured");
        return vec![BasisExtender::decompose_group(params.ring_q(), ring_p, cx, start, count)];
    }
    decompose_row_into_qp_digits(params, cx, start, w, digit_count)
}

/// Splits row `row` of `cx` into `digit_count` base-`2^w` chunks and lifts
/// each into the QP form a gadget cell can be multiplied against
/// (`w == 0` means the whole row is the single digit — the full-RNS,
/// one-prime-per-row case).
fn decompose_row_into_qp_digits(
    params: &Parameters,
    cx: &Poly,
    row: usize,
    w: u32,
    digit_count: usize,
) -> Vec<QpPoly> {
    let ring_q = params.ring_q();
    let ring_p = params.ring_p();

    if digit_count == 1 && w == 0 {
        return match ring_p {
            Some(ring_p) => vec![BasisExtender::decompose_single_row(ring_q, ring_p, cx, row)],
            None => {
                let mut q_part = ring_q.new_poly(cx.level());
                q_part.row_mut(row).copy_from_slice(cx.row(row));
                vec![QpPoly::new(Some(q_part), None)]
            }
        };
    }

    let qi = ring_q.moduli()[row];
    let row_vals = cx.row(row).to_vec();
    let mask = if w == 0 || w >= 64 { u64::MAX } else { (1u64 << w) - 1 };
    (0..digit_count)
        .map(|j| {
            let shift = j as u32 * w.max(1);
            let mut q_part = ring_q.new_poly(cx.level());
            let out_q = q_part.row_mut(row);
            let p_rows: Vec<Vec<u64>> = match ring_p {
                Some(ring_p) => {
                    let mut rows = vec![vec![0u64; cx.n()]; ring_p.moduli().len()];
                    for k in 0..cx.n() {
                        let digit = (row_vals[k] >> shift) & mask;
                        out_q[k] = digit % qi.q();
                        for (l, m) in ring_p.moduli().iter().enumerate() {
                            rows[l][k] = digit % m.q();
                        }
                    }
                    rows
                }
                None => {
                    for k in 0..cx.n() {
                        let digit = (row_vals[k] >> shift) & mask;
                        out_q[k] = digit % qi.q();
                    }
                    Vec::new()
                }
            };
            let p_part = ring_p.map(|_| Poly::from_rows(p_rows));
            QpPoly::new(Some(q_part), p_part)
        })
        .collect()
}

/// The per-row, per-digit decomposition of a `cx`, computed once in
/// NTT+Montgomery form and reusable across every gadget product run
/// against a different [`GadgetCiphertext`] of the same shape
/// (`level_q`/`level_p`/decomposition width) — hoisted key switching.
/// Decomposing `cx` is the expensive, key-independent half of a gadget
/// product; an automorphism or relinearization switching the same `cx`
/// under several different keys (a BSGS diagonal matrix multiplication's
/// baby-step rotations, a binary-tree inner sum's shared round) pays for
/// it once instead of once per key.
pub struct HoistedDigits {
    level_q: usize,
    level_p: i32,
    rows: Vec<Vec<QpPoly>>,
}

fn convert_digit_to_ntt_montgomery(params: &Parameters, digit: &mut QpPoly) {
    let ring_q = params.ring_q();
    match params.ring_p() {
        Some(ring_p) => {
            let qp = QpRing::new(ring_q, Some(ring_p));
            qp.ntt_forward(digit);
            qp.to_montgomery(digit);
        }
        None => {
            let q = digit.q.as_mut().expect("Q-only gadget product always has a Q digit");
            ring_q.ntt_forward(q);
            ring_q.to_montgomery(q);
        }
    }
}

/// Decomposes `cx` (plain, time-domain, at `level_q`) into the gadget
/// digits a product against any `level_q`/`level_p`/`w`-shaped
/// [`GadgetCiphertext`] needs, once.
pub fn decompose_for_hoisting(params: &Parameters, cx: &Poly, level_q: usize, level_p: i32, w: u32) -> HoistedDigits {
    let ring_q = params.ring_q();
    let dr = params.decomposition_rows(level_q, level_p);
    let rows = (0..dr)
        .map(|i| {
            let (start, count) = params.decomposition_row_range(level_q, level_p, i);
            let group_bits: u32 = (start..start + count).map(|k| ring_q.moduli()[k].bits()).sum();
            let digit_count = params.decomposition_cols(group_bits, w, level_p);
            let mut digits = decompose_group_into_qp_digits(params, cx, start, count, w, digit_count);
            for digit in digits.iter_mut() {
                convert_digit_to_ntt_montgomery(params, digit);
            }
            digits
        })
        .collect();
    HoistedDigits { level_q, level_p, rows }
}

/// Runs a gadget product against `gct` reusing digits [`decompose_for_hoisting`]
/// already computed for this `cx`. `gct` must share `digits`' exact shape
/// (same `level_q`/`level_p`, same per-row digit counts).
pub fn gadget_product_hoisted(params: &Parameters, digits: &HoistedDigits, gct: &GadgetCiphertext) -> (Poly, Poly) {
    let ring_q = params.ring_q();
    let level_q = gct.level_q;
    debug_assert_eq!(digits.level_q, level_q, "hoisted digits were decomposed at a different level_q");
    debug_assert_eq!(digits.level_p, gct.level_p, "hoisted digits were decomposed at a different level_p");

    match params.ring_p() {
        None => {
            let mut acc0 = ring_q.new_poly(level_q);
            let mut acc1 = ring_q.new_poly(level_q);
            for (i, row) in gct.rows.iter().enumerate() {
                for (j, (c0, c1)) in row.iter().enumerate() {
                    let digit_q = digits.rows[i][j].q.as_ref().expect("Q-only gadget product always has a Q digit");
                    ring_q.mont_mul_add(&mut acc0, digit_q, c0.q.as_ref().unwrap());
                    ring_q.mont_mul_add(&mut acc1, digit_q, c1.q.as_ref().unwrap());
                }
            }
            ring_q.from_montgomery(&mut acc0);
            ring_q.from_montgomery(&mut acc1);
            ring_q.ntt_backward(&mut acc0);
            ring_q.ntt_backward(&mut acc1);
            (acc0, acc1)
        }
        Some(ring_p) => {
            let qp = QpRing::new(ring_q, Some(ring_p));
            let level_p = gct.level_p;
            let mut acc0 = qp.zero_like(level_q as i32, level_p);
            let mut acc1 = qp.zero_like(level_q as i32, level_p);
            for (i, row) in gct.rows.iter().enumerate() {
                for (j, (c0, c1)) in row.iter().enumerate() {
                    let digit = &digits.rows[i][j];
                    qp.mont_mul_add(&mut acc0, digit, c0);
                    qp.mont_mul_add(&mut acc1, digit, c1);
                }
            }
            qp.from_montgomery(&mut acc0);
            qp.from_montgomery(&mut acc1);
            qp.ntt_backward(&mut acc0);
            qp.ntt_backward(&mut acc1);
            let out0 = BasisExtender::mod_down_qp_to_q(ring_q, ring_p, &acc0);
            let out1 = BasisExtender::mod_down_qp_to_q(ring_q, ring_p, &acc1);
            (out0, out1)
        }
    }
}

/// `cx` must be a plain, time-domain polynomial at level `gct.level_q`.
/// Returns `(c0, c1)`, plain, time-domain, in `R_Q`.
pub fn gadget_product(params: &Parameters, cx: &Poly, gct: &GadgetCiphertext) -> (Poly, Poly) {
    let ring_q = params.ring_q();
    let level_q = gct.level_q;

    match params.ring_p() {
        None => {
            let mut acc0 = ring_q.new_poly(level_q);
            let mut acc1 = ring_q.new_poly(level_q);
            for (i, row) in gct.rows.iter().enumerate() {
                let digits = decompose_row_into_qp_digits(params, cx, i, gct.base_two_decomposition, row.len());
                for (j, digit) in digits.into_iter().enumerate() {
                    let mut digit_q = digit.q.expect("Q-only gadget product always has a Q digit");
                    ring_q.ntt_forward(&mut digit_q);
                    ring_q.to_montgomery(&mut digit_q);
                    let (c0, c1) = &row[j];
                    ring_q.mont_mul_add(&mut acc0, &digit_q, c0.q.as_ref().unwrap());
                    ring_q.mont_mul_add(&mut acc1, &digit_q, c1.q.as_ref().unwrap());
                }
            }
            ring_q.from_montgomery(&mut acc0);
            ring_q.from_montgomery(&mut acc1);
            ring_q.ntt_backward(&mut acc0);
            ring_q.ntt_backward(&mut acc1);
            (acc0, acc1)
        }
        Some(ring_p) => {
            let qp = QpRing::new(ring_q, Some(ring_p));
            let level_p = gct.level_p;
            let group_size = params.decomposition_group_size(level_p);
            let mut acc0 = qp.zero_like(level_q as i32, level_p);
            let mut acc1 = qp.zero_like(level_q as i32, level_p);
            for (i, row) in gct.rows.iter().enumerate() {
                let start = i * group_size;
                let count = group_size.min(level_q + 1 - start);
                let digits = decompose_group_into_qp_digits(params, cx, start, count, gct.base_two_decomposition, row.len());
                for (j, mut digit) in digits.into_iter().enumerate() {
                    qp.ntt_forward(&mut digit);
                    qp.to_montgomery(&mut digit);
                    let (c0, c1) = &row[j];
                    qp.mont_mul_add(&mut acc0, &digit, c0);
                    qp.mont_mul_add(&mut acc1, &digit, c1);
                }
            }
            qp.from_montgomery(&mut acc0);
            qp.from_montgomery(&mut acc1);
            qp.ntt_backward(&mut acc0);
            qp.ntt_backward(&mut acc1);
            let out0 = BasisExtender::mod_down_qp_to_q(ring_q, ring_p, &acc0);
            let out1 = BasisExtender::mod_down_qp_to_q(ring_q, ring_p, &acc1);
            (out0, out1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SecretKey;
    use crate::params::{Distribution, EvaluationKeyParameters, ModuliSpec, ParametersLiteral};
    use crate::ring::{Prng, RingType};

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
    fn gadget_product_of_zero_input_is_zero() {
        use crate::keys::EvaluationKey;
        let params = test_params();
        let mut prng = Prng::from_seed([11u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);

        let ek = EvaluationKey::generate(
            &params,
            sk.q(),
            &sk,
            &mut prng,
            EvaluationKeyParameters::default(),
        );

        let cx = params.ring_q().new_poly(params.max_level_q());
        let (c0, c1) = gadget_product(&params, &cx, &ek.gadget);

        let zero = params.ring_q().new_poly(params.max_level_q());
        assert_eq!(c0, zero);
        assert_eq!(c1, zero);
    }

    #[test]
    fn hoisted_gadget_product_matches_non_hoisted_for_two_different_keys() {
        use crate::keys::EvaluationKey;
        let params = test_params();
        let mut prng = Prng::from_seed([22u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let sk2 = SecretKey::generate(&params, &mut prng);

        let ek1 = EvaluationKey::generate(&params, sk.q(), &sk, &mut prng, EvaluationKeyParameters::default());
        let ek2 = EvaluationKey::generate(&params, sk.q(), &sk2, &mut prng, EvaluationKeyParameters::default());

        let mut cx = params.ring_q().new_poly_full();
        cx.row_mut(0)[1] = 7;
        cx.row_mut(1)[2] = 9;

        let level_q = params.max_level_q();
        let level_p = params.max_level_p();
        let digits = decompose_for_hoisting(&params, &cx, level_q, level_p, 0);

        let (c0_plain, c1_plain) = gadget_product(&params, &cx, &ek1.gadget);
        let (c0_hoisted, c1_hoisted) = gadget_product_hoisted(&params, &digits, &ek1.gadget);
        assert_eq!(c0_plain, c0_hoisted);
        assert_eq!(c1_plain, c1_hoisted);

        let (c0_plain2, c1_plain2) = gadget_product(&params, &cx, &ek2.gadget);
        let (c0_hoisted2, c1_hoisted2) = gadget_product_hoisted(&params, &digits, &ek2.gadget);
        assert_eq!(c0_plain2, c0_hoisted2);
        assert_eq!(c1_plain2, c1_hoisted2);
    }
}
