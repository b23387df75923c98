//! Gadget ciphertexts: the matrix of QP-polynomial pairs that evaluation
//! keys, relinearization keys, and Galois keys all specialize, plus the
//! `AddPolyTimesGadgetVectorToGadgetCiphertext` construction primitive.
//!
//! A gadget row covers `Parameters::decomposition_group_size(levelP)`
//! consecutive `Q`-primes: `1` when there's no `P` chain (the full-RNS
//! case, `DR = levelQ + 1`, one row per prime), or `levelP + 1` when `P`
//! is configured (hybrid key switching, `DR = ceil((levelQ+1)/(levelP+1))`
//! rows, each row's digit a genuine multi-prime CRT sub-basis value). The
//! grouped case composes with
//! [`crate::ring::BasisExtender::decompose_group`]; the single-prime case
//! still uses [`crate::ring::BasisExtender::decompose_single_row`].

use num_bigint_dig::BigUint;
use num_traits::ToPrimitive;

use crate::params::Parameters;
use crate::ring::{Poly, QpPoly, RnsRing};

#[derive(Debug, Clone)]
pub struct GadgetCiphertext {
    /// `rows[i][j] = (c0, c1)`, `i` the RNS (gadget) row, `j` the base-2
    /// digit.
    pub rows: Vec<Vec<(QpPoly, QpPoly)>>,
    pub base_two_decomposition: u32,
    pub level_q: usize,
    pub level_p: i32,
}

impl GadgetCiphertext {
    pub fn zero(params: &Parameters, level_q: usize, level_p: i32, w: u32) -> Self {
        let dr = params.decomposition_rows(level_q, level_p);
        let rows = (0..dr)
            .map(|i| {
                let (start, count) = params.decomposition_row_range(level_q, level_p, i);
                let group_bits: u32 = (start..start + count).map(|k| params.ring_q().moduli()[k].bits()).sum();
                let dt_i = params.decomposition_cols(group_bits, w, level_p);
                (0..dt_i)
                    .map(|_| {
                        (
                            QpPoly::zero(level_q as i32, level_p, params.n()),
                            QpPoly::zero(level_q as i32, level_p, params.n()),
                        )
                    })
                    .collect()
            })
            .collect();
        GadgetCiphertext {
            rows,
            base_two_decomposition: w,
            level_q,
            level_p,
        }
    }

    pub fn decomposition_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn decomposition_cols(&self, row: usize) -> usize {
        self.rows[row].len()
    }
}

/// `AddPolyTimesGadgetVectorToGadgetCiphertext(skIn, gct)`: adds
/// `skIn * P * g_{i,j}` into the `(0)`-component of every cell `(i,j)`.
///
/// The gadget vector for row `i` is the CRT idempotent of row `i`'s prime
/// group: `1 mod q_k` for every `q_k` in the group, `0 mod q_k` for every
/// `q_k` outside it. So the Q-part contribution collapses to: for each
/// `Q`-prime `q_k` *within* row `i`'s group, add
/// `skIn_row_k * (P mod q_k) * 2^{j*w}` into the Q-part of `gct[i][j].0`
/// at row `k`; every `Q`-prime outside the group is untouched (whatever a
/// digit stores there gets multiplied away during the gadget product,
/// since the key's own Q-part is zero there too). `skIn` must already be
/// in NTT+Montgomery form; `P = 1` when `levelP < 0`.
pub fn add_poly_times_gadget_vector(params: &Parameters, sk_in: &Poly, gct: &mut GadgetCiphertext, p_total: Option<&BigUint>) {
    let ring_q = params.ring_q();
    let level_q = gct.level_q;
    let w = gct.base_two_decomposition;
    let group_size = params.decomposition_group_size(gct.level_p);

    for (i, row) in gct.rows.iter_mut().enumerate() {
        let start = i * group_size;
        let count = group_size.min(level_q + 1 - start);
        for (j, (c0, _c1)) in row.iter_mut().enumerate() {
            let shift = j as u32 * w;
            let q_part = c0.q.as_mut().expect("gadget cell always has a Q-part");
            for k in start..start + count {
                let qi = ring_q.moduli()[k];
                let p_mod_qi = p_total
                    .map(|p| (p % BigUint::from(qi.q())).to_u64().expect("fits u64"))
                    .unwrap_or(1);
                let two_pow = if w == 0 { 1u64 } else { mod_pow2(qi.q(), shift) };
                let scalar = ((p_mod_qi as u128 * two_pow as u128) % qi.q() as u128) as u64;
                let scalar_mont = qi.to_montgomery(scalar);

                let sk_row = sk_in.row(k);
                let out_row = q_part.row_mut(k);
                for t in 0..out_row.len() {
                    out_row[t] = qi.add(out_row[t], qi.mont_mul(sk_row[t], scalar_mont));
                }
            }
        }
    }
}

fn mod_pow2(modulus: u64, exp: u32) -> u64 {
    let mut acc = 1u64 % modulus;
    let mut b = 2u64 % modulus;
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            acc = ((acc as u128 * b as u128) % modulus as u128) as u64;
        }
        b = ((b as u128 * b as u128) % modulus as u128) as u64;
        e >>= 1;
    }
    acc
}

/// The base-2 decomposition vector of a single polynomial, in NTT+Montgomery
/// form, optionally pre-scaled by `P`. Primarily used by the base-2
/// gadget-product branch (`levelP <= 0`, or an explicit decomposition
/// width `w > 0`).
#[derive(Debug, Clone)]
pub struct GadgetPlaintext {
    pub digits: Vec<Poly>,
}

impl GadgetPlaintext {
    pub fn decompose(ring: &RnsRing, input: &Poly, w: u32, digit_count: usize) -> Self {
        let digits = (0..digit_count)
            .map(|j| {
                let mut digit = ring.new_poly(input.level());
                for (i, m) in ring.moduli_at(input.level()).iter().enumerate() {
                    let shift = j as u32 * w.max(1);
                    let two_pow = if w == 0 { 1 } else { mod_pow2(m.q(), shift) };
                    let in_row = input.row(i);
                    let out_row = digit.row_mut(i);
                    for k in 0..out_row.len() {
                        out_row[k] = ((in_row[k] as u128 * two_pow as u128) % m.q() as u128) as u64;
                    }
                }
                ring.ntt_forward(&mut digit);
                ring.to_montgomery(&mut digit);
                digit
            })
            .collect();
        GadgetPlaintext { digits }
    }
}
