//! RNS basis extension and modulus-down (`BasisExtender`).
//!
//! Two distinct "lift into QP" operations appear below and they are
//! NOT the same thing:
//!
//! - **Small-norm extension** ([`BasisExtender::extend_small_norm`]):
//!   re-represents an already-small integer (a sampled secret/error) in
//!   more RNS primes without changing its value. Used for `sk.P` and for
//!   extending freshly sampled `u`/`e` into `P` during encryption.
//! - **Scale-and-extend** ([`BasisExtender::scale_and_extend`]): produces
//!   the QP representation of `x * P` directly from RNS residues (no
//!   CRT reconstruction needed, since `P mod q_i` is a per-prime
//!   constant and `x*P mod p_j = 0` for every `p_j | P`). This is the
//!   operation the round-trip property `ModDownQPtoQ(lift_to_QP(x))
//!   == x` is stated against, since it is exactly invertible.
//!
//! [`BasisExtender::mod_down_qp_to_q`] is the general, CRT-based
//! `⌊x·P^{-1}⌉` used by the evaluator (gadget product, automorphism, BSGS)
//! on arbitrary QP values, not just ones produced by `scale_and_extend`.

use num_bigint_dig::{BigInt, BigUint};
use num_traits::{Signed, ToPrimitive, Zero};

use crate::ring::poly::Poly;
use crate::ring::qp::QpPoly;
use crate::ring::rns::RnsRing;

pub struct BasisExtender;

impl BasisExtender {
    /// Re-represents `x` (living in `ring_from`, time domain) in
    /// `ring_to`'s primes, preserving its centered value. Correct only
    /// when `|x|` (centered) is small relative to `ring_to`'s primes —
    /// exactly the "small-norm" contract relied on for
    /// `sk.P` and fresh-error extension.
    pub fn extend_small_norm(ring_from: &RnsRing, ring_to: &RnsRing, x: &Poly) -> Poly {
        let centered = ring_from.reconstruct_centered(x);
        let mut out = ring_to.new_poly_full();
        for (j, c) in centered.iter().enumerate() {
            for (i, m) in ring_to.moduli().iter().enumerate() {
                let qm = BigInt::from(m.q());
                let r = ((c % &qm) + &qm) % &qm;
                out.row_mut(i)[j] = r.to_u64().expect("reduced value fits in u64");
            }
        }
        out
    }

    /// Produces the QP representation of `x * P` directly from `x`'s
    /// Q-residues: the Q-part is `x_i * (P mod q_i) mod q_i` per row, and
    /// the P-part is identically zero (since `p_j | P` for every `p_j`).
    pub fn scale_and_extend(ring_q: &RnsRing, ring_p: &RnsRing, x_q: &Poly) -> QpPoly {
        let p_total: BigUint = ring_p.moduli().iter().map(|m| BigUint::from(m.q())).product();
        let mut out_q = ring_q.new_poly(x_q.level());
        for (i, m) in ring_q.moduli_at(x_q.level()).iter().enumerate() {
            let p_mod_qi = (&p_total % BigUint::from(m.q()))
                .to_u64()
                .expect("P mod q_i fits in u64");
            let row_in = x_q.row(i);
            let row_out = out_q.row_mut(i);
            for j in 0..x_q.n() {
                row_out[j] = ((row_in[j] as u128 * p_mod_qi as u128) % m.q() as u128) as u64;
            }
        }
        QpPoly::new(Some(out_q), Some(ring_p.new_poly_full()))
    }

    /// `⌊x·P^{-1}⌉` reduced into `R_Q`, time domain. `x` must carry both a
    /// Q-part and a P-part.
    pub fn mod_down_qp_to_q(ring_q: &RnsRing, ring_p: &RnsRing, x: &QpPoly) -> Poly {
        let x_q = x.q.as_ref().expect("mod-down requires a Q-part");
        let x_p = x.p.as_ref().expect("mod-down requires a P-part");
        let level_q = x_q.level();

        let combined_rows: Vec<Vec<u64>> = x_q
            .rows()
            .iter()
            .cloned()
            .chain(x_p.rows().iter().cloned())
            .collect();
        let combined = Poly::from_rows(combined_rows);
        let combined_moduli: Vec<crate::modulus::Modulus> = ring_q
            .moduli_at(level_q)
            .iter()
            .chain(ring_p.moduli_at(x_p.level()).iter())
            .copied()
            .collect();

        let centered = reconstruct_centered_with_moduli(&combined, &combined_moduli);
        let p_total: BigInt = ring_p
            .moduli_at(x_p.level())
            .iter()
            .map(|m| BigInt::from(m.q()))
            .product();
        let half_p = &p_total / BigInt::from(2);

        let mut out = ring_q.new_poly(level_q);
        for (j, z) in centered.iter().enumerate() {
            let rounded = round_div(z, &p_total, &half_p);
            for (i, m) in ring_q.moduli_at(level_q).iter().enumerate() {
                let qm = BigInt::from(m.q());
                let r = ((&rounded % &qm) + &qm) % &qm;
                out.row_mut(i)[j] = r.to_u64().expect("reduced value fits in u64");
            }
        }
        out
    }

    /// Full-RNS gadget decomposition of a single Q-row: produces the QP
    /// polynomial whose Q-part is zero except at `row` (copied verbatim
    /// from `cx`), and whose P-part is `cx`'s `row` reduced directly into
    /// each `p_l` (a single-prime value needs no CRT reconstruction, only
    /// reduction). This is the one-row-per-prime case of
    /// `DecomposeSingleNTT`; this crate always decomposes at that
    /// granularity (see the gadget ciphertext module for the rationale).
    pub fn decompose_single_row(ring_q: &RnsRing, ring_p: &RnsRing, cx: &Poly, row: usize) -> QpPoly {
        let mut q_part = ring_q.new_poly(cx.level());
        q_part.row_mut(row).copy_from_slice(cx.row(row));

        let mut p_part = ring_p.new_poly_full();
        for (l, m) in ring_p.moduli().iter().enumerate() {
            let row_in = cx.row(row);
            let row_out = p_part.row_mut(l);
            for j in 0..cx.n() {
                row_out[j] = row_in[j] % m.q();
            }
        }
        QpPoly::new(Some(q_part), Some(p_part))
    }

    /// Generalized gadget decomposition of a group of `count` consecutive
    /// `Q`-rows starting at `start` (the hybrid key-switching case,
    /// `DR < levelQ + 1`, where several `Q`-primes share one gadget row).
    /// The digit for this row is the unique integer `d` in
    /// `[0, Q_group)` congruent to `cx`'s residues within the group — the
    /// group's own CRT sub-basis value, reconstructed unsigned (not
    /// centered: the digit is genuinely non-negative by construction, the
    /// same convention [`Self::decompose_single_row`] uses for its
    /// single-prime digit). Produces the QP polynomial whose Q-part is
    /// `cx`'s rows copied verbatim within the group and zero outside it
    /// (the paired gadget key's Q-part is the group's CRT idempotent —
    /// `0 mod q_k` outside the group — so anything stored there vanishes
    /// during the gadget product regardless), and whose P-part is `d`
    /// reduced into each `p_l`. Reduces to [`Self::decompose_single_row`]
    /// when `count == 1`.
    pub fn decompose_group(ring_q: &RnsRing, ring_p: &RnsRing, cx: &Poly, start: usize, count: usize) -> QpPoly {
        if count == 1 {
            return Self::decompose_single_row(ring_q, ring_p, cx, start);
        }

        let mut q_part = ring_q.new_poly(cx.level());
        for k in start..start + count {
            q_part.row_mut(k).copy_from_slice(cx.row(k));
        }

        let group_rows: Vec<Vec<u64>> = (start..start + count).map(|k| cx.row(k).to_vec()).collect();
        let group_poly = Poly::from_rows(group_rows);
        let group_moduli: Vec<crate::modulus::Modulus> = ring_q.moduli()[start..start + count].to_vec();
        let values = reconstruct_unsigned_with_moduli(&group_poly, &group_moduli);

        let mut p_part = ring_p.new_poly_full();
        for (l, m) in ring_p.moduli().iter().enumerate() {
            let qm = BigUint::from(m.q());
            let row_out = p_part.row_mut(l);
            for j in 0..cx.n() {
                row_out[j] = (&values[j] % &qm).to_u64().expect("reduced value fits in u64");
            }
        }
        QpPoly::new(Some(q_part), Some(p_part))
    }

    /// `ModDownQPtoQ` with explicit input/output NTT-domain handling, the
    /// four code paths this needs to handle. `x` is consumed in
    /// whichever domain `input_is_ntt` declares and the core division
    /// always happens in the time domain (CRT reconstruction is only
    /// meaningful there); the result is transformed to `output_is_ntt`'s
    /// domain before return.
    pub fn mod_down_qp_to_q_domain(
        ring_q: &RnsRing,
        ring_p: &RnsRing,
        x: &QpPoly,
        input_is_ntt: bool,
        output_is_ntt: bool,
    ) -> Poly {
        let mut x = x.clone();
        if input_is_ntt {
            if let Some(q) = x.q.as_mut() {
                ring_q.ntt_backward(q);
            }
            if let Some(p) = x.p.as_mut() {
                ring_p.ntt_backward(p);
            }
        }
        let mut result = Self::mod_down_qp_to_q(ring_q, ring_p, &x);
        if output_is_ntt {
            ring_q.ntt_forward(&mut result);
        }
        result
    }
}

fn round_div(z: &BigInt, divisor: &BigInt, half: &BigInt) -> BigInt {
    if z.is_negative() {
        -round_div(&(-z), divisor, half)
    } else {
        (z + half) / divisor
    }
}

/// Unsigned CRT reconstruction against an explicit moduli list: each
/// coefficient is returned as the unique value in `[0, prod(moduli))`,
/// no centering. Used by [`BasisExtender::decompose_group`], whose digit
/// values are genuinely non-negative by construction rather than small
/// centered ones.
fn reconstruct_unsigned_with_moduli(a: &Poly, moduli: &[crate::modulus::Modulus]) -> Vec<BigUint> {
    let q_total: BigUint = moduli.iter().map(|m| BigUint::from(m.q())).product();
    let constants: Vec<(BigUint, u64)> = moduli
        .iter()
        .map(|m| {
            let q_star = &q_total / BigUint::from(m.q());
            let q_star_mod_qi = (&q_star % BigUint::from(m.q())).to_u64().expect("fits in u64");
            let q_tilde = m.inv(q_star_mod_qi);
            (q_star, q_tilde)
        })
        .collect();

    (0..a.n())
        .map(|j| {
            let mut acc = BigUint::zero();
            for (i, (q_star, q_tilde)) in constants.iter().enumerate() {
                let qi = moduli[i].q();
                let term = ((a.row(i)[j] as u128 * *q_tilde as u128) % qi as u128) as u64;
                acc += q_star * BigUint::from(term);
            }
            acc % &q_total
        })
        .collect()
}

/// CRT reconstruction against an explicit (non-uniform-ring) moduli list,
/// used by [`BasisExtender::mod_down_qp_to_q`] which needs to combine the
/// `Q` and `P` chains into one CRT system.
fn reconstruct_centered_with_moduli(
    a: &Poly,
    moduli: &[crate::modulus::Modulus],
) -> Vec<BigInt> {
    let q_total: BigUint = moduli.iter().map(|m| BigUint::from(m.q())).product();
    let half = &q_total / BigUint::from(2u32);

    let constants: Vec<(BigUint, u64)> = moduli
        .iter()
        .map(|m| {
            let q_star = &q_total / BigUint::from(m.q());
            let q_star_mod_qi = (&q_star % BigUint::from(m.q()))
                .to_u64()
                .expect("fits in u64");
            let q_tilde = m.inv(q_star_mod_qi);
            (q_star, q_tilde)
        })
        .collect();

    (0..a.n())
        .map(|j| {
            let mut acc = BigUint::zero();
            for (i, (q_star, q_tilde)) in constants.iter().enumerate() {
                let qi = moduli[i].q();
                let term = ((a.row(i)[j] as u128 * *q_tilde as u128) % qi as u128) as u64;
                acc += q_star * BigUint::from(term);
            }
            let acc = acc % &q_total;
            let signed = BigInt::from(acc.clone());
            if acc > half {
                signed - BigInt::from(q_total.clone())
            } else {
                signed
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::rns::RingType;

    fn rings() -> (RnsRing, RnsRing) {
        let q = RnsRing::new(16, &[0x7fff80001, 0x200000440001], RingType::Standard);
        let p = RnsRing::new(16, &[0x3ffffffb80001], RingType::Standard);
        (q, p)
    }

    #[test]
    fn scale_and_extend_then_mod_down_is_identity() {
        let (ring_q, ring_p) = rings();
        let mut x = ring_q.new_poly_full();
        for (i, row) in x.rows_mut().iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = ((i * 97 + j * 13 + 5) as u64) % ring_q.moduli()[i].q();
            }
        }
        let lifted = BasisExtender::scale_and_extend(&ring_q, &ring_p, &x);
        let back = BasisExtender::mod_down_qp_to_q(&ring_q, &ring_p, &lifted);
        assert_eq!(back, x);
    }

    #[test]
    fn small_norm_extension_preserves_value() {
        let (ring_q, ring_p) = rings();
        let mut x = ring_q.new_poly_full();
        // A small centered value: 7 at slot 0, -3 at slot 1.
        for (i, m) in ring_q.moduli().iter().enumerate() {
            x.row_mut(i)[0] = 7;
            x.row_mut(i)[1] = (-3i64).rem_euclid(m.q() as i64) as u64;
        }
        let extended = BasisExtender::extend_small_norm(&ring_q, &ring_p, &x);
        let centered = ring_p.reconstruct_centered(&extended);
        assert_eq!(centered[0], BigInt::from(7));
        assert_eq!(centered[1], BigInt::from(-3));
    }

    #[test]
    fn single_row_decomposition_isolates_one_q_row() {
        let (ring_q, ring_p) = rings();
        let mut x = ring_q.new_poly_full();
        x.row_mut(1)[2] = 555;
        let decomposed = BasisExtender::decompose_single_row(&ring_q, &ring_p, &x, 1);
        let q_part = decomposed.q.unwrap();
        assert_eq!(q_part.row(0)[2], 0);
        assert_eq!(q_part.row(1)[2], 555);
        let p_part = decomposed.p.unwrap();
        assert_eq!(p_part.row(0)[2], 555 % ring_p.moduli()[0].q());
    }

    #[test]
    fn group_decomposition_reconstructs_small_value_across_both_q_primes() {
        let (ring_q, ring_p) = rings();
        let mut cx = ring_q.new_poly_full();
        // A value well below both Q primes: every modulus just reduces
        // to 100 itself, so the group's CRT-reconstructed digit must
        // also read back as exactly 100 everywhere.
        cx.row_mut(0)[3] = 100;
        cx.row_mut(1)[3] = 100;

        let digit = BasisExtender::decompose_group(&ring_q, &ring_p, &cx, 0, 2);

        let q_part = digit.q.unwrap();
        assert_eq!(q_part.row(0)[3], 100);
        assert_eq!(q_part.row(1)[3], 100);

        let p_part = digit.p.unwrap();
        assert_eq!(p_part.row(0)[3], 100 % ring_p.moduli()[0].q());
    }

    #[test]
    fn group_decomposition_of_one_row_matches_single_row_decomposition() {
        let (ring_q, ring_p) = rings();
        let mut cx = ring_q.new_poly_full();
        cx.row_mut(1)[2] = 555;

        let grouped = BasisExtender::decompose_group(&ring_q, &ring_p, &cx, 1, 1);
        let single = BasisExtender::decompose_single_row(&ring_q, &ring_p, &cx, 1);
        assert_eq!(grouped, single);
    }
}
