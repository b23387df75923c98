//! The RNS ring `R_Q` (or `R_P`): coefficient arithmetic, Montgomery
//! conversion, NTT, automorphism, scalar multiplication, and CRT
//! reconstruction over the RNS basis `{q_0, ..., q_L}`.

use num_bigint_dig::{BigInt, BigUint};
use num_traits::{Signed, ToPrimitive, Zero};

use crate::modulus::Modulus;
use crate::ring::automorphism;
use crate::ring::ntt::{find_primitive_root, NttTable};
use crate::ring::poly::Poly;

/// The two polynomial rings supported here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RingType {
    /// `Z[X]/(X^N+1)`.
    Standard,
    /// The subring of `Z[X]/(X^{2N}+1)` fixed by `X -> X^{-1}`.
    ConjugateInvariant,
}

/// An RNS ring instance for a fixed dimension `n` and RNS chain.
#[derive(Debug, Clone)]
pub struct RnsRing {
    n: usize,
    ring_type: RingType,
    moduli: Vec<Modulus>,
    ntt: Vec<NttTable>,
}

impl RnsRing {
    pub fn new(n: usize, primes: &[u64], ring_type: RingType) -> Self {
        debug_assert!(n.is_power_of_two());
        let moduli: Vec<Modulus> = primes.iter().map(|&p| Modulus::new(p)).collect();
        let ntt = moduli
            .iter()
            .map(|m| {
                let psi = find_primitive_root(m, (2 * n) as u64);
                NttTable::new(n, *m, psi)
            })
            .collect();
        RnsRing {
            n,
            ring_type,
            moduli,
            ntt,
        }
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn ring_type(&self) -> RingType {
        self.ring_type
    }

    #[inline]
    pub fn level(&self) -> usize {
        self.moduli.len() - 1
    }

    #[inline]
    pub fn moduli(&self) -> &[Modulus] {
        &self.moduli
    }

    #[inline]
    pub fn moduli_at(&self, level: usize) -> &[Modulus] {
        &self.moduli[..=level]
    }

    #[inline]
    pub fn ntt_at(&self, level: usize) -> &[NttTable] {
        &self.ntt[..=level]
    }

    pub fn new_poly(&self, level: usize) -> Poly {
        Poly::zero(level + 1, self.n)
    }

    pub fn new_poly_full(&self) -> Poly {
        self.new_poly(self.level())
    }

    /// `floor(2^64 / max(q_i))` across the rows actually in play at
    /// `level` — the binding overflow margin for lazy accumulation
    /// (the `QiOverflowMargin`/`PiOverflowMargin` bound).
    pub fn overflow_margin(&self, level: usize) -> u64 {
        self.moduli_at(level)
            .iter()
            .map(|m| m.overflow_margin())
            .min()
            .unwrap_or(u64::MAX)
    }

    pub fn add(&self, a: &Poly, b: &Poly, out: &mut Poly) {
        let level = out.level();
        for i in 0..=level {
            let q = &self.moduli[i];
            let (ar, br, or_) = (a.row(i), b.row(i), out.row_mut(i));
            for j in 0..self.n {
                or_[j] = q.add(ar[j], br[j]);
            }
        }
    }

    pub fn sub(&self, a: &Poly, b: &Poly, out: &mut Poly) {
        let level = out.level();
        for i in 0..=level {
            let q = &self.moduli[i];
            let (ar, br, or_) = (a.row(i), b.row(i), out.row_mut(i));
            for j in 0..self.n {
                or_[j] = q.sub(ar[j], br[j]);
            }
        }
    }

    pub fn neg(&self, a: &Poly, out: &mut Poly) {
        let level = out.level();
        for i in 0..=level {
            let q = &self.moduli[i];
            let (ar, or_) = (a.row(i), out.row_mut(i));
            for j in 0..self.n {
                or_[j] = q.neg(ar[j]);
            }
        }
    }

    pub fn ntt_forward(&self, a: &mut Poly) {
        for (row, t) in a.rows_mut().iter_mut().zip(self.ntt.iter()) {
            t.forward(row);
        }
    }

    pub fn ntt_backward(&self, a: &mut Poly) {
        for (row, t) in a.rows_mut().iter_mut().zip(self.ntt.iter()) {
            t.backward(row);
        }
    }

    pub fn ntt_forward_lazy(&self, a: &mut Poly) {
        for (row, t) in a.rows_mut().iter_mut().zip(self.ntt.iter()) {
            t.forward_lazy(row);
        }
    }

    pub fn ntt_backward_lazy(&self, a: &mut Poly) {
        for (row, t) in a.rows_mut().iter_mut().zip(self.ntt.iter()) {
            t.backward_lazy(row);
        }
    }

    pub fn to_montgomery(&self, a: &mut Poly) {
        for (row, q) in a.rows_mut().iter_mut().zip(self.moduli.iter()) {
            for v in row.iter_mut() {
                *v = q.to_montgomery(*v);
            }
        }
    }

    pub fn from_montgomery(&self, a: &mut Poly) {
        for (row, q) in a.rows_mut().iter_mut().zip(self.moduli.iter()) {
            for v in row.iter_mut() {
                *v = q.from_montgomery(*v);
            }
        }
    }

    /// Montgomery coefficient multiplication, plain variant (fully
    /// reduced into `[0, q)`).
    pub fn mont_mul(&self, a: &Poly, b: &Poly, out: &mut Poly) {
        let level = out.level();
        for i in 0..=level {
            let q = &self.moduli[i];
            let (ar, br, or_) = (a.row(i), b.row(i), out.row_mut(i));
            for j in 0..self.n {
                or_[j] = q.mont_mul(ar[j], br[j]);
            }
        }
    }

    /// Montgomery coefficient multiplication, lazy variant (`[0, 2q)`, no
    /// final conditional subtraction).
    pub fn mont_mul_lazy(&self, a: &Poly, b: &Poly, out: &mut Poly) {
        let level = out.level();
        for i in 0..=level {
            let q = &self.moduli[i];
            let (ar, br, or_) = (a.row(i), b.row(i), out.row_mut(i));
            for j in 0..self.n {
                or_[j] = q.mont_mul_lazy(ar[j], br[j]);
            }
        }
    }

    /// `acc += a*b` (Montgomery), fully reduced.
    pub fn mont_mul_add(&self, acc: &mut Poly, a: &Poly, b: &Poly) {
        let level = acc.level();
        for i in 0..=level {
            let q = &self.moduli[i];
            let (ar, br, accr) = (a.row(i), b.row(i), acc.row_mut(i));
            for j in 0..self.n {
                accr[j] = q.mont_mul_add(accr[j], ar[j], br[j]);
            }
        }
    }

    /// `acc -= a*b` (Montgomery), fully reduced.
    pub fn mont_mul_sub(&self, acc: &mut Poly, a: &Poly, b: &Poly) {
        let level = acc.level();
        for i in 0..=level {
            let q = &self.moduli[i];
            let (ar, br, accr) = (a.row(i), b.row(i), acc.row_mut(i));
            for j in 0..self.n {
                accr[j] = q.mont_mul_sub(accr[j], ar[j], br[j]);
            }
        }
    }

    /// `acc += a*b` (Montgomery), lazy add with no reduction — the
    /// accumulator can hold values up to `2^64 - 1`; callers must reduce
    /// within [`RnsRing::overflow_margin`] additions.
    pub fn lazy_add_no_mod(&self, acc: &mut Poly, term: &Poly) {
        let level = acc.level();
        for i in 0..=level {
            let (accr, tr) = (acc.row_mut(i), term.row(i));
            for j in 0..self.n {
                accr[j] = accr[j].wrapping_add(tr[j]);
            }
        }
    }

    /// Reduces an accumulator built via [`RnsRing::lazy_add_no_mod`] back
    /// into `[0, q)` per row.
    pub fn reduce_lazy_accumulator(&self, acc: &mut Poly) {
        let level = acc.level();
        for i in 0..=level {
            let q = &self.moduli[i];
            for v in acc.row_mut(i).iter_mut() {
                *v %= q.q();
            }
        }
    }

    pub fn scalar_mul_u64(&self, a: &Poly, scalar: u64, out: &mut Poly) {
        let level = out.level();
        for i in 0..=level {
            let q = &self.moduli[i];
            let s = q.reduce(scalar);
            let (ar, or_) = (a.row(i), out.row_mut(i));
            for j in 0..self.n {
                or_[j] = ((ar[j] as u128 * s as u128) % q.q() as u128) as u64;
            }
        }
    }

    pub fn scalar_mul_bigint(&self, a: &Poly, scalar: &BigInt, out: &mut Poly) {
        let level = out.level();
        for i in 0..=level {
            let q = &self.moduli[i];
            let s = (scalar.clone() % BigInt::from(q.q()))
                .to_i64()
                .unwrap()
                .rem_euclid(q.q() as i64) as u64;
            let (ar, or_) = (a.row(i), out.row_mut(i));
            for j in 0..self.n {
                or_[j] = ((ar[j] as u128 * s as u128) % q.q() as u128) as u64;
            }
        }
    }

    pub fn automorphism_time(
        &self,
        a: &Poly,
        index: &[usize],
        sign: &[bool],
        out: &mut Poly,
    ) {
        automorphism::apply_time_domain(a, out, index, sign, self.moduli_at(out.level()));
    }

    pub fn automorphism_ntt(&self, a: &Poly, perm: &[usize], out: &mut Poly) {
        automorphism::apply_ntt_domain(a, out, perm);
    }

    /// `q_star_i = Q/q_i` and `q_tilde_i = q_star_i^{-1} mod q_i`, for
    /// `i` in `0..=level` — the CRT reconstruction constants
    /// calls `g_{i,j}`'s non-base-2 factor.
    pub fn crt_constants(&self, level: usize) -> Vec<(BigUint, u64)> {
        let moduli = self.moduli_at(level);
        let q_total: BigUint = moduli.iter().map(|m| BigUint::from(m.q())).product();
        moduli
            .iter()
            .map(|m| {
                let q_star = &q_total / BigUint::from(m.q());
                let q_star_mod_qi = (&q_star % BigUint::from(m.q()))
                    .to_u64()
                    .expect("q_star mod q_i fits in u64");
                let q_tilde = m.inv(q_star_mod_qi);
                (q_star, q_tilde)
            })
            .collect()
    }

    /// Centered big-integer coefficient reconstruction via CRT.
    pub fn reconstruct_centered(&self, a: &Poly) -> Vec<BigInt> {
        let level = a.level();
        let moduli = self.moduli_at(level);
        let q_total: BigUint = moduli.iter().map(|m| BigUint::from(m.q())).product();
        let constants = self.crt_constants(level);
        let half = &q_total / BigUint::from(2u32);

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

    /// Sample standard deviation of the centered coefficient
    /// reconstruction, an error/noise-analysis utility.
    pub fn std_dev(&self, a: &Poly) -> f64 {
        let centered = self.reconstruct_centered(a);
        let values: Vec<f64> = centered.iter().map(|b| b.to_f64().unwrap_or(0.0)).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        var.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> RnsRing {
        RnsRing::new(16, &[0x7fff80001, 0x200000440001], RingType::Standard)
    }

    #[test]
    fn ntt_roundtrip_through_ring() {
        let r = ring();
        let mut a = r.new_poly_full();
        for (i, row) in a.rows_mut().iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = ((i + 1) * (j + 1)) as u64 % r.moduli()[i].q();
            }
        }
        let orig = a.clone();
        r.ntt_forward(&mut a);
        r.ntt_backward(&mut a);
        assert_eq!(a, orig);
    }

    #[test]
    fn crt_reconstruction_recovers_small_integer() {
        let r = ring();
        let mut a = r.new_poly_full();
        a.row_mut(0)[0] = 41;
        a.row_mut(1)[0] = 41 % r.moduli()[1].q();
        let centered = r.reconstruct_centered(&a);
        assert_eq!(centered[0], BigInt::from(41));
    }

    #[test]
    fn crt_reconstruction_handles_negative_values() {
        let r = ring();
        let neg5: i64 = -5;
        let mut a = r.new_poly_full();
        for (i, m) in r.moduli().iter().enumerate() {
            a.row_mut(i)[3] = neg5.rem_euclid(m.q() as i64) as u64;
        }
        let centered = r.reconstruct_centered(&a);
        assert_eq!(centered[3], BigInt::from(-5));
    }
}
