//! The QP-polynomial: a pair (Q-part, P-part), either of
//! which may be absent (level `-1`). Used for key material and
//! key-switching intermediates.

use crate::ring::poly::Poly;
use crate::ring::rns::RnsRing;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QpPoly {
    pub q: Option<Poly>,
    pub p: Option<Poly>,
}

impl QpPoly {
    pub fn new(q: Option<Poly>, p: Option<Poly>) -> Self {
        QpPoly { q, p }
    }

    pub fn q_only(q: Poly) -> Self {
        QpPoly { q: Some(q), p: None }
    }

    pub fn zero(level_q: i32, level_p: i32, n: usize) -> Self {
        QpPoly {
            q: if level_q >= 0 {
                Some(Poly::zero(level_q as usize + 1, n))
            } else {
                None
            },
            p: if level_p >= 0 {
                Some(Poly::zero(level_p as usize + 1, n))
            } else {
                None
            },
        }
    }

    pub fn level_q(&self) -> i32 {
        self.q.as_ref().map(|p| p.level() as i32).unwrap_or(-1)
    }

    pub fn level_p(&self) -> i32 {
        self.p.as_ref().map(|p| p.level() as i32).unwrap_or(-1)
    }

    pub fn has_p(&self) -> bool {
        self.p.is_some()
    }

    pub fn n(&self) -> usize {
        self.q
            .as_ref()
            .map(|p| p.n())
            .or_else(|| self.p.as_ref().map(|p| p.n()))
            .expect("QpPoly must have at least one part")
    }
}

/// Pairs a `Q` and (optional) `P` ring to provide elementwise operations
/// over [`QpPoly`] values, applying each op independently to whichever
/// parts are present on both operands.
#[derive(Debug, Clone, Copy)]
pub struct QpRing<'a> {
    pub ring_q: &'a RnsRing,
    pub ring_p: Option<&'a RnsRing>,
}

impl<'a> QpRing<'a> {
    pub fn new(ring_q: &'a RnsRing, ring_p: Option<&'a RnsRing>) -> Self {
        QpRing { ring_q, ring_p }
    }

    pub fn zero_like(&self, level_q: i32, level_p: i32) -> QpPoly {
        QpPoly::zero(level_q, level_p, self.ring_q.n())
    }

    pub fn add(&self, a: &QpPoly, b: &QpPoly, out: &mut QpPoly) {
        if let (Some(aq), Some(bq), Some(oq)) = (&a.q, &b.q, out.q.as_mut()) {
            self.ring_q.add(aq, bq, oq);
        }
        if let (Some(ap), Some(bp), Some(op)) = (&a.p, &b.p, out.p.as_mut()) {
            self.ring_p.expect("P-part present without a P ring").add(ap, bp, op);
        }
    }

    pub fn sub(&self, a: &QpPoly, b: &QpPoly, out: &mut QpPoly) {
        if let (Some(aq), Some(bq), Some(oq)) = (&a.q, &b.q, out.q.as_mut()) {
            self.ring_q.sub(aq, bq, oq);
        }
        if let (Some(ap), Some(bp), Some(op)) = (&a.p, &b.p, out.p.as_mut()) {
            self.ring_p.expect("P-part present without a P ring").sub(ap, bp, op);
        }
    }

    pub fn neg(&self, a: &QpPoly, out: &mut QpPoly) {
        if let (Some(aq), Some(oq)) = (&a.q, out.q.as_mut()) {
            self.ring_q.neg(aq, oq);
        }
        if let (Some(ap), Some(op)) = (&a.p, out.p.as_mut()) {
            self.ring_p.expect("P-part present without a P ring").neg(ap, op);
        }
    }

    pub fn ntt_forward(&self, a: &mut QpPoly) {
        if let Some(q) = a.q.as_mut() {
            self.ring_q.ntt_forward(q);
        }
        if let Some(p) = a.p.as_mut() {
            self.ring_p.expect("P-part present without a P ring").ntt_forward(p);
        }
    }

    pub fn ntt_backward(&self, a: &mut QpPoly) {
        if let Some(q) = a.q.as_mut() {
            self.ring_q.ntt_backward(q);
        }
        if let Some(p) = a.p.as_mut() {
            self.ring_p.expect("P-part present without a P ring").ntt_backward(p);
        }
    }

    pub fn to_montgomery(&self, a: &mut QpPoly) {
        if let Some(q) = a.q.as_mut() {
            self.ring_q.to_montgomery(q);
        }
        if let Some(p) = a.p.as_mut() {
            self.ring_p.expect("P-part present without a P ring").to_montgomery(p);
        }
    }

    pub fn from_montgomery(&self, a: &mut QpPoly) {
        if let Some(q) = a.q.as_mut() {
            self.ring_q.from_montgomery(q);
        }
        if let Some(p) = a.p.as_mut() {
            self.ring_p.expect("P-part present without a P ring").from_montgomery(p);
        }
    }

    /// Montgomery coefficient product, applied independently to each
    /// present part (both operands must agree on which parts are present).
    pub fn mont_mul(&self, a: &QpPoly, b: &QpPoly, out: &mut QpPoly) {
        if let (Some(aq), Some(bq), Some(oq)) = (&a.q, &b.q, out.q.as_mut()) {
            self.ring_q.mont_mul(aq, bq, oq);
        }
        if let (Some(ap), Some(bp), Some(op)) = (&a.p, &b.p, out.p.as_mut()) {
            self.ring_p.expect("P-part present without a P ring").mont_mul(ap, bp, op);
        }
    }

    pub fn mont_mul_add(&self, acc: &mut QpPoly, a: &QpPoly, b: &QpPoly) {
        if let (Some(aq), Some(bq), Some(accq)) = (&a.q, &b.q, acc.q.as_mut()) {
            self.ring_q.mont_mul_add(accq, aq, bq);
        }
        if let (Some(ap), Some(bp), Some(accp)) = (&a.p, &b.p, acc.p.as_mut()) {
            self.ring_p.expect("P-part present without a P ring").mont_mul_add(accp, ap, bp);
        }
    }
}
