//! Public keys: `(pk0, pk1) = (-a*s + e, a)` in QP, NTT+Montgomery form.

use crate::keys::secret::SecretKey;
use crate::params::Parameters;
use crate::ring::{BasisExtender, Poly, Prng, QpPoly, QpRing, UniformSampler};

#[derive(Debug, Clone)]
pub struct PublicKey {
    pub pk0: QpPoly,
    pub pk1: QpPoly,
}

impl PublicKey {
    pub fn generate(params: &Parameters, sk: &SecretKey, prng: &mut Prng) -> Self {
        let ring_q = params.ring_q();
        let ring_p = params.ring_p();
        let qp = QpRing::new(ring_q, ring_p);

        let mut a_q = UniformSampler::sample(prng, ring_q.moduli(), ring_q.n());
        let a_p = ring_p.map(|rp| UniformSampler::sample(prng, rp.moduli(), rp.n()));
        ring_q.ntt_forward(&mut a_q);
        ring_q.to_montgomery(&mut a_q);
        let a_p = a_p.map(|mut p| {
            let rp = ring_p.unwrap();
            rp.ntt_forward(&mut p);
            rp.to_montgomery(&mut p);
            p
        });
        let pk1 = QpPoly::new(Some(a_q), a_p);

        let e_coeffs = params.xe().sample_centered(prng, params.n());
        let mut e_q = Poly::from_centered_coeffs(&e_coeffs, ring_q.moduli());
        let e_p = ring_p.map(|rp| BasisExtender::extend_small_norm(ring_q, rp, &e_q));
        ring_q.ntt_forward(&mut e_q);
        ring_q.to_montgomery(&mut e_q);
        let e_p = e_p.map(|mut p| {
            let rp = ring_p.unwrap();
            rp.ntt_forward(&mut p);
            rp.to_montgomery(&mut p);
            p
        });
        let e = QpPoly::new(Some(e_q), e_p);

        let mut a_s = qp.zero_like(pk1.level_q(), pk1.level_p());
        qp.mont_mul(&pk1, &sk.data, &mut a_s);
        let mut neg_a_s = qp.zero_like(pk1.level_q(), pk1.level_p());
        qp.neg(&a_s, &mut neg_a_s);
        let mut pk0 = qp.zero_like(pk1.level_q(), pk1.level_p());
        qp.add(&neg_a_s, &e, &mut pk0);

        PublicKey { pk0, pk1 }
    }
}
