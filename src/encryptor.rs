//! Produces fresh encryptions and fresh encryptions of zero, under either
//! a secret key or a public key.
//!
//! Domain convention used throughout this crate: the NTT transform
//! ([`crate::ring::RnsRing::ntt_forward`]/`ntt_backward`) always operates
//! on plain (non-Montgomery) coefficients; Montgomery conversion is a
//! separate, domain-independent step applied after `ntt_forward` (to
//! enter Montgomery+NTT) or before `ntt_backward` (to leave it). Anything
//! that needs plain arithmetic — CRT reconstruction, modulus-down — must
//! be converted out of Montgomery form first.

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::keys::{PublicKey, SecretKey};
use crate::metadata::MetaData;
use crate::params::Parameters;
use crate::plaintext::Plaintext;
use crate::ring::{BasisExtender, Poly, Prng, QpPoly, QpRing, UniformSampler};

pub struct Encryptor<'a> {
    params: &'a Parameters,
}

impl<'a> Encryptor<'a> {
    pub fn new(params: &'a Parameters) -> Self {
        Encryptor { params }
    }

    /// Secret-key encryption of zero. `c1_prng` overrides the uniform
    /// source for `c1` (common-reference-polynomial encryption,
    /// `WithPRNG`); when `None`, `noise_prng` supplies it too.
    pub fn encrypt_zero_sk(
        &self,
        sk: &SecretKey,
        level: usize,
        metadata: MetaData,
        noise_prng: &mut Prng,
        c1_prng: Option<&mut Prng>,
    ) -> Result<Ciphertext> {
        if level > self.params.max_level_q() {
            return Err(Error::Level(format!(
                "level {level} exceeds max Q level {}",
                self.params.max_level_q()
            )));
        }
        let ring_q = self.params.ring_q();
        let moduli = ring_q.moduli_at(level);

        let mut c1 = match c1_prng {
            Some(prng) => UniformSampler::sample(prng, moduli, self.params.n()),
            None => UniformSampler::sample(noise_prng, moduli, self.params.n()),
        };
        ring_q.ntt_forward(&mut c1);
        ring_q.to_montgomery(&mut c1);

        let e_coeffs = self.params.xe().sample_centered(noise_prng, self.params.n());
        let mut e = Poly::from_centered_coeffs(&e_coeffs, moduli);
        ring_q.ntt_forward(&mut e);
        ring_q.to_montgomery(&mut e);

        let sk_row = sk.q().at_level(level);
        let mut c1s = ring_q.new_poly(level);
        ring_q.mont_mul(&c1, &sk_row, &mut c1s);
        let mut c0 = ring_q.new_poly(level);
        ring_q.neg(&c1s, &mut c0);
        let mut c0_plus_e = ring_q.new_poly(level);
        ring_q.add(&c0, &e, &mut c0_plus_e);

        self.finish(c0_plus_e, c1, level, metadata)
    }

    /// Public-key encryption of zero. If `P` is configured: sample `u` in
    /// Q, extend it into P, multiply both `pk` parts by `u` in QP, then
    /// modulus-down into Q (slightly less noise than Q-only encryption).
    /// If no P is configured, encrypt directly in Q.
    pub fn encrypt_zero_pk(
        &self,
        pk: &PublicKey,
        level: usize,
        metadata: MetaData,
        prng: &mut Prng,
    ) -> Result<Ciphertext> {
        if level > self.params.max_level_q() {
            return Err(Error::Level(format!(
                "level {level} exceeds max Q level {}",
                self.params.max_level_q()
            )));
        }
        let ring_q = self.params.ring_q();

        match self.params.ring_p() {
            None => {
                let moduli = ring_q.moduli_at(level);
                let u_coeffs = self.params.xs().sample_centered(prng, self.params.n());
                let mut u = Poly::from_centered_coeffs(&u_coeffs, moduli);
                ring_q.ntt_forward(&mut u);
                ring_q.to_montgomery(&mut u);

                let pk0 = pk.pk0.q.as_ref().expect("pk always has a Q-part").at_level(level);
                let pk1 = pk.pk1.q.as_ref().expect("pk always has a Q-part").at_level(level);
                let mut c0 = ring_q.new_poly(level);
                let mut c1 = ring_q.new_poly(level);
                ring_q.mont_mul(&u, &pk0, &mut c0);
                ring_q.mont_mul(&u, &pk1, &mut c1);

                self.add_fresh_error_q(&mut c0, level, prng);
                self.add_fresh_error_q(&mut c1, level, prng);
                self.finish(c0, c1, level, metadata)
            }
            Some(ring_p) => {
                let qp = QpRing::new(ring_q, Some(ring_p));
                let moduli = ring_q.moduli_at(level);
                let u_coeffs = self.params.xs().sample_centered(prng, self.params.n());
                let mut u_q = Poly::from_centered_coeffs(&u_coeffs, moduli);
                let u_p = BasisExtender::extend_small_norm(ring_q, ring_p, &u_q);
                ring_q.ntt_forward(&mut u_q);
                ring_q.to_montgomery(&mut u_q);
                let mut u_p = u_p;
                ring_p.ntt_forward(&mut u_p);
                ring_p.to_montgomery(&mut u_p);
                let u = QpPoly::new(Some(u_q), Some(u_p));

                let mut c0 = qp.zero_like(level as i32, ring_p.level() as i32);
                let mut c1 = qp.zero_like(level as i32, ring_p.level() as i32);
                qp.mont_mul(&u, &pk.pk0, &mut c0);
                qp.mont_mul(&u, &pk.pk1, &mut c1);

                qp.from_montgomery(&mut c0);
                qp.from_montgomery(&mut c1);
                qp.ntt_backward(&mut c0);
                qp.ntt_backward(&mut c1);

                self.add_fresh_error_qp(&mut c0, prng);
                self.add_fresh_error_qp(&mut c1, prng);

                let c0_q = BasisExtender::mod_down_qp_to_q(ring_q, ring_p, &c0);
                let c1_q = BasisExtender::mod_down_qp_to_q(ring_q, ring_p, &c1);

                self.finish(c0_q, c1_q, level, metadata)
            }
        }
    }

    fn add_fresh_error_q(&self, target: &mut Poly, level: usize, prng: &mut Prng) {
        let ring_q = self.params.ring_q();
        let e_coeffs = self.params.xe().sample_centered(prng, self.params.n());
        let mut e = Poly::from_centered_coeffs(&e_coeffs, ring_q.moduli_at(level));
        ring_q.ntt_forward(&mut e);
        ring_q.to_montgomery(&mut e);
        let mut sum = ring_q.new_poly(level);
        ring_q.add(target, &e, &mut sum);
        *target = sum;
    }

    fn add_fresh_error_qp(&self, target: &mut QpPoly, prng: &mut Prng) {
        let ring_q = self.params.ring_q();
        let ring_p = self.params.ring_p().expect("QP error requires a P ring");
        let e_coeffs = self.params.xe().sample_centered(prng, self.params.n());
        let e_q = Poly::from_centered_coeffs(&e_coeffs, ring_q.moduli_at(target.level_q() as usize));
        let e_p = BasisExtender::extend_small_norm(ring_q, ring_p, &e_q);

        let q_target = target.q.as_mut().expect("QP error requires a Q-part");
        let mut sum_q = ring_q.new_poly(q_target.level());
        ring_q.add(q_target, &e_q, &mut sum_q);
        *q_target = sum_q;

        let p_target = target.p.as_mut().expect("QP error requires a P-part");
        let mut sum_p = ring_p.new_poly(p_target.level());
        ring_p.add(p_target, &e_p, &mut sum_p);
        *p_target = sum_p;
    }

    /// Converts `(c0, c1)` (plain, time-domain) into the ciphertext's
    /// declared metadata domain and returns the assembled [`Ciphertext`].
    fn finish(&self, mut c0: Poly, mut c1: Poly, level: usize, metadata: MetaData) -> Result<Ciphertext> {
        let ring_q = self.params.ring_q();
        if metadata.is_ntt {
            ring_q.ntt_forward(&mut c0);
            ring_q.ntt_forward(&mut c1);
        }
        if metadata.is_montgomery {
            ring_q.to_montgomery(&mut c0);
            ring_q.to_montgomery(&mut c1);
        }
        debug_assert_eq!(c0.level(), level);
        Ok(Ciphertext::new(vec![c0, c1], metadata))
    }

    /// Encrypts `pt` into `ct`: encrypts zero at `min(pt.level, ct.level)`
    /// then adds the plaintext into `ct[0]`, transforming `pt` into `ct`'s
    /// domain as needed.
    pub fn encrypt(&self, pt: &Plaintext, ct: &mut Ciphertext) -> Result<()> {
        let ring_q = self.params.ring_q();
        let level = pt.level().min(ct.level());
        let mut pt_poly = pt.poly.at_level(level);
        if pt.metadata.is_ntt != ct.metadata.is_ntt {
            if ct.metadata.is_ntt {
                ring_q.ntt_forward(&mut pt_poly);
            } else {
                ring_q.ntt_backward(&mut pt_poly);
            }
        }
        if pt.metadata.is_montgomery != ct.metadata.is_montgomery {
            if ct.metadata.is_montgomery {
                ring_q.to_montgomery(&mut pt_poly);
            } else {
                ring_q.from_montgomery(&mut pt_poly);
            }
        }
        let mut sum = ring_q.new_poly(level);
        ring_q.add(ct.at(0), &pt_poly, &mut sum);
        *ct.at_mut(0) = sum;
        Ok(())
    }
}
