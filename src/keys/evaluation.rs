//! Evaluation keys and their specializations: relinearization keys (for
//! degree-2 → degree-1 reduction) and Galois keys (for automorphisms),
//! plus the set that an evaluator looks a Galois element up in.

use std::collections::HashMap;

use num_bigint_dig::BigUint;

use crate::error::{Error, Result};
use crate::keys::gadget::{add_poly_times_gadget_vector, GadgetCiphertext};
use crate::keys::secret::SecretKey;
use crate::params::{EvaluationKeyParameters, Parameters};
use crate::ring::{automorphism, Poly, Prng, QpPoly, QpRing, UniformSampler};

#[derive(Debug, Clone)]
pub struct EvaluationKey {
    pub gadget: GadgetCiphertext,
}

impl EvaluationKey {
    /// `skIn` must be in NTT+Montgomery form, Q-part only (the P-part of
    /// `skIn * P * g_{i,j}` is always zero — see the gadget module).
    pub fn generate(
        params: &Parameters,
        sk_in_q: &Poly,
        sk_out: &SecretKey,
        prng: &mut Prng,
        ek_params: EvaluationKeyParameters,
    ) -> Self {
        let level_q = ek_params.level_q.unwrap_or(params.max_level_q());
        let level_p = ek_params.level_p.unwrap_or(params.max_level_p());
        let w = ek_params.base_two_decomposition.unwrap_or(0);

        let mut gct = GadgetCiphertext::zero(params, level_q, level_p, w);
        let ring_q = params.ring_q();
        let ring_p = if level_p >= 0 { params.ring_p() } else { None };
        let qp = QpRing::new(ring_q, ring_p);

        for row in gct.rows.iter_mut() {
            for (c0, c1) in row.iter_mut() {
                Self::fresh_encryption_of_zero(params, &qp, sk_out, prng, level_q, level_p, c0, c1);
            }
        }

        let p_total: Option<BigUint> = ring_p.map(|rp| rp.moduli().iter().map(|m| BigUint::from(m.q())).product());
        add_poly_times_gadget_vector(params, sk_in_q, &mut gct, p_total.as_ref());

        EvaluationKey { gadget: gct }
    }

    fn fresh_encryption_of_zero(
        params: &Parameters,
        qp: &QpRing,
        sk_out: &SecretKey,
        prng: &mut Prng,
        level_q: usize,
        level_p: i32,
        c0: &mut QpPoly,
        c1: &mut QpPoly,
    ) {
        let ring_q = params.ring_q();
        let mut a_q = UniformSampler::sample(prng, ring_q.moduli_at(level_q), params.n());
        ring_q.ntt_forward(&mut a_q);
        ring_q.to_montgomery(&mut a_q);

        let a_p = if level_p >= 0 {
            let ring_p = params.ring_p().expect("level_p >= 0 implies a P ring");
            let mut p = UniformSampler::sample(prng, ring_p.moduli_at(level_p as usize), params.n());
            ring_p.ntt_forward(&mut p);
            ring_p.to_montgomery(&mut p);
            Some(p)
        } else {
            None
        };
        *c1 = QpPoly::new(Some(a_q), a_p);

        let e_coeffs = params.xe().sample_centered(prng, params.n());
        let mut e_q = Poly::from_centered_coeffs(&e_coeffs, ring_q.moduli_at(level_q));
        let e_p = if level_p >= 0 {
            let ring_p = params.ring_p().expect("level_p >= 0 implies a P ring");
            Some(crate::ring::BasisExtender::extend_small_norm(ring_q, ring_p, &e_q))
        } else {
            None
        };
        ring_q.ntt_forward(&mut e_q);
        ring_q.to_montgomery(&mut e_q);
        let e_p = e_p.map(|mut p| {
            let ring_p = params.ring_p().expect("level_p >= 0 implies a P ring");
            ring_p.ntt_forward(&mut p);
            ring_p.to_montgomery(&mut p);
            p
        });
        let e = QpPoly::new(Some(e_q), e_p);

        let mut a_s = qp.zero_like(level_q as i32, level_p);
        qp.mont_mul(c1, &sk_out.data, &mut a_s);
        let mut neg_a_s = qp.zero_like(level_q as i32, level_p);
        qp.neg(&a_s, &mut neg_a_s);
        qp.add(&neg_a_s, &e, c0);
    }
}

#[derive(Debug, Clone)]
pub struct RelinearizationKey {
    pub key: EvaluationKey,
}

impl RelinearizationKey {
    pub fn generate(
        params: &Parameters,
        sk: &SecretKey,
        prng: &mut Prng,
        ek_params: EvaluationKeyParameters,
    ) -> Self {
        let ring_q = params.ring_q();
        let sk_q = sk.q();
        let mut s2 = ring_q.new_poly_full();
        ring_q.mont_mul(sk_q, sk_q, &mut s2);
        let key = EvaluationKey::generate(params, &s2, sk, prng, ek_params);
        RelinearizationKey { key }
    }
}

#[derive(Debug, Clone)]
pub struct GaloisKey {
    pub key: EvaluationKey,
    pub galois_element: u64,
    pub nth_root: u64,
}

impl GaloisKey {
    pub fn generate(
        params: &Parameters,
        sk: &SecretKey,
        galois_element: u64,
        prng: &mut Prng,
        ek_params: EvaluationKeyParameters,
    ) -> Self {
        let g_inv = params.galois_element_inverse(galois_element);
        let perm = automorphism::ntt_domain_auto_index(params.n(), g_inv as i64);
        let sk_in_q = {
            let mut buf = params.ring_q().new_poly_full();
            params.ring_q().automorphism_ntt(sk.q(), &perm, &mut buf);
            buf
        };

        let key = EvaluationKey::generate(params, &sk_in_q, sk, prng, ek_params);
        GaloisKey {
            key,
            galois_element,
            nth_root: 2 * params.n() as u64,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationKeySet {
    pub galois_keys: HashMap<u64, GaloisKey>,
    pub relinearization_key: Option<RelinearizationKey>,
}

impl EvaluationKeySet {
    pub fn new() -> Self {
        EvaluationKeySet::default()
    }

    pub fn insert_galois_key(&mut self, key: GaloisKey) {
        self.galois_keys.insert(key.galois_element, key);
    }

    pub fn galois_key(&self, galois_element: u64, params: &Parameters) -> Result<&GaloisKey> {
        self.galois_keys.get(&galois_element).ok_or_else(|| {
            Error::missing_galois_key(galois_element, params.discrete_log(galois_element))
        })
    }

    pub fn relinearization_key(&self) -> Result<&RelinearizationKey> {
        self.relinearization_key
            .as_ref()
            .ok_or_else(|| Error::Configuration("no relinearization key in this set".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Distribution, ModuliSpec, ParametersLiteral};
    use crate::ring::RingType;

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
    fn relinearization_key_has_full_level_shape() {
        let params = test_params();
        let mut prng = Prng::from_seed([4u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let rlk = RelinearizationKey::generate(&params, &sk, &mut prng, EvaluationKeyParameters::default());
        assert_eq!(rlk.key.gadget.level_q, params.max_level_q());
        assert_eq!(rlk.key.gadget.decomposition_rows(), params.max_level_q() + 1);
    }

    #[test]
    fn galois_key_set_lookup_and_missing_error() {
        let params = test_params();
        let mut prng = Prng::from_seed([5u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let g = params.galois_element(1);
        let gk = GaloisKey::generate(&params, &sk, g, &mut prng, EvaluationKeyParameters::default());

        let mut set = EvaluationKeySet::new();
        set.insert_galois_key(gk);
        assert!(set.galois_key(g, &params).is_ok());
        assert!(set.galois_key(g.wrapping_add(2), &params).is_err());
    }
}
