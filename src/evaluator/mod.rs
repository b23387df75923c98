//! Ciphertext-ciphertext and ciphertext-plaintext homomorphic operations:
//! addition/multiplication, relinearization, and automorphism
//! application, all built on the shared [`gadget_product`] primitive.

pub mod automorphism;
pub mod gadget_product;
pub mod relinearize;

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::keys::{EvaluationKeySet, GaloisKey, RelinearizationKey};
use crate::params::Parameters;

/// Holds scratch buffers an evaluator reuses across calls to avoid
/// reallocating full-level polynomials on every operation.
pub struct Evaluator<'a> {
    params: &'a Parameters,
}

impl<'a> Evaluator<'a> {
    pub fn new(params: &'a Parameters) -> Self {
        Evaluator { params }
    }

    /// A cheap clone sharing the same parameters reference; scratch
    /// buffers are not shared, so each clone is safe to hand to an
    /// independent thread.
    pub fn shallow_copy(&self) -> Self {
        Evaluator { params: self.params }
    }

    pub fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        if a.degree() != b.degree() {
            return Err(Error::Domain("ciphertext degree mismatch in add".to_string()));
        }
        let ring_q = self.params.ring_q();
        let parts = a
            .parts
            .iter()
            .zip(b.parts.iter())
            .map(|(pa, pb)| {
                let mut out = ring_q.new_poly(pa.level().min(pb.level()));
                ring_q.add(pa, pb, &mut out);
                out
            })
            .collect();
        Ok(Ciphertext::new(parts, a.metadata))
    }

    pub fn sub(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        if a.degree() != b.degree() {
            return Err(Error::Domain("ciphertext degree mismatch in sub".to_string()));
        }
        let ring_q = self.params.ring_q();
        let parts = a
            .parts
            .iter()
            .zip(b.parts.iter())
            .map(|(pa, pb)| {
                let mut out = ring_q.new_poly(pa.level().min(pb.level()));
                ring_q.sub(pa, pb, &mut out);
                out
            })
            .collect();
        Ok(Ciphertext::new(parts, a.metadata))
    }

    /// Tensor-product multiplication, raising the degree by one per
    /// input (degree 1 x degree 1 -> degree 2). Both inputs must already
    /// be in NTT+Montgomery form; callers needing a degree-1 result
    /// should follow with [`Self::relinearize`].
    pub fn mul(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        if !a.metadata.is_ntt || !b.metadata.is_ntt || !a.metadata.is_montgomery || !b.metadata.is_montgomery {
            return Err(Error::Domain("multiplication requires NTT+Montgomery inputs".to_string()));
        }
        if a.degree() != 1 || b.degree() != 1 {
            return Err(Error::Unsupported("only degree-1 x degree-1 multiplication is supported".to_string()));
        }
        let ring_q = self.params.ring_q();
        let level = a.level().min(b.level());
        let mut out = vec![ring_q.new_poly(level), ring_q.new_poly(level), ring_q.new_poly(level)];

        ring_q.mont_mul(a.at(0), b.at(0), &mut out[0]);

        let mut cross_a = ring_q.new_poly(level);
        let mut cross_b = ring_q.new_poly(level);
        ring_q.mont_mul(a.at(0), b.at(1), &mut cross_a);
        ring_q.mont_mul(a.at(1), b.at(0), &mut cross_b);
        ring_q.add(&cross_a, &cross_b, &mut out[1]);

        ring_q.mont_mul(a.at(1), b.at(1), &mut out[2]);

        Ok(Ciphertext::new(out, a.metadata))
    }

    pub fn relinearize(&self, ct: &Ciphertext, rlk: &RelinearizationKey) -> Result<Ciphertext> {
        relinearize::relinearize(self.params, ct, rlk)
    }

    /// The identity element (`g == 1`) never needs a registered key: the
    /// automorphism it induces is the identity permutation, so the
    /// ciphertext is returned unchanged instead of being routed through a
    /// gadget product.
    pub fn apply_galois(&self, ct: &Ciphertext, galois_element: u64, eks: &EvaluationKeySet) -> Result<Ciphertext> {
        if galois_element == 1 {
            return Ok(ct.clone());
        }
        let gk = eks.galois_key(galois_element, self.params)?;
        self.apply_galois_key(ct, gk)
    }

    pub fn apply_galois_key(&self, ct: &Ciphertext, gk: &GaloisKey) -> Result<Ciphertext> {
        if gk.galois_element == 1 {
            return Ok(ct.clone());
        }
        automorphism::apply_automorphism(self.params, ct, gk)
    }

    /// Precomputes `ct`'s gadget-digit decomposition once so it can be
    /// applied under many different [`GaloisKey`]s without redoing the
    /// expensive half of the key switch each time — the win behind a
    /// BSGS diagonal matrix multiplication's baby-step rotations and a
    /// binary-tree inner sum's shared round, both of which automorph the
    /// same ciphertext under several distinct keys.
    pub fn hoist(&self, ct: &Ciphertext, level_p: i32, base_two_decomposition: u32) -> gadget_product::HoistedDigits {
        automorphism::hoist(self.params, ct, level_p, base_two_decomposition)
    }

    pub fn apply_galois_key_hoisted(&self, ct: &Ciphertext, digits: &gadget_product::HoistedDigits, gk: &GaloisKey) -> Result<Ciphertext> {
        if gk.galois_element == 1 {
            return Ok(ct.clone());
        }
        automorphism::apply_automorphism_hoisted(self.params, ct, digits, gk)
    }

    pub fn apply_galois_hoisted(&self, ct: &Ciphertext, digits: &gadget_product::HoistedDigits, galois_element: u64, eks: &EvaluationKeySet) -> Result<Ciphertext> {
        if galois_element == 1 {
            return Ok(ct.clone());
        }
        let gk = eks.galois_key(galois_element, self.params)?;
        self.apply_galois_key_hoisted(ct, digits, gk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryptor::Encryptor;
    use crate::keys::SecretKey;
    use crate::metadata::{MetaData, Scale};
    use crate::params::{Distribution, ModuliSpec, ParametersLiteral};
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
    fn hoisted_galois_application_matches_non_hoisted() {
        use crate::keys::GaloisKey;
        use crate::params::EvaluationKeyParameters;

        let params = test_params();
        let mut prng = Prng::from_seed([42u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let metadata = MetaData::new(Scale::new(1.0), params.log_n());
        let encryptor = Encryptor::new(&params);
        let ct = encryptor
            .encrypt_zero_sk(&sk, params.max_level_q(), metadata, &mut prng, None)
            .unwrap();

        let mut eks = EvaluationKeySet::new();
        let g3 = params.galois_element(3);
        let g5 = params.galois_element(5);
        eks.insert_galois_key(GaloisKey::generate(&params, &sk, g3, &mut prng, EvaluationKeyParameters::default()));
        eks.insert_galois_key(GaloisKey::generate(&params, &sk, g5, &mut prng, EvaluationKeyParameters::default()));

        let evaluator = Evaluator::new(&params);
        let digits = evaluator.hoist(&ct, params.max_level_p(), 0);

        let direct3 = evaluator.apply_galois(&ct, g3, &eks).unwrap();
        let hoisted3 = evaluator.apply_galois_hoisted(&ct, &digits, g3, &eks).unwrap();
        assert_eq!(direct3.at(0), hoisted3.at(0));
        assert_eq!(direct3.at(1), hoisted3.at(1));

        let direct5 = evaluator.apply_galois(&ct, g5, &eks).unwrap();
        let hoisted5 = evaluator.apply_galois_hoisted(&ct, &digits, g5, &eks).unwrap();
        assert_eq!(direct5.at(0), hoisted5.at(0));
        assert_eq!(direct5.at(1), hoisted5.at(1));
    }

    #[test]
    fn apply_galois_by_identity_needs_no_registered_key() {
        let params = test_params();
        let mut prng = Prng::from_seed([41u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let metadata = MetaData::new(Scale::new(1.0), params.log_n());
        let encryptor = Encryptor::new(&params);
        let ct = encryptor
            .encrypt_zero_sk(&sk, params.max_level_q(), metadata, &mut prng, None)
            .unwrap();

        let eks = EvaluationKeySet::new();
        let evaluator = Evaluator::new(&params);
        let out = evaluator.apply_galois(&ct, 1, &eks).unwrap();
        assert_eq!(out.at(0), ct.at(0));
        assert_eq!(out.at(1), ct.at(1));
    }
}
