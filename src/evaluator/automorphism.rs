//! Applying a Galois automorphism to a ciphertext: key-switch `ct[1]`
//! back under the original secret key with a [`GaloisKey`], then permute
//! both resulting parts with the automorphism's NTT-domain index table.

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::evaluator::gadget_product::{decompose_for_hoisting, gadget_product, gadget_product_hoisted, HoistedDigits};
use crate::keys::GaloisKey;
use crate::params::Parameters;
use crate::ring::automorphism as automorphism_ring;
use crate::ring::Poly;

/// Folds a gadget product's output `(gprod0, gprod1)` back into `ct`'s
/// own `c0` and applies the automorphism's NTT-domain permutation —
/// the tail both the hoisted and non-hoisted automorphism share.
fn finish_automorphism(params: &Parameters, ct: &Ciphertext, galois_element: u64, mut gprod0: Poly, mut gprod1: Poly) -> Ciphertext {
    let ring_q = params.ring_q();
    let mut new_c0 = ct.at(0).clone();
    if ct.metadata.is_montgomery {
        ring_q.from_montgomery(&mut new_c0);
    }
    if ct.metadata.is_ntt {
        ring_q.ntt_backward(&mut new_c0);
    }
    let mut sum0 = ring_q.new_poly(new_c0.level());
    ring_q.add(&new_c0, &gprod0, &mut sum0);
    new_c0 = sum0;

    let perm = automorphism_ring::ntt_domain_auto_index(params.n(), galois_element as i64);
    ring_q.ntt_forward(&mut new_c0);
    ring_q.ntt_forward(&mut gprod1);
    let mut permuted0 = ring_q.new_poly(new_c0.level());
    let mut permuted1 = ring_q.new_poly(gprod1.level());
    ring_q.automorphism_ntt(&new_c0, &perm, &mut permuted0);
    ring_q.automorphism_ntt(&gprod1, &perm, &mut permuted1);

    if !ct.metadata.is_ntt {
        ring_q.ntt_backward(&mut permuted0);
        ring_q.ntt_backward(&mut permuted1);
    }
    if ct.metadata.is_montgomery {
        ring_q.to_montgomery(&mut permuted0);
        ring_q.to_montgomery(&mut permuted1);
    }

    Ciphertext::new(vec![permuted0, permuted1], ct.metadata)
}

fn plain_time_domain_c1(params: &Parameters, ct: &Ciphertext) -> Poly {
    let ring_q = params.ring_q();
    let mut c1 = ct.at(1).clone();
    if ct.metadata.is_montgomery {
        ring_q.from_montgomery(&mut c1);
    }
    if ct.metadata.is_ntt {
        ring_q.ntt_backward(&mut c1);
    }
    c1
}

/// `ct` must carry degree 1. The automorphism is applied in the NTT
/// domain; `ct`'s time/NTT flag is respected on the way in and out.
pub fn apply_automorphism(params: &Parameters, ct: &Ciphertext, galois_key: &GaloisKey) -> Result<Ciphertext> {
    if ct.degree() != 1 {
        return Err(Error::Domain(format!(
            "automorphism requires a degree-1 ciphertext, got degree {}",
            ct.degree()
        )));
    }
    if galois_key.galois_element == 1 {
        return Ok(ct.clone());
    }
    let c1 = plain_time_domain_c1(params, ct);
    let (gprod0, gprod1) = gadget_product(params, &c1, &galois_key.key.gadget);
    Ok(finish_automorphism(params, ct, galois_key.galois_element, gprod0, gprod1))
}

/// Precomputes the reusable half of a hoisted automorphism application:
/// `ct`'s `c1`, decomposed once into gadget digits. Every [`GaloisKey`]
/// with a matching shape (`level_p`/decomposition width; `level_q` is
/// `ct`'s own level) can then be applied to `ct` via
/// [`apply_automorphism_hoisted`] without re-decomposing `c1`.
pub fn hoist(params: &Parameters, ct: &Ciphertext, level_p: i32, base_two_decomposition: u32) -> HoistedDigits {
    let c1 = plain_time_domain_c1(params, ct);
    decompose_for_hoisting(params, &c1, ct.level(), level_p, base_two_decomposition)
}

/// Applies `galois_key` to `ct` reusing digits [`hoist`] already computed
/// for this exact ciphertext — the hoisted key-switching speedup for
/// callers that need the same `ct` automorphed under many different
/// keys (a BSGS diagonal matrix multiplication's baby-step rotations, a
/// binary-tree inner sum's shared round).
pub fn apply_automorphism_hoisted(params: &Parameters, ct: &Ciphertext, digits: &HoistedDigits, galois_key: &GaloisKey) -> Result<Ciphertext> {
    if ct.degree() != 1 {
        return Err(Error::Domain(format!(
            "automorphism requires a degree-1 ciphertext, got degree {}",
            ct.degree()
        )));
    }
    if galois_key.galois_element == 1 {
        return Ok(ct.clone());
    }
    let (gprod0, gprod1) = gadget_product_hoisted(params, digits, &galois_key.key.gadget);
    Ok(finish_automorphism(params, ct, galois_key.galois_element, gprod0, gprod1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decryptor::Decryptor;
    use crate::encryptor::Encryptor;
    use crate::keys::SecretKey;
    use crate::metadata::{MetaData, Scale};
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
    fn automorphism_by_identity_element_decrypts_to_same_noise_floor() {
        let params = test_params();
        let mut prng = Prng::from_seed([12u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let metadata = MetaData::new(Scale::new(1.0), params.log_n());

        let encryptor = Encryptor::new(&params);
        let ct = encryptor
            .encrypt_zero_sk(&sk, params.max_level_q(), metadata, &mut prng, None)
            .unwrap();

        let g = params.galois_element(0);
        let gk = crate::keys::GaloisKey::generate(&params, &sk, g, &mut prng, EvaluationKeyParameters::default());

        let rotated = apply_automorphism(&params, &ct, &gk).unwrap();
        let decryptor = Decryptor::new(&params);
        let pt = decryptor.decrypt(&rotated, &sk);

        use num_traits::ToPrimitive;
        let centered = params.ring_q().reconstruct_centered(&pt.poly);
        let bound = params.xe().expected_std_dev(params.n()) as i64 * 64 + 128;
        for c in centered {
            let v = c.to_i64().unwrap_or(i64::MAX);
            assert!(v.abs() < bound, "rotated decryption noise {v} exceeds bound {bound}");
        }
    }
}
