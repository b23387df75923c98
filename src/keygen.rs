//! Ergonomic entry point for producing a usable key set: secret, public,
//! relinearization, and (deduplicated, batched) Galois keys.

use crate::keys::{EvaluationKeySet, GaloisKey, PublicKey, RelinearizationKey, SecretKey};
use crate::params::{EvaluationKeyParameters, Parameters};
use crate::ring::Prng;

pub struct KeyGenerator<'a> {
    params: &'a Parameters,
}

impl<'a> KeyGenerator<'a> {
    pub fn new(params: &'a Parameters) -> Self {
        KeyGenerator { params }
    }

    pub fn generate_secret_key(&self, prng: &mut Prng) -> SecretKey {
        SecretKey::generate(self.params, prng)
    }

    pub fn generate_public_key(&self, sk: &SecretKey, prng: &mut Prng) -> PublicKey {
        PublicKey::generate(self.params, sk, prng)
    }

    pub fn generate_relinearization_key(
        &self,
        sk: &SecretKey,
        prng: &mut Prng,
        ek_params: EvaluationKeyParameters,
    ) -> RelinearizationKey {
        RelinearizationKey::generate(self.params, sk, prng, ek_params)
    }

    pub fn generate_galois_key(
        &self,
        sk: &SecretKey,
        galois_element: u64,
        prng: &mut Prng,
        ek_params: EvaluationKeyParameters,
    ) -> GaloisKey {
        GaloisKey::generate(self.params, sk, galois_element, prng, ek_params)
    }

    /// Generates one Galois key per distinct element in `galois_elements`,
    /// skipping duplicates (a caller building a rotation set from several
    /// overlapping sources will often hand in repeats).
    pub fn generate_galois_keys(
        &self,
        sk: &SecretKey,
        galois_elements: &[u64],
        prng: &mut Prng,
        ek_params: EvaluationKeyParameters,
    ) -> EvaluationKeySet {
        log::debug!("generating {} galois key(s)", galois_elements.len());
        let mut set = EvaluationKeySet::new();
        for &g in galois_elements {
            if set.galois_keys.contains_key(&g) {
                continue;
            }
            set.insert_galois_key(self.generate_galois_key(sk, g, prng, ek_params));
        }
        log::debug!("generated {} distinct galois key(s)", set.galois_keys.len());
        set
    }

    /// Builds a full evaluation key set: relinearization plus one Galois
    /// key per requested element.
    pub fn generate_evaluation_key_set(
        &self,
        sk: &SecretKey,
        galois_elements: &[u64],
        prng: &mut Prng,
        ek_params: EvaluationKeyParameters,
    ) -> EvaluationKeySet {
        let mut set = self.generate_galois_keys(sk, galois_elements, prng, ek_params);
        set.relinearization_key = Some(self.generate_relinearization_key(sk, prng, ek_params));
        set
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
    fn deduplicates_repeated_galois_elements() {
        let params = test_params();
        let mut prng = Prng::from_seed([9u8; 32]);
        let keygen = KeyGenerator::new(&params);
        let sk = keygen.generate_secret_key(&mut prng);
        let g = params.galois_element(1);
        let set = keygen.generate_galois_keys(&sk, &[g, g, g], &mut prng, EvaluationKeyParameters::default());
        assert_eq!(set.galois_keys.len(), 1);
    }

    #[test]
    fn full_key_set_has_relinearization_key() {
        let params = test_params();
        let mut prng = Prng::from_seed([10u8; 32]);
        let keygen = KeyGenerator::new(&params);
        let sk = keygen.generate_secret_key(&mut prng);
        let g = params.galois_orthogonal_element();
        let set = keygen.generate_evaluation_key_set(&sk, &[g], &mut prng, EvaluationKeyParameters::default());
        assert!(set.relinearization_key().is_ok());
        assert!(set.galois_key(g, &params).is_ok());
    }
}
