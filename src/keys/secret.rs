//! Secret keys: one QP-polynomial in NTT+Montgomery form, sampled from the
//! parameters' `Xs` distribution.

use crate::params::Parameters;
use crate::ring::{BasisExtender, Prng, QpPoly};

#[derive(Debug, Clone)]
pub struct SecretKey {
    pub data: QpPoly,
}

impl SecretKey {
    /// Samples a fresh secret key: `sk.Q` from `Xs`, with `sk.P` (when `P`
    /// is configured) derived via small-norm basis extension so the same
    /// small coefficients are visible mod every `p_j`.
    pub fn generate(params: &Parameters, prng: &mut Prng) -> Self {
        let coeffs = params.xs().sample_centered(prng, params.n());
        let mut sk_q = crate::ring::Poly::from_centered_coeffs(&coeffs, params.ring_q().moduli());

        let sk_p = params.ring_p().map(|ring_p| {
            BasisExtender::extend_small_norm(params.ring_q(), ring_p, &sk_q)
        });

        params.ring_q().ntt_forward(&mut sk_q);
        params.ring_q().to_montgomery(&mut sk_q);

        let sk_p = sk_p.map(|mut p| {
            let ring_p = params.ring_p().expect("sk_p only built when ring_p present");
            ring_p.ntt_forward(&mut p);
            ring_p.to_montgomery(&mut p);
            p
        });

        SecretKey {
            data: QpPoly::new(Some(sk_q), sk_p),
        }
    }

    pub fn q(&self) -> &crate::ring::Poly {
        self.data.q.as_ref().expect("secret key always has a Q-part")
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
    fn generated_secret_key_has_both_parts() {
        let params = test_params();
        let mut prng = Prng::from_seed([1u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        assert!(sk.data.has_p());
        assert_eq!(sk.q().level(), params.max_level_q());
    }
}
