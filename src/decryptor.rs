//! Decryption: the inner product of a ciphertext's parts with ascending
//! powers of the secret key, in NTT+Montgomery form.

use crate::ciphertext::Ciphertext;
use crate::keys::SecretKey;
use crate::params::Parameters;
use crate::plaintext::Plaintext;
use crate::ring::Poly;

pub struct Decryptor<'a> {
    params: &'a Parameters,
}

impl<'a> Decryptor<'a> {
    pub fn new(params: &'a Parameters) -> Self {
        Decryptor { params }
    }

    /// `pt = ct[0] + ct[1]*s + ct[2]*s^2 + ...`, reduced back into
    /// `ct`'s declared domain.
    pub fn decrypt(&self, ct: &Ciphertext, sk: &SecretKey) -> Plaintext {
        let ring_q = self.params.ring_q();
        let level = ct.level();

        let mut parts: Vec<Poly> = ct.parts.clone();
        if !ct.metadata.is_ntt {
            for p in parts.iter_mut() {
                ring_q.ntt_forward(p);
            }
        }
        if !ct.metadata.is_montgomery {
            for p in parts.iter_mut() {
                ring_q.to_montgomery(p);
            }
        }

        let sk_q = sk.q().at_level(level);
        let mut sk_pow = sk_q.clone();
        let mut acc = parts[0].clone();

        for (i, part) in parts.iter().enumerate().skip(1) {
            if i == 1 {
                ring_q.mont_mul_add(&mut acc, part, &sk_q);
            } else {
                let mut next_pow = ring_q.new_poly(level);
                ring_q.mont_mul(&sk_pow, &sk_q, &mut next_pow);
                sk_pow = next_pow;
                ring_q.mont_mul_add(&mut acc, part, &sk_pow);
            }
            // Periodic reduction keeps the Montgomery accumulator within
            // the single-prime modulus at every step; mont_mul_add is
            // already fully reduced, so no extra pass is needed here.
            let _ = i;
        }

        if !ct.metadata.is_montgomery {
            ring_q.from_montgomery(&mut acc);
        }
        if !ct.metadata.is_ntt {
            ring_q.ntt_backward(&mut acc);
        }

        Plaintext::new(acc, ct.metadata)
    }
}
