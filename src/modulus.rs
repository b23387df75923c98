//! Single-prime modular arithmetic context: Montgomery constants, the
//! overflow-margin contract, and NTT-friendly prime search.

use num_bigint_dig::algorithms::mod_inverse;
use num_bigint_dig::prime::probably_prime;
use num_bigint_dig::BigInt;
use num_traits::{One, Signed, ToPrimitive};

use crate::error::{Error, Result};

/// Montgomery context for one RNS prime `q`.
///
/// `q` must be odd (every NTT-friendly prime used here is, since it is
/// `k*2N + 1`). Montgomery radix is `R = 2^64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modulus {
    q: u64,
    /// `R^2 mod q`, used to move values into Montgomery form.
    r2: u64,
    /// `-q^{-1} mod 2^64`, the Montgomery reduction constant.
    inv: u64,
    /// `floor(2^64 / q)`: how many Montgomery-domain values in `[0, 2q)`
    /// can be summed (via [`Modulus::lazy_add`]) before the accumulator
    /// risks overflowing a `u64`. Exposed so callers (the evaluator's
    /// gadget-product accumulation loops) can insert reduction points.
    overflow_margin: u64,
}

impl Modulus {
    /// Builds a Montgomery context for prime `q`. `q` must be odd and fit
    /// in 60 bits per the parameter invariants.
    pub fn new(q: u64) -> Self {
        debug_assert!(q & 1 == 1, "modulus must be odd: {q}");
        debug_assert!(q < (1u64 << 60), "modulus must fit in 60 bits: {q}");
        let inv = Self::neg_inv_mod_2_64(q);
        let r2 = Self::compute_r2(q);
        // q_i can be as small as a handful of bits in tests; guard against
        // divide-by-zero and keep the margin meaningful (>= 1).
        let overflow_margin = if q <= 1 { u64::MAX } else { (u64::MAX / q).max(1) };
        Modulus {
            q,
            r2,
            inv,
            overflow_margin,
        }
    }

    #[inline]
    pub fn q(&self) -> u64 {
        self.q
    }

    #[inline]
    pub fn overflow_margin(&self) -> u64 {
        self.overflow_margin
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        64 - self.q.leading_zeros()
    }

    /// Plain coefficient-wise reduction `x mod q` for `x < q^2` style
    /// inputs coming from elsewhere; used outside hot loops.
    #[inline]
    pub fn reduce(&self, x: u64) -> u64 {
        x % self.q
    }

    #[inline]
    pub fn add(&self, a: u64, b: u64) -> u64 {
        let s = a + b;
        if s >= self.q {
            s - self.q
        } else {
            s
        }
    }

    #[inline]
    pub fn sub(&self, a: u64, b: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            a + self.q - b
        }
    }

    #[inline]
    pub fn neg(&self, a: u64) -> u64 {
        if a == 0 {
            0
        } else {
            self.q - a
        }
    }

    /// Adds without a final conditional subtraction; the result may reach
    /// up to `2^64 - 1` if the caller ignores [`Modulus::overflow_margin`].
    /// Used by accumulation loops that defer reduction.
    #[inline]
    pub fn lazy_add(&self, a: u64, b: u64) -> u64 {
        a + b
    }

    /// Montgomery reduction: given `t < q * 2^64`, returns `t * R^{-1} mod q`
    /// in `[0, 2q)` (lazy — no final conditional subtraction).
    #[inline]
    pub fn mont_reduce_lazy(&self, t: u128) -> u64 {
        let m = (t as u64).wrapping_mul(self.inv);
        let t2 = (t + (m as u128) * (self.q as u128)) >> 64;
        t2 as u64
    }

    /// Montgomery reduction, fully reduced into `[0, q)`.
    #[inline]
    pub fn mont_reduce(&self, t: u128) -> u64 {
        let r = self.mont_reduce_lazy(t);
        if r >= self.q {
            r - self.q
        } else {
            r
        }
    }

    /// Montgomery multiplication, fully reduced into `[0, q)`.
    #[inline]
    pub fn mont_mul(&self, a: u64, b: u64) -> u64 {
        self.mont_reduce(a as u128 * b as u128)
    }

    /// Montgomery multiplication, lazy result in `[0, 2q)`.
    #[inline]
    pub fn mont_mul_lazy(&self, a: u64, b: u64) -> u64 {
        self.mont_reduce_lazy(a as u128 * b as u128)
    }

    /// `acc + a*b`, reduced fully into `[0, q)`. The "add" Montgomery
    /// variant of the accumulation operation set.
    #[inline]
    pub fn mont_mul_add(&self, acc: u64, a: u64, b: u64) -> u64 {
        self.add(acc, self.mont_mul(a, b))
    }

    /// `acc - a*b`, reduced fully into `[0, q)`. The "subtract" variant.
    #[inline]
    pub fn mont_mul_sub(&self, acc: u64, a: u64, b: u64) -> u64 {
        self.sub(acc, self.mont_mul(a, b))
    }

    /// Converts `x` (plain residue in `[0, q)`) into Montgomery form.
    #[inline]
    pub fn to_montgomery(&self, x: u64) -> u64 {
        self.mont_mul(x, self.r2)
    }

    /// Converts `x` out of Montgomery form back to a plain residue.
    #[inline]
    pub fn from_montgomery(&self, x: u64) -> u64 {
        self.mont_reduce(x as u128)
    }

    /// Modular exponentiation via Montgomery ladder; `base` and the
    /// result are in plain (non-Montgomery) form.
    pub fn pow(&self, base: u64, mut exp: u64) -> u64 {
        let mut b = self.to_montgomery(base % self.q);
        let mut acc = self.to_montgomery(1 % self.q);
        while exp > 0 {
            if exp & 1 == 1 {
                acc = self.mont_mul(acc, b);
            }
            b = self.mont_mul(b, b);
            exp >>= 1;
        }
        self.from_montgomery(acc)
    }

    /// Modular inverse of `x` (plain form), via Fermat's little theorem.
    pub fn inv(&self, x: u64) -> u64 {
        self.pow(x, self.q - 2)
    }

    /// `-q^{-1} mod 2^64` via Newton-Hensel iteration (standard
    /// Montgomery-reduction constant derivation).
    fn neg_inv_mod_2_64(q: u64) -> u64 {
        let mut inv = 1u64;
        for _ in 0..6 {
            inv = inv.wrapping_mul(2u64.wrapping_sub(q.wrapping_mul(inv)));
        }
        inv.wrapping_neg()
    }

    fn compute_r2(q: u64) -> u64 {
        // R = 2^64; R^2 mod q computed via repeated doubling mod q to
        // avoid needing native u128 modulo by a non-power-of-two twice.
        let r_mod_q = ((1u128 << 64) % q as u128) as u64;
        ((r_mod_q as u128 * r_mod_q as u128) % q as u128) as u64
    }
}

/// Searches for `count` distinct primes `q ≡ 1 (mod modulus_step)` of
/// bit-length `log_q`, skipping any already present in `avoid`. Used to
/// generate NTT-friendly moduli for the `Q`/`P` chains from `LogQ`/`LogP`.
///
/// `modulus_step` is `2N` for [`crate::params::RingType::Standard`] and
/// `4N` for [`crate::params::RingType::ConjugateInvariant`].
pub fn generate_ntt_friendly_primes(
    log_q: usize,
    modulus_step: u64,
    count: usize,
    avoid: &[u64],
) -> Result<Vec<u64>> {
    if log_q < 2 || log_q > 61 {
        return Err(Error::Configuration(format!(
            "prime bit-size {log_q} out of range [2, 61]"
        )));
    }
    let upper = if log_q == 64 { u64::MAX } else { (1u64 << log_q) - 1 };
    let lower = 1u64 << (log_q - 1);
    // Largest k such that k*modulus_step + 1 <= upper.
    let mut k = (upper - 1) / modulus_step;
    let mut found = Vec::with_capacity(count);
    loop {
        if k == 0 {
            break;
        }
        let candidate = k * modulus_step + 1;
        if candidate < lower {
            break;
        }
        if !avoid.contains(&candidate) && !found.contains(&candidate) && is_prime(candidate) {
            found.push(candidate);
            if found.len() == count {
                return Ok(found);
            }
        }
        k -= 1;
    }
    Err(Error::Configuration(format!(
        "could not find {count} NTT-friendly primes of bit-size {log_q} with step {modulus_step}"
    )))
}

/// Primality test (Baillie-PSW via `num-bigint-dig`).
pub fn is_prime(candidate: u64) -> bool {
    probably_prime(&BigInt::from(candidate), 20)
}

/// Modular inverse over the big-integer domain, used by parameter
/// derivation code that is not on the arithmetic hot path.
pub fn bigint_mod_inverse(x: i64, modulus: u64) -> Option<u64> {
    let x = BigInt::from(x);
    let m = BigInt::from(modulus);
    let inv = mod_inverse(x, m)?;
    let inv = if inv.is_negative() {
        inv + BigInt::from(modulus)
    } else {
        inv
    };
    inv.to_u64()
}
