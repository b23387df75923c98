//! `InnerSum`, `Replicate`, and `Trace`: the three "doubling" combinators
//! built from repeated automorphism application plus addition, each a
//! different traversal of the same Galois subgroup.

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::keys::EvaluationKeySet;
use crate::params::Parameters;

/// Applies `galois_element(exponent)` and adds, for `exponent` in
/// `start..end` doubling the automorphism step each round (`2^i`). This
/// is the shared traversal both `inner_sum` and `trace` specialize.
fn double_and_sum(params: &Parameters, ct: &Ciphertext, eks: &EvaluationKeySet, start: u32, end: u32) -> Result<Ciphertext> {
    let evaluator = Evaluator::new(params);
    let mut acc = ct.clone();
    for i in start..end {
        let g = params.galois_element(1i64 << i);
        let rotated = evaluator.apply_galois(&acc, g, eks)?;
        acc = evaluator.add(&acc, &rotated)?;
    }
    Ok(acc)
}

/// The shared traversal behind arbitrary-`n` [`inner_sum`]/[`replicate`]:
/// builds `y = sum_{t=0}^{n-1} Aut_{g^{sign*t}}(ct)` in `O(log n +
/// popcount(n))` automorphisms instead of `n - 1`, by the standard
/// binary-tree combining trick — `replicate` is literally the same
/// traversal as `inner_sum` with every rotation's sign flipped (summing
/// a ciphertext with only one occupied slot at each widening step is the
/// same arithmetic as broadcasting it).
///
/// `cur` always holds the window-`2^i` combine of `ct` at the start of
/// round `i` (so `cur == ct` for `i == 0`); whenever bit `i` of `n` is
/// set, `cur`'s block is folded into the accumulator, shifted past
/// whatever's already been folded in (`done`), then `cur` itself is
/// doubled to size `2^{i+1}` for the next round — unless this was the
/// last round for `n`, where no caller depends on `cur` again.
fn binary_tree_combine(params: &Parameters, ct: &Ciphertext, eks: &EvaluationKeySet, n: usize, sign: i64) -> Result<Ciphertext> {
    if n == 0 {
        return Err(Error::Domain("combining window must be at least 1".to_string()));
    }
    if n == 1 {
        return Ok(ct.clone());
    }
    let evaluator = Evaluator::new(params);
    let bit_len = usize::BITS - n.leading_zeros();

    let mut cur = ct.clone();
    let mut acc: Option<Ciphertext> = None;
    let mut done: i64 = 0;
    for i in 0..bit_len {
        let merge_needed = (n >> i) & 1 == 1 && acc.is_some();
        let double_needed = i + 1 < bit_len;

        // A round that both merges `cur` into `acc` and doubles `cur`
        // applies two different rotations to the same `cur` — its
        // gadget-digit decomposition is hoisted once and shared by both.
        let digits = if merge_needed && double_needed {
            Some(evaluator.hoist(&cur, params.max_level_p(), 0))
        } else {
            None
        };
        let rotate = |offset: i64, cur: &Ciphertext| -> Result<Ciphertext> {
            let g = params.galois_element(sign * offset);
            match &digits {
                Some(d) => evaluator.apply_galois_hoisted(cur, d, g, eks),
                None => evaluator.apply_galois(cur, g, eks),
            }
        };

        if (n >> i) & 1 == 1 {
            acc = Some(match acc {
                None => {
                    done = 1i64 << i;
                    cur.clone()
                }
                Some(prev) => {
                    let shifted = rotate(done, &cur)?;
                    let merged = evaluator.add(&prev, &shifted)?;
                    done += 1i64 << i;
                    merged
                }
            });
        }
        if double_needed {
            let rotated = rotate(1i64 << i, &cur)?;
            cur = evaluator.add(&cur, &rotated)?;
        }
    }
    Ok(acc.expect("n >= 1 always sets at least one bit"))
}

fn check_window(params: &Parameters, n: usize, op: &str) -> Result<()> {
    if n > 1usize << params.log_n() {
        return Err(Error::Domain(format!("{op} window {n} exceeds ring size 2^{}", params.log_n())));
    }
    Ok(())
}

/// Sums a batched ciphertext's slots over the first `n` of them (`n`
/// need not be a power of two), via `O(log n + popcount(n))`
/// automorphisms — the binary-tree generalization of the classic
/// power-of-two doubling sum.
pub fn inner_sum(params: &Parameters, ct: &Ciphertext, eks: &EvaluationKeySet, n: usize) -> Result<Ciphertext> {
    check_window(params, n, "inner_sum")?;
    binary_tree_combine(params, ct, eks, n, 1)
}

/// Sums a ciphertext over the entire Galois group (the ring-switching
/// trace map `Tr: R -> R^{Gal}`), via `log_n` automorphisms.
pub fn trace(params: &Parameters, ct: &Ciphertext, eks: &EvaluationKeySet) -> Result<Ciphertext> {
    double_and_sum(params, ct, eks, 0, params.log_n() as u32)
}

/// Broadcasts a single occupied slot (at index 0 of an `n`-size group,
/// `n` need not be a power of two) to every slot in that group, via
/// `O(log n + popcount(n))` automorphisms — the Halevi-Shoup replicate
/// pattern, the mirror image of [`inner_sum`]'s traversal.
pub fn replicate(params: &Parameters, ct: &Ciphertext, eks: &EvaluationKeySet, n: usize) -> Result<Ciphertext> {
    check_window(params, n, "replicate")?;
    binary_tree_combine(params, ct, eks, n, -1)
}

/// The shared building block `inner_sum`/`trace`/`replicate` specialize:
/// automorphism by an explicit Galois exponent range, exposed for callers
/// (e.g. custom batched reductions) that need a traversal these three
/// don't cover directly.
pub fn inner_function(params: &Parameters, ct: &Ciphertext, eks: &EvaluationKeySet, start_log: u32, end_log: u32) -> Result<Ciphertext> {
    double_and_sum(params, ct, eks, start_log, end_log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryptor::Encryptor;
    use crate::keys::{GaloisKey, SecretKey};
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

    /// Registers a Galois key for every offset `1..=max_offset` in the
    /// given sign's direction: enough for both the binary-tree
    /// traversal's internal shifts (doubling and merge) and a brute-force
    /// one-rotation-per-term reference to run against the same keys.
    fn eks_for_offsets(params: &Parameters, sk: &SecretKey, prng: &mut Prng, max_offset: i64, sign: i64) -> EvaluationKeySet {
        let mut eks = EvaluationKeySet::new();
        for offset in 1..=max_offset {
            let g = params.galois_element(sign * offset);
            let gk = GaloisKey::generate(params, sk, g, prng, EvaluationKeyParameters::default());
            eks.insert_galois_key(gk);
        }
        eks
    }

    fn brute_force_combine(params: &Parameters, ct: &Ciphertext, eks: &EvaluationKeySet, n: usize, sign: i64) -> Ciphertext {
        let evaluator = Evaluator::new(params);
        let mut acc = ct.clone();
        for t in 1..n as i64 {
            let g = params.galois_element(sign * t);
            let rotated = evaluator.apply_galois(ct, g, eks).unwrap();
            acc = evaluator.add(&acc, &rotated).unwrap();
        }
        acc
    }

    fn fresh_ct(params: &Parameters, sk: &SecretKey, prng: &mut Prng) -> Ciphertext {
        let metadata = MetaData::new(Scale::new(1.0), params.log_n());
        Encryptor::new(params).encrypt_zero_sk(sk, params.max_level_q(), metadata, prng, None).unwrap()
    }

    #[test]
    fn inner_sum_matches_brute_force_for_non_power_of_two_window() {
        let params = test_params();
        let mut prng = Prng::from_seed([61u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let n = 5usize;
        let eks = eks_for_offsets(&params, &sk, &mut prng, n as i64 - 1, 1);
        let ct = fresh_ct(&params, &sk, &mut prng);

        let fast = inner_sum(&params, &ct, &eks, n).unwrap();
        let reference = brute_force_combine(&params, &ct, &eks, n, 1);

        assert_eq!(fast.at(0), reference.at(0));
        assert_eq!(fast.at(1), reference.at(1));
    }

    #[test]
    fn replicate_matches_brute_force_for_non_power_of_two_window() {
        let params = test_params();
        let mut prng = Prng::from_seed([62u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let n = 7usize;
        let eks = eks_for_offsets(&params, &sk, &mut prng, n as i64 - 1, -1);
        let ct = fresh_ct(&params, &sk, &mut prng);

        let fast = replicate(&params, &ct, &eks, n).unwrap();
        let reference = brute_force_combine(&params, &ct, &eks, n, -1);

        assert_eq!(fast.at(0), reference.at(0));
        assert_eq!(fast.at(1), reference.at(1));
    }

    #[test]
    fn inner_sum_of_power_of_two_window_still_works() {
        let params = test_params();
        let mut prng = Prng::from_seed([63u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let n = 4usize;
        let eks = eks_for_offsets(&params, &sk, &mut prng, n as i64 - 1, 1);
        let ct = fresh_ct(&params, &sk, &mut prng);

        let fast = inner_sum(&params, &ct, &eks, n).unwrap();
        let reference = brute_force_combine(&params, &ct, &eks, n, 1);

        assert_eq!(fast.at(0), reference.at(0));
        assert_eq!(fast.at(1), reference.at(1));
    }

    #[test]
    fn inner_sum_rejects_window_past_ring_size() {
        let params = test_params();
        let mut prng = Prng::from_seed([64u8; 32]);
        let sk = SecretKey::generate(&params, &mut prng);
        let eks = EvaluationKeySet::new();
        let ct = fresh_ct(&params, &sk, &mut prng);
        assert!(inner_sum(&params, &ct, &eks, (1usize << params.log_n()) + 1).is_err());
    }
}
