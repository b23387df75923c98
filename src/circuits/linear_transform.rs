//! Evaluating a linear map over batched slots via its diagonal encoding,
//! naively (one rotation per diagonal) and via baby-step/giant-step
//! (one rotation per `sqrt(diagonal count)`, plus cheap "baby" rotations
//! reused across every giant step).

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::keys::EvaluationKeySet;
use crate::params::Parameters;
use crate::plaintext::Plaintext;

/// One nonzero diagonal of a linear map, encoded as a plaintext and
/// tagged with the (signed, slot-space) rotation it pairs with.
pub struct Diagonal {
    pub shift: i64,
    pub plaintext: Plaintext,
}

fn mul_plain(params: &Parameters, ct: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
    if ct.metadata.is_ntt != pt.metadata.is_ntt || ct.metadata.is_montgomery != pt.metadata.is_montgomery {
        return Err(Error::Domain("ciphertext/plaintext domain mismatch in mul_plain".to_string()));
    }
    let ring_q = params.ring_q();
    let level = ct.level().min(pt.level());
    let pt_row = pt.poly.at_level(level);
    let parts = ct
        .parts
        .iter()
        .map(|part| {
            let mut out = ring_q.new_poly(level);
            if ct.metadata.is_montgomery {
                ring_q.mont_mul(&part.at_level(level), &pt_row, &mut out);
            } else {
                for (i, m) in ring_q.moduli_at(level).iter().enumerate() {
                    let a_row = part.row(i);
                    let b_row = pt_row.row(i);
                    let out_row = out.row_mut(i);
                    for k in 0..a_row.len() {
                        out_row[k] = m.mont_mul(m.to_montgomery(a_row[k]), m.to_montgomery(b_row[k]));
                        out_row[k] = m.from_montgomery(out_row[k]);
                    }
                }
            }
            out
        })
        .collect();
    Ok(Ciphertext::new(parts, ct.metadata))
}

/// `sum_d rotate(ct, d.shift) * d.plaintext`, one rotation per diagonal.
pub fn evaluate_linear_transform(
    params: &Parameters,
    ct: &Ciphertext,
    diagonals: &[Diagonal],
    eks: &EvaluationKeySet,
) -> Result<Ciphertext> {
    let evaluator = Evaluator::new(params);
    let mut acc: Option<Ciphertext> = None;
    for d in diagonals {
        let rotated = if d.shift == 0 {
            ct.clone()
        } else {
            let g = params.galois_element(d.shift);
            evaluator.apply_galois(ct, g, eks)?
        };
        let term = mul_plain(params, &rotated, &d.plaintext)?;
        acc = Some(match acc {
            Some(a) => evaluator.add(&a, &term)?,
            None => term,
        });
    }
    acc.ok_or_else(|| Error::Domain("linear transform has no diagonals".to_string()))
}

/// Baby-step/giant-step evaluation: splits each diagonal's shift as
/// `shift = giant * baby_step_count + baby` for a fixed `baby_step_count`
/// (typically `ceil(sqrt(diagonal count))`), rotates `ct` once per
/// distinct `baby`, then for each distinct `giant` rotates the
/// baby-step-weighted sum once more instead of once per diagonal.
pub fn evaluate_linear_transform_bsgs(
    params: &Parameters,
    ct: &Ciphertext,
    diagonals: &[Diagonal],
    baby_step_count: i64,
    eks: &EvaluationKeySet,
) -> Result<Ciphertext> {
    if baby_step_count <= 0 {
        return Err(Error::Domain("baby_step_count must be positive".to_string()));
    }
    let evaluator = Evaluator::new(params);

    // Every baby-step rotation applies a different Galois key to this
    // same `ct`, so its gadget-digit decomposition is hoisted once and
    // reused across all of them instead of being redone per rotation.
    let distinct_babies: std::collections::BTreeSet<i64> =
        diagonals.iter().map(|d| d.shift.rem_euclid(baby_step_count)).filter(|&b| b != 0).collect();
    let mut babies: std::collections::BTreeMap<i64, Ciphertext> = std::collections::BTreeMap::new();
    babies.insert(0, ct.clone());
    if let Some(&first_baby) = distinct_babies.iter().next() {
        let first_g = params.galois_element(first_baby);
        let first_gk = eks.galois_key(first_g, params)?;
        let digits = evaluator.hoist(ct, first_gk.key.gadget.level_p, first_gk.key.gadget.base_two_decomposition);
        for &baby in &distinct_babies {
            let g = params.galois_element(baby);
            let rotated = evaluator.apply_galois_hoisted(ct, &digits, g, eks)?;
            babies.insert(baby, rotated);
        }
    }

    let mut giant_groups: std::collections::BTreeMap<i64, Vec<&Diagonal>> = std::collections::BTreeMap::new();
    for d in diagonals {
        let giant = (d.shift - d.shift.rem_euclid(baby_step_count)) / baby_step_count;
        giant_groups.entry(giant).or_default().push(d);
    }

    let mut acc: Option<Ciphertext> = None;
    for (giant, group) in giant_groups {
        let mut inner: Option<Ciphertext> = None;
        for d in group {
            let baby = d.shift.rem_euclid(baby_step_count);
            let rotated = &babies[&baby];
            let term = mul_plain(params, rotated, &d.plaintext)?;
            inner = Some(match inner {
                Some(a) => evaluator.add(&a, &term)?,
                None => term,
            });
        }
        let inner = inner.expect("giant-step group is never empty");
        let shifted = if giant == 0 {
            inner
        } else {
            let g = params.galois_element(giant * baby_step_count);
            evaluator.apply_galois(&inner, g, eks)?
        };
        acc = Some(match acc {
            Some(a) => evaluator.add(&a, &shifted)?,
            None => shifted,
        });
    }
    acc.ok_or_else(|| Error::Domain("linear transform has no diagonals".to_string()))
}
