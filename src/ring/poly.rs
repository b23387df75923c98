//! The polynomial container: an ordered sequence of
//! per-prime coefficient rows. A `Poly` carries no intrinsic domain (time
//! vs NTT) or Montgomery flag — those live in the containing
//! [`crate::metadata::MetaData`].

use crate::modulus::Modulus;

/// A polynomial at a single ring degree, across `level + 1` RNS primes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poly {
    rows: Vec<Vec<u64>>,
}

impl Poly {
    /// Allocates a zero polynomial with `level + 1` rows of `n` coefficients.
    pub fn zero(level_plus_one: usize, n: usize) -> Self {
        Poly {
            rows: vec![vec![0u64; n]; level_plus_one],
        }
    }

    /// Builds a polynomial from explicit rows; every row must share the
    /// same length.
    pub fn from_rows(rows: Vec<Vec<u64>>) -> Self {
        debug_assert!(!rows.is_empty());
        let n = rows[0].len();
        debug_assert!(rows.iter().all(|r| r.len() == n));
        Poly { rows }
    }

    #[inline]
    pub fn level(&self) -> usize {
        self.rows.len() - 1
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.rows[0].len()
    }

    #[inline]
    pub fn rows(&self) -> &[Vec<u64>] {
        &self.rows
    }

    #[inline]
    pub fn rows_mut(&mut self) -> &mut [Vec<u64>] {
        &mut self.rows
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[u64] {
        &self.rows[i]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [u64] {
        &mut self.rows[i]
    }

    /// Drops all rows beyond `level`, producing a shallower polynomial.
    pub fn truncate(&mut self, level: usize) {
        debug_assert!(level <= self.level());
        self.rows.truncate(level + 1);
    }

    /// A shallow copy of the first `level + 1` rows.
    pub fn at_level(&self, level: usize) -> Poly {
        debug_assert!(level <= self.level());
        Poly {
            rows: self.rows[..=level].to_vec(),
        }
    }

    /// Appends zero rows until the polynomial reaches `level`.
    pub fn extend_zero(&mut self, level: usize, n: usize) {
        while self.level() < level {
            self.rows.push(vec![0u64; n]);
        }
    }

    /// Builds a polynomial from a single set of centered (signed)
    /// coefficients shared across all RNS rows, reducing each coefficient
    /// modulo its row's prime. Used to lift sampled secrets/errors
    /// (ternary, discrete Gaussian) into RNS representation.
    pub fn from_centered_coeffs(coeffs: &[i64], moduli: &[Modulus]) -> Self {
        let n = coeffs.len();
        let rows = moduli
            .iter()
            .map(|q| {
                coeffs
                    .iter()
                    .map(|&c| {
                        let qi = q.q() as i64;
                        let r = c.rem_euclid(qi);
                        r as u64
                    })
                    .collect()
            })
            .collect();
        Poly { rows }
    }
}
