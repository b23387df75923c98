//! A sequence of `1 + degree` polynomials in `R_Q` at a common level, plus
//! [`MetaData`]. Degree 1 is canonical; degree 2 arises from
//! multiplication and is reduced back to 1 by relinearization.

use crate::metadata::MetaData;
use crate::params::Parameters;
use crate::ring::Poly;

#[derive(Debug, Clone)]
pub struct Ciphertext {
    pub parts: Vec<Poly>,
    pub metadata: MetaData,
}

impl Ciphertext {
    pub fn new(parts: Vec<Poly>, metadata: MetaData) -> Self {
        debug_assert!(!parts.is_empty());
        Ciphertext { parts, metadata }
    }

    pub fn zero(params: &Parameters, level: usize, metadata: MetaData) -> Self {
        Ciphertext {
            parts: vec![params.ring_q().new_poly(level); 2],
            metadata,
        }
    }

    pub fn degree(&self) -> usize {
        self.parts.len() - 1
    }

    pub fn level(&self) -> usize {
        self.parts[0].level()
    }

    pub fn resize_degree(&mut self, degree: usize) {
        self.parts.truncate(degree + 1);
    }

    pub fn at(&self, i: usize) -> &Poly {
        &self.parts[i]
    }

    pub fn at_mut(&mut self, i: usize) -> &mut Poly {
        &mut self.parts[i]
    }
}
