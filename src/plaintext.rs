//! A single polynomial in `R_Q` plus its [`MetaData`].

use crate::metadata::MetaData;
use crate::params::Parameters;
use crate::ring::Poly;

#[derive(Debug, Clone)]
pub struct Plaintext {
    pub poly: Poly,
    pub metadata: MetaData,
}

impl Plaintext {
    pub fn new(poly: Poly, metadata: MetaData) -> Self {
        Plaintext { poly, metadata }
    }

    pub fn zero(params: &Parameters, level: usize, metadata: MetaData) -> Self {
        Plaintext {
            poly: params.ring_q().new_poly(level),
            metadata,
        }
    }

    pub fn level(&self) -> usize {
        self.poly.level()
    }
}
