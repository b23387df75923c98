//! Plaintext/ciphertext metadata: domain flags and the scale/dimension
//! bookkeeping needed to interpret a polynomial's coefficients as encoded
//! values.

use serde::{Deserialize, Serialize};

/// An encoding scale. Carried as `f64` rather than a true 128-bit float —
/// noise/precision analysis here only ever needs double precision, and
/// `f64` serializes trivially; a real fixed-point scale tracker would
/// widen this if that stopped being true.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub value: f64,
    pub integer_modulus: Option<u64>,
}

impl Scale {
    pub fn new(value: f64) -> Self {
        Scale {
            value,
            integer_modulus: None,
        }
    }

    pub fn with_integer_modulus(value: f64, modulus: u64) -> Self {
        Scale {
            value,
            integer_modulus: Some(modulus),
        }
    }

    pub fn mul(&self, other: &Scale) -> Scale {
        Scale {
            value: self.value * other.value,
            integer_modulus: match (self.integer_modulus, other.integer_modulus) {
                (Some(a), Some(b)) => Some(a.wrapping_mul(b)),
                _ => None,
            },
        }
    }
}

/// Row/column shape of a batched (slot-encoded) plaintext, `log2`-scaled
/// so it always fits the ring dimension exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogDimensions {
    pub rows: usize,
    pub cols: usize,
}

impl LogDimensions {
    pub fn slots(&self) -> usize {
        (1usize << self.rows) * (1usize << self.cols)
    }
}

/// Metadata traveling with every ciphertext/plaintext: the arithmetic
/// domain flags plus the encoding description needed to interpret
/// coefficients as batched values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub is_ntt: bool,
    pub is_montgomery: bool,
    pub scale: Scale,
    pub log_dimensions: LogDimensions,
    pub is_batched: bool,
    pub is_bit_reversed: bool,
}

impl MetaData {
    pub fn new(scale: Scale, log_n: usize) -> Self {
        MetaData {
            is_ntt: false,
            is_montgomery: false,
            scale,
            log_dimensions: LogDimensions { rows: 0, cols: log_n },
            is_batched: false,
            is_bit_reversed: false,
        }
    }

    pub fn with_ntt(mut self, is_ntt: bool) -> Self {
        self.is_ntt = is_ntt;
        self
    }

    pub fn with_montgomery(mut self, is_montgomery: bool) -> Self {
        self.is_montgomery = is_montgomery;
        self
    }

    pub fn with_batched(mut self, log_dimensions: LogDimensions) -> Self {
        self.is_batched = true;
        self.log_dimensions = log_dimensions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_multiplication_combines_integer_moduli() {
        let a = Scale::with_integer_modulus(2.0f64.powi(40), 65537);
        let b = Scale::with_integer_modulus(2.0f64.powi(40), 65537);
        let c = a.mul(&b);
        assert_eq!(c.value, 2.0f64.powi(80));
        assert_eq!(c.integer_modulus, Some(65537u64.wrapping_mul(65537)));
    }

    #[test]
    fn log_dimensions_compute_slot_count() {
        let d = LogDimensions { rows: 2, cols: 3 };
        assert_eq!(d.slots(), 4 * 8);
    }
}
