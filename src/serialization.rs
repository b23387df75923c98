//! Binary wire format for persistent objects: parameters, keys,
//! ciphertexts, plaintexts, gadget ciphertexts. Every object reports its
//! exact encoded size and round-trips through `write_to`/`read_from`.
//!
//! Layout: a polynomial is an 8-byte level followed by `level+1` rows of
//! `n` little-endian `u64` coefficients (`n` is supplied by the caller,
//! not encoded — it's a property of the ring, not the polynomial). A
//! QP-polynomial is its Q-part followed by its P-part, an absent part
//! written as level `-1` (8 bytes, no row data). A gadget ciphertext is
//! an 8-byte base-2 decomposition width, an 8-byte row count, then each
//! row's digit count followed by its `(c0, c1)` QP-polynomial pairs in
//! order. `MetaData` is JSON-encoded (`serde_json`) with a 4-byte
//! little-endian length prefix; a leading presence byte in ciphertext/
//! plaintext records whether metadata follows at all.

use serde::{Deserialize, Serialize};

use crate::ciphertext::Ciphertext;
use crate::error::{Error, Result};
use crate::keys::GadgetCiphertext;
use crate::metadata::MetaData;
use crate::plaintext::Plaintext;
use crate::ring::{Poly, QpPoly};

/// Ring-context-aware binary codec: encoding/decoding a polynomial-typed
/// object needs to know `n` (the ring dimension), since the wire format
/// doesn't repeat it per polynomial.
pub trait WireCodec: Sized {
    fn binary_size(&self) -> usize;
    fn write_to(&self, out: &mut Vec<u8>);
    fn read_from(bytes: &[u8], n: usize) -> Result<(Self, usize)>;
}

fn need(bytes: &[u8], len: usize, what: &str) -> Result<()> {
    if bytes.len() < len {
        Err(Error::Serialization(format!(
            "buffer too short for {what}: need {len} bytes, have {}",
            bytes.len()
        )))
    } else {
        Ok(())
    }
}

impl WireCodec for Poly {
    fn binary_size(&self) -> usize {
        8 + self.rows().iter().map(|row| row.len() * 8).sum::<usize>()
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.level() as u64).to_le_bytes());
        for row in self.rows() {
            for v in row {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
    }

    fn read_from(bytes: &[u8], n: usize) -> Result<(Self, usize)> {
        need(bytes, 8, "polynomial level")?;
        let level = u64::from_le_bytes(bytes[0..8].try_into().unwrap()) as usize;
        let mut offset = 8;
        let mut rows = Vec::with_capacity(level + 1);
        for _ in 0..=level {
            need(&bytes[offset..], n * 8, "polynomial row")?;
            let row = (0..n)
                .map(|k| u64::from_le_bytes(bytes[offset + k * 8..offset + k * 8 + 8].try_into().unwrap()))
                .collect();
            rows.push(row);
            offset += n * 8;
        }
        Ok((Poly::from_rows(rows), offset))
    }
}

impl WireCodec for QpPoly {
    fn binary_size(&self) -> usize {
        let q_size = self.q.as_ref().map(|p| p.binary_size()).unwrap_or(8);
        let p_size = self.p.as_ref().map(|p| p.binary_size()).unwrap_or(8);
        q_size + p_size
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match &self.q {
            Some(q) => q.write_to(out),
            None => out.extend_from_slice(&(-1i64).to_le_bytes()),
        }
        match &self.p {
            Some(p) => p.write_to(out),
            None => out.extend_from_slice(&(-1i64).to_le_bytes()),
        }
    }

    fn read_from(bytes: &[u8], n: usize) -> Result<(Self, usize)> {
        let (q, q_len) = read_optional_poly(bytes, n)?;
        let (p, p_len) = read_optional_poly(&bytes[q_len..], n)?;
        Ok((QpPoly::new(q, p), q_len + p_len))
    }
}

fn read_optional_poly(bytes: &[u8], n: usize) -> Result<(Option<Poly>, usize)> {
    need(bytes, 8, "QP-polynomial level tag")?;
    let level = i64::from_le_bytes(bytes[0..8].try_into().unwrap());
    if level < 0 {
        Ok((None, 8))
    } else {
        let (poly, len) = Poly::read_from(bytes, n)?;
        Ok((Some(poly), len))
    }
}

impl WireCodec for GadgetCiphertext {
    fn binary_size(&self) -> usize {
        16 + self
            .rows
            .iter()
            .map(|row| 8 + row.iter().map(|(c0, c1)| c0.binary_size() + c1.binary_size()).sum::<usize>())
            .sum::<usize>()
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.base_two_decomposition as u64).to_le_bytes());
        out.extend_from_slice(&(self.rows.len() as u64).to_le_bytes());
        for row in &self.rows {
            out.extend_from_slice(&(row.len() as u64).to_le_bytes());
            for (c0, c1) in row {
                c0.write_to(out);
                c1.write_to(out);
            }
        }
    }

    fn read_from(bytes: &[u8], n: usize) -> Result<(Self, usize)> {
        need(bytes, 16, "gadget ciphertext header")?;
        let w = u64::from_le_bytes(bytes[0..8].try_into().unwrap()) as u32;
        let row_count = u64::from_le_bytes(bytes[8..16].try_into().unwrap()) as usize;
        let mut offset = 16;
        let mut rows = Vec::with_capacity(row_count);
        let mut level_q = 0usize;
        let mut level_p = -1i32;
        for _ in 0..row_count {
            need(&bytes[offset..], 8, "gadget row digit count")?;
            let dt = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()) as usize;
            offset += 8;
            let mut cells = Vec::with_capacity(dt);
            for _ in 0..dt {
                let (c0, c0_len) = QpPoly::read_from(&bytes[offset..], n)?;
                offset += c0_len;
                let (c1, c1_len) = QpPoly::read_from(&bytes[offset..], n)?;
                offset += c1_len;
                level_q = c0.level_q().max(0) as usize;
                level_p = c0.level_p();
                cells.push((c0, c1));
            }
            rows.push(cells);
        }
        Ok((
            GadgetCiphertext {
                rows,
                base_two_decomposition: w,
                level_q,
                level_p,
            },
            offset,
        ))
    }
}

/// MetaData's self-contained JSON encoding: a 4-byte length prefix
/// followed by the JSON document.
fn write_metadata(meta: &MetaData, out: &mut Vec<u8>) -> Result<()> {
    let json = serde_json::to_vec(meta).map_err(|e| Error::Serialization(e.to_string()))?;
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&json);
    Ok(())
}

fn read_metadata(bytes: &[u8]) -> Result<(MetaData, usize)> {
    need(bytes, 4, "metadata length prefix")?;
    let len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    need(&bytes[4..], len, "metadata JSON body")?;
    let meta: MetaData = serde_json::from_slice(&bytes[4..4 + len]).map_err(|e| Error::Serialization(e.to_string()))?;
    Ok((meta, 4 + len))
}

fn metadata_binary_size(meta: &MetaData) -> usize {
    4 + serde_json::to_vec(meta).map(|v| v.len()).unwrap_or(0)
}

impl WireCodec for Ciphertext {
    fn binary_size(&self) -> usize {
        1 + metadata_binary_size(&self.metadata) + 8 + self.parts.iter().map(|p| p.binary_size()).sum::<usize>()
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(1);
        write_metadata(&self.metadata, out).expect("metadata always serializes");
        out.extend_from_slice(&(self.parts.len() as u64).to_le_bytes());
        for part in &self.parts {
            part.write_to(out);
        }
    }

    fn read_from(bytes: &[u8], n: usize) -> Result<(Self, usize)> {
        need(bytes, 1, "ciphertext metadata presence byte")?;
        if bytes[0] == 0 {
            return Err(Error::Serialization("ciphertext is missing required metadata".to_string()));
        }
        let mut offset = 1;
        let (metadata, meta_len) = read_metadata(&bytes[offset..])?;
        offset += meta_len;
        need(&bytes[offset..], 8, "ciphertext part count")?;
        let part_count = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()) as usize;
        offset += 8;
        let mut parts = Vec::with_capacity(part_count);
        for _ in 0..part_count {
            let (poly, len) = Poly::read_from(&bytes[offset..], n)?;
            offset += len;
            parts.push(poly);
        }
        Ok((Ciphertext::new(parts, metadata), offset))
    }
}

impl WireCodec for Plaintext {
    fn binary_size(&self) -> usize {
        1 + metadata_binary_size(&self.metadata) + self.poly.binary_size()
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(1);
        write_metadata(&self.metadata, out).expect("metadata always serializes");
        self.poly.write_to(out);
    }

    fn read_from(bytes: &[u8], n: usize) -> Result<(Self, usize)> {
        need(bytes, 1, "plaintext metadata presence byte")?;
        if bytes[0] == 0 {
            return Err(Error::Serialization("plaintext is missing required metadata".to_string()));
        }
        let mut offset = 1;
        let (metadata, meta_len) = read_metadata(&bytes[offset..])?;
        offset += meta_len;
        let (poly, len) = Poly::read_from(&bytes[offset..], n)?;
        offset += len;
        Ok((Plaintext::new(poly, metadata), offset))
    }
}

/// Small helper for types (parameters, fixed-shape config) whose wire
/// form is plain JSON rather than the polynomial layout above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonEnvelope<T> {
    pub value: T,
}

impl<T: Serialize + for<'de> Deserialize<'de>> JsonEnvelope<T> {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.value).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value = serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(JsonEnvelope { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Scale;

    #[test]
    fn polynomial_round_trips_through_wire_format() {
        let mut poly = Poly::zero(2, 8);
        for (i, row) in poly.rows_mut().iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (i * 8 + j) as u64;
            }
        }
        let mut bytes = Vec::new();
        poly.write_to(&mut bytes);
        assert_eq!(bytes.len(), poly.binary_size());
        let (decoded, consumed) = Poly::read_from(&bytes, 8).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, poly);
    }

    #[test]
    fn ciphertext_round_trips_through_wire_format() {
        let metadata = MetaData::new(Scale::new(2.0), 4);
        let ct = Ciphertext::new(vec![Poly::zero(0, 16), Poly::zero(0, 16)], metadata);
        let mut bytes = Vec::new();
        ct.write_to(&mut bytes);
        assert_eq!(bytes.len(), ct.binary_size());
        let (decoded, consumed) = Ciphertext::read_from(&bytes, 16).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded.parts, ct.parts);
        assert_eq!(decoded.metadata, ct.metadata);
    }

    #[test]
    fn rejects_truncated_buffer() {
        let metadata = MetaData::new(Scale::new(1.0), 4);
        let ct = Ciphertext::new(vec![Poly::zero(0, 16)], metadata);
        let mut bytes = Vec::new();
        ct.write_to(&mut bytes);
        bytes.truncate(bytes.len() - 1);
        assert!(Ciphertext::read_from(&bytes, 16).is_err());
    }
}
