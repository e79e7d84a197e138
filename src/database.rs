//! Database encoding: records packed into LWE plaintext matrices.
//!
//! A record of `db_record_bit_size` bits is cut into K chunks of
//! `lwe_plaintext_bit_size` bits (least significant first). Chunk `k` of
//! record `i` is stored at `(i / db_cols, i % db_cols)` of matrix `D_k`, so
//! the database is K matrices of `db_rows × db_cols` entries in Z_p.

use rand::Rng;
use rayon::prelude::*;

use crate::lwe::LweMatrix;
use crate::params::Parameters;
use crate::pir::error::{pir_err, Result};

/// Record matrix owned by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    db_rows: usize,
    db_cols: usize,
    record_bit_size: usize,
    plaintext_bits: usize,
    /// One row-major `db_rows × db_cols` matrix per chunk
    chunks: Vec<Vec<u32>>,
}

impl Database {
    /// Pack `records` into a database of the configured shape.
    ///
    /// Missing trailing records are all-zero. A record longer than the
    /// configured bit size is rejected.
    pub fn from_records(params: &Parameters, records: &[Vec<u8>]) -> Result<Self> {
        let num_records = params.num_records();
        if records.len() > num_records {
            return Err(pir_err!(
                InvalidArgument,
                "{} records do not fit a database of {} records",
                records.len(),
                num_records
            ));
        }

        let mut db = Self::empty(params);
        for (i, record) in records.iter().enumerate() {
            db.set_record(i, record)?;
        }
        Ok(db)
    }

    /// Fill every record with random bits
    pub fn random<R: Rng + ?Sized>(params: &Parameters, rng: &mut R) -> Self {
        let mut db = Self::empty(params);
        let p_mask = (1u32 << db.plaintext_bits) - 1;
        let last_chunk_bits = db.record_bit_size - (db.num_chunks() - 1) * db.plaintext_bits;
        let last_mask = (1u32 << last_chunk_bits) - 1;

        let k_last = db.num_chunks() - 1;
        for (k, chunk) in db.chunks.iter_mut().enumerate() {
            let mask = if k == k_last { last_mask } else { p_mask };
            for v in chunk.iter_mut() {
                *v = rng.gen::<u32>() & mask;
            }
        }
        db
    }

    fn empty(params: &Parameters) -> Self {
        let size = params.num_records();
        Self {
            db_rows: params.db_rows,
            db_cols: params.db_cols,
            record_bit_size: params.db_record_bit_size,
            plaintext_bits: params.lwe_plaintext_bit_size as usize,
            chunks: vec![vec![0u32; size]; params.num_chunks()],
        }
    }

    fn set_record(&mut self, index: usize, record: &[u8]) -> Result<()> {
        let record_bytes = self.record_bit_size.div_ceil(8);
        if record.len() > record_bytes {
            return Err(pir_err!(
                InvalidArgument,
                "record {} has {} bytes, at most {} allowed",
                index,
                record.len(),
                record_bytes
            ));
        }
        let excess_bits = record_bytes * 8 - self.record_bit_size;
        if excess_bits > 0 && record.len() == record_bytes {
            let top = record[record_bytes - 1] >> (8 - excess_bits);
            if top != 0 {
                return Err(pir_err!(
                    InvalidArgument,
                    "record {} sets bits beyond {} bits",
                    index,
                    self.record_bit_size
                ));
            }
        }

        let values = pack_record(record, self.record_bit_size, self.plaintext_bits);
        for (chunk, v) in self.chunks.iter_mut().zip(values) {
            chunk[index] = v;
        }
        Ok(())
    }

    /// Number of records
    pub fn num_records(&self) -> usize {
        self.db_rows * self.db_cols
    }

    /// Number of plaintext chunks per record
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn db_rows(&self) -> usize {
        self.db_rows
    }

    pub fn db_cols(&self) -> usize {
        self.db_cols
    }

    /// Byte-exact record lookup by linear index
    pub fn record(&self, index: usize) -> Result<Vec<u8>> {
        if index >= self.num_records() {
            return Err(pir_err!(
                InvalidArgument,
                "record index {} out of range (num_records = {})",
                index,
                self.num_records()
            ));
        }
        let values: Vec<u32> = self.chunks.iter().map(|c| c[index]).collect();
        Ok(unpack_record(&values, self.record_bit_size, self.plaintext_bits))
    }

    /// Plaintext matrix of chunk `k`
    pub fn chunk(&self, k: usize) -> &[u32] {
        &self.chunks[k]
    }

    /// D_k · v over Z_{2^32}; one output per database row.
    ///
    /// Touches every entry regardless of `v`, so the cost does not depend on
    /// the selected column.
    pub fn multiply(&self, k: usize, v: &[u32]) -> Vec<u32> {
        assert_eq!(v.len(), self.db_cols, "vector length must equal db_cols");
        self.chunks[k]
            .par_chunks(self.db_cols)
            .map(|row| {
                row.iter()
                    .zip(v)
                    .fold(0u32, |acc, (&d, &x)| acc.wrapping_add(d.wrapping_mul(x)))
            })
            .collect()
    }

    /// Hint H_k = D_k · A over Z_{2^32}, row-major `db_rows × A.cols()`.
    pub fn hint(&self, k: usize, matrix: &LweMatrix) -> Vec<u32> {
        assert_eq!(matrix.rows(), self.db_cols, "A must have db_cols rows");
        let dim = matrix.cols();
        self.chunks[k]
            .par_chunks(self.db_cols)
            .flat_map_iter(|row| {
                let mut acc = vec![0u32; dim];
                for (c, &d) in row.iter().enumerate() {
                    if d == 0 {
                        continue;
                    }
                    for (a, &m) in acc.iter_mut().zip(matrix.row(c)) {
                        *a = a.wrapping_add(d.wrapping_mul(m));
                    }
                }
                acc
            })
            .collect()
    }
}

/// Split the little-endian bit string of `record` into chunks of `bits` bits.
pub fn pack_record(record: &[u8], record_bits: usize, bits: usize) -> Vec<u32> {
    let num_chunks = record_bits.div_ceil(bits);
    (0..num_chunks)
        .map(|k| {
            let start = k * bits;
            let end = (start + bits).min(record_bits);
            (start..end).fold(0u32, |acc, b| {
                let bit = record.get(b / 8).map_or(0, |byte| (byte >> (b % 8)) & 1);
                acc | (u32::from(bit) << (b - start))
            })
        })
        .collect()
}

/// Inverse of [`pack_record`].
pub fn unpack_record(values: &[u32], record_bits: usize, bits: usize) -> Vec<u8> {
    let mut record = vec![0u8; record_bits.div_ceil(8)];
    for b in 0..record_bits {
        let bit = (values[b / bits] >> (b % bits)) & 1;
        record[b / 8] |= (bit as u8) << (b % 8);
    }
    record
}
