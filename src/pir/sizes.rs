//! Communication cost per message component, in serialized bytes.

use std::fmt;

use serde::Serialize;

use super::error::Result;
use super::messages::{PublicParams, Request, Response, StaticPart};

fn serialized_len<T: Serialize + ?Sized>(value: &T) -> Result<usize> {
    Ok(bincode::serialized_size(value)? as usize)
}

fn kib(bytes: usize) -> f64 {
    bytes as f64 / 1024.0
}

/// Byte breakdown of a [`Request`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestSizes {
    pub lwe_query: usize,
    pub linpir_query: usize,
    /// Zero when the request carries no keys
    pub keys: usize,
    pub total: usize,
}

/// Byte breakdown of a [`Response`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseSizes {
    pub lwe: usize,
    /// Output bodies
    pub linpir_dynamic: usize,
    /// Included output masks; zero when every block is reused
    pub linpir_static: usize,
    pub total: usize,
}

impl Request {
    pub fn size_breakdown(&self) -> Result<RequestSizes> {
        Ok(RequestSizes {
            lwe_query: serialized_len(&self.lwe_query)?,
            linpir_query: serialized_len(&self.linpir_query)?,
            keys: match &self.keys {
                Some(bundle) => serialized_len(bundle)?,
                None => 0,
            },
            total: serialized_len(self)?,
        })
    }
}

impl Response {
    pub fn size_breakdown(&self) -> Result<ResponseSizes> {
        let mut linpir_dynamic = 0;
        let mut linpir_static = 0;
        for block in &self.linpir_responses {
            linpir_dynamic += serialized_len(&block.b)?;
            if let StaticPart::Included(a) = &block.a {
                linpir_static += serialized_len(a)?;
            }
        }
        Ok(ResponseSizes {
            lwe: serialized_len(&self.lwe_answers)?,
            linpir_dynamic,
            linpir_static,
            total: serialized_len(self)?,
        })
    }
}

impl PublicParams {
    /// Serialized size; independent of the database size
    pub fn byte_size(&self) -> Result<usize> {
        serialized_len(self)
    }
}

impl fmt::Display for RequestSizes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} KB (lwe {:.1} KB, linpir {:.1} KB, keys {:.1} KB)",
            kib(self.total),
            kib(self.lwe_query),
            kib(self.linpir_query),
            kib(self.keys)
        )
    }
}

impl fmt::Display for ResponseSizes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} KB (lwe {:.1} KB, linpir dynamic {:.1} KB, linpir static {:.1} KB)",
            kib(self.total),
            kib(self.lwe),
            kib(self.linpir_dynamic),
            kib(self.linpir_static)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linpir::GaloisKeyBundle;
    use crate::math::Poly;
    use crate::pir::LinPirBlockResponse;

    fn poly() -> Poly {
        Poly::from_signed(&[1, 2, 3], 8, &[17, 97])
    }

    #[test]
    fn test_request_keys_account_for_the_difference() {
        let with_keys = Request {
            session_id: 1,
            request_id: 2,
            params_fingerprint: 3,
            pad_index: 0,
            lwe_query: vec![0; 10],
            linpir_query: vec![poly(), poly()],
            keys: Some(GaloisKeyBundle {
                baby_step: Some(vec![poly(); 3]),
                giant_step: None,
            }),
            needs_static: false,
        };
        let without = Request {
            keys: None,
            ..with_keys.clone()
        };
        let a = with_keys.size_breakdown().unwrap();
        let b = without.size_breakdown().unwrap();
        assert_eq!(b.keys, 0);
        assert_eq!(a.total - b.total, a.keys);
        assert_eq!(a.lwe_query, 8 + 10 * 4);
    }

    #[test]
    fn test_response_static_accounts_for_the_difference() {
        let full = Response {
            session_id: 1,
            request_id: 2,
            lwe_answers: vec![vec![0; 4]; 2],
            linpir_responses: vec![
                LinPirBlockResponse {
                    b: poly(),
                    a: StaticPart::Included(poly()),
                };
                3
            ],
        };
        let mut reused = full.clone();
        for block in &mut reused.linpir_responses {
            block.a = StaticPart::ReusePrior;
        }
        let a = full.size_breakdown().unwrap();
        let b = reused.size_breakdown().unwrap();
        assert_eq!(b.linpir_static, 0);
        assert_eq!(a.linpir_dynamic, b.linpir_dynamic);
        assert_eq!(a.total - b.total, a.linpir_static);
        assert!(a.to_string().contains("linpir static"));
    }
}
