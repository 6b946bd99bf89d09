//! Request signature validation
//!
//! Canonical form (wire contract, version 1): drop the `sign` parameter,
//! sort the remaining keys byte-wise ascending, join `key=value` pairs with
//! `&`. Keys and values are used verbatim; nothing is escaped or coerced.
//! Clients computing tags independently must reproduce this exactly.

use std::collections::BTreeMap;

use crate::crypto::{constant_time_str_eq, HmacKey};

/// Name of the parameter carrying the tag; never part of the canonical form
pub const SIGNATURE_PARAM: &str = "sign";

/// Version of the canonicalization rule
pub const CANONICAL_VERSION: u8 = 1;

/// Request parameter mapping. `BTreeMap<String, _>` iterates in byte-wise
/// key order, which is the canonical order.
pub type Params = BTreeMap<String, String>;

/// Presented tag does not match the recomputed one
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("signature mismatch")]
pub struct SignatureMismatch;

/// Serialize a parameter set into its canonical string
pub fn canonicalize(params: &Params) -> String {
    params
        .iter()
        .filter(|(key, _)| key.as_str() != SIGNATURE_PARAM)
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Computes and checks request tags with the shared secret
#[derive(Clone, Debug)]
pub struct RequestSigner {
    key: HmacKey,
}

impl RequestSigner {
    pub fn new(key: HmacKey) -> Self {
        Self { key }
    }

    /// Lowercase hex HMAC-SHA256 of the canonical form
    pub fn sign(&self, params: &Params) -> String {
        self.key.sign_hex(canonicalize(params).as_bytes())
    }

    /// Recompute the tag and compare in constant time
    pub fn verify(&self, params: &Params, provided: &str) -> Result<(), SignatureMismatch> {
        let expected = self.sign(params);
        if constant_time_str_eq(&expected, provided) {
            Ok(())
        } else {
            Err(SignatureMismatch)
        }
    }
}
