//! Canonical query signing
//!
//! Both sides sort the parameters by key, drop empty values,
//! form-urlencode keys and values, join them with `&`, and sign the
//! result with HMAC-SHA512 (lowercase hex).

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha512;
use url::form_urlencoded::byte_serialize;

use crate::domain::{DomainError, DomainResult};

pub const SECURE_HASH: &str = "vnp_SecureHash";
pub const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

type HmacSha512 = Hmac<Sha512>;

pub struct CanonicalSigner {
    secret: String,
}

impl CanonicalSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// `k=v&k=v` over non-blank pairs, keys in lexicographic order.
    pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
        params
            .iter()
            .filter(|(k, v)| !k.trim().is_empty() && !v.trim().is_empty())
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Canonical query without the signature fields.
    pub fn signing_string(params: &BTreeMap<String, String>) -> String {
        let filtered: BTreeMap<String, String> = params
            .iter()
            .filter(|(k, _)| !is_signature_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self::canonical_query(&filtered)
    }

    pub fn sign(&self, data: &str) -> DomainResult<String> {
        let mut mac = self.mac()?;
        mac.update(data.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check the `vnp_SecureHash` carried in `params`.
    pub fn verify(&self, params: &BTreeMap<String, String>) -> bool {
        if self.secret.trim().is_empty() || params.is_empty() {
            return false;
        }
        let Some(provided) = params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(SECURE_HASH))
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
        else {
            return false;
        };

        let data = Self::signing_string(params);
        if data.is_empty() {
            return false;
        }

        let Ok(expected) = hex::decode(provided.to_ascii_lowercase()) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(data.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    fn mac(&self) -> DomainResult<HmacSha512> {
        HmacSha512::new_from_slice(self.secret.as_bytes())
            .map_err(|e| DomainError::Configuration(format!("Invalid VNPay hash secret: {}", e)))
    }
}

fn is_signature_key(key: &str) -> bool {
    key.eq_ignore_ascii_case(SECURE_HASH) || key.eq_ignore_ascii_case(SECURE_HASH_TYPE)
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}
