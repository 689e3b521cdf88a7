//! HMAC request signing
//!
//! Secured calls are signed over the query string of their parameters sorted by venue name.
//! The hex digest travels as the final `signature` parameter.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384};

use crate::engine::SignatureDigest;
use crate::{AdapterError, Result};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;

/// Name of the appended signature parameter
pub const SIGNATURE_PARAM: &str = "signature";

/// `k1=v1&k2=v2` in the given order
pub fn build_query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hex HMAC of `payload` keyed by `secret`
pub fn compute_signature(digest: SignatureDigest, secret: &str, payload: &str) -> Result<String> {
    let signature = match digest {
        SignatureDigest::Sha256 => {
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .map_err(|e| AdapterError::Signing(e.to_string()))?;
            mac.update(payload.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
        SignatureDigest::Sha384 => {
            let mut mac = HmacSha384::new_from_slice(secret.as_bytes())
                .map_err(|e| AdapterError::Signing(e.to_string()))?;
            mac.update(payload.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
    };
    Ok(signature)
}

/// Sort `params`, sign them and append the signature as the last pair
pub fn sign_params(
    digest: SignatureDigest,
    secret: &str,
    mut params: Vec<(String, String)>,
) -> Result<Vec<(String, String)>> {
    params.sort_by(|a, b| a.0.cmp(&b.0));
    let signature = compute_signature(digest, secret, &build_query_string(&params))?;
    params.push((SIGNATURE_PARAM.to_string(), signature));
    Ok(params)
}
