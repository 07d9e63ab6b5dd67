use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::common::Platform;
use crate::server::error::ServerError;

type HmacSha256 = Hmac<Sha256>;

/// Contents of an OAuth `state` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateClaims {
    #[serde(rename = "c")]
    pub client_id: String,
    #[serde(rename = "p")]
    pub platform: Platform,
    #[serde(rename = "t", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "n")]
    pub nonce: String,
}

/// Signs state claims as `base64url(json).hex(hmac-sha256)`.
///
/// The payload is opaque to providers; client ids may contain any character
/// because nothing is split on a delimiter inside the payload.
pub struct StateSigner {
    key: Vec<u8>,
}

impl StateSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, ServerError> {
        <HmacSha256 as Mac>::new_from_slice(&self.key)
            .map_err(|e| ServerError::Configuration(format!("Invalid state secret: {}", e)))
    }

    pub fn sign(&self, claims: &StateClaims) -> Result<String, ServerError> {
        let payload = serde_json::to_vec(claims)
            .map_err(|e| ServerError::Internal(format!("Failed to encode state: {}", e)))?;
        let encoded = URL_SAFE_NO_PAD.encode(payload);

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", encoded, signature))
    }

    /// Check the signature and decode the claims. Expiry and reuse are the
    /// caller's concern.
    pub fn verify(&self, token: &str) -> Result<StateClaims, ServerError> {
        let (encoded, signature) = token
            .split_once('.')
            .ok_or_else(|| ServerError::InvalidState("malformed state".to_string()))?;

        let signature = hex::decode(signature)
            .map_err(|_| ServerError::InvalidState("malformed signature".to_string()))?;

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| ServerError::InvalidState("signature mismatch".to_string()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| ServerError::InvalidState("malformed payload".to_string()))?;
        serde_json::from_slice(&payload)
            .map_err(|_| ServerError::InvalidState("malformed payload".to_string()))
    }
}
