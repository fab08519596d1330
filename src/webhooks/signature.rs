//! `X-Hub-Signature-256` verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{BackportError, Result};

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
const SIGNATURE_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

pub struct WebhookSignature {
    secret: String,
}

impl WebhookSignature {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Checks a `sha256=<hex>` header value against the raw request body in
    /// constant time.
    pub fn verify(&self, header: Option<&str>, body: &[u8]) -> Result<()> {
        let header = header.ok_or_else(|| {
            BackportError::SignatureError(format!("Missing {} header", SIGNATURE_HEADER))
        })?;
        let provided = header.strip_prefix(SIGNATURE_PREFIX).ok_or_else(|| {
            BackportError::SignatureError(format!("Expected {} to start with {}", SIGNATURE_HEADER, SIGNATURE_PREFIX))
        })?;
        let provided = hex::decode(provided)
            .map_err(|e| BackportError::SignatureError(format!("Invalid signature encoding: {}", e)))?;

        self.mac(body)?
            .verify_slice(&provided)
            .map_err(|_| BackportError::SignatureError("Signature does not match payload".to_string()))
    }

    /// The header value GitHub would send for `body`.
    pub fn sign(&self, body: &[u8]) -> Result<String> {
        let digest = self.mac(body)?.finalize().into_bytes();
        Ok(format!("{}{}", SIGNATURE_PREFIX, hex::encode(digest)))
    }

    fn mac(&self, body: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| BackportError::ConfigError(format!("Invalid webhook secret: {}", e)))?;
        mac.update(body);
        Ok(mac)
    }
}
