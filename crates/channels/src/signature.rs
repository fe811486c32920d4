//! Inbound webhook signature validation.
//!
//! The SMS provider signs each callback with
//! `base64(HMAC-SHA1(auth_token, url + sorted(key + value)...))` and sends the
//! result in the `X-Twilio-Signature` header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use textpilot_core::error::SignatureError;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

/// Validates request signatures against the shared auth token.
#[derive(Clone)]
pub struct RequestValidator {
    auth_token: String,
}

impl std::fmt::Debug for RequestValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestValidator")
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl RequestValidator {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
        }
    }

    fn mac_for(&self, url: &str, params: &[(String, String)]) -> HmacSha1 {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort();

        let mut mac = HmacSha1::new_from_slice(self.auth_token.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(url.as_bytes());
        for (key, value) in sorted {
            mac.update(key.as_bytes());
            mac.update(value.as_bytes());
        }
        mac
    }

    /// Compute the base64 signature for a callback URL and its form parameters.
    pub fn compute(&self, url: &str, params: &[(String, String)]) -> String {
        STANDARD.encode(self.mac_for(url, params).finalize().into_bytes())
    }

    /// Check `signature` against the expected value in constant time.
    ///
    /// Tries the URL as given and, when it carries an explicit default port,
    /// the same URL without it (and vice versa), since proxies disagree on
    /// which form reaches the signer.
    pub fn validate(
        &self,
        url: &str,
        params: &[(String, String)],
        signature: &str,
    ) -> Result<(), SignatureError> {
        if self.auth_token.is_empty() {
            return Err(SignatureError::NoSecret);
        }
        let signature = signature.trim();
        if signature.is_empty() {
            return Err(SignatureError::Missing);
        }
        let provided = STANDARD
            .decode(signature)
            .map_err(|e| SignatureError::Malformed(e.to_string()))?;

        let matches = url_variants(url)
            .iter()
            .any(|candidate| self.mac_for(candidate, params).verify_slice(&provided).is_ok());

        if matches {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

/// `url` plus its twin with the default port added or removed.
fn url_variants(url: &str) -> Vec<String> {
    let mut variants = vec![url.to_string()];
    let Some((scheme, rest)) = url.split_once("://") else {
        return variants;
    };
    let default_port = match scheme {
        "https" => "443",
        "http" => "80",
        _ => return variants,
    };
    let (authority, tail) = match rest.find(['/', '?']) {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };

    let twin = match authority.rsplit_once(':') {
        Some((host, port)) if port == default_port => format!("{scheme}://{host}{tail}"),
        Some(_) => return variants,
        None => format!("{scheme}://{authority}:{default_port}{tail}"),
    };
    variants.push(twin);
    variants
}
