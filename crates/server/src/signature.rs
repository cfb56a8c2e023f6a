//! Carrier webhook signatures.
//!
//! Twilio signs each webhook with base64(HMAC-SHA1(auth_token, url + params)),
//! where params are the POST fields sorted by name, each name immediately
//! followed by its value.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    fn mac_for(&self, url: &str, params: &[(String, String)]) -> HmacSha1 {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort();

        // HMAC accepts keys of any length
        let mut mac =
            HmacSha1::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(url.as_bytes());
        for (key, value) in sorted {
            mac.update(key.as_bytes());
            mac.update(value.as_bytes());
        }
        mac
    }

    /// Expected signature header value for a request.
    pub fn sign(&self, url: &str, params: &[(String, String)]) -> String {
        STANDARD.encode(self.mac_for(url, params).finalize().into_bytes())
    }

    /// Check a provided signature in constant time. A missing header, bad
    /// base64, or an empty secret all fail.
    pub fn verify(&self, url: &str, params: &[(String, String)], provided: Option<&str>) -> bool {
        if self.secret.is_empty() {
            return false;
        }
        let Some(provided) = provided else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(provided.trim()) else {
            return false;
        };
        self.mac_for(url, params).verify_slice(&decoded).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://hotline.example.org/api/webhook";

    fn params() -> Vec<(String, String)> {
        vec![
            ("From".to_string(), "+15551234567".to_string()),
            ("Body".to_string(), "Necesito ayuda".to_string()),
            ("MessageSid".to_string(), "SM1".to_string()),
        ]
    }

    #[test]
    fn test_valid_signature_accepted() {
        let verifier = SignatureVerifier::new("auth-token");
        let sig = verifier.sign(URL, &params());
        assert!(verifier.verify(URL, &params(), Some(&sig)));
    }

    #[test]
    fn test_param_order_does_not_matter() {
        let verifier = SignatureVerifier::new("auth-token");
        let sig = verifier.sign(URL, &params());
        let mut reordered = params();
        reordered.reverse();
        assert!(verifier.verify(URL, &reordered, Some(&sig)));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let verifier = SignatureVerifier::new("auth-token");
        let sig = verifier.sign(URL, &params());
        let mut tampered = params();
        tampered[1].1 = "Send money".to_string();
        assert!(!verifier.verify(URL, &tampered, Some(&sig)));
    }

    #[test]
    fn test_other_url_or_secret_rejected() {
        let verifier = SignatureVerifier::new("auth-token");
        let sig = verifier.sign(URL, &params());
        assert!(!verifier.verify("https://evil.example.org/api/webhook", &params(), Some(&sig)));
        assert!(!SignatureVerifier::new("other").verify(URL, &params(), Some(&sig)));
    }

    #[test]
    fn test_missing_or_garbage_header_rejected() {
        let verifier = SignatureVerifier::new("auth-token");
        assert!(!verifier.verify(URL, &params(), None));
        assert!(!verifier.verify(URL, &params(), Some("not base64!!")));
        assert!(!verifier.verify(URL, &params(), Some("")));
    }

    #[test]
    fn test_empty_secret_never_verifies() {
        let verifier = SignatureVerifier::new("");
        let sig = verifier.sign(URL, &params());
        assert!(!verifier.verify(URL, &params(), Some(&sig)));
    }
}
