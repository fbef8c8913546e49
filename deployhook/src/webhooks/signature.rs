//! GitHub webhook signature verification using HMAC-SHA256.
//!
//! GitHub signs each delivery with the shared secret and sends the result in
//! the `X-Hub-Signature-256` header as `sha256=<hex>`. Verification runs on
//! the raw body bytes, before anything is parsed.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Secret value shipped as the default; while it is configured, signatures
/// are not enforced.
pub const PLACEHOLDER_SECRET: &str = "your-webhook-secret-here";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Computes the HMAC-SHA256 of a payload using the given secret.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a GitHub-style header value (`sha256=<hex>`).
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(signature))
}

/// Verifies a GitHub webhook signature against the payload and secret.
///
/// The header must equal the expected `sha256=<lowercase hex>` string
/// exactly. The comparison runs in constant time over the header bytes.
///
/// # Examples
///
/// ```
/// use deployhook::webhooks::{compute_signature, format_signature_header, verify_signature};
///
/// let header = format_signature_header(&compute_signature(b"{}", b"s3cr3t"));
/// assert!(verify_signature(b"{}", &header, b"s3cr3t"));
/// assert!(!verify_signature(b"{ }", &header, b"s3cr3t"));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let expected = format_signature_header(&compute_signature(payload, secret));
    expected.as_bytes().ct_eq(signature_header.as_bytes()).into()
}

/// Outcome of a signature check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// The header matches the body
    Verified,
    /// No real secret is configured; the request was let through
    DevModeBypass,
    /// Missing or mismatched signature
    Rejected,
}

impl SignatureCheck {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, SignatureCheck::Rejected)
    }
}

/// Checks deliveries against the configured shared secret
pub struct SignatureVerifier {
    secret: SecretString,
}

impl SignatureVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Whether the secret is still empty or the shipped placeholder
    pub fn is_dev_mode(&self) -> bool {
        let secret = self.secret.expose_secret();
        secret.is_empty() || secret == PLACEHOLDER_SECRET
    }

    /// Check a delivery body against its `X-Hub-Signature-256` header.
    pub fn check(&self, payload: &[u8], signature_header: Option<&str>) -> SignatureCheck {
        if self.is_dev_mode() {
            warn!("WARNING: Using default webhook secret. Please set GITHUB_WEBHOOK_SECRET environment variable.");
            return SignatureCheck::DevModeBypass;
        }

        match signature_header {
            Some(header)
                if verify_signature(payload, header, self.secret.expose_secret().as_bytes()) =>
            {
                SignatureCheck::Verified
            }
            _ => SignatureCheck::Rejected,
        }
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("dev_mode", &self.is_dev_mode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_signature_header() {
        assert_eq!(format_signature_header(&[0xab, 0x01]), "sha256=ab01");
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let sig = compute_signature(b"what do ya want for nothing?", b"Jefe");
        assert_eq!(
            hex::encode(sig),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_roundtrip_and_tamper() {
        let body = br#"{"ref":"refs/heads/master"}"#;
        let header = format_signature_header(&compute_signature(body, b"s3cr3t"));

        assert!(verify_signature(body, &header, b"s3cr3t"));
        assert!(!verify_signature(body, &header, b"other"));
        assert!(!verify_signature(br#"{"ref":"refs/heads/main"}"#, &header, b"s3cr3t"));
    }

    #[test]
    fn test_verify_is_exact_string_match() {
        let body = b"payload";
        let header = format_signature_header(&compute_signature(body, b"k"));

        assert!(!verify_signature(body, &header.to_uppercase(), b"k"));
        assert!(!verify_signature(body, header.trim_start_matches("sha256="), b"k"));
        assert!(!verify_signature(body, &format!("{} ", header), b"k"));
        assert!(!verify_signature(body, "", b"k"));
    }

    #[test]
    fn test_verify_rejects_length_mismatch() {
        let body = b"payload";
        let header = format_signature_header(&compute_signature(body, b"k"));

        // Same prefix, different length: must not compare as a prefix match
        assert!(!verify_signature(body, &header[..header.len() - 1], b"k"));
        assert!(!verify_signature(body, &format!("{}0", header), b"k"));

        let mut flipped = header.into_bytes();
        let last = flipped.len() - 1;
        flipped[last] = if flipped[last] == b'0' { b'1' } else { b'0' };
        let flipped = String::from_utf8(flipped).unwrap();
        assert!(!verify_signature(body, &flipped, b"k"));
    }

    #[test]
    fn test_verifier_dev_mode_bypass() {
        let verifier = SignatureVerifier::new(SecretString::from(PLACEHOLDER_SECRET));
        assert!(verifier.is_dev_mode());
        assert_eq!(verifier.check(b"anything", None), SignatureCheck::DevModeBypass);
        assert!(verifier.check(b"anything", Some("sha256=bad")).is_accepted());

        let empty = SignatureVerifier::new(SecretString::from(""));
        assert!(empty.is_dev_mode());
    }

    #[test]
    fn test_verifier_with_real_secret() {
        let verifier = SignatureVerifier::new(SecretString::from("s3cr3t"));
        let body = b"{}";
        let header = format_signature_header(&compute_signature(body, b"s3cr3t"));

        assert!(!verifier.is_dev_mode());
        assert_eq!(verifier.check(body, Some(&header)), SignatureCheck::Verified);
        assert_eq!(verifier.check(body, None), SignatureCheck::Rejected);
        assert_eq!(verifier.check(b"{ }", Some(&header)), SignatureCheck::Rejected);
    }

    #[test]
    fn test_verifier_debug_hides_secret() {
        let verifier = SignatureVerifier::new(SecretString::from("s3cr3t"));
        assert!(!format!("{:?}", verifier).contains("s3cr3t"));
    }
}
