//! Signature unit tests

use deployhook::webhooks::signature::PLACEHOLDER_SECRET;
use deployhook::webhooks::{
    compute_signature, format_signature_header, verify_signature, SignatureCheck,
    SignatureVerifier,
};
use secrecy::SecretString;

#[test]
fn test_github_style_header() {
    let body = br#"{"ref":"refs/heads/master"}"#;
    let header = format_signature_header(&compute_signature(body, b"s3cr3t"));

    assert!(header.starts_with("sha256="));
    assert_eq!(header.len(), "sha256=".len() + 64);
    assert!(verify_signature(body, &header, b"s3cr3t"));
}

#[test]
fn test_stale_signature_on_changed_body() {
    let original = br#"{"ref":"refs/heads/master"}"#;
    let changed = br#"{"ref":"refs/heads/master","forced":true}"#;
    let header = format_signature_header(&compute_signature(original, b"s3cr3t"));

    let verifier = SignatureVerifier::new(SecretString::from("s3cr3t"));
    assert_eq!(verifier.check(changed, Some(&header)), SignatureCheck::Rejected);
    assert_eq!(verifier.check(original, Some(&header)), SignatureCheck::Verified);
}

#[test]
fn test_placeholder_secret_is_dev_mode() {
    let verifier = SignatureVerifier::new(SecretString::from(PLACEHOLDER_SECRET));
    assert!(verifier.is_dev_mode());
    assert!(verifier.check(b"whatever", None).is_accepted());
}
