//! GitHub webhook authentication and event filtering

pub mod event;
pub mod signature;

pub use event::{should_deploy, PushEvent, HEADER_DELIVERY, HEADER_EVENT, HEADER_SIGNATURE};
pub use signature::{
    compute_signature, format_signature_header, verify_signature, SignatureCheck,
    SignatureVerifier,
};
