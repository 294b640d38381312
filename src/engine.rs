/// External verification engine seam
///
/// The cryptographic checks (Ed25519 math, attestation chain and quorum
/// validation) are performed by an external engine behind this trait.
/// This core supplies well-formed hex and JSON and interprets the
/// boolean/error outputs only; it never reimplements the primitives.
use crate::error::AuthsResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of an attestation check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationCheck {
    pub valid: bool,
    pub error: Option<String>,
}

impl AttestationCheck {
    pub fn valid() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(reason.into()),
        }
    }
}

/// Black-box verification oracle
///
/// The verification orchestrator drives `verify_attestation` only;
/// `verify_artifact_signature` and `verify_attestation_chain` complete the
/// oracle surface for callers that download artifacts or walk
/// multi-attestation chains themselves.
#[async_trait]
pub trait VerificationEngine: Send + Sync {
    /// Verify a detached Ed25519 signature over a file hash
    async fn verify_artifact_signature(
        &self,
        file_hash_hex: &str,
        signature_hex: &str,
        public_key_hex: &str,
    ) -> AuthsResult<bool>;

    /// Verify a single attestation against the issuer's public key
    async fn verify_attestation(
        &self,
        attestation_json: &str,
        issuer_public_key_hex: &str,
    ) -> AuthsResult<AttestationCheck>;

    /// Verify an attestation chain against a witness key set (quorum rules
    /// are the engine's concern)
    async fn verify_attestation_chain(
        &self,
        attestations_json: &[String],
        witness_keys_hex: &[String],
    ) -> AuthsResult<AttestationCheck>;
}
