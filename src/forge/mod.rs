/// Forge access layer
///
/// Classifies repository references into a `ForgeConfig` and defines the
/// uniform adapter capability set each supported forge implements:
/// identity refs, release attestations, and commit-signature metadata.
pub mod gitea;
pub mod github;

pub use gitea::GiteaAdapter;
pub use github::GithubAdapter;

use crate::config::ResolverConfig;
use crate::error::AuthsResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Asset-name suffix marking a release attestation file
pub const ATTESTATION_SUFFIX: &str = ".auths.json";

/// Ref namespace under which identity refs are published
pub const IDENTITY_REF_NAMESPACE: &str = "auths/";

/// Supported forge types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForgeType {
    Github,
    Gitea,
}

/// A detected forge target, built once by the detector and immutable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForgeConfig {
    pub forge_type: ForgeType,
    pub owner: String,
    pub repo: String,
    pub host: String,
}

impl ForgeConfig {
    /// Normalized cache key for this target
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.host, self.owner, self.repo)
    }
}

/// A candidate identity-bearing reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefEntry {
    pub name: String,
    pub target: String,
}

/// Parsed attestation body from a release asset
///
/// Unknown JSON fields are ignored; missing optional fields are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attestation {
    pub version: Option<serde_json::Value>,
    /// Artifact digest reference, e.g. "sha256:<hex>"
    pub rid: Option<String>,
    pub issuer: Option<String>,
    pub subject: Option<String>,
    pub device_public_key: Option<String>,
    pub identity_signature: Option<String>,
    pub device_signature: Option<String>,
    #[serde(default)]
    pub revoked: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
    pub timestamp: Option<DateTime<Utc>>,
    pub payload: Option<serde_json::Value>,
}

impl Attestation {
    /// Whether the attestation has lapsed at `now`. Missing `expires_at`
    /// means no expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    /// Whether the attestation can anchor an identity: not revoked and
    /// not expired.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked != Some(true) && !self.is_expired(now)
    }
}

/// One attestation asset from a release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseAttestation {
    pub tag: String,
    pub asset_name: String,
    pub artifact_name: String,
    pub attestation: Attestation,
    /// The raw JSON body as downloaded, byte-for-byte
    pub raw: String,
}

/// Signature algorithm reported on a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureType {
    Ssh,
    Gpg,
    None,
}

/// Signature metadata for the latest commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSignatureInfo {
    pub sha: String,
    pub message: String,
    /// Extracted Ed25519 key, only present for SSH signatures
    pub signer_key_hex: Option<String>,
    /// The forge's own verification verdict for the signature
    pub forge_verified: bool,
    pub signature_type: SignatureType,
}

/// Uniform capability set per forge
///
/// No internal retries: retry policy, if any, belongs to the caller.
/// "Forge said no evidence" and transport failure both surface as `None`
/// from the fetch operations; transport failures are logged at warn level.
#[async_trait]
pub trait ForgeAdapter: Send + Sync {
    /// List identity refs for the repo; empty when none exist
    async fn list_refs(&self, config: &ForgeConfig) -> AuthsResult<Vec<RefEntry>>;

    /// Fetch attestation assets from the latest release
    async fn fetch_release_attestations(
        &self,
        owner: &str,
        repo: &str,
    ) -> Option<(String, Vec<ReleaseAttestation>)>;

    /// Fetch the latest commit's signature metadata
    async fn fetch_commit_signature(&self, owner: &str, repo: &str)
        -> Option<CommitSignatureInfo>;
}

/// Classify a raw string into a forge target
///
/// Strips the scheme, matches the fixed host table (github.com plus the
/// configured self-hosted Gitea host), and extracts owner/repo tolerating
/// a trailing slash. Returns `None` when no host matches or the path does
/// not carry exactly owner and repo; callers branch on `None` as an
/// expected, frequent case.
pub fn detect_forge(input: &str, config: &ResolverConfig) -> Option<ForgeConfig> {
    let stripped = input
        .trim()
        .strip_prefix("https://")
        .or_else(|| input.trim().strip_prefix("http://"))
        .unwrap_or_else(|| input.trim());

    let (host, path) = stripped.split_once('/')?;

    let forge_type = if host == "github.com" {
        ForgeType::Github
    } else if host == config.gitea_host {
        ForgeType::Gitea
    } else {
        return None;
    };

    let path = path.trim_end_matches('/');
    let mut segments = path.split('/');
    let owner = segments.next()?;
    let repo = segments.next()?;
    if owner.is_empty() || repo.is_empty() || segments.next().is_some() {
        return None;
    }

    Some(ForgeConfig {
        forge_type,
        owner: owner.to_string(),
        repo: repo.to_string(),
        host: host.to_string(),
    })
}
