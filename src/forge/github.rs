/// GitHub forge adapter (REST API v3)
use crate::config::ResolverConfig;
use crate::error::{AuthsError, AuthsResult};
use crate::forge::{
    Attestation, CommitSignatureInfo, ForgeAdapter, ForgeConfig, RefEntry, ReleaseAttestation,
    SignatureType, ATTESTATION_SUFFIX, IDENTITY_REF_NAMESPACE,
};
use crate::sshsig::extract_signer_key_from_ssh;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
}

#[derive(Debug, Deserialize)]
struct GithubRef {
    #[serde(rename = "ref")]
    name: String,
    object: Option<GithubRefObject>,
}

#[derive(Debug, Deserialize)]
struct GithubRefObject {
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubCommitEntry {
    sha: String,
    commit: Option<GithubCommitDetail>,
}

#[derive(Debug, Deserialize)]
struct GithubCommitDetail {
    message: Option<String>,
    verification: Option<GithubVerification>,
}

#[derive(Debug, Deserialize)]
struct GithubVerification {
    #[serde(default)]
    verified: bool,
    signature: Option<String>,
}

/// Adapter for github.com (and GitHub-compatible API bases)
pub struct GithubAdapter {
    http_client: reqwest::Client,
    api_base: String,
}

impl GithubAdapter {
    /// Create an adapter from resolver configuration
    pub fn new(config: &ResolverConfig) -> AuthsResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| AuthsError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_base: config.github_api_base.trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, owner: &str, repo: &str, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base,
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            tail
        )
    }
}

#[async_trait]
impl ForgeAdapter for GithubAdapter {
    async fn list_refs(&self, config: &ForgeConfig) -> AuthsResult<Vec<RefEntry>> {
        let url = self.repo_url(
            &config.owner,
            &config.repo,
            &format!("git/matching-refs/{}", IDENTITY_REF_NAMESPACE),
        );
        debug!("Listing identity refs: {}", url);

        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            // 404 means the namespace (or repo) has no refs; not an error.
            debug!("No identity refs at {} ({})", url, response.status());
            return Ok(Vec::new());
        }

        let refs: Vec<GithubRef> = response
            .json()
            .await
            .map_err(|e| AuthsError::Decode(format!("Invalid refs response: {}", e)))?;

        Ok(refs
            .into_iter()
            .map(|r| RefEntry {
                name: r.name,
                target: r.object.and_then(|o| o.sha).unwrap_or_default(),
            })
            .collect())
    }

    async fn fetch_release_attestations(
        &self,
        owner: &str,
        repo: &str,
    ) -> Option<(String, Vec<ReleaseAttestation>)> {
        let url = self.repo_url(owner, repo, "releases/latest");

        let response = match self
            .http_client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Release fetch failed for {}: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("No latest release at {} ({})", url, response.status());
            return None;
        }

        let release: GithubRelease = match response.json().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Invalid release JSON from {}: {}", url, e);
                return None;
            }
        };

        let auths_assets: Vec<&GithubAsset> = release
            .assets
            .iter()
            .filter(|a| a.name.ends_with(ATTESTATION_SUFFIX))
            .collect();
        if auths_assets.is_empty() {
            return None;
        }

        let mut attestations = Vec::new();
        for asset in auths_assets {
            // A malformed individual asset is skipped, not fatal to the call.
            let raw = match self
                .http_client
                .get(&asset.browser_download_url)
                .header("Accept", "application/octet-stream")
                .send()
                .await
            {
                Ok(r) if r.status().is_success() => match r.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        warn!("Asset body read failed for {}: {}", asset.name, e);
                        continue;
                    }
                },
                Ok(r) => {
                    warn!("Asset download failed for {}: {}", asset.name, r.status());
                    continue;
                }
                Err(e) => {
                    warn!("Asset download failed for {}: {}", asset.name, e);
                    continue;
                }
            };

            let attestation: Attestation = match serde_json::from_str(&raw) {
                Ok(a) => a,
                Err(e) => {
                    warn!("Skipping malformed attestation {}: {}", asset.name, e);
                    continue;
                }
            };

            attestations.push(ReleaseAttestation {
                tag: release.tag_name.clone(),
                asset_name: asset.name.clone(),
                artifact_name: asset
                    .name
                    .strip_suffix(ATTESTATION_SUFFIX)
                    .unwrap_or(&asset.name)
                    .to_string(),
                attestation,
                raw,
            });
        }

        if attestations.is_empty() {
            return None;
        }
        Some((release.tag_name, attestations))
    }

    async fn fetch_commit_signature(
        &self,
        owner: &str,
        repo: &str,
    ) -> Option<CommitSignatureInfo> {
        let url = self.repo_url(owner, repo, "commits?per_page=1");

        let response = match self.http_client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Commit fetch failed for {}: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("No commits at {} ({})", url, response.status());
            return None;
        }

        let commits: Vec<GithubCommitEntry> = match response.json().await {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid commits JSON from {}: {}", url, e);
                return None;
            }
        };
        let commit = commits.into_iter().next()?;

        let detail = commit.commit;
        let verification = detail.as_ref().and_then(|d| d.verification.as_ref());

        let mut signature_type = SignatureType::None;
        let mut signer_key_hex = None;

        if let Some(sig) = verification.and_then(|v| v.signature.as_deref()) {
            if sig.contains("SSH SIGNATURE") {
                signature_type = SignatureType::Ssh;
                signer_key_hex = extract_signer_key_from_ssh(sig);
            } else if sig.starts_with("-----BEGIN PGP") {
                signature_type = SignatureType::Gpg;
            }
        }

        Some(CommitSignatureInfo {
            sha: commit.sha,
            message: detail
                .as_ref()
                .and_then(|d| d.message.clone())
                .unwrap_or_default(),
            signer_key_hex,
            forge_verified: verification.map(|v| v.verified).unwrap_or(false),
            signature_type,
        })
    }
}
