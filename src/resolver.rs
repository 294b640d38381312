/// Identity Resolver
///
/// Orchestrates forge detection, the result cache, and the forge adapters
/// into a `ResolveResult`. Every failure mode short of a programmer error
/// is folded into the result; resolution never throws for data or network
/// shape problems.
use crate::cache::ResolveCache;
use crate::config::ResolverConfig;
use crate::did::{did_from_ref_name, did_key_to_public_key_hex};
use crate::error::AuthsResult;
use crate::forge::{
    detect_forge, ForgeAdapter, ForgeType, GiteaAdapter, GithubAdapter, RefEntry,
    ReleaseAttestation,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const ERR_UNSUPPORTED_REF: &str = "unsupported or unparseable repository reference";
pub const ERR_NO_IDENTITY: &str = "no identity references found";

/// The resolved identity: constructed once, immutable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityBundle {
    pub identity_did: String,
    /// 64-char lowercase hex Ed25519 key
    pub public_key_hex: String,
    /// Attestations in discovery order; verification walks this order
    pub attestation_chain: Vec<ReleaseAttestation>,
}

/// Outcome of a resolution attempt
///
/// A `None` bundle plus an error string is a normal, non-exceptional
/// outcome (unrecognized input, no published evidence, transport failure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveResult {
    pub bundle: Option<IdentityBundle>,
    pub error: Option<String>,
}

impl ResolveResult {
    fn found(bundle: IdentityBundle) -> Self {
        Self {
            bundle: Some(bundle),
            error: None,
        }
    }

    fn not_found(error: &str) -> Self {
        Self {
            bundle: None,
            error: Some(error.to_string()),
        }
    }
}

/// Main identity resolver: detector + adapters + cache
pub struct IdentityResolver {
    cache: ResolveCache,
    github: GithubAdapter,
    gitea: GiteaAdapter,
    config: ResolverConfig,
}

impl IdentityResolver {
    /// Create a resolver with an injected cache
    pub fn new(cache: ResolveCache, config: ResolverConfig) -> AuthsResult<Self> {
        Ok(Self {
            github: GithubAdapter::new(&config)?,
            gitea: GiteaAdapter::new(&config)?,
            cache,
            config,
        })
    }

    /// Convenience constructor: cache TTL taken from the config
    pub fn from_config(config: ResolverConfig) -> AuthsResult<Self> {
        let cache = ResolveCache::new(config.cache_ttl());
        Self::new(cache, config)
    }

    /// The shared cache, exposing `clear()` for callers that need to force
    /// a fresh resolution after a known state change
    pub fn cache(&self) -> &ResolveCache {
        &self.cache
    }

    /// Select the adapter implementation for a forge type
    fn adapter_for(&self, forge_type: ForgeType) -> &dyn ForgeAdapter {
        match forge_type {
            ForgeType::Github => &self.github,
            ForgeType::Gitea => &self.gitea,
        }
    }

    /// Resolve a repo URL (or host/owner/repo string) to an identity bundle
    pub async fn resolve_from_repo(&self, input: &str) -> ResolveResult {
        // 1. Detect the forge; unrecognized input is an expected outcome.
        let forge_config = match detect_forge(input, &self.config) {
            Some(c) => c,
            None => {
                debug!("Unrecognized repository reference: {}", input);
                return ResolveResult::not_found(ERR_UNSUPPORTED_REF);
            }
        };

        // 2. Cache lookup on the normalized input.
        let key = forge_config.cache_key();
        if let Some(hit) = self.cache.get(&key).await {
            return hit;
        }

        // 3.-4. Gather evidence and assemble the bundle.
        let adapter = self.adapter_for(forge_config.forge_type);

        let releases = adapter
            .fetch_release_attestations(&forge_config.owner, &forge_config.repo)
            .await;

        let refs = match adapter.list_refs(&forge_config).await {
            Ok(refs) => refs,
            Err(e) => {
                // Transport failure on refs is folded, not fatal: release
                // evidence may still carry the identity.
                warn!("Identity ref listing failed for {}: {}", key, e);
                Vec::new()
            }
        };

        let result = match assemble_bundle(releases, &refs, Utc::now()) {
            Some(bundle) => ResolveResult::found(bundle),
            None => {
                debug!("No identity evidence for {}", key);
                ResolveResult::not_found(ERR_NO_IDENTITY)
            }
        };

        // 5. Cache the complete result; partial bundles never reach here.
        self.cache.set(&key, result.clone()).await;
        result
    }
}

/// Assemble an `IdentityBundle` from gathered evidence.
///
/// Release attestations take precedence: the identity DID comes from the
/// first non-revoked, non-expired attestation carrying a decodable issuer
/// (or device key), and the whole chain is kept in discovery order. With
/// no attestations, a DID recovered from an identity ref name yields a
/// bundle with an empty chain. No usable evidence yields `None`.
fn assemble_bundle(
    releases: Option<(String, Vec<ReleaseAttestation>)>,
    refs: &[RefEntry],
    now: DateTime<Utc>,
) -> Option<IdentityBundle> {
    if let Some((_tag, attestations)) = releases {
        for att in &attestations {
            if !att.attestation.is_usable(now) {
                warn!("Skipping revoked or expired attestation {}", att.asset_name);
                continue;
            }
            let did = match &att.attestation.issuer {
                Some(issuer) => issuer.clone(),
                None => continue,
            };

            // The issuer key must be valid fixed-length hex before it can
            // reach the external verifier; fall back to the device key
            // when the issuer DID is not a decodable did:key.
            let public_key_hex = match did_key_to_public_key_hex(&did) {
                Ok(hex) => hex,
                Err(_) => match att
                    .attestation
                    .device_public_key
                    .as_deref()
                    .map(did_key_to_public_key_hex)
                {
                    Some(Ok(hex)) => hex,
                    _ => {
                        warn!("Skipping attestation {} with undecodable keys", att.asset_name);
                        continue;
                    }
                },
            };

            return Some(IdentityBundle {
                identity_did: did,
                public_key_hex,
                attestation_chain: attestations.clone(),
            });
        }
        // All attestations undecodable: escalate to evidence-not-found
        // unless a ref still recovers an identity below.
    }

    for entry in refs {
        let did = match did_from_ref_name(&entry.name) {
            Some(did) => did,
            None => continue,
        };
        match did_key_to_public_key_hex(&did) {
            Ok(public_key_hex) => {
                return Some(IdentityBundle {
                    identity_did: did,
                    public_key_hex,
                    attestation_chain: Vec::new(),
                });
            }
            Err(e) => {
                warn!("Ref {} recovered undecodable DID: {}", entry.name, e);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did::{did_key_from_public_key_hex, sanitize_did_for_ref};
    use crate::forge::Attestation;

    fn attestation_with(issuer: Option<&str>, device_key: Option<&str>) -> ReleaseAttestation {
        ReleaseAttestation {
            tag: "v1.0.0".to_string(),
            asset_name: "widget-1.0.0.auths.json".to_string(),
            artifact_name: "widget-1.0.0".to_string(),
            attestation: Attestation {
                version: None,
                rid: Some("sha256:abcd".to_string()),
                issuer: issuer.map(String::from),
                subject: None,
                device_public_key: device_key.map(String::from),
                identity_signature: None,
                device_signature: Some("00".repeat(64)),
                revoked: None,
                expires_at: None,
                timestamp: None,
                payload: None,
            },
            raw: "{}".to_string(),
        }
    }

    #[test]
    fn test_bundle_from_attestation_issuer() {
        let key_hex = hex::encode([5u8; 32]);
        let issuer = did_key_from_public_key_hex(&key_hex).unwrap();
        let atts = vec![attestation_with(Some(&issuer), None)];

        let bundle = assemble_bundle(Some(("v1.0.0".to_string(), atts)), &[], Utc::now()).unwrap();
        assert_eq!(bundle.identity_did, issuer);
        assert_eq!(bundle.public_key_hex, key_hex);
        assert_eq!(bundle.attestation_chain.len(), 1);
    }

    #[test]
    fn test_bundle_falls_back_to_device_key() {
        let device_hex = hex::encode([6u8; 32]);
        let atts = vec![attestation_with(
            Some("did:keri:EOpaqueIssuer"),
            Some(&device_hex),
        )];

        let bundle = assemble_bundle(Some(("v1".to_string(), atts)), &[], Utc::now()).unwrap();
        assert_eq!(bundle.identity_did, "did:keri:EOpaqueIssuer");
        assert_eq!(bundle.public_key_hex, device_hex);
    }

    #[test]
    fn test_revoked_attestation_never_anchors_identity() {
        let key_hex = hex::encode([5u8; 32]);
        let issuer = did_key_from_public_key_hex(&key_hex).unwrap();
        let other_hex = hex::encode([8u8; 32]);
        let other = did_key_from_public_key_hex(&other_hex).unwrap();

        let mut revoked = attestation_with(Some(&issuer), None);
        revoked.attestation.revoked = Some(true);
        let live = attestation_with(Some(&other), None);

        let bundle =
            assemble_bundle(Some(("v1".to_string(), vec![revoked, live])), &[], Utc::now())
                .unwrap();
        // The revoked attestation is passed over; the live one anchors.
        assert_eq!(bundle.identity_did, other);
        assert_eq!(bundle.public_key_hex, other_hex);
    }

    #[test]
    fn test_chain_preserves_discovery_order() {
        let key_hex = hex::encode([5u8; 32]);
        let issuer = did_key_from_public_key_hex(&key_hex).unwrap();
        let mut first = attestation_with(Some(&issuer), None);
        first.asset_name = "a.auths.json".to_string();
        let mut second = attestation_with(Some(&issuer), None);
        second.asset_name = "b.auths.json".to_string();

        let bundle =
            assemble_bundle(Some(("v1".to_string(), vec![first, second])), &[], Utc::now()).unwrap();
        assert_eq!(bundle.attestation_chain[0].asset_name, "a.auths.json");
        assert_eq!(bundle.attestation_chain[1].asset_name, "b.auths.json");
    }

    #[test]
    fn test_bundle_from_identity_ref() {
        let key_hex = hex::encode([9u8; 32]);
        let did = did_key_from_public_key_hex(&key_hex).unwrap();
        let refs = vec![
            RefEntry {
                name: "refs/auths/not-an-identity".to_string(),
                target: "aaaa".to_string(),
            },
            RefEntry {
                name: format!("refs/auths/{}", sanitize_did_for_ref(&did)),
                target: "bbbb".to_string(),
            },
        ];

        let bundle = assemble_bundle(None, &refs, Utc::now()).unwrap();
        assert_eq!(bundle.identity_did, did);
        assert_eq!(bundle.public_key_hex, key_hex);
        assert!(bundle.attestation_chain.is_empty());
    }

    #[test]
    fn test_no_evidence_is_none() {
        assert!(assemble_bundle(None, &[], Utc::now()).is_none());
        // Attestations with no decodable identity and foreign refs
        let atts = vec![attestation_with(None, None)];
        let refs = vec![RefEntry {
            name: "refs/heads/main".to_string(),
            target: "cccc".to_string(),
        }];
        assert!(assemble_bundle(Some(("v1".to_string(), atts)), &refs, Utc::now()).is_none());
    }

    #[tokio::test]
    async fn test_unparseable_reference_is_structured_error() {
        let config = ResolverConfig::default();
        let resolver = IdentityResolver::from_config(config).unwrap();

        let result = resolver.resolve_from_repo("not a repo at all").await;
        assert!(result.bundle.is_none());
        assert_eq!(result.error.as_deref(), Some(ERR_UNSUPPORTED_REF));
    }
}
