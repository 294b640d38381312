/// auths-resolve — decentralized software-identity resolution core
///
/// Given a repository URL (or a DID), this crate determines whether the
/// project publishes cryptographic identity evidence, fetches it from the
/// hosting forge, decodes the SSH signature container, and assembles a
/// verifiable attestation chain. The cryptographic primitives themselves
/// live behind the `VerificationEngine` trait and are never reimplemented
/// here.

pub mod cache;
pub mod config;
pub mod did;
pub mod engine;
pub mod error;
pub mod forge;
pub mod query;
pub mod resolver;
pub mod sshsig;
pub mod verify;

pub use cache::ResolveCache;
pub use config::ResolverConfig;
pub use did::{
    did_from_ref_name, did_key_from_public_key_hex, did_key_to_public_key_hex,
    sanitize_did_for_ref,
};
pub use engine::{AttestationCheck, VerificationEngine};
pub use error::{AuthsError, AuthsResult};
pub use forge::{
    detect_forge, Attestation, CommitSignatureInfo, ForgeAdapter, ForgeConfig, ForgeType,
    GiteaAdapter, GithubAdapter, RefEntry, ReleaseAttestation, SignatureType,
};
pub use query::{parse_search_query, ParsedSearchQuery, Platform};
pub use resolver::{IdentityBundle, IdentityResolver, ResolveResult};
pub use sshsig::extract_signer_key_from_ssh;
pub use verify::{Step, StepKind, VerificationOrchestrator, VerifyResult};
