/// Verification orchestrator integration tests: the three-phase protocol,
/// step ordering, and the commit-signature fallback scenarios.
use async_trait::async_trait;
use auths_resolve::{
    AttestationCheck, AuthsResult, GithubAdapter, ResolverConfig, Step, StepKind,
    VerificationEngine, VerificationOrchestrator,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use httpmock::prelude::*;
use serde_json::json;

/// Engine scripted by content: attestation bodies containing the marker
/// string "reject" fail, everything else verifies.
struct ScriptedEngine;

#[async_trait]
impl VerificationEngine for ScriptedEngine {
    async fn verify_artifact_signature(
        &self,
        _file_hash_hex: &str,
        _signature_hex: &str,
        _public_key_hex: &str,
    ) -> AuthsResult<bool> {
        Ok(true)
    }

    async fn verify_attestation(
        &self,
        attestation_json: &str,
        _issuer_public_key_hex: &str,
    ) -> AuthsResult<AttestationCheck> {
        if attestation_json.contains("reject") {
            Ok(AttestationCheck::invalid("device signature mismatch"))
        } else {
            Ok(AttestationCheck::valid())
        }
    }

    async fn verify_attestation_chain(
        &self,
        _attestations_json: &[String],
        _witness_keys_hex: &[String],
    ) -> AuthsResult<AttestationCheck> {
        Ok(AttestationCheck::valid())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn test_config(server: &MockServer) -> ResolverConfig {
    init_tracing();
    ResolverConfig {
        github_api_base: server.base_url(),
        ..ResolverConfig::default()
    }
}

fn attestation_body(subject: &str) -> serde_json::Value {
    json!({
        "version": 1,
        "rid": "sha256:deadbeef",
        "issuer": "did:key:z6MkIssuer",
        "subject": subject,
        "device_public_key": hex::encode([7u8; 32]),
        "identity_signature": "aa".repeat(64),
        "device_signature": "bb".repeat(64),
    })
}

/// Build an SSHSIG PEM with the given magic bytes and an Ed25519 key.
fn build_ssh_signature(magic: &[u8], key_data: &[u8]) -> String {
    let key_type = b"ssh-ed25519";
    let mut pubkey_section = Vec::new();
    pubkey_section.extend_from_slice(&(key_type.len() as u32).to_be_bytes());
    pubkey_section.extend_from_slice(key_type);
    pubkey_section.extend_from_slice(&(key_data.len() as u32).to_be_bytes());
    pubkey_section.extend_from_slice(key_data);

    let mut raw = Vec::new();
    raw.extend_from_slice(magic);
    raw.extend_from_slice(&1u32.to_be_bytes());
    raw.extend_from_slice(&(pubkey_section.len() as u32).to_be_bytes());
    raw.extend_from_slice(&pubkey_section);

    format!(
        "-----BEGIN SSH SIGNATURE-----\n{}\n-----END SSH SIGNATURE-----",
        STANDARD.encode(&raw)
    )
}

fn mock_release_with_assets(server: &MockServer, assets: serde_json::Value) {
    server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/releases/latest");
        then.status(200).json_body(json!({
            "tag_name": "v1.0.0",
            "assets": assets,
        }));
    });
}

async fn run_verify(server: &MockServer, input: &str) -> (auths_resolve::VerifyResult, Vec<Step>) {
    let config = test_config(server);
    let adapter = GithubAdapter::new(&config).unwrap();
    let engine = ScriptedEngine;
    let orchestrator = VerificationOrchestrator::new(&adapter, &engine, &config);

    let mut sink: Vec<Step> = Vec::new();
    let result = orchestrator
        .verify_repo(input, |step| sink.push(step.clone()))
        .await;
    (result, sink)
}

#[tokio::test]
async fn test_scenario_b_single_valid_attestation() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/dl/widget-1.0.0.auths.json");
        then.status(200).json_body(attestation_body("widget"));
    });
    mock_release_with_assets(
        &server,
        json!([{
            "name": "widget-1.0.0.auths.json",
            "browser_download_url": server.url("/dl/widget-1.0.0.auths.json"),
        }]),
    );

    let (result, sink) = run_verify(&server, "github.com/org/repo").await;

    assert!(result.success);
    assert!(result.error.is_none());
    assert!(result
        .steps
        .iter()
        .any(|s| s.kind == StepKind::Ok && s.text.contains("widget-1.0.0 verified")));
    // The sink saw exactly what the result collected, in the same order.
    assert_eq!(sink, result.steps);
}

#[tokio::test]
async fn test_step_ordering_one_per_attestation_then_summary() {
    let server = MockServer::start();

    for (name, subject) in [("a", "alpha"), ("b", "reject-me"), ("c", "gamma")] {
        let path = format!("/dl/{}.auths.json", name);
        let body = attestation_body(subject);
        server.mock(move |when, then| {
            when.method(GET).path(path.clone());
            then.status(200).json_body(body.clone());
        });
    }
    mock_release_with_assets(
        &server,
        json!([
            {"name": "a.auths.json", "browser_download_url": server.url("/dl/a.auths.json")},
            {"name": "b.auths.json", "browser_download_url": server.url("/dl/b.auths.json")},
            {"name": "c.auths.json", "browser_download_url": server.url("/dl/c.auths.json")},
        ]),
    );

    let (result, _) = run_verify(&server, "github.com/org/repo").await;

    // Exactly one ok/err step per attestation, in input order, then
    // exactly one summary step.
    let verdicts: Vec<&Step> = result
        .steps
        .iter()
        .filter(|s| matches!(s.kind, StepKind::Ok | StepKind::Err))
        .collect();
    assert_eq!(verdicts.len(), 4);
    assert!(verdicts[0].text.contains("a verified"));
    assert!(verdicts[1].text.contains("b: device signature mismatch"));
    assert!(verdicts[2].text.contains("c verified"));
    assert!(verdicts[3].text.contains("Some attestations failed"));

    // Partial failure never collapses into a pass.
    assert!(!result.success);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_scenario_a_gpg_signed_forge_verified_commit() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/releases/latest");
        then.status(404).json_body(json!({"message": "Not Found"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/commits");
        then.status(200).json_body(json!([{
            "sha": "abc123def4567890",
            "commit": {
                "message": "release: v1.0.0",
                "verification": {
                    "verified": true,
                    "signature": "-----BEGIN PGP SIGNATURE-----\nxyz\n-----END PGP SIGNATURE-----",
                },
            },
        }]));
    });

    let (result, _) = run_verify(&server, "github.com/org/repo").await;

    assert!(result.success);
    assert!(result
        .steps
        .iter()
        .any(|s| s.kind == StepKind::Info && s.text.contains("Commit abc123de")));
    assert!(result
        .steps
        .iter()
        .any(|s| s.kind == StepKind::Ok && s.text.contains("verified by forge")));
    // No key-extraction step for a GPG signature.
    assert!(!result.steps.iter().any(|s| s.text.contains("Signer key")));
}

#[tokio::test]
async fn test_multibyte_commit_sha_truncates_on_char_boundary() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/releases/latest");
        then.status(404).json_body(json!({"message": "Not Found"}));
    });
    // A forge is free to send any string as the sha, including multibyte
    // text straddling the display cutoff.
    server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/commits");
        then.status(200).json_body(json!([{
            "sha": "1234567é9abc",
            "commit": {
                "message": "release: v1.0.0",
                "verification": {
                    "verified": true,
                    "signature": "-----BEGIN PGP SIGNATURE-----\nxyz\n-----END PGP SIGNATURE-----",
                },
            },
        }]));
    });

    let (result, _) = run_verify(&server, "github.com/org/repo").await;

    assert!(result.success);
    assert!(result
        .steps
        .iter()
        .any(|s| s.kind == StepKind::Info && s.text.contains("Commit 1234567é")));
}

#[tokio::test]
async fn test_ssh_signed_commit_emits_extracted_key() {
    let server = MockServer::start();
    let key = [0x5au8; 32];
    let signature = build_ssh_signature(b"SSHSIG", &key);

    server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/releases/latest");
        then.status(404).json_body(json!({"message": "Not Found"}));
    });
    server.mock(move |when, then| {
        when.method(GET).path("/repos/org/repo/commits");
        then.status(200).json_body(json!([{
            "sha": "fedcba9876543210",
            "commit": {
                "message": "fix: widget",
                "verification": {"verified": true, "signature": signature.clone()},
            },
        }]));
    });

    let (result, _) = run_verify(&server, "github.com/org/repo").await;

    assert!(result.success);
    assert!(result
        .steps
        .iter()
        .any(|s| s.kind == StepKind::Info && s.text.starts_with("Signer key:")));
    assert!(result
        .steps
        .iter()
        .any(|s| s.text.contains("Compare this key")));
}

#[tokio::test]
async fn test_scenario_c_corrupted_sshsig_falls_back_to_forge_verdict() {
    let server = MockServer::start();
    // Corrupted magic: the armor still says SSH SIGNATURE, but the key is
    // not extractable.
    let signature = build_ssh_signature(b"SSHBAD", &[0x5au8; 32]);

    server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/releases/latest");
        then.status(404).json_body(json!({"message": "Not Found"}));
    });
    server.mock(move |when, then| {
        when.method(GET).path("/repos/org/repo/commits");
        then.status(200).json_body(json!([{
            "sha": "0011223344556677",
            "commit": {
                "message": "chore: bump",
                "verification": {"verified": true, "signature": signature.clone()},
            },
        }]));
    });

    let (result, _) = run_verify(&server, "github.com/org/repo").await;

    // Key extraction returned nothing; success rests on the forge verdict.
    assert!(result.success);
    assert!(result
        .steps
        .iter()
        .any(|s| s.text.contains("non-Ed25519, cannot extract key")));
    assert!(!result.steps.iter().any(|s| s.text.contains("Signer key")));
}

#[tokio::test]
async fn test_unverified_signature_fails() {
    let server = MockServer::start();
    let signature = build_ssh_signature(b"SSHSIG", &[0x5au8; 32]);

    server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/releases/latest");
        then.status(404).json_body(json!({"message": "Not Found"}));
    });
    server.mock(move |when, then| {
        when.method(GET).path("/repos/org/repo/commits");
        then.status(200).json_body(json!([{
            "sha": "8899aabbccddeeff",
            "commit": {
                "message": "wip",
                "verification": {"verified": false, "signature": signature.clone()},
            },
        }]));
    });

    let (result, _) = run_verify(&server, "github.com/org/repo").await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Signature not verified by forge")
    );
}

#[tokio::test]
async fn test_phase_three_nothing_found() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/releases/latest");
        then.status(404).json_body(json!({"message": "Not Found"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/org/repo/commits");
        then.status(200).json_body(json!([{
            "sha": "1234123412341234",
            "commit": {"message": "unsigned", "verification": {"verified": false}},
        }]));
    });

    let (result, _) = run_verify(&server, "github.com/org/repo").await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("No attestations or signed commits found")
    );
    assert!(result
        .steps
        .iter()
        .any(|s| s.kind == StepKind::Err && s.text.contains("No attestations")));
}

#[tokio::test]
async fn test_unparseable_url_is_structured_failure() {
    let server = MockServer::start();
    let (result, sink) = run_verify(&server, "definitely not a repo").await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Invalid repository URL"));
    assert_eq!(sink.len(), 1);
    assert_eq!(sink[0].kind, StepKind::Err);
}
