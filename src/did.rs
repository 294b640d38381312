/// did:key codec and ref-name sanitization
///
/// Converts between `did:key` Ed25519 identifiers and raw public-key hex,
/// following the DID Key Method: the key bytes are prefixed with the
/// Ed25519 multicodec (0xed 0x01) and multibase-encoded as base58btc.
use crate::error::{AuthsError, AuthsResult};
use multibase::Base;
use sha2::{Digest, Sha256};

const DID_KEY_PREFIX: &str = "did:key:";
const ED25519_MULTICODEC_PREFIX: [u8; 2] = [0xed, 0x01];
const ED25519_KEY_LEN: usize = 32;
const REF_FINGERPRINT_LEN: usize = 8;

/// Decode a `did:key:z...` Ed25519 identifier to 64-char lowercase hex.
///
/// A bare 64-hex-character string is accepted directly, bypassing DID
/// decoding. Wrong multibase/multicodec prefixes and wrong key lengths
/// fail with a typed decode error.
pub fn did_key_to_public_key_hex(did: &str) -> AuthsResult<String> {
    // Already raw hex: pass through.
    if did.len() == ED25519_KEY_LEN * 2 && did.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(did.to_lowercase());
    }

    let encoded = did
        .strip_prefix(DID_KEY_PREFIX)
        .ok_or_else(|| AuthsError::Decode(format!("Not a did:key identifier: {}", did)))?;

    let (base, decoded) = multibase::decode(encoded)
        .map_err(|e| AuthsError::Decode(format!("Invalid multibase encoding: {}", e)))?;
    if base != Base::Base58Btc {
        return Err(AuthsError::Decode(
            "did:key must use base58btc multibase (z prefix)".to_string(),
        ));
    }

    if decoded.len() != ED25519_MULTICODEC_PREFIX.len() + ED25519_KEY_LEN
        || decoded[..2] != ED25519_MULTICODEC_PREFIX
    {
        return Err(AuthsError::Decode(
            "Unsupported key type, expected Ed25519 multicodec".to_string(),
        ));
    }

    Ok(hex::encode(&decoded[2..]))
}

/// Build a `did:key` identifier from 64 hex characters of Ed25519 key.
pub fn did_key_from_public_key_hex(public_key_hex: &str) -> AuthsResult<String> {
    let key_bytes = hex::decode(public_key_hex)
        .map_err(|e| AuthsError::Decode(format!("Invalid public key hex: {}", e)))?;
    if key_bytes.len() != ED25519_KEY_LEN {
        return Err(AuthsError::Decode(format!(
            "Ed25519 public key must be {} bytes, got {}",
            ED25519_KEY_LEN,
            key_bytes.len()
        )));
    }

    let mut prefixed = Vec::with_capacity(ED25519_MULTICODEC_PREFIX.len() + key_bytes.len());
    prefixed.extend_from_slice(&ED25519_MULTICODEC_PREFIX);
    prefixed.extend_from_slice(&key_bytes);

    Ok(format!(
        "{}{}",
        DID_KEY_PREFIX,
        multibase::encode(Base::Base58Btc, &prefixed)
    ))
}

/// Map a DID to characters legal in a version-control reference name.
///
/// Deterministic and collision-resistant: `:` becomes `-`, any other
/// ref-illegal character is dropped, and the first 8 hex characters of
/// sha256(did) are appended as a fingerprint. Same input, same output.
pub fn sanitize_did_for_ref(did: &str) -> String {
    let body: String = did
        .chars()
        .map(|c| if c == ':' { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .collect();

    format!("{}-{}", body, did_fingerprint(did))
}

/// Recover a `did:key:...` from a sanitized ref name.
///
/// Only the `did-key-<multibase>` form is recoverable; the embedded
/// fingerprint must match, otherwise the name is treated as foreign.
pub fn did_from_ref_name(name: &str) -> Option<String> {
    // Strip any ref namespace prefix (e.g. "refs/auths/", "auths/").
    let name = name.rsplit('/').next()?;

    let (body, fingerprint) = name.rsplit_once('-')?;
    if fingerprint.len() != REF_FINGERPRINT_LEN {
        return None;
    }

    let encoded = body.strip_prefix("did-key-")?;
    let did = format!("{}{}", DID_KEY_PREFIX, encoded);

    if did_fingerprint(&did) != fingerprint {
        return None;
    }
    Some(did)
}

fn did_fingerprint(did: &str) -> String {
    let digest = Sha256::digest(did.as_bytes());
    hex::encode(&digest[..REF_FINGERPRINT_LEN / 2])
}
