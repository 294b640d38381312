/// SSH detached-signature (SSHSIG) decoding
///
/// The SSHSIG container embeds the signer's public key. Binary layout:
///   "SSHSIG" (6 bytes) -> version (u32 be) -> public_key_section_len (u32)
///     -> key_type_len (u32) -> key type string ("ssh-ed25519")
///     -> key_data_len (u32, must be 32) -> key data (32 bytes)
///
/// Only the embedded key is read here; the signature itself is checked by
/// the external verification engine.
use base64::{engine::general_purpose::STANDARD, Engine};

const SSHSIG_MAGIC: &[u8; 6] = b"SSHSIG";
const SSHSIG_VERSION: u32 = 1;
const ED25519_KEY_TYPE: &[u8] = b"ssh-ed25519";
const ED25519_KEY_LEN: usize = 32;

/// Extract the Ed25519 public key from a PEM-wrapped SSH signature.
///
/// Returns the 32-byte key as 64 lowercase hex characters, or `None` when
/// the key is not extractable: wrong magic, wrong version, a non-Ed25519
/// key type, or truncated/garbage input. Never panics.
pub fn extract_signer_key_from_ssh(signature_pem: &str) -> Option<String> {
    let b64: String = signature_pem
        .replace("-----BEGIN SSH SIGNATURE-----", "")
        .replace("-----END SSH SIGNATURE-----", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let raw = STANDARD.decode(b64.as_bytes()).ok()?;

    if raw.len() < SSHSIG_MAGIC.len() || &raw[..SSHSIG_MAGIC.len()] != SSHSIG_MAGIC {
        return None;
    }

    let mut offset = SSHSIG_MAGIC.len();

    let version = read_u32(&raw, &mut offset)?;
    if version != SSHSIG_VERSION {
        return None;
    }

    // Public key section length; the key type and key data live inside it.
    let _pubkey_section_len = read_u32(&raw, &mut offset)?;

    let key_type_len = read_u32(&raw, &mut offset)? as usize;
    let key_type = read_bytes(&raw, &mut offset, key_type_len)?;
    if key_type != ED25519_KEY_TYPE {
        return None;
    }

    let key_data_len = read_u32(&raw, &mut offset)? as usize;
    if key_data_len != ED25519_KEY_LEN {
        return None;
    }

    let key_data = read_bytes(&raw, &mut offset, ED25519_KEY_LEN)?;
    Some(hex::encode(key_data))
}

/// Read a big-endian u32, advancing the offset. `None` if truncated.
fn read_u32(buf: &[u8], offset: &mut usize) -> Option<u32> {
    let bytes = read_bytes(buf, offset, 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read `len` bytes, advancing the offset. `None` if truncated.
fn read_bytes<'a>(buf: &'a [u8], offset: &mut usize, len: usize) -> Option<&'a [u8]> {
    let end = offset.checked_add(len)?;
    if end > buf.len() {
        return None;
    }
    let slice = &buf[*offset..end];
    *offset = end;
    Some(slice)
}
