//! Shape normalization for wallet outputs. Providers return signatures as typed
//! buffers, plain arrays, serialized typed arrays or wrapper objects, and public
//! keys as strings or key objects; the rest of the crate only sees `Vec<u8>`
//! and `String`.

use super::SignatureOutput;
use crate::error::AuthError;
use serde_json::{Map, Value};

/// Keys a wrapper object may hold the signature under. `data` is the
/// `Buffer.toJSON()` shape.
const SIGNATURE_WRAPPER_KEYS: [&str; 2] = ["signature", "data"];
/// Keys a public key object may expose its printable form under.
const PUBLIC_KEY_KEYS: [&str; 3] = ["publicKey", "base58", "key"];
/// Wrappers nest at most this deep (`{signature: {data: [...]}}`).
const MAX_WRAPPER_DEPTH: usize = 2;

/// Normalizes `signMessage` output to raw signature bytes.
///
/// # Errors
/// Returns `InvalidSignatureFormat` when no known shape matches.
pub fn normalize_signature(output: SignatureOutput) -> Result<Vec<u8>, AuthError> {
    let bytes = match output {
        SignatureOutput::Bytes(bytes) => bytes,
        SignatureOutput::Json(value) => bytes_from_json(&value, 0)?,
    };
    if bytes.is_empty() {
        return Err(AuthError::InvalidSignatureFormat);
    }
    Ok(bytes)
}

fn bytes_from_json(value: &Value, depth: usize) -> Result<Vec<u8>, AuthError> {
    match value {
        Value::Array(items) => items.iter().map(byte_from_json).collect(),
        Value::Object(map) => {
            if let Some(inner) = SIGNATURE_WRAPPER_KEYS.iter().find_map(|key| map.get(*key)) {
                if depth >= MAX_WRAPPER_DEPTH {
                    return Err(AuthError::InvalidSignatureFormat);
                }
                return bytes_from_json(inner, depth + 1);
            }
            bytes_from_indexed(map)
        }
        _ => Err(AuthError::InvalidSignatureFormat),
    }
}

fn byte_from_json(value: &Value) -> Result<u8, AuthError> {
    value
        .as_u64()
        .and_then(|number| u8::try_from(number).ok())
        .ok_or(AuthError::InvalidSignatureFormat)
}

/// `JSON.stringify(new Uint8Array(...))` yields `{"0": b0, "1": b1, ...}`.
fn bytes_from_indexed(map: &Map<String, Value>) -> Result<Vec<u8>, AuthError> {
    let mut bytes = vec![None; map.len()];
    for (key, value) in map {
        let index = key
            .parse::<usize>()
            .map_err(|_| AuthError::InvalidSignatureFormat)?;
        let slot = bytes
            .get_mut(index)
            .ok_or(AuthError::InvalidSignatureFormat)?;
        *slot = Some(byte_from_json(value)?);
    }
    bytes
        .into_iter()
        .map(|byte| byte.ok_or(AuthError::InvalidSignatureFormat))
        .collect()
}

/// Normalizes `connect()` output to a plain public key string.
///
/// # Errors
/// Returns `InvalidResponse` when the output holds no usable key.
pub fn normalize_public_key(value: &Value) -> Result<String, AuthError> {
    public_key_from_json(value, 0)
        .ok_or_else(|| AuthError::InvalidResponse("wallet did not return a public key".into()))
}

fn public_key_from_json(value: &Value, depth: usize) -> Option<String> {
    match value {
        Value::String(key) => {
            let key = key.trim();
            (!key.is_empty()).then(|| key.to_string())
        }
        Value::Object(map) if depth < MAX_WRAPPER_DEPTH => PUBLIC_KEY_KEYS
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(|inner| public_key_from_json(inner, depth + 1)),
        _ => None,
    }
}
