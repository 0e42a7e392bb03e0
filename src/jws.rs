//! JWS compact serialization: `sign_compact` builds the
//! three-segment `header.payload.signature` form; `extract` reverses it,
//! selecting and verifying against a candidate key. JWS JSON
//! Serialization is out of scope — any non-compact input is
//! rejected at the first structural check.

use crate::base64url::{self, SecureBytes};
use crate::error::{here, Error, Result};
use crate::json::{self, Limits, Value};
use crate::jwa;
use crate::jwk::{Jwk, JwkSet};

fn jws_error(reason: impl Into<String>) -> Error {
    Error::JwsError {
        reason: reason.into(),
        loc: here!(),
    }
}

fn is_base64url_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// Signs `payload_bytes` under `key`, producing a compact JWS. `header`
/// supplies any caller headers beyond `alg`/`kid`; those two are always
/// overridden from `key`.
pub fn sign_compact(key: &Jwk, header: Option<Value>, payload_bytes: &[u8]) -> Result<String> {
    if !key.can_sign() {
        return Err(jws_error(format!(
            "key '{}' is not marked for signing",
            key.kid()
        )));
    }
    let alg = key
        .alg()
        .ok_or_else(|| jws_error(format!("key '{}' has no 'alg'", key.kid())))?;
    let signer = jwa::signer(alg)?;

    let mut header = match header {
        Some(h) if h.is_object() => h,
        Some(_) => return Err(jws_error("header must be a JSON object")),
        None => Value::object(),
    };
    {
        let obj = header.as_object_mut().expect("header is an object");
        obj.set("alg", Value::string(alg))?;
        obj.set("kid", Value::string(key.kid()))?;
    }

    let encoded_header = base64url::encode(header.to_json().as_bytes());
    let encoded_payload = base64url::encode(payload_bytes);
    let signing_input = format!("{encoded_header}.{encoded_payload}");
    let signature = signer.sign(key, signing_input.as_bytes())?;

    Ok(format!("{signing_input}.{signature}"))
}

/// Decodes only the header segment of a compact JWS, without verifying
/// the signature. Used by the JWT driver to inspect `enc`/`cty` before
/// deciding whether to verify or descend into a nested layer: the
/// structural requirement here is looser than
/// [`extract`]'s ("at least one `.`" rather than exactly three
/// segments), since the caller may be mid-way through peeling nested
/// JWTs.
pub fn decode_header(jws: &str) -> Result<Value> {
    if jws.is_empty() {
        return Err(jws_error("empty input"));
    }
    match jws.as_bytes().first() {
        Some(&b) if is_base64url_char(b) => {}
        _ => {
            return Err(jws_error(
                "input does not start with a base64url character",
            ))
        }
    }
    let Some(header_seg) = jws.split('.').next() else {
        return Err(jws_error("missing '.' separator"));
    };
    if !jws.contains('.') {
        return Err(jws_error("missing '.' separator"));
    }
    let header_bytes = base64url::decode(header_seg)?;
    let header_text = std::str::from_utf8(header_bytes.as_ref())
        .map_err(|_| jws_error("header is not valid UTF-8"))?;
    json::parse_object(header_text, &Limits::for_jose_header())
}

/// Splits, decodes, and verifies a compact JWS against `val_keys`,
/// returning the key that verified it and the decoded payload. `None`
/// verification is refused unless `allow_none` is set explicitly by the
/// caller.
pub fn extract(val_keys: &JwkSet, jws: &str, allow_none: bool) -> Result<(Jwk, SecureBytes)> {
    if jws.is_empty() {
        return Err(jws_error("empty input"));
    }
    match jws.as_bytes().first() {
        Some(&b) if is_base64url_char(b) => {}
        _ => {
            return Err(jws_error(
                "input does not start with a base64url character (JWS JSON Serialization is unsupported)",
            ))
        }
    }

    let segments: Vec<&str> = jws.split('.').collect();
    if segments.len() != 3 {
        return Err(jws_error(format!(
            "expected 3 dot-separated segments, found {}",
            segments.len()
        )));
    }
    let [header_seg, payload_seg, sig_seg] = [segments[0], segments[1], segments[2]];

    let header_bytes = base64url::decode(header_seg)?;
    let header_text = std::str::from_utf8(header_bytes.as_ref())
        .map_err(|_| jws_error("header is not valid UTF-8"))?;
    let header = json::parse_object(header_text, &Limits::for_jose_header())?;
    let header_obj = header.as_object().expect("parse_object guarantees an object");

    let alg = header_obj
        .get("alg")
        .map_err(|_| jws_error("header is missing 'alg'"))?
        .as_str()
        .map_err(|_| jws_error("'alg' must be a string"))?;

    if jwa::is_none_algorithm(alg) && !allow_none {
        tracing::warn!(alg, "rejecting alg:none without explicit opt-in");
        return Err(jws_error("alg:none is disabled by default"));
    }
    let verifier = jwa::verifier(alg)?;

    let signing_input = format!("{header_seg}.{payload_seg}");
    let sig_bytes = base64url::decode(sig_seg)?;

    let header_kid = header_obj.get("kid").ok().and_then(|v| v.as_str().ok());

    let selected = select_and_verify(val_keys, header_kid, alg, verifier, signing_input.as_bytes(), sig_bytes.as_ref())?;

    let payload_bytes = base64url::decode(payload_seg)?;
    Ok((selected, payload_bytes))
}

fn select_and_verify(
    val_keys: &JwkSet,
    header_kid: Option<&str>,
    alg: &str,
    verifier: &'static dyn jwa::Verifier,
    signing_input: &[u8],
    signature: &[u8],
) -> Result<Jwk> {
    if let Some(kid) = header_kid {
        if let Ok(key) = val_keys.get_key(kid) {
            if key.alg() != Some(alg) {
                return Err(jws_error(format!(
                    "key '{kid}' does not support algorithm '{alg}'"
                )));
            }
            return match verifier.verify(key, signing_input, signature) {
                Ok(true) => Ok(key.clone_deep()),
                Ok(false) => Err(jws_error("signature verification failed")),
                Err(e) => Err(e),
            };
        }
        tracing::warn!(kid, "JWS header names a kid absent from the candidate key set");
    }

    for key in val_keys.iter() {
        if key.alg() != Some(alg) || !key.can_verify() {
            continue;
        }
        if let Ok(true) = verifier.verify(key, signing_input, signature) {
            return Ok(key.clone_deep());
        }
    }

    match header_kid {
        Some(kid) if !val_keys.contains(kid) => Err(jws_error(format!(
            "no key verified the signature (stated kid '{kid}' is absent from the candidate set)"
        ))),
        _ => Err(jws_error("no key verified the signature")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::Value;
    use crate::jwk::{parse_jwk, JwkSet};

    fn key_bytes_for(kid: &str) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (i, b) in kid.bytes().cycle().take(32).enumerate() {
            bytes[i] = b ^ (i as u8);
        }
        bytes
    }

    fn hmac_jwk(kid: &str) -> crate::jwk::Jwk {
        let k = base64url::encode(&key_bytes_for(kid));
        let text = format!(r#"{{"kty":"oct","alg":"HS256","kid":"{kid}","k":"{k}","use":"sig"}}"#);
        parse_jwk(&text).unwrap()
    }

    #[test]
    fn sign_then_extract_round_trip() {
        let key = hmac_jwk("k1");
        let jws = sign_compact(&key, None, b"hello").unwrap();
        let mut set = JwkSet::new();
        set.add_key(key).unwrap();
        let (used, payload) = extract(&set, &jws, false).unwrap();
        assert_eq!(used.kid(), "k1");
        assert_eq!(payload.as_ref(), b"hello");
    }

    #[test]
    fn kid_mismatch_does_not_fall_back() {
        let k1 = hmac_jwk("k1");
        let jws = sign_compact(&k1, None, b"hello").unwrap();
        let k2 = hmac_jwk("k2");
        let mut set = JwkSet::new();
        set.add_key(k2).unwrap();
        let err = extract(&set, &jws, false).unwrap_err();
        assert!(err.to_string().contains("k1"));
    }

    #[test]
    fn flipped_bit_fails() {
        let key = hmac_jwk("k1");
        let jws = sign_compact(&key, None, b"hello").unwrap();
        let mut tampered = jws.clone();
        let last = tampered.pop().unwrap();
        let flipped = if last == 'A' { 'B' } else { 'A' };
        tampered.push(flipped);
        let mut set = JwkSet::new();
        set.add_key(key).unwrap();
        assert!(extract(&set, &tampered, false).is_err());
    }

    #[test]
    fn none_algorithm_rejected_by_default() {
        let mut header = Value::object();
        header.as_object_mut().unwrap().set("alg", Value::string("none")).unwrap();
        let jws = format!("{}.{}.", base64url::encode(header.to_json().as_bytes()), base64url::encode(b"{}"));
        let set = JwkSet::new();
        assert!(extract(&set, &jws, false).is_err());
    }

    #[test]
    fn non_compact_input_rejected() {
        let set = JwkSet::new();
        assert!(extract(&set, "{\"not\":\"compact\"}", false).is_err());
        assert!(extract(&set, "", false).is_err());
    }
}
