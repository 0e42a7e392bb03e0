//! The JWT driver: claim stamping, signing, nested-JWT
//! wrap/unwrap, and the time-based claim checks (`nbf`/`exp`/`iat`)
//! layered on top of the JWS driver's structural verification.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::base64url::{self, SecureBytes};
use crate::error::{here, Error, Result};
use crate::json::{self, Limits, Value};
use crate::jwa;
use crate::jwk::{Jwk, JwkSet};
use crate::jws;

const RESERVED_CLAIMS: &[&str] = &["iss", "sub", "aud", "exp", "nbf", "iat", "jti"];
const RESERVED_HEADERS: &[&str] = &["alg", "typ", "cty", "kid", "enc"];

/// Nested JWTs are peeled one `cty: "JWT"` layer at a time; this bounds
/// how many layers `decode`/`inspect` will unwrap so a chain of validly
/// signed nested tokens cannot force unbounded work.
const MAX_NESTING_DEPTH: usize = 16;

fn jwt_error(reason: impl Into<String>) -> Error {
    Error::JwtError {
        reason: reason.into(),
        loc: here!(),
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs() as i64
}

fn generate_jti() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// An unsigned (or not-yet-finalized) claim set under construction.
/// `duration`/`not_before` are latched
/// separately from the JSON claims themselves and only materialize into
/// `exp`/`nbf` at [`ClaimSet::sign`] time.
#[derive(Debug, Clone)]
pub struct ClaimSet {
    header: Value,
    claims: Value,
    duration: i64,
    not_before: i64,
}

/// Builds an empty claim set: no claims, no headers, `duration = -1`
/// (no `exp` emitted), `not_before = -1` (`nbf` defaults to "now").
pub fn make_claim_set() -> ClaimSet {
    ClaimSet {
        header: Value::object(),
        claims: Value::object(),
        duration: -1,
        not_before: -1,
    }
}

impl ClaimSet {
    fn claims_obj(&self) -> &json::Object {
        self.claims.as_object().expect("claims is always an object")
    }

    fn claims_obj_mut(&mut self) -> &mut json::Object {
        self.claims.as_object_mut().expect("claims is always an object")
    }

    fn header_obj_mut(&mut self) -> &mut json::Object {
        self.header.as_object_mut().expect("header is always an object")
    }

    pub fn set_issuer(&mut self, iss: impl Into<String>) -> Result<()> {
        self.claims_obj_mut().set("iss", Value::string(iss))
    }

    pub fn set_subject(&mut self, sub: impl Into<String>) -> Result<()> {
        self.claims_obj_mut().set("sub", Value::string(sub))
    }

    /// First call sets `aud` to a bare string; a second call promotes it
    /// in place to an array and appends.
    pub fn add_audience(&mut self, aud: impl Into<String>) -> Result<()> {
        let aud = aud.into();
        if !self.claims_obj().exists("aud") {
            return self.claims_obj_mut().add("aud", Value::string(aud));
        }
        let existing_is_string = self.claims_obj().get("aud")?.is_string();
        if existing_is_string {
            let existing = self.claims_obj().get("aud")?.clone_deep();
            let mut arr = Value::array();
            {
                let a = arr.as_array_mut().expect("freshly built array");
                a.append(existing)?;
                a.append(Value::string(aud))?;
            }
            self.claims_obj_mut().set("aud", arr)
        } else {
            let v = self.claims_obj_mut().get_mut("aud")?;
            v.as_array_mut()?.append(Value::string(aud))
        }
    }

    /// Latches the `exp = nbf + duration` offset (seconds). `-1`
    /// (the default) omits `exp` entirely.
    pub fn set_duration(&mut self, secs: i64) {
        self.duration = secs;
    }

    /// Latches `nbf` (seconds since epoch). `<= 0` (the default) means
    /// "no explicit `nbf`, use now at finalization".
    pub fn set_not_before(&mut self, secs: i64) {
        self.not_before = secs;
    }

    pub fn set_id(&mut self, jti: impl Into<String>) -> Result<()> {
        self.claims_obj_mut().set("jti", Value::string(jti))
    }

    /// Sets a free-form claim. Fails if `name` is one of the reserved
    /// registered claim names managed by the typed setters above.
    pub fn add_claim(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        let name = name.into();
        if RESERVED_CLAIMS.contains(&name.as_str()) {
            return Err(jwt_error(format!("'{name}' is a reserved claim name")));
        }
        self.claims_obj_mut().set(name, value)
    }

    /// Sets a free-form JOSE header member. Fails if `name` is one of
    /// the reserved header names managed by the library (`alg`, `typ`,
    /// `cty`, `kid`, `enc`).
    pub fn add_header(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        let name = name.into();
        if RESERVED_HEADERS.contains(&name.as_str()) {
            return Err(jwt_error(format!("'{name}' is a reserved header name")));
        }
        self.header_obj_mut().set(name, value)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.claims_obj().get("iss").ok()?.as_str().ok()
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims_obj().get("sub").ok()?.as_str().ok()
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    /// Snapshots a deep copy of header/claims, finalizes the time
    /// claims and `jti` on that copy, and signs it under `key`.
    pub fn sign(&self, key: &Jwk) -> Result<String> {
        let mut header = self.header.clone_deep();
        let mut claims = self.claims.clone_deep();
        finalize_claims(&mut claims, self.duration, self.not_before, now_secs())?;
        claims.lock();
        header.lock();
        let payload = claims.to_json();
        jws::sign_compact(key, Some(header), payload.as_bytes())
    }
}

fn finalize_claims(claims: &mut Value, duration: i64, not_before: i64, now: i64) -> Result<()> {
    let obj = claims.as_object_mut().expect("claims is always an object");
    let effective_not_before = if not_before <= 0 {
        now
    } else {
        let clamped = not_before.max(now);
        obj.set("nbf", Value::integer(clamped))?;
        clamped
    };
    obj.set("iat", Value::integer(now))?;
    if duration >= 0 {
        obj.set("exp", Value::integer(effective_not_before + duration))?;
    }
    if !obj.exists("jti") {
        obj.set("jti", Value::string(generate_jti()))?;
    }
    Ok(())
}

/// Wraps an existing compact JWT as the payload of a new signature,
/// tagging the outer header `cty: "JWT"`.
pub fn nested_sign(key: &Jwk, existing_jwt: &str) -> Result<String> {
    let mut header = Value::object();
    header.as_object_mut()?.add_final("cty", Value::string("JWT"))?;
    jws::sign_compact(key, Some(header), existing_jwt.as_bytes())
}

/// A verified claim set returned by [`decode`]/[`inspect_unverified`]/
/// [`inspect_verified`]. `signing_key` is the innermost key that
/// verified the token, or `None` for signature-bypassing inspection.
#[derive(Debug, Clone)]
pub struct VerifiedClaims {
    pub header: Value,
    pub claims: Value,
    pub signing_key: Option<Jwk>,
}

impl VerifiedClaims {
    fn obj(&self) -> &json::Object {
        self.claims.as_object().expect("claims is always an object")
    }

    pub fn issuer(&self) -> Option<&str> {
        self.obj().get("iss").ok()?.as_str().ok()
    }

    pub fn subject(&self) -> Option<&str> {
        self.obj().get("sub").ok()?.as_str().ok()
    }

    /// Normalizes the `aud` claim's string-or-array polymorphism
    /// into a sequence.
    pub fn audiences(&self) -> Vec<&str> {
        match self.obj().get("aud") {
            Ok(v) if v.is_string() => vec![v.as_str().expect("checked is_string")],
            Ok(v) if v.is_array() => v
                .as_array()
                .expect("checked is_array")
                .iter()
                .filter_map(|m| m.as_str().ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn expiration(&self) -> Option<i64> {
        self.obj().get("exp").ok()?.as_i64().ok()
    }

    pub fn not_before(&self) -> Option<i64> {
        self.obj().get("nbf").ok()?.as_i64().ok()
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.obj().get("iat").ok()?.as_i64().ok()
    }

    pub fn id(&self) -> Option<&str> {
        self.obj().get("jti").ok()?.as_str().ok()
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.obj().get(name).ok()
    }
}

/// Works around an ambiguity in how nested JWT payloads are encoded: a
/// payload that doesn't look like a JSON object (i.e. doesn't start with `{`)
/// but does look like base64url text is assumed to be a once-more
/// encoded layer, and is base64url-decoded again before being treated
/// as claims JSON. Named and isolated here so the compatibility
/// workaround can be disabled by policy without touching the decode
/// loop itself.
fn redecode_nested_heuristic(payload: SecureBytes) -> SecureBytes {
    let bytes = payload.as_ref();
    let looks_like_json_object = bytes.first() == Some(&b'{');
    let looks_like_base64url = !bytes.is_empty()
        && bytes
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !looks_like_json_object && looks_like_base64url {
        if let Ok(text) = std::str::from_utf8(bytes) {
            if let Ok(redecoded) = base64url::decode(text) {
                return redecoded;
            }
        }
    }
    payload
}

fn verify_time_claims(claims: &Value, now: i64, skew: u32) -> Result<()> {
    let obj = claims.as_object().expect("claims is always an object");
    let skew = skew as i64;
    if let Ok(exp_value) = obj.get("exp") {
        let exp = exp_value
            .as_i64()
            .map_err(|_| jwt_error("'exp' must be an integer"))?;
        if now > exp + skew {
            return Err(jwt_error(format!(
                "token expired: now={now}, exp={exp}, skew={skew}"
            )));
        }
    }
    if let Ok(nbf_value) = obj.get("nbf") {
        let nbf = nbf_value
            .as_i64()
            .map_err(|_| jwt_error("'nbf' must be an integer"))?;
        if now + skew < nbf {
            return Err(jwt_error(format!(
                "token not yet valid: now={now}, nbf={nbf}, skew={skew}"
            )));
        }
    }
    Ok(())
}

fn decode_inner(
    keys: Option<&JwkSet>,
    jwt: &str,
    check_time: bool,
    now: Option<i64>,
    skew: Option<u32>,
) -> Result<VerifiedClaims> {
    let mut current = jwt.to_string();
    let mut signing_key: Option<Jwk> = None;
    let mut header;
    let mut payload_bytes;

    for depth in 0.. {
        if depth >= MAX_NESTING_DEPTH {
            return Err(jwt_error(format!(
                "nested JWT exceeds maximum depth of {MAX_NESTING_DEPTH}"
            )));
        }

        header = jws::decode_header(&current)?;
        let header_obj = header.as_object().expect("decode_header returns an object");
        if header_obj.exists("enc") {
            return Err(jwt_error("encrypted JWT (JWE) is not supported"));
        }

        payload_bytes = match keys {
            Some(keys) => {
                let (key, payload) = jws::extract(keys, &current, false)?;
                signing_key = Some(key);
                payload
            }
            None => {
                let segments: Vec<&str> = current.split('.').collect();
                if segments.len() != 3 {
                    return Err(jwt_error(format!(
                        "expected 3 dot-separated segments, found {}",
                        segments.len()
                    )));
                }
                base64url::decode(segments[1])?
            }
        };

        let cty = header_obj.get("cty").ok().and_then(|v| v.as_str().ok());
        if cty == Some("JWT") {
            let nested = std::str::from_utf8(payload_bytes.as_ref())
                .map_err(|_| jwt_error("nested JWT payload is not valid UTF-8"))?
                .to_string();
            current = nested;
            continue;
        }

        let payload_bytes = redecode_nested_heuristic(payload_bytes);
        let claims_text = std::str::from_utf8(payload_bytes.as_ref())
            .map_err(|_| jwt_error("claims payload is not valid UTF-8"))?;
        let claims = json::parse_object(claims_text, &Limits::for_claims())?;

        if check_time {
            let now = now.unwrap_or_else(now_secs);
            let skew = skew.unwrap_or_else(jwa::default_skew);
            verify_time_claims(&claims, now, skew)?;
        }

        return Ok(VerifiedClaims {
            header,
            claims,
            signing_key,
        });
    }
    unreachable!("loop either returns or errors before exhausting 0..")
}

/// Verifies signature and time-based claims (`exp`/`nbf` against `now`
/// and `skew`, defaulting to the process-wide skew policy when not
/// given). Peels `cty: "JWT"` nested layers.
pub fn decode(
    keys: &JwkSet,
    jwt: &str,
    now: Option<i64>,
    skew: Option<u32>,
) -> Result<VerifiedClaims> {
    decode_inner(Some(keys), jwt, true, now, skew)
}

/// Diagnostic surface: bypasses signature verification entirely. Must
/// never be used for authorization.
pub fn inspect_unverified(jwt: &str) -> Result<VerifiedClaims> {
    decode_inner(None, jwt, false, None, None)
}

/// Diagnostic surface: checks the signature but bypasses the time-based
/// claim checks. Must never be used for authorization.
pub fn inspect_verified(keys: &JwkSet, jwt: &str) -> Result<VerifiedClaims> {
    decode_inner(Some(keys), jwt, false, None, None)
}
