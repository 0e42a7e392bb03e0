//! JSON Web Keys and Key Sets (RFC 7517). A [`Jwk`] wraps
//! a validated, locked [`crate::json::Value::Object`] so that it stays
//! reachable as plain JSON (`to_json`/`readable_json`) while still
//! offering typed accessors.

mod pem;

use std::collections::HashMap;

use crate::error::{here, Error, Result};
use crate::json::{self, Limits, Value};
use crate::jwa;

pub use pem::parse_pem;

const OCT_REQUIRED: &[&str] = &["k"];
const RSA_PUBLIC_REQUIRED: &[&str] = &["n", "e"];
const RSA_PRIVATE_REQUIRED: &[&str] = &["d", "p", "q"];
const EC_PUBLIC_REQUIRED: &[&str] = &["crv", "x", "y"];
const EC_PRIVATE_REQUIRED: &[&str] = &["d"];

const VALID_KEY_OPS: &[&str] = &[
    "sign",
    "verify",
    "encrypt",
    "decrypt",
    "wrapKey",
    "unwrapKey",
    "deriveKey",
    "deriveBits",
];

/// A validated JSON Web Key. Immutable once built: the library
/// requires `kid` even though RFC 7517 does not.
#[derive(Debug, Clone)]
pub struct Jwk(Value);

fn jwk_error(reason: impl Into<String>) -> Error {
    Error::JwkError {
        reason: reason.into(),
        loc: here!(),
    }
}

impl Jwk {
    fn obj(&self) -> &json::Object {
        self.0.as_object().expect("Jwk always wraps an object")
    }

    fn string_member(&self, name: &str) -> Option<&str> {
        self.obj().get(name).ok().and_then(|v| v.as_str().ok())
    }

    pub fn kty(&self) -> &str {
        self.string_member("kty").expect("validated Jwk has kty")
    }

    pub fn kid(&self) -> &str {
        self.string_member("kid").expect("validated Jwk has kid")
    }

    pub fn alg(&self) -> Option<&str> {
        self.string_member("alg")
    }

    pub fn key_use(&self) -> Option<&str> {
        self.string_member("use")
    }

    pub fn key_ops(&self) -> Vec<&str> {
        match self.obj().get("key_ops") {
            Ok(v) => v
                .as_array()
                .map(|a| a.iter().filter_map(|m| m.as_str().ok()).collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// True if this key's declared role (`use`/`key_ops`) permits
    /// signing, or if no role was declared at all.
    pub fn can_sign(&self) -> bool {
        let ops = self.key_ops();
        if !ops.is_empty() {
            return ops.contains(&"sign");
        }
        match self.key_use() {
            Some(u) => u == "sig",
            None => true,
        }
    }

    /// True if this key's declared role permits verification.
    pub fn can_verify(&self) -> bool {
        let ops = self.key_ops();
        if !ops.is_empty() {
            return ops.contains(&"verify");
        }
        match self.key_use() {
            Some(u) => u == "sig",
            None => true,
        }
    }

    /// Any type-specific string member (`k`, `n`, `e`, `d`, `p`, `q`,
    /// `dp`, `dq`, `qi`, `crv`, `x`, `y`, ...).
    pub fn member(&self, name: &str) -> Option<&str> {
        self.string_member(name)
    }

    pub fn to_json(&self) -> String {
        self.0.to_json()
    }

    pub fn readable_json(&self, indent: usize) -> String {
        self.0.readable_json(indent)
    }

    pub fn clone_deep(&self) -> Jwk {
        Jwk(self.0.clone_deep())
    }

    pub fn invalidate(self) {
        self.0.invalidate();
    }

    /// Builds a `Jwk` from a freshly-constructed, still-unlocked JSON
    /// object, running the full schema and JWA-acceptance validation
    /// and locking the result.
    pub fn from_object(mut value: Value) -> Result<Jwk> {
        validate_schema(&value)?;
        value.lock();
        Ok(Jwk(value))
    }
}

fn require_string_members(obj: &json::Object, names: &[&str]) -> Result<()> {
    for name in names {
        let v = obj
            .get(name)
            .map_err(|_| jwk_error(format!("missing required member '{name}'")))?;
        if !v.is_string() {
            return Err(Error::JsonIncompatibleType {
                expected: "string",
                found: "non-string",
                loc: here!(),
            });
        }
    }
    Ok(())
}

fn validate_schema(value: &Value) -> Result<()> {
    let obj = value
        .as_object()
        .map_err(|_| jwk_error("JWK must be a JSON object"))?;

    let kty = obj
        .get("kty")
        .map_err(|_| jwk_error("missing required member 'kty'"))?
        .as_str()
        .map_err(|_| jwk_error("'kty' must be a string"))?;
    if !matches!(kty, "oct" | "RSA" | "EC") {
        return Err(jwk_error(format!("unsupported key type '{kty}'")));
    }

    if let Ok(alg_value) = obj.get("alg") {
        let alg = alg_value
            .as_str()
            .map_err(|_| jwk_error("'alg' must be a string"))?;
        if !jwa::accepts(kty, alg) {
            return Err(jwk_error(format!(
                "algorithm '{alg}' is not accepted for key type '{kty}'"
            )));
        }
    }

    if let Ok(ops_value) = obj.get("key_ops") {
        let ops = ops_value
            .as_array()
            .map_err(|_| jwk_error("'key_ops' must be an array"))?;
        for op in ops.iter() {
            let op = op.as_str().map_err(|_| jwk_error("'key_ops' entries must be strings"))?;
            if !VALID_KEY_OPS.contains(&op) {
                return Err(jwk_error(format!("unknown key operation '{op}'")));
            }
        }
    } else if let Ok(use_value) = obj.get("use") {
        let use_ = use_value.as_str().map_err(|_| jwk_error("'use' must be a string"))?;
        if !matches!(use_, "sig" | "enc") {
            return Err(jwk_error(format!("unknown key use '{use_}'")));
        }
    }

    match kty {
        "oct" => require_string_members(obj, OCT_REQUIRED)?,
        "RSA" => {
            require_string_members(obj, RSA_PUBLIC_REQUIRED)?;
            if obj.exists("d") {
                require_string_members(obj, RSA_PRIVATE_REQUIRED)?;
            }
        }
        "EC" => {
            require_string_members(obj, EC_PUBLIC_REQUIRED)?;
            if obj.exists("d") {
                require_string_members(obj, EC_PRIVATE_REQUIRED)?;
            }
        }
        _ => unreachable!(),
    }

    if !obj.exists("kid") {
        return Err(jwk_error("'kid' is required"));
    }
    if !obj.get("kid").unwrap().is_string() {
        return Err(jwk_error("'kid' must be a string"));
    }

    Ok(())
}

/// Parses and validates a single JWK.
pub fn parse_jwk(text: &str) -> Result<Jwk> {
    let value = json::parse_object(text, &Limits::for_jwk())?;
    Jwk::from_object(value)
}

/// A JSON Web Key Set: a `keys` array plus a `kid -> Jwk` side index.
/// `kid` uniqueness is enforced across the set.
#[derive(Debug, Clone, Default)]
pub struct JwkSet {
    keys: Vec<Jwk>,
    index: HashMap<String, usize>,
}

impl JwkSet {
    pub fn new() -> Self {
        JwkSet {
            keys: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.index.contains_key(kid)
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.kid())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Jwk> {
        self.keys.iter()
    }

    pub fn add_key(&mut self, jwk: Jwk) -> Result<()> {
        if self.index.contains_key(jwk.kid()) {
            return Err(jwk_error(format!("duplicate kid '{}'", jwk.kid())));
        }
        self.index.insert(jwk.kid().to_string(), self.keys.len());
        self.keys.push(jwk);
        Ok(())
    }

    pub fn get_key(&self, kid: &str) -> Result<&Jwk> {
        self.index
            .get(kid)
            .map(|&idx| &self.keys[idx])
            .ok_or_else(|| jwk_error(format!("no key with kid '{kid}'")))
    }

    /// No-op if `kid` is absent.
    pub fn remove_key(&mut self, kid: &str) {
        if let Some(idx) = self.index.remove(kid) {
            self.keys.remove(idx);
            self.reindex();
        }
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, key) in self.keys.iter().enumerate() {
            self.index.insert(key.kid().to_string(), i);
        }
    }

    pub fn clone_deep(&self) -> JwkSet {
        JwkSet {
            keys: self.keys.iter().map(Jwk::clone_deep).collect(),
            index: self.index.clone(),
        }
    }

    pub fn invalidate(self) {
        for key in self.keys {
            key.invalidate();
        }
    }
}

/// Parses a JWK Set, validating each key and enforcing `kid`
/// uniqueness across the set.
pub fn parse_jwk_set(text: &str) -> Result<JwkSet> {
    let value = json::parse_object(text, &Limits::for_jwk_set())?;
    let obj = value.as_object().expect("parse_object guarantees an object");
    let keys_value = obj
        .get("keys")
        .map_err(|_| jwk_error("JWK Set must have a 'keys' member"))?;
    let keys_arr = keys_value
        .as_array()
        .map_err(|_| jwk_error("'keys' must be an array"))?;

    let mut set = JwkSet::new();
    for key_value in keys_arr.iter() {
        let jwk = Jwk::from_object(key_value.clone_deep())?;
        set.add_key(jwk)?;
    }
    Ok(set)
}
