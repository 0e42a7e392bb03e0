//! HMAC signer/verifier family: HS256, HS384, HS512 (RFC 7518 §3.2).

use openssl::hash::MessageDigest;
use openssl::memcmp;
use openssl::pkey::PKey;
use openssl::sign::Signer as OpenSslSigner;

use super::{Signer, Verifier};
use crate::base64url;
use crate::error::{here, Error, Result};
use crate::jwk::Jwk;

pub struct HmacAlgorithm {
    pub name: &'static str,
    pub digest: fn() -> MessageDigest,
    pub digest_size: usize,
}

fn require_oct_key(jwk: &Jwk) -> Result<Vec<u8>> {
    if jwk.kty() != "oct" {
        return Err(Error::JwaError {
            reason: format!("HMAC requires an 'oct' key, found '{}'", jwk.kty()),
            loc: here!(),
        });
    }
    let k = jwk.member("k").ok_or_else(|| Error::JwaError {
        reason: "oct key is missing 'k'".to_string(),
        loc: here!(),
    })?;
    Ok(base64url::decode(k)?.as_ref().to_vec())
}

fn mac(alg: &HmacAlgorithm, key_bytes: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let pkey = PKey::hmac(key_bytes)?;
    let mut signer = OpenSslSigner::new((alg.digest)(), &pkey)?;
    signer.update(data)?;
    Ok(signer.sign_to_vec()?)
}

impl Signer for HmacAlgorithm {
    fn algorithm(&self) -> &'static str {
        self.name
    }

    fn digest_size(&self) -> usize {
        self.digest_size
    }

    fn sign(&self, key: &Jwk, data: &[u8]) -> Result<String> {
        let key_bytes = require_oct_key(key)?;
        let signature = mac(self, &key_bytes, data)?;
        Ok(base64url::encode(&signature))
    }
}

impl Verifier for HmacAlgorithm {
    fn algorithm(&self) -> &'static str {
        self.name
    }

    fn digest_size(&self) -> usize {
        self.digest_size
    }

    fn verify(&self, key: &Jwk, data: &[u8], signature: &[u8]) -> Result<bool> {
        let key_bytes = require_oct_key(key)?;
        let expected = mac(self, &key_bytes, data)?;
        if expected.len() != signature.len() {
            return Ok(false);
        }
        Ok(memcmp::eq(&expected, signature))
    }
}

pub const HS256: HmacAlgorithm = HmacAlgorithm {
    name: "HS256",
    digest: MessageDigest::sha256,
    digest_size: 32,
};
pub const HS384: HmacAlgorithm = HmacAlgorithm {
    name: "HS384",
    digest: MessageDigest::sha384,
    digest_size: 48,
};
pub const HS512: HmacAlgorithm = HmacAlgorithm {
    name: "HS512",
    digest: MessageDigest::sha512,
    digest_size: 64,
};
