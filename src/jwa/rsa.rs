//! RSA PKCS#1 v1.5 signer/verifier family: RS256, RS384, RS512
//! (RFC 7518 §3.3).

use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::sign::{Signer as OpenSslSigner, Verifier as OpenSslVerifier};

use super::{Signer, Verifier};
use crate::base64url;
use crate::error::{here, Error, Result};
use crate::jwk::Jwk;

pub struct RsaAlgorithm {
    pub name: &'static str,
    pub digest: fn() -> MessageDigest,
    pub digest_size: usize,
}

fn require_rsa_key(jwk: &Jwk) -> Result<()> {
    if jwk.kty() != "RSA" {
        return Err(Error::JwaError {
            reason: format!("RSA algorithms require an 'RSA' key, found '{}'", jwk.kty()),
            loc: here!(),
        });
    }
    Ok(())
}

fn decode_bignum(jwk: &Jwk, name: &str) -> Result<BigNum> {
    let text = jwk.member(name).ok_or_else(|| Error::JwaError {
        reason: format!("RSA key is missing '{name}'"),
        loc: here!(),
    })?;
    let bytes = base64url::decode(text)?;
    Ok(BigNum::from_slice(bytes.as_ref())?)
}

fn public_key(jwk: &Jwk) -> Result<Rsa<openssl::pkey::Public>> {
    let n = decode_bignum(jwk, "n")?;
    let e = decode_bignum(jwk, "e")?;
    Ok(Rsa::from_public_components(n, e)?)
}

fn private_key(jwk: &Jwk) -> Result<Rsa<openssl::pkey::Private>> {
    let n = decode_bignum(jwk, "n")?;
    let e = decode_bignum(jwk, "e")?;
    let d = decode_bignum(jwk, "d")?;
    let p = decode_bignum(jwk, "p")?;
    let q = decode_bignum(jwk, "q")?;
    // CRT parameters (dp, dq, qi) are optional on the wire; when the
    // JWK omits them, hand OpenSSL empty BigNums and let it derive
    // them from n/e/d/p/q.
    let dp = jwk.member("dp").map(|_| decode_bignum(jwk, "dp")).transpose()?.unwrap_or(BigNum::new()?);
    let dq = jwk.member("dq").map(|_| decode_bignum(jwk, "dq")).transpose()?.unwrap_or(BigNum::new()?);
    let qi = jwk.member("qi").map(|_| decode_bignum(jwk, "qi")).transpose()?.unwrap_or(BigNum::new()?);
    Ok(Rsa::from_private_components(n, e, d, p, q, dp, dq, qi)?)
}

impl Signer for RsaAlgorithm {
    fn algorithm(&self) -> &'static str {
        self.name
    }

    fn digest_size(&self) -> usize {
        self.digest_size
    }

    fn sign(&self, key: &Jwk, data: &[u8]) -> Result<String> {
        require_rsa_key(key)?;
        let rsa = private_key(key)?;
        let pkey = PKey::from_rsa(rsa)?;
        let mut signer = OpenSslSigner::new((self.digest)(), &pkey)?;
        signer.update(data)?;
        let signature = signer.sign_to_vec()?;
        Ok(base64url::encode(&signature))
    }
}

impl Verifier for RsaAlgorithm {
    fn algorithm(&self) -> &'static str {
        self.name
    }

    fn digest_size(&self) -> usize {
        self.digest_size
    }

    fn verify(&self, key: &Jwk, data: &[u8], signature: &[u8]) -> Result<bool> {
        require_rsa_key(key)?;
        let rsa = public_key(key)?;
        let pkey = PKey::from_rsa(rsa)?;
        let mut verifier = OpenSslVerifier::new((self.digest)(), &pkey)?;
        verifier.update(data)?;
        Ok(verifier.verify(signature)?)
    }
}

pub const RS256: RsaAlgorithm = RsaAlgorithm {
    name: "RS256",
    digest: MessageDigest::sha256,
    digest_size: 32,
};
pub const RS384: RsaAlgorithm = RsaAlgorithm {
    name: "RS384",
    digest: MessageDigest::sha384,
    digest_size: 48,
};
pub const RS512: RsaAlgorithm = RsaAlgorithm {
    name: "RS512",
    digest: MessageDigest::sha512,
    digest_size: 64,
};
