//! The degenerate `none` algorithm (RFC 7518 §3.6). Registered like any
//! other family, but the JWS driver refuses to even reach this
//! verifier unless the caller explicitly opts in at the call site —
//! there is no header- or configuration-driven way to enable it.

use super::{Signer, Verifier};
use crate::error::Result;
use crate::jwk::Jwk;

pub const NAME: &str = "none";

pub struct NoneAlgorithm;

pub static NONE: NoneAlgorithm = NoneAlgorithm;

impl Signer for NoneAlgorithm {
    fn algorithm(&self) -> &'static str {
        NAME
    }

    fn digest_size(&self) -> usize {
        0
    }

    fn sign(&self, _key: &Jwk, _data: &[u8]) -> Result<String> {
        Ok(String::new())
    }
}

impl Verifier for NoneAlgorithm {
    fn algorithm(&self) -> &'static str {
        NAME
    }

    fn digest_size(&self) -> usize {
        0
    }

    /// Reaching this call means the `allow_none` gate has already been
    /// satisfied by the caller. Per RFC 7518 §3.6, the MAC for `none`
    /// is the empty octet string, so this accepts exactly that and
    /// nothing else; key material is never consulted.
    fn verify(&self, _key: &Jwk, _data: &[u8], signature: &[u8]) -> Result<bool> {
        Ok(signature.is_empty())
    }
}
