//! The JWA registry: a process-wide, read-only-after-init
//! table mapping algorithm identifiers to [`Signer`]/[`Verifier`]
//! capabilities, populated at first read by [`bootstrap`] rather than by
//! an explicit application-level `init()` call the caller could forget.

mod hmac;
mod none;
mod rsa;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use crate::error::{here, Error, Result};
use crate::jwk::Jwk;

/// A signing capability for one algorithm identifier.
pub trait Signer: Send + Sync {
    fn algorithm(&self) -> &'static str;
    fn digest_size(&self) -> usize;
    /// Signs `data`, returning the base64url-encoded signature.
    fn sign(&self, key: &Jwk, data: &[u8]) -> Result<String>;
}

/// A verification capability for one algorithm identifier. Signature
/// comparison inside implementations must be constant-time.
pub trait Verifier: Send + Sync {
    fn algorithm(&self) -> &'static str;
    fn digest_size(&self) -> usize;
    fn verify(&self, key: &Jwk, data: &[u8], signature: &[u8]) -> Result<bool>;
}

struct AlgorithmEntry {
    signer: &'static dyn Signer,
    verifier: &'static dyn Verifier,
    /// Key types this algorithm accepts, empty for key-type-agnostic
    /// algorithms (`none`).
    accepted_kty: &'static [&'static str],
}

struct Registry {
    entries: HashMap<&'static str, AlgorithmEntry>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn bootstrap() -> Registry {
    let mut entries = HashMap::new();
    entries.insert(
        "HS256",
        AlgorithmEntry {
            signer: &hmac::HS256,
            verifier: &hmac::HS256,
            accepted_kty: &["oct"],
        },
    );
    entries.insert(
        "HS384",
        AlgorithmEntry {
            signer: &hmac::HS384,
            verifier: &hmac::HS384,
            accepted_kty: &["oct"],
        },
    );
    entries.insert(
        "HS512",
        AlgorithmEntry {
            signer: &hmac::HS512,
            verifier: &hmac::HS512,
            accepted_kty: &["oct"],
        },
    );
    entries.insert(
        "RS256",
        AlgorithmEntry {
            signer: &rsa::RS256,
            verifier: &rsa::RS256,
            accepted_kty: &["RSA"],
        },
    );
    entries.insert(
        "RS384",
        AlgorithmEntry {
            signer: &rsa::RS384,
            verifier: &rsa::RS384,
            accepted_kty: &["RSA"],
        },
    );
    entries.insert(
        "RS512",
        AlgorithmEntry {
            signer: &rsa::RS512,
            verifier: &rsa::RS512,
            accepted_kty: &["RSA"],
        },
    );
    entries.insert(
        "none",
        AlgorithmEntry {
            signer: &none::NONE,
            verifier: &none::NONE,
            accepted_kty: &[],
        },
    );
    tracing::debug!(algorithms = entries.len(), "JWA registry bootstrapped");
    Registry { entries }
}

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(bootstrap)
}

/// Registers an additional algorithm family. Only valid before the
/// registry has been read for the first time; once bootstrapped, the
/// table is immutable and this returns [`Error::JwaError`].
pub fn register(
    alg: &'static str,
    signer: &'static dyn Signer,
    verifier: &'static dyn Verifier,
    accepted_kty: &'static [&'static str],
) -> Result<()> {
    if REGISTRY.get().is_some() {
        return Err(Error::JwaError {
            reason: format!(
                "cannot register '{alg}': JWA registry is already bootstrapped"
            ),
            loc: here!(),
        });
    }
    let mut entries = HashMap::new();
    entries.insert(
        alg,
        AlgorithmEntry {
            signer,
            verifier,
            accepted_kty,
        },
    );
    // Merge onto a freshly-bootstrapped table and install it, racing
    // only against the same first-read-wins semantics `OnceLock`
    // already gives every other caller.
    let mut base = bootstrap();
    base.entries.extend(entries);
    REGISTRY
        .set(base)
        .map_err(|_| Error::JwaError {
            reason: format!("cannot register '{alg}': JWA registry is already bootstrapped"),
            loc: here!(),
        })
}

/// Looks up the signer for `alg`. Fails with [`Error::JwaError`] if the
/// algorithm is unregistered.
pub fn signer(alg: &str) -> Result<&'static dyn Signer> {
    registry()
        .entries
        .get(alg)
        .map(|e| e.signer)
        .ok_or_else(|| Error::JwaError {
            reason: format!("unknown algorithm '{alg}'"),
            loc: here!(),
        })
}

/// Looks up the verifier for `alg`. Fails with [`Error::JwaError`] if
/// the algorithm is unregistered. Callers wanting to accept `alg:none`
/// must check [`is_none_algorithm`] explicitly and opt in — `none` is
/// registered but disabled for verification by default.
pub fn verifier(alg: &str) -> Result<&'static dyn Verifier> {
    registry()
        .entries
        .get(alg)
        .map(|e| e.verifier)
        .ok_or_else(|| Error::JwaError {
            reason: format!("unknown algorithm '{alg}'"),
            loc: here!(),
        })
}

/// True if `alg` is the degenerate `none` algorithm.
pub fn is_none_algorithm(alg: &str) -> bool {
    alg == none::NAME
}

/// The acceptance predicate consulted by the JWK schema validator:
/// does `kty` accept `alg`? An empty `accepted_kty` list means the
/// algorithm is key-type-agnostic (`none`) and accepts any `kty`.
pub fn accepts(kty: &str, alg: &str) -> bool {
    match registry().entries.get(alg) {
        Some(entry) if entry.accepted_kty.is_empty() => true,
        Some(entry) => entry.accepted_kty.contains(&kty),
        None => false,
    }
}

const MAX_SKEW_SECS: u32 = 3600;

static DEFAULT_SKEW_SECS: AtomicU32 = AtomicU32::new(0);

/// Sets the process-wide default clock-skew tolerance (seconds),
/// clamped to `[0, 3600]`.
pub fn set_default_skew(secs: u32) {
    let clamped = secs.min(MAX_SKEW_SECS);
    DEFAULT_SKEW_SECS.store(clamped, Ordering::Release);
}

/// Reads the process-wide default clock-skew tolerance. Zero unless
/// set via [`set_default_skew`].
pub fn default_skew() -> u32 {
    DEFAULT_SKEW_SECS.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_table_matches_registered_families() {
        assert!(accepts("oct", "HS256"));
        assert!(accepts("oct", "HS384"));
        assert!(accepts("oct", "HS512"));
        assert!(accepts("RSA", "RS256"));
        assert!(!accepts("RSA", "HS256"));
        assert!(!accepts("oct", "RS256"));
        assert!(!accepts("EC", "RS256"));
    }

    #[test]
    fn none_accepts_any_key_type() {
        assert!(accepts("oct", "none"));
        assert!(accepts("RSA", "none"));
        assert!(accepts("EC", "none"));
    }

    #[test]
    fn unknown_algorithm_fails_lookup() {
        assert!(signer("ZZ999").is_err());
        assert!(verifier("ZZ999").is_err());
    }

    #[test]
    fn none_is_registered_but_marked() {
        assert!(signer("none").is_ok());
        assert!(verifier("none").is_ok());
        assert!(is_none_algorithm("none"));
        assert!(!is_none_algorithm("HS256"));
    }

    #[test]
    fn default_skew_clamps_to_one_hour() {
        set_default_skew(999_999);
        assert_eq!(default_skew(), MAX_SKEW_SECS);
        set_default_skew(30);
        assert_eq!(default_skew(), 30);
        set_default_skew(0);
    }
}
