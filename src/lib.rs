//! `jose_kit` is a library for producing and consuming JSON Web Tokens
//! (JWT, RFC 7519) in compact form, on top of a from-scratch JSON
//! Object Model (RFC 7159), JSON Web Keys and Key Sets (JWK/JWKS, RFC
//! 7517), JSON Web Signatures (JWS, RFC 7515, Compact Serialization
//! only), and a JSON Web Algorithm registry (JWA, RFC 7518).
//!
//! It is intended for back-end services that issue signed credentials
//! to clients and validate credentials presented by peers. There is no
//! network transport, no persistent key store, no rotation policy, and
//! no revocation machinery here — those are the caller's concern.
//!
//! ## Usage example (HMAC-signed token, `kid`-based verification)
//!
//! ```rust
//! use jose_kit::jwk::{parse_jwk, JwkSet};
//! use jose_kit::jwt;
//!
//! # fn main() -> jose_kit::Result<()> {
//! let jwk_json = r#"{
//!     "kty": "oct",
//!     "alg": "HS256",
//!     "use": "sig",
//!     "kid": "k1",
//!     "k": "c2VjcmV0LWtleS1tYXRlcmlhbC1mb3ItaG1hYw"
//! }"#;
//! let key = parse_jwk(jwk_json)?;
//!
//! let mut claims = jwt::make_claim_set();
//! claims.set_issuer("auth.example")?;
//! claims.set_subject("user-42")?;
//! claims.set_duration(3600);
//!
//! let token = claims.sign(&key)?;
//!
//! let mut keys = JwkSet::new();
//! keys.add_key(key)?;
//!
//! let verified = jwt::decode(&keys, &token, None, None)?;
//! assert_eq!(verified.subject(), Some("user-42"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module map
//!
//! - [`json`] — the value model and bounded parser.
//! - [`base64url`] — the unpadded base64url codec.
//! - [`jwk`] — `Jwk`/`JwkSet` parsing and validation, PEM ingestion.
//! - [`jwa`] — the algorithm registry and `Signer`/`Verifier` traits.
//! - [`jws`] — compact JWS sign/verify.
//! - [`jwt`] — claim-set construction, signing, nested JWTs, and the
//!   time-based claim checks.
//!
//! [`error::Error`] is the single error type returned across all of the
//! above.

pub mod base64url;
pub mod error;
pub mod json;
pub mod jwa;
pub mod jwk;
pub mod jws;
pub mod jwt;

pub use error::{Error, Result};
