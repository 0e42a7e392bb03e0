//! Unpadded base64url codec (RFC 4648 §5), returning
//! decoded payloads in a [`SecureBytes`] container with a
//! guaranteed-release contract for key material and signatures.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::engine::general_purpose;
use base64::Engine as _;
use zeroize::Zeroize;

use crate::error::{here, Error, Result};

const ENCODE_ENGINE: GeneralPurpose = general_purpose::URL_SAFE_NO_PAD;

const DECODE_CONFIG: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_encode_padding(false)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);
const DECODE_ENGINE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, DECODE_CONFIG);

/// An owned decoded byte buffer with exclusive ownership and a
/// guaranteed-release contract: on drop, and on explicit [`erase`](Self::erase),
/// the bytes are overwritten before the allocation is freed.
#[derive(Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecureBytes(Vec<u8>);

impl SecureBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        SecureBytes(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrites the contents, then frees the allocation.
    pub fn erase(self) {
        drop(self);
    }

    /// An independent copy. `SecureBytes` does not implement `Clone`
    /// so that copies are always explicit, matching the JSON value
    /// model's explicit `clone_deep`.
    pub fn duplicate(&self) -> SecureBytes {
        SecureBytes(self.0.clone())
    }
}

impl AsRef<[u8]> for SecureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Encodes `data` as unpadded base64url. Never emits `=`.
pub fn encode(data: &[u8]) -> String {
    ENCODE_ENGINE.encode(data)
}

/// Decodes unpadded-or-padded base64url. Rejects any character outside
/// the alphabet; no whitespace tolerance.
pub fn decode(text: &str) -> Result<SecureBytes> {
    if text.bytes().any(|b| b.is_ascii_whitespace()) {
        return Err(Error::MalformedJson {
            reason: "base64url input contains whitespace".to_string(),
            loc: here!(),
        });
    }
    let bytes = DECODE_ENGINE
        .decode(text)
        .map_err(|e| Error::MalformedJson {
            reason: format!("invalid base64url: {e}"),
            loc: here!(),
        })?;
    Ok(SecureBytes::new(bytes))
}
