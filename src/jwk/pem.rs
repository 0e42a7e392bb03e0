//! PEM block scanning and dispatch to the cryptographic adapter.
//! Only the outer contract — which labels are recognized, how
//! unrecognized ones are skipped, what happens when none match — is
//! in scope here; the exact bignum/point extraction lives behind
//! `openssl`, the crate's cryptographic adapter.

use openssl::bn::BigNum;
use openssl::ec::EcKey;
use openssl::nid::Nid;
use openssl::pkey::Private;
use openssl::rsa::Rsa;

use super::Jwk;
use crate::base64url;
use crate::error::{here, Error, Result};
use crate::json::Value;

struct PemBlock<'a> {
    label: &'a str,
    der: Vec<u8>,
}

fn find_blocks(text: &str) -> Vec<PemBlock<'_>> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(begin_at) = rest.find("-----BEGIN ") {
        let after_begin = &rest[begin_at + "-----BEGIN ".len()..];
        let Some(label_end) = after_begin.find("-----") else {
            break;
        };
        let label = &after_begin[..label_end];
        let body_start = begin_at + "-----BEGIN ".len() + label_end + "-----".len();
        let end_marker = format!("-----END {label}-----");
        let Some(end_at) = rest[body_start..].find(&end_marker) else {
            break;
        };
        let body = &rest[body_start..body_start + end_at];
        let b64: String = body.chars().filter(|c| !c.is_whitespace()).collect();
        if let Ok(der) = base64_standard_decode(&b64) {
            blocks.push(PemBlock { label, der });
        }
        rest = &rest[body_start + end_at + end_marker.len()..];
    }
    blocks
}

fn base64_standard_decode(s: &str) -> std::result::Result<Vec<u8>, ()> {
    use base64::engine::{general_purpose, Engine as _};
    general_purpose::STANDARD.decode(s).map_err(|_| ())
}

fn bn_to_b64url(bn: &BigNum) -> String {
    base64url::encode(&bn.to_vec())
}

fn rsa_private_to_jwk(rsa: &Rsa<Private>, use_: &str, alg: Option<&str>, kid: &str) -> Result<Jwk> {
    let mut v = Value::object();
    let obj = v.as_object_mut().unwrap();
    obj.add("kty", Value::string("RSA"))?;
    obj.add("n", Value::string(bn_to_b64url(rsa.n())))?;
    obj.add("e", Value::string(bn_to_b64url(rsa.e())))?;
    obj.add("d", Value::string(bn_to_b64url(rsa.d())))?;
    obj.add("p", Value::string(bn_to_b64url(rsa.p().ok_or_else(|| pem_error("RSA key missing prime p"))?)))?;
    obj.add("q", Value::string(bn_to_b64url(rsa.q().ok_or_else(|| pem_error("RSA key missing prime q"))?)))?;
    obj.add("use", Value::string(use_))?;
    if let Some(alg) = alg {
        obj.add("alg", Value::string(alg))?;
    }
    obj.add("kid", Value::string(kid))?;
    Jwk::from_object(v)
}

fn rsa_public_to_jwk(rsa: &Rsa<openssl::pkey::Public>, use_: &str, alg: Option<&str>, kid: &str) -> Result<Jwk> {
    let mut v = Value::object();
    let obj = v.as_object_mut().unwrap();
    obj.add("kty", Value::string("RSA"))?;
    obj.add("n", Value::string(bn_to_b64url(rsa.n())))?;
    obj.add("e", Value::string(bn_to_b64url(rsa.e())))?;
    obj.add("use", Value::string(use_))?;
    if let Some(alg) = alg {
        obj.add("alg", Value::string(alg))?;
    }
    obj.add("kid", Value::string(kid))?;
    Jwk::from_object(v)
}

fn curve_name(group: &openssl::ec::EcGroupRef) -> &'static str {
    match group.curve_name() {
        Some(Nid::X9_62_PRIME256V1) => "P-256",
        Some(Nid::SECP384R1) => "P-384",
        Some(Nid::SECP521R1) => "P-521",
        _ => "P-256",
    }
}

fn ec_private_to_jwk(ec: &EcKey<Private>, use_: &str, alg: Option<&str>, kid: &str) -> Result<Jwk> {
    let group = ec.group();
    let mut ctx = openssl::bn::BigNumContext::new()?;
    let mut x = BigNum::new()?;
    let mut y = BigNum::new()?;
    ec.public_key()
        .affine_coordinates_gfp(group, &mut x, &mut y, &mut ctx)?;

    let mut v = Value::object();
    let obj = v.as_object_mut().unwrap();
    obj.add("kty", Value::string("EC"))?;
    obj.add("crv", Value::string(curve_name(group)))?;
    obj.add("x", Value::string(bn_to_b64url(&x)))?;
    obj.add("y", Value::string(bn_to_b64url(&y)))?;
    obj.add("d", Value::string(bn_to_b64url(ec.private_key())))?;
    obj.add("use", Value::string(use_))?;
    if let Some(alg) = alg {
        obj.add("alg", Value::string(alg))?;
    }
    obj.add("kid", Value::string(kid))?;
    Jwk::from_object(v)
}

fn ec_public_to_jwk(
    ec: &EcKey<openssl::pkey::Public>,
    use_: &str,
    alg: Option<&str>,
    kid: &str,
) -> Result<Jwk> {
    let group = ec.group();
    let mut ctx = openssl::bn::BigNumContext::new()?;
    let mut x = BigNum::new()?;
    let mut y = BigNum::new()?;
    ec.public_key()
        .affine_coordinates_gfp(group, &mut x, &mut y, &mut ctx)?;

    let mut v = Value::object();
    let obj = v.as_object_mut().unwrap();
    obj.add("kty", Value::string("EC"))?;
    obj.add("crv", Value::string(curve_name(group)))?;
    obj.add("x", Value::string(bn_to_b64url(&x)))?;
    obj.add("y", Value::string(bn_to_b64url(&y)))?;
    obj.add("use", Value::string(use_))?;
    if let Some(alg) = alg {
        obj.add("alg", Value::string(alg))?;
    }
    obj.add("kid", Value::string(kid))?;
    Jwk::from_object(v)
}

fn pem_error(reason: impl Into<String>) -> Error {
    Error::JwkError {
        reason: reason.into(),
        loc: here!(),
    }
}

/// Scans `text` for `-----BEGIN ... KEY-----` / `-----END ... KEY-----`
/// blocks, dispatches recognized labels (`RSA PRIVATE KEY`,
/// `EC PRIVATE KEY`, `RSA PUBLIC KEY`, `PUBLIC KEY`) to the
/// cryptographic adapter, and wraps the result as a validated `Jwk`.
/// The generic `PUBLIC KEY` (SPKI) label tries RSA first, then EC.
/// Unrecognized labels are skipped. Fails if no recognized block is
/// found. `password` decrypts an encrypted private key block.
pub fn parse_pem(
    text: &str,
    password: Option<&str>,
    use_: &str,
    alg: Option<&str>,
    kid: &str,
) -> Result<Jwk> {
    for block in find_blocks(text) {
        let jwk = match block.label {
            "RSA PRIVATE KEY" => {
                let rsa = match password {
                    Some(pw) => Rsa::private_key_from_pem_passphrase(&pem_wrap(&block), pw.as_bytes()),
                    None => Rsa::private_key_from_der(&block.der),
                };
                match rsa {
                    Ok(rsa) => rsa_private_to_jwk(&rsa, use_, alg, kid)?,
                    Err(_) => continue,
                }
            }
            "EC PRIVATE KEY" => match EcKey::private_key_from_der(&block.der) {
                Ok(ec) => ec_private_to_jwk(&ec, use_, alg, kid)?,
                Err(_) => continue,
            },
            "RSA PUBLIC KEY" => match Rsa::public_key_from_der_pkcs1(&block.der) {
                Ok(rsa) => rsa_public_to_jwk(&rsa, use_, alg, kid)?,
                Err(_) => continue,
            },
            "PUBLIC KEY" => match openssl::pkey::PKey::public_key_from_der(&block.der) {
                Ok(pkey) => match pkey.rsa() {
                    Ok(rsa) => rsa_public_to_jwk(&rsa, use_, alg, kid)?,
                    Err(_) => match pkey.ec_key() {
                        Ok(ec) => ec_public_to_jwk(&ec, use_, alg, kid)?,
                        Err(_) => continue,
                    },
                },
                Err(_) => continue,
            },
            _ => continue,
        };
        return Ok(jwk);
    }
    Err(pem_error("no recognized PEM key block found"))
}

fn pem_wrap(block: &PemBlock<'_>) -> Vec<u8> {
    use base64::engine::{general_purpose, Engine as _};
    let body = general_purpose::STANDARD.encode(&block.der);
    format!(
        "-----BEGIN {}-----\n{}\n-----END {}-----\n",
        block.label, body, block.label
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::ec::{EcGroup, EcKey};
    use openssl::nid::Nid;
    use openssl::pkey::PKey;

    fn wrap_der(label: &str, der: &[u8]) -> String {
        use base64::engine::{general_purpose, Engine as _};
        let body = general_purpose::STANDARD.encode(der);
        format!("-----BEGIN {label}-----\n{body}\n-----END {label}-----\n")
    }

    #[test]
    fn rsa_private_key_pem_converts_to_an_rsa_jwk() {
        let rsa = Rsa::generate(2048).unwrap();
        let pem = wrap_der("RSA PRIVATE KEY", &rsa.private_key_to_der().unwrap());
        let jwk = parse_pem(&pem, None, "sig", Some("RS256"), "rsa-priv").unwrap();
        assert_eq!(jwk.kty(), "RSA");
        assert_eq!(jwk.kid(), "rsa-priv");
        assert_eq!(jwk.alg(), Some("RS256"));
        assert!(jwk.member("n").is_some());
        assert!(jwk.member("d").is_some());
        assert!(jwk.member("p").is_some());
    }

    #[test]
    fn rsa_public_key_pkcs1_pem_converts_to_an_rsa_jwk() {
        let rsa = Rsa::generate(2048).unwrap();
        let public_der = Rsa::from_public_components(
            rsa.n().to_owned().unwrap(),
            rsa.e().to_owned().unwrap(),
        )
        .unwrap()
        .public_key_to_der_pkcs1()
        .unwrap();
        let pem = wrap_der("RSA PUBLIC KEY", &public_der);
        let jwk = parse_pem(&pem, None, "sig", None, "rsa-pub").unwrap();
        assert_eq!(jwk.kty(), "RSA");
        assert!(jwk.member("n").is_some());
        assert!(jwk.member("d").is_none());
    }

    #[test]
    fn generic_public_key_label_dispatches_to_rsa() {
        let rsa = Rsa::generate(2048).unwrap();
        let public_rsa = Rsa::from_public_components(
            rsa.n().to_owned().unwrap(),
            rsa.e().to_owned().unwrap(),
        )
        .unwrap();
        let der = PKey::from_rsa(public_rsa).unwrap().public_key_to_der().unwrap();
        let pem = wrap_der("PUBLIC KEY", &der);
        let jwk = parse_pem(&pem, None, "sig", None, "spki-rsa").unwrap();
        assert_eq!(jwk.kty(), "RSA");
    }

    #[test]
    fn ec_private_key_pem_converts_to_an_ec_jwk() {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let ec = EcKey::generate(&group).unwrap();
        let pem = wrap_der("EC PRIVATE KEY", &ec.private_key_to_der().unwrap());
        let jwk = parse_pem(&pem, None, "sig", Some("ES256"), "ec-priv").unwrap();
        assert_eq!(jwk.kty(), "EC");
        assert_eq!(jwk.member("crv"), Some("P-256"));
        assert!(jwk.member("d").is_some());
    }

    #[test]
    fn generic_public_key_label_dispatches_to_ec() {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let ec = EcKey::generate(&group).unwrap();
        let public_only = EcKey::from_public_key(&group, ec.public_key()).unwrap();
        let der = PKey::from_ec_key(public_only).unwrap().public_key_to_der().unwrap();
        let pem = wrap_der("PUBLIC KEY", &der);
        let jwk = parse_pem(&pem, None, "sig", None, "spki-ec").unwrap();
        assert_eq!(jwk.kty(), "EC");
        assert_eq!(jwk.member("crv"), Some("P-256"));
        assert!(jwk.member("d").is_none());
    }

    #[test]
    fn unrecognized_label_is_skipped() {
        let text = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        assert!(parse_pem(text, None, "sig", None, "x").is_err());
    }

    #[test]
    fn no_recognized_block_found_fails() {
        assert!(parse_pem("not pem at all", None, "sig", None, "x").is_err());
    }
}
