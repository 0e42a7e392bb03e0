//! End-to-end scenarios covering the signing, verification, and
//! rejection behaviors a credential-issuing service depends on.

use jose_kit::base64url;
use jose_kit::json::Value;
use jose_kit::jwk::{parse_jwk, parse_jwk_set, JwkSet};
use jose_kit::jwt;

fn oct_jwk(kid: &str, alg: &str, key_bytes: &[u8]) -> jose_kit::jwk::Jwk {
    let k = base64url::encode(key_bytes);
    parse_jwk(&format!(
        r#"{{"kty":"oct","alg":"{alg}","use":"sig","kid":"{kid}","k":"{k}"}}"#
    ))
    .unwrap()
}

#[test]
fn hmac_issued_token_round_trips_with_expected_claims() {
    let key = oct_jwk("k1", "HS256", &[42u8; 32]);
    let mut claims = jwt::make_claim_set();
    claims.set_issuer("ex").unwrap();
    claims.set_subject("u1").unwrap();
    claims.add_audience("a1").unwrap();
    claims.set_duration(60);

    let token = claims.sign(&key).unwrap();

    let mut keys = JwkSet::new();
    keys.add_key(key).unwrap();
    let verified = jwt::decode(&keys, &token, None, None).unwrap();

    assert_eq!(verified.issuer(), Some("ex"));
    assert_eq!(verified.subject(), Some("u1"));
    assert_eq!(verified.audiences(), vec!["a1"]);
    assert_eq!(verified.expiration().unwrap() - verified.issued_at().unwrap(), 60);
    assert!(verified.id().unwrap().len() >= 32);
}

#[test]
fn nested_signing_reports_the_inner_token_and_its_signer() {
    let k1 = oct_jwk("k1", "HS256", &[1u8; 32]);
    let k2 = oct_jwk("k2", "HS256", &[2u8; 32]);

    let mut inner = jwt::make_claim_set();
    inner.add_claim("x", Value::integer(1)).unwrap();
    let jwt_inner = inner.sign(&k1).unwrap();

    let jwt_outer = jwt::nested_sign(&k2, &jwt_inner).unwrap();

    let mut keys = JwkSet::new();
    keys.add_key(k1).unwrap();
    keys.add_key(k2).unwrap();

    let verified = jwt::decode(&keys, &jwt_outer, None, None).unwrap();
    assert_eq!(verified.claim("x").unwrap().as_i64().unwrap(), 1);
    assert_eq!(verified.signing_key.unwrap().kid(), "k1");
}

#[test]
fn a_stated_but_unknown_kid_is_named_in_the_failure() {
    let signing_key = oct_jwk("unknown", "HS256", &[7u8; 32]);
    let mut claims = jwt::make_claim_set();
    let token = claims.sign(&signing_key).unwrap();
    claims.set_subject("ignored").ok();

    let different_kid_key = oct_jwk("actually-present", "HS256", &[8u8; 32]);
    let mut keys = JwkSet::new();
    keys.add_key(different_kid_key).unwrap();

    let err = jwt::decode(&keys, &token, None, None).unwrap_err();
    assert!(err.to_string().contains("unknown"));
}

#[test]
fn algorithm_confusion_does_not_fall_back_to_a_mismatched_key() {
    let key = oct_jwk("shared-kid", "HS256", &[4u8; 32]);
    let token = jose_kit::jws::sign_compact(&key, None, b"{}").unwrap();

    // An RSA key under the same kid must never be substituted in.
    let rsa_jwk_text = r#"{"kty":"RSA","alg":"RS256","kid":"shared-kid","n":"AQ","e":"AQ"}"#;
    let rsa_key = parse_jwk(rsa_jwk_text).unwrap();
    let mut keys = JwkSet::new();
    keys.add_key(rsa_key).unwrap();

    assert!(jose_kit::jws::extract(&keys, &token, false).is_err());
}

#[test]
fn duplicate_kid_in_a_parsed_key_set_is_rejected() {
    let one = oct_jwk("dup", "HS256", &[9u8; 32]).to_json();
    let two = oct_jwk("dup", "HS256", &[10u8; 32]).to_json();
    let text = format!(r#"{{"keys":[{one},{two}]}}"#);
    assert!(parse_jwk_set(&text).is_err());
}

#[test]
fn a_large_number_literal_survives_parse_and_reserialize_unchanged() {
    let limits = jose_kit::json::Limits::default();
    let text = r#"{"n": 1.7976931348623157e308}"#;
    let value = jose_kit::json::parse(text, &limits).unwrap();
    let expected = r#"{"n":1.7976931348623157e308}"#;
    assert_eq!(value.to_json(), expected);
}
