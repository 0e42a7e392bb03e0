use jose_kit::jwk::{parse_jwk, parse_jwk_set};

fn oct_jwk(kid: &str) -> String {
    let k = jose_kit::base64url::encode(&[1u8; 32]);
    format!(r#"{{"kty":"oct","alg":"HS256","use":"sig","kid":"{kid}","k":"{k}"}}"#)
}

#[test]
fn minimal_hmac_key_parses_and_exposes_typed_accessors() {
    let jwk = parse_jwk(&oct_jwk("hmac-1")).unwrap();
    assert_eq!(jwk.kty(), "oct");
    assert_eq!(jwk.kid(), "hmac-1");
    assert_eq!(jwk.alg(), Some("HS256"));
    assert!(jwk.can_sign());
    assert!(jwk.can_verify());
}

#[test]
fn missing_kid_is_rejected_even_though_rfc7517_makes_it_optional() {
    let text = r#"{"kty":"oct","k":"c2VjcmV0"}"#;
    assert!(parse_jwk(text).is_err());
}

#[test]
fn unsupported_key_type_is_rejected() {
    let text = r#"{"kty":"DSA","kid":"d1","k":"c2VjcmV0"}"#;
    assert!(parse_jwk(text).is_err());
}

#[test]
fn alg_incompatible_with_key_type_is_rejected() {
    // RS256 requires an RSA key; presenting it on an oct key must fail.
    let text = r#"{"kty":"oct","alg":"RS256","kid":"x","k":"c2VjcmV0"}"#;
    assert!(parse_jwk(text).is_err());
}

#[test]
fn unknown_key_op_is_rejected() {
    let text = r#"{"kty":"oct","kid":"x","key_ops":["sign","teleport"],"k":"c2VjcmV0"}"#;
    assert!(parse_jwk(text).is_err());
}

#[test]
fn rsa_private_key_requires_d_p_q_when_d_is_present() {
    let incomplete = r#"{"kty":"RSA","kid":"r1","n":"AQ","e":"AQ","d":"AQ"}"#;
    assert!(parse_jwk(incomplete).is_err());

    let complete = r#"{"kty":"RSA","kid":"r1","n":"AQ","e":"AQ","d":"AQ","p":"AQ","q":"AQ"}"#;
    assert!(parse_jwk(complete).is_ok());
}

#[test]
fn jwk_set_parses_and_indexes_by_kid() {
    let text = format!(
        r#"{{"keys":[{},{}]}}"#,
        oct_jwk("a"),
        oct_jwk("b")
    );
    let set = parse_jwk_set(&text).unwrap();
    assert_eq!(set.count(), 2);
    assert!(set.contains("a"));
    assert!(set.contains("b"));
    assert!(!set.contains("c"));
    assert_eq!(set.get_key("a").unwrap().kid(), "a");
}

#[test]
fn duplicate_kid_in_a_key_set_is_rejected() {
    let text = format!(r#"{{"keys":[{},{}]}}"#, oct_jwk("dup"), oct_jwk("dup"));
    assert!(parse_jwk_set(&text).is_err());
}

#[test]
fn jwk_set_add_remove_and_clone_stay_consistent() {
    let mut set = parse_jwk_set(&format!(r#"{{"keys":[{}]}}"#, oct_jwk("a"))).unwrap();
    assert!(set.add_key(parse_jwk(&oct_jwk("a")).unwrap()).is_err());
    set.add_key(parse_jwk(&oct_jwk("b")).unwrap()).unwrap();
    assert_eq!(set.count(), 2);

    let cloned = set.clone_deep();
    assert_eq!(cloned.count(), 2);
    assert!(cloned.contains("a"));

    set.remove_key("a");
    assert_eq!(set.count(), 1);
    assert!(!set.contains("a"));
    set.remove_key("does-not-exist");
    assert_eq!(set.count(), 1);
}
