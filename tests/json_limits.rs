use jose_kit::json::{parse, parse_object, Limits};

#[test]
fn recursion_depth_exactly_at_the_limit_parses_one_past_fails() {
    let mut limits = Limits::default();
    limits.max_recursion_depth = 4;

    let at_limit = "[[[[1]]]]";
    let one_more = "[[[[[1]]]]]";
    assert!(parse(at_limit, &limits).is_ok());
    let err = parse(one_more, &limits).unwrap_err();
    assert!(matches!(err, jose_kit::Error::JsonLimitViolation { .. }));
}

#[test]
fn total_input_size_is_bounded() {
    let mut limits = Limits::default();
    limits.max_json_bytes = 16;
    let small = r#"{"a":1}"#;
    let big = format!(r#"{{"a":"{}"}}"#, "x".repeat(64));
    assert!(parse(small, &limits).is_ok());
    assert!(matches!(
        parse(&big, &limits).unwrap_err(),
        jose_kit::Error::JsonLimitViolation { .. }
    ));
}

#[test]
fn string_length_is_bounded() {
    let mut limits = Limits::default();
    limits.max_string_bytes = 4;
    assert!(parse("\"ok\"", &limits).is_ok());
    assert!(parse("\"too long for the limit\"", &limits).is_err());
}

#[test]
fn array_and_object_member_counts_are_bounded() {
    let mut limits = Limits::default();
    limits.max_array_elements = 2;
    limits.max_object_members = 2;
    assert!(parse("[1,2]", &limits).is_ok());
    assert!(parse("[1,2,3]", &limits).is_err());
    assert!(parse(r#"{"a":1,"b":2}"#, &limits).is_ok());
    assert!(parse(r#"{"a":1,"b":2,"c":3}"#, &limits).is_err());
}

#[test]
fn numeral_lexeme_length_is_bounded() {
    let mut limits = Limits::default();
    limits.max_numeral_length = 5;
    assert!(parse("12345", &limits).is_ok());
    assert!(parse("123456", &limits).is_err());
}

#[test]
fn top_level_non_object_is_rejected_by_parse_object() {
    let limits = Limits::default();
    assert!(matches!(
        parse_object("[1,2,3]", &limits).unwrap_err(),
        jose_kit::Error::NotJsonObject { .. }
    ));
    assert!(parse_object(r#"{"ok":true}"#, &limits).is_ok());
}

#[test]
fn trailing_garbage_after_the_top_level_value_fails() {
    let limits = Limits::default();
    assert!(parse("1 2", &limits).is_err());
    assert!(parse(r#"{"a":1} garbage"#, &limits).is_err());
}

#[test]
fn malformed_escape_sequences_are_rejected() {
    let limits = Limits::default();
    assert!(parse(r#""bad \q escape""#, &limits).is_err());
    assert!(parse(r#""unterminated"#, &limits).is_err());
}
