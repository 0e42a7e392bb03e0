use jose_kit::base64url::{decode, encode};

#[test]
fn round_trip_is_lossless_for_arbitrary_bytes() {
    let samples: [&[u8]; 6] = [
        b"",
        b"a",
        b"message digest",
        &[0u8, 1, 2, 3, 254, 255],
        b"JOSE headers and signatures are base64url, never base64.",
        &[0xffu8; 200],
    ];
    for sample in samples {
        let encoded = encode(sample);
        assert!(!encoded.contains('='), "encoding must never pad");
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.as_ref(), sample);
    }
}

#[test]
fn decode_tolerates_padding_but_rejects_whitespace() {
    let encoded = encode(b"hello world");
    let padded = format!("{encoded}==");
    assert_eq!(decode(&padded).unwrap().as_ref(), b"hello world");
    assert!(decode(&format!("{encoded} ")).is_err());
}

#[test]
fn decode_rejects_characters_outside_the_url_safe_alphabet() {
    assert!(decode("not+valid/base64").is_err());
}
