//! Unit tests for inline payload helpers

use virtual_tryon::response::base64;

#[test]
fn test_base64_encode_decode() {
    let original = b"Hello, World!";
    let encoded = base64::encode(original);
    let decoded = base64::decode(&encoded).unwrap();

    assert_eq!(original.as_slice(), decoded.as_slice());
}

#[test]
fn test_base64_decode_data_url() {
    let data_url = "data:image/png;base64,SGVsbG8sIFdvcmxkIQ==";
    let decoded = base64::decode(data_url).unwrap();

    assert_eq!(b"Hello, World!", decoded.as_slice());
}

#[test]
fn test_base64_decode_rejects_garbage() {
    assert!(base64::decode("not valid base64!!!").is_err());
}

#[test]
fn test_mime_from_data_url() {
    assert_eq!(base64::mime_from_data_url("data:image/png;base64,abc"), Some("image/png"));
    assert_eq!(base64::mime_from_data_url("data:image/jpeg;base64,abc"), Some("image/jpeg"));
    assert_eq!(base64::mime_from_data_url("not a data url"), None);
}

#[test]
fn test_create_data_url() {
    let data = b"test data";
    let data_url = base64::create_data_url(data, "image/jpeg");

    assert!(data_url.starts_with("data:image/jpeg;base64,"));

    let decoded = base64::decode(&data_url).unwrap();
    assert_eq!(data.as_slice(), decoded.as_slice());
}
