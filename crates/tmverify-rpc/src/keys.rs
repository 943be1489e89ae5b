/// Store prefix under which the bridge module keeps spans.
pub const SPAN_PREFIX_KEY: &[u8] = &[0x36];

/// Store path span keys are queried under.
pub const SPAN_STORE_PATH: &str = "/store/bor/key";

/// Store key of span `id`: the prefix followed by the id in decimal ASCII.
pub fn span_key(prefix: &[u8], id: u64) -> Vec<u8> {
    let digits = id.to_string();
    let mut key = Vec::with_capacity(prefix.len() + digits.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(digits.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_key_is_decimal() {
        assert_eq!(span_key(SPAN_PREFIX_KEY, 1), vec![0x36, b'1']);
        assert_eq!(span_key(SPAN_PREFIX_KEY, 1024), b"\x361024".to_vec());
        assert_eq!(span_key(SPAN_PREFIX_KEY, 0), vec![0x36, b'0']);
    }

    #[test]
    fn test_span_key_respects_prefix() {
        assert_eq!(span_key(&[], 7), b"7".to_vec());
        assert_eq!(span_key(&[0xAB, 0xCD], 12), vec![0xAB, 0xCD, b'1', b'2']);
    }
}
