//! Just enough protobuf to reproduce the canonical encodings signed and hashed by the chain.
//!
//! Scalar and bytes fields follow proto3 rules: zero values are omitted.
//! Embedded messages are always written, matching non-nullable fields in the chain's schema.

const WIRE_VARINT: u64 = 0;
const WIRE_FIXED64: u64 = 1;
const WIRE_LEN: u64 = 2;

/// Append `value` as an unsigned LEB128 varint.
pub fn encode_uvarint(mut value: u64, buf: &mut Vec<u8>) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Prefix `bytes` with its uvarint length.
pub fn length_delimited(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    encode_uvarint(bytes.len() as u64, &mut out);
    out.extend_from_slice(bytes);
    out
}

/// Builds one protobuf message, field by field, in field-number order.
#[derive(Debug, Default)]
pub struct ProtoWriter {
    buf: Vec<u8>,
}

impl ProtoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(&mut self, field: u32, wire_type: u64) {
        encode_uvarint(((field as u64) << 3) | wire_type, &mut self.buf);
    }

    pub fn uint64(&mut self, field: u32, value: u64) -> &mut Self {
        if value != 0 {
            self.key(field, WIRE_VARINT);
            encode_uvarint(value, &mut self.buf);
        }
        self
    }

    /// int64 and int32 both encode negatives as ten-byte two's complement varints.
    pub fn int64(&mut self, field: u32, value: i64) -> &mut Self {
        self.uint64(field, value as u64)
    }

    pub fn int32(&mut self, field: u32, value: i32) -> &mut Self {
        self.int64(field, value as i64)
    }

    pub fn sfixed64(&mut self, field: u32, value: i64) -> &mut Self {
        if value != 0 {
            self.key(field, WIRE_FIXED64);
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
        self
    }

    pub fn bytes(&mut self, field: u32, value: &[u8]) -> &mut Self {
        if !value.is_empty() {
            self.message(field, value);
        }
        self
    }

    pub fn string(&mut self, field: u32, value: &str) -> &mut Self {
        self.bytes(field, value.as_bytes())
    }

    /// Write an embedded message, even when it encodes to nothing.
    pub fn message(&mut self, field: u32, encoded: &[u8]) -> &mut Self {
        self.key(field, WIRE_LEN);
        encode_uvarint(encoded.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(encoded);
        self
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}
