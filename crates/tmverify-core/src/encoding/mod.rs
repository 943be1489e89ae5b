pub mod codec;
pub mod merkle;
pub mod proto;

pub use codec::*;
pub use merkle::{sha256_hash, simple_hash_from_byte_slices};
