//! # tmverify core
//!
//! Pure Rust verification of BFT block headers for Tendermint-style chains.
//!
//! This crate contains **no networking code** and **no async runtime**. Given a
//! header, its commit, the validator set and the trusted anchor from the previous
//! height, it decides accept or reject, and nothing else.
//!
//! ## Trust Model
//!
//! - **Anchor** (`EpochInfo`): the only input taken on trust. It must come from the
//!   previous height's header, and that header must itself be trusted or verified.
//!
//! - **Everything else** (`UntrustedHeader`): may come from any RPC endpoint. The
//!   validator set is tied to the anchor and the header by hash, the commit is tied
//!   to the header by hash, and the commit must carry valid signatures from more
//!   than two thirds of the set's voting power.
//!
//! Verification is fail-closed: any error is a rejection, and there is no partial success.
//!
//! ## Usage
//!
//! ```ignore
//! use tmverify_core::{verify_header, EpochInfo, UntrustedHeader};
//!
//! let verified = verify_header(&candidate, &anchor)?;
//! let next_anchor = verified.next_epoch_info();
//! ```

pub mod consensus;
pub mod encoding;
pub mod types;

// Re-export commonly used types for convenience
pub use consensus::{
    error::{HashClaim, VerificationError},
    signature::{
        Bls12381Verifier, Ed25519Verifier, Secp256k1Verifier, SignatureVerifier, StandardVerifier,
        BLS_DST,
    },
    verifier::{quorum_threshold, verify_header, HeaderVerifier, UntrustedHeader, VerifiedHeader},
};
pub use encoding::{ChainCodec, Tendermint};
pub use types::*;
