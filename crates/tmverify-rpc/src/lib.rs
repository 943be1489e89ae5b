//! # tmverify-rpc
//!
//! Fetches the untrusted inputs of header verification from a Tendermint node and
//! waits for heights that have not been produced yet.
//!
//! Nothing this crate returns is trusted. Its output goes into
//! [`tmverify_core::HeaderVerifier::verify`], which decides accept or reject.
//!
//! ## Usage
//!
//! ```ignore
//! let rpc = TendermintRpc::new("http://localhost:26657")?;
//! let mut events = PollingSubscription::new(&rpc, Duration::from_secs(1))?;
//! let header = wait_for_block(&rpc, &mut events, height, DEFAULT_BLOCK_WAIT).await?;
//! let candidate = assemble_candidate(&rpc, header).await?;
//! let verified = verify_header(&candidate, &anchor)?;
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod events;
pub mod jsonrpc;
pub mod keys;
pub mod snapshot;
pub mod source;

pub use client::TendermintRpc;
pub use error::{DecodeError, RpcError};
pub use events::{decode_event, ChainEvent, PollingSubscription, RawEventSubscription, Subscription};
pub use keys::{span_key, SPAN_PREFIX_KEY};
pub use snapshot::{Snapshot, SnapshotClient};
pub use source::{assemble_candidate, fetch_candidate, wait_for_block, BlockSource, DEFAULT_BLOCK_WAIT};
