use crate::error::RpcError;
use crate::events::{ChainEvent, Subscription};
use async_trait::async_trait;
use std::time::Duration;
use tmverify_core::{Commit, Header, UntrustedHeader, ValidatorSet};
use tracing::{debug, info};

/// How long [`wait_for_block`] waits by default for a height that is not produced yet.
pub const DEFAULT_BLOCK_WAIT: Duration = Duration::from_secs(120);

/// Where untrusted chain data comes from. Nothing returned here is trusted.
///
/// Implementations must return [`RpcError::NotFound`] for heights the chain has not reached.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn block_header(&self, height: u64) -> Result<Header, RpcError>;

    async fn commit(&self, height: u64) -> Result<Commit, RpcError>;

    /// The full validator set that signs `height`, in canonical order.
    async fn validators(&self, height: u64) -> Result<ValidatorSet, RpcError>;

    async fn latest_height(&self) -> Result<u64, RpcError>;
}

/// Fetch the commit and validator set belonging to an already fetched header.
pub async fn assemble_candidate<S: BlockSource + ?Sized>(
    source: &S,
    header: Header,
) -> Result<UntrustedHeader, RpcError> {
    let height = header.height;
    let (commit, validators) = tokio::try_join!(source.commit(height), source.validators(height))?;
    debug!(
        height,
        validators = validators.size(),
        signatures = commit.signatures.len(),
        "candidate assembled"
    );
    Ok(UntrustedHeader {
        header,
        commit,
        validators,
    })
}

/// Fetch everything needed to verify `height`.
pub async fn fetch_candidate<S: BlockSource + ?Sized>(
    source: &S,
    height: u64,
) -> Result<UntrustedHeader, RpcError> {
    let header = source.block_header(height).await?;
    assemble_candidate(source, header).await
}

/// Return the header at `height`, waiting on `events` if it has not been produced yet.
///
/// The direct fetch is tried once; any failure falls through to the subscription.
/// Gives up with [`RpcError::Timeout`] after `wait`.
pub async fn wait_for_block<S, E>(
    source: &S,
    events: &mut E,
    height: u64,
    wait: Duration,
) -> Result<Header, RpcError>
where
    S: BlockSource + ?Sized,
    E: Subscription + ?Sized,
{
    match source.block_header(height).await {
        Ok(header) => return Ok(header),
        Err(e) => debug!(height, error = %e, "block not available, waiting for it"),
    }

    info!(height, wait_secs = wait.as_secs(), "waiting for new block");
    let arrival = async {
        loop {
            let event = match events.next_event().await {
                Some(event) => event?,
                None => return Err(RpcError::SubscriptionClosed { height }),
            };

            match event {
                ChainEvent::NewBlock(header) if header.height == height => return Ok(header),
                // Overshot: the block exists now, so ask for it directly.
                ChainEvent::NewBlock(header) if header.height > height => {
                    return source.block_header(height).await
                }
                ChainEvent::NewBlock(header) => {
                    debug!(height, seen = header.height, "older block, still waiting")
                }
                other => {
                    return Err(RpcError::UnexpectedEvent {
                        kind: other.kind().to_string(),
                    })
                }
            }
        }
    };

    tokio::time::timeout(wait, arrival)
        .await
        .map_err(|_| RpcError::Timeout {
            height,
            waited: wait,
        })?
}
