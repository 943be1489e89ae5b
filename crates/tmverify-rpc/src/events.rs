//! Chain events and the subscriptions that deliver them.
//!
//! Nodes publish events as `{"type": "...", "value": {...}}`. The payload shape depends
//! on the type, so decoding dispatches on the tag into a closed set of variants; anything
//! unrecognized is kept only by name.
//!
//! A transport that receives those raw objects (a websocket `subscribe` session, say)
//! forwards them into a [`RawEventSubscription`], which decodes each with [`decode_event`].

use crate::api::{RpcBlock, RpcHeader, RpcInt};
use crate::error::{DecodeError, RpcError};
use crate::source::BlockSource;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;
use tmverify_core::Header;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::trace;

pub const NEW_BLOCK_EVENT: &str = "tendermint/event/NewBlock";
pub const NEW_BLOCK_HEADER_EVENT: &str = "tendermint/event/NewBlockHeader";
pub const TX_EVENT: &str = "tendermint/event/Tx";
pub const VOTE_EVENT: &str = "tendermint/event/Vote";

/// A decoded chain event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainEvent {
    NewBlock(Header),
    NewBlockHeader(Header),
    Tx { height: u64 },
    Vote { height: u64, round: i32 },
    Other { kind: String },
}

impl ChainEvent {
    /// The wire type name of this event.
    pub fn kind(&self) -> &str {
        match self {
            ChainEvent::NewBlock(_) => NEW_BLOCK_EVENT,
            ChainEvent::NewBlockHeader(_) => NEW_BLOCK_HEADER_EVENT,
            ChainEvent::Tx { .. } => TX_EVENT,
            ChainEvent::Vote { .. } => VOTE_EVENT,
            ChainEvent::Other { kind } => kind,
        }
    }
}

#[derive(Deserialize)]
struct TaggedEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Deserialize)]
struct NewBlockValue {
    block: RpcBlock,
}

#[derive(Deserialize)]
struct NewBlockHeaderValue {
    header: RpcHeader,
}

#[derive(Deserialize)]
struct TxValue {
    #[serde(rename = "TxResult")]
    tx_result: HeightOnly,
}

#[derive(Deserialize)]
struct VoteValue {
    #[serde(rename = "Vote")]
    vote: VoteHeightRound,
}

#[derive(Deserialize)]
struct HeightOnly {
    height: RpcInt,
}

#[derive(Deserialize)]
struct VoteHeightRound {
    height: RpcInt,
    round: i32,
}

/// Decode one `{"type", "value"}` event object.
pub fn decode_event(event: serde_json::Value) -> Result<ChainEvent, DecodeError> {
    let TaggedEvent { kind, value } = serde_json::from_value(event)?;

    let decoded = match kind.as_str() {
        NEW_BLOCK_EVENT => {
            let v: NewBlockValue = serde_json::from_value(value)?;
            ChainEvent::NewBlock(v.block.header.to_core()?)
        }
        NEW_BLOCK_HEADER_EVENT => {
            let v: NewBlockHeaderValue = serde_json::from_value(value)?;
            ChainEvent::NewBlockHeader(v.header.to_core()?)
        }
        TX_EVENT => {
            let v: TxValue = serde_json::from_value(value)?;
            ChainEvent::Tx {
                height: v.tx_result.height.parse_u64("TxResult.height")?,
            }
        }
        VOTE_EVENT => {
            let v: VoteValue = serde_json::from_value(value)?;
            ChainEvent::Vote {
                height: v.vote.height.parse_u64("Vote.height")?,
                round: v.vote.round,
            }
        }
        _ => ChainEvent::Other { kind },
    };
    Ok(decoded)
}

/// A stream of chain events.
#[async_trait]
pub trait Subscription: Send {
    /// The next event, or `None` once the subscription has ended.
    async fn next_event(&mut self) -> Option<Result<ChainEvent, RpcError>>;
}

/// Events pushed by another task.
#[async_trait]
impl Subscription for mpsc::Receiver<Result<ChainEvent, RpcError>> {
    async fn next_event(&mut self) -> Option<Result<ChainEvent, RpcError>> {
        self.recv().await
    }
}

/// Raw event objects pushed by an external transport, decoded as they are received.
///
/// An object that fails to decode is reported as an error; the subscription stays open.
pub struct RawEventSubscription {
    receiver: mpsc::Receiver<serde_json::Value>,
}

impl RawEventSubscription {
    pub fn new(receiver: mpsc::Receiver<serde_json::Value>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl Subscription for RawEventSubscription {
    async fn next_event(&mut self) -> Option<Result<ChainEvent, RpcError>> {
        let raw = self.receiver.recv().await?;
        Some(decode_event(raw).map_err(|e| RpcError::decode("subscribe", e)))
    }
}

/// New-block events produced by polling a [`BlockSource`] for its latest height.
///
/// The first poll only records the current tip; every block after it is emitted once,
/// in height order.
pub struct PollingSubscription<'a, S: ?Sized> {
    source: &'a S,
    ticker: Interval,
    last_seen: Option<u64>,
    pending: VecDeque<u64>,
}

impl<'a, S: BlockSource + ?Sized> PollingSubscription<'a, S> {
    /// Fails with [`RpcError::Config`] on a zero interval.
    pub fn new(source: &'a S, poll_interval: Duration) -> Result<Self, RpcError> {
        if poll_interval.is_zero() {
            return Err(RpcError::Config("poll interval must be greater than zero".into()));
        }
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Ok(Self {
            source,
            ticker,
            last_seen: None,
            pending: VecDeque::new(),
        })
    }
}

#[async_trait]
impl<'a, S: BlockSource + ?Sized> Subscription for PollingSubscription<'a, S> {
    async fn next_event(&mut self) -> Option<Result<ChainEvent, RpcError>> {
        loop {
            if let Some(height) = self.pending.pop_front() {
                return Some(self.source.block_header(height).await.map(ChainEvent::NewBlock));
            }

            self.ticker.tick().await;
            let latest = match self.source.latest_height().await {
                Ok(latest) => latest,
                Err(e) => return Some(Err(e)),
            };
            trace!(latest, last_seen = ?self.last_seen, "polled chain tip");

            match self.last_seen {
                None => self.last_seen = Some(latest),
                Some(seen) if latest > seen => {
                    self.pending.extend(seen + 1..=latest);
                    self.last_seen = Some(latest);
                }
                Some(_) => {}
            }
        }
    }
}
