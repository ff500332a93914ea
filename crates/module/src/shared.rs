//! Thread-safe access to the auction house.
//!
//! Every append takes the write lock, so concurrent submissions are applied
//! one at a time in lock order. Readers take the read lock and copy out a
//! consistent view.

use std::sync::Arc;

use parking_lot::RwLock;

use sealbid_client::{BidLedger, LedgerError, TimeSource};
use sealbid_types::{EncryptedPayload, Timestamp, WindowResult};

use crate::error::WindowError;
use crate::genesis::{HouseConfig, HouseConfigError};
use crate::handlers::{
    handle_open_window, handle_settle, handle_submit_bid, CallContext, HandlerResult,
};
use crate::queries::{handle_query, WindowQuery, WindowQueryResponse};
use crate::settlement::RevealedBid;
use crate::state::AuctionHouse;

/// Shared handle to an [`AuctionHouse`].
#[derive(Clone, Default)]
pub struct SharedAuctionHouse {
    inner: Arc<RwLock<AuctionHouse>>,
}

impl SharedAuctionHouse {
    /// Wrap a new house; fails if `config` does not validate.
    pub fn new(config: HouseConfig) -> Result<Self, HouseConfigError> {
        Ok(Self {
            inner: Arc::new(RwLock::new(AuctionHouse::new(config)?)),
        })
    }

    pub fn open_window(
        &self,
        ctx: &CallContext,
        land_id: u64,
        base_price: u128,
        open_timestamp: Timestamp,
        close_timestamp: Timestamp,
    ) -> HandlerResult<()> {
        let mut house = self.inner.write();
        handle_open_window(&mut house, ctx, land_id, base_price, open_timestamp, close_timestamp)
    }

    pub fn submit_bid(
        &self,
        ctx: &CallContext,
        land_id: u64,
        payload: EncryptedPayload,
    ) -> HandlerResult<usize> {
        let mut house = self.inner.write();
        handle_submit_bid(&mut house, ctx, land_id, payload)
    }

    pub fn settle(
        &self,
        ctx: &CallContext,
        land_id: u64,
        reveals: &[RevealedBid],
    ) -> HandlerResult<WindowResult> {
        let mut house = self.inner.write();
        handle_settle(&mut house, ctx, land_id, reveals)
    }

    /// Copy of the frozen bid list; fails before close.
    pub fn snapshot(&self, land_id: u64, now: Timestamp) -> HandlerResult<Vec<EncryptedPayload>> {
        let house = self.inner.read();
        let window = house
            .get_window(land_id)
            .ok_or(WindowError::WindowNotFound(land_id))?;
        Ok(window.snapshot(now)?.to_vec())
    }

    pub fn close_timestamp(&self, land_id: u64) -> Option<Timestamp> {
        self.inner.read().get_window(land_id).map(|w| w.close_timestamp())
    }

    pub fn query(&self, query: WindowQuery, now: Timestamp) -> WindowQueryResponse {
        handle_query(&self.inner.read(), query, now)
    }

    /// A [`BidLedger`] that publishes into one window.
    pub fn ledger<C: TimeSource>(&self, land_id: u64, sender: impl Into<String>, clock: C) -> WindowLedger<C> {
        WindowLedger {
            house: self.clone(),
            land_id,
            sender: sender.into(),
            clock,
        }
    }
}

/// Publishes bids into one window of a shared house.
pub struct WindowLedger<C> {
    house: SharedAuctionHouse,
    land_id: u64,
    sender: String,
    clock: C,
}

impl<C: TimeSource> BidLedger for WindowLedger<C> {
    fn submit(&self, payload: &EncryptedPayload) -> Result<(), LedgerError> {
        let ctx = CallContext {
            sender: self.sender.clone(),
            timestamp: self.clock.now_ms(),
        };
        self.house
            .submit_bid(&ctx, self.land_id, payload.clone())
            .map(|_| ())
            .map_err(|e| match e {
                WindowError::DuplicateNonce(nonce) => LedgerError::DuplicateNonce(nonce),
                WindowError::DuplicateCommitment(c) => LedgerError::DuplicateCommitment(c),
                WindowError::InvalidPayload(e) => LedgerError::InvalidPayload(e),
                other => LedgerError::Rejected(other.to_string()),
            })
    }

    fn bids(&self) -> Vec<EncryptedPayload> {
        self.house
            .inner
            .read()
            .get_window(self.land_id)
            .map(|w| w.published().to_vec())
            .unwrap_or_default()
    }
}
