//! Auction window state.

use std::collections::{BTreeMap, HashSet};

use sealbid_crypto::verify_payload_commitment;
use sealbid_types::{Digest32, EncryptedPayload, Nonce, Timestamp, WindowPhase, WindowResult};

use crate::error::WindowError;
use crate::genesis::{HouseConfig, HouseConfigError};

/// One land parcel's sealed-bid window.
///
/// Bids are append-only while the window is open, in `[open, close)`.
/// From `close_timestamp` on, the list is frozen and may be read as a
/// snapshot for reveal and settlement.
#[derive(Clone, Debug)]
pub struct AuctionWindow {
    land_id: u64,
    base_price: u128,
    open_timestamp: Timestamp,
    close_timestamp: Timestamp,
    capacity: usize,
    bids: Vec<EncryptedPayload>,
    nonces: HashSet<Nonce>,
    commitments: HashSet<Digest32>,
    result: Option<WindowResult>,
}

impl AuctionWindow {
    pub fn new(
        land_id: u64,
        base_price: u128,
        open_timestamp: Timestamp,
        close_timestamp: Timestamp,
        capacity: usize,
    ) -> Result<Self, WindowError> {
        if close_timestamp <= open_timestamp {
            return Err(WindowError::InvalidTiming {
                open: open_timestamp,
                close: close_timestamp,
            });
        }
        Ok(Self {
            land_id,
            base_price,
            open_timestamp,
            close_timestamp,
            capacity,
            bids: Vec::new(),
            nonces: HashSet::new(),
            commitments: HashSet::new(),
            result: None,
        })
    }

    pub fn land_id(&self) -> u64 {
        self.land_id
    }

    pub fn base_price(&self) -> u128 {
        self.base_price
    }

    pub fn open_timestamp(&self) -> Timestamp {
        self.open_timestamp
    }

    pub fn close_timestamp(&self) -> Timestamp {
        self.close_timestamp
    }

    pub fn phase(&self, now: Timestamp) -> WindowPhase {
        if self.result.is_some() {
            WindowPhase::Settled
        } else if now < self.open_timestamp {
            WindowPhase::Pending
        } else if now < self.close_timestamp {
            WindowPhase::Open
        } else {
            WindowPhase::Closed
        }
    }

    /// Append a published payload. Returns its position in the window.
    pub fn append(&mut self, payload: EncryptedPayload, now: Timestamp) -> Result<usize, WindowError> {
        match self.phase(now) {
            WindowPhase::Pending => return Err(WindowError::BiddingNotStarted),
            WindowPhase::Closed | WindowPhase::Settled => return Err(WindowError::BiddingEnded),
            WindowPhase::Open => {}
        }

        payload.check_version()?;
        if !verify_payload_commitment(&payload) {
            return Err(WindowError::CommitmentMismatch);
        }
        if self.nonces.contains(&payload.nonce) {
            return Err(WindowError::DuplicateNonce(payload.nonce));
        }
        if self.commitments.contains(&payload.commitment_hash) {
            return Err(WindowError::DuplicateCommitment(payload.commitment_hash));
        }
        if self.bids.len() >= self.capacity {
            return Err(WindowError::WindowFull {
                capacity: self.capacity,
            });
        }

        self.nonces.insert(payload.nonce.clone());
        self.commitments.insert(payload.commitment_hash);
        self.bids.push(payload);
        Ok(self.bids.len() - 1)
    }

    /// The frozen bid list. Unavailable before close.
    pub fn snapshot(&self, now: Timestamp) -> Result<&[EncryptedPayload], WindowError> {
        if now < self.close_timestamp {
            return Err(WindowError::StillOpen {
                close_timestamp: self.close_timestamp,
                now,
            });
        }
        Ok(&self.bids)
    }

    /// Published payloads so far. They are public ciphertexts; reveal and
    /// settlement must go through [`AuctionWindow::snapshot`].
    pub fn published(&self) -> &[EncryptedPayload] {
        &self.bids
    }

    /// Milliseconds until close; zero once closed.
    pub fn time_remaining(&self, now: Timestamp) -> u64 {
        self.close_timestamp.saturating_sub(now)
    }

    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    pub fn result(&self) -> Option<&WindowResult> {
        self.result.as_ref()
    }

    pub(crate) fn record_result(&mut self, result: WindowResult) -> Result<(), WindowError> {
        if self.result.is_some() {
            return Err(WindowError::AlreadySettled);
        }
        self.result = Some(result);
        Ok(())
    }
}

/// All auction windows, keyed by land id.
#[derive(Debug, Default)]
pub struct AuctionHouse {
    config: HouseConfig,
    windows: BTreeMap<u64, AuctionWindow>,
}

impl AuctionHouse {
    /// Create a new auction house; the configuration is validated first.
    pub fn new(config: HouseConfig) -> Result<Self, HouseConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            windows: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &HouseConfig {
        &self.config
    }

    /// Get window by land id.
    pub fn get_window(&self, land_id: u64) -> Option<&AuctionWindow> {
        self.windows.get(&land_id)
    }

    /// Get mutable window by land id.
    pub fn get_window_mut(&mut self, land_id: u64) -> Option<&mut AuctionWindow> {
        self.windows.get_mut(&land_id)
    }

    pub fn windows(&self) -> impl Iterator<Item = &AuctionWindow> {
        self.windows.values()
    }

    pub(crate) fn insert_window(&mut self, window: AuctionWindow) -> Result<(), WindowError> {
        let land_id = window.land_id();
        if self.windows.contains_key(&land_id) {
            return Err(WindowError::WindowExists(land_id));
        }
        self.windows.insert(land_id, window);
        Ok(())
    }
}
