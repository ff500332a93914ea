//! Bid lifecycle state machine.
//!
//! ```text
//! Drafted ──encrypt──▶ Encrypted ──publish──▶ Published ──reveal──▶ Revealed
//!    │                     │                      │
//!    └─────────────────────┴──────────────────────┴──▶ Rejected
//! ```
//!
//! Validation failures move a bid to `Rejected`. Missing entropy and early
//! reveal leave it where it was so the caller can retry.

use std::collections::{HashMap, HashSet};

use rand::{CryptoRng, RngCore};
use tracing::{info, warn};

use sealbid_crypto::KeyPair;
use sealbid_types::{
    BidPhase, BidRecord, Digest32, EncryptedPayload, Nonce, PublicKeyBytes, Timestamp,
};

use crate::bid::{create_bid, encrypt_bid, reveal_bid, Reveal};
use crate::clock::TimeSource;
use crate::error::BidError;
use crate::ledger::{BidLedger, LedgerError};

/// One bid and how far it has progressed.
#[derive(Clone, Debug)]
pub struct SealedBid {
    phase: BidPhase,
    record: BidRecord,
    payload: Option<EncryptedPayload>,
    reveal: Option<Reveal>,
    rejection: Option<BidError>,
}

impl SealedBid {
    /// Start a bid from a drafted record.
    pub fn drafted(record: BidRecord) -> Self {
        Self {
            phase: BidPhase::Drafted,
            record,
            payload: None,
            reveal: None,
            rejection: None,
        }
    }

    pub fn phase(&self) -> BidPhase {
        self.phase
    }

    pub fn record(&self) -> &BidRecord {
        &self.record
    }

    pub fn payload(&self) -> Option<&EncryptedPayload> {
        self.payload.as_ref()
    }

    pub fn reveal(&self) -> Option<&Reveal> {
        self.reveal.as_ref()
    }

    /// Why the bid was rejected, if it was.
    pub fn rejection(&self) -> Option<&BidError> {
        self.rejection.as_ref()
    }

    fn expect_phase(&self, allowed: &[BidPhase], action: &'static str) -> Result<(), BidError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(BidError::InvalidTransition {
                phase: self.phase,
                action,
            })
        }
    }

    /// Record a failure, moving to `Rejected` when it invalidates the bid.
    fn fail(&mut self, err: BidError) -> BidError {
        if err.rejects_bid() {
            warn!(phase = ?self.phase, error = %err, "Bid rejected");
            self.phase = BidPhase::Rejected;
            self.rejection = Some(err.clone());
        }
        err
    }
}

/// Drives bids through their phases for one bidder.
///
/// Owns the bidder's key pair and the injected clock and random source.
/// Remembers which nonces it has published and caches reveals by
/// commitment so a second reveal returns the identical proof.
pub struct BidLifecycle<C, R> {
    keys: KeyPair,
    clock: C,
    rng: R,
    published: HashSet<Nonce>,
    reveals: HashMap<Digest32, (EncryptedPayload, Reveal)>,
}

impl<C: TimeSource, R: RngCore + CryptoRng> BidLifecycle<C, R> {
    pub fn new(keys: KeyPair, clock: C, rng: R) -> Self {
        Self {
            keys,
            clock,
            rng,
            published: HashSet::new(),
            reveals: HashMap::new(),
        }
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    /// Public key to hand to auditors alongside reveals.
    pub fn public_key(&self) -> PublicKeyBytes {
        self.keys.public_key().to_bytes()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Draft a bid with the current time and a fresh nonce.
    pub fn create_bid(&mut self, amount: &str, bidder: &str) -> Result<SealedBid, BidError> {
        let record = create_bid(amount, bidder, &self.clock, &mut self.rng)?;
        Ok(SealedBid::drafted(record))
    }

    /// `Drafted → Encrypted`.
    pub fn encrypt(&mut self, bid: &mut SealedBid) -> Result<(), BidError> {
        bid.expect_phase(&[BidPhase::Drafted], "encrypt")?;

        match encrypt_bid(&bid.record, &self.keys, &mut self.rng) {
            Ok(payload) => {
                bid.payload = Some(payload);
                bid.phase = BidPhase::Encrypted;
                Ok(())
            }
            Err(e) => Err(bid.fail(e)),
        }
    }

    /// `Encrypted → Published`.
    ///
    /// A nonce this lifecycle already published, one already on the ledger,
    /// or one the ledger refuses on submission rejects the bid.
    pub fn publish<L: BidLedger + ?Sized>(
        &mut self,
        bid: &mut SealedBid,
        ledger: &L,
    ) -> Result<(), BidError> {
        bid.expect_phase(&[BidPhase::Encrypted], "publish")?;
        let Some(payload) = bid.payload.clone() else {
            return Err(BidError::InvalidTransition {
                phase: bid.phase,
                action: "publish",
            });
        };

        if self.published.contains(&payload.nonce) || ledger.contains_nonce(&payload.nonce) {
            return Err(bid.fail(BidError::DuplicateNonce(payload.nonce)));
        }

        match ledger.submit(&payload) {
            Ok(()) => {}
            Err(LedgerError::DuplicateNonce(nonce)) => {
                return Err(bid.fail(BidError::DuplicateNonce(nonce)));
            }
            Err(e) => return Err(bid.fail(BidError::Ledger(e))),
        }

        info!(
            commitment = payload.commitment_hash.to_hex(),
            "Published bid"
        );
        self.published.insert(payload.nonce);
        bid.phase = BidPhase::Published;
        Ok(())
    }

    /// `Published → Revealed`, once the window has closed.
    ///
    /// Revealing an already revealed bid returns the cached result.
    pub fn reveal(
        &mut self,
        bid: &mut SealedBid,
        close_timestamp: Timestamp,
    ) -> Result<Reveal, BidError> {
        bid.expect_phase(&[BidPhase::Published, BidPhase::Revealed], "reveal")?;
        let Some(payload) = bid.payload.clone() else {
            return Err(BidError::InvalidTransition {
                phase: bid.phase,
                action: "reveal",
            });
        };

        match self.reveal_payload(&payload, close_timestamp) {
            Ok(reveal) => {
                bid.reveal = Some(reveal.clone());
                bid.phase = BidPhase::Revealed;
                Ok(reveal)
            }
            Err(e) => Err(bid.fail(e)),
        }
    }

    /// Reveal a payload retrieved from the ledger.
    ///
    /// The temporal guard is checked on every call. After close, the first
    /// successful reveal of a payload is cached and returned verbatim on
    /// later calls.
    pub fn reveal_payload(
        &mut self,
        payload: &EncryptedPayload,
        close_timestamp: Timestamp,
    ) -> Result<Reveal, BidError> {
        let now = self.clock.now_ms();
        if now < close_timestamp {
            return Err(BidError::AuctionStillOpen {
                close_timestamp,
                now,
            });
        }

        if let Some((cached_payload, reveal)) = self.reveals.get(&payload.commitment_hash) {
            if cached_payload == payload {
                return Ok(reveal.clone());
            }
        }

        let reveal = reveal_bid(payload, &self.keys, close_timestamp, &self.clock, &mut self.rng)?;
        self.reveals.insert(
            payload.commitment_hash,
            (payload.clone(), reveal.clone()),
        );
        Ok(reveal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bid::BidBuilder;
    use crate::clock::ManualClock;
    use crate::ledger::InMemoryLedger;
    use rand::rngs::OsRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use sealbid_crypto::{generate_key_pair, CryptoError, KeySizing};

    const START: Timestamp = 1_700_000_000_000;

    fn lifecycle() -> BidLifecycle<ManualClock, OsRng> {
        let keys = generate_key_pair(KeySizing::new(512), &mut OsRng).unwrap();
        BidLifecycle::new(keys, ManualClock::new(START), OsRng)
    }

    #[test]
    fn test_happy_path() {
        let mut lc = lifecycle();
        let ledger = InMemoryLedger::new();

        let mut bid = lc.create_bid("3", "0xABC").unwrap();
        assert_eq!(bid.phase(), BidPhase::Drafted);

        lc.encrypt(&mut bid).unwrap();
        assert_eq!(bid.phase(), BidPhase::Encrypted);
        assert!(bid.payload().is_some());

        lc.publish(&mut bid, &ledger).unwrap();
        assert_eq!(bid.phase(), BidPhase::Published);
        assert_eq!(ledger.bids(), vec![bid.payload().unwrap().clone()]);

        lc.clock().advance(1_000);
        let reveal = lc.reveal(&mut bid, START + 1_000).unwrap();
        assert_eq!(bid.phase(), BidPhase::Revealed);
        assert_eq!(reveal.bid.amount, "3");
        assert_eq!(bid.reveal(), Some(&reveal));
    }

    #[test]
    fn test_encoding_failure_rejects() {
        let mut lc = lifecycle();
        let mut bid = lc.create_bid("12abc", "0xABC").unwrap();

        let err = lc.encrypt(&mut bid).unwrap_err();
        assert!(matches!(
            err,
            BidError::Crypto(CryptoError::EncodingError { field: "amount", .. })
        ));
        assert_eq!(bid.phase(), BidPhase::Rejected);
        assert_eq!(bid.rejection(), Some(&err));

        assert!(matches!(
            lc.encrypt(&mut bid),
            Err(BidError::InvalidTransition {
                phase: BidPhase::Rejected,
                action: "encrypt"
            })
        ));
    }

    #[test]
    fn test_out_of_order_transitions() {
        let mut lc = lifecycle();
        let ledger = InMemoryLedger::new();
        let mut bid = lc.create_bid("3", "0xABC").unwrap();

        assert!(matches!(
            lc.publish(&mut bid, &ledger),
            Err(BidError::InvalidTransition { phase: BidPhase::Drafted, .. })
        ));
        assert!(matches!(
            lc.reveal(&mut bid, START),
            Err(BidError::InvalidTransition { phase: BidPhase::Drafted, .. })
        ));
        assert_eq!(bid.phase(), BidPhase::Drafted);
    }

    #[test]
    fn test_duplicate_nonce_rejected() {
        let mut lc = lifecycle();
        let ledger = InMemoryLedger::new();
        let nonce = Nonce("18bcfe56800-feed".into());

        let record = BidBuilder::new("0xABC")
            .amount("3")
            .nonce(nonce.clone())
            .build(lc.clock(), &mut OsRng)
            .unwrap();
        let mut first = SealedBid::drafted(record.clone());
        let mut second = SealedBid::drafted(record);

        lc.encrypt(&mut first).unwrap();
        lc.encrypt(&mut second).unwrap();
        lc.publish(&mut first, &ledger).unwrap();

        assert_eq!(
            lc.publish(&mut second, &ledger),
            Err(BidError::DuplicateNonce(nonce))
        );
        assert_eq!(second.phase(), BidPhase::Rejected);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_ledger_duplicate_rejected() {
        let ledger = InMemoryLedger::new();
        let nonce = Nonce("18bcfe56800-beef".into());

        // Two lifecycles share a ledger; only the ledger sees both.
        let mut a = lifecycle();
        let mut b = lifecycle();
        let record = BidBuilder::new("0xABC")
            .amount("3")
            .nonce(nonce.clone())
            .build(a.clock(), &mut OsRng)
            .unwrap();

        let mut first = SealedBid::drafted(record.clone());
        a.encrypt(&mut first).unwrap();
        a.publish(&mut first, &ledger).unwrap();

        let mut second = SealedBid::drafted(record);
        b.encrypt(&mut second).unwrap();
        assert_eq!(
            b.publish(&mut second, &ledger),
            Err(BidError::DuplicateNonce(nonce))
        );
        assert_eq!(second.phase(), BidPhase::Rejected);
    }

    /// Accepts every payload; nonce checks are left to the caller.
    #[derive(Default)]
    struct AppendOnlyLedger(parking_lot::RwLock<Vec<EncryptedPayload>>);

    impl BidLedger for AppendOnlyLedger {
        fn submit(&self, payload: &EncryptedPayload) -> Result<(), LedgerError> {
            self.0.write().push(payload.clone());
            Ok(())
        }

        fn bids(&self) -> Vec<EncryptedPayload> {
            self.0.read().clone()
        }
    }

    #[test]
    fn test_publish_checks_nonces_already_on_ledger() {
        let ledger = AppendOnlyLedger::default();
        let nonce = Nonce("18bcfe56800-cafe".into());

        let mut a = lifecycle();
        let mut b = lifecycle();
        let record = BidBuilder::new("0xABC")
            .amount("3")
            .nonce(nonce.clone())
            .build(a.clock(), &mut OsRng)
            .unwrap();

        let mut first = SealedBid::drafted(record.clone());
        a.encrypt(&mut first).unwrap();
        a.publish(&mut first, &ledger).unwrap();

        let mut second = SealedBid::drafted(record);
        b.encrypt(&mut second).unwrap();
        assert_eq!(
            b.publish(&mut second, &ledger),
            Err(BidError::DuplicateNonce(nonce))
        );
        assert_eq!(ledger.bids().len(), 1);
    }

    #[test]
    fn test_early_reveal_keeps_phase() {
        let mut lc = lifecycle();
        let ledger = InMemoryLedger::new();
        let mut bid = lc.create_bid("3", "0xABC").unwrap();
        lc.encrypt(&mut bid).unwrap();
        lc.publish(&mut bid, &ledger).unwrap();

        let err = lc.reveal(&mut bid, START + 1_000).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(bid.phase(), BidPhase::Published);
    }

    #[test]
    fn test_reveal_is_idempotent() {
        let mut lc = lifecycle();
        let ledger = InMemoryLedger::new();
        let mut bid = lc.create_bid("42", "0xABC").unwrap();
        lc.encrypt(&mut bid).unwrap();
        lc.publish(&mut bid, &ledger).unwrap();

        let first = lc.reveal(&mut bid, START).unwrap();
        let second = lc.reveal(&mut bid, START).unwrap();
        assert_eq!(first, second);

        let payload = bid.payload().unwrap().clone();
        assert_eq!(lc.reveal_payload(&payload, START).unwrap(), first);
    }

    #[test]
    fn test_seeded_lifecycle_is_deterministic() {
        let run = || {
            let mut rng = ChaCha20Rng::seed_from_u64(11);
            let keys = generate_key_pair(KeySizing::new(512), &mut rng).unwrap();
            let mut lc = BidLifecycle::new(keys, ManualClock::new(START), rng);
            let mut bid = lc.create_bid("3", "0xABC").unwrap();
            lc.encrypt(&mut bid).unwrap();
            bid.payload().unwrap().clone()
        };
        assert_eq!(run(), run());
    }
}
