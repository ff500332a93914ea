//! End-to-end integration tests for the sealed-bid auction.
//!
//! These tests exercise the full bid lifecycle:
//! 1. Key generation
//! 2. Window opening
//! 3. Bid drafting, encryption and publication
//! 4. Reveal after close
//! 5. Public verification and settlement

use std::sync::Arc;
use std::thread;

use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use sealbid_client::{
    verify_reveal, BidBuilder, BidError, BidLedger, BidLifecycle, InMemoryLedger, ManualClock,
    Reveal, SealedBid, TimeSource,
};
use sealbid_crypto::{generate_key_pair, CryptoError, KeyPair, KeySizing};
use sealbid_module::{
    CallContext, HouseConfig, RevealedBid, SharedAuctionHouse, WindowError, WindowQuery,
    WindowQueryResponse,
};
use sealbid_types::{BidPhase, EncryptedPayload, Nonce, Timestamp, WindowPhase};

const START: Timestamp = 1_700_000_000_000;

fn test_keys() -> KeyPair {
    generate_key_pair(KeySizing::new(512), &mut OsRng).unwrap()
}

fn lifecycle(clock: &Arc<ManualClock>) -> BidLifecycle<Arc<ManualClock>, OsRng> {
    BidLifecycle::new(test_keys(), Arc::clone(clock), OsRng)
}

fn context(clock: &ManualClock) -> CallContext {
    CallContext {
        sender: "0xHOUSE".into(),
        timestamp: clock.now_ms(),
    }
}

/// Test the complete auction flow across bidders, window and settlement.
#[test]
fn test_full_auction_flow() {
    let clock = Arc::new(ManualClock::new(START));
    let close = START + 120_000;

    // ========================================
    // Phase 1: Open a window for land 7
    // ========================================

    let house = SharedAuctionHouse::new(HouseConfig::default()).unwrap();
    house
        .open_window(&context(&clock), 7, 100, START, close)
        .unwrap();

    // ========================================
    // Phase 2: Bidders seal and publish
    // ========================================

    let bids = [("0xAAA", "150"), ("0xBBB", "900"), ("0xCCC", "40")];
    let mut bidders = Vec::new();
    for (bidder, amount) in bids {
        let mut client = lifecycle(&clock);
        let ledger = house.ledger(7, bidder, Arc::clone(&clock));

        let mut bid = client.create_bid(amount, bidder).unwrap();
        client.encrypt(&mut bid).unwrap();
        client.publish(&mut bid, &ledger).unwrap();
        assert_eq!(bid.phase(), BidPhase::Published);

        clock.advance(1_000);
        bidders.push((client, bid));
    }

    let summary = house.query(WindowQuery::GetWindow { land_id: 7 }, START + 3_000);
    let WindowQueryResponse::Window(Some(summary)) = summary else {
        panic!("expected window summary");
    };
    assert_eq!(summary.num_bids, 3);
    assert_eq!(summary.phase, WindowPhase::Open);

    // ========================================
    // Phase 3: Reveal after close
    // ========================================

    clock.set(close);
    let mut reveals = Vec::new();
    for (client, bid) in bidders.iter_mut() {
        let reveal = client.reveal(bid, close).unwrap();
        let payload = bid.payload().cloned().unwrap();
        assert!(verify_reveal(&payload, &reveal.proof, &client.public_key()));
        reveals.push(RevealedBid {
            payload,
            proof: reveal.proof,
            public_key: client.public_key(),
        });
    }

    // ========================================
    // Phase 4: Settle
    // ========================================

    let result = house.settle(&context(&clock), 7, &reveals).unwrap();
    assert_eq!(result.winner, "0xBBB");
    assert_eq!(result.winning_amount, 900);
    assert_eq!(result.num_valid_bids, 2);
    assert_eq!(result.winning_commitment, reveals[1].payload.commitment_hash);

    match house.query(WindowQuery::GetResult { land_id: 7 }, close) {
        WindowQueryResponse::Result(Some(recorded)) => assert_eq!(recorded, result),
        other => panic!("expected result, got {other:?}"),
    }
    assert_eq!(
        house.settle(&context(&clock), 7, &reveals),
        Err(WindowError::AlreadySettled)
    );
}

#[test]
fn test_duplicate_nonce_rejected() {
    let clock = Arc::new(ManualClock::new(START));
    let ledger = InMemoryLedger::new();
    let mut client = lifecycle(&clock);

    let nonce = Nonce("reused-nonce".into());
    let draft = || {
        BidBuilder::new("0xABC")
            .amount("3")
            .nonce(nonce.clone())
            .build(clock.as_ref(), &mut OsRng)
            .unwrap()
    };

    let mut first = SealedBid::drafted(draft());
    client.encrypt(&mut first).unwrap();
    client.publish(&mut first, &ledger).unwrap();

    // A second client reusing the nonce is refused by the ledger.
    let mut other = lifecycle(&clock);
    let mut second = SealedBid::drafted(draft());
    other.encrypt(&mut second).unwrap();
    assert_eq!(
        other.publish(&mut second, &ledger),
        Err(BidError::DuplicateNonce(nonce.clone()))
    );
    assert_eq!(second.phase(), BidPhase::Rejected);
    assert_eq!(ledger.len(), 1);

    // The same client reusing it is refused before the ledger is asked.
    let mut third = SealedBid::drafted(draft());
    client.encrypt(&mut third).unwrap();
    assert_eq!(
        client.publish(&mut third, &ledger),
        Err(BidError::DuplicateNonce(nonce))
    );
    assert_eq!(ledger.len(), 1);
}

#[test]
fn test_same_bid_fresh_nonces_differ() {
    let clock = Arc::new(ManualClock::new(START));
    let mut client = lifecycle(&clock);

    let mut a = client.create_bid("3", "0xABC").unwrap();
    let mut b = client.create_bid("3", "0xABC").unwrap();
    client.encrypt(&mut a).unwrap();
    client.encrypt(&mut b).unwrap();

    let (a, b) = (a.payload().unwrap(), b.payload().unwrap());
    assert_ne!(a.nonce, b.nonce);
    assert_ne!(a.commitment_hash, b.commitment_hash);
    assert_ne!(a.encrypted_amount, b.encrypted_amount);
}

#[test]
fn test_reveal_waits_for_close() {
    let clock = Arc::new(ManualClock::new(START));
    let close = START + 1_000;
    let ledger = InMemoryLedger::new();
    let mut client = lifecycle(&clock);

    let mut bid = client.create_bid("250", "0xABC").unwrap();
    client.encrypt(&mut bid).unwrap();
    client.publish(&mut bid, &ledger).unwrap();

    let early = client.reveal(&mut bid, close).unwrap_err();
    assert_eq!(
        early,
        BidError::AuctionStillOpen {
            close_timestamp: close,
            now: START
        }
    );
    assert!(early.is_retryable());
    assert_eq!(bid.phase(), BidPhase::Published);

    clock.advance(1_000);
    let reveal = client.reveal(&mut bid, close).unwrap();
    assert_eq!(reveal.bid.amount, "250");
    assert_eq!(reveal.bid.bidder, "0xABC");

    let payload = bid.payload().unwrap();
    assert!(verify_reveal(payload, &reveal.proof, &client.public_key()));

    let mut tampered = reveal.proof.clone();
    tampered.decrypted_value.amount[0] ^= 0x01;
    assert!(!verify_reveal(payload, &tampered, &client.public_key()));
}

#[test]
fn test_reveal_is_idempotent() {
    let clock = Arc::new(ManualClock::new(START));
    let ledger = InMemoryLedger::new();
    let mut client = lifecycle(&clock);

    let mut bid = client.create_bid("42", "0xABC").unwrap();
    client.encrypt(&mut bid).unwrap();
    client.publish(&mut bid, &ledger).unwrap();
    clock.advance(5_000);

    let first = client.reveal(&mut bid, START + 1).unwrap();
    let second = client.reveal(&mut bid, START + 1).unwrap();
    assert_eq!(first, second);
    assert_eq!(bid.phase(), BidPhase::Revealed);

    // The same payload fetched back from the ledger gets the cached reveal.
    let fetched = ledger.bids().pop().unwrap();
    assert_eq!(client.reveal_payload(&fetched, START + 1).unwrap(), first);
}

#[test]
fn test_round_trip_through_wire_formats() {
    let clock = Arc::new(ManualClock::new(START));
    let ledger = InMemoryLedger::new();
    let mut client = lifecycle(&clock);

    let mut bid = client.create_bid("1000000000000000000", "bidder@example").unwrap();
    client.encrypt(&mut bid).unwrap();
    client.publish(&mut bid, &ledger).unwrap();

    // Bytes on the ledger and the published JSON carry the same payload.
    let stored = ledger.bids().pop().unwrap();
    let json = stored.to_json().unwrap();
    assert_eq!(EncryptedPayload::from_json(&json).unwrap(), stored);

    clock.advance(1);
    let reveal = client.reveal_payload(&stored, START).unwrap();
    assert_eq!(&reveal.bid, bid.record());
    assert_eq!(reveal.bid.amount_value(), Some(1_000_000_000_000_000_000));

    let published = serde_json::to_string(&reveal).unwrap();
    let parsed: Reveal = serde_json::from_str(&published).unwrap();
    assert!(verify_reveal(&stored, &parsed.proof, &client.public_key()));
}

#[test]
fn test_reveal_with_wrong_key_fails() {
    let clock = Arc::new(ManualClock::new(START));
    let ledger = InMemoryLedger::new();
    let mut owner = lifecycle(&clock);
    let mut stranger = lifecycle(&clock);

    let mut bid = owner.create_bid("77", "0xABC").unwrap();
    owner.encrypt(&mut bid).unwrap();
    owner.publish(&mut bid, &ledger).unwrap();
    clock.advance(1);

    let payload = bid.payload().cloned().unwrap();
    let err = stranger.reveal_payload(&payload, START).unwrap_err();
    assert_eq!(
        err,
        BidError::Crypto(CryptoError::DecryptionMismatch {
            field: "key_fingerprint"
        })
    );
    assert!(err.rejects_bid());

    // The owner's proof does not verify under the stranger's key.
    let reveal = owner.reveal(&mut bid, START).unwrap();
    assert!(verify_reveal(&payload, &reveal.proof, &owner.public_key()));
    assert!(!verify_reveal(&payload, &reveal.proof, &stranger.public_key()));
}

#[test]
fn test_concurrent_publication() {
    let clock = Arc::new(ManualClock::new(START));
    let close = START + 60_000;
    let house = SharedAuctionHouse::new(HouseConfig::default()).unwrap();
    house.open_window(&context(&clock), 1, 0, START, close).unwrap();

    let keys = Arc::new(test_keys());
    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let house = house.clone();
            let clock = Arc::clone(&clock);
            let keys = Arc::clone(&keys);
            thread::spawn(move || {
                let mut rng = ChaCha20Rng::seed_from_u64(t);
                let ledger = house.ledger(1, format!("bidder-{t}"), clock);
                for i in 0..5u64 {
                    let amount = (t * 10 + i).to_string();
                    let bid = BidBuilder::new(format!("bidder-{t}"))
                        .amount(amount)
                        .build(&ManualClock::new(START + i), &mut rng)
                        .unwrap();
                    let payload = sealbid_client::encrypt_bid(&bid, &keys, &mut rng).unwrap();
                    ledger.submit(&payload).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(matches!(
        house.snapshot(1, close - 1),
        Err(WindowError::StillOpen { .. })
    ));
    let frozen = house.snapshot(1, close).unwrap();
    assert_eq!(frozen.len(), 20);

    clock.set(close);
    let mut client = BidLifecycle::new(
        KeyPair::clone(&keys),
        Arc::clone(&clock),
        OsRng,
    );
    let reveals: Vec<_> = frozen
        .iter()
        .map(|payload| RevealedBid {
            payload: payload.clone(),
            proof: client.reveal_payload(payload, close).unwrap().proof,
            public_key: client.public_key(),
        })
        .collect();

    let result = house.settle(&context(&clock), 1, &reveals).unwrap();
    assert_eq!(result.winning_amount, 34);
    assert_eq!(result.winner, "bidder-3");
    assert_eq!(result.num_valid_bids, 20);
}
