//! Call handlers for the auction house.
//!
//! These functions implement the business logic for each call type.

use tracing::{debug, info};

use sealbid_types::{EncryptedPayload, Timestamp, WindowPhase, WindowResult};

use crate::call::WindowCall;
use crate::error::WindowError;
use crate::settlement::{compute_winner, RevealedBid};
use crate::state::{AuctionHouse, AuctionWindow};

/// Context provided by the runtime for each call.
pub struct CallContext {
    /// Sender of the call
    pub sender: String,
    /// Current timestamp (ms)
    pub timestamp: Timestamp,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, WindowError>;

/// Outcome of a dispatched call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    Opened { land_id: u64 },
    BidAccepted { land_id: u64, index: usize },
    Settled(WindowResult),
}

/// Dispatch a call message to its handler.
pub fn handle_call(
    state: &mut AuctionHouse,
    ctx: &CallContext,
    call: WindowCall,
) -> HandlerResult<CallOutcome> {
    match call {
        WindowCall::OpenWindow {
            land_id,
            base_price,
            open_timestamp,
            close_timestamp,
        } => {
            handle_open_window(state, ctx, land_id, base_price, open_timestamp, close_timestamp)?;
            Ok(CallOutcome::Opened { land_id })
        }

        WindowCall::SubmitBid { land_id, payload } => {
            let payload = EncryptedPayload::from_ledger_bytes(&payload)?;
            let index = handle_submit_bid(state, ctx, land_id, payload)?;
            Ok(CallOutcome::BidAccepted { land_id, index })
        }

        WindowCall::Settle { land_id, reveals } => {
            handle_settle(state, ctx, land_id, &reveals).map(CallOutcome::Settled)
        }
    }
}

/// Handle OpenWindow call.
pub fn handle_open_window(
    state: &mut AuctionHouse,
    ctx: &CallContext,
    land_id: u64,
    base_price: u128,
    open_timestamp: Timestamp,
    close_timestamp: Timestamp,
) -> HandlerResult<()> {
    let config = state.config();

    // Validate timing
    if close_timestamp <= open_timestamp {
        return Err(WindowError::InvalidTiming {
            open: open_timestamp,
            close: close_timestamp,
        });
    }
    let duration = close_timestamp - open_timestamp;
    if duration < config.min_duration_ms || duration > config.max_duration_ms {
        return Err(WindowError::DurationOutOfRange {
            duration,
            min: config.min_duration_ms,
            max: config.max_duration_ms,
        });
    }

    if base_price < config.min_base_price {
        return Err(WindowError::BasePriceTooLow {
            min: config.min_base_price,
            got: base_price,
        });
    }

    let window = AuctionWindow::new(
        land_id,
        base_price,
        open_timestamp,
        close_timestamp,
        config.max_bids_per_window,
    )?;
    state.insert_window(window)?;

    info!(
        land_id,
        open_timestamp,
        close_timestamp,
        sender = %ctx.sender,
        "Opened auction window"
    );
    Ok(())
}

/// Handle SubmitBid call. Returns the bid's position in the window.
pub fn handle_submit_bid(
    state: &mut AuctionHouse,
    ctx: &CallContext,
    land_id: u64,
    payload: EncryptedPayload,
) -> HandlerResult<usize> {
    let window = state
        .get_window_mut(land_id)
        .ok_or(WindowError::WindowNotFound(land_id))?;

    let commitment = payload.commitment_hash;
    let index = window.append(payload, ctx.timestamp)?;

    debug!(
        land_id,
        index,
        commitment = commitment.to_hex(),
        "Accepted bid"
    );
    Ok(index)
}

/// Handle Settle call.
pub fn handle_settle(
    state: &mut AuctionHouse,
    ctx: &CallContext,
    land_id: u64,
    reveals: &[RevealedBid],
) -> HandlerResult<WindowResult> {
    let window = state
        .get_window_mut(land_id)
        .ok_or(WindowError::WindowNotFound(land_id))?;

    // Check not already settled
    match window.phase(ctx.timestamp) {
        WindowPhase::Settled => return Err(WindowError::AlreadySettled),
        WindowPhase::Closed => {}
        got => {
            return Err(WindowError::InvalidPhase {
                expected: WindowPhase::Closed,
                got,
            })
        }
    }

    let bids = window.snapshot(ctx.timestamp)?;
    let winner = compute_winner(bids, reveals, window.base_price()).ok_or(WindowError::NoValidBids)?;

    let result = WindowResult {
        land_id,
        winner: winner.bidder,
        winning_amount: winner.amount,
        winning_commitment: winner.commitment,
        num_valid_bids: winner.num_valid_bids,
        settlement_time: ctx.timestamp,
    };
    window.record_result(result.clone())?;

    info!(
        land_id,
        winning_amount = %result.winning_amount,
        commitment = result.winning_commitment.to_hex(),
        num_valid_bids = result.num_valid_bids,
        "Settled auction window"
    );
    Ok(result)
}
