//! Query handlers for the auction house.
//!
//! These functions provide read-only access to window state.

use serde::{Deserialize, Serialize};

use sealbid_types::{EncryptedPayload, Timestamp, WindowPhase, WindowResult};

use crate::state::{AuctionHouse, AuctionWindow};

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum WindowQuery {
    /// Get a window's status by land id.
    GetWindow { land_id: u64 },

    /// Get all windows (paginated).
    ListWindows { offset: u64, limit: u64 },

    /// Get the frozen bid list of a closed window.
    GetSnapshot { land_id: u64 },

    /// Get settlement result.
    GetResult { land_id: u64 },

    /// Get windows currently accepting bids.
    ListOpen,

    /// Get land ids of windows closed but not yet settled.
    ListPendingSettlement,
}

/// Query response types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum WindowQueryResponse {
    Window(Option<WindowSummary>),

    WindowList(Vec<WindowSummary>),

    /// `None` if the window does not exist or is still open.
    Snapshot(Option<Vec<EncryptedPayload>>),

    Result(Option<WindowResult>),

    LandIds(Vec<u64>),
}

/// Summary of a window for listing: the "ends in / N encrypted bids" view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub land_id: u64,
    pub base_price: u128,
    pub phase: WindowPhase,
    pub open_timestamp: Timestamp,
    pub close_timestamp: Timestamp,
    pub time_remaining_ms: u64,
    pub num_bids: usize,
}

impl WindowSummary {
    /// Create summary from a window at time `now`.
    pub fn from_window(window: &AuctionWindow, now: Timestamp) -> Self {
        Self {
            land_id: window.land_id(),
            base_price: window.base_price(),
            phase: window.phase(now),
            open_timestamp: window.open_timestamp(),
            close_timestamp: window.close_timestamp(),
            time_remaining_ms: window.time_remaining(now),
            num_bids: window.bid_count(),
        }
    }
}

/// Handle a query at time `now`.
pub fn handle_query(state: &AuctionHouse, query: WindowQuery, now: Timestamp) -> WindowQueryResponse {
    match query {
        WindowQuery::GetWindow { land_id } => WindowQueryResponse::Window(
            state
                .get_window(land_id)
                .map(|w| WindowSummary::from_window(w, now)),
        ),

        WindowQuery::ListWindows { offset, limit } => {
            let windows = state
                .windows()
                .skip(offset as usize)
                .take(limit as usize)
                .map(|w| WindowSummary::from_window(w, now))
                .collect();
            WindowQueryResponse::WindowList(windows)
        }

        WindowQuery::GetSnapshot { land_id } => {
            let snapshot = state
                .get_window(land_id)
                .and_then(|w| w.snapshot(now).ok())
                .map(|bids| bids.to_vec());
            WindowQueryResponse::Snapshot(snapshot)
        }

        WindowQuery::GetResult { land_id } => {
            WindowQueryResponse::Result(state.get_window(land_id).and_then(|w| w.result().cloned()))
        }

        WindowQuery::ListOpen => WindowQueryResponse::WindowList(get_open_windows(state, now)),

        WindowQuery::ListPendingSettlement => {
            WindowQueryResponse::LandIds(get_pending_settlement(state, now))
        }
    }
}

/// Get windows currently accepting bids.
pub fn get_open_windows(state: &AuctionHouse, now: Timestamp) -> Vec<WindowSummary> {
    state
        .windows()
        .filter(|w| w.phase(now) == WindowPhase::Open)
        .map(|w| WindowSummary::from_window(w, now))
        .collect()
}

/// Get windows that have closed but are not yet settled.
pub fn get_pending_settlement(state: &AuctionHouse, now: Timestamp) -> Vec<u64> {
    state
        .windows()
        .filter(|w| w.phase(now) == WindowPhase::Closed)
        .map(|w| w.land_id())
        .collect()
}
