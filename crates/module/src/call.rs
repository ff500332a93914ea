//! Call message types for the auction house.

use borsh::{BorshDeserialize, BorshSerialize};

use sealbid_types::Timestamp;

use crate::settlement::RevealedBid;

/// Call messages for the auction house.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub enum WindowCall {
    /// Open a sealed-bid window for a land parcel.
    OpenWindow {
        land_id: u64,
        base_price: u128,
        open_timestamp: Timestamp,
        close_timestamp: Timestamp,
    },

    /// Append a published bid, as the ledger byte-array argument.
    SubmitBid { land_id: u64, payload: Vec<u8> },

    /// Settle a closed window from its reveals (permissionless).
    Settle {
        land_id: u64,
        reveals: Vec<RevealedBid>,
    },
}
