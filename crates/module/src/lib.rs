//! Sealed-bid auction windows.
//!
//! Each land parcel gets one window. Encrypted bids are appended while the
//! window is open, the bid list is frozen at close, and settlement picks the
//! highest verified reveal.
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `handlers`: Business logic for processing calls
//! - `queries`: Read-only state access
//! - `state`: Window and house state
//! - `settlement`: Winner determination
//! - `shared`: Lock-guarded handle for concurrent callers
//! - `genesis`: House configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use sealbid_module::{handlers, AuctionHouse, HouseConfig};
//!
//! let mut house = AuctionHouse::new(HouseConfig::default())?;
//! let ctx = handlers::CallContext { ... };
//!
//! handlers::handle_open_window(&mut house, &ctx, land_id, base_price, open, close)?;
//! handlers::handle_submit_bid(&mut house, &ctx, land_id, payload)?;
//! ```

pub mod call;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod queries;
pub mod settlement;
pub mod shared;
pub mod state;

pub use call::WindowCall;
pub use error::WindowError;
pub use genesis::{HouseConfig, HouseConfigError};
pub use handlers::{handle_call, CallContext, CallOutcome, HandlerResult};
pub use queries::{handle_query, WindowQuery, WindowQueryResponse, WindowSummary};
pub use settlement::{compute_winner, RevealedBid, WindowWinner};
pub use shared::{SharedAuctionHouse, WindowLedger};
pub use state::{AuctionHouse, AuctionWindow};
